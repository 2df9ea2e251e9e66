// Copyright (C) 2020-2026 Andy Kurnia.

// Streaming summary of a population of scores.
// Feed values in a fixed order if the result must be bit-reproducible.
#[derive(Clone, Debug)]
pub struct Stats {
    count: f64, // should be a non-negative int barring overflows
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for Stats {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[inline(always)]
    pub fn new() -> Self {
        Self {
            count: 0.0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    // https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Welford's_online_algorithm
    #[inline(always)]
    pub fn update(&mut self, new_value: f64) {
        self.count += 1.0;
        let delta = new_value - self.mean;
        self.mean += delta / self.count;
        let delta2 = new_value - self.mean;
        self.m2 += delta * delta2;
        self.min = self.min.min(new_value);
        self.max = self.max.max(new_value);
    }

    #[inline(always)]
    pub fn count(&self) -> f64 {
        self.count
    }

    #[inline(always)]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    // The scored plates are the whole population, not a sample of it.
    #[inline(always)]
    pub fn population_variance(&self) -> f64 {
        if self.count < 1.0 {
            0.0
        } else {
            self.m2 / self.count
        }
    }

    #[inline(always)]
    pub fn standard_deviation(&self) -> f64 {
        self.population_variance().sqrt()
    }

    // Both are 0.0 when nothing has been seen.
    #[inline(always)]
    pub fn min(&self) -> f64 {
        if self.count < 1.0 { 0.0 } else { self.min }
    }

    #[inline(always)]
    pub fn max(&self) -> f64 {
        if self.count < 1.0 { 0.0 } else { self.max }
    }
}

impl FromIterator<f64> for Stats {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        let mut stats = Stats::new();
        for x in iter {
            stats.update(x);
        }
        stats
    }
}
