// Copyright (C) 2026 Andy Kurnia.

use super::{dictionary, error::PipelineError, info, pool, stats};

pub const SCARCITY_WEIGHT: f64 = 0.4;
pub const FREQ_RARITY_WEIGHT: f64 = 0.3;
pub const INFO_RARITY_WEIGHT: f64 = 0.3;

// Surprisal below this many bits earns no information rarity.
const INFO_BITS_BASELINE: f64 = 8.0;
const INFO_BITS_SCALE: f64 = 8.33;

// Cumulative share (in percent) of the ranked population in each tier but
// the last.
pub const PERCENTILE_CUTOFFS: [usize; 4] = [1, 5, 15, 35];

#[inline(always)]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// Fewer solutions, rarer plate.
#[inline(always)]
pub fn scarcity(solution_count: usize) -> f64 {
    (100.0 - 30.0 * (solution_count.max(1) as f64).log10()).max(0.0)
}

// Less frequent words, rarer plate. Also used for a single word.
#[inline(always)]
pub fn freq_rarity(avg_frequency: f64) -> f64 {
    (100.0 - 15.0 * avg_frequency.max(1.0).log10()).max(0.0)
}

#[inline(always)]
pub fn info_rarity(avg_info_bits: f64) -> f64 {
    ((avg_info_bits - INFO_BITS_BASELINE) * INFO_BITS_SCALE).clamp(0.0, 100.0)
}

#[inline(always)]
pub fn combine(scarcity: f64, freq_rarity: f64, info_rarity: f64) -> f64 {
    round2(
        SCARCITY_WEIGHT * scarcity
            + FREQ_RARITY_WEIGHT * freq_rarity
            + INFO_RARITY_WEIGHT * info_rarity,
    )
    .clamp(0.0, 100.0)
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct RarityComponents {
    pub solution_count: usize,
    pub avg_frequency: f64,
    pub avg_info_bits: f64,
    pub scarcity: f64,
    pub freq_rarity: f64,
    pub info_rarity: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlateRarity {
    pub plate_id: u32,
    pub rarity: f64,
    pub components: RarityComponents,
}

fn rarity_error(compact_plate: &dictionary::CompactPlate, reason: String) -> PipelineError {
    PipelineError::RarityComputation {
        plate: compact_plate.letters.to_string(),
        reason,
    }
}

pub fn score_plate(
    compact_plate: &dictionary::CompactPlate,
    info_source: &dyn info::InfoSource,
) -> Result<PlateRarity, PipelineError> {
    let solution_count = compact_plate.solutions.len();
    if solution_count == 0 {
        return Err(rarity_error(compact_plate, "no solutions".into()));
    }
    let total_frequency = compact_plate
        .solutions
        .iter()
        .map(|s| s.frequency as u128)
        .sum::<u128>();
    let avg_frequency = total_frequency as f64 / solution_count as f64;
    if !avg_frequency.is_finite() {
        return Err(rarity_error(
            compact_plate,
            format!("average frequency is {}", avg_frequency),
        ));
    }
    let avg_info_bits = info_source
        .avg_info_bits(&compact_plate.letters)
        .unwrap_or(0.0);
    if !avg_info_bits.is_finite() {
        return Err(rarity_error(
            compact_plate,
            format!("average information is {} bits", avg_info_bits),
        ));
    }
    let components = RarityComponents {
        solution_count,
        avg_frequency,
        avg_info_bits,
        scarcity: scarcity(solution_count),
        freq_rarity: freq_rarity(avg_frequency),
        info_rarity: info_rarity(avg_info_bits),
    };
    Ok(PlateRarity {
        plate_id: compact_plate.id,
        rarity: combine(
            components.scarcity,
            components.freq_rarity,
            components.info_rarity,
        ),
        components,
    })
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RarityStatistics {
    pub count: usize,
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
}

impl RarityStatistics {
    pub fn from_scores(scores: &[PlateRarity]) -> Self {
        let s = scores.iter().map(|x| x.rarity).collect::<stats::Stats>();
        Self {
            count: scores.len(),
            mean: s.mean(),
            stddev: s.standard_deviation(),
            min: s.min(),
            max: s.max(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    UltraRare,
    VeryRare,
    Rare,
    Uncommon,
    Common,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::UltraRare,
        Tier::VeryRare,
        Tier::Rare,
        Tier::Uncommon,
        Tier::Common,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tier::UltraRare => "ultra_rare",
            Tier::VeryRare => "very_rare",
            Tier::Rare => "rare",
            Tier::Uncommon => "uncommon",
            Tier::Common => "common",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TierScheme {
    #[default]
    #[serde(rename = "stddev")]
    StdDev,
    #[serde(rename = "percentile")]
    Percentile,
}

impl std::fmt::Display for TierScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TierScheme::StdDev => "stddev",
            TierScheme::Percentile => "percentile",
        })
    }
}

/// Plate ids per tier. Every scored plate is in exactly one list; each list
/// is in ascending id order.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TierIndex {
    pub ultra_rare_ids: Vec<u32>,
    pub very_rare_ids: Vec<u32>,
    pub rare_ids: Vec<u32>,
    pub uncommon_ids: Vec<u32>,
    pub common_ids: Vec<u32>,
}

impl TierIndex {
    pub fn ids(&self, tier: Tier) -> &[u32] {
        match tier {
            Tier::UltraRare => &self.ultra_rare_ids,
            Tier::VeryRare => &self.very_rare_ids,
            Tier::Rare => &self.rare_ids,
            Tier::Uncommon => &self.uncommon_ids,
            Tier::Common => &self.common_ids,
        }
    }

    fn ids_mut(&mut self, tier: Tier) -> &mut Vec<u32> {
        match tier {
            Tier::UltraRare => &mut self.ultra_rare_ids,
            Tier::VeryRare => &mut self.very_rare_ids,
            Tier::Rare => &mut self.rare_ids,
            Tier::Uncommon => &mut self.uncommon_ids,
            Tier::Common => &mut self.common_ids,
        }
    }

    pub fn tier_of(&self, plate_id: u32) -> Option<Tier> {
        Tier::ALL
            .into_iter()
            .find(|&tier| self.ids(tier).binary_search(&plate_id).is_ok())
    }

    pub fn len(&self) -> usize {
        Tier::ALL.iter().map(|&tier| self.ids(tier).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sort(&mut self) {
        for tier in Tier::ALL {
            self.ids_mut(tier).sort_unstable();
        }
    }
}

pub fn stddev_tier(rarity: f64, statistics: &RarityStatistics) -> Tier {
    let mu = statistics.mean;
    let sigma = statistics.stddev;
    if rarity > mu + 2.0 * sigma {
        Tier::UltraRare
    } else if rarity > mu + sigma {
        Tier::VeryRare
    } else if rarity > mu + 0.5 * sigma {
        Tier::Rare
    } else if rarity > mu {
        Tier::Uncommon
    } else {
        Tier::Common
    }
}

pub fn stddev_tiers(scores: &[PlateRarity], statistics: &RarityStatistics) -> TierIndex {
    let mut ret = TierIndex::default();
    for score in scores {
        ret.ids_mut(stddev_tier(score.rarity, statistics))
            .push(score.plate_id);
    }
    ret.sort();
    ret
}

// Rank by descending rarity, ties by ascending plate id. The first
// ceil(n * 1%) ranks are ultra rare, up to ceil(n * 5%) very rare, and so on.
pub fn percentile_tiers(scores: &[PlateRarity]) -> TierIndex {
    let n = scores.len();
    let mut ranked = scores.iter().collect::<Vec<_>>();
    ranked.sort_unstable_by(|a, b| {
        b.rarity
            .total_cmp(&a.rarity)
            .then_with(|| a.plate_id.cmp(&b.plate_id))
    });
    let bounds = PERCENTILE_CUTOFFS.map(|pct| (n * pct).div_ceil(100).min(n));
    let mut ret = TierIndex::default();
    for (rank, score) in ranked.into_iter().enumerate() {
        let tier = match bounds.iter().position(|&bound| rank < bound) {
            Some(i) => Tier::ALL[i],
            None => Tier::Common,
        };
        ret.ids_mut(tier).push(score.plate_id);
    }
    ret.sort();
    ret
}

pub struct RarityIndex {
    pub scores: Vec<PlateRarity>, // ascending plate id, scored plates only
    pub failed: Vec<PipelineError>,
    pub statistics: RarityStatistics,
    pub stddev_tiers: TierIndex,
    pub percentile_tiers: TierIndex,
    pub canonical: TierScheme,
}

impl RarityIndex {
    pub fn tiers(&self, scheme: TierScheme) -> &TierIndex {
        match scheme {
            TierScheme::StdDev => &self.stddev_tiers,
            TierScheme::Percentile => &self.percentile_tiers,
        }
    }

    pub fn canonical_tiers(&self) -> &TierIndex {
        self.tiers(self.canonical)
    }

    pub fn score_of(&self, plate_id: u32) -> Option<&PlateRarity> {
        self.scores
            .binary_search_by_key(&plate_id, |x| x.plate_id)
            .ok()
            .map(|i| &self.scores[i])
    }
}

// Plates are scored in parallel. Statistics and tiers wait for all of them
// and then run in plate id order.
pub fn score_all(
    dataset: &dictionary::CompactDataset,
    info_source: &dyn info::InfoSource,
    canonical: TierScheme,
    num_threads: usize,
) -> RarityIndex {
    let results = pool::map(&dataset.plates, num_threads, "scoring", |compact_plate| {
        score_plate(compact_plate, info_source)
    });
    let mut scores = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for (compact_plate, result) in dataset.plates.iter().zip(results) {
        match result {
            Ok(Ok(score)) => scores.push(score),
            Ok(Err(e)) => {
                log::warn!("{}", e);
                failed.push(e);
            }
            Err(reason) => {
                let e = rarity_error(compact_plate, reason);
                log::warn!("{}", e);
                failed.push(e);
            }
        }
    }
    let statistics = RarityStatistics::from_scores(&scores);
    let stddev_tiers = stddev_tiers(&scores, &statistics);
    let percentile_tiers = percentile_tiers(&scores);
    RarityIndex {
        scores,
        failed,
        statistics,
        stddev_tiers,
        percentile_tiers,
        canonical,
    }
}
