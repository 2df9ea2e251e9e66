// Copyright (C) 2026 Andy Kurnia.

use super::{corpus, error::PipelineError, matcher, plate, pool};

/// One matching word. `word` indexes into the corpus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    pub word: u32,
    pub frequency: u64,
}

pub struct PlateSolutions {
    pub plate: plate::Plate,
    pub matches: Box<[Match]>,
}

pub struct SolutionSets {
    // plates with at least one match, in enumeration order.
    pub solved: Vec<PlateSolutions>,
    // recorded, but not collectible.
    pub empty: Vec<plate::Plate>,
    pub failed: Vec<PipelineError>,
    pub plates_considered: usize,
}

impl SolutionSets {
    pub fn total_solutions(&self) -> usize {
        self.solved.iter().map(|x| x.matches.len()).sum()
    }
}

// Descending frequency, then ascending word. Corpus order is alphabetical,
// so comparing indexes compares the words.
#[inline(always)]
pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_unstable_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.word.cmp(&b.word))
    });
}

pub fn solve_plate(corpus: &corpus::Corpus, plate: &plate::Plate) -> Vec<Match> {
    let plate_matcher = matcher::PlateMatcher::new(plate);
    let mut matches = (0u32..)
        .zip(corpus.entries().iter())
        .filter(|(_, entry)| plate_matcher.is_match(entry.word.as_bytes(), entry.mask))
        .map(|(word, entry)| Match {
            word,
            frequency: entry.frequency,
        })
        .collect::<Vec<_>>();
    sort_matches(&mut matches);
    matches
}

// Matches every plate against the whole corpus. Each plate is independent,
// so the work is spread over num_threads workers.
pub fn build(corpus: &corpus::Corpus, plates: &[plate::Plate], num_threads: usize) -> SolutionSets {
    let results = pool::map(plates, num_threads, "matching", |plate| {
        solve_plate(corpus, plate)
    });
    let mut ret = SolutionSets {
        solved: Vec::new(),
        empty: Vec::new(),
        failed: Vec::new(),
        plates_considered: plates.len(),
    };
    for (plate, result) in plates.iter().zip(results) {
        match result {
            Ok(matches) => {
                if matches.is_empty() {
                    ret.empty.push(plate.clone());
                } else {
                    ret.solved.push(PlateSolutions {
                        plate: plate.clone(),
                        matches: matches.into_boxed_slice(),
                    });
                }
            }
            Err(reason) => {
                log::warn!("skipping plate {}: {}", plate, reason);
                ret.failed.push(PipelineError::PlateMatch {
                    plate: plate.to_string(),
                    reason,
                });
            }
        }
    }
    ret
}
