// Copyright (C) 2026 Andy Kurnia.

use super::{alphabet, corpus, error::PipelineError, fash, plate, pool, solver};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WordEntry {
    pub id: u32,
    pub word: String,
    pub frequency: u64,
    pub length: u32,
    pub rare_letters: u32,
    pub vowels: u32,
    pub first_letter: char,
    pub last_letter: char,
    pub plates_appeared_in: u32,
    // plates_appeared_in / number of plates with solutions.
    pub popularity: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompactSolution {
    pub word_id: u32,
    pub frequency: u64,
}

pub struct CompactPlate {
    pub id: u32,
    pub letters: plate::Plate,
    pub solutions: Box<[CompactSolution]>,
}

/// Registry of every distinct word that solves at least one plate.
///
/// Ids run from 1 to len() with no gaps. Id 1 is the most frequent word; equal
/// frequencies are ordered by the word itself.
pub struct WordDictionary {
    entries: Vec<WordEntry>, // entries[id - 1]
    by_word: fash::WordHashMap<String, u32>,
}

impl WordDictionary {
    #[inline(always)]
    pub fn get(&self, id: u32) -> Option<&WordEntry> {
        if id == 0 {
            None
        } else {
            self.entries.get(id as usize - 1)
        }
    }

    #[inline(always)]
    pub fn id_of(&self, word: &str) -> Option<u32> {
        self.by_word.get(word).copied()
    }

    #[inline(always)]
    pub fn entries(&self) -> &[WordEntry] {
        &self.entries
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct CompactDataset {
    pub dictionary: WordDictionary,
    pub plates: Vec<CompactPlate>, // plates[id - 1]
}

fn inconsistent(reason: String) -> PipelineError {
    PipelineError::DictionaryConsistency(reason)
}

impl CompactDataset {
    pub fn total_solutions(&self) -> usize {
        self.plates.iter().map(|p| p.solutions.len()).sum()
    }

    pub fn plate(&self, id: u32) -> Option<&CompactPlate> {
        if id == 0 {
            None
        } else {
            self.plates.get(id as usize - 1)
        }
    }

    // Must pass before anything is written.
    pub fn verify(&self) -> Result<(), PipelineError> {
        let dictionary = &self.dictionary;
        if dictionary.by_word.len() != dictionary.entries.len() {
            return Err(inconsistent(format!(
                "{} words share {} ids",
                dictionary.by_word.len(),
                dictionary.entries.len()
            )));
        }
        for (expected_id, entry) in (1u32..).zip(dictionary.entries.iter()) {
            if entry.id != expected_id {
                return Err(inconsistent(format!(
                    "word {:?} has id {} at position {}",
                    entry.word, entry.id, expected_id
                )));
            }
            match dictionary.by_word.get(&entry.word) {
                Some(&id) if id == expected_id => {}
                other => {
                    return Err(inconsistent(format!(
                        "word {:?} with id {} maps back to {:?}",
                        entry.word, expected_id, other
                    )));
                }
            }
        }
        let mut seen = vec![0u32; dictionary.entries.len()];
        for (expected_id, compact_plate) in (1u32..).zip(self.plates.iter()) {
            if compact_plate.id != expected_id {
                return Err(inconsistent(format!(
                    "plate {} has id {} at position {}",
                    compact_plate.letters, compact_plate.id, expected_id
                )));
            }
            if expected_id > 1
                && self.plates[expected_id as usize - 2].letters >= compact_plate.letters
            {
                return Err(inconsistent(format!(
                    "plate {} is out of order",
                    compact_plate.letters
                )));
            }
            for solution in compact_plate.solutions.iter() {
                let Some(entry) = dictionary.get(solution.word_id) else {
                    return Err(inconsistent(format!(
                        "plate {} references unknown word id {}",
                        compact_plate.letters, solution.word_id
                    )));
                };
                if entry.frequency != solution.frequency {
                    return Err(inconsistent(format!(
                        "plate {} has frequency {} for {:?}, registry has {}",
                        compact_plate.letters, solution.frequency, entry.word, entry.frequency
                    )));
                }
                seen[solution.word_id as usize - 1] += 1;
            }
        }
        for (entry, &count) in dictionary.entries.iter().zip(seen.iter()) {
            if count == 0 {
                return Err(inconsistent(format!("word id {} is unused", entry.id)));
            }
            if count != entry.plates_appeared_in {
                return Err(inconsistent(format!(
                    "word {:?} appears in {} plates, registry says {}",
                    entry.word, count, entry.plates_appeared_in
                )));
            }
        }
        Ok(())
    }
}

// Distinct words (by corpus index) and the number of plates each appears in.
// Unordered; assigns nothing.
fn gather_distinct_words(
    solved: &[solver::PlateSolutions],
    num_threads: usize,
) -> Result<fash::WordHashMap<u32, u32>, PipelineError> {
    let num_threads = num_threads.max(1);
    let chunk_len = solved.len().div_ceil(num_threads).max(1);
    let chunks = solved.chunks(chunk_len).collect::<Vec<_>>();
    let partials = pool::map(&chunks, num_threads, "gathering words", |chunk| {
        let mut counts = fash::WordHashMap::<u32, u32>::default();
        for plate_solutions in chunk.iter() {
            for m in plate_solutions.matches.iter() {
                *counts.entry(m.word).or_default() += 1;
            }
        }
        counts
    });
    let mut merged = fash::WordHashMap::<u32, u32>::default();
    for partial in partials {
        let partial = partial.map_err(|e| inconsistent(format!("gathering words: {}", e)))?;
        for (word, count) in partial {
            *merged.entry(word).or_default() += count;
        }
    }
    Ok(merged)
}

pub fn compact(
    corpus: &corpus::Corpus,
    sets: &solver::SolutionSets,
    alphabet: &alphabet::Alphabet,
    num_threads: usize,
) -> Result<CompactDataset, PipelineError> {
    let plate_counts = gather_distinct_words(&sets.solved, num_threads)?;

    // Everything below is one single-threaded pass, so ids never depend on
    // how the work above was scheduled.
    let mut distinct = plate_counts.into_iter().collect::<Vec<_>>();
    distinct.sort_unstable_by(|&(a, _), &(b, _)| {
        let a = corpus.get(a);
        let b = corpus.get(b);
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.word.cmp(&b.word))
    });

    let num_plates = sets.solved.len();
    let mut corpus_to_id = vec![0u32; corpus.len()];
    let mut entries = Vec::with_capacity(distinct.len());
    let mut by_word = fash::WordHashMap::default();
    by_word.reserve(distinct.len());
    for (id, &(word_idx, plates_appeared_in)) in (1u32..).zip(distinct.iter()) {
        let corpus_entry = corpus.get(word_idx);
        let w = corpus_entry.word.as_bytes();
        corpus_to_id[word_idx as usize] = id;
        if by_word.insert(corpus_entry.word.clone(), id).is_some() {
            return Err(inconsistent(format!(
                "word {:?} was assigned twice",
                corpus_entry.word
            )));
        }
        entries.push(WordEntry {
            id,
            word: corpus_entry.word.clone(),
            frequency: corpus_entry.frequency,
            length: w.len() as u32,
            rare_letters: alphabet.count_rare(w),
            vowels: alphabet.count_vowels(w),
            first_letter: w.first().map_or(' ', |&c| c as char),
            last_letter: w.last().map_or(' ', |&c| c as char),
            plates_appeared_in,
            popularity: plates_appeared_in as f64 / num_plates.max(1) as f64,
        });
    }

    let mut solved = sets.solved.iter().collect::<Vec<_>>();
    solved.sort_unstable_by(|a, b| a.plate.cmp(&b.plate));
    let mut plates = Vec::with_capacity(solved.len());
    for (id, plate_solutions) in (1u32..).zip(solved.into_iter()) {
        let mut solutions = Vec::with_capacity(plate_solutions.matches.len());
        for m in plate_solutions.matches.iter() {
            let word_id = corpus_to_id[m.word as usize];
            if word_id == 0 {
                return Err(inconsistent(format!(
                    "plate {} references word {:?} that has no id",
                    plate_solutions.plate,
                    corpus.get(m.word).word
                )));
            }
            solutions.push(CompactSolution {
                word_id,
                frequency: m.frequency,
            });
        }
        plates.push(CompactPlate {
            id,
            letters: plate_solutions.plate.clone(),
            solutions: solutions.into_boxed_slice(),
        });
    }

    Ok(CompactDataset {
        dictionary: WordDictionary { entries, by_word },
        plates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(pairs: &[(&str, u64)], plates: &[&str]) -> CompactDataset {
        let alphabet = alphabet::Alphabet::english();
        let corpus = corpus::Corpus::from_pairs(pairs.iter().copied()).unwrap();
        let plates = plates
            .iter()
            .map(|s| plate::Plate::parse(s, &alphabet, s.len()).unwrap())
            .collect::<Vec<_>>();
        let sets = solver::build(&corpus, &plates, 2);
        compact(&corpus, &sets, &alphabet, 2).unwrap()
    }

    #[test]
    fn ids_follow_frequency_then_word() {
        let ds = run(
            &[("scar", 50), ("car", 500), ("scarab", 5), ("arc", 50)],
            &["CAR", "ARC"],
        );
        let v = ds
            .dictionary
            .entries()
            .iter()
            .map(|e| (e.id, e.word.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(v, [(1, "car"), (2, "arc"), (3, "scar"), (4, "scarab")]);
        assert_eq!(ds.dictionary.id_of("scar"), Some(3));
        assert_eq!(ds.dictionary.get(0), None);
        assert_eq!(ds.dictionary.get(5), None);
        ds.verify().unwrap();
    }

    #[test]
    fn shared_word_is_registered_once() {
        let ds = run(&[("car", 500), ("cab", 10)], &["CAR", "CA", "CAB"]);
        let car = ds.dictionary.get(ds.dictionary.id_of("car").unwrap()).unwrap();
        assert_eq!(car.plates_appeared_in, 2);
        assert!((car.popularity - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(
            ds.dictionary
                .entries()
                .iter()
                .filter(|e| e.word == "car")
                .count(),
            1
        );
        ds.verify().unwrap();
    }

    #[test]
    fn plates_are_numbered_by_letters() {
        let ds = run(&[("car", 500), ("bar", 40)], &["CAR", "BAR", "ZZZ", "AR"]);
        let v = ds
            .plates
            .iter()
            .map(|p| (p.id, p.letters.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(v, [(1, "AR"), (2, "BAR"), (3, "CAR")]);
        let ar = ds.plate(1).unwrap();
        assert_eq!(
            ar.solutions[..],
            [
                CompactSolution {
                    word_id: 1,
                    frequency: 500
                },
                CompactSolution {
                    word_id: 2,
                    frequency: 40
                }
            ]
        );
    }

    #[test]
    fn lexical_features() {
        let ds = run(&[("jukebox", 3)], &["JUX"]);
        let e = &ds.dictionary.entries()[0];
        assert_eq!(e.length, 7);
        assert_eq!(e.rare_letters, 3);
        assert_eq!(e.vowels, 3);
        assert_eq!(e.first_letter, 'j');
        assert_eq!(e.last_letter, 'x');
        assert_eq!(e.popularity, 1.0);
    }

    #[test]
    fn verify_catches_corruption() {
        let mut ds = run(&[("car", 500), ("scar", 50)], &["CAR"]);
        ds.verify().unwrap();
        ds.dictionary.entries[1].id = 1;
        let e = ds.verify().unwrap_err();
        assert!(matches!(e, PipelineError::DictionaryConsistency(_)));

        let mut ds = run(&[("car", 500), ("scar", 50)], &["CAR"]);
        let mut solutions = ds.plates[0].solutions.to_vec();
        solutions[1].word_id = 9;
        ds.plates[0].solutions = solutions.into_boxed_slice();
        assert!(ds.verify().is_err());

        let mut ds = run(&[("car", 500), ("scar", 50)], &["CAR"]);
        ds.dictionary.by_word.insert("scar".into(), 1);
        assert!(ds.verify().is_err());
    }
}
