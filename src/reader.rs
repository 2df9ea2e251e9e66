// Copyright (C) 2026 Andy Kurnia.

use super::{dictionary, emit, error, rarity};
use std::collections::BTreeMap;

/// Read-only view of an emitted `dataset.json`.
///
/// Answers the questions clients ask (word by id, plate by id or letters,
/// tier membership) without recomputing any matching or scoring.
pub struct DatasetIndex {
    record: emit::MonolithicRecord<'static>,
    plate_ids: BTreeMap<String, u32>,
}

impl DatasetIndex {
    pub fn from_json_str(giant_string: &str) -> error::Returns<Self> {
        let record = serde_json::from_str::<emit::MonolithicRecord<'static>>(giant_string)?;
        for (&id, entry) in record.words.iter() {
            if entry.id != id {
                return_error!(format!("word {:?} is filed under id {}", entry.word, id));
            }
        }
        let mut plate_ids = BTreeMap::new();
        for (&id, plate) in record.plates.iter() {
            for solution in plate.solutions.iter() {
                if !record.words.contains_key(&solution.word_id) {
                    return_error!(format!(
                        "plate {} references unknown word id {}",
                        plate.letters, solution.word_id
                    ));
                }
            }
            if plate_ids.insert(plate.letters.to_string(), id).is_some() {
                return_error!(format!("plate {} appears twice", plate.letters));
            }
        }
        Ok(Self { record, plate_ids })
    }

    pub fn load(path: &std::path::Path) -> error::Returns<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn word(&self, id: u32) -> Option<&dictionary::WordEntry> {
        self.record.words.get(&id).map(|x| x.as_ref())
    }

    pub fn plate(&self, id: u32) -> Option<&emit::PlateRecord<'static>> {
        self.record.plates.get(&id)
    }

    pub fn plate_id(&self, letters: &str) -> Option<u32> {
        self.plate_ids.get(&letters.to_ascii_uppercase()).copied()
    }

    pub fn plate_by_letters(&self, letters: &str) -> Option<&emit::PlateRecord<'static>> {
        self.plate_id(letters).and_then(|id| self.plate(id))
    }

    // Words of one plate with their frequencies, in stored order.
    pub fn solutions(&self, plate_id: u32) -> Option<Vec<(&dictionary::WordEntry, u64)>> {
        let plate = self.plate(plate_id)?;
        plate
            .solutions
            .iter()
            .map(|s| self.word(s.word_id).map(|entry| (entry, s.frequency)))
            .collect()
    }

    pub fn num_plates(&self) -> usize {
        self.record.plates.len()
    }

    pub fn num_words(&self) -> usize {
        self.record.words.len()
    }

    pub fn canonical_scheme(&self) -> rarity::TierScheme {
        self.record.indexes.canonical_tiers
    }

    pub fn statistics(&self) -> &rarity::RarityStatistics {
        &self.record.indexes.rarity_tiers.statistics
    }

    pub fn tiers(&self, scheme: rarity::TierScheme) -> Option<&rarity::TierIndex> {
        let indexes = &self.record.indexes;
        [&indexes.rarity_tiers, &indexes.alternative_tiers]
            .into_iter()
            .find(|x| x.scheme == scheme)
            .map(|x| x.tiers.as_ref())
    }

    pub fn canonical_tiers(&self) -> &rarity::TierIndex {
        &self.record.indexes.rarity_tiers.tiers
    }

    pub fn tier_of(&self, plate_id: u32) -> Option<rarity::Tier> {
        self.canonical_tiers().tier_of(plate_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alphabet, corpus, info, plate, solver};

    fn index() -> DatasetIndex {
        let alphabet = alphabet::Alphabet::english();
        let corpus = corpus::Corpus::from_pairs([
            ("car", 500),
            ("scar", 50),
            ("scarab", 5),
            ("cab", 40),
        ])
        .unwrap();
        let plates = ["CAR", "CAB", "SCR"].map(|s| plate::Plate::parse(s, &alphabet, 3).unwrap());
        let sets = solver::build(&corpus, &plates, 2);
        let compact = dictionary::compact(&corpus, &sets, &alphabet, 2).unwrap();
        let scores = rarity::score_all(&compact, &info::NoInfo, rarity::TierScheme::StdDev, 2);
        let dataset = emit::Dataset::new(compact, scores).unwrap();
        let json = serde_json::to_string(&emit::monolithic_record(&dataset)).unwrap();
        DatasetIndex::from_json_str(&json).unwrap()
    }

    #[test]
    fn resolves_plates_and_words() {
        let ix = index();
        assert_eq!(ix.num_plates(), 3);
        assert_eq!(ix.num_words(), 4);
        let id = ix.plate_id("car").unwrap();
        assert_eq!(ix.plate(id).unwrap().letters, "CAR");
        assert_eq!(ix.plate_by_letters("CAR").unwrap().rarity, 54.07);
        let words = ix
            .solutions(id)
            .unwrap()
            .into_iter()
            .map(|(entry, frequency)| (entry.word.as_str(), frequency))
            .collect::<Vec<_>>();
        assert_eq!(words, [("car", 500), ("scar", 50), ("scarab", 5)]);
        assert_eq!(ix.word(1).unwrap().word, "car");
        assert!(ix.word(0).is_none());
        assert!(ix.plate_by_letters("ZZZ").is_none());
    }

    #[test]
    fn every_plate_has_one_tier() {
        let ix = index();
        for id in 1..=3 {
            assert!(ix.tier_of(id).is_some());
        }
        assert_eq!(ix.canonical_scheme(), rarity::TierScheme::StdDev);
        assert_eq!(ix.statistics().count, 3);
        assert_eq!(ix.tiers(rarity::TierScheme::Percentile).unwrap().len(), 3);
    }

    #[test]
    fn dangling_word_id_is_rejected() {
        let ix = index();
        let mut value = serde_json::to_value(&ix.record).unwrap();
        value["plates"]["1"]["solutions"][0]["word_id"] = serde_json::json!(99);
        assert!(DatasetIndex::from_json_str(&value.to_string()).is_err());
    }
}
