// Copyright (C) 2026 Andy Kurnia.

use super::{alphabet, plate};

// A word matches a plate if the plate's letters occur in the word in order,
// not necessarily adjacent. Case-insensitive. Repeated plate letters need
// repeated occurrences. Empty inputs are rejected before getting here.
#[inline(always)]
pub fn matches(plate: &[u8], word: &[u8]) -> bool {
    let mut p = 0;
    for &c in word {
        if p == plate.len() {
            break;
        }
        if c.eq_ignore_ascii_case(&plate[p]) {
            p += 1;
        }
    }
    p == plate.len()
}

// Leftmost positions in word used by the match, or None if no match.
pub fn match_positions(plate: &[u8], word: &[u8]) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(plate.len());
    for (i, &c) in word.iter().enumerate() {
        if positions.len() == plate.len() {
            break;
        }
        if c.eq_ignore_ascii_case(&plate[positions.len()]) {
            positions.push(i);
        }
    }
    if positions.len() == plate.len() {
        Some(positions)
    } else {
        None
    }
}

/// One plate, prepared for scanning a whole corpus.
///
/// The letter mask lets most words be rejected without a scan: a word that
/// lacks any of the plate's letters, or is shorter than the plate, can never
/// match.
pub struct PlateMatcher {
    letters: Box<[u8]>, // lowercase
    mask: u32,
}

impl PlateMatcher {
    pub fn new(plate: &plate::Plate) -> Self {
        let letters = plate
            .as_bytes()
            .iter()
            .map(|c| c.to_ascii_lowercase())
            .collect::<Box<[u8]>>();
        let mask = alphabet::mask_of(&letters);
        Self { letters, mask }
    }

    // word_mask must be alphabet::mask_of(word).
    #[inline(always)]
    pub fn is_match(&self, word: &[u8], word_mask: u32) -> bool {
        word.len() >= self.letters.len()
            && word_mask & self.mask == self.mask
            && matches(&self.letters, word)
    }
}
