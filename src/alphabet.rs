// Copyright (C) 2020-2026 Andy Kurnia.

use super::error;

// Letters are handled as lowercase ascii bytes. Bit i of a mask is b'a' + i.
pub const ENGLISH_LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DEFAULT_RARE_LETTERS: &str = "jkqvxz";
const VOWELS: &[u8] = b"aeiou";

#[inline(always)]
pub fn letter_bit(c: u8) -> u32 {
    let c = c.to_ascii_lowercase();
    if c.is_ascii_lowercase() {
        1 << (c - b'a')
    } else {
        0
    }
}

// Set of distinct letters in a word, case-insensitive. Non-letters are ignored.
#[inline(always)]
pub fn mask_of(word: &[u8]) -> u32 {
    word.iter().fold(0, |acc, &c| acc | letter_bit(c))
}

#[inline(always)]
pub fn is_vowel(c: u8) -> bool {
    VOWELS.contains(&c.to_ascii_lowercase())
}

#[derive(Clone, Debug)]
pub struct Alphabet {
    letters: Box<[u8]>, // sorted, deduplicated, lowercase
    mask: u32,
    rare_mask: u32,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::english()
    }
}

fn parse_letters(what: &str, s: &str) -> error::Returns<Vec<u8>> {
    let mut v = Vec::with_capacity(s.len());
    for c in s.chars() {
        if !c.is_ascii_alphabetic() {
            return_error!(format!("invalid letter {:?} in {} {:?}", c, what, s));
        }
        v.push((c as u8).to_ascii_lowercase());
    }
    v.sort_unstable();
    v.dedup();
    Ok(v)
}

impl Alphabet {
    pub fn english() -> Self {
        Self {
            letters: ENGLISH_LETTERS.as_bytes().into(),
            mask: mask_of(ENGLISH_LETTERS.as_bytes()),
            rare_mask: mask_of(DEFAULT_RARE_LETTERS.as_bytes()),
        }
    }

    // The working alphabet must be a non-empty subset of a-z.
    // Rare letters outside the working alphabet are still counted in words.
    pub fn new(letters: &str, rare_letters: &str) -> error::Returns<Self> {
        let letters = parse_letters("alphabet", letters)?;
        if letters.is_empty() {
            return_error!("alphabet is empty".into());
        }
        let rare = parse_letters("rare letters", rare_letters)?;
        Ok(Self {
            mask: mask_of(&letters),
            letters: letters.into_boxed_slice(),
            rare_mask: mask_of(&rare),
        })
    }

    #[inline(always)]
    pub fn letters(&self) -> &[u8] {
        &self.letters
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    #[inline(always)]
    pub fn contains(&self, c: u8) -> bool {
        let bit = letter_bit(c);
        bit != 0 && self.mask & bit != 0
    }

    #[inline(always)]
    pub fn is_rare(&self, c: u8) -> bool {
        self.rare_mask & letter_bit(c) != 0
    }

    pub fn count_rare(&self, word: &[u8]) -> u32 {
        word.iter().filter(|&&c| self.is_rare(c)).count() as u32
    }

    pub fn count_vowels(&self, word: &[u8]) -> u32 {
        word.iter().filter(|&&c| is_vowel(c)).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_has_26_letters() {
        let a = Alphabet::english();
        assert_eq!(a.len(), 26);
        assert!(a.contains(b'q'));
        assert!(a.contains(b'Q'));
        assert!(!a.contains(b'-'));
        assert!(a.is_rare(b'z'));
        assert!(!a.is_rare(b'e'));
    }

    #[test]
    fn custom_alphabet_is_sorted_and_deduplicated() {
        let a = Alphabet::new("cbaCB", "x").unwrap();
        assert_eq!(a.letters(), b"abc");
        assert!(!a.contains(b'd'));
        assert!(a.is_rare(b'X'));
    }

    #[test]
    fn rejects_non_letters() {
        assert!(Alphabet::new("ab1", "").is_err());
        assert!(Alphabet::new("", "").is_err());
        assert!(Alphabet::new("abc", "z!").is_err());
    }

    #[test]
    fn word_features() {
        let a = Alphabet::english();
        assert_eq!(a.count_vowels(b"scarab"), 2);
        assert_eq!(a.count_rare(b"jukebox"), 3);
        assert_eq!(a.count_rare(b"car"), 0);
        assert_eq!(mask_of(b"Cab"), 0b111);
    }

    #[test]
    fn long_words_do_not_wrap_counts() {
        let a = Alphabet::english();
        let word = "za".repeat(300);
        assert_eq!(a.count_rare(word.as_bytes()), 300);
        assert_eq!(a.count_vowels(word.as_bytes()), 300);
    }
}
