// Copyright (C) 2026 Andy Kurnia.

use super::{alphabet, error};

pub const MAX_PLATE_LENGTH: usize = 8;

// Largest plate space enumerate() will build (26 letters, length 5).
// Longer plates need an explicit plate list.
pub const MAX_PLATE_SPACE: usize = 26 * 26 * 26 * 26 * 26;

/// A fixed-length letter code, stored uppercase (`"CAR"`).
///
/// Ordering is lexicographic on the letters, which is also the order plate ids
/// are handed out in.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Plate(String);

impl Plate {
    pub fn parse(s: &str, alphabet: &alphabet::Alphabet, len: usize) -> error::Returns<Self> {
        let s = s.trim();
        if s.len() != len {
            return_error!(format!(
                "plate {:?} has {} letters, expected {}",
                s,
                s.chars().count(),
                len
            ));
        }
        for c in s.bytes() {
            if !alphabet.contains(c) {
                return_error!(format!(
                    "plate {:?} has letter {:?} outside the working alphabet",
                    s, c as char
                ));
            }
        }
        Ok(Plate(s.to_ascii_uppercase()))
    }

    #[inline(always)]
    fn from_lowercase(letters: &[u8]) -> Self {
        Plate(letters.iter().map(|&c| c.to_ascii_uppercase() as char).collect())
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Plate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn plate_space_size(alphabet: &alphabet::Alphabet, len: usize) -> Option<usize> {
    alphabet.len().checked_pow(len as u32)
}

// Every plate of the given length, in lexicographic order (AAA, AAB, .., ZZZ).
pub fn enumerate(alphabet: &alphabet::Alphabet, len: usize) -> error::Returns<Vec<Plate>> {
    if len == 0 || len > MAX_PLATE_LENGTH {
        return_error!(format!(
            "plate length {} is outside 1..={}",
            len, MAX_PLATE_LENGTH
        ));
    }
    let letters = alphabet.letters();
    let total = match plate_space_size(alphabet, len) {
        Some(x) if x <= MAX_PLATE_SPACE => x,
        _ => {
            return_error!(format!(
                "{} letters at length {} is more than {} plates, use a plate list",
                letters.len(),
                len,
                MAX_PLATE_SPACE
            ));
        }
    };
    let mut plates = Vec::new();
    plates.try_reserve_exact(total)?;
    // odometer over alphabet positions, rightmost wheel turns fastest.
    let mut wheels = vec![0usize; len];
    let mut buf = vec![letters[0]; len];
    'outer: loop {
        plates.push(Plate::from_lowercase(&buf));
        let mut i = len;
        loop {
            if i == 0 {
                break 'outer;
            }
            i -= 1;
            wheels[i] += 1;
            if wheels[i] < letters.len() {
                buf[i] = letters[wheels[i]];
                break;
            }
            wheels[i] = 0;
            buf[i] = letters[0];
        }
    }
    debug_assert_eq!(plates.len(), total);
    Ok(plates)
}

/// Result of reading an explicit plate list.
pub struct PlateList {
    pub plates: Vec<Plate>,
    pub rejected: Vec<error::PipelineError>,
}

// One plate per line. Blank lines and lines starting with '#' are ignored.
// Output is sorted and deduplicated.
pub fn read_plate_list(giant_string: &str, alphabet: &alphabet::Alphabet, len: usize) -> PlateList {
    let mut plates = Vec::new();
    let mut rejected = Vec::new();
    for line in giant_string.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Plate::parse(line, alphabet, len) {
            Ok(plate) => plates.push(plate),
            Err(e) => {
                log::warn!("skipping plate {:?}: {}", line, e);
                rejected.push(error::PipelineError::PlateMatch {
                    plate: line.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    plates.sort_unstable();
    plates.dedup();
    PlateList { plates, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_full_space_in_order() {
        let plates = enumerate(&alphabet::Alphabet::english(), 3).unwrap();
        assert_eq!(plates.len(), 17_576);
        assert_eq!(plates[0].as_str(), "AAA");
        assert_eq!(plates[1].as_str(), "AAB");
        assert_eq!(plates[26].as_str(), "ABA");
        assert_eq!(plates.last().unwrap().as_str(), "ZZZ");
        assert!(plates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn enumerates_small_alphabet() {
        let a = alphabet::Alphabet::new("ba", "").unwrap();
        let plates = enumerate(&a, 2).unwrap();
        let v = plates.iter().map(|p| p.as_str()).collect::<Vec<_>>();
        assert_eq!(v, ["AA", "AB", "BA", "BB"]);
    }

    #[test]
    fn rejects_bad_lengths() {
        let a = alphabet::Alphabet::english();
        assert!(enumerate(&a, 0).is_err());
        assert!(enumerate(&a, MAX_PLATE_LENGTH + 1).is_err());
    }

    #[test]
    fn refuses_huge_plate_space() {
        let a = alphabet::Alphabet::english();
        assert_eq!(plate_space_size(&a, 8), Some(208_827_064_576));
        assert!(enumerate(&a, 8).is_err());
        assert!(enumerate(&a, 6).is_err());
        // same length is fine over a smaller alphabet
        let small = alphabet::Alphabet::new("ab", "").unwrap();
        assert_eq!(enumerate(&small, 8).unwrap().len(), 256);
        // and explicit lists are not limited
        let list = read_plate_list("ABCDEFGH\n", &a, 8);
        assert_eq!(list.plates.len(), 1);
    }

    #[test]
    fn parse_normalizes_case() {
        let a = alphabet::Alphabet::english();
        assert_eq!(Plate::parse(" car ", &a, 3).unwrap().as_str(), "CAR");
        assert!(Plate::parse("CA", &a, 3).is_err());
        assert!(Plate::parse("C4R", &a, 3).is_err());
    }

    #[test]
    fn plate_list_skips_and_reports() {
        let a = alphabet::Alphabet::new("abcr", "").unwrap();
        let list = read_plate_list("car\n# comment\n\nCAR\nbad!\nzzz\nabc\n", &a, 3);
        let v = list.plates.iter().map(|p| p.as_str()).collect::<Vec<_>>();
        assert_eq!(v, ["ABC", "CAR"]);
        assert_eq!(list.rejected.len(), 2);
        assert!(matches!(
            &list.rejected[0],
            error::PipelineError::PlateMatch { plate, .. } if plate == "bad!"
        ));
    }
}
