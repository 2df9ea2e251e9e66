// Copyright (C) 2026 Andy Kurnia.

use super::{error::PipelineError, fash, plate};

// Supplies the average surprisal (in bits) of a plate's solutions.
// None means "no opinion" and is scored as 0 bits.
pub trait InfoSource: Sync {
    fn avg_info_bits(&self, plate: &plate::Plate) -> Option<f64>;
}

// Used when no information model is configured.
pub struct NoInfo;

impl InfoSource for NoInfo {
    #[inline(always)]
    fn avg_info_bits(&self, _plate: &plate::Plate) -> Option<f64> {
        None
    }
}

#[derive(serde::Deserialize)]
struct InfoRecord {
    avg_info_bits: f64,
}

/// Information metric loaded from `{"CAR": {"avg_info_bits": 9.5}, ..}`.
/// Keys are case-insensitive.
#[derive(Default)]
pub struct InfoModel {
    bits: fash::WordHashMap<String, f64>,
}

impl InfoModel {
    pub fn from_json_str(giant_string: &str, origin: &str) -> Result<Self, PipelineError> {
        let raw = serde_json::from_str::<std::collections::BTreeMap<String, InfoRecord>>(
            giant_string,
        )
        .map_err(|e| PipelineError::InfoModelLoad {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        // Keys are visited in sorted order, so among spellings of one plate
        // the first (most upper-case) one wins on every run.
        let mut bits = fash::WordHashMap::default();
        for (key, record) in raw {
            let plate = key.trim().to_ascii_uppercase();
            match bits.entry(plate) {
                std::collections::hash_map::Entry::Occupied(e) => {
                    log::warn!(
                        "{}: ignoring {:?}, plate {} is already listed",
                        origin,
                        key,
                        e.key()
                    );
                }
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(record.avg_info_bits);
                }
            }
        }
        Ok(Self { bits })
    }

    pub fn load(path: &std::path::Path) -> Result<Self, PipelineError> {
        let origin = path.display().to_string();
        let giant_string =
            std::fs::read_to_string(path).map_err(|e| PipelineError::InfoModelLoad {
                path: origin.clone(),
                reason: e.to_string(),
            })?;
        Self::from_json_str(&giant_string, &origin)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for InfoModel {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self {
            bits: iter
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_ascii_uppercase(), v))
                .fold(fash::WordHashMap::default(), |mut bits, (k, v)| {
                    bits.entry(k).or_insert(v);
                    bits
                }),
        }
    }
}

impl InfoSource for InfoModel {
    #[inline(always)]
    fn avg_info_bits(&self, plate: &plate::Plate) -> Option<f64> {
        self.bits.get(plate.as_str()).copied()
    }
}
