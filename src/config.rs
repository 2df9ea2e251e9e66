// Copyright (C) 2026 Andy Kurnia.

use super::{alphabet, emit, error::PipelineError, plate, rarity};

pub const DEFAULT_PLATE_LENGTH: usize = 3;
pub const DEFAULT_CHUNK_SIZE: usize = 500;

// Every field may be omitted from the config file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub plate_length: usize,
    pub alphabet: String,
    pub rare_letters: String,
    // 0 means one per cpu.
    pub num_threads: usize,
    pub chunk_size: usize,
    pub formats: Vec<emit::FormatKind>,
    pub canonical_tiers: rarity::TierScheme,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            plate_length: DEFAULT_PLATE_LENGTH,
            alphabet: alphabet::ENGLISH_LETTERS.to_string(),
            rare_letters: alphabet::DEFAULT_RARE_LETTERS.to_string(),
            num_threads: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            formats: emit::FormatKind::ALL.to_vec(),
            canonical_tiers: rarity::TierScheme::StdDev,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json_str(giant_string: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(giant_string).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn load(path: &std::path::Path) -> Result<Self, PipelineError> {
        let giant_string = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&giant_string)
    }

    // Checks everything up front and builds the working alphabet.
    pub fn validate(&self) -> Result<alphabet::Alphabet, PipelineError> {
        if self.plate_length == 0 || self.plate_length > plate::MAX_PLATE_LENGTH {
            return Err(PipelineError::Config(format!(
                "plate_length {} is outside 1..={}",
                self.plate_length,
                plate::MAX_PLATE_LENGTH
            )));
        }
        if self.chunk_size == 0 {
            return Err(PipelineError::Config("chunk_size must be positive".into()));
        }
        if self.formats.is_empty() {
            return Err(PipelineError::Config("no output formats selected".into()));
        }
        alphabet::Alphabet::new(&self.alphabet, &self.rare_letters)
            .map_err(|e| PipelineError::Config(e.to_string()))
    }

    // Distinct formats in a fixed order, each carrying its parameters.
    pub fn output_formats(&self) -> Vec<emit::Format> {
        let mut kinds = self.formats.clone();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
            .into_iter()
            .map(|kind| emit::Format::new(kind, self.chunk_size))
            .collect()
    }
}
