// Copyright (C) 2026 Andy Kurnia.

use super::{alphabet, error::PipelineError, fash};
use std::str::FromStr;

pub struct CorpusEntry {
    pub word: String, // lowercase a-z
    pub frequency: u64,
    pub mask: u32, // alphabet::mask_of(word)
}

/// The read-only vocabulary, sorted by word.
///
/// Index order is therefore alphabetical, which the solution builder relies on
/// to break frequency ties without comparing strings.
pub struct Corpus {
    entries: Box<[CorpusEntry]>,
    skipped: usize,
}

// Why a raw entry was not accepted. None means accepted.
fn reject_reason(word: &str) -> Option<&'static str> {
    if word.is_empty() {
        Some("empty word")
    } else if !word.bytes().all(|c| c.is_ascii_lowercase()) {
        Some("non-alphabetic word")
    } else {
        None
    }
}

struct CorpusBuilder {
    words: fash::WordHashMap<String, u64>,
    skipped: usize,
}

impl CorpusBuilder {
    fn new() -> Self {
        Self {
            words: Default::default(),
            skipped: 0,
        }
    }

    fn skip(&mut self, origin: &str, what: &str, why: &str) {
        log::warn!("{}: skipping {:?}: {}", origin, what, why);
        self.skipped += 1;
    }

    fn push(&mut self, origin: &str, word: &str, frequency: Option<u64>) {
        let word = word.trim().to_ascii_lowercase();
        if let Some(why) = reject_reason(&word) {
            self.skip(origin, &word, why);
            return;
        }
        let Some(frequency) = frequency else {
            self.skip(origin, &word, "missing or invalid frequency");
            return;
        };
        match self.words.entry(word) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                log::warn!(
                    "{}: duplicate word {:?}, keeping the higher frequency",
                    origin,
                    e.key()
                );
                let v = e.get_mut();
                *v = (*v).max(frequency);
            }
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(frequency);
            }
        }
    }

    fn build(self, origin: &str) -> Result<Corpus, PipelineError> {
        if self.words.is_empty() {
            return Err(PipelineError::CorpusLoad {
                path: origin.to_string(),
                reason: format!("no valid entries ({} skipped)", self.skipped),
            });
        }
        let mut entries = self
            .words
            .into_iter()
            .map(|(word, frequency)| CorpusEntry {
                mask: alphabet::mask_of(word.as_bytes()),
                word,
                frequency,
            })
            .collect::<Vec<_>>();
        entries.sort_unstable_by(|a, b| a.word.cmp(&b.word));
        Ok(Corpus {
            entries: entries.into_boxed_slice(),
            skipped: self.skipped,
        })
    }
}

fn load_error(origin: &str, reason: impl std::fmt::Display) -> PipelineError {
    PipelineError::CorpusLoad {
        path: origin.to_string(),
        reason: reason.to_string(),
    }
}

impl Corpus {
    pub fn from_pairs<S: AsRef<str>, I: IntoIterator<Item = (S, u64)>>(
        pairs: I,
    ) -> Result<Self, PipelineError> {
        let mut builder = CorpusBuilder::new();
        for (word, frequency) in pairs {
            builder.push("corpus", word.as_ref(), Some(frequency));
        }
        builder.build("corpus")
    }

    // Rows are word,frequency. A first row whose frequency is not a number is
    // taken to be a header.
    pub fn from_csv_reader<R: std::io::Read>(f: R, origin: &str) -> Result<Self, PipelineError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(f);
        let mut builder = CorpusBuilder::new();
        for (row_num, result) in csv_reader.records().enumerate() {
            let record = result.map_err(|e| load_error(origin, e))?;
            let word = record.get(0).unwrap_or("");
            let frequency = record.get(1).and_then(|x| u64::from_str(x).ok());
            if row_num == 0 && frequency.is_none() && record.len() >= 2 {
                log::debug!("{}: treating {:?} as header", origin, record);
                continue;
            }
            builder.push(origin, word, frequency);
        }
        builder.build(origin)
    }

    // Either {"word": frequency, ..} or [{"word": .., "frequency": ..}, ..].
    pub fn from_json_str(giant_string: &str, origin: &str) -> Result<Self, PipelineError> {
        let value = serde_json::from_str::<serde_json::Value>(giant_string)
            .map_err(|e| load_error(origin, e))?;
        let mut builder = CorpusBuilder::new();
        match value {
            serde_json::Value::Object(map) => {
                for (word, frequency) in map.iter() {
                    builder.push(origin, word, frequency.as_u64());
                }
            }
            serde_json::Value::Array(records) => {
                for record in records.iter() {
                    match record.get("word").and_then(|w| w.as_str()) {
                        Some(word) => builder.push(
                            origin,
                            word,
                            record.get("frequency").and_then(|x| x.as_u64()),
                        ),
                        None => builder.skip(origin, &record.to_string(), "record has no word"),
                    }
                }
            }
            _ => {
                return Err(load_error(
                    origin,
                    "expected a JSON object or an array of records",
                ));
            }
        }
        builder.build(origin)
    }

    // .json files are JSON, everything else is CSV.
    pub fn load(path: &std::path::Path) -> Result<Self, PipelineError> {
        let origin = path.display().to_string();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let giant_string =
                std::fs::read_to_string(path).map_err(|e| load_error(&origin, e))?;
            Self::from_json_str(&giant_string, &origin)
        } else {
            let f = std::fs::File::open(path).map_err(|e| load_error(&origin, e))?;
            Self::from_csv_reader(std::io::BufReader::new(f), &origin)
        }
    }

    #[inline(always)]
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    #[inline(always)]
    pub fn get(&self, idx: u32) -> &CorpusEntry {
        &self.entries[idx as usize]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Number of malformed entries dropped while loading.
    #[inline(always)]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
