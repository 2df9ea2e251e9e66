// Copyright (C) 2026 Andy Kurnia.

use super::{emit, error, error::PipelineError};

pub const REPORT_FILE: &str = "report.json";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SkippedPlate {
    pub plate: String,
    pub reason: String,
}

impl From<&PipelineError> for SkippedPlate {
    fn from(e: &PipelineError) -> Self {
        match e {
            PipelineError::PlateMatch { plate, reason }
            | PipelineError::RarityComputation { plate, reason } => Self {
                plate: plate.clone(),
                reason: reason.clone(),
            },
            other => Self {
                plate: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FormatReport {
    pub format: String,
    pub ok: bool,
    pub files: usize,
    pub bytes: u64,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StageSeconds {
    pub matching: f64,
    pub compaction: f64,
    pub scoring: f64,
    pub emission: f64,
}

/// Summary of one run. The only output that carries timings.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub corpus_words: usize,
    pub corpus_skipped: usize,
    pub plates_considered: usize,
    pub plates_with_solutions: usize,
    pub plates_empty: usize,
    pub plates_emitted: usize,
    pub total_solutions: usize,
    pub unique_words: usize,
    pub skipped_plates: Vec<SkippedPlate>,
    pub rarity_failures: Vec<SkippedPlate>,
    pub formats: Vec<FormatReport>,
    pub stage_seconds: StageSeconds,
}

impl RunReport {
    pub fn record_emission(&mut self, emitted: &emit::EmitReport) {
        self.formats.clear();
        for outcome in emitted.outcomes.iter() {
            self.formats.push(FormatReport {
                format: outcome.format.to_string(),
                ok: true,
                files: outcome.files,
                bytes: outcome.bytes,
                error: None,
            });
        }
        for e in emitted.failed.iter() {
            let (format, reason) = match e {
                PipelineError::Serialization { format, reason } => (format.clone(), reason.clone()),
                other => (String::new(), other.to_string()),
            };
            self.formats.push(FormatReport {
                format,
                ok: false,
                files: 0,
                bytes: 0,
                error: Some(reason),
            });
        }
        self.formats.sort_by(|a, b| a.format.cmp(&b.format));
    }

    pub fn failed_formats(&self) -> usize {
        self.formats.iter().filter(|x| !x.ok).count()
    }

    pub fn write(&self, out_dir: &std::path::Path) -> error::Returns<u64> {
        emit::write_atomic(&out_dir.join(REPORT_FILE), |w| {
            serde_json::to_writer_pretty(&mut *w, self)?;
            w.write_all(b"\n")?;
            Ok(())
        })
    }

    pub fn log_summary(&self) {
        log::info!(
            "{} plates considered, {} with solutions, {} empty, {} emitted",
            self.plates_considered,
            self.plates_with_solutions,
            self.plates_empty,
            self.plates_emitted
        );
        log::info!(
            "{} solutions over {} distinct words ({} corpus words, {} corpus lines skipped)",
            self.total_solutions,
            self.unique_words,
            self.corpus_words,
            self.corpus_skipped
        );
        if !self.skipped_plates.is_empty() {
            log::warn!("{} plates skipped", self.skipped_plates.len());
        }
        if !self.rarity_failures.is_empty() {
            log::warn!("{} plates could not be scored", self.rarity_failures.len());
        }
        for f in self.formats.iter() {
            match &f.error {
                None => log::info!("{}: {} files, {} bytes", f.format, f.files, f.bytes),
                Some(reason) => log::error!("{}: failed: {}", f.format, reason),
            }
        }
    }
}
