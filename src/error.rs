// Copyright (C) 2020-2026 Andy Kurnia.

// Ad-hoc failures that do not belong to the pipeline taxonomy.
pub struct MyError {
    s: String,
}

impl std::fmt::Display for MyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.s)
    }
}

impl std::fmt::Debug for MyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        (self as &dyn std::fmt::Display).fmt(f)
    }
}

impl std::error::Error for MyError {}

pub fn new(s: String) -> MyError {
    MyError { s }
}

// Send + Sync so that errors can cross worker and emitter threads.
pub type BoxAnyError = Box<dyn std::error::Error + Send + Sync>;
pub type Returns<T> = Result<T, BoxAnyError>;

#[macro_export]
macro_rules! return_error {
    ($error:expr) => {
        return Err($crate::error::new($error).into());
    };
}

/// Failures the pipeline distinguishes.
///
/// `CorpusLoad`, `DictionaryConsistency` and `Config` abort the run before
/// anything is written. The per-plate and per-format variants are collected
/// into the run report and the run continues without that plate or format.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot load corpus {path}: {reason}")]
    CorpusLoad { path: String, reason: String },

    #[error("cannot load information model {path}: {reason}")]
    InfoModelLoad { path: String, reason: String },

    #[error("plate {plate}: {reason}")]
    PlateMatch { plate: String, reason: String },

    #[error("word dictionary is inconsistent: {0}")]
    DictionaryConsistency(String),

    #[error("plate {plate}: cannot compute rarity: {reason}")]
    RarityComputation { plate: String, reason: String },

    #[error("cannot emit {format} output: {reason}")]
    Serialization { format: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    // Fatal errors stop the run before any artifact is written.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::CorpusLoad { .. }
                | PipelineError::InfoModelLoad { .. }
                | PipelineError::DictionaryConsistency(_)
                | PipelineError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bail(x: i32) -> Returns<i32> {
        if x < 0 {
            crate::return_error!(format!("negative input {}", x));
        }
        Ok(x)
    }

    #[test]
    fn return_error_boxes_message() {
        assert_eq!(bail(3).unwrap(), 3);
        assert_eq!(bail(-1).unwrap_err().to_string(), "negative input -1");
    }

    #[test]
    fn fatal_classification() {
        assert!(PipelineError::DictionaryConsistency("gap".into()).is_fatal());
        assert!(
            !PipelineError::PlateMatch {
                plate: "QQQ".into(),
                reason: "x".into()
            }
            .is_fatal()
        );
        assert!(
            !PipelineError::Serialization {
                format: "chunked".into(),
                reason: "disk full".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn display_names_the_plate() {
        let e = PipelineError::RarityComputation {
            plate: "CAR".into(),
            reason: "no solutions".into(),
        };
        assert_eq!(e.to_string(), "plate CAR: cannot compute rarity: no solutions");
    }
}
