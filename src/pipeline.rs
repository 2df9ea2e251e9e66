// Copyright (C) 2026 Andy Kurnia.

use super::{
    config, corpus, dictionary, emit, error, error::PipelineError, info, plate, pool, rarity,
    report, solver,
};
use std::path::Path;

/// Everything a run reads.
pub struct Sources {
    pub corpus: corpus::Corpus,
    pub info: Box<dyn info::InfoSource + Send>,
    // One plate per line. None enumerates the whole plate space.
    pub plate_list: Option<String>,
}

impl Sources {
    pub fn new(corpus: corpus::Corpus) -> Self {
        Self {
            corpus,
            info: Box::new(info::NoInfo),
            plate_list: None,
        }
    }

    pub fn load(
        corpus_path: &Path,
        info_path: Option<&Path>,
        plates_path: Option<&Path>,
    ) -> Result<Self, PipelineError> {
        let t0 = std::time::Instant::now();
        let corpus = corpus::Corpus::load(corpus_path)?;
        log::info!(
            "{:?} for reading {} words from {}",
            t0.elapsed(),
            corpus.len(),
            corpus_path.display()
        );
        let info: Box<dyn info::InfoSource + Send> = match info_path {
            Some(path) => {
                let t0 = std::time::Instant::now();
                let model = info::InfoModel::load(path)?;
                log::info!(
                    "{:?} for reading information for {} plates",
                    t0.elapsed(),
                    model.len()
                );
                Box::new(model)
            }
            None => Box::new(info::NoInfo),
        };
        let plate_list = match plates_path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?,
            ),
            None => None,
        };
        Ok(Self {
            corpus,
            info,
            plate_list,
        })
    }
}

// The CPU stages. Each one waits for the previous one to finish completely
// and only reads what it produced.
pub fn build(
    config: &config::GeneratorConfig,
    sources: &Sources,
) -> Result<(emit::Dataset, report::RunReport), PipelineError> {
    let alphabet = config.validate()?;
    let num_threads = pool::num_threads(config.num_threads);
    let mut run_report = report::RunReport {
        corpus_words: sources.corpus.len(),
        corpus_skipped: sources.corpus.skipped(),
        ..Default::default()
    };

    let plates = match &sources.plate_list {
        Some(giant_string) => {
            let list = plate::read_plate_list(giant_string, &alphabet, config.plate_length);
            run_report
                .skipped_plates
                .extend(list.rejected.iter().map(report::SkippedPlate::from));
            list.plates
        }
        None => plate::enumerate(&alphabet, config.plate_length)
            .map_err(|e| PipelineError::Config(e.to_string()))?,
    };

    let t0 = std::time::Instant::now();
    let sets = solver::build(&sources.corpus, &plates, num_threads);
    run_report.stage_seconds.matching = t0.elapsed().as_secs_f64();
    log::info!(
        "{:?} for matching {} plates against {} words on {} threads",
        t0.elapsed(),
        plates.len(),
        sources.corpus.len(),
        num_threads
    );
    run_report.plates_considered = sets.plates_considered;
    run_report.plates_with_solutions = sets.solved.len();
    run_report.plates_empty = sets.empty.len();
    run_report
        .skipped_plates
        .extend(sets.failed.iter().map(report::SkippedPlate::from));

    let t0 = std::time::Instant::now();
    let compact = dictionary::compact(&sources.corpus, &sets, &alphabet, num_threads)?;
    drop(sets);
    run_report.stage_seconds.compaction = t0.elapsed().as_secs_f64();
    log::info!(
        "{:?} for compacting {} solutions into {} distinct words",
        t0.elapsed(),
        compact.total_solutions(),
        compact.dictionary.len()
    );

    let t0 = std::time::Instant::now();
    let index = rarity::score_all(
        &compact,
        &*sources.info,
        config.canonical_tiers,
        num_threads,
    );
    run_report.stage_seconds.scoring = t0.elapsed().as_secs_f64();
    log::info!(
        "{:?} for scoring {} plates (mean {:.2}, stddev {:.2})",
        t0.elapsed(),
        index.scores.len(),
        index.statistics.mean,
        index.statistics.stddev
    );
    run_report.rarity_failures = index
        .failed
        .iter()
        .map(report::SkippedPlate::from)
        .collect();

    let dataset = emit::Dataset::new(compact, index)?;
    run_report.plates_emitted = dataset.total_plates();
    run_report.total_solutions = dataset.total_solutions();
    run_report.unique_words = dataset.compact().dictionary.len();
    Ok((dataset, run_report))
}

// Runs every stage and writes the dataset, manifest and report into out_dir.
// Fatal errors come back as a boxed PipelineError before anything is written.
pub async fn run(
    config: config::GeneratorConfig,
    sources: Sources,
    out_dir: &Path,
) -> error::Returns<report::RunReport> {
    let formats = config.output_formats();
    let (dataset, mut run_report) =
        tokio::task::spawn_blocking(move || build(&config, &sources)).await??;

    std::fs::create_dir_all(out_dir)?;
    let t0 = std::time::Instant::now();
    let emitted = emit::emit_all(std::sync::Arc::new(dataset), out_dir, &formats).await?;
    run_report.stage_seconds.emission = t0.elapsed().as_secs_f64();
    log::info!("{:?} for writing {} formats", t0.elapsed(), formats.len());
    run_report.record_emission(&emitted);
    run_report.write(out_dir)?;
    run_report.log_summary();
    Ok(run_report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> corpus::Corpus {
        corpus::Corpus::from_pairs([
            ("car", 500),
            ("scar", 50),
            ("scarab", 5),
            ("cab", 40),
            ("bar", 70),
            ("abba", 2),
        ])
        .unwrap()
    }

    fn small_config() -> config::GeneratorConfig {
        config::GeneratorConfig {
            alphabet: "abcrs".into(),
            num_threads: 3,
            ..Default::default()
        }
    }

    #[test]
    fn build_counts_every_plate() {
        let (dataset, run_report) = build(&small_config(), &Sources::new(corpus())).unwrap();
        assert_eq!(run_report.plates_considered, 125);
        assert_eq!(
            run_report.plates_with_solutions + run_report.plates_empty,
            125
        );
        assert_eq!(run_report.plates_emitted, run_report.plates_with_solutions);
        assert_eq!(run_report.unique_words, 6);
        assert_eq!(dataset.total_solutions(), run_report.total_solutions);
        let car = dataset
            .compact()
            .plates
            .iter()
            .find(|p| p.letters.as_str() == "CAR")
            .unwrap();
        assert_eq!(dataset.rarity().score_of(car.id).unwrap().rarity, 54.07);
    }

    #[test]
    fn plate_list_replaces_enumeration() {
        let mut sources = Sources::new(corpus());
        sources.plate_list = Some("car\n# comment\n\nBAR\nCAR\nC4R\nABBA\n".into());
        let (dataset, run_report) = build(&small_config(), &sources).unwrap();
        assert_eq!(run_report.plates_considered, 2);
        assert_eq!(run_report.skipped_plates.len(), 2);
        assert_eq!(dataset.total_plates(), 2);
    }

    #[test]
    fn bad_config_is_fatal() {
        let config = config::GeneratorConfig {
            plate_length: 9,
            ..Default::default()
        };
        let Err(e) = build(&config, &Sources::new(corpus())) else {
            panic!("accepted plate_length 9");
        };
        assert!(e.is_fatal());
    }

    #[test]
    fn long_plates_need_a_plate_list() {
        let config = config::GeneratorConfig {
            plate_length: 8,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let Err(e) = build(&config, &Sources::new(corpus())) else {
            panic!("enumerated 26^8 plates");
        };
        assert!(matches!(e, PipelineError::Config(_)));

        let mut sources = Sources::new(corpus());
        sources.plate_list = Some("SCARABXX\nSCARBBBB\n".into());
        let corpus_with_long_word =
            corpus::Corpus::from_pairs([("scarabxxy", 3), ("car", 500)]).unwrap();
        sources.corpus = corpus_with_long_word;
        let (dataset, run_report) = build(&config, &sources).unwrap();
        assert_eq!(run_report.plates_considered, 2);
        assert_eq!(dataset.total_plates(), 1);
    }

    #[tokio::test]
    async fn run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let run_report = run(small_config(), Sources::new(corpus()), dir.path())
            .await
            .unwrap();
        assert_eq!(run_report.formats.len(), 4);
        assert_eq!(run_report.failed_formats(), 0);
        assert!(dir.path().join(report::REPORT_FILE).exists());
        assert!(dir.path().join(emit::MANIFEST_FILE).exists());
    }

    #[tokio::test]
    async fn fatal_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let config = config::GeneratorConfig {
            chunk_size: 0,
            ..small_config()
        };
        let e = run(config, Sources::new(corpus()), &out_dir)
            .await
            .unwrap_err();
        assert!(matches!(
            e.downcast_ref::<PipelineError>(),
            Some(PipelineError::Config(_))
        ));
        assert!(!out_dir.exists());
    }
}
