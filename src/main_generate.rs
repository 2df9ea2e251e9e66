// Copyright (C) 2020-2026 Andy Kurnia.

use clap::Parser;
use platewords::{config, emit, error, pipeline};
use std::path::PathBuf;

/// Generate the plate solution dataset from a word frequency corpus.
#[derive(Parser, Debug)]
#[command(name = "generate", version, about, long_about = None)]
struct Args {
    /// Corpus file (word,frequency CSV or JSON)
    corpus: PathBuf,

    /// Output directory
    out_dir: PathBuf,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Information model (JSON, plate -> {avg_info_bits})
    #[arg(long, value_name = "FILE")]
    info: Option<PathBuf>,

    /// Plate list, one per line, instead of the full plate space
    #[arg(long, value_name = "FILE")]
    plates: Option<PathBuf>,

    #[arg(long, value_name = "LEN")]
    plate_length: Option<usize>,

    /// Worker threads (0 = one per cpu)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    #[arg(long, value_name = "PLATES")]
    chunk_size: Option<usize>,

    /// Output format, may be repeated
    #[arg(long = "format", value_enum, value_name = "FORMAT")]
    formats: Vec<emit::FormatKind>,
}

impl Args {
    fn config(&self) -> error::Returns<config::GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => config::GeneratorConfig::load(path)?,
            None => config::GeneratorConfig::default(),
        };
        if let Some(plate_length) = self.plate_length {
            config.plate_length = plate_length;
        }
        if let Some(threads) = self.threads {
            config.num_threads = threads;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if !self.formats.is_empty() {
            config.formats = self.formats.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> error::Returns<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.config()?;
    let t0 = std::time::Instant::now();
    let sources =
        pipeline::Sources::load(&args.corpus, args.info.as_deref(), args.plates.as_deref())?;
    let run_report = pipeline::run(config, sources, &args.out_dir).await?;
    log::info!("{:?} for everything", t0.elapsed());
    if run_report.failed_formats() > 0 {
        platewords::return_error!(format!(
            "{} of {} formats failed, see {}",
            run_report.failed_formats(),
            run_report.formats.len(),
            args.out_dir.join(platewords::report::REPORT_FILE).display()
        ));
    }
    Ok(())
}
