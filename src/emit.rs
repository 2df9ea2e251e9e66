// Copyright (C) 2026 Andy Kurnia.

use super::{dictionary, error, error::PipelineError, rarity};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MONOLITHIC_FILE: &str = "dataset.json";
pub const STREAMING_FILE: &str = "plates.jsonl";
pub const CHUNK_DIR: &str = "chunks";
pub const CHUNK_WORDS_FILE: &str = "words.json";
pub const PER_ENTITY_DIR: &str = "plates";

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum FormatKind {
    Monolithic,
    Streaming,
    Chunked,
    PerEntity,
}

impl FormatKind {
    pub const ALL: [FormatKind; 4] = [
        FormatKind::Monolithic,
        FormatKind::Streaming,
        FormatKind::Chunked,
        FormatKind::PerEntity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FormatKind::Monolithic => "monolithic",
            FormatKind::Streaming => "streaming",
            FormatKind::Chunked => "chunked",
            FormatKind::PerEntity => "per_entity",
        }
    }

    // File or directory under the output directory that this format owns.
    pub fn output_path(self) -> &'static str {
        match self {
            FormatKind::Monolithic => MONOLITHIC_FILE,
            FormatKind::Streaming => STREAMING_FILE,
            FormatKind::Chunked => CHUNK_DIR,
            FormatKind::PerEntity => PER_ENTITY_DIR,
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One physical encoding of the dataset.
///
/// All encodings are produced from the same [`Dataset`]; they only differ in
/// how much is shared (one word registry) versus inlined (word text in every
/// record), and in how the plates are split into files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Monolithic,
    Streaming,
    Chunked { chunk_size: usize },
    PerEntity,
}

impl Format {
    pub fn new(kind: FormatKind, chunk_size: usize) -> Self {
        match kind {
            FormatKind::Monolithic => Format::Monolithic,
            FormatKind::Streaming => Format::Streaming,
            FormatKind::Chunked => Format::Chunked { chunk_size },
            FormatKind::PerEntity => Format::PerEntity,
        }
    }

    pub fn kind(self) -> FormatKind {
        match self {
            Format::Monolithic => FormatKind::Monolithic,
            Format::Streaming => FormatKind::Streaming,
            Format::Chunked { .. } => FormatKind::Chunked,
            Format::PerEntity => FormatKind::PerEntity,
        }
    }
}

/// Compacted, scored dataset. Read-only once built.
pub struct Dataset {
    compact: dictionary::CompactDataset,
    rarity: rarity::RarityIndex,
}

impl Dataset {
    // The registry must be consistent before anything can be written.
    pub fn new(
        compact: dictionary::CompactDataset,
        rarity: rarity::RarityIndex,
    ) -> Result<Self, PipelineError> {
        compact.verify()?;
        for score in rarity.scores.iter() {
            if compact.plate(score.plate_id).is_none() {
                return Err(PipelineError::DictionaryConsistency(format!(
                    "rarity score for unknown plate id {}",
                    score.plate_id
                )));
            }
        }
        Ok(Self { compact, rarity })
    }

    #[inline(always)]
    pub fn compact(&self) -> &dictionary::CompactDataset {
        &self.compact
    }

    #[inline(always)]
    pub fn rarity(&self) -> &rarity::RarityIndex {
        &self.rarity
    }

    // Plates that made it through scoring, in id order.
    pub fn scored_plates(
        &self,
    ) -> impl Iterator<Item = (&dictionary::CompactPlate, &rarity::PlateRarity)> {
        self.rarity.scores.iter().filter_map(|score| {
            self.compact
                .plate(score.plate_id)
                .map(|compact_plate| (compact_plate, score))
        })
    }

    pub fn total_plates(&self) -> usize {
        self.rarity.scores.len()
    }

    pub fn total_solutions(&self) -> usize {
        self.scored_plates().map(|(p, _)| p.solutions.len()).sum()
    }
}

// Record types. Writers borrow from the Dataset, readers get owned copies.

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlateRecord<'a> {
    pub letters: Cow<'a, str>,
    pub rarity: f64,
    pub solution_count: usize,
    pub solutions: Cow<'a, [dictionary::CompactSolution]>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TierRecord<'a> {
    pub scheme: rarity::TierScheme,
    #[serde(flatten)]
    pub tiers: Cow<'a, rarity::TierIndex>,
    pub statistics: Cow<'a, rarity::RarityStatistics>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Indexes<'a> {
    pub plate_id_to_letters: BTreeMap<u32, Cow<'a, str>>,
    pub word_id_to_word: BTreeMap<u32, Cow<'a, str>>,
    pub rarity_tiers: TierRecord<'a>,
    pub alternative_tiers: TierRecord<'a>,
    pub canonical_tiers: rarity::TierScheme,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MonolithicRecord<'a> {
    pub words: BTreeMap<u32, Cow<'a, dictionary::WordEntry>>,
    pub plates: BTreeMap<u32, PlateRecord<'a>>,
    pub indexes: Indexes<'a>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolutionScores {
    pub word_rarity: f64,
    pub length: u32,
    pub rare_letters: u32,
    pub popularity: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamingSolution<'a> {
    pub word: Cow<'a, str>,
    pub frequency: u64,
    pub scores: SolutionScores,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamingRecord<'a> {
    pub plate: Cow<'a, str>,
    pub rarity: f64,
    pub solution_count: usize,
    pub solutions: Vec<StreamingSolution<'a>>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChunkRecord<'a> {
    pub chunk_id: usize,
    pub plates: BTreeMap<u32, PlateRecord<'a>>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WordsRecord<'a> {
    pub words: BTreeMap<u32, Cow<'a, dictionary::WordEntry>>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChunkEntry {
    pub chunk_id: usize,
    pub filename: String,
    pub plate_count: usize,
    pub solution_count: usize,
    pub size: u64,
    pub plates: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChunkManifest {
    pub total_chunks: usize,
    pub chunk_size: usize,
    pub chunks: Vec<ChunkEntry>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    pub total_plates: usize,
    pub total_solutions: usize,
    pub unique_words: usize,
    pub rarity_range: [f64; 2],
    pub rarity_mean: f64,
    pub rarity_stddev: f64,
    pub available_formats: Vec<FormatKind>,
    pub canonical_tiers: rarity::TierScheme,
}

pub fn solution_scores(entry: &dictionary::WordEntry) -> SolutionScores {
    SolutionScores {
        word_rarity: rarity::round2(rarity::freq_rarity(entry.frequency as f64)),
        length: entry.length,
        rare_letters: entry.rare_letters,
        popularity: entry.popularity,
    }
}

fn plate_record<'a>(
    compact_plate: &'a dictionary::CompactPlate,
    score: &rarity::PlateRarity,
) -> PlateRecord<'a> {
    PlateRecord {
        letters: Cow::Borrowed(compact_plate.letters.as_str()),
        rarity: score.rarity,
        solution_count: compact_plate.solutions.len(),
        solutions: Cow::Borrowed(&compact_plate.solutions),
    }
}

fn streaming_record<'a>(
    dataset: &'a Dataset,
    compact_plate: &'a dictionary::CompactPlate,
    score: &rarity::PlateRarity,
) -> error::Returns<StreamingRecord<'a>> {
    let dictionary = &dataset.compact.dictionary;
    let mut solutions = Vec::with_capacity(compact_plate.solutions.len());
    for solution in compact_plate.solutions.iter() {
        let Some(entry) = dictionary.get(solution.word_id) else {
            return_error!(format!(
                "plate {} references unknown word id {}",
                compact_plate.letters, solution.word_id
            ));
        };
        solutions.push(StreamingSolution {
            word: Cow::Borrowed(&entry.word),
            frequency: solution.frequency,
            scores: solution_scores(entry),
        });
    }
    Ok(StreamingRecord {
        plate: Cow::Borrowed(compact_plate.letters.as_str()),
        rarity: score.rarity,
        solution_count: compact_plate.solutions.len(),
        solutions,
    })
}

fn words_map(dataset: &Dataset) -> BTreeMap<u32, Cow<'_, dictionary::WordEntry>> {
    dataset
        .compact
        .dictionary
        .entries()
        .iter()
        .map(|entry| (entry.id, Cow::Borrowed(entry)))
        .collect()
}

fn tier_record(dataset: &Dataset, scheme: rarity::TierScheme) -> TierRecord<'_> {
    TierRecord {
        scheme,
        tiers: Cow::Borrowed(dataset.rarity.tiers(scheme)),
        statistics: Cow::Borrowed(&dataset.rarity.statistics),
    }
}

pub fn monolithic_record(dataset: &Dataset) -> MonolithicRecord<'_> {
    let canonical = dataset.rarity.canonical;
    let alternative = match canonical {
        rarity::TierScheme::StdDev => rarity::TierScheme::Percentile,
        rarity::TierScheme::Percentile => rarity::TierScheme::StdDev,
    };
    MonolithicRecord {
        words: words_map(dataset),
        plates: dataset
            .scored_plates()
            .map(|(p, score)| (p.id, plate_record(p, score)))
            .collect(),
        indexes: Indexes {
            plate_id_to_letters: dataset
                .scored_plates()
                .map(|(p, _)| (p.id, Cow::Borrowed(p.letters.as_str())))
                .collect(),
            word_id_to_word: dataset
                .compact
                .dictionary
                .entries()
                .iter()
                .map(|entry| (entry.id, Cow::Borrowed(entry.word.as_str())))
                .collect(),
            rarity_tiers: tier_record(dataset, canonical),
            alternative_tiers: tier_record(dataset, alternative),
            canonical_tiers: canonical,
        },
    }
}

pub fn manifest(dataset: &Dataset, available_formats: Vec<FormatKind>) -> Manifest {
    let statistics = &dataset.rarity.statistics;
    Manifest {
        total_plates: dataset.total_plates(),
        total_solutions: dataset.total_solutions(),
        unique_words: dataset.compact.dictionary.len(),
        rarity_range: [statistics.min, statistics.max],
        rarity_mean: statistics.mean,
        rarity_stddev: statistics.stddev,
        available_formats,
        canonical_tiers: dataset.rarity.canonical,
    }
}

// Writes to a temporary file next to path and renames it into place, so a
// failure never leaves a partial file under the final name. Returns the size.
pub fn write_atomic<F>(path: &Path, write: F) -> error::Returns<u64>
where
    F: FnOnce(&mut dyn Write) -> error::Returns<()>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut w = std::io::BufWriter::new(tmp.as_file_mut());
        write(&mut w)?;
        w.flush()?;
    }
    let size = tmp.as_file().metadata()?.len();
    tmp.persist(path)?;
    Ok(size)
}

fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> error::Returns<u64> {
    write_atomic(path, |w| {
        serde_json::to_writer(&mut *w, value)?;
        w.write_all(b"\n")?;
        Ok(())
    })
}

// Removes a file or a whole directory. Missing is fine.
fn remove_output(path: &Path) -> std::io::Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        x => x,
    }
}

// Builds a whole directory in a staging directory next to final_dir, then
// replaces final_dir with it. Files left over from an earlier run never
// survive, and a failed build leaves final_dir untouched.
fn write_dir_atomic<R, F>(final_dir: &Path, build: F) -> error::Returns<R>
where
    F: FnOnce(&Path) -> error::Returns<R>,
{
    let parent = match final_dir.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(parent)?;
    // tempdir_in creates it private.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o755))?;
    }
    let ret = build(staging.path())?;
    remove_output(final_dir)?;
    std::fs::rename(staging.path(), final_dir)?;
    Ok(ret)
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FormatOutcome {
    pub format: FormatKind,
    pub files: usize,
    pub bytes: u64,
}

fn emit_monolithic(dataset: &Dataset, out_dir: &Path) -> error::Returns<FormatOutcome> {
    let bytes = write_json_atomic(&out_dir.join(MONOLITHIC_FILE), &monolithic_record(dataset))?;
    Ok(FormatOutcome {
        format: FormatKind::Monolithic,
        files: 1,
        bytes,
    })
}

fn emit_streaming(dataset: &Dataset, out_dir: &Path) -> error::Returns<FormatOutcome> {
    let bytes = write_atomic(&out_dir.join(STREAMING_FILE), |w| {
        for (compact_plate, score) in dataset.scored_plates() {
            serde_json::to_writer(&mut *w, &streaming_record(dataset, compact_plate, score)?)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    })?;
    Ok(FormatOutcome {
        format: FormatKind::Streaming,
        files: 1,
        bytes,
    })
}

fn emit_chunked(
    dataset: &Dataset,
    out_dir: &Path,
    chunk_size: usize,
) -> error::Returns<FormatOutcome> {
    if chunk_size == 0 {
        return_error!("chunk size must be positive".into());
    }
    write_dir_atomic(&out_dir.join(CHUNK_DIR), |chunk_dir| {
        let mut total_bytes = write_json_atomic(
            &chunk_dir.join(CHUNK_WORDS_FILE),
            &WordsRecord {
                words: words_map(dataset),
            },
        )?;
        let scored = dataset.scored_plates().collect::<Vec<_>>();
        let mut chunks = Vec::with_capacity(scored.len().div_ceil(chunk_size));
        for (chunk_id, batch) in scored.chunks(chunk_size).enumerate() {
            let filename = format!("chunk_{:04}.json", chunk_id);
            let size = write_json_atomic(
                &chunk_dir.join(&filename),
                &ChunkRecord {
                    chunk_id,
                    plates: batch
                        .iter()
                        .map(|&(p, score)| (p.id, plate_record(p, score)))
                        .collect(),
                },
            )?;
            total_bytes += size;
            chunks.push(ChunkEntry {
                chunk_id,
                filename,
                plate_count: batch.len(),
                solution_count: batch.iter().map(|(p, _)| p.solutions.len()).sum(),
                size,
                plates: batch.iter().map(|(p, _)| p.letters.to_string()).collect(),
            });
        }
        let num_chunks = chunks.len();
        total_bytes += write_json_atomic(
            &chunk_dir.join(MANIFEST_FILE),
            &ChunkManifest {
                total_chunks: num_chunks,
                chunk_size,
                chunks,
            },
        )?;
        Ok(FormatOutcome {
            format: FormatKind::Chunked,
            files: num_chunks + 2,
            bytes: total_bytes,
        })
    })
}

fn emit_per_entity(dataset: &Dataset, out_dir: &Path) -> error::Returns<FormatOutcome> {
    write_dir_atomic(&out_dir.join(PER_ENTITY_DIR), |plate_dir| {
        let mut files = 0;
        let mut bytes = 0;
        for (compact_plate, score) in dataset.scored_plates() {
            bytes += write_json_atomic(
                &plate_dir.join(format!("{}.json", compact_plate.letters)),
                &streaming_record(dataset, compact_plate, score)?,
            )?;
            files += 1;
        }
        Ok(FormatOutcome {
            format: FormatKind::PerEntity,
            files,
            bytes,
        })
    })
}

pub fn emit_format(
    dataset: &Dataset,
    out_dir: &Path,
    format: Format,
) -> Result<FormatOutcome, PipelineError> {
    let t0 = std::time::Instant::now();
    let result = match format {
        Format::Monolithic => emit_monolithic(dataset, out_dir),
        Format::Streaming => emit_streaming(dataset, out_dir),
        Format::Chunked { chunk_size } => emit_chunked(dataset, out_dir, chunk_size),
        Format::PerEntity => emit_per_entity(dataset, out_dir),
    };
    match result {
        Ok(outcome) => {
            log::info!(
                "{:?} for writing {} output ({} files, {} bytes)",
                t0.elapsed(),
                outcome.format,
                outcome.files,
                outcome.bytes
            );
            Ok(outcome)
        }
        Err(e) => Err(PipelineError::Serialization {
            format: format.kind().to_string(),
            reason: e.to_string(),
        }),
    }
}

pub struct EmitReport {
    pub outcomes: Vec<FormatOutcome>,
    pub failed: Vec<PipelineError>,
    pub manifest: Manifest,
}

// Every format runs as its own blocking task; they only read the dataset.
// The manifest is written last and lists only the formats that succeeded.
pub async fn emit_all(
    dataset: std::sync::Arc<Dataset>,
    out_dir: &Path,
    formats: &[Format],
) -> Result<EmitReport, PipelineError> {
    let mut handles = Vec::with_capacity(formats.len());
    for &format in formats {
        let dataset = std::sync::Arc::clone(&dataset);
        let out_dir: PathBuf = out_dir.to_path_buf();
        handles.push((
            format,
            tokio::task::spawn_blocking(move || emit_format(&dataset, &out_dir, format)),
        ));
    }
    let mut outcomes = Vec::with_capacity(handles.len());
    let mut failed = Vec::new();
    for (format, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::Serialization {
                format: format.kind().to_string(),
                reason: format!("emitter task failed: {}", e),
            }),
        };
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                log::error!("{}", e);
                failed.push(e);
            }
        }
    }
    let mut available = outcomes.iter().map(|x| x.format).collect::<Vec<_>>();
    available.sort_unstable();
    // Whatever the manifest does not list must not be left behind by an
    // earlier run.
    for kind in FormatKind::ALL {
        if available.contains(&kind) {
            continue;
        }
        let path = out_dir.join(kind.output_path());
        if let Err(e) = remove_output(&path) {
            let e = PipelineError::Serialization {
                format: kind.to_string(),
                reason: format!("cannot remove stale {}: {}", path.display(), e),
            };
            log::error!("{}", e);
            failed.push(e);
        }
    }
    let manifest = manifest(&dataset, available);
    write_json_atomic(&out_dir.join(MANIFEST_FILE), &manifest).map_err(|e| {
        PipelineError::Serialization {
            format: "manifest".into(),
            reason: e.to_string(),
        }
    })?;
    Ok(EmitReport {
        outcomes,
        failed,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alphabet, corpus, info, plate, solver};

    fn dataset(canonical: rarity::TierScheme) -> Dataset {
        let alphabet = alphabet::Alphabet::english();
        let corpus = corpus::Corpus::from_pairs([
            ("car", 500),
            ("scar", 50),
            ("scarab", 5),
            ("bar", 80),
            ("crab", 12),
        ])
        .unwrap();
        let plates = ["CAR", "BAR", "CRB", "ZZZ"]
            .map(|s| plate::Plate::parse(s, &alphabet, 3).unwrap());
        let sets = solver::build(&corpus, &plates, 2);
        let compact = dictionary::compact(&corpus, &sets, &alphabet, 2).unwrap();
        let index = rarity::score_all(&compact, &info::NoInfo, canonical, 2);
        Dataset::new(compact, index).unwrap()
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn monolithic_shape() {
        let ds = dataset(rarity::TierScheme::StdDev);
        let v = serde_json::to_value(monolithic_record(&ds)).unwrap();
        // plates sorted by letters: BAR, CAR, CRB
        assert_eq!(v["indexes"]["plate_id_to_letters"]["1"], "BAR");
        assert_eq!(v["indexes"]["plate_id_to_letters"]["3"], "CRB");
        assert_eq!(v["indexes"]["word_id_to_word"]["1"], "car");
        assert_eq!(v["words"]["1"]["word"], "car");
        assert_eq!(v["plates"]["2"]["letters"], "CAR");
        assert_eq!(v["plates"]["2"]["solution_count"], 3);
        assert_eq!(v["plates"]["2"]["solutions"][0]["word_id"], 1);
        assert_eq!(v["plates"]["2"]["solutions"][0]["frequency"], 500);
        assert_eq!(v["indexes"]["rarity_tiers"]["scheme"], "stddev");
        assert_eq!(v["indexes"]["alternative_tiers"]["scheme"], "percentile");
        assert!(v["indexes"]["rarity_tiers"]["common_ids"].is_array());
        assert_eq!(v["indexes"]["rarity_tiers"]["statistics"]["count"], 3);
        assert_eq!(v["indexes"]["canonical_tiers"], "stddev");
    }

    #[test]
    fn streaming_record_is_self_contained() {
        let ds = dataset(rarity::TierScheme::StdDev);
        let (p, score) = ds.scored_plates().nth(1).unwrap();
        let record = streaming_record(&ds, p, score).unwrap();
        assert_eq!(record.plate, "CAR");
        assert_eq!(record.solution_count, 3);
        let words = record
            .solutions
            .iter()
            .map(|s| s.word.as_ref())
            .collect::<Vec<_>>();
        assert_eq!(words, ["car", "scar", "scarab"]);
        let scarab = &record.solutions[2];
        assert_eq!(scarab.frequency, 5);
        assert_eq!(scarab.scores.length, 6);
        assert_eq!(scarab.scores.word_rarity, 89.52);
    }

    #[test]
    fn format_tags_round_trip_through_kind() {
        for kind in FormatKind::ALL {
            assert_eq!(Format::new(kind, 9).kind(), kind);
        }
        assert_eq!(
            serde_json::to_string(&FormatKind::PerEntity).unwrap(),
            "\"per_entity\""
        );
    }

    #[tokio::test]
    async fn writes_every_format_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let ds = std::sync::Arc::new(dataset(rarity::TierScheme::StdDev));
        let formats = FormatKind::ALL.map(|k| Format::new(k, 2));
        let report = emit_all(ds, dir.path(), &formats).await.unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(report.outcomes.len(), 4);

        let manifest = read_json(&dir.path().join(MANIFEST_FILE));
        assert_eq!(manifest["total_plates"], 3);
        assert_eq!(manifest["total_solutions"], 3 + 1 + 2);
        assert_eq!(manifest["unique_words"], 5);
        assert_eq!(
            manifest["available_formats"],
            serde_json::json!(["monolithic", "streaming", "chunked", "per_entity"])
        );

        let lines = std::fs::read_to_string(dir.path().join(STREAMING_FILE)).unwrap();
        let plates = lines
            .lines()
            .map(|l| serde_json::from_str::<StreamingRecord>(l).unwrap().plate.into_owned())
            .collect::<Vec<_>>();
        assert_eq!(plates, ["BAR", "CAR", "CRB"]);

        let chunk_manifest = serde_json::from_value::<ChunkManifest>(read_json(
            &dir.path().join(CHUNK_DIR).join(MANIFEST_FILE),
        ))
        .unwrap();
        assert_eq!(chunk_manifest.total_chunks, 2);
        assert_eq!(chunk_manifest.chunks[0].plates, ["BAR", "CAR"]);
        assert_eq!(chunk_manifest.chunks[1].plates, ["CRB"]);
        for chunk in chunk_manifest.chunks.iter() {
            let path = dir.path().join(CHUNK_DIR).join(&chunk.filename);
            assert_eq!(std::fs::metadata(&path).unwrap().len(), chunk.size);
        }
        assert!(dir.path().join(CHUNK_DIR).join(CHUNK_WORDS_FILE).exists());

        let car = read_json(&dir.path().join(PER_ENTITY_DIR).join("CAR.json"));
        assert_eq!(car["plate"], "CAR");
        assert_eq!(car["solutions"][1]["word"], "scar");
        assert!(!dir.path().join(PER_ENTITY_DIR).join("ZZZ.json").exists());
    }

    #[tokio::test]
    async fn one_failing_format_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        // chunks from an earlier run
        let chunk_dir = dir.path().join(CHUNK_DIR);
        std::fs::create_dir_all(&chunk_dir).unwrap();
        std::fs::write(chunk_dir.join("chunk_0007.json"), b"{}").unwrap();
        // a plain file where the per-plate directory should go
        std::fs::write(dir.path().join(PER_ENTITY_DIR), b"in the way").unwrap();
        let ds = std::sync::Arc::new(dataset(rarity::TierScheme::Percentile));
        let formats = [
            Format::Monolithic,
            Format::Streaming,
            Format::Chunked { chunk_size: 0 },
            Format::PerEntity,
        ];
        let report = emit_all(ds, dir.path(), &formats).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            &report.failed[0],
            PipelineError::Serialization { format, .. } if format == "chunked"
        ));
        assert_eq!(
            report.manifest.available_formats,
            [FormatKind::Monolithic, FormatKind::Streaming, FormatKind::PerEntity]
        );
        assert_eq!(report.manifest.canonical_tiers, rarity::TierScheme::Percentile);
        assert!(dir.path().join(MONOLITHIC_FILE).exists());
        assert!(!chunk_dir.exists());
        assert!(dir.path().join(PER_ENTITY_DIR).join("CAR.json").exists());
    }

    #[tokio::test]
    async fn rewrite_drops_stale_and_unselected_output() {
        let dir = tempfile::tempdir().unwrap();
        let ds = std::sync::Arc::new(dataset(rarity::TierScheme::StdDev));
        let formats = FormatKind::ALL.map(|k| Format::new(k, 1));
        emit_all(std::sync::Arc::clone(&ds), dir.path(), &formats)
            .await
            .unwrap();
        assert!(dir.path().join(CHUNK_DIR).join("chunk_0002.json").exists());
        std::fs::write(dir.path().join(PER_ENTITY_DIR).join("OLD.json"), b"{}").unwrap();

        let formats = [Format::Chunked { chunk_size: 2 }, Format::PerEntity];
        let report = emit_all(ds, dir.path(), &formats).await.unwrap();
        assert!(report.failed.is_empty());
        let mut names = std::fs::read_dir(dir.path().join(CHUNK_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        names.sort_unstable();
        assert_eq!(names, ["chunk_0000.json", "chunk_0001.json", MANIFEST_FILE, CHUNK_WORDS_FILE]);
        assert!(!dir.path().join(PER_ENTITY_DIR).join("OLD.json").exists());
        assert!(dir.path().join(PER_ENTITY_DIR).join("CRB.json").exists());
        assert!(!dir.path().join(MONOLITHIC_FILE).exists());
        assert!(!dir.path().join(STREAMING_FILE).exists());
        // no staging directories left behind
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                let name = e.as_ref().unwrap().file_name();
                name.to_string_lossy().starts_with('.')
            })
            .count();
        assert_eq!(leftovers, 0);
    }
}
