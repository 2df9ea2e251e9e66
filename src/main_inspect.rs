// Copyright (C) 2020-2026 Andy Kurnia.

use clap::{Parser, Subcommand};
use platewords::{error, rarity, reader};
use std::path::PathBuf;

/// Look things up in a generated dataset.json.
#[derive(Parser, Debug)]
#[command(name = "inspect", version, about, long_about = None)]
struct Args {
    /// Monolithic dataset file
    dataset: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Totals and rarity statistics
    Summary,
    /// Solutions of one plate, by letters or by id
    Plate { plate: String },
    /// One word by id
    Word { id: u32 },
    /// Plate letters in one canonical tier
    Tier {
        #[arg(value_parser = parse_tier)]
        tier: rarity::Tier,
    },
}

fn parse_tier(s: &str) -> Result<rarity::Tier, String> {
    rarity::Tier::ALL
        .into_iter()
        .find(|tier| tier.name() == s)
        .ok_or_else(|| {
            format!(
                "expected one of {:?}",
                rarity::Tier::ALL.map(|tier| tier.name())
            )
        })
}

fn print_plate(ix: &reader::DatasetIndex, plate_id: u32) -> error::Returns<()> {
    let (Some(plate), Some(solutions)) = (ix.plate(plate_id), ix.solutions(plate_id)) else {
        platewords::return_error!(format!("no plate with id {}", plate_id));
    };
    let tier = ix.tier_of(plate_id).map_or("-", |tier| tier.name());
    println!(
        "{} (id {}): rarity {}, {}, {} solutions",
        plate.letters, plate_id, plate.rarity, tier, plate.solution_count
    );
    for (entry, frequency) in solutions {
        println!("{:>8} {} (word id {})", frequency, entry.word, entry.id);
    }
    Ok(())
}

fn main() -> error::Returns<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let t0 = std::time::Instant::now();
    let ix = reader::DatasetIndex::load(&args.dataset)?;
    log::info!("{:?} for reading {}", t0.elapsed(), args.dataset.display());
    match args.command {
        Command::Summary => {
            let statistics = ix.statistics();
            println!("{} plates, {} words", ix.num_plates(), ix.num_words());
            println!(
                "rarity {}..{}, mean {:.2}, stddev {:.2}",
                statistics.min, statistics.max, statistics.mean, statistics.stddev
            );
            println!("canonical tiers: {}", ix.canonical_scheme());
            for tier in rarity::Tier::ALL {
                println!("{:>10}: {}", tier.name(), ix.canonical_tiers().ids(tier).len());
            }
        }
        Command::Plate { plate } => {
            let plate_id = match plate.parse::<u32>() {
                Ok(id) => id,
                Err(_) => match ix.plate_id(&plate) {
                    Some(id) => id,
                    None => {
                        platewords::return_error!(format!("no plate {:?}", plate));
                    }
                },
            };
            print_plate(&ix, plate_id)?;
        }
        Command::Word { id } => {
            let Some(entry) = ix.word(id) else {
                platewords::return_error!(format!("no word with id {}", id));
            };
            println!("{}", serde_json::to_string_pretty(entry)?);
        }
        Command::Tier { tier } => {
            for &plate_id in ix.canonical_tiers().ids(tier) {
                if let Some(plate) = ix.plate(plate_id) {
                    println!("{} {}", plate.letters, plate.rarity);
                }
            }
        }
    }
    Ok(())
}
