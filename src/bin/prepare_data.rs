//! Split a raw consultation export into cleaned per-species CSV files.
//!
//! Usage: `prepare_data [input.csv] [output_dir]`
//! Defaults: `data/raw/savsnet_data.csv` → `data/cleaned/`.
//!
//! Cleaning matches what the dashboard expects: species names lowercased,
//! empty cells filled with `Unknown`, one file per species group.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

const SPECIES_COLUMN: &str = "Species";

const OUTPUT_FILES: [&str; 3] = [
    "cats_consultations.csv",
    "dogs_consultations.csv",
    "other_species_consultations.csv",
];

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let input = args
        .next()
        .unwrap_or_else(|| "data/raw/savsnet_data.csv".to_string());
    let output_dir = args.next().unwrap_or_else(|| "data/cleaned".to_string());

    let mut reader = csv::Reader::from_path(&input).with_context(|| format!("opening {input}"))?;
    let headers = reader.headers().context("reading headers")?.clone();
    let species_idx = headers
        .iter()
        .position(|h| h == SPECIES_COLUMN)
        .with_context(|| format!("input has no '{SPECIES_COLUMN}' column"))?;

    fs::create_dir_all(&output_dir).with_context(|| format!("creating {output_dir}"))?;
    let mut writers = Vec::with_capacity(OUTPUT_FILES.len());
    for file in OUTPUT_FILES {
        let path = Path::new(&output_dir).join(file);
        let mut writer =
            csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
        writer.write_record(&headers)?;
        writers.push(writer);
    }

    let mut counts = [0usize; 3];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cleaned: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let cell = cell.trim();
                if cell.is_empty() {
                    "Unknown".to_string()
                } else if i == species_idx {
                    cell.to_lowercase()
                } else {
                    cell.to_string()
                }
            })
            .collect();

        let bucket = match cleaned[species_idx].as_str() {
            "cat" => 0,
            "dog" => 1,
            _ => 2,
        };
        writers[bucket].write_record(&cleaned)?;
        counts[bucket] += 1;
    }

    for writer in &mut writers {
        writer.flush()?;
    }

    println!(
        "Wrote {} cat, {} dog, and {} other-species consultations to {output_dir}",
        counts[0], counts[1], counts[2]
    );
    Ok(())
}
