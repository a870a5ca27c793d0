use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use landcover::olc;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::RemoteArgs;

/// Codes handed to the resolver per progress step.
const CHUNK_SIZE: usize = 64;

/// Where each row takes its location from.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LocationColumns {
    Code(usize),
    LatLon(usize, usize),
}

/// Terrain columns appended to every row.
#[derive(Debug, Default, PartialEq)]
struct RowOutcome {
    location_code: String,
    terrain_types: String,
    error: String,
}

impl RowOutcome {
    fn failed(location_code: &str, error: impl ToString) -> Self {
        Self {
            location_code: location_code.to_string(),
            terrain_types: String::new(),
            error: error.to_string(),
        }
    }
}

pub async fn run(
    remote: &RemoteArgs,
    input: PathBuf,
    output: Option<PathBuf>,
    code_col: &str,
    lat_col: &str,
    lon_col: &str,
    concurrency: usize,
) -> Result<()> {
    let resolver = remote.resolver(olc::DEFAULT_CODE_LENGTH, concurrency)?;

    let file = File::open(&input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let columns = find_columns(&headers, code_col, lat_col, lon_col)?;

    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    let total = records.len() as u64;

    // Rows without a usable code fail here; the rest are resolved below
    let mut outcomes: Vec<RowOutcome> = Vec::with_capacity(records.len());
    let mut pending: Vec<(usize, String)> = Vec::new();
    for (i, record) in records.iter().enumerate() {
        match row_code(record, columns, resolver.code_length()) {
            Ok(code) => {
                pending.push((i, code.clone()));
                outcomes.push(RowOutcome {
                    location_code: code,
                    ..Default::default()
                });
            }
            Err(e) => outcomes.push(RowOutcome::failed("", e)),
        }
    }

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    pb.inc(total - pending.len() as u64);

    for chunk in pending.chunks(CHUNK_SIZE) {
        let codes = chunk.iter().map(|(_, code)| code.clone());
        let entries = resolver.resolve_batch(codes).await;

        for ((row, _), entry) in chunk.iter().zip(entries) {
            outcomes[*row] = match entry.outcome {
                Ok(result) => RowOutcome {
                    location_code: result.location_code,
                    terrain_types: result.terrain_types.join(";"),
                    error: String::new(),
                },
                Err(e) => RowOutcome::failed(&entry.code, e),
            };
        }
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("done");

    // Write output
    let output_path = output.unwrap_or_else(|| default_output_path(&input));
    let output_file = File::create(&output_path).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.extend(["location_code", "terrain_types", "error"]);
    writer.write_record(&new_headers)?;

    let mut failed = 0;
    for (record, outcome) in records.iter().zip(&outcomes) {
        if !outcome.error.is_empty() {
            failed += 1;
        }
        let mut row: Vec<&str> = record.iter().collect();
        row.extend([
            outcome.location_code.as_str(),
            outcome.terrain_types.as_str(),
            outcome.error.as_str(),
        ]);
        writer.write_record(&row)?;
    }
    writer.flush()?;

    println!(
        "Processed {} rows ({} failed). Output written to: {}",
        records.len(),
        failed,
        output_path.display()
    );
    Ok(())
}

/// Prefer the code column; otherwise require both coordinate columns.
fn find_columns(
    headers: &csv::StringRecord,
    code_col: &str,
    lat_col: &str,
    lon_col: &str,
) -> Result<LocationColumns> {
    if let Some(idx) = headers.iter().position(|h| h == code_col) {
        return Ok(LocationColumns::Code(idx));
    }

    let lat_idx = headers.iter().position(|h| h == lat_col).with_context(|| {
        format!(
            "Neither column '{}' nor '{}' found in CSV",
            code_col, lat_col
        )
    })?;
    let lon_idx = headers
        .iter()
        .position(|h| h == lon_col)
        .with_context(|| format!("Column '{}' not found in CSV", lon_col))?;

    Ok(LocationColumns::LatLon(lat_idx, lon_idx))
}

/// The location code of one row.
fn row_code(record: &csv::StringRecord, columns: LocationColumns, length: usize) -> Result<String> {
    match columns {
        LocationColumns::Code(idx) => {
            let code = olc::normalize_query_code(record.get(idx).unwrap_or(""));
            if code.is_empty() {
                anyhow::bail!("Missing location code");
            }
            Ok(code)
        }
        LocationColumns::LatLon(lat_idx, lon_idx) => {
            let lat: f64 = record
                .get(lat_idx)
                .context("Missing latitude")?
                .trim()
                .parse()
                .context("Invalid latitude")?;
            let lon: f64 = record
                .get(lon_idx)
                .context("Missing longitude")?
                .trim()
                .parse()
                .context("Invalid longitude")?;
            Ok(olc::encode_with_length(lat, lon, length)?)
        }
    }
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_terrain.csv", stem))
}
