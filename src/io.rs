//! Input loading and output tables.
//!
//! Input is one CSV with a header row and one sounding per row; the
//! measurement columns hold semicolon-separated floats:
//! `name,nztm_x,nztm_y,depth,qc,fs,u`
//! `"CPT_1",1570634.0,5180148.0,"0.02;0.04;0.06","0.21;0.22;0.25",...`
//!
//! Every output is a flat table under the configured output directory, one
//! file per concern, so downstream tooling never has to re-derive anything.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::filtering::NeighbourRecord;
use crate::model::cpt::Cpt;
use crate::model::skip::{self, SkipRecord, SkipSummary};
use crate::runner::{CalculationFailure, Vs30Result};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Load a batch of soundings from a CSV file.
///
/// A row whose measurement channels do not share one length is logged and
/// skipped; structural problems stay scoped to the one sounding. Unparseable
/// numbers and missing columns still fail the load.
pub fn load_soundings(path: &Path) -> Result<Vec<Cpt>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening soundings file {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let name_idx = column("name")?;
    let x_idx = column("nztm_x")?;
    let y_idx = column("nztm_y")?;
    let depth_idx = column("depth")?;
    let qc_idx = column("qc")?;
    let fs_idx = column("fs")?;
    let u_idx = column("u")?;

    let mut cpts = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let name = record.get(name_idx).unwrap_or("").to_string();
        if name.is_empty() {
            bail!("CSV row {row_no}: empty sounding name");
        }

        let scalar = |idx: usize, col: &str| -> Result<f64> {
            record
                .get(idx)
                .unwrap_or("")
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row_no}, '{col}': not a number"))
        };
        let nztm_x = scalar(x_idx, "nztm_x")?;
        let nztm_y = scalar(y_idx, "nztm_y")?;

        let depth = parse_semicolon_floats(record.get(depth_idx).unwrap_or(""), row_no, "depth")?;
        let qc = parse_semicolon_floats(record.get(qc_idx).unwrap_or(""), row_no, "qc")?;
        let fs = parse_semicolon_floats(record.get(fs_idx).unwrap_or(""), row_no, "fs")?;
        let u = parse_semicolon_floats(record.get(u_idx).unwrap_or(""), row_no, "u")?;

        match Cpt::new(&name, depth, qc, fs, u, nztm_x, nztm_y) {
            Ok(cpt) => cpts.push(cpt),
            Err(err) => log::warn!("CSV row {row_no} ('{name}') skipped: {err}"),
        }
    }

    Ok(cpts)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Output tables
// ---------------------------------------------------------------------------

/// One row per (sounding, correlation pair) estimate.
pub fn write_results(path: &Path, results: &[Vs30Result]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in results {
        writer.serialize(row)?;
    }
    writer.flush().context("flushing results table")?;
    Ok(())
}

/// The complete skip audit trail: every (sounding, reason) pair.
pub fn write_skipped(path: &Path, records: &[SkipRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["name", "skip_reason", "reason_description"])?;
    for record in records {
        writer.write_record([
            record.name.as_str(),
            record.reason.code(),
            record.description.as_str(),
        ])?;
    }
    writer.flush().context("flushing skip table")?;
    Ok(())
}

/// The first-reason view: one row per skipped sounding.
pub fn write_skipped_first_reason(path: &Path, records: &[SkipRecord]) -> Result<()> {
    write_skipped(path, &skip::first_reason(records))
}

/// Per-reason counts against the initial batch size.
pub fn write_skip_summary(path: &Path, summary: &[SkipSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["skip_reason", "description", "num_skipped", "num_remaining"])?;
    for row in summary {
        writer.write_record([
            row.reason.code(),
            row.reason.summary(),
            &row.num_skipped.to_string(),
            &row.num_remaining.to_string(),
        ])?;
    }
    writer.flush().context("flushing skip summary")?;
    Ok(())
}

/// Nearest-neighbour diagnostics, independent of any filtering decision.
pub fn write_neighbours(path: &Path, neighbours: &[NeighbourRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in neighbours {
        writer.serialize(row)?;
    }
    writer.flush().context("flushing neighbour table")?;
    Ok(())
}

/// Correlation-grid cells that errored.
pub fn write_failures(path: &Path, failures: &[CalculationFailure]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["name", "vs_correlation", "vs30_correlation", "error"])?;
    for row in failures {
        writer.write_record([
            row.name.as_str(),
            row.vs_correlation.as_str(),
            row.vs30_correlation.as_str(),
            row.error.as_str(),
        ])?;
    }
    writer.flush().context("flushing failure table")?;
    Ok(())
}

/// Duplicate-location names, one per line. Re-loadable as the scan cache.
pub fn write_duplicate_names(path: &Path, names: &BTreeSet<String>) -> Result<()> {
    let mut text = String::new();
    for name in names {
        text.push_str(name);
        text.push('\n');
    }
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// Load a previously written duplicate-name artifact.
pub fn load_duplicate_names(path: &Path) -> Result<BTreeSet<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading duplicate name cache {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
