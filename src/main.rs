use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use cpt_vs30::model::skip;
use cpt_vs30::runner::run_batch;
use cpt_vs30::{io, Config};

/// Estimate Vs30 for a batch of cone penetration test soundings.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON run configuration; missing fields fall back to defaults.
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();
    let config = Config::load(&args.config)?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output directory {}", config.output_dir.display()))?;

    let cpts = io::load_soundings(&config.input_path)?;
    log::info!(
        "Loaded {} soundings from {}",
        cpts.len(),
        config.input_path.display()
    );

    let cached_duplicates = config
        .duplicate_name_cache
        .as_deref()
        .map(io::load_duplicate_names)
        .transpose()?;

    let output = run_batch(&cpts, &config, cached_duplicates)?;

    let out = |file: &str| config.output_dir.join(file);
    io::write_results(&out("vs30_results.csv"), &output.results)?;
    io::write_skipped(&out("skipped_records.csv"), &output.skips)?;
    io::write_skipped_first_reason(&out("skipped_first_reason.csv"), &output.skips)?;
    io::write_skip_summary(
        &out("skipped_summary.csv"),
        &skip::summarize(&output.skips, output.initial_count),
    )?;
    io::write_neighbours(&out("closest_cpt_distance.csv"), &output.neighbours)?;
    io::write_duplicate_names(&out("duplicate_cpt_names.txt"), &output.duplicate_names)?;
    io::write_failures(&out("calculation_failures.csv"), &output.failures)?;

    log::info!(
        "Wrote {} estimates ({} failures, {} skip records) to {} in {:.1?}",
        output.results.len(),
        output.failures.len(),
        output.skips.len(),
        config.output_dir.display(),
        start.elapsed()
    );
    Ok(())
}
