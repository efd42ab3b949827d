//! Batch orchestration: filter the soundings, then fan each survivor out over
//! the configured correlation grid on a bounded worker pool.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::correlations;
use crate::filtering::{
    self, duplicate_location_names, nearest_neighbours, run_checks, standard_checks,
    NeighbourRecord,
};
use crate::model::cpt::Cpt;
use crate::model::skip::SkipRecord;
use crate::model::vs_profile::VsProfile;

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// One Vs30 estimate: a (sounding, velocity correlation, depth correlation)
/// triple. Shallow `boore_2004` estimates carry NaN here rather than failing.
#[derive(Debug, Clone, Serialize)]
pub struct Vs30Result {
    pub name: String,
    pub nztm_x: f64,
    pub nztm_y: f64,
    pub vs_correlation: String,
    pub vs30_correlation: String,
    pub vs30: f64,
    pub vs30_sd: f64,
}

/// A correlation-grid cell that errored. Failures are isolated per cell so
/// one bad sounding never takes down the batch.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationFailure {
    pub name: String,
    pub vs_correlation: String,
    pub vs30_correlation: String,
    pub error: String,
}

/// Everything one batch run produces, ready for the output writers.
#[derive(Debug)]
pub struct BatchOutput {
    pub results: Vec<Vs30Result>,
    pub failures: Vec<CalculationFailure>,
    pub skips: Vec<SkipRecord>,
    pub neighbours: Vec<NeighbourRecord>,
    pub duplicate_names: BTreeSet<String>,
    pub initial_count: usize,
}

// ---------------------------------------------------------------------------
// Batch driver
// ---------------------------------------------------------------------------

/// Run the full pipeline over a loaded batch.
///
/// Configuration errors (unknown correlation names, a broken worker pool)
/// fail the whole batch up front; per-sounding problems are demoted to skip
/// records or calculation failures.
///
/// `cached_duplicates` short-circuits the O(n^2) spatial duplicate scan with
/// names loaded from a previous run's artifact.
pub fn run_batch(
    cpts: &[Cpt],
    config: &Config,
    cached_duplicates: Option<BTreeSet<String>>,
) -> Result<BatchOutput> {
    for name in &config.cpt_vs_correlations {
        correlations::cpt_vs::lookup(name)
            .with_context(|| format!("configured velocity correlation '{name}'"))?;
    }
    for name in &config.vs30_correlations {
        correlations::vs30::lookup(name)
            .with_context(|| format!("configured depth correlation '{name}'"))?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.n_workers)
        .build()
        .context("building worker pool")?;

    let initial_count = cpts.len();
    log::info!("Starting batch of {initial_count} soundings");

    let neighbours = nearest_neighbours(cpts);

    let duplicate_names = match cached_duplicates {
        Some(names) => {
            log::info!("Using {} cached duplicate names", names.len());
            names
        }
        None => duplicate_location_names(cpts, config.min_separation_m),
    };

    let checks = standard_checks(config, duplicate_names.clone());
    let skips: Vec<SkipRecord> = pool.install(|| {
        cpts.par_iter()
            .flat_map_iter(|cpt| run_checks(&checks, cpt))
            .collect()
    });
    let skipped = filtering::skipped_names(&skips);
    let kept: Vec<&Cpt> = cpts
        .iter()
        .filter(|c| !skipped.contains(&c.name))
        .collect();
    log::info!(
        "Filtering kept {} of {initial_count} soundings ({} skip records)",
        kept.len(),
        skips.len()
    );

    let per_cpt: Vec<(Vec<Vs30Result>, Vec<CalculationFailure>)> = pool.install(|| {
        kept.par_iter()
            .map(|cpt| process_cpt(cpt, config))
            .collect()
    });

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (mut r, mut f) in per_cpt {
        results.append(&mut r);
        failures.append(&mut f);
    }
    log::info!(
        "Computed {} estimates, {} failures",
        results.len(),
        failures.len()
    );

    Ok(BatchOutput {
        results,
        failures,
        skips,
        neighbours,
        duplicate_names,
        initial_count,
    })
}

/// Evaluate the full correlation grid for one sounding. Errors become
/// [`CalculationFailure`] rows instead of propagating.
fn process_cpt(cpt: &Cpt, config: &Config) -> (Vec<Vs30Result>, Vec<CalculationFailure>) {
    let mut results = Vec::new();
    let mut failures = Vec::new();

    for vs_correlation in &config.cpt_vs_correlations {
        for vs30_correlation in &config.vs30_correlations {
            let estimate = VsProfile::from_cpt(cpt, vs_correlation)
                .map(|p| p.with_vs30_correlation(vs30_correlation))
                .and_then(|p| p.vs30());
            match estimate {
                Ok((vs30, vs30_sd)) => results.push(Vs30Result {
                    name: cpt.name.clone(),
                    nztm_x: cpt.nztm_x,
                    nztm_y: cpt.nztm_y,
                    vs_correlation: vs_correlation.clone(),
                    vs30_correlation: vs30_correlation.clone(),
                    vs30,
                    vs30_sd,
                }),
                Err(err) => {
                    log::warn!(
                        "{} / {vs_correlation} / {vs30_correlation}: {err}",
                        cpt.name
                    );
                    failures.push(CalculationFailure {
                        name: cpt.name.clone(),
                        vs_correlation: vs_correlation.clone(),
                        vs30_correlation: vs30_correlation.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    (results, failures)
}
