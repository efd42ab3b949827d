use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Batch configuration
// ---------------------------------------------------------------------------

/// Run configuration, loaded once from a JSON file at process start and
/// passed explicitly to every component that needs it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// CSV file with one sounding per row (see [`crate::io::load_soundings`]).
    pub input_path: PathBuf,
    /// Directory for all output tables, created if missing.
    pub output_dir: PathBuf,

    /// Two soundings closer than this are spatial duplicates.
    pub min_separation_m: f64,
    /// Maximum number of samples allowed to share one depth value.
    pub max_same_depth_count: usize,
    /// Any channel value below this flags the sounding.
    pub min_value_threshold: f64,
    /// Maximum times one digit may repeat within a single sleeve-friction
    /// value before it is treated as a stuck instrument.
    pub max_repeated_digits: usize,
    /// Minimum allowed maximum depth (m).
    pub min_max_depth_m: f64,
    /// Minimum allowed depth span (m).
    pub min_depth_span_m: f64,

    /// Worker pool size for the per-profile stages.
    pub n_workers: usize,

    /// Profile-to-velocity correlations to apply.
    pub cpt_vs_correlations: Vec<String>,
    /// Depth-correction correlations to apply.
    pub vs30_correlations: Vec<String>,

    /// Previously written duplicate-name artifact; when set, the spatial
    /// duplicate scan is skipped and the names are read from this file.
    pub duplicate_name_cache: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("soundings.csv"),
            output_dir: PathBuf::from("output"),
            min_separation_m: 10.0,
            max_same_depth_count: 1,
            min_value_threshold: 0.0,
            max_repeated_digits: 6,
            min_max_depth_m: 5.0,
            min_depth_span_m: 5.0,
            n_workers: 4,
            cpt_vs_correlations: crate::correlations::cpt_vs::names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vs30_correlations: crate::correlations::vs30::names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            duplicate_name_cache: None,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}
