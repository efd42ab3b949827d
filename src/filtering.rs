//! Quality and duplicate filtering for raw soundings.
//!
//! Every predicate is independent: all of them run over every sounding with
//! no short-circuiting, so a bad record carries its complete reason trail.
//! Unusable data is reported as [`SkipRecord`] values, never as errors.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::geo::{ll_dist, nztm_to_ll};
use crate::model::cpt::Cpt;
use crate::model::skip::{SkipReason, SkipRecord};

// ---------------------------------------------------------------------------
// Predicate catalogue
// ---------------------------------------------------------------------------

/// A single-sounding quality predicate. Implementations must tolerate empty
/// measurement arrays and return `None` rather than panic.
pub trait QualityCheck: Send + Sync {
    fn check(&self, cpt: &Cpt) -> Option<SkipRecord>;
}

/// Type 01: the record holds no samples at all.
pub struct NoData;

impl QualityCheck for NoData {
    fn check(&self, cpt: &Cpt) -> Option<SkipRecord> {
        if cpt.is_empty() {
            return Some(SkipRecord::new(
                &cpt.name,
                SkipReason::NoData,
                "No data in record",
            ));
        }
        None
    }
}

/// Type 02: the sounding's location was marked as a spatial duplicate by the
/// batch-wide scan run ahead of per-profile filtering.
pub struct DuplicateLocation {
    pub min_separation_m: f64,
    pub duplicate_names: BTreeSet<String>,
}

impl QualityCheck for DuplicateLocation {
    fn check(&self, cpt: &Cpt) -> Option<SkipRecord> {
        if self.duplicate_names.contains(&cpt.name) {
            return Some(SkipRecord::new(
                &cpt.name,
                SkipReason::DuplicateLocation,
                format!(
                    "Sounding within {} m of another sounding",
                    self.min_separation_m
                ),
            ));
        }
        None
    }
}

/// Type 03: more than `max_same_depth_count` samples share one depth value.
pub struct DuplicateDepth {
    pub max_same_depth_count: usize,
}

impl QualityCheck for DuplicateDepth {
    fn check(&self, cpt: &Cpt) -> Option<SkipRecord> {
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for &depth in &cpt.depth {
            *counts.entry(depth.to_bits()).or_insert(0) += 1;
        }
        if counts.values().any(|&c| c > self.max_same_depth_count) {
            return Some(SkipRecord::new(
                &cpt.name,
                SkipReason::DuplicateDepth,
                "Duplicate depth detected - invalid sounding",
            ));
        }
        None
    }
}

/// Type 04: any measurement channel value below the configured minimum.
pub struct ValueBelowThreshold {
    pub threshold: f64,
}

impl QualityCheck for ValueBelowThreshold {
    fn check(&self, cpt: &Cpt) -> Option<SkipRecord> {
        let below = |values: &[f64]| values.iter().any(|&v| v < self.threshold);
        if below(&cpt.qc) || below(&cpt.fs) || below(&cpt.u) {
            return Some(SkipRecord::new(
                &cpt.name,
                SkipReason::BelowThreshold,
                format!("Data values less than {}", self.threshold),
            ));
        }
        None
    }
}

/// Type 05: a sleeve-friction value whose decimal digits (zeros and the
/// decimal point removed) contain one digit repeated more than
/// `max_repeated_digits` times - a stuck-instrument heuristic.
pub struct RepeatedDigits {
    pub max_repeated_digits: usize,
}

impl QualityCheck for RepeatedDigits {
    fn check(&self, cpt: &Cpt) -> Option<SkipRecord> {
        let stuck = cpt
            .fs
            .iter()
            .any(|&v| max_digit_repeats(v) > self.max_repeated_digits);
        if stuck {
            return Some(SkipRecord::new(
                &cpt.name,
                SkipReason::RepeatedDigits,
                format!(
                    "More than {} repeated digits indicating a possible instrument problem",
                    self.max_repeated_digits
                ),
            ));
        }
        None
    }
}

/// Largest repeat count of any single digit in the value's literal decimal
/// form, ignoring zeros and the decimal point.
fn max_digit_repeats(value: f64) -> usize {
    let mut counts = [0usize; 10];
    for c in format!("{value}").chars() {
        if let Some(d) = c.to_digit(10) {
            if d != 0 {
                counts[d as usize] += 1;
            }
        }
    }
    counts.into_iter().max().unwrap_or(0)
}

/// Type 06: maximum depth below the configured minimum.
pub struct InsufficientDepth {
    pub min_max_depth_m: f64,
}

impl QualityCheck for InsufficientDepth {
    fn check(&self, cpt: &Cpt) -> Option<SkipRecord> {
        if cpt.max_depth()? < self.min_max_depth_m {
            return Some(SkipRecord::new(
                &cpt.name,
                SkipReason::InsufficientDepth,
                format!("Maximum depth less than {} m", self.min_max_depth_m),
            ));
        }
        None
    }
}

/// Type 07: depth span (max - min) below the configured minimum.
pub struct InsufficientDepthSpan {
    pub min_depth_span_m: f64,
}

impl QualityCheck for InsufficientDepthSpan {
    fn check(&self, cpt: &Cpt) -> Option<SkipRecord> {
        if cpt.depth_span()? < self.min_depth_span_m {
            return Some(SkipRecord::new(
                &cpt.name,
                SkipReason::InsufficientDepthSpan,
                format!("Depth span less than {} m", self.min_depth_span_m),
            ));
        }
        None
    }
}

/// The full predicate catalogue in reason-code order, parameterized from the
/// run configuration and the precomputed duplicate-location name set.
pub fn standard_checks(
    config: &Config,
    duplicate_names: BTreeSet<String>,
) -> Vec<Box<dyn QualityCheck>> {
    vec![
        Box::new(NoData),
        Box::new(DuplicateLocation {
            min_separation_m: config.min_separation_m,
            duplicate_names,
        }),
        Box::new(DuplicateDepth {
            max_same_depth_count: config.max_same_depth_count,
        }),
        Box::new(ValueBelowThreshold {
            threshold: config.min_value_threshold,
        }),
        Box::new(RepeatedDigits {
            max_repeated_digits: config.max_repeated_digits,
        }),
        Box::new(InsufficientDepth {
            min_max_depth_m: config.min_max_depth_m,
        }),
        Box::new(InsufficientDepthSpan {
            min_depth_span_m: config.min_depth_span_m,
        }),
    ]
}

/// Run every predicate against one sounding; no short-circuiting.
pub fn run_checks(checks: &[Box<dyn QualityCheck>], cpt: &Cpt) -> Vec<SkipRecord> {
    checks.iter().filter_map(|check| check.check(cpt)).collect()
}

/// The set of sounding names carrying at least one skip record.
pub fn skipped_names(records: &[SkipRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.name.clone()).collect()
}

// ---------------------------------------------------------------------------
// Spatial duplicates and nearest-neighbour diagnostics
// ---------------------------------------------------------------------------

/// Per-sounding nearest-neighbour diagnostic row, independent of any
/// filtering decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighbourRecord {
    pub name: String,
    pub distance_km: f64,
    pub closest_name: String,
    pub lon: f64,
    pub lat: f64,
    pub closest_lon: f64,
    pub closest_lat: f64,
}

/// For each sounding, the identity of and distance to its closest neighbour.
pub fn nearest_neighbours(cpts: &[Cpt]) -> Vec<NeighbourRecord> {
    let lls: Vec<(f64, f64)> = cpts
        .iter()
        .map(|c| {
            let (lat, lon) = nztm_to_ll(c.nztm_x, c.nztm_y);
            (lon, lat)
        })
        .collect();

    cpts.iter()
        .enumerate()
        .filter_map(|(i, cpt)| {
            let others: Vec<(f64, f64)> = lls
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &ll)| ll)
                .collect();
            let (other_idx, distance_km) =
                crate::geo::closest_location(&others, lls[i].0, lls[i].1)?;
            // Map back past the removed self entry.
            let j = if other_idx >= i { other_idx + 1 } else { other_idx };
            Some(NeighbourRecord {
                name: cpt.name.clone(),
                distance_km,
                closest_name: cpts[j].name.clone(),
                lon: lls[i].0,
                lat: lls[i].1,
                closest_lon: lls[j].0,
                closest_lat: lls[j].1,
            })
        })
        .collect()
}

/// Names of all soundings lying within `min_separation_m` of another.
///
/// Forward scan over not-yet-matched soundings: each pair within threshold is
/// marked mutually, and already-matched soundings are skipped as scan anchors
/// to avoid redundant re-comparison.
pub fn duplicate_location_names(cpts: &[Cpt], min_separation_m: f64) -> BTreeSet<String> {
    let lls: Vec<(f64, f64)> = cpts
        .iter()
        .map(|c| {
            let (lat, lon) = nztm_to_ll(c.nztm_x, c.nztm_y);
            (lon, lat)
        })
        .collect();
    let threshold_km = min_separation_m / 1000.0;

    let mut duplicates: BTreeSet<usize> = BTreeSet::new();
    for i in 0..cpts.len() {
        if duplicates.contains(&i) {
            continue;
        }
        for j in (i + 1)..cpts.len() {
            if duplicates.contains(&j) {
                continue;
            }
            let d = ll_dist(lls[i].0, lls[i].1, lls[j].0, lls[j].1);
            if d < threshold_km {
                duplicates.insert(i);
                duplicates.insert(j);
            }
        }
    }

    duplicates
        .into_iter()
        .map(|i| cpts[i].name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpt_at(name: &str, nztm_x: f64, depth: Vec<f64>) -> Cpt {
        let n = depth.len();
        Cpt::new(
            name,
            depth,
            vec![2.0; n],
            vec![0.05; n],
            vec![0.1; n],
            nztm_x,
            5_180_148.0,
        )
        .unwrap()
    }

    fn deep_cpt(name: &str, nztm_x: f64) -> Cpt {
        cpt_at(name, nztm_x, (0..=10).map(|i| i as f64).collect())
    }

    fn test_config() -> Config {
        Config::default()
    }

    #[test]
    fn soundings_5m_apart_are_mutual_duplicates() {
        let cpts = vec![
            deep_cpt("a", 1_570_634.0),
            deep_cpt("b", 1_570_639.0),
            deep_cpt("c", 1_575_000.0),
        ];
        let names = duplicate_location_names(&cpts, 10.0);
        assert_eq!(
            names,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );

        let checks = standard_checks(&test_config(), names);
        let a_records = run_checks(&checks, &cpts[0]);
        let b_records = run_checks(&checks, &cpts[1]);
        assert!(a_records
            .iter()
            .any(|r| r.reason == SkipReason::DuplicateLocation));
        assert!(b_records
            .iter()
            .any(|r| r.reason == SkipReason::DuplicateLocation));
        assert!(run_checks(&checks, &cpts[2]).is_empty());
    }

    #[test]
    fn empty_record_yields_exactly_the_no_data_reason() {
        let empty = cpt_at("empty", 1_570_634.0, vec![]);
        let checks = standard_checks(&test_config(), BTreeSet::new());
        let records = run_checks(&checks, &empty);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reason, SkipReason::NoData);
    }

    #[test]
    fn duplicate_depths_beyond_count_are_flagged() {
        let cpt = cpt_at("dup", 1_570_634.0, vec![0.0, 1.0, 1.0, 2.0, 8.0]);
        let flagged = DuplicateDepth {
            max_same_depth_count: 1,
        }
        .check(&cpt);
        assert!(flagged.is_some());

        let tolerated = DuplicateDepth {
            max_same_depth_count: 2,
        }
        .check(&cpt);
        assert!(tolerated.is_none());
    }

    #[test]
    fn values_below_threshold_are_flagged() {
        let mut cpt = deep_cpt("neg", 1_570_634.0);
        cpt.u[3] = -0.5;
        let record = ValueBelowThreshold { threshold: 0.0 }.check(&cpt).unwrap();
        assert_eq!(record.reason, SkipReason::BelowThreshold);
    }

    #[test]
    fn repeated_digits_flag_stuck_instrument() {
        let mut cpt = deep_cpt("stuck", 1_570_634.0);
        cpt.fs[2] = 0.5555555;
        assert!(RepeatedDigits {
            max_repeated_digits: 6
        }
        .check(&cpt)
        .is_some());
        assert!(RepeatedDigits {
            max_repeated_digits: 7
        }
        .check(&cpt)
        .is_none());
    }

    #[test]
    fn digit_counting_ignores_zeros_and_point() {
        assert_eq!(max_digit_repeats(0.5555555), 7);
        assert_eq!(max_digit_repeats(10.203), 1);
        assert_eq!(max_digit_repeats(0.0), 0);
    }

    #[test]
    fn depth_thresholds_are_monotone() {
        let cpt = cpt_at("shallow", 1_570_634.0, vec![0.0, 2.0, 4.0]);
        // Skipped at min depth 5, still skipped at any higher threshold.
        assert!(InsufficientDepth {
            min_max_depth_m: 5.0
        }
        .check(&cpt)
        .is_some());
        assert!(InsufficientDepth {
            min_max_depth_m: 8.0
        }
        .check(&cpt)
        .is_some());
        assert!(InsufficientDepth {
            min_max_depth_m: 3.0
        }
        .check(&cpt)
        .is_none());

        assert!(InsufficientDepthSpan {
            min_depth_span_m: 5.0
        }
        .check(&cpt)
        .is_some());
        assert!(InsufficientDepthSpan {
            min_depth_span_m: 3.0
        }
        .check(&cpt)
        .is_none());
    }

    #[test]
    fn pipeline_is_idempotent() {
        let cpts = vec![
            deep_cpt("a", 1_570_634.0),
            deep_cpt("b", 1_570_639.0),
            cpt_at("short", 1_580_000.0, vec![0.0, 1.0]),
        ];
        let dup_names = duplicate_location_names(&cpts, 10.0);
        let checks = standard_checks(&test_config(), dup_names);

        let run = |checks: &[Box<dyn QualityCheck>]| -> Vec<SkipRecord> {
            cpts.iter().flat_map(|c| run_checks(checks, c)).collect()
        };
        assert_eq!(run(&checks), run(&checks));
    }

    #[test]
    fn nearest_neighbours_reports_all_soundings() {
        let cpts = vec![
            deep_cpt("a", 1_570_634.0),
            deep_cpt("b", 1_570_639.0),
            deep_cpt("c", 1_575_000.0),
        ];
        let neighbours = nearest_neighbours(&cpts);
        assert_eq!(neighbours.len(), 3);
        let a = &neighbours[0];
        assert_eq!(a.closest_name, "b");
        assert!((a.distance_km - 0.005).abs() < 0.001, "{}", a.distance_km);
        // The diagnostic is independent of any filtering decision.
        let c = &neighbours[2];
        assert_eq!(c.name, "c");
    }
}
