//! Uncertainty-weighted fusion of several velocity profiles for one site.

use std::collections::BTreeMap;

use crate::error::Vs30Error;
use crate::model::vs_profile::{convert_to_midpoint, VsProfile};

// ---------------------------------------------------------------------------
// Weight sets
// ---------------------------------------------------------------------------

/// Mapping from an identity (profile or correlation name) to a non-negative
/// weight.
pub type WeightSet = BTreeMap<String, f64>;

/// Normalise a weight set to sum exactly 1, preserving ratios.
///
/// Raw sums outside [0.98, 1.02] and negative entries are rejected; an empty
/// set passes through (it means "no weighting at this level").
pub fn normalise_weights(set_name: &str, weights: &WeightSet) -> Result<WeightSet, Vs30Error> {
    if weights.is_empty() {
        return Ok(WeightSet::new());
    }
    for (key, &weight) in weights {
        if weight < 0.0 {
            return Err(Vs30Error::NegativeWeight {
                set: set_name.to_string(),
                key: key.clone(),
                weight,
            });
        }
    }
    let sum: f64 = weights.values().sum();
    if !(0.98..=1.02).contains(&sum) {
        return Err(Vs30Error::WeightSum {
            set: set_name.to_string(),
            sum,
        });
    }
    Ok(weights
        .iter()
        .map(|(key, &weight)| (key.clone(), weight / sum))
        .collect())
}

/// The three independent weight sets feeding a site aggregate: profile
/// identity, velocity correlation, depth-correction correlation. Each is
/// normalised separately before use.
#[derive(Debug, Clone, Default)]
pub struct AggregateWeights {
    pub profile: WeightSet,
    pub vs_correlation: WeightSet,
    pub vs30_correlation: WeightSet,
}

impl AggregateWeights {
    fn normalised(&self) -> Result<Self, Vs30Error> {
        Ok(Self {
            profile: normalise_weights("profile", &self.profile)?,
            vs_correlation: normalise_weights("vs correlation", &self.vs_correlation)?,
            vs30_correlation: normalise_weights("vs30 correlation", &self.vs30_correlation)?,
        })
    }
}

/// Effective weight for one profile: identity weight times the weight of
/// each correlation it used (1 where it used none). Expects already
/// normalised sets.
fn effective_weight(profile: &VsProfile, weights: &AggregateWeights) -> Result<f64, Vs30Error> {
    let lookup = |set: &WeightSet, set_name: &str, key: &Option<String>| match key {
        None => Ok(1.0),
        Some(_) if set.is_empty() => Ok(1.0),
        Some(key) => set
            .get(key)
            .copied()
            .ok_or_else(|| Vs30Error::MissingWeight {
                set: set_name.to_string(),
                key: key.clone(),
            }),
    };

    let identity = weights
        .profile
        .get(&profile.name)
        .copied()
        .ok_or_else(|| Vs30Error::MissingWeight {
            set: "profile".to_string(),
            key: profile.name.clone(),
        })?;
    let vs = lookup(
        &weights.vs_correlation,
        "vs correlation",
        &profile.vs_correlation,
    )?;
    let vs30 = lookup(
        &weights.vs30_correlation,
        "vs30 correlation",
        &profile.vs30_correlation,
    )?;
    Ok(identity * vs * vs30)
}

// ---------------------------------------------------------------------------
// Weighted Vs30
// ---------------------------------------------------------------------------

/// Combine several profiles for one site into a single Vs30 estimate with
/// propagated variance.
///
/// The mixture variance decomposes into within-estimate and between-estimate
/// terms: `sum(w_i * sd_i^2) + sum(w_i * (vs30_i - mean)^2)`. The reported
/// standard deviation is `ln(sqrt(variance))`, preserved from the reference
/// implementation even though it is dimensionally unusual; a single
/// contributing profile passes its own Vs30 and sd through unchanged.
pub fn weighted_vs30(
    profiles: &[VsProfile],
    weights: &AggregateWeights,
) -> Result<(f64, f64), Vs30Error> {
    if profiles.is_empty() {
        return Err(Vs30Error::EmptyAggregate);
    }
    let weights = weights.normalised()?;

    if profiles.len() == 1 {
        return profiles[0].vs30();
    }

    let mut effective: Vec<f64> = profiles
        .iter()
        .map(|p| effective_weight(p, &weights))
        .collect::<Result<_, _>>()?;
    let total: f64 = effective.iter().sum();
    if total <= 0.0 {
        return Err(Vs30Error::EmptyAggregate);
    }
    for weight in &mut effective {
        *weight /= total;
    }

    let estimates: Vec<(f64, f64)> = profiles
        .iter()
        .map(|p| p.vs30())
        .collect::<Result<_, _>>()?;

    let mean: f64 = estimates
        .iter()
        .zip(&effective)
        .map(|(&(vs30, _), &w)| w * vs30)
        .sum();
    let variance: f64 = estimates
        .iter()
        .zip(&effective)
        .map(|(&(vs30, sd), &w)| w * sd.powi(2) + w * (vs30 - mean).powi(2))
        .sum();
    let sd = if variance > 0.0 {
        variance.sqrt().ln()
    } else {
        0.0
    };
    Ok((mean, sd))
}

// ---------------------------------------------------------------------------
// Depth-resolved weighted average curve
// ---------------------------------------------------------------------------

/// A weighted-average velocity curve over depth, resampled on a uniform grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageCurve {
    pub depth: Vec<f64>,
    pub vs: Vec<f64>,
    pub vs_sd: Vec<f64>,
}

/// Grid step for the resampled average curve (m).
const CURVE_INCREMENT: f64 = 0.005;

/// Average the contributing profiles' stair-step curves on a fine uniform
/// grid up to the deepest profile.
///
/// At each grid point only profiles with a nonzero value there contribute,
/// with weights renormalised over just those contributors; depth ranges with
/// no data are bridged by holding the last known value until data resumes.
pub fn weighted_average_curve(
    profiles: &[VsProfile],
    weights: &AggregateWeights,
) -> Result<AverageCurve, Vs30Error> {
    if profiles.is_empty() {
        return Err(Vs30Error::EmptyAggregate);
    }
    let weights = weights.normalised()?;
    let effective: Vec<f64> = profiles
        .iter()
        .map(|p| effective_weight(p, &weights))
        .collect::<Result<_, _>>()?;

    let midpoints: Vec<(Vec<f64>, Vec<f64>, Vec<f64>)> = profiles
        .iter()
        .map(|p| {
            let (vs, depth) = convert_to_midpoint(&p.vs, &p.depth);
            let (vs_sd, _) = convert_to_midpoint(&p.vs_sd, &p.depth);
            (vs, depth, vs_sd)
        })
        .collect();

    let max_depth = profiles
        .iter()
        .map(|p| p.max_depth)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut depth_values: Vec<f64> = Vec::new();
    let mut weighted_vs: Vec<f64> = Vec::new();
    let mut weighted_sd: Vec<f64> = Vec::new();
    let mut in_gap = false;
    let mut cur_depth = 0.0;

    while cur_depth <= max_depth {
        let mut value_sum = 0.0;
        let mut total_weight = 0.0;
        let mut contributions: Vec<(f64, f64)> = Vec::new();

        for (ix, profile) in profiles.iter().enumerate() {
            let (first, last) = match (profile.depth.first(), profile.depth.last()) {
                (Some(&f), Some(&l)) => (f, l),
                _ => continue,
            };
            if !(first <= cur_depth && cur_depth <= last) {
                continue;
            }
            let (vs_mid, depth_mid, sd_mid) = &midpoints[ix];
            let Some(idx) = depth_mid.iter().rposition(|&d| cur_depth >= d) else {
                continue;
            };
            let value = vs_mid[idx];
            if value != 0.0 {
                value_sum += value * effective[ix];
                total_weight += effective[ix];
                contributions.push((sd_mid[idx], effective[ix]));
            }
        }

        if value_sum != 0.0 {
            let variance: f64 = contributions
                .iter()
                .map(|&(sd, w)| (w / total_weight) * sd.powi(2))
                .sum();
            let average_sd = variance.sqrt();
            let average_vs = value_sum / total_weight;

            if in_gap {
                // Bridge the gap: hold the previous value to the midpoint of
                // the silent range, then step to the resumed value.
                if let (Some(&prev_depth), Some(&prev_vs), Some(&prev_sd)) = (
                    depth_values.last(),
                    weighted_vs.last(),
                    weighted_sd.last(),
                ) {
                    let middle = (prev_depth + cur_depth) / 2.0;
                    depth_values.extend([middle, middle]);
                    weighted_vs.extend([prev_vs, average_vs]);
                    weighted_sd.extend([prev_sd, average_sd]);
                }
                in_gap = false;
            }
            depth_values.push(cur_depth);
            weighted_vs.push(average_vs);
            weighted_sd.push(average_sd);
        } else {
            in_gap = true;
        }
        cur_depth += CURVE_INCREMENT;
    }

    if depth_values.is_empty() {
        return Err(Vs30Error::EmptyAggregate);
    }
    if depth_values[0] != 0.0 {
        depth_values.insert(0, 0.0);
        weighted_vs.insert(0, weighted_vs[0]);
        weighted_sd.insert(0, weighted_sd[0]);
    }

    Ok(AverageCurve {
        depth: depth_values,
        vs: weighted_vs,
        vs_sd: weighted_sd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight_set(entries: &[(&str, f64)]) -> WeightSet {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    fn flat_profile(name: &str, vs: f64, max_depth: usize) -> VsProfile {
        let n = max_depth + 1;
        VsProfile::new(
            name,
            vec![vs; n],
            vec![0.1; n],
            (0..n).map(|i| i as f64).collect(),
            None,
            None,
        )
        .unwrap()
        .with_vs30_correlation("boore_2004")
    }

    #[test]
    fn normalisation_preserves_ratios() {
        let weights = weight_set(&[("a", 0.5), ("b", 0.52)]);
        let normalised = normalise_weights("test", &weights).unwrap();
        let sum: f64 = normalised.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((normalised["a"] / normalised["b"] - 0.5 / 0.52).abs() < 1e-12);
    }

    #[test]
    fn normalisation_rejects_out_of_band_sums() {
        let high = weight_set(&[("a", 0.5), ("b", 0.55)]);
        assert!(matches!(
            normalise_weights("test", &high),
            Err(Vs30Error::WeightSum { .. })
        ));
        let low = weight_set(&[("a", 0.4), ("b", 0.4)]);
        assert!(matches!(
            normalise_weights("test", &low),
            Err(Vs30Error::WeightSum { .. })
        ));
    }

    #[test]
    fn normalisation_rejects_negative_weights() {
        let weights = weight_set(&[("a", 1.2), ("b", -0.2)]);
        assert!(matches!(
            normalise_weights("test", &weights),
            Err(Vs30Error::NegativeWeight { .. })
        ));
    }

    #[test]
    fn empty_set_passes_through() {
        assert!(normalise_weights("test", &WeightSet::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn single_profile_aggregate_is_identity() {
        let profile = flat_profile("only", 220.0, 15);
        let (expected_vs30, expected_sd) = profile.vs30().unwrap();

        let weights = AggregateWeights {
            profile: weight_set(&[("only", 1.0)]),
            ..Default::default()
        };
        let (vs30, sd) = weighted_vs30(&[profile], &weights).unwrap();
        assert_eq!(vs30, expected_vs30);
        assert_eq!(sd, expected_sd);
    }

    #[test]
    fn two_profile_mixture_matches_hand_calculation() {
        let a = flat_profile("a", 200.0, 15);
        let b = flat_profile("b", 300.0, 15);
        let (vs30_a, sd_a) = a.vs30().unwrap();
        let (vs30_b, sd_b) = b.vs30().unwrap();

        let weights = AggregateWeights {
            profile: weight_set(&[("a", 0.6), ("b", 0.4)]),
            ..Default::default()
        };
        let (mean, sd) = weighted_vs30(&[a, b], &weights).unwrap();

        let expected_mean = 0.6 * vs30_a + 0.4 * vs30_b;
        let expected_var = 0.6 * sd_a.powi(2)
            + 0.4 * sd_b.powi(2)
            + 0.6 * (vs30_a - expected_mean).powi(2)
            + 0.4 * (vs30_b - expected_mean).powi(2);
        assert!((mean - expected_mean).abs() < 1e-9);
        assert!((sd - expected_var.sqrt().ln()).abs() < 1e-9);
    }

    #[test]
    fn empty_aggregate_is_rejected() {
        assert!(matches!(
            weighted_vs30(&[], &AggregateWeights::default()),
            Err(Vs30Error::EmptyAggregate)
        ));
    }

    #[test]
    fn average_curve_of_one_flat_profile_is_flat() {
        let profile = flat_profile("flat", 250.0, 10);
        let weights = AggregateWeights {
            profile: weight_set(&[("flat", 1.0)]),
            ..Default::default()
        };
        let curve = weighted_average_curve(&[profile], &weights).unwrap();
        assert_eq!(curve.depth[0], 0.0);
        assert!(curve.vs.iter().all(|&v| (v - 250.0).abs() < 1e-9));
        assert!(curve.vs_sd.iter().all(|&sd| (sd - 0.1).abs() < 1e-9));
        assert!(*curve.depth.last().unwrap() <= 10.0);
    }

    #[test]
    fn average_curve_bridges_zero_velocity_gaps() {
        // Velocity drops to zero over the middle of the profile; the curve
        // must hold the last known value to the midpoint of the silent range
        // and step to the resumed value there, never averaging in the zeros.
        let vs = vec![
            200.0, 200.0, 200.0, 200.0, 0.0, 0.0, 0.0, 300.0, 300.0, 300.0, 300.0,
        ];
        let depth: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let profile =
            VsProfile::new("gapped", vs, vec![0.1; 11], depth, None, None).unwrap();
        let weights = AggregateWeights {
            profile: weight_set(&[("gapped", 1.0)]),
            ..Default::default()
        };
        let curve = weighted_average_curve(&[profile], &weights).unwrap();

        assert!(curve
            .vs
            .iter()
            .all(|&v| (v - 200.0).abs() < 1e-6 || (v - 300.0).abs() < 1e-6));

        // The resume point is a doubled depth near the centre of the gap,
        // stepping from the held value to the resumed one.
        let resume = curve
            .vs
            .iter()
            .position(|&v| (v - 300.0).abs() < 1e-6)
            .unwrap();
        assert!(resume > 0);
        assert_eq!(curve.depth[resume], curve.depth[resume - 1]);
        assert!((curve.vs[resume - 1] - 200.0).abs() < 1e-6);
        assert!((curve.depth[resume] - 5.0).abs() < 0.05, "{}", curve.depth[resume]);
    }

    #[test]
    fn average_curve_renormalises_over_contributors() {
        // Profile b stops at 5 m; below that only a contributes and the
        // curve must equal a's velocity exactly.
        let a = flat_profile("a", 200.0, 10);
        let b = flat_profile("b", 400.0, 5);
        let weights = AggregateWeights {
            profile: weight_set(&[("a", 0.5), ("b", 0.5)]),
            ..Default::default()
        };
        let curve = weighted_average_curve(&[a, b], &weights).unwrap();

        let at = |target: f64| -> f64 {
            let idx = curve
                .depth
                .iter()
                .rposition(|&d| d <= target + 1e-9)
                .unwrap();
            curve.vs[idx]
        };
        assert!((at(3.0) - 300.0).abs() < 1e-6, "mixed zone: {}", at(3.0));
        assert!((at(9.0) - 200.0).abs() < 1e-6, "solo zone: {}", at(9.0));
    }
}
