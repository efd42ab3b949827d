use std::sync::OnceLock;

use crate::correlations;
use crate::error::Vs30Error;
use crate::model::cpt::Cpt;
use crate::model::spt::Spt;

// ---------------------------------------------------------------------------
// VsProfile - a velocity-vs-depth curve with memoized VsZ / Vs30
// ---------------------------------------------------------------------------

/// A shear-wave velocity profile derived from one sounding and one
/// correlation. The depth domain is clipped on construction to the capped
/// maximum analysis depth `min(30, floor(raw max depth))`, and the final
/// depth sample always lands exactly on that cap.
///
/// `vsz` and `vs30` are computed once on first access and cached for the
/// lifetime of the value, failures included. A changed input requires a new
/// `VsProfile`.
#[derive(Debug)]
pub struct VsProfile {
    pub name: String,
    pub vs: Vec<f64>,
    pub vs_sd: Vec<f64>,
    pub depth: Vec<f64>,
    pub vs_correlation: Option<String>,
    pub vs30_correlation: Option<String>,
    /// Capped maximum analysis depth (integer-valued, in metres).
    pub max_depth: f64,

    vsz: OnceLock<f64>,
    vs30: OnceLock<Result<(f64, f64), Vs30Error>>,
}

impl VsProfile {
    /// Build a profile from co-indexed velocity / sd / depth arrays, clipping
    /// to the capped maximum depth.
    ///
    /// When the cap falls between two samples, the boundary sample is
    /// synthesized from whichever original sample sits closer: the deeper
    /// sample is pulled up to the cap keeping its own velocity, or the
    /// shallower sample's velocity and sd are duplicated at the cap.
    pub fn new(
        name: impl Into<String>,
        mut vs: Vec<f64>,
        mut vs_sd: Vec<f64>,
        mut depth: Vec<f64>,
        vs_correlation: Option<String>,
        vs30_correlation: Option<String>,
    ) -> Result<Self, Vs30Error> {
        let name = name.into();
        if vs.len() != depth.len() || vs_sd.len() != depth.len() {
            return Err(Vs30Error::VelocityShapeMismatch {
                name,
                depth: depth.len(),
                vs: vs.len(),
                vs_sd: vs_sd.len(),
            });
        }

        let max_raw = depth
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or_else(|| Vs30Error::EmptyProfile { name: name.clone() })?;
        let reduce_to = (max_raw.floor() as i64).min(30) as f64;

        let mut mask: Vec<bool> = depth.iter().map(|&d| d <= reduce_to).collect();
        let last_keep = mask
            .iter()
            .rposition(|&m| m)
            .ok_or_else(|| Vs30Error::EmptyProfile { name: name.clone() })?;
        let first_remove = mask.iter().position(|&m| !m);

        if let Some(fr) = first_remove {
            if depth[last_keep] != reduce_to {
                let middle = (depth[fr] + depth[last_keep]) / 2.0;
                mask[fr] = true;
                depth[fr] = reduce_to;
                if middle >= reduce_to {
                    // The shallower sample is closer; duplicate its values at
                    // the new boundary depth.
                    vs[fr] = vs[last_keep];
                    vs_sd[fr] = vs_sd[last_keep];
                }
            }
        }

        let keep = |values: &mut Vec<f64>| {
            let mut it = mask.iter();
            values.retain(|_| *it.next().unwrap());
        };
        keep(&mut vs);
        keep(&mut vs_sd);
        keep(&mut depth);

        Ok(Self {
            name,
            vs,
            vs_sd,
            depth,
            vs_correlation,
            vs30_correlation,
            max_depth: reduce_to,
            vsz: OnceLock::new(),
            vs30: OnceLock::new(),
        })
    }

    /// Apply a registered CPT-to-velocity correlation to a sounding.
    pub fn from_cpt(cpt: &Cpt, correlation: &str) -> Result<Self, Vs30Error> {
        let correlate = correlations::cpt_vs::lookup(correlation)?;
        let (vs, vs_sd) = correlate(cpt);
        Self::new(
            cpt.name.clone(),
            vs,
            vs_sd,
            cpt.depth.clone(),
            Some(correlation.to_string()),
            None,
        )
    }

    /// Apply a registered SPT-to-velocity correlation to a test log.
    pub fn from_spt(spt: &Spt, correlation: &str) -> Result<Self, Vs30Error> {
        let correlate = correlations::spt_vs::lookup(correlation)?;
        let (vs, vs_sd, depth) = correlate(spt);
        Self::new(
            spt.name.clone(),
            vs,
            vs_sd,
            depth,
            Some(correlation.to_string()),
            None,
        )
    }

    /// Set the depth-correction correlation used when the profile is
    /// shallower than 30 m. Call before the first `vs30` access; the cached
    /// value is never recomputed.
    pub fn with_vs30_correlation(mut self, correlation: &str) -> Self {
        self.vs30_correlation = Some(correlation.to_string());
        self
    }

    /// Time-averaged shear-wave velocity over the capped maximum depth,
    /// integrating travel time through stacked constant-velocity layers.
    pub fn vsz(&self) -> f64 {
        *self.vsz.get_or_init(|| {
            let (vs_mid, depth_mid) = convert_to_midpoint(&self.vs, &self.depth);
            let mut time = 0.0;
            let mut ix = 1;
            while ix < vs_mid.len() {
                let dz = depth_mid[ix] - depth_mid[ix - 1];
                time += dz / vs_mid[ix];
                ix += 2;
            }
            self.max_depth / time
        })
    }

    /// Vs30 and its standard deviation.
    ///
    /// Equal to `(vsz, 0)` exactly when the capped maximum depth is 30 m;
    /// otherwise produced by the registered depth-correction correlation.
    pub fn vs30(&self) -> Result<(f64, f64), Vs30Error> {
        self.vs30.get_or_init(|| self.calc_vs30()).clone()
    }

    fn calc_vs30(&self) -> Result<(f64, f64), Vs30Error> {
        if self.max_depth == 30.0 {
            return Ok((self.vsz(), 0.0));
        }
        let correlation = self.vs30_correlation.as_deref().ok_or_else(|| {
            Vs30Error::MissingVs30Correlation {
                name: self.name.clone(),
            }
        })?;
        let correlate = correlations::vs30::lookup(correlation)?;
        correlate(self.vsz(), self.max_depth)
    }
}

// ---------------------------------------------------------------------------
// Midpoint conversion
// ---------------------------------------------------------------------------

/// Convert a sampled series into a stair-step layer series: each value spans
/// from its own depth to the midpoint between it and the next sample.
/// Returns `(measures, depths)` with paired transition points, suitable for
/// travel-time integration and staggered plotting.
///
/// A zero first measure is replaced with the second so the surface layer
/// never carries zero velocity.
pub fn convert_to_midpoint(measures: &[f64], depths: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut new_measures = Vec::with_capacity(measures.len() * 2);
    let mut new_depths = Vec::with_capacity(depths.len() * 2);
    let mut prev: Option<(f64, f64)> = None;
    let last = depths.len().saturating_sub(1);

    for (ix, &depth) in depths.iter().enumerate() {
        let measure = measures[ix];
        if ix == 0 {
            new_depths.push(0.0);
            new_measures.push(if measure == 0.0 && measures.len() > 1 {
                measures[1]
            } else {
                measure
            });
        } else if let Some((prev_depth, prev_measure)) = prev {
            let middle = (depth + prev_depth) / 2.0;
            new_depths.push(middle);
            new_measures.push(prev_measure);
            new_depths.push(middle);
            new_measures.push(measure);
        }
        if ix == last {
            new_depths.push(depth);
            new_measures.push(measure);
        }
        if ix != 0 || measure != 0.0 {
            prev = Some((depth, measure));
        }
    }

    (new_measures, new_depths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(vs: Vec<f64>, depth: Vec<f64>) -> VsProfile {
        let sd = vec![0.1; vs.len()];
        VsProfile::new("p", vs, sd, depth, None, None).unwrap()
    }

    #[test]
    fn midpoint_conversion_pairs_transitions() {
        let (m, d) = convert_to_midpoint(&[100.0, 200.0, 300.0], &[0.0, 1.0, 2.0]);
        assert_eq!(d, vec![0.0, 0.5, 0.5, 1.5, 1.5, 2.0]);
        assert_eq!(m, vec![100.0, 100.0, 200.0, 200.0, 300.0, 300.0]);
    }

    #[test]
    fn midpoint_replaces_zero_surface_value() {
        let (m, _) = convert_to_midpoint(&[0.0, 150.0], &[0.0, 1.0]);
        assert_eq!(m[0], 150.0);
    }

    #[test]
    fn vsz_of_constant_profile_is_that_velocity() {
        let p = profile(vec![200.0; 11], (0..=10).map(|i| i as f64).collect());
        assert!((p.vsz() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn boundary_identity_at_30_metres() {
        let p = profile(vec![250.0; 31], (0..=30).map(|i| i as f64).collect());
        assert_eq!(p.max_depth, 30.0);
        let (vs30, sd) = p.vs30().unwrap();
        assert_eq!(vs30, p.vsz());
        assert_eq!(sd, 0.0);
    }

    #[test]
    fn clipping_duplicates_shallower_sample_at_cap() {
        // Cap at 30; straddling samples are 29.4 and 31.0, midpoint 30.2, so
        // the shallower sample's values are duplicated at depth 30.
        let p = profile(vec![100.0, 200.0, 300.0, 400.0], vec![0.0, 28.6, 29.4, 31.0]);
        assert_eq!(p.max_depth, 30.0);
        assert_eq!(*p.depth.last().unwrap(), 30.0);
        assert_eq!(*p.vs.last().unwrap(), 300.0);
    }

    #[test]
    fn clipping_pulls_closer_deeper_sample_to_cap() {
        // Straddling samples are 29.0 and 30.5, midpoint 29.75 < 30, so the
        // deeper sample keeps its own velocity at the cap.
        let p = profile(vec![100.0, 200.0, 300.0], vec![0.0, 29.0, 30.5]);
        assert_eq!(*p.depth.last().unwrap(), 30.0);
        assert_eq!(*p.vs.last().unwrap(), 300.0);
    }

    #[test]
    fn sub_30_profile_without_correlation_fails() {
        let p = profile(vec![200.0; 11], (0..=10).map(|i| i as f64).collect());
        assert!(matches!(
            p.vs30(),
            Err(Vs30Error::MissingVs30Correlation { .. })
        ));
    }

    #[test]
    fn vs30_failure_is_memoized() {
        let p = profile(vec![200.0; 11], (0..=10).map(|i| i as f64).collect());
        let first = p.vs30();
        let second = p.vs30();
        assert_eq!(first, second);
    }
}
