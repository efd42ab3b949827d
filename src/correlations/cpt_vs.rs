//! CPT-to-velocity correlations.
//!
//! Each correlation is a pure function from a sounding to co-indexed
//! `(velocity, velocity-sd)` arrays. The standard-deviation models differ
//! deliberately between correlations (constant, piecewise-linear in depth,
//! residual-based) and are kept separate rather than unified.

use crate::error::Vs30Error;
use crate::model::cpt::{Cpt, PA};

/// Substitute for non-positive derived values ahead of a power law.
const GUARD: f64 = 1e-4;

pub type CptVsFn = fn(&Cpt) -> (Vec<f64>, Vec<f64>);

const REGISTRY: &[(&str, CptVsFn)] = &[
    ("andrus_2007", andrus_2007),
    ("robertson_2009", robertson_2009),
    ("hegazy_2006", hegazy_2006),
    ("mcgann_2015", mcgann_2015),
    ("mcgann_2018", mcgann_2018),
];

/// Registered correlation names, in registry order.
pub fn names() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Look up a correlation by name.
pub fn lookup(name: &str) -> Result<CptVsFn, Vs30Error> {
    REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
        .ok_or_else(|| Vs30Error::UnknownCorrelation {
            kind: "cpt-vs",
            name: name.to_string(),
            available: names(),
        })
}

/// McGann et al. (2015b), Christchurch-wide CPT-Vs correlation.
/// qc and fs enter in kPa; the sd is piecewise linear in depth.
pub fn mcgann_2015(cpt: &Cpt) -> (Vec<f64>, Vec<f64>) {
    let vs = (0..cpt.len())
        .map(|i| {
            18.4 * (cpt.qc[i] * 1000.0).powf(0.144)
                * (cpt.fs[i] * 1000.0).powf(0.083)
                * cpt.depth[i].powf(0.278)
        })
        .collect();
    let vs_sd = cpt
        .depth
        .iter()
        .map(|&d| {
            if d <= 5.0 {
                0.162
            } else if d < 10.0 {
                0.216 - 0.0108 * d
            } else {
                0.108
            }
        })
        .collect();
    (vs, vs_sd)
}

/// McGann et al. (2018), loess-soil variant with a constant sd.
pub fn mcgann_2018(cpt: &Cpt) -> (Vec<f64>, Vec<f64>) {
    let vs = (0..cpt.len())
        .map(|i| {
            103.6
                * (cpt.qc[i] * 1000.0).powf(0.0074)
                * (cpt.fs[i] * 1000.0).powf(0.130)
                * cpt.depth[i].powf(0.253)
        })
        .collect();
    let vs_sd = vec![0.2367; cpt.len()];
    (vs, vs_sd)
}

/// Andrus et al. (2007) for Holocene-age soils (ASF = 1).
/// The residual sd `ln(24/vs + 1)` degenerates to infinity at zero depth and
/// is clamped to zero there.
pub fn andrus_2007(cpt: &Cpt) -> (Vec<f64>, Vec<f64>) {
    let ic = cpt.ic();
    let vs: Vec<f64> = (0..cpt.len())
        .map(|i| {
            let qt = cpt.qt()[i].max(GUARD);
            2.27 * (qt * 1000.0).powf(0.412) * ic[i].powf(0.989) * cpt.depth[i].powf(0.033)
        })
        .collect();
    let vs_sd = vs
        .iter()
        .map(|&v| {
            let sd = (24.0 / v + 1.0).ln();
            if sd.is_infinite() {
                0.0
            } else {
                sd
            }
        })
        .collect();
    (vs, vs_sd)
}

/// Robertson (2009); sd not published, set to 0.2.
pub fn robertson_2009(cpt: &Cpt) -> (Vec<f64>, Vec<f64>) {
    let ic = cpt.ic();
    let eff = cpt.eff_stress();
    let vs = (0..cpt.len())
        .map(|i| {
            let qtn = cpt.qtn()[i].max(GUARD);
            let alpha = 10f64.powf(0.55 * ic[i] + 1.68);
            (alpha * qtn).powf(0.5) * (eff[i] / PA).powf(0.25)
        })
        .collect();
    (vs, vec![0.2; cpt.len()])
}

/// Hegazy & Mayne (2006); sd not published, set to 0.2.
pub fn hegazy_2006(cpt: &Cpt) -> (Vec<f64>, Vec<f64>) {
    let ic = cpt.ic();
    let eff = cpt.eff_stress();
    let vs = (0..cpt.len())
        .map(|i| {
            let qtn = cpt.qtn()[i].max(GUARD);
            0.0831 * qtn * (eff[i] / PA).powf(0.25) * (1.786 * ic[i]).exp()
        })
        .collect();
    (vs, vec![0.2; cpt.len()])
}
