//! SPT-to-velocity correlations.

use crate::error::Vs30Error;
use crate::model::spt::{SoilType, Spt};

pub type SptVsFn = fn(&Spt) -> (Vec<f64>, Vec<f64>, Vec<f64>);

const REGISTRY: &[(&str, SptVsFn)] = &[("brandenberg_2010", brandenberg_2010)];

/// Registered correlation names, in registry order.
pub fn names() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Look up a correlation by name.
pub fn lookup(name: &str) -> Result<SptVsFn, Vs30Error> {
    REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
        .ok_or_else(|| Vs30Error::UnknownCorrelation {
            kind: "spt-vs",
            name: name.to_string(),
            available: names(),
        })
}

/// Brandenberg et al. (2010). Returns `(vs, vs_sd, depth)`; samples with a
/// non-positive N60 are dropped, so the depth array is returned alongside.
pub fn brandenberg_2010(spt: &Spt) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n60 = spt.n60();
    let mut vs = Vec::with_capacity(spt.depth.len());
    let mut vs_sd = Vec::with_capacity(spt.depth.len());
    let mut depth_values = Vec::with_capacity(spt.depth.len());

    for (idx, &depth) in spt.depth.iter().enumerate() {
        // The recorded depth is the start of the drive; the stress of
        // interest is after the second 6-inch increment, 0.3048 m deeper.
        let true_depth = depth + 0.3048;
        if n60[idx] <= 0.0 {
            continue;
        }
        let coeffs = stress_coefficients(true_depth, spt.soil_type[idx]);
        let ln_vs =
            coeffs.b0 + coeffs.b1 * n60[idx].ln() + coeffs.b2 * coeffs.stress.ln();
        vs.push(ln_vs.exp());
        vs_sd.push((coeffs.tao.powi(2) + coeffs.sigma.powi(2)).sqrt());
        depth_values.push(depth);
    }

    (vs, vs_sd, depth_values)
}

struct BrandenbergCoeffs {
    stress: f64,
    sigma: f64,
    tao: f64,
    b0: f64,
    b1: f64,
    b2: f64,
}

/// Per-soil-type regression coefficients and the vertical effective stress
/// model from Brandenberg et al. (2010), with the water table at 2 m.
fn stress_coefficients(depth: f64, soil_type: SoilType) -> BrandenbergCoeffs {
    const WATER_TABLE_DEPTH: f64 = 2.0;
    match soil_type {
        SoilType::Sand => {
            let stress = if depth > WATER_TABLE_DEPTH {
                WATER_TABLE_DEPTH * 18.0 + (depth - WATER_TABLE_DEPTH) * (20.0 - 9.81)
            } else {
                depth * 18.0
            };
            let sigma = if stress <= 200.0 {
                0.57 - 0.07 * stress.ln()
            } else {
                0.2
            };
            BrandenbergCoeffs {
                stress,
                sigma,
                tao: 0.217,
                b0: 4.045,
                b1: 0.096,
                b2: 0.236,
            }
        }
        SoilType::Silt => {
            let stress = if depth > WATER_TABLE_DEPTH {
                WATER_TABLE_DEPTH * 19.0 + (depth - WATER_TABLE_DEPTH) * (17.0 - 9.81)
            } else {
                depth * 19.0
            };
            let sigma = if stress <= 200.0 {
                0.31 - 0.03 * stress.ln()
            } else {
                0.15
            };
            BrandenbergCoeffs {
                stress,
                sigma,
                tao: 0.227,
                b0: 3.783,
                b1: 0.178,
                b2: 0.231,
            }
        }
        SoilType::Clay => {
            let stress = if depth > WATER_TABLE_DEPTH {
                WATER_TABLE_DEPTH * 16.0 + (depth - WATER_TABLE_DEPTH) * (18.0 - 9.81)
            } else {
                depth * 16.0
            };
            let sigma = if stress <= 200.0 {
                0.21 - 0.01 * stress.ln()
            } else {
                0.16
            };
            BrandenbergCoeffs {
                stress,
                sigma,
                tao: 0.227,
                b0: 3.996,
                b1: 0.230,
                b2: 0.164,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_blow_counts_are_dropped() {
        let spt = Spt::new("drop", vec![2.0, 4.0, 6.0], vec![10.0, 0.0, 12.0]).unwrap();
        let (vs, vs_sd, depth) = brandenberg_2010(&spt);
        assert_eq!(vs.len(), 2);
        assert_eq!(vs_sd.len(), 2);
        assert_eq!(depth, vec![2.0, 6.0]);
    }

    #[test]
    fn clay_coefficients_match_reference() {
        let spt = Spt::new("clay", vec![5.0], vec![20.0]).unwrap();
        let (vs, _, _) = brandenberg_2010(&spt);

        let true_depth = 5.0 + 0.3048;
        let stress: f64 = 2.0 * 16.0 + (true_depth - 2.0) * (18.0 - 9.81);
        let n60 = spt.n60()[0];
        let expected = (3.996 + 0.230 * n60.ln() + 0.164 * stress.ln()).exp();
        assert!((vs[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn lookup_rejects_unknown_names() {
        assert!(matches!(
            lookup("imai_1977"),
            Err(Vs30Error::UnknownCorrelation { kind: "spt-vs", .. })
        ));
    }
}
