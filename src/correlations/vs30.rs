//! VsZ-to-Vs30 depth-correction correlations.
//!
//! Both correlations index a coefficient table by `floor(max depth)` minus a
//! fixed offset. Their shallow-profile policies differ on purpose:
//! `boore_2011` fails hard, `boore_2004` returns a NaN sentinel pair.

use crate::error::Vs30Error;

pub type Vs30Fn = fn(vsz: f64, max_depth: f64) -> Result<(f64, f64), Vs30Error>;

const REGISTRY: &[(&str, Vs30Fn)] = &[("boore_2011", boore_2011), ("boore_2004", boore_2004)];

/// Registered correlation names, in registry order.
pub fn names() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Look up a correlation by name.
pub fn lookup(name: &str) -> Result<Vs30Fn, Vs30Error> {
    REGISTRY
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
        .ok_or_else(|| Vs30Error::UnknownCorrelation {
            kind: "vs30",
            name: name.to_string(),
            available: names(),
        })
}

// Boore et al. (2011) coefficients, rows for max depths 5..=29 m:
// (C0, C1, C2, SD).
const BOORE_2011_COEFFS: [[f64; 4]; 25] = [
    [0.2046, 1.318, -0.1174, 0.119],
    [-0.06072, 1.482, -0.1423, 0.111],
    [-0.2744, 1.607, -0.1600, 0.103],
    [-0.3723, 1.649, -0.1634, 0.097],
    [-0.4941, 1.707, -0.1692, 0.090],
    [-0.5438, 1.715, -0.1667, 0.084],
    [-0.6006, 1.727, -0.1649, 0.078],
    [-0.6082, 1.707, -0.1576, 0.072],
    [-0.6322, 1.698, -0.1524, 0.067],
    [-0.6118, 1.659, -0.1421, 0.062],
    [-0.5780, 1.611, -0.1303, 0.056],
    [-0.5430, 1.565, -0.1193, 0.052],
    [-0.5282, 1.535, -0.1115, 0.047],
    [-0.4960, 1.494, -0.1020, 0.043],
    [-0.4552, 1.447, -0.09156, 0.038],
    [-0.4059, 1.396, -0.08064, 0.035],
    [-0.3827, 1.365, -0.07338, 0.030],
    [-0.3531, 1.331, -0.06585, 0.027],
    [-0.3158, 1.291, -0.05751, 0.023],
    [-0.2736, 1.250, -0.04896, 0.019],
    [-0.2227, 1.202, -0.03943, 0.016],
    [-0.1768, 1.159, -0.03087, 0.013],
    [-0.1349, 1.120, -0.02310, 0.009],
    [-0.09038, 1.080, -0.01527, 0.006],
    [-0.04612, 1.040, -0.007618, 0.003],
];

// Boore et al. (2004) coefficients, rows for max depths 10..=29 m:
// (a, b, sigma).
const BOORE_2004_COEFFS: [[f64; 3]; 20] = [
    [0.042062, 1.0292, 0.07126],
    [0.02214, 1.0341, 0.064722],
    [0.012571, 1.0352, 0.059353],
    [0.014186, 1.0318, 0.054754],
    [0.0123, 1.0297, 0.050086],
    [0.013795, 1.0263, 0.045925],
    [0.013893, 1.0237, 0.042219],
    [0.019565, 1.019, 0.039422],
    [0.024879, 1.0144, 0.036365],
    [0.025614, 1.0117, 0.033233],
    [0.025439, 1.0095, 0.030181],
    [0.025311, 1.0072, 0.027001],
    [0.0269, 1.0044, 0.024087],
    [0.022207, 1.0042, 0.020826],
    [0.016891, 1.0043, 0.017676],
    [0.011483, 1.0045, 0.014691],
    [0.0065646, 1.0045, 0.011452],
    [0.002519, 1.0043, 0.0083871],
    [0.00077322, 1.0031, 0.0055264],
    [0.00043143, 1.0015, 0.0027355],
];

/// Boore et al. (2011). Combines the tabulated residual with an analytic
/// derivative-based propagation of the VsZ uncertainty; fails hard when the
/// profile does not reach the 5 m table floor. Depths at or past 30 m use
/// the last (29 m) row.
pub fn boore_2011(vsz: f64, max_depth: f64) -> Result<(f64, f64), Vs30Error> {
    let index = max_depth.floor() as i64 - 5;
    if index < 0 {
        return Err(Vs30Error::ProfileTooShallow {
            correlation: "boore_2011",
            max_depth,
        });
    }
    let index = (index as usize).min(BOORE_2011_COEFFS.len() - 1);
    let [c0, c1, c2, sd] = BOORE_2011_COEFFS[index];

    let log10_vsz = vsz.log10();
    let vs30 = 10f64.powf(c0 + c1 * log10_vsz + c2 * log10_vsz.powi(2));

    let log_vsz = vsz.ln();
    let d_vs30 = (c1 * 10f64.powf(c1 * log_vsz.log10())
        + 2.0 * c2 * log_vsz.log10() * 10f64.powf(c2 * log_vsz.log10().powi(2)))
        / log_vsz;
    let vs30_sd = (sd.powi(2) + d_vs30.powi(2)).sqrt();

    Ok((vs30, vs30_sd))
}

/// Boore et al. (2004). Returns `(NaN, NaN)` for profiles shallower than the
/// 10 m table floor rather than failing; depths at or past 30 m use the last
/// (29 m) row.
pub fn boore_2004(vsz: f64, max_depth: f64) -> Result<(f64, f64), Vs30Error> {
    let index = max_depth.floor() as i64 - 10;
    if index < 0 {
        return Ok((f64::NAN, f64::NAN));
    }
    let index = (index as usize).min(BOORE_2004_COEFFS.len() - 1);
    let [a, b, sigma] = BOORE_2004_COEFFS[index];
    let vs30 = 10f64.powf(a + b * vsz.log10());
    Ok((vs30, sigma))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boore_2011_matches_reference_at_20_metres() {
        let (vs30, vs30_sd) = boore_2011(250.0, 20.0).unwrap();
        let [c0, c1, c2, sd] = BOORE_2011_COEFFS[15];
        let expected = 10f64.powf(c0 + c1 * 250f64.log10() + c2 * 250f64.log10().powi(2));
        assert!((vs30 - expected).abs() < 1e-9);
        assert!(vs30_sd > sd, "propagated sd must exceed the residual alone");
    }

    #[test]
    fn boore_2011_fails_below_table_floor() {
        assert!(matches!(
            boore_2011(250.0, 4.0),
            Err(Vs30Error::ProfileTooShallow {
                correlation: "boore_2011",
                ..
            })
        ));
    }

    #[test]
    fn boore_2004_returns_nan_below_table_floor() {
        let (vs30, sd) = boore_2004(250.0, 9.0).unwrap();
        assert!(vs30.is_nan());
        assert!(sd.is_nan());
    }

    #[test]
    fn boore_2004_uses_tabulated_sigma() {
        let (vs30, sd) = boore_2004(250.0, 10.0).unwrap();
        let [a, b, sigma] = BOORE_2004_COEFFS[0];
        assert!((vs30 - 10f64.powf(a + b * 250f64.log10())).abs() < 1e-9);
        assert_eq!(sd, sigma);
    }

    #[test]
    fn depths_past_the_table_end_use_the_last_row() {
        assert_eq!(boore_2011(250.0, 30.0).unwrap(), boore_2011(250.0, 29.0).unwrap());
        assert_eq!(boore_2011(250.0, 45.5).unwrap(), boore_2011(250.0, 29.0).unwrap());
        assert_eq!(boore_2004(250.0, 30.0).unwrap(), boore_2004(250.0, 29.0).unwrap());
    }

    #[test]
    fn lookup_lists_valid_names_on_failure() {
        match lookup("boore_1997").unwrap_err() {
            Vs30Error::UnknownCorrelation { available, .. } => {
                assert_eq!(available, vec!["boore_2011", "boore_2004"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
