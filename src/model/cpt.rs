use std::sync::OnceLock;

use crate::error::Vs30Error;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

/// Atmospheric pressure (MPa).
pub const PA: f64 = 0.1;
/// Unit weight of water (kN/m3).
const GAMMA_W: f64 = 9.80665;
/// Pore-pressure gradient of water (MPa/m).
const WATER_GRADIENT: f64 = 0.00981;
/// Fallback total unit weight (MN/m3) when resistance or friction is unusable.
const DEFAULT_GAMMA: f64 = 0.00981 * 1.9;
/// Substitute for non-positive values ahead of a logarithm.
const EPS: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Cpt - one cone penetration sounding
// ---------------------------------------------------------------------------

/// A cone penetration sounding: a depth series with cone resistance, sleeve
/// friction and pore pressure channels (all MPa), plus the site location in
/// NZTM2000 coordinates.
///
/// Derived parameters (`qt`, `ic`, `qtn`, `eff_stress`) are computed once on
/// first access and cached for the lifetime of the value. There is no
/// invalidation path: a changed input requires constructing a new `Cpt`.
#[derive(Debug)]
pub struct Cpt {
    pub name: String,
    pub depth: Vec<f64>,
    pub qc: Vec<f64>,
    pub fs: Vec<f64>,
    pub u: Vec<f64>,
    pub nztm_x: f64,
    pub nztm_y: f64,
    /// Depth to the ground-water table (m).
    pub ground_water_level: f64,
    /// Cone net area ratio.
    pub net_area_ratio: f64,

    qt: OnceLock<Vec<f64>>,
    ic: OnceLock<Vec<f64>>,
    stress: OnceLock<StressParams>,
}

#[derive(Debug)]
struct StressParams {
    qtn: Vec<f64>,
    eff_stress: Vec<f64>,
}

impl Cpt {
    /// Build a sounding, validating that all channels share the depth
    /// array's length.
    pub fn new(
        name: impl Into<String>,
        depth: Vec<f64>,
        qc: Vec<f64>,
        fs: Vec<f64>,
        u: Vec<f64>,
        nztm_x: f64,
        nztm_y: f64,
    ) -> Result<Self, Vs30Error> {
        let name = name.into();
        if qc.len() != depth.len() || fs.len() != depth.len() || u.len() != depth.len() {
            return Err(Vs30Error::ShapeMismatch {
                name,
                depth: depth.len(),
                qc: qc.len(),
                fs: fs.len(),
                u: u.len(),
            });
        }
        Ok(Self {
            name,
            depth,
            qc,
            fs,
            u,
            nztm_x,
            nztm_y,
            ground_water_level: 1.0,
            net_area_ratio: 0.8,
            qt: OnceLock::new(),
            ic: OnceLock::new(),
            stress: OnceLock::new(),
        })
    }

    /// Override the default 1 m ground-water depth. Call before any derived
    /// parameter has been accessed.
    pub fn with_ground_water_level(mut self, metres: f64) -> Self {
        self.ground_water_level = metres;
        self
    }

    /// Override the default 0.8 net area ratio. Call before any derived
    /// parameter has been accessed.
    pub fn with_net_area_ratio(mut self, ratio: f64) -> Self {
        self.net_area_ratio = ratio;
        self
    }

    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }

    pub fn max_depth(&self) -> Option<f64> {
        self.depth.iter().copied().reduce(f64::max)
    }

    pub fn min_depth(&self) -> Option<f64> {
        self.depth.iter().copied().reduce(f64::min)
    }

    pub fn depth_span(&self) -> Option<f64> {
        Some(self.max_depth()? - self.min_depth()?)
    }

    // -- Derived geomechanical parameters (lazy) --

    /// Net cone resistance, corrected for pore pressure on the cone shoulder:
    /// `qt = qc - u * (1 - net_area_ratio)`.
    pub fn qt(&self) -> &[f64] {
        self.qt.get_or_init(|| {
            self.qc
                .iter()
                .zip(&self.u)
                .map(|(&qc, &u)| qc - u * (1.0 - self.net_area_ratio))
                .collect()
        })
    }

    /// Non-normalised soil behaviour-type index after Robertson (2010).
    ///
    /// Non-positive resistance or friction values are substituted with a
    /// small positive constant before the logarithms so the index stays
    /// finite instead of propagating NaN through the batch.
    pub fn ic(&self) -> &[f64] {
        self.ic.get_or_init(|| {
            self.qc
                .iter()
                .zip(&self.fs)
                .map(|(&qc, &fs)| {
                    let qc = qc.max(EPS);
                    let fs = fs.max(EPS);
                    let rf = fs / qc * 100.0;
                    ((3.47 - (qc / PA).log10()).powi(2) + (rf.log10() + 1.22).powi(2)).sqrt()
                })
                .collect()
        })
    }

    /// Normalised stress-corrected cone resistance.
    pub fn qtn(&self) -> &[f64] {
        &self.stress_params().qtn
    }

    /// Effective vertical overburden stress (MPa).
    pub fn eff_stress(&self) -> &[f64] {
        &self.stress_params().eff_stress
    }

    /// Soil total unit weight (MN/m3) after Robertson & Cabal (2010), with a
    /// constant fallback wherever resistance or friction is non-positive.
    pub fn unit_weight(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                if self.qc[i] <= 0.0 || self.fs[i] <= 0.0 {
                    return DEFAULT_GAMMA;
                }
                let qt = self.qt()[i].max(EPS);
                let rf = self.fs[i] / qt * 100.0;
                ((0.27 * rf.log10() + 0.36 * (qt / PA).log10() + 1.236) * GAMMA_W) / 1000.0
            })
            .collect()
    }

    fn stress_params(&self) -> &StressParams {
        self.stress.get_or_init(|| self.calc_stress_params())
    }

    /// Forward-difference integration of the unit-weight model down the
    /// profile, subtracting hydrostatic pore pressure below the water table.
    /// The first sample is forced equal to the second to avoid dividing by a
    /// zero stress at the surface.
    fn calc_stress_params(&self) -> StressParams {
        let n = self.len();
        let gamma = self.unit_weight();
        let qt = self.qt();
        let ic = self.ic();

        let mut total_stress = vec![0.0; n];
        let mut u0 = vec![0.0; n];
        for i in 1..n {
            total_stress[i] = gamma[i] * (self.depth[i] - self.depth[i - 1]) + total_stress[i - 1];
            if self.depth[i] >= self.ground_water_level {
                u0[i] = WATER_GRADIENT * (self.depth[i] - self.depth[i - 1]) + u0[i - 1];
            }
        }

        let mut eff_stress: Vec<f64> = total_stress
            .iter()
            .zip(&u0)
            .map(|(&t, &u)| t - u)
            .collect();
        if n >= 2 {
            eff_stress[0] = eff_stress[1];
        }

        let qtn = (0..n)
            .map(|i| {
                let exponent = (0.381 * ic[i] + 0.05 * (eff_stress[i] / PA) - 0.15).min(1.0);
                ((qt[i] - total_stress[i]) / PA) * (PA / eff_stress[i]).powf(exponent)
            })
            .collect();

        StressParams { qtn, eff_stress }
    }
}
