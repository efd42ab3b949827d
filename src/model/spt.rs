use std::sync::OnceLock;

use crate::error::Vs30Error;

// ---------------------------------------------------------------------------
// Spt - one standard penetration test log
// ---------------------------------------------------------------------------

/// SPT hammer mechanism, used to pick an energy correction when no measured
/// energy ratio is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HammerType {
    Auto,
    Safety,
    Standard,
}

/// Broad soil classification for the Brandenberg et al. (2010) coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoilType {
    Clay,
    Silt,
    Sand,
}

/// A standard penetration test log: blow counts per depth, with the test
/// geometry needed to normalise them to N60. The N60 series is computed once
/// on first access and cached permanently.
#[derive(Debug)]
pub struct Spt {
    pub name: String,
    pub depth: Vec<f64>,
    pub n: Vec<f64>,
    pub hammer_type: HammerType,
    pub borehole_diameter: f64,
    pub energy_ratio: Option<f64>,
    pub soil_type: Vec<SoilType>,

    n60: OnceLock<Vec<f64>>,
}

impl Spt {
    pub fn new(
        name: impl Into<String>,
        depth: Vec<f64>,
        n: Vec<f64>,
    ) -> Result<Self, Vs30Error> {
        let name = name.into();
        if n.len() != depth.len() {
            return Err(Vs30Error::ShapeMismatch {
                name,
                depth: depth.len(),
                qc: n.len(),
                fs: n.len(),
                u: n.len(),
            });
        }
        let soil_type = vec![SoilType::Clay; depth.len()];
        Ok(Self {
            name,
            depth,
            n,
            hammer_type: HammerType::Auto,
            borehole_diameter: 150.0,
            energy_ratio: None,
            soil_type,
            n60: OnceLock::new(),
        })
    }

    pub fn with_hammer_type(mut self, hammer_type: HammerType) -> Self {
        self.hammer_type = hammer_type;
        self
    }

    pub fn with_borehole_diameter(mut self, millimetres: f64) -> Self {
        self.borehole_diameter = millimetres;
        self
    }

    pub fn with_energy_ratio(mut self, ratio: f64) -> Self {
        self.energy_ratio = Some(ratio);
        self
    }

    pub fn with_soil_type(mut self, soil_type: Vec<SoilType>) -> Self {
        self.soil_type = soil_type;
        self
    }

    /// Blow counts normalised to 60% hammer energy, rounded to two decimal
    /// places as reported in the field sheets.
    pub fn n60(&self) -> &[f64] {
        self.n60.get_or_init(|| {
            self.n
                .iter()
                .zip(&self.depth)
                .map(|(&n, &depth)| {
                    let (ce, cr, cb) = n60_factors(
                        self.energy_ratio,
                        self.hammer_type,
                        self.borehole_diameter,
                        depth,
                    );
                    (n * ce * cb * cr * 100.0).round() / 100.0
                })
                .collect()
        })
    }
}

/// Energy (Ce), rod-length (Cr) and borehole-diameter (Cb) corrections for
/// converting a raw blow count to N60.
fn n60_factors(
    energy_ratio: Option<f64>,
    hammer_type: HammerType,
    borehole_diameter: f64,
    rod_length: f64,
) -> (f64, f64, f64) {
    let ce = match energy_ratio {
        Some(ratio) => ratio / 60.0,
        None => match hammer_type {
            HammerType::Auto => 0.8,
            HammerType::Safety => 0.7,
            HammerType::Standard => 0.5,
        },
    };

    let cr = if rod_length < 3.0 {
        0.75
    } else if rod_length < 4.0 {
        0.8
    } else if rod_length < 6.0 {
        0.85
    } else if rod_length < 10.0 {
        0.95
    } else {
        1.0
    };

    let cb = if (65.0..=115.0).contains(&borehole_diameter) {
        1.0
    } else if borehole_diameter == 200.0 {
        1.15
    } else {
        1.05
    };

    (ce, cr, cb)
}
