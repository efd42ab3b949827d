use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Errors produced by the estimation engine.
///
/// Structural and insufficient-depth errors abort only the profile they occur
/// on; configuration errors (unknown correlation names, bad weight sets) are
/// batch-fatal and surface once at the boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Vs30Error {
    /// Measurement channels of a sounding do not share one length.
    #[error("{name}: channel lengths differ (depth {depth}, qc {qc}, fs {fs}, u {u})")]
    ShapeMismatch {
        name: String,
        depth: usize,
        qc: usize,
        fs: usize,
        u: usize,
    },

    /// Velocity and standard-deviation arrays do not line up with depth.
    #[error("{name}: velocity arrays do not match depth (depth {depth}, vs {vs}, vs_sd {vs_sd})")]
    VelocityShapeMismatch {
        name: String,
        depth: usize,
        vs: usize,
        vs_sd: usize,
    },

    /// A profile ended up with no samples inside the analysis ceiling.
    #[error("{name}: no samples at or above the capped maximum depth")]
    EmptyProfile { name: String },

    /// A correlation name that is not in the corresponding registry.
    #[error("unknown {kind} correlation '{name}', registered: {available:?}")]
    UnknownCorrelation {
        kind: &'static str,
        name: String,
        available: Vec<&'static str>,
    },

    /// Vs30 was requested for a sub-30 m profile without a depth correction.
    #[error("{name}: profile is shallower than 30 m and no vs30 correlation is set")]
    MissingVs30Correlation { name: String },

    /// The profile does not reach the shallow end of a correlation's
    /// coefficient table. Only `boore_2011` uses this policy; `boore_2004`
    /// returns NaN sentinels instead.
    #[error("profile reaches only {max_depth} m, below the {correlation} table range")]
    ProfileTooShallow {
        correlation: &'static str,
        max_depth: f64,
    },

    /// A weight set whose raw sum is outside the accepted [0.98, 1.02] band.
    #[error("{set} weights sum to {sum:.4}, outside the accepted range [0.98, 1.02]")]
    WeightSum { set: String, sum: f64 },

    /// Weights must be non-negative.
    #[error("{set} weight for '{key}' is negative ({weight})")]
    NegativeWeight {
        set: String,
        key: String,
        weight: f64,
    },

    /// A profile or correlation has no entry in its weight set.
    #[error("{set} weight set has no entry for '{key}'")]
    MissingWeight { set: String, key: String },

    /// Weighted aggregation was asked to combine zero profiles.
    #[error("no profiles contribute to the weighted aggregate")]
    EmptyAggregate,
}
