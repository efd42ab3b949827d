//! Data model: raw soundings, derived velocity profiles, skip records.

pub mod cpt;
pub mod skip;
pub mod spt;
pub mod vs_profile;

pub use cpt::Cpt;
pub use skip::{SkipReason, SkipRecord, SkipSummary};
pub use spt::{HammerType, SoilType, Spt};
pub use vs_profile::VsProfile;
