//! Vs30 estimation from cone penetration test soundings.
//!
//! The pipeline loads a batch of soundings, filters out unusable records
//! with a full audit trail, converts each survivor to shear-wave velocity
//! profiles through registered empirical correlations, depth-averages each
//! profile to a Vs30 estimate, and writes flat result tables.

pub mod aggregate;
pub mod config;
pub mod correlations;
pub mod error;
pub mod filtering;
pub mod geo;
pub mod io;
pub mod model;
pub mod runner;

pub use config::Config;
pub use error::Vs30Error;
pub use model::{Cpt, Spt, VsProfile};
