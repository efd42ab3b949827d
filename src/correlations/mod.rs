//! Registered-by-name empirical correlation functions.
//!
//! Three registries: sounding-to-velocity (`cpt_vs`), penetration-test-to-
//! velocity (`spt_vs`), and depth-averaged-velocity-to-Vs30 (`vs30`). Every
//! correlation is a stateless pure function; looking up an unregistered name
//! fails with the full list of valid names.

pub mod cpt_vs;
pub mod spt_vs;
pub mod vs30;
