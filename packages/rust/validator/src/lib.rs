//! Link validation for catalog records.
//!
//! This crate provides:
//! - [`LinkValidator`]: bounded-concurrency batch checker with retry
//! - [`LinkProbe`]: one network read of a link; [`HttpProbe`] is the real one

pub mod engine;
pub mod probe;

pub use engine::{LinkCheck, LinkValidator, ValidationOutcome};
pub use probe::{HttpProbe, LinkProbe, ProbeOutcome};
