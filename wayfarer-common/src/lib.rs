//! Common utilities for the wayfarer routing engine

pub mod error;

pub use error::{suggest_correction, BuildError, Error, Result};
