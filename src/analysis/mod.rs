//! Analysis modules.
//!
//! Statistics computed over a finished transcript.

pub mod aggregator;

pub use aggregator::*;
