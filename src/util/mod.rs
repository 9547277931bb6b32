//! Utility types and functions for MOD3.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`BBox3f`] and math re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
