//! # MOD3
//!
//! Rust implementation of the MOD3 (.mod3) binary model container used for
//! skinned game assets: a decoder, an encoder that writes exactly the layout
//! the decoder reads, configurable validation and pluggable bone-weight
//! encoding schemes.
//!
//! ## Modules
//!
//! - [`util`] - Errors and math (bounds, transforms)
//! - [`stream`] - Little-endian byte cursors with alignment
//! - [`format`] - Binary layout: header, tables, blocktypes, vertex streams
//! - [`model`] - In-memory model: skeleton, mesh parts, materials, boxes
//! - [`weights`] - Weight encoding schemes
//! - [`validate`] - Violation categories, severities and reports
//! - [`scene`] - Host scene seam plus an in-memory implementation
//! - [`import`] - Decoding
//! - [`export`] - Validation and encoding
//!
//! ## Example
//!
//! ```ignore
//! use mod3::prelude::*;
//!
//! let model = decode_file("em001.mod3", &ImportOptions::default())?;
//! let encoded = encode(&model, &ExportOptions::preserving())?;
//! write_file("em001_copy.mod3", &encoded.bytes)?;
//! ```

pub mod util;
pub mod stream;
pub mod format;
pub mod model;
pub mod weights;
pub mod validate;
pub mod scene;
pub mod import;
pub mod export;

// Re-export commonly used types
pub use util::{Error, ErrorKind, Result};
pub use model::Model;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, ErrorKind, Result};
    pub use crate::model::*;
    pub use crate::weights::WeightScheme;
    pub use crate::validate::{Category, ErrorLevels, Severity, ValidationReport, Violation};
    pub use crate::scene::{MemoryScene, SceneBuilder, SceneSource, SkeletonMode};
    pub use crate::import::{decode, decode_file, import, ImportOptions};
    pub use crate::export::{encode, export, write_file, BoundsMode, Encoded, ExportOptions};
}
