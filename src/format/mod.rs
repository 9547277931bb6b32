//! MOD3 binary layout: header, fixed-size tables and vertex streams.
//!
//! File structure:
//!
//! ```text
//! +------------------+  0x00
//! | Header (0xA0)    |  counts, region offsets, global bounds
//! +------------------+
//! | Bones            |  records, local matrices, inverse binds, remap
//! | Groups           |  group id + bounds
//! | Material names   |  128-byte NUL-padded
//! | Mesh table       |  48-byte records, then per-part bounding boxes
//! | Vertex buffer    |  per-part streams, stride from blocktype
//! | Index buffer     |  u16 triangle lists
//! | Trailing data    |  opaque
//! +------------------+
//! ```
//!
//! Every region starts on a 16-byte boundary and is located through the
//! header's offset table, never by position.

pub mod constants;
mod blocktype;
mod bone;
mod bounds;
mod header;
mod material;
mod mesh;
mod vertex;

pub use blocktype::*;
pub use bone::*;
pub use bounds::*;
pub use constants::*;
pub use header::*;
pub use material::*;
pub use mesh::*;
pub use vertex::*;
