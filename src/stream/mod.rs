//! Binary cursor primitives.
//!
//! [`ByteReader`] borrows a fully-buffered file and never grows;
//! [`ByteWriter`] owns its buffer and grows monotonically.

mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;

/// Byte order used by every MOD3 field.
pub type Endian = byteorder::LittleEndian;
