//! Material name table.

use super::constants::MATERIAL_NAME_SIZE;
use crate::stream::{ByteReader, ByteWriter};
use crate::util::Result;

/// Read `count` NUL-padded material names.
pub fn read_names(r: &mut ByteReader<'_>, count: usize) -> Result<Vec<String>> {
    (0..count).map(|_| r.read_fixed_str(MATERIAL_NAME_SIZE)).collect()
}

/// Write material names as NUL-padded fixed-width fields.
pub fn write_names<'a>(w: &mut ByteWriter, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    for name in names {
        w.write_fixed_str(name, MATERIAL_NAME_SIZE)?;
    }
    Ok(())
}
