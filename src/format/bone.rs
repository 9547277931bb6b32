//! Bone table records.
//!
//! The bone region holds `count` fixed-size records, then `count` local
//! matrices, then `count` inverse bind matrices, then the remap table.

use glam::Mat4;

use super::constants::*;
use crate::stream::{ByteReader, ByteWriter, Endian};
use crate::util::{Error, Result};

/// One fixed-size bone record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneRecord {
    /// Function id, the key of the remap table.
    pub function: u16,
    /// Parent index, [`NO_PARENT`] for roots.
    pub parent: u8,
    /// Symmetric counterpart index, [`NO_PAIR`] for none.
    pub pair: u8,
    /// Distance to the parent joint.
    pub length: f32,
    /// Offset from the parent joint.
    pub position: [f32; 3],
}

impl BoneRecord {
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let function = r.read_u16::<Endian>()?;
        let parent = r.read_u8()?;
        let pair = r.read_u8()?;
        let length = r.read_f32::<Endian>()?;
        let position = r.read_f32s::<Endian, 3>()?;
        r.skip(4)?;
        Ok(Self {
            function,
            parent,
            pair,
            length,
            position,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_u16::<Endian>(self.function)?;
        w.write_u8(self.parent)?;
        w.write_u8(self.pair)?;
        w.write_f32::<Endian>(self.length)?;
        w.write_f32s::<Endian>(&self.position)?;
        w.write_u32::<Endian>(0)
    }
}

/// Read a column-major 4x4 matrix.
pub fn read_matrix(r: &mut ByteReader<'_>) -> Result<Mat4> {
    Ok(Mat4::from_cols_array(&r.read_f32s::<Endian, 16>()?))
}

/// Write a column-major 4x4 matrix.
pub fn write_matrix(w: &mut ByteWriter, m: &Mat4) -> Result<()> {
    w.write_f32s::<Endian>(&m.to_cols_array())
}

/// Build the function-id to bone-index remap table.
pub fn build_remap(functions: impl IntoIterator<Item = u16>) -> Result<[u8; REMAP_TABLE_SIZE]> {
    let mut table = [UNUSED_REMAP; REMAP_TABLE_SIZE];
    for (index, function) in functions.into_iter().enumerate() {
        let slot = table.get_mut(function as usize).ok_or_else(|| {
            Error::invalid(format!(
                "Bone {} function id {} exceeds remap table size {}",
                index, function, REMAP_TABLE_SIZE
            ))
        })?;
        if *slot != UNUSED_REMAP {
            return Err(Error::invalid(format!(
                "Bones {} and {} share function id {}",
                slot, index, function
            )));
        }
        *slot = index as u8;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size() {
        let rec = BoneRecord {
            function: 7,
            parent: NO_PARENT,
            pair: 2,
            length: 1.5,
            position: [0.0, 1.5, 0.0],
        };
        let mut w = ByteWriter::new();
        rec.write(&mut w).unwrap();
        assert_eq!(w.len(), BONE_RECORD_SIZE as u64);
        let bytes = w.into_inner();
        assert_eq!(BoneRecord::read(&mut ByteReader::new(&bytes)).unwrap(), rec);
    }

    #[test]
    fn test_matrix_layout() {
        let m = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let mut w = ByteWriter::new();
        write_matrix(&mut w, &m).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), MATRIX_SIZE);
        // Translation lives in the last column
        assert_eq!(&bytes[48..52], &1.0f32.to_le_bytes());
        assert_eq!(read_matrix(&mut ByteReader::new(&bytes)).unwrap(), m);
    }

    #[test]
    fn test_build_remap() {
        let table = build_remap([3u16, 0, 511]).unwrap();
        assert_eq!(table[3], 0);
        assert_eq!(table[0], 1);
        assert_eq!(table[511], 2);
        assert_eq!(table[1], UNUSED_REMAP);
        assert!(build_remap([4u16, 4]).is_err());
        assert!(build_remap([512u16]).is_err());
    }
}
