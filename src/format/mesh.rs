//! Mesh-part table records.

use super::constants::MESH_RECORD_SIZE;
use crate::stream::{ByteReader, ByteWriter, Endian};
use crate::util::Result;

/// One fixed-size mesh-part record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshRecord {
    pub flags: u16,
    pub vertex_count: u16,
    pub group_id: u16,
    pub material: u16,
    pub lod: u32,
    pub weight_dynamics: u16,
    /// Vertex stride; must agree with the blocktype.
    pub stride: u8,
    /// Index of the part's first vertex in the whole vertex buffer.
    pub vertex_base: u32,
    /// Byte offset of the part's vertices inside the vertex region.
    pub vertex_offset: u32,
    pub blocktype: u32,
    /// Index of the part's first index inside the face region.
    pub index_start: u32,
    pub index_count: u32,
    pub box_count: u8,
    pub mesh_id: u16,
}

impl MeshRecord {
    pub const SIZE: usize = MESH_RECORD_SIZE;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let flags = r.read_u16::<Endian>()?;
        let vertex_count = r.read_u16::<Endian>()?;
        let group_id = r.read_u16::<Endian>()?;
        let material = r.read_u16::<Endian>()?;
        let lod = r.read_u32::<Endian>()?;
        let weight_dynamics = r.read_u16::<Endian>()?;
        let stride = r.read_u8()?;
        r.skip(1)?;
        let vertex_base = r.read_u32::<Endian>()?;
        let vertex_offset = r.read_u32::<Endian>()?;
        let blocktype = r.read_u32::<Endian>()?;
        let index_start = r.read_u32::<Endian>()?;
        let index_count = r.read_u32::<Endian>()?;
        let box_count = r.read_u8()?;
        r.skip(1)?;
        let mesh_id = r.read_u16::<Endian>()?;
        r.skip(8)?;
        Ok(Self {
            flags,
            vertex_count,
            group_id,
            material,
            lod,
            weight_dynamics,
            stride,
            vertex_base,
            vertex_offset,
            blocktype,
            index_start,
            index_count,
            box_count,
            mesh_id,
        })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_u16::<Endian>(self.flags)?;
        w.write_u16::<Endian>(self.vertex_count)?;
        w.write_u16::<Endian>(self.group_id)?;
        w.write_u16::<Endian>(self.material)?;
        w.write_u32::<Endian>(self.lod)?;
        w.write_u16::<Endian>(self.weight_dynamics)?;
        w.write_u8(self.stride)?;
        w.write_u8(0)?;
        w.write_u32::<Endian>(self.vertex_base)?;
        w.write_u32::<Endian>(self.vertex_offset)?;
        w.write_u32::<Endian>(self.blocktype)?;
        w.write_u32::<Endian>(self.index_start)?;
        w.write_u32::<Endian>(self.index_count)?;
        w.write_u8(self.box_count)?;
        w.write_u8(0)?;
        w.write_u16::<Endian>(self.mesh_id)?;
        w.write_zeros(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let rec = MeshRecord {
            vertex_count: 3,
            lod: 1,
            stride: 32,
            blocktype: 0x401,
            index_count: 3,
            box_count: 1,
            mesh_id: 5,
            ..Default::default()
        };
        let mut w = ByteWriter::new();
        rec.write(&mut w).unwrap();
        assert_eq!(w.len(), MeshRecord::SIZE as u64);
        let bytes = w.into_inner();
        // lod at 0x08, blocktype at 0x18
        assert_eq!(&bytes[0x08..0x0C], &1u32.to_le_bytes());
        assert_eq!(&bytes[0x18..0x1C], &0x401u32.to_le_bytes());
        assert_eq!(MeshRecord::read(&mut ByteReader::new(&bytes)).unwrap(), rec);
    }
}
