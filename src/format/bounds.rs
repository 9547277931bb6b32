//! Bounding-box and group records.

use glam::Vec3;

use super::constants::{BOUNDING_BOX_RECORD_SIZE, GROUP_RECORD_SIZE, NO_BONE};
use crate::stream::{ByteReader, ByteWriter, Endian};
use crate::util::{BBox3f, Result};

fn read_point(r: &mut ByteReader<'_>) -> Result<Vec3> {
    let [x, y, z, _] = r.read_f32s::<Endian, 4>()?;
    Ok(Vec3::new(x, y, z))
}

fn write_point(w: &mut ByteWriter, p: Vec3) -> Result<()> {
    w.write_f32s::<Endian>(&[p.x, p.y, p.z, 0.0])
}

/// Per-part bounding box bound to a bone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxRecord {
    /// Bone index or [`NO_BONE`].
    pub bone: u32,
    pub bounds: BBox3f,
}

impl BoxRecord {
    pub const SIZE: usize = BOUNDING_BOX_RECORD_SIZE;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let bone = r.read_u32::<Endian>()?;
        r.skip(12)?;
        // Sphere is derived from the box
        r.skip(16)?;
        let min = read_point(r)?;
        let max = read_point(r)?;
        Ok(Self {
            bone,
            bounds: BBox3f::new(min, max),
        })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        let bounds = self.bounds.or_zero();
        let (center, radius) = bounds.sphere();
        w.write_u32::<Endian>(self.bone)?;
        w.write_zeros(12)?;
        w.write_f32s::<Endian>(&[center.x, center.y, center.z, radius])?;
        write_point(w, bounds.min)?;
        write_point(w, bounds.max)
    }

    pub fn bone_index(&self) -> Option<usize> {
        (self.bone != NO_BONE).then_some(self.bone as usize)
    }
}

/// Group table record: a logical group id and its bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupRecord {
    pub group_id: u32,
    pub bounds: BBox3f,
}

impl GroupRecord {
    pub const SIZE: usize = GROUP_RECORD_SIZE;

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let group_id = r.read_u32::<Endian>()?;
        r.skip(12)?;
        let min = read_point(r)?;
        let max = read_point(r)?;
        Ok(Self {
            group_id,
            bounds: BBox3f::new(min, max),
        })
    }

    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        let bounds = self.bounds.or_zero();
        w.write_u32::<Endian>(self.group_id)?;
        w.write_zeros(12)?;
        write_point(w, bounds.min)?;
        write_point(w, bounds.max)
    }
}
