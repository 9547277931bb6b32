//! MOD3 file header.

use serde::{Deserialize, Serialize};

use super::constants::*;
use crate::stream::{ByteReader, ByteWriter, Endian};
use crate::util::{Error, Result};

/// Header property key of the middle LOD switch distance.
pub const PROP_MIDDLE_DISTANCE: &str = "middleDistance";
/// Header property key of the low LOD switch distance.
pub const PROP_LOW_DISTANCE: &str = "lowDistance";
/// Header property key of the light group.
pub const PROP_LIGHT_GROUP: &str = "lightGroup";
/// Header property key of the memory flag.
pub const PROP_MEMORY: &str = "memory";

/// Header properties an export needs from the scene.
pub const REQUIRED_PROPERTIES: [&str; 4] = [
    PROP_MIDDLE_DISTANCE,
    PROP_LOW_DISTANCE,
    PROP_LIGHT_GROUP,
    PROP_MEMORY,
];

/// Opaque header metadata value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Int(i64),
    Float(f64),
    Vector(Vec<f32>),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Vector(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(v) => Some(*v),
            HeaderValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }
}

/// One named header field as surfaced to the scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderProperty {
    pub key: String,
    pub value: HeaderValue,
}

impl HeaderProperty {
    pub fn new(key: impl Into<String>, value: HeaderValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Region offsets in header order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionOffsets {
    pub bones: u64,
    pub groups: u64,
    pub materials: u64,
    pub meshes: u64,
    pub vertices: u64,
    pub faces: u64,
    pub trailing: u64,
}

impl RegionOffsets {
    fn as_array(&self) -> [u64; REGION_OFFSET_COUNT] {
        [
            self.bones,
            self.groups,
            self.materials,
            self.meshes,
            self.vertices,
            self.faces,
            self.trailing,
        ]
    }
}

/// Parsed MOD3 header.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub version: u16,
    pub bone_count: u16,
    pub mesh_count: u16,
    pub material_count: u16,
    pub vertex_count: u32,
    pub index_count: u32,
    pub vertex_buffer_size: u32,
    pub group_count: u32,
    pub offsets: RegionOffsets,
    pub bounding_sphere: [f32; 4],
    pub bbox_min: [f32; 4],
    pub bbox_max: [f32; 4],
    pub middle_distance: f32,
    pub low_distance: f32,
    pub light_group: u32,
    pub memory: u8,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            version: MOD3_VERSION,
            bone_count: 0,
            mesh_count: 0,
            material_count: 0,
            vertex_count: 0,
            index_count: 0,
            vertex_buffer_size: 0,
            group_count: 0,
            offsets: RegionOffsets::default(),
            bounding_sphere: [0.0; 4],
            bbox_min: [0.0; 4],
            bbox_max: [0.0; 4],
            middle_distance: 0.0,
            low_distance: 0.0,
            light_group: 0,
            memory: 0,
        }
    }
}

impl Header {
    /// Read and validate the header at the start of the buffer.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        if r.len() < HEADER_SIZE {
            return Err(Error::OutOfBounds {
                pos: 0,
                len: HEADER_SIZE,
                size: r.len() as u64,
            });
        }
        r.seek(0)?;
        let magic: [u8; 4] = r.read_array()?;
        if &magic != MOD3_MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = r.read_u16::<Endian>()?;
        if version != MOD3_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let bone_count = r.read_u16::<Endian>()?;
        let mesh_count = r.read_u16::<Endian>()?;
        let material_count = r.read_u16::<Endian>()?;
        let vertex_count = r.read_u32::<Endian>()?;
        let index_count = r.read_u32::<Endian>()?;
        let vertex_buffer_size = r.read_u32::<Endian>()?;
        let group_count = r.read_u32::<Endian>()?;
        r.skip(4)?;

        let offsets = RegionOffsets {
            bones: r.read_u64::<Endian>()?,
            groups: r.read_u64::<Endian>()?,
            materials: r.read_u64::<Endian>()?,
            meshes: r.read_u64::<Endian>()?,
            vertices: r.read_u64::<Endian>()?,
            faces: r.read_u64::<Endian>()?,
            trailing: r.read_u64::<Endian>()?,
        };

        let bounding_sphere = r.read_f32s::<Endian, 4>()?;
        let bbox_min = r.read_f32s::<Endian, 4>()?;
        let bbox_max = r.read_f32s::<Endian, 4>()?;
        let middle_distance = r.read_f32::<Endian>()?;
        let low_distance = r.read_f32::<Endian>()?;
        let light_group = r.read_u32::<Endian>()?;
        let memory = r.read_u8()?;
        r.seek(HEADER_SIZE as u64)?;

        Ok(Self {
            version,
            bone_count,
            mesh_count,
            material_count,
            vertex_count,
            index_count,
            vertex_buffer_size,
            group_count,
            offsets,
            bounding_sphere,
            bbox_min,
            bbox_max,
            middle_distance,
            low_distance,
            light_group,
            memory,
        })
    }

    /// Write the header at the writer's current position.
    pub fn write(&self, w: &mut ByteWriter) -> Result<()> {
        w.write_bytes(MOD3_MAGIC)?;
        w.write_u16::<Endian>(self.version)?;
        w.write_u16::<Endian>(self.bone_count)?;
        w.write_u16::<Endian>(self.mesh_count)?;
        w.write_u16::<Endian>(self.material_count)?;
        w.write_u32::<Endian>(self.vertex_count)?;
        w.write_u32::<Endian>(self.index_count)?;
        w.write_u32::<Endian>(self.vertex_buffer_size)?;
        w.write_u32::<Endian>(self.group_count)?;
        w.write_u32::<Endian>(0)?;
        for offset in self.offsets.as_array() {
            w.write_u64::<Endian>(offset)?;
        }
        w.write_f32s::<Endian>(&self.bounding_sphere)?;
        w.write_f32s::<Endian>(&self.bbox_min)?;
        w.write_f32s::<Endian>(&self.bbox_max)?;
        w.write_f32::<Endian>(self.middle_distance)?;
        w.write_f32::<Endian>(self.low_distance)?;
        w.write_u32::<Endian>(self.light_group)?;
        w.write_u8(self.memory)?;
        w.write_zeros(11)?;
        Ok(())
    }

    /// Check that a region of `len` bytes at `offset` fits in `size` bytes.
    ///
    /// Empty regions are accepted anywhere.
    pub fn check_region(region: &'static str, offset: u64, len: u64, size: u64) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let fits = offset >= HEADER_SIZE as u64
            && offset.checked_add(len).is_some_and(|end| end <= size);
        if fits {
            Ok(())
        } else {
            Err(Error::RegionOutOfBounds {
                region,
                offset,
                len,
                size,
            })
        }
    }

    /// Validate every fixed-size region the header declares against the file size.
    pub fn check_regions(&self, size: u64) -> Result<()> {
        let bones = self.bone_count as u64;
        let bone_len = if bones == 0 {
            0
        } else {
            bones * (BONE_RECORD_SIZE + 2 * MATRIX_SIZE) as u64 + REMAP_TABLE_SIZE as u64
        };
        Self::check_region("bone", self.offsets.bones, bone_len, size)?;
        Self::check_region(
            "group",
            self.offsets.groups,
            self.group_count as u64 * GROUP_RECORD_SIZE as u64,
            size,
        )?;
        Self::check_region(
            "material",
            self.offsets.materials,
            self.material_count as u64 * MATERIAL_NAME_SIZE as u64,
            size,
        )?;
        Self::check_region(
            "mesh",
            self.offsets.meshes,
            self.mesh_count as u64 * MESH_RECORD_SIZE as u64,
            size,
        )?;
        Self::check_region(
            "vertex",
            self.offsets.vertices,
            self.vertex_buffer_size as u64,
            size,
        )?;
        Self::check_region("face", self.offsets.faces, self.index_count as u64 * 2, size)?;
        if self.offsets.trailing > size {
            return Err(Error::RegionOutOfBounds {
                region: "trailing",
                offset: self.offsets.trailing,
                len: 0,
                size,
            });
        }
        Ok(())
    }

    /// Raw header fields as ordered, uninterpreted metadata.
    pub fn properties(&self) -> Vec<HeaderProperty> {
        use HeaderValue::*;
        let o = &self.offsets;
        vec![
            HeaderProperty::new("version", Int(self.version as i64)),
            HeaderProperty::new("boneCount", Int(self.bone_count as i64)),
            HeaderProperty::new("meshCount", Int(self.mesh_count as i64)),
            HeaderProperty::new("materialCount", Int(self.material_count as i64)),
            HeaderProperty::new("vertexCount", Int(self.vertex_count as i64)),
            HeaderProperty::new("faceCount", Int(self.index_count as i64)),
            HeaderProperty::new("vertexBufferSize", Int(self.vertex_buffer_size as i64)),
            HeaderProperty::new("groupCount", Int(self.group_count as i64)),
            HeaderProperty::new("boneOffset", Int(o.bones as i64)),
            HeaderProperty::new("groupOffset", Int(o.groups as i64)),
            HeaderProperty::new("materialOffset", Int(o.materials as i64)),
            HeaderProperty::new("meshOffset", Int(o.meshes as i64)),
            HeaderProperty::new("vertexOffset", Int(o.vertices as i64)),
            HeaderProperty::new("facesOffset", Int(o.faces as i64)),
            HeaderProperty::new("trailOffset", Int(o.trailing as i64)),
            HeaderProperty::new("boundingSphere", Vector(self.bounding_sphere.to_vec())),
            HeaderProperty::new("boundingBoxMin", Vector(self.bbox_min.to_vec())),
            HeaderProperty::new("boundingBoxMax", Vector(self.bbox_max.to_vec())),
            HeaderProperty::new(PROP_MIDDLE_DISTANCE, Float(self.middle_distance as f64)),
            HeaderProperty::new(PROP_LOW_DISTANCE, Float(self.low_distance as f64)),
            HeaderProperty::new(PROP_LIGHT_GROUP, Int(self.light_group as i64)),
            HeaderProperty::new(PROP_MEMORY, Int(self.memory as i64)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        let mut w = ByteWriter::new();
        Header::default().write(&mut w).unwrap();
        assert_eq!(w.len(), HEADER_SIZE as u64);
    }

    #[test]
    fn test_header_fields_survive() {
        let header = Header {
            bone_count: 3,
            mesh_count: 2,
            material_count: 1,
            light_group: 9,
            memory: 1,
            middle_distance: 12.5,
            offsets: RegionOffsets {
                bones: 0xA0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut w = ByteWriter::new();
        header.write(&mut w).unwrap();
        let bytes = w.into_inner();
        let parsed = Header::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_bad_magic_and_version() {
        let mut w = ByteWriter::new();
        Header::default().write(&mut w).unwrap();
        let mut bytes = w.into_inner();

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert!(matches!(
            Header::read(&mut ByteReader::new(&bad)),
            Err(Error::InvalidMagic)
        ));

        bytes[4] = 0x10;
        assert!(matches!(
            Header::read(&mut ByteReader::new(&bytes)),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_check_region() {
        assert!(Header::check_region("x", 0, 0, 10).is_ok());
        assert!(Header::check_region("x", 0xA0, 16, 0xB0).is_ok());
        assert!(Header::check_region("x", 0xA0, 17, 0xB0).is_err());
        assert!(Header::check_region("x", 0x10, 4, 0xB0).is_err());
        assert!(Header::check_region("x", u64::MAX, 4, 0xB0).is_err());
    }

    #[test]
    fn test_properties_expose_required_keys() {
        let props = Header::default().properties();
        for key in REQUIRED_PROPERTIES {
            assert!(props.iter().any(|p| p.key == key), "missing {key}");
        }
    }
}
