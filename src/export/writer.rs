//! Region layout and serialization.
//!
//! The header is written last: its slot is reserved, every region is laid out
//! on a 16-byte boundary while its offset is noted, then the writer seeks back
//! and fills the header in.

use std::collections::BTreeMap;

use tracing::debug;

use super::prepare::PreparedPart;
use crate::format::*;
use crate::model::{MaterialSlot, Model, Skeleton};
use crate::stream::{ByteWriter, Endian};
use crate::util::{BBox3f, Error, Result};

/// Scalar header fields taken from the model's header properties.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct HeaderFields {
    pub middle_distance: f32,
    pub low_distance: f32,
    pub light_group: u32,
    pub memory: u8,
}

impl HeaderFields {
    /// First occurrence of each property; defaults where missing or not numeric.
    pub fn from_model(model: &Model) -> Self {
        let number = |key: &str| model.header_value(key).and_then(|v| v.as_f64());
        let d = Self::default();
        Self {
            middle_distance: number(PROP_MIDDLE_DISTANCE).map_or(d.middle_distance, |x| x as f32),
            low_distance: number(PROP_LOW_DISTANCE).map_or(d.low_distance, |x| x as f32),
            light_group: number(PROP_LIGHT_GROUP).map_or(d.light_group, |x| x as u32),
            memory: number(PROP_MEMORY).map_or(d.memory, |x| x as u8),
        }
    }
}

/// Group records: the model's own, or one per distinct part group id.
pub(crate) fn group_records(model: &Model, parts: &[PreparedPart]) -> Vec<GroupRecord> {
    if !model.group_functions.is_empty() {
        return model
            .group_functions
            .iter()
            .map(|g| GroupRecord {
                group_id: g.group_id,
                bounds: g.bounds,
            })
            .collect();
    }
    let mut groups: BTreeMap<u16, BBox3f> = BTreeMap::new();
    for part in parts {
        let bounds = groups.entry(part.record.group_id).or_default();
        for v in &part.vertices {
            bounds.expand_by_point(v.position);
        }
    }
    groups
        .into_iter()
        .map(|(group_id, bounds)| GroupRecord {
            group_id: group_id as u32,
            bounds,
        })
        .collect()
}

pub(crate) struct Layout<'a> {
    pub fields: HeaderFields,
    pub skeleton: Option<&'a Skeleton>,
    pub groups: Vec<GroupRecord>,
    pub materials: &'a [MaterialSlot],
    pub parts: Vec<PreparedPart>,
    pub trailing: &'a [u8],
}

impl Layout<'_> {
    pub fn write(mut self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(self.estimate());
        let mut header = Header::default();
        w.write_zeros(HEADER_SIZE)?;

        let bones = self.skeleton.map_or(&[][..], Skeleton::bones);
        if bones.len() > MAX_BONES {
            return Err(Error::invalid(format!(
                "{} bones, at most {} fit the bone table",
                bones.len(),
                MAX_BONES
            )));
        }
        header.bone_count = bones.len() as u16;
        header.offsets.bones = w.align(REGION_ALIGNMENT)?;
        if let Some(skeleton) = self.skeleton.filter(|s| !s.is_empty()) {
            write_bones(&mut w, skeleton)?;
        }

        header.group_count = self.groups.len() as u32;
        header.offsets.groups = w.align(REGION_ALIGNMENT)?;
        for g in &self.groups {
            g.write(&mut w)?;
        }

        header.material_count = u16::try_from(self.materials.len())
            .map_err(|_| Error::invalid(format!("{} materials", self.materials.len())))?;
        header.offsets.materials = w.align(REGION_ALIGNMENT)?;
        write_names(&mut w, self.materials.iter().map(|m| m.name.as_str()))?;

        // Vertex and index placement is known before anything is written
        let mut vertex_bytes = 0u32;
        let mut vertex_base = 0u32;
        let mut index_start = 0u32;
        for part in &mut self.parts {
            part.record.vertex_offset = vertex_bytes;
            part.record.vertex_base = vertex_base;
            part.record.index_start = index_start;
            vertex_bytes += part.record.vertex_count as u32 * part.record.stride as u32;
            vertex_base += part.record.vertex_count as u32;
            index_start += part.record.index_count;
        }

        header.mesh_count = u16::try_from(self.parts.len())
            .map_err(|_| Error::invalid(format!("{} mesh parts", self.parts.len())))?;
        header.offsets.meshes = w.align(REGION_ALIGNMENT)?;
        for part in &self.parts {
            part.record.write(&mut w)?;
        }
        for part in &self.parts {
            for b in &part.boxes {
                b.write(&mut w)?;
            }
        }

        header.offsets.vertices = w.align(REGION_ALIGNMENT)?;
        for part in &self.parts {
            for v in &part.vertices {
                write_vertex(&mut w, &part.blocktype, v)?;
            }
        }
        header.vertex_buffer_size = vertex_bytes;
        header.vertex_count = vertex_base;

        header.offsets.faces = w.align(REGION_ALIGNMENT)?;
        for part in &self.parts {
            for &i in &part.indices {
                w.write_u16::<Endian>(i)?;
            }
        }
        header.index_count = index_start;

        header.offsets.trailing = w.align(REGION_ALIGNMENT)?;
        w.write_bytes(self.trailing)?;

        let bounds = BBox3f::from_points(
            self.parts
                .iter()
                .flat_map(|p| p.vertices.iter().map(|v| v.position)),
        )
        .or_zero();
        let (center, radius) = bounds.sphere();
        header.bounding_sphere = [center.x, center.y, center.z, radius];
        header.bbox_min = bounds.min.extend(0.0).to_array();
        header.bbox_max = bounds.max.extend(0.0).to_array();
        header.middle_distance = self.fields.middle_distance;
        header.low_distance = self.fields.low_distance;
        header.light_group = self.fields.light_group;
        header.memory = self.fields.memory;

        w.seek(0)?;
        header.write(&mut w)?;
        w.seek_end()?;
        debug!(
            "wrote {} bytes: {} bones, {} parts, {} vertices, {} indices",
            w.len(),
            header.bone_count,
            header.mesh_count,
            header.vertex_count,
            header.index_count
        );
        Ok(w.into_inner())
    }

    fn estimate(&self) -> usize {
        let bones = self.skeleton.map_or(0, Skeleton::len);
        let parts: usize = self
            .parts
            .iter()
            .map(|p| {
                MeshRecord::SIZE
                    + p.boxes.len() * BoxRecord::SIZE
                    + p.vertices.len() * p.blocktype.stride()
                    + p.indices.len() * 2
            })
            .sum();
        HEADER_SIZE
            + bones * (BONE_RECORD_SIZE + 2 * MATRIX_SIZE)
            + REMAP_TABLE_SIZE
            + self.groups.len() * GroupRecord::SIZE
            + self.materials.len() * MATERIAL_NAME_SIZE
            + parts
            + self.trailing.len()
            + 8 * REGION_ALIGNMENT as usize
    }
}

fn write_bones(w: &mut ByteWriter, skeleton: &Skeleton) -> Result<()> {
    let bones = skeleton.bones();
    let remap = build_remap(bones.iter().map(|b| b.function))?;
    for bone in bones {
        // Indices are below MAX_BONES, so they fit a byte
        BoneRecord {
            function: bone.function,
            parent: bone.parent.map_or(NO_PARENT, |p| p as u8),
            pair: bone.pair.map_or(NO_PAIR, |p| p as u8),
            length: bone.length,
            position: bone.local.translation.to_array(),
        }
        .write(w)?;
    }
    for bone in bones {
        write_matrix(w, &bone.local.to_matrix())?;
    }
    for m in skeleton.inverse_bind_matrices() {
        write_matrix(w, &m)?;
    }
    w.write_bytes(&remap)
}
