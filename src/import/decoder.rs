//! Walks the file's regions and builds a [`Model`].

use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::options::ImportOptions;
use super::resolve::ResourceLocator;
use crate::format::*;
use crate::model::{
    Bone, BoundingBox, GroupFunction, MaterialSlot, MeshPart, Model, ReferenceKind, Skeleton,
    Transform, UnresolvedReference,
};
use crate::stream::{ByteReader, Endian};
use crate::util::{Error, Result};

/// Single-use decoder over a borrowed buffer.
pub(crate) struct Decoder<'a> {
    data: &'a [u8],
    header: Header,
    options: &'a ImportOptions,
    unresolved: Vec<UnresolvedReference>,
}

impl<'a> Decoder<'a> {
    /// Read the header and check every region it declares fits the buffer.
    pub fn new(data: &'a [u8], options: &'a ImportOptions) -> Result<Self> {
        let header = Header::read(&mut ByteReader::new(data))?;
        header.check_regions(data.len() as u64)?;
        debug!(
            "decode: {} bones, {} meshes, {} materials, {} groups",
            header.bone_count, header.mesh_count, header.material_count, header.group_count
        );
        Ok(Self {
            data,
            header,
            options,
            unresolved: Vec::new(),
        })
    }

    fn reader_at(&self, offset: u64) -> Result<ByteReader<'a>> {
        let mut r = ByteReader::new(self.data);
        r.seek(offset)?;
        Ok(r)
    }

    pub fn decode(mut self, locator: Option<&dyn ResourceLocator>) -> Result<Model> {
        let mut model = Model::new();

        if self.options.scene_header {
            model.header = Some(self.header.properties());
        }
        if self.options.skeleton.is_some() {
            model.skeleton = Some(self.read_skeleton()?);
        }
        model.materials = self.read_materials(locator)?;

        let (parts, boxes) = self.read_mesh_parts()?;
        model.mesh_parts = parts;
        model.bounding_boxes = boxes;
        if self.options.omit_unused_groups {
            omit_unused_boxes(&mut model);
        }

        if self.options.load_groups_and_functions {
            model.group_functions = self.read_groups()?;
        }
        model.trailing = self.read_trailing();
        model.unresolved = self.unresolved;
        Ok(model)
    }

    // ------------------------------------------------------------------------
    // Bones
    // ------------------------------------------------------------------------

    fn read_skeleton(&mut self) -> Result<Skeleton> {
        let count = self.header.bone_count as usize;
        if count == 0 {
            return Ok(Skeleton::default());
        }
        let mut r = self.reader_at(self.header.offsets.bones)?;
        let records = (0..count)
            .map(|_| BoneRecord::read(&mut r))
            .collect::<Result<Vec<_>>>()?;
        let locals = (0..count)
            .map(|_| read_matrix(&mut r))
            .collect::<Result<Vec<_>>>()?;
        // Inverse binds are derived from the locals; remap from the function ids
        r.skip(count * MATRIX_SIZE + REMAP_TABLE_SIZE)?;

        let mut bones = Vec::with_capacity(count);
        for (index, (rec, local)) in records.iter().zip(&locals).enumerate() {
            let parent = (rec.parent != NO_PARENT).then_some(rec.parent as usize);
            // A dangling pair is recorded and dropped
            let pair = (rec.pair != NO_PAIR)
                .then_some(rec.pair as usize)
                .filter(|&pair| {
                    self.check_bone(pair, || format!("bone {} pair", index));
                    pair < count
                });
            bones.push(Bone {
                function: rec.function,
                parent,
                pair,
                length: rec.length,
                local: Transform::from_matrix(local),
            });
        }
        // Rejects parents that do not precede their child
        Skeleton::from_bones(bones)
    }

    // ------------------------------------------------------------------------
    // Materials
    // ------------------------------------------------------------------------

    fn read_materials(&mut self, locator: Option<&dyn ResourceLocator>) -> Result<Vec<MaterialSlot>> {
        let count = self.header.material_count as usize;
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut r = self.reader_at(self.header.offsets.materials)?;
        let names = read_names(&mut r, count)?;

        let mut slots = Vec::with_capacity(count);
        for (index, name) in names.into_iter().enumerate() {
            let mut slot = MaterialSlot::new(name);
            if let Some(locator) = locator {
                slot.resolved = locator.locate(&slot.name);
                if slot.resolved.is_none() {
                    trace!("material {} '{}' unresolved", index, slot.name);
                    self.unresolved.push(UnresolvedReference {
                        kind: ReferenceKind::Texture,
                        index,
                        name: slot.name.clone(),
                    });
                }
            }
            slots.push(slot);
        }
        Ok(slots)
    }

    // ------------------------------------------------------------------------
    // Mesh parts and bounding boxes
    // ------------------------------------------------------------------------

    fn read_mesh_parts(&mut self) -> Result<(Vec<MeshPart>, Vec<BoundingBox>)> {
        let count = self.header.mesh_count as usize;
        if count == 0 {
            return Ok((Vec::new(), Vec::new()));
        }
        let mut r = self.reader_at(self.header.offsets.meshes)?;
        let records = (0..count)
            .map(|_| MeshRecord::read(&mut r))
            .collect::<Result<Vec<_>>>()?;

        // Boxes follow the table, in part order
        let box_total: u64 = records.iter().map(|rec| rec.box_count as u64).sum();
        Header::check_region(
            "bounding box",
            r.pos() as u64,
            box_total * BoxRecord::SIZE as u64,
            self.data.len() as u64,
        )?;
        let box_records = (0..box_total)
            .map(|_| BoxRecord::read(&mut r))
            .collect::<Result<Vec<_>>>()?;

        let min_lod = records.iter().map(|rec| rec.lod).min().unwrap_or(HIGHEST_LOD);
        let only_highest = self.options.only_highest_lod;
        let keep = |rec: &MeshRecord| !only_highest || rec.lod == min_lod;

        let mut parts = Vec::new();
        let mut boxes = Vec::new();
        let mut box_cursor = 0usize;
        for (index, rec) in records.iter().enumerate() {
            let part_boxes = &box_records[box_cursor..box_cursor + rec.box_count as usize];
            box_cursor += rec.box_count as usize;
            if !keep(rec) {
                trace!("mesh part {} skipped at LOD {}", index, rec.lod);
                continue;
            }

            let mut box_indices = Vec::with_capacity(part_boxes.len());
            for b in part_boxes {
                // Out-of-range bones are recorded; indices past u16 are dropped
                let bone = b.bone_index().and_then(|bone| {
                    self.check_bone(bone, || format!("bounding box {}", boxes.len()));
                    u16::try_from(bone).ok()
                });
                box_indices.push(boxes.len());
                boxes.push(BoundingBox {
                    bone,
                    bounds: b.bounds,
                });
            }

            if self.options.mesh_parts {
                let mut part = self.read_part(index, rec)?;
                part.bounding_boxes = box_indices;
                parts.push(part);
            }
        }
        debug!("decoded {} of {} mesh parts, {} boxes", parts.len(), count, boxes.len());
        Ok((parts, boxes))
    }

    fn read_part(&mut self, index: usize, rec: &MeshRecord) -> Result<MeshPart> {
        let blocktype = Blocktype::from_bits(rec.blocktype)?;
        let stride = blocktype.stride();
        if rec.stride as usize != stride {
            return Err(Error::invalid(format!(
                "Mesh part {} stride {} does not match blocktype {} (stride {})",
                index, rec.stride, blocktype, stride
            )));
        }

        // Vertices must lie inside the vertex region
        let vertex_count = rec.vertex_count as usize;
        let vertex_len = (vertex_count * stride) as u64;
        let vertex_end = rec.vertex_offset as u64 + vertex_len;
        if vertex_end > self.header.vertex_buffer_size as u64 {
            return Err(Error::RegionOutOfBounds {
                region: "mesh part vertex",
                offset: self.header.offsets.vertices + rec.vertex_offset as u64,
                len: vertex_len,
                size: self.header.offsets.vertices + self.header.vertex_buffer_size as u64,
            });
        }
        let mut r = self.reader_at(self.header.offsets.vertices + rec.vertex_offset as u64)?;
        let scheme = self.options.split_weights;
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let mut v = read_vertex(&mut r, &blocktype)?;
            v.weights = scheme.decode(&v.weights);
            vertices.push(v);
        }

        // Indices are u16, relative to the part's first vertex
        let index_count = rec.index_count as usize;
        if index_count % 3 != 0 {
            return Err(Error::invalid(format!(
                "Mesh part {} has {} indices, not a triangle list",
                index, index_count
            )));
        }
        let index_end = rec.index_start as u64 + index_count as u64;
        if index_end > self.header.index_count as u64 {
            return Err(Error::RegionOutOfBounds {
                region: "mesh part index",
                offset: self.header.offsets.faces + rec.index_start as u64 * 2,
                len: index_count as u64 * 2,
                size: self.header.offsets.faces + self.header.index_count as u64 * 2,
            });
        }
        let mut r = self.reader_at(self.header.offsets.faces + rec.index_start as u64 * 2)?;
        let mut indices = Vec::with_capacity(index_count);
        for _ in 0..index_count {
            let i = r.read_u16::<Endian>()?;
            if i as usize >= vertex_count {
                return Err(Error::invalid(format!(
                    "Mesh part {} index {} out of range for {} vertices",
                    index, i, vertex_count
                )));
            }
            indices.push(i as u32);
        }

        if rec.material >= self.header.material_count {
            self.unresolved.push(UnresolvedReference {
                kind: ReferenceKind::Material,
                index: rec.material as usize,
                name: format!("mesh part {}", index),
            });
        }
        let bones: BTreeSet<u16> = vertices
            .iter()
            .flat_map(|v| v.weights.iter().map(|b| b.bone))
            .collect();
        for bone in bones {
            self.check_bone(bone as usize, || format!("mesh part {}", index));
        }

        Ok(MeshPart {
            lod: rec.lod,
            group_id: rec.group_id,
            material: rec.material,
            flags: rec.flags,
            weight_dynamics: rec.weight_dynamics,
            mesh_id: rec.mesh_id,
            blocktype: Some(blocktype),
            vertices,
            indices,
            bounding_boxes: Vec::new(),
        })
    }

    fn check_bone(&mut self, bone: usize, holder: impl FnOnce() -> String) {
        if bone >= self.header.bone_count as usize {
            self.unresolved.push(UnresolvedReference {
                kind: ReferenceKind::Bone,
                index: bone,
                name: holder(),
            });
        }
    }

    // ------------------------------------------------------------------------
    // Groups and trailing data
    // ------------------------------------------------------------------------

    fn read_groups(&self) -> Result<Vec<GroupFunction>> {
        let count = self.header.group_count as usize;
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut r = self.reader_at(self.header.offsets.groups)?;
        (0..count)
            .map(|_| {
                let rec = GroupRecord::read(&mut r)?;
                Ok(GroupFunction {
                    group_id: rec.group_id,
                    bounds: rec.bounds,
                })
            })
            .collect()
    }

    fn read_trailing(&self) -> Vec<u8> {
        let start = self.header.offsets.trailing as usize;
        if start == 0 || start >= self.data.len() {
            return Vec::new();
        }
        self.data[start..].to_vec()
    }
}

/// Drop boxes bound to a bone no retained vertex weight references.
fn omit_unused_boxes(model: &mut Model) {
    let used: BTreeSet<u16> = model
        .mesh_parts
        .iter()
        .flat_map(|p| p.referenced_bones())
        .collect();

    let mut remap = vec![None; model.bounding_boxes.len()];
    let mut kept = Vec::new();
    for (index, b) in model.bounding_boxes.iter().enumerate() {
        if b.bone.map_or(true, |bone| used.contains(&bone)) {
            remap[index] = Some(kept.len());
            kept.push(*b);
        }
    }
    debug!("omitted {} unused boxes", model.bounding_boxes.len() - kept.len());
    model.bounding_boxes = kept;
    for part in &mut model.mesh_parts {
        part.bounding_boxes = part.bounding_boxes.iter().filter_map(|&i| remap[i]).collect();
    }
}
