//! Per-part export preparation.
//!
//! Turns a [`MeshPart`] into the exact vertices, indices, boxes and record
//! the writer lays out, recording every irregularity with the validator on
//! the way. Fatal structural problems (sizes the format cannot express)
//! return an error immediately; everything else is left to the validator.

use std::collections::BTreeSet;

use glam::{Vec2, Vec3, Vec4};

use super::options::{BoundsMode, ExportOptions};
use crate::format::{
    Blocktype, BoxRecord, MeshRecord, HIGHEST_LOD, MAX_COLOR_CHANNELS, MAX_PART_VERTICES,
    MAX_UV_CHANNELS, MAX_WEIGHT_SLOTS, NO_BONE,
};
use crate::model::{MeshPart, Model, Vertex, WeightBinding, WeightList};
use crate::util::{Error, Result};
use crate::validate::{Category, Entity, Validator};
use crate::weights::WeightScheme;

/// Allowed deviation of a normal's length from one.
pub const NORMAL_TOLERANCE: f32 = 0.02;

/// Allowed deviation of a Group weight sum from one.
pub const WEIGHT_SUM_TOLERANCE: f32 = 0.01;

const DEFAULT_TANGENT: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

/// A part ready for serialization. Offsets in `record` are filled by the writer.
#[derive(Clone, Debug)]
pub(crate) struct PreparedPart {
    pub record: MeshRecord,
    pub blocktype: Blocktype,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub boxes: Vec<BoxRecord>,
}

/// Counts a per-vertex irregularity so it is reported once per part.
#[derive(Default)]
struct Tally {
    first: Option<usize>,
    count: usize,
    detail: String,
}

impl Tally {
    fn hit(&mut self, vertex: usize, detail: impl FnOnce() -> String) {
        if self.first.is_none() {
            self.first = Some(vertex);
            self.detail = detail();
        }
        self.count += 1;
    }

    fn report(self, v: &mut Validator, category: Category, part: usize, what: &str) {
        if let Some(vertex) = self.first {
            let message = if self.count > 1 {
                format!("{} ({}; {} vertices)", what, self.detail, self.count)
            } else {
                format!("{} ({})", what, self.detail)
            };
            v.record(category, Entity::Vertex { part, vertex }, message);
        }
    }
}

pub(crate) struct Preparer<'a> {
    model: &'a Model,
    options: &'a ExportOptions,
    num_bones: usize,
}

impl<'a> Preparer<'a> {
    pub fn new(model: &'a Model, options: &'a ExportOptions) -> Self {
        Self {
            model,
            options,
            num_bones: model.num_bones(),
        }
    }

    pub fn prepare(&self, v: &mut Validator, index: usize, part: &MeshPart) -> Result<PreparedPart> {
        let entity = Entity::MeshPart { part: index };
        if part.vertices.len() > MAX_PART_VERTICES {
            return Err(Error::invalid(format!(
                "Mesh part {} has {} vertices, at most {} fit a part",
                index,
                part.vertices.len(),
                MAX_PART_VERTICES
            )));
        }
        if part.indices.len() % 3 != 0 {
            return Err(Error::invalid(format!(
                "Mesh part {} has {} indices, not a triangle list",
                index,
                part.indices.len()
            )));
        }

        let indices = self.indices(v, index, part);
        if part.material as usize >= self.model.materials.len() {
            v.reference(
                entity.clone(),
                format!(
                    "material {} does not exist ({} slots)",
                    part.material,
                    self.model.materials.len()
                ),
            );
        }

        let slots = self.encode_weights(v, index, part);
        let blocktype = self.blocktype(v, index, part, &slots);
        let vertices = self.vertices(v, index, part, &blocktype, slots);
        let boxes = self.boxes(v, index, part)?;
        let box_count = u8::try_from(boxes.len()).map_err(|_| {
            Error::invalid(format!("Mesh part {} has {} bounding boxes", index, boxes.len()))
        })?;

        let record = MeshRecord {
            flags: part.flags,
            vertex_count: vertices.len() as u16,
            group_id: part.group_id,
            material: part.material,
            lod: if self.options.lod { HIGHEST_LOD } else { part.lod },
            weight_dynamics: part.weight_dynamics,
            stride: blocktype.stride() as u8,
            blocktype: blocktype.bits(),
            index_count: indices.len() as u32,
            box_count,
            mesh_id: part.mesh_id,
            ..Default::default()
        };
        Ok(PreparedPart {
            record,
            blocktype,
            vertices,
            indices,
            boxes,
        })
    }

    fn indices(&self, v: &mut Validator, index: usize, part: &MeshPart) -> Vec<u16> {
        let count = part.vertices.len();
        let mut dangling = Tally::default();
        let indices: Vec<u16> = part
            .indices
            .iter()
            .enumerate()
            .map(|(position, &i)| {
                if i as usize >= count {
                    dangling.hit(position, || format!("index {} at position {}", i, position));
                    0
                } else {
                    i as u16
                }
            })
            .collect();
        if let Some(first) = dangling.first {
            v.reference(
                Entity::MeshPart { part: index },
                format!(
                    "{} indices out of range for {} vertices, first is {} at position {}",
                    dangling.count, count, part.indices[first], first
                ),
            );
        }
        indices
    }

    /// Lay every vertex's weights into slots and apply coercion.
    fn encode_weights(&self, v: &mut Validator, index: usize, part: &MeshPart) -> Vec<WeightList> {
        let scheme = self.options.weights;
        let mut dangling = BTreeSet::new();
        let mut sums = Tally::default();
        let mut encoded = Vec::with_capacity(part.vertices.len());

        for (vi, vertex) in part.vertices.iter().enumerate() {
            dangling.extend(
                vertex
                    .weights
                    .iter()
                    .map(|b| b.bone)
                    .filter(|&bone| bone as usize >= self.num_bones),
            );

            if scheme == WeightScheme::Group {
                let signed = WeightScheme::Signed.encode(&vertex.weights);
                for b in signed.iter().filter(|b| b.weight < 0.0) {
                    v.record(
                        Category::Weight,
                        Entity::Vertex { part: index, vertex: vi },
                        format!("bone {} has negative total weight {:.4}, dropped", b.bone, b.weight),
                    );
                }
            }

            let mut slots = scheme.encode(&vertex.weights);
            let sum: f32 = slots.iter().map(|b| b.weight).sum();
            if scheme == WeightScheme::Group
                && !slots.is_empty()
                && (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE
            {
                sums.hit(vi, || format!("sum {:.4}", sum));
            }
            if self.options.coerce {
                coerce_fourth(&mut slots);
            }
            encoded.push(slots);
        }

        for bone in dangling {
            v.reference(
                Entity::MeshPart { part: index },
                format!("weight refers to bone {} but the skeleton has {}", bone, self.num_bones),
            );
        }
        sums.report(v, Category::WeightCount, index, "weights do not sum to 1");
        encoded
    }

    /// The layout to write: the declared blocktype when usable, else the one
    /// the data needs.
    fn blocktype(&self, v: &mut Validator, index: usize, part: &MeshPart, slots: &[WeightList]) -> Blocktype {
        let max_slots = slots.iter().map(|s| s.len()).max().unwrap_or(0);
        let derived = Blocktype {
            normals: true,
            tangents: part.vertices.iter().any(|x| x.tangent.is_some()),
            uv_channels: max_channels(part.vertices.iter().map(|x| x.uvs.len()), MAX_UV_CHANNELS),
            color_channels: max_channels(
                part.vertices.iter().map(|x| x.colors.len()),
                MAX_COLOR_CHANNELS,
            ),
            weight_slots: Blocktype::capacity_for(max_slots).unwrap_or(MAX_WEIGHT_SLOTS as u8),
        };

        let entity = Entity::MeshPart { part: index };
        let Some(declared) = part.blocktype else {
            return derived;
        };
        if !declared.is_representable() {
            v.record(
                Category::Blocktype,
                entity,
                format!("declared blocktype {} cannot be stored, using {}", declared, derived),
            );
            return derived;
        }
        if declared.tangents != derived.tangents {
            v.record(
                Category::Blocktype,
                entity.clone(),
                format!(
                    "declares tangents {} but the vertices {} carry them",
                    declared.tangents,
                    if derived.tangents { "do" } else { "do not" }
                ),
            );
        }
        if declared.is_skinned() && max_slots == 0 {
            v.record(
                Category::Blocktype,
                entity,
                format!("declares {} weight slots but no vertex is weighted", declared.weight_slots),
            );
        }
        declared
    }

    fn vertices(
        &self,
        v: &mut Validator,
        index: usize,
        part: &MeshPart,
        bt: &Blocktype,
        slots: Vec<WeightList>,
    ) -> Vec<Vertex> {
        let split = self.options.split_normals;
        let needs_smooth = bt.normals
            && (!split || part.vertices.iter().any(|x| x.normal.map_or(true, |n| !is_unit(n))));
        let smooth = if needs_smooth { part.smooth_normals() } else { Vec::new() };

        let mut missing_normals = Tally::default();
        let mut bad_normals = Tally::default();
        let mut stray_normals = Tally::default();
        let mut missing_tangents = Tally::default();
        let mut uv_mismatch = Tally::default();
        let mut colour_mismatch = Tally::default();
        let mut unweighted = Tally::default();

        let mut out = Vec::with_capacity(part.vertices.len());
        for ((vi, vertex), mut weights) in part.vertices.iter().enumerate().zip(slots) {
            let mut o = Vertex::new(vertex.position);

            if bt.normals {
                o.normal = Some(match (split, vertex.normal) {
                    (false, _) => smooth[vi],
                    (true, None) => {
                        missing_normals.hit(vi, || "smooth normal used".to_string());
                        smooth[vi]
                    }
                    (true, Some(n)) if !is_unit(n) => {
                        bad_normals.hit(vi, || format!("length {:.4}", n.length()));
                        let n = n.normalize_or_zero();
                        if n == Vec3::ZERO {
                            smooth[vi]
                        } else {
                            n
                        }
                    }
                    (true, Some(n)) => n,
                });
            } else if vertex.normal.is_some() {
                stray_normals.hit(vi, || "dropped".to_string());
            }

            if bt.tangents {
                if vertex.tangent.is_none() {
                    missing_tangents.hit(vi, || "default tangent used".to_string());
                }
                o.tangent = Some(vertex.tangent.unwrap_or(DEFAULT_TANGENT));
            }

            let uvs = bt.uv_channels as usize;
            if vertex.uvs.len() != uvs {
                uv_mismatch.hit(vi, || format!("{} channels, blocktype has {}", vertex.uvs.len(), uvs));
            }
            o.uvs = (0..uvs)
                .map(|c| vertex.uvs.get(c).copied().unwrap_or(Vec2::ZERO))
                .collect();

            let colors = bt.color_channels as usize;
            if vertex.colors.len() != colors {
                colour_mismatch.hit(vi, || {
                    format!("{} channels, blocktype has {}", vertex.colors.len(), colors)
                });
            }
            o.colors = (0..colors)
                .map(|c| vertex.colors.get(c).copied().unwrap_or([0xFF; 4]))
                .collect();

            let capacity = bt.weight_slots as usize;
            if bt.is_skinned() && weights.is_empty() {
                unweighted.hit(vi, || "no weights".to_string());
            }
            if weights.len() > capacity {
                v.record(
                    Category::Weight,
                    Entity::Vertex { part: index, vertex: vi },
                    format!(
                        "{} weight slots exceed blocktype capacity {}, truncated",
                        weights.len(),
                        capacity
                    ),
                );
                weights.truncate(capacity);
            }
            o.weights = weights;
            out.push(o);
        }

        missing_normals.report(v, Category::Loop, index, "missing normal");
        bad_normals.report(v, Category::Loop, index, "non-unit normal normalized");
        stray_normals.report(v, Category::Loop, index, "normal without a normal stream");
        missing_tangents.report(v, Category::Loop, index, "missing tangent");
        uv_mismatch.report(v, Category::Uv, index, "UV channels differ from the blocktype");
        colour_mismatch.report(v, Category::Colour, index, "colour channels differ from the blocktype");
        unweighted.report(v, Category::WeightCount, index, "unweighted vertex in skinned part");
        out
    }

    fn boxes(&self, v: &mut Validator, index: usize, part: &MeshPart) -> Result<Vec<BoxRecord>> {
        match self.options.bounding_box {
            BoundsMode::Calculate => Ok(vec![BoxRecord {
                bone: part.dominant_bone().map_or(NO_BONE, u32::from),
                bounds: part.bounds(),
            }]),
            BoundsMode::Explicit => {
                let mut boxes = Vec::with_capacity(part.bounding_boxes.len());
                for &bi in &part.bounding_boxes {
                    let Some(b) = self.model.bounding_boxes.get(bi) else {
                        v.reference(
                            Entity::MeshPart { part: index },
                            format!(
                                "bounding box {} does not exist ({} boxes)",
                                bi,
                                self.model.bounding_boxes.len()
                            ),
                        );
                        continue;
                    };
                    if let Some(bone) = b.bone.filter(|&bone| bone as usize >= self.num_bones) {
                        v.reference(
                            Entity::BoundingBox { index: bi },
                            format!("bone {} does not exist ({} bones)", bone, self.num_bones),
                        );
                    }
                    boxes.push(BoxRecord {
                        bone: b.bone.map_or(NO_BONE, u32::from),
                        bounds: b.bounds,
                    });
                }
                Ok(boxes)
            }
        }
    }
}

/// Three slots summing above one get an explicit negative fourth slot on the
/// heaviest bone, so the four-slot layout reproduces the sum.
fn coerce_fourth(slots: &mut WeightList) {
    if slots.len() != 3 {
        return;
    }
    let sum: f32 = slots.iter().map(|b| b.weight).sum();
    if sum <= 1.0 + WEIGHT_SUM_TOLERANCE {
        return;
    }
    let heaviest = slots
        .iter()
        .max_by(|a, b| a.weight.abs().total_cmp(&b.weight.abs()))
        .map(|b| b.bone);
    if let Some(bone) = heaviest {
        slots.push(WeightBinding::new(bone, 1.0 - sum));
    }
}

fn is_unit(n: Vec3) -> bool {
    (n.length() - 1.0).abs() <= NORMAL_TOLERANCE
}

fn max_channels(counts: impl Iterator<Item = usize>, limit: usize) -> u8 {
    counts.max().unwrap_or(0).min(limit) as u8
}
