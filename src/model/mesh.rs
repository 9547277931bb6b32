//! Mesh parts, vertices and weight bindings.

use std::collections::BTreeSet;

use glam::{Vec2, Vec3, Vec4};
use smallvec::SmallVec;

use crate::format::Blocktype;
use crate::util::BBox3f;

/// One (bone, weight) influence on a vertex.
///
/// The weight is signed; only the Signed scheme gives the sign meaning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightBinding {
    pub bone: u16,
    pub weight: f32,
}

impl WeightBinding {
    #[inline]
    pub const fn new(bone: u16, weight: f32) -> Self {
        Self { bone, weight }
    }
}

/// Weight bindings of one vertex, in slot or authoring order.
pub type WeightList = SmallVec<[WeightBinding; 4]>;

/// A single vertex with its optional attribute streams.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Option<Vec3>,
    /// Tangent with handedness in `w`.
    pub tangent: Option<Vec4>,
    pub uvs: SmallVec<[Vec2; 2]>,
    /// RGBA colours.
    pub colors: SmallVec<[[u8; 4]; 1]>,
    pub weights: WeightList,
}

impl Vertex {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_tangent(mut self, tangent: Vec4) -> Self {
        self.tangent = Some(tangent);
        self
    }

    pub fn with_uv(mut self, uv: Vec2) -> Self {
        self.uvs.push(uv);
        self
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.colors.push(color);
        self
    }

    pub fn with_weight(mut self, bone: u16, weight: f32) -> Self {
        self.weights.push(WeightBinding::new(bone, weight));
        self
    }
}

/// A mesh part: one drawable chunk at one LOD with one material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshPart {
    /// Level of detail, 0 is the highest.
    pub lod: u32,
    /// Visibility group id.
    pub group_id: u16,
    /// Index into the model's material slots.
    pub material: u16,
    /// Opaque per-part flags.
    pub flags: u16,
    pub weight_dynamics: u16,
    pub mesh_id: u16,
    /// Declared attribute layout. Derived from the vertices on export when absent.
    pub blocktype: Option<Blocktype>,
    pub vertices: Vec<Vertex>,
    /// Triangle list, indices into `vertices`.
    pub indices: Vec<u32>,
    /// Indices into the model's bounding boxes.
    pub bounding_boxes: Vec<usize>,
}

impl MeshPart {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            ..Default::default()
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Tight bounds of the vertex positions.
    pub fn bounds(&self) -> BBox3f {
        BBox3f::from_points(self.vertices.iter().map(|v| v.position))
    }

    /// Every bone referenced by a weight binding.
    pub fn referenced_bones(&self) -> BTreeSet<u16> {
        self.vertices
            .iter()
            .flat_map(|v| v.weights.iter().map(|b| b.bone))
            .collect()
    }

    /// Largest number of weight bindings on a single vertex.
    pub fn max_weight_slots(&self) -> usize {
        self.vertices.iter().map(|v| v.weights.len()).max().unwrap_or(0)
    }

    /// Bone with the largest total positive influence.
    pub fn dominant_bone(&self) -> Option<u16> {
        let mut totals: Vec<(u16, f32)> = Vec::new();
        for b in self.vertices.iter().flat_map(|v| v.weights.iter()) {
            if b.weight <= 0.0 {
                continue;
            }
            match totals.iter_mut().find(|(bone, _)| *bone == b.bone) {
                Some((_, total)) => *total += b.weight,
                None => totals.push((b.bone, b.weight)),
            }
        }
        totals
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(bone, _)| bone)
    }

    /// Smooth per-vertex normals: area-weighted sum of adjacent face normals.
    ///
    /// Vertices without any non-degenerate face get `+Y`.
    pub fn smooth_normals(&self) -> Vec<Vec3> {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= acc.len() || b >= acc.len() || c >= acc.len() {
                continue;
            }
            let p0 = self.vertices[a].position;
            let face = (self.vertices[b].position - p0).cross(self.vertices[c].position - p0);
            acc[a] += face;
            acc[b] += face;
            acc[c] += face;
        }
        acc.into_iter()
            .map(|n| {
                let n = n.normalize_or_zero();
                if n == Vec3::ZERO {
                    Vec3::Y
                } else {
                    n
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshPart {
        MeshPart::new(
            vec![
                Vertex::new(Vec3::new(-1.0, 0.0, 0.0)).with_weight(0, 1.0),
                Vertex::new(Vec3::new(2.0, 0.0, 0.0)).with_weight(1, 0.75).with_weight(0, 0.25),
                Vertex::new(Vec3::new(0.0, 0.0, -1.0)).with_weight(1, 1.0),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_bounds() {
        let b = triangle().bounds();
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(b.max, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_weight_queries() {
        let part = triangle();
        assert_eq!(part.max_weight_slots(), 2);
        assert_eq!(part.referenced_bones().into_iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(part.dominant_bone(), Some(1));
    }

    #[test]
    fn test_smooth_normals() {
        let normals = triangle().smooth_normals();
        // Counter-clockwise seen from +Y
        for n in normals {
            assert!((n - Vec3::Y).length() < 1e-6, "{n:?}");
        }
    }
}
