//! In-memory model: the decoder's output and the encoder's input.
//!
//! A [`Model`] owns every entity exclusively and lives for a single import or
//! export call.

mod mesh;
mod skeleton;

pub use mesh::*;
pub use skeleton::*;

use std::fmt;
use std::path::PathBuf;

use crate::format::HeaderProperty;
use crate::util::BBox3f;

/// Material reference. The name is opaque to the codec.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialSlot {
    pub name: String,
    /// Where the name resolved under the texture root, if it did.
    pub resolved: Option<PathBuf>,
}

impl MaterialSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved: None,
        }
    }
}

/// Culling/weighting volume, optionally bound to a bone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub bone: Option<u16>,
    pub bounds: BBox3f,
}

/// Group id paired with a bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupFunction {
    pub group_id: u32,
    pub bounds: BBox3f,
}

/// What kind of reference could not be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Material name not found under the texture root.
    Texture,
    /// Mesh part refers to a material slot the file does not have.
    Material,
    /// Weight or bounding box refers to a bone the file does not have.
    Bone,
}

/// A reference the decoder could not resolve. Recorded, never fatal.
#[derive(Clone, Debug, PartialEq)]
pub struct UnresolvedReference {
    pub kind: ReferenceKind,
    /// The material slot that failed to resolve, or the missing material or bone.
    pub index: usize,
    /// The material name, or what holds the dangling reference.
    pub name: String,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReferenceKind::Texture => write!(f, "material {}: '{}' not found", self.index, self.name),
            ReferenceKind::Material => write!(f, "material {} used by {} does not exist", self.index, self.name),
            ReferenceKind::Bone => write!(f, "bone {} used by {} does not exist", self.index, self.name),
        }
    }
}

/// Aggregate root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    /// Raw header fields, present when requested on import or supplied for export.
    pub header: Option<Vec<HeaderProperty>>,
    pub skeleton: Option<Skeleton>,
    pub mesh_parts: Vec<MeshPart>,
    pub materials: Vec<MaterialSlot>,
    pub bounding_boxes: Vec<BoundingBox>,
    pub group_functions: Vec<GroupFunction>,
    /// Opaque bytes after the last region.
    pub trailing: Vec<u8>,
    pub unresolved: Vec<UnresolvedReference>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_bones(&self) -> usize {
        self.skeleton.as_ref().map_or(0, Skeleton::len)
    }

    /// Bounds of every vertex of every part.
    pub fn bounds(&self) -> BBox3f {
        let mut b = BBox3f::EMPTY;
        for part in &self.mesh_parts {
            b.expand_by_box(&part.bounds());
        }
        b
    }

    /// Look up a header property by key (first occurrence).
    pub fn header_value(&self, key: &str) -> Option<&crate::format::HeaderValue> {
        self.header
            .as_ref()?
            .iter()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }
}
