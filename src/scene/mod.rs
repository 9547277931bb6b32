//! Scene API: the boundary between the codec and a host application.
//!
//! The importer hands decoded entities to a [`SceneBuilder`]; the exporter
//! pulls a model out of a [`SceneSource`]. The codec never reaches past these
//! traits into host state. Sources must hand over geometry with object
//! transforms already applied; the codec does not check this.
//!
//! [`MemoryScene`] implements both sides and stands in for a host in tools and
//! tests.

use serde::{Deserialize, Serialize};

use crate::format::HeaderProperty;
use crate::model::{BoundingBox, GroupFunction, MaterialSlot, MeshPart, Model, Skeleton};
use crate::util::Result;

/// How the host should materialize the skeleton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkeletonMode {
    /// Hierarchy of plain anchor nodes.
    EmptyTree,
    /// Deformation rig.
    Armature,
}

/// Import-direction consumer.
pub trait SceneBuilder {
    /// Remove existing content before an import.
    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    /// Widen view clipping so large models are visible.
    fn maximize_clipping(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_header(&mut self, properties: &[HeaderProperty]) -> Result<()>;

    fn create_armature(&mut self, skeleton: &Skeleton, mode: SkeletonMode) -> Result<()>;

    fn create_material(&mut self, index: usize, material: &MaterialSlot) -> Result<()>;

    fn create_mesh(&mut self, index: usize, part: &MeshPart) -> Result<()>;

    fn create_bounding_volume(&mut self, index: usize, bbox: &BoundingBox) -> Result<()>;

    fn create_group_function(&mut self, function: &GroupFunction) -> Result<()>;

    /// Opaque bytes that followed the last region.
    fn set_trailing(&mut self, _data: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Export-direction producer.
pub trait SceneSource {
    fn extract_header(&self) -> Option<Vec<HeaderProperty>>;

    fn extract_skeleton(&self) -> Option<Skeleton>;

    fn extract_meshes(&self) -> Vec<MeshPart>;

    /// Whether the mesh at `index` of [`extract_meshes`](Self::extract_meshes) is hidden.
    fn extract_hidden_flag(&self, index: usize) -> bool;

    fn extract_materials(&self) -> Vec<MaterialSlot>;

    fn extract_bounding_boxes(&self) -> Vec<BoundingBox>;

    fn extract_group_functions(&self) -> Vec<GroupFunction>;

    fn extract_trailing(&self) -> Vec<u8> {
        Vec::new()
    }
}

impl SceneSource for Model {
    fn extract_header(&self) -> Option<Vec<HeaderProperty>> {
        self.header.clone()
    }

    fn extract_skeleton(&self) -> Option<Skeleton> {
        self.skeleton.clone()
    }

    fn extract_meshes(&self) -> Vec<MeshPart> {
        self.mesh_parts.clone()
    }

    fn extract_hidden_flag(&self, _index: usize) -> bool {
        false
    }

    fn extract_materials(&self) -> Vec<MaterialSlot> {
        self.materials.clone()
    }

    fn extract_bounding_boxes(&self) -> Vec<BoundingBox> {
        self.bounding_boxes.clone()
    }

    fn extract_group_functions(&self) -> Vec<GroupFunction> {
        self.group_functions.clone()
    }

    fn extract_trailing(&self) -> Vec<u8> {
        self.trailing.clone()
    }
}

// ============================================================================
// In-memory scene
// ============================================================================

/// A mesh object of a [`MemoryScene`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneMesh {
    pub part: MeshPart,
    pub hidden: bool,
}

/// Minimal host scene held entirely in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryScene {
    pub header: Option<Vec<HeaderProperty>>,
    pub armature: Option<(Skeleton, SkeletonMode)>,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<MaterialSlot>,
    pub bounding_volumes: Vec<BoundingBox>,
    pub group_functions: Vec<GroupFunction>,
    pub trailing: Vec<u8>,
    pub clipping_maximized: bool,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects of every kind.
    pub fn object_count(&self) -> usize {
        self.armature.iter().count()
            + self.meshes.len()
            + self.materials.len()
            + self.bounding_volumes.len()
            + self.group_functions.len()
    }

    pub fn set_hidden(&mut self, index: usize, hidden: bool) {
        if let Some(mesh) = self.meshes.get_mut(index) {
            mesh.hidden = hidden;
        }
    }
}

impl SceneBuilder for MemoryScene {
    fn clear(&mut self) -> Result<()> {
        let clipping_maximized = self.clipping_maximized;
        *self = Self {
            clipping_maximized,
            ..Self::default()
        };
        Ok(())
    }

    fn maximize_clipping(&mut self) -> Result<()> {
        self.clipping_maximized = true;
        Ok(())
    }

    fn set_header(&mut self, properties: &[HeaderProperty]) -> Result<()> {
        self.header = Some(properties.to_vec());
        Ok(())
    }

    fn create_armature(&mut self, skeleton: &Skeleton, mode: SkeletonMode) -> Result<()> {
        self.armature = Some((skeleton.clone(), mode));
        Ok(())
    }

    fn create_material(&mut self, _index: usize, material: &MaterialSlot) -> Result<()> {
        self.materials.push(material.clone());
        Ok(())
    }

    fn create_mesh(&mut self, _index: usize, part: &MeshPart) -> Result<()> {
        self.meshes.push(SceneMesh {
            part: part.clone(),
            hidden: false,
        });
        Ok(())
    }

    fn create_bounding_volume(&mut self, _index: usize, bbox: &BoundingBox) -> Result<()> {
        self.bounding_volumes.push(*bbox);
        Ok(())
    }

    fn create_group_function(&mut self, function: &GroupFunction) -> Result<()> {
        self.group_functions.push(*function);
        Ok(())
    }

    fn set_trailing(&mut self, data: &[u8]) -> Result<()> {
        self.trailing = data.to_vec();
        Ok(())
    }
}

impl SceneSource for MemoryScene {
    fn extract_header(&self) -> Option<Vec<HeaderProperty>> {
        self.header.clone()
    }

    fn extract_skeleton(&self) -> Option<Skeleton> {
        self.armature.as_ref().map(|(skeleton, _)| skeleton.clone())
    }

    fn extract_meshes(&self) -> Vec<MeshPart> {
        self.meshes.iter().map(|m| m.part.clone()).collect()
    }

    fn extract_hidden_flag(&self, index: usize) -> bool {
        self.meshes.get(index).is_some_and(|m| m.hidden)
    }

    fn extract_materials(&self) -> Vec<MaterialSlot> {
        self.materials.clone()
    }

    fn extract_bounding_boxes(&self) -> Vec<BoundingBox> {
        self.bounding_volumes.clone()
    }

    fn extract_group_functions(&self) -> Vec<GroupFunction> {
        self.group_functions.clone()
    }

    fn extract_trailing(&self) -> Vec<u8> {
        self.trailing.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Vertex;
    use glam::Vec3;

    fn part() -> MeshPart {
        MeshPart::new(
            vec![
                Vertex::new(Vec3::ZERO),
                Vertex::new(Vec3::X),
                Vertex::new(Vec3::Y),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_memory_scene_builds_and_extracts() {
        let mut scene = MemoryScene::new();
        scene.create_mesh(0, &part()).unwrap();
        scene.create_mesh(1, &part()).unwrap();
        scene.create_material(0, &MaterialSlot::new("body")).unwrap();
        scene.set_hidden(1, true);

        assert_eq!(scene.object_count(), 3);
        assert_eq!(scene.extract_meshes().len(), 2);
        assert!(!scene.extract_hidden_flag(0));
        assert!(scene.extract_hidden_flag(1));
        assert!(!scene.extract_hidden_flag(7));
        assert_eq!(scene.extract_materials()[0].name, "body");
    }

    #[test]
    fn test_clear_keeps_clipping() {
        let mut scene = MemoryScene::new();
        scene.maximize_clipping().unwrap();
        scene.create_mesh(0, &part()).unwrap();
        scene.clear().unwrap();
        assert_eq!(scene.object_count(), 0);
        assert!(scene.clipping_maximized);
    }

    #[test]
    fn test_model_is_a_source() {
        let mut model = Model::new();
        model.mesh_parts.push(part());
        model.trailing = vec![1, 2, 3];
        assert_eq!(model.extract_meshes().len(), 1);
        assert!(!model.extract_hidden_flag(0));
        assert_eq!(model.extract_trailing(), vec![1, 2, 3]);
        assert!(model.extract_skeleton().is_none());
    }
}
