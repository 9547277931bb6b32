//! Bone hierarchy.
//!
//! A [`Skeleton`] is built once from the flat bone table and only ever
//! replaced by rebuilding it; the tree links are derived from parent indices.

use glam::{Mat4, Quat, Vec3};

use crate::util::{Error, Result};

/// Decomposed local transform of a bone relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One bone of the table.
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    /// Function id used by animation remapping.
    pub function: u16,
    /// Parent index; `None` for roots.
    pub parent: Option<usize>,
    /// Symmetric counterpart (left/right pair), if any.
    pub pair: Option<usize>,
    pub length: f32,
    pub local: Transform,
}

impl Bone {
    pub fn new(function: u16, parent: Option<usize>, local: Transform) -> Self {
        Self {
            function,
            parent,
            pair: None,
            length: local.translation.length(),
            local,
        }
    }
}

/// Tree view over a flat bone table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
    children: Vec<Vec<usize>>,
}

impl Skeleton {
    /// Build the tree, rejecting parents that do not precede their child.
    ///
    /// Parent-before-child ordering makes the table a forest, so no cycle
    /// check is needed beyond it.
    pub fn from_bones(bones: Vec<Bone>) -> Result<Self> {
        let mut children = vec![Vec::new(); bones.len()];
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= index {
                    return Err(Error::invalid(format!(
                        "Bone {} has parent {} which does not precede it",
                        index, parent
                    )));
                }
                children[parent].push(index);
            }
            if let Some(pair) = bone.pair {
                if pair >= bones.len() {
                    return Err(Error::invalid(format!(
                        "Bone {} pairs with missing bone {}",
                        index, pair
                    )));
                }
            }
        }
        Ok(Self { bones, children })
    }

    #[inline]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Index of the bone with the given function id.
    pub fn bone_by_function(&self, function: u16) -> Option<usize> {
        self.bones.iter().position(|b| b.function == function)
    }

    /// Number of ancestors of a bone.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.bones.get(index).and_then(|b| b.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.bones[parent].parent;
        }
        depth
    }

    /// Bone indices in depth-first order, parents before children.
    pub fn depth_first(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack: Vec<usize> = self.roots().collect();
        stack.reverse();
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.children(index).iter().rev());
        }
        order
    }

    /// Model-space matrix of every bone.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut world: Vec<Mat4> = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let local = bone.local.to_matrix();
            // Parents precede children, so the parent is already computed
            let m = match bone.parent {
                Some(parent) => world[parent] * local,
                None => local,
            };
            world.push(m);
        }
        world
    }

    /// Inverse bind matrices, as stored after the local matrices.
    pub fn inverse_bind_matrices(&self) -> Vec<Mat4> {
        self.world_matrices().iter().map(Mat4::inverse).collect()
    }
}
