//! Export options.

use serde::{Deserialize, Serialize};

use crate::util::Result;
use crate::validate::{Category, ErrorLevels, Severity};
use crate::weights::WeightScheme;

/// Where per-part bounding boxes come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundsMode {
    /// One tight box per part around all of its vertices.
    #[default]
    Calculate,
    /// The model's boxes, verbatim.
    Explicit,
}

/// Export-direction policy. Missing keys take the interactive defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Rewrite every part's LOD to the highest.
    pub lod: bool,
    /// Severity per validation category.
    pub levels: ErrorLevels,
    /// Keep supplied normals instead of recomputing smooth ones.
    #[serde(rename = "splitnormals")]
    pub split_normals: bool,
    /// Give overweight three-slot vertices an explicit negative fourth slot.
    pub coerce: bool,
    /// Include meshes the scene marks hidden.
    pub hidden: bool,
    #[serde(rename = "boundingbox")]
    pub bounding_box: BoundsMode,
    /// Scheme used to lay weights into slots.
    pub weights: WeightScheme,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            lod: true,
            levels: ErrorLevels::default(),
            split_normals: true,
            coerce: true,
            hidden: true,
            bounding_box: BoundsMode::Calculate,
            weights: WeightScheme::Group,
        }
    }
}

impl ExportOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Options that keep the model as given: stored LODs, supplied normals,
    /// explicit boxes, no coercion.
    pub fn preserving() -> Self {
        Self {
            lod: false,
            coerce: false,
            bounding_box: BoundsMode::Explicit,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, category: Category, severity: Severity) -> Self {
        self.levels.set(category, severity);
        self
    }

    pub fn with_weights(mut self, scheme: WeightScheme) -> Self {
        self.weights = scheme;
        self
    }
}
