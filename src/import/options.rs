//! Import options.
//!
//! Options travel as a dictionary whose keys are present only when the
//! corresponding option is on, so a key missing from JSON means "off".
//! [`ImportOptions::default`] is the interactive default set instead.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scene::SkeletonMode;
use crate::util::Result;
use crate::weights::WeightScheme;

/// Import-direction policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "ImportDictionary")]
pub struct ImportOptions {
    /// Reset the scene before importing.
    #[serde(rename = "Clear")]
    pub clear: bool,
    /// Widen view clipping.
    #[serde(rename = "Max Clip")]
    pub max_clip: bool,
    /// Keep only the parts at the lowest LOD present.
    #[serde(rename = "High LOD")]
    pub only_highest_lod: bool,
    /// Surface raw header fields as metadata.
    #[serde(rename = "Scene Header")]
    pub scene_header: bool,
    /// Skeleton representation; `None` skips the bone table.
    #[serde(rename = "Skeleton", skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<SkeletonMode>,
    /// Decode vertex and index data.
    #[serde(rename = "Mesh Parts")]
    pub mesh_parts: bool,
    /// Texture root for resolving material names.
    #[serde(rename = "Import Textures", skip_serializing_if = "Option::is_none")]
    pub import_textures: Option<PathBuf>,
    /// Texture root for material import; used when textures are off.
    #[serde(rename = "Import Materials", skip_serializing_if = "Option::is_none")]
    pub import_materials: Option<PathBuf>,
    /// Drop bounding boxes no retained vertex weight references.
    #[serde(rename = "Omit Unused Groups")]
    pub omit_unused_groups: bool,
    /// Decode the group table.
    #[serde(rename = "Load Groups and Functions")]
    pub load_groups_and_functions: bool,
    /// Scheme the file's weights were authored with.
    #[serde(rename = "Split Weights")]
    pub split_weights: WeightScheme,
}

/// Wire form of the options: hosts may send both LOD keys at once.
#[derive(Default, Deserialize)]
#[serde(default)]
struct ImportDictionary {
    #[serde(rename = "Clear")]
    clear: bool,
    #[serde(rename = "Max Clip")]
    max_clip: bool,
    #[serde(rename = "High LOD")]
    high_lod: bool,
    #[serde(rename = "Only Highest LOD")]
    only_highest_lod: bool,
    #[serde(rename = "Scene Header")]
    scene_header: bool,
    #[serde(rename = "Skeleton")]
    skeleton: Option<SkeletonMode>,
    #[serde(rename = "Mesh Parts")]
    mesh_parts: bool,
    #[serde(rename = "Import Textures")]
    import_textures: Option<PathBuf>,
    #[serde(rename = "Import Materials")]
    import_materials: Option<PathBuf>,
    #[serde(rename = "Omit Unused Groups")]
    omit_unused_groups: bool,
    #[serde(rename = "Load Groups and Functions")]
    load_groups_and_functions: bool,
    #[serde(rename = "Split Weights")]
    split_weights: WeightScheme,
}

impl From<ImportDictionary> for ImportOptions {
    fn from(d: ImportDictionary) -> Self {
        Self {
            clear: d.clear,
            max_clip: d.max_clip,
            only_highest_lod: d.high_lod || d.only_highest_lod,
            scene_header: d.scene_header,
            skeleton: d.skeleton,
            mesh_parts: d.mesh_parts,
            import_textures: d.import_textures,
            import_materials: d.import_materials,
            omit_unused_groups: d.omit_unused_groups,
            load_groups_and_functions: d.load_groups_and_functions,
            split_weights: d.split_weights,
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            clear: true,
            max_clip: true,
            only_highest_lod: true,
            scene_header: true,
            skeleton: Some(SkeletonMode::EmptyTree),
            mesh_parts: true,
            import_textures: Some(PathBuf::new()),
            import_materials: None,
            omit_unused_groups: false,
            load_groups_and_functions: false,
            split_weights: WeightScheme::Group,
        }
    }
}

impl ImportOptions {
    /// Every option off: an empty options dictionary.
    pub fn none() -> Self {
        Self {
            clear: false,
            max_clip: false,
            only_highest_lod: false,
            scene_header: false,
            skeleton: None,
            mesh_parts: false,
            import_textures: None,
            import_materials: None,
            omit_unused_groups: false,
            load_groups_and_functions: false,
            split_weights: WeightScheme::Group,
        }
    }

    /// Everything the file holds, all LODs, no scene side effects.
    pub fn everything() -> Self {
        Self {
            scene_header: true,
            skeleton: Some(SkeletonMode::Armature),
            mesh_parts: true,
            load_groups_and_functions: true,
            ..Self::none()
        }
    }

    /// Parse an options dictionary.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_weights(mut self, scheme: WeightScheme) -> Self {
        self.split_weights = scheme;
        self
    }

    /// Texture root material names are resolved against, if resolution is on.
    pub fn texture_root(&self) -> Option<&Path> {
        self.import_textures
            .as_deref()
            .or(self.import_materials.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_host() {
        let o = ImportOptions::default();
        assert!(o.clear && o.max_clip && o.only_highest_lod && o.scene_header && o.mesh_parts);
        assert_eq!(o.skeleton, Some(SkeletonMode::EmptyTree));
        assert!(o.import_textures.is_some());
        assert!(o.import_materials.is_none());
        assert!(!o.omit_unused_groups);
        assert!(!o.load_groups_and_functions);
        assert_eq!(o.split_weights, WeightScheme::Group);
    }

    #[test]
    fn test_dictionary_keys() {
        let o = ImportOptions::from_json(
            r#"{
                "Only Highest LOD": true,
                "Skeleton": "Armature",
                "Mesh Parts": true,
                "Import Materials": "/textures",
                "Split Weights": "Signed"
            }"#,
        )
        .unwrap();
        assert!(o.only_highest_lod);
        assert!(!o.clear);
        assert!(!o.scene_header);
        assert_eq!(o.skeleton, Some(SkeletonMode::Armature));
        assert_eq!(o.split_weights, WeightScheme::Signed);
        assert_eq!(o.texture_root(), Some(Path::new("/textures")));
    }

    #[test]
    fn test_both_lod_keys() {
        let o = ImportOptions::from_json(r#"{"High LOD": true, "Only Highest LOD": true}"#).unwrap();
        assert!(o.only_highest_lod);
    }

    #[test]
    fn test_serialized_options_read_back() {
        let o = ImportOptions::default();
        let json = serde_json::to_string(&o).unwrap();
        assert_eq!(ImportOptions::from_json(&json).unwrap(), o);
    }

    #[test]
    fn test_empty_dictionary_is_all_off() {
        assert_eq!(ImportOptions::from_json("{}").unwrap(), ImportOptions::none());
    }

    #[test]
    fn test_bad_scheme_rejected() {
        assert!(ImportOptions::from_json(r#"{"Split Weights": "Diagonal"}"#).is_err());
    }
}
