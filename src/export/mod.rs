//! MOD3 encoding.
//!
//! [`encode`] validates a [`Model`] and serializes it with exactly the layout
//! the decoder reads; [`export`] first pulls the model out of a
//! [`SceneSource`]. Encoding is all-or-nothing: any error-severity violation
//! aborts with [`Error::Validation`] carrying every violation found, and no
//! bytes are produced.
//!
//! ## Example
//!
//! ```ignore
//! use mod3::export::{encode, ExportOptions};
//!
//! let encoded = encode(&model, &ExportOptions::default())?;
//! for warning in encoded.report.warnings() {
//!     eprintln!("{}", warning);
//! }
//! std::fs::write("out.mod3", &encoded.bytes)?;
//! ```

mod options;
mod prepare;
mod writer;

pub use options::{BoundsMode, ExportOptions};
pub use prepare::{NORMAL_TOLERANCE, WEIGHT_SUM_TOLERANCE};

use std::path::Path;

use tracing::debug;

use crate::model::Model;
use crate::scene::SceneSource;
use crate::util::{Error, Result};
use crate::validate::{check_header_properties, ValidationReport, Validator};
use prepare::Preparer;
use writer::{group_records, HeaderFields, Layout};

/// A successful encode: the file bytes and the non-fatal violations.
#[derive(Clone, Debug)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub report: ValidationReport,
}

/// Validate and serialize a model.
#[tracing::instrument(skip_all, fields(parts = model.mesh_parts.len()))]
pub fn encode(model: &Model, options: &ExportOptions) -> Result<Encoded> {
    let mut v = Validator::new(options.levels);
    check_header_properties(&mut v, model.header.as_deref());

    let preparer = Preparer::new(model, options);
    let parts = model
        .mesh_parts
        .iter()
        .enumerate()
        .map(|(index, part)| preparer.prepare(&mut v, index, part))
        .collect::<Result<Vec<_>>>()?;
    let groups = group_records(model, &parts);

    let report = v.finish()?;
    debug!(
        "validation passed: {} warnings, {} ignored",
        report.warnings().count(),
        report.ignored().count()
    );

    let bytes = Layout {
        fields: HeaderFields::from_model(model),
        skeleton: model.skeleton.as_ref(),
        groups,
        materials: &model.materials,
        parts,
        trailing: &model.trailing,
    }
    .write()?;
    Ok(Encoded { bytes, report })
}

/// Gather a model from a scene, leaving hidden meshes out unless requested.
pub fn extract<S: SceneSource + ?Sized>(scene: &S, options: &ExportOptions) -> Model {
    let mesh_parts = scene
        .extract_meshes()
        .into_iter()
        .enumerate()
        .filter(|(index, _)| options.hidden || !scene.extract_hidden_flag(*index))
        .map(|(_, part)| part)
        .collect();
    Model {
        header: scene.extract_header(),
        skeleton: scene.extract_skeleton(),
        mesh_parts,
        materials: scene.extract_materials(),
        bounding_boxes: scene.extract_bounding_boxes(),
        group_functions: scene.extract_group_functions(),
        trailing: scene.extract_trailing(),
        unresolved: Vec::new(),
    }
}

/// Extract a model from a scene and encode it.
pub fn export<S: SceneSource + ?Sized>(scene: &S, options: &ExportOptions) -> Result<Encoded> {
    encode(&extract(scene, options), options)
}

/// Persist encoded bytes.
pub fn write_file(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, bytes).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Export a scene straight to a file. Nothing is written if validation fails.
pub fn export_file<S: SceneSource + ?Sized>(
    scene: &S,
    path: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<ValidationReport> {
    let encoded = export(scene, options)?;
    write_file(path, &encoded.bytes)?;
    Ok(encoded.report)
}
