//! MOD3 decoding.
//!
//! [`decode`] turns a fully-buffered file into a [`Model`]; [`decode_file`]
//! memory-maps a file first; [`import`] additionally hands the result to a
//! [`SceneBuilder`]. Malformed input aborts the whole call and no partial
//! model is returned.
//!
//! ## Example
//!
//! ```ignore
//! use mod3::import::{decode_file, ImportOptions};
//!
//! let model = decode_file("pl000.mod3", &ImportOptions::default())?;
//! println!("{} parts, {} bones", model.mesh_parts.len(), model.num_bones());
//! ```

mod decoder;
mod options;
mod resolve;

pub use options::ImportOptions;
pub use resolve::{FsLocator, NullLocator, ResourceLocator, TEXTURE_EXTENSION};

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::model::Model;
use crate::scene::SceneBuilder;
use crate::util::{Error, Result};
use decoder::Decoder;

/// Decode a MOD3 buffer, resolving material names under the options' texture root.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn decode(bytes: &[u8], options: &ImportOptions) -> Result<Model> {
    let locator = options.texture_root().map(FsLocator::new);
    decode_with(bytes, options, locator.as_ref().map(|l| l as &dyn ResourceLocator))
}

/// Decode with an explicit material locator; `None` skips resolution.
pub fn decode_with(
    bytes: &[u8],
    options: &ImportOptions,
    locator: Option<&dyn ResourceLocator>,
) -> Result<Model> {
    Decoder::new(bytes, options)?.decode(locator)
}

/// Memory-map and decode a file.
///
/// An empty texture root resolves material names next to the file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn decode_file(path: impl AsRef<Path>, options: &ImportOptions) -> Result<Model> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    let size = file.metadata()?.len();
    if size == 0 {
        return decode_with(&[], options, None);
    }
    // Safety: the map is read-only and dropped before returning
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
    debug!("mapped {} bytes", size);

    let root = options.texture_root().map(|root| {
        if root.as_os_str().is_empty() {
            path.parent().unwrap_or(Path::new("")).to_path_buf()
        } else {
            root.to_path_buf()
        }
    });
    let locator = root.map(FsLocator::new);
    decode_with(&mmap, options, locator.as_ref().map(|l| l as &dyn ResourceLocator))
}

/// Decode and materialize the model through a scene builder.
///
/// The scene is only touched once decoding has fully succeeded.
pub fn import<B: SceneBuilder + ?Sized>(
    bytes: &[u8],
    options: &ImportOptions,
    scene: &mut B,
) -> Result<Model> {
    let model = decode(bytes, options)?;
    populate(&model, options, scene)?;
    Ok(model)
}

/// Hand every entity of a decoded model to a scene builder.
pub fn populate<B: SceneBuilder + ?Sized>(
    model: &Model,
    options: &ImportOptions,
    scene: &mut B,
) -> Result<()> {
    if options.clear {
        scene.clear()?;
    }
    if options.max_clip {
        scene.maximize_clipping()?;
    }
    if let Some(header) = &model.header {
        scene.set_header(header)?;
    }
    if let (Some(mode), Some(skeleton)) = (options.skeleton, &model.skeleton) {
        scene.create_armature(skeleton, mode)?;
    }
    for (index, material) in model.materials.iter().enumerate() {
        scene.create_material(index, material)?;
    }
    for (index, part) in model.mesh_parts.iter().enumerate() {
        scene.create_mesh(index, part)?;
    }
    for (index, bbox) in model.bounding_boxes.iter().enumerate() {
        scene.create_bounding_volume(index, bbox)?;
    }
    for function in &model.group_functions {
        scene.create_group_function(function)?;
    }
    if !model.trailing.is_empty() {
        scene.set_trailing(&model.trailing)?;
    }
    Ok(())
}
