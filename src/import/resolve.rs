//! Material name resolution against a texture root.

use std::path::{Path, PathBuf};

/// Extension tried when a name does not resolve as given.
pub const TEXTURE_EXTENSION: &str = "tex";

/// Maps opaque material names to resources.
pub trait ResourceLocator {
    /// Where `name` lives, or `None` if it cannot be found.
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Looks material names up under a directory.
///
/// Names may use either path separator. `root/name` is tried first, then
/// `root/name.tex`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsLocator {
    root: PathBuf,
}

impl FsLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidate(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        // Names never leave the root
        for component in name
            .split(['\\', '/'])
            .filter(|c| !matches!(*c, "" | "." | ".."))
        {
            path.push(component);
        }
        path
    }
}

impl ResourceLocator for FsLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let exact = self.candidate(name);
        if exact.is_file() {
            return Some(exact);
        }
        let with_ext = exact.with_extension(TEXTURE_EXTENSION);
        with_ext.is_file().then_some(with_ext)
    }
}

/// Resolves nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLocator;

impl ResourceLocator for NullLocator {
    fn locate(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}
