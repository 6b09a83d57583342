//! Path confinement for operation arguments.
//!
//! Every path-valued argument the model produces goes through [`Sandbox::resolve`]
//! before any handler touches the filesystem. Resolution is purely lexical:
//! leading separators are stripped, `.` and `..` segments are folded without
//! consulting the filesystem, and the result must still start with the data
//! root, compared component by component. Accepted paths are re-rooted onto
//! the root as configured, so the same check covers a relative production
//! root and an absolute fixture directory.

use std::fmt;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SandboxError {
    #[error("empty path argument")]
    Empty,
    #[error("path `{0}` escapes the data root")]
    Escape(String),
}

/// A path that passed confinement.
///
/// Only [`Sandbox::resolve`] can mint one; handlers accept paths exclusively
/// in this form, so an unchecked string cannot reach an I/O call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxedPath(PathBuf);

impl SandboxedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for SandboxedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SandboxedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

pub struct Sandbox {
    /// Root as configured, used to rebuild accepted paths
    root: PathBuf,
    /// Normalized form of the root, used for the prefix check
    root_components: Vec<String>,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root_components =
            normalize_components(&root.to_string_lossy()).unwrap_or_default();
        Self {
            root,
            root_components,
        }
    }

    /// Resolves a raw path string into a confined path.
    ///
    /// Accepts the argument whether the model spells it absolute
    /// (`/data/x.txt`) or relative (`data/x.txt`); both forms land on the
    /// same file under the root. Re-resolving an accepted path yields the
    /// same path again.
    pub fn resolve(&self, raw: &str) -> Result<SandboxedPath, SandboxError> {
        if raw.trim().is_empty() {
            return Err(SandboxError::Empty);
        }
        let components = normalize_components(raw)
            .ok_or_else(|| SandboxError::Escape(raw.to_string()))?;
        if components.len() < self.root_components.len()
            || components[..self.root_components.len()] != self.root_components[..]
        {
            return Err(SandboxError::Escape(raw.to_string()));
        }
        let mut path = self.root.clone();
        for component in &components[self.root_components.len()..] {
            path.push(component);
        }
        Ok(SandboxedPath(path))
    }
}

/// Lexical normalization: strips leading separators, drops `.`, folds `..`
/// into the preceding component. `None` when `..` climbs past the first
/// component.
fn normalize_components(raw: &str) -> Option<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for component in Path::new(raw.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => out.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}
