//! Request path resolution
//!
//! All traversal and symlink-escape defences live here: a [`ResolvedTarget`] never
//! points outside the canonical root directory.

use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::error::ServeError;
use crate::logger;

/// Outcome of resolving one request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Directory(PathBuf),
    File(PathBuf),
    NotFound,
    Forbidden,
}

impl ResolvedTarget {
    fn from_io(err: io::Error) -> Self {
        match ServeError::from_io(err) {
            ServeError::NotFound => Self::NotFound,
            _ => Self::Forbidden,
        }
    }
}

/// Maps decoded request paths onto the filesystem below a fixed root
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Canonicalize `root` once so every comparison is against a symlink-free path
    pub fn new(root: &Path) -> io::Result<Self> {
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    /// Resolve a URL-decoded, slash-separated request path
    pub async fn resolve(&self, request_path: &str) -> ResolvedTarget {
        let Some(segments) = normalize(request_path) else {
            logger::log_debug(&format!("Rejected request path: {request_path:?}"));
            return ResolvedTarget::NotFound;
        };

        let candidate = segments
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment));

        let canonical = match fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(e) => return ResolvedTarget::from_io(e),
        };

        if !canonical.starts_with(&self.root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {request_path} -> {}",
                canonical.display()
            ));
            return ResolvedTarget::NotFound;
        }

        match fs::metadata(&canonical).await {
            Ok(meta) if meta.is_dir() => ResolvedTarget::Directory(canonical),
            Ok(_) => ResolvedTarget::File(canonical),
            Err(e) => ResolvedTarget::from_io(e),
        }
    }
}

/// Split a request path into segments that are each exactly one normal component.
///
/// Empty and `.` segments are dropped. `None` if any segment is `..` or would be read
/// by the platform as something other than a single file name.
pub fn normalize(request_path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();

    for segment in request_path.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment.contains('\0') {
            return None;
        }

        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => segments.push(segment),
            _ => return None,
        }
    }

    Some(segments)
}
