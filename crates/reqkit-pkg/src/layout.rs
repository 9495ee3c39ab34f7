//! Conventional file names and manifest discovery.
//!
//! ```text
//! project/
//! ├── reqkit.toml               # Optional configuration
//! ├── requirements.txt          # Main manifest
//! ├── requirements-dev.txt      # Further manifests, usually `-r requirements.txt`
//! └── requirements/             # Or a directory of manifests
//!     ├── base.txt
//!     └── test.txt
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// The default manifest filename.
pub const MANIFEST_FILE: &str = "requirements.txt";

/// The configuration filename.
pub const CONFIG_FILE: &str = "reqkit.toml";

/// Directory that may hold several manifests.
pub const MANIFEST_DIR: &str = "requirements";

/// Glob patterns, relative to a project directory, that name manifests.
pub const MANIFEST_PATTERNS: [&str; 2] = ["requirements*.txt", "requirements/*.txt"];

/// Errors that can occur while discovering manifests.
#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("project directory not found: {0}")]
    NotFound(PathBuf),
}

/// Find every manifest in a project directory, sorted by path (component
/// order, so `requirements/` entries come before `requirements-dev.txt`).
///
/// # Errors
///
/// Returns an error if the directory does not exist or cannot be read.
pub fn discover_manifests(root: impl AsRef<Path>) -> Result<Vec<PathBuf>, DiscoverError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(DiscoverError::NotFound(root.to_path_buf()));
    }

    let mut found = Vec::new();
    for pattern in MANIFEST_PATTERNS {
        let full_pattern = root.join(pattern);
        let pattern_str = glob::Pattern::escape(&root.to_string_lossy()) + "/" + pattern;
        debug!(pattern = %full_pattern.display(), "discovering manifests");

        for entry in glob::glob(&pattern_str)? {
            let path = entry.map_err(|e| DiscoverError::Io(e.into_error()))?;
            if path.is_file() && !found.contains(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn discover_top_level_and_directory_manifests() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("requirements.txt"), "numpy\n").unwrap();
        fs::write(root.join("requirements-dev.txt"), "-r requirements.txt\n").unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        fs::create_dir(root.join(MANIFEST_DIR)).unwrap();
        fs::write(root.join(MANIFEST_DIR).join("test.txt"), "tqdm\n").unwrap();

        let found = discover_manifests(root).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            names,
            ["requirements/test.txt", "requirements-dev.txt", "requirements.txt"]
        );
    }

    #[test]
    fn discover_in_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = discover_manifests(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, DiscoverError::NotFound(_)));
    }

    #[test]
    fn discover_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(discover_manifests(dir.path()).unwrap().is_empty());
    }
}
