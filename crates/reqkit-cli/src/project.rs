//! Locating the manifest and configuration a command works on.

use anyhow::{Context, Result};
use reqkit_pkg::{Config, Manifest};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The project directory, its configuration, and the selected manifest.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
    /// The manifest named by `--manifest`, or by the configuration.
    pub manifest: PathBuf,
}

impl Project {
    /// Load the project rooted at `root`.
    ///
    /// A relative `manifest_override` is resolved against `root`.
    pub fn load(root: &Path, manifest_override: Option<&Path>) -> Result<Self> {
        let config = Config::load(root).context("Failed to read reqkit.toml")?;
        let manifest = match manifest_override {
            Some(path) => root.join(path),
            None => root.join(&config.manifest),
        };
        debug!(root = %root.display(), manifest = %manifest.display(), "project loaded");
        Ok(Self {
            root: root.to_path_buf(),
            config,
            manifest,
        })
    }

    /// Load the project in the current directory.
    pub fn current(manifest_override: Option<&Path>) -> Result<Self> {
        let root = std::env::current_dir().context("Failed to get current directory")?;
        Self::load(&root, manifest_override)
    }

    /// The manifest path as it should appear in instructions: relative to
    /// the project directory when possible.
    #[must_use]
    pub fn manifest_display(&self) -> String {
        self.manifest
            .strip_prefix(&self.root)
            .unwrap_or(&self.manifest)
            .display()
            .to_string()
    }

    /// Read and validate the selected manifest.
    pub fn read_manifest(&self) -> Result<Manifest> {
        if !self.manifest.exists() {
            anyhow::bail!(
                "No {} found. Run `reqkit init` first.",
                self.manifest_display()
            );
        }
        Manifest::from_path(&self.manifest)
            .with_context(|| format!("Failed to read {}", self.manifest_display()))
    }

    /// Write the manifest back to the selected path.
    pub fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        manifest
            .write(&self.manifest)
            .with_context(|| format!("Failed to write {}", self.manifest_display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_manifest() {
        let dir = TempDir::new().unwrap();
        let project = Project::load(dir.path(), None).unwrap();
        assert_eq!(project.manifest, dir.path().join("requirements.txt"));
        assert_eq!(project.manifest_display(), "requirements.txt");
    }

    #[test]
    fn test_configured_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("reqkit.toml"),
            "manifest = \"requirements/base.txt\"\n",
        )
        .unwrap();
        let project = Project::load(dir.path(), None).unwrap();
        assert_eq!(project.manifest, dir.path().join("requirements/base.txt"));
    }

    #[test]
    fn test_override_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("reqkit.toml"),
            "manifest = \"requirements/base.txt\"\n",
        )
        .unwrap();
        let project = Project::load(dir.path(), Some(Path::new("dev.txt"))).unwrap();
        assert_eq!(project.manifest_display(), "dev.txt");
    }

    #[test]
    fn test_missing_manifest_suggests_init() {
        let dir = TempDir::new().unwrap();
        let project = Project::load(dir.path(), None).unwrap();
        let err = project.read_manifest().unwrap_err().to_string();
        assert!(err.contains("reqkit init"));
    }
}
