//! Manifest creation for `reqkit init`.

use anyhow::{bail, Context, Result};
use reqkit_pkg::{header_lines, Config, Manifest, CONFIG_FILE};
use std::fs;
use tracing::info;

use crate::project::Project;

/// Options for manifest creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    /// Overwrite an existing manifest.
    pub force: bool,
    /// Start the manifest with setup instructions for every platform.
    pub with_header: bool,
    /// Also write a default `reqkit.toml`.
    pub config: bool,
}

/// Build the initial manifest.
#[must_use]
pub fn initial_manifest(project: &Project, with_header: bool) -> Manifest {
    let mut manifest = Manifest::default();
    if with_header {
        for line in header_lines(&project.config.setup, &project.manifest_display()) {
            manifest.push_comment(&line);
        }
        manifest.push_blank();
    }
    manifest
}

/// Create the project manifest, and `reqkit.toml` when asked.
///
/// Both targets are checked before anything is written.
pub fn init_manifest(project: &Project, options: InitOptions) -> Result<()> {
    let config_path = project.root.join(CONFIG_FILE);
    if !options.force {
        if project.manifest.exists() {
            bail!(
                "Cannot initialize: `{}` already exists (use --force to overwrite)",
                project.manifest_display()
            );
        }
        if options.config && config_path.exists() {
            bail!("Cannot initialize: `{CONFIG_FILE}` already exists (use --force to overwrite)");
        }
    }

    // The written config must point at the manifest being created.
    let config_content = if options.config {
        let config = Config {
            manifest: project.manifest_display().replace('\\', "/"),
            ..project.config.clone()
        };
        Some(
            config
                .to_toml_string()
                .context("Failed to serialize configuration")?,
        )
    } else {
        None
    };

    if let Some(parent) = project.manifest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let manifest = initial_manifest(project, options.with_header);
    project.write_manifest(&manifest)?;
    info!(path = %project.manifest.display(), "created manifest");
    println!("Created {}", project.manifest_display());

    if let Some(content) = config_content {
        fs::write(&config_path, content).context("Failed to write reqkit.toml")?;
        println!("Created {CONFIG_FILE}");
    }

    Ok(())
}
