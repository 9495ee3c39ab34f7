//! Implementation of the `reqkit remove` command.

use anyhow::{bail, Result};
use reqkit_pkg::Requirement;
use tracing::info;

use crate::project::Project;

/// Remove every declaration of `name` from the project manifest.
///
/// Names match after normalization, so `scikit_learn` removes
/// `scikit-learn`.
pub fn remove_requirement(project: &Project, name: &str) -> Result<Requirement> {
    let mut manifest = project.read_manifest()?;

    let Some(removed) = manifest.remove(name) else {
        bail!(
            "Requirement `{name}` not found in {}",
            project.manifest_display()
        );
    };

    project.write_manifest(&manifest)?;
    info!(name = %removed.name, "removed requirement");
    println!(
        "Removed `{removed}` from {}",
        project.manifest_display()
    );
    Ok(removed)
}
