//! Implementation of the `reqkit add` command.

use anyhow::{Context, Result};
use reqkit_pkg::{Requirement, Upsert};
use tracing::info;

use crate::project::Project;

/// Insert or replace a declaration in the project manifest.
///
/// The requirement is parsed before the manifest is touched, so an invalid
/// argument leaves the file unchanged.
pub fn add_requirement(project: &Project, requirement: &str) -> Result<Upsert> {
    let requirement = Requirement::parse(requirement)
        .with_context(|| format!("Invalid requirement `{requirement}`"))?;

    let mut manifest = project.read_manifest()?;
    let name = requirement.name.to_string();
    let rendered = requirement.to_string();
    let outcome = manifest.upsert(requirement);
    project.write_manifest(&manifest)?;

    match &outcome {
        Upsert::Added => {
            info!(%name, "added requirement");
            println!("Added `{rendered}` to {}", project.manifest_display());
        }
        Upsert::Replaced { previous } => {
            info!(%name, %previous, "replaced requirement");
            println!(
                "Updated `{name}` in {}: `{previous}` -> `{rendered}`",
                project.manifest_display()
            );
        }
    }

    Ok(outcome)
}
