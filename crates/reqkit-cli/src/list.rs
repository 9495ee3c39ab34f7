//! Implementation of the `reqkit list` command.

use anyhow::{Context, Result};
use reqkit_pkg::{export, ExportFormat, Manifest, PackageName, Requirement};

use crate::project::Project;

/// Render the table printed by `reqkit list`.
#[must_use]
pub fn render_table(manifest: &Manifest) -> String {
    let rows: Vec<(String, String)> = manifest.requirements().map(row).collect();
    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    let mut out = String::new();
    for (name, constraint) in rows {
        out.push_str(&format!("{name:<width$}  {constraint}\n"));
    }
    out
}

fn row(requirement: &Requirement) -> (String, String) {
    let mut name = requirement.name.to_string();
    if !requirement.extras.is_empty() {
        let extras: Vec<&str> = requirement.extras.iter().map(PackageName::as_str).collect();
        name = format!("{name}[{}]", extras.join(","));
    }

    let constraint = if let Some(url) = &requirement.url {
        format!("@ {url}")
    } else if requirement.specifiers.is_empty() {
        String::from("(any version)")
    } else {
        requirement.specifiers.to_string()
    };
    (name, constraint)
}

/// Print the project manifest's requirements.
pub fn list_requirements(project: &Project, json: bool) -> Result<()> {
    let manifest = project.read_manifest()?;
    if json {
        let output = export(&manifest, ExportFormat::Json).context("Failed to render JSON")?;
        print!("{output}");
    } else if manifest.is_empty() {
        println!("No requirements declared in {}", project.manifest_display());
    } else {
        print!("{}", render_table(&manifest));
    }
    Ok(())
}
