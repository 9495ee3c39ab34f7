//! Implementation of the `reqkit export` command.

use anyhow::{Context, Result};
use reqkit_pkg::{export, ExportFormat};
use std::path::PathBuf;

use crate::project::Project;

/// Options for exporting the manifest.
#[derive(Debug)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Write to this file instead of standard output.
    pub output: Option<PathBuf>,
}

/// Export the project manifest.
pub fn export_manifest(project: &Project, options: &ExportOptions) -> Result<()> {
    let manifest = project.read_manifest()?;
    let rendered = export(&manifest, options.format)
        .with_context(|| format!("Failed to export as {}", options.format))?;

    match &options.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_export_to_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("requirements.txt"),
            "pymongo==4.3.3\npandas[performance] >= 2\n",
        )
        .unwrap();
        let project = Project::load(dir.path(), None).unwrap();
        let output = dir.path().join("deps.toml");

        let options = ExportOptions {
            format: ExportFormat::Toml,
            output: Some(output.clone()),
        };
        export_manifest(&project, &options).unwrap();

        let content = fs::read_to_string(output).unwrap();
        assert!(content.contains("[project]"));
        assert!(content.contains("pandas[performance]>=2"));
    }

    #[test]
    fn test_export_rejects_invalid_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "numpy\nnumpy\n").unwrap();
        let project = Project::load(dir.path(), None).unwrap();
        let options = ExportOptions {
            format: ExportFormat::Json,
            output: None,
        };
        assert!(export_manifest(&project, &options).is_err());
    }
}
