//! Export a manifest's requirements to structured formats.

use crate::manifest::Manifest;
use crate::requirement::PackageName;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when exporting.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to serialize TOML: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("unknown export format '{0}', expected one of: json, toml")]
    UnknownFormat(String),
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// A JSON array with one object per requirement.
    Json,
    /// A `[project]` table with a PEP 621 style `dependencies` array.
    Toml,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Toml => write!(f, "toml"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportedRequirement<'a> {
    name: &'a str,
    normalized: &'a str,
    extras: Vec<&'a str>,
    specifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pinned: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<&'a str>,
    line: usize,
}

#[derive(Debug, Serialize)]
struct PyProject {
    project: ProjectTable,
}

#[derive(Debug, Serialize)]
struct ProjectTable {
    dependencies: Vec<String>,
}

/// Serialize the manifest's requirements.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn export(manifest: &Manifest, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => {
            let entries: Vec<ExportedRequirement<'_>> = manifest
                .requirement_lines()
                .map(|(line, r)| ExportedRequirement {
                    name: r.name.as_str(),
                    normalized: r.name.normalized(),
                    extras: r.extras.iter().map(PackageName::as_str).collect(),
                    specifiers: r.specifiers.iter().map(ToString::to_string).collect(),
                    pinned: r.specifiers.pinned().map(ToString::to_string),
                    url: r.url.as_deref(),
                    marker: r.marker.as_deref(),
                    line,
                })
                .collect();
            let mut json = serde_json::to_string_pretty(&entries)?;
            json.push('\n');
            Ok(json)
        }
        ExportFormat::Toml => {
            let document = PyProject {
                project: ProjectTable {
                    dependencies: manifest.requirements().map(ToString::to_string).collect(),
                },
            };
            Ok(toml::to_string_pretty(&document)?)
        }
    }
}
