//! Requirements manifest toolkit.
//!
//! This crate provides:
//! - Parsing of `requirements.txt` manifests into typed requirements
//! - Version and specifier semantics (ordering, matching, satisfiability)
//! - Validation: unique names, well-formed comparators and versions
//! - Multi-file manifests linked with `-r` and `-c`
//! - Editing that preserves comments and layout
//! - Virtual environment setup instructions
//! - JSON and TOML export

mod config;
mod export;
mod include;
mod layout;
mod lint;
mod manifest;
mod requirement;
mod setup;
mod specifier;
mod version;

pub use config::{CheckConfig, Config, ConfigError, SetupConfig};
pub use export::{export, ExportError, ExportFormat};
pub use include::{FileRole, IncludeError, Located, ManifestFile, ManifestSet};
pub use layout::{
    discover_manifests, DiscoverError, CONFIG_FILE, MANIFEST_DIR, MANIFEST_FILE,
    MANIFEST_PATTERNS,
};
pub use lint::{lint, Diagnostic, LintCode, Report, Severity};
pub use manifest::{
    Duplicate, Line, LineKind, Manifest, ManifestError, ManifestOption, Upsert,
};
pub use requirement::{normalize_name, PackageName, Requirement, RequirementError};
pub use setup::{header_lines, Platform, SetupPlan, SetupStep, StepKind, UnknownPlatform};
pub use specifier::{Operator, SpecifierError, VersionSpecifier, VersionSpecifiers};
pub use version::{PreRelease, Version, VersionError};
