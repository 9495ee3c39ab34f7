//! A single dependency declaration.
//!
//! ```text
//! name [ "[" extra, ... "]" ] [ specifiers | "@" url ] [ ";" marker ]
//! ```
//!
//! `pymongo==4.3.3` and `pandas[performance] >= 2` are both requirements.

use crate::specifier::{SpecifierError, VersionSpecifiers};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur when parsing a requirement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    #[error("missing package name in '{0}'")]
    MissingName(String),

    #[error("invalid package name '{0}': {1}")]
    InvalidName(String, &'static str),

    #[error("invalid extra '{0}'")]
    InvalidExtra(String),

    #[error("unclosed '[' in extras of '{0}'")]
    UnclosedExtras(String),

    #[error("unclosed '(' around specifiers of '{0}'")]
    UnclosedParen(String),

    #[error("missing URL after '@' in '{0}'")]
    MissingUrl(String),

    #[error("empty environment marker in '{0}'")]
    EmptyMarker(String),

    #[error("invalid version specifier for '{name}': {source}")]
    Specifier {
        name: String,
        #[source]
        source: SpecifierError,
    },
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^[a-z0-9](?:[a-z0-9._-]*[a-z0-9])?$").expect("package name pattern")
    })
}

fn separator_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-_.]+").expect("separator pattern"))
}

/// Normalize a package name: lowercase, with each run of `-`, `_` and `.`
/// collapsed into a single `-`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    separator_runs()
        .replace_all(&name.to_ascii_lowercase(), "-")
        .into_owned()
}

/// A package name as written, compared by its normalized form.
#[derive(Debug, Clone)]
pub struct PackageName {
    written: String,
    normalized: String,
}

impl PackageName {
    /// Validate and wrap a package name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains characters other
    /// than ASCII letters, digits, `-`, `_` and `.`, or does not start and
    /// end with a letter or digit.
    pub fn new(name: &str) -> Result<Self, RequirementError> {
        if name.is_empty() {
            return Err(RequirementError::InvalidName(
                name.to_string(),
                "name cannot be empty",
            ));
        }

        if !name_pattern().is_match(name) {
            let reason = if name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                "name must start and end with a letter or digit"
            } else {
                "name can only contain letters, numbers, '-', '_' and '.'"
            };
            return Err(RequirementError::InvalidName(name.to_string(), reason));
        }

        Ok(Self {
            written: name.to_string(),
            normalized: normalize_name(name),
        })
    }

    /// The name as written in the manifest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.written
    }

    /// The normalized name used for comparisons.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Returns true if `other` names the same package.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.normalized == normalize_name(other)
    }
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.written)
    }
}

/// A parsed dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// The package name.
    pub name: PackageName,
    /// Optional features requested in brackets, sorted and deduplicated.
    pub extras: Vec<PackageName>,
    /// Version constraints (empty when none are given).
    pub specifiers: VersionSpecifiers,
    /// Direct reference given as `name @ url`.
    pub url: Option<String>,
    /// Environment marker after `;`, kept verbatim.
    pub marker: Option<String>,
}

impl Requirement {
    /// Parse a requirement declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if the name, extras, specifiers or marker are
    /// malformed.
    pub fn parse(text: &str) -> Result<Self, RequirementError> {
        let line = text.trim();

        let name_len = line
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(line.len());
        if name_len == 0 {
            return Err(RequirementError::MissingName(line.to_string()));
        }
        let name = PackageName::new(&line[..name_len])?;
        let mut rest = line[name_len..].trim_start();

        let mut extras = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let close = after
                .find(']')
                .ok_or_else(|| RequirementError::UnclosedExtras(line.to_string()))?;
            for extra in after[..close].split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let extra = PackageName::new(extra)
                    .map_err(|_| RequirementError::InvalidExtra(extra.to_string()))?;
                extras.push(extra);
            }
            extras.sort();
            extras.dedup();
            rest = after[close + 1..].trim_start();
        }

        let (body, marker) = split_marker(rest, line)?;

        let mut url = None;
        let mut specifiers = VersionSpecifiers::default();
        if let Some(reference) = body.strip_prefix('@') {
            let reference = reference.trim();
            if reference.is_empty() {
                return Err(RequirementError::MissingUrl(line.to_string()));
            }
            url = Some(reference.to_string());
        } else {
            let body = match body.strip_prefix('(') {
                Some(inner) => inner
                    .trim_end()
                    .strip_suffix(')')
                    .ok_or_else(|| RequirementError::UnclosedParen(line.to_string()))?,
                None => body,
            };
            specifiers =
                VersionSpecifiers::parse(body).map_err(|source| RequirementError::Specifier {
                    name: name.to_string(),
                    source,
                })?;
        }

        Ok(Self {
            name,
            extras,
            specifiers,
            url,
            marker,
        })
    }

    /// Returns true if the declaration constrains the version in any way.
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        !self.specifiers.is_empty() || self.url.is_some()
    }
}

/// Split off the environment marker.
///
/// A URL may itself contain `;`, so after `@` the marker separator must be
/// preceded by whitespace.
fn split_marker<'a>(
    rest: &'a str,
    line: &str,
) -> Result<(&'a str, Option<String>), RequirementError> {
    let position = if rest.starts_with('@') {
        rest.find(" ;").or_else(|| rest.find("\t;")).map(|i| i + 1)
    } else {
        rest.find(';')
    };

    match position {
        Some(i) => {
            let marker = rest[i + 1..].trim();
            if marker.is_empty() {
                return Err(RequirementError::EmptyMarker(line.to_string()));
            }
            Ok((rest[..i].trim(), Some(marker.to_string())))
        }
        None => Ok((rest.trim(), None)),
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(PackageName::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {url}")?;
        } else {
            write!(f, "{}", self.specifiers)?;
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
