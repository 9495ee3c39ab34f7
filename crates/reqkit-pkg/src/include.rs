//! Manifests that reference other manifests.
//!
//! This module provides:
//! - Loading a manifest together with every `-r` and `-c` file it names
//! - Cycle detection across references
//! - Cross-file checks: repeated declarations and constraint conflicts

use crate::config::CheckConfig;
use crate::lint::{lint, Diagnostic, LintCode, Report, Severity};
use crate::manifest::{Manifest, ManifestError, ManifestOption};
use crate::requirement::Requirement;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur while loading a set of manifests.
#[derive(Error, Debug)]
pub enum IncludeError {
    /// A referenced file could not be read or parsed.
    #[error("{}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// Files reference each other in a loop.
    #[error("circular reference detected: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },
}

/// How a file entered the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// The root manifest or a file named with `-r`.
    Requirements,
    /// A file named with `-c`: its entries restrict versions but install
    /// nothing.
    Constraints,
}

/// One loaded file.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    /// Path as reached from the root (not canonicalized).
    pub path: PathBuf,
    pub role: FileRole,
    pub manifest: Manifest,
}

/// A root manifest and everything it references.
#[derive(Debug, Clone)]
pub struct ManifestSet {
    files: Vec<ManifestFile>,
}

/// A requirement together with where it was declared.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub path: &'a Path,
    pub line: usize,
    pub requirement: &'a Requirement,
}

struct Loader {
    files: Vec<ManifestFile>,
    loaded: HashSet<PathBuf>,
    stack: Vec<PathBuf>,
}

impl ManifestSet {
    /// Load a manifest and, recursively, every file it references.
    ///
    /// Duplicate declarations are not rejected here; [`ManifestSet::lint`]
    /// reports them.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read or parsed, or if the
    /// references form a cycle.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IncludeError> {
        let mut loader = Loader {
            files: Vec::new(),
            loaded: HashSet::new(),
            stack: Vec::new(),
        };
        loader.visit(path.as_ref(), FileRole::Requirements)?;
        debug!(files = loader.files.len(), "loaded manifest set");
        Ok(Self {
            files: loader.files,
        })
    }

    /// The root manifest.
    #[must_use]
    pub fn root(&self) -> &ManifestFile {
        &self.files[0]
    }

    /// All files, root first, then in reference order.
    #[must_use]
    pub fn files(&self) -> &[ManifestFile] {
        &self.files
    }

    /// Every requirement that would be installed, in file order.
    pub fn requirements(&self) -> impl Iterator<Item = Located<'_>> {
        self.located(FileRole::Requirements)
    }

    /// Every constraint entry.
    pub fn constraints(&self) -> impl Iterator<Item = Located<'_>> {
        self.located(FileRole::Constraints)
    }

    fn located(&self, role: FileRole) -> impl Iterator<Item = Located<'_>> {
        self.files
            .iter()
            .filter(move |f| f.role == role)
            .flat_map(|f| {
                f.manifest
                    .requirement_lines()
                    .map(move |(line, requirement)| Located {
                        path: &f.path,
                        line,
                        requirement,
                    })
            })
    }

    /// Lint every file, then check the files against each other.
    #[must_use]
    pub fn lint(&self, config: &CheckConfig) -> Report {
        let mut report = Report::new();

        let relaxed = CheckConfig {
            require_pins: false,
            allow_unpinned: Vec::new(),
        };
        for file in &self.files {
            let config = match file.role {
                FileRole::Requirements => config,
                FileRole::Constraints => &relaxed,
            };
            report.extend(lint(&file.manifest, config).with_path(&file.path));
        }

        self.check_repeated(&mut report);
        self.check_constraints(&mut report);

        report.sort();
        report
    }

    /// Same package declared in more than one requirements file.
    fn check_repeated(&self, report: &mut Report) {
        let mut first: HashMap<&str, Located<'_>> = HashMap::new();
        for located in self.requirements() {
            let name = located.requirement.name.normalized();
            let Some(earlier) = first.get(name).copied() else {
                first.insert(name, located);
                continue;
            };
            // Repeats inside one file are the single-file lint's job.
            if earlier.path == located.path {
                continue;
            }

            let combined = earlier
                .requirement
                .specifiers
                .intersect(&located.requirement.specifiers);
            let (severity, code, detail) = if combined.is_satisfiable() {
                (Severity::Warning, LintCode::DuplicateAcrossFiles, "also")
            } else {
                (Severity::Error, LintCode::Unsatisfiable, "incompatibly")
            };
            report.push(Diagnostic::at(
                located.path,
                located.line,
                severity,
                code,
                format!(
                    "'{}' is {detail} declared at {}:{} as '{}'",
                    located.requirement.name,
                    earlier.path.display(),
                    earlier.line,
                    earlier.requirement
                ),
            ));
        }
    }

    /// Requirements whose versions are all excluded by a constraint.
    fn check_constraints(&self, report: &mut Report) {
        let constraints: Vec<Located<'_>> = self.constraints().collect();
        if constraints.is_empty() {
            return;
        }

        for located in self.requirements() {
            let requirement = located.requirement;
            for constraint in constraints
                .iter()
                .filter(|c| c.requirement.name == requirement.name)
            {
                let combined = requirement
                    .specifiers
                    .intersect(&constraint.requirement.specifiers);
                if !combined.is_satisfiable() {
                    report.push(Diagnostic::at(
                        located.path,
                        located.line,
                        Severity::Error,
                        LintCode::ConstraintConflict,
                        format!(
                            "'{}' conflicts with constraint '{}' at {}:{}",
                            requirement,
                            constraint.requirement,
                            constraint.path.display(),
                            constraint.line
                        ),
                    ));
                }
            }
        }
    }
}

impl Loader {
    fn visit(&mut self, path: &Path, role: FileRole) -> Result<(), IncludeError> {
        let wrap = |source: ManifestError| IncludeError::Manifest {
            path: path.to_path_buf(),
            source,
        };

        let canonical = path
            .canonicalize()
            .map_err(|e| wrap(ManifestError::Io(e)))?;

        if let Some(start) = self.stack.iter().position(|p| *p == canonical) {
            let mut chain: Vec<String> = self.stack[start..]
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(canonical.display().to_string());
            return Err(IncludeError::Cycle { chain });
        }

        if !self.loaded.insert(canonical.clone()) {
            trace!(path = %path.display(), "already loaded");
            return Ok(());
        }

        debug!(path = %path.display(), ?role, "loading manifest");
        let content = std::fs::read_to_string(path).map_err(|e| wrap(ManifestError::Io(e)))?;
        let manifest = Manifest::parse_unvalidated(&content).map_err(wrap)?;

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let references: Vec<(PathBuf, FileRole)> = manifest
            .options()
            .filter_map(|(_, option)| match option {
                ManifestOption::Requirements(file) => Some((base.join(file), role)),
                ManifestOption::Constraints(file) => {
                    Some((base.join(file), FileRole::Constraints))
                }
                _ => None,
            })
            .collect();

        self.files.push(ManifestFile {
            path: path.to_path_buf(),
            role,
            manifest,
        });

        self.stack.push(canonical);
        for (reference, role) in references {
            self.visit(&reference, role)?;
        }
        self.stack.pop();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_follows_references() {
        let dir = TempDir::new().unwrap();
        write(&dir, "base.txt", "numpy >= 1.24\npandas[performance] >= 2\n");
        write(&dir, "constraints.txt", "numpy < 2\n");
        let root = write(
            &dir,
            "requirements-dev.txt",
            "-r base.txt\n-c constraints.txt\ntqdm\n",
        );

        let set = ManifestSet::load(&root).unwrap();
        assert_eq!(set.files().len(), 3);
        assert_eq!(set.root().path, root);
        assert_eq!(set.files()[1].role, FileRole::Requirements);
        assert_eq!(set.files()[2].role, FileRole::Constraints);

        let names: Vec<&str> = set
            .requirements()
            .map(|l| l.requirement.name.as_str())
            .collect();
        assert_eq!(names, ["tqdm", "numpy", "pandas"]);
        assert_eq!(set.constraints().count(), 1);
        assert!(set.lint(&CheckConfig::default()).is_empty());
    }

    #[test]
    fn references_resolve_relative_to_the_referencing_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "requirements/base.txt", "scipy\n");
        write(&dir, "requirements/dev.txt", "-r base.txt\nnltk\n");
        let root = write(&dir, "requirements.txt", "-r requirements/dev.txt\n");

        let set = ManifestSet::load(root).unwrap();
        assert_eq!(set.requirements().count(), 2);
    }

    #[test]
    fn diamond_references_load_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "common.txt", "regex\n");
        write(&dir, "a.txt", "-r common.txt\n");
        write(&dir, "b.txt", "-r common.txt\n");
        let root = write(&dir, "root.txt", "-r a.txt\n-r b.txt\n");

        let set = ManifestSet::load(root).unwrap();
        assert_eq!(set.files().len(), 4);
        assert_eq!(set.requirements().count(), 1);
    }

    #[test]
    fn cycle_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.txt", "-r b.txt\n");
        write(&dir, "b.txt", "-r a.txt\n");

        let err = ManifestSet::load(dir.path().join("a.txt")).unwrap_err();
        match err {
            IncludeError::Cycle { chain } => {
                assert_eq!(chain.len(), 3);
                assert!(chain[0].ends_with("a.txt"));
                assert!(chain[1].ends_with("b.txt"));
                assert!(chain[2].ends_with("a.txt"));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn missing_reference_names_the_file() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "requirements.txt", "-r missing.txt\n");
        let err = ManifestSet::load(root).unwrap_err();
        assert!(matches!(err, IncludeError::Manifest { ref path, .. } if path.ends_with("missing.txt")));
    }

    #[test]
    fn parse_error_in_reference_names_the_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "base.txt", "numpy\nnumpy =< 2\n");
        let root = write(&dir, "requirements.txt", "-r base.txt\n");
        let err = ManifestSet::load(root).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("base.txt"));
        assert!(message.contains("line 2"));
    }

    #[test]
    fn repeated_across_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "base.txt", "numpy >= 1.24\nscipy >= 1.10\n");
        let root = write(&dir, "dev.txt", "-r base.txt\nnumpy\nscipy < 1.9\n");

        let report = ManifestSet::load(root).unwrap().lint(&CheckConfig::default());
        assert_eq!(report.len(), 2);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.error_count(), 1);
        assert!(report.contains(LintCode::DuplicateAcrossFiles));
        assert!(report.contains(LintCode::Unsatisfiable));
    }

    #[test]
    fn constraint_conflict() {
        let dir = TempDir::new().unwrap();
        write(&dir, "constraints.txt", "pymongo < 4\n");
        let root = write(
            &dir,
            "requirements.txt",
            "-c constraints.txt\npymongo==4.3.3\n",
        );

        let report = ManifestSet::load(root).unwrap().lint(&CheckConfig::default());
        assert_eq!(report.len(), 1);
        let diagnostic = report.iter().next().unwrap();
        assert_eq!(diagnostic.code, LintCode::ConstraintConflict);
        assert_eq!(diagnostic.line, 2);
        assert!(diagnostic.path.as_ref().unwrap().ends_with("requirements.txt"));
    }

    #[test]
    fn constraint_files_are_not_held_to_pinning() {
        let dir = TempDir::new().unwrap();
        write(&dir, "constraints.txt", "numpy\n");
        let root = write(&dir, "requirements.txt", "-c constraints.txt\nnumpy>=1\n");

        let config = CheckConfig {
            require_pins: true,
            allow_unpinned: Vec::new(),
        };
        let report = ManifestSet::load(root).unwrap().lint(&config);
        assert!(report.is_empty(), "{report:?}");
    }
}
