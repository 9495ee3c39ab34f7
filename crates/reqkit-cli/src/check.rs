//! Implementation of the `reqkit check` command.

use anyhow::{Context, Result};
use reqkit_pkg::{discover_manifests, ManifestSet, Report};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::project::Project;

/// Options for checking manifests.
#[derive(Debug, Default)]
pub struct CheckOptions {
    /// Files to check. Empty means the project manifest.
    pub files: Vec<PathBuf>,
    /// Check every manifest found in the project directory.
    pub all: bool,
}

/// A file that could not be loaded at all.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of a check run.
#[derive(Debug, Default)]
pub struct CheckResult {
    /// Number of files read, including referenced ones.
    pub files_checked: usize,
    pub report: Report,
    pub failures: Vec<LoadFailure>,
}

impl CheckResult {
    /// Returns true if nothing failed to load and no errors were reported.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty() && !self.report.has_errors()
    }

    /// Total error count, load failures included.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.failures.len() + self.report.error_count()
    }

    /// Print every diagnostic followed by a summary line.
    pub fn print_summary(&self) {
        for failure in &self.failures {
            println!("{}: error: {}", failure.path.display(), failure.message);
        }
        for diagnostic in self.report.iter() {
            println!("{diagnostic}");
        }

        let warnings = self.report.warning_count();
        println!(
            "Checked {} file(s): {} error(s), {} warning(s)",
            self.files_checked,
            self.error_count(),
            warnings
        );
    }
}

/// Check manifests in a project.
pub fn check_manifests(project: &Project, options: &CheckOptions) -> Result<CheckResult> {
    let targets: Vec<PathBuf> = if !options.files.is_empty() {
        options
            .files
            .iter()
            .map(|f| project.root.join(f))
            .collect()
    } else if options.all {
        let found = discover_manifests(&project.root).context("Failed to discover manifests")?;
        if found.is_empty() {
            anyhow::bail!("No requirements files found in {}", project.root.display());
        }
        found
    } else {
        vec![project.manifest.clone()]
    };

    let mut result = CheckResult::default();
    let mut sets = Vec::new();
    for target in targets {
        match ManifestSet::load(&target) {
            Ok(set) => sets.push((target, set)),
            Err(e) => result.failures.push(LoadFailure {
                path: target,
                message: e.to_string(),
            }),
        }
    }

    // A target that another target pulls in through `-r` or `-c` is linted
    // as part of that set only.
    let referenced: HashSet<PathBuf> = sets
        .iter()
        .flat_map(|(_, set)| set.files().iter().skip(1))
        .map(|file| canonical(&file.path))
        .collect();

    let mut roots: HashSet<PathBuf> = HashSet::new();
    let mut checked: HashSet<PathBuf> = HashSet::new();
    for (target, set) in &sets {
        let root = canonical(target);
        if referenced.contains(&root) || !roots.insert(root) {
            debug!(path = %target.display(), "already checked through another manifest");
            continue;
        }

        info!(path = %target.display(), files = set.files().len(), "checking manifest");
        checked.extend(set.files().iter().map(|file| canonical(&file.path)));
        result.report.extend(set.lint(&project.config.check));
    }

    result.files_checked = checked.len() + result.failures.len();
    // Files shared by two roots are linted with each of them.
    result.report.dedup();
    Ok(result)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqkit_pkg::LintCode;
    use std::fs;
    use tempfile::TempDir;

    fn project_with(files: &[(&str, &str)]) -> (TempDir, Project) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        let project = Project::load(dir.path(), None).unwrap();
        (dir, project)
    }

    #[test]
    fn test_clean_manifest() {
        let (_dir, project) = project_with(&[(
            "requirements.txt",
            "numpy>=1.24\npymongo==4.3.3\n",
        )]);
        let result = check_manifests(&project, &CheckOptions::default()).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.files_checked, 1);
        assert!(result.report.is_empty());
    }

    #[test]
    fn test_duplicate_is_an_error() {
        let (_dir, project) = project_with(&[(
            "requirements.txt",
            "numpy>=1.24\nNumPy<2\n",
        )]);
        let result = check_manifests(&project, &CheckOptions::default()).unwrap();
        assert!(!result.is_ok());
        assert!(result.report.contains(LintCode::Duplicate));
        let line = result.report.iter().next().unwrap().to_string();
        assert!(line.contains("requirements.txt:2: error[duplicate]"), "{line}");
    }

    #[test]
    fn test_parse_failure_is_reported() {
        let (_dir, project) = project_with(&[("requirements.txt", "numpy >== 1\n")]);
        let result = check_manifests(&project, &CheckOptions::default()).unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn test_missing_manifest_is_reported() {
        let (_dir, project) = project_with(&[]);
        let result = check_manifests(&project, &CheckOptions::default()).unwrap();
        assert_eq!(result.failures.len(), 1);
    }

    #[test]
    fn test_require_pins_from_config() {
        let (_dir, project) = project_with(&[
            ("reqkit.toml", "[check]\nrequire-pins = true\n"),
            ("requirements.txt", "numpy\n"),
        ]);
        let result = check_manifests(&project, &CheckOptions::default()).unwrap();
        assert!(result.report.contains(LintCode::Unpinned));
        assert!(!result.is_ok());
    }

    #[test]
    fn test_all_skips_files_reached_through_references() {
        let (_dir, project) = project_with(&[
            ("requirements.txt", "numpy>=1.24\n"),
            ("requirements-dev.txt", "-r requirements.txt\npytest>=7\n"),
        ]);
        let options = CheckOptions {
            files: Vec::new(),
            all: true,
        };
        let result = check_manifests(&project, &options).unwrap();
        assert!(result.is_ok());
        // requirements-dev.txt sorts first and pulls in requirements.txt.
        assert_eq!(result.files_checked, 2);
    }

    #[test]
    fn test_all_checks_directory_manifests_once() {
        let (_dir, project) = project_with(&[
            ("requirements/base.txt", "numpy\nnumpy\n"),
            ("requirements.txt", "-r requirements/base.txt\n"),
        ]);
        let options = CheckOptions {
            files: Vec::new(),
            all: true,
        };
        let result = check_manifests(&project, &options).unwrap();
        assert_eq!(result.report.len(), 1);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.files_checked, 2);
    }

    #[test]
    fn test_shared_reference_is_reported_once() {
        let (_dir, project) = project_with(&[
            ("requirements/base.txt", "numpy\nnumpy\n"),
            ("requirements.txt", "-r requirements/base.txt\n"),
            ("requirements-dev.txt", "-r requirements/base.txt\npytest>=7\n"),
        ]);
        let options = CheckOptions {
            files: Vec::new(),
            all: true,
        };
        let result = check_manifests(&project, &options).unwrap();
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.files_checked, 3);
    }

    #[test]
    fn test_all_with_no_manifests() {
        let (_dir, project) = project_with(&[]);
        let options = CheckOptions {
            files: Vec::new(),
            all: true,
        };
        assert!(check_manifests(&project, &options).is_err());
    }

    #[test]
    fn test_explicit_files() {
        let (_dir, project) = project_with(&[
            ("requirements.txt", "numpy\nnumpy\n"),
            ("other.txt", "scipy>=1.10\n"),
        ]);
        let options = CheckOptions {
            files: vec![Path::new("other.txt").to_path_buf()],
            all: false,
        };
        let result = check_manifests(&project, &options).unwrap();
        assert!(result.is_ok());
    }
}
