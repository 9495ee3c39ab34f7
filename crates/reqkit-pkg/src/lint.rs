//! Structural checks over a parsed manifest.
//!
//! Parsing already guarantees that every line is a well-formed declaration
//! or option. Linting reports the problems that are only visible across
//! lines or that depend on configuration.

use crate::config::CheckConfig;
use crate::manifest::{Manifest, ManifestOption};
use std::fmt;
use std::path::{Path, PathBuf};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Identifies the check that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LintCode {
    /// A package is declared twice in one file.
    Duplicate,
    /// A package is declared in two files of the same set.
    DuplicateAcrossFiles,
    /// No version satisfies a specifier set.
    Unsatisfiable,
    /// A constraint file excludes every version a requirement allows.
    ConstraintConflict,
    /// A requirement has no version constraint while pins are required.
    Unpinned,
    /// An exact pin is combined with other specifiers.
    ExactPinWithRange,
    /// A package index is reached over plain HTTP.
    InsecureIndex,
}

impl LintCode {
    /// Returns the code as shown in output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::DuplicateAcrossFiles => "duplicate-across-files",
            Self::Unsatisfiable => "unsatisfiable",
            Self::ConstraintConflict => "constraint-conflict",
            Self::Unpinned => "unpinned",
            Self::ExactPinWithRange => "exact-pin-with-range",
            Self::InsecureIndex => "insecure-index",
        }
    }
}

impl fmt::Display for LintCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The file, when the diagnostic comes from a multi-file check.
    pub path: Option<PathBuf>,
    /// 1-based line number.
    pub line: usize,
    pub severity: Severity,
    pub code: LintCode,
    pub message: String,
}

impl Diagnostic {
    fn new(line: usize, severity: Severity, code: LintCode, message: String) -> Self {
        Self {
            path: None,
            line,
            severity,
            code,
            message,
        }
    }

    /// Create a diagnostic located in a specific file.
    #[must_use]
    pub fn at(
        path: &Path,
        line: usize,
        severity: Severity,
        code: LintCode,
        message: String,
    ) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            ..Self::new(line, severity, code, message)
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}: ", path.display(), self.line)?,
            None => write!(f, "line {}: ", self.line)?,
        }
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
    }
}

/// The diagnostics produced by a check run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Merge another report into this one.
    pub fn extend(&mut self, other: Report) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Attach a file path to every diagnostic that has none.
    #[must_use]
    pub fn with_path(mut self, path: &Path) -> Self {
        for diagnostic in &mut self.diagnostics {
            if diagnostic.path.is_none() {
                diagnostic.path = Some(path.to_path_buf());
            }
        }
        self
    }

    /// Order diagnostics by file, then line, then severity (errors first).
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.line.cmp(&b.line))
                .then(b.severity.cmp(&a.severity))
                .then_with(|| a.code.as_str().cmp(b.code.as_str()))
                .then_with(|| a.message.cmp(&b.message))
        });
    }

    /// Sort, then drop diagnostics reported more than once, as happens when
    /// a file is reached from several roots.
    pub fn dedup(&mut self) {
        self.sort();
        self.diagnostics.dedup();
    }

    /// Returns true if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Returns true if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Iterate over the diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Returns true if some diagnostic has the given code.
    #[must_use]
    pub fn contains(&self, code: LintCode) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

/// Check one manifest.
#[must_use]
pub fn lint(manifest: &Manifest, config: &CheckConfig) -> Report {
    let mut report = Report::new();

    for duplicate in manifest.duplicates() {
        report.push(Diagnostic::new(
            duplicate.line,
            Severity::Error,
            LintCode::Duplicate,
            format!(
                "'{}' is already declared on line {}",
                duplicate.name, duplicate.first_line
            ),
        ));
    }

    for (line, requirement) in manifest.requirement_lines() {
        let specifiers = &requirement.specifiers;

        if !specifiers.is_satisfiable() {
            report.push(Diagnostic::new(
                line,
                Severity::Error,
                LintCode::Unsatisfiable,
                format!("no version of '{}' satisfies '{specifiers}'", requirement.name),
            ));
        } else if specifiers.pinned().is_some() && specifiers.len() > 1 {
            report.push(Diagnostic::new(
                line,
                Severity::Warning,
                LintCode::ExactPinWithRange,
                format!(
                    "'{}' is pinned exactly; the other specifiers in '{specifiers}' have no effect",
                    requirement.name
                ),
            ));
        }

        if !requirement.is_constrained() && !config.allows_unpinned(&requirement.name) {
            report.push(Diagnostic::new(
                line,
                Severity::Error,
                LintCode::Unpinned,
                format!("'{}' has no version constraint", requirement.name),
            ));
        }
    }

    for (line, option) in manifest.options() {
        if let ManifestOption::IndexUrl(url)
        | ManifestOption::ExtraIndexUrl(url)
        | ManifestOption::FindLinks(url) = option
        {
            if url.to_ascii_lowercase().starts_with("http://") {
                report.push(Diagnostic::new(
                    line,
                    Severity::Warning,
                    LintCode::InsecureIndex,
                    format!("'{}' uses plain HTTP: {url}", option.flag()),
                ));
            }
        }
    }

    report.sort();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(content: &str, config: &CheckConfig) -> Report {
        let manifest = Manifest::parse_unvalidated(content).unwrap();
        lint(&manifest, config)
    }

    #[test]
    fn clean_manifest_has_no_diagnostics() {
        let report = check(
            "numpy >= 1.24\npandas[performance] >= 2\npymongo==4.3.3\ntqdm\n",
            &CheckConfig::default(),
        );
        assert!(report.is_empty(), "{report:?}");
        assert!(!report.has_errors());
    }

    #[test]
    fn duplicate_is_an_error() {
        let report = check("numpy\nscipy\nNumPy>=1\n", &CheckConfig::default());
        assert_eq!(report.error_count(), 1);
        let diagnostic = report.iter().next().unwrap();
        assert_eq!(diagnostic.code, LintCode::Duplicate);
        assert_eq!(diagnostic.line, 3);
        assert_eq!(
            diagnostic.to_string(),
            "line 3: error[duplicate]: 'NumPy' is already declared on line 1"
        );
    }

    #[test]
    fn unsatisfiable_range() {
        let report = check("scipy >= 1.10, < 1.9\n", &CheckConfig::default());
        assert!(report.contains(LintCode::Unsatisfiable));
        assert!(report.has_errors());
    }

    #[test]
    fn arbitrary_pins_written_unnormalized_are_clean() {
        let report = check("foo===v1.0\nbar===1.0-RC1\n", &CheckConfig::default());
        assert!(report.is_empty(), "{report:?}");
    }

    #[test]
    fn dedup_drops_repeated_diagnostics() {
        let path = Path::new("requirements/base.txt");
        let mut report = check("numpy\nnumpy\n", &CheckConfig::default()).with_path(path);
        report.extend(check("numpy\nnumpy\n", &CheckConfig::default()).with_path(path));
        assert_eq!(report.error_count(), 2);

        report.dedup();
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn exact_pin_mixed_with_range() {
        let report = check("pymongo==4.3.3,>=4\n", &CheckConfig::default());
        assert!(report.contains(LintCode::ExactPinWithRange));
        assert!(!report.has_errors());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn unpinned_only_when_required() {
        let content = "tqdm\nwordcloud\npip\nnltk >= 3.8\n";
        assert!(check(content, &CheckConfig::default()).is_empty());

        let config = CheckConfig {
            require_pins: true,
            allow_unpinned: vec!["pip".into()],
        };
        let report = check(content, &config);
        let lines: Vec<usize> = report.iter().map(|d| d.line).collect();
        assert_eq!(lines, [1, 2]);
        assert!(report.iter().all(|d| d.code == LintCode::Unpinned));
    }

    #[test]
    fn url_requirement_counts_as_pinned() {
        let config = CheckConfig {
            require_pins: true,
            allow_unpinned: Vec::new(),
        };
        let report = check("demoji @ https://example.com/demoji.tar.gz\n", &config);
        assert!(report.is_empty());
    }

    #[test]
    fn insecure_index_url() {
        let report = check(
            "--index-url http://mirror.local/simple\n--extra-index-url https://pypi.org/simple\nnumpy\n",
            &CheckConfig::default(),
        );
        assert_eq!(report.len(), 1);
        let diagnostic = report.iter().next().unwrap();
        assert_eq!(diagnostic.code, LintCode::InsecureIndex);
        assert_eq!(diagnostic.severity, Severity::Warning);
    }

    #[test]
    fn report_sorting_and_paths() {
        let mut report = check("a\na\nb>=2,<1\n", &CheckConfig::default());
        report = report.with_path(Path::new("requirements.txt"));
        report.sort();
        let lines: Vec<usize> = report.iter().map(|d| d.line).collect();
        assert_eq!(lines, [2, 3]);
        assert!(report
            .iter()
            .next()
            .unwrap()
            .to_string()
            .starts_with("requirements.txt:2: error[duplicate]"));
    }
}
