//! Requirements manifest (`requirements.txt`) parsing, validation and editing.
//!
//! A manifest is line oriented. Each logical line (physical lines ending in
//! `\` are joined with the next) is blank, a comment, a requirement, or an
//! installer option such as `-r other.txt`. Lines that are not edited are
//! rendered back exactly as they were read, so comments and layout survive
//! `add` and `remove`.

use crate::requirement::{normalize_name, Requirement, RequirementError};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when working with manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Requirement {
        line: usize,
        #[source]
        source: RequirementError,
    },

    #[error("line {line}: unknown option '{option}'")]
    UnknownOption { line: usize, option: String },

    #[error("line {line}: option '{option}' requires a value")]
    MissingOptionValue { line: usize, option: String },

    #[error("line {line}: option '{option}' does not take a value")]
    UnexpectedOptionValue { line: usize, option: String },

    #[error("line {line}: duplicate requirement '{name}' (first declared on line {first_line})")]
    Duplicate {
        name: String,
        first_line: usize,
        line: usize,
    },
}

impl ManifestError {
    /// The 1-based line the error refers to, if any.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Io(_) => None,
            Self::Requirement { line, .. }
            | Self::UnknownOption { line, .. }
            | Self::MissingOptionValue { line, .. }
            | Self::UnexpectedOptionValue { line, .. }
            | Self::Duplicate { line, .. } => Some(*line),
        }
    }
}

/// An installer option line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestOption {
    /// `-r FILE`: include another requirements file.
    Requirements(String),
    /// `-c FILE`: constrain versions with another file.
    Constraints(String),
    /// `-i URL`: replace the package index.
    IndexUrl(String),
    /// `--extra-index-url URL`
    ExtraIndexUrl(String),
    /// `-f URL`
    FindLinks(String),
    /// `-e TARGET`: editable install of a local project or VCS URL.
    Editable(String),
    /// `--no-index`
    NoIndex,
    /// `--pre`
    Pre,
}

impl ManifestOption {
    /// Parse an option line such as `-r base.txt` or `--index-url=URL`.
    fn parse(content: &str, line: usize) -> Result<Self, ManifestError> {
        let (flag, value) = split_flag(content);
        let unknown = || ManifestError::UnknownOption {
            line,
            option: flag.to_string(),
        };

        let takes_value = |make: fn(String) -> Self| {
            if value.is_empty() {
                Err(ManifestError::MissingOptionValue {
                    line,
                    option: flag.to_string(),
                })
            } else {
                Ok(make(value.to_string()))
            }
        };
        let bare = |option: Self| {
            if value.is_empty() {
                Ok(option)
            } else {
                Err(ManifestError::UnexpectedOptionValue {
                    line,
                    option: flag.to_string(),
                })
            }
        };

        match flag {
            "-r" | "--requirement" => takes_value(Self::Requirements),
            "-c" | "--constraint" => takes_value(Self::Constraints),
            "-i" | "--index-url" => takes_value(Self::IndexUrl),
            "--extra-index-url" => takes_value(Self::ExtraIndexUrl),
            "-f" | "--find-links" => takes_value(Self::FindLinks),
            "-e" | "--editable" => takes_value(Self::Editable),
            "--no-index" => bare(Self::NoIndex),
            "--pre" => bare(Self::Pre),
            _ => Err(unknown()),
        }
    }

    /// The option's canonical flag.
    #[must_use]
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Requirements(_) => "-r",
            Self::Constraints(_) => "-c",
            Self::IndexUrl(_) => "--index-url",
            Self::ExtraIndexUrl(_) => "--extra-index-url",
            Self::FindLinks(_) => "--find-links",
            Self::Editable(_) => "-e",
            Self::NoIndex => "--no-index",
            Self::Pre => "--pre",
        }
    }

    /// The option's argument, if it takes one.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Requirements(v)
            | Self::Constraints(v)
            | Self::IndexUrl(v)
            | Self::ExtraIndexUrl(v)
            | Self::FindLinks(v)
            | Self::Editable(v) => Some(v),
            Self::NoIndex | Self::Pre => None,
        }
    }
}

impl fmt::Display for ManifestOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{} {value}", self.flag()),
            None => f.write_str(self.flag()),
        }
    }
}

/// Split `--flag=value`, `--flag value`, `-x value` and `-xvalue`.
fn split_flag(content: &str) -> (&str, &str) {
    let split = if content.starts_with("--") {
        content
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(content.len())
    } else {
        content
            .chars()
            .nth(1)
            .map_or(content.len(), |c| 1 + c.len_utf8())
    };
    let (flag, rest) = content.split_at(split);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest);
    (flag, rest.trim())
}

/// What a logical line holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace-only.
    Blank,
    /// A full-line comment; holds the text after `#`.
    Comment(String),
    /// A dependency declaration with an optional trailing comment.
    Requirement {
        requirement: Requirement,
        comment: Option<String>,
    },
    /// An installer option with an optional trailing comment.
    Option {
        option: ManifestOption,
        comment: Option<String>,
    },
}

/// One logical line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based number of the first physical line.
    pub number: usize,
    /// The parsed content.
    pub kind: LineKind,
    /// Original text, dropped once the line is edited.
    raw: Option<String>,
}

impl Line {
    /// Physical lines the original text occupied.
    fn span(&self) -> usize {
        self.raw.as_deref().map_or(1, |raw| raw.split('\n').count())
    }

    fn render(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        match &self.kind {
            LineKind::Blank => String::new(),
            LineKind::Comment(text) => format!("#{text}"),
            LineKind::Requirement {
                requirement,
                comment,
            } => with_comment(requirement.to_string(), comment.as_deref()),
            LineKind::Option { option, comment } => {
                with_comment(option.to_string(), comment.as_deref())
            }
        }
    }

    /// The requirement on this line, if it holds one.
    #[must_use]
    pub fn requirement(&self) -> Option<&Requirement> {
        match &self.kind {
            LineKind::Requirement { requirement, .. } => Some(requirement),
            _ => None,
        }
    }

    /// The option on this line, if it holds one.
    #[must_use]
    pub fn option(&self) -> Option<&ManifestOption> {
        match &self.kind {
            LineKind::Option { option, .. } => Some(option),
            _ => None,
        }
    }
}

fn with_comment(text: String, comment: Option<&str>) -> String {
    match comment {
        Some(comment) => format!("{text}  # {comment}"),
        None => text,
    }
}

/// Outcome of [`Manifest::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// The requirement was appended.
    Added,
    /// An existing declaration of the same package was replaced.
    Replaced { previous: Requirement },
}

/// A duplicated package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// The name as written on the later line.
    pub name: String,
    /// Line of the first declaration.
    pub first_line: usize,
    /// Line of the repeated declaration.
    pub line: usize,
}

/// A parsed requirements manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    lines: Vec<Line>,
    line_ending: LineEnding,
}

/// Line terminator used when rendering, taken from the parsed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    fn detect(content: &str) -> Self {
        if content.contains("\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

impl Manifest {
    /// Load and validate a manifest from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a line does not parse,
    /// or a package is declared twice.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading requirements manifest");
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if a line does not parse or a package is declared
    /// twice.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let manifest = Self::parse_unvalidated(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest without checking for duplicate declarations.
    ///
    /// # Errors
    ///
    /// Returns an error if a line does not parse.
    pub fn parse_unvalidated(content: &str) -> Result<Self, ManifestError> {
        let lines = logical_lines(content)
            .into_iter()
            .map(|(number, raw, joined)| {
                let kind = classify(&joined, number)?;
                Ok(Line {
                    number,
                    kind,
                    raw: Some(raw),
                })
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;

        let manifest = Self {
            lines,
            line_ending: LineEnding::detect(content),
        };
        debug!(
            lines = manifest.lines.len(),
            requirements = manifest.len(),
            "parsed manifest"
        );
        Ok(manifest)
    }

    /// Check that no package is declared twice.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate found.
    pub fn validate(&self) -> Result<(), ManifestError> {
        match self.duplicates().into_iter().next() {
            Some(Duplicate {
                name,
                first_line,
                line,
            }) => Err(ManifestError::Duplicate {
                name,
                first_line,
                line,
            }),
            None => Ok(()),
        }
    }

    /// Every repeated declaration, in line order.
    #[must_use]
    pub fn duplicates(&self) -> Vec<Duplicate> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for (line, requirement) in self.requirement_lines() {
            match seen.get(requirement.name.normalized()) {
                Some(&first_line) => duplicates.push(Duplicate {
                    name: requirement.name.to_string(),
                    first_line,
                    line,
                }),
                None => {
                    seen.insert(requirement.name.normalized(), line);
                }
            }
        }
        duplicates
    }

    /// All logical lines.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Iterate over the requirements in file order.
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.lines.iter().filter_map(Line::requirement)
    }

    /// Iterate over requirements with their line numbers.
    pub fn requirement_lines(&self) -> impl Iterator<Item = (usize, &Requirement)> {
        self.lines
            .iter()
            .filter_map(|l| l.requirement().map(|r| (l.number, r)))
    }

    /// Iterate over option lines with their line numbers.
    pub fn options(&self) -> impl Iterator<Item = (usize, &ManifestOption)> {
        self.lines
            .iter()
            .filter_map(|l| l.option().map(|o| (l.number, o)))
    }

    /// Get the requirement for a package (name compared normalized).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Requirement> {
        let normalized = normalize_name(name);
        self.requirements()
            .find(|r| r.name.normalized() == normalized)
    }

    /// The comment block at the top of the file, one entry per line.
    #[must_use]
    pub fn header_comments(&self) -> Vec<&str> {
        self.lines
            .iter()
            .skip_while(|l| l.kind == LineKind::Blank)
            .map_while(|l| match &l.kind {
                LineKind::Comment(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements().count()
    }

    /// Returns true if the manifest declares no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a requirement, replacing an existing declaration of the same
    /// package in place. A replaced line keeps its trailing comment.
    pub fn upsert(&mut self, requirement: Requirement) -> Upsert {
        let existing = self.lines.iter_mut().find(|l| {
            l.requirement()
                .is_some_and(|r| r.name == requirement.name)
        });

        if let Some(line) = existing {
            if let LineKind::Requirement {
                requirement: current,
                ..
            } = &mut line.kind
            {
                let previous = std::mem::replace(current, requirement);
                line.raw = None;
                return Upsert::Replaced { previous };
            }
        }

        let number = self.next_number();
        self.lines.push(Line {
            number,
            kind: LineKind::Requirement {
                requirement,
                comment: None,
            },
            raw: None,
        });
        Upsert::Added
    }

    /// Remove every declaration of a package. Returns the first removed
    /// requirement, or `None` if the package was not declared.
    pub fn remove(&mut self, name: &str) -> Option<Requirement> {
        let normalized = normalize_name(name);
        let mut removed = None;
        self.lines.retain(|l| match l.requirement() {
            Some(r) if r.name.normalized() == normalized => {
                if removed.is_none() {
                    removed = Some(r.clone());
                }
                false
            }
            _ => true,
        });
        removed
    }

    /// Number of the physical line following the last one.
    fn next_number(&self) -> usize {
        self.lines.last().map_or(1, |l| l.number + l.span())
    }

    /// Append a full-line comment.
    pub fn push_comment(&mut self, text: &str) {
        let number = self.next_number();
        let text = if text.is_empty() {
            String::new()
        } else {
            format!(" {text}")
        };
        self.lines.push(Line {
            number,
            kind: LineKind::Comment(text),
            raw: None,
        });
    }

    /// Append a blank line.
    pub fn push_blank(&mut self) {
        let number = self.next_number();
        self.lines.push(Line {
            number,
            kind: LineKind::Blank,
            raw: None,
        });
    }

    /// Write the manifest to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "writing requirements manifest");
        std::fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ending = self.line_ending.as_str();
        for line in &self.lines {
            for physical in line.render().split('\n') {
                write!(f, "{physical}{ending}")?;
            }
        }
        Ok(())
    }
}

/// Join continuation lines. Returns `(first line number, raw text, joined text)`.
fn logical_lines(content: &str) -> Vec<(usize, String, String)> {
    let mut result = Vec::new();
    let mut pending: Option<(usize, Vec<&str>, String)> = None;

    for (index, physical) in content.lines().enumerate() {
        let (start, mut raw, mut joined) =
            pending.take().unwrap_or((index + 1, Vec::new(), String::new()));
        raw.push(physical);

        let is_comment = joined.is_empty() && physical.trim_start().starts_with('#');
        match physical.trim_end().strip_suffix('\\') {
            Some(body) if !is_comment => {
                joined.push_str(body);
                pending = Some((start, raw, joined));
            }
            _ => {
                joined.push_str(physical);
                result.push((start, raw.join("\n"), joined));
            }
        }
    }

    if let Some((start, raw, joined)) = pending {
        result.push((start, raw.join("\n"), joined));
    }
    result
}

/// Split a logical line into content and comment. A `#` starts a comment at
/// the beginning of the line or after whitespace, so URL fragments survive.
fn split_comment(line: &str) -> (&str, Option<&str>) {
    let mut previous_is_space = true;
    for (i, c) in line.char_indices() {
        if c == '#' && previous_is_space {
            return (&line[..i], Some(&line[i + 1..]));
        }
        previous_is_space = c.is_whitespace();
    }
    (line, None)
}

fn classify(line: &str, number: usize) -> Result<LineKind, ManifestError> {
    let (content, comment) = split_comment(line);
    let content = content.trim();

    if content.is_empty() {
        return Ok(match comment {
            Some(text) => LineKind::Comment(text.to_string()),
            None => LineKind::Blank,
        });
    }

    let comment = comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string);

    if content.starts_with('-') {
        let option = ManifestOption::parse(content, number)?;
        return Ok(LineKind::Option { option, comment });
    }

    let requirement = Requirement::parse(content).map_err(|source| ManifestError::Requirement {
        line: number,
        source,
    })?;
    Ok(LineKind::Requirement {
        requirement,
        comment,
    })
}
