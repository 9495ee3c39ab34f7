//! Version specifiers: comparators paired with versions.
//!
//! A requirement constrains its versions with a comma-separated set of
//! specifiers (`>=1.2, !=1.3.*, <2`), all of which must hold.

use crate::version::{Version, VersionError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing specifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecifierError {
    /// The specifier does not start with a known comparator.
    #[error("invalid comparator in '{0}', expected one of: ==, !=, >=, <=, >, <, ~=, ===")]
    InvalidOperator(String),

    /// The comparator is not followed by a version.
    #[error("missing version after '{0}'")]
    MissingVersion(String),

    /// The version after the comparator is not well-formed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// A `.*` suffix was used with a comparator that does not allow it.
    #[error("wildcard version '{0}' is only allowed with == and !=")]
    UnexpectedWildcard(String),

    /// A `~=` specifier named a single-segment version.
    #[error("compatible release '~={0}' needs at least two release segments")]
    CompatibleReleaseTooShort(String),

    /// An empty entry between commas.
    #[error("empty specifier in '{0}'")]
    Empty(String),
}

/// A version comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `>=`
    GreaterEqual,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `~=`
    Compatible,
    /// `===`
    Arbitrary,
}

impl Operator {
    /// Every operator, longest spelling first so prefix matching is unambiguous.
    const ALL: [Self; 8] = [
        Self::Arbitrary,
        Self::Compatible,
        Self::Equal,
        Self::NotEqual,
        Self::GreaterEqual,
        Self::LessEqual,
        Self::Greater,
        Self::Less,
    ];

    /// Returns the operator as written.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::Compatible => "~=",
            Self::Arbitrary => "===",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `operator version` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecifier {
    operator: Operator,
    version: Version,
    wildcard: bool,
    raw_version: String,
}

impl VersionSpecifier {
    /// Parse a specifier such as `>=2`, `== 4.3.3` or `!=1.4.*`.
    ///
    /// # Errors
    ///
    /// Returns an error if the comparator is unknown or the version is not
    /// well-formed.
    pub fn parse(text: &str) -> Result<Self, SpecifierError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SpecifierError::Empty(text.to_string()));
        }

        let operator = Operator::ALL
            .into_iter()
            .find(|op| trimmed.starts_with(op.as_str()))
            .ok_or_else(|| SpecifierError::InvalidOperator(trimmed.to_string()))?;

        let raw_version = trimmed[operator.as_str().len()..].trim();
        if raw_version.is_empty() {
            return Err(SpecifierError::MissingVersion(operator.as_str().to_string()));
        }

        let (version_text, wildcard) = match raw_version.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (raw_version, false),
        };

        if wildcard && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(SpecifierError::UnexpectedWildcard(raw_version.to_string()));
        }

        let version = Version::parse(version_text)?;

        if operator == Operator::Compatible && version.release().len() < 2 {
            return Err(SpecifierError::CompatibleReleaseTooShort(
                raw_version.to_string(),
            ));
        }

        Ok(Self {
            operator,
            version,
            wildcard,
            raw_version: raw_version.to_string(),
        })
    }

    /// The comparator.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The version (without any `.*` suffix).
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Returns true for `==X.*` and `!=X.*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Returns true if `candidate` satisfies this specifier.
    ///
    /// Pre-releases are not filtered out; callers decide whether they want
    /// them.
    #[must_use]
    pub fn contains(&self, candidate: &Version) -> bool {
        let spec = &self.version;
        match self.operator {
            Operator::Equal if self.wildcard => self.prefix_matches(candidate),
            Operator::NotEqual if self.wildcard => !self.prefix_matches(candidate),
            Operator::Equal => self.exact_matches(candidate),
            Operator::NotEqual => !self.exact_matches(candidate),
            Operator::GreaterEqual => candidate.public() >= *spec,
            Operator::LessEqual => candidate.public() <= *spec,
            Operator::Greater => {
                let candidate = candidate.public();
                // `>1.0` excludes post-releases of 1.0 unless they are named.
                candidate > *spec
                    && !(candidate.is_postrelease()
                        && !spec.is_postrelease()
                        && candidate.same_release(spec))
            }
            Operator::Less => {
                let candidate = candidate.public();
                // `<1.0` excludes pre-releases of 1.0 unless they are named.
                candidate < *spec
                    && !(candidate.is_prerelease()
                        && !spec.is_prerelease()
                        && candidate.same_release(spec))
            }
            Operator::Compatible => {
                let release = spec.release();
                let prefix = &release[..release.len() - 1];
                candidate.public() >= *spec
                    && candidate.has_release_prefix(spec.epoch(), prefix)
            }
            Operator::Arbitrary => self.identical(&candidate.to_string()),
        }
    }

    /// Text comparison for `===`. Both sides are accepted either as written
    /// or in normalized form, so `===v1.0` matches `v1.0` and `1.0`.
    fn identical(&self, text: &str) -> bool {
        let text = text.trim();
        text.eq_ignore_ascii_case(&self.raw_version)
            || Version::parse(text).is_ok_and(|v| v.to_string() == self.version.to_string())
    }

    /// Returns true if a version written as `text` satisfies this specifier.
    ///
    /// Only `===` looks at the text itself; other operators parse it first.
    #[must_use]
    pub fn contains_text(&self, text: &str) -> bool {
        if self.operator == Operator::Arbitrary {
            return self.identical(text);
        }
        Version::parse(text).is_ok_and(|v| self.contains(&v))
    }

    fn prefix_matches(&self, candidate: &Version) -> bool {
        candidate.has_release_prefix(self.version.epoch(), self.version.release())
    }

    fn exact_matches(&self, candidate: &Version) -> bool {
        if self.version.is_local() {
            candidate == &self.version
        } else {
            candidate.public() == self.version
        }
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operator == Operator::Arbitrary {
            return write!(f, "==={}", self.raw_version);
        }
        write!(f, "{}{}", self.operator, self.version)?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

impl FromStr for VersionSpecifier {
    type Err = SpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A conjunction of version specifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSpecifiers(Vec<VersionSpecifier>);

impl VersionSpecifiers {
    /// Parse a comma-separated specifier list. An empty string yields an
    /// empty set, which every version satisfies.
    ///
    /// # Errors
    ///
    /// Returns the first specifier error encountered.
    pub fn parse(text: &str) -> Result<Self, SpecifierError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        text.split(',')
            .map(|part| {
                if part.trim().is_empty() {
                    Err(SpecifierError::Empty(text.trim().to_string()))
                } else {
                    VersionSpecifier::parse(part)
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Returns true if no specifiers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of specifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the specifiers.
    pub fn iter(&self) -> impl Iterator<Item = &VersionSpecifier> {
        self.0.iter()
    }

    /// Returns true if `candidate` satisfies every specifier.
    #[must_use]
    pub fn contains(&self, candidate: &Version) -> bool {
        self.0.iter().all(|s| s.contains(candidate))
    }

    /// Returns true if a version written as `text` satisfies every specifier.
    #[must_use]
    pub fn contains_text(&self, text: &str) -> bool {
        self.0.iter().all(|s| s.contains_text(text))
    }

    /// The exact version pinned with `==` (non-wildcard) or `===`, if any.
    #[must_use]
    pub fn pinned(&self) -> Option<&Version> {
        self.pins().next().map(|s| &s.version)
    }

    fn pins(&self) -> impl Iterator<Item = &VersionSpecifier> {
        self.0.iter().filter(|s| {
            matches!(s.operator, Operator::Equal | Operator::Arbitrary) && !s.wildcard
        })
    }

    /// The lowest version the set admits, when it has a lower bound.
    #[must_use]
    pub fn minimum(&self) -> Option<&Version> {
        if let Some(pin) = self.pinned() {
            return Some(pin);
        }
        self.0
            .iter()
            .filter(|s| {
                matches!(
                    s.operator,
                    Operator::GreaterEqual | Operator::Greater | Operator::Compatible
                ) || (s.operator == Operator::Equal && s.wildcard)
            })
            .map(|s| &s.version)
            .max()
    }

    /// Returns a set combining both sets' specifiers.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self(self.0.iter().chain(other.0.iter()).cloned().collect())
    }

    /// Returns false when no version can satisfy every specifier, as in
    /// `>=3,<2` or `==1.0,!=1.0`.
    ///
    /// The check works on release bounds. A `!=X.*` exclusion counts when the
    /// bounds lie entirely inside `X.*`. It may still accept a few contrived
    /// sets whose only candidates are excluded by pre/post-release rules.
    #[must_use]
    pub fn is_satisfiable(&self) -> bool {
        let mut pins = self.pins().peekable();
        if pins.peek().is_some() {
            // A pin is its own candidate; `===` keeps the text it was written with.
            return pins.any(|pin| match pin.operator {
                Operator::Arbitrary => self.contains_text(&pin.raw_version),
                _ => self.contains(&pin.version),
            });
        }

        let mut bounds = Bounds::default();
        for spec in &self.0 {
            let version = spec.version.clone();
            match spec.operator {
                Operator::GreaterEqual => bounds.raise(version, true),
                Operator::Greater => bounds.raise(version, false),
                Operator::LessEqual => bounds.lower_ceiling(version, true),
                Operator::Less => bounds.lower_ceiling(version, false),
                Operator::Equal if spec.wildcard => {
                    let ceiling = bump(&version, version.release().len());
                    bounds.raise(version, true);
                    bounds.lower_ceiling(ceiling, false);
                }
                Operator::Compatible => {
                    let ceiling = bump(&version, version.release().len() - 1);
                    bounds.raise(version, true);
                    bounds.lower_ceiling(ceiling, false);
                }
                Operator::NotEqual | Operator::Equal | Operator::Arbitrary => {}
            }
        }

        let (Some((low, low_inclusive)), Some((high, high_inclusive))) =
            (&bounds.floor, &bounds.ceiling)
        else {
            return true;
        };

        if low == high {
            // A single candidate remains; it must survive the exclusions.
            return *low_inclusive && *high_inclusive && self.contains(low);
        }
        if low > high {
            return false;
        }

        !self.0.iter().any(|spec| {
            spec.operator == Operator::NotEqual
                && spec.wildcard
                && *low >= spec.version
                && {
                    let end = bump(&spec.version, spec.version.release().len());
                    if *high_inclusive {
                        *high < end
                    } else {
                        *high <= end
                    }
                }
        })
    }
}

/// Increment the release segment at `len - 1`, dropping everything after it.
fn bump(version: &Version, len: usize) -> Version {
    let mut release: Vec<u64> = version.release().iter().take(len).copied().collect();
    if let Some(last) = release.last_mut() {
        *last += 1;
    }
    Version::from_release(release)
}

#[derive(Debug, Default)]
struct Bounds {
    floor: Option<(Version, bool)>,
    ceiling: Option<(Version, bool)>,
}

impl Bounds {
    fn raise(&mut self, version: Version, inclusive: bool) {
        let tighter = match &self.floor {
            None => true,
            Some((current, current_inclusive)) => {
                version > *current || (version == *current && *current_inclusive && !inclusive)
            }
        };
        if tighter {
            self.floor = Some((version, inclusive));
        }
    }

    fn lower_ceiling(&mut self, version: Version, inclusive: bool) {
        let tighter = match &self.ceiling {
            None => true,
            Some((current, current_inclusive)) => {
                version < *current || (version == *current && *current_inclusive && !inclusive)
            }
        };
        if tighter {
            self.ceiling = Some((version, inclusive));
        }
    }
}

impl fmt::Display for VersionSpecifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for VersionSpecifiers {
    type Err = SpecifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<VersionSpecifier> for VersionSpecifiers {
    fn from_iter<T: IntoIterator<Item = VersionSpecifier>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
