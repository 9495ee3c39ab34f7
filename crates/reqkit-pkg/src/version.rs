//! Version numbers as written in requirements manifests.
//!
//! Versions follow the PEP 440 scheme:
//!
//! ```text
//! [N!]N(.N)*[{a|b|rc}N][.postN][.devN][+local]
//! ```
//!
//! Parsing is lenient about the alternative spellings the scheme allows
//! (`1.0-RC1`, `v2`, `1.0alpha`, `1.0-1`) and [`Version`]'s `Display`
//! renders the normalized form.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a version string is not well-formed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version '{text}': {reason}")]
pub struct VersionError {
    /// The text that failed to parse.
    pub text: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl VersionError {
    fn new(text: &str, reason: &'static str) -> Self {
        Self {
            text: text.to_string(),
            reason,
        }
    }
}

/// Pre-release phase. Ordered alpha < beta < release candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreRelease {
    /// `a`, `alpha`
    Alpha,
    /// `b`, `beta`
    Beta,
    /// `rc`, `c`, `pre`, `preview`
    Rc,
}

impl PreRelease {
    /// Returns the normalized spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Rc => "rc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LocalSegment {
    Number(u64),
    Text(String),
}

impl Ord for LocalSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Greater,
            (Self::Text(_), Self::Number(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for LocalSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// A parsed version number.
///
/// Equality and ordering follow the scheme's rules rather than the text:
/// `2`, `2.0` and `2.0.0` are equal, and `1.0.dev0 < 1.0a1 < 1.0 < 1.0.post1`.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

impl Version {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a well-formed version.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let lowered = text.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return Err(VersionError::new(text, "version is empty"));
        }

        let (public, local) = match lowered.split_once('+') {
            Some((public, local)) => (public, Some(local)),
            None => (lowered.as_str(), None),
        };
        let public = public.strip_prefix('v').unwrap_or(public);

        let (epoch, public) = match public.split_once('!') {
            Some((epoch, rest)) => {
                let epoch = epoch
                    .parse::<u64>()
                    .map_err(|_| VersionError::new(text, "epoch must be a number"))?;
                (epoch, rest)
            }
            None => (0, public),
        };

        let mut cursor = Cursor::new(public);

        let mut release = Vec::new();
        loop {
            let Some(segment) = cursor.number() else {
                return Err(VersionError::new(text, "expected a release number"));
            };
            release.push(segment);

            let mark = cursor.pos;
            if cursor.eat('.') && cursor.peek_digit() {
                continue;
            }
            cursor.pos = mark;
            break;
        }

        let pre = cursor.pre_release();
        let post = cursor.post_release();
        let dev = cursor.dev_release();

        if !cursor.is_empty() {
            return Err(VersionError::new(text, "unexpected trailing characters"));
        }

        let local = match local {
            Some(local) => parse_local(local).ok_or_else(|| {
                VersionError::new(text, "local label must be dot-separated letters and digits")
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    /// Build a final release from its release segments.
    #[must_use]
    pub fn from_release(release: Vec<u64>) -> Self {
        Self {
            epoch: 0,
            release,
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    /// The epoch (zero unless written as `N!`).
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The release segments (`[4, 3, 3]` for `4.3.3`).
    #[must_use]
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// The pre-release phase and number, if any.
    #[must_use]
    pub fn pre(&self) -> Option<(PreRelease, u64)> {
        self.pre
    }

    /// The post-release number, if any.
    #[must_use]
    pub fn post(&self) -> Option<u64> {
        self.post
    }

    /// The development release number, if any.
    #[must_use]
    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    /// Returns true for pre-releases and development releases.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Returns true for post-releases.
    #[must_use]
    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// Returns true if the version carries a `+local` label.
    #[must_use]
    pub fn is_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// The version with its local label removed.
    #[must_use]
    pub fn public(&self) -> Self {
        Self {
            local: Vec::new(),
            ..self.clone()
        }
    }

    /// Returns true if both versions share the same epoch and release
    /// segments, ignoring pre, post, dev and local parts.
    #[must_use]
    pub fn same_release(&self, other: &Self) -> bool {
        self.epoch == other.epoch
            && compare_release(&self.release, &other.release) == Ordering::Equal
    }

    /// Returns true if this version's release starts with `prefix`
    /// (missing segments count as zero).
    #[must_use]
    pub fn has_release_prefix(&self, epoch: u64, prefix: &[u64]) -> bool {
        self.epoch == epoch
            && prefix
                .iter()
                .enumerate()
                .all(|(i, n)| self.release.get(i).copied().unwrap_or(0) == *n)
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (Some((phase, n)), _, _) => PreKey::Pre(phase, n),
            _ => PreKey::Final,
        }
    }

    fn dev_key(&self) -> DevKey {
        match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Release,
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreRelease, u64),
    Final,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    Release,
}

fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn parse_local(local: &str) -> Option<Vec<LocalSegment>> {
    if local.is_empty() {
        return None;
    }
    local
        .split(['.', '-', '_'])
        .map(|segment| {
            if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_alphanumeric()) {
                None
            } else if let Ok(n) = segment.parse::<u64>() {
                Some(LocalSegment::Number(n))
            } else {
                Some(LocalSegment::Text(segment.to_string()))
            }
        })
        .collect()
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(ToString::to_string).collect();
        f.write_str(&release.join("."))?;
        if let Some((phase, n)) = self.pre {
            write!(f, "{}{n}", phase.as_str())?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if !self.local.is_empty() {
            let local: Vec<String> = self.local.iter().map(ToString::to_string).collect();
            write!(f, "+{}", local.join("."))?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Byte cursor over the lowercased public part of a version.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek_digit(&self) -> bool {
        self.rest().starts_with(|c: char| c.is_ascii_digit())
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_separator(&mut self) -> bool {
        self.eat('.') || self.eat('-') || self.eat('_')
    }

    /// Consume the first word in `words` that prefixes the remaining text.
    fn eat_word(&mut self, words: &[&'static str]) -> Option<&'static str> {
        let rest = self.rest();
        let word = words.iter().find(|w| rest.starts_with(**w))?;
        self.pos += word.len();
        Some(word)
    }

    fn number(&mut self) -> Option<u64> {
        let rest = self.rest();
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return None;
        }
        let value = rest[..len].parse().ok()?;
        self.pos += len;
        Some(value)
    }

    /// Number after an optional separator, defaulting to zero.
    fn implicit_number(&mut self) -> u64 {
        let mark = self.pos;
        self.eat_separator();
        if let Some(n) = self.number() {
            n
        } else {
            self.pos = mark;
            0
        }
    }

    fn pre_release(&mut self) -> Option<(PreRelease, u64)> {
        let mark = self.pos;
        self.eat_separator();
        // Longer spellings first so `alpha` is not read as `a` + `lpha`.
        let phase = match self.eat_word(&["alpha", "a", "beta", "b", "preview", "pre", "rc", "c"]) {
            Some("alpha" | "a") => PreRelease::Alpha,
            Some("beta" | "b") => PreRelease::Beta,
            Some(_) => PreRelease::Rc,
            None => {
                self.pos = mark;
                return None;
            }
        };
        Some((phase, self.implicit_number()))
    }

    fn post_release(&mut self) -> Option<u64> {
        let mark = self.pos;
        if self.eat('-') {
            if let Some(n) = self.number() {
                return Some(n);
            }
        }
        self.pos = mark;

        self.eat_separator();
        if self.eat_word(&["post", "rev", "r"]).is_some() {
            return Some(self.implicit_number());
        }
        self.pos = mark;
        None
    }

    fn dev_release(&mut self) -> Option<u64> {
        let mark = self.pos;
        self.eat_separator();
        if self.eat_word(&["dev"]).is_some() {
            return Some(self.implicit_number());
        }
        self.pos = mark;
        None
    }
}
