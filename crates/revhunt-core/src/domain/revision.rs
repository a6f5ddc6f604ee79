//! Revisions and ordered revision ranges.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{Result, RevhuntError};

/// Opaque identifier naming a point in source history.
///
/// Revisions carry no ordering of their own; order is defined only by
/// position within a [`RevisionRange`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Wrap an identifier without validation.
    ///
    /// Use [`Revision::parse`] for identifiers coming from user input.
    pub fn new(id: impl Into<String>) -> Self {
        Revision(id.into())
    }

    /// Validate and wrap an identifier.
    ///
    /// Rejects empty identifiers, identifiers containing whitespace, and
    /// identifiers starting with `-` so a revision is never read as a
    /// command-line option by version control tooling.
    pub fn parse(id: &str) -> Result<Self> {
        let invalid = |reason: &str| RevhuntError::InvalidRevision {
            value: id.to_string(),
            reason: reason.to_string(),
        };

        if id.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if id.starts_with('-') {
            return Err(invalid("must not start with '-'"));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }
        Ok(Revision(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 chars), for log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Revision::new(s)
    }
}

/// Chronologically ascending sequence of revisions.
///
/// Invariant: no revision appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevisionRange {
    revisions: Vec<Revision>,
}

impl RevisionRange {
    /// Build a range from revisions already in ascending order.
    pub fn from_ascending(revisions: Vec<Revision>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(revisions.len());
        for revision in &revisions {
            if !seen.insert(revision.as_str()) {
                return Err(RevhuntError::InvalidRange(format!(
                    "duplicate revision {revision}"
                )));
            }
        }
        Ok(Self { revisions })
    }

    /// Parse newline-separated revision listing output (one id per line).
    ///
    /// Blank lines are ignored, so empty output yields an empty range.
    pub fn from_lines(output: &str) -> Result<Self> {
        let revisions = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Revision::parse)
            .collect::<Result<Vec<_>>>()?;
        Self::from_ascending(revisions)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn as_slice(&self) -> &[Revision] {
        &self.revisions
    }

    pub fn first(&self) -> Option<&Revision> {
        self.revisions.first()
    }

    pub fn last(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Revision> {
        self.revisions.iter()
    }

    /// Drop the last revision if it equals `revision`.
    ///
    /// Turns an `(a, b]` range into `(a, b)`.
    pub fn without_trailing(mut self, revision: &Revision) -> Self {
        if self.revisions.last() == Some(revision) {
            self.revisions.pop();
        }
        self
    }

    pub fn into_vec(self) -> Vec<Revision> {
        self.revisions
    }
}

impl<'a> IntoIterator for &'a RevisionRange {
    type Item = &'a Revision;
    type IntoIter = std::slice::Iter<'a, Revision>;

    fn into_iter(self) -> Self::IntoIter {
        self.revisions.iter()
    }
}
