//! Build records as reported by the build ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::revision::Revision;

/// State of a build in the ledger.
///
/// Only `passed` and `failed` take part in gap detection; every other
/// service state (running, canceled, blocked, ...) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildState {
    Passed,
    Failed,
    Other(String),
}

impl BuildState {
    pub fn as_str(&self) -> &str {
        match self {
            BuildState::Passed => "passed",
            BuildState::Failed => "failed",
            BuildState::Other(state) => state,
        }
    }
}

impl From<String> for BuildState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "passed" => BuildState::Passed,
            "failed" => BuildState::Failed,
            _ => BuildState::Other(state),
        }
    }
}

impl From<BuildState> for String {
    fn from(state: BuildState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single build in the ledger.
///
/// `number` is unique per pipeline and increases in scheduling order, which
/// is not necessarily revision order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub number: u64,
    pub state: BuildState,
    pub commit: Revision,
}

impl BuildRecord {
    pub fn new(number: u64, state: BuildState, commit: impl Into<String>) -> Self {
        Self {
            number,
            state,
            commit: Revision::new(commit),
        }
    }
}

/// Return the highest-numbered build in `state`, if any.
pub fn latest_in_state<'a>(builds: &'a [BuildRecord], state: &BuildState) -> Option<&'a BuildRecord> {
    builds
        .iter()
        .filter(|build| &build.state == state)
        .max_by_key(|build| build.number)
}

/// Query for builds of one pipeline on one branch created after a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildQuery {
    pub organization: String,
    pub pipeline: String,
    pub created_from: DateTime<Utc>,
    pub branch: String,
}

/// Request for a new build of `commit` on `branch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBuild {
    pub organization: String,
    pub pipeline: String,
    pub commit: Revision,
    pub branch: String,
}
