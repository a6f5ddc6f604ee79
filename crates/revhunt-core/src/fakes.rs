//! In-memory fakes for the capability traits (testing only)
//!
//! Provides `StaticRevisionRange`, `RecordingCheckout`, and `MemoryBuildLedger`
//! that satisfy the trait contracts without git or a build service.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::capabilities::{BuildLedger, Checkout, RevisionRangeProvider};
use crate::domain::{BuildQuery, BuildRecord, BuildState, NewBuild, Result, RevhuntError, Revision, RevisionRange};

// ---------------------------------------------------------------------------
// StaticRevisionRange
// ---------------------------------------------------------------------------

/// Linear history held in memory, oldest first.
#[derive(Debug, Default)]
pub struct StaticRevisionRange {
    history: Vec<Revision>,
    queries: Mutex<Vec<(Option<Revision>, Revision)>>,
}

impl StaticRevisionRange {
    pub fn new<I, S>(history: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            history: history.into_iter().map(Revision::new).collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every `(lower_exclusive, upper_inclusive)` pair queried so far.
    pub fn queries(&self) -> Vec<(Option<Revision>, Revision)> {
        self.queries.lock().unwrap().clone()
    }

    fn position(&self, revision: &Revision) -> Result<usize> {
        self.history
            .iter()
            .position(|r| r == revision)
            .ok_or_else(|| RevhuntError::Git(format!("unknown revision {revision}")))
    }
}

#[async_trait]
impl RevisionRangeProvider for StaticRevisionRange {
    async fn list_revisions(
        &self,
        lower_exclusive: Option<&Revision>,
        upper_inclusive: &Revision,
    ) -> Result<RevisionRange> {
        self.queries
            .lock()
            .unwrap()
            .push((lower_exclusive.cloned(), upper_inclusive.clone()));

        let end = self.position(upper_inclusive)? + 1;
        let start = match lower_exclusive {
            Some(lower) => self.position(lower)? + 1,
            None => 0,
        };
        if start >= end {
            return Ok(RevisionRange::empty());
        }
        RevisionRange::from_ascending(self.history[start..end].to_vec())
    }
}

// ---------------------------------------------------------------------------
// RecordingCheckout
// ---------------------------------------------------------------------------

/// Checkout that only records the revisions it was asked for.
#[derive(Debug, Default)]
pub struct RecordingCheckout {
    checked_out: Mutex<Vec<Revision>>,
    fail_on: Option<Revision>,
}

impl RecordingCheckout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `RevhuntError::Checkout` when asked for `revision`.
    pub fn failing_on(revision: impl Into<String>) -> Self {
        Self {
            checked_out: Mutex::new(Vec::new()),
            fail_on: Some(Revision::new(revision)),
        }
    }

    pub fn checked_out(&self) -> Vec<Revision> {
        self.checked_out.lock().unwrap().clone()
    }
}

#[async_trait]
impl Checkout for RecordingCheckout {
    async fn checkout(&self, revision: &Revision) -> Result<()> {
        if self.fail_on.as_ref() == Some(revision) {
            return Err(RevhuntError::Checkout {
                revision: revision.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.checked_out.lock().unwrap().push(revision.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryBuildLedger
// ---------------------------------------------------------------------------

/// In-memory build ledger.
///
/// `list_builds` returns every stored build regardless of the query (the
/// query is recorded for assertions). `create_build` appends a build in the
/// `scheduled` state numbered after the highest existing build.
#[derive(Debug, Default)]
pub struct MemoryBuildLedger {
    builds: Mutex<Vec<BuildRecord>>,
    queries: Mutex<Vec<BuildQuery>>,
    created: Mutex<Vec<NewBuild>>,
    fail_create_on: Option<Revision>,
}

impl MemoryBuildLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builds(builds: Vec<BuildRecord>) -> Self {
        Self {
            builds: Mutex::new(builds),
            ..Self::default()
        }
    }

    /// Make `create_build` fail for `revision`.
    pub fn fail_create_on(mut self, revision: impl Into<String>) -> Self {
        self.fail_create_on = Some(Revision::new(revision));
        self
    }

    pub fn queries(&self) -> Vec<BuildQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewBuild> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildLedger for MemoryBuildLedger {
    async fn list_builds(&self, query: &BuildQuery) -> Result<Vec<BuildRecord>> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.builds.lock().unwrap().clone())
    }

    async fn create_build(&self, request: &NewBuild) -> Result<u64> {
        if self.fail_create_on.as_ref() == Some(&request.commit) {
            return Err(RevhuntError::Ledger(format!(
                "injected create failure for {}",
                request.commit
            )));
        }

        let mut builds = self.builds.lock().unwrap();
        let number = builds.iter().map(|b| b.number).max().unwrap_or(0) + 1;
        builds.push(BuildRecord {
            number,
            state: BuildState::Other("scheduled".to_string()),
            commit: request.commit.clone(),
        });
        self.created.lock().unwrap().push(request.clone());
        Ok(number)
    }
}
