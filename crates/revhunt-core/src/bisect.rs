//! Regression bisection over an ordered revision range.
//!
//! Given a known-good and a known-bad revision, the [`Bisector`] lists the
//! revisions after the good one up to and including the bad one, then binary
//! searches them with a [`Validator`] to find the first bad revision.
//!
//! The search assumes monotonicity: once a revision is bad, every later
//! revision is bad. Flaky or non-monotonic failures are not detected; the
//! search still terminates but the blamed revision may be wrong.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use crate::capabilities::{RevisionRangeProvider, Validator};
use crate::domain::{Result, Revision};
use crate::obs::{
    emit_bisect_started, emit_bisect_step, emit_blame_found, emit_no_blame,
    emit_revision_validated, RunSpan,
};

/// Result of a bisection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BisectOutcome {
    /// First bad revision, or `None` when the range was too short to bisect.
    pub blamed: Option<Revision>,
    /// Number of revisions in the initial range.
    pub range_len: usize,
    /// Number of validator invocations.
    pub validations: usize,
}

/// Finds the revision that introduced a test regression.
pub struct Bisector {
    test: String,
    passing_revision: Revision,
    failing_revision: Revision,
    revisions: Arc<dyn RevisionRangeProvider>,
    validator: Arc<dyn Validator>,
}

impl Bisector {
    pub fn new(
        test: impl Into<String>,
        passing_revision: Revision,
        failing_revision: Revision,
        revisions: Arc<dyn RevisionRangeProvider>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            test: test.into(),
            passing_revision,
            failing_revision,
            revisions,
            validator,
        }
    }

    pub fn test(&self) -> &str {
        &self.test
    }

    /// Find the blamed revision, or `None` if fewer than two revisions
    /// separate the passing and failing revisions.
    pub async fn run(&self) -> Result<Option<Revision>> {
        Ok(self.run_detailed().await?.blamed)
    }

    /// Like [`Bisector::run`], also reporting range size and validator calls.
    pub async fn run_detailed(&self) -> Result<BisectOutcome> {
        let run = RunSpan::new("bisect");
        self.bisect().instrument(run.span()).await
    }

    async fn bisect(&self) -> Result<BisectOutcome> {
        let range = self
            .revisions
            .list_revisions(Some(&self.passing_revision), &self.failing_revision)
            .await?;
        let revisions = range.as_slice();
        emit_bisect_started(
            &self.test,
            &self.passing_revision,
            &self.failing_revision,
            revisions.len(),
        );

        if revisions.len() < 2 {
            emit_no_blame(revisions.len());
            return Ok(BisectOutcome {
                blamed: None,
                range_len: revisions.len(),
                validations: 0,
            });
        }

        // Candidates are revisions[good..=bad]. Everything before `good` is
        // known good (the passing revision sits just before index 0) and
        // revisions[bad] is known bad (initially the failing revision).
        let mut good = 0;
        let mut bad = revisions.len() - 1;
        let mut validations = 0;

        while good < bad {
            emit_bisect_step(bad - good + 1, &revisions[good], &revisions[bad]);
            let mid = good + (bad - good) / 2;
            let passed = self.validator.validate(&revisions[mid]).await?;
            validations += 1;
            emit_revision_validated(&revisions[mid], passed);

            if passed {
                good = mid + 1;
            } else {
                bad = mid;
            }
        }

        let blamed = revisions[bad].clone();
        emit_blame_found(&blamed, validations);
        Ok(BisectOutcome {
            blamed: Some(blamed),
            range_len: revisions.len(),
            validations,
        })
    }
}
