//! Gap-filling build scheduler.
//!
//! When a pipeline's latest build is failing, the revisions between the last
//! passing build and the last failing build were usually skipped by the build
//! service. The [`GapFillingScheduler`] finds them and requests a build for
//! each, oldest first, so the breaking revision can be pinned down.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::capabilities::{BuildLedger, RevisionRangeProvider};
use crate::domain::{
    latest_in_state, BuildQuery, BuildRecord, BuildState, NewBuild, Result, RevhuntError,
    Revision,
};
use crate::obs::{emit_gap_build_scheduled, emit_gap_detected, emit_no_gap, RunSpan};

/// Branch builds are listed from and scheduled on by default.
pub const DEFAULT_BRANCH: &str = "master";

/// Default lookback window for the build listing, in days.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 1;

/// Longest accepted lookback window, in days.
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

/// Which pipeline to inspect and how far back to look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapFillConfig {
    pub organization: String,
    pub pipeline: String,
    /// Primary branch: builds are listed and created on it.
    pub branch: String,
    pub lookback_days: i64,
}

impl GapFillConfig {
    pub fn new(organization: impl Into<String>, pipeline: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            pipeline: pipeline.into(),
            branch: DEFAULT_BRANCH.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }
}

/// One gap revision and the build requested for it (`None` in dry-run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledGapBuild {
    pub revision: Revision,
    pub build_number: Option<u64>,
}

/// Latest passing and latest failing builds of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildBoundaries {
    pub latest_passing: BuildRecord,
    pub latest_failing: BuildRecord,
}

impl BuildBoundaries {
    /// `None` unless the listing has at least one passing and one failing build.
    pub fn from_builds(builds: &[BuildRecord]) -> Option<Self> {
        let latest_failing = latest_in_state(builds, &BuildState::Failed)?.clone();
        let latest_passing = latest_in_state(builds, &BuildState::Passed)?.clone();
        Some(Self {
            latest_passing,
            latest_failing,
        })
    }
}

/// Schedules builds for revisions that were never built.
pub struct GapFillingScheduler {
    config: GapFillConfig,
    ledger: Arc<dyn BuildLedger>,
    revisions: Arc<dyn RevisionRangeProvider>,
}

impl GapFillingScheduler {
    pub fn new(
        config: GapFillConfig,
        ledger: Arc<dyn BuildLedger>,
        revisions: Arc<dyn RevisionRangeProvider>,
    ) -> Self {
        Self {
            config,
            ledger,
            revisions,
        }
    }

    pub fn config(&self) -> &GapFillConfig {
        &self.config
    }

    /// Request a build for every gap revision, oldest first.
    ///
    /// With `dry_run` the gap is computed and reported but no build is
    /// created. A creation failure halts the remaining revisions.
    pub async fn run(&self, dry_run: bool) -> Result<Vec<ScheduledGapBuild>> {
        let run = RunSpan::new("gap_fill");
        self.schedule(dry_run).instrument(run.span()).await
    }

    async fn schedule(&self, dry_run: bool) -> Result<Vec<ScheduledGapBuild>> {
        let gap = self.gap_revisions().await?;
        if gap.is_empty() {
            return Ok(Vec::new());
        }

        let mut scheduled = Vec::with_capacity(gap.len());
        for revision in gap {
            tracing::info!(
                revision = %revision,
                "Scheduling gap filling build for commit {}",
                revision
            );
            let build_number = if dry_run {
                None
            } else {
                Some(self.create_build(&revision).await?)
            };
            emit_gap_build_scheduled(&revision, build_number);
            scheduled.push(ScheduledGapBuild {
                revision,
                build_number,
            });
        }
        Ok(scheduled)
    }

    /// Revisions strictly between the latest passing and latest failing builds.
    pub async fn gap_revisions(&self) -> Result<Vec<Revision>> {
        let builds = self.recent_builds().await?;
        let Some(boundaries) = BuildBoundaries::from_builds(&builds) else {
            emit_no_gap("no recent passing and failing builds");
            return Ok(Vec::new());
        };

        let passing = &boundaries.latest_passing.commit;
        let failing = &boundaries.latest_failing.commit;
        let gap = self
            .revisions
            .list_revisions(Some(passing), failing)
            .await?
            .without_trailing(failing)
            .into_vec();

        if gap.is_empty() {
            emit_no_gap("latest passing and failing builds are adjacent");
        } else {
            emit_gap_detected(passing, failing, gap.len());
        }
        Ok(gap)
    }

    async fn recent_builds(&self) -> Result<Vec<BuildRecord>> {
        let query = BuildQuery {
            organization: self.config.organization.clone(),
            pipeline: self.config.pipeline.clone(),
            created_from: window_start(Utc::now(), self.config.lookback_days)?,
            branch: self.config.branch.clone(),
        };
        self.ledger.list_builds(&query).await
    }

    async fn create_build(&self, revision: &Revision) -> Result<u64> {
        let request = NewBuild {
            organization: self.config.organization.clone(),
            pipeline: self.config.pipeline.clone(),
            commit: revision.clone(),
            branch: self.config.branch.clone(),
        };
        self.ledger.create_build(&request).await
    }
}

/// Start of a lookback window of `days` days ending at `now`.
fn window_start(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    if !(1..=MAX_LOOKBACK_DAYS).contains(&days) {
        return Err(RevhuntError::InvalidWindow(format!(
            "lookback of {days} days is outside 1..={MAX_LOOKBACK_DAYS}"
        )));
    }
    Duration::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| RevhuntError::InvalidWindow(format!("lookback of {days} days overflows")))
}
