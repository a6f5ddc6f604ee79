//! revhunt Core Library
//!
//! Regression bisection and build gap filling for CI pipelines:
//! - [`Bisector`]: binary search for the revision that broke a test
//! - [`GapFillingScheduler`]: schedule builds for revisions skipped between
//!   the latest passing and latest failing builds
//!
//! Version control, the build service, and test execution are reached
//! through the traits in [`capabilities`].

pub mod bisect;
pub mod capabilities;
pub mod domain;
pub mod fakes;
pub mod gap_fill;
pub mod git;
pub mod obs;
pub mod telemetry;

pub use bisect::{BisectOutcome, Bisector};
pub use capabilities::{BuildLedger, Checkout, FnValidator, RevisionRangeProvider, Validator};
pub use domain::{
    latest_in_state, BuildQuery, BuildRecord, BuildState, NewBuild, Result, RevhuntError,
    Revision, RevisionRange,
};
pub use gap_fill::{
    BuildBoundaries, GapFillConfig, GapFillingScheduler, ScheduledGapBuild, DEFAULT_BRANCH,
    DEFAULT_LOOKBACK_DAYS, MAX_LOOKBACK_DAYS,
};
pub use git::{head_revision, GitCheckout, GitRevisionRange};
pub use obs::RunSpan;
pub use telemetry::init_tracing;

/// revhunt version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
