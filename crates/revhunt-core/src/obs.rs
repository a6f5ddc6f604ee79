//! Structured observability hooks for bisection and gap-filling runs.
//!
//! This module provides:
//! - Run-scoped tracing spans via `RunSpan` RAII guard
//! - Emission functions for key events: bisection steps, blame, gap detection, scheduling
//!
//! Events are emitted at `info!` level (configurable via `RUST_LOG`).
//! For JSON output, pass `json = true` to [`crate::init_tracing`].

use tracing::info;

use crate::domain::Revision;

/// Run-scoped tracing span tagged with a fresh run id.
///
/// Attach it to the run's future so every event inside carries the id:
///
/// ```ignore
/// let run = RunSpan::new("bisect");
/// do_bisect().instrument(run.span()).await
/// // events carry kind = "bisect", run_id = "<uuid>"
/// ```
#[derive(Debug, Clone)]
pub struct RunSpan {
    run_id: String,
    span: tracing::Span,
}

impl RunSpan {
    /// Create a span tagged with the run kind and a new v4 run id.
    pub fn new(kind: &str) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("revhunt.run", kind = %kind, run_id = %run_id);
        Self { run_id, span }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }
}

/// Emit event: bisection started over a range of `range_len` revisions.
pub fn emit_bisect_started(test: &str, passing: &Revision, failing: &Revision, range_len: usize) {
    info!(
        event = "bisect.started",
        test = %test,
        passing = %passing,
        failing = %failing,
        range_len = range_len,
    );
}

/// Emit event: one narrowing step over the remaining candidates.
pub fn emit_bisect_step(remaining: usize, first: &Revision, last: &Revision) {
    info!(
        event = "bisect.step",
        remaining = remaining,
        "Bisecting between {} revisions: {} to {}",
        remaining,
        first,
        last
    );
}

/// Emit event: validator verdict for a revision.
pub fn emit_revision_validated(revision: &Revision, good: bool) {
    info!(event = "bisect.validated", revision = %revision, good = good);
}

/// Emit event: bisection finished with a blamed revision.
pub fn emit_blame_found(revision: &Revision, validations: usize) {
    info!(
        event = "bisect.blame_found",
        revision = %revision,
        validations = validations,
    );
}

/// Emit event: bisection could not narrow anything.
pub fn emit_no_blame(range_len: usize) {
    info!(event = "bisect.no_blame", range_len = range_len, "Not enough revisions to bisect");
}

/// Emit event: gap between latest passing and latest failing builds.
pub fn emit_gap_detected(passing: &Revision, failing: &Revision, gap_len: usize) {
    info!(
        event = "gap.detected",
        passing = %passing,
        failing = %failing,
        gap_len = gap_len,
    );
}

/// Emit event: nothing to fill (missing boundary build or empty gap).
pub fn emit_no_gap(reason: &str) {
    info!(event = "gap.none", reason = %reason);
}

/// Emit event: gap-filling build requested (or only reported in dry-run).
pub fn emit_gap_build_scheduled(revision: &Revision, build_number: Option<u64>) {
    match build_number {
        Some(number) => info!(
            event = "gap.build_scheduled",
            revision = %revision,
            build_number = number,
            "Gap filling build created with number {}",
            number
        ),
        None => info!(
            event = "gap.build_dry_run",
            revision = %revision,
            "Would schedule gap filling build for commit {}",
            revision
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_bisect_step_logs_human_readable_message() {
        emit_bisect_step(5, &Revision::new("aaa"), &Revision::new("eee"));
        assert!(logs_contain("Bisecting between 5 revisions: aaa to eee"));
    }

    #[traced_test]
    #[test]
    fn test_gap_build_scheduled_logs_number() {
        emit_gap_build_scheduled(&Revision::new("222"), Some(42));
        assert!(logs_contain("gap.build_scheduled"));
        assert!(logs_contain("42"));
    }

    #[traced_test]
    #[test]
    fn test_gap_build_dry_run_logs_revision() {
        emit_gap_build_scheduled(&Revision::new("333"), None);
        assert!(logs_contain("gap.build_dry_run"));
        assert!(logs_contain("333"));
    }

    #[test]
    fn test_run_span_ids_are_unique() {
        let a = RunSpan::new("bisect");
        let b = RunSpan::new("bisect");
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 36);
    }
}
