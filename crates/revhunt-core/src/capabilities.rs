//! Capability traits for the external collaborators of bisection and gap filling.
//!
//! - `RevisionRangeProvider`: ordered revision listing (version control)
//! - `Checkout`: move the working tree to a revision
//! - `Validator`: decide whether the system under test is good at a revision
//! - `BuildLedger`: list and create builds on the build service
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;

use crate::domain::{BuildQuery, BuildRecord, NewBuild, Result, Revision, RevisionRange};

/// Ordered revision listing.
#[async_trait]
pub trait RevisionRangeProvider: Send + Sync {
    /// List revisions after `lower_exclusive` up to and including
    /// `upper_inclusive`, oldest first.
    ///
    /// `None` for the lower bound means "all history up to the upper bound".
    async fn list_revisions(
        &self,
        lower_exclusive: Option<&Revision>,
        upper_inclusive: &Revision,
    ) -> Result<RevisionRange>;
}

/// Moves a working tree to a revision.
#[async_trait]
pub trait Checkout: Send + Sync {
    async fn checkout(&self, revision: &Revision) -> Result<()>;
}

/// Decides whether the system under test behaves correctly at a revision.
///
/// `Ok(true)` means good, `Ok(false)` means the failure reproduces. `Err` is
/// reserved for tooling failures (checkout or test harness broke) and aborts
/// the bisection. Implementations own whatever checkout they need and must
/// be repeatable per revision.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, revision: &Revision) -> Result<bool>;
}

/// Build service ledger: past builds and build creation.
#[async_trait]
pub trait BuildLedger: Send + Sync {
    /// All builds matching the query, in any order.
    async fn list_builds(&self, query: &BuildQuery) -> Result<Vec<BuildRecord>>;

    /// Request a new build and return its build number.
    async fn create_build(&self, request: &NewBuild) -> Result<u64>;
}

/// Validator backed by a plain closure.
///
/// Handy when the predicate lives in-process (tests, embedding).
pub struct FnValidator<F> {
    predicate: F,
}

impl<F> FnValidator<F>
where
    F: Fn(&Revision) -> Result<bool> + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&Revision) -> Result<bool> + Send + Sync,
{
    async fn validate(&self, revision: &Revision) -> Result<bool> {
        (self.predicate)(revision)
    }
}
