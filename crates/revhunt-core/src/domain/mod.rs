//! Domain models for revhunt.
//!
//! Canonical definitions for the core entities:
//! - `Revision` / `RevisionRange`: points in source history and ordered spans of them
//! - `BuildRecord`: a build as reported by the build ledger
//! - `RevhuntError`: tooling failures that abort a run

pub mod build;
pub mod error;
pub mod revision;

pub use build::{latest_in_state, BuildQuery, BuildRecord, BuildState, NewBuild};
pub use error::{Result, RevhuntError};
pub use revision::{Revision, RevisionRange};
