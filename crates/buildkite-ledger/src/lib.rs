//! buildkite-ledger: Buildkite build ledger for revhunt
//!
//! Implements [`revhunt_core::BuildLedger`] on top of the Buildkite v2 REST
//! API so the gap-filling scheduler can list recent builds of a pipeline and
//! request new ones.
//!
//! Configuration comes from `BUILDKITE_API_URL`, `BUILDKITE_API_TOKEN`, and
//! `BUILDKITE_PER_PAGE`, or from explicit [`BuildkiteConfig`] values.

pub mod client;
pub mod error;

use async_trait::async_trait;
use revhunt_core::{BuildLedger, BuildQuery, BuildRecord, NewBuild};

pub use client::{
    BuildkiteClient, BuildkiteConfig, DEFAULT_API_URL, DEFAULT_PER_PAGE, MAX_PER_PAGE,
};
pub use error::BuildkiteError;

/// Result type for Buildkite operations
pub type Result<T> = std::result::Result<T, BuildkiteError>;

#[async_trait]
impl BuildLedger for BuildkiteClient {
    async fn list_builds(&self, query: &BuildQuery) -> revhunt_core::Result<Vec<BuildRecord>> {
        Ok(self.list_all_for_pipeline(query).await?)
    }

    async fn create_build(&self, request: &NewBuild) -> revhunt_core::Result<u64> {
        Ok(BuildkiteClient::create_build(self, request).await?)
    }
}
