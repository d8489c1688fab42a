//! Seams to the two external systems.
//!
//! The engine only talks to stores through these traits, so HTTP clients and
//! in-memory doubles are interchangeable.

use async_trait::async_trait;

use crate::core::{
    CatalogTerm, Classification, PrimaryRecord, RecordDraft, RemoteError, TermCreation, TermDraft,
};

pub mod http;
pub mod memory;

pub use http::{HttpCatalogStore, HttpContentStore};
pub use memory::{InMemoryCatalogStore, InMemoryContentStore, StoreOp};

/// Filter for collection listings. Empty filters mean "everything, up to `limit`".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub slug: Option<String>,
    pub id: Option<u64>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            ..Self::default()
        }
    }

    pub fn by_id(id: u64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn all(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// Content store holding the canonical `PrimaryRecord`s.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_record(
        &self,
        collection: &str,
        draft: &RecordDraft,
    ) -> Result<PrimaryRecord, RemoteError>;

    async fn set_external_ref(
        &self,
        collection: &str,
        stable_id: &str,
        external_ref: u64,
    ) -> Result<(), RemoteError>;

    async fn delete_record(&self, collection: &str, stable_id: &str) -> Result<(), RemoteError>;

    /// Direct fetch by stable id; `None` when the store reports the record missing.
    async fn fetch_record(
        &self,
        collection: &str,
        stable_id: &str,
    ) -> Result<Option<PrimaryRecord>, RemoteError>;

    /// Exact-match filter on the numeric surrogate key.
    async fn query_records(
        &self,
        collection: &str,
        numeric_id: u64,
    ) -> Result<Vec<PrimaryRecord>, RemoteError>;

    async fn list_records(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<PrimaryRecord>, RemoteError>;
}

/// Catalog store holding classifications and their terms.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_classifications(
        &self,
        query: &ListQuery,
    ) -> Result<Vec<Classification>, RemoteError>;

    /// Creates a term; a duplicate slug comes back as `TermCreation::Conflict`.
    async fn create_term(
        &self,
        classification_id: u64,
        draft: &TermDraft,
    ) -> Result<TermCreation, RemoteError>;

    async fn fetch_term(
        &self,
        classification_id: u64,
        term_id: u64,
    ) -> Result<Option<CatalogTerm>, RemoteError>;

    async fn list_terms(
        &self,
        classification_id: u64,
        query: &ListQuery,
    ) -> Result<Vec<CatalogTerm>, RemoteError>;
}
