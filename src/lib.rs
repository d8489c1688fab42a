// ============================================================================
// storesync Library
// ============================================================================

pub mod config;
pub mod core;
pub mod store;
pub mod sync;

// Re-export main types for convenience
pub use crate::config::SyncConfig;
pub use crate::core::{
    CatalogTerm, Classification, CreateAttribute, EntityProfile, PrimaryRecord, RemoteError,
    RemoteErrorKind, ResolveError, Result, StoreKind, SyncError, SyncErrorKind, SyncOutcome,
    SyncStatus, derive_slug,
};
pub use crate::store::{
    CatalogStore, ContentStore, HttpCatalogStore, HttpContentStore, InMemoryCatalogStore,
    InMemoryContentStore, ListQuery, StoreOp,
};
pub use crate::sync::{ConflictReconciler, Resolver, Saga, SagaStep, SyncEngine};

/// Builds an engine over fresh in-memory stores.
///
/// Handy for local experiments and tests; the stores are returned so callers
/// can seed classifications and inspect state.
///
/// # Examples
///
/// ```
/// use storesync::{CreateAttribute, EntityProfile, SyncConfig, in_memory_engine};
///
/// # tokio_test::block_on(async {
/// let (engine, content, catalog) = in_memory_engine(&SyncConfig::default());
/// catalog.add_classification("pa_literary-work", "Literary Work").await;
///
/// let outcome = engine
///     .synchronize_create(
///         &EntityProfile::literary_work(),
///         CreateAttribute::named("Detective Stories"),
///     )
///     .await
///     .unwrap();
///
/// let record = content.record("works", &outcome.stable_id).await.unwrap();
/// assert_eq!(record.external_ref, Some(outcome.external_id));
/// # });
/// ```
pub fn in_memory_engine(
    config: &SyncConfig,
) -> (
    SyncEngine,
    std::sync::Arc<InMemoryContentStore>,
    std::sync::Arc<InMemoryCatalogStore>,
) {
    let content = std::sync::Arc::new(InMemoryContentStore::new());
    let catalog = std::sync::Arc::new(InMemoryCatalogStore::new());
    let engine = SyncEngine::new(config, content.clone(), catalog.clone());
    (engine, content, catalog)
}
