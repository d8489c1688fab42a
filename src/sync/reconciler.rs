use tracing::{Level, event};

use super::resolver::{Resolver, TermLookup};
use crate::core::{
    CatalogTerm, RemoteError, ResolveError, Result, StoreKind, SyncError, TermConflict,
};
use crate::store::CatalogStore;

/// Turns a duplicate-term answer from the catalog store into adoption of the
/// term that already owns the slug.
///
/// Slugs are derived deterministically, so retries and racing creates of the
/// same name collide on the same term; adopting it links the new record
/// without leaving near-duplicate terms behind.
pub struct ConflictReconciler<'a> {
    catalog: &'a dyn CatalogStore,
    resolver: Resolver,
}

impl<'a> ConflictReconciler<'a> {
    pub fn new(catalog: &'a dyn CatalogStore, resolver: Resolver) -> Self {
        Self { catalog, resolver }
    }

    /// Fetches the conflicting term directly by the id the store reported.
    ///
    /// A failed fetch is terminal. A 404 (stale id in the conflict payload)
    /// falls back to locating the term by its slug.
    pub async fn reconcile(
        &self,
        classification_id: u64,
        conflict: &TermConflict,
    ) -> Result<CatalogTerm> {
        let direct = self
            .catalog
            .fetch_term(classification_id, conflict.resource_id)
            .await?;

        if let Some(term) = direct {
            event!(
                Level::INFO,
                term_id = term.id,
                slug = %term.slug,
                "adopted existing catalog term"
            );
            return Ok(term);
        }

        event!(
            Level::WARN,
            resource_id = conflict.resource_id,
            slug = %conflict.slug,
            "conflicting term id not found, looking up by slug"
        );

        let lookup = TermLookup {
            store: self.catalog,
            classification_id,
        };
        match self.resolver.resolve(&lookup, &conflict.slug).await {
            Ok(term) => {
                event!(Level::INFO, term_id = term.id, "adopted catalog term by slug");
                Ok(term)
            }
            Err(ResolveError::Unavailable { source, .. }) => Err(SyncError::TransientRemote(source)),
            Err(ResolveError::NotFound { .. }) => Err(SyncError::TransientRemote(RemoteError::status(
                StoreKind::Catalog,
                "reconcile_term",
                404,
                format!(
                    "term {} reported as conflicting is not retrievable",
                    conflict.resource_id
                ),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TermCreation, TermDraft};
    use crate::store::{InMemoryCatalogStore, StoreOp};

    fn draft(slug: &str) -> TermDraft {
        TermDraft {
            name: "Detective Stories".to_string(),
            slug: slug.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn adopts_the_reported_term() {
        let catalog = InMemoryCatalogStore::new();
        let axis = catalog.add_classification("pa_literary-work", "Literary Work").await;
        let existing = catalog.insert_term(axis.id, &draft("detective-stories")).await;

        let TermCreation::Conflict(conflict) = catalog
            .create_term(axis.id, &draft("detective-stories"))
            .await
            .unwrap()
        else {
            panic!("expected conflict");
        };

        let reconciler = ConflictReconciler::new(&catalog, Resolver::new(100));
        let adopted = reconciler.reconcile(axis.id, &conflict).await.unwrap();
        assert_eq!(adopted, existing);
    }

    #[tokio::test]
    async fn stale_resource_id_falls_back_to_slug() {
        let catalog = InMemoryCatalogStore::new();
        let axis = catalog.add_classification("pa_literary-work", "Literary Work").await;
        let existing = catalog.insert_term(axis.id, &draft("detective-stories")).await;

        let conflict = TermConflict {
            resource_id: 9999,
            slug: "detective-stories".to_string(),
        };
        let reconciler = ConflictReconciler::new(&catalog, Resolver::new(100));
        let adopted = reconciler.reconcile(axis.id, &conflict).await.unwrap();
        assert_eq!(adopted.id, existing.id);
    }

    #[tokio::test]
    async fn failed_fetch_is_terminal() {
        let catalog = InMemoryCatalogStore::new();
        let axis = catalog.add_classification("pa_literary-work", "Literary Work").await;
        catalog.insert_term(axis.id, &draft("detective-stories")).await;
        catalog.fail_on(StoreOp::FetchTerm, 500).await;

        let conflict = TermConflict {
            resource_id: 2,
            slug: "detective-stories".to_string(),
        };
        let reconciler = ConflictReconciler::new(&catalog, Resolver::new(100));
        let err = reconciler.reconcile(axis.id, &conflict).await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(500));
        assert!(!catalog.calls().await.contains(&StoreOp::ListTerms));
    }

    #[tokio::test]
    async fn unknown_term_is_a_remote_error() {
        let catalog = InMemoryCatalogStore::new();
        let axis = catalog.add_classification("pa_literary-work", "Literary Work").await;

        let conflict = TermConflict {
            resource_id: 77,
            slug: "ghost".to_string(),
        };
        let reconciler = ConflictReconciler::new(&catalog, Resolver::new(100));
        let err = reconciler.reconcile(axis.id, &conflict).await.unwrap_err();
        assert!(matches!(err, SyncError::TransientRemote(_)));
    }
}
