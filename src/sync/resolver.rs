//! Locates an entity when the caller's identifier kind is unknown.
//!
//! Strategies run in order and stop at the first verified match:
//! direct fetch by stable id, exact-match filter on the numeric key, then a
//! bounded scan compared in memory (optionally falling back to the display
//! name). Results coming back from remote filters are re-checked, because
//! store filter semantics are not trusted.

use async_trait::async_trait;
use tracing::{Level, event};

use crate::core::{
    CatalogTerm, Classification, PrimaryRecord, RemoteError, ResolveError,
};
use crate::store::{CatalogStore, ContentStore, ListQuery};

/// Catalog prefix some stores put in front of classification codes.
const CLASSIFICATION_PREFIX: &str = "pa_";

/// Identity predicates of an entity, one per identifier kind.
pub trait Resolvable {
    fn matches_stable(&self, id: &str) -> bool;
    fn matches_numeric(&self, id: u64) -> bool;
    fn matches_name(&self, _name: &str) -> bool {
        false
    }
}

impl Resolvable for PrimaryRecord {
    fn matches_stable(&self, id: &str) -> bool {
        self.stable_id == id
    }

    fn matches_numeric(&self, id: u64) -> bool {
        self.numeric_id == Some(id)
    }

    fn matches_name(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

impl Resolvable for Classification {
    fn matches_stable(&self, id: &str) -> bool {
        normalize_code(&self.slug) == normalize_code(id)
    }

    fn matches_numeric(&self, id: u64) -> bool {
        self.id == id
    }

    fn matches_name(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

impl Resolvable for CatalogTerm {
    fn matches_stable(&self, id: &str) -> bool {
        self.slug == id
    }

    fn matches_numeric(&self, id: u64) -> bool {
        self.id == id
    }

    fn matches_name(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

fn normalize_code(code: &str) -> String {
    let code = code.trim().to_lowercase();
    match code.strip_prefix(CLASSIFICATION_PREFIX) {
        Some(stripped) => stripped.to_string(),
        None => code,
    }
}

fn same_name(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// The three access paths of one store collection.
#[async_trait]
pub trait Lookup: Send + Sync {
    type Entity: Resolvable + Send;

    /// Collection label for logs.
    fn label(&self) -> &str;

    async fn fetch_stable(&self, id: &str) -> Result<Option<Self::Entity>, RemoteError>;

    async fn query_numeric(&self, id: u64) -> Result<Vec<Self::Entity>, RemoteError>;

    async fn scan(&self, limit: usize) -> Result<Vec<Self::Entity>, RemoteError>;
}

/// Content-store records of one collection.
pub struct RecordLookup<'a> {
    pub store: &'a dyn ContentStore,
    pub collection: &'a str,
}

#[async_trait]
impl<'a> Lookup for RecordLookup<'a> {
    type Entity = PrimaryRecord;

    fn label(&self) -> &str {
        self.collection
    }

    async fn fetch_stable(&self, id: &str) -> Result<Option<PrimaryRecord>, RemoteError> {
        self.store.fetch_record(self.collection, id).await
    }

    async fn query_numeric(&self, id: u64) -> Result<Vec<PrimaryRecord>, RemoteError> {
        self.store.query_records(self.collection, id).await
    }

    async fn scan(&self, limit: usize) -> Result<Vec<PrimaryRecord>, RemoteError> {
        self.store.list_records(self.collection, limit).await
    }
}

/// Catalog classifications. The stable id is the classification code.
pub struct ClassificationLookup<'a> {
    pub store: &'a dyn CatalogStore,
}

#[async_trait]
impl<'a> Lookup for ClassificationLookup<'a> {
    type Entity = Classification;

    fn label(&self) -> &str {
        "classifications"
    }

    async fn fetch_stable(&self, id: &str) -> Result<Option<Classification>, RemoteError> {
        let found = self
            .store
            .list_classifications(&ListQuery::by_slug(id))
            .await?;
        Ok(found.into_iter().find(|c| c.matches_stable(id)))
    }

    async fn query_numeric(&self, id: u64) -> Result<Vec<Classification>, RemoteError> {
        self.store.list_classifications(&ListQuery::by_id(id)).await
    }

    async fn scan(&self, limit: usize) -> Result<Vec<Classification>, RemoteError> {
        self.store.list_classifications(&ListQuery::all(limit)).await
    }
}

/// Terms of one classification. The stable id is the term slug.
pub struct TermLookup<'a> {
    pub store: &'a dyn CatalogStore,
    pub classification_id: u64,
}

#[async_trait]
impl<'a> Lookup for TermLookup<'a> {
    type Entity = CatalogTerm;

    fn label(&self) -> &str {
        "terms"
    }

    async fn fetch_stable(&self, id: &str) -> Result<Option<CatalogTerm>, RemoteError> {
        let found = self
            .store
            .list_terms(self.classification_id, &ListQuery::by_slug(id))
            .await?;
        Ok(found.into_iter().find(|t| t.matches_stable(id)))
    }

    async fn query_numeric(&self, id: u64) -> Result<Vec<CatalogTerm>, RemoteError> {
        let term = self.store.fetch_term(self.classification_id, id).await?;
        Ok(term.into_iter().collect())
    }

    async fn scan(&self, limit: usize) -> Result<Vec<CatalogTerm>, RemoteError> {
        self.store
            .list_terms(self.classification_id, &ListQuery::all(limit))
            .await
    }
}

/// Runs the lookup cascade with a bounded scan.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    scan_limit: usize,
}

fn strategy_failed(label: &str, strategy: &'static str, err: &RemoteError) {
    event!(
        Level::DEBUG,
        collection = %label,
        strategy,
        error = %err,
        "resolver strategy failed"
    );
}

impl Resolver {
    pub fn new(scan_limit: usize) -> Self {
        Self {
            scan_limit: scan_limit.max(1),
        }
    }

    pub fn scan_limit(&self) -> usize {
        self.scan_limit
    }

    /// Resolves `id` by identifier only.
    pub async fn resolve<L>(&self, lookup: &L, id: &str) -> Result<L::Entity, ResolveError>
    where
        L: Lookup + ?Sized,
    {
        self.run(lookup, id, None).await
    }

    /// Resolves `id`, matching `name` against the scan when no identifier matched.
    pub async fn resolve_with_name<L>(
        &self,
        lookup: &L,
        id: &str,
        name: &str,
    ) -> Result<L::Entity, ResolveError>
    where
        L: Lookup + ?Sized,
    {
        self.run(lookup, id, Some(name)).await
    }

    async fn run<L>(
        &self,
        lookup: &L,
        id: &str,
        name: Option<&str>,
    ) -> Result<L::Entity, ResolveError>
    where
        L: Lookup + ?Sized,
    {
        let id = id.trim();
        let label = lookup.label();

        if !id.is_empty() {
            match lookup.fetch_stable(id).await {
                Ok(Some(entity)) if entity.matches_stable(id) => {
                    event!(Level::DEBUG, collection = %label, id, "resolved by stable fetch");
                    return Ok(entity);
                }
                Ok(_) => {}
                Err(err) => strategy_failed(label, "stable_fetch", &err),
            }
        }

        let numeric = id.parse::<u64>().ok();
        if let Some(numeric) = numeric {
            match lookup.query_numeric(numeric).await {
                Ok(candidates) => {
                    if let Some(entity) = candidates.into_iter().find(|e| e.matches_numeric(numeric))
                    {
                        event!(Level::DEBUG, collection = %label, id, "resolved by filtered query");
                        return Ok(entity);
                    }
                }
                Err(err) => strategy_failed(label, "filtered_query", &err),
            }
        }

        // Filters are not trusted to prove absence; only a completed scan can.
        let mut candidates = match lookup.scan(self.scan_limit).await {
            Ok(candidates) => candidates,
            Err(source) => {
                strategy_failed(label, "scan", &source);
                return Err(ResolveError::Unavailable {
                    id: id.to_string(),
                    source,
                });
            }
        };

        let by_id = candidates.iter().position(|e| {
            (!id.is_empty() && e.matches_stable(id))
                || numeric.is_some_and(|n| e.matches_numeric(n))
        });
        if let Some(index) = by_id {
            event!(Level::DEBUG, collection = %label, id, "resolved by scan");
            return Ok(candidates.swap_remove(index));
        }
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            if let Some(index) = candidates.iter().position(|e| e.matches_name(name)) {
                event!(Level::DEBUG, collection = %label, id, name, "resolved by name");
                return Ok(candidates.swap_remove(index));
            }
        }

        Err(ResolveError::NotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StoreKind;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: String,
        number: u64,
        title: String,
    }

    impl Resolvable for Item {
        fn matches_stable(&self, id: &str) -> bool {
            self.key == id
        }
        fn matches_numeric(&self, id: u64) -> bool {
            self.number == id
        }
        fn matches_name(&self, name: &str) -> bool {
            self.title == name
        }
    }

    /// Scripted lookup: each strategy returns a fixed answer and is logged.
    struct Scripted {
        stable: Result<Option<Item>, RemoteError>,
        filtered: Result<Vec<Item>, RemoteError>,
        scanned: Result<Vec<Item>, RemoteError>,
        log: Mutex<Vec<&'static str>>,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                stable: Ok(None),
                filtered: Ok(Vec::new()),
                scanned: Ok(Vec::new()),
                log: Mutex::new(Vec::new()),
            }
        }

        fn log(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Lookup for Scripted {
        type Entity = Item;

        fn label(&self) -> &str {
            "items"
        }

        async fn fetch_stable(&self, _id: &str) -> Result<Option<Item>, RemoteError> {
            self.log.lock().unwrap().push("stable");
            self.stable.clone()
        }

        async fn query_numeric(&self, _id: u64) -> Result<Vec<Item>, RemoteError> {
            self.log.lock().unwrap().push("filtered");
            self.filtered.clone()
        }

        async fn scan(&self, _limit: usize) -> Result<Vec<Item>, RemoteError> {
            self.log.lock().unwrap().push("scan");
            self.scanned.clone()
        }
    }

    fn item(key: &str, number: u64, title: &str) -> Item {
        Item {
            key: key.to_string(),
            number,
            title: title.to_string(),
        }
    }

    fn down() -> RemoteError {
        RemoteError::transport(StoreKind::Content, "probe", "connection refused")
    }

    #[tokio::test]
    async fn stable_fetch_short_circuits() {
        let mut lookup = Scripted::new();
        lookup.stable = Ok(Some(item("k1", 1, "One")));

        let found = Resolver::new(10).resolve(&lookup, "k1").await.unwrap();
        assert_eq!(found.key, "k1");
        assert_eq!(lookup.log(), vec!["stable"]);
    }

    #[tokio::test]
    async fn filtered_results_are_reverified() {
        let mut lookup = Scripted::new();
        // A filter that ignores its argument returns unrelated rows first.
        lookup.filtered = Ok(vec![item("k1", 1, "One"), item("k7", 7, "Seven")]);

        let found = Resolver::new(10).resolve(&lookup, "7").await.unwrap();
        assert_eq!(found.key, "k7");
        assert_eq!(lookup.log(), vec!["stable", "filtered"]);
    }

    #[tokio::test]
    async fn non_numeric_ids_skip_the_filter() {
        let mut lookup = Scripted::new();
        lookup.scanned = Ok(vec![item("abc", 3, "Three")]);

        let found = Resolver::new(10).resolve(&lookup, "abc").await.unwrap();
        assert_eq!(found.number, 3);
        assert_eq!(lookup.log(), vec!["stable", "scan"]);
    }

    #[tokio::test]
    async fn strategy_errors_fall_through_to_scan() {
        let mut lookup = Scripted::new();
        lookup.stable = Err(down());
        lookup.filtered = Err(down());
        lookup.scanned = Ok(vec![item("k9", 9, "Nine")]);

        let found = Resolver::new(10).resolve(&lookup, "9").await.unwrap();
        assert_eq!(found.key, "k9");
    }

    #[tokio::test]
    async fn name_fallback_only_when_no_identifier_matches() {
        let mut lookup = Scripted::new();
        lookup.scanned = Ok(vec![item("genre", 2, "Genre"), item("work", 5, "Work")]);

        let resolver = Resolver::new(10);
        let by_name = resolver
            .resolve_with_name(&lookup, "missing-code", "Work")
            .await
            .unwrap();
        assert_eq!(by_name.key, "work");

        let by_code = resolver
            .resolve_with_name(&lookup, "genre", "Work")
            .await
            .unwrap();
        assert_eq!(by_code.key, "genre");

        let err = resolver.resolve(&lookup, "missing-code").await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::NotFound {
                id: "missing-code".to_string()
            }
        );
    }

    #[tokio::test]
    async fn failed_scan_is_unavailable_even_after_a_filter_answered() {
        let mut lookup = Scripted::new();
        lookup.scanned = Err(down());

        let err = Resolver::new(10).resolve(&lookup, "7").await.unwrap_err();
        assert!(matches!(err, ResolveError::Unavailable { .. }));
        assert_eq!(lookup.log(), vec!["stable", "filtered", "scan"]);

        let mut everything_down = Scripted::new();
        everything_down.stable = Err(down());
        everything_down.scanned = Err(down());
        let err = Resolver::new(10)
            .resolve(&everything_down, "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn completed_scan_without_match_is_not_found() {
        let mut lookup = Scripted::new();
        lookup.stable = Err(down());
        lookup.filtered = Err(down());

        let err = Resolver::new(10).resolve(&lookup, "7").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
    }

    #[test]
    fn classification_codes_ignore_catalog_prefix() {
        let classification = Classification {
            id: 4,
            slug: "pa_literary-work".to_string(),
            name: "Literary Work".to_string(),
        };
        assert!(classification.matches_stable("literary-work"));
        assert!(classification.matches_stable("PA_literary-work"));
        assert!(!classification.matches_stable("author"));
        assert!(classification.matches_name(" literary work "));
    }
}
