use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{CatalogStore, ContentStore, ListQuery};
use crate::core::{
    CatalogTerm, Classification, PrimaryRecord, RecordDraft, RemoteError, StoreKind, TermConflict,
    TermCreation, TermDraft,
};

/// Remote operations of both stores, used for fault injection and call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreateRecord,
    SetExternalRef,
    DeleteRecord,
    FetchRecord,
    QueryRecords,
    ListRecords,
    ListClassifications,
    CreateTerm,
    FetchTerm,
    ListTerms,
}

impl StoreOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateRecord => "create_record",
            Self::SetExternalRef => "set_external_ref",
            Self::DeleteRecord => "delete_record",
            Self::FetchRecord => "fetch_record",
            Self::QueryRecords => "query_records",
            Self::ListRecords => "list_records",
            Self::ListClassifications => "list_classifications",
            Self::CreateTerm => "create_term",
            Self::FetchTerm => "fetch_term",
            Self::ListTerms => "list_terms",
        }
    }
}

/// Injected failures plus a log of every call made, shared by both doubles.
#[derive(Default)]
struct Faults {
    failing: Mutex<HashMap<StoreOp, u16>>,
    calls: Mutex<Vec<StoreOp>>,
}

impl Faults {
    async fn enter(&self, store: StoreKind, op: StoreOp) -> Result<(), RemoteError> {
        self.calls.lock().await.push(op);
        match self.failing.lock().await.get(&op) {
            Some(0) => Err(RemoteError::transport(
                store,
                op.name(),
                "injected connection failure",
            )),
            Some(status) => Err(RemoteError::status(
                store,
                op.name(),
                *status,
                "injected upstream failure",
            )),
            None => Ok(()),
        }
    }
}

/// In-memory content store.
///
/// Stable ids are UUIDs, numeric ids are assigned sequentially per store.
#[derive(Default)]
pub struct InMemoryContentStore {
    collections: RwLock<HashMap<String, Vec<PrimaryRecord>>>,
    next_numeric_id: AtomicU64,
    unreliable_filters: AtomicBool,
    faults: Faults,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `op` fail until cleared. Status `0` simulates a transport failure.
    pub async fn fail_on(&self, op: StoreOp, status: u16) {
        self.faults.failing.lock().await.insert(op, status);
    }

    pub async fn clear_failure(&self, op: StoreOp) {
        self.faults.failing.lock().await.remove(&op);
    }

    /// When set, filtered queries silently return nothing.
    pub fn set_unreliable_filters(&self, unreliable: bool) {
        self.unreliable_filters.store(unreliable, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<StoreOp> {
        self.faults.calls.lock().await.clone()
    }

    pub async fn records(&self, collection: &str) -> Vec<PrimaryRecord> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn record(&self, collection: &str, stable_id: &str) -> Option<PrimaryRecord> {
        self.records(collection)
            .await
            .into_iter()
            .find(|record| record.stable_id == stable_id)
    }

    fn allocate(&self, draft: &RecordDraft) -> PrimaryRecord {
        PrimaryRecord {
            stable_id: Uuid::new_v4().simple().to_string(),
            numeric_id: Some(self.next_numeric_id.fetch_add(1, Ordering::SeqCst) + 1),
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            description: draft.description.clone(),
            external_ref: None,
        }
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn create_record(
        &self,
        collection: &str,
        draft: &RecordDraft,
    ) -> Result<PrimaryRecord, RemoteError> {
        self.faults
            .enter(StoreKind::Content, StoreOp::CreateRecord)
            .await?;
        let record = self.allocate(draft);
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn set_external_ref(
        &self,
        collection: &str,
        stable_id: &str,
        external_ref: u64,
    ) -> Result<(), RemoteError> {
        self.faults
            .enter(StoreKind::Content, StoreOp::SetExternalRef)
            .await?;
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.stable_id == stable_id))
            .ok_or_else(|| {
                RemoteError::status(
                    StoreKind::Content,
                    StoreOp::SetExternalRef.name(),
                    404,
                    format!("record '{stable_id}' not found"),
                )
            })?;
        record.external_ref = Some(external_ref);
        Ok(())
    }

    async fn delete_record(&self, collection: &str, stable_id: &str) -> Result<(), RemoteError> {
        self.faults
            .enter(StoreKind::Content, StoreOp::DeleteRecord)
            .await?;
        let mut collections = self.collections.write().await;
        // Deleting an absent record is a no-op, matching the HTTP client's 404 handling.
        if let Some(records) = collections.get_mut(collection) {
            records.retain(|record| record.stable_id != stable_id);
        }
        Ok(())
    }

    async fn fetch_record(
        &self,
        collection: &str,
        stable_id: &str,
    ) -> Result<Option<PrimaryRecord>, RemoteError> {
        self.faults
            .enter(StoreKind::Content, StoreOp::FetchRecord)
            .await?;
        Ok(self.record(collection, stable_id).await)
    }

    async fn query_records(
        &self,
        collection: &str,
        numeric_id: u64,
    ) -> Result<Vec<PrimaryRecord>, RemoteError> {
        self.faults
            .enter(StoreKind::Content, StoreOp::QueryRecords)
            .await?;
        if self.unreliable_filters.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        let mut records = self.records(collection).await;
        records.retain(|record| record.numeric_id == Some(numeric_id));
        Ok(records)
    }

    async fn list_records(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<PrimaryRecord>, RemoteError> {
        self.faults
            .enter(StoreKind::Content, StoreOp::ListRecords)
            .await?;
        let records = self.records(collection).await;
        Ok(records.into_iter().take(limit).collect())
    }
}

#[derive(Default)]
struct CatalogState {
    classifications: Vec<Classification>,
    terms: Vec<CatalogTerm>,
    next_id: u64,
}

impl CatalogState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory catalog store enforcing `(classification, slug)` uniqueness
/// atomically, like the real store does.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
    unreliable_filters: AtomicBool,
    faults: Faults,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_classification(&self, slug: &str, name: &str) -> Classification {
        let mut state = self.state.write().await;
        let classification = Classification {
            id: state.allocate_id(),
            slug: slug.to_string(),
            name: name.to_string(),
        };
        state.classifications.push(classification.clone());
        classification
    }

    /// Seeds a term directly, bypassing uniqueness checks.
    pub async fn insert_term(&self, classification_id: u64, draft: &TermDraft) -> CatalogTerm {
        let mut state = self.state.write().await;
        let term = CatalogTerm {
            id: state.allocate_id(),
            classification_id,
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            description: draft.description.clone(),
        };
        state.terms.push(term.clone());
        term
    }

    pub async fn terms(&self, classification_id: u64) -> Vec<CatalogTerm> {
        self.state
            .read()
            .await
            .terms
            .iter()
            .filter(|term| term.classification_id == classification_id)
            .cloned()
            .collect()
    }

    pub async fn fail_on(&self, op: StoreOp, status: u16) {
        self.faults.failing.lock().await.insert(op, status);
    }

    pub async fn clear_failure(&self, op: StoreOp) {
        self.faults.failing.lock().await.remove(&op);
    }

    pub fn set_unreliable_filters(&self, unreliable: bool) {
        self.unreliable_filters.store(unreliable, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<StoreOp> {
        self.faults.calls.lock().await.clone()
    }

    fn filters_ignored(&self, query: &ListQuery) -> bool {
        self.unreliable_filters.load(Ordering::SeqCst)
            && (query.slug.is_some() || query.id.is_some())
    }
}

fn limit_of(query: &ListQuery) -> usize {
    query.limit.unwrap_or(usize::MAX)
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_classifications(
        &self,
        query: &ListQuery,
    ) -> Result<Vec<Classification>, RemoteError> {
        self.faults
            .enter(StoreKind::Catalog, StoreOp::ListClassifications)
            .await?;
        if self.filters_ignored(query) {
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        Ok(state
            .classifications
            .iter()
            .filter(|c| query.slug.as_ref().is_none_or(|slug| &c.slug == slug))
            .filter(|c| query.id.is_none_or(|id| c.id == id))
            .take(limit_of(query))
            .cloned()
            .collect())
    }

    async fn create_term(
        &self,
        classification_id: u64,
        draft: &TermDraft,
    ) -> Result<TermCreation, RemoteError> {
        self.faults
            .enter(StoreKind::Catalog, StoreOp::CreateTerm)
            .await?;
        let mut state = self.state.write().await;
        if !state.classifications.iter().any(|c| c.id == classification_id) {
            return Err(RemoteError::status(
                StoreKind::Catalog,
                StoreOp::CreateTerm.name(),
                404,
                format!("classification {classification_id} not found"),
            ));
        }
        if let Some(existing) = state
            .terms
            .iter()
            .find(|t| t.classification_id == classification_id && t.slug == draft.slug)
        {
            return Ok(TermCreation::Conflict(TermConflict {
                resource_id: existing.id,
                slug: draft.slug.clone(),
            }));
        }
        let term = CatalogTerm {
            id: state.allocate_id(),
            classification_id,
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            description: draft.description.clone(),
        };
        state.terms.push(term.clone());
        Ok(TermCreation::Created(term))
    }

    async fn fetch_term(
        &self,
        classification_id: u64,
        term_id: u64,
    ) -> Result<Option<CatalogTerm>, RemoteError> {
        self.faults
            .enter(StoreKind::Catalog, StoreOp::FetchTerm)
            .await?;
        let state = self.state.read().await;
        Ok(state
            .terms
            .iter()
            .find(|t| t.classification_id == classification_id && t.id == term_id)
            .cloned())
    }

    async fn list_terms(
        &self,
        classification_id: u64,
        query: &ListQuery,
    ) -> Result<Vec<CatalogTerm>, RemoteError> {
        self.faults
            .enter(StoreKind::Catalog, StoreOp::ListTerms)
            .await?;
        if self.filters_ignored(query) {
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        Ok(state
            .terms
            .iter()
            .filter(|t| t.classification_id == classification_id)
            .filter(|t| query.slug.as_ref().is_none_or(|slug| &t.slug == slug))
            .filter(|t| query.id.is_none_or(|id| t.id == id))
            .take(limit_of(query))
            .cloned()
            .collect())
    }
}
