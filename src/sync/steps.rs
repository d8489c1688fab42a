//! Steps of the attribute-creation saga.
//!
//! Steps are stateless and shared by every entity profile; everything a call
//! accumulates lives in `AttributeSyncContext`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Level, event};

use super::reconciler::ConflictReconciler;
use super::resolver::{ClassificationLookup, Resolver};
use super::saga::SagaStep;
use crate::core::{
    CatalogTerm, Classification, EntityProfile, PrimaryRecord, RecordDraft, RemoteError,
    ResolveError, SyncError, TermCreation, TermDraft,
};
use crate::store::{CatalogStore, ContentStore};

/// State of one synchronized create as it moves through the saga.
#[derive(Debug, Clone)]
pub struct AttributeSyncContext {
    pub profile: EntityProfile,
    pub draft: RecordDraft,
    pub record: Option<PrimaryRecord>,
    pub classification: Option<Classification>,
    pub term: Option<CatalogTerm>,
    pub adopted: bool,
}

impl AttributeSyncContext {
    pub fn new(profile: EntityProfile, draft: RecordDraft) -> Self {
        Self {
            profile,
            draft,
            record: None,
            classification: None,
            term: None,
            adopted: false,
        }
    }

    fn record(&self) -> Result<&PrimaryRecord, SyncError> {
        self.record
            .as_ref()
            .ok_or_else(|| out_of_order("the tentative record"))
    }

    fn classification(&self) -> Result<&Classification, SyncError> {
        self.classification
            .as_ref()
            .ok_or_else(|| out_of_order("the classification"))
    }

    fn term(&self) -> Result<&CatalogTerm, SyncError> {
        self.term
            .as_ref()
            .ok_or_else(|| out_of_order("the catalog term"))
    }
}

/// A step ran before the step producing its input. This is a wiring bug in
/// the saga, not a store condition.
pub(crate) fn out_of_order(missing: &str) -> SyncError {
    event!(Level::ERROR, missing, "saga step ran out of order");
    SyncError::configuration(format!(
        "internal error: saga step ran before {missing} was produced"
    ))
}

/// Creates the unlinked record; compensated by deleting it.
pub struct CreateTentativeRecord {
    pub content: Arc<dyn ContentStore>,
}

#[async_trait]
impl SagaStep<AttributeSyncContext> for CreateTentativeRecord {
    fn name(&self) -> &'static str {
        "create_tentative_record"
    }

    async fn execute(&self, ctx: &mut AttributeSyncContext) -> Result<(), SyncError> {
        let record = self
            .content
            .create_record(&ctx.profile.collection, &ctx.draft)
            .await?;
        event!(
            Level::DEBUG,
            stable_id = %record.stable_id,
            "tentative record created"
        );
        ctx.record = Some(record);
        Ok(())
    }

    async fn compensate(&self, ctx: &mut AttributeSyncContext) -> Result<(), RemoteError> {
        let Some(record) = ctx.record.as_ref() else {
            return Ok(());
        };
        self.content
            .delete_record(&ctx.profile.collection, &record.stable_id)
            .await?;
        event!(
            Level::INFO,
            stable_id = %record.stable_id,
            "tentative record removed"
        );
        Ok(())
    }
}

/// Finds the catalog classification the term belongs to: code first, then
/// display name.
pub struct ResolveClassification {
    pub catalog: Arc<dyn CatalogStore>,
    pub resolver: Resolver,
}

#[async_trait]
impl SagaStep<AttributeSyncContext> for ResolveClassification {
    fn name(&self) -> &'static str {
        "resolve_classification"
    }

    async fn execute(&self, ctx: &mut AttributeSyncContext) -> Result<(), SyncError> {
        let lookup = ClassificationLookup {
            store: self.catalog.as_ref(),
        };
        let resolved = self
            .resolver
            .resolve_with_name(
                &lookup,
                &ctx.profile.classification_code,
                &ctx.profile.classification_name,
            )
            .await;

        match resolved {
            Ok(classification) => {
                ctx.classification = Some(classification);
                Ok(())
            }
            Err(ResolveError::NotFound { .. }) => Err(SyncError::configuration(format!(
                "classification '{}' ({}) does not exist in the catalog store",
                ctx.profile.classification_code, ctx.profile.classification_name
            ))),
            Err(ResolveError::Unavailable { source, .. }) => Err(SyncError::TransientRemote(source)),
        }
    }
}

/// Creates the mirrored term, or adopts the existing one on conflict.
pub struct MirrorTerm {
    pub catalog: Arc<dyn CatalogStore>,
    pub resolver: Resolver,
}

#[async_trait]
impl SagaStep<AttributeSyncContext> for MirrorTerm {
    fn name(&self) -> &'static str {
        "mirror_term"
    }

    async fn execute(&self, ctx: &mut AttributeSyncContext) -> Result<(), SyncError> {
        let classification_id = ctx.classification()?.id;
        let draft = TermDraft::from(&ctx.draft);

        let term = match self.catalog.create_term(classification_id, &draft).await? {
            TermCreation::Created(term) => term,
            TermCreation::Conflict(conflict) => {
                let reconciler = ConflictReconciler::new(self.catalog.as_ref(), self.resolver);
                let term = reconciler.reconcile(classification_id, &conflict).await?;
                ctx.adopted = true;
                term
            }
        };
        ctx.term = Some(term);
        Ok(())
    }
}

/// Writes the term id back onto the record.
pub struct LinkRecord {
    pub content: Arc<dyn ContentStore>,
}

#[async_trait]
impl SagaStep<AttributeSyncContext> for LinkRecord {
    fn name(&self) -> &'static str {
        "link_record"
    }

    async fn execute(&self, ctx: &mut AttributeSyncContext) -> Result<(), SyncError> {
        let term_id = ctx.term()?.id;
        let stable_id = ctx.record()?.stable_id.clone();
        self.content
            .set_external_ref(&ctx.profile.collection, &stable_id, term_id)
            .await?;
        if let Some(record) = ctx.record.as_mut() {
            record.external_ref = Some(term_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryContentStore;

    #[tokio::test]
    async fn step_without_its_input_reports_an_internal_error() {
        let content = Arc::new(InMemoryContentStore::new());
        let step = LinkRecord {
            content: content.clone(),
        };
        let draft = RecordDraft {
            name: "Dune".to_string(),
            slug: "dune".to_string(),
            description: None,
        };
        let mut ctx = AttributeSyncContext::new(EntityProfile::literary_work(), draft);

        let err = step.execute(&mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("internal error"));
        assert!(!err.to_string().contains("classification"));
        assert!(content.calls().await.is_empty());
    }
}
