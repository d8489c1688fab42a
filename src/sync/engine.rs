use std::sync::Arc;

use tracing::{Instrument, Level, event, info_span};

use super::resolver::{RecordLookup, Resolver};
use super::saga::{Saga, SagaFailure};
use super::steps::{
    AttributeSyncContext, CreateTentativeRecord, LinkRecord, MirrorTerm, ResolveClassification,
    out_of_order,
};
use crate::config::SyncConfig;
use crate::core::{
    CreateAttribute, EntityProfile, PrimaryRecord, RecordDraft, RemoteError, ResolveError, Result,
    SyncError, SyncOutcome, derive_slug, resolve_slug,
};
use crate::store::{CatalogStore, ContentStore, HttpCatalogStore, HttpContentStore};

/// Keeps an attribute entity in the content store and its mirror term in
/// the catalog store consistent, one entity per call.
///
/// Holds no mutable state, so concurrent calls need no coordination; the
/// catalog's uniqueness on `(classification, slug)` plus conflict adoption
/// make concurrent or retried creates of the same name converge on one term.
pub struct SyncEngine {
    content: Arc<dyn ContentStore>,
    catalog: Arc<dyn CatalogStore>,
    resolver: Resolver,
    slug_max_len: usize,
    saga: Saga<AttributeSyncContext>,
}

impl SyncEngine {
    /// Builds an engine over injected store implementations.
    pub fn new(
        config: &SyncConfig,
        content: Arc<dyn ContentStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        let resolver = Resolver::new(config.scan_limit);
        let saga = Saga::new("attribute_create")
            .step(CreateTentativeRecord {
                content: Arc::clone(&content),
            })
            .step(ResolveClassification {
                catalog: Arc::clone(&catalog),
                resolver,
            })
            .step(MirrorTerm {
                catalog: Arc::clone(&catalog),
                resolver,
            })
            .step(LinkRecord {
                content: Arc::clone(&content),
            });

        Self {
            content,
            catalog,
            resolver,
            slug_max_len: config.slug_max_len,
            saga,
        }
    }

    /// Builds an engine talking HTTP to the configured stores.
    pub fn from_config(config: &SyncConfig) -> std::result::Result<Self, RemoteError> {
        let content = HttpContentStore::new(
            &config.content_base_url,
            &config.content_token,
            config.request_timeout,
        )?;
        let catalog = HttpCatalogStore::new(
            &config.catalog_base_url,
            &config.catalog_token,
            config.request_timeout,
        )?;
        Ok(Self::new(config, Arc::new(content), Arc::new(catalog)))
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogStore> {
        &self.catalog
    }

    pub fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    /// Slug the engine would use for `name`.
    pub fn slug_for(&self, name: &str) -> String {
        derive_slug(name, self.slug_max_len)
    }

    /// Creates the entity in the content store and mirrors it in the catalog.
    ///
    /// Ends in exactly one of: linked (`Ok`), `Validation` (nothing written),
    /// `Configuration`/`TransientRemote` (tentative record removed), or
    /// `PartialFailure` (record left behind unlinked).
    pub async fn synchronize_create(
        &self,
        profile: &EntityProfile,
        input: CreateAttribute,
    ) -> Result<SyncOutcome> {
        let span = info_span!(
            "sync.create",
            kind = %profile.kind,
            collection = %profile.collection
        );
        self.run_create(profile, input).instrument(span).await
    }

    async fn run_create(&self, profile: &EntityProfile, input: CreateAttribute) -> Result<SyncOutcome> {
        let draft = self.prepare(profile, &input)?;
        event!(Level::DEBUG, name = %draft.name, slug = %draft.slug, "synchronizing");

        let mut ctx = AttributeSyncContext::new(profile.clone(), draft);
        if let Err(failure) = self.saga.run(&mut ctx).await {
            return Err(Self::terminal_error(&ctx, failure));
        }

        let outcome = match (ctx.record.as_ref(), ctx.term.as_ref()) {
            (Some(record), Some(term)) => SyncOutcome {
                stable_id: record.stable_id.clone(),
                external_id: term.id,
                adopted: ctx.adopted,
            },
            _ => {
                return Err(out_of_order("the linked record"));
            }
        };
        event!(
            Level::INFO,
            stable_id = %outcome.stable_id,
            external_id = outcome.external_id,
            adopted = outcome.adopted,
            "record linked"
        );
        Ok(outcome)
    }

    /// Validates input and profile before anything is written.
    fn prepare(&self, profile: &EntityProfile, input: &CreateAttribute) -> Result<RecordDraft> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(SyncError::validation("name must not be empty"));
        }
        if profile.collection.trim().is_empty() {
            return Err(SyncError::configuration(format!(
                "profile '{}' has no content collection",
                profile.kind
            )));
        }
        if profile.classification_code.trim().is_empty()
            && profile.classification_name.trim().is_empty()
        {
            return Err(SyncError::configuration(format!(
                "profile '{}' names no catalog classification",
                profile.kind
            )));
        }

        let slug = resolve_slug(name, input.slug.as_deref(), self.slug_max_len)?;
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(RecordDraft {
            name: name.to_string(),
            slug,
            description,
        })
    }

    fn terminal_error(ctx: &AttributeSyncContext, failure: SagaFailure) -> SyncError {
        let SagaFailure {
            step,
            cause,
            compensation_failures,
        } = failure;

        let Some(first) = compensation_failures.into_iter().next() else {
            event!(Level::WARN, step, error = %cause, "synchronization rolled back");
            return cause;
        };

        let stable_id = ctx
            .record
            .as_ref()
            .map(|record| record.stable_id.clone())
            .unwrap_or_default();
        event!(
            Level::ERROR,
            step,
            stable_id = %stable_id,
            error = %cause,
            compensation_error = %first.error,
            "orphaned unlinked record requires operator attention"
        );
        SyncError::PartialFailure {
            stable_id,
            cause: Box::new(cause),
            compensation: first.error,
        }
    }

    /// Locates a content record by stable or numeric id.
    pub async fn resolve_record(
        &self,
        profile: &EntityProfile,
        id: &str,
    ) -> std::result::Result<PrimaryRecord, ResolveError> {
        let lookup = RecordLookup {
            store: self.content.as_ref(),
            collection: &profile.collection,
        };
        self.resolver.resolve(&lookup, id).await
    }
}
