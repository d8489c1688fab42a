use std::time::Duration;

use async_trait::async_trait;

use super::Transport;
use super::wire::{WireClassification, WireTerm, decode, interpret_term_create};
use crate::core::{
    CatalogTerm, Classification, RemoteError, StoreKind, TermCreation, TermDraft,
};
use crate::store::{CatalogStore, ListQuery};

/// Catalog store client (classifications and their terms).
#[derive(Clone)]
pub struct HttpCatalogStore {
    transport: Transport,
}

impl HttpCatalogStore {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            transport: Transport::new(StoreKind::Catalog, base_url, token, timeout)?,
        })
    }
}

fn query_params(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(slug) = &query.slug {
        params.push(("slug", slug.clone()));
    }
    if let Some(id) = query.id {
        params.push(("include", id.to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("per_page", limit.to_string()));
    }
    params
}

#[async_trait]
impl CatalogStore for HttpCatalogStore {
    async fn list_classifications(
        &self,
        query: &ListQuery,
    ) -> Result<Vec<Classification>, RemoteError> {
        const OP: &str = "list_classifications";
        let request = self
            .transport
            .get(&["classifications"])
            .query(&query_params(query));
        let response = self.transport.send(OP, request).await?;
        if !response.is_success() {
            return Err(response.into_error(StoreKind::Catalog, OP));
        }
        let items: Vec<WireClassification> = decode(StoreKind::Catalog, OP, &response.body)?;
        Ok(items.into_iter().map(Classification::from).collect())
    }

    async fn create_term(
        &self,
        classification_id: u64,
        draft: &TermDraft,
    ) -> Result<TermCreation, RemoteError> {
        const OP: &str = "create_term";
        let id = classification_id.to_string();
        let response = self
            .transport
            .send(
                OP,
                self.transport.post(&["classifications", &id, "terms"]).json(draft),
            )
            .await?;
        interpret_term_create(
            response.status,
            &response.body,
            classification_id,
            &draft.slug,
        )
    }

    async fn fetch_term(
        &self,
        classification_id: u64,
        term_id: u64,
    ) -> Result<Option<CatalogTerm>, RemoteError> {
        const OP: &str = "fetch_term";
        let (id, term_id) = (classification_id.to_string(), term_id.to_string());
        let request = self
            .transport
            .get(&["classifications", &id, "terms", &term_id]);
        let response = self.transport.send(OP, request).await?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(response.into_error(StoreKind::Catalog, OP));
        }
        let term: WireTerm = decode(StoreKind::Catalog, OP, &response.body)?;
        Ok(Some(term.into_term(classification_id)))
    }

    async fn list_terms(
        &self,
        classification_id: u64,
        query: &ListQuery,
    ) -> Result<Vec<CatalogTerm>, RemoteError> {
        const OP: &str = "list_terms";
        let id = classification_id.to_string();
        let request = self
            .transport
            .get(&["classifications", &id, "terms"])
            .query(&query_params(query));
        let response = self.transport.send(OP, request).await?;
        if !response.is_success() {
            return Err(response.into_error(StoreKind::Catalog, OP));
        }
        let items: Vec<WireTerm> = decode(StoreKind::Catalog, OP, &response.body)?;
        Ok(items
            .into_iter()
            .map(|term| term.into_term(classification_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_maps_to_catalog_parameters() {
        assert!(query_params(&ListQuery::default()).is_empty());
        assert_eq!(
            query_params(&ListQuery::by_slug("pa_genre")),
            vec![("slug", "pa_genre".to_string())]
        );
        assert_eq!(
            query_params(&ListQuery::by_id(7)),
            vec![("include", "7".to_string())]
        );
        assert_eq!(
            query_params(&ListQuery::all(1000)),
            vec![("per_page", "1000".to_string())]
        );
    }
}
