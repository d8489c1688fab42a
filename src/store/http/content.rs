use std::time::Duration;

use async_trait::async_trait;

use super::{Transport, is_addressable};
use super::wire::{Envelope, LinkBody, WireRecord, decode};
use crate::core::{PrimaryRecord, RecordDraft, RemoteError, StoreKind};
use crate::store::ContentStore;

/// Content store client: one REST collection per attribute entity.
#[derive(Clone)]
pub struct HttpContentStore {
    transport: Transport,
}

impl HttpContentStore {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, RemoteError> {
        Ok(Self {
            transport: Transport::new(StoreKind::Content, base_url, token, timeout)?,
        })
    }

    async fn fetch_list(
        &self,
        operation: &'static str,
        collection: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<PrimaryRecord>, RemoteError> {
        let response = self
            .transport
            .send(operation, self.transport.get(&[collection]).query(query))
            .await?;
        if !response.is_success() {
            return Err(response.into_error(self.transport.store(), operation));
        }
        let records: Envelope<Vec<WireRecord>> =
            decode(self.transport.store(), operation, &response.body)?;
        Ok(records
            .into_inner()
            .into_iter()
            .map(PrimaryRecord::from)
            .collect())
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn create_record(
        &self,
        collection: &str,
        draft: &RecordDraft,
    ) -> Result<PrimaryRecord, RemoteError> {
        const OP: &str = "create_record";
        let response = self
            .transport
            .send(OP, self.transport.post(&[collection]).json(draft))
            .await?;
        if !response.is_success() {
            return Err(response.into_error(self.transport.store(), OP));
        }
        let record: Envelope<WireRecord> = decode(self.transport.store(), OP, &response.body)?;
        Ok(record.into_inner().into())
    }

    async fn set_external_ref(
        &self,
        collection: &str,
        stable_id: &str,
        external_ref: u64,
    ) -> Result<(), RemoteError> {
        const OP: &str = "set_external_ref";
        if !is_addressable(stable_id) {
            return Err(RemoteError::status(
                self.transport.store(),
                OP,
                404,
                format!("record '{stable_id}' not found"),
            ));
        }
        let response = self
            .transport
            .send(
                OP,
                self.transport
                    .put(&[collection, stable_id])
                    .json(&LinkBody { external_ref }),
            )
            .await?;
        if !response.is_success() {
            return Err(response.into_error(self.transport.store(), OP));
        }
        Ok(())
    }

    async fn delete_record(&self, collection: &str, stable_id: &str) -> Result<(), RemoteError> {
        const OP: &str = "delete_record";
        if !is_addressable(stable_id) {
            return Ok(());
        }
        let response = self
            .transport
            .send(OP, self.transport.delete(&[collection, stable_id]))
            .await?;
        // Already gone is what a delete wants.
        if response.is_success() || response.status == 404 {
            return Ok(());
        }
        Err(response.into_error(self.transport.store(), OP))
    }

    async fn fetch_record(
        &self,
        collection: &str,
        stable_id: &str,
    ) -> Result<Option<PrimaryRecord>, RemoteError> {
        const OP: &str = "fetch_record";
        if !is_addressable(stable_id) {
            return Ok(None);
        }
        let response = self
            .transport
            .send(OP, self.transport.get(&[collection, stable_id]))
            .await?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(response.into_error(self.transport.store(), OP));
        }
        let record: Envelope<WireRecord> = decode(self.transport.store(), OP, &response.body)?;
        Ok(Some(record.into_inner().into()))
    }

    async fn query_records(
        &self,
        collection: &str,
        numeric_id: u64,
    ) -> Result<Vec<PrimaryRecord>, RemoteError> {
        self.fetch_list(
            "query_records",
            collection,
            &[("filter[id]", numeric_id.to_string())],
        )
        .await
    }

    async fn list_records(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<PrimaryRecord>, RemoteError> {
        self.fetch_list("list_records", collection, &[("limit", limit.to_string())])
            .await
    }
}
