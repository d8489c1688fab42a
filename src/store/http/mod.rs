//! Bearer-authenticated HTTP clients for both stores.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};

use crate::core::{RemoteError, StoreKind};

mod catalog;
mod content;
pub(crate) mod wire;

pub use catalog::HttpCatalogStore;
pub use content::HttpContentStore;

/// Whether `segment` can name a single resource. URL path handling drops
/// `.` and `..`, so such ids would address the parent collection.
pub(crate) fn is_addressable(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

/// Raw answer of a store: status plus body bytes, interpreted by the caller.
pub(crate) struct RawResponse {
    pub(crate) status: u16,
    pub(crate) body: Vec<u8>,
}

impl RawResponse {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub(crate) fn into_error(self, store: StoreKind, operation: &'static str) -> RemoteError {
        RemoteError::status(store, operation, self.status, wire::error_message(&self.body))
    }
}

/// Shared reqwest plumbing: base URL, token and error mapping.
#[derive(Clone)]
pub(crate) struct Transport {
    client: Client,
    base_url: Url,
    token: String,
    store: StoreKind,
}

impl Transport {
    pub(crate) fn new(
        store: StoreKind,
        base_url: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RemoteError::transport(store, "build_client", err.to_string()))?;
        let base_url = Url::parse(base_url.trim())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                RemoteError::transport(store, "build_client", format!("invalid base url '{base_url}'"))
            })?;
        Ok(Self {
            client,
            base_url,
            token: token.to_string(),
            store,
        })
    }

    pub(crate) fn store(&self) -> StoreKind {
        self.store
    }

    /// Appends `segments` to the base URL, percent-encoding each one, so
    /// `/`, `?` and `#` inside an id cannot change the target.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn get(&self, segments: &[&str]) -> RequestBuilder {
        self.authorize(self.client.get(self.url(segments)))
    }

    pub(crate) fn post(&self, segments: &[&str]) -> RequestBuilder {
        self.authorize(self.client.post(self.url(segments)))
    }

    pub(crate) fn put(&self, segments: &[&str]) -> RequestBuilder {
        self.authorize(self.client.put(self.url(segments)))
    }

    pub(crate) fn delete(&self, segments: &[&str]) -> RequestBuilder {
        self.authorize(self.client.delete(self.url(segments)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        }
    }

    /// Sends the request; only transport failures are errors here.
    pub(crate) async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<RawResponse, RemoteError> {
        let response = request.send().await.map_err(|err| {
            let message = if err.is_timeout() {
                format!("request timed out: {err}")
            } else {
                err.to_string()
            };
            RemoteError::transport(self.store, operation, message)
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| RemoteError::transport(self.store, operation, err.to_string()))?
            .to_vec();
        Ok(RawResponse { status, body })
    }
}
