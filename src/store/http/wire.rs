//! Explicit schemas of store payloads, validated before the engine sees them.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::core::{
    CatalogTerm, Classification, PrimaryRecord, RemoteError, StoreKind, TermConflict,
    TermCreation,
};

/// Duplicate-term error code of the catalog store.
pub const TERM_EXISTS_CODE: &str = "term_exists";

/// Content-store responses come either bare or wrapped in `{"data": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum WireId {
    Numeric(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRecord {
    id: WireId,
    #[serde(default)]
    document_id: Option<String>,
    name: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "external_ref")]
    external_ref: Option<u64>,
}

impl From<WireRecord> for PrimaryRecord {
    fn from(wire: WireRecord) -> Self {
        // A separate document id is the stable key; otherwise `id` is.
        let (stable_id, numeric_id) = match (wire.document_id, wire.id) {
            (Some(document_id), WireId::Numeric(n)) => (document_id, Some(n)),
            (Some(document_id), WireId::Text(_)) => (document_id, None),
            (None, WireId::Text(text)) => (text, None),
            (None, WireId::Numeric(n)) => (n.to_string(), Some(n)),
        };
        Self {
            stable_id,
            numeric_id,
            name: wire.name,
            slug: wire.slug.unwrap_or_default(),
            description: wire.description,
            external_ref: wire.external_ref,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LinkBody {
    pub(crate) external_ref: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireClassification {
    id: u64,
    slug: String,
    name: String,
}

impl From<WireClassification> for Classification {
    fn from(wire: WireClassification) -> Self {
        Self {
            id: wire.id,
            slug: wire.slug,
            name: wire.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTerm {
    id: u64,
    name: String,
    slug: String,
    #[serde(default)]
    description: Option<String>,
}

impl WireTerm {
    pub(crate) fn into_term(self, classification_id: u64) -> CatalogTerm {
        CatalogTerm {
            id: self.id,
            classification_id,
            name: self.name,
            slug: self.slug,
            description: self.description.filter(|d| !d.is_empty()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireErrorData {
    #[serde(default)]
    resource_id: Option<u64>,
}

/// Error body of the catalog store. The existing term id appears either at
/// the top level or under `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireErrorBody {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    resource_id: Option<u64>,
    #[serde(default)]
    data: Option<WireErrorData>,
}

impl WireErrorBody {
    fn resource_id(&self) -> Option<u64> {
        self.resource_id
            .or_else(|| self.data.as_ref().and_then(|d| d.resource_id))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(
    store: StoreKind,
    operation: &'static str,
    body: &[u8],
) -> Result<T, RemoteError> {
    serde_json::from_slice(body).map_err(|err| RemoteError::decode(store, operation, err.to_string()))
}

/// Best-effort human message from an error body.
pub(crate) fn error_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<WireErrorBody>(body) {
        return match parsed.message {
            Some(message) => format!("{}: {}", parsed.code, message),
            None => parsed.code,
        };
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text.chars().take(512).collect()
    }
}

/// Interprets the response of a term create.
///
/// Only a 400/409 whose body carries `term_exists` and the existing term id
/// is a conflict; everything else non-2xx is a plain remote error.
pub(crate) fn interpret_term_create(
    status: u16,
    body: &[u8],
    classification_id: u64,
    slug: &str,
) -> Result<TermCreation, RemoteError> {
    const OP: &str = "create_term";

    if (200..300).contains(&status) {
        let term: WireTerm = decode(StoreKind::Catalog, OP, body)?;
        return Ok(TermCreation::Created(term.into_term(classification_id)));
    }

    if matches!(status, 400 | 409) {
        if let Ok(parsed) = serde_json::from_slice::<WireErrorBody>(body) {
            if parsed.code == TERM_EXISTS_CODE {
                return match parsed.resource_id() {
                    Some(resource_id) => Ok(TermCreation::Conflict(TermConflict {
                        resource_id,
                        slug: slug.to_string(),
                    })),
                    None => Err(RemoteError::status(
                        StoreKind::Catalog,
                        OP,
                        status,
                        "term_exists without resource_id",
                    )),
                };
            }
        }
    }

    Err(RemoteError::status(
        StoreKind::Catalog,
        OP,
        status,
        error_message(body),
    ))
}
