use std::fmt;
use thiserror::Error;

/// Which external system a remote call was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Content,
    Catalog,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Content => "content_store",
            Self::Catalog => "catalog_store",
        };
        write!(f, "{label}")
    }
}

/// How a remote call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Connection refused, reset, timed out, ...
    Transport,
    /// The store answered with a non-success status.
    Status(u16),
    /// The store answered, but the payload did not match the expected schema.
    Decode,
}

/// A failed call against one of the two stores.
///
/// Keeps the upstream status and message so terminal errors can be logged
/// with the original cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{store} {operation} failed{}: {message}", status_suffix(.kind))]
pub struct RemoteError {
    pub store: StoreKind,
    pub operation: &'static str,
    pub kind: RemoteErrorKind,
    pub message: String,
}

fn status_suffix(kind: &RemoteErrorKind) -> String {
    match kind {
        RemoteErrorKind::Status(code) => format!(" with status {code}"),
        RemoteErrorKind::Transport => " (transport)".to_string(),
        RemoteErrorKind::Decode => " (decode)".to_string(),
    }
}

impl RemoteError {
    pub fn transport(store: StoreKind, operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            store,
            operation,
            kind: RemoteErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn status(
        store: StoreKind,
        operation: &'static str,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            store,
            operation,
            kind: RemoteErrorKind::Status(status),
            message: message.into(),
        }
    }

    pub fn decode(store: StoreKind, operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            store,
            operation,
            kind: RemoteErrorKind::Decode,
            message: message.into(),
        }
    }

    /// Upstream HTTP status, when the store answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            RemoteErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.kind, RemoteErrorKind::Transport)
    }
}

/// Stable label for each terminal outcome of a failed synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    Validation,
    Configuration,
    TransientRemote,
    PartialFailure,
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation_error",
            Self::Configuration => "configuration_error",
            Self::TransientRemote => "transient_remote_error",
            Self::PartialFailure => "partial_failure",
        };
        write!(f, "{label}")
    }
}

/// Terminal error of a synchronization call.
///
/// `Validation` means nothing was written. `Configuration` and
/// `TransientRemote` mean the tentative record was removed again.
/// `PartialFailure` means the record is still in the content store, unlinked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("remote store error: {0}")]
    TransientRemote(#[from] RemoteError),

    #[error(
        "partial failure: record '{stable_id}' left unlinked ({cause}); compensating delete failed: {compensation}"
    )]
    PartialFailure {
        stable_id: String,
        cause: Box<SyncError>,
        compensation: RemoteError,
    },
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Validation(_) => SyncErrorKind::Validation,
            Self::Configuration(_) => SyncErrorKind::Configuration,
            Self::TransientRemote(_) => SyncErrorKind::TransientRemote,
            Self::PartialFailure { .. } => SyncErrorKind::PartialFailure,
        }
    }

    /// Upstream status of the remote error behind this failure, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::TransientRemote(err) => err.status_code(),
            Self::PartialFailure { cause, .. } => cause.upstream_status(),
            _ => None,
        }
    }
}

/// Failure of the resilient resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("'{id}' not found by any lookup strategy")]
    NotFound { id: String },

    #[error("'{id}' could not be looked up: {source}")]
    Unavailable {
        id: String,
        #[source]
        source: RemoteError,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_keeps_upstream_status() {
        let err = RemoteError::status(StoreKind::Catalog, "create_term", 503, "maintenance");
        assert_eq!(
            err.to_string(),
            "catalog_store create_term failed with status 503: maintenance"
        );
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn partial_failure_is_its_own_kind() {
        let cause = SyncError::from(RemoteError::status(
            StoreKind::Catalog,
            "create_term",
            500,
            "boom",
        ));
        let err = SyncError::PartialFailure {
            stable_id: "abc".to_string(),
            cause: Box::new(cause),
            compensation: RemoteError::transport(StoreKind::Content, "delete_record", "reset"),
        };
        assert_eq!(err.kind(), SyncErrorKind::PartialFailure);
        assert_ne!(err.kind(), SyncErrorKind::TransientRemote);
        assert_eq!(err.upstream_status(), Some(500));
    }
}
