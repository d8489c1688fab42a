pub mod error;
pub mod model;
pub mod slug;

pub use error::{
    RemoteError, RemoteErrorKind, ResolveError, Result, StoreKind, SyncError, SyncErrorKind,
};
pub use model::{
    CatalogTerm, Classification, CreateAttribute, EntityProfile, PrimaryRecord, RecordDraft,
    SyncOutcome, SyncStatus, TermConflict, TermCreation, TermDraft,
};
pub use slug::{DEFAULT_SLUG_MAX_LEN, derive_slug, resolve_slug};
