use serde::{Deserialize, Serialize};

/// A record in the content store.
///
/// `external_ref` is the only linkage between the two stores: present means
/// the record is mirrored by that catalog term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryRecord {
    pub stable_id: String,
    pub numeric_id: Option<u64>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub external_ref: Option<u64>,
}

impl PrimaryRecord {
    pub fn status(&self) -> SyncStatus {
        if self.external_ref.is_some() {
            SyncStatus::Linked
        } else {
            SyncStatus::Tentative
        }
    }
}

/// Synchronization status of a content record.
///
/// `Absent` is never observed on a record, only reported by lookups that
/// found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Tentative,
    Linked,
    Absent,
}

/// Payload of a tentative content-store create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// A taxonomy term in the catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTerm {
    pub id: u64,
    pub classification_id: u64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDraft {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl From<&RecordDraft> for TermDraft {
    fn from(draft: &RecordDraft) -> Self {
        Self {
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            description: draft.description.clone(),
        }
    }
}

/// A taxonomy axis in the catalog store (one attribute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub id: u64,
    pub slug: String,
    pub name: String,
}

/// Existing term reported by the catalog store when a create collides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermConflict {
    pub resource_id: u64,
    pub slug: String,
}

/// Outcome of a term create, distinguishing the duplicate case structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermCreation {
    Created(CatalogTerm),
    Conflict(TermConflict),
}

/// Caller input of a synchronized create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAttribute {
    pub name: String,
    pub description: Option<String>,
    pub slug: Option<String>,
}

impl CreateAttribute {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

/// Successful end state of a synchronized create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub stable_id: String,
    pub external_id: u64,
    /// True when the term already existed and was adopted after a conflict.
    pub adopted: bool,
}

/// Per-entity configuration of the shared synchronization engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityProfile {
    /// Label used in logs.
    pub kind: String,
    /// Content-store collection path, e.g. `works`.
    pub collection: String,
    /// Stable code of the catalog classification.
    pub classification_code: String,
    /// Human-readable classification name, used when no code matches.
    pub classification_name: String,
}

impl EntityProfile {
    pub fn new(
        kind: impl Into<String>,
        collection: impl Into<String>,
        classification_code: impl Into<String>,
        classification_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            collection: collection.into(),
            classification_code: classification_code.into(),
            classification_name: classification_name.into(),
        }
    }

    pub fn literary_work() -> Self {
        Self::new("literary_work", "works", "literary-work", "Literary Work")
    }

    pub fn author() -> Self {
        Self::new("author", "authors", "author", "Author")
    }

    pub fn publisher() -> Self {
        Self::new("publisher", "publishers", "publisher", "Publisher")
    }
}
