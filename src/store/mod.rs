//! Content store interface
//!
//! The translator never talks to a CMS directly. Everything it needs from the
//! host (records, their custom fields, the translation links between records,
//! configured languages and the per-record status flags) goes through
//! [`ContentStore`].

use crate::field::FieldMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;

pub use memory::{MemoryStore, StoreDocument, StoredRecord};

pub type RecordId = u64;

/// Language slug → record id for every member of one translation group
pub type TranslationLinks = BTreeMap<String, RecordId>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A content record with its built-in attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    /// Publication status, e.g. `publish`, `draft`
    pub status: String,
    /// Record type, e.g. `post`, `page`
    pub kind: String,
    pub slug: String,
    /// Language slug, unset for records the host never assigned one
    #[serde(default)]
    pub language: Option<String>,
}

/// Attributes of a record to be created; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub status: String,
    pub kind: String,
    pub slug: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Language {
    /// Short host identifier, e.g. `fr`
    pub slug: String,
    /// Host locale, e.g. `fr_FR`
    pub locale: String,
}

impl Language {
    pub fn new(slug: &str, locale: &str) -> Self {
        Self {
            slug: slug.to_string(),
            locale: locale.to_string(),
        }
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn record(&self, id: RecordId) -> StoreResult<Record>;

    /// Overwrite the stored attributes of `record.id`
    async fn update_record(&self, record: &Record) -> StoreResult<()>;

    async fn create_record(&self, record: NewRecord) -> StoreResult<RecordId>;

    /// The record's custom fields, keyed by field key
    async fn field_tree(&self, id: RecordId) -> StoreResult<FieldMap>;

    /// Store the plain value of one root field
    async fn set_field(&self, id: RecordId, key: &str, value: Value) -> StoreResult<()>;

    /// Links of the group `id` belongs to, `id` itself included
    async fn translations(&self, id: RecordId) -> StoreResult<TranslationLinks>;

    /// Make `links` one translation group
    async fn save_translations(&self, links: &TranslationLinks) -> StoreResult<()>;

    async fn languages(&self) -> StoreResult<Vec<Language>>;

    /// Slug of the pivot language every translation starts from
    async fn default_language(&self) -> StoreResult<String>;

    async fn set_machine_translated(&self, id: RecordId, value: bool) -> StoreResult<()>;

    async fn is_machine_translated(&self, id: RecordId) -> StoreResult<bool>;

    /// Set or clear (`None`) the record's translation error message
    async fn set_translate_error(&self, id: RecordId, error: Option<&str>) -> StoreResult<()>;

    async fn translate_error(&self, id: RecordId) -> StoreResult<Option<String>>;
}

#[async_trait]
impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    async fn record(&self, id: RecordId) -> StoreResult<Record> {
        (**self).record(id).await
    }

    async fn update_record(&self, record: &Record) -> StoreResult<()> {
        (**self).update_record(record).await
    }

    async fn create_record(&self, record: NewRecord) -> StoreResult<RecordId> {
        (**self).create_record(record).await
    }

    async fn field_tree(&self, id: RecordId) -> StoreResult<FieldMap> {
        (**self).field_tree(id).await
    }

    async fn set_field(&self, id: RecordId, key: &str, value: Value) -> StoreResult<()> {
        (**self).set_field(id, key, value).await
    }

    async fn translations(&self, id: RecordId) -> StoreResult<TranslationLinks> {
        (**self).translations(id).await
    }

    async fn save_translations(&self, links: &TranslationLinks) -> StoreResult<()> {
        (**self).save_translations(links).await
    }

    async fn languages(&self) -> StoreResult<Vec<Language>> {
        (**self).languages().await
    }

    async fn default_language(&self) -> StoreResult<String> {
        (**self).default_language().await
    }

    async fn set_machine_translated(&self, id: RecordId, value: bool) -> StoreResult<()> {
        (**self).set_machine_translated(id, value).await
    }

    async fn is_machine_translated(&self, id: RecordId) -> StoreResult<bool> {
        (**self).is_machine_translated(id).await
    }

    async fn set_translate_error(&self, id: RecordId, error: Option<&str>) -> StoreResult<()> {
        (**self).set_translate_error(id, error).await
    }

    async fn translate_error(&self, id: RecordId) -> StoreResult<Option<String>> {
        (**self).translate_error(id).await
    }
}
