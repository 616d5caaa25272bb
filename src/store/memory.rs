//! In-process content store backed by a JSON document
//!
//! The document mirrors what a host keeps for translation purposes:
//!
//! ```json
//! {
//!     "default_language": "en",
//!     "languages": [{"slug": "en", "locale": "en_US"}, {"slug": "fr", "locale": "fr_FR"}],
//!     "field_groups": {
//!         "post": [{"key": "field_subtitle", "name": "subtitle", "type": "text"}]
//!     },
//!     "records": [
//!         {"id": 1, "title": "Hello", "content": "", "excerpt": "", "status": "publish",
//!          "kind": "post", "slug": "hello", "language": "en",
//!          "fields": {"field_subtitle": "World"}}
//!     ],
//!     "translation_groups": [{"en": 1}]
//! }
//! ```
//!
//! Field schemas are declared per record kind; record field values are keyed
//! by field key.

use crate::field::{FieldMap, FieldObject, FieldSchema, field_tree, parse_field_objects};
use crate::store::{
    ContentStore, Language, NewRecord, Record, RecordId, StoreError, StoreResult,
    TranslationLinks,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub default_language: String,
    pub languages: Vec<Language>,
    /// Record kind → field schemas, in declaration order
    #[serde(default)]
    pub field_groups: IndexMap<String, Vec<FieldSchema>>,
    #[serde(default)]
    pub records: Vec<StoredRecord>,
    #[serde(default)]
    pub translation_groups: Vec<TranslationLinks>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    #[serde(flatten)]
    pub record: Record,
    /// Field key → plain value
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
    #[serde(default)]
    pub machine_translated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_error: Option<String>,
}

impl StoredRecord {
    pub fn new(record: Record) -> Self {
        Self {
            record,
            fields: IndexMap::new(),
            machine_translated: false,
            translate_error: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new(default_language: &str, languages: Vec<Language>) -> Self {
        Self::from_document(StoreDocument {
            default_language: default_language.to_string(),
            languages,
            ..StoreDocument::default()
        })
    }

    pub fn from_document(document: StoreDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    /// Load a store document from a JSON file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let document: StoreDocument = serde_json::from_str(&content)?;
        Ok(Self::from_document(document))
    }

    /// Write the current document to a JSON file
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(&self.document()?)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Snapshot of the current document
    pub fn document(&self) -> StoreResult<StoreDocument> {
        self.with_document(|doc| Ok(doc.clone()))
    }

    pub fn define_fields(&self, kind: &str, schemas: Vec<FieldSchema>) -> StoreResult<()> {
        self.with_document(|doc| {
            doc.field_groups.insert(kind.to_string(), schemas);
            Ok(())
        })
    }

    /// Insert or replace a record with its field values
    pub fn put_record(&self, record: Record, fields: IndexMap<String, Value>) -> StoreResult<()> {
        self.with_document(|doc| {
            let stored = StoredRecord {
                fields,
                ..StoredRecord::new(record)
            };
            match doc.records.iter_mut().find(|r| r.record.id == stored.record.id) {
                Some(existing) => *existing = stored,
                None => doc.records.push(stored),
            }
            Ok(())
        })
    }

    /// Import a host field-object document for record `id`
    ///
    /// Each object's schema is declared for the record's kind (replacing a
    /// schema with the same key) and its value stored on the record. Returns
    /// the number of fields imported.
    pub fn import_field_objects(&self, id: RecordId, document: &str) -> StoreResult<usize> {
        let objects = parse_field_objects(document).map_err(StoreError::Other)?;
        self.with_document(|doc| {
            let kind = find(doc, id)?.record.kind.clone();
            let schemas = doc.field_groups.entry(kind).or_default();
            for object in &objects {
                match schemas.iter_mut().find(|s| s.key == object.schema.key) {
                    Some(existing) => *existing = object.schema.clone(),
                    None => schemas.push(object.schema.clone()),
                }
            }

            let stored = find_mut(doc, id)?;
            for object in &objects {
                stored
                    .fields
                    .insert(object.schema.key.clone(), object.value.clone());
            }
            Ok(objects.len())
        })
    }

    /// Stored value of one root field
    pub fn field_value(&self, id: RecordId, key: &str) -> StoreResult<Option<Value>> {
        self.with_document(|doc| Ok(find(doc, id)?.fields.get(key).cloned()))
    }

    fn with_document<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut doc = self
            .document
            .lock()
            .map_err(|_| StoreError::Other("store lock poisoned".to_string()))?;
        f(&mut doc)
    }
}

fn find(doc: &StoreDocument, id: RecordId) -> StoreResult<&StoredRecord> {
    doc.records
        .iter()
        .find(|r| r.record.id == id)
        .ok_or(StoreError::NotFound(id))
}

fn find_mut(doc: &mut StoreDocument, id: RecordId) -> StoreResult<&mut StoredRecord> {
    doc.records
        .iter_mut()
        .find(|r| r.record.id == id)
        .ok_or(StoreError::NotFound(id))
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn record(&self, id: RecordId) -> StoreResult<Record> {
        self.with_document(|doc| Ok(find(doc, id)?.record.clone()))
    }

    async fn update_record(&self, record: &Record) -> StoreResult<()> {
        self.with_document(|doc| {
            find_mut(doc, record.id)?.record = record.clone();
            Ok(())
        })
    }

    async fn create_record(&self, new: NewRecord) -> StoreResult<RecordId> {
        self.with_document(|doc| {
            let id = doc.records.iter().map(|r| r.record.id).max().unwrap_or(0) + 1;
            doc.records.push(StoredRecord::new(Record {
                id,
                title: new.title,
                content: new.content,
                excerpt: new.excerpt,
                status: new.status,
                kind: new.kind,
                slug: new.slug,
                language: Some(new.language),
            }));
            Ok(id)
        })
    }

    async fn field_tree(&self, id: RecordId) -> StoreResult<FieldMap> {
        self.with_document(|doc| {
            let stored = find(doc, id)?;
            let objects: Vec<FieldObject> = doc
                .field_groups
                .get(&stored.record.kind)
                .into_iter()
                .flatten()
                .filter_map(|schema| {
                    stored.fields.get(&schema.key).map(|value| FieldObject {
                        schema: schema.clone(),
                        value: value.clone(),
                    })
                })
                .collect();
            Ok(field_tree(&objects))
        })
    }

    async fn set_field(&self, id: RecordId, key: &str, value: Value) -> StoreResult<()> {
        self.with_document(|doc| {
            find_mut(doc, id)?.fields.insert(key.to_string(), value);
            Ok(())
        })
    }

    async fn translations(&self, id: RecordId) -> StoreResult<TranslationLinks> {
        self.with_document(|doc| {
            if let Some(group) = doc
                .translation_groups
                .iter()
                .find(|group| group.values().any(|&member| member == id))
            {
                return Ok(group.clone());
            }

            // Not grouped yet: a group of one
            let record = &find(doc, id)?.record;
            Ok(record
                .language
                .iter()
                .map(|language| (language.clone(), id))
                .collect())
        })
    }

    async fn save_translations(&self, links: &TranslationLinks) -> StoreResult<()> {
        self.with_document(|doc| {
            // A record belongs to one group at most
            for group in doc.translation_groups.iter_mut() {
                group.retain(|_, member| !links.values().any(|id| *id == *member));
            }
            doc.translation_groups.retain(|group| !group.is_empty());
            doc.translation_groups.push(links.clone());
            Ok(())
        })
    }

    async fn languages(&self) -> StoreResult<Vec<Language>> {
        self.with_document(|doc| Ok(doc.languages.clone()))
    }

    async fn default_language(&self) -> StoreResult<String> {
        self.with_document(|doc| Ok(doc.default_language.clone()))
    }

    async fn set_machine_translated(&self, id: RecordId, value: bool) -> StoreResult<()> {
        self.with_document(|doc| {
            find_mut(doc, id)?.machine_translated = value;
            Ok(())
        })
    }

    async fn is_machine_translated(&self, id: RecordId) -> StoreResult<bool> {
        self.with_document(|doc| Ok(find(doc, id)?.machine_translated))
    }

    async fn set_translate_error(&self, id: RecordId, error: Option<&str>) -> StoreResult<()> {
        self.with_document(|doc| {
            find_mut(doc, id)?.translate_error = error.map(str::to_string);
            Ok(())
        })
    }

    async fn translate_error(&self, id: RecordId) -> StoreResult<Option<String>> {
        self.with_document(|doc| Ok(find(doc, id)?.translate_error.clone()))
    }
}
