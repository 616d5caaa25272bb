//! Automatic translation of structured content records
//!
//! A record saved in the pivot language is translated into every other
//! configured language: its title, content, excerpt and custom field tree
//! are extracted, deduplicated into one batch per language, sent to DeepL or
//! Google Cloud Translation, and written back into linked target records.

pub mod config;
pub mod field;
pub mod manager;
pub mod mt;
pub mod store;

pub use config::{Config, EngineKind};
pub use field::{FieldMap, FieldNode, FieldPath, TextSet, extract, reinject};
pub use manager::{AutoTranslator, EditorForm, RunOutcome, SaveEvent, SkipReason};
pub use mt::{TranslateEngine, TranslateError, TranslateResult};
pub use store::{ContentStore, Language, MemoryStore, Record, RecordId, StoreError};
