//! Translation orchestration
//!
//! [`AutoTranslator`] reacts to record saves. When a record in the pivot
//! language is saved from the editor with "translate now" ticked, every other
//! configured language gets a translated copy:
//!
//! 1. Find the linked target record for the language, if any
//! 2. Extract title, content, excerpt and the field tree in one pass
//! 3. Translate the distinct texts in one backend batch
//! 4. Reinject the translations into a copy of the tree
//! 5. Update the linked target, or create and link a new one
//! 6. Mark the target machine-translated and write its fields
//!
//! Languages are handled one after another and fail independently. The
//! outcome of the run is left on the source record as an error message
//! (or cleared).

use crate::config::Config;
use crate::field::{FieldMap, FieldNode, TextSet, extract, reinject};
use crate::mt::{Deduplicator, TranslateEngine, TranslateResult, engine_locale};
use crate::store::{ContentStore, Language, NewRecord, Record, RecordId, StoreResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod event;
pub mod guard;

#[cfg(test)]
mod integration_tests;

pub use event::{
    EditorForm, LanguageFailure, LanguageResult, LinkAction, RunError, RunOutcome, SaveEvent,
    SkipReason, TRANSLATE_ERROR_PREFIX,
};
pub use guard::{handling_save, is_handling_save};

const TITLE: &str = "title";
const CONTENT: &str = "content";
const EXCERPT: &str = "excerpt";
const FIELDS: &str = "fields";

/// Where the backend comes from
enum EngineHandle {
    /// Built from configuration at the start of every run
    Configured(Config),
    Ready(Arc<dyn TranslateEngine>),
}

type RunEngine = Deduplicator<Arc<dyn TranslateEngine>>;

impl EngineHandle {
    /// The backend for one run, collapsing repeated texts in every batch
    fn resolve(&self) -> TranslateResult<RunEngine> {
        let engine = match self {
            EngineHandle::Configured(config) => config.build_engine()?,
            EngineHandle::Ready(engine) => Arc::clone(engine),
        };
        Ok(Deduplicator::new(engine))
    }
}

pub struct AutoTranslator<S> {
    store: S,
    engine: EngineHandle,
}

impl<S: ContentStore> AutoTranslator<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store,
            engine: EngineHandle::Configured(config),
        }
    }

    pub fn with_engine(store: S, engine: Arc<dyn TranslateEngine>) -> Self {
        Self {
            store,
            engine: EngineHandle::Ready(engine),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The texts a run would send for record `id`, keyed by path
    pub async fn extract_record(&self, id: RecordId) -> Result<TextSet, RunError> {
        let record = self.store.record(id).await?;
        let fields = self.store.field_tree(id).await?;
        Ok(extract(&record_root(&record, &fields)))
    }

    /// Handle one record save
    ///
    /// Revisions, programmatic saves and saves fired by the handling of
    /// another save (the translator's own writes) are skipped without touching
    /// the store. Every other save leaves the source record's translation
    /// error set (failed run) or cleared (anything else). Saves of different
    /// records handled concurrently do not affect each other.
    pub async fn handle_save(&self, event: SaveEvent) -> RunOutcome {
        if event.is_revision {
            debug!(record = event.record_id, "Skipping revision save");
            return RunOutcome::Skipped(SkipReason::Revision);
        }
        let Some(form) = event.form else {
            debug!(record = event.record_id, "Skipping save without editor form");
            return RunOutcome::Skipped(SkipReason::NoEditorForm);
        };
        if is_handling_save() {
            debug!(record = event.record_id, "Skipping nested save");
            return RunOutcome::Skipped(SkipReason::Reentrant);
        }

        handling_save(self.handle_form(event.record_id, form)).await
    }

    async fn handle_form(&self, id: RecordId, form: EditorForm) -> RunOutcome {
        let outcome = match self.process(id, form).await {
            Ok(outcome) => outcome,
            Err(err) => RunOutcome::failed(err.to_string()),
        };

        let message = outcome.error_message();
        if let Some(message) = &message {
            warn!(record = id, error = %message, "Translation run failed");
        }
        if let Err(err) = self.store.set_translate_error(id, message.as_deref()).await {
            warn!(record = id, error = %err, "Could not store translation status");
        }

        outcome
    }

    async fn process(&self, id: RecordId, form: EditorForm) -> Result<RunOutcome, RunError> {
        let record = self.store.record(id).await?;
        let pivot = self.store.default_language().await?;
        let is_pivot = record.language.as_deref() == Some(pivot.as_str());

        if form.translate_now && is_pivot {
            return Ok(self.translate_record(&record).await);
        }

        if let Some(flag) = form.machine_translated {
            self.store.set_machine_translated(id, flag).await?;
        }

        Ok(RunOutcome::Skipped(if is_pivot {
            SkipReason::NotRequested
        } else {
            SkipReason::NotPivotLanguage
        }))
    }

    /// Translate `source` into every non-pivot language
    ///
    /// An engine that cannot be built fails the run before anything is
    /// sent. After that, each language succeeds or fails on its own.
    pub async fn translate_record(&self, source: &Record) -> RunOutcome {
        match self.run(source).await {
            Ok(outcome) => outcome,
            Err(err) => RunOutcome::failed(err.to_string()),
        }
    }

    async fn run(&self, source: &Record) -> Result<RunOutcome, RunError> {
        let engine = self.engine.resolve()?;
        let pivot = self.store.default_language().await?;
        let languages = self.store.languages().await?;
        let fields = self.store.field_tree(source.id).await?;

        info!(
            record = source.id,
            engine = engine.engine_name(),
            "Translating record"
        );

        let mut completed = Vec::new();
        let mut failures = Vec::new();
        for language in languages.iter().filter(|l| l.slug != pivot) {
            match self
                .translate_language(&engine, source, &fields, language)
                .await
            {
                Ok(result) => {
                    info!(
                        record = source.id,
                        language = %language.slug,
                        target = result.target_id,
                        action = ?result.action,
                        "Translation saved"
                    );
                    completed.push(result);
                }
                Err(err) => {
                    warn!(
                        record = source.id,
                        language = %language.slug,
                        error = %err,
                        "Translation failed"
                    );
                    failures.push(LanguageFailure {
                        language: language.slug.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            return Ok(RunOutcome::Succeeded(completed));
        }

        let reason = failures
            .iter()
            .map(|f| format!("{}: {}", f.language, f.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(RunOutcome::Failed {
            reason,
            completed,
            failures,
        })
    }

    /// Translate and persist `source` for one target language
    ///
    /// All texts of the record go to `engine` as one batch, so each distinct
    /// text reaches the backend once.
    pub async fn translate_language<E: TranslateEngine>(
        &self,
        engine: &Deduplicator<E>,
        source: &Record,
        fields: &FieldMap,
        language: &Language,
    ) -> Result<LanguageResult, RunError> {
        let existing = self
            .store
            .translations(source.id)
            .await?
            .get(&language.slug)
            .copied();
        let locale = engine_locale(&language.locale)?;

        let root = record_root(source, fields);
        let texts = extract(&root);
        debug!(
            record = source.id,
            language = %language.slug,
            texts = texts.len(),
            "Extracted texts"
        );

        let translated = engine
            .translate_batch(&texts.source_texts(), &locale)
            .await?;
        let translated = reinject(&root, &texts.with_translations(translated));
        let output = TranslatedRecord::split(translated, source, fields);

        let slug = format!("{}-{}", source.slug, language.slug);
        let (target_id, action) = match existing {
            Some(target_id) => {
                let mut target = self.store.record(target_id).await?;
                target.title = output.title;
                target.content = output.content;
                target.excerpt = output.excerpt;
                target.slug = slug;
                self.store.update_record(&target).await?;
                (target_id, LinkAction::Updated)
            }
            None => {
                let target_id = self
                    .store
                    .create_record(NewRecord {
                        title: output.title,
                        content: output.content,
                        excerpt: output.excerpt,
                        status: source.status.clone(),
                        kind: source.kind.clone(),
                        slug,
                        language: language.slug.clone(),
                    })
                    .await?;

                if let Err(err) = self.link(source.id, &language.slug, target_id).await {
                    warn!(
                        record = source.id,
                        language = %language.slug,
                        target = target_id,
                        "Created target record is not linked"
                    );
                    return Err(RunError::Unlinked {
                        target_id,
                        source: err,
                    });
                }
                (target_id, LinkAction::Created)
            }
        };

        self.store.set_machine_translated(target_id, true).await?;
        for (key, node) in &output.fields {
            self.store.set_field(target_id, key, node.to_value()).await?;
        }

        Ok(LanguageResult {
            language: language.slug.clone(),
            target_id,
            action,
        })
    }

    /// Add `target_id` to the translation group of `source_id`
    async fn link(
        &self,
        source_id: RecordId,
        language: &str,
        target_id: RecordId,
    ) -> StoreResult<()> {
        let mut links = self.store.translations(source_id).await?;
        links.insert(language.to_string(), target_id);
        self.store.save_translations(&links).await
    }
}

/// Title, content, excerpt and the field tree mounted under `fields`
fn record_root(source: &Record, fields: &FieldMap) -> FieldMap {
    let mut root = FieldMap::new();
    root.insert(TITLE.to_string(), FieldNode::Text(source.title.clone()));
    root.insert(CONTENT.to_string(), FieldNode::Text(source.content.clone()));
    root.insert(EXCERPT.to_string(), FieldNode::Text(source.excerpt.clone()));
    root.insert(FIELDS.to_string(), FieldNode::Group(fields.clone()));
    root
}

struct TranslatedRecord {
    title: String,
    content: String,
    excerpt: String,
    fields: FieldMap,
}

impl TranslatedRecord {
    fn split(mut root: FieldMap, source: &Record, fields: &FieldMap) -> Self {
        let mut text = |name: &str, fallback: &str| match root.shift_remove(name) {
            Some(FieldNode::Text(text)) => text,
            _ => fallback.to_string(),
        };

        let title = text(TITLE, &source.title);
        let content = text(CONTENT, &source.content);
        let excerpt = text(EXCERPT, &source.excerpt);
        let fields = match root.shift_remove(FIELDS) {
            Some(FieldNode::Group(translated)) => translated,
            _ => fields.clone(),
        };

        Self {
            title,
            content,
            excerpt,
            fields,
        }
    }
}
