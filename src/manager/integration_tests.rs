//! End-to-End Tests for the Translation Orchestrator
//!
//! These tests drive `AutoTranslator::handle_save` against a `MemoryStore`
//! and a recording `MockEngine`, so every request that would reach a vendor
//! can be checked.
//!
//! ```bash
//! cargo test --lib manager::integration_tests
//! ```

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::field::{FieldPath, FieldSchema, TextSet};
    use crate::mt::{MockEngine, MockMode, translate_unique};
    use crate::store::{MemoryStore, StoreError, StoreResult, TranslationLinks};
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Mutex, OnceLock, Weak};
    use std::time::Duration;

    const SOURCE: RecordId = 1;

    fn source_record() -> Record {
        Record {
            id: SOURCE,
            title: "Hello".to_string(),
            content: "<p>Hello</p>".to_string(),
            excerpt: String::new(),
            status: "publish".to_string(),
            kind: "post".to_string(),
            slug: "hello".to_string(),
            language: Some("en".to_string()),
        }
    }

    fn fixture_store() -> MemoryStore {
        let store = MemoryStore::new(
            "en",
            vec![
                Language::new("en", "en_US"),
                Language::new("fr", "fr_FR"),
                Language::new("de", "de_DE"),
            ],
        );
        store
            .define_fields(
                "post",
                vec![
                    FieldSchema::new("field_subtitle", "subtitle", "text"),
                    FieldSchema::new("field_body", "body", "group").with_sub_fields(vec![
                        FieldSchema::new("field_intro", "intro", "wysiwyg"),
                        FieldSchema::new("field_notes", "notes", "textarea"),
                    ]),
                    FieldSchema::new("field_gallery", "gallery", "repeater").with_sub_fields(vec![
                        FieldSchema::new("field_caption", "caption", "text"),
                        FieldSchema::new("field_image", "image", "image"),
                    ]),
                    FieldSchema::new("field_count", "count", "number"),
                ],
            )
            .unwrap();

        let mut fields = IndexMap::new();
        fields.insert("field_subtitle".to_string(), json!("World"));
        fields.insert("field_body".to_string(), json!({"intro": "Hi", "notes": "Hi"}));
        fields.insert(
            "field_gallery".to_string(),
            json!([{"caption": "A", "image": 11}, {"caption": "", "image": 12}]),
        );
        fields.insert("field_count".to_string(), json!(3));
        store.put_record(source_record(), fields).unwrap();
        store
    }

    fn translator(mode: MockMode) -> (AutoTranslator<MemoryStore>, Arc<MockEngine>) {
        let mock = Arc::new(MockEngine::new(mode));
        (AutoTranslator::with_engine(fixture_store(), mock.clone()), mock)
    }

    fn translate_now() -> SaveEvent {
        SaveEvent::editor(SOURCE, EditorForm::translate_now())
    }

    fn field(store: &MemoryStore, id: RecordId, key: &str) -> Value {
        store.field_value(id, key).unwrap().unwrap_or(Value::Null)
    }

    // ============================================================================
    // Field tree pipeline
    // ============================================================================

    #[tokio::test]
    async fn test_group_with_repeated_text_is_sent_once() {
        let mut body = FieldMap::new();
        body.insert("intro".into(), FieldNode::text("Hi"));
        body.insert("notes".into(), FieldNode::text("Hi"));
        let mut tree = FieldMap::new();
        tree.insert("title".into(), FieldNode::text("Hello"));
        tree.insert("body".into(), FieldNode::Group(body));

        let mappings = HashMap::from([
            (("Hello".to_string(), "fr".to_string()), "Bonjour".to_string()),
            (("Hi".to_string(), "fr".to_string()), "Salut".to_string()),
        ]);
        let mock = MockEngine::new(MockMode::Mappings(mappings));

        let texts = extract(&tree);
        let paths: Vec<&str> = texts.paths().map(FieldPath::as_str).collect();
        assert_eq!(paths, vec!["title", "body.intro", "body.notes"]);

        let translated = translate_unique(&mock, &texts.source_texts(), "fr")
            .await
            .unwrap();
        let result = reinject(&tree, &texts.with_translations(translated));

        assert_eq!(
            mock.calls(),
            vec![(vec!["Hello".to_string(), "Hi".to_string()], "fr".to_string())]
        );
        assert_eq!(
            FieldNode::Group(result).to_value(),
            json!({"title": "Bonjour", "body": {"intro": "Salut", "notes": "Salut"}})
        );
    }

    #[tokio::test]
    async fn test_blank_repeater_row_is_left_alone() {
        let rows = ["A", ""]
            .iter()
            .map(|caption| {
                let mut row = FieldMap::new();
                row.insert("caption".into(), FieldNode::text(caption));
                row
            })
            .collect();
        let mut tree = FieldMap::new();
        tree.insert("rows".into(), FieldNode::Repeater(rows));

        let mock = MockEngine::new(MockMode::Suffix);
        let texts = extract(&tree);
        assert_eq!(texts.len(), 1);
        assert_eq!(texts.get("rows.0.caption"), Some("A"));

        let translated = translate_unique(&mock, &texts.source_texts(), "fr")
            .await
            .unwrap();
        let result = reinject(&tree, &texts.with_translations(translated));
        assert_eq!(
            FieldNode::Group(result).to_value(),
            json!({"rows": [{"caption": "A_fr"}, {"caption": ""}]})
        );
    }

    #[tokio::test]
    async fn test_partial_translation_keeps_untranslated_leaves() {
        let store = fixture_store();
        let fields = store.field_tree(SOURCE).await.unwrap();
        let root = record_root(&source_record(), &fields);

        let mut partial = TextSet::new();
        partial.insert(FieldPath::from("fields.field_body.notes"), "Notes".to_string());
        let result = reinject(&root, &partial);

        let texts = extract(&result);
        assert_eq!(texts.get("fields.field_body.intro"), Some("Hi"));
        assert_eq!(texts.get("fields.field_body.notes"), Some("Notes"));
        assert_eq!(texts.get("title"), Some("Hello"));
    }

    #[tokio::test]
    async fn test_extract_record_lists_outgoing_texts() {
        let (translator, mock) = translator(MockMode::Suffix);
        let texts = translator.extract_record(SOURCE).await.unwrap();

        let paths: Vec<&str> = texts.paths().map(FieldPath::as_str).collect();
        assert_eq!(
            paths,
            vec![
                "title",
                "content",
                "fields.field_subtitle",
                "fields.field_body.intro",
                "fields.field_body.notes",
                "fields.field_gallery.0.caption",
            ]
        );
        assert_eq!(mock.call_count(), 0);
    }

    // ============================================================================
    // Create, then update
    // ============================================================================

    #[tokio::test]
    async fn test_first_save_creates_linked_targets() {
        let (translator, _mock) = translator(MockMode::Suffix);

        let outcome = translator.handle_save(translate_now()).await;
        assert_eq!(
            outcome,
            RunOutcome::Succeeded(vec![
                LanguageResult {
                    language: "fr".to_string(),
                    target_id: 2,
                    action: LinkAction::Created,
                },
                LanguageResult {
                    language: "de".to_string(),
                    target_id: 3,
                    action: LinkAction::Created,
                },
            ])
        );

        let store = translator.store();
        let fr = store.record(2).await.unwrap();
        assert_eq!(fr.title, "Hello_fr-FR");
        assert_eq!(fr.content, "<p>Hello</p>_fr-FR");
        assert_eq!(fr.excerpt, "");
        assert_eq!(fr.slug, "hello-fr");
        assert_eq!(fr.status, "publish");
        assert_eq!(fr.kind, "post");
        assert_eq!(fr.language.as_deref(), Some("fr"));
        assert!(store.is_machine_translated(2).await.unwrap());
        assert!(!store.is_machine_translated(SOURCE).await.unwrap());

        assert_eq!(
            store.translations(SOURCE).await.unwrap(),
            TranslationLinks::from([
                ("de".to_string(), 3),
                ("en".to_string(), SOURCE),
                ("fr".to_string(), 2),
            ])
        );
        assert_eq!(store.translate_error(SOURCE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fields_are_translated_into_target() {
        let (translator, _mock) = translator(MockMode::Suffix);
        translator.handle_save(translate_now()).await;

        let store = translator.store();
        assert_eq!(field(store, 3, "field_subtitle"), json!("World_de-DE"));
        assert_eq!(
            field(store, 3, "field_body"),
            json!({"intro": "Hi_de-DE", "notes": "Hi_de-DE"})
        );
        assert_eq!(
            field(store, 3, "field_gallery"),
            json!([{"caption": "A_de-DE", "image": 11}, {"caption": "", "image": 12}])
        );
        assert_eq!(field(store, 3, "field_count"), json!(3));

        // Same shape as the source, so the target loads the same way
        let source_tree = store.field_tree(SOURCE).await.unwrap();
        let target_tree = store.field_tree(3).await.unwrap();
        assert!(crate::field::maps_same_shape(&source_tree, &target_tree));
    }

    #[tokio::test]
    async fn test_second_save_updates_same_target() {
        let (translator, _mock) = translator(MockMode::Suffix);
        translator.handle_save(translate_now()).await;

        let store = translator.store();
        let mut source = store.record(SOURCE).await.unwrap();
        source.title = "Hello again".to_string();
        store.update_record(&source).await.unwrap();

        // Host-side attributes of the target survive the update
        let mut fr = store.record(2).await.unwrap();
        fr.status = "draft".to_string();
        store.update_record(&fr).await.unwrap();

        let outcome = translator.handle_save(translate_now()).await;
        let RunOutcome::Succeeded(results) = outcome else {
            panic!("Expected success, got {:?}", outcome);
        };
        assert!(results.iter().all(|r| r.action == LinkAction::Updated));
        assert_eq!(
            results.iter().map(|r| r.target_id).collect::<Vec<_>>(),
            vec![2, 3]
        );

        let fr = store.record(2).await.unwrap();
        assert_eq!(fr.title, "Hello again_fr-FR");
        assert_eq!(fr.status, "draft");
        assert_eq!(store.document().unwrap().records.len(), 3);
    }

    // ============================================================================
    // Batching
    // ============================================================================

    #[tokio::test]
    async fn test_one_deduplicated_batch_per_language() {
        let (translator, mock) = translator(MockMode::Suffix);
        translator.handle_save(translate_now()).await;

        let expected: Vec<String> = ["Hello", "<p>Hello</p>", "World", "Hi", "A"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            mock.calls(),
            vec![
                (expected.clone(), "fr-FR".to_string()),
                (expected, "de-DE".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_record_never_calls_backend() {
        let mock = Arc::new(MockEngine::new(MockMode::Suffix));
        let store = MemoryStore::new(
            "en",
            vec![Language::new("en", "en_US"), Language::new("fr", "fr_FR")],
        );
        let mut blank = source_record();
        blank.title = "  ".to_string();
        blank.content = String::new();
        store.put_record(blank, IndexMap::new()).unwrap();

        let translator = AutoTranslator::with_engine(store, mock.clone());
        let outcome = translator.handle_save(translate_now()).await;

        assert!(outcome.is_success());
        assert_eq!(mock.call_count(), 0);
        assert_eq!(translator.store().record(2).await.unwrap().title, "  ");
    }

    // ============================================================================
    // Failures
    // ============================================================================

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_language() {
        let mock =
            Arc::new(MockEngine::new(MockMode::Suffix).failing_for("de-DE", "quota exceeded"));
        let translator = AutoTranslator::with_engine(fixture_store(), mock.clone());

        let outcome = translator.handle_save(translate_now()).await;
        let RunOutcome::Failed {
            completed,
            failures,
            ..
        } = &outcome
        else {
            panic!("Expected failure, got {:?}", outcome);
        };
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].language, "fr");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].language, "de");

        let store = translator.store();
        assert_eq!(
            store.translate_error(SOURCE).await.unwrap().as_deref(),
            Some(
                "An error occurred while translating: \
                 de: Mock Engine translation error: quota exceeded"
            )
        );
        assert_eq!(store.record(2).await.unwrap().title, "Hello_fr-FR");
        assert!(!store.translations(SOURCE).await.unwrap().contains_key("de"));
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let (translator, _mock) = translator(MockMode::Suffix);
        let store = translator.store();
        store
            .set_translate_error(SOURCE, Some("An error occurred while translating: old"))
            .await
            .unwrap();

        translator.handle_save(translate_now()).await;
        assert_eq!(store.translate_error(SOURCE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_configuration_error_aborts_before_sending() {
        let translator = AutoTranslator::new(fixture_store(), Config::default());

        let outcome = translator.handle_save(translate_now()).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }));

        let store = translator.store();
        let error = store.translate_error(SOURCE).await.unwrap().unwrap();
        assert!(error.starts_with(TRANSLATE_ERROR_PREFIX));
        assert!(error.contains("DeepL API key is not configured"));
        assert_eq!(store.document().unwrap().records.len(), 1);
    }

    #[tokio::test]
    async fn test_truncated_response_fails_language() {
        let (translator, _mock) = translator(MockMode::Truncate(2));

        let outcome = translator.handle_save(translate_now()).await;
        let RunOutcome::Failed {
            completed,
            failures,
            ..
        } = outcome
        else {
            panic!("Expected failure");
        };
        assert!(completed.is_empty());
        assert_eq!(failures.len(), 2);
        // Nothing was created for a language whose batch came back short
        assert_eq!(translator.store().document().unwrap().records.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_locale_fails_only_that_language() {
        let mock = Arc::new(MockEngine::new(MockMode::Suffix));
        let store = fixture_store();
        let mut document = store.document().unwrap();
        document.languages.push(Language::new("zz", "??"));
        let translator =
            AutoTranslator::with_engine(MemoryStore::from_document(document), mock.clone());

        let outcome = translator.handle_save(translate_now()).await;
        let RunOutcome::Failed {
            completed,
            failures,
            ..
        } = outcome
        else {
            panic!("Expected failure");
        };
        assert_eq!(completed.len(), 2);
        assert_eq!(failures[0].language, "zz");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_record_fails() {
        let (translator, mock) = translator(MockMode::Suffix);
        let outcome = translator
            .handle_save(SaveEvent::editor(99, EditorForm::translate_now()))
            .await;
        assert_eq!(outcome, RunOutcome::failed("record 99 not found".to_string()));
        assert_eq!(mock.call_count(), 0);
    }

    // ============================================================================
    // Skipped saves
    // ============================================================================

    #[tokio::test]
    async fn test_revision_and_programmatic_saves_touch_nothing() {
        let (translator, mock) = translator(MockMode::Suffix);
        let store = translator.store();
        store.set_translate_error(SOURCE, Some("kept")).await.unwrap();

        assert_eq!(
            translator.handle_save(SaveEvent::revision(SOURCE)).await,
            RunOutcome::Skipped(SkipReason::Revision)
        );
        assert_eq!(
            translator.handle_save(SaveEvent::programmatic(SOURCE)).await,
            RunOutcome::Skipped(SkipReason::NoEditorForm)
        );
        assert_eq!(mock.call_count(), 0);
        assert_eq!(store.translate_error(SOURCE).await.unwrap().as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_unticked_save_clears_error() {
        let (translator, mock) = translator(MockMode::Suffix);
        let store = translator.store();
        store.set_translate_error(SOURCE, Some("old")).await.unwrap();

        let outcome = translator
            .handle_save(SaveEvent::editor(SOURCE, EditorForm::default()))
            .await;
        assert_eq!(outcome, RunOutcome::Skipped(SkipReason::NotRequested));
        assert_eq!(store.translate_error(SOURCE).await.unwrap(), None);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_machine_translated_mark_on_target() {
        let (translator, mock) = translator(MockMode::Suffix);
        translator.handle_save(translate_now()).await;
        let store = translator.store();
        let calls = mock.call_count();

        let outcome = translator
            .handle_save(SaveEvent::editor(2, EditorForm::mark(false)))
            .await;
        assert_eq!(outcome, RunOutcome::Skipped(SkipReason::NotPivotLanguage));
        assert!(!store.is_machine_translated(2).await.unwrap());

        translator
            .handle_save(SaveEvent::editor(2, EditorForm::mark(true)))
            .await;
        assert!(store.is_machine_translated(2).await.unwrap());

        // No choice in the form leaves the flag alone
        translator
            .handle_save(SaveEvent::editor(2, EditorForm::default()))
            .await;
        assert!(store.is_machine_translated(2).await.unwrap());

        // Translating from a non-pivot record is never attempted
        let outcome = translator
            .handle_save(SaveEvent::editor(2, EditorForm::translate_now()))
            .await;
        assert_eq!(outcome, RunOutcome::Skipped(SkipReason::NotPivotLanguage));
        assert_eq!(mock.call_count(), calls);
    }

    // ============================================================================
    // Re-entrancy
    // ============================================================================

    #[tokio::test]
    async fn test_save_inside_handling_scope_is_skipped() {
        let (translator, mock) = translator(MockMode::Suffix);

        let outcome = handling_save(translator.handle_save(translate_now())).await;
        assert_eq!(outcome, RunOutcome::Skipped(SkipReason::Reentrant));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_saves_of_different_records_both_run() {
        const OTHER: RecordId = 10;

        let mock = Arc::new(MockEngine::with_delay(MockMode::Suffix, 100));
        let store = fixture_store();
        store
            .put_record(
                Record {
                    id: OTHER,
                    title: "Other".to_string(),
                    slug: "other".to_string(),
                    ..source_record()
                },
                IndexMap::new(),
            )
            .unwrap();
        store.set_translate_error(OTHER, Some("stale")).await.unwrap();
        let translator = AutoTranslator::with_engine(store, mock.clone());

        let (first, second) = tokio::join!(translator.handle_save(translate_now()), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            translator
                .handle_save(SaveEvent::editor(OTHER, EditorForm::translate_now()))
                .await
        });

        assert!(first.is_success(), "{:?}", first);
        assert!(second.is_success(), "{:?}", second);
        let store = translator.store();
        assert_eq!(store.translate_error(OTHER).await.unwrap(), None);
        assert_eq!(store.translations(OTHER).await.unwrap().len(), 3);
        assert_eq!(mock.call_count(), 4);
    }

    /// Store that reports its own record saves back to the translator, the
    /// way a host fires save hooks for every write
    struct HookedStore {
        inner: MemoryStore,
        translator: OnceLock<Weak<AutoTranslator<Arc<HookedStore>>>>,
        nested: Mutex<Vec<RunOutcome>>,
        read_only_links: bool,
    }

    impl HookedStore {
        fn new(read_only_links: bool) -> Arc<Self> {
            Arc::new(HookedStore {
                inner: fixture_store(),
                translator: OnceLock::new(),
                nested: Mutex::new(Vec::new()),
                read_only_links,
            })
        }

        async fn fire(&self, id: RecordId) {
            let Some(translator) = self.translator.get().and_then(Weak::upgrade) else {
                return;
            };
            let outcome = translator
                .handle_save(SaveEvent::editor(id, EditorForm::translate_now()))
                .await;
            self.nested.lock().unwrap().push(outcome);
        }
    }

    #[async_trait]
    impl ContentStore for HookedStore {
        async fn record(&self, id: RecordId) -> StoreResult<Record> {
            self.inner.record(id).await
        }

        async fn update_record(&self, record: &Record) -> StoreResult<()> {
            self.inner.update_record(record).await?;
            self.fire(record.id).await;
            Ok(())
        }

        async fn create_record(&self, record: NewRecord) -> StoreResult<RecordId> {
            let id = self.inner.create_record(record).await?;
            self.fire(id).await;
            Ok(id)
        }

        async fn field_tree(&self, id: RecordId) -> StoreResult<FieldMap> {
            self.inner.field_tree(id).await
        }

        async fn set_field(&self, id: RecordId, key: &str, value: Value) -> StoreResult<()> {
            self.inner.set_field(id, key, value).await
        }

        async fn translations(&self, id: RecordId) -> StoreResult<TranslationLinks> {
            self.inner.translations(id).await
        }

        async fn save_translations(&self, links: &TranslationLinks) -> StoreResult<()> {
            if self.read_only_links {
                return Err(StoreError::Other("translation links are read-only".to_string()));
            }
            self.inner.save_translations(links).await
        }

        async fn languages(&self) -> StoreResult<Vec<Language>> {
            self.inner.languages().await
        }

        async fn default_language(&self) -> StoreResult<String> {
            self.inner.default_language().await
        }

        async fn set_machine_translated(&self, id: RecordId, value: bool) -> StoreResult<()> {
            self.inner.set_machine_translated(id, value).await
        }

        async fn is_machine_translated(&self, id: RecordId) -> StoreResult<bool> {
            self.inner.is_machine_translated(id).await
        }

        async fn set_translate_error(&self, id: RecordId, error: Option<&str>) -> StoreResult<()> {
            self.inner.set_translate_error(id, error).await
        }

        async fn translate_error(&self, id: RecordId) -> StoreResult<Option<String>> {
            self.inner.translate_error(id).await
        }
    }

    #[tokio::test]
    async fn test_saves_fired_by_persistence_are_skipped() {
        let mock = Arc::new(MockEngine::new(MockMode::Suffix));
        let store = HookedStore::new(false);
        let translator = Arc::new(AutoTranslator::with_engine(Arc::clone(&store), mock.clone()));
        let _ = store.translator.set(Arc::downgrade(&translator));

        // Create, then update: both fire nested saves
        assert!(translator.handle_save(translate_now()).await.is_success());
        assert!(translator.handle_save(translate_now()).await.is_success());

        let nested = store.nested.lock().unwrap().clone();
        assert_eq!(nested.len(), 4);
        assert!(
            nested
                .iter()
                .all(|o| *o == RunOutcome::Skipped(SkipReason::Reentrant))
        );
        assert_eq!(mock.call_count(), 4);
        assert!(!is_handling_save());
    }

    // ============================================================================
    // Linking
    // ============================================================================

    #[tokio::test]
    async fn test_unlinked_target_is_named_in_error() {
        let mock = Arc::new(MockEngine::new(MockMode::Suffix));
        let store = HookedStore::new(true);
        let translator = AutoTranslator::with_engine(Arc::clone(&store), mock.clone());

        let outcome = translator.handle_save(translate_now()).await;
        let RunOutcome::Failed {
            completed,
            failures,
            ..
        } = &outcome
        else {
            panic!("Expected failure");
        };
        assert!(completed.is_empty());
        assert_eq!(
            failures[0].reason,
            "record 2 was created but could not be linked: translation links are read-only"
        );
        assert!(failures[1].reason.starts_with("record 3 was created"));

        let error = store.translate_error(SOURCE).await.unwrap().unwrap();
        assert!(error.contains("fr: record 2 was created but could not be linked"));
        assert!(error.contains("de: record 3 was created but could not be linked"));
        assert_eq!(store.inner.record(2).await.unwrap().slug, "hello-fr");
    }
}
