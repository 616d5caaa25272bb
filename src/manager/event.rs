//! Save events and their outcomes

use crate::mt::TranslateError;
use crate::store::{RecordId, StoreError};
use thiserror::Error;

/// Prefix of every translation error stored on a source record
pub const TRANSLATE_ERROR_PREFIX: &str = "An error occurred while translating: ";

/// One record save, as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEvent {
    pub record_id: RecordId,
    /// Autosaves and revision snapshots
    pub is_revision: bool,
    /// Absent for programmatic saves
    pub form: Option<EditorForm>,
}

impl SaveEvent {
    /// Save submitted from the record editor
    pub fn editor(record_id: RecordId, form: EditorForm) -> Self {
        Self {
            record_id,
            is_revision: false,
            form: Some(form),
        }
    }

    pub fn programmatic(record_id: RecordId) -> Self {
        Self {
            record_id,
            is_revision: false,
            form: None,
        }
    }

    pub fn revision(record_id: RecordId) -> Self {
        Self {
            record_id,
            is_revision: true,
            form: None,
        }
    }
}

/// The translation controls of the editor form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorForm {
    /// "Translate now" checkbox
    pub translate_now: bool,
    /// Machine-translated mark on non-pivot records: set, clear, or leave alone
    pub machine_translated: Option<bool>,
}

impl EditorForm {
    pub fn translate_now() -> Self {
        Self {
            translate_now: true,
            machine_translated: None,
        }
    }

    pub fn mark(machine_translated: bool) -> Self {
        Self {
            translate_now: false,
            machine_translated: Some(machine_translated),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Revision,
    /// Not saved through the editor form
    NoEditorForm,
    /// Another save event is already being handled
    Reentrant,
    /// "Translate now" was not ticked
    NotRequested,
    /// The record is not in the pivot language
    NotPivotLanguage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Created,
    Updated,
}

/// One target language that was translated and persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageResult {
    pub language: String,
    pub target_id: RecordId,
    pub action: LinkAction,
}

/// One target language that failed, with its diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageFailure {
    pub language: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped(SkipReason),
    Succeeded(Vec<LanguageResult>),
    Failed {
        reason: String,
        /// Languages that were still persisted
        completed: Vec<LanguageResult>,
        failures: Vec<LanguageFailure>,
    },
}

impl RunOutcome {
    pub(crate) fn failed(reason: String) -> Self {
        RunOutcome::Failed {
            reason,
            completed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded(_))
    }

    /// The message stored on the source record, if the run failed
    pub fn error_message(&self) -> Option<String> {
        match self {
            RunOutcome::Failed { reason, .. } => {
                Some(format!("{}{}", TRANSLATE_ERROR_PREFIX, reason))
            }
            _ => None,
        }
    }
}

/// Errors that abort a language (or, before any language starts, the run)
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The target record exists but the translation group does not list it
    #[error("record {target_id} was created but could not be linked: {source}")]
    Unlinked {
        target_id: RecordId,
        source: StoreError,
    },
}
