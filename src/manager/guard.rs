//! Nested-save detection
//!
//! Persisting a translation saves records, and every save reaches the
//! translator again on the same call stack. Handling a save runs inside a
//! task-local scope; a save event that arrives while that scope is active is
//! one the handler caused itself and is skipped. Saves handled by other tasks,
//! or by sibling futures of the same task, never see the scope.

use std::future::Future;

tokio::task_local! {
    static HANDLING_SAVE: ();
}

/// Whether the current future runs inside [`handling_save`]
pub fn is_handling_save() -> bool {
    HANDLING_SAVE.try_with(|_| ()).is_ok()
}

/// Run `fut` with the save-handling scope entered
pub async fn handling_save<F: Future>(fut: F) -> F::Output {
    HANDLING_SAVE.scope((), fut).await
}
