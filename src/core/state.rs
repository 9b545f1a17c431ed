use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::notifications::AssignmentNotifier;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    notifier: Arc<dyn AssignmentNotifier>,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, notifier: Arc<dyn AssignmentNotifier>) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, notifier }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn notifier(&self) -> &dyn AssignmentNotifier {
        self.inner.notifier.as_ref()
    }

    /// Number of sets every exam is partitioned into.
    pub(crate) fn set_count(&self) -> i32 {
        self.inner.settings.allocation().set_count
    }
}
