use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use validator::ValidateEmail;

use crate::core::config::Settings;
use crate::core::metrics;

/// What a candidate needs to sit an exam after being enrolled.
#[derive(Clone, Serialize)]
pub(crate) struct AssignmentNotice {
    pub(crate) student_id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) access_code: String,
    pub(crate) exam_id: i64,
    pub(crate) exam_title: String,
    pub(crate) exam_link: String,
    pub(crate) set_number: i32,
    pub(crate) slot_number: i32,
}

impl fmt::Debug for AssignmentNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssignmentNotice")
            .field("student_id", &self.student_id)
            .field("email", &self.email)
            .field("access_code", &"<redacted>")
            .field("exam_id", &self.exam_id)
            .field("exam_link", &self.exam_link)
            .field("set_number", &self.set_number)
            .finish()
    }
}

#[derive(Debug, Error)]
pub(crate) enum NotifyError {
    #[error("invalid recipient address {0:?}")]
    InvalidRecipient(String),
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook rejected notification with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub(crate) trait AssignmentNotifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify_assigned(&self, notice: &AssignmentNotice) -> Result<(), NotifyError>;
}

/// Writes notices to the log only. Used when no webhook is configured.
#[derive(Debug, Default)]
pub(crate) struct LogNotifier;

#[async_trait]
impl AssignmentNotifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify_assigned(&self, notice: &AssignmentNotice) -> Result<(), NotifyError> {
        tracing::info!(
            student_id = %notice.student_id,
            email = %notice.email,
            exam_id = notice.exam_id,
            exam_link = %notice.exam_link,
            set_number = notice.set_number,
            "Exam assignment notice"
        );
        Ok(())
    }
}

/// Posts each notice as JSON to a delivery endpoint that owns the actual mail transport.
#[derive(Debug, Clone)]
pub(crate) struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub(crate) fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("Failed to build notification HTTP client")?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl AssignmentNotifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify_assigned(&self, notice: &AssignmentNotice) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(notice).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn AssignmentNotifier>> {
    let notifications = settings.notifications();
    match notifications.webhook_url.as_deref() {
        Some(url) => {
            let timeout = Duration::from_secs(notifications.timeout_seconds);
            tracing::info!(url, "Assignment notices go to webhook");
            Ok(Arc::new(WebhookNotifier::new(url, timeout)?))
        }
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL not set; assignment notices are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Sends a notice and swallows any failure. Returns whether delivery succeeded.
pub(crate) async fn notify_best_effort(
    notifier: &dyn AssignmentNotifier,
    notice: &AssignmentNotice,
) -> bool {
    let result = if notice.email.validate_email() {
        notifier.notify_assigned(notice).await
    } else {
        Err(NotifyError::InvalidRecipient(notice.email.clone()))
    };

    match result {
        Ok(()) => true,
        Err(err) => {
            metrics::notification_failed();
            tracing::warn!(
                error = %err,
                notifier = notifier.name(),
                student_id = %notice.student_id,
                exam_id = notice.exam_id,
                "Failed to send assignment notice"
            );
            false
        }
    }
}
