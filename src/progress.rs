//! Progress Reporter (spec §4.9): best-effort HTTP status updates. Failures
//! here are logged and swallowed — they must never interrupt the pipeline.

use serde::Serialize;
use std::time::Duration;

const USER_AGENT: &str = "pdf-workman/0.1";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Serialize)]
struct ProgressPayload<'a> {
    #[serde(rename = "sessionId")]
    session_id: &'a str,
    #[serde(rename = "imageId")]
    image_id: i64,
    status: ProgressStatus,
    progress: u8,
    message: &'a str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

pub struct ProgressReporter {
    client: reqwest::Client,
    base_url: Option<String>,
    enabled: bool,
}

impl ProgressReporter {
    pub fn new(base_url: Option<String>, enabled: bool, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client builder should not fail with static config");

        Self {
            client,
            base_url,
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
            enabled: false,
        }
    }

    /// Post a progress update. Never returns an error to the caller; any
    /// failure is logged at `warn` and swallowed, per spec §7's
    /// `CallbackError` being non-fatal by definition.
    pub async fn update(
        &self,
        session_id: &str,
        image_id: i64,
        status: ProgressStatus,
        progress: u8,
        message: &str,
        data: Option<serde_json::Value>,
    ) {
        let Some(base_url) = self.base_url.as_ref().filter(|_| self.enabled) else {
            tracing::debug!(session_id, image_id, progress, "progress callbacks disabled, skipping");
            return;
        };

        let url = format!("{}/{}", base_url.trim_end_matches('/'), session_id);
        let payload = ProgressPayload {
            session_id,
            image_id,
            status,
            progress,
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
            data,
        };

        match self.client.post(&url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(session_id, progress, "progress callback delivered");
            }
            Ok(resp) => {
                tracing::warn!(session_id, status = %resp.status(), "progress callback returned non-success status");
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "progress callback failed");
            }
        }
    }
}
