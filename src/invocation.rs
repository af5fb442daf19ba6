//! Invocation payload/response shapes (spec §6): the JSON envelope whatever
//! external transport (queue worker, serverless trigger, or the CLI harness
//! in [`crate::cli`]) hands to and receives from [`crate::pipeline::Pipeline`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ProcessManipulations,
    SplitDocument,
    HealthCheck,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmarkInput {
    pub bookmark_id: i64,
    pub page_index: i32,
    pub document_type_id: i64,
    pub document_type_name: String,
    pub document_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvocationPayload {
    pub operation: Operation,
    pub image_id: i64,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub progress_callback_url: Option<String>,
    #[serde(default)]
    pub bookmarks: Vec<BookmarkInput>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl InvocationPayload {
    /// Eagerly validates required fields per operation, ahead of any
    /// document status mutation — a bad payload must never touch state.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.image_id <= 0 {
            return Err(PipelineError::PayloadInvalid("imageId must be positive".into()));
        }
        if self.operation == Operation::SplitDocument {
            if self.bookmarks.is_empty() {
                return Err(PipelineError::PayloadInvalid(
                    "split_document requires at least one bookmark".into(),
                ));
            }
            for b in &self.bookmarks {
                if b.document_type_name.trim().is_empty() {
                    return Err(PipelineError::PayloadInvalid(format!(
                        "bookmark {} missing documentTypeName",
                        b.bookmark_id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn session_id(&self) -> String {
        self.session_id.clone().unwrap_or_else(|| format!("local-{}", self.image_id))
    }
}

#[derive(Debug, Serialize)]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Serialize)]
pub struct ResponseBody {
    pub success: bool,
    pub image_id: i64,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvocationResponse {
    pub fn success(image_id: i64, session_id: String, result: Value, processing_time: f64) -> Self {
        Self {
            status_code: 200,
            body: ResponseBody {
                success: true,
                image_id,
                session_id,
                result: Some(result),
                processing_time,
                error: None,
            },
        }
    }

    pub fn failure(image_id: i64, session_id: String, error: impl ToString, processing_time: f64) -> Self {
        Self {
            status_code: 500,
            body: ResponseBody {
                success: false,
                image_id,
                session_id,
                result: None,
                processing_time,
                error: Some(error.to_string()),
            },
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.status_code == 200 {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_split_without_bookmarks() {
        let payload = InvocationPayload {
            operation: Operation::SplitDocument,
            image_id: 1,
            session_id: None,
            timeout: None,
            progress_callback_url: None,
            bookmarks: Vec::new(),
            metadata: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn accepts_health_check_without_bookmarks() {
        let payload = InvocationPayload {
            operation: Operation::HealthCheck,
            image_id: 1,
            session_id: None,
            timeout: None,
            progress_callback_url: None,
            bookmarks: Vec::new(),
            metadata: None,
        };
        assert!(payload.validate().is_ok());
    }
}
