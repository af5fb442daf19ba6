//! Declarative edit rows consumed by the pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A redaction rectangle in page coordinates, optionally rotation-aware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redaction {
    pub id: i64,
    pub document_id: i64,
    pub page_number: i32,
    pub page_x: f64,
    pub page_y: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub draw_orientation: i32,
    pub text: Option<String>,
    pub applied: bool,
    pub date_applied: Option<DateTime<Utc>>,
}

/// An absolute page rotation to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rotation {
    pub id: i64,
    pub document_id: i64,
    pub page_index: i32,
    pub angle: i32,
}

/// A page to remove from the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDeletion {
    pub id: i64,
    pub document_id: i64,
    pub page_index: i32,
}

/// A user-declared split point (bookmark).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageBreak {
    pub id: i64,
    pub document_id: i64,
    pub page_index: i32,
    pub doc_type_id: i64,
    pub doc_type_name: String,
    pub document_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub result_document_id: Option<i64>,
    pub deleted: bool,
}

/// Append-only audit row relating a source document to a produced one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitLog {
    pub id: i64,
    pub source_document_id: i64,
    pub split_document_id: i64,
    pub split_by: i64,
    pub created_at: DateTime<Utc>,
}
