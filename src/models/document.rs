//! The document row and its status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of a document, with the exact numeric codes carried
/// over from the source system's `status_mapping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum DocumentStatus {
    Sync = 1,
    NeedsProcessing = 3,
    NeedsImageManipulation = 7,
    PendingWorkman = 8,
    InWorkman = 9,
    Obsolete = 15,
}

impl DocumentStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Sync),
            3 => Some(Self::NeedsProcessing),
            7 => Some(Self::NeedsImageManipulation),
            8 => Some(Self::PendingWorkman),
            9 => Some(Self::InWorkman),
            15 => Some(Self::Obsolete),
            _ => None,
        }
    }
}

/// A single document asset with a persistent row identity. Content lives in
/// object storage; this row is the only mutable record of its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub offering_id: i64,
    pub loan_id: i64,
    pub path_fragment: String,
    pub status: i32,
    pub page_count: i32,
    pub is_redacted: bool,
    pub deleted: bool,
    pub doc_type_id: Option<i64>,
    pub document_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub split_from_document_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn status(&self) -> Option<DocumentStatus> {
        DocumentStatus::from_code(self.status)
    }

    /// Whether this document has a counterpart it was split from.
    pub fn is_derived(&self) -> bool {
        self.split_from_document_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        for code in [1, 3, 7, 8, 9, 15] {
            let status = DocumentStatus::from_code(code).expect("known code");
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn unknown_status_code_is_none() {
        assert!(DocumentStatus::from_code(0).is_none());
        assert!(DocumentStatus::from_code(2).is_none());
    }
}
