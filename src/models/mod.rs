//! Data models for the manipulation pipeline.

pub mod document;
pub mod edits;

pub use document::{Document, DocumentStatus};
pub use edits::{PageBreak, PageDeletion, Redaction, Rotation, SplitLog};
