//! Object Store Adapter (spec §4.7): a flat key-value view over document
//! bytes, with one helper that owns the key convention so it can't drift
//! between call sites.

pub mod s3;

use async_trait::async_trait;

use crate::error::ObjectStoreError;

/// The stage prefixes a document's PDF can live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Immutable original, as first ingested.
    IOriginal,
    /// Working copy the pipeline reads from and writes back to.
    IProcessing,
    /// Copy served to end users.
    Production,
    /// One-shot backup taken immediately before destructive edits.
    RedactOriginal,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::IOriginal => "IOriginal",
            Stage::IProcessing => "IProcessing",
            Stage::Production => "Production",
            Stage::RedactOriginal => "RedactOriginal",
        }
    }
}

/// Builds the `{stage}/{pathFragment}/{id}/{id}.pdf` key convention used
/// throughout the pipeline. The single place this format is written down.
pub fn object_key(stage: Stage, path_fragment: &str, document_id: i64) -> String {
    format!(
        "{}/{}/{}/{}.pdf",
        stage.as_str(),
        path_fragment,
        document_id,
        document_id
    )
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError>;
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ObjectStoreError>;
    async fn head(&self, key: &str) -> Result<bool, ObjectStoreError>;
    async fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}
