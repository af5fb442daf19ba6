//! Pipeline Orchestrator (spec §4.2): the single entry point that runs one
//! invocation end to end — status transitions, stage sequencing, deadline
//! checks, and progress reporting all live here so individual stages stay
//! pure functions of bytes.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{info, instrument, warn};

use crate::error::PipelineError;
use crate::invocation::{InvocationPayload, InvocationResponse, Operation};
use crate::models::{Document, DocumentStatus};
use crate::object_store::{object_key, ObjectStore, Stage as ObjectStage};
use crate::pdf_engine::PdfEngine;
use crate::pipeline::loader::EditLoader;
use crate::pipeline::{deletion, redaction, rotation, split};
use crate::progress::{ProgressReporter, ProgressStatus};
use crate::repository::MetadataStore;

/// The safety margin (spec §5) below which a deadline check aborts rather
/// than starting another stage.
const DEADLINE_SAFETY_MARGIN: Duration = Duration::from_secs(60);

pub struct Pipeline {
    store: MetadataStore,
    objects: Box<dyn ObjectStore>,
    engine: Box<dyn PdfEngine>,
    progress: ProgressReporter,
    default_deadline: Duration,
}

impl Pipeline {
    pub fn new(
        store: MetadataStore,
        objects: Box<dyn ObjectStore>,
        engine: Box<dyn PdfEngine>,
        progress: ProgressReporter,
        default_deadline: Duration,
    ) -> Self {
        Self {
            store,
            objects,
            engine,
            progress,
            default_deadline,
        }
    }

    /// Runs one invocation to completion, never panicking on pipeline-level
    /// failure: every error path is translated into a response body rather
    /// than propagated to the caller, matching the CLI harness's contract.
    pub async fn run(&self, payload: InvocationPayload) -> InvocationResponse {
        let started = Instant::now();
        let session_id = payload.session_id();
        let image_id = payload.image_id;

        if let Err(e) = payload.validate() {
            return InvocationResponse::failure(image_id, session_id, e, started.elapsed().as_secs_f64());
        }

        if payload.operation == Operation::HealthCheck {
            return InvocationResponse::success(
                image_id,
                session_id,
                json!({ "healthy": true }),
                started.elapsed().as_secs_f64(),
            );
        }

        let deadline = payload
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(self.default_deadline);

        match self.run_invocation(&payload, &session_id, deadline, started).await {
            Ok(result) => InvocationResponse::success(image_id, session_id, result, started.elapsed().as_secs_f64()),
            Err(e) => {
                self.progress
                    .update(&session_id, image_id, ProgressStatus::Error, 100, &e.to_string(), None)
                    .await;
                InvocationResponse::failure(image_id, session_id, e, started.elapsed().as_secs_f64())
            }
        }
    }

    #[instrument(skip(self, payload), fields(image_id = payload.image_id))]
    async fn run_invocation(
        &self,
        payload: &InvocationPayload,
        session_id: &str,
        deadline: Duration,
        started: Instant,
    ) -> Result<serde_json::Value, PipelineError> {
        let image_id = payload.image_id;

        let document = self
            .store
            .get_document(image_id)
            .await
            .map_err(|_| PipelineError::NotFound(image_id))?;

        if document.status == DocumentStatus::InWorkman.code() {
            warn!(image_id, "document already in workman, refusing to start (no recovery window configured)");
            return Err(PipelineError::PayloadInvalid(format!(
                "document {image_id} is already being processed"
            )));
        }
        if document.status == DocumentStatus::Obsolete.code() || document.deleted {
            return Err(PipelineError::PayloadInvalid(format!(
                "document {image_id} is terminal (obsolete or deleted)"
            )));
        }

        let prior_status = document.status;
        self.store.set_status(image_id, DocumentStatus::InWorkman).await?;
        let _ = self
            .store
            .record_audit(image_id, session_id, Some(prior_status), DocumentStatus::InWorkman.code(), None)
            .await;
        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 10, "started", None)
            .await;

        match self
            .process(payload, session_id, &document, deadline, started)
            .await
        {
            Ok(result) => Ok(result),
            Err(e) => {
                if e.should_reset_status() {
                    let _ = self.store.set_status(image_id, DocumentStatus::NeedsImageManipulation).await;
                    let _ = self
                        .store
                        .record_audit(
                            image_id,
                            session_id,
                            Some(DocumentStatus::InWorkman.code()),
                            DocumentStatus::NeedsImageManipulation.code(),
                            Some(e.to_string()),
                        )
                        .await;
                }
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        payload: &InvocationPayload,
        session_id: &str,
        document: &Document,
        deadline: Duration,
        started: Instant,
    ) -> Result<serde_json::Value, PipelineError> {
        let image_id = document.id;

        let bundle = if payload.operation == Operation::SplitDocument {
            // Degenerate mode: breaks come from the payload, not the table,
            // and no redaction/rotation/deletion stage runs.
            let mut bundle = crate::pipeline::EditBundle::default();
            bundle.breaks = payload
                .bookmarks
                .iter()
                .map(|b| crate::models::PageBreak {
                    id: b.bookmark_id,
                    document_id: image_id,
                    page_index: b.page_index,
                    doc_type_id: b.document_type_id,
                    doc_type_name: b.document_type_name.clone(),
                    document_date: b.document_date,
                    comments: b.comments.clone(),
                    result_document_id: None,
                    deleted: false,
                })
                .collect();
            bundle
        } else {
            EditLoader::new(&self.store).load(document).await?
        };

        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 20, "edits loaded", None)
            .await;

        if bundle.total() == 0 {
            self.store.set_status(image_id, DocumentStatus::NeedsProcessing).await?;
            return Ok(json!({
                "noop": true,
                "issues": bundle.issues.iter().map(|i| json!({
                    "kind": i.kind, "id": i.id, "reason": i.reason,
                })).collect::<Vec<_>>(),
            }));
        }

        let processing_key = object_key(ObjectStage::IProcessing, &document.path_fragment, image_id);
        let mut bytes = self.objects.get(&processing_key).await?;
        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 30, "fetched source bytes", None)
            .await;

        if bundle.has_file_manipulations() {
            let backup_key = object_key(ObjectStage::RedactOriginal, &document.path_fragment, image_id);
            self.objects.put(&backup_key, bytes.clone(), "application/pdf").await?;
        }
        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 35, "backup written", None)
            .await;

        check_deadline(started, deadline)?;
        let page_dims = self.engine.page_dimensions(&bytes).await?;

        let mut redaction_result = None;
        if !bundle.redactions.is_empty() {
            let (new_bytes, result) = redaction::run(self.engine.as_ref(), bytes, &bundle.redactions, &page_dims).await?;
            bytes = new_bytes;
            for id in &result.applied_redaction_ids {
                let _ = self.store.mark_redaction_applied(*id).await;
            }
            redaction_result = Some(result);
        }
        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 45, "redactions applied", None)
            .await;

        check_deadline(started, deadline)?;
        let mut rotation_result = None;
        if !bundle.rotations.is_empty() {
            let (new_bytes, result) = rotation::run(self.engine.as_ref(), bytes, &bundle.rotations).await?;
            bytes = new_bytes;
            for id in &result.applied {
                let _ = self.store.mark_rotation_applied(*id).await;
            }
            rotation_result = Some(result);
        }
        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 60, "rotations applied", None)
            .await;

        check_deadline(started, deadline)?;
        let mut deletion_result = None;
        let mut current_page_count = document.page_count as usize;
        if !bundle.deletions.is_empty() {
            let (new_bytes, result) = deletion::run(self.engine.as_ref(), bytes, &bundle.deletions, current_page_count).await?;
            bytes = new_bytes;
            for id in &result.applied {
                let _ = self.store.mark_deletion_applied(*id).await;
            }
            current_page_count = result.final_page_count;

            if result.document_deleted {
                self.store.tombstone_document(image_id).await?;
                let _ = self
                    .store
                    .record_audit(image_id, session_id, Some(DocumentStatus::InWorkman.code()), DocumentStatus::InWorkman.code(), Some("all pages deleted".into()))
                    .await;
                self.progress
                    .update(session_id, image_id, ProgressStatus::Completed, 100, "document deleted", None)
                    .await;
                return Ok(json!({ "documentDeleted": true, "deletion": result }));
            }
            deletion_result = Some(result);
        }
        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 75, "deletions applied", None)
            .await;

        check_deadline(started, deadline)?;
        let mut split_result = None;
        let mut produced_split = false;
        if !bundle.breaks.is_empty() {
            let (new_bytes, result) = split::run(
                self.engine.as_ref(),
                self.objects.as_ref(),
                &self.store,
                session_id,
                document,
                bytes,
                &bundle.breaks,
                current_page_count,
            )
            .await?;
            bytes = new_bytes;
            produced_split = matches!(result.outcome, split::SplitOutcome::FullSplit { .. });
            split_result = Some(result);
        }
        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 85, "split evaluated", None)
            .await;

        check_deadline(started, deadline)?;
        if !produced_split {
            self.objects.put(&processing_key, bytes.clone(), "application/pdf").await?;
            if current_page_count != document.page_count as usize {
                self.store.set_page_count(image_id, current_page_count as i32).await?;
            }
        }
        self.progress
            .update(session_id, image_id, ProgressStatus::Processing, 95, "results persisted", None)
            .await;

        let final_status = if produced_split {
            DocumentStatus::Obsolete
        } else {
            DocumentStatus::NeedsProcessing
        };
        self.store.set_status(image_id, final_status).await?;
        let _ = self
            .store
            .record_audit(image_id, session_id, Some(DocumentStatus::InWorkman.code()), final_status.code(), None)
            .await;

        let result = json!({
            "redaction": redaction_result,
            "rotation": rotation_result,
            "deletion": deletion_result,
            "split": split_result,
            "issues": bundle.issues.iter().map(|i| json!({
                "kind": i.kind, "id": i.id, "reason": i.reason,
            })).collect::<Vec<_>>(),
        });

        self.progress
            .update(session_id, image_id, ProgressStatus::Completed, 100, "done", Some(result.clone()))
            .await;

        info!(image_id, "invocation complete");
        Ok(result)
    }
}

fn check_deadline(started: Instant, deadline: Duration) -> Result<(), PipelineError> {
    let elapsed = started.elapsed();
    if deadline.saturating_sub(elapsed) < DEADLINE_SAFETY_MARGIN {
        return Err(PipelineError::DeadlineExceeded {
            elapsed_secs: elapsed.as_secs(),
            budget_secs: deadline.as_secs(),
        });
    }
    Ok(())
}
