//! Split Stage (spec §4.6): bookmark-driven partition of the final
//! page-edited PDF into one or more derived documents.
//!
//! `rename_only` retypes the source document in place when a single break
//! sits at page 0; everything else goes through `full_split`, which carves
//! `[0, pageCount)` into non-overlapping ranges and commits the whole batch
//! — row inserts, break updates, and the source's transition to `Obsolete`
//! — through [`crate::repository::split_tx`]'s single transaction.

use serde::Serialize;

use crate::error::PipelineError;
use crate::models::{Document, PageBreak};
use crate::object_store::{object_key, ObjectStore, Stage};
use crate::pdf_engine::PdfEngine;
use crate::repository::metadata_store::DerivedDocumentInput;
use crate::repository::MetadataStore;

#[derive(Debug, Serialize)]
pub enum SplitOutcome {
    /// No partition occurred; the source document was retyped in place.
    RenameOnly,
    /// The document was partitioned into the listed derived document ids.
    FullSplit { derived_document_ids: Vec<i64> },
}

#[derive(Debug, Serialize)]
pub struct SplitResult {
    pub outcome: SplitOutcome,
}

struct Range {
    start: usize,
    end: usize,
    break_id: Option<i64>,
    doc_type_id: i64,
    doc_type_name: String,
    document_date: Option<chrono::DateTime<chrono::Utc>>,
    comments: Option<String>,
}

fn compute_ranges(document: &Document, breaks: &[PageBreak], page_count: usize) -> Vec<Range> {
    let mut sorted: Vec<&PageBreak> = breaks.iter().collect();
    sorted.sort_by_key(|b| b.page_index);

    let mut ranges = Vec::with_capacity(sorted.len() + 1);

    if let Some(first) = sorted.first() {
        if first.page_index > 0 {
            ranges.push(Range {
                start: 0,
                end: first.page_index as usize,
                break_id: None,
                doc_type_id: document.doc_type_id.unwrap_or_default(),
                doc_type_name: String::new(),
                document_date: document.document_date,
                comments: document.comments.clone(),
            });
        }
    }

    for (i, b) in sorted.iter().enumerate() {
        let end = sorted
            .get(i + 1)
            .map(|next| next.page_index as usize)
            .unwrap_or(page_count);
        ranges.push(Range {
            start: b.page_index as usize,
            end,
            break_id: Some(b.id),
            doc_type_id: b.doc_type_id,
            doc_type_name: b.doc_type_name.clone(),
            document_date: b.document_date,
            comments: b.comments.clone(),
        });
    }

    ranges
}

pub async fn run(
    engine: &dyn PdfEngine,
    objects: &dyn ObjectStore,
    store: &MetadataStore,
    session_id: &str,
    document: &Document,
    bytes: Vec<u8>,
    breaks: &[PageBreak],
    page_count: usize,
) -> Result<(Vec<u8>, SplitResult), PipelineError> {
    if breaks.is_empty() {
        return Ok((
            bytes,
            SplitResult { outcome: SplitOutcome::RenameOnly },
        ));
    }

    if breaks.len() == 1 && breaks[0].page_index == 0 {
        let b = &breaks[0];
        store
            .set_doc_type_and_meta(document.id, b.doc_type_id, b.document_date, b.comments.clone())
            .await?;
        store.mark_break_processed(b.id, document.id).await?;
        return Ok((
            bytes,
            SplitResult { outcome: SplitOutcome::RenameOnly },
        ));
    }

    let ranges = compute_ranges(document, breaks, page_count);

    let mut extracted: Vec<(Vec<u8>, &Range)> = Vec::with_capacity(ranges.len());
    for range in &ranges {
        let piece = engine.extract_range(&bytes, range.start, range.end).await?;
        extracted.push((piece, range));
    }

    let mut inputs = Vec::with_capacity(extracted.len());
    for (_, range) in &extracted {
        let comments = range.comments.clone().unwrap_or_else(|| {
            format!(
                "Split from {} (pages {}-{})",
                document.id,
                range.start + 1,
                range.end
            )
        });
        inputs.push((
            DerivedDocumentInput {
                source: document,
                doc_type_id: range.doc_type_id,
                page_count: (range.end - range.start) as i32,
                document_date: range.document_date,
                comments,
            },
            range.break_id,
        ));
    }

    let outcomes = store.commit_split(document.id, session_id, &inputs).await?;

    for (outcome, (piece, _)) in outcomes.iter().zip(extracted.iter()) {
        let original_key = object_key(Stage::IOriginal, &document.path_fragment, outcome.derived_document_id);
        let processing_key = object_key(Stage::IProcessing, &document.path_fragment, outcome.derived_document_id);
        let production_key = object_key(Stage::Production, &document.path_fragment, outcome.derived_document_id);

        objects.put(&original_key, piece.clone(), "application/pdf").await?;
        objects.put(&processing_key, piece.clone(), "application/pdf").await?;
        objects.put(&production_key, piece.clone(), "application/pdf").await?;
    }

    let derived_document_ids = outcomes.iter().map(|o| o.derived_document_id).collect();

    Ok((
        bytes,
        SplitResult {
            outcome: SplitOutcome::FullSplit { derived_document_ids },
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc() -> Document {
        Document {
            id: 1,
            offering_id: 1,
            loan_id: 1,
            path_fragment: "2024/01".to_string(),
            status: 9,
            page_count: 10,
            is_redacted: false,
            deleted: false,
            doc_type_id: Some(5),
            document_date: None,
            comments: None,
            split_from_document_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn page_break(id: i64, page_index: i32) -> PageBreak {
        PageBreak {
            id,
            document_id: 1,
            page_index,
            doc_type_id: 7,
            doc_type_name: "Note".to_string(),
            document_date: None,
            comments: None,
            result_document_id: None,
            deleted: false,
        }
    }

    #[test]
    fn front_section_emitted_when_first_break_not_at_zero() {
        let document = doc();
        let breaks = vec![page_break(1, 3), page_break(2, 6)];
        let ranges = compute_ranges(&document, &breaks, 10);
        assert_eq!(ranges.len(), 3);
        assert_eq!((ranges[0].start, ranges[0].end), (0, 3));
        assert_eq!((ranges[1].start, ranges[1].end), (3, 6));
        assert_eq!((ranges[2].start, ranges[2].end), (6, 10));
    }

    #[test]
    fn no_front_section_when_first_break_at_zero() {
        let document = doc();
        let breaks = vec![page_break(1, 0), page_break(2, 5)];
        let ranges = compute_ranges(&document, &breaks, 10);
        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].start, ranges[0].end), (0, 5));
        assert_eq!((ranges[1].start, ranges[1].end), (5, 10));
    }
}
