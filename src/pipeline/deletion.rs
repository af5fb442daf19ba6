//! Deletion Stage (spec §4.5): descending-order removal, with a
//! whole-document tombstone short-circuit when every page is deleted.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::EngineError;
use crate::models::PageDeletion;
use crate::pdf_engine::PdfEngine;

#[derive(Debug, Default, Serialize)]
pub struct DeletionResult {
    pub final_page_count: usize,
    pub document_deleted: bool,
    pub applied: Vec<i64>,
}

pub async fn run(
    engine: &dyn PdfEngine,
    bytes: Vec<u8>,
    deletions: &[PageDeletion],
    current_page_count: usize,
) -> Result<(Vec<u8>, DeletionResult), EngineError> {
    if deletions.is_empty() {
        return Ok((
            bytes,
            DeletionResult {
                final_page_count: current_page_count,
                document_deleted: false,
                applied: Vec::new(),
            },
        ));
    }

    let unique_indices: BTreeSet<usize> = deletions.iter().map(|d| d.page_index as usize).collect();

    if unique_indices.len() >= current_page_count {
        // Every page targeted for deletion: no PDF mutation occurs at all,
        // matching the source processor's all-pages-deleted short circuit.
        return Ok((
            bytes,
            DeletionResult {
                final_page_count: 0,
                document_deleted: true,
                applied: deletions.iter().map(|d| d.id).collect(),
            },
        ));
    }

    let descending: Vec<usize> = unique_indices.into_iter().rev().collect();
    let new_bytes = engine.delete_pages(bytes, &descending).await?;
    let final_page_count = current_page_count - descending.len();

    Ok((
        new_bytes,
        DeletionResult {
            final_page_count,
            document_deleted: false,
            applied: deletions.iter().map(|d| d.id).collect(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deletion(id: i64, page: i32) -> PageDeletion {
        PageDeletion { id, document_id: 1, page_index: page }
    }

    #[test]
    fn dedups_and_sorts_descending() {
        let deletions = vec![deletion(1, 2), deletion(2, 0), deletion(3, 2)];
        let unique: BTreeSet<usize> = deletions.iter().map(|d| d.page_index as usize).collect();
        let descending: Vec<usize> = unique.into_iter().rev().collect();
        assert_eq!(descending, vec![2, 0]);
    }
}
