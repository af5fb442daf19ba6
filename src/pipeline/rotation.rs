//! Rotation Stage (spec §4.4): absolute, not additive. Duplicate rotations
//! on the same page are reported, never silently dropped or combined.

use serde::Serialize;

use crate::error::EngineError;
use crate::models::Rotation;
use crate::pdf_engine::PdfEngine;

#[derive(Debug, Default, Serialize)]
pub struct RotationResult {
    pub applied: Vec<i64>,
    pub conflicts: Vec<RotationConflict>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RotationConflict {
    pub page_index: usize,
    pub ids: Vec<i64>,
}

/// Finds pages with more than one rotation row; last-sorted-by-id wins
/// rather than being combined (per the documented open-question
/// resolution: report, don't silently discard).
fn group_and_report(rotations: &[Rotation]) -> (Vec<(usize, i32, i64)>, Vec<RotationConflict>) {
    use std::collections::BTreeMap;
    let mut by_page: BTreeMap<usize, Vec<&Rotation>> = BTreeMap::new();
    for r in rotations {
        by_page.entry(r.page_index as usize).or_default().push(r);
    }

    let mut winners = Vec::new();
    let mut conflicts = Vec::new();

    for (page_index, mut rows) in by_page {
        rows.sort_by_key(|r| r.id);
        if rows.len() > 1 {
            conflicts.push(RotationConflict {
                page_index,
                ids: rows.iter().map(|r| r.id).collect(),
            });
        }
        let winner = rows.last().expect("group is non-empty");
        winners.push((page_index, winner.angle, winner.id));
    }

    (winners, conflicts)
}

pub async fn run(
    engine: &dyn PdfEngine,
    mut bytes: Vec<u8>,
    rotations: &[Rotation],
) -> Result<(Vec<u8>, RotationResult), EngineError> {
    let mut result = RotationResult::default();
    if rotations.is_empty() {
        return Ok((bytes, result));
    }

    let (winners, conflicts) = group_and_report(rotations);
    result.conflicts = conflicts;

    for (page_index, angle, id) in winners {
        bytes = engine.set_rotation(bytes, page_index, angle).await?;
        result.applied.push(id);
    }

    Ok((bytes, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation(id: i64, page: i32, angle: i32) -> Rotation {
        Rotation { id, document_id: 1, page_index: page, angle }
    }

    #[test]
    fn duplicate_rotations_on_same_page_are_reported() {
        let rows = vec![rotation(1, 0, 90), rotation(2, 0, 180)];
        let (winners, conflicts) = group_and_report(&rows);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].ids, vec![1, 2]);
        assert_eq!(winners, vec![(0, 180, 2)]);
    }

    #[test]
    fn single_rotation_has_no_conflict() {
        let rows = vec![rotation(1, 3, 270)];
        let (winners, conflicts) = group_and_report(&rows);
        assert!(conflicts.is_empty());
        assert_eq!(winners, vec![(3, 270, 1)]);
    }
}
