//! Edit Loader (spec §4.1): reads and validates the four pending-edit
//! collections for one document, skipping invalid rows rather than failing
//! the invocation over them.

use crate::models::{Document, PageBreak, PageDeletion, Redaction, Rotation};
use crate::repository::MetadataStore;

/// A skipped edit row, recorded for the result bundle rather than raised.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub kind: &'static str,
    pub id: i64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct EditBundle {
    pub redactions: Vec<Redaction>,
    pub rotations: Vec<Rotation>,
    pub deletions: Vec<PageDeletion>,
    pub breaks: Vec<PageBreak>,
    pub issues: Vec<ValidationIssue>,
}

impl EditBundle {
    pub fn total(&self) -> usize {
        self.redactions.len() + self.rotations.len() + self.deletions.len() + self.breaks.len()
    }

    pub fn has_file_manipulations(&self) -> bool {
        !self.redactions.is_empty() || !self.rotations.is_empty() || !self.deletions.is_empty()
    }
}

pub struct EditLoader<'a> {
    store: &'a MetadataStore,
}

impl<'a> EditLoader<'a> {
    pub fn new(store: &'a MetadataStore) -> Self {
        Self { store }
    }

    pub async fn load(&self, document: &Document) -> Result<EditBundle, crate::error::MetaError> {
        let mut bundle = EditBundle::default();
        let page_count = document.page_count as i32;

        for r in self.store.list_redactions_pending(document.id).await? {
            if let Err(reason) = validate_redaction(&r, page_count) {
                bundle.issues.push(ValidationIssue {
                    kind: "redaction",
                    id: r.id,
                    reason,
                });
                continue;
            }
            bundle.redactions.push(r);
        }

        for r in self.store.list_rotations(document.id).await? {
            if let Err(reason) = validate_rotation(&r, page_count) {
                bundle.issues.push(ValidationIssue {
                    kind: "rotation",
                    id: r.id,
                    reason,
                });
                continue;
            }
            bundle.rotations.push(r);
        }

        for d in self.store.list_deletions(document.id).await? {
            if d.page_index < 0 || d.page_index >= page_count {
                bundle.issues.push(ValidationIssue {
                    kind: "deletion",
                    id: d.id,
                    reason: format!("page index {} out of range [0, {})", d.page_index, page_count),
                });
                continue;
            }
            bundle.deletions.push(d);
        }

        for b in self.store.list_breaks(document.id).await? {
            if b.page_index < 0 || b.page_index >= page_count {
                bundle.issues.push(ValidationIssue {
                    kind: "page_break",
                    id: b.id,
                    reason: format!("page index {} out of range [0, {})", b.page_index, page_count),
                });
                continue;
            }
            bundle.breaks.push(b);
        }

        Ok(bundle)
    }
}

fn validate_redaction(r: &Redaction, page_count: i32) -> Result<(), String> {
    if r.page_number < 0 || r.page_number >= page_count {
        return Err(format!(
            "page {} out of range [0, {})",
            r.page_number, page_count
        ));
    }
    if r.page_width <= 0.0 || r.page_height <= 0.0 {
        return Err("redaction rectangle must have positive width and height".to_string());
    }
    if r.page_x < 0.0 || r.page_y < 0.0 {
        return Err("redaction rectangle origin must be non-negative".to_string());
    }
    if !matches!(r.draw_orientation, 0 | 90 | 180 | 270) {
        return Err(format!("invalid draw orientation {}", r.draw_orientation));
    }
    Ok(())
}

fn validate_rotation(r: &Rotation, page_count: i32) -> Result<(), String> {
    if r.page_index < 0 || r.page_index >= page_count {
        return Err(format!(
            "page {} out of range [0, {})",
            r.page_index, page_count
        ));
    }
    if !matches!(r.angle, 0 | 90 | 180 | 270) {
        return Err(format!("invalid rotation angle {}", r.angle));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redaction(page: i32, w: f64, h: f64) -> Redaction {
        Redaction {
            id: 1,
            document_id: 1,
            page_number: page,
            page_x: 0.0,
            page_y: 0.0,
            page_width: w,
            page_height: h,
            draw_orientation: 0,
            text: None,
            applied: false,
            date_applied: None,
        }
    }

    #[test]
    fn rejects_redaction_with_zero_size() {
        assert!(validate_redaction(&redaction(0, 0.0, 10.0), 5).is_err());
    }

    #[test]
    fn rejects_redaction_out_of_page_range() {
        assert!(validate_redaction(&redaction(5, 10.0, 10.0), 5).is_err());
    }

    #[test]
    fn accepts_valid_redaction() {
        assert!(validate_redaction(&redaction(2, 10.0, 10.0), 5).is_ok());
    }
}
