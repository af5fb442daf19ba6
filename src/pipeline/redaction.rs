//! Redaction Stage (spec §4.3): paint-then-rasterize, per page.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::EngineError;
use crate::models::Redaction;
use crate::pdf_engine::{PageRect, PdfEngine, RedactionBox};

#[derive(Debug, Default, Serialize)]
pub struct RedactionResult {
    pub total_redactions: usize,
    pub original_page_count: usize,
    pub pages_modified: Vec<usize>,
    pub rasterized_pages: Vec<usize>,
    pub applied_redaction_ids: Vec<i64>,
}

/// Rotates a rectangle around the page center for a given clockwise draw
/// orientation, matching the source processor's corner-mapping method: each
/// corner is rotated around `(page_width/2, page_height/2)`, then the
/// bounding box of the rotated corners is taken.
fn rotate_rect_for_orientation(rect: &PageRect, orientation: i32, page_width: f64, page_height: f64) -> PageRect {
    let cx = page_width / 2.0;
    let cy = page_height / 2.0;
    let (x0, y0, x1, y1) = (rect.x, rect.y, rect.x + rect.width, rect.y + rect.height);

    let (nx0, ny0, nx1, ny1) = match orientation.rem_euclid(360) {
        90 => (
            cx - (y1 - cy),
            cy + (x0 - cx),
            cx - (y0 - cy),
            cy + (x1 - cx),
        ),
        180 => (
            cx - (x1 - cx),
            cy - (y1 - cy),
            cx - (x0 - cx),
            cy - (y0 - cy),
        ),
        270 => (
            cx + (y0 - cy),
            cy - (x1 - cx),
            cx + (y1 - cy),
            cy - (x0 - cx),
        ),
        _ => return *rect,
    };

    let x = nx0.min(nx1);
    let y = ny0.min(ny1);
    PageRect {
        x,
        y,
        width: nx0.max(nx1) - x,
        height: ny0.max(ny1) - y,
    }
}

fn clamp_to_page(rect: PageRect, page_width: f64, page_height: f64) -> PageRect {
    let x = rect.x.clamp(0.0, page_width);
    let y = rect.y.clamp(0.0, page_height);
    let width = rect.width.min(page_width - x).max(0.0);
    let height = rect.height.min(page_height - y).max(0.0);
    PageRect { x, y, width, height }
}

/// Runs the redaction stage. `page_dims` supplies each page's (width,
/// height) in points so rectangles can be rotated/clamped without an extra
/// round trip into the engine.
pub async fn run(
    engine: &dyn PdfEngine,
    bytes: Vec<u8>,
    redactions: &[Redaction],
    page_dims: &[(f64, f64)],
) -> Result<(Vec<u8>, RedactionResult), EngineError> {
    let original_page_count = page_dims.len();
    let mut result = RedactionResult {
        total_redactions: redactions.len(),
        original_page_count,
        ..Default::default()
    };

    if redactions.is_empty() {
        return Ok((bytes, result));
    }

    let mut boxes_by_page: BTreeMap<usize, Vec<RedactionBox>> = BTreeMap::new();

    for r in redactions {
        let page_index = r.page_number as usize;
        let Some(&(page_width, page_height)) = page_dims.get(page_index) else {
            continue;
        };

        let raw = PageRect {
            x: r.page_x,
            y: r.page_y,
            width: r.page_width,
            height: r.page_height,
        };
        let rotated = if r.draw_orientation != 0 {
            rotate_rect_for_orientation(&raw, r.draw_orientation, page_width, page_height)
        } else {
            raw
        };
        let clamped = clamp_to_page(rotated, page_width, page_height);

        boxes_by_page.entry(page_index).or_default().push(RedactionBox {
            rect: clamped,
            text: r.text.clone(),
        });
        result.applied_redaction_ids.push(r.id);
    }

    result.pages_modified = boxes_by_page.keys().copied().collect();

    let (new_bytes, rasterized) = engine.redact_and_rasterize(bytes, boxes_by_page).await?;
    result.rasterized_pages = rasterized;

    Ok((new_bytes, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_90_maps_top_left_to_expected_corner() {
        let rect = PageRect { x: 0.0, y: 0.0, width: 10.0, height: 20.0 };
        let rotated = rotate_rect_for_orientation(&rect, 90, 200.0, 300.0);
        assert_eq!(rotated.x, 230.0);
        assert_eq!(rotated.y, 50.0);
        assert_eq!(rotated.width, 20.0);
        assert_eq!(rotated.height, 10.0);
    }

    #[test]
    fn rotate_90_on_square_page() {
        let rect = PageRect { x: 0.0, y: 0.0, width: 10.0, height: 20.0 };
        let rotated = rotate_rect_for_orientation(&rect, 90, 300.0, 300.0);
        assert_eq!(rotated.x, 280.0);
        assert_eq!(rotated.y, 0.0);
        assert_eq!(rotated.width, 20.0);
        assert_eq!(rotated.height, 10.0);
    }

    #[test]
    fn rotate_270_is_inverse_of_rotate_90() {
        let rect = PageRect { x: 0.0, y: 0.0, width: 10.0, height: 20.0 };
        let forward = rotate_rect_for_orientation(&rect, 90, 200.0, 300.0);
        let back = rotate_rect_for_orientation(&forward, 270, 200.0, 300.0);
        assert_eq!(back.x, rect.x);
        assert_eq!(back.y, rect.y);
        assert_eq!(back.width, rect.width);
        assert_eq!(back.height, rect.height);
    }

    #[test]
    fn clamp_shrinks_rect_exceeding_page_bounds() {
        let rect = PageRect { x: 190.0, y: 0.0, width: 50.0, height: 10.0 };
        let clamped = clamp_to_page(rect, 200.0, 300.0);
        assert_eq!(clamped.width, 10.0);
    }

    #[test]
    fn identity_at_zero_orientation() {
        let rect = PageRect { x: 5.0, y: 5.0, width: 10.0, height: 10.0 };
        let rotated = rotate_rect_for_orientation(&rect, 0, 200.0, 300.0);
        assert_eq!(rotated.x, rect.x);
        assert_eq!(rotated.y, rect.y);
    }
}
