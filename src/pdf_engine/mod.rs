//! PDF Engine Adapter: the narrow boundary stage code calls into a real PDF
//! rendering library through. Each call takes and returns owned PDF bytes —
//! mirroring the pipeline's "pure function of bytes in, bytes out" stage
//! design — so stages never hold a library-specific document handle across
//! an await point.

pub mod pdfium;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::EngineError;

/// A rectangle in page coordinates (points, origin top-left to match the
/// source system's `PageX`/`PageY`/`PageWidth`/`PageHeight` fields).
#[derive(Debug, Clone, Copy)]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One redaction box to paint, plus the replacement text to carry forward
/// as annotation metadata once the page is rasterized (spec §4.3).
#[derive(Debug, Clone)]
pub struct RedactionBox {
    pub rect: PageRect,
    pub text: Option<String>,
}

#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn page_count(&self, bytes: &[u8]) -> Result<usize, EngineError>;

    /// Each page's (width, height) in points, in page order — the redaction
    /// stage needs these to rotate and clamp rectangles without a separate
    /// round trip per page.
    async fn page_dimensions(&self, bytes: &[u8]) -> Result<Vec<(f64, f64)>, EngineError>;

    /// Sets the absolute rotation of one page.
    async fn set_rotation(&self, bytes: Vec<u8>, page_index: usize, angle: i32) -> Result<Vec<u8>, EngineError>;

    /// Deletes pages at the given indices. Callers must pass indices sorted
    /// descending so earlier indices stay valid as the call proceeds.
    async fn delete_pages(&self, bytes: Vec<u8>, descending_indices: &[usize]) -> Result<Vec<u8>, EngineError>;

    /// Extracts `[start, end)` into a new standalone PDF.
    async fn extract_range(&self, bytes: &[u8], start: usize, end: usize) -> Result<Vec<u8>, EngineError>;

    /// Paints opaque black boxes (with a 2-unit black border) over the given
    /// rectangles on each page, attaches each box's replacement text as
    /// annotation metadata, then rasterizes every page that received at
    /// least one box so the underlying content is irrecoverable. Returns the
    /// rewritten bytes and the set of page indices that were rasterized.
    async fn redact_and_rasterize(
        &self,
        bytes: Vec<u8>,
        boxes_by_page: BTreeMap<usize, Vec<RedactionBox>>,
    ) -> Result<(Vec<u8>, Vec<usize>), EngineError>;
}
