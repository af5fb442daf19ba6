//! `pdfium-render`-backed [`PdfEngine`]. Grounded on the rasterization path
//! in `edgequake-pdf2md`'s `pipeline/render.rs`: pdfium keeps thread-local
//! C++ state, so every call here runs on a blocking-task pool rather than
//! directly on the async executor (spec §5.1).

use std::collections::BTreeMap;

use async_trait::async_trait;
use image::{ImageBuffer, Rgba};
use pdfium_render::prelude::*;

use crate::error::EngineError;

use super::{PageRect, PdfEngine, RedactionBox};

/// Scale factor applied when rasterizing a redacted page, matching the
/// source processor's fixed 2.0x.
const RASTER_SCALE: f32 = 2.0;

/// Bounds rasterization memory regardless of a page's physical size.
const MAX_RASTER_PIXELS: i32 = 4000;

/// Border width in page points, matching the source processor's
/// `set_border(color=(0, 0, 0), width=2)`.
const REDACTION_BORDER_WIDTH: f64 = 2.0;

pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    pub fn new() -> Result<Self, EngineError> {
        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| EngineError::Load(e.to_string()))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    fn load<'a>(&'a self, bytes: &[u8]) -> Result<PdfDocument<'a>, EngineError> {
        self.pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| {
                let msg = format!("{e:?}");
                if msg.contains("Password") {
                    EngineError::PasswordRequired
                } else {
                    EngineError::Corrupt(msg)
                }
            })
    }
}

#[async_trait]
impl PdfEngine for PdfiumEngine {
    async fn page_count(&self, bytes: &[u8]) -> Result<usize, EngineError> {
        let bytes = bytes.to_vec();
        let engine = PdfiumEngine::new()?;
        tokio::task::spawn_blocking(move || {
            let doc = engine.load(&bytes)?;
            Ok(doc.pages().len() as usize)
        })
        .await
        .map_err(|e| EngineError::Operation(e.to_string()))?
    }

    async fn page_dimensions(&self, bytes: &[u8]) -> Result<Vec<(f64, f64)>, EngineError> {
        let bytes = bytes.to_vec();
        let engine = PdfiumEngine::new()?;
        tokio::task::spawn_blocking(move || {
            let doc = engine.load(&bytes)?;
            Ok(doc
                .pages()
                .iter()
                .map(|page| (page.width().value as f64, page.height().value as f64))
                .collect())
        })
        .await
        .map_err(|e| EngineError::Operation(e.to_string()))?
    }

    async fn set_rotation(&self, bytes: Vec<u8>, page_index: usize, angle: i32) -> Result<Vec<u8>, EngineError> {
        tokio::task::spawn_blocking(move || {
            let engine = PdfiumEngine::new()?;
            let mut doc = engine.load(&bytes)?;
            let mut page = doc
                .pages()
                .get(page_index as u16)
                .map_err(|_| EngineError::PageOutOfRange(page_index))?;

            let rotation = match angle.rem_euclid(360) {
                90 => PdfPageRenderRotation::Degrees90,
                180 => PdfPageRenderRotation::Degrees180,
                270 => PdfPageRenderRotation::Degrees270,
                _ => PdfPageRenderRotation::None,
            };
            page.set_rotation(rotation);

            doc.save_to_bytes().map_err(|e| EngineError::Operation(e.to_string()))
        })
        .await
        .map_err(|e| EngineError::Operation(e.to_string()))?
    }

    async fn delete_pages(&self, bytes: Vec<u8>, descending_indices: &[usize]) -> Result<Vec<u8>, EngineError> {
        let descending_indices = descending_indices.to_vec();
        tokio::task::spawn_blocking(move || {
            let engine = PdfiumEngine::new()?;
            let mut doc = engine.load(&bytes)?;
            for &index in &descending_indices {
                doc.pages_mut()
                    .delete_page_at_index(index as u16)
                    .map_err(|_| EngineError::PageOutOfRange(index))?;
            }
            doc.save_to_bytes().map_err(|e| EngineError::Operation(e.to_string()))
        })
        .await
        .map_err(|e| EngineError::Operation(e.to_string()))?
    }

    async fn extract_range(&self, bytes: &[u8], start: usize, end: usize) -> Result<Vec<u8>, EngineError> {
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            let engine = PdfiumEngine::new()?;
            let source = engine.load(&bytes)?;
            let mut out = engine
                .pdfium
                .create_new_pdf()
                .map_err(|e| EngineError::Operation(e.to_string()))?;

            out.pages_mut()
                .copy_page_range_from_document(&source, start as u16..end as u16, 0)
                .map_err(|e| EngineError::Operation(e.to_string()))?;

            out.save_to_bytes().map_err(|e| EngineError::Operation(e.to_string()))
        })
        .await
        .map_err(|e| EngineError::Operation(e.to_string()))?
    }

    async fn redact_and_rasterize(
        &self,
        bytes: Vec<u8>,
        boxes_by_page: BTreeMap<usize, Vec<RedactionBox>>,
    ) -> Result<(Vec<u8>, Vec<usize>), EngineError> {
        tokio::task::spawn_blocking(move || {
            let engine = PdfiumEngine::new()?;
            let mut doc = engine.load(&bytes)?;
            let mut rasterized = Vec::new();

            for (&page_index, boxes) in boxes_by_page.iter() {
                if boxes.is_empty() {
                    continue;
                }

                let mut page = doc
                    .pages()
                    .get(page_index as u16)
                    .map_err(|_| EngineError::PageOutOfRange(page_index))?;

                // Attach each box's replacement text as annotation metadata
                // before the content stream is replaced below — annotations
                // live in the page's /Annots array, separate from /Contents,
                // so they survive the rasterization that follows.
                for b in boxes {
                    if let Some(text) = b.text.as_deref().filter(|t| !t.is_empty()) {
                        attach_redaction_annotation(&mut page, &b.rect, text);
                    }
                }

                let config = PdfRenderConfig::new()
                    .scale_page_by_factor(RASTER_SCALE)
                    .set_maximum_width(MAX_RASTER_PIXELS)
                    .set_maximum_height(MAX_RASTER_PIXELS);

                let bitmap = page
                    .render_with_config(&config)
                    .map_err(|e| EngineError::Operation(e.to_string()))?;

                let width = bitmap.width() as u32;
                let height = bitmap.height() as u32;
                let mut image: ImageBuffer<Rgba<u8>, Vec<u8>> = bitmap.as_image().to_rgba8();

                let page_width = page.width().value as f64;
                let page_height = page.height().value as f64;
                let scale_x = width as f64 / page_width;
                let scale_y = height as f64 / page_height;

                for b in boxes {
                    paint_black_box(&mut image, &b.rect, scale_x, scale_y, height);
                }

                // Replace the page's content stream wholesale with the
                // rasterized, redacted image — the source of the
                // irreversibility guarantee (spec §4.3).
                page.objects_mut()
                    .clear()
                    .map_err(|e| EngineError::Operation(e.to_string()))?;

                let png_bytes = encode_png(&image)?;
                let object = PdfPageImageObject::new_with_width_and_height(
                    &doc,
                    &image::load_from_memory(&png_bytes)
                        .map_err(|e| EngineError::Operation(e.to_string()))?,
                    page.width(),
                    page.height(),
                )
                .map_err(|e| EngineError::Operation(e.to_string()))?;

                page.objects_mut()
                    .add_image_object(object)
                    .map_err(|e| EngineError::Operation(e.to_string()))?;

                rasterized.push(page_index);
            }

            let out = doc.save_to_bytes().map_err(|e| EngineError::Operation(e.to_string()))?;
            Ok((out, rasterized))
        })
        .await
        .map_err(|e| EngineError::Operation(e.to_string()))?
    }
}

/// Adds a square annotation over `rect` carrying `text` as its contents.
/// Best-effort: an annotation failure narrows to a missing metadata trail,
/// not a failed redaction, so it's logged rather than propagated.
fn attach_redaction_annotation(page: &mut PdfPage, rect: &PageRect, text: &str) {
    let bounds = PdfRect::new(
        PdfPoints::new(rect.y as f32),
        PdfPoints::new(rect.x as f32),
        PdfPoints::new((rect.y + rect.height) as f32),
        PdfPoints::new((rect.x + rect.width) as f32),
    );

    match page.annotations_mut().create_square_annotation(bounds) {
        Ok(mut annotation) => {
            if let Err(e) = annotation.set_contents(text) {
                tracing::warn!(error = %e, "failed to set redaction annotation contents");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to create redaction annotation");
        }
    }
}

fn paint_black_box(
    image: &mut ImageBuffer<Rgba<u8>, Vec<u8>>,
    rect: &PageRect,
    scale_x: f64,
    scale_y: f64,
    image_height: u32,
) {
    // PDF y-origin is bottom-left; image y-origin is top-left. The border
    // extends REDACTION_BORDER_WIDTH points past the rect on every side so
    // the 2-unit black border is never visually distinguishable from the
    // fill it surrounds (both solid black), matching the source processor's
    // fill-then-border annotation (spec §4.3).
    let bx = rect.x - REDACTION_BORDER_WIDTH;
    let by = rect.y - REDACTION_BORDER_WIDTH;
    let bw = rect.width + 2.0 * REDACTION_BORDER_WIDTH;
    let bh = rect.height + 2.0 * REDACTION_BORDER_WIDTH;

    let x0 = (bx * scale_x).round().max(0.0) as u32;
    let y0_pdf = (by * scale_y).round().max(0.0) as u32;
    let w = (bw * scale_x).round().max(0.0) as u32;
    let h = (bh * scale_y).round().max(0.0) as u32;
    let y0 = image_height.saturating_sub(y0_pdf + h);

    for y in y0..(y0 + h).min(image.height()) {
        for x in x0..(x0 + w).min(image.width()) {
            image.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
}

fn encode_png(image: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> Result<Vec<u8>, EngineError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| EngineError::Operation(e.to_string()))?;
    Ok(buf)
}
