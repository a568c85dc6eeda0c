// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — assemble captured page images into one document using
// `printpdf` 0.8.
//
// printpdf 0.8 is data-oriented: each `PdfPage` holds a `Vec<Op>` and the
// document is serialised in one go by `PdfDocument::save()`.

use penscript_core::error::{PenscriptError, Result};
use penscript_core::types::PaperSize;
use printpdf::{
    ImageCompression, ImageOptimizationOptions, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions,
    PdfWarnMsg, Pt, RawImage, RawImageData, RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;

/// Pages beyond which images are downscaled before embedding.
pub const DEFAULT_COMPRESS_THRESHOLD: usize = 10;
/// Pixel box that compressed pages are fitted into.
pub const COMPRESSED_MAX_WIDTH: u32 = 1240;
pub const COMPRESSED_MAX_HEIGHT: u32 = 1754;
/// JPEG quality (0..1) of embedded pages in compressed documents.
pub const COMPRESSED_JPEG_QUALITY: f32 = 0.7;
const DOCUMENT_TITLE: &str = "Penscript";
/// Page images are placed at one pixel per point before fitting.
const IMAGE_DPI: f32 = 72.0;

/// Builds one PDF from an ordered list of page images.
pub struct PdfWriter {
    paper_size: PaperSize,
    margin_mm: f32,
    compress_threshold: usize,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            margin_mm: 10.0,
            compress_threshold: DEFAULT_COMPRESS_THRESHOLD,
        }
    }

    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    pub fn with_compress_threshold(mut self, pages: usize) -> Self {
        self.compress_threshold = pages;
        self
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    // -- Assembly -------------------------------------------------------------

    /// Assemble `images` (encoded JPEG/PNG, one per page) into a PDF.
    ///
    /// Pages keep input order. Each image is scaled to fit inside the page
    /// margins, preserving aspect ratio, and centred. `on_page(current, total)`
    /// runs after each page is placed. Any undecodable image fails the whole
    /// document.
    #[instrument(skip_all, fields(pages = images.len()))]
    pub fn assemble<F>(&self, images: &[Vec<u8>], mut on_page: F) -> Result<Vec<u8>>
    where
        F: FnMut(usize, usize),
    {
        if images.is_empty() {
            return Err(PenscriptError::NoImages);
        }

        let total = images.len();
        let compress = total > self.compress_threshold;
        info!(paper = ?self.paper_size, total, compress, "Assembling PDF");

        let (page_w, page_h) = self.page_dimensions();
        let margin_pt = Mm(self.margin_mm).into_pt().0;
        let usable_w_pt = Mm(page_w.0 - 2.0 * self.margin_mm).into_pt().0;
        let usable_h_pt = Mm(page_h.0 - 2.0 * self.margin_mm).into_pt().0;

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let mut pages: Vec<PdfPage> = Vec::with_capacity(total);

        for (index, bytes) in images.iter().enumerate() {
            let mut processor = ImageProcessor::from_bytes(bytes).map_err(|err| {
                PenscriptError::PdfBlob(format!("page {}: {err}", index + 1))
            })?;
            if compress {
                processor = processor.resize(COMPRESSED_MAX_WIDTH, COMPRESSED_MAX_HEIGHT);
            }

            let rgb = processor.into_dynamic().into_rgb8();
            let (img_width, img_height) = rgb.dimensions();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: img_width as usize,
                height: img_height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let img_w_pt = img_width as f32 / IMAGE_DPI * 72.0;
            let img_h_pt = img_height as f32 / IMAGE_DPI * 72.0;
            let scale = (usable_w_pt / img_w_pt).min(usable_h_pt / img_h_pt);
            let rendered_w_pt = img_w_pt * scale;
            let rendered_h_pt = img_h_pt * scale;
            let x_offset = margin_pt + (usable_w_pt - rendered_w_pt) / 2.0;
            let y_offset = margin_pt + (usable_h_pt - rendered_h_pt) / 2.0;

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(x_offset)),
                    translate_y: Some(Pt(y_offset)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(IMAGE_DPI),
                    rotate: None,
                },
            }];
            pages.push(PdfPage::new(page_w, page_h, ops));
            debug!(page = index + 1, rendered_w_pt, rendered_h_pt, "Image placed on page");
            on_page(index + 1, total);
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&save_options(compress), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings while saving");
        }
        if output.is_empty() {
            return Err(PenscriptError::PdfBlob("encoder produced no output".into()));
        }

        info!(bytes = output.len(), "PDF assembled");
        Ok(output)
    }
}

/// Pages are stored lossless at full resolution, or as reduced-quality JPEG
/// when the document is large.
fn save_options(compress: bool) -> PdfSaveOptions {
    let image_optimization = if compress {
        ImageOptimizationOptions {
            quality: Some(COMPRESSED_JPEG_QUALITY),
            max_image_size: None,
            format: Some(ImageCompression::Jpeg),
            ..ImageOptimizationOptions::default()
        }
    } else {
        ImageOptimizationOptions {
            quality: None,
            max_image_size: None,
            format: Some(ImageCompression::Flate),
            ..ImageOptimizationOptions::default()
        }
    };
    PdfSaveOptions {
        image_optimization: Some(image_optimization),
        ..PdfSaveOptions::default()
    }
}
