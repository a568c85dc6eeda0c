// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// penscript-document — Page production for Penscript.
//
// Provides the handwriting pipeline (tokenize, measure, paginate, rasterize),
// image recompression, PDF assembly from page images, and PDF text
// extraction with reading-order reconstruction.

pub mod image;
pub mod pdf;
pub mod render;

// Re-export the primary structs so callers can use `penscript_document::PdfReader` etc.
pub use crate::image::processor::ImageProcessor;
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use render::paginate::{Page, Paginator};
pub use render::surface::{GlyphSurface, RenderSurface};

// Page rasters are plain `image` buffers.
pub use ::image::RgbImage;
