// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine actor — mailbox loop and operation boundary.
//
// Every operation runs to completion before the next message is read, so only
// one pagination pass is ever alive. Failures never escape an operation: they
// are turned into `ERROR{data, code}` replies here.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, instrument, warn};

use penscript_bridge::EngineEvent;
use penscript_bridge::transfer::{TransferReceiver, needs_chunking, send_chunked};
use penscript_core::config::{AppConfig, ChunkProfile};
use penscript_core::error::{PenscriptError, Result};
use penscript_core::messages::{EngineMessage, HostMessage, engine_frame};
use penscript_core::types::{GenerationConfig, PaperSize, ProgressStep, QualityTier};
use penscript_document::render::raster::{encode_page, page_seed};
use penscript_document::{GlyphSurface, Page, Paginator, PdfReader, PdfWriter, RenderSurface};

/// Tunables the engine takes from the app configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Profile used when the PDF result is sent back in chunks.
    pub chunk_profile: ChunkProfile,
    /// Page count above which assembly downscales page images.
    pub compress_threshold: usize,
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chunk_profile: config.chunk_profile,
            compress_threshold: config.compress_threshold,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// One engine instance. Owns the render surface and all in-flight state.
pub struct Engine {
    generation: u64,
    events: UnboundedSender<EngineEvent>,
    options: EngineOptions,
    surface: GlyphSurface,
    paginator: Paginator,
    inbound: TransferReceiver,
    /// Pages from the last `GENERATE_IMAGE`, for a `GENERATE_PDF` without images.
    last_images: Option<Vec<String>>,
    last_page_size: PaperSize,
}

impl Engine {
    pub fn new(
        generation: u64,
        events: UnboundedSender<EngineEvent>,
        options: EngineOptions,
    ) -> Self {
        Self {
            generation,
            events,
            options,
            surface: GlyphSurface::default(),
            paginator: Paginator::new(),
            inbound: TransferReceiver::new(),
            last_images: None,
            last_page_size: PaperSize::A4,
        }
    }

    /// Announce readiness, then serve the mailbox until it closes.
    #[instrument(skip_all, fields(generation = self.generation))]
    pub async fn run(mut self, mut inbox: UnboundedReceiver<String>) {
        self.emit(EngineMessage::WebviewReady);
        info!("engine ready");
        while let Some(raw) = inbox.recv().await {
            self.handle_raw(&raw).await;
        }
        debug!("engine mailbox closed");
    }

    /// Process one serialized host message, replying with its result or an
    /// `ERROR` event.
    pub async fn handle_raw(&mut self, raw: &str) {
        let message = match HostMessage::from_json(raw) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "malformed host message");
                let err = PenscriptError::Bridge(format!("malformed host message: {err}"));
                self.emit(EngineMessage::from_error(&err));
                return;
            }
        };

        let kind = message.kind();
        debug!(kind, "handling host message");
        if let Err(err) = self.handle(message).await {
            warn!(kind, code = %err.code(), error = %err, "operation failed");
            self.emit(EngineMessage::from_error(&err));
        }
    }

    async fn handle(&mut self, message: HostMessage) -> Result<()> {
        if let Some(frame) = message.as_transfer_frame() {
            if let Some(data) = self.inbound.accept(frame)? {
                self.extract_text(&data)?;
            }
            return Ok(());
        }

        match message {
            HostMessage::UpdatePreview { text, config } => {
                let image = self.preview(&text, &config).map_err(preview_error)?;
                self.emit(EngineMessage::PreviewReady { image });
            }
            HostMessage::GenerateImage { text, config } => {
                let images = self.render_pages(&text, &config).await?;
                self.last_images = Some(images.clone());
                self.emit(EngineMessage::Success { images });
            }
            HostMessage::GeneratePdf { images } => {
                let pages = match images.as_deref() {
                    Some(pages) => pages,
                    None => self.last_images.as_deref().ok_or(PenscriptError::NoImages)?,
                };
                let data = self.assemble_pdf(pages)?;
                self.deliver_pdf(data).await?;
            }
            HostMessage::ExtractTextFromPdf { data } => self.extract_text(&data)?,
            HostMessage::PdfDataStart { .. }
            | HostMessage::PdfDataChunk { .. }
            | HostMessage::PdfDataEnd { .. } => {}
        }
        Ok(())
    }

    // -- Replies ---------------------------------------------------------------

    fn emit(&self, message: EngineMessage) {
        let kind = message.kind();
        let raw = match message.to_json() {
            Ok(raw) => raw,
            Err(err) => {
                warn!(kind, error = %err, "cannot serialize engine message");
                return;
            }
        };
        let event = EngineEvent::Message {
            generation: self.generation,
            raw,
        };
        if self.events.send(event).is_err() {
            debug!(kind, "host gone; reply dropped");
        }
    }

    fn progress(&self, step: ProgressStep, current: usize, total: usize, message: String) {
        self.emit(EngineMessage::Progress {
            step,
            current,
            total,
            message,
        });
    }

    // -- Rendering -------------------------------------------------------------

    /// Rasterize and JPEG-encode one paginated page, returning base64.
    fn capture(
        &mut self,
        text: &str,
        style: &GenerationConfig,
        page: &Page,
        quality: QualityTier,
    ) -> Result<String> {
        self.surface.apply_style(style)?;
        for token in &page.tokens {
            self.surface.push_token(token);
        }
        let raster = self.surface.rasterize(quality, page_seed(text, style, page.index));
        self.surface.clear();
        let jpeg = encode_page(raster?, quality)?;
        Ok(BASE64.encode(jpeg))
    }

    /// First page only, at the low tier.
    #[instrument(skip_all, fields(chars = text.len()))]
    fn preview(&mut self, text: &str, style: &GenerationConfig) -> Result<String> {
        let pages = self.paginator.paginate(&mut self.surface, text, style)?;
        let first = pages
            .first()
            .ok_or_else(|| PenscriptError::Preview("pagination produced no pages".into()))?;
        self.capture(text, style, first, QualityTier::Low)
    }

    /// Every page at the configured tier, yielding between captures.
    #[instrument(skip_all, fields(chars = text.len(), quality = ?style.quality))]
    async fn render_pages(&mut self, text: &str, style: &GenerationConfig) -> Result<Vec<String>> {
        let pages = self.paginator.paginate(&mut self.surface, text, style)?;
        let total = pages.len();
        let mut images = Vec::with_capacity(total);

        for page in &pages {
            images.push(self.capture(text, style, page, style.quality)?);
            let current = page.index + 1;
            self.progress(
                ProgressStep::Image,
                current,
                total,
                format!("Rendered page {current} of {total}"),
            );
            tokio::task::yield_now().await;
        }

        self.last_page_size = style.page_size;
        info!(pages = total, "pages rendered");
        Ok(images)
    }

    // -- Assembly --------------------------------------------------------------

    #[instrument(skip_all, fields(pages = images.len()))]
    fn assemble_pdf(&self, images: &[String]) -> Result<String> {
        let decoded = images
            .iter()
            .enumerate()
            .map(|(i, image)| {
                BASE64.decode(image).map_err(|err| {
                    PenscriptError::PdfBlob(format!("page {}: invalid base64: {err}", i + 1))
                })
            })
            .collect::<Result<Vec<Vec<u8>>>>()?;

        let pdf = PdfWriter::new(self.last_page_size)
            .with_compress_threshold(self.options.compress_threshold)
            .assemble(&decoded, |current, total| {
                self.progress(
                    ProgressStep::Pdf,
                    current,
                    total,
                    format!("Added page {current} of {total}"),
                );
            })?;
        Ok(BASE64.encode(pdf))
    }

    /// Send the PDF back, chunked when it exceeds one chunk.
    async fn deliver_pdf(&self, data: String) -> Result<()> {
        let profile = self.options.chunk_profile;
        if !needs_chunking(&data, &profile) {
            self.emit(EngineMessage::PdfSuccess { data });
            return Ok(());
        }
        send_chunked(&data, &profile, |frame| {
            self.emit(engine_frame(frame));
            Ok(())
        })
        .await?;
        Ok(())
    }

    // -- Extraction ------------------------------------------------------------

    #[instrument(skip_all, fields(bytes = data.len()))]
    fn extract_text(&self, data: &str) -> Result<()> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|err| PenscriptError::PdfInvalid(format!("payload is not base64: {err}")))?;
        let reader = PdfReader::from_bytes(&bytes)?;
        let text = reader.extract_text(|current, total| {
            self.progress(
                ProgressStep::Extract,
                current,
                total,
                format!("Read page {current} of {total}"),
            );
        })?;
        self.emit(EngineMessage::PdfTextExtracted { data: text });
        Ok(())
    }
}

/// Preview failures report as `PREVIEW_ERROR` unless a more specific code
/// applies.
fn preview_error(err: PenscriptError) -> PenscriptError {
    match err {
        PenscriptError::Style(_) | PenscriptError::PaginationOverflow { .. } => err,
        other => PenscriptError::Preview(other.to_string()),
    }
}
