// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open a user-supplied PDF with `lopdf`, pull positioned text runs
// out of each page's content stream and rebuild reading order.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use penscript_core::error::{PenscriptError, Result};
use tracing::{debug, info, instrument, warn};

/// Runs whose baselines differ by at most this much share a line.
pub const SAME_LINE_TOLERANCE: f32 = 2.0;
/// Vertical gap above which a new line starts.
pub const LINE_BREAK_GAP: f32 = 5.0;
/// Vertical gap above which a blank line separates paragraphs.
pub const PARAGRAPH_GAP: f32 = 24.0;
/// `TJ` adjustments below this (thousandths of an em) read as a word space.
const TJ_SPACE_THRESHOLD: f32 = -250.0;
/// Rough glyph advance used to move the pen after showing text.
const APPROX_GLYPH_WIDTH_EM: f32 = 0.5;

/// A piece of text shown at a page position (PDF user space, y grows upward).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// Read-only view of a PDF for text extraction.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Load a PDF from memory.
    ///
    /// Encrypted documents that do not open with the empty user password are
    /// [`PenscriptError::PdfPasswordProtected`]; anything that does not parse
    /// is [`PenscriptError::PdfInvalid`].
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut document = match Document::load_mem(data) {
            Ok(document) => document,
            Err(err) => {
                if contains(data, b"/Encrypt") {
                    warn!(%err, "encrypted PDF could not be opened");
                    return Err(PenscriptError::PdfPasswordProtected);
                }
                return Err(PenscriptError::PdfInvalid(err.to_string()));
            }
        };

        if document.is_encrypted() {
            if let Err(err) = document.decrypt("") {
                warn!(%err, "PDF needs a password");
                return Err(PenscriptError::PdfPasswordProtected);
            }
            debug!("opened encrypted PDF with empty user password");
        }

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    // -- Extraction -----------------------------------------------------------

    /// Positioned text runs of one page (1-indexed), in content-stream order.
    pub fn page_runs(&self, page_number: u32) -> Result<Vec<TextRun>> {
        let pages = self.document.get_pages();
        let page_id: ObjectId = *pages.get(&page_number).ok_or_else(|| {
            PenscriptError::PdfExtract(format!(
                "page {page_number} out of range (document has {} pages)",
                pages.len()
            ))
        })?;

        let bytes = self.document.get_page_content(page_id).map_err(|err| {
            PenscriptError::PdfExtract(format!("page {page_number}: cannot read content: {err}"))
        })?;
        let content = Content::decode(&bytes).map_err(|err| {
            PenscriptError::PdfExtract(format!("page {page_number}: cannot decode content: {err}"))
        })?;

        let mut state = TextState::default();
        let mut runs = Vec::new();
        for operation in &content.operations {
            state.apply(operation, &mut runs);
        }
        Ok(runs)
    }

    /// Extract the whole document as plain text.
    ///
    /// Pages are separated by a blank line. `on_page(current, total)` runs
    /// after each page. A document without text yields an empty string.
    #[instrument(skip_all, fields(pages = self.page_count()))]
    pub fn extract_text<F>(&self, mut on_page: F) -> Result<String>
    where
        F: FnMut(usize, usize),
    {
        let page_numbers: Vec<u32> = self.document.get_pages().keys().copied().collect();
        let total = page_numbers.len();
        let mut texts = Vec::with_capacity(total);

        for (index, page_number) in page_numbers.into_iter().enumerate() {
            let runs = self.page_runs(page_number)?;
            let text = reconstruct_page(&runs);
            debug!(page = page_number, runs = runs.len(), chars = text.len(), "page extracted");
            if !text.is_empty() {
                texts.push(text);
            }
            on_page(index + 1, total);
        }

        let joined = texts.join("\n\n");
        info!(pages = total, chars = joined.len(), "text extraction complete");
        Ok(joined)
    }
}

/// Rebuild reading order: top to bottom, then left to right.
pub fn reconstruct_page(runs: &[TextRun]) -> String {
    let mut sorted: Vec<&TextRun> = runs.iter().filter(|r| !r.text.trim().is_empty()).collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    // Group into lines keyed by the baseline of their first run.
    let mut lines: Vec<(f32, Vec<&TextRun>)> = Vec::new();
    for run in sorted {
        match lines.last_mut() {
            Some((y, members)) if (*y - run.y).abs() <= SAME_LINE_TOLERANCE => members.push(run),
            _ => lines.push((run.y, vec![run])),
        }
    }

    let mut out = String::new();
    let mut previous_y: Option<f32> = None;
    for (y, mut members) in lines {
        members.sort_by(|a, b| a.x.total_cmp(&b.x));
        if let Some(prev) = previous_y {
            let gap = prev - y;
            if gap > PARAGRAPH_GAP {
                out.push_str("\n\n");
            } else if gap > LINE_BREAK_GAP {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
        let line: Vec<&str> = members.iter().map(|r| r.text.trim()).collect();
        out.push_str(&line.join(" "));
        previous_y = Some(y);
    }
    out
}

// -- Content stream interpretation --------------------------------------------

/// The subset of the PDF text state needed to position runs.
#[derive(Debug, Clone, Copy)]
struct TextState {
    /// Text matrix `[a b c d e f]`.
    tm: [f32; 6],
    /// Text line matrix.
    tlm: [f32; 6],
    leading: f32,
    font_size: f32,
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl Default for TextState {
    fn default() -> Self {
        Self {
            tm: IDENTITY,
            tlm: IDENTITY,
            leading: 0.0,
            font_size: 12.0,
        }
    }
}

impl TextState {
    fn apply(&mut self, op: &Operation, runs: &mut Vec<TextRun>) {
        let num = |i: usize| op.operands.get(i).and_then(number);
        match op.operator.as_str() {
            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
            }
            "Tm" => {
                let mut m = IDENTITY;
                for (i, slot) in m.iter_mut().enumerate() {
                    match num(i) {
                        Some(v) => *slot = v,
                        None => return,
                    }
                }
                self.tm = m;
                self.tlm = m;
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "T*" => self.move_line(0.0, -self.leading),
            "TL" => {
                if let Some(leading) = num(0) {
                    self.leading = leading;
                }
            }
            "Tf" => {
                if let Some(size) = num(1) {
                    self.font_size = size;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(decode_pdf_string(bytes), runs);
                }
            }
            "'" => {
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(decode_pdf_string(bytes), runs);
                }
            }
            "\"" => {
                self.move_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    self.show(decode_pdf_string(bytes), runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let text = self.collect_tj(items);
                    self.show(text, runs);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.tlm;
        self.tlm = [a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d];
        self.tm = self.tlm;
    }

    fn scaled_font(&self) -> f32 {
        self.font_size * self.tm[0].abs().max(self.tm[3].abs())
    }

    fn show(&mut self, text: String, runs: &mut Vec<TextRun>) {
        if text.is_empty() {
            return;
        }
        let advance = text.chars().count() as f32 * APPROX_GLYPH_WIDTH_EM * self.scaled_font();
        runs.push(TextRun {
            text,
            x: self.tm[4],
            y: self.tm[5],
        });
        self.tm[4] += advance;
    }

    fn collect_tj(&self, items: &[Object]) -> String {
        let mut text = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                other => {
                    let spaced = number(other).is_some_and(|adj| adj < TJ_SPACE_THRESHOLD);
                    if spaced && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
            }
        }
        text
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// UTF-16BE when the string starts with a byte-order mark, Latin-1 otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
