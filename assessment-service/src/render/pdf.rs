//! Paginated PDF layout for assessment reports.
//!
//! Text-only Letter pages with the built-in Helvetica face, so no font files
//! ship with the service. Built-in faces carry no glyph metrics here, so line
//! width is budgeted from an average glyph width.

use super::RenderError;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// US Letter, in points.
const PAGE_WIDTH_PT: f32 = 612.0;
const PAGE_HEIGHT_PT: f32 = 792.0;
const MARGIN_PT: f32 = 50.0;
/// Body text wraps at this width.
const CONTENT_WIDTH_PT: f32 = 500.0;

const TITLE_SIZE: f32 = 20.0;
const HEADER_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;

const LINE_SPACING: f32 = 1.2;
/// Average Helvetica advance width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

const LAYER_NAME: &str = "Layer 1";

/// Everything the renderer puts on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub title: String,
    /// Smaller lines under the title; empty values are filtered by the caller.
    pub header_lines: Vec<String>,
    /// Plain text; `\n` separates lines, blank lines are kept.
    pub body: String,
}

fn pt(value: f32) -> Mm {
    Mm(value * 25.4 / 72.0)
}

/// How many characters fit on one line at `font_size`.
fn chars_per_line(font_size: f32) -> usize {
    ((CONTENT_WIDTH_PT / (font_size * AVG_GLYPH_EM)).floor() as usize).max(1)
}

/// Lay out `document`, save it to `path`, and return the page count.
///
/// Blocking; run it on the blocking pool. On error the file at `path` may be
/// partially written and is the caller's to remove.
pub fn render_pdf(document: &ReportDocument, path: &Path) -> Result<usize, RenderError> {
    let (doc, page, layer) = PdfDocument::new(
        document.title.as_str(),
        pt(PAGE_WIDTH_PT),
        pt(PAGE_HEIGHT_PT),
        LAYER_NAME,
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    let pages = {
        let mut cursor = PageCursor {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            font,
            y_pt: PAGE_HEIGHT_PT - MARGIN_PT,
            pages: 1,
        };

        cursor.title(&document.title);
        cursor.blank_line(TITLE_SIZE);

        for line in &document.header_lines {
            cursor.paragraph(line, HEADER_SIZE);
        }
        cursor.blank_line(HEADER_SIZE);

        for line in document.body.lines() {
            cursor.paragraph(line, BODY_SIZE);
        }

        cursor.pages
    };

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    Ok(pages)
}

/// Write position on the current page, top-down.
struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    /// Baseline of the last written line, in points from the bottom edge.
    y_pt: f32,
    pages: usize,
}

impl PageCursor<'_> {
    /// Move down one line, starting a new page when it would cross the bottom
    /// margin.
    fn advance(&mut self, font_size: f32) {
        let step = font_size * LINE_SPACING;
        if self.y_pt - step < MARGIN_PT {
            let (page, layer) = self
                .doc
                .add_page(pt(PAGE_WIDTH_PT), pt(PAGE_HEIGHT_PT), LAYER_NAME);
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y_pt = PAGE_HEIGHT_PT - MARGIN_PT;
            self.pages += 1;
        }
        self.y_pt -= step;
    }

    fn text_line(&mut self, text: &str, font_size: f32) {
        self.advance(font_size);
        if !text.is_empty() {
            self.layer
                .use_text(text, font_size, pt(MARGIN_PT), pt(self.y_pt), &self.font);
        }
    }

    fn blank_line(&mut self, font_size: f32) {
        self.advance(font_size);
    }

    /// Wrapped, left-aligned text.
    fn paragraph(&mut self, text: &str, font_size: f32) {
        for line in wrap_line(text, chars_per_line(font_size)) {
            self.text_line(&line, font_size);
        }
    }

    /// Large title with a rule under each of its lines.
    fn title(&mut self, text: &str) {
        for line in wrap_line(text, chars_per_line(TITLE_SIZE)) {
            self.text_line(&line, TITLE_SIZE);

            let width = (line.chars().count() as f32 * TITLE_SIZE * AVG_GLYPH_EM)
                .min(CONTENT_WIDTH_PT);
            let underline_y = self.y_pt - TITLE_SIZE * 0.15;
            self.layer.set_outline_thickness(1.0);
            self.layer.add_line(Line {
                points: vec![
                    (Point::new(pt(MARGIN_PT), pt(underline_y)), false),
                    (Point::new(pt(MARGIN_PT + width), pt(underline_y)), false),
                ],
                is_closed: false,
            });
        }
    }
}

/// Greedy word wrap at `max_chars`. Words longer than a line are split; an
/// empty input yields one empty line so blank lines survive layout.
pub(crate) fn wrap_line(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.trim_end().to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word;
        let mut word_len = word.chars().count();

        while word_len > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let split = word
                .char_indices()
                .nth(max_chars)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            lines.push(word[..split].to_string());
            word = &word[split..];
            word_len -= max_chars;
        }

        if word_len == 0 {
            continue;
        }

        if current_len == 0 {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }

    lines
}
