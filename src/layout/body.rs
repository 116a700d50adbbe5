//! # Letter Body Block
//!
//! Subject, salutation, body and closing. In the integrated layout (the
//! DIN 5008 default) subject, salutation and body form one block starting
//! at `content.top`, separated by fixed blank lines. In the legacy layout
//! the subject is positioned on its own and the body follows
//! `subject.marginBottom` below it.
//!
//! The closing block belongs to the last page. It is anchored to sit right
//! above the page mark and footer, and only moves further down when the
//! body would otherwise run into it.

use serde::{Deserialize, Serialize};

use crate::compose::{BusinessFields, ClosingBlock, ResolvedContent};
use crate::content::{StorageResolver, ZoneContent, ZoneKey};
use crate::pagination::PageInfo;
use crate::settings::{LetterLayoutSettings, SubjectLayout};
use crate::style::TextStyle;
use crate::units::{line_height_mm, Rect};

use super::zones::{prefix_glyph, render_zone, Fallback};
use super::{text_element, DrawCommand, LayoutElement, SliceLine, TextLine, Zone};

const PREFIX_GAP_MM: f64 = 2.0;
const SIGNATURE_IMAGE_WIDTH_MM: f64 = 50.0;

/// Fixed blank space inside the body block. Two and one 11pt lines, rounded
/// the way DIN 5008 practice does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BodyGaps {
    pub after_subject_mm: f64,
    pub after_salutation_mm: f64,
    pub before_closing_mm: f64,
    /// Room for a handwritten signature when there is no signature image.
    pub signature_space_mm: f64,
    pub signature_image_height_mm: f64,
}

impl Default for BodyGaps {
    fn default() -> Self {
        Self {
            after_subject_mm: 9.0,
            after_salutation_mm: 4.5,
            before_closing_mm: 9.0,
            signature_space_mm: 4.5,
            signature_image_height_mm: 15.0,
        }
    }
}

/// Where subject and salutation go on page one, and where the body starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectPlacement {
    pub subject: Option<Rect>,
    pub salutation: Option<Rect>,
    pub body_top: f64,
}

enum SubjectSource<'a> {
    Zone(&'a ZoneContent),
    Text(&'a str),
}

fn subject_source<'a>(content: &'a ResolvedContent, fields: &'a BusinessFields) -> Option<SubjectSource<'a>> {
    match content.zones.get(ZoneKey::SubjectLine) {
        ZoneContent::Empty if fields.subject.trim().is_empty() => None,
        ZoneContent::Empty => Some(SubjectSource::Text(&fields.subject)),
        stored => Some(SubjectSource::Zone(stored)),
    }
}

fn subject_style(settings: &LetterLayoutSettings) -> TextStyle {
    TextStyle {
        font_weight: settings.subject.font_weight,
        ..TextStyle::sized(settings.subject.font_size)
    }
}

/// The subject at `(x, y)`: prefix glyph, then the text wrapped to `width`.
fn subject_text(settings: &LetterLayoutSettings, x: f64, y: f64, width: f64, text: &str) -> Vec<LayoutElement> {
    let style = subject_style(settings);
    let mut out = Vec::new();
    let mut text_x = x;
    if let Some(glyph) = prefix_glyph(
        Zone::Subject,
        settings.subject.prefix_shape,
        settings.subject.prefix_svg.as_deref(),
        x,
        y,
        style.font_size,
        style.color,
    ) {
        text_x = glyph.x + glyph.width + PREFIX_GAP_MM;
        out.push(glyph);
    }
    out.push(text_element(Zone::Subject, text_x, y, Some(x + width - text_x), text, style));
    out
}

fn subject_children(
    settings: &LetterLayoutSettings,
    source: &SubjectSource,
    rect: Rect,
    resolver: &dyn StorageResolver,
) -> Vec<LayoutElement> {
    match source {
        SubjectSource::Text(text) => subject_text(settings, rect.x, rect.y, rect.width, text),
        SubjectSource::Zone(stored) => render_zone(
            Zone::Subject,
            rect,
            stored,
            Fallback::Nothing,
            settings.subject.font_size,
            resolver,
        )
        .map(|el| el.children)
        .unwrap_or_default(),
    }
}

/// Height the subject takes at the content width.
fn subject_height(settings: &LetterLayoutSettings, source: &SubjectSource) -> f64 {
    // Canvas images only need a URL to be measured.
    let measure = |path: &str| path.to_string();
    let probe = Rect::new(0.0, 0.0, settings.content_width(), 0.0);
    let bottom = subject_children(settings, source, probe, &measure)
        .iter()
        .map(LayoutElement::bottom)
        .fold(0.0, f64::max);
    bottom.max(line_height_mm(settings.subject.font_size))
}

/// Place subject and salutation and find the top of the body.
pub fn place_subject_block(
    settings: &LetterLayoutSettings,
    content: &ResolvedContent,
    fields: &BusinessFields,
    gaps: &BodyGaps,
) -> SubjectPlacement {
    let x = settings.margins.left;
    let width = settings.content_width();
    let (mut y, after_subject) = match settings.subject_layout() {
        SubjectLayout::Integrated => (settings.content.top, gaps.after_subject_mm),
        SubjectLayout::Legacy { top, margin_bottom } => (top, margin_bottom),
    };

    let subject = subject_source(content, fields).map(|source| {
        let rect = Rect::new(x, y, width, subject_height(settings, &source));
        y = rect.bottom() + after_subject;
        rect
    });

    let salutation = (!fields.salutation.trim().is_empty()).then(|| {
        let style = TextStyle::sized(settings.salutation.font_size);
        let height = text_element(Zone::Salutation, x, y, Some(width), &fields.salutation, style).height;
        let rect = Rect::new(x, y, width, height);
        y = rect.bottom() + gaps.after_salutation_mm;
        rect
    });

    SubjectPlacement {
        subject,
        salutation,
        body_top: y,
    }
}

/// Subject and salutation elements of page one.
pub fn render_subject_block(
    settings: &LetterLayoutSettings,
    content: &ResolvedContent,
    fields: &BusinessFields,
    gaps: &BodyGaps,
    resolver: &dyn StorageResolver,
) -> Vec<LayoutElement> {
    let placement = place_subject_block(settings, content, fields, gaps);
    let mut out = Vec::new();

    if let (Some(rect), Some(source)) = (placement.subject, subject_source(content, fields)) {
        let children = subject_children(settings, &source, rect, resolver);
        out.push(LayoutElement::container(Zone::Subject, rect, children));
    }
    if let Some(rect) = placement.salutation {
        let style = TextStyle::sized(settings.salutation.font_size);
        out.push(text_element(
            Zone::Salutation,
            rect.x,
            rect.y,
            Some(rect.width),
            &fields.salutation,
            style,
        ));
    }
    out
}

/// The body area of one page. HTML backends draw the markup scrolled to the
/// slice offset; the children carry the same slice as positioned lines.
pub fn render_body_slice(
    settings: &LetterLayoutSettings,
    html: &str,
    info: &PageInfo,
    top: f64,
    lines: &[SliceLine],
) -> LayoutElement {
    let x = settings.margins.left;
    let rect = Rect::new(x, top, settings.content_width(), info.content_height_mm);
    let draw = if html.trim().is_empty() {
        DrawCommand::None
    } else {
        DrawCommand::Markup {
            html: html.to_string(),
            css: None,
            offset_y: info.content_offset_mm,
        }
    };

    let mut children = Vec::with_capacity(lines.len());
    for slice_line in lines {
        let body_line = &slice_line.line;
        let y = top + slice_line.y + body_line.space_before;
        let style = TextStyle {
            line_height: settings.content.line_height,
            ..TextStyle::sized(body_line.font_size)
        };

        if let Some(marker) = &body_line.marker {
            children.push(text_element(Zone::Body, x, y, None, marker, style.clone()));
        }

        let line_x = x + body_line.x;
        let text = TextLine {
            x: line_x,
            y,
            width: body_line.line.width,
            height: body_line.height,
            text: body_line.line.text.clone(),
            runs: body_line.line.runs.clone(),
            underline: false,
        };
        children.push(LayoutElement::new(
            Zone::Body,
            Rect::new(line_x, y, body_line.line.width, body_line.height),
            DrawCommand::Text {
                lines: vec![text],
                style,
            },
        ));
    }

    LayoutElement {
        children,
        ..LayoutElement::new(Zone::Body, rect, draw)
    }
}

/// Where the bottom of the closing block sits: right above the page mark.
pub fn closing_anchor_bottom(settings: &LetterLayoutSettings) -> f64 {
    settings.footer.top - settings.pagination_reserve()
}

/// Closing children built from y = 0, and their total height.
fn closing_block(
    settings: &LetterLayoutSettings,
    closing: &ClosingBlock,
    gaps: &BodyGaps,
    resolver: &dyn StorageResolver,
) -> Option<(Vec<LayoutElement>, f64)> {
    if closing.is_empty() {
        return None;
    }
    let x = settings.margins.left;
    let width = settings.content_width();
    let style = TextStyle::sized(settings.closing.font_size);

    let mut children = Vec::new();
    let mut y = 0.0;
    if !closing.formula.is_empty() {
        let formula = text_element(Zone::Closing, x, y, Some(width), &closing.formula, style.clone());
        y = formula.bottom();
        children.push(formula);
    }

    let signature_url = closing.signature_image_path.as_deref().and_then(|path| {
        let url = resolver.resolve_public_url(path);
        (!url.is_empty()).then_some(url)
    });
    match signature_url {
        Some(url) => {
            let rect = Rect::new(x, y, SIGNATURE_IMAGE_WIDTH_MM, gaps.signature_image_height_mm);
            children.push(LayoutElement::new(Zone::Closing, rect, DrawCommand::Image { url }));
            y = rect.bottom();
        }
        None => y += gaps.signature_space_mm,
    }

    for line in [&closing.name, &closing.title] {
        if line.is_empty() {
            continue;
        }
        let el = text_element(Zone::Closing, x, y, Some(width), line, style.clone());
        y = el.bottom();
        children.push(el);
    }
    Some((children, y))
}

/// Room the closing needs below the body: the blank before it plus the
/// block itself. Zero when there is nothing to sign.
pub fn closing_reserve(
    settings: &LetterLayoutSettings,
    closing: &ClosingBlock,
    gaps: &BodyGaps,
    resolver: &dyn StorageResolver,
) -> f64 {
    closing_block(settings, closing, gaps, resolver).map_or(0.0, |(_, height)| gaps.before_closing_mm + height)
}

/// The closing block of the last page, or `None` when there is nothing to
/// sign. `body_bottom` is where the body text ends on that page. The page
/// cut leaves room for the block above its anchor; only a single body line
/// taller than a page can still push it down.
pub fn render_closing(
    settings: &LetterLayoutSettings,
    closing: &ClosingBlock,
    gaps: &BodyGaps,
    body_bottom: f64,
    resolver: &dyn StorageResolver,
) -> Option<LayoutElement> {
    let (children, height) = closing_block(settings, closing, gaps, resolver)?;
    let anchored = closing_anchor_bottom(settings) - height;
    let after_body = body_bottom + gaps.before_closing_mm;
    let top = anchored.max(after_body);
    if after_body > anchored {
        tracing::debug!(anchored, after_body, "closing pushed below its anchor by the body");
    }

    let rect = Rect::new(settings.margins.left, 0.0, settings.content_width(), height);
    let mut element = LayoutElement::container(Zone::Closing, rect, children);
    element.offset_y(top);
    Some(element)
}
