//! # Letter Layout
//!
//! Places every zone of a DIN 5008 letter on A4 pages, in millimeters from
//! the top-left corner of the sheet.
//!
//! Unlike a flowing document, almost nothing in a business letter is
//! negotiable: the address window, the information block, the start of the
//! body and the footer sit at positions the standard fixes. Only the body
//! flows, and it is cut into page slices of whole lines.
//! So the renderer works page by page:
//!
//! 1. Page one gets the letterhead, the address container (return address
//!    above recipient address), the information block and the
//!    subject/salutation block.
//! 2. Every page gets its slice of the body, the footer, the page mark and
//!    the fold/hole marks.
//! 3. The last page gets the closing block, anchored above the footer, with
//!    the attachment note beside it.
//!
//! Each zone resolves its content once: line mode, else canvas mode, else a
//! fallback built from the business fields, else nothing. Missing data never
//! fails a render.
//!
//! The output tree is the wire format for every backend: the live preview,
//! the print preview and PDF export all consume the same [`LayoutPage`]s.

pub mod body;
pub mod debug;
pub mod flex;
pub mod footer;
pub mod marks;
pub mod zones;

use serde::Serialize;

use crate::compose::{BusinessFields, PreparedLetter, ResolvedContent};
use crate::content::{PrefixShape, StorageResolver};
use crate::pagination::slice::{slice_lines, LineSlices, SliceRoom};
use crate::pagination::{PageInfo, Pagination, PaginationConstants};
use crate::settings::LetterLayoutSettings;
use crate::style::{Color, TextAlign, TextStyle};
use crate::text::{flow_paragraphs, BodyLine, FlowStyle, TextLayout, TextRun};
use crate::units::Rect;

pub use body::BodyGaps;

/// Which part of the letter an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Zone {
    Header,
    ReturnAddress,
    AddressField,
    InfoBlock,
    Subject,
    Salutation,
    Body,
    Closing,
    Attachments,
    Footer,
    Pagination,
    FoldMarks,
    Guide,
}

/// A fully laid-out page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPage {
    pub page_number: usize,
    pub total_pages: usize,
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

impl LayoutPage {
    /// Depth-first walk over every element on the page.
    pub fn walk(&self) -> impl Iterator<Item = &LayoutElement> {
        let mut stack: Vec<&LayoutElement> = self.elements.iter().rev().collect();
        std::iter::from_fn(move || {
            let el = stack.pop()?;
            stack.extend(el.children.iter().rev());
            Some(el)
        })
    }

    /// Every element of `zone`, nested ones included.
    pub fn zone(&self, zone: Zone) -> impl Iterator<Item = &LayoutElement> {
        self.walk().filter(move |el| el.zone == zone)
    }

    /// All text lines of `zone` in drawing order.
    pub fn text_of(&self, zone: Zone) -> Vec<&TextLine> {
        self.zone(zone)
            .flat_map(|el| match &el.draw {
                DrawCommand::Text { lines, .. } => lines.iter().collect::<Vec<_>>(),
                _ => Vec::new(),
            })
            .collect()
    }
}

/// A positioned element. Coordinates are absolute page millimeters; children
/// are positioned relative to the page, not to their parent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutElement {
    pub zone: Zone,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutElement>,
}

impl LayoutElement {
    pub fn new(zone: Zone, rect: Rect, draw: DrawCommand) -> Self {
        Self {
            zone,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            draw,
            children: Vec::new(),
        }
    }

    /// A zone box that only groups children.
    pub fn container(zone: Zone, rect: Rect, children: Vec<LayoutElement>) -> Self {
        Self {
            children,
            ..Self::new(zone, rect, DrawCommand::None)
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shift this element and everything nested in it down by `dy`.
    pub fn offset_y(&mut self, dy: f64) {
        self.y += dy;
        if let DrawCommand::Text { ref mut lines, .. } = self.draw {
            for line in lines.iter_mut() {
                line.y += dy;
            }
        }
        if let DrawCommand::Rule { ref mut y2, .. } = self.draw {
            *y2 += dy;
        }
        for child in &mut self.children {
            child.offset_y(dy);
        }
    }
}

/// What to draw for an element.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DrawCommand {
    /// Just a zone box.
    None,
    Text {
        lines: Vec<TextLine>,
        style: TextStyle,
    },
    /// An image by public URL, scaled into the element box.
    Image { url: String },
    /// Raw markup for HTML backends. `offsetY` scrolls the markup up so the
    /// box shows the slice starting that far into the flow.
    #[serde(rename_all = "camelCase")]
    Markup {
        html: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        css: Option<String>,
        offset_y: f64,
    },
    /// A straight line from the element origin to `(x2, y2)`.
    #[serde(rename_all = "camelCase")]
    Rule {
        x2: f64,
        y2: f64,
        /// Stroke width in mm.
        stroke_width: f64,
        color: Color,
    },
    /// A glyph shape filling the element box.
    #[serde(rename_all = "camelCase")]
    Shape {
        shape: PrefixShape,
        #[serde(skip_serializing_if = "Option::is_none")]
        svg: Option<String>,
        color: Color,
    },
    /// A diagnostic outline of the element box.
    Guide { label: String, color: Color },
}

/// One line of text. `y` is the top of the line box.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLine {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub runs: Vec<TextRun>,
    pub underline: bool,
}

/// Lay `text` out as a text element at `(x, y)`, wrapping at `width` when
/// given and aligning lines inside it.
pub(crate) fn text_element(zone: Zone, x: f64, y: f64, width: Option<f64>, text: &str, style: TextStyle) -> LayoutElement {
    let bold = style.font_weight.is_bold();
    let wrap = width.filter(|w| w.is_finite() && *w > 0.0);
    let broken = TextLayout::new().break_into_lines(text, wrap.unwrap_or(f64::INFINITY), style.font_size, bold);

    let line_height = style.line_height_mm();
    let box_width = wrap.unwrap_or_else(|| broken.iter().map(|l| l.width).fold(0.0, f64::max));
    let underline = matches!(style.text_decoration, crate::style::TextDecoration::Underline);

    let lines: Vec<TextLine> = broken
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let slack = (box_width - line.width).max(0.0);
            let dx = match style.text_align {
                TextAlign::Right => slack,
                TextAlign::Center => slack / 2.0,
                TextAlign::Left | TextAlign::Justify => 0.0,
            };
            TextLine {
                x: x + dx,
                y: y + i as f64 * line_height,
                width: line.width,
                height: line_height,
                text: line.text,
                runs: line.runs,
                underline,
            }
        })
        .collect();

    let height = lines.len() as f64 * line_height;
    LayoutElement::new(
        zone,
        Rect::new(x, y, box_width, height),
        DrawCommand::Text { lines, style },
    )
}

// ── Renderer ────────────────────────────────────────────────────

/// Inputs of one render pass. The renderer reads them and never mutates.
#[derive(Clone, Copy)]
pub struct RenderInput<'a> {
    pub settings: &'a LetterLayoutSettings,
    pub content: &'a ResolvedContent,
    pub fields: &'a BusinessFields,
    pub resolver: &'a dyn StorageResolver,
    pub debug: bool,
}

impl<'a> RenderInput<'a> {
    pub fn new(prepared: &'a PreparedLetter, resolver: &'a dyn StorageResolver) -> Self {
        Self {
            settings: &prepared.settings,
            content: &prepared.content,
            fields: &prepared.fields,
            resolver,
            debug: false,
        }
    }

    pub fn with_debug(self, debug: bool) -> Self {
        Self { debug, ..self }
    }
}

/// One body line positioned inside its page slice.
#[derive(Debug, Clone)]
pub struct SliceLine {
    /// Offset from the top of the slice.
    pub y: f64,
    pub line: BodyLine,
}

/// What the body area of a page shows.
#[derive(Debug, Clone)]
pub enum BodySlot {
    /// Nothing: a live editing surface is overlaid instead.
    Suppressed,
    Slice(Vec<SliceLine>),
}

/// Everything page-specific the renderer needs.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub info: PageInfo,
    pub total_pages: usize,
    pub body: BodySlot,
    /// Draw the closing block (and the attachment note) on this page.
    pub closing: bool,
}

/// All pages of a letter and the pagination that cut them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedLetter {
    pub pagination: Pagination,
    pub pages: Vec<LayoutPage>,
}

/// The letter renderer. Pure: the same input always gives the same pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct LetterLayout {
    pub gaps: BodyGaps,
    pub constants: PaginationConstants,
}

impl LetterLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gaps(mut self, gaps: BodyGaps) -> Self {
        self.gaps = gaps;
        self
    }

    pub fn with_constants(mut self, constants: PaginationConstants) -> Self {
        self.constants = constants;
        self
    }

    /// Top of the body area on `page_number`.
    pub fn body_top(&self, input: &RenderInput, page_number: usize) -> f64 {
        if page_number <= 1 {
            body::place_subject_block(input.settings, input.content, input.fields, &self.gaps).body_top
        } else {
            self.constants.follow_page_content_top_mm
        }
    }

    /// The flow style of the letter body.
    pub fn flow_style(settings: &LetterLayoutSettings) -> FlowStyle {
        FlowStyle::new(
            settings.content_width(),
            settings.content.font_size,
            settings.content.line_height,
        )
    }

    /// Room for body lines on page one and on follow pages. Page one stops at
    /// the reserve above the footer and at the bottom of the content area;
    /// the page with the closing block also keeps its room above the anchor.
    pub fn slice_rooms(&self, input: &RenderInput, first_top: f64) -> (SliceRoom, SliceRoom) {
        let settings = input.settings;
        let footer_top = settings.footer.top;
        let closing = body::closing_reserve(settings, &input.fields.closing, &self.gaps, input.resolver);
        let anchor = body::closing_anchor_bottom(settings);

        let content_bottom = settings.content.top + settings.content_area_height();
        let first_body = self
            .constants
            .page1_available(first_top, footer_top)
            .min(content_bottom - first_top);
        let follow_top = self.constants.follow_page_content_top_mm;
        let follow_body = self.constants.follow_available(footer_top);

        (
            SliceRoom::new(first_body, anchor - closing - first_top),
            SliceRoom::new(follow_body, anchor - closing - follow_top),
        )
    }

    /// Flow the body, cut it into page slices and render every page.
    pub fn render(&self, input: &RenderInput) -> RenderedLetter {
        let flow = flow_paragraphs(&input.content.body, &Self::flow_style(input.settings));
        let (first, follow) = self.slice_rooms(input, self.body_top(input, 1));

        let advances: Vec<f64> = flow.lines.iter().map(BodyLine::advance).collect();
        let LineSlices { pagination, lines } = slice_lines(&advances, first, follow);

        let pages = pagination
            .pages
            .iter()
            .zip(lines)
            .map(|(info, on_page)| {
                let slice = on_page
                    .into_iter()
                    .map(|p| SliceLine {
                        y: p.y,
                        line: flow.lines[p.index].clone(),
                    })
                    .collect();
                self.render_page(
                    input,
                    &PageRequest {
                        info: *info,
                        total_pages: pagination.total_pages,
                        body: BodySlot::Slice(slice),
                        closing: pagination.is_last(info.page_number),
                    },
                )
            })
            .collect();

        tracing::debug!(total_pages = pagination.total_pages, body_mm = flow.height_mm, "rendered letter");
        RenderedLetter { pagination, pages }
    }

    /// Render a single page.
    pub fn render_page(&self, input: &RenderInput, request: &PageRequest) -> LayoutPage {
        let settings = input.settings;
        let first = request.info.page_number <= 1;
        let mut elements = Vec::new();

        if first {
            elements.extend(zones::render_header(settings, &input.content.header, input.resolver));
            elements.push(zones::render_address(settings, input.content, input.fields, input.resolver));
            elements.extend(zones::render_info_block(settings, input.content, input.fields, input.resolver));
            elements.extend(body::render_subject_block(
                settings,
                input.content,
                input.fields,
                &self.gaps,
                input.resolver,
            ));
        }

        let body_top = self.body_top(input, request.info.page_number);
        let mut body_bottom = body_top;
        if let BodySlot::Slice(lines) = &request.body {
            let body = body::render_body_slice(settings, &input.content.body_html, &request.info, body_top, lines);
            body_bottom = lines
                .last()
                .map_or(body_top, |l| body_top + l.y + l.line.advance());
            elements.push(body);
        }

        if request.closing {
            let closing = body::render_closing(settings, &input.fields.closing, &self.gaps, body_bottom, input.resolver);
            let anchor = closing
                .as_ref()
                .map(|c| c.y)
                .unwrap_or_else(|| body::closing_anchor_bottom(settings));
            elements.extend(closing);
            elements.extend(zones::render_attachments(settings, input.content, input.fields, anchor, input.resolver));
        }

        elements.extend(footer::render_footer(settings, input.content, input.fields, input.resolver));

        if input.fields.show_pagination {
            elements.push(marks::pagination_mark(settings, request.info.page_number, request.total_pages));
        }
        if settings.fold_hole_marks.is_enabled() {
            elements.extend(marks::fold_hole_marks(settings));
        }

        if input.debug {
            elements.extend(debug::guides(settings, &request.info, body_top, first));
        }

        LayoutPage {
            page_number: request.info.page_number,
            total_pages: request.total_pages,
            width: settings.page_width,
            height: settings.page_height,
            elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::prepare;
    use crate::content::NoStorage;
    use crate::model::{Letter, LetterDocument};
    use crate::style::FontWeight;

    #[test]
    fn text_element_wraps_and_aligns() {
        let style = TextStyle::sized(11.0).aligned(TextAlign::Right);
        let el = text_element(Zone::Body, 20.0, 100.0, Some(30.0), "Antrag auf Akteneinsicht", style);
        let DrawCommand::Text { lines, .. } = &el.draw else {
            panic!("expected text");
        };
        assert!(lines.len() >= 2);
        for line in lines {
            assert!((line.x + line.width - 50.0).abs() < 1e-9);
        }
        assert!((el.height - lines.len() as f64 * 11.0 * 0.3528 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn unwrapped_text_is_as_wide_as_its_longest_line() {
        let style = TextStyle {
            font_weight: FontWeight::Bold,
            ..TextStyle::sized(10.0)
        };
        let el = text_element(Zone::Footer, 0.0, 0.0, None, "kurz\nein wenig länger", style);
        let DrawCommand::Text { lines, .. } = &el.draw else {
            panic!("expected text");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(el.width, lines[1].width);
    }

    #[test]
    fn offset_moves_nested_content() {
        let child = text_element(Zone::Body, 0.0, 10.0, None, "x", TextStyle::default());
        let mut parent = LayoutElement::container(Zone::Body, Rect::new(0.0, 10.0, 50.0, 5.0), vec![child]);
        parent.offset_y(5.0);
        assert_eq!(parent.y, 15.0);
        let DrawCommand::Text { lines, .. } = &parent.children[0].draw else {
            panic!("expected text");
        };
        assert_eq!(lines[0].y, 15.0);
    }

    #[test]
    fn first_slice_stays_inside_the_content_area() {
        let body: String = (0..60).map(|i| format!("<p>Absatz {i}</p>")).collect();
        let mut p = prepare(&LetterDocument {
            letter: Letter {
                subject: Some("Antrag".into()),
                content_html: Some(body),
                ..Default::default()
            },
            ..Default::default()
        });
        p.settings.pagination.top = Some(240.0);
        let content_bottom = p.settings.content.top + p.settings.content_area_height();
        assert!((content_bottom - 240.0).abs() < 1e-9);

        let layout = LetterLayout::new();
        let input = RenderInput::new(&p, &NoStorage);
        let top = layout.body_top(&input, 1);
        let (first, _) = layout.slice_rooms(&input, top);
        assert!((first.body_mm - (content_bottom - top)).abs() < 1e-9);
        assert!(first.body_mm < layout.constants.page1_available(top, p.settings.footer.top));

        let rendered = layout.render(&input);
        assert!(rendered.pagination.total_pages >= 2);
        for line in rendered.pages[0].text_of(Zone::Body) {
            assert!(line.y + line.height <= content_bottom + 1e-6);
        }
    }
}
