//! # Zones
//!
//! The fixed-position zones: letterhead, address window, information block
//! and the attachment note. Each zone resolves its content with one match:
//! stored lines, else stored canvas elements, else a fallback built from
//! the business fields, else nothing.

use crate::compose::{BusinessFields, HeaderContent, ResolvedContent};
use crate::content::{BlockLine, HeaderElement, PrefixShape, StorageResolver, ZoneContent, ZoneKey};
use crate::settings::LetterLayoutSettings;
use crate::style::{Color, TextStyle};
use crate::text::metrics::text_width_mm;
use crate::units::{finite_or, Rect, LINE_HEIGHT_FACTOR, MM_PER_PT};

use super::{text_element, DrawCommand, LayoutElement, Zone};

/// DIN 5008 return address: small enough to fit the window above the address.
pub const RETURN_ADDRESS_FONT_SIZE_PT: f64 = 8.0;
pub const ADDRESS_FONT_SIZE_PT: f64 = 10.0;
pub const INFO_BLOCK_FONT_SIZE_PT: f64 = 9.0;
/// Default size of canvas text without its own font size.
pub const CANVAS_FONT_SIZE_PT: f64 = 10.0;
/// Space between the label column and the values.
pub const LABEL_GAP_MM: f64 = 2.0;
const PREFIX_GAP_MM: f64 = 1.5;

/// What a zone shows when it has no stored content.
#[derive(Debug, Clone, Copy)]
pub enum Fallback<'a> {
    Lines(&'a [String]),
    Rows(&'a [(String, String)]),
    Nothing,
}

/// Render a zone into `rect`. `None` when the zone ends up empty.
pub fn render_zone(
    zone: Zone,
    rect: Rect,
    content: &ZoneContent,
    fallback: Fallback,
    font_size: f64,
    resolver: &dyn StorageResolver,
) -> Option<LayoutElement> {
    let children = match content {
        ZoneContent::Lines(lines) => render_block_lines(zone, rect, lines, font_size),
        ZoneContent::Canvas(elements) => render_canvas(zone, (rect.x, rect.y), elements, font_size, resolver),
        ZoneContent::Empty => match fallback {
            Fallback::Lines(lines) => plain_lines(zone, rect, lines, font_size),
            Fallback::Rows(rows) => {
                let lines: Vec<BlockLine> = rows
                    .iter()
                    .map(|(label, value)| BlockLine::label_value(label, value))
                    .collect();
                render_block_lines(zone, rect, &lines, font_size)
            }
            Fallback::Nothing => Vec::new(),
        },
    };
    if children.is_empty() {
        None
    } else {
        Some(LayoutElement::container(zone, rect, children))
    }
}

/// Width of the label column: the widest label plus a gap, at most half
/// the zone.
pub fn label_column_width(lines: &[BlockLine], default_font_size: f64, zone_width: f64) -> f64 {
    let widest = lines
        .iter()
        .filter_map(|line| match line {
            BlockLine::LabelValue(l) if !l.label.is_empty() => Some(text_width_mm(
                &l.label,
                l.font_size.unwrap_or(default_font_size),
                l.label_bold,
            )),
            _ => None,
        })
        .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))));
    match widest {
        Some(w) => (w + LABEL_GAP_MM).min(zone_width / 2.0),
        None => 0.0,
    }
}

/// Stack line-mode content top to bottom inside `rect`.
pub fn render_block_lines(zone: Zone, rect: Rect, lines: &[BlockLine], default_font_size: f64) -> Vec<LayoutElement> {
    let label_width = label_column_width(lines, default_font_size, rect.width);
    let mut out = Vec::new();
    let mut y = rect.y;

    for line in lines {
        match line {
            BlockLine::Spacer(spacer) => y += spacer.height_mm(),
            BlockLine::LabelValue(l) => {
                let size = l.font_size.filter(|s| *s > 0.0).unwrap_or(default_font_size);
                let color = Color::from_option(l.color.as_deref());
                let label_style = TextStyle::sized(size).bold(l.label_bold).colored(color);
                let value_style = TextStyle::sized(size).bold(l.value_bold).colored(color);
                let mut height = label_style.line_height_mm();

                let value_x = if l.label.is_empty() {
                    rect.x
                } else {
                    let label = text_element(zone, rect.x, y, Some(label_width), &l.label, label_style);
                    height = height.max(label.height);
                    out.push(label);
                    rect.x + label_width
                };
                if !l.value.is_empty() {
                    let value = text_element(zone, value_x, y, Some(rect.right() - value_x), &l.value, value_style);
                    height = height.max(value.height);
                    out.push(value);
                }
                y += height;
            }
            BlockLine::TextOnly(t) => {
                let size = t.font_size.filter(|s| *s > 0.0).unwrap_or(default_font_size);
                let color = Color::from_option(t.color.as_deref());
                let style = TextStyle::sized(size).bold(t.value_bold).colored(color);
                let mut x = rect.x;
                if let Some(glyph) = prefix_glyph(zone, t.prefix_shape, None, x, y, size, color) {
                    x = glyph.x + glyph.width + PREFIX_GAP_MM;
                    out.push(glyph);
                }
                let text = text_element(zone, x, y, Some(rect.right() - x), &t.value, style);
                y += text.height;
                out.push(text);
            }
        }
    }
    out
}

/// One text element per fallback line. Blank lines keep their height.
fn plain_lines(zone: Zone, rect: Rect, lines: &[String], font_size: f64) -> Vec<LayoutElement> {
    let style = TextStyle::sized(font_size);
    let mut out = Vec::new();
    let mut y = rect.y;
    for line in lines {
        if line.trim().is_empty() {
            y += style.line_height_mm();
            continue;
        }
        let el = text_element(zone, rect.x, y, Some(rect.width), line, style.clone());
        y += el.height;
        out.push(el);
    }
    out
}

/// Render canvas elements offset by `origin`. Text without a width is not
/// wrapped; images without a resolvable URL or a usable size are skipped.
pub fn render_canvas(
    zone: Zone,
    origin: (f64, f64),
    elements: &[HeaderElement],
    default_font_size: f64,
    resolver: &dyn StorageResolver,
) -> Vec<LayoutElement> {
    let mut out = Vec::new();
    for element in elements {
        let (dx, dy) = element.position();
        let (x, y) = (origin.0 + dx, origin.1 + dy);
        match element {
            HeaderElement::Text(t) => {
                if t.content.is_empty() {
                    continue;
                }
                let style = TextStyle {
                    font_family: t
                        .font_family
                        .clone()
                        .unwrap_or_else(|| TextStyle::DEFAULT_FAMILY.to_string()),
                    font_size: t
                        .font_size
                        .filter(|s| s.is_finite() && *s > 0.0)
                        .unwrap_or(default_font_size),
                    font_weight: t.font_weight,
                    font_style: t.font_style,
                    text_decoration: t.text_decoration,
                    text_align: t.text_align,
                    color: Color::from_option(t.color.as_deref()),
                    line_height: t
                        .text_line_height
                        .filter(|h| h.is_finite() && *h > 0.0)
                        .unwrap_or(LINE_HEIGHT_FACTOR),
                };
                out.push(text_element(zone, x, y, t.width, &t.content, style));
            }
            HeaderElement::Image(image) => {
                let width = finite_or(image.width, 0.0);
                let height = finite_or(image.height, 0.0);
                if width <= 0.0 || height <= 0.0 {
                    tracing::debug!(?zone, "skipping image without size");
                    continue;
                }
                match image.resolve_url(resolver) {
                    Some(url) => out.push(LayoutElement::new(
                        zone,
                        Rect::new(x, y, width, height),
                        DrawCommand::Image { url },
                    )),
                    None => tracing::debug!(?zone, path = ?image.storage_path, "image has no public URL"),
                }
            }
        }
    }
    out
}

/// A prefix glyph vertically centered on a text line starting at `(x, y)`.
/// `Custom` needs SVG markup and is skipped without it.
pub(crate) fn prefix_glyph(
    zone: Zone,
    shape: PrefixShape,
    svg: Option<&str>,
    x: f64,
    y: f64,
    font_size: f64,
    color: Color,
) -> Option<LayoutElement> {
    let size = font_size * MM_PER_PT * 0.5;
    let line_height = font_size * MM_PER_PT * LINE_HEIGHT_FACTOR;
    let width = match shape {
        PrefixShape::None => return None,
        PrefixShape::Custom if svg.is_none() => return None,
        PrefixShape::Line => size * 2.0,
        PrefixShape::Circle | PrefixShape::Rectangle | PrefixShape::Custom => size,
    };
    Some(LayoutElement::new(
        zone,
        Rect::new(x, y + (line_height - size) / 2.0, width, size),
        DrawCommand::Shape {
            shape,
            svg: svg.map(str::to_string),
            color,
        },
    ))
}

/// Index of the last line with visible text.
pub fn last_non_empty(lines: &[String]) -> Option<usize> {
    lines.iter().rposition(|l| !l.trim().is_empty())
}

/// Fallback return address: small type, bottom-aligned in its zone, with
/// only the last non-empty line underlined.
pub fn return_address_fallback(rect: Rect, lines: &[String]) -> Option<LayoutElement> {
    let underline_at = last_non_empty(lines)?;
    let style = TextStyle::sized(RETURN_ADDRESS_FONT_SIZE_PT);
    let mut children = Vec::new();
    let mut y = rect.y;
    for (i, line) in lines.iter().enumerate().take(underline_at + 1) {
        if line.trim().is_empty() {
            y += style.line_height_mm();
            continue;
        }
        let line_style = if i == underline_at {
            style.clone().underlined()
        } else {
            style.clone()
        };
        let el = text_element(Zone::ReturnAddress, rect.x, y, Some(rect.width), line, line_style);
        y += el.height;
        children.push(el);
    }

    let slack = (rect.bottom() - y).max(0.0);
    for child in &mut children {
        child.offset_y(slack);
    }
    Some(LayoutElement::container(Zone::ReturnAddress, rect, children))
}

/// The letterhead: positioned elements in page millimeters, or markup
/// filling the header zone.
pub fn render_header(
    settings: &LetterLayoutSettings,
    header: &HeaderContent,
    resolver: &dyn StorageResolver,
) -> Option<LayoutElement> {
    let rect = settings.header_rect();
    match header {
        HeaderContent::Elements(elements) => {
            let children = render_canvas(Zone::Header, (0.0, 0.0), elements, CANVAS_FONT_SIZE_PT, resolver);
            (!children.is_empty()).then(|| LayoutElement::container(Zone::Header, rect, children))
        }
        HeaderContent::Markup { html, css } => Some(LayoutElement::new(
            Zone::Header,
            rect,
            DrawCommand::Markup {
                html: html.clone(),
                css: css.clone(),
                offset_y: 0.0,
            },
        )),
        HeaderContent::None => None,
    }
}

/// The address window: return address stacked above the recipient.
pub fn render_address(
    settings: &LetterLayoutSettings,
    content: &ResolvedContent,
    fields: &BusinessFields,
    resolver: &dyn StorageResolver,
) -> LayoutElement {
    let field = &settings.address_field;
    let return_rect = field.return_address_rect();
    let return_address = match content.zones.get(ZoneKey::ReturnAddress) {
        ZoneContent::Empty => return_address_fallback(return_rect, &fields.return_address),
        stored => render_zone(
            Zone::ReturnAddress,
            return_rect,
            stored,
            Fallback::Nothing,
            RETURN_ADDRESS_FONT_SIZE_PT,
            resolver,
        ),
    };
    let recipient = render_zone(
        Zone::AddressField,
        field.address_zone_rect(),
        content.zones.get(ZoneKey::AddressField),
        Fallback::Lines(&fields.recipient_address),
        ADDRESS_FONT_SIZE_PT,
        resolver,
    );

    let children = return_address.into_iter().chain(recipient).collect();
    LayoutElement::container(Zone::AddressField, field.rect(), children)
}

pub fn render_info_block(
    settings: &LetterLayoutSettings,
    content: &ResolvedContent,
    fields: &BusinessFields,
    resolver: &dyn StorageResolver,
) -> Option<LayoutElement> {
    render_zone(
        Zone::InfoBlock,
        settings.info_block.rect(),
        content.zones.get(ZoneKey::InfoBlock),
        Fallback::Rows(&fields.info_rows),
        INFO_BLOCK_FONT_SIZE_PT,
        resolver,
    )
}

/// The attachment note, from the information block's left edge down from
/// `top`. Drawn only when the letter has attachments.
pub fn render_attachments(
    settings: &LetterLayoutSettings,
    content: &ResolvedContent,
    fields: &BusinessFields,
    top: f64,
    resolver: &dyn StorageResolver,
) -> Option<LayoutElement> {
    if fields.attachments.is_empty() {
        return None;
    }
    let x = settings.info_block.left;
    let width = (settings.page_width - settings.margins.right - x).max(0.0);
    let bottom = settings.footer.top - settings.pagination_reserve();
    let rect = Rect::new(x, top, width, (bottom - top).max(0.0));

    let lines: Vec<String> = fields.attachments.iter().map(|a| format!("- {a}")).collect();
    let mut element = render_zone(
        Zone::Attachments,
        rect,
        content.zones.get(ZoneKey::Attachments),
        Fallback::Lines(&lines),
        settings.closing.font_size,
        resolver,
    )?;
    let used = element
        .children
        .iter()
        .map(LayoutElement::bottom)
        .fold(top, f64::max);
    element.height = used - top;
    Some(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ImageElement, NoStorage, TextElement};
    use crate::layout::TextLine;
    use crate::style::TextDecoration;

    fn lines_of(el: &LayoutElement) -> Vec<&TextLine> {
        el.children
            .iter()
            .flat_map(|c| match &c.draw {
                DrawCommand::Text { lines, .. } => lines.iter().collect(),
                _ => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn only_last_non_empty_return_line_is_underlined() {
        let lines: Vec<String> = vec!["Amt für X".into(), "".into(), "Postfach 99".into()];
        let el = return_address_fallback(Rect::new(25.0, 45.0, 85.0, 17.7), &lines).unwrap();
        let text = lines_of(&el);
        assert_eq!(text.len(), 2);
        assert!(!text[0].underline);
        assert_eq!(text[1].text, "Postfach 99");
        assert!(text[1].underline);
    }

    #[test]
    fn trailing_blank_lines_do_not_take_the_underline() {
        let lines: Vec<String> = vec!["Amt für X".into(), "Postfach 99".into(), "  ".into()];
        assert_eq!(last_non_empty(&lines), Some(1));
        assert_eq!(last_non_empty(&["".to_string()]), None);
    }

    #[test]
    fn return_address_sits_at_the_bottom_of_its_zone() {
        let rect = Rect::new(25.0, 45.0, 85.0, 17.7);
        let el = return_address_fallback(rect, &["Amt für X · Postfach 99".to_string()]).unwrap();
        let bottom = el.children.iter().map(LayoutElement::bottom).fold(0.0, f64::max);
        assert!((bottom - rect.bottom()).abs() < 1e-9);
    }

    #[test]
    fn label_values_share_one_value_column() {
        let lines = vec![
            BlockLine::label_value("Datum", "02.05.2024"),
            BlockLine::spacer(3.0),
            BlockLine::label_value("Unser Zeichen", "Az. 17"),
        ];
        let rect = Rect::new(125.0, 50.0, 75.0, 40.0);
        let children = render_block_lines(Zone::InfoBlock, rect, &lines, 9.0);
        assert_eq!(children.len(), 4);
        assert_eq!(children[1].x, children[3].x);
        let expected = text_width_mm("Unser Zeichen", 9.0, false) + LABEL_GAP_MM;
        assert!((children[1].x - (125.0 + expected)).abs() < 1e-9);
        let line = 9.0 * MM_PER_PT * LINE_HEIGHT_FACTOR;
        assert!((children[2].y - (50.0 + line + 3.0)).abs() < 1e-9);
    }

    #[test]
    fn zone_content_wins_over_fallback() {
        let rect = Rect::new(25.0, 62.7, 85.0, 27.3);
        let stored = ZoneContent::Lines(vec![BlockLine::text("Stadt Musterhausen")]);
        let fallback = vec!["Herbert Klein".to_string()];
        let el = render_zone(Zone::AddressField, rect, &stored, Fallback::Lines(&fallback), 10.0, &NoStorage).unwrap();
        assert_eq!(lines_of(&el)[0].text, "Stadt Musterhausen");

        let el = render_zone(Zone::AddressField, rect, &ZoneContent::Empty, Fallback::Lines(&fallback), 10.0, &NoStorage)
            .unwrap();
        assert_eq!(lines_of(&el)[0].text, "Herbert Klein");

        assert!(render_zone(Zone::AddressField, rect, &ZoneContent::Empty, Fallback::Nothing, 10.0, &NoStorage).is_none());
    }

    #[test]
    fn canvas_is_zone_local_and_images_need_urls() {
        let elements = vec![
            HeaderElement::Text(TextElement {
                text_decoration: TextDecoration::Underline,
                ..TextElement::at(2.0, 3.0, "Bürgeramt")
            }),
            HeaderElement::Image(ImageElement {
                x: 40.0,
                y: 0.0,
                width: 20.0,
                height: 10.0,
                storage_path: Some("wappen.png".into()),
                ..Default::default()
            }),
        ];
        let without = render_canvas(Zone::InfoBlock, (125.0, 50.0), &elements, 10.0, &NoStorage);
        assert_eq!(without.len(), 1);
        assert_eq!((without[0].x, without[0].y), (127.0, 53.0));

        let resolver = |p: &str| format!("https://cdn.test/{p}");
        let with = render_canvas(Zone::InfoBlock, (125.0, 50.0), &elements, 10.0, &resolver);
        assert_eq!(with.len(), 2);
        match &with[1].draw {
            DrawCommand::Image { url } => assert_eq!(url, "https://cdn.test/wappen.png"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn prefix_glyph_shifts_text() {
        let mut line = crate::content::TextOnlyLine {
            value: "Hinweis".into(),
            prefix_shape: PrefixShape::Circle,
            ..Default::default()
        };
        let rect = Rect::new(0.0, 0.0, 80.0, 20.0);
        let children = render_block_lines(Zone::Attachments, rect, &[BlockLine::TextOnly(line.clone())], 10.0);
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0].draw, DrawCommand::Shape { .. }));
        assert!(children[1].x > 0.0);

        line.prefix_shape = PrefixShape::Custom;
        let children = render_block_lines(Zone::Attachments, rect, &[BlockLine::TextOnly(line)], 10.0);
        assert_eq!(children.len(), 1);
    }
}
