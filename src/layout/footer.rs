//! # Footer
//!
//! The template's structured footer columns, else the stored footer zone,
//! else the sender's address as a plain block.

use crate::compose::{BusinessFields, ResolvedContent};
use crate::content::{BlockLine, StorageResolver, ZoneKey};
use crate::model::{FooterBlock, WidthUnit};
use crate::settings::LetterLayoutSettings;
use crate::style::TextStyle;
use crate::units::{cm_to_mm, Rect};

use super::flex::resolve_widths;
use super::zones::{render_block_lines, render_zone, Fallback};
use super::{text_element, LayoutElement, Zone};

pub const FOOTER_FONT_SIZE_PT: f64 = 8.0;
/// Horizontal space between footer columns.
pub const COLUMN_GAP_MM: f64 = 4.0;

/// Requested width of a column in mm, `None` for auto.
fn requested_width(block: &FooterBlock, footer_width: f64) -> Option<f64> {
    let width = block.width.filter(|w| w.is_finite() && *w > 0.0)?;
    Some(match block.width_unit {
        WidthUnit::Cm => cm_to_mm(width),
        WidthUnit::Percent => footer_width * width / 100.0,
    })
}

/// Column rectangles of the structured footer, left to right.
pub fn column_rects(blocks: &[FooterBlock], footer: Rect) -> Vec<Rect> {
    if blocks.is_empty() {
        return Vec::new();
    }
    let gaps = COLUMN_GAP_MM * (blocks.len() - 1) as f64;
    let requested: Vec<Option<f64>> = blocks
        .iter()
        .map(|b| requested_width(b, footer.width))
        .collect();
    let widths = resolve_widths(&requested, footer.width - gaps);

    let mut x = footer.x;
    widths
        .into_iter()
        .map(|width| {
            let rect = Rect::new(x, footer.y, width, footer.height);
            x += width + COLUMN_GAP_MM;
            rect
        })
        .collect()
}

/// One column: bold title, then its lines.
fn render_column(block: &FooterBlock, rect: Rect) -> Vec<LayoutElement> {
    let font_size = block
        .font_size
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(FOOTER_FONT_SIZE_PT);
    let mut out = Vec::new();
    let mut lines_rect = rect;

    if let Some(title) = block.title.as_deref().filter(|t| !t.trim().is_empty()) {
        let el = text_element(
            Zone::Footer,
            rect.x,
            rect.y,
            Some(rect.width),
            title,
            TextStyle::sized(font_size).bold(true),
        );
        lines_rect.y = el.bottom();
        out.push(el);
    }
    out.extend(render_block_lines(Zone::Footer, lines_rect, &block.lines, font_size));
    out
}

pub fn render_footer(
    settings: &LetterLayoutSettings,
    content: &ResolvedContent,
    fields: &BusinessFields,
    resolver: &dyn StorageResolver,
) -> Option<LayoutElement> {
    let rect = settings.footer_rect();

    if !content.footer_blocks.is_empty() {
        let children: Vec<LayoutElement> = content
            .footer_blocks
            .iter()
            .zip(column_rects(&content.footer_blocks, rect))
            .filter(|(_, column)| column.width > 0.0)
            .map(|(block, column)| LayoutElement::container(Zone::Footer, column, render_column(block, column)))
            .collect();
        return Some(LayoutElement::container(Zone::Footer, rect, children));
    }

    let stored = content.zones.get(ZoneKey::Footer);
    if !stored.is_empty() {
        return render_zone(Zone::Footer, rect, stored, Fallback::Nothing, FOOTER_FONT_SIZE_PT, resolver);
    }

    if fields.sender_lines.is_empty() {
        return None;
    }
    let lines: Vec<BlockLine> = fields.sender_lines.iter().map(|l| BlockLine::text(l)).collect();
    let children = render_block_lines(Zone::Footer, rect, &lines, FOOTER_FONT_SIZE_PT);
    Some(LayoutElement::container(Zone::Footer, rect, children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::HeaderContent;
    use crate::content::{BlockContent, NoStorage, ZoneContent};
    use crate::layout::DrawCommand;

    fn block(width: Option<f64>, unit: WidthUnit) -> FooterBlock {
        FooterBlock {
            title: Some("Bankverbindung".into()),
            width,
            width_unit: unit,
            lines: vec![
                BlockLine::label_value("IBAN", "DE00 1234"),
                BlockLine::spacer(2.0),
                BlockLine::text("Sparkasse"),
            ],
            ..Default::default()
        }
    }

    fn content(blocks: Vec<FooterBlock>) -> ResolvedContent {
        ResolvedContent {
            header: HeaderContent::None,
            zones: BlockContent::new(),
            footer_blocks: blocks,
            body: Vec::new(),
            body_html: String::new(),
        }
    }

    #[test]
    fn columns_mix_cm_percent_and_auto() {
        let footer = Rect::new(25.0, 272.0, 165.0, 15.0);
        let blocks = vec![
            block(Some(5.0), WidthUnit::Cm),
            block(Some(20.0), WidthUnit::Percent),
            block(None, WidthUnit::Percent),
        ];
        let rects = column_rects(&blocks, footer);
        assert_eq!(rects[0].width, 50.0);
        assert_eq!(rects[1].width, 33.0);
        assert!((rects[2].width - (165.0 - 8.0 - 83.0)).abs() < 1e-9);
        assert!((rects[1].x - (25.0 + 50.0 + COLUMN_GAP_MM)).abs() < 1e-9);
        assert!((rects[2].right() - footer.right()).abs() < 1e-9);
    }

    #[test]
    fn column_title_comes_first() {
        let settings = LetterLayoutSettings::default();
        let footer = render_footer(
            &settings,
            &content(vec![block(None, WidthUnit::Percent)]),
            &BusinessFields::default(),
            &NoStorage,
        )
        .unwrap();
        let column = &footer.children[0];
        let DrawCommand::Text { lines, style } = &column.children[0].draw else {
            panic!("expected text");
        };
        assert_eq!(lines[0].text, "Bankverbindung");
        assert!(style.font_weight.is_bold());
        assert!(column.children[1].y > column.children[0].y);
    }

    #[test]
    fn zone_then_sender_fallback() {
        let settings = LetterLayoutSettings::default();
        let mut c = content(Vec::new());
        let fields = BusinessFields {
            sender_lines: vec!["Amt für X".into(), "Postfach 99".into()],
            ..Default::default()
        };

        let footer = render_footer(&settings, &c, &fields, &NoStorage).unwrap();
        assert_eq!(footer.children.len(), 2);

        c.zones.set(ZoneKey::Footer, ZoneContent::Lines(vec![BlockLine::text("Vorlage")]));
        let footer = render_footer(&settings, &c, &fields, &NoStorage).unwrap();
        assert_eq!(footer.children.len(), 1);

        assert!(render_footer(&settings, &content(Vec::new()), &BusinessFields::default(), &NoStorage).is_none());
    }
}
