//! Diagnostic guides. Outlines of every zone's exact boundaries, drawn on
//! top of the page in debug mode; they never feed back into placement.

use crate::pagination::PageInfo;
use crate::settings::LetterLayoutSettings;
use crate::style::Color;
use crate::units::Rect;

use super::{DrawCommand, LayoutElement, Zone};

fn guide(label: &str, rect: Rect, color: Color) -> LayoutElement {
    LayoutElement::new(
        Zone::Guide,
        rect,
        DrawCommand::Guide {
            label: label.to_string(),
            color: color.with_alpha(0.6),
        },
    )
}

pub fn guides(settings: &LetterLayoutSettings, page: &PageInfo, body_top: f64, first_page: bool) -> Vec<LayoutElement> {
    let red = Color::rgb(0.86, 0.15, 0.15);
    let blue = Color::rgb(0.15, 0.39, 0.92);
    let green = Color::rgb(0.09, 0.64, 0.29);
    let orange = Color::rgb(0.92, 0.55, 0.05);
    let purple = Color::rgb(0.58, 0.2, 0.92);

    let mut out = vec![guide(
        "margins",
        Rect::new(
            settings.margins.left,
            settings.margins.top,
            settings.content_width(),
            settings.page_height - settings.margins.top - settings.margins.bottom,
        ),
        Color::rgb(0.5, 0.5, 0.5),
    )];

    if first_page {
        let address = &settings.address_field;
        out.push(guide("header", settings.header_rect(), purple));
        out.push(guide("returnAddress", address.return_address_rect(), red));
        out.push(guide("addressField", address.address_zone_rect(), red));
        out.push(guide("infoBlock", settings.info_block.rect(), blue));
        out.push(guide(
            "contentArea",
            Rect::new(
                settings.margins.left,
                settings.content.top,
                settings.content_width(),
                settings.content_area_height(),
            ),
            orange,
        ));
    }

    out.push(guide(
        "body",
        Rect::new(settings.margins.left, body_top, settings.content_width(), page.content_height_mm),
        green,
    ));
    out.push(guide("footer", settings.footer_rect(), purple));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_pages_only_outline_body_and_footer() {
        let settings = LetterLayoutSettings::default();
        let page = PageInfo {
            page_number: 2,
            content_offset_mm: 163.54,
            content_height_mm: 242.0,
        };
        let first = guides(&settings, &page, 98.46, true);
        let follow = guides(&settings, &page, 20.0, false);
        assert!(first.len() > follow.len());
        assert!(follow.iter().all(|g| g.zone == Zone::Guide));
        let body = follow
            .iter()
            .find(|g| matches!(&g.draw, DrawCommand::Guide { label, .. } if label == "body"))
            .unwrap();
        assert_eq!((body.y, body.height), (20.0, 242.0));
    }
}
