//! Page mark ("Seite n von m") and the DIN 5008 fold and hole marks.

use crate::settings::{LetterLayoutSettings, PaginationAlign};
use crate::style::{Color, TextStyle};
use crate::text::metrics::text_width_mm;
use crate::units::{pt_to_mm, Rect};

use super::{text_element, DrawCommand, LayoutElement, Zone};

pub fn page_label(page: usize, total: usize) -> String {
    format!("Seite {page} von {total}")
}

pub fn pagination_mark(settings: &LetterLayoutSettings, page: usize, total: usize) -> LayoutElement {
    let label = page_label(page, total);
    let font_size = settings.pagination.font_size;
    let width = text_width_mm(&label, font_size, false);
    let x = match settings.pagination.align {
        PaginationAlign::Left => settings.margins.left,
        PaginationAlign::Right => settings.page_width - settings.margins.right - width,
    };
    let y = settings.pagination.resolved_top(settings.footer.top);
    text_element(Zone::Pagination, x, y, None, &label, TextStyle::sized(font_size))
}

fn mark(settings: &LetterLayoutSettings, y: f64, width: f64) -> LayoutElement {
    let x = settings.fold_hole_marks.left;
    LayoutElement::new(
        Zone::FoldMarks,
        Rect::new(x, y, width, 0.0),
        DrawCommand::Rule {
            x2: x + width,
            y2: y,
            stroke_width: pt_to_mm(settings.fold_hole_marks.stroke_width_pt),
            color: Color::BLACK,
        },
    )
}

/// Upper fold mark, hole mark, lower fold mark.
pub fn fold_hole_marks(settings: &LetterLayoutSettings) -> Vec<LayoutElement> {
    let m = &settings.fold_hole_marks;
    vec![
        mark(settings, m.top_mark_y, m.fold_mark_width),
        mark(settings, m.hole_mark_y, m.hole_mark_width),
        mark(settings, m.bottom_mark_y, m.fold_mark_width),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_aligned_mark_ends_at_the_margin() {
        let settings = LetterLayoutSettings::default();
        let el = pagination_mark(&settings, 2, 3);
        let DrawCommand::Text { lines, .. } = &el.draw else {
            panic!("expected text");
        };
        assert_eq!(lines[0].text, "Seite 2 von 3");
        assert!((el.x + el.width - 190.0).abs() < 1e-9);
        assert!((el.y - 263.54).abs() < 1e-9);
    }

    #[test]
    fn left_aligned_mark_starts_at_the_margin() {
        let mut settings = LetterLayoutSettings::default();
        settings.pagination.align = PaginationAlign::Left;
        assert_eq!(pagination_mark(&settings, 1, 1).x, 25.0);
    }

    #[test]
    fn din_fold_and_hole_positions() {
        let marks = fold_hole_marks(&LetterLayoutSettings::default());
        let ys: Vec<f64> = marks.iter().map(|m| m.y).collect();
        assert_eq!(ys, vec![105.0, 148.5, 210.0]);
        assert_eq!(marks[1].width, 8.0);
        match marks[0].draw {
            DrawCommand::Rule { x2, stroke_width, .. } => {
                assert_eq!(x2, 8.0);
                assert!((stroke_width - 0.1764).abs() < 1e-9);
            }
            _ => panic!("expected rule"),
        }
    }
}
