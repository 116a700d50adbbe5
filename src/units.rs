//! # Units and Geometry
//!
//! The whole engine works in millimeters with the origin at the top-left
//! corner of the sheet. Typography arrives in points, screen previews want
//! CSS pixels; the conversions live here so every zone agrees on them.

use serde::{Deserialize, Serialize};

/// A4 sheet width.
pub const A4_WIDTH_MM: f64 = 210.0;
/// A4 sheet height.
pub const A4_HEIGHT_MM: f64 = 297.0;

/// Millimeters per typographic point, rounded the way print CSS does.
pub const MM_PER_PT: f64 = 0.3528;
pub const MM_PER_INCH: f64 = 25.4;
/// CSS reference pixel density.
pub const CSS_PX_PER_INCH: f64 = 96.0;
/// Line height multiplier used by the editor and the print pipeline.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

pub fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_PT
}

pub fn mm_to_pt(mm: f64) -> f64 {
    mm / MM_PER_PT
}

pub fn cm_to_mm(cm: f64) -> f64 {
    cm * 10.0
}

/// Convert millimeters to device pixels at `dpi`.
pub fn mm_to_px(mm: f64, dpi: f64) -> f64 {
    mm / MM_PER_INCH * dpi
}

/// Convert device pixels at `dpi` back to millimeters.
pub fn px_to_mm(px: f64, dpi: f64) -> f64 {
    if dpi <= 0.0 {
        return 0.0;
    }
    px / dpi * MM_PER_INCH
}

/// Height of one text line in mm for a font size in points.
///
/// 11pt gives 4.657mm, which is why the fixed blank lines of the letter body
/// are 4.5mm and 9mm.
pub fn line_height_mm(font_size_pt: f64) -> f64 {
    font_size_pt * MM_PER_PT * LINE_HEIGHT_FACTOR
}

/// Replace NaN/infinite values with `fallback`.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// An axis-aligned rectangle in millimeters, origin top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// The same rectangle moved down by `dy`.
    pub fn offset_y(&self, dy: f64) -> Self {
        Self {
            y: self.y + dy,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_millimeter_roundtrip() {
        assert!((mm_to_pt(pt_to_mm(11.0)) - 11.0).abs() < 1e-9);
        assert!((pt_to_mm(72.0) - 25.4016).abs() < 1e-9);
    }

    #[test]
    fn a4_width_in_css_pixels() {
        assert!((mm_to_px(A4_WIDTH_MM, CSS_PX_PER_INCH) - 793.7).abs() < 0.1);
        assert!((px_to_mm(mm_to_px(42.0, 150.0), 150.0) - 42.0).abs() < 1e-9);
        assert_eq!(px_to_mm(10.0, 0.0), 0.0);
    }

    #[test]
    fn eleven_point_line_height() {
        let lh = line_height_mm(11.0);
        assert!((lh - 4.657).abs() < 0.001);
    }

    #[test]
    fn finite_or_replaces_nan() {
        assert_eq!(finite_or(f64::NAN, 3.0), 3.0);
        assert_eq!(finite_or(f64::INFINITY, 3.0), 3.0);
        assert_eq!(finite_or(2.5, 3.0), 2.5);
    }

    #[test]
    fn rect_edges() {
        let r = Rect::new(20.0, 45.0, 85.0, 45.0);
        assert_eq!(r.right(), 105.0);
        assert_eq!(r.bottom(), 90.0);
        assert_eq!(r.offset_y(5.0).y, 50.0);
    }
}
