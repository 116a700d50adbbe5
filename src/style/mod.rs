//! # Style Primitives
//!
//! The handful of typographic and color values the letter zones need.
//! Stored template data writes these as loose CSS-like strings (`"bold"`,
//! `"#333"`, `"700"`), so deserialization here is forgiving: anything
//! unrecognized falls back to the default instead of failing the template.

use serde::{Deserialize, Deserializer, Serialize};

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Parse `#rgb` / `#rrggbb`. Anything else is black.
    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Color::BLACK;
        }
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        }
    }

    /// Resolve an optional stored color string.
    pub fn from_option(value: Option<&str>) -> Self {
        value
            .filter(|s| !s.trim().is_empty())
            .map(Color::hex)
            .unwrap_or(Color::BLACK)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Font weight, reduced to the two weights a letter actually uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn is_bold(self) -> bool {
        matches!(self, FontWeight::Bold)
    }

    pub fn from_bold(bold: bool) -> Self {
        if bold {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        }
    }

    /// `"bold"`, `"bolder"`, and numeric weights from 600 up are bold.
    fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => {
                let s = s.trim().to_ascii_lowercase();
                if s == "bold" || s == "bolder" {
                    FontWeight::Bold
                } else {
                    s.parse::<f64>()
                        .map(|w| Self::from_bold(w >= 600.0))
                        .unwrap_or_default()
                }
            }
            serde_json::Value::Number(n) => Self::from_bold(n.as_f64().unwrap_or(400.0) >= 600.0),
            serde_json::Value::Bool(b) => Self::from_bold(*b),
            _ => FontWeight::Normal,
        }
    }
}

impl<'de> Deserialize<'de> for FontWeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(FontWeight::from_json(&value))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Italic,
    #[default]
    #[serde(other)]
    Normal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Right,
    Center,
    Justify,
    #[default]
    #[serde(other)]
    Left,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    Underline,
    LineThrough,
    #[default]
    #[serde(other)]
    None,
}

/// Typography for one run of text in the page tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_family: String,
    /// Font size in points.
    pub font_size: f64,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub text_decoration: TextDecoration,
    pub text_align: TextAlign,
    pub color: Color,
    /// Line height as a multiplier of the font size.
    pub line_height: f64,
}

impl TextStyle {
    pub const DEFAULT_FAMILY: &'static str = "Arial";

    pub fn sized(font_size: f64) -> Self {
        Self {
            font_size,
            ..Self::default()
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.font_weight = FontWeight::from_bold(bold);
        self
    }

    pub fn underlined(mut self) -> Self {
        self.text_decoration = TextDecoration::Underline;
        self
    }

    pub fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn aligned(mut self, align: TextAlign) -> Self {
        self.text_align = align;
        self
    }

    /// Height of one line of this style in millimeters.
    pub fn line_height_mm(&self) -> f64 {
        self.font_size * crate::units::MM_PER_PT * self.line_height
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: Self::DEFAULT_FAMILY.to_string(),
            font_size: 11.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            text_decoration: TextDecoration::None,
            text_align: TextAlign::Left,
            color: Color::BLACK,
            line_height: crate::units::LINE_HEIGHT_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_parsing() {
        let c = Color::hex("#ff0000");
        assert!((c.r - 1.0).abs() < 0.001);
        assert!(c.g.abs() < 0.001);

        let short = Color::hex("#0f0");
        assert!((short.g - 1.0).abs() < 0.001);

        assert_eq!(Color::hex("not-a-color"), Color::BLACK);
        assert_eq!(Color::hex("#äöü"), Color::BLACK);
    }

    #[test]
    fn empty_color_string_is_black() {
        assert_eq!(Color::from_option(Some("  ")), Color::BLACK);
        assert_eq!(Color::from_option(None), Color::BLACK);
    }

    #[test]
    fn font_weight_accepts_css_forms() {
        let w: FontWeight = serde_json::from_str("\"bold\"").unwrap();
        assert_eq!(w, FontWeight::Bold);
        let w: FontWeight = serde_json::from_str("700").unwrap();
        assert_eq!(w, FontWeight::Bold);
        let w: FontWeight = serde_json::from_str("\"400\"").unwrap();
        assert_eq!(w, FontWeight::Normal);
        let w: FontWeight = serde_json::from_str("null").unwrap();
        assert_eq!(w, FontWeight::Normal);
    }

    #[test]
    fn unknown_alignment_falls_back_to_left() {
        let a: TextAlign = serde_json::from_str("\"start\"").unwrap();
        assert_eq!(a, TextAlign::Left);
        let d: TextDecoration = serde_json::from_str("\"line-through\"").unwrap();
        assert_eq!(d, TextDecoration::LineThrough);
    }

    #[test]
    fn eleven_point_text_line_height() {
        let style = TextStyle::sized(11.0);
        assert!((style.line_height_mm() - 4.657).abs() < 0.001);
    }
}
