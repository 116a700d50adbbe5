//! # Layout Settings
//!
//! The DIN 5008 geometry of a letter template, in millimeters from the
//! top-left corner of an A4 sheet (typography in points).
//!
//! Templates are stored as loose camelCase JSON that has been written by
//! several editor generations. Every field is optional in storage and falls
//! back to the DIN 5008 Form B value. [`LetterLayoutSettings::enforce_din5008_metrics`]
//! then pins the positions the standard mandates, so a stale or hand-edited
//! template can never move the subject line or the footer.

use serde::{Deserialize, Serialize};

use crate::content::{BlockContent, PrefixShape};
use crate::lenient;
use crate::style::FontWeight;
use crate::units::{finite_or, Rect, A4_HEIGHT_MM, A4_WIDTH_MM};

/// Where the subject line and the body start (DIN 5008 Form B).
pub const DIN_CONTENT_TOP_MM: f64 = 98.46;
/// Maximum height of the first-page content area.
pub const DIN_CONTENT_MAX_HEIGHT_MM: f64 = 165.0;
/// Top edge of the footer zone.
pub const DIN_FOOTER_TOP_MM: f64 = 272.0;
pub const DIN_RETURN_ADDRESS_HEIGHT_MM: f64 = 17.7;
pub const DIN_ADDRESS_ZONE_HEIGHT_MM: f64 = 27.3;
/// One 12pt line; the pagination mark sits two of these above the footer.
pub const PAGINATION_LINE_MM: f64 = 4.23;

/// Complete geometry descriptor of a letter template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LetterLayoutSettings {
    #[serde(deserialize_with = "lenient::mm")]
    pub page_width: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub page_height: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub margins: Margins,
    #[serde(deserialize_with = "lenient::or_default")]
    pub header: HeaderSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub address_field: AddressFieldSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub info_block: InfoBlockSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub subject: SubjectSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub content: ContentSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub footer: FooterSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub pagination: PaginationSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub fold_hole_marks: FoldHoleMarkSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub closing: ClosingSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub salutation: SalutationSettings,
    pub block_content: BlockContent,
}

impl Default for LetterLayoutSettings {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_MM,
            page_height: A4_HEIGHT_MM,
            margins: Margins::default(),
            header: HeaderSettings::default(),
            address_field: AddressFieldSettings::default(),
            info_block: InfoBlockSettings::default(),
            subject: SubjectSettings::default(),
            content: ContentSettings::default(),
            footer: FooterSettings::default(),
            pagination: PaginationSettings::default(),
            fold_hole_marks: FoldHoleMarkSettings::default(),
            closing: ClosingSettings::default(),
            salutation: SalutationSettings::default(),
            block_content: BlockContent::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    #[serde(deserialize_with = "lenient::mm")]
    pub top: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub right: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub bottom: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 10.0,
            right: 20.0,
            bottom: 10.0,
            left: 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderSettings {
    #[serde(deserialize_with = "lenient::mm")]
    pub height: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub margin_bottom: f64,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            height: 35.0,
            margin_bottom: 0.0,
        }
    }
}

/// Address window: return-address zone stacked above the recipient zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressFieldSettings {
    #[serde(deserialize_with = "lenient::mm")]
    pub top: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub left: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub width: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub height: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub return_address_height: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub address_zone_height: f64,
}

impl Default for AddressFieldSettings {
    fn default() -> Self {
        Self {
            top: 45.0,
            left: 25.0,
            width: 85.0,
            height: DIN_RETURN_ADDRESS_HEIGHT_MM + DIN_ADDRESS_ZONE_HEIGHT_MM,
            return_address_height: DIN_RETURN_ADDRESS_HEIGHT_MM,
            address_zone_height: DIN_ADDRESS_ZONE_HEIGHT_MM,
        }
    }
}

impl AddressFieldSettings {
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    pub fn return_address_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.return_address_height)
    }

    pub fn address_zone_rect(&self) -> Rect {
        Rect::new(
            self.left,
            self.top + self.return_address_height,
            self.width,
            self.address_zone_height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoBlockSettings {
    #[serde(deserialize_with = "lenient::mm")]
    pub top: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub left: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub width: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub height: f64,
}

impl Default for InfoBlockSettings {
    fn default() -> Self {
        Self {
            top: 50.0,
            left: 125.0,
            width: 75.0,
            height: 40.0,
        }
    }
}

impl InfoBlockSettings {
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectSettings {
    #[serde(deserialize_with = "lenient::mm")]
    pub top: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub margin_bottom: f64,
    /// Points.
    #[serde(deserialize_with = "lenient::mm")]
    pub font_size: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub font_weight: FontWeight,
    /// `None` means integrated, the DIN 5008 default.
    #[serde(deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub integrated: Option<bool>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub prefix_shape: PrefixShape,
    /// SVG markup drawn when `prefix_shape` is `custom`.
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub prefix_svg: Option<String>,
}

impl Default for SubjectSettings {
    fn default() -> Self {
        Self {
            top: DIN_CONTENT_TOP_MM,
            margin_bottom: 8.46,
            font_size: 11.0,
            font_weight: FontWeight::Bold,
            integrated: None,
            prefix_shape: PrefixShape::None,
            prefix_svg: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentSettings {
    #[serde(deserialize_with = "lenient::mm")]
    pub top: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub max_height: f64,
    /// Multiplier of the font size.
    #[serde(deserialize_with = "lenient::mm")]
    pub line_height: f64,
    /// Points.
    #[serde(deserialize_with = "lenient::mm")]
    pub font_size: f64,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            top: DIN_CONTENT_TOP_MM,
            max_height: DIN_CONTENT_MAX_HEIGHT_MM,
            line_height: crate::units::LINE_HEIGHT_FACTOR,
            font_size: 11.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterSettings {
    #[serde(deserialize_with = "lenient::mm")]
    pub top: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub height: f64,
}

impl Default for FooterSettings {
    fn default() -> Self {
        Self {
            top: DIN_FOOTER_TOP_MM,
            height: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationAlign {
    Left,
    #[default]
    #[serde(other)]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationSettings {
    #[serde(deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "lenient::opt_mm", skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub align: PaginationAlign,
    #[serde(deserialize_with = "lenient::mm")]
    pub font_size: f64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            enabled: None,
            top: None,
            align: PaginationAlign::Right,
            font_size: 8.0,
        }
    }
}

impl PaginationSettings {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Stored top, or two 12pt lines above the footer.
    pub fn resolved_top(&self, footer_top: f64) -> f64 {
        self.top
            .unwrap_or(footer_top - PAGINATION_LINE_MM - PAGINATION_LINE_MM)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FoldHoleMarkSettings {
    #[serde(deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Distance of the marks from the left sheet edge.
    #[serde(deserialize_with = "lenient::mm")]
    pub left: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub stroke_width_pt: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub fold_mark_width: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub hole_mark_width: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub top_mark_y: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub hole_mark_y: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub bottom_mark_y: f64,
}

impl Default for FoldHoleMarkSettings {
    fn default() -> Self {
        Self {
            enabled: None,
            left: 3.0,
            stroke_width_pt: 0.5,
            fold_mark_width: 5.0,
            hole_mark_width: 8.0,
            top_mark_y: 105.0,
            hole_mark_y: 148.5,
            bottom_mark_y: 210.0,
        }
    }
}

impl FoldHoleMarkSettings {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClosingSettings {
    #[serde(deserialize_with = "lenient::string")]
    pub formula: String,
    #[serde(deserialize_with = "lenient::string")]
    pub signature_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub signature_title: String,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub signature_image_path: Option<String>,
    #[serde(deserialize_with = "lenient::mm")]
    pub font_size: f64,
}

impl Default for ClosingSettings {
    fn default() -> Self {
        Self {
            formula: "Mit freundlichen Grüßen".to_string(),
            signature_name: String::new(),
            signature_title: String::new(),
            signature_image_path: None,
            font_size: 11.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalutationSettings {
    /// Literal text, or [`SALUTATION_AUTO`] to derive it from the recipient.
    #[serde(deserialize_with = "lenient::string")]
    pub template: String,
    #[serde(deserialize_with = "lenient::mm")]
    pub font_size: f64,
}

/// Salutation template sentinel: derive from recipient gender and name.
pub const SALUTATION_AUTO: &str = "{{anrede}}";

impl Default for SalutationSettings {
    fn default() -> Self {
        Self {
            template: SALUTATION_AUTO.to_string(),
            font_size: 11.0,
        }
    }
}

impl SalutationSettings {
    pub fn is_auto(&self) -> bool {
        let t = self.template.trim();
        t.is_empty() || t == SALUTATION_AUTO
    }
}

/// How subject, salutation and body relate on page one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubjectLayout {
    /// Subject, salutation and body flow as one block from `content.top`.
    Integrated,
    /// Subject is its own absolutely positioned block; the body starts
    /// `margin_bottom` below it.
    Legacy { top: f64, margin_bottom: f64 },
}

impl LetterLayoutSettings {
    /// Pin the metrics DIN 5008 mandates and replace malformed numbers with
    /// their defaults. Idempotent.
    pub fn enforce_din5008_metrics(&self) -> Self {
        let mut s = self.sanitized();

        pin(&mut s.page_width, A4_WIDTH_MM, "pageWidth");
        pin(&mut s.page_height, A4_HEIGHT_MM, "pageHeight");
        pin(&mut s.footer.top, DIN_FOOTER_TOP_MM, "footer.top");
        pin(&mut s.subject.top, DIN_CONTENT_TOP_MM, "subject.top");
        pin(&mut s.content.top, DIN_CONTENT_TOP_MM, "content.top");
        pin(
            &mut s.content.max_height,
            DIN_CONTENT_MAX_HEIGHT_MM,
            "content.maxHeight",
        );
        pin(
            &mut s.address_field.return_address_height,
            DIN_RETURN_ADDRESS_HEIGHT_MM,
            "addressField.returnAddressHeight",
        );
        pin(
            &mut s.address_field.address_zone_height,
            DIN_ADDRESS_ZONE_HEIGHT_MM,
            "addressField.addressZoneHeight",
        );
        pin(
            &mut s.address_field.height,
            DIN_RETURN_ADDRESS_HEIGHT_MM + DIN_ADDRESS_ZONE_HEIGHT_MM,
            "addressField.height",
        );
        if s.pagination.enabled.is_none() {
            s.pagination.enabled = Some(true);
        }
        s
    }

    /// Replace every non-finite or non-positive size with its default.
    fn sanitized(&self) -> Self {
        let d = Self::default();
        let mut s = self.clone();

        fix(&mut s.page_width, d.page_width);
        fix(&mut s.page_height, d.page_height);

        fix(&mut s.margins.top, d.margins.top);
        fix(&mut s.margins.right, d.margins.right);
        fix(&mut s.margins.bottom, d.margins.bottom);
        fix(&mut s.margins.left, d.margins.left);

        fix(&mut s.header.height, d.header.height);
        fix(&mut s.header.margin_bottom, d.header.margin_bottom);

        fix(&mut s.address_field.top, d.address_field.top);
        fix(&mut s.address_field.left, d.address_field.left);
        fix_size(&mut s.address_field.width, d.address_field.width);
        fix_size(&mut s.address_field.height, d.address_field.height);

        fix(&mut s.info_block.top, d.info_block.top);
        fix(&mut s.info_block.left, d.info_block.left);
        fix_size(&mut s.info_block.width, d.info_block.width);
        fix_size(&mut s.info_block.height, d.info_block.height);

        fix(&mut s.subject.top, d.subject.top);
        fix(&mut s.subject.margin_bottom, d.subject.margin_bottom);
        fix_size(&mut s.subject.font_size, d.subject.font_size);

        fix(&mut s.content.top, d.content.top);
        fix_size(&mut s.content.max_height, d.content.max_height);
        fix_size(&mut s.content.line_height, d.content.line_height);
        fix_size(&mut s.content.font_size, d.content.font_size);

        fix(&mut s.footer.top, d.footer.top);
        fix(&mut s.footer.height, d.footer.height);

        fix_size(&mut s.pagination.font_size, d.pagination.font_size);

        let marks = &mut s.fold_hole_marks;
        fix(&mut marks.left, d.fold_hole_marks.left);
        fix_size(&mut marks.stroke_width_pt, d.fold_hole_marks.stroke_width_pt);
        fix(&mut marks.fold_mark_width, d.fold_hole_marks.fold_mark_width);
        fix(&mut marks.hole_mark_width, d.fold_hole_marks.hole_mark_width);
        fix(&mut marks.top_mark_y, d.fold_hole_marks.top_mark_y);
        fix(&mut marks.hole_mark_y, d.fold_hole_marks.hole_mark_y);
        fix(&mut marks.bottom_mark_y, d.fold_hole_marks.bottom_mark_y);

        fix_size(&mut s.closing.font_size, d.closing.font_size);
        fix_size(&mut s.salutation.font_size, d.salutation.font_size);

        s
    }

    pub fn subject_layout(&self) -> SubjectLayout {
        if self.subject.integrated.unwrap_or(true) {
            SubjectLayout::Integrated
        } else {
            SubjectLayout::Legacy {
                top: self.subject.top,
                margin_bottom: self.subject.margin_bottom,
            }
        }
    }

    /// Width available to body text between the side margins.
    pub fn content_width(&self) -> f64 {
        (self.page_width - self.margins.left - self.margins.right).max(0.0)
    }

    /// Vertical room between the pagination mark and the footer.
    pub fn pagination_reserve(&self) -> f64 {
        (self.footer.top - self.pagination.resolved_top(self.footer.top)).max(0.0)
    }

    /// Height of the first-page content area.
    pub fn content_area_height(&self) -> f64 {
        if self.pagination.is_enabled() {
            let available = self.footer.top - self.pagination_reserve() - self.content.top;
            DIN_CONTENT_MAX_HEIGHT_MM.min(available).max(0.0)
        } else {
            DIN_CONTENT_MAX_HEIGHT_MM
        }
    }

    /// Letterhead zone between the side margins.
    pub fn header_rect(&self) -> Rect {
        Rect::new(
            self.margins.left,
            self.margins.top,
            self.content_width(),
            self.header.height,
        )
    }

    pub fn footer_rect(&self) -> Rect {
        Rect::new(
            self.margins.left,
            self.footer.top,
            self.content_width(),
            self.footer.height,
        )
    }
}

fn pin(value: &mut f64, mandated: f64, field: &'static str) {
    if (*value - mandated).abs() > f64::EPSILON {
        tracing::debug!(field, stored = *value, mandated, "overriding stored DIN 5008 metric");
        *value = mandated;
    }
}

fn fix(value: &mut f64, default: f64) {
    *value = finite_or(*value, default);
}

fn fix_size(value: &mut f64, default: f64) {
    if !value.is_finite() || *value <= 0.0 {
        *value = default;
    }
}
