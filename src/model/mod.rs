//! # Business Records
//!
//! The rows the surrounding application loads and hands to the layout core:
//! letter, template, sender, recipient, information block and attachments.
//! Field names follow the stored (snake_case) columns. The core only reads
//! these; it never writes them back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{BlockLine, HeaderElement};
use crate::lenient;
use crate::settings::LetterLayoutSettings;

/// A letter as stored by the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Letter {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub subject: Option<String>,
    /// ISO date (`YYYY-MM-DD`) or RFC 3339 timestamp.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub letter_date: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub reference_number: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub recipient_name: Option<String>,
    /// Free-form address block, one line per `\n`.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub recipient_address: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub salutation_override: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub closing_formula: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub closing_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub closing_title: Option<String>,
    /// Structured editor document (`{"type": "doc", "content": [...]}`).
    pub content_json: Option<Value>,
    /// The same body flattened to HTML.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub content_html: Option<String>,
    #[serde(deserialize_with = "lenient::opt_bool")]
    pub show_pagination: Option<bool>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sender_info_id: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub information_block_ids: Vec<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub contact_id: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub attachments: Vec<Attachment>,
}

impl Letter {
    pub fn subject_text(&self) -> &str {
        self.subject.as_deref().unwrap_or("").trim()
    }
}

/// A file attached to a letter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub file_name: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub display_name: Option<String>,
}

impl Attachment {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            display_name: None,
        }
    }

    /// The display name when set, else the raw file name.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.file_name)
    }
}

/// How the letterhead of a template is authored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLayoutType {
    /// Raw markup (`letterhead_html` + `letterhead_css`).
    Html,
    /// Positioned text/image elements (`header_text_elements`). Unknown
    /// stored values land here.
    #[default]
    #[serde(other)]
    Structured,
}

/// A letter template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    #[serde(deserialize_with = "lenient::or_default")]
    pub layout_settings: LetterLayoutSettings,
    #[serde(deserialize_with = "lenient::or_default")]
    pub header_layout_type: HeaderLayoutType,
    #[serde(deserialize_with = "elements")]
    pub header_text_elements: Vec<HeaderElement>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub letterhead_html: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub letterhead_css: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub footer_blocks: Vec<FooterBlock>,
}

fn elements<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<HeaderElement>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|arr| crate::content::parse_elements(arr))
        .unwrap_or_default())
}

/// Unit of a footer column width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthUnit {
    Cm,
    #[default]
    #[serde(other)]
    Percent,
}

/// One column of a template's structured footer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FooterBlock {
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    /// Column width; `None` shares the remaining width with other auto columns.
    #[serde(deserialize_with = "lenient::opt_mm")]
    pub width: Option<f64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub width_unit: WidthUnit,
    #[serde(deserialize_with = "lenient::opt_mm")]
    pub font_size: Option<f64>,
    #[serde(deserialize_with = "footer_lines")]
    pub lines: Vec<BlockLine>,
}

fn footer_lines<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<BlockLine>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let wrapped = serde_json::json!({ "mode": "lines", "lines": value });
    Ok(match crate::content::ZoneContent::from_value(&wrapped) {
        crate::content::ZoneContent::Lines(lines) => lines,
        _ => Vec::new(),
    })
}

/// The sending office.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderInfo {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub organization: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub street: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub postal_code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub fax: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub website: Option<String>,
    /// Compact one-line return address for the window envelope.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub return_address_line: Option<String>,
}

impl SenderInfo {
    /// `"12345 Stadt"`, or whichever half exists.
    pub fn city_line(&self) -> String {
        join_non_empty(&[self.postal_code.as_deref(), self.city.as_deref()], " ")
    }

    /// Compact return address: the stored line, or `Org · Street · PLZ City`.
    pub fn return_address(&self) -> String {
        if let Some(line) = non_empty(self.return_address_line.as_deref()) {
            return line.to_string();
        }
        let city = self.city_line();
        join_non_empty(
            &[
                self.organization.as_deref().or(self.name.as_deref()),
                self.street.as_deref(),
                Some(city.as_str()),
            ],
            " · ",
        )
    }

    /// Postal address lines, empty lines removed.
    pub fn address_lines(&self) -> Vec<String> {
        let city = self.city_line();
        [
            self.organization.as_deref(),
            self.name.as_deref(),
            self.street.as_deref(),
            Some(city.as_str()),
        ]
        .into_iter()
        .filter_map(non_empty)
        .map(str::to_string)
        .collect()
    }
}

/// The addressee (a contact record).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipient {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub gender: Option<String>,
    /// Academic title, e.g. `"Dr."`.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub organization: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub street: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub postal_code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub country: Option<String>,
}

impl Recipient {
    /// Explicit last name, else the final whitespace-delimited token of `name`.
    pub fn derived_last_name(&self) -> Option<String> {
        non_empty(self.last_name.as_deref())
            .map(str::to_string)
            .or_else(|| {
                self.name
                    .as_deref()
                    .and_then(|n| n.split_whitespace().last())
                    .map(str::to_string)
            })
    }

    /// Explicit first name, else everything but the last token of `name`.
    pub fn derived_first_name(&self) -> Option<String> {
        if let Some(first) = non_empty(self.first_name.as_deref()) {
            return Some(first.to_string());
        }
        let name = self.name.as_deref()?;
        let tokens: Vec<&str> = name.split_whitespace().collect();
        if tokens.len() < 2 {
            return None;
        }
        Some(tokens[..tokens.len() - 1].join(" "))
    }

    /// `name`, or first + last name.
    pub fn display_name(&self) -> String {
        if let Some(name) = non_empty(self.name.as_deref()) {
            return name.to_string();
        }
        join_non_empty(
            &[self.first_name.as_deref(), self.last_name.as_deref()],
            " ",
        )
    }

    pub fn city_line(&self) -> String {
        join_non_empty(&[self.postal_code.as_deref(), self.city.as_deref()], " ")
    }

    /// Postal address lines, empty lines removed.
    pub fn address_lines(&self) -> Vec<String> {
        let name = self.display_name();
        let city = self.city_line();
        [
            self.organization.as_deref(),
            Some(name.as_str()),
            self.street.as_deref(),
            Some(city.as_str()),
            self.country.as_deref(),
        ]
        .into_iter()
        .filter_map(non_empty)
        .map(str::to_string)
        .collect()
    }
}

/// Contact details printed in the information block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InformationBlock {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub contact_person: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub department: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub your_reference: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub our_reference: Option<String>,
    /// Free-form fields, each available as `{{key}}`.
    #[serde(deserialize_with = "lenient::or_default")]
    pub extra: std::collections::BTreeMap<String, String>,
}

impl InformationBlock {
    /// Labelled rows for the fallback rendering, in print order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        [
            ("Ihr Zeichen", self.your_reference.as_deref()),
            ("Unser Zeichen", self.our_reference.as_deref()),
            ("Ansprechpartner", self.contact_person.as_deref()),
            ("Abteilung", self.department.as_deref()),
            ("Telefon", self.phone.as_deref()),
            ("E-Mail", self.email.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, v)| non_empty(v).map(|v| (label, v.to_string())))
        .collect()
    }
}

/// Everything needed to lay out one letter, as one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LetterDocument {
    pub letter: Letter,
    pub template: Template,
    pub sender: Option<SenderInfo>,
    pub recipient: Option<Recipient>,
    pub information_block: Option<InformationBlock>,
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn join_non_empty(parts: &[Option<&str>], sep: &str) -> String {
    parts
        .iter()
        .filter_map(|p| non_empty(*p))
        .collect::<Vec<_>>()
        .join(sep)
}
