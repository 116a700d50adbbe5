//! # Composition
//!
//! Turns a [`LetterDocument`] into what one render pass consumes: settings
//! with the DIN 5008 metrics enforced, zone content with placeholders
//! resolved, and the business fields each zone falls back to. Everything
//! here is derived fresh per pass; nothing is written back.

use crate::content::{BlockContent, HeaderElement, ZoneKey};
use crate::model::{non_empty, FooterBlock, HeaderLayoutType, LetterDocument};
use crate::settings::LetterLayoutSettings;
use crate::text::markup::{body_paragraphs, Paragraph};
use crate::variables::{build_variable_map, resolve_salutation, substitute_block_lines, substitute_variables, VariableMap};

/// What the letterhead zone draws.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderContent {
    Elements(Vec<HeaderElement>),
    Markup { html: String, css: Option<String> },
    None,
}

/// Zone content after substitution.
#[derive(Debug, Clone)]
pub struct ResolvedContent {
    pub header: HeaderContent,
    pub zones: BlockContent,
    pub footer_blocks: Vec<FooterBlock>,
    pub body: Vec<Paragraph>,
    pub body_html: String,
}

/// Closing formula and signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosingBlock {
    pub formula: String,
    pub name: String,
    pub title: String,
    pub signature_image_path: Option<String>,
}

impl ClosingBlock {
    pub fn is_empty(&self) -> bool {
        self.formula.is_empty() && self.name.is_empty() && self.title.is_empty()
    }
}

/// Plain business values the zones fall back to when they carry no content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessFields {
    pub subject: String,
    pub salutation: String,
    pub recipient_address: Vec<String>,
    pub return_address: Vec<String>,
    pub info_rows: Vec<(String, String)>,
    pub attachments: Vec<String>,
    pub closing: ClosingBlock,
    pub sender_lines: Vec<String>,
    pub show_pagination: bool,
}

/// Everything one render pass needs.
#[derive(Debug, Clone)]
pub struct PreparedLetter {
    pub settings: LetterLayoutSettings,
    pub variables: VariableMap,
    pub content: ResolvedContent,
    pub fields: BusinessFields,
}

/// Resolve a document for rendering.
pub fn prepare(doc: &LetterDocument) -> PreparedLetter {
    let settings = doc.template.layout_settings.enforce_din5008_metrics();
    let letter = &doc.letter;

    let vars = build_variable_map(
        letter,
        doc.sender.as_ref(),
        doc.recipient.as_ref(),
        doc.information_block.as_ref(),
        &letter.attachments,
    );

    let mut zones = BlockContent::new();
    for (key, zone) in settings.block_content.iter() {
        zones.set(key, zone.substituted(&vars));
    }

    let header = match doc.template.header_layout_type {
        HeaderLayoutType::Structured if !doc.template.header_text_elements.is_empty() => {
            HeaderContent::Elements(substitute_variables(&doc.template.header_text_elements, &vars))
        }
        HeaderLayoutType::Html => match non_empty(doc.template.letterhead_html.as_deref()) {
            Some(html) => HeaderContent::Markup {
                html: vars.substitute(html),
                css: non_empty(doc.template.letterhead_css.as_deref()).map(str::to_string),
            },
            None => HeaderContent::None,
        },
        _ => HeaderContent::None,
    };

    let footer_blocks = doc
        .template
        .footer_blocks
        .iter()
        .map(|block| FooterBlock {
            title: block.title.as_deref().map(|t| vars.substitute(t)),
            lines: substitute_block_lines(&block.lines, &vars),
            ..block.clone()
        })
        .collect();

    let body_json = letter.content_json.as_ref().filter(|v| !v.is_null());
    let body = substitute_paragraphs(
        body_paragraphs(body_json, letter.content_html.as_deref()),
        &vars,
    );
    let body_html = letter
        .content_html
        .as_deref()
        .map(|html| vars.substitute(html))
        .unwrap_or_default();

    let fields = business_fields(doc, &settings, &vars);

    tracing::debug!(
        zones = zones.iter().count(),
        paragraphs = body.len(),
        "prepared letter"
    );

    PreparedLetter {
        settings,
        variables: vars,
        content: ResolvedContent {
            header,
            zones,
            footer_blocks,
            body,
            body_html,
        },
        fields,
    }
}

fn substitute_paragraphs(mut paragraphs: Vec<Paragraph>, vars: &VariableMap) -> Vec<Paragraph> {
    for p in &mut paragraphs {
        for span in &mut p.spans {
            span.text = vars.substitute(&span.text);
        }
    }
    paragraphs
}

fn business_fields(doc: &LetterDocument, settings: &LetterLayoutSettings, vars: &VariableMap) -> BusinessFields {
    let letter = &doc.letter;

    let recipient_address = match non_empty(letter.recipient_address.as_deref()) {
        Some(address) => {
            let mut lines: Vec<String> = Vec::new();
            if let Some(name) = non_empty(letter.recipient_name.as_deref()) {
                if !address.lines().any(|l| l.trim() == name) {
                    lines.push(name.to_string());
                }
            }
            lines.extend(address.lines().map(|l| l.trim().to_string()));
            lines
        }
        None => doc
            .recipient
            .as_ref()
            .map(|r| r.address_lines())
            .unwrap_or_default(),
    };

    let return_address: Vec<String> = doc
        .sender
        .as_ref()
        .map(|s| s.return_address())
        .filter(|s| !s.is_empty())
        .map(|s| s.lines().map(|l| l.trim().to_string()).collect())
        .unwrap_or_default();

    let mut info_rows: Vec<(String, String)> = doc
        .information_block
        .as_ref()
        .map(|info| {
            info.rows()
                .into_iter()
                .map(|(label, value)| (label.to_string(), value))
                .collect()
        })
        .unwrap_or_default();
    if let Some(date) = vars.get("datum").filter(|d| !d.is_empty()) {
        info_rows.push(("Datum".to_string(), date.to_string()));
    }

    let closing = ClosingBlock {
        formula: pick(letter.closing_formula.as_deref(), &settings.closing.formula, vars),
        name: pick(letter.closing_name.as_deref(), &settings.closing.signature_name, vars),
        title: pick(letter.closing_title.as_deref(), &settings.closing.signature_title, vars),
        signature_image_path: settings.closing.signature_image_path.clone(),
    };

    BusinessFields {
        subject: letter.subject_text().to_string(),
        salutation: resolve_salutation(&settings.salutation, vars),
        recipient_address,
        return_address,
        info_rows,
        attachments: letter.attachments.iter().map(|a| a.label().to_string()).collect(),
        closing,
        sender_lines: doc
            .sender
            .as_ref()
            .map(|s| s.address_lines())
            .unwrap_or_default(),
        show_pagination: letter.show_pagination.unwrap_or(true) && settings.pagination.is_enabled(),
    }
}

/// The letter's own value wins over the template default.
fn pick(letter_value: Option<&str>, template_default: &str, vars: &VariableMap) -> String {
    let raw = non_empty(letter_value).unwrap_or(template_default.trim());
    vars.substitute(raw)
}

/// Whether the stored zone map has any content for `key`.
pub fn has_zone(prepared: &PreparedLetter, key: ZoneKey) -> bool {
    !prepared.content.zones.get(key).is_empty()
}
