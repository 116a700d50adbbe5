//! Body markup flattening.
//!
//! The letter body exists twice: as the editor's node tree (JSON) and as
//! HTML. Layout only needs paragraphs of styled text, so both forms are
//! reduced to [`Paragraph`]s here. The HTML reader is lenient: unclosed
//! tags, unknown entities and stray end tags are tolerated.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use serde_json::Value;

use super::StyledChar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    BulletItem,
    OrderedItem { number: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paragraph {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

impl Paragraph {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            spans: Vec::new(),
        }
    }

    pub fn plain(text: &str) -> Self {
        let mut p = Self::new(BlockKind::Paragraph);
        p.push(text, Marks::default());
        p
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }

    /// Characters with their styling, as the line breaker consumes them.
    /// Headings are bold throughout.
    pub fn styled_chars(&self) -> Vec<StyledChar> {
        let heading = matches!(self.kind, BlockKind::Heading { .. });
        self.spans
            .iter()
            .flat_map(|span| {
                span.text.chars().map(move |ch| StyledChar {
                    ch,
                    bold: span.bold || heading,
                    italic: span.italic,
                })
            })
            .collect()
    }

    fn push(&mut self, text: &str, marks: Marks) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.spans.last_mut() {
            if last.bold == marks.bold && last.italic == marks.italic && last.underline == marks.underline {
                last.text.push_str(text);
                return;
            }
        }
        self.spans.push(Span {
            text: text.to_string(),
            bold: marks.bold,
            italic: marks.italic,
            underline: marks.underline,
        });
    }

    /// Drop leading and trailing whitespace of the paragraph as a whole.
    fn trim(&mut self) {
        if let Some(first) = self.spans.first_mut() {
            first.text = first.text.trim_start_matches([' ', '\t']).to_string();
        }
        if let Some(last) = self.spans.last_mut() {
            last.text = last.text.trim_end_matches([' ', '\t']).to_string();
        }
        self.spans.retain(|s| !s.text.is_empty());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Marks {
    bold: bool,
    italic: bool,
    underline: bool,
}

/// Paragraphs of the letter body. The editor document wins when it has
/// content; HTML is the fallback.
pub fn body_paragraphs(content_json: Option<&Value>, content_html: Option<&str>) -> Vec<Paragraph> {
    if let Some(doc) = content_json {
        let paragraphs = paragraphs_from_editor_json(doc);
        if !paragraphs.is_empty() {
            return paragraphs;
        }
    }
    content_html.map(paragraphs_from_html).unwrap_or_default()
}

// ── HTML ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(u32),
}

#[derive(Default)]
struct HtmlFlattener {
    out: Vec<Paragraph>,
    current: Option<(Paragraph, bool)>,
    lists: Vec<ListKind>,
    bold: usize,
    italic: usize,
    underline: usize,
}

impl HtmlFlattener {
    fn marks(&self) -> Marks {
        Marks {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
        }
    }

    fn open(&mut self, kind: BlockKind) {
        // A <p> directly inside an <li> continues the list item.
        if let Some((p, _)) = &self.current {
            if matches!(kind, BlockKind::Paragraph)
                && matches!(p.kind, BlockKind::BulletItem | BlockKind::OrderedItem { .. })
                && p.is_blank()
            {
                return;
            }
        }
        self.flush();
        self.current = Some((Paragraph::new(kind), true));
    }

    fn open_list_item(&mut self) {
        let kind = match self.lists.last_mut() {
            Some(ListKind::Ordered(n)) => {
                let number = *n;
                *n += 1;
                BlockKind::OrderedItem { number }
            }
            Some(ListKind::Bullet) | None => BlockKind::BulletItem,
        };
        self.flush();
        self.current = Some((Paragraph::new(kind), true));
    }

    fn text(&mut self, text: &str) {
        let collapsed = collapse_whitespace(text);
        if self.current.is_none() {
            if collapsed.trim().is_empty() {
                return;
            }
            self.current = Some((Paragraph::new(BlockKind::Paragraph), false));
        }
        let marks = self.marks();
        if let Some((p, _)) = self.current.as_mut() {
            p.push(&collapsed, marks);
        }
    }

    fn line_break(&mut self) {
        if self.current.is_none() {
            self.current = Some((Paragraph::new(BlockKind::Paragraph), false));
        }
        let marks = self.marks();
        if let Some((p, _)) = self.current.as_mut() {
            p.push("\n", marks);
        }
    }

    fn flush(&mut self) {
        if let Some((mut p, explicit)) = self.current.take() {
            p.trim();
            if explicit || !p.is_blank() {
                self.out.push(p);
            }
        }
    }

    fn start(&mut self, e: &BytesStart) {
        match tag_name(e).as_str() {
            "p" | "div" | "blockquote" => self.open(BlockKind::Paragraph),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag_name(e)[1..].parse().unwrap_or(1);
                self.open(BlockKind::Heading { level });
            }
            "ul" => {
                self.flush();
                self.lists.push(ListKind::Bullet);
            }
            "ol" => {
                self.flush();
                let start = get_attr(e, "start")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(1);
                self.lists.push(ListKind::Ordered(start));
            }
            "li" => self.open_list_item(),
            "br" => self.line_break(),
            "strong" | "b" => self.bold += 1,
            "em" | "i" => self.italic += 1,
            "u" => self.underline += 1,
            _ => {}
        }
    }

    fn end(&mut self, name: &str) {
        match name {
            "p" | "div" | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" => self.flush(),
            "ul" | "ol" => {
                self.flush();
                self.lists.pop();
            }
            "strong" | "b" => self.bold = self.bold.saturating_sub(1),
            "em" | "i" => self.italic = self.italic.saturating_sub(1),
            "u" => self.underline = self.underline.saturating_sub(1),
            _ => {}
        }
    }
}

/// Flatten body HTML into paragraphs.
pub fn paragraphs_from_html(html: &str) -> Vec<Paragraph> {
    let mut reader = Reader::from_str(html);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut flat = HtmlFlattener::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => flat.start(&e),
            Ok(Event::Empty(e)) => {
                let name = tag_name(&e);
                flat.start(&e);
                // <p/> and friends open and close at once.
                if name != "br" {
                    flat.end(&name);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                flat.end(&name);
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape_with(resolve_entity) {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                flat.text(&text);
            }
            Ok(Event::CData(e)) => flat.text(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Err(err) => {
                tracing::warn!(error = %err, "stopping at malformed body markup");
                break;
            }
            _ => {}
        }
    }
    flat.flush();
    flat.out
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

fn get_attr(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.to_vec()).ok();
        }
    }
    None
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    quick_xml::escape::resolve_predefined_entity(name).or(match name {
        "nbsp" => Some("\u{00A0}"),
        "shy" => Some("\u{00AD}"),
        "auml" => Some("ä"),
        "ouml" => Some("ö"),
        "uuml" => Some("ü"),
        "Auml" => Some("Ä"),
        "Ouml" => Some("Ö"),
        "Uuml" => Some("Ü"),
        "szlig" => Some("ß"),
        "euro" => Some("€"),
        "sect" => Some("§"),
        "ndash" => Some("–"),
        "mdash" => Some("—"),
        "bdquo" => Some("„"),
        "ldquo" => Some("“"),
        "rdquo" => Some("”"),
        "middot" => Some("·"),
        "bull" => Some("•"),
        _ => None,
    })
}

/// HTML whitespace collapsing. Non-breaking spaces survive.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{00A0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

// ── Editor JSON ─────────────────────────────────────────────────

/// Flatten the editor's node tree (`{"type": "doc", "content": [...]}`).
pub fn paragraphs_from_editor_json(doc: &Value) -> Vec<Paragraph> {
    let mut out = Vec::new();
    if let Some(content) = doc.get("content").and_then(Value::as_array) {
        for node in content {
            walk_block(node, None, &mut out);
        }
    }
    out
}

fn walk_block(node: &Value, item_kind: Option<BlockKind>, out: &mut Vec<Paragraph>) {
    let node_type = node.get("type").and_then(Value::as_str).unwrap_or("");
    let children = node.get("content").and_then(Value::as_array);
    match node_type {
        "paragraph" | "heading" => {
            let kind = if node_type == "heading" {
                let level = node
                    .pointer("/attrs/level")
                    .and_then(Value::as_u64)
                    .and_then(|l| u8::try_from(l).ok())
                    .unwrap_or(1);
                BlockKind::Heading { level }
            } else {
                item_kind.unwrap_or(BlockKind::Paragraph)
            };
            let mut p = Paragraph::new(kind);
            for inline in children.into_iter().flatten() {
                push_inline(inline, &mut p);
            }
            out.push(p);
        }
        "bulletList" | "orderedList" => {
            let mut number = node
                .pointer("/attrs/start")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(1);
            for item in children.into_iter().flatten() {
                let kind = if node_type == "orderedList" {
                    let k = BlockKind::OrderedItem { number };
                    number += 1;
                    k
                } else {
                    BlockKind::BulletItem
                };
                walk_list_item(item, kind, out);
            }
        }
        "blockquote" => {
            for child in children.into_iter().flatten() {
                walk_block(child, None, out);
            }
        }
        _ => {
            tracing::debug!(node_type, "ignoring unsupported body node");
        }
    }
}

fn walk_list_item(item: &Value, kind: BlockKind, out: &mut Vec<Paragraph>) {
    let children = item.get("content").and_then(Value::as_array);
    // The first block of an item carries the marker; later ones are plain.
    let mut first = true;
    for child in children.into_iter().flatten() {
        let item_kind = if first { Some(kind) } else { None };
        first = false;
        walk_block(child, item_kind, out);
    }
    if first {
        out.push(Paragraph::new(kind));
    }
}

fn push_inline(node: &Value, p: &mut Paragraph) {
    match node.get("type").and_then(Value::as_str) {
        Some("text") => {
            let text = node.get("text").and_then(Value::as_str).unwrap_or("");
            let mut marks = Marks::default();
            for mark in node.get("marks").and_then(Value::as_array).into_iter().flatten() {
                match mark.get("type").and_then(Value::as_str) {
                    Some("bold") | Some("strong") => marks.bold = true,
                    Some("italic") | Some("em") => marks.italic = true,
                    Some("underline") => marks.underline = true,
                    _ => {}
                }
            }
            p.push(text, marks);
        }
        Some("hardBreak") => p.push("\n", Marks::default()),
        _ => {}
    }
}
