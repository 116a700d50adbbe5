//! # Zone Content Model
//!
//! Every layout zone (address, return address, info block, subject line,
//! attachments, footer) stores its content in one of two shapes:
//!
//! - **line mode**: `{ "mode": "lines", "lines": [...] }`, an ordered list
//!   of typed lines (label/value pairs, plain text, spacers);
//! - **canvas mode**: an array of freely positioned text and image elements
//!   in zone-local millimeters.
//!
//! Stored JSON is classified exactly once, in [`ZoneContent::from_value`].
//! Everything downstream matches on the tagged union instead of sniffing
//! shapes again.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::lenient;
use crate::style::{FontStyle, FontWeight, TextAlign, TextDecoration};

/// Height of a spacer line that doesn't specify one.
pub const DEFAULT_SPACER_HEIGHT_MM: f64 = 2.0;

/// Glyph drawn in front of a subject or text-only line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixShape {
    Line,
    Circle,
    Rectangle,
    Custom,
    #[default]
    #[serde(other)]
    None,
}

// ── Line mode ───────────────────────────────────────────────────

/// One line of a line-mode zone. Render order is array order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockLine {
    LabelValue(LabelValueLine),
    TextOnly(TextOnlyLine),
    Spacer(SpacerLine),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelValueLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub label: String,
    #[serde(deserialize_with = "lenient::string")]
    pub value: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub label_bold: bool,
    #[serde(deserialize_with = "lenient::or_default")]
    pub value_bold: bool,
    /// Font size in points; the zone default applies when absent.
    #[serde(deserialize_with = "lenient::opt_mm", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextOnlyLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub value: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub value_bold: bool,
    #[serde(deserialize_with = "lenient::opt_mm", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub prefix_shape: PrefixShape,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpacerLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_mm", skip_serializing_if = "Option::is_none")]
    pub spacer_height: Option<f64>,
}

impl SpacerLine {
    pub fn height_mm(&self) -> f64 {
        self.spacer_height
            .filter(|h| *h >= 0.0)
            .unwrap_or(DEFAULT_SPACER_HEIGHT_MM)
    }
}

impl BlockLine {
    pub fn text(value: &str) -> Self {
        BlockLine::TextOnly(TextOnlyLine {
            value: value.to_string(),
            ..Default::default()
        })
    }

    pub fn label_value(label: &str, value: &str) -> Self {
        BlockLine::LabelValue(LabelValueLine {
            label: label.to_string(),
            value: value.to_string(),
            ..Default::default()
        })
    }

    pub fn spacer(height: f64) -> Self {
        BlockLine::Spacer(SpacerLine {
            id: None,
            spacer_height: Some(height),
        })
    }

    pub fn font_size(&self) -> Option<f64> {
        match self {
            BlockLine::LabelValue(l) => l.font_size,
            BlockLine::TextOnly(l) => l.font_size,
            BlockLine::Spacer(_) => None,
        }
    }

    /// Parse one stored line. Lines from before the `type` tag existed are
    /// label/value when they carry a label, text-only otherwise.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.contains_key("type") {
            return serde_json::from_value(value.clone()).ok();
        }
        let has_label = obj
            .get("label")
            .and_then(Value::as_str)
            .is_some_and(|l| !l.is_empty());
        if has_label {
            serde_json::from_value(value.clone())
                .ok()
                .map(BlockLine::LabelValue)
        } else {
            serde_json::from_value(value.clone())
                .ok()
                .map(BlockLine::TextOnly)
        }
    }
}

// ── Canvas mode ─────────────────────────────────────────────────

/// A positioned element of a canvas-mode zone (or of the letterhead).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HeaderElement {
    Text(TextElement),
    Image(ImageElement),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Zone-local offset in mm.
    #[serde(deserialize_with = "lenient::mm")]
    pub x: f64,
    #[serde(deserialize_with = "lenient::mm")]
    pub y: f64,
    #[serde(deserialize_with = "lenient::opt_mm", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(deserialize_with = "lenient::opt_mm", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub font_weight: FontWeight,
    #[serde(deserialize_with = "lenient::or_default")]
    pub font_style: FontStyle,
    #[serde(deserialize_with = "lenient::or_default")]
    pub text_decoration: TextDecoration,
    #[serde(deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Line height multiplier for multi-line content.
    #[serde(deserialize_with = "lenient::opt_mm", skip_serializing_if = "Option::is_none")]
    pub text_line_height: Option<f64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub text_align: TextAlign,
}

impl TextElement {
    pub fn at(x: f64, y: f64, content: &str) -> Self {
        Self {
            x,
            y,
            content: content.to_string(),
            ..Default::default()
        }
    }
}

/// An image on a canvas. Only the durable storage path is part of the
/// persisted shape; the public URL is derived at render time through a
/// [`StorageResolver`] and never written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredImageElement")]
pub struct ImageElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

/// What older editor versions wrote: the resolved URL alongside (or instead
/// of) the storage path.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct StoredImageElement {
    id: Option<String>,
    #[serde(deserialize_with = "lenient::mm")]
    x: f64,
    #[serde(deserialize_with = "lenient::mm")]
    y: f64,
    #[serde(deserialize_with = "lenient::mm")]
    width: f64,
    #[serde(deserialize_with = "lenient::mm")]
    height: f64,
    #[serde(deserialize_with = "lenient::opt_string")]
    storage_path: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    image_url: Option<String>,
}

impl From<StoredImageElement> for ImageElement {
    fn from(stored: StoredImageElement) -> Self {
        let storage_path = stored
            .storage_path
            .filter(|p| !p.trim().is_empty())
            .or_else(|| {
                stored
                    .image_url
                    .as_deref()
                    .and_then(storage_path_from_public_url)
            });
        ImageElement {
            id: stored.id,
            x: stored.x,
            y: stored.y,
            width: stored.width,
            height: stored.height,
            storage_path,
        }
    }
}

impl ImageElement {
    /// The public URL for this image, or `None` when it has no storage path.
    pub fn resolve_url(&self, resolver: &dyn StorageResolver) -> Option<String> {
        let path = self.storage_path.as_deref()?;
        let url = resolver.resolve_public_url(path);
        if url.is_empty() {
            None
        } else {
            Some(url)
        }
    }
}

/// Recover `path/inside/bucket.png` from
/// `https://host/storage/v1/object/public/<bucket>/path/inside/bucket.png?t=1`.
pub fn storage_path_from_public_url(url: &str) -> Option<String> {
    const MARKER: &str = "/object/public/";
    let start = url.find(MARKER)? + MARKER.len();
    let rest = &url[start..];
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let (_bucket, path) = rest.split_once('/')?;
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

impl HeaderElement {
    /// Parse one stored element. Untagged legacy elements are text when they
    /// carry `content`, images when they carry a path or URL.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.contains_key("type") {
            return serde_json::from_value(value.clone()).ok();
        }
        if obj.contains_key("content") {
            serde_json::from_value(value.clone())
                .ok()
                .map(HeaderElement::Text)
        } else if obj.contains_key("storagePath") || obj.contains_key("imageUrl") {
            serde_json::from_value(value.clone())
                .ok()
                .map(HeaderElement::Image)
        } else {
            None
        }
    }

    /// Sanitized zone-local position.
    pub fn position(&self) -> (f64, f64) {
        let (x, y) = match self {
            HeaderElement::Text(t) => (t.x, t.y),
            HeaderElement::Image(i) => (i.x, i.y),
        };
        (crate::units::finite_or(x, 0.0), crate::units::finite_or(y, 0.0))
    }
}

/// Parse a stored element array, skipping entries that can't be read.
pub fn parse_elements(values: &[Value]) -> Vec<HeaderElement> {
    values
        .iter()
        .filter_map(|v| {
            let parsed = HeaderElement::from_value(v);
            if parsed.is_none() {
                tracing::warn!(element = %v, "skipping unreadable canvas element");
            }
            parsed
        })
        .collect()
}

// ── Storage URLs ────────────────────────────────────────────────

/// Turns a durable storage path into a public URL. Must be a pure lookup.
pub trait StorageResolver {
    fn resolve_public_url(&self, storage_path: &str) -> String;
}

impl<F> StorageResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve_public_url(&self, storage_path: &str) -> String {
        self(storage_path)
    }
}

/// Resolves paths against a public storage bucket:
/// `{base_url}/storage/v1/object/public/{bucket}/{path}`.
#[derive(Debug, Clone)]
pub struct PublicBucketResolver {
    pub base_url: String,
    pub bucket: String,
}

impl PublicBucketResolver {
    pub fn new(base_url: &str, bucket: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
        }
    }
}

impl StorageResolver for PublicBucketResolver {
    fn resolve_public_url(&self, storage_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            storage_path.trim_start_matches('/')
        )
    }
}

/// A resolver for contexts without storage access. Every image is omitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStorage;

impl StorageResolver for NoStorage {
    fn resolve_public_url(&self, _storage_path: &str) -> String {
        String::new()
    }
}

// ── Zones ───────────────────────────────────────────────────────

/// The content of one zone, classified once.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ZoneContent {
    Lines(Vec<BlockLine>),
    Canvas(Vec<HeaderElement>),
    #[default]
    Empty,
}

static EMPTY_ZONE: ZoneContent = ZoneContent::Empty;

/// A zone's stored content is line-mode iff it is a non-array object with
/// `mode == "lines"`.
pub fn is_line_mode(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get("mode"))
        .and_then(Value::as_str)
        == Some("lines")
}

impl ZoneContent {
    /// Classify stored zone JSON. Empty line lists and empty canvases are
    /// `Empty`, so the renderer falls through to the next content source.
    pub fn from_value(value: &Value) -> Self {
        if is_line_mode(value) {
            let lines: Vec<BlockLine> = value
                .get("lines")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| {
                            let line = BlockLine::from_value(v);
                            if line.is_none() {
                                tracing::warn!(line = %v, "skipping unreadable block line");
                            }
                            line
                        })
                        .collect()
                })
                .unwrap_or_default();
            if lines.is_empty() {
                ZoneContent::Empty
            } else {
                ZoneContent::Lines(lines)
            }
        } else if let Some(arr) = value.as_array() {
            let elements = parse_elements(arr);
            if elements.is_empty() {
                ZoneContent::Empty
            } else {
                ZoneContent::Canvas(elements)
            }
        } else {
            ZoneContent::Empty
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ZoneContent::Empty)
    }
}

impl Serialize for ZoneContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct LinesRepr<'a> {
            mode: &'static str,
            lines: &'a [BlockLine],
        }
        match self {
            ZoneContent::Lines(lines) => LinesRepr {
                mode: "lines",
                lines,
            }
            .serialize(serializer),
            ZoneContent::Canvas(elements) => elements.serialize(serializer),
            ZoneContent::Empty => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ZoneContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ZoneContent::from_value(&value))
    }
}

/// Keys of the zones that can carry their own content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoneKey {
    AddressField,
    ReturnAddress,
    InfoBlock,
    SubjectLine,
    Attachments,
    Footer,
}

impl ZoneKey {
    pub const ALL: [ZoneKey; 6] = [
        ZoneKey::AddressField,
        ZoneKey::ReturnAddress,
        ZoneKey::InfoBlock,
        ZoneKey::SubjectLine,
        ZoneKey::Attachments,
        ZoneKey::Footer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneKey::AddressField => "addressField",
            ZoneKey::ReturnAddress => "returnAddress",
            ZoneKey::InfoBlock => "infoBlock",
            ZoneKey::SubjectLine => "subjectLine",
            ZoneKey::Attachments => "attachments",
            ZoneKey::Footer => "footer",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// `blockContent` of a template: zone key → classified content.
/// Unknown keys and empty zones are dropped on load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockContent(BTreeMap<ZoneKey, ZoneContent>);

impl BlockContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ZoneKey) -> &ZoneContent {
        self.0.get(&key).unwrap_or(&EMPTY_ZONE)
    }

    pub fn set(&mut self, key: ZoneKey, content: ZoneContent) {
        if content.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, content);
        }
    }

    pub fn with(mut self, key: ZoneKey, content: ZoneContent) -> Self {
        self.set(key, content);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (ZoneKey, &ZoneContent)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}

impl Serialize for BlockContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BlockContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let mut content = BlockContent::new();
        if let Value::Object(map) = value {
            for (key, raw) in &map {
                match ZoneKey::from_key(key) {
                    Some(zone) => content.set(zone, ZoneContent::from_value(raw)),
                    None => tracing::debug!(key = %key, "ignoring unknown blockContent zone"),
                }
            }
        }
        Ok(content)
    }
}
