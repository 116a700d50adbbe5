//! # Letterform
//!
//! A DIN 5008 business-letter layout engine.
//!
//! A letter is not a free-flowing document. The address has to land in the
//! envelope window, the information block sits beside it, the subject line
//! starts at a fixed height, and the footer never moves. Letterform treats
//! those positions as law and lets only the body flow, cutting it into page
//! slices the same way for the live editor, the print preview and PDF
//! export.
//!
//! ## Architecture
//!
//! ```text
//! Input (letter + template + records, JSON)
//!       ↓
//!   [compose]     Enforce DIN metrics, substitute placeholders, fall back
//!       ↓
//!   [text]        Flow the body with the deterministic text model
//!       ↓
//!   [pagination]  Cut the measured body into page slices
//!       ↓
//!   [layout]      Place every zone, in millimeters, page by page
//!       ↓
//!   Page tree (JSON), consumed by any rendering backend
//! ```
//!
//! The [`editor`] module drives the same renderer for a live editing
//! surface, with continuous height measurement instead of the text model.

pub mod compose;
pub mod content;
pub mod editor;
pub mod error;
pub mod layout;
mod lenient;
pub mod model;
pub mod pagination;
pub mod settings;
pub mod style;
pub mod text;
pub mod units;
pub mod variables;

#[cfg(feature = "wasm")]
pub mod wasm;

use serde::{Deserialize, Serialize};

use content::{NoStorage, StorageResolver};
use error::LetterformError;
use layout::{LetterLayout, RenderInput, RenderedLetter};
use model::LetterDocument;
use pagination::Pagination;

/// Options of one render call.
#[derive(Clone, Copy)]
pub struct RenderOptions<'a> {
    /// Overlay zone guides on every page.
    pub debug: bool,
    pub resolver: &'a dyn StorageResolver,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        Self {
            debug: false,
            resolver: &NoStorage,
        }
    }
}

/// Lay out a letter document into pages.
///
/// This is the primary entry point. Missing records and empty zones never
/// fail; they fall back or are left out.
pub fn render_document(document: &LetterDocument, options: &RenderOptions) -> RenderedLetter {
    let prepared = compose::prepare(document);
    let input = RenderInput::new(&prepared, options.resolver).with_debug(options.debug);
    LetterLayout::default().render(&input)
}

/// Parse a letter document from JSON.
pub fn parse_document(json: &str) -> Result<LetterDocument, LetterformError> {
    Ok(serde_json::from_str(json)?)
}

/// Lay out a letter document given as JSON and return the page tree as JSON.
pub fn render_json(json: &str, options: &RenderOptions) -> Result<String, LetterformError> {
    let document = parse_document(json)?;
    let rendered = render_document(&document, options);
    Ok(serde_json::to_string(&rendered)?)
}

/// Inputs of a bare pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationRequest {
    pub editor_top_mm: f64,
    pub footer_top_mm: f64,
    pub content_height_mm: f64,
}

/// Paginate a measured body height.
pub fn paginate(request: &PaginationRequest) -> Pagination {
    pagination::compute_pagination(
        request.editor_top_mm,
        request.footer_top_mm,
        request.content_height_mm,
    )
}
