use wasm_bindgen::prelude::*;

use crate::content::PublicBucketResolver;
use crate::{PaginationRequest, RenderOptions};

/// Render a letter document (JSON) to its page tree (JSON). Images resolve
/// against `storage_base_url`/`bucket` when both are given.
#[wasm_bindgen]
pub fn render_letter(
    json: &str,
    debug: bool,
    storage_base_url: Option<String>,
    bucket: Option<String>,
) -> Result<String, JsValue> {
    let resolver = storage_base_url
        .zip(bucket)
        .map(|(base, bucket)| PublicBucketResolver::new(&base, &bucket));
    let mut options = RenderOptions {
        debug,
        ..RenderOptions::default()
    };
    if let Some(resolver) = &resolver {
        options.resolver = resolver;
    }
    crate::render_json(json, &options).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn paginate(editor_top_mm: f64, footer_top_mm: f64, content_height_mm: f64) -> Result<String, JsValue> {
    let pagination = crate::paginate(&PaginationRequest {
        editor_top_mm,
        footer_top_mm,
        content_height_mm,
    });
    serde_json::to_string(&pagination).map_err(|e| JsValue::from_str(&e.to_string()))
}
