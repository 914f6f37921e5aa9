//! JavaScript bindings.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::content::{ContentFields, QrType, encode};
use crate::export::ExportFormat;
use crate::styling::StylingInput;
use crate::theme::Theme;
use crate::{RenderError, export_document, render_document};

#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn error_to_js(e: RenderError) -> JsValue {
    serde_wasm_bindgen::to_value(&e).unwrap_or_else(|_| JsValue::from_str(&e.message))
}

/// Render a QR document to SVG.
///
/// Returns `{ svg, width, height, payload, warnings }`; errors are
/// `{ kind, message }`.
#[wasm_bindgen(js_name = "renderDocument")]
pub fn render_document_wasm(doc_json: &str) -> Result<JsValue, JsValue> {
    let result = render_document(doc_json).map_err(error_to_js)?;
    to_js(&result)
}

/// Build the content string for a QR type from form fields JSON.
#[wasm_bindgen(js_name = "encodeContent")]
pub fn encode_content_wasm(qr_type: &str, fields_json: &str) -> Result<String, JsValue> {
    let qr_type = QrType::parse(qr_type)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown QR type: {}", qr_type)))?;
    let fields: ContentFields = serde_json::from_str(fields_json)
        .map_err(|e| error_to_js(RenderError::parse(e)))?;
    Ok(encode(qr_type, &fields))
}

/// Fill in every missing styling field.
#[wasm_bindgen(js_name = "resolveStyling")]
pub fn resolve_styling_wasm(styling_json: &str) -> Result<JsValue, JsValue> {
    let input: StylingInput = serde_json::from_str(styling_json)
        .map_err(|e| error_to_js(RenderError::parse(e)))?;
    to_js(&input.resolve())
}

/// Render a document for download.
///
/// Returns `{ fileName, mime, bytes }`.
#[wasm_bindgen(js_name = "exportDocument")]
pub fn export_document_wasm(doc_json: &str, format: &str, epoch_ms: f64) -> Result<JsValue, JsValue> {
    let format = ExportFormat::parse(format)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown export format: {}", format)))?;
    let artifact = export_document(doc_json, format, epoch_ms.max(0.0) as u64).map_err(error_to_js)?;
    to_js(&artifact)
}

/// CSS custom properties for a named theme.
#[wasm_bindgen(js_name = "themeTokens")]
pub fn theme_tokens_wasm(name: &str) -> Result<JsValue, JsValue> {
    let theme =
        Theme::parse(name).ok_or_else(|| JsValue::from_str(&format!("Unknown theme: {}", name)))?;
    to_js(&theme.tokens())
}

/// Check an upload and return its MIME type.
#[wasm_bindgen(js_name = "validateUpload")]
pub fn validate_upload_wasm(bytes: &[u8]) -> Result<String, JsValue> {
    crate::validate::validate_upload(bytes)
        .map(|kind| kind.mime().to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Get version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
