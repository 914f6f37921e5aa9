#![cfg(target_arch = "wasm32")]

use qrstyle::wasm::{encode_content_wasm, render_document_wasm, theme_tokens_wasm, version};
use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn renders_plain_document() {
    let doc = r#"{ "type": "text", "content": "hello" }"#;
    assert!(render_document_wasm(doc).is_ok());
}

#[wasm_bindgen_test]
fn rejects_bad_json() {
    assert!(render_document_wasm("{").is_err());
}

#[wasm_bindgen_test]
fn encodes_phone_content() {
    let encoded = encode_content_wasm("phone", r#"{ "phone": "+1234567890" }"#).unwrap();
    assert_eq!(encoded, "tel:+1234567890");
    assert!(encode_content_wasm("fax", "{}").is_err());
}

#[wasm_bindgen_test]
fn theme_tokens_and_version() {
    assert!(theme_tokens_wasm("dark").is_ok());
    assert!(theme_tokens_wasm("neon").is_err());
    assert!(!version().is_empty());
}
