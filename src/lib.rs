//! qrstyle - styled QR code cards compiled to SVG, PNG and PDF.
//!
//! A QR code is described by its content, a [`StylingInput`] (partial, as
//! stored) and an optional card [`Template`]. Styling is resolved to a
//! complete [`Styling`] before any renderer sees it. Cards are lowered to an
//! element tree, laid out with Taffy, and serialized as SVG; plain codes are
//! painted directly.
//!
//! # Example
//!
//! ```ignore
//! use qrstyle::render_document;
//!
//! let json = r##"{
//!     "name": "Menu",
//!     "type": "url",
//!     "content": "https://example.com/menu",
//!     "styling": { "foregroundColor": "#1f2937", "dotStyle": "rounded" }
//! }"##;
//!
//! let result = render_document(json)?;
//! println!("{}", result.svg);
//! ```

pub mod card;
pub mod content;
pub mod element;
pub mod export;
pub mod history;
pub mod interactive;
pub mod layout;
pub mod notify;
pub mod pdf;
pub mod plain;
pub mod qr;
pub mod record;
pub mod render;
pub mod styling;
pub mod svg;
pub mod template;
pub mod text;
pub mod theme;
pub mod validate;
pub mod wasm;
pub mod wizard;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

pub use card::{CardMode, CardQr, build_card};
pub use content::{ContentFields, QrType, encode};
pub use element::{Color, Element};
pub use export::{ExportArtifact, ExportFormat, ExportGate};
pub use layout::{LayoutEngine, LayoutError};
pub use plain::{PlainRenderer, PlainRequest, TrackingConfig, render_plain, tracked_payload};
pub use qr::RenderTarget;
pub use render::RenderTree;
pub use styling::{Styling, StylingInput};
pub use svg::SvgOptions;
pub use template::{EditTarget, Template};

pub const DEFAULT_TRACKING_BASE_URL: &str = "https://qr.example.com";

/// Rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Base of redirect URLs for tracked content types
    pub tracking_base_url: String,
    /// Pixel density multiplier for PNG export (and the PDF bitmap)
    pub export_scale: f32,
    /// Padding around the artwork on the PDF page, in points
    pub pdf_padding: f32,
    /// Default font family for card text
    pub font_family: Option<String>,
    /// Fonts to register for measurement and embed in the output
    pub fonts: Vec<FontSource>,
    /// Overrides `styling.size`
    pub size: Option<u32>,
    /// Thumbnail mode: smaller card, no editing
    pub compact: bool,
    /// Preview keeps editing hooks and display-only effects; set by callers
    #[serde(skip)]
    pub target: RenderTarget,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            tracking_base_url: DEFAULT_TRACKING_BASE_URL.to_string(),
            export_scale: 2.0,
            pdf_padding: pdf::DEFAULT_PADDING,
            font_family: None,
            fonts: Vec::new(),
            size: None,
            compact: false,
            target: RenderTarget::Preview,
        }
    }
}

impl RenderOptions {
    pub fn tracking(&self) -> TrackingConfig {
        TrackingConfig {
            base_url: self.tracking_base_url.clone(),
        }
    }

    /// Decode the configured fonts.
    pub fn decoded_fonts(&self) -> Result<Vec<Vec<u8>>, RenderError> {
        self.fonts
            .iter()
            .map(|font| {
                STANDARD.decode(font.data.trim()).map_err(|e| {
                    RenderError::new(
                        "font_error",
                        format!(
                            "font {}: invalid base64: {}",
                            font.family.as_deref().unwrap_or("(unnamed)"),
                            e
                        ),
                    )
                })
            })
            .collect()
    }
}

/// A font supplied as base64 data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSource {
    /// Family name used in `@font-face`; defaults to the name in the font
    #[serde(default)]
    pub family: Option<String>,
    /// Base64-encoded TTF/OTF/WOFF data
    pub data: String,
}

/// Rendering result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    /// Generated SVG string
    pub svg: String,
    /// Computed width
    pub width: f32,
    /// Computed height
    pub height: f32,
    /// The string actually encoded in the symbol
    pub payload: String,
    /// Any warnings during rendering
    pub warnings: Vec<String>,
}

/// Rendering error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderError {
    pub message: String,
    pub kind: String,
}

impl RenderError {
    pub fn new(kind: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.to_string(),
        }
    }

    pub fn parse(e: serde_json::Error) -> Self {
        Self::new("parse_error", e.to_string())
    }
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RenderError {}

impl From<LayoutError> for RenderError {
    fn from(e: LayoutError) -> Self {
        let kind = match e {
            LayoutError::Encode(_) => "encode_error",
            LayoutError::Taffy(_) => "layout_error",
        };
        Self::new(kind, e.to_string())
    }
}

impl From<qr::EncodeError> for RenderError {
    fn from(e: qr::EncodeError) -> Self {
        Self::new("encode_error", e.to_string())
    }
}

impl From<export::ExportError> for RenderError {
    fn from(e: export::ExportError) -> Self {
        Self::new("export_error", e.to_string())
    }
}

/// A self-contained QR document.
///
/// ```json
/// {
///   "meta": { "trackingBaseUrl": "https://qr.example.com" },
///   "name": "Menu",
///   "type": "url",
///   "content": "https://example.com/menu",
///   "styling": { "dotStyle": "rounded" },
///   "template": null
/// }
/// ```
///
/// `content` wins over `fields`; when it is absent the fields are encoded.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrDocument {
    #[serde(default)]
    pub meta: RenderOptions,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub qr_type: QrType,
    /// Stable record id used for tracked redirects
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub fields: ContentFields,
    #[serde(default)]
    pub styling: StylingInput,
    #[serde(default)]
    pub template: Option<Template>,
}

impl QrDocument {
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str(json).map_err(RenderError::parse)
    }

    /// Content string before tracking substitution.
    pub fn content(&self) -> String {
        self.content
            .clone()
            .unwrap_or_else(|| encode(self.qr_type, &self.fields))
    }

    /// Render with the given options (normally `self.meta` plus overrides).
    pub fn render(&self, options: &RenderOptions) -> Result<RenderResult, RenderError> {
        let styling = self.styling.resolve();
        match &self.template {
            None => render_plain(
                &PlainRequest {
                    content: self.content(),
                    styling,
                    qr_type: self.qr_type,
                    id: self.id.clone(),
                    size: options.size,
                },
                options,
            ),
            Some(template) => {
                let qr = CardQr {
                    payload: tracked_payload(
                        self.qr_type,
                        &self.content(),
                        self.id.as_deref(),
                        &options.tracking(),
                    ),
                    size: options.size.unwrap_or(styling.size) as f32,
                    styling,
                };
                let mode = CardMode {
                    editable: false,
                    compact: options.compact,
                };
                render_card(Some(template), &qr, mode, None, options)
            }
        }
    }
}

/// Render a self-contained QR document (meta + content) to SVG.
pub fn render_document(doc_json: &str) -> Result<RenderResult, RenderError> {
    let doc = QrDocument::from_json(doc_json)?;
    doc.render(&doc.meta)
}

/// Render a document for download in `format`.
pub fn export_document(
    doc_json: &str,
    format: ExportFormat,
    epoch_ms: u64,
) -> Result<ExportArtifact, RenderError> {
    let doc = QrDocument::from_json(doc_json)?;
    let options = RenderOptions {
        target: RenderTarget::Export,
        ..doc.meta.clone()
    };
    let result = doc.render(&options)?;
    let settings = export::ExportSettings::from_options(&options)?;
    Ok(export::build_artifact(
        format,
        &result.svg,
        &doc.name,
        epoch_ms,
        &settings,
    )?)
}

/// Render a card (or, without a template, the bare QR block) through the
/// layout pipeline.
pub fn render_card(
    template: Option<&Template>,
    qr: &CardQr,
    mode: CardMode,
    open_editor: Option<EditTarget>,
    options: &RenderOptions,
) -> Result<RenderResult, RenderError> {
    let mut warnings = Vec::new();
    collect_styling_warnings(&qr.styling, &mut warnings);

    let element = build_card(template, qr, mode);

    let mut layout_engine = LayoutEngine::new();
    let font_faces = register_fonts(&mut layout_engine, options)?;

    let width = card::card_width(template, qr, mode);
    let layout_result = layout_engine.compute_layout(
        &element,
        width,
        None,
        options.font_family.as_deref(),
    )?;

    let render_tree = render::build_render_tree(
        &layout_result,
        &mut layout_engine.text_engine,
        open_editor.filter(|_| mode.editing()),
    )?;

    let svg_options = SvgOptions {
        target: options.target,
        font_faces,
        ..Default::default()
    };
    let svg = svg::generate_svg(&render_tree, &svg_options);

    tracing::debug!(
        width = render_tree.width,
        height = render_tree.height,
        bytes = svg.len(),
        "rendered card"
    );

    Ok(RenderResult {
        svg,
        width: render_tree.width,
        height: render_tree.height,
        payload: qr.payload.clone(),
        warnings,
    })
}

/// Register configured fonts with the text engine and return the faces to
/// embed.
fn register_fonts(
    engine: &mut LayoutEngine,
    options: &RenderOptions,
) -> Result<Vec<svg::FontFace>, RenderError> {
    let mut faces = Vec::new();
    for (source, data) in options.fonts.iter().zip(options.decoded_fonts()?) {
        let families = engine.text_engine.register_font(data.clone());
        let family = match (&source.family, families.first()) {
            (Some(family), _) => family.clone(),
            (None, Some(family)) => family.clone(),
            (None, None) => {
                return Err(RenderError::new(
                    "font_error",
                    "font data contains no usable face",
                ));
            }
        };
        faces.push(svg::FontFace { family, data });
    }
    Ok(faces)
}

pub(crate) fn collect_styling_warnings(styling: &Styling, warnings: &mut Vec<String>) {
    if let Some(src) = styling.image.as_deref() {
        if !content::is_renderable_image_ref(src.trim()) {
            warnings.push(format!(
                "logo ignored: {:?} is not an http(s), data or blob reference",
                src
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain_document() {
        let json = r##"{
            "name": "Wifi",
            "type": "wifi",
            "fields": { "ssid": "Home", "password": "secret1", "encryption": "WPA" },
            "styling": { "foregroundColor": "#ff0000", "size": 200 }
        }"##;

        let result = render_document(json).unwrap();
        assert_eq!(result.payload, "WIFI:T:WPA;S:Home;P:secret1;;");
        assert_eq!((result.width, result.height), (200.0, 200.0));
        assert!(result.svg.starts_with("<?xml"));
        assert!(result.svg.contains("#ff0000"));
        assert!(result.svg.ends_with("</svg>"));
    }

    #[test]
    fn test_render_card_document() {
        let json = r##"{
            "name": "Menu",
            "type": "url",
            "id": "abc123",
            "content": "https://example.com/menu",
            "template": {
                "title": { "text": "Our menu", "fontSize": 24, "fontWeight": 700 },
                "subtitle": { "text": "Scan to order", "fontSize": 14, "fontWeight": 400 },
                "backgroundColor": "#fefefe",
                "textColor": "#111111",
                "qrPosition": "top",
                "borderRadius": 12,
                "padding": 20,
                "showBorder": true,
                "borderWidth": 2,
                "borderColor": "#cccccc",
                "shadowIntensity": "none",
                "decorativeStyle": "none"
            }
        }"##;

        let result = render_document(json).unwrap();
        assert_eq!(result.payload, "https://qr.example.com/r/abc123");
        assert!(result.svg.contains("Our menu"));
        assert!(result.svg.contains("#cccccc"));
        // Not editable: no inline-editing hooks.
        assert!(!result.svg.contains("data-edit-target"));
    }

    #[test]
    fn test_invalid_json() {
        let err = render_document("not valid json").unwrap_err();
        assert_eq!(err.kind, "parse_error");
    }

    #[test]
    fn test_oversized_payload_is_encode_error() {
        let content = "x".repeat(8000);
        let json = serde_json::json!({ "type": "text", "content": content }).to_string();
        let err = render_document(&json).unwrap_err();
        assert_eq!(err.kind, "encode_error");
    }

    #[test]
    fn test_bad_font_is_font_error() {
        let json = r##"{
            "meta": { "fonts": [{ "family": "Brand", "data": "%%%" }] },
            "type": "text",
            "content": "hi",
            "template": null
        }"##;
        // Plain rendering never touches fonts.
        assert!(render_document(json).is_ok());

        let doc = QrDocument::from_json(json).unwrap();
        let err = render_card(
            None,
            &CardQr {
                payload: "hi".to_string(),
                styling: Styling::default(),
                size: 100.0,
            },
            CardMode::default(),
            None,
            &doc.meta,
        )
        .unwrap_err();
        assert_eq!(err.kind, "font_error");
    }

    #[test]
    fn test_unrenderable_logo_warns() {
        let json = r##"{
            "type": "text",
            "content": "hi",
            "styling": { "image": "logo.png" }
        }"##;
        let result = render_document(json).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(!result.svg.contains("logo.png"));
    }
}
