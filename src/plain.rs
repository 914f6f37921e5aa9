//! Plain renderer: the bare styled symbol for lists, grids and export.
//!
//! Tracked content types are swapped for a redirect URL here, so the content
//! encoder output itself never changes.

use crate::content::{QrType, percent};
use crate::qr::{QrMatrix, QrPainter, RenderTarget};
use crate::render::Rect;
use crate::styling::Styling;
use crate::svg::{SvgOptions, open_document};
use crate::{RenderError, RenderOptions, RenderResult, collect_styling_warnings};

/// Where tracked scans are redirected through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfig {
    pub base_url: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            base_url: crate::DEFAULT_TRACKING_BASE_URL.to_string(),
        }
    }
}

/// The string actually encoded for `content` of type `qr_type`.
///
/// Tracked types become `<base>/r/<id>`, or, before the record has an id,
/// `<base>/redirect?type=<type>&url=<content>`. Everything else is encoded
/// as-is.
pub fn tracked_payload(
    qr_type: QrType,
    content: &str,
    id: Option<&str>,
    tracking: &TrackingConfig,
) -> String {
    if !qr_type.is_tracked() {
        return content.to_string();
    }
    let base = tracking.base_url.trim_end_matches('/');
    match id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("{}/r/{}", base, percent(id)),
        None => format!(
            "{}/redirect?type={}&url={}",
            base,
            qr_type,
            percent(content)
        ),
    }
}

/// Inputs of one plain render.
#[derive(Debug, Clone, PartialEq)]
pub struct PlainRequest {
    pub content: String,
    pub styling: Styling,
    pub qr_type: QrType,
    pub id: Option<String>,
    /// Overrides `styling.size`
    pub size: Option<u32>,
}

/// Render the bare styled symbol.
pub fn render_plain(
    request: &PlainRequest,
    options: &RenderOptions,
) -> Result<RenderResult, RenderError> {
    let mut warnings = Vec::new();
    collect_styling_warnings(&request.styling, &mut warnings);

    let payload = tracked_payload(
        request.qr_type,
        &request.content,
        request.id.as_deref(),
        &options.tracking(),
    );
    let styling = request.styling.for_render();
    let matrix = QrMatrix::encode(&payload, styling.error_correction_level)?;

    let size = request.size.unwrap_or(styling.size).max(1) as f32;
    let svg_options = SvgOptions {
        target: options.target,
        ..Default::default()
    };
    let mut svg = open_document(size, size, &svg_options);
    QrPainter {
        matrix: &matrix,
        styling: &styling,
        rect: Rect {
            x: 0.0,
            y: 0.0,
            width: size,
            height: size,
        },
        id_prefix: "qr".to_string(),
        target: options.target,
        precision: svg_options.precision,
    }
    .paint(&mut svg);
    svg.push_str("</svg>");

    tracing::debug!(
        qr_type = %request.qr_type,
        modules = matrix.width(),
        size,
        "rendered plain code"
    );

    Ok(RenderResult {
        svg,
        width: size,
        height: size,
        payload,
        warnings,
    })
}

/// Caches the last plain render.
///
/// Any change to the request discards the previous output and renders from
/// scratch; there is no incremental patching.
#[derive(Debug, Default)]
pub struct PlainRenderer {
    last: Option<(PlainRequest, TrackingConfig, RenderTarget, RenderResult)>,
}

impl PlainRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(
        &mut self,
        request: &PlainRequest,
        options: &RenderOptions,
    ) -> Result<&RenderResult, RenderError> {
        let tracking = options.tracking();
        let entry = match self.last.take() {
            Some(entry)
                if entry.0 == *request && entry.1 == tracking && entry.2 == options.target =>
            {
                tracing::debug!(qr_type = %request.qr_type, "plain render cache hit");
                entry
            }
            _ => (
                request.clone(),
                tracking,
                options.target,
                render_plain(request, options)?,
            ),
        };
        Ok(&self.last.insert(entry).3)
    }

    /// Drop the cached output.
    pub fn clear(&mut self) {
        self.last = None;
    }
}
