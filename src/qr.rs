//! Styled QR symbol painting.
//!
//! Encodes a payload with the `qrcode` crate and writes the symbol as SVG
//! markup: background, data modules, the three finder patterns, and an
//! optional centered logo.

use std::f32::consts::SQRT_2;

use qrcode::QrCode;

use crate::element::Color;
use crate::render::Rect;
use crate::styling::{
    CornerDotType, CornerSquareType, DotStyle, ErrorCorrectionLevel, Gradient, GradientKind,
    QrShape, Styling,
};
use crate::svg::{escape_xml, rounded_rect_path};

/// Finder patterns are 7x7 modules.
const FINDER: usize = 7;

/// Encoded module grid.
#[derive(Debug, Clone, PartialEq)]
pub struct QrMatrix {
    width: usize,
    dark: Vec<bool>,
}

#[derive(Debug, thiserror::Error)]
#[error("cannot encode {len} bytes at error correction {level:?}: {source}")]
pub struct EncodeError {
    pub len: usize,
    pub level: ErrorCorrectionLevel,
    #[source]
    pub source: qrcode::types::QrError,
}

impl QrMatrix {
    pub fn encode(payload: &str, level: ErrorCorrectionLevel) -> Result<Self, EncodeError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), level.to_ec_level())
            .map_err(|source| EncodeError {
                len: payload.len(),
                level,
                source,
            })?;

        let dark = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();

        Ok(Self {
            width: code.width(),
            dark,
        })
    }

    /// Modules per side.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }

    /// Whether (x, y) belongs to one of the three finder patterns.
    pub fn in_finder(&self, x: usize, y: usize) -> bool {
        let far = self.width.saturating_sub(FINDER);
        (x < FINDER && y < FINDER) || (x >= far && y < FINDER) || (x < FINDER && y >= far)
    }

    fn finder_origins(&self) -> [(usize, usize); 3] {
        let far = self.width - FINDER;
        [(0, 0), (far, 0), (0, far)]
    }
}

/// Whether the painter may emit preview-only decoration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderTarget {
    #[default]
    Preview,
    Export,
}

/// Writes one styled symbol into an SVG document.
pub struct QrPainter<'a> {
    pub matrix: &'a QrMatrix,
    pub styling: &'a Styling,
    /// Square the symbol occupies, including its margin
    pub rect: Rect,
    /// Unique prefix for gradient/clip ids within the document
    pub id_prefix: String,
    pub target: RenderTarget,
    pub precision: usize,
}

impl QrPainter<'_> {
    /// Append `<defs>` and body markup to `out`.
    pub fn paint(&self, out: &mut String) {
        let s = self.styling;
        let p = self.precision;
        let size = self.rect.width.min(self.rect.height);
        let (cx, cy) = (self.rect.x + size / 2.0, self.rect.y + size / 2.0);

        let dots_fill = self.fill_ref(out, "dots", s.dots_gradient.as_ref(), &s.foreground_color);
        let bg_fill = self.fill_ref(
            out,
            "bg",
            s.background_gradient.as_ref(),
            &s.background_color,
        );

        out.push_str("<g");
        if s.rotation.rem_euclid(360.0) != 0.0 {
            out.push_str(&format!(
                " transform=\"rotate({:.p$} {:.p$} {:.p$})\"",
                s.rotation,
                cx,
                cy,
                p = p
            ));
        }
        if self.target == RenderTarget::Preview {
            if let Some((dy, blur, opacity)) = s.shadow.params() {
                let id = format!("{}-shadow", self.id_prefix);
                out.push_str(&format!(
                    "><defs><filter id=\"{id}\" x=\"-20%\" y=\"-20%\" width=\"140%\" height=\"140%\">\
                     <feDropShadow dx=\"0\" dy=\"{dy}\" stdDeviation=\"{blur}\" \
                     flood-color=\"#000000\" flood-opacity=\"{opacity}\"/></filter></defs>\
                     <g filter=\"url(#{id})\">"
                ));
                self.paint_body(out, size, &dots_fill, &bg_fill);
                out.push_str("</g></g>");
                return;
            }
        }
        out.push('>');
        self.paint_body(out, size, &dots_fill, &bg_fill);
        out.push_str("</g>");
    }

    fn paint_body(&self, out: &mut String, size: f32, dots_fill: &str, bg_fill: &str) {
        let s = self.styling;
        let p = self.precision;
        let bg_opacity = s.bg_opacity as f32 / 100.0 * s.background_color.opacity();

        // Background
        match s.shape {
            QrShape::Square => {
                out.push_str(&format!(
                    "<rect x=\"{:.p$}\" y=\"{:.p$}\" width=\"{:.p$}\" height=\"{:.p$}\" \
                     fill=\"{}\" fill-opacity=\"{:.2}\"/>",
                    self.rect.x,
                    self.rect.y,
                    size,
                    size,
                    bg_fill,
                    bg_opacity,
                    p = p
                ));
            }
            QrShape::Circle => {
                out.push_str(&format!(
                    "<circle cx=\"{:.p$}\" cy=\"{:.p$}\" r=\"{:.p$}\" fill=\"{}\" fill-opacity=\"{:.2}\"/>",
                    self.rect.x + size / 2.0,
                    self.rect.y + size / 2.0,
                    size / 2.0,
                    bg_fill,
                    bg_opacity,
                    p = p
                ));
            }
        }

        let geometry = self.geometry(size);
        let logo = self.logo_area(&geometry);

        // Data modules, one path so a gradient spans the whole symbol
        let mut d = String::new();
        let n = self.matrix.width();
        for y in 0..n {
            for x in 0..n {
                if !self.matrix.is_dark(x, y) || self.matrix.in_finder(x, y) {
                    continue;
                }
                let cell = geometry.cell(x, y);
                if let Some(hidden) = &logo {
                    if s.image_options.hide_background_dots && intersects(&cell, &hidden.clear) {
                        continue;
                    }
                }
                self.push_dot(&mut d, &cell, x, y);
            }
        }
        if !d.is_empty() {
            out.push_str(&format!("<path d=\"{}\" fill=\"{}\"/>", d.trim_end(), dots_fill));
        }

        // Finder patterns
        let module = geometry.module;
        for (fx, fy) in self.matrix.finder_origins() {
            let outer = geometry.cell_span(fx, fy, FINDER);
            let inner = geometry.cell_span(fx + 2, fy + 2, 3);
            let ring = match s.corner_square_style.kind {
                CornerSquareType::Square => {
                    let hole = inset(&outer, module);
                    format!(
                        "{} {}",
                        rounded_rect_path(&outer, &[0.0; 4], p),
                        rounded_rect_path(&hole, &[0.0; 4], p)
                    )
                }
                CornerSquareType::Dot => {
                    let r = outer.width / 2.0;
                    format!(
                        "{} {}",
                        circle_path(outer.x + r, outer.y + r, r, p),
                        circle_path(outer.x + r, outer.y + r, r - module, p)
                    )
                }
                CornerSquareType::ExtraRounded => {
                    let hole = inset(&outer, module);
                    format!(
                        "{} {}",
                        rounded_rect_path(&outer, &[module * 2.5; 4], p),
                        rounded_rect_path(&hole, &[module * 1.5; 4], p)
                    )
                }
            };
            out.push_str(&format!(
                "<path d=\"{}\" fill=\"{}\" fill-rule=\"evenodd\"/>",
                ring,
                s.corner_square_style.color.to_css()
            ));

            let center = match s.corner_dot_style.kind {
                CornerDotType::Square => rounded_rect_path(&inner, &[0.0; 4], p),
                CornerDotType::Dot => {
                    let r = inner.width / 2.0;
                    circle_path(inner.x + r, inner.y + r, r, p)
                }
            };
            out.push_str(&format!(
                "<path d=\"{}\" fill=\"{}\"/>",
                center,
                s.corner_dot_style.color.to_css()
            ));
        }

        // Logo
        if let (Some(area), Some(src)) = (&logo, s.image.as_deref()) {
            out.push_str(&format!(
                "<image x=\"{:.p$}\" y=\"{:.p$}\" width=\"{:.p$}\" height=\"{:.p$}\" \
                 preserveAspectRatio=\"xMidYMid meet\" xlink:href=\"{}\"/>",
                area.image.x,
                area.image.y,
                area.image.width,
                area.image.height,
                escape_xml(src),
                p = p
            ));
        }
    }

    /// Module grid placement inside the symbol square.
    fn geometry(&self, size: f32) -> Geometry {
        let margin = self.styling.effective_margin().min(size / 4.0);
        let mut side = size - margin * 2.0;
        if self.styling.shape == QrShape::Circle {
            // The whole square must fit inside the circle.
            side = (size - margin * 2.0) / SQRT_2;
        }
        let origin_x = self.rect.x + (size - side) / 2.0;
        let origin_y = self.rect.y + (size - side) / 2.0;
        Geometry {
            origin_x,
            origin_y,
            module: side / self.matrix.width() as f32,
            side,
        }
    }

    fn logo_area(&self, geometry: &Geometry) -> Option<LogoArea> {
        self.styling.image.as_ref()?;
        let edge = geometry.side * self.styling.image_options.image_size;
        if edge <= 0.0 {
            return None;
        }
        let center_x = geometry.origin_x + geometry.side / 2.0;
        let center_y = geometry.origin_y + geometry.side / 2.0;
        let image = Rect {
            x: center_x - edge / 2.0,
            y: center_y - edge / 2.0,
            width: edge,
            height: edge,
        };
        let clear = inset(&image, -(self.styling.image_options.margin as f32));
        Some(LogoArea { image, clear })
    }

    fn push_dot(&self, d: &mut String, cell: &Rect, x: usize, y: usize) {
        let p = self.precision;
        let m = self.matrix;
        let free_left = x == 0 || !m.is_dark(x - 1, y) || m.in_finder(x - 1, y);
        let free_right = !m.is_dark(x + 1, y) || m.in_finder(x + 1, y);
        let free_top = y == 0 || !m.is_dark(x, y - 1) || m.in_finder(x, y - 1);
        let free_bottom = !m.is_dark(x, y + 1) || m.in_finder(x, y + 1);
        let r = cell.width / 2.0;

        let isolated = free_left && free_right && free_top && free_bottom;
        let both = |a: bool, b: bool| if a && b { r } else { 0.0 };
        let either = |a: bool, b: bool| if a || b { r } else { 0.0 };

        // [top-left, top-right, bottom-right, bottom-left]
        let radii = match self.styling.dot_style {
            DotStyle::Square => [0.0; 4],
            DotStyle::Dots => {
                d.push_str(&circle_path(cell.x + r, cell.y + r, r * 0.9, p));
                d.push(' ');
                return;
            }
            DotStyle::Rounded if isolated => {
                d.push_str(&circle_path(cell.x + r, cell.y + r, r, p));
                d.push(' ');
                return;
            }
            DotStyle::Rounded => [
                both(free_top, free_left),
                both(free_top, free_right),
                both(free_bottom, free_right),
                both(free_bottom, free_left),
            ],
            DotStyle::ExtraRounded => [
                either(free_top, free_left),
                either(free_top, free_right),
                either(free_bottom, free_right),
                either(free_bottom, free_left),
            ],
            DotStyle::Classy => [
                both(free_top, free_left),
                0.0,
                both(free_bottom, free_right),
                0.0,
            ],
            DotStyle::ClassyRounded => [
                either(free_top, free_left),
                0.0,
                either(free_bottom, free_right),
                0.0,
            ],
        };

        if radii.iter().all(|&v| v == 0.0) {
            // Plain squares: a compact absolute subpath.
            d.push_str(&format!(
                "M{:.p$} {:.p$}h{:.p$}v{:.p$}h-{:.p$}Z ",
                cell.x,
                cell.y,
                cell.width,
                cell.height,
                cell.width,
                p = p
            ));
        } else {
            d.push_str(&rounded_rect_path(cell, &radii, p));
            d.push(' ');
        }
    }

    /// Emit a gradient definition if present and return the fill reference.
    fn fill_ref(
        &self,
        out: &mut String,
        name: &str,
        gradient: Option<&Gradient>,
        flat: &Color,
    ) -> String {
        let Some(gradient) = gradient.filter(|g| !g.color_stops.is_empty()) else {
            return flat.to_opaque_css();
        };
        let id = format!("{}-{}", self.id_prefix, name);
        out.push_str("<defs>");
        match gradient.kind {
            GradientKind::Linear => {
                out.push_str(&format!(
                    "<linearGradient id=\"{id}\" x1=\"0\" y1=\"0\" x2=\"1\" y2=\"0\" \
                     gradientTransform=\"rotate({:.2} 0.5 0.5)\">",
                    gradient.rotation
                ));
            }
            GradientKind::Radial => {
                out.push_str(&format!(
                    "<radialGradient id=\"{id}\" cx=\"0.5\" cy=\"0.5\" r=\"0.5\">"
                ));
            }
        }
        for stop in &gradient.color_stops {
            out.push_str(&format!(
                "<stop offset=\"{:.1}%\" stop-color=\"{}\" stop-opacity=\"{:.3}\"/>",
                stop.offset.clamp(0.0, 1.0) * 100.0,
                stop.color.to_opaque_css(),
                stop.color.opacity()
            ));
        }
        out.push_str(match gradient.kind {
            GradientKind::Linear => "</linearGradient></defs>",
            GradientKind::Radial => "</radialGradient></defs>",
        });
        format!("url(#{id})")
    }
}

struct Geometry {
    origin_x: f32,
    origin_y: f32,
    module: f32,
    side: f32,
}

impl Geometry {
    fn cell(&self, x: usize, y: usize) -> Rect {
        self.cell_span(x, y, 1)
    }

    fn cell_span(&self, x: usize, y: usize, span: usize) -> Rect {
        Rect {
            x: self.origin_x + x as f32 * self.module,
            y: self.origin_y + y as f32 * self.module,
            width: span as f32 * self.module,
            height: span as f32 * self.module,
        }
    }
}

struct LogoArea {
    image: Rect,
    /// Image area grown by the logo margin
    clear: Rect,
}

fn inset(rect: &Rect, by: f32) -> Rect {
    Rect {
        x: rect.x + by,
        y: rect.y + by,
        width: rect.width - by * 2.0,
        height: rect.height - by * 2.0,
    }
}

fn intersects(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
}

fn circle_path(cx: f32, cy: f32, r: f32, p: usize) -> String {
    format!(
        "M {:.p$},{:.p$} a {:.p$},{:.p$} 0 1,0 {:.p$},0 a {:.p$},{:.p$} 0 1,0 -{:.p$},0 Z",
        cx - r,
        cy,
        r,
        r,
        r * 2.0,
        r,
        r,
        r * 2.0,
        p = p
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styling::{StylingInput, QrShadow};

    fn paint(styling: &Styling, target: RenderTarget) -> String {
        let matrix = QrMatrix::encode("https://example.com", styling.error_correction_level)
            .unwrap();
        let painter = QrPainter {
            matrix: &matrix,
            styling,
            rect: Rect {
                x: 0.0,
                y: 0.0,
                width: 200.0,
                height: 200.0,
            },
            id_prefix: "qr0".to_string(),
            target,
            precision: 2,
        };
        let mut out = String::new();
        painter.paint(&mut out);
        out
    }

    #[test]
    fn test_matrix_finders() {
        let matrix = QrMatrix::encode("hello", ErrorCorrectionLevel::Medium).unwrap();
        assert_eq!(matrix.width(), 21);
        // Finder corners are always dark
        assert!(matrix.is_dark(0, 0));
        assert!(matrix.is_dark(20, 0));
        assert!(matrix.is_dark(0, 20));
        assert!(matrix.in_finder(6, 6));
        assert!(matrix.in_finder(14, 0));
        assert!(!matrix.in_finder(14, 14));
        assert!(!matrix.is_dark(21, 0));
    }

    #[test]
    fn test_higher_correction_grows_symbol() {
        let payload = "https://example.com/a/fairly/long/path?with=query";
        let low = QrMatrix::encode(payload, ErrorCorrectionLevel::Low).unwrap();
        let high = QrMatrix::encode(payload, ErrorCorrectionLevel::High).unwrap();
        assert!(high.width() > low.width());
    }

    #[test]
    fn test_oversized_payload_fails() {
        let payload = "x".repeat(5000);
        let err = QrMatrix::encode(&payload, ErrorCorrectionLevel::High).unwrap_err();
        assert_eq!(err.len, 5000);
    }

    #[test]
    fn test_paint_uses_colors() {
        let styling = StylingInput {
            foreground_color: Color::parse("#336699"),
            ..Default::default()
        }
        .resolve();
        let svg = paint(&styling, RenderTarget::Preview);
        assert!(svg.contains("fill=\"#336699\""));
        assert!(svg.contains("fill=\"#ffffff\""));
        assert!(svg.contains("fill-rule=\"evenodd\""));
    }

    #[test]
    fn test_paint_gradient_and_circle() {
        let styling: StylingInput = serde_json::from_str(
            r##"{
                "shape": "circle",
                "dotStyle": "dots",
                "rotation": 90,
                "dotsGradient": {
                    "type": "linear",
                    "rotation": 45,
                    "colorStops": [
                        { "offset": 0, "color": "#ff0000" },
                        { "offset": 1, "color": "#0000ff" }
                    ]
                }
            }"##,
        )
        .unwrap();
        let svg = paint(&styling.resolve(), RenderTarget::Preview);
        assert!(svg.contains("<linearGradient id=\"qr0-dots\""));
        assert!(svg.contains("fill=\"url(#qr0-dots)\""));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("rotate(90.00 100.00 100.00)"));
    }

    #[test]
    fn test_shadow_only_in_preview() {
        let styling = StylingInput {
            shadow: Some(QrShadow::Large),
            ..Default::default()
        }
        .resolve();
        assert!(paint(&styling, RenderTarget::Preview).contains("feDropShadow"));
        assert!(!paint(&styling, RenderTarget::Export).contains("feDropShadow"));
    }

    #[test]
    fn test_logo_hides_background_dots() {
        let base = StylingInput {
            image: Some("https://cdn.example.com/logo.png".to_string()),
            ..Default::default()
        };
        let hidden = base.resolve().for_render();
        let mut shown = hidden.clone();
        shown.image_options.hide_background_dots = false;

        let with_hidden = paint(&hidden, RenderTarget::Export);
        let with_shown = paint(&shown, RenderTarget::Export);
        assert!(with_hidden.contains("xlink:href=\"https://cdn.example.com/logo.png\""));
        assert!(with_hidden.len() < with_shown.len());
    }
}
