//! QR styling schema and default resolution.
//!
//! Stored styling objects predate some of the fields below, so they arrive as
//! [`StylingInput`] with every field optional. [`StylingInput::resolve`] is the
//! only place that reads a field without a fallback; renderers take the
//! complete [`Styling`] it returns.

use serde::{Deserialize, Serialize};

use crate::content::is_renderable_image_ref;
use crate::element::Color;

/// Largest logo edge as a fraction of the code size at render time.
pub const MAX_LOGO_FRACTION: f32 = 0.25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCorrectionLevel {
    #[serde(rename = "L", alias = "low")]
    Low,
    #[default]
    #[serde(rename = "M", alias = "medium")]
    Medium,
    #[serde(rename = "Q", alias = "quartile")]
    Quartile,
    #[serde(rename = "H", alias = "high")]
    High,
}

impl ErrorCorrectionLevel {
    pub fn to_ec_level(self) -> qrcode::EcLevel {
        match self {
            ErrorCorrectionLevel::Low => qrcode::EcLevel::L,
            ErrorCorrectionLevel::Medium => qrcode::EcLevel::M,
            ErrorCorrectionLevel::Quartile => qrcode::EcLevel::Q,
            ErrorCorrectionLevel::High => qrcode::EcLevel::H,
        }
    }
}

/// Shape of the data modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DotStyle {
    #[default]
    Square,
    Dots,
    Rounded,
    ExtraRounded,
    Classy,
    ClassyRounded,
}

/// Shape of the 7x7 finder rings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerSquareType {
    #[default]
    Square,
    Dot,
    ExtraRounded,
}

/// Shape of the 3x3 finder centers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerDotType {
    #[default]
    Square,
    Dot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrShape {
    #[default]
    Square,
    Circle,
}

/// Preview-only drop shadow under the code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrShadow {
    #[default]
    None,
    Small,
    Medium,
    Large,
}

impl QrShadow {
    /// (offset-y, blur std-deviation, opacity).
    pub fn params(self) -> Option<(f32, f32, f32)> {
        match self {
            QrShadow::None => None,
            QrShadow::Small => Some((1.0, 2.0, 0.15)),
            QrShadow::Medium => Some((3.0, 4.0, 0.2)),
            QrShadow::Large => Some((6.0, 8.0, 0.25)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorStop {
    /// Position along the gradient, 0..=1
    pub offset: f32,
    pub color: Color,
}

/// Gradient that replaces a flat fill when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    #[serde(rename = "type", default)]
    pub kind: GradientKind,
    /// Rotation in degrees (linear gradients only)
    #[serde(default)]
    pub rotation: f32,
    pub color_stops: Vec<ColorStop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CornerSquareStyle {
    #[serde(rename = "type")]
    pub kind: CornerSquareType,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CornerDotStyle {
    #[serde(rename = "type")]
    pub kind: CornerDotType,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptions {
    /// Logo edge as a fraction of the code size
    pub image_size: f32,
    /// Clear space around the logo, in pixels
    pub margin: u32,
    pub hide_background_dots: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            image_size: 0.4,
            margin: 4,
            hide_background_dots: true,
        }
    }
}

/// Fully resolved styling. Produced by [`StylingInput::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Styling {
    pub foreground_color: Color,
    pub background_color: Color,
    pub size: u32,
    pub error_correction_level: ErrorCorrectionLevel,
    pub include_margin: bool,
    pub margin_size: u32,
    pub dot_style: DotStyle,
    pub corner_square_style: CornerSquareStyle,
    pub corner_dot_style: CornerDotStyle,
    pub dots_gradient: Option<Gradient>,
    pub background_gradient: Option<Gradient>,
    pub image: Option<String>,
    pub image_options: ImageOptions,
    pub shape: QrShape,
    pub rotation: f32,
    /// Background opacity in percent, 0..=100
    pub bg_opacity: u8,
    pub shadow: QrShadow,
}

impl Default for Styling {
    fn default() -> Self {
        Self {
            foreground_color: Color::BLACK,
            background_color: Color::WHITE,
            size: 256,
            error_correction_level: ErrorCorrectionLevel::Medium,
            include_margin: true,
            margin_size: 16,
            dot_style: DotStyle::Square,
            corner_square_style: CornerSquareStyle {
                kind: CornerSquareType::Square,
                color: Color::BLACK,
            },
            corner_dot_style: CornerDotStyle {
                kind: CornerDotType::Square,
                color: Color::BLACK,
            },
            dots_gradient: None,
            background_gradient: None,
            image: None,
            image_options: ImageOptions::default(),
            shape: QrShape::Square,
            rotation: 0.0,
            bg_opacity: 100,
            shadow: QrShadow::None,
        }
    }
}

impl Styling {
    /// Effective configuration handed to a renderer.
    ///
    /// A renderable logo forces error correction to High and caps the logo at
    /// [`MAX_LOGO_FRACTION`]; an image reference that fails the format check
    /// is dropped. Returns a new value; `self` stays as stored.
    pub fn for_render(&self) -> Styling {
        let mut effective = self.clone();
        effective.image = self
            .image
            .as_deref()
            .map(str::trim)
            .filter(|src| is_renderable_image_ref(src))
            .map(str::to_string);

        if effective.image.is_some() {
            effective.error_correction_level = ErrorCorrectionLevel::High;
            effective.image_options.image_size =
                effective.image_options.image_size.min(MAX_LOGO_FRACTION);
        }
        effective
    }

    /// Quiet-zone width actually drawn, in pixels.
    pub fn effective_margin(&self) -> f32 {
        if self.include_margin {
            self.margin_size as f32
        } else {
            0.0
        }
    }
}

// ============================================================================
// Partial (stored) form
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CornerSquareInput {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CornerSquareType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CornerDotInput {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CornerDotType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageOptionsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_background_dots: Option<bool>,
}

/// Styling as stored: any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StylingInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_correction_level: Option<ErrorCorrectionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_margin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dot_style: Option<DotStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_square_style: Option<CornerSquareInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_dot_style: Option<CornerDotInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dots_gradient: Option<Gradient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_gradient: Option<Gradient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_options: Option<ImageOptionsInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<QrShape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_opacity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<QrShadow>,
}

impl StylingInput {
    /// Fill every missing field with its default.
    ///
    /// Corner colors default to the resolved foreground color rather than a
    /// fixed black. Total and idempotent.
    pub fn resolve(&self) -> Styling {
        let defaults = Styling::default();
        let foreground = self
            .foreground_color
            .clone()
            .unwrap_or(defaults.foreground_color);

        let corner_square = self.corner_square_style.clone().unwrap_or_default();
        let corner_dot = self.corner_dot_style.clone().unwrap_or_default();
        let image_options = self.image_options.clone().unwrap_or_default();

        Styling {
            background_color: self
                .background_color
                .clone()
                .unwrap_or(defaults.background_color),
            size: self.size.unwrap_or(defaults.size),
            error_correction_level: self
                .error_correction_level
                .unwrap_or(defaults.error_correction_level),
            include_margin: self.include_margin.unwrap_or(defaults.include_margin),
            margin_size: self.margin_size.unwrap_or(defaults.margin_size),
            dot_style: self.dot_style.unwrap_or(defaults.dot_style),
            corner_square_style: CornerSquareStyle {
                kind: corner_square.kind.unwrap_or_default(),
                color: corner_square.color.unwrap_or_else(|| foreground.clone()),
            },
            corner_dot_style: CornerDotStyle {
                kind: corner_dot.kind.unwrap_or_default(),
                color: corner_dot.color.unwrap_or_else(|| foreground.clone()),
            },
            dots_gradient: self.dots_gradient.clone(),
            background_gradient: self.background_gradient.clone(),
            image: self.image.clone().filter(|src| !src.trim().is_empty()),
            image_options: ImageOptions {
                image_size: image_options
                    .image_size
                    .unwrap_or(defaults.image_options.image_size)
                    .clamp(0.0, 1.0),
                margin: image_options.margin.unwrap_or(defaults.image_options.margin),
                hide_background_dots: image_options
                    .hide_background_dots
                    .unwrap_or(defaults.image_options.hide_background_dots),
            },
            shape: self.shape.unwrap_or(defaults.shape),
            rotation: self.rotation.unwrap_or(defaults.rotation),
            bg_opacity: self.bg_opacity.unwrap_or(defaults.bg_opacity).min(100),
            shadow: self.shadow.unwrap_or(defaults.shadow),
            foreground_color: foreground,
        }
    }
}

impl From<Styling> for StylingInput {
    fn from(s: Styling) -> Self {
        Self {
            foreground_color: Some(s.foreground_color),
            background_color: Some(s.background_color),
            size: Some(s.size),
            error_correction_level: Some(s.error_correction_level),
            include_margin: Some(s.include_margin),
            margin_size: Some(s.margin_size),
            dot_style: Some(s.dot_style),
            corner_square_style: Some(CornerSquareInput {
                kind: Some(s.corner_square_style.kind),
                color: Some(s.corner_square_style.color),
            }),
            corner_dot_style: Some(CornerDotInput {
                kind: Some(s.corner_dot_style.kind),
                color: Some(s.corner_dot_style.color),
            }),
            dots_gradient: s.dots_gradient,
            background_gradient: s.background_gradient,
            image: s.image,
            image_options: Some(ImageOptionsInput {
                image_size: Some(s.image_options.image_size),
                margin: Some(s.image_options.margin),
                hide_background_dots: Some(s.image_options.hide_background_dots),
            }),
            shape: Some(s.shape),
            rotation: Some(s.rotation),
            bg_opacity: Some(s.bg_opacity),
            shadow: Some(s.shadow),
        }
    }
}
