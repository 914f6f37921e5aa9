//! Element tree and CSS-like value types.
//!
//! Cards are lowered to this tree in code and handed to layout. It models
//! the slice of flexbox a card needs: plain blocks, flex stacks, text and
//! QR symbols.

use serde::{Deserialize, Serialize};

use crate::styling::Styling;
use crate::template::EditTarget;

#[derive(Debug, Clone)]
pub enum Element {
    /// Block container, used for dividers and shadow gutters
    Box {
        style: BoxStyle,
        children: Vec<Element>,
    },
    /// Flex container
    Flex {
        style: FlexStyle,
        children: Vec<Element>,
    },
    Text {
        content: String,
        style: TextStyle,
        /// Set when the text can be edited inline.
        edit_target: Option<EditTarget>,
    },
    /// Styled QR symbol occupying a `size` x `size` square
    Qr {
        payload: String,
        styling: std::boxed::Box<Styling>,
        size: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Px(f32),
    /// Percentage of the containing block, 0 to 100
    Percent(f32),
}

/// Margin or padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spacing {
    Uniform(f32),
    Axes { vertical: f32, horizontal: f32 },
}

impl Default for Spacing {
    fn default() -> Self {
        Spacing::Uniform(0.0)
    }
}

impl Spacing {
    /// Edges in `[top, right, bottom, left]` order.
    pub fn to_edges(self) -> [f32; 4] {
        match self {
            Spacing::Uniform(v) => [v; 4],
            Spacing::Axes {
                vertical,
                horizontal,
            } => [vertical, horizontal, vertical, horizontal],
        }
    }
}

/// An sRGB color with straight alpha.
///
/// Parses `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`/`rgba()` and a few names.
/// Serializes to the lossless hex form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// SVG paint value: hex when opaque, `none` when fully transparent.
    pub fn to_css(&self) -> String {
        match self.a {
            255 => self.to_opaque_css(),
            0 => "none".to_string(),
            _ => format!(
                "rgba({},{},{},{:.3})",
                self.r,
                self.g,
                self.b,
                self.opacity()
            ),
        }
    }

    /// Lossless hex form (`#rrggbb`, or `#rrggbbaa` when not opaque).
    pub fn to_hex(&self) -> String {
        let mut hex = self.to_opaque_css();
        if self.a != 255 {
            hex.push_str(&format!("{:02x}", self.a));
        }
        hex
    }

    /// Color without alpha, for attributes that take opacity separately.
    pub fn to_opaque_css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::from_hex_digits(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::from_rgb_args(args);
        }
        Self::named(&lower)
    }

    fn from_hex_digits(hex: &str) -> Option<Self> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let mut channels = hex.chars().filter_map(|c| c.to_digit(16)).map(|d| d as u8 * 17);
                Some(Self::rgb(channels.next()?, channels.next()?, channels.next()?))
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }

    fn from_rgb_args(args: &str) -> Option<Self> {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        let (r, g, b, alpha) = match parts.as_slice() {
            [r, g, b] => (r, g, b, None),
            [r, g, b, a] => (r, g, b, Some(a)),
            _ => return None,
        };
        let a = match alpha {
            Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0) as u8,
            None => 255,
        };
        Some(Self {
            r: r.parse().ok()?,
            g: g.parse().ok()?,
            b: b.parse().ok()?,
            a,
        })
    }

    fn named(name: &str) -> Option<Self> {
        Some(match name {
            "transparent" => Self::TRANSPARENT,
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            _ => return None,
        })
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color: {}", s)))
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

/// Main-axis placement of flex children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JustifyContent {
    #[default]
    Start,
    Center,
}

/// Cross-axis placement of flex children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    Center,
    #[default]
    Stretch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

/// Direction of a two-color card gradient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradientDirection {
    #[default]
    ToBottom,
    ToTop,
    ToRight,
    ToLeft,
    ToBottomRight,
    ToBottomLeft,
}

impl GradientDirection {
    /// Gradient vector in objectBoundingBox units: (x1, y1, x2, y2).
    pub fn vector(self) -> (f32, f32, f32, f32) {
        match self {
            GradientDirection::ToBottom => (0.0, 0.0, 0.0, 1.0),
            GradientDirection::ToTop => (0.0, 1.0, 0.0, 0.0),
            GradientDirection::ToRight => (0.0, 0.0, 1.0, 0.0),
            GradientDirection::ToLeft => (1.0, 0.0, 0.0, 0.0),
            GradientDirection::ToBottomRight => (0.0, 0.0, 1.0, 1.0),
            GradientDirection::ToBottomLeft => (1.0, 0.0, 0.0, 1.0),
        }
    }
}

/// Card drop shadow strength.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowIntensity {
    #[default]
    None,
    Light,
    Medium,
    Strong,
}

impl ShadowIntensity {
    /// (offset-y, blur std-deviation, opacity); `None` draws nothing.
    pub fn params(self) -> Option<(f32, f32, f32)> {
        match self {
            ShadowIntensity::None => None,
            ShadowIntensity::Light => Some((2.0, 3.0, 0.12)),
            ShadowIntensity::Medium => Some((4.0, 6.0, 0.2)),
            ShadowIntensity::Strong => Some((8.0, 12.0, 0.3)),
        }
    }

    /// Room needed around a shadowed box so the blur is not cut off.
    pub fn spread(self) -> f32 {
        self.params()
            .map(|(dy, blur, _)| dy + blur * 2.0)
            .unwrap_or(0.0)
    }
}

/// Background motif drawn behind card content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecorativeStyle {
    #[default]
    None,
    Circles,
    Dots,
    Lines,
    Geometric,
}

/// A two-color linear fill for container backgrounds.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFill {
    pub from: Color,
    pub to: Color,
    pub direction: GradientDirection,
}

/// CSS font weight, 100 to 900. Accepts `"normal"` and `"bold"` as well as
/// numbers when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: Self = Self(400);
    pub const SEMIBOLD: Self = Self(600);
    pub const BOLD: Self = Self(700);
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl<'de> Deserialize<'de> for FontWeight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u16),
            Keyword(String),
        }

        let keyword = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => return Ok(FontWeight(n)),
            Raw::Keyword(k) => k,
        };
        match keyword.to_ascii_lowercase().as_str() {
            "normal" => Ok(FontWeight::NORMAL),
            "bold" => Ok(FontWeight::BOLD),
            other => other
                .parse()
                .map(FontWeight)
                .map_err(|_| serde::de::Error::custom(format!("invalid font weight: {}", keyword))),
        }
    }
}

impl Serialize for FontWeight {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u16(self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoxStyle {
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub margin: Option<Spacing>,
    pub padding: Option<Spacing>,
    pub background_color: Option<Color>,
    pub opacity: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct FlexStyle {
    pub width: Option<Dimension>,
    pub padding: Option<Spacing>,

    pub flex_direction: Option<FlexDirection>,
    pub justify_content: Option<JustifyContent>,
    pub align_items: Option<AlignItems>,
    pub gap: Option<f32>,

    pub background_color: Option<Color>,
    pub background_gradient: Option<LinearFill>,
    pub border_width: Option<f32>,
    pub border_color: Option<Color>,
    pub border_radius: Option<f32>,
    pub shadow: Option<ShadowIntensity>,
    pub decoration: Option<DecorativeStyle>,
    pub decoration_color: Option<Color>,
}

#[derive(Debug, Clone, Default)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<FontWeight>,
    pub text_align: Option<TextAlign>,
    pub color: Option<Color>,
    pub letter_spacing: Option<f32>,
    pub italic: Option<bool>,
    pub opacity: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse(" #000000 "), Some(Color::BLACK));
        assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("RGBA(0, 0, 255, 0.5)").map(|c| c.a), Some(127));
        assert_eq!(Color::parse("Grey"), Some(Color::rgb(128, 128, 128)));
        assert!(Color::parse("#12345").is_none());
        assert!(Color::parse("#ggg").is_none());
        assert!(Color::parse("rgb(1, 2)").is_none());
        assert!(Color::parse("chartreuse-ish").is_none());
    }

    #[test]
    fn test_color_hex_is_lossless() {
        let c = Color { r: 10, g: 20, b: 30, a: 127 };
        assert_eq!(c.to_hex(), "#0a141e7f");
        assert_eq!(Color::parse(&c.to_hex()), Some(c));
        assert_eq!(Color::TRANSPARENT.to_css(), "none");

        let json = serde_json::to_string(&Color::rgb(255, 0, 0)).unwrap();
        assert_eq!(json, "\"#ff0000\"");
    }

    #[test]
    fn test_font_weight_keywords() {
        let weights: Vec<FontWeight> = serde_json::from_str(r#"["bold", 300, "normal", "600"]"#).unwrap();
        assert_eq!(
            weights,
            vec![FontWeight::BOLD, FontWeight(300), FontWeight::NORMAL, FontWeight::SEMIBOLD]
        );
        assert!(serde_json::from_str::<FontWeight>(r#""heavy""#).is_err());
    }

    #[test]
    fn test_spacing_edges() {
        assert_eq!(Spacing::Uniform(10.0).to_edges(), [10.0; 4]);
        assert_eq!(
            Spacing::Axes {
                vertical: 10.0,
                horizontal: 20.0
            }
            .to_edges(),
            [10.0, 20.0, 10.0, 20.0]
        );
    }

    #[test]
    fn test_shadow_spread() {
        assert_eq!(ShadowIntensity::None.spread(), 0.0);
        assert!(ShadowIntensity::Strong.spread() > ShadowIntensity::Light.spread());
    }
}
