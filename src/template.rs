//! Card template schema.
//!
//! A template is either absent (plain QR) or fully specified. Unlike
//! [`crate::styling::StylingInput`] there is no partial form.

use serde::{Deserialize, Serialize};

use crate::element::{Color, FontWeight};

pub use crate::element::{DecorativeStyle, GradientDirection, ShadowIntensity};

/// Placement of the QR block relative to the text block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrPosition {
    Top,
    #[default]
    Center,
    Bottom,
    Left,
    Right,
}

/// Text slots that support inline editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditTarget {
    Title,
    Subtitle,
}

impl EditTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            EditTarget::Title => "title",
            EditTarget::Subtitle => "subtitle",
        }
    }
}

/// A primary text slot with its own typography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextField {
    pub text: String,
    pub font_size: f32,
    pub font_weight: FontWeight,
    #[serde(default)]
    pub letter_spacing: f32,
    /// Overrides the template text color when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldKind {
    Text,
    Date,
    Time,
    Divider,
}

/// Per-field style for custom card elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldStyle {
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub color: Option<Color>,
    pub letter_spacing: f32,
    pub opacity: f32,
    pub italic: bool,
    pub background_color: Option<Color>,
    pub border_radius: f32,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            font_weight: FontWeight::NORMAL,
            color: None,
            letter_spacing: 0.0,
            opacity: 1.0,
            italic: false,
            background_color: None,
            border_radius: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CustomFieldKind,
    /// Text, or the formatted date/time. Ignored for dividers.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub style: FieldStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtaButton {
    pub text: String,
    pub background_color: Color,
    pub text_color: Color,
    #[serde(default)]
    pub border_radius: f32,
}

/// Card surrounding a QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub title: TextField,
    pub subtitle: TextField,
    pub background_color: Color,
    pub text_color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_color: Option<Color>,
    #[serde(default)]
    pub gradient_direction: GradientDirection,
    pub qr_position: QrPosition,
    pub border_radius: f32,
    pub padding: f32,
    pub show_border: bool,
    #[serde(default)]
    pub border_width: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    pub shadow_intensity: ShadowIntensity,
    pub decorative_style: DecorativeStyle,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_button: Option<CtaButton>,
}

impl Default for Template {
    /// The starter card offered by a new creation session.
    fn default() -> Self {
        Self {
            title: TextField {
                text: "Scan me".to_string(),
                font_size: 24.0,
                font_weight: FontWeight::BOLD,
                letter_spacing: 0.0,
                color: None,
            },
            subtitle: TextField {
                text: "Point your camera at the code".to_string(),
                font_size: 14.0,
                font_weight: FontWeight::NORMAL,
                letter_spacing: 0.0,
                color: None,
            },
            background_color: Color::WHITE,
            text_color: Color::rgb(0x1f, 0x29, 0x37),
            gradient_color: None,
            gradient_direction: GradientDirection::ToBottom,
            qr_position: QrPosition::Center,
            border_radius: 16.0,
            padding: 24.0,
            show_border: false,
            border_width: 0.0,
            border_color: None,
            shadow_intensity: ShadowIntensity::Medium,
            decorative_style: DecorativeStyle::None,
            custom_fields: Vec::new(),
            cta_button: None,
        }
    }
}

impl Template {
    pub fn field(&self, target: EditTarget) -> &TextField {
        match target {
            EditTarget::Title => &self.title,
            EditTarget::Subtitle => &self.subtitle,
        }
    }

    pub fn field_mut(&mut self, target: EditTarget) -> &mut TextField {
        match target {
            EditTarget::Title => &mut self.title,
            EditTarget::Subtitle => &mut self.subtitle,
        }
    }

    /// Effective color of a text slot.
    pub fn text_color_of(&self, target: EditTarget) -> Color {
        self.field(target)
            .color
            .clone()
            .unwrap_or_else(|| self.text_color.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_requires_core_fields() {
        let missing_title = r##"{ "backgroundColor": "#fff" }"##;
        assert!(serde_json::from_str::<Template>(missing_title).is_err());
    }

    #[test]
    fn test_template_json_round_trip() {
        let mut template = Template::default();
        template.qr_position = QrPosition::Left;
        template.decorative_style = DecorativeStyle::Geometric;
        template.custom_fields.push(CustomField {
            id: "f1".to_string(),
            kind: CustomFieldKind::Date,
            value: "2026-10-19".to_string(),
            style: FieldStyle {
                italic: true,
                ..Default::default()
            },
        });
        template.cta_button = Some(CtaButton {
            text: "Visit".to_string(),
            background_color: Color::BLACK,
            text_color: Color::WHITE,
            border_radius: 8.0,
        });

        let json = serde_json::to_string(&template).unwrap();
        assert!(json.contains("\"qrPosition\":\"left\""));
        assert!(json.contains("\"decorativeStyle\":\"geometric\""));
        let back: Template = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);
    }

    #[test]
    fn test_text_color_override() {
        let mut template = Template::default();
        assert_eq!(template.text_color_of(EditTarget::Title), template.text_color);
        template.subtitle.color = Some(Color::rgb(255, 0, 0));
        assert_eq!(
            template.text_color_of(EditTarget::Subtitle),
            Color::rgb(255, 0, 0)
        );
    }
}
