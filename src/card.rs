//! Lowering a card [`Template`] to an element tree.
//!
//! The card is a flex container whose children are ordered by
//! [`QrPosition`]. Its width is fixed up front so layout never depends on how
//! Taffy sizes an auto-width root.

use crate::element::{
    AlignItems, BoxStyle, Color, Dimension, Element, FlexDirection, FlexStyle, FontWeight,
    JustifyContent, LinearFill, Spacing, TextAlign, TextStyle,
};
use crate::styling::Styling;
use crate::template::{CustomField, CustomFieldKind, EditTarget, QrPosition, Template};

/// Largest QR edge in compact (thumbnail) mode.
pub const COMPACT_QR_MAX: f32 = 120.0;
const COMPACT_TEXT_SCALE: f32 = 0.6;
const COMPACT_PADDING_SCALE: f32 = 0.5;
/// Narrowest text column, before compact scaling.
const TEXT_COLUMN_WIDTH: f32 = 200.0;
const SECTION_GAP: f32 = 16.0;

/// The symbol a card frames.
#[derive(Debug, Clone, PartialEq)]
pub struct CardQr {
    /// String encoded in the symbol
    pub payload: String,
    pub styling: Styling,
    /// Symbol edge in pixels
    pub size: f32,
}

/// How a card is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardMode {
    pub editable: bool,
    /// Thumbnail rendering; overrides `editable`
    pub compact: bool,
}

impl CardMode {
    /// Whether inline editing affordances are shown.
    pub fn editing(self) -> bool {
        self.editable && !self.compact
    }

    pub fn qr_size(self, size: f32) -> f32 {
        if self.compact {
            size.min(COMPACT_QR_MAX)
        } else {
            size
        }
    }

    pub fn text_scale(self) -> f32 {
        if self.compact { COMPACT_TEXT_SCALE } else { 1.0 }
    }

    pub fn padding(self, padding: f32) -> f32 {
        if self.compact {
            padding * COMPACT_PADDING_SCALE
        } else {
            padding
        }
    }
}

fn is_row(position: QrPosition) -> bool {
    matches!(position, QrPosition::Left | QrPosition::Right)
}

fn border_width(template: &Template) -> f32 {
    if template.show_border {
        template.border_width.max(1.0)
    } else {
        0.0
    }
}

/// Outer width of the tree [`build_card`] produces, shadow room included.
pub fn card_width(template: Option<&Template>, qr: &CardQr, mode: CardMode) -> f32 {
    let qr_size = mode.qr_size(qr.size);
    let Some(t) = template else {
        return qr_size;
    };
    let text_column = TEXT_COLUMN_WIDTH * mode.text_scale();
    let inner = if is_row(t.qr_position) {
        qr_size + SECTION_GAP * mode.text_scale() + text_column
    } else {
        qr_size.max(text_column)
    };
    inner + 2.0 * (mode.padding(t.padding) + border_width(t) + t.shadow_intensity.spread())
}

/// Build the element tree for a card. Without a template only the QR symbol
/// is produced.
pub fn build_card(template: Option<&Template>, qr: &CardQr, mode: CardMode) -> Element {
    let symbol = Element::Qr {
        payload: qr.payload.clone(),
        styling: std::boxed::Box::new(qr.styling.clone()),
        size: mode.qr_size(qr.size),
    };
    let Some(t) = template else {
        return symbol;
    };

    let scale = mode.text_scale();
    let row = is_row(t.qr_position);
    let align = if row { TextAlign::Left } else { TextAlign::Center };

    let qr_block = match &t.cta_button {
        None => symbol,
        Some(cta) => Element::Flex {
            style: FlexStyle {
                flex_direction: Some(FlexDirection::Column),
                align_items: Some(AlignItems::Center),
                gap: Some(12.0 * scale),
                ..Default::default()
            },
            children: vec![
                symbol,
                Element::Flex {
                    style: FlexStyle {
                        padding: Some(Spacing::Axes {
                            vertical: 10.0 * scale,
                            horizontal: 20.0 * scale,
                        }),
                        justify_content: Some(JustifyContent::Center),
                        background_color: Some(cta.background_color.clone()),
                        border_radius: Some(cta.border_radius),
                        ..Default::default()
                    },
                    children: vec![Element::Text {
                        content: cta.text.clone(),
                        style: TextStyle {
                            font_size: Some(14.0 * scale),
                            font_weight: Some(FontWeight::SEMIBOLD),
                            color: Some(cta.text_color.clone()),
                            text_align: Some(TextAlign::Center),
                            ..Default::default()
                        },
                        edit_target: None,
                    }],
                },
            ],
        },
    };

    let title = text_slot(t, EditTarget::Title, mode, align);
    let subtitle = text_slot(t, EditTarget::Subtitle, mode, align);
    let extras = t
        .custom_fields
        .iter()
        .map(|field| custom_field(t, field, scale, align));

    let children: Vec<Element> = match t.qr_position {
        QrPosition::Center => title
            .into_iter()
            .chain(Some(qr_block))
            .chain(subtitle)
            .chain(extras)
            .collect(),
        position => {
            let texts: Vec<Element> = title.into_iter().chain(subtitle).chain(extras).collect();
            let text_block = Element::Flex {
                style: FlexStyle {
                    flex_direction: Some(FlexDirection::Column),
                    align_items: Some(if row {
                        AlignItems::Start
                    } else {
                        AlignItems::Center
                    }),
                    width: row.then(|| Dimension::Px(TEXT_COLUMN_WIDTH * scale)),
                    gap: Some(4.0 * scale),
                    ..Default::default()
                },
                children: texts,
            };
            match position {
                QrPosition::Top | QrPosition::Left => vec![qr_block, text_block],
                _ => vec![text_block, qr_block],
            }
        }
    };

    let spread = t.shadow_intensity.spread();
    let width = card_width(template, qr, mode);
    let border = border_width(t);

    let card = Element::Flex {
        style: FlexStyle {
            width: Some(Dimension::Px(width - 2.0 * spread)),
            flex_direction: Some(if row {
                FlexDirection::Row
            } else {
                FlexDirection::Column
            }),
            justify_content: Some(JustifyContent::Center),
            align_items: Some(AlignItems::Center),
            gap: Some(SECTION_GAP * scale),
            padding: Some(Spacing::Uniform(mode.padding(t.padding))),
            background_color: Some(t.background_color.clone()),
            background_gradient: t.gradient_color.as_ref().map(|to| LinearFill {
                from: t.background_color.clone(),
                to: to.clone(),
                direction: t.gradient_direction,
            }),
            border_width: (border > 0.0).then_some(border),
            border_color: Some(
                t.border_color
                    .clone()
                    .unwrap_or_else(|| t.text_color.clone()),
            ),
            border_radius: Some(t.border_radius),
            shadow: Some(t.shadow_intensity),
            decoration: Some(t.decorative_style),
            decoration_color: Some(t.text_color.clone()),
            ..Default::default()
        },
        children,
    };

    if spread > 0.0 {
        // Room for the blur so it is not cut off at the document edge.
        Element::Box {
            style: BoxStyle {
                width: Some(Dimension::Px(width)),
                padding: Some(Spacing::Uniform(spread)),
                ..Default::default()
            },
            children: vec![card],
        }
    } else {
        card
    }
}

fn text_slot(t: &Template, target: EditTarget, mode: CardMode, align: TextAlign) -> Option<Element> {
    let field = t.field(target);
    // An empty slot stays clickable while editing.
    if field.text.trim().is_empty() && !mode.editing() {
        return None;
    }
    let scale = mode.text_scale();
    Some(Element::Text {
        content: field.text.clone(),
        style: TextStyle {
            font_size: Some(field.font_size * scale),
            font_weight: Some(field.font_weight),
            letter_spacing: Some(field.letter_spacing * scale),
            color: Some(t.text_color_of(target)),
            text_align: Some(align),
            ..Default::default()
        },
        edit_target: mode.editing().then_some(target),
    })
}

fn custom_field(t: &Template, field: &CustomField, scale: f32, align: TextAlign) -> Element {
    let style = &field.style;
    let color = style.color.clone().unwrap_or_else(|| t.text_color.clone());

    if field.kind == CustomFieldKind::Divider {
        return Element::Box {
            style: BoxStyle {
                width: Some(Dimension::Percent(100.0)),
                height: Some(Dimension::Px(1.0)),
                margin: Some(Spacing::Axes {
                    vertical: 4.0 * scale,
                    horizontal: 0.0,
                }),
                background_color: Some(color),
                opacity: Some(style.opacity.clamp(0.0, 1.0) * 0.3),
                ..Default::default()
            },
            children: vec![],
        };
    }

    let text = Element::Text {
        content: field.value.clone(),
        style: TextStyle {
            font_size: Some(style.font_size * scale),
            font_weight: Some(style.font_weight),
            color: Some(color),
            letter_spacing: Some(style.letter_spacing * scale),
            italic: Some(style.italic),
            opacity: Some(style.opacity),
            text_align: Some(align),
            ..Default::default()
        },
        edit_target: None,
    };

    match &style.background_color {
        Some(background) if background != &Color::TRANSPARENT => Element::Flex {
            style: FlexStyle {
                padding: Some(Spacing::Axes {
                    vertical: 2.0 * scale,
                    horizontal: 8.0 * scale,
                }),
                background_color: Some(background.clone()),
                border_radius: Some(style.border_radius),
                ..Default::default()
            },
            children: vec![text],
        },
        _ => text,
    }
}
