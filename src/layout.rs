//! Flexbox layout of an element tree.
//!
//! Each element becomes a Taffy node. Text leaves carry a [`TextContext`] so
//! Taffy can ask the text engine for their size; QR symbols are fixed
//! squares. Visual properties that layout ignores are kept per node in
//! [`NodeData`] for the render pass.

use std::collections::HashMap;

use taffy::prelude::*;
use taffy::style::Style;

use crate::element::{
    self, BoxStyle, Color, DecorativeStyle, Element, FlexStyle, LinearFill, ShadowIntensity,
    Spacing, TextAlign, TextStyle,
};
use crate::qr::EncodeError;
use crate::styling::Styling;
use crate::template::EditTarget;
use crate::text::TextLayoutEngine;

pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";
pub const DEFAULT_FONT_SIZE: f32 = 16.0;
pub const LINE_HEIGHT: f32 = 1.2;

/// What the measure callback needs to size a text leaf.
#[derive(Debug, Clone)]
pub struct TextContext {
    pub content: String,
    pub style: TextStyleResolved,
}

pub struct LayoutResult {
    pub tree: TaffyTree<TextContext>,
    pub root: NodeId,
    pub nodes: HashMap<NodeId, NodeData>,
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub visual: VisualStyle,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Box or flex container; children are drawn in order
    Container,
    Text {
        content: String,
        style: TextStyleResolved,
        edit_target: Option<EditTarget>,
    },
    Qr {
        payload: String,
        styling: std::boxed::Box<Styling>,
    },
}

/// Text style with every default filled in.
#[derive(Debug, Clone)]
pub struct TextStyleResolved {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub line_height: f32,
    pub text_align: TextAlign,
    pub color: Color,
    pub letter_spacing: f32,
    pub italic: bool,
    pub opacity: f32,
}

impl TextStyleResolved {
    fn resolve(style: &TextStyle, default_family: &str) -> Self {
        Self {
            font_family: style
                .font_family
                .clone()
                .unwrap_or_else(|| default_family.to_string()),
            font_size: style.font_size.unwrap_or(DEFAULT_FONT_SIZE),
            font_weight: style.font_weight.unwrap_or_default().0,
            line_height: LINE_HEIGHT,
            text_align: style.text_align.unwrap_or_default(),
            color: style.color.clone().unwrap_or(Color::BLACK),
            letter_spacing: style.letter_spacing.unwrap_or(0.0),
            italic: style.italic.unwrap_or(false),
            opacity: style.opacity.unwrap_or(1.0).clamp(0.0, 1.0),
        }
    }
}

impl Default for TextStyleResolved {
    fn default() -> Self {
        Self::resolve(&TextStyle::default(), DEFAULT_FONT_FAMILY)
    }
}

/// Paint properties of a node, read by the render pass.
#[derive(Debug, Clone)]
pub struct VisualStyle {
    pub background_color: Option<Color>,
    pub background_gradient: Option<LinearFill>,
    pub border_width: f32,
    pub border_color: Option<Color>,
    /// Corner radii, clockwise from top-left
    pub border_radius: [f32; 4],
    pub opacity: f32,
    pub shadow: ShadowIntensity,
    pub decoration: DecorativeStyle,
    pub decoration_color: Option<Color>,
}

impl Default for VisualStyle {
    fn default() -> Self {
        Self {
            background_color: None,
            background_gradient: None,
            border_width: 0.0,
            border_color: None,
            border_radius: [0.0; 4],
            opacity: 1.0,
            shadow: ShadowIntensity::None,
            decoration: DecorativeStyle::None,
            decoration_color: None,
        }
    }
}

impl From<&BoxStyle> for VisualStyle {
    fn from(style: &BoxStyle) -> Self {
        Self {
            background_color: style.background_color.clone(),
            opacity: style.opacity.unwrap_or(1.0).clamp(0.0, 1.0),
            ..Default::default()
        }
    }
}

impl From<&FlexStyle> for VisualStyle {
    fn from(style: &FlexStyle) -> Self {
        Self {
            background_color: style.background_color.clone(),
            background_gradient: style.background_gradient.clone(),
            border_width: style.border_width.unwrap_or(0.0),
            border_color: style.border_color.clone(),
            border_radius: [style.border_radius.unwrap_or(0.0); 4],
            opacity: 1.0,
            shadow: style.shadow.unwrap_or_default(),
            decoration: style.decoration.unwrap_or_default(),
            decoration_color: style.decoration_color.clone(),
        }
    }
}

/// Owns the text engine so fonts registered once serve both measurement
/// and the render pass.
pub struct LayoutEngine {
    pub text_engine: TextLayoutEngine,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self {
            text_engine: TextLayoutEngine::new(),
        }
    }

    /// Lay out `element` within `viewport_width`; height grows to fit when
    /// `viewport_height` is `None`.
    pub fn compute_layout(
        &mut self,
        element: &Element,
        viewport_width: f32,
        viewport_height: Option<f32>,
        default_font_family: Option<&str>,
    ) -> Result<LayoutResult, LayoutError> {
        let mut builder = TreeBuilder {
            tree: TaffyTree::new(),
            nodes: HashMap::new(),
            font_family: default_font_family.unwrap_or(DEFAULT_FONT_FAMILY),
        };
        let root = builder.add(element)?;
        let TreeBuilder {
            mut tree, nodes, ..
        } = builder;

        let available = Size {
            width: AvailableSpace::Definite(viewport_width),
            height: viewport_height.map_or(AvailableSpace::MaxContent, AvailableSpace::Definite),
        };
        let text_engine = &mut self.text_engine;
        tree.compute_layout_with_measure(root, available, |known, space, _, context, _| {
            measure_text(known, space, context, text_engine)
        })?;

        tracing::trace!(nodes = nodes.len(), "computed layout");

        Ok(LayoutResult { tree, root, nodes })
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

struct TreeBuilder<'a> {
    tree: TaffyTree<TextContext>,
    nodes: HashMap<NodeId, NodeData>,
    font_family: &'a str,
}

impl TreeBuilder<'_> {
    fn add(&mut self, element: &Element) -> Result<NodeId, LayoutError> {
        let (id, data) = match element {
            Element::Box { style, children } => {
                let children = self.add_all(children)?;
                let id = self.tree.new_with_children(block_style(style), &children)?;
                (id, NodeData {
                    kind: NodeKind::Container,
                    visual: VisualStyle::from(style),
                })
            }
            Element::Flex { style, children } => {
                let children = self.add_all(children)?;
                let id = self.tree.new_with_children(flex_style(style), &children)?;
                (id, NodeData {
                    kind: NodeKind::Container,
                    visual: VisualStyle::from(style),
                })
            }
            Element::Text {
                content,
                style,
                edit_target,
            } => {
                let resolved = TextStyleResolved::resolve(style, self.font_family);
                let context = TextContext {
                    content: content.clone(),
                    style: resolved.clone(),
                };
                let id = self.tree.new_leaf_with_context(Style::default(), context)?;
                (id, NodeData {
                    kind: NodeKind::Text {
                        content: content.clone(),
                        style: resolved,
                        edit_target: *edit_target,
                    },
                    visual: VisualStyle::default(),
                })
            }
            Element::Qr {
                payload,
                styling,
                size,
            } => {
                let style = Style {
                    size: Size {
                        width: length(*size),
                        height: length(*size),
                    },
                    flex_shrink: 0.0,
                    ..Default::default()
                };
                let id = self.tree.new_leaf(style)?;
                (id, NodeData {
                    kind: NodeKind::Qr {
                        payload: payload.clone(),
                        styling: styling.clone(),
                    },
                    visual: VisualStyle::default(),
                })
            }
        };
        self.nodes.insert(id, data);
        Ok(id)
    }

    fn add_all(&mut self, children: &[Element]) -> Result<Vec<NodeId>, LayoutError> {
        children.iter().map(|child| self.add(child)).collect()
    }
}

fn measure_text(
    known: Size<Option<f32>>,
    available: Size<AvailableSpace>,
    context: Option<&mut TextContext>,
    engine: &mut TextLayoutEngine,
) -> Size<f32> {
    let Some(ctx) = context else {
        return Size::ZERO;
    };
    if let (Some(width), Some(height)) = (known.width, known.height) {
        return Size { width, height };
    }
    let max_width = match available.width {
        AvailableSpace::Definite(w) => Some(w),
        AvailableSpace::MinContent => Some(0.0),
        AvailableSpace::MaxContent => None,
    };
    // Taffy rounds boxes to whole pixels; rounding down would make the
    // render pass wrap text that fit when measured.
    let size = engine.measure(&ctx.content, &ctx.style, max_width);
    Size {
        width: size.width.ceil(),
        height: size.height.ceil(),
    }
}

fn block_style(style: &BoxStyle) -> Style {
    Style {
        display: taffy::Display::Block,
        size: Size {
            width: dimension(style.width),
            height: dimension(style.height),
        },
        margin: edges(style.margin, LengthPercentageAuto::length),
        padding: edges(style.padding, LengthPercentage::length),
        flex_shrink: 0.0,
        ..Default::default()
    }
}

fn flex_style(style: &FlexStyle) -> Style {
    let gap = length(style.gap.unwrap_or(0.0));
    Style {
        display: taffy::Display::Flex,
        size: Size {
            width: dimension(style.width),
            height: taffy::Dimension::auto(),
        },
        padding: edges(style.padding, LengthPercentage::length),
        border: edges(style.border_width.map(Spacing::Uniform), LengthPercentage::length),
        flex_direction: match style.flex_direction.unwrap_or_default() {
            element::FlexDirection::Row => taffy::FlexDirection::Row,
            element::FlexDirection::Column => taffy::FlexDirection::Column,
        },
        justify_content: Some(match style.justify_content.unwrap_or_default() {
            element::JustifyContent::Start => taffy::JustifyContent::FlexStart,
            element::JustifyContent::Center => taffy::JustifyContent::Center,
        }),
        align_items: Some(match style.align_items.unwrap_or_default() {
            element::AlignItems::Start => taffy::AlignItems::FlexStart,
            element::AlignItems::Center => taffy::AlignItems::Center,
            element::AlignItems::Stretch => taffy::AlignItems::Stretch,
        }),
        gap: Size {
            width: gap,
            height: gap,
        },
        ..Default::default()
    }
}

fn dimension(dim: Option<element::Dimension>) -> taffy::Dimension {
    match dim {
        None => taffy::Dimension::auto(),
        Some(element::Dimension::Px(px)) => taffy::Dimension::length(px),
        Some(element::Dimension::Percent(pct)) => taffy::Dimension::percent(pct / 100.0),
    }
}

fn edges<T>(spacing: Option<Spacing>, unit: fn(f32) -> T) -> taffy::Rect<T> {
    let [top, right, bottom, left] = spacing.unwrap_or_default().to_edges();
    taffy::Rect {
        top: unit(top),
        right: unit(right),
        bottom: unit(bottom),
        left: unit(left),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Taffy error: {0}")]
    Taffy(#[from] taffy::TaffyError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BoxStyle, Dimension, FlexDirection};

    #[test]
    fn test_column_stacks_children() {
        let element = Element::Flex {
            style: FlexStyle {
                flex_direction: Some(FlexDirection::Column),
                padding: Some(Spacing::Uniform(10.0)),
                gap: Some(8.0),
                ..Default::default()
            },
            children: vec![
                Element::Qr {
                    payload: "hello".to_string(),
                    styling: std::boxed::Box::new(Styling::default()),
                    size: 100.0,
                },
                Element::Text {
                    content: "Scan".to_string(),
                    style: TextStyle {
                        font_size: Some(20.0),
                        ..Default::default()
                    },
                    edit_target: Some(EditTarget::Title),
                },
            ],
        };

        let mut engine = LayoutEngine::new();
        let result = engine.compute_layout(&element, 300.0, None, None).unwrap();
        let root = result.tree.layout(result.root).unwrap();
        // padding + qr + gap + at least one text line + padding
        assert!(root.size.height >= 10.0 + 100.0 + 8.0 + 20.0 + 10.0);

        let texts: Vec<_> = result
            .nodes
            .values()
            .filter_map(|d| match &d.kind {
                NodeKind::Text {
                    edit_target, style, ..
                } => Some((*edit_target, style.font_family.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec![(Some(EditTarget::Title), "sans-serif".to_string())]);
    }

    #[test]
    fn test_text_box_fits_its_measured_line() {
        let element = Element::Flex {
            style: FlexStyle::default(),
            children: vec![Element::Text {
                content: "Order now".to_string(),
                style: TextStyle {
                    font_size: Some(14.0),
                    ..Default::default()
                },
                edit_target: None,
            }],
        };

        let mut engine = LayoutEngine::new();
        let result = engine.compute_layout(&element, 300.0, None, None).unwrap();
        let (id, content, style) = result
            .nodes
            .iter()
            .find_map(|(id, d)| match &d.kind {
                NodeKind::Text { content, style, .. } => Some((*id, content.clone(), style.clone())),
                _ => None,
            })
            .unwrap();
        let width = result.tree.layout(id).unwrap().size.width;
        assert_eq!(width, width.ceil());

        let lines = engine.text_engine.layout(&content, &style, width).lines;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Order now");
    }

    #[test]
    fn test_percent_width_and_margin() {
        let divider = Element::Box {
            style: BoxStyle {
                width: Some(Dimension::Percent(100.0)),
                height: Some(Dimension::Px(1.0)),
                margin: Some(Spacing::Axes {
                    vertical: 4.0,
                    horizontal: 0.0,
                }),
                ..Default::default()
            },
            children: vec![],
        };
        let element = Element::Flex {
            style: FlexStyle {
                flex_direction: Some(FlexDirection::Column),
                width: Some(Dimension::Px(200.0)),
                ..Default::default()
            },
            children: vec![divider],
        };

        let mut engine = LayoutEngine::new();
        let result = engine.compute_layout(&element, 400.0, None, None).unwrap();
        let root = result.tree.layout(result.root).unwrap();
        assert_eq!(root.size.width, 200.0);
        assert_eq!(root.size.height, 9.0);

        let child = result.tree.children(result.root).unwrap()[0];
        let line = result.tree.layout(child).unwrap();
        assert_eq!(line.size.width, 200.0);
        assert_eq!(line.location.y, 4.0);
    }
}
