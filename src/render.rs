//! Render tree generation from layout results.
//!
//! Converts the laid-out Taffy tree into a flat list of render commands
//! that can be converted to SVG.

use taffy::NodeId;

use crate::element::{Color, DecorativeStyle, LinearFill, ShadowIntensity};
use crate::layout::{LayoutError, LayoutResult, NodeKind};
use crate::qr::QrMatrix;
use crate::styling::Styling;
use crate::template::EditTarget;
use crate::text::TextLayoutEngine;

/// Gap between an edited text box and its dashed outline.
const EDIT_OUTLINE_GAP: f32 = 4.0;

/// A rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Render commands that can be converted to SVG.
#[derive(Debug, Clone)]
pub enum RenderCommand {
    /// Draw a filled rectangle
    FillRect {
        rect: Rect,
        color: Color,
        border_radius: [f32; 4],
    },

    /// Draw a rectangle filled with a two-color linear gradient
    FillGradient {
        rect: Rect,
        fill: LinearFill,
        border_radius: [f32; 4],
    },

    /// Draw a stroked rectangle (border, or the dashed edit outline)
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f32,
        border_radius: [f32; 4],
        dashed: bool,
    },

    /// Blurred drop shadow under a container
    Shadow {
        rect: Rect,
        intensity: ShadowIntensity,
        border_radius: [f32; 4],
    },

    /// Background motif, drawn inside the current clip
    Decoration {
        rect: Rect,
        style: DecorativeStyle,
        color: Color,
    },

    /// Draw text as <text> element (selectable)
    Text {
        content: String,
        font_family: String,
        font_size: f32,
        font_weight: u16,
        color: Color,
        letter_spacing: f32,
        italic: bool,
        opacity: f32,
        edit_target: Option<EditTarget>,
        lines: Vec<TextLineRender>,
    },

    /// Draw an encoded QR symbol
    QrCode {
        rect: Rect,
        matrix: QrMatrix,
        styling: std::boxed::Box<Styling>,
    },

    /// Begin a clipping region
    PushClip {
        rect: Rect,
        border_radius: [f32; 4],
    },

    /// End clipping region
    PopClip,

    /// Begin opacity group
    PushOpacity {
        opacity: f32,
    },

    /// End opacity group
    PopOpacity,
}

/// A line of text for rendering.
#[derive(Debug, Clone)]
pub struct TextLineRender {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// The render tree - a flat list of commands in draw order.
#[derive(Debug)]
pub struct RenderTree {
    pub commands: Vec<RenderCommand>,
    pub width: f32,
    pub height: f32,
}

/// Build render tree from layout result.
///
/// `open_editor` marks the text slot whose inline editor is open; it gets a
/// dashed outline.
pub fn build_render_tree(
    layout: &LayoutResult,
    text_engine: &mut TextLayoutEngine,
    open_editor: Option<EditTarget>,
) -> Result<RenderTree, LayoutError> {
    let mut commands = Vec::new();

    let root_layout = layout.tree.layout(layout.root)?;
    let width = root_layout.size.width;
    let height = root_layout.size.height;

    let mut cx = RenderCx {
        layout,
        text_engine,
        open_editor,
        commands: &mut commands,
    };
    cx.render_node(layout.root, 0.0, 0.0)?;

    tracing::trace!(commands = commands.len(), width, height, "built render tree");

    Ok(RenderTree {
        commands,
        width,
        height,
    })
}

struct RenderCx<'a> {
    layout: &'a LayoutResult,
    text_engine: &'a mut TextLayoutEngine,
    open_editor: Option<EditTarget>,
    commands: &'a mut Vec<RenderCommand>,
}

impl RenderCx<'_> {
    fn render_node(&mut self, node_id: NodeId, parent_x: f32, parent_y: f32) -> Result<(), LayoutError> {
        let layout = self.layout;
        let node_layout = layout.tree.layout(node_id)?;

        let x = parent_x + node_layout.location.x;
        let y = parent_y + node_layout.location.y;
        let rect = Rect {
            x,
            y,
            width: node_layout.size.width,
            height: node_layout.size.height,
        };

        let Some(data) = layout.nodes.get(&node_id) else {
            return Ok(());
        };
        let visual = &data.visual;

        let needs_opacity = visual.opacity < 1.0;
        if needs_opacity {
            self.commands.push(RenderCommand::PushOpacity {
                opacity: visual.opacity,
            });
        }

        if visual.shadow != ShadowIntensity::None {
            self.commands.push(RenderCommand::Shadow {
                rect,
                intensity: visual.shadow,
                border_radius: visual.border_radius,
            });
        }

        // Background: a gradient wins over a flat color
        if let Some(fill) = &visual.background_gradient {
            self.commands.push(RenderCommand::FillGradient {
                rect,
                fill: fill.clone(),
                border_radius: visual.border_radius,
            });
        } else if let Some(bg_color) = visual.background_color.as_ref().filter(|c| c.a > 0) {
            self.commands.push(RenderCommand::FillRect {
                rect,
                color: bg_color.clone(),
                border_radius: visual.border_radius,
            });
        }

        if visual.decoration != DecorativeStyle::None {
            let color = visual
                .decoration_color
                .clone()
                .unwrap_or(Color::BLACK);
            self.commands.push(RenderCommand::PushClip {
                rect,
                border_radius: visual.border_radius,
            });
            self.commands.push(RenderCommand::Decoration {
                rect,
                style: visual.decoration,
                color,
            });
            self.commands.push(RenderCommand::PopClip);
        }

        match &data.kind {
            NodeKind::Container => {
                for child_id in layout.tree.children(node_id)? {
                    self.render_node(child_id, x, y)?;
                }
            }

            NodeKind::Text {
                content,
                style,
                edit_target,
            } => {
                let text_layout = self.text_engine.layout(content, style, rect.width);

                let lines = text_layout
                    .lines
                    .iter()
                    .map(|line| TextLineRender {
                        x: x + line.x,
                        y: y + line.baseline,
                        text: line.text.clone(),
                    })
                    .collect();

                self.commands.push(RenderCommand::Text {
                    content: content.clone(),
                    font_family: style.font_family.clone(),
                    font_size: style.font_size,
                    font_weight: style.font_weight,
                    color: style.color.clone(),
                    letter_spacing: style.letter_spacing,
                    italic: style.italic,
                    opacity: style.opacity,
                    edit_target: *edit_target,
                    lines,
                });

                if edit_target.is_some() && *edit_target == self.open_editor {
                    self.commands.push(RenderCommand::StrokeRect {
                        rect: Rect {
                            x: rect.x - EDIT_OUTLINE_GAP,
                            y: rect.y - EDIT_OUTLINE_GAP,
                            width: rect.width + EDIT_OUTLINE_GAP * 2.0,
                            height: rect.height + EDIT_OUTLINE_GAP * 2.0,
                        },
                        color: style.color.clone(),
                        width: 1.0,
                        border_radius: [4.0; 4],
                        dashed: true,
                    });
                }
            }

            NodeKind::Qr { payload, styling } => {
                let styling = styling.for_render();
                let matrix = QrMatrix::encode(payload, styling.error_correction_level)?;
                self.commands.push(RenderCommand::QrCode {
                    rect,
                    matrix,
                    styling: std::boxed::Box::new(styling),
                });
            }
        }

        // Border draws over content edges
        if visual.border_width > 0.0 {
            if let Some(border_color) = visual.border_color.as_ref().filter(|c| c.a > 0) {
                self.commands.push(RenderCommand::StrokeRect {
                    rect,
                    color: border_color.clone(),
                    width: visual.border_width,
                    border_radius: visual.border_radius,
                    dashed: false,
                });
            }
        }

        if needs_opacity {
            self.commands.push(RenderCommand::PopOpacity);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, FlexStyle, Spacing, TextStyle};
    use crate::layout::LayoutEngine;

    fn card() -> Element {
        Element::Flex {
            style: FlexStyle {
                padding: Some(Spacing::Uniform(16.0)),
                background_color: Some(Color::WHITE),
                shadow: Some(ShadowIntensity::Light),
                decoration: Some(DecorativeStyle::Dots),
                ..Default::default()
            },
            children: vec![
                Element::Qr {
                    payload: "https://example.com".to_string(),
                    styling: std::boxed::Box::new(Styling::default()),
                    size: 80.0,
                },
                Element::Text {
                    content: "Title".to_string(),
                    style: TextStyle::default(),
                    edit_target: Some(EditTarget::Title),
                },
            ],
        }
    }

    fn commands(open_editor: Option<EditTarget>) -> Vec<RenderCommand> {
        let mut engine = LayoutEngine::new();
        let layout = engine.compute_layout(&card(), 300.0, None, None).unwrap();
        build_render_tree(&layout, &mut engine.text_engine, open_editor)
            .unwrap()
            .commands
    }

    #[test]
    fn test_draw_order() {
        let cmds = commands(None);
        let kinds: Vec<&str> = cmds
            .iter()
            .map(|c| match c {
                RenderCommand::Shadow { .. } => "shadow",
                RenderCommand::FillRect { .. } => "fill",
                RenderCommand::PushClip { .. } => "clip",
                RenderCommand::Decoration { .. } => "decoration",
                RenderCommand::PopClip => "unclip",
                RenderCommand::QrCode { .. } => "qr",
                RenderCommand::Text { .. } => "text",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["shadow", "fill", "clip", "decoration", "unclip", "qr", "text"]
        );
    }

    #[test]
    fn test_qr_offset_by_padding() {
        let cmds = commands(None);
        let rect = cmds
            .iter()
            .find_map(|c| match c {
                RenderCommand::QrCode { rect, .. } => Some(*rect),
                _ => None,
            })
            .unwrap();
        assert_eq!((rect.x, rect.y, rect.width), (16.0, 16.0, 80.0));
    }

    #[test]
    fn test_open_editor_gets_dashed_outline() {
        let dashed = |cmds: &[RenderCommand]| {
            cmds.iter()
                .filter(|c| matches!(c, RenderCommand::StrokeRect { dashed: true, .. }))
                .count()
        };
        assert_eq!(dashed(&commands(None)), 0);
        assert_eq!(dashed(&commands(Some(EditTarget::Subtitle))), 0);
        assert_eq!(dashed(&commands(Some(EditTarget::Title))), 1);
    }
}
