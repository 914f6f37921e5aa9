//! SVG generation from render commands.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::element::{Color, DecorativeStyle, LinearFill, ShadowIntensity};
use crate::qr::{QrPainter, RenderTarget};
use crate::render::{Rect, RenderCommand, RenderTree, TextLineRender};
use crate::template::EditTarget;

/// A font embedded into the document as an `@font-face` rule.
#[derive(Debug, Clone)]
pub struct FontFace {
    pub family: String,
    pub data: Vec<u8>,
}

impl FontFace {
    fn mime(&self) -> &'static str {
        match self.data.get(..4) {
            Some(b"wOF2") => "font/woff2",
            Some(b"wOFF") => "font/woff",
            Some(b"OTTO") => "font/otf",
            _ => "font/ttf",
        }
    }
}

/// Options for SVG generation.
#[derive(Debug, Clone)]
pub struct SvgOptions {
    /// Include XML declaration
    pub xml_declaration: bool,
    /// Decimal precision for coordinates
    pub precision: usize,
    /// Preview output keeps editing hooks and display-only effects
    pub target: RenderTarget,
    pub font_faces: Vec<FontFace>,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            xml_declaration: true,
            precision: 2,
            target: RenderTarget::Preview,
            font_faces: Vec::new(),
        }
    }
}

/// Generate SVG string from render tree.
pub fn generate_svg(tree: &RenderTree, options: &SvgOptions) -> String {
    let mut svg = SvgBuilder::new(tree.width, tree.height, options);

    for command in &tree.commands {
        svg.render_command(command);
    }

    svg.finish()
}

/// Open an SVG document of the given size. Shared with the plain renderer.
pub(crate) fn open_document(width: f32, height: f32, options: &SvgOptions) -> String {
    let mut output = String::new();

    if options.xml_declaration {
        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    }

    output.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" \
         xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
         width=\"{:.p$}\" height=\"{:.p$}\" \
         viewBox=\"0 0 {:.p$} {:.p$}\">",
        width,
        height,
        width,
        height,
        p = options.precision
    ));

    if !options.font_faces.is_empty() {
        output.push_str("<defs><style>");
        for face in &options.font_faces {
            output.push_str(&format!(
                "@font-face{{font-family:'{}';src:url(data:{};base64,{})}}",
                escape_xml(&face.family),
                face.mime(),
                STANDARD.encode(&face.data)
            ));
        }
        output.push_str("</style></defs>");
    }

    output
}

struct SvgBuilder<'a> {
    output: String,
    options: &'a SvgOptions,
    id_counter: u32,
}

impl<'a> SvgBuilder<'a> {
    fn new(width: f32, height: f32, options: &'a SvgOptions) -> Self {
        Self {
            output: open_document(width, height, options),
            options,
            id_counter: 0,
        }
    }

    fn next_id(&mut self, kind: &str) -> String {
        let id = format!("{}-{}", kind, self.id_counter);
        self.id_counter += 1;
        id
    }

    fn render_command(&mut self, cmd: &RenderCommand) {
        match cmd {
            RenderCommand::FillRect {
                rect,
                color,
                border_radius,
            } => {
                if color.a > 0 {
                    let attrs = format!("fill=\"{}\"", color.to_css());
                    self.shape(rect, border_radius, &attrs);
                }
            }

            RenderCommand::FillGradient {
                rect,
                fill,
                border_radius,
            } => {
                self.render_gradient(rect, fill, border_radius);
            }

            RenderCommand::StrokeRect {
                rect,
                color,
                width,
                border_radius,
                dashed,
            } => {
                self.render_stroke_rect(rect, color, *width, border_radius, *dashed);
            }

            RenderCommand::Shadow {
                rect,
                intensity,
                border_radius,
            } => {
                self.render_shadow(rect, *intensity, border_radius);
            }

            RenderCommand::Decoration { rect, style, color } => {
                self.render_decoration(rect, *style, color);
            }

            RenderCommand::Text {
                font_family,
                font_size,
                font_weight,
                color,
                letter_spacing,
                italic,
                opacity,
                edit_target,
                lines,
                ..
            } => {
                let mut attrs = format!(
                    "fill=\"{}\" font-family=\"{}\" font-size=\"{:.p$}\" font-weight=\"{}\"",
                    color.to_css(),
                    escape_xml(font_family),
                    font_size,
                    font_weight,
                    p = self.options.precision
                );
                if *letter_spacing != 0.0 {
                    attrs.push_str(&format!(" letter-spacing=\"{:.2}\"", letter_spacing));
                }
                if *italic {
                    attrs.push_str(" font-style=\"italic\"");
                }
                if *opacity < 1.0 {
                    attrs.push_str(&format!(" opacity=\"{:.2}\"", opacity));
                }
                self.render_text(&attrs, *edit_target, lines);
            }

            RenderCommand::QrCode {
                rect,
                matrix,
                styling,
            } => {
                let painter = QrPainter {
                    matrix,
                    styling,
                    rect: *rect,
                    id_prefix: self.next_id("qr"),
                    target: self.options.target,
                    precision: self.options.precision,
                };
                painter.paint(&mut self.output);
            }

            RenderCommand::PushClip {
                rect,
                border_radius,
            } => {
                let id = self.clip_path(rect, border_radius);
                self.output
                    .push_str(&format!("<g clip-path=\"url(#{})\">", id));
            }

            RenderCommand::PopClip | RenderCommand::PopOpacity => {
                self.output.push_str("</g>");
            }

            RenderCommand::PushOpacity { opacity } => {
                self.output
                    .push_str(&format!("<g opacity=\"{:.2}\">", opacity));
            }
        }
    }

    /// Emit a (possibly rounded) rectangle carrying `attrs`.
    fn shape(&mut self, rect: &Rect, border_radius: &[f32; 4], attrs: &str) {
        let p = self.options.precision;
        let has_radius = border_radius.iter().any(|&r| r > 0.0);

        if has_radius && !all_same(border_radius) {
            self.output.push_str(&format!(
                "<path d=\"{}\" {}/>",
                rounded_rect_path(rect, border_radius, p),
                attrs
            ));
        } else if has_radius {
            self.output.push_str(&format!(
                "<rect x=\"{:.p$}\" y=\"{:.p$}\" width=\"{:.p$}\" height=\"{:.p$}\" \
                 rx=\"{:.p$}\" {}/>",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                border_radius[0],
                attrs,
                p = p
            ));
        } else {
            self.output.push_str(&format!(
                "<rect x=\"{:.p$}\" y=\"{:.p$}\" width=\"{:.p$}\" height=\"{:.p$}\" {}/>",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                attrs,
                p = p
            ));
        }
    }

    fn render_gradient(&mut self, rect: &Rect, fill: &LinearFill, border_radius: &[f32; 4]) {
        let id = self.next_id("bg");
        let (x1, y1, x2, y2) = fill.direction.vector();
        self.output.push_str(&format!(
            "<defs><linearGradient id=\"{}\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\">\
             {}{}</linearGradient></defs>",
            id,
            x1,
            y1,
            x2,
            y2,
            gradient_stop(0.0, &fill.from),
            gradient_stop(1.0, &fill.to),
        ));
        self.shape(rect, border_radius, &format!("fill=\"url(#{})\"", id));
    }

    fn render_stroke_rect(
        &mut self,
        rect: &Rect,
        color: &Color,
        stroke_width: f32,
        border_radius: &[f32; 4],
        dashed: bool,
    ) {
        if color.a == 0 || stroke_width <= 0.0 {
            return;
        }

        // Inset the rect by half stroke width so the stroke stays inside
        let inset = stroke_width / 2.0;
        let inner_rect = Rect {
            x: rect.x + inset,
            y: rect.y + inset,
            width: rect.width - stroke_width,
            height: rect.height - stroke_width,
        };

        let mut attrs = format!(
            "fill=\"none\" stroke=\"{}\" stroke-width=\"{:.p$}\"",
            color.to_css(),
            stroke_width,
            p = self.options.precision
        );
        if dashed {
            attrs.push_str(" stroke-dasharray=\"4 3\"");
        }
        self.shape(&inner_rect, border_radius, &attrs);
    }

    fn render_shadow(&mut self, rect: &Rect, intensity: ShadowIntensity, border_radius: &[f32; 4]) {
        let Some((dy, blur, opacity)) = intensity.params() else {
            return;
        };
        let id = self.next_id("shadow");
        self.output.push_str(&format!(
            "<defs><filter id=\"{}\" x=\"-50%\" y=\"-50%\" width=\"200%\" height=\"200%\">\
             <feGaussianBlur stdDeviation=\"{}\"/></filter></defs>",
            id, blur
        ));
        let offset = Rect {
            y: rect.y + dy,
            ..*rect
        };
        let attrs = format!(
            "fill=\"#000000\" fill-opacity=\"{}\" filter=\"url(#{})\"",
            opacity, id
        );
        self.shape(&offset, border_radius, &attrs);
    }

    fn render_decoration(&mut self, rect: &Rect, style: DecorativeStyle, color: &Color) {
        let p = self.options.precision;
        let fill = color.to_opaque_css();
        let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);

        match style {
            DecorativeStyle::None => {}
            DecorativeStyle::Circles => {
                self.output.push_str(&format!(
                    "<circle cx=\"{:.p$}\" cy=\"{:.p$}\" r=\"{:.p$}\" fill=\"{}\" fill-opacity=\"0.08\"/>\
                     <circle cx=\"{:.p$}\" cy=\"{:.p$}\" r=\"{:.p$}\" fill=\"{}\" fill-opacity=\"0.06\"/>",
                    x + w,
                    y,
                    w.min(h) * 0.4,
                    fill,
                    x,
                    y + h,
                    w.min(h) * 0.3,
                    fill,
                    p = p
                ));
            }
            DecorativeStyle::Dots | DecorativeStyle::Lines => {
                let id = self.next_id("motif");
                let tile = if style == DecorativeStyle::Dots {
                    format!("<circle cx=\"8\" cy=\"8\" r=\"1.5\" fill=\"{}\"/>", fill)
                } else {
                    format!(
                        "<path d=\"M 0,16 L 16,0\" stroke=\"{}\" stroke-width=\"1\"/>",
                        fill
                    )
                };
                self.output.push_str(&format!(
                    "<defs><pattern id=\"{}\" width=\"16\" height=\"16\" \
                     patternUnits=\"userSpaceOnUse\">{}</pattern></defs>\
                     <rect x=\"{:.p$}\" y=\"{:.p$}\" width=\"{:.p$}\" height=\"{:.p$}\" \
                     fill=\"url(#{})\" opacity=\"0.12\"/>",
                    id,
                    tile,
                    x,
                    y,
                    w,
                    h,
                    id,
                    p = p
                ));
            }
            DecorativeStyle::Geometric => {
                let s = w.min(h) * 0.3;
                self.output.push_str(&format!(
                    "<rect x=\"{:.p$}\" y=\"{:.p$}\" width=\"{:.p$}\" height=\"{:.p$}\" \
                     transform=\"rotate(45 {:.p$} {:.p$})\" fill=\"{}\" fill-opacity=\"0.08\"/>\
                     <path d=\"M {:.p$},{:.p$} L {:.p$},{:.p$} L {:.p$},{:.p$} Z\" \
                     fill=\"{}\" fill-opacity=\"0.06\"/>",
                    x - s / 2.0,
                    y - s / 2.0,
                    s,
                    s,
                    x,
                    y,
                    fill,
                    x + w,
                    y + h - s,
                    x + w,
                    y + h,
                    x + w - s,
                    y + h,
                    fill,
                    p = p
                ));
            }
        }
    }

    fn render_text(&mut self, attrs: &str, edit_target: Option<EditTarget>, lines: &[TextLineRender]) {
        let p = self.options.precision;

        if lines.is_empty() {
            return;
        }

        let mut open = format!("<text {}", attrs);
        if let (Some(target), RenderTarget::Preview) = (edit_target, self.options.target) {
            open.push_str(&format!(
                " data-edit-target=\"{}\" class=\"qr-edit-target\"",
                target.as_str()
            ));
        }

        if let [line] = lines {
            self.output.push_str(&format!(
                "{} x=\"{:.p$}\" y=\"{:.p$}\">{}</text>",
                open,
                line.x,
                line.y,
                escape_xml(&line.text),
                p = p
            ));
        } else {
            self.output.push_str(&open);
            self.output.push('>');
            for line in lines {
                self.output.push_str(&format!(
                    "<tspan x=\"{:.p$}\" y=\"{:.p$}\">{}</tspan>",
                    line.x,
                    line.y,
                    escape_xml(&line.text),
                    p = p
                ));
            }
            self.output.push_str("</text>");
        }
    }

    /// Define a clip path for the rect and return its id.
    fn clip_path(&mut self, rect: &Rect, border_radius: &[f32; 4]) -> String {
        let id = self.next_id("clip");
        self.output
            .push_str(&format!("<defs><clipPath id=\"{}\">", id));
        self.shape(rect, border_radius, "");
        self.output.push_str("</clipPath></defs>");
        id
    }

    fn finish(mut self) -> String {
        self.output.push_str("</svg>");
        self.output
    }
}

fn gradient_stop(offset: f32, color: &Color) -> String {
    format!(
        "<stop offset=\"{}\" stop-color=\"{}\" stop-opacity=\"{:.3}\"/>",
        offset,
        color.to_opaque_css(),
        color.opacity()
    )
}

/// Generate SVG path for rounded rectangle.
pub fn rounded_rect_path(rect: &Rect, radii: &[f32; 4], precision: usize) -> String {
    let [tl, tr, br, bl] = *radii;
    let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);

    // Clamp radii to fit in rect
    let max_radius = (w / 2.0).min(h / 2.0);
    let tl = tl.min(max_radius);
    let tr = tr.min(max_radius);
    let br = br.min(max_radius);
    let bl = bl.min(max_radius);

    format!(
        "M {:.p$},{:.p$} \
         L {:.p$},{:.p$} \
         Q {:.p$},{:.p$} {:.p$},{:.p$} \
         L {:.p$},{:.p$} \
         Q {:.p$},{:.p$} {:.p$},{:.p$} \
         L {:.p$},{:.p$} \
         Q {:.p$},{:.p$} {:.p$},{:.p$} \
         L {:.p$},{:.p$} \
         Q {:.p$},{:.p$} {:.p$},{:.p$} \
         Z",
        x + tl,
        y,
        x + w - tr,
        y,
        x + w,
        y,
        x + w,
        y + tr,
        x + w,
        y + h - br,
        x + w,
        y + h,
        x + w - br,
        y + h,
        x + bl,
        y + h,
        x,
        y + h,
        x,
        y + h - bl,
        x,
        y + tl,
        x,
        y,
        x + tl,
        y,
        p = precision
    )
}

fn all_same(arr: &[f32; 4]) -> bool {
    arr.iter().all(|&x| (x - arr[0]).abs() < 0.001)
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::GradientDirection;

    fn tree(commands: Vec<RenderCommand>) -> RenderTree {
        RenderTree {
            commands,
            width: 100.0,
            height: 50.0,
        }
    }

    fn text_command() -> RenderCommand {
        RenderCommand::Text {
            content: "Hi & bye".to_string(),
            font_family: "Inter".to_string(),
            font_size: 12.0,
            font_weight: 700,
            color: Color::BLACK,
            letter_spacing: 1.5,
            italic: true,
            opacity: 1.0,
            edit_target: Some(EditTarget::Title),
            lines: vec![TextLineRender {
                x: 4.0,
                y: 16.0,
                text: "Hi & bye".to_string(),
            }],
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
    }

    #[test]
    fn test_all_same() {
        assert!(all_same(&[5.0, 5.0, 5.0, 5.0]));
        assert!(!all_same(&[5.0, 5.0, 0.0, 5.0]));
    }

    #[test]
    fn test_text_attributes() {
        let options = SvgOptions {
            xml_declaration: false,
            ..Default::default()
        };
        let svg = generate_svg(&tree(vec![text_command()]), &options);
        insta::assert_snapshot!(svg, @r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="100.00" height="50.00" viewBox="0 0 100.00 50.00"><text fill="#000000" font-family="Inter" font-size="12.00" font-weight="700" letter-spacing="1.50" font-style="italic" data-edit-target="title" class="qr-edit-target" x="4.00" y="16.00">Hi &amp; bye</text></svg>"##);
    }

    #[test]
    fn test_export_drops_edit_hooks() {
        let options = SvgOptions {
            target: RenderTarget::Export,
            ..Default::default()
        };
        let svg = generate_svg(&tree(vec![text_command()]), &options);
        assert!(svg.starts_with("<?xml"));
        assert!(!svg.contains("data-edit-target"));
    }

    #[test]
    fn test_gradient_and_dashed_outline() {
        let rect = Rect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
        };
        let svg = generate_svg(
            &tree(vec![
                RenderCommand::FillGradient {
                    rect,
                    fill: LinearFill {
                        from: Color::WHITE,
                        to: Color::rgb(0, 0, 255),
                        direction: GradientDirection::ToRight,
                    },
                    border_radius: [8.0; 4],
                },
                RenderCommand::StrokeRect {
                    rect,
                    color: Color::BLACK,
                    width: 1.0,
                    border_radius: [0.0; 4],
                    dashed: true,
                },
            ]),
            &SvgOptions::default(),
        );
        assert!(svg.contains("<linearGradient id=\"bg-0\" x1=\"0\" y1=\"0\" x2=\"1\" y2=\"0\">"));
        assert!(svg.contains("rx=\"8.00\" fill=\"url(#bg-0)\""));
        assert!(svg.contains("stroke-dasharray=\"4 3\""));
    }

    #[test]
    fn test_decoration_inside_clip() {
        let rect = Rect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
        };
        let svg = generate_svg(
            &tree(vec![
                RenderCommand::PushClip {
                    rect,
                    border_radius: [12.0; 4],
                },
                RenderCommand::Decoration {
                    rect,
                    style: DecorativeStyle::Dots,
                    color: Color::BLACK,
                },
                RenderCommand::PopClip,
            ]),
            &SvgOptions::default(),
        );
        assert!(svg.contains("<clipPath id=\"clip-0\"><rect"));
        assert!(svg.contains("<g clip-path=\"url(#clip-0)\">"));
        assert!(svg.contains("<pattern id=\"motif-1\""));
        assert!(svg.ends_with("</g></svg>"));
    }

    #[test]
    fn test_font_faces_embedded() {
        let options = SvgOptions {
            font_faces: vec![FontFace {
                family: "Brand".to_string(),
                data: b"wOF2abc".to_vec(),
            }],
            ..Default::default()
        };
        let svg = generate_svg(&tree(vec![]), &options);
        assert!(svg.contains("@font-face{font-family:'Brand';src:url(data:font/woff2;base64,d09GMmFiYw==)}"));
    }
}
