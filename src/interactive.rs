//! Live card preview with click-to-edit title and subtitle.
//!
//! The preview only tracks which editor is open. Edits produce a new
//! [`Template`] handed to the caller; the stored template is replaced when
//! the caller feeds it back through [`InteractivePreview::set_template`].

use crate::card::{CardMode, CardQr};
use crate::element::Color;
use crate::template::{EditTarget, Template};
use crate::{RenderError, RenderOptions, RenderResult, render_card};

pub const MIN_FONT_SIZE: f32 = 8.0;
pub const MAX_FONT_SIZE: f32 = 72.0;

/// What the inline editor shows for the open text slot.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorPanel {
    pub target: EditTarget,
    pub text: String,
    pub font_size: f32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub color: Color,
}

/// One change made in the inline editor.
#[derive(Debug, Clone, PartialEq)]
pub enum TextEdit {
    Text(String),
    /// Clamped to the slider range
    FontSize(f32),
    Color(Color),
}

#[derive(Debug, Clone)]
pub struct InteractivePreview {
    template: Option<Template>,
    qr: CardQr,
    mode: CardMode,
    open: Option<EditTarget>,
}

impl InteractivePreview {
    pub fn new(template: Option<Template>, qr: CardQr, mode: CardMode) -> Self {
        Self {
            template,
            qr,
            mode,
            open: None,
        }
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn mode(&self) -> CardMode {
        self.mode
    }

    pub fn open(&self) -> Option<EditTarget> {
        self.open
    }

    /// Replace the template, e.g. with the value from an `apply` callback.
    /// An open editor stays open only if there is still a card to edit.
    pub fn set_template(&mut self, template: Option<Template>) {
        self.template = template;
        if self.template.is_none() {
            self.open = None;
        }
    }

    pub fn set_qr(&mut self, qr: CardQr) {
        self.qr = qr;
    }

    /// Handle a click on a text slot. Returns whether an editor opened.
    pub fn click(&mut self, target: EditTarget) -> bool {
        if !self.mode.editing() || self.template.is_none() {
            return false;
        }
        self.open = Some(target);
        true
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn editor(&self) -> Option<EditorPanel> {
        let target = self.open?;
        let template = self.template.as_ref()?;
        let field = template.field(target);
        Some(EditorPanel {
            target,
            text: field.text.clone(),
            font_size: field.font_size,
            min_font_size: MIN_FONT_SIZE,
            max_font_size: MAX_FONT_SIZE,
            color: template.text_color_of(target),
        })
    }

    /// Apply `edit` to the open slot and pass the resulting template to
    /// `on_change`. Does nothing when no editor is open.
    pub fn apply(&self, edit: TextEdit, on_change: impl FnOnce(Template)) {
        let (Some(target), Some(template)) = (self.open, self.template.as_ref()) else {
            return;
        };
        let mut next = template.clone();
        let field = next.field_mut(target);
        match edit {
            TextEdit::Text(text) => field.text = text,
            TextEdit::FontSize(size) => field.font_size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
            TextEdit::Color(color) => field.color = Some(color),
        }
        tracing::debug!(target = target.as_str(), "template text edited");
        on_change(next);
    }

    pub fn render(&self, options: &RenderOptions) -> Result<RenderResult, RenderError> {
        render_card(
            self.template.as_ref(),
            &self.qr,
            self.mode,
            self.open,
            options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styling::Styling;

    fn qr() -> CardQr {
        CardQr {
            payload: "https://example.com".to_string(),
            styling: Styling::default(),
            size: 160.0,
        }
    }

    fn editable() -> InteractivePreview {
        InteractivePreview::new(
            Some(Template::default()),
            qr(),
            CardMode {
                editable: true,
                compact: false,
            },
        )
    }

    #[test]
    fn test_click_requires_editable_card() {
        let mut preview = editable();
        assert!(preview.click(EditTarget::Title));
        assert_eq!(preview.open(), Some(EditTarget::Title));

        let mut read_only = InteractivePreview::new(Some(Template::default()), qr(), CardMode::default());
        assert!(!read_only.click(EditTarget::Title));

        let mut compact = InteractivePreview::new(
            Some(Template::default()),
            qr(),
            CardMode {
                editable: true,
                compact: true,
            },
        );
        assert!(!compact.click(EditTarget::Subtitle));

        let mut bare = InteractivePreview::new(
            None,
            qr(),
            CardMode {
                editable: true,
                compact: false,
            },
        );
        assert!(!bare.click(EditTarget::Title));
        assert!(bare.editor().is_none());
    }

    #[test]
    fn test_editor_panel() {
        let mut preview = editable();
        assert!(preview.editor().is_none());
        preview.click(EditTarget::Subtitle);

        let panel = preview.editor().unwrap();
        assert_eq!(panel.text, "Point your camera at the code");
        assert_eq!(panel.font_size, 14.0);
        assert_eq!((panel.min_font_size, panel.max_font_size), (8.0, 72.0));
        assert_eq!(panel.color, Template::default().text_color);

        preview.close();
        assert!(preview.editor().is_none());
    }

    #[test]
    fn test_apply_hands_new_template_to_caller() {
        let mut preview = editable();
        preview.click(EditTarget::Title);

        let mut changed = None;
        preview.apply(TextEdit::FontSize(200.0), |t| changed = Some(t));
        let changed = changed.unwrap();
        assert_eq!(changed.title.font_size, 72.0);
        // The preview itself is untouched until the caller feeds it back.
        assert_eq!(preview.template().unwrap().title.font_size, 24.0);

        preview.set_template(Some(changed));
        let mut recolored = None;
        preview.apply(TextEdit::Color(Color::rgb(255, 0, 0)), |t| recolored = Some(t));
        let recolored = recolored.unwrap();
        assert_eq!(recolored.title.color, Some(Color::rgb(255, 0, 0)));
        assert_eq!(recolored.title.font_size, 72.0);
    }

    #[test]
    fn test_apply_without_open_editor_is_noop() {
        let preview = editable();
        let mut called = false;
        preview.apply(TextEdit::Text("x".to_string()), |_| called = true);
        assert!(!called);
    }

    #[test]
    fn test_render_outlines_open_editor() {
        let mut preview = editable();
        let closed = preview.render(&RenderOptions::default()).unwrap();
        assert!(closed.svg.contains("data-edit-target=\"title\""));
        assert!(!closed.svg.contains("stroke-dasharray"));

        preview.click(EditTarget::Title);
        let open = preview.render(&RenderOptions::default()).unwrap();
        assert!(open.svg.contains("stroke-dasharray"));
    }
}
