//! Checks run before a wizard step is left or an upload is accepted.
//!
//! Content encoding itself never fails; missing required input is caught
//! here instead.

use serde::{Deserialize, Serialize};

use crate::content::{ContentFields, QrType, is_renderable_image_ref};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    #[default]
    Type,
    Content,
    Design,
    Review,
}

impl WizardStep {
    pub fn next(self) -> Option<Self> {
        match self {
            WizardStep::Type => Some(WizardStep::Content),
            WizardStep::Content => Some(WizardStep::Design),
            WizardStep::Design => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    pub fn prev(self) -> Option<Self> {
        match self {
            WizardStep::Type => None,
            WizardStep::Content => Some(WizardStep::Type),
            WizardStep::Design => Some(WizardStep::Content),
            WizardStep::Review => Some(WizardStep::Design),
        }
    }
}

/// The parts of a draft that validation looks at.
#[derive(Debug, Clone, Copy)]
pub struct DraftView<'a> {
    pub name: &'a str,
    pub qr_type: QrType,
    /// Form input; `None` when the content was supplied directly
    pub fields: Option<&'a ContentFields>,
    /// Encoded content string
    pub content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a name for your QR code")]
    MissingName,

    #[error("Please fill in the {0} for this QR code")]
    MissingContent(&'static str),

    #[error("The image must be an http(s), data or blob URL")]
    InvalidImageRef,

    #[error("File is too large ({size} bytes, at most {max})")]
    UploadTooLarge { size: usize, max: usize },

    #[error("Unsupported file type; use PNG, JPEG, GIF, WebP or SVG")]
    UnsupportedUpload,
}

/// Field each type cannot do without, with its user-facing label.
fn required_input(qr_type: QrType, fields: &ContentFields) -> Option<(&'static str, bool)> {
    let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    let (label, present) = match qr_type {
        QrType::Url | QrType::Youtube => ("URL", filled(&fields.url)),
        QrType::Text => ("text", filled(&fields.text)),
        QrType::Vcard => (
            "contact name",
            filled(&fields.first_name) || filled(&fields.last_name),
        ),
        QrType::Wifi => ("network name", filled(&fields.ssid)),
        QrType::Email => ("email address", filled(&fields.email)),
        QrType::Phone | QrType::Sms | QrType::Whatsapp => ("phone number", filled(&fields.phone)),
        QrType::Instagram | QrType::Facebook => ("username", filled(&fields.username)),
        QrType::Image => ("image", filled(&fields.image_url)),
        // Missing coordinates encode as 0.
        QrType::Location => return None,
    };
    Some((label, present))
}

/// Validate what `step` collects before leaving it.
pub fn validate_step(step: WizardStep, draft: &DraftView<'_>) -> Result<(), ValidationError> {
    match step {
        WizardStep::Type | WizardStep::Design => Ok(()),
        WizardStep::Content | WizardStep::Review => validate_content(draft),
    }
}

fn validate_content(draft: &DraftView<'_>) -> Result<(), ValidationError> {
    if draft.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if draft.content.trim().is_empty() {
        return Err(ValidationError::MissingContent("content"));
    }
    if let Some(fields) = draft.fields {
        if let Some((label, false)) = required_input(draft.qr_type, fields) {
            return Err(ValidationError::MissingContent(label));
        }
    }
    if draft.qr_type == QrType::Image && !is_renderable_image_ref(draft.content) {
        return Err(ValidationError::InvalidImageRef);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Svg,
}

impl UploadKind {
    pub fn mime(self) -> &'static str {
        match self {
            UploadKind::Png => "image/png",
            UploadKind::Jpeg => "image/jpeg",
            UploadKind::Gif => "image/gif",
            UploadKind::Webp => "image/webp",
            UploadKind::Svg => "image/svg+xml",
        }
    }
}

/// Check an image upload (logo or image-type content) by size and content.
pub fn validate_upload(bytes: &[u8]) -> Result<UploadKind, ValidationError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::UploadTooLarge {
            size: bytes.len(),
            max: MAX_UPLOAD_BYTES,
        });
    }
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => Ok(UploadKind::Png),
        Ok(image::ImageFormat::Jpeg) => Ok(UploadKind::Jpeg),
        Ok(image::ImageFormat::Gif) => Ok(UploadKind::Gif),
        Ok(image::ImageFormat::WebP) => Ok(UploadKind::Webp),
        _ if looks_like_svg(bytes) => Ok(UploadKind::Svg),
        _ => Err(ValidationError::UnsupportedUpload),
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with('<') && head.contains("<svg")
}
