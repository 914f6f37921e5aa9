//! Persisted QR code records as exchanged with the backend.

use serde::{Deserialize, Serialize};

use crate::content::QrType;
use crate::styling::{Styling, StylingInput};
use crate::template::Template;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrStatus {
    #[default]
    Active,
    Inactive,
}

/// A stored QR code. Scan counts and status are server-derived and only
/// read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeData {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub qr_type: QrType,
    pub content: String,
    #[serde(default)]
    pub template: Option<Template>,
    /// As stored; may predate newer styling fields
    #[serde(default)]
    pub styling: StylingInput,
    /// ISO-8601 creation time
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub scans: u64,
    #[serde(default)]
    pub status: QrStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_limit: Option<u64>,
}

impl QrCodeData {
    pub fn resolved_styling(&self) -> Styling {
        self.styling.resolve()
    }

    pub fn is_active(&self) -> bool {
        self.status == QrStatus::Active
    }
}

/// Body of a create or update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodePayload {
    pub name: String,
    #[serde(rename = "type")]
    pub qr_type: QrType,
    pub content: String,
    pub template: Option<Template>,
    pub styling: StylingInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_limit: Option<u64>,
}
