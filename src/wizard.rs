//! Creation and edit sessions.
//!
//! A [`Wizard`] collects type, content, card template and styling across
//! steps, keeps a resumable [`Draft`] in a [`DraftStore`], and submits the
//! result to a [`QrCodeApi`]. Nothing is committed locally until the backend
//! accepts the record.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::content::{ContentFields, QrType, encode};
use crate::history::StyleEditor;
use crate::notify::{Notice, Notifier};
use crate::record::{QrCodeData, QrCodePayload};
use crate::styling::{Styling, StylingInput};
use crate::template::Template;
use crate::validate::{DraftView, UploadKind, ValidationError, WizardStep, validate_step, validate_upload};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("draft I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("draft is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The backend's QR code endpoints.
pub trait QrCodeApi {
    fn create(&mut self, payload: &QrCodePayload) -> Result<QrCodeData, ApiError>;

    fn update(&mut self, id: &str, payload: &QrCodePayload) -> Result<QrCodeData, ApiError>;

    /// Store an uploaded image and return its hosted URL.
    fn upload(&mut self, bytes: &[u8], kind: UploadKind) -> Result<String, ApiError>;
}

/// Snapshot of an unfinished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Set when editing an existing record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub qr_type: QrType,
    #[serde(default)]
    pub fields: ContentFields,
    /// Content supplied directly instead of through `fields`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub template: Option<Template>,
    pub styling: Styling,
    pub step: WizardStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_limit: Option<u64>,
}

pub trait DraftStore {
    fn load(&self) -> Result<Option<Draft>, StoreError>;

    fn save(&mut self, draft: &Draft) -> Result<(), StoreError>;

    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Draft kept as JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self) -> Result<Option<Draft>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&mut self, draft: &Draft) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serde_json::to_vec_pretty(draft)?)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    pub draft: Option<Draft>,
}

impl DraftStore for MemoryDraftStore {
    fn load(&self) -> Result<Option<Draft>, StoreError> {
        Ok(self.draft.clone())
    }

    fn save(&mut self, draft: &Draft) -> Result<(), StoreError> {
        self.draft = Some(draft.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.draft = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Wizard {
    id: Option<String>,
    name: String,
    qr_type: QrType,
    fields: ContentFields,
    content: Option<String>,
    template: Option<Template>,
    styles: StyleEditor,
    step: WizardStep,
    password: Option<String>,
    expiration_date: Option<String>,
    scan_limit: Option<u64>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    /// A fresh creation session with the starter card.
    pub fn new() -> Self {
        Self {
            id: None,
            name: String::new(),
            qr_type: QrType::default(),
            fields: ContentFields::default(),
            content: None,
            template: Some(Template::default()),
            styles: StyleEditor::default(),
            step: WizardStep::Type,
            password: None,
            expiration_date: None,
            scan_limit: None,
        }
    }

    /// Edit an existing record, starting at the content step.
    pub fn edit(record: &QrCodeData) -> Self {
        Self {
            id: Some(record.id.clone()),
            name: record.name.clone(),
            qr_type: record.qr_type,
            fields: ContentFields::default(),
            content: Some(record.content.clone()),
            template: record.template.clone(),
            styles: StyleEditor::new(record.resolved_styling()),
            step: WizardStep::Content,
            password: record.password.clone(),
            expiration_date: record.expiration_date.clone(),
            scan_limit: record.scan_limit,
        }
    }

    /// Resume from a saved draft. Undo history starts empty.
    pub fn resume(draft: Draft) -> Self {
        Self {
            id: draft.id,
            name: draft.name,
            qr_type: draft.qr_type,
            fields: draft.fields,
            content: draft.content,
            template: draft.template,
            styles: StyleEditor::new(draft.styling),
            step: draft.step,
            password: draft.password,
            expiration_date: draft.expiration_date,
            scan_limit: draft.scan_limit,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qr_type(&self) -> QrType {
        self.qr_type
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn styling(&self) -> &Styling {
        self.styles.current()
    }

    /// Styling changes and undo.
    pub fn styles(&mut self) -> &mut StyleEditor {
        &mut self.styles
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_type(&mut self, qr_type: QrType) {
        if qr_type != self.qr_type {
            self.qr_type = qr_type;
            self.content = None;
        }
    }

    /// Replace the form input. Directly supplied content is discarded.
    pub fn set_fields(&mut self, fields: ContentFields) {
        self.fields = fields;
        self.content = None;
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }

    pub fn set_template(&mut self, template: Option<Template>) {
        self.template = template;
    }

    /// Access limits sent with the record. `None` clears a limit.
    pub fn set_access(
        &mut self,
        password: Option<String>,
        expiration_date: Option<String>,
        scan_limit: Option<u64>,
    ) {
        self.password = password;
        self.expiration_date = expiration_date;
        self.scan_limit = scan_limit;
    }

    /// The string the code will carry, before tracking substitution.
    pub fn content(&self) -> String {
        self.content
            .clone()
            .unwrap_or_else(|| encode(self.qr_type, &self.fields))
    }

    fn check(&self, step: WizardStep) -> Result<(), ValidationError> {
        let content = self.content();
        validate_step(
            step,
            &DraftView {
                name: &self.name,
                qr_type: self.qr_type,
                fields: self.content.is_none().then_some(&self.fields),
                content: &content,
            },
        )
    }

    /// Validate the current step and move to the next one. On failure the
    /// session is left as it was.
    pub fn advance(&mut self) -> Result<WizardStep, ValidationError> {
        if let Err(e) = self.check(self.step) {
            tracing::warn!(step = ?self.step, error = %e, "step validation failed");
            return Err(e);
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
        self.step
    }

    pub fn draft(&self) -> Draft {
        Draft {
            id: self.id.clone(),
            name: self.name.clone(),
            qr_type: self.qr_type,
            fields: self.fields.clone(),
            content: self.content.clone(),
            template: self.template.clone(),
            styling: self.styles.current().clone(),
            step: self.step,
            password: self.password.clone(),
            expiration_date: self.expiration_date.clone(),
            scan_limit: self.scan_limit,
        }
    }

    pub fn payload(&self) -> QrCodePayload {
        QrCodePayload {
            name: self.name.trim().to_string(),
            qr_type: self.qr_type,
            content: self.content(),
            template: self.template.clone(),
            styling: StylingInput::from(self.styles.current().clone()),
            password: self.password.clone(),
            expiration_date: self.expiration_date.clone(),
            scan_limit: self.scan_limit,
        }
    }

    /// Validate, upload and use an image as the logo.
    pub fn attach_logo(
        &mut self,
        bytes: &[u8],
        api: &mut dyn QrCodeApi,
        notifier: &dyn Notifier,
    ) -> Result<(), SubmitError> {
        let uploaded = validate_upload(bytes)
            .map_err(SubmitError::from)
            .and_then(|kind| api.upload(bytes, kind).map_err(SubmitError::from));
        match uploaded {
            Ok(url) => {
                self.styles.update(|s| s.image = Some(url));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "logo upload failed");
                notifier.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Create or update the record.
    ///
    /// On success the draft is cleared, the session adopts the server
    /// record, and undo history restarts. On failure the user is notified
    /// and nothing local changes.
    pub fn submit(
        &mut self,
        api: &mut dyn QrCodeApi,
        store: &mut dyn DraftStore,
        notifier: &dyn Notifier,
    ) -> Result<QrCodeData, SubmitError> {
        if let Err(e) = self.check(WizardStep::Review) {
            tracing::warn!(error = %e, "submit rejected");
            notifier.notify(Notice::error(e.to_string()));
            return Err(e.into());
        }

        let payload = self.payload();
        let saved = match &self.id {
            Some(id) => api.update(id, &payload),
            None => api.create(&payload),
        };
        let record = match saved {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, editing = self.id.is_some(), "saving QR code failed");
                notifier.notify(Notice::error(format!("Could not save QR code: {}", e)));
                return Err(e.into());
            }
        };

        if let Err(e) = store.clear() {
            tracing::warn!(error = %e, "clearing draft failed");
        }
        tracing::info!(id = %record.id, qr_type = %record.qr_type, "QR code saved");
        notifier.notify(Notice::success(if self.id.is_some() {
            "QR code updated"
        } else {
            "QR code created"
        }));

        self.id = Some(record.id.clone());
        self.styles.reset(record.resolved_styling());
        Ok(record)
    }
}
