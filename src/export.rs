//! Export pipeline: rendered SVG to a downloadable PNG, SVG or PDF file.
//!
//! Only one export may be in flight per card. [`ExportGate`] holds the
//! format currently being produced and clears it when the export finishes,
//! successfully or not.

use std::cell::Cell;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use resvg::{tiny_skia, usvg};
use serde::{Deserialize, Serialize};

use crate::notify::{Notice, Notifier};
use crate::{RenderError, RenderOptions, pdf};

/// Longest raster edge accepted, in pixels.
pub const MAX_RASTER_EDGE: u32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "svg" => Some(ExportFormat::Svg),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("a {0} export is already in progress")]
    Busy(ExportFormat),

    #[error("invalid SVG: {0}")]
    Svg(#[from] usvg::Error),

    #[error("cannot rasterize a {width}x{height} image")]
    Size { width: u32, height: u32 },

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Export tuning taken from [`RenderOptions`].
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Pixels per CSS pixel for raster output
    pub scale: f32,
    /// PDF page padding in points
    pub pdf_padding: f32,
    /// Font data made available to the rasterizer
    pub fonts: Vec<Vec<u8>>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            scale: 2.0,
            pdf_padding: pdf::DEFAULT_PADDING,
            fonts: Vec::new(),
        }
    }
}

impl ExportSettings {
    pub fn from_options(options: &RenderOptions) -> Result<Self, RenderError> {
        Ok(Self {
            scale: options.export_scale,
            pdf_padding: options.pdf_padding,
            fonts: options.decoded_fonts()?,
        })
    }
}

/// A finished download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// `<name>-<epoch-ms>.<ext>`, with the name reduced to a safe file stem.
pub fn file_name(name: &str, epoch_ms: u64, format: ExportFormat) -> String {
    let mut stem = String::new();
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() || ch == '_' {
            stem.push(ch);
        } else if !stem.is_empty() && !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_end_matches('-');
    let stem = if stem.is_empty() { "qr-code" } else { stem };
    format!("{}-{}.{}", stem, epoch_ms, format.extension())
}

/// Rasterize SVG markup at `scale` pixels per CSS pixel.
pub fn rasterize(svg: &str, scale: f32, fonts: &[Vec<u8>]) -> Result<RgbaImage, ExportError> {
    let mut options = usvg::Options::default();
    {
        let fontdb = options.fontdb_mut();
        #[cfg(not(target_arch = "wasm32"))]
        fontdb.load_system_fonts();
        for data in fonts {
            fontdb.load_font_data(data.clone());
        }
    }
    let tree = usvg::Tree::from_str(svg, &options)?;

    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;
    if !(scale > 0.0)
        || width == 0
        || height == 0
        || width > MAX_RASTER_EDGE
        || height > MAX_RASTER_EDGE
    {
        return Err(ExportError::Size { width, height });
    }

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(ExportError::Size { width, height })?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let rgba = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(width, height, rgba).ok_or(ExportError::Size { width, height })
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Produce the file for `format` from rendered SVG.
pub fn build_artifact(
    format: ExportFormat,
    svg: &str,
    name: &str,
    epoch_ms: u64,
    settings: &ExportSettings,
) -> Result<ExportArtifact, ExportError> {
    let bytes = match format {
        ExportFormat::Svg => svg.as_bytes().to_vec(),
        ExportFormat::Png => encode_png(&rasterize(svg, settings.scale, &settings.fonts)?)?,
        ExportFormat::Pdf => {
            let image = rasterize(svg, settings.scale, &settings.fonts)?;
            pdf::write_pdf(&image, settings.scale, settings.pdf_padding)?
        }
    };
    Ok(ExportArtifact {
        file_name: file_name(name, epoch_ms, format),
        mime: format.mime(),
        bytes,
    })
}

/// Where finished downloads go.
pub trait DownloadSink {
    fn save(&mut self, artifact: &ExportArtifact) -> Result<(), ExportError>;
}

/// Saves downloads into a directory. Files are written under a temporary
/// name and renamed into place, so a failed write leaves nothing behind.
#[derive(Debug, Clone)]
pub struct FsDownloadSink {
    dir: PathBuf,
}

impl FsDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, artifact: &ExportArtifact) -> PathBuf {
        self.dir.join(&artifact.file_name)
    }
}

impl DownloadSink for FsDownloadSink {
    fn save(&mut self, artifact: &ExportArtifact) -> Result<(), ExportError> {
        let path = self.path_for(artifact);
        let tmp_path = self.dir.join(format!(".{}.part", artifact.file_name));
        let written = write_then_rename(&tmp_path, &path, &artifact.bytes);
        if written.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        written?;
        tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "saved download");
        Ok(())
    }
}

fn write_then_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(tmp_path, bytes)?;
    std::fs::rename(tmp_path, path)
}

/// Keeps downloads in memory.
#[derive(Debug, Default)]
pub struct MemoryDownloadSink {
    pub artifacts: Vec<ExportArtifact>,
}

impl DownloadSink for MemoryDownloadSink {
    fn save(&mut self, artifact: &ExportArtifact) -> Result<(), ExportError> {
        self.artifacts.push(artifact.clone());
        Ok(())
    }
}

/// Allows one export at a time for a card.
#[derive(Debug, Default)]
pub struct ExportGate {
    pending: Cell<Option<ExportFormat>>,
}

/// Marks an export as running; clears the gate when dropped.
#[derive(Debug)]
pub struct InFlight<'a> {
    gate: &'a ExportGate,
    format: ExportFormat,
}

impl InFlight<'_> {
    pub fn format(&self) -> ExportFormat {
        self.format
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gate.pending.set(None);
    }
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The format currently being exported, if any.
    pub fn pending(&self) -> Option<ExportFormat> {
        self.pending.get()
    }

    pub fn try_begin(&self, format: ExportFormat) -> Result<InFlight<'_>, ExportError> {
        if let Some(running) = self.pending.get() {
            return Err(ExportError::Busy(running));
        }
        self.pending.set(Some(format));
        Ok(InFlight { gate: self, format })
    }

    /// Export `svg` as `format` and hand the file to `sink`.
    ///
    /// A request made while another export runs is rejected with
    /// [`ExportError::Busy`]. Any other failure is reported through
    /// `notifier`; the gate is released either way.
    #[allow(clippy::too_many_arguments)]
    pub fn export(
        &self,
        format: ExportFormat,
        svg: &str,
        name: &str,
        epoch_ms: u64,
        settings: &ExportSettings,
        sink: &mut dyn DownloadSink,
        notifier: &dyn Notifier,
    ) -> Result<ExportArtifact, ExportError> {
        let _in_flight = self.try_begin(format).inspect_err(|e| {
            tracing::debug!(requested = %format, error = %e, "export rejected");
        })?;

        let result = build_artifact(format, svg, name, epoch_ms, settings).and_then(|artifact| {
            sink.save(&artifact)?;
            Ok(artifact)
        });

        match &result {
            Ok(artifact) => tracing::info!(
                file = %artifact.file_name,
                bytes = artifact.bytes.len(),
                "exported"
            ),
            Err(e) => {
                tracing::warn!(format = %format, error = %e, "export failed");
                notifier.notify(Notice::error(format!(
                    "Could not export {} as {}: {}",
                    if name.trim().is_empty() { "QR code" } else { name.trim() },
                    format.extension().to_uppercase(),
                    e
                )));
            }
        }
        result
    }
}
