//! Minimal single-image PDF writer.
//!
//! The rasterized artwork is flattened onto white and stored as one
//! Flate-compressed RGB image XObject on a page sized to the artwork
//! (1 pt per CSS pixel) plus padding.

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbaImage;

use crate::export::ExportError;

/// Padding around the artwork, in points.
pub const DEFAULT_PADDING: f32 = 24.0;

/// Wrap `image`, rendered at `scale` pixels per CSS pixel, in a PDF page.
pub fn write_pdf(image: &RgbaImage, scale: f32, padding: f32) -> Result<Vec<u8>, ExportError> {
    let (width, height) = image.dimensions();
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let padding = padding.max(0.0);
    let art_w = width as f32 / scale;
    let art_h = height as f32 / scale;
    let page_w = art_w + padding * 2.0;
    let page_h = art_h + padding * 2.0;

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let a = a as u32;
        for c in [r, g, b] {
            rgb.push(((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8);
        }
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&rgb)?;
    let samples = encoder.finish()?;

    let contents = format!(
        "q\n{} 0 0 {} {} {} cm\n/Im0 Do\nQ\n",
        num(art_w),
        num(art_h),
        num(padding),
        num(padding)
    );

    let mut out: Vec<u8> = Vec::new();
    let mut offsets = Vec::with_capacity(5);
    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");

    offsets.push(out.len());
    write!(
        out,
        "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
         /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>\nendobj\n",
        num(page_w),
        num(page_h)
    )?;

    offsets.push(out.len());
    write!(
        out,
        "4 0 obj\n<< /Type /XObject /Subtype /Image /Width {} /Height {} \
         /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
        width,
        height,
        samples.len()
    )?;
    out.extend_from_slice(&samples);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    offsets.push(out.len());
    write!(
        out,
        "5 0 obj\n<< /Length {} >>\nstream\n{}endstream\nendobj\n",
        contents.len(),
        contents
    )?;

    let xref = out.len();
    write!(out, "xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1)?;
    for offset in &offsets {
        write!(out, "{:010} 00000 n \n", offset)?;
    }
    write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        offsets.len() + 1,
        xref
    )?;

    Ok(out)
}

/// PDF number: at most two decimals, no trailing zeros.
fn num(v: f32) -> String {
    let s = format!("{:.2}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
