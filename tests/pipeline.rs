use std::io::Write;
use std::sync::{Arc, Mutex};

use qrstyle::content::{ContentFields, QrType, encode};
use qrstyle::export::{ExportSettings, MemoryDownloadSink};
use qrstyle::history::StyleEditor;
use qrstyle::notify::MemoryNotifier;
use qrstyle::styling::{ErrorCorrectionLevel, ImageOptionsInput, StylingInput};
use qrstyle::{
    Color, ExportFormat, ExportGate, PlainRequest, RenderOptions, Styling, TrackingConfig,
    export_document, render_document, render_plain, tracked_payload,
};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn output(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

#[test]
fn merge_is_idempotent_and_relative() {
    let partial: StylingInput =
        serde_json::from_str(r##"{ "foregroundColor": "#ff0000", "bgOpacity": 250 }"##).unwrap();
    let once = partial.resolve();
    let twice = StylingInput::from(once.clone()).resolve();
    assert_eq!(once, twice);

    assert_eq!(once.corner_square_style.color, Color::rgb(255, 0, 0));
    assert_eq!(once.corner_dot_style.color, Color::rgb(255, 0, 0));
    assert_eq!(once.error_correction_level, ErrorCorrectionLevel::Medium);
    assert_eq!(once.bg_opacity, 100);
}

#[test]
fn logo_override_never_reaches_stored_styling() {
    let stored = StylingInput {
        image: Some("data:image/png;base64,AAAA".to_string()),
        error_correction_level: Some(ErrorCorrectionLevel::Low),
        image_options: Some(ImageOptionsInput {
            image_size: Some(0.9),
            ..Default::default()
        }),
        ..Default::default()
    }
    .resolve();

    let effective = stored.for_render();
    assert_eq!(effective.error_correction_level, ErrorCorrectionLevel::High);
    assert_eq!(effective.image_options.image_size, 0.25);
    assert_eq!(stored.error_correction_level, ErrorCorrectionLevel::Low);
    assert_eq!(stored.image_options.image_size, 0.9);
}

#[test]
fn content_encoding_examples() {
    let wifi = ContentFields {
        ssid: Some("Home".to_string()),
        password: Some("secret1".to_string()),
        encryption: Some("WPA".to_string()),
        ..Default::default()
    };
    assert_eq!(encode(QrType::Wifi, &wifi), "WIFI:T:WPA;S:Home;P:secret1;;");

    let phone = ContentFields {
        phone: Some("+1234567890".to_string()),
        ..Default::default()
    };
    assert_eq!(encode(QrType::Phone, &phone), "tel:+1234567890");

    let vcard = ContentFields {
        first_name: Some("Jane".to_string()),
        last_name: Some("Doe".to_string()),
        email: Some("jane@x.com".to_string()),
        ..Default::default()
    };
    let card = encode(QrType::Vcard, &vcard);
    let lines: Vec<_> = card.lines().collect();
    assert!(lines.contains(&"FN:Jane Doe"));
    assert!(lines.contains(&"EMAIL:jane@x.com"));
    for empty in ["ORG:", "TITLE:", "TEL:"] {
        assert!(lines.contains(&empty), "missing {empty}");
    }
}

#[test]
fn plain_renderer_substitutes_tracking_url() {
    let tracking = TrackingConfig::default();
    let url = tracked_payload(QrType::Url, "https://dest.example", Some("abc123"), &tracking);
    assert!(url.contains("abc123"));
    assert!(!url.contains("dest.example"));

    let request = PlainRequest {
        content: "just text".to_string(),
        styling: Styling::default(),
        qr_type: QrType::Text,
        id: Some("abc123".to_string()),
        size: None,
    };
    let result = render_plain(&request, &RenderOptions::default()).unwrap();
    assert_eq!(result.payload, "just text");
    assert_eq!(result.width, 256.0);
}

#[test]
fn undo_walks_back_through_changes() {
    let mut editor = StyleEditor::default();
    editor.update(|s| s.foreground_color = Color::rgb(1, 1, 1));
    editor.update(|s| s.foreground_color = Color::rgb(2, 2, 2));

    assert_eq!(
        editor.undo().map(|s| s.foreground_color),
        Some(Color::rgb(1, 1, 1))
    );
    assert_eq!(editor.undo(), Some(Styling::default()));
    assert_eq!(editor.undo(), None);
}

const CARD_DOC: &str = r##"{
    "meta": { "trackingBaseUrl": "https://go.example.org" },
    "name": "Spring menu",
    "type": "url",
    "id": "menu-1",
    "content": "https://example.com/menu",
    "styling": { "dotStyle": "rounded", "shadow": "large" },
    "template": {
        "title": { "text": "Spring menu", "fontSize": 24, "fontWeight": "bold" },
        "subtitle": { "text": "Scan to order", "fontSize": 14, "fontWeight": 400 },
        "backgroundColor": "#ffffff",
        "textColor": "#1f2937",
        "gradientColor": "#e0e7ff",
        "gradientDirection": "to-bottom",
        "qrPosition": "left",
        "borderRadius": 16,
        "padding": 24,
        "showBorder": false,
        "shadowIntensity": "medium",
        "decorativeStyle": "circles",
        "customFields": [
            { "id": "d", "type": "divider" },
            { "id": "t", "type": "text", "value": "Open daily", "style": { "italic": true } }
        ],
        "ctaButton": { "text": "Order now", "backgroundColor": "#4f46e5", "textColor": "#ffffff", "borderRadius": 8 }
    }
}"##;

#[test]
fn card_document_renders_every_section() {
    let result = render_document(CARD_DOC).unwrap();
    assert_eq!(result.payload, "https://go.example.org/r/menu-1");
    assert!(result.width > 0.0 && result.height > 0.0);
    for text in ["Spring menu", "Scan to order", "Open daily", "Order now"] {
        assert!(result.svg.contains(text), "missing {text}");
    }
    assert!(result.svg.contains("<linearGradient"));
    assert!(result.warnings.is_empty());
}

#[test]
fn short_card_labels_stay_on_one_line() {
    let svg = render_document(CARD_DOC).unwrap().svg;
    for label in ["Order now", "Scan to order", "Open daily"] {
        assert!(svg.contains(&format!(">{label}</text>")), "{label} wrapped");
    }
}

#[test]
fn export_leaves_display_only_effects_out() {
    let preview = render_document(CARD_DOC).unwrap();
    let svg = export_document(CARD_DOC, ExportFormat::Svg, 1_700_000_000_000).unwrap();
    assert_eq!(svg.file_name, "Spring-menu-1700000000000.svg");
    assert_eq!(svg.mime, "image/svg+xml");

    let exported = String::from_utf8(svg.bytes).unwrap();
    assert!(exported.len() < preview.svg.len());
    assert!(!exported.contains("data-edit-target"));
}

#[test]
fn png_and_pdf_exports() {
    let png = export_document(CARD_DOC, ExportFormat::Png, 1).unwrap();
    assert!(png.bytes.starts_with(b"\x89PNG"));
    let pdf = export_document(CARD_DOC, ExportFormat::Pdf, 1).unwrap();
    assert!(pdf.bytes.starts_with(b"%PDF-1.4"));
    assert_eq!(pdf.file_name, "Spring-menu-1.pdf");
}

#[test]
fn gate_logs_and_rejects_concurrent_export() {
    let captured = Captured::default();
    let _guard = captured.install();

    let svg = render_document(CARD_DOC).unwrap().svg;
    let gate = ExportGate::new();
    let notifier = MemoryNotifier::new();
    let mut sink = MemoryDownloadSink::default();

    let held = gate.try_begin(ExportFormat::Png).unwrap();
    assert!(
        gate.export(
            ExportFormat::Svg,
            &svg,
            "menu",
            1,
            &ExportSettings::default(),
            &mut sink,
            &notifier,
        )
        .is_err()
    );
    drop(held);

    gate.export(
        ExportFormat::Svg,
        &svg,
        "menu",
        2,
        &ExportSettings::default(),
        &mut sink,
        &notifier,
    )
    .unwrap();

    assert_eq!(sink.artifacts.len(), 1);
    assert_eq!(sink.artifacts[0].file_name, "menu-2.svg");
    let logs = captured.output();
    assert!(logs.contains("export rejected"));
    assert!(logs.contains("exported"));
}
