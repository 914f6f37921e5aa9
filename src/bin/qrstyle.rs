use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use qrstyle::export::{ExportSettings, FsDownloadSink, build_artifact};
use qrstyle::notify::TracingNotifier;
use qrstyle::{
    ContentFields, ExportFormat, ExportGate, QrDocument, QrType, RenderOptions, RenderTarget,
    StylingInput, encode,
};

#[derive(Parser)]
#[command(name = "qrstyle", version, about = "Styled QR codes and cards to SVG, PNG and PDF")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a QR document
    Render {
        /// Input JSON document (meta, type, content, styling, template)
        input: PathBuf,

        /// Output file (SVG defaults to stdout, PNG/PDF to <name>-<epoch-ms>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: svg, png or pdf
        #[arg(short, long, default_value = "svg")]
        format: String,

        /// Override the QR size in pixels
        #[arg(long)]
        size: Option<u32>,

        /// Render the card as a thumbnail
        #[arg(long)]
        compact: bool,
    },
    /// Print the content string for a QR type and form fields JSON file
    Encode { qr_type: String, fields: PathBuf },
    /// Print a styling JSON file with every default filled in
    Resolve { styling: PathBuf },
    /// Print version info
    Version,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(format!("reading {}: {}", path.display(), e)))
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    match cli.command {
        Commands::Render {
            input,
            output,
            format,
            size,
            compact,
        } => {
            let format = ExportFormat::parse(&format)
                .unwrap_or_else(|| fail(format!("unknown format {:?}", format)));
            let doc = QrDocument::from_json(&read(&input)).unwrap_or_else(|e| fail(e));

            let options = RenderOptions {
                size: size.or(doc.meta.size),
                compact: compact || doc.meta.compact,
                target: RenderTarget::Export,
                ..doc.meta.clone()
            };
            let result = doc.render(&options).unwrap_or_else(|e| fail(e));
            for warning in &result.warnings {
                eprintln!("Warning: {}", warning);
            }
            let settings = ExportSettings::from_options(&options).unwrap_or_else(|e| fail(e));

            match (output, format) {
                (None, ExportFormat::Svg) => println!("{}", result.svg),
                (Some(path), _) => {
                    let artifact = build_artifact(format, &result.svg, &doc.name, epoch_ms(), &settings)
                        .unwrap_or_else(|e| fail(e));
                    if let Err(e) = fs::write(&path, &artifact.bytes) {
                        fail(format!("writing {}: {}", path.display(), e));
                    }
                    eprintln!(
                        "Wrote {} ({}x{})",
                        path.display(),
                        result.width,
                        result.height
                    );
                }
                (None, _) => {
                    let mut sink = FsDownloadSink::new(".");
                    let artifact = ExportGate::new()
                        .export(
                            format,
                            &result.svg,
                            &doc.name,
                            epoch_ms(),
                            &settings,
                            &mut sink,
                            &TracingNotifier,
                        )
                        .unwrap_or_else(|e| fail(e));
                    eprintln!("Wrote {}", sink.path_for(&artifact).display());
                }
            }
        }
        Commands::Encode { qr_type, fields } => {
            let qr_type = QrType::parse(&qr_type)
                .unwrap_or_else(|| fail(format!("unknown QR type {:?}", qr_type)));
            let fields: ContentFields =
                serde_json::from_str(&read(&fields)).unwrap_or_else(|e| fail(e));
            println!("{}", encode(qr_type, &fields));
        }
        Commands::Resolve { styling } => {
            let input: StylingInput =
                serde_json::from_str(&read(&styling)).unwrap_or_else(|e| fail(e));
            let resolved = serde_json::to_string_pretty(&input.resolve()).unwrap_or_else(|e| fail(e));
            println!("{}", resolved);
        }
        Commands::Version => {
            println!("qrstyle {}", env!("CARGO_PKG_VERSION"));
        }
    }
}
