//! PDF Preview - Entry point
//!
//! Renders a first-page preview of every locator given on the command line.

use anyhow::Context;
use pdf_preview::{
    ContainerSize, FileDownloader, PdfiumService, PreviewController, RenderStatus,
    SourceConfig, TargetSurface,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Render first-page previews of PDF documents

USAGE:
  pdf-preview [OPTIONS] LOCATOR...

OPTIONS:
  --width PX          Container width in pixels [default: 800]
  --height PX         Container height in pixels [default: 1000]
  --out DIR           Directory for previews and downloads [default: .]
  --download          Also save each document as document<N>.pdf
  --allow-private     Allow URLs that resolve to private addresses
  --pdfium-dir DIR    Extra directory to search for the PDFium library (repeatable)
  -h, --help          Print help

LOCATOR is a file path, file:// URL, http(s):// URL or base64 data: URI.
";

struct Args {
    width: u32,
    height: u32,
    out: PathBuf,
    download: bool,
    allow_private: bool,
    pdfium_dirs: Vec<PathBuf>,
    locators: Vec<String>,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let args = Args {
        width: pargs.opt_value_from_str("--width")?.unwrap_or(800),
        height: pargs.opt_value_from_str("--height")?.unwrap_or(1000),
        out: pargs
            .opt_value_from_os_str("--out", |s| Ok::<_, std::convert::Infallible>(PathBuf::from(s)))?
            .unwrap_or_else(|| PathBuf::from(".")),
        download: pargs.contains("--download"),
        allow_private: pargs.contains("--allow-private"),
        pdfium_dirs: pargs.values_from_os_str("--pdfium-dir", |s| {
            Ok::<_, std::convert::Infallible>(PathBuf::from(s))
        })?,
        locators: pargs
            .finish()
            .into_iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect(),
    };

    Ok(Some(args))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_preview=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(args) = parse_args()? else {
        print!("{}", HELP);
        return Ok(());
    };
    if args.locators.is_empty() {
        anyhow::bail!("no locators given; see --help");
    }

    let source_config = SourceConfig {
        allow_private_urls: args.allow_private,
        ..SourceConfig::default()
    };
    let service = PdfiumService::with_search_dirs(source_config.clone(), &args.pdfium_dirs)?;

    let preview = PreviewController::new(args.locators, Arc::new(service));
    let surface = TargetSurface::shared(ContainerSize::new(args.width, args.height));
    preview.bind_surface(Arc::clone(&surface));

    let downloader = FileDownloader::new(&args.out, source_config);
    if args.download {
        preview.bind_downloader(Arc::new(downloader.clone()));
    }

    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("creating {}", args.out.display()))?;

    tracing::info!(documents = preview.len(), "Starting PDF preview");

    for position in 0..preview.len() {
        if position > 0 {
            preview.select_next();
        }
        preview.render().await;

        let snapshot = preview.snapshot();
        println!("{}", serde_json::to_string(&snapshot)?);

        if snapshot.status == RenderStatus::Ready {
            let path = args.out.join(format!("preview{}.png", position + 1));
            surface.lock().save_png(&path)?;
            tracing::info!(path = %path.display(), "preview written");
        }
        if args.download {
            preview.download();
        }
    }

    downloader.flush().await;
    preview.shutdown();

    Ok(())
}
