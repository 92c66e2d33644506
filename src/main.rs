use anyhow::{bail, Context, Result};
use biodata_export::capture::{CaptureTarget, Capturer, MemoryCapturer};
use biodata_export::download::{suggested_filename, DirectorySink};
use biodata_export::print::{prepare_print, HtmlFileOpener};
use biodata_export::{ExportConfig, ExportOutcome, Exporter, ImageMime, PlatformProfile};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "biodata-export", version, about = "Export a rendered bio-data preview to PNG, JPEG or PDF")]
struct Cli {
    /// JSON configuration file (missing keys use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the constrained mobile profile (1x capture, smaller ceilings)
    #[arg(long, global = true, conflicts_with = "user_agent")]
    mobile: bool,

    /// Pick the platform profile from a user agent string
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export the preview as an image
    Image {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value_t = Format::Png)]
        format: Format,
    },
    /// Export the preview as an A4 PDF
    Pdf {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write a print-ready HTML document around preview markup
    Print {
        /// File holding the preview markup
        #[arg(long)]
        markup: PathBuf,
        /// Origin serving the application stylesheet
        #[arg(long)]
        origin: Option<String>,
        /// Output HTML file
        #[arg(long, default_value = "biodata-print.html")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Pre-rendered preview image (PNG or JPEG)
    #[arg(long, required_unless_present = "url")]
    input: Option<PathBuf>,

    /// Page holding the preview (requires the `cdp` feature)
    #[arg(long, conflicts_with = "input")]
    url: Option<String>,

    /// Selector of the preview root
    #[arg(long, default_value = "#biodata-preview")]
    selector: String,

    /// Full name used in the conventional file name
    #[arg(long)]
    name: Option<String>,

    /// Explicit output file name
    #[arg(long, conflicts_with = "name")]
    filename: Option<String>,

    /// Output directory
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Jpeg,
}

impl From<Format> for ImageMime {
    fn from(f: Format) -> Self {
        match f {
            Format::Png => ImageMime::Png,
            Format::Jpeg => ImageMime::Jpeg,
        }
    }
}

fn load_config(cli: &Cli) -> Result<ExportConfig> {
    let mut config = match &cli.config {
        Some(path) => ExportConfig::from_json_file(path)?,
        None => ExportConfig::default(),
    };
    if cli.mobile {
        config.profile = PlatformProfile::mobile();
    } else if let Some(ua) = &cli.user_agent {
        config.profile = PlatformProfile::from_user_agent(ua);
    }
    debug!("Using profile {:?}", config.profile);
    Ok(config)
}

fn output_name(source: &SourceArgs, ext: &str) -> String {
    source
        .filename
        .clone()
        .unwrap_or_else(|| suggested_filename(source.name.as_deref(), ext))
}

fn run_export<C: Capturer>(capturer: C, config: ExportConfig, source: &SourceArgs, format: Option<ImageMime>) -> ExportOutcome {
    let sink = DirectorySink::new(&source.out_dir);
    let exporter = Exporter::new(capturer, sink, config);
    let target = CaptureTarget::new(source.selector.clone());
    match format {
        Some(mime) => exporter.export_to_image(Some(&target), mime, Some(&output_name(source, mime.extension()))),
        None => exporter.export_to_pdf(Some(&target), Some(&output_name(source, "pdf"))),
    }
}

fn export(config: ExportConfig, source: &SourceArgs, format: Option<ImageMime>) -> Result<ExportOutcome> {
    if let Some(input) = &source.input {
        let mut capturer = MemoryCapturer::new();
        capturer
            .mount_file(source.selector.clone(), input)
            .with_context(|| format!("loading {}", input.display()))?;
        return Ok(run_export(capturer, config, source, format));
    }

    match &source.url {
        Some(url) => export_from_url(url, config, source, format),
        None => bail!("either --input or --url is required"),
    }
}

#[cfg(feature = "cdp")]
fn export_from_url(url: &str, config: ExportConfig, source: &SourceArgs, format: Option<ImageMime>) -> Result<ExportOutcome> {
    let capturer = biodata_export::cdp::CdpCapturer::launch(config.viewport)?
        .with_settle(config.settle.total())
        .with_cache_disabled(config.cache_bust);
    capturer.load_url(url)?;
    Ok(run_export(capturer, config, source, format))
}

#[cfg(not(feature = "cdp"))]
fn export_from_url(_url: &str, _config: ExportConfig, _source: &SourceArgs, _format: Option<ImageMime>) -> Result<ExportOutcome> {
    bail!("--url needs a build with the `cdp` feature; pass --input instead")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;

    let config = load_config(&cli)?;
    let outcome = match &cli.command {
        Command::Image { source, format } => export(config, source, Some((*format).into()))?,
        Command::Pdf { source } => export(config, source, None)?,
        Command::Print { markup, origin, out } => {
            let html = std::fs::read_to_string(markup).with_context(|| format!("reading {}", markup.display()))?;
            prepare_print(&HtmlFileOpener::new(out), &html, origin.as_deref())
        }
    };

    println!("{}", serde_json::to_string(&outcome)?);
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
