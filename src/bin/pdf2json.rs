//! CLI binary for edgequake-pdf2json.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2json::{
    extract, extract_to_dir, ExtractionConfig, ExtractionOutput, ExtractionProgressCallback,
    Language, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Percentage-driven progress bar. Events arrive serialised from the
/// pipeline, so the bar position only moves forward.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_progress(&self, message: &str, percentage: u8) {
        self.bar.set_position(percentage as u64);
        self.bar.set_message(message.to_string());
        if percentage >= 100 {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every page into ./output/raw and ./output/structured
  pdf2json receipts.pdf

  # Custom output directory, first 5 pages only
  pdf2json receipts.pdf -o out/ --max-pages 5

  # Plain-text tier only (skip pre-structured tables)
  pdf2json --no-structured scan.pdf

  # Record suspicious extractions as JSON files
  pdf2json --anomaly-dir learning/errors expenses.pdf

  # Print the whole result as JSON on stdout, write nothing to disk
  pdf2json --json --no-save expenses.pdf > result.json

  # Use a specific model
  pdf2json --model gpt-4.1 --provider openai receipts.pdf

  # Extract from URL
  pdf2json https://example.com/expenses-march.pdf

OUTPUT LAYOUT:
  {output}/raw/{document}_page_{n}_raw.json
  {output}/structured/{document}_page_{n}_structured.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium, skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory
"#;

/// Extract per-page JSON records from scanned PDFs using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2json",
    version,
    about = "Extract per-page JSON records from scanned PDFs using Vision LLMs",
    long_about = "Split a PDF (local file or URL) into pages, read each page with a Vision \
Language Model and write a raw record plus a business-structured record (receipts, summaries, \
timesheets) per page. Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any \
OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Directory receiving raw/ and structured/ artifacts.
    #[arg(short, long, env = "PDF2JSON_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Number of pages processed concurrently.
    #[arg(short, long, env = "PDF2JSON_CONCURRENCY", default_value_t = 7)]
    concurrency: usize,

    /// Only process the first N pages.
    #[arg(long, env = "PDF2JSON_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Skip the structured tier and derive tables from plain text.
    #[arg(long, env = "PDF2JSON_NO_STRUCTURED")]
    no_structured: bool,

    /// Languages that are never translated (comma-separated codes).
    #[arg(
        long,
        env = "PDF2JSON_NATIVE_LANGUAGES",
        value_delimiter = ',',
        default_value = "es,en"
    )]
    native_languages: Vec<String>,

    /// Maximum rendered page edge in pixels.
    #[arg(long, env = "PDF2JSON_MAX_PIXELS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(100..=8000))]
    max_pixels: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2JSON_PASSWORD")]
    password: Option<String>,

    /// Write one JSON file per detected anomaly into this directory.
    #[arg(long, env = "PDF2JSON_ANOMALY_DIR")]
    anomaly_dir: Option<PathBuf>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "PDF2JSON_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2JSON_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per call on transient LLM failure.
    #[arg(long, env = "PDF2JSON_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Print the full ExtractionOutput as JSON on stdout.
    #[arg(long, env = "PDF2JSON_JSON")]
    json: bool,

    /// Do not write raw/ and structured/ artifacts.
    #[arg(long, env = "PDF2JSON_NO_SAVE")]
    no_save: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2JSON_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDF2JSON_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while it is visible.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ensure PDFium engine is available ───────────────────────────────────
    // First run downloads the library (~30 MB); later runs only check the cache.
    if !pdfium_auto::is_pdfium_cached() {
        if !cli.quiet {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_with_message("ready ✓");
        } else {
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = if cli.no_save {
        extract(&cli.input, &config).await
    } else {
        extract_to_dir(&cli.input, &config).await
    }
    .context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_summary(&output, (!cli.no_save).then_some(&cli.output));
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let native: Vec<Language> = cli
        .native_languages
        .iter()
        .map(|code| Language::from_code(code.trim()))
        .collect();

    let mut builder = ExtractionConfig::builder()
        .concurrency(cli.concurrency)
        .structured_extraction(!cli.no_structured)
        .native_languages(native)
        .max_rendered_pixels(cli.max_pixels)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .output_dir(&cli.output)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(n) = cli.max_pages {
        builder = builder.max_pages(n);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref dir) = cli.anomaly_dir {
        builder = builder.anomaly_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &ExtractionOutput, saved_to: Option<&PathBuf>) {
    let stats = &output.stats;

    for page in output.pages.iter().filter(|p| p.is_degraded()) {
        let msg = page
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        let msg = if msg.chars().count() > 80 {
            format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
        } else {
            msg
        };
        eprintln!("  {} Page {:>3}  {}", red("✗"), page.page_index, red(&msg));
    }
    for page_index in &stats.missing_pages {
        eprintln!("  {} Page {:>3}  {}", red("✗"), page_index, red("no result"));
    }

    let mark = if stats.degraded_pages == 0 && stats.missing_pages.is_empty() {
        green("✔")
    } else if stats.succeeded_pages == 0 {
        red("✘")
    } else {
        cyan("⚠")
    };
    eprintln!(
        "{}  {}/{} pages  {}ms{}",
        mark,
        bold(&stats.succeeded_pages.to_string()),
        stats.total_pages,
        stats.duration_ms,
        saved_to
            .map(|dir| format!("  →  {}", bold(&dir.display().to_string())))
            .unwrap_or_default(),
    );
    eprintln!(
        "   {} structured  /  {} plain  /  {} degraded",
        dim(&stats.structured_pages.to_string()),
        dim(&stats.plain_pages.to_string()),
        dim(&stats.degraded_pages.to_string()),
    );
}
