//! CLI binary for equity-extract.
//!
//! A thin shim over the library crate: reads the PDFs into a `Session`,
//! lets the operator inspect or edit the prompt, submits it once and prints
//! the answer with table previews.

use anyhow::{bail, Context, Result};
use clap::Parser;
use equity_extract::{
    missing_fields, preview_tables, write_preview, ExtractionConfig, ExtractionProgressCallback,
    JsonArtifact, ProgressCallback, Session, Upload,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner while files are read and another
/// while the model request is pending.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn start(&self, prefix: &'static str, msg: String) {
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_prefix(prefix);
        bar.set_message(msg);
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Some(old) = self.bar.lock().unwrap().replace(bar) {
            old.finish_and_clear();
        }
    }

    fn println(&self, line: String) {
        match self.bar.lock().unwrap().as_ref() {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, name: &str, index: usize, total: usize) {
        let msg = format!("{name} ({index}/{total})");
        if index == 1 {
            self.start("Reading", msg);
        } else if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            bar.set_message(msg);
        }
    }

    fn on_document_read(&self, name: &str, pages: usize, tables: usize) {
        self.println(format!(
            "  {} {}  {}",
            green("✓"),
            name,
            dim(&format!("{pages} pages, {tables} tables"))
        ));
    }

    fn on_document_error(&self, name: &str, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.println(format!("  {} {}  {}", red("✗"), name, red(first_line)));
    }

    fn on_request_start(&self, model: &str, prompt_len: usize) {
        self.start("Extracting", format!("{model}, {prompt_len} chars"));
    }

    fn on_request_complete(&self, _success: bool) {
        self.finish();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract from one report
  equity-extract research.pdf

  # Several reports in one prompt, save financial_data.json
  equity-extract q3.pdf update.pdf -o out/

  # Look at the prompt first (no API key needed)
  equity-extract --print-prompt research.pdf > prompt.txt

  # Submit an edited prompt
  equity-extract --prompt-file prompt.txt research.pdf

  # Edit the prompt interactively
  equity-extract --edit research.pdf

  # JSON only, for scripting
  equity-extract --json research.pdf | jq .target_price

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY             Google Gemini API key
  EQUITY_EXTRACT_MODEL       Model ID (default gemini-2.0-flash)
  EQUITY_EXTRACT_ENDPOINT    API base URL
  EQUITY_EXTRACT_PASSWORD    PDF user password
  EQUITY_EXTRACT_OUTPUT_DIR  Directory for financial_data.json
  EDITOR / VISUAL            Editor used by --edit
  PDFIUM_LIB_PATH            Directory containing libpdfium
  RUST_LOG                   Log filter (overrides -v / -q)
"#;

/// Extract financial data from equity-research PDFs with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "equity-extract",
    version,
    about = "Extract ratings, price targets and financial figures from equity-research PDFs",
    long_about = "Read the text and tables of one or more equity-research PDFs, build an \
extraction prompt, and ask a Gemini model to fill a fixed set of fields (reviewer, analyst, \
rating, current/target price, revenue/EBITDA/PAT estimates and quarterly figures).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to read, in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, env = "EQUITY_EXTRACT_MODEL", default_value = "gemini-2.0-flash")]
    model: String,

    /// API base URL.
    #[arg(
        long,
        env = "EQUITY_EXTRACT_ENDPOINT",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    endpoint: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "EQUITY_EXTRACT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print the default prompt and exit.
    #[arg(long, conflicts_with_all = ["prompt_file", "edit"])]
    print_prompt: bool,

    /// Submit the prompt in this file instead of the default one.
    #[arg(long, conflicts_with = "edit")]
    prompt_file: Option<PathBuf>,

    /// Open the prompt in $EDITOR before submitting.
    #[arg(long)]
    edit: bool,

    /// Save financial_data.json in this directory.
    #[arg(short, long, env = "EQUITY_EXTRACT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Print only the JSON mapping on stdout.
    #[arg(long)]
    json: bool,

    /// Skip the table previews.
    #[arg(long)]
    no_tables: bool,

    /// Bound the model call, in seconds (default: no limit).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    api_timeout: Option<u64>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives the feedback that matters; library INFO logs would
    // tear through it.
    let show_progress = !cli.quiet && !cli.json && !cli.print_prompt;
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

    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };

    let config = build_config(&cli, progress.clone().map(|cb| cb as ProgressCallback))?;
    let mut session = Session::new(config);

    // ── Read ─────────────────────────────────────────────────────────────
    let uploads: Vec<Upload> = cli.inputs.iter().cloned().map(Upload::Path).collect();
    session.upload(&uploads).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }

    if progress.is_none() {
        for (name, err) in session.read_failures() {
            eprintln!("{} {}: {}", red("✗"), name, err);
        }
    }
    if session.documents().is_empty() {
        bail!("None of the {} file(s) could be read", uploads.len());
    }

    // ── Prompt ───────────────────────────────────────────────────────────
    if cli.print_prompt {
        print!("{}", session.prompt());
        return Ok(());
    }

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        session.set_prompt(prompt);
    } else if cli.edit {
        let edited = edit_in_editor(session.prompt())?;
        session.set_prompt(edited);
    }

    // ── Extract ──────────────────────────────────────────────────────────
    // Tables come from the documents, not the answer, so a failed request
    // still shows them.
    let show_tables = !cli.no_tables && !cli.json;
    let data = match session.submit().await {
        Ok(data) => data,
        Err(e) => {
            if show_tables {
                print_tables(&session);
            }
            return Err(e).context("Extraction failed");
        }
    };

    let json = serde_json::to_string_pretty(&data).context("Failed to serialise result")?;
    if cli.json {
        println!("{json}");
    } else {
        println!("{}", bold("Extracted Financial Data"));
        println!("{json}");
    }

    let missing = missing_fields(&data);
    if !missing.is_empty() && !cli.quiet {
        eprintln!(
            "{} {} field(s) missing from the answer: {}",
            yellow("⚠"),
            missing.len(),
            missing.join(", ")
        );
    }

    if let Some(ref dir) = cli.output_dir {
        let artifact = JsonArtifact::from_data(&data)?;
        let path = artifact
            .write_to(dir)
            .await
            .context("Failed to save result")?;
        if !cli.quiet {
            eprintln!("{} saved {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    // ── Tables ───────────────────────────────────────────────────────────
    if show_tables {
        print_tables(&session);
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .endpoint(cli.endpoint.clone())
        .model(cli.model.clone());

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write the prompt to a temp file, open it in the operator's editor and
/// read it back.
fn edit_in_editor(prompt: &str) -> Result<String> {
    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| "vi".to_string());

    let mut file = tempfile::Builder::new()
        .prefix("equity-extract-prompt-")
        .suffix(".txt")
        .tempfile()
        .context("Failed to create prompt file")?;
    file.write_all(prompt.as_bytes())
        .and_then(|_| file.flush())
        .context("Failed to write prompt file")?;

    run_editor(&editor, file.path())?;

    let edited = std::fs::read_to_string(file.path()).context("Failed to read edited prompt")?;
    if edited.trim().is_empty() {
        bail!("The edited prompt is empty; nothing submitted");
    }
    Ok(edited)
}

fn run_editor(editor: &str, path: &Path) -> Result<()> {
    // EDITOR may carry arguments, e.g. "code --wait".
    let mut parts = editor.split_whitespace();
    let program = parts.next().context("EDITOR is empty")?;
    let status = std::process::Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to launch editor '{editor}'"))?;
    if !status.success() {
        bail!("Editor '{editor}' exited with {status}");
    }
    Ok(())
}

/// Print every non-blank table; a table that fails to render is reported
/// and skipped.
fn print_tables(session: &Session) {
    let previews = preview_tables(session.tables());
    if previews.is_empty() {
        return;
    }

    println!();
    println!("{}", bold("Extracted Tables (Preview)"));
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for preview in &previews {
        if let Err(e) = write_preview(&mut handle, preview) {
            eprintln!("{} {}", yellow("⚠"), e);
        }
    }
}
