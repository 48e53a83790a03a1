#![allow(
    clippy::needless_pass_by_value,    // clap requires owned strings
    clippy::fn_params_excessive_bools, // CLI commands have many boolean flags
)]

//! docparse CLI - extract text, structure and metadata from documents
//!
//! Thin wrapper over `docparse-backend`: reads files from disk, picks a parser
//! by extension or `--format`, and prints the result as JSON or plain text.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use docparse_backend::{DocumentParser, ParserFactory};
use docparse_core::{Metadata, ParseError, ParsedDocument};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "docparse",
    about = "Extract text, structure and metadata from PDF, DOCX and TXT files",
    long_about = "Extract text, structure and metadata from PDF, DOCX and TXT files.\n\
                  \n\
                  Defaults can be set via .docparse.toml configuration file.",
    version
)]
struct Args {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Load this config file instead of ~/.docparse.toml and ./.docparse.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a single document
    Parse {
        /// Input file path
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Format identifier (pdf, docx, txt); detected from the extension if omitted
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// Password for encrypted PDFs
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,

        /// Output format (default: json, or from config)
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,

        /// Compact JSON output (no pretty-printing)
        #[arg(long)]
        compact: bool,

        /// Print only document metadata
        #[arg(long)]
        metadata_only: bool,

        /// Maximum number of PDF pages to extract text from
        #[arg(long, value_name = "N")]
        max_pages: Option<usize>,
    },

    /// Parse many documents in parallel, one JSON line per file
    #[command(long_about = "Parse many documents in parallel.\n\
                      \n\
                      Prints one JSON object per input line, in input order. Failures are\n\
                      reported inline with their error kind; the exit status is 1 if any\n\
                      file failed.")]
    Batch {
        /// Input file paths
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Format identifier applied to every file
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,

        /// Password for encrypted PDFs
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,

        /// Maximum number of PDF pages to extract text from
        #[arg(long, value_name = "N")]
        max_pages: Option<usize>,
    },

    /// List supported format identifiers
    Formats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full `ParsedDocument` as JSON
    Json,
    /// Extracted text only
    Text,
}

impl OutputFormat {
    fn from_config(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            _ => {
                log::warn!("Unknown output format {value:?} in config, using json");
                None
            }
        }
    }
}

/// One line of `batch` output
#[derive(Debug, Serialize)]
struct BatchRecord {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<ParsedDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorRecord {
    kind: String,
    stage: String,
    message: String,
}

impl From<&ParseError> for ErrorRecord {
    fn from(err: &ParseError) -> Self {
        Self {
            kind: err.kind().to_string(),
            stage: err.stage().to_string(),
            message: err.to_string(),
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Ok(Config::discover()),
    }
}

fn select_parser(
    factory: &ParserFactory,
    format: Option<&str>,
    path: &Path,
) -> Result<docparse_backend::Parser, ParseError> {
    match format {
        Some(identifier) => factory.create(identifier),
        None => factory.create_for_path(path),
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))
}

fn render_metadata_text(metadata: &Metadata) -> String {
    metadata
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(json)
}

#[allow(clippy::too_many_arguments)]
fn run_parse(
    config: &Config,
    input: &Path,
    format: Option<&str>,
    password: Option<String>,
    output: Option<OutputFormat>,
    compact: bool,
    metadata_only: bool,
    max_pages: Option<usize>,
) -> Result<()> {
    let settings = config.parse_settings();
    let factory = ParserFactory::new(settings.parser_config(password, max_pages))?;
    let parser = select_parser(&factory, format, input)?;

    let output = output
        .or_else(|| settings.output.as_deref().and_then(OutputFormat::from_config))
        .unwrap_or(OutputFormat::Json);
    let compact = compact || settings.compact.unwrap_or(false);

    let content = read_input(input)?;
    log::debug!(
        "Parsing {} ({} bytes) as {}",
        input.display(),
        content.len(),
        parser.format()
    );

    let rendered = if metadata_only {
        let metadata = parser.extract_metadata(&content)?;
        match output {
            OutputFormat::Json => to_json(&metadata, compact)?,
            OutputFormat::Text => render_metadata_text(&metadata),
        }
    } else {
        let document = parser.parse(&content)?;
        match output {
            OutputFormat::Json => to_json(&document, compact)?,
            OutputFormat::Text => document.text,
        }
    };

    println!("{rendered}");
    Ok(())
}

fn parse_one(factory: &ParserFactory, format: Option<&str>, path: &Path) -> BatchRecord {
    let outcome = match select_parser(factory, format, path) {
        Err(err) => Err(ErrorRecord::from(&err)),
        Ok(parser) => match fs::read(path) {
            Ok(content) => parser.parse(&content).map_err(|err| ErrorRecord::from(&err)),
            Err(e) => Err(ErrorRecord {
                kind: "io".to_string(),
                stage: "read".to_string(),
                message: format!("cannot read {}: {e}", path.display()),
            }),
        },
    };

    match outcome {
        Ok(document) => BatchRecord {
            path: path.display().to_string(),
            document: Some(document),
            error: None,
        },
        Err(error) => {
            log::warn!("{}: {}", path.display(), error.message);
            BatchRecord {
                path: path.display().to_string(),
                document: None,
                error: Some(error),
            }
        }
    }
}

fn run_batch(
    config: &Config,
    inputs: &[PathBuf],
    format: Option<&str>,
    password: Option<String>,
    max_pages: Option<usize>,
) -> Result<ExitCode> {
    let settings = config.parse_settings();
    let factory = ParserFactory::new(settings.parser_config(password, max_pages))?;

    let records: Vec<BatchRecord> = inputs
        .par_iter()
        .map(|path| parse_one(&factory, format, path))
        .collect();

    let mut failures = 0usize;
    for record in &records {
        if record.error.is_some() {
            failures += 1;
        }
        println!("{}", serde_json::to_string(record)?);
    }

    log::info!(
        "Batch complete: {} succeeded, {failures} failed",
        records.len() - failures
    );
    Ok(if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_formats() {
    let factory = ParserFactory::default();
    for format in factory.supported_formats() {
        let extensions: Vec<String> = format
            .extensions()
            .iter()
            .map(|ext| format!(".{ext}"))
            .collect();
        println!("{}\t{format}\t{}", format.identifier(), extensions.join(", "));
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Parse {
            input,
            format,
            password,
            output,
            compact,
            metadata_only,
            max_pages,
        } => {
            run_parse(
                &config,
                &input,
                format.as_deref(),
                password,
                output,
                compact,
                metadata_only,
                max_pages,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Batch {
            inputs,
            format,
            password,
            max_pages,
        } => run_batch(&config, &inputs, format.as_deref(), password, max_pages),
        Commands::Formats => {
            run_formats();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            match err.downcast_ref::<ParseError>() {
                Some(parse_err) => eprintln!("error[{}]: {parse_err}", parse_err.kind()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
