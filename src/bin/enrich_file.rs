use std::{fs, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use docenrich::{
    config::Config,
    enrichment::{EnrichmentRequest, enrich},
    extraction::{FileKind, PlainTextExtractor, TextExtractor},
    logging,
};

#[derive(Parser)]
#[command(
    name = "enrich-file",
    about = "Summarize a text file and generate quiz questions, printing the result as JSON"
)]
struct Cli {
    /// File to enrich.
    path: PathBuf,
    /// Cap on characters sent to any provider (defaults to ENRICH_MAX_INPUT_CHARS).
    #[arg(long)]
    max_input_length: Option<usize>,
    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing();
    let config = Config::load().context("invalid configuration")?;

    let bytes =
        fs::read(&cli.path).with_context(|| format!("failed to read {}", cli.path.display()))?;
    let file_name = cli
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let text = PlainTextExtractor
        .extract_text(&bytes, FileKind::from_file_name(&file_name))
        .with_context(|| format!("failed to extract text from {}", cli.path.display()))?;

    let limit = cli
        .max_input_length
        .unwrap_or(config.enrichment.default_max_input_length);
    let request = EnrichmentRequest::new(text, limit)?;
    let result = enrich(&request, &config.enrichment).await;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
