use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use occurrence_engine::{
    parse_anchor, parse_listing, parse_paragraphs, split_listing_text, BatchOutcome, EngineConfig,
    Paragraph,
};

#[derive(Parser)]
#[command(name = "occurrences")]
#[command(about = "Resolve event prose into calendar occurrences", long_about = None)]
struct Cli {
    /// JSON engine configuration (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Date relative expressions resolve against (YYYY-MM-DD, RFC 3339, or RFC 2822)
    #[arg(long)]
    anchor: String,

    /// Input layout
    #[arg(long, value_enum, default_value_t = Mode::Feed)]
    mode: Mode,

    /// What to print
    #[arg(long, value_enum, default_value_t = Output::Drafts)]
    output: Output,

    /// Exit with an error when no event could be resolved
    #[arg(long)]
    fail_on_empty: bool,

    /// Input file; reads stdin when omitted or `-`
    input: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Paragraphs separated by blank lines, titles marked `**like this**`
    Feed,
    /// Blocks separated by `---` lines, parts by blank lines
    Listing,
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    /// Event drafts plus diagnostics
    Drafts,
    /// One calendar entry per occurrence
    Calendar,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let tz = config.tz()?;
    let anchor = parse_anchor(&cli.anchor, &tz).context("parsing --anchor")?;
    let text = read_input(cli.input.as_ref())?;

    let outcome = match cli.mode {
        Mode::Feed => parse_paragraphs(&split_paragraphs(&text), anchor, &config),
        Mode::Listing => parse_listing(&split_listing_text(&text), anchor, &config),
    };
    log::info!(
        "resolved {} event(s) with {} occurrence(s); {} skipped",
        outcome.events.len(),
        outcome.occurrence_count(),
        outcome.diagnostics.len()
    );

    print_outcome(&outcome, cli.output, &config)?;

    if cli.fail_on_empty && outcome.events.is_empty() {
        bail!("no events resolved from input");
    }
    Ok(())
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display())),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

/// Blank-line separated paragraphs, each read as marked-up text.
fn split_paragraphs(text: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(Paragraph::from_marked_text(&current.join(" ")));
                current.clear();
            }
        } else {
            current.push(line.trim());
        }
    }
    paragraphs
}

fn print_outcome(outcome: &BatchOutcome, output: Output, config: &EngineConfig) -> Result<()> {
    let json = match output {
        Output::Drafts => serde_json::to_string_pretty(outcome)?,
        Output::Calendar => serde_json::to_string_pretty(&outcome.calendar_entries(&config.tz()?))?,
    };
    println!("{json}");
    Ok(())
}
