mod config;
mod error;
mod excel;
mod heuristics;
mod layout;
mod pdf_extract;
mod pipeline;
mod report;
mod resolver;
mod value;

use clap::{Parser, Subcommand};
use layout::Layout;
use pipeline::SourceKind;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "itr-computation",
    about = "Extract ITR-3 filings into a Computation of Total Income workbook"
)]
struct Cli {
    /// Runtime config file
    #[arg(short = 'c', long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Layout file replacing the built-in ITR-3 layout
    #[arg(short = 'l', long, global = true)]
    layout: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an ITR-3 JSON filing
    Json(InputArgs),
    /// Keyword-scan a rendered ITR PDF
    Pdf(InputArgs),
    /// Print the effective field definitions, fallback rules and PDF keywords
    Layout,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Input file
    file: PathBuf,

    /// Output directory for the workbook (overrides config)
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,

    /// Also print the assembled report as JSON
    #[arg(long)]
    print: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = config::Config::load_or_default(&cli.config)?;

    // init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter));
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let layout = match cli.layout.as_ref().or(cfg.layout.as_ref()) {
        Some(path) => Layout::load(path)?,
        None => Layout::builtin()?,
    };
    info!(
        form = %layout.form,
        version = layout.version,
        fallbacks = layout.fallbacks.len(),
        "Layout ready"
    );

    let (kind, args) = match cli.command {
        Command::Json(args) => (SourceKind::Json, args),
        Command::Pdf(args) => (SourceKind::Pdf, args),
        Command::Layout => return print_layout(&layout),
    };

    let out_dir = args.out.unwrap_or(cfg.output_dir);
    let (report, path) = pipeline::run(kind, &args.file, &layout, &out_dir)?;

    if args.print {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if !report.missing_fields.is_empty() {
        eprintln!("Missing fields: {}", report.missing_fields.join(", "));
    }
    for w in &report.warnings {
        eprintln!(
            "Not a number, set to 0: {} (line {}: {:?})",
            w.field, w.line, w.token
        );
    }
    eprintln!("Saved {}", path.display());
    Ok(())
}

fn print_layout(layout: &Layout) -> Result<(), Box<dyn std::error::Error>> {
    let keywords: Vec<_> = heuristics::RULES
        .iter()
        .map(|r| serde_json::json!({ "field": r.field, "keywords": r.keywords }))
        .collect();
    let out = serde_json::json!({
        "layout": layout,
        "pdf_keywords": keywords,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
