//! untable CLI - PDF table extraction and summarization tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use untable::render::{self, JsonFormat};
use untable::{
    ChatCompletionsSummarizer, DetectionStrategy, DocumentLoader, ExtractionReport, Invocation,
    LoadOptions, PageSelection, Pipeline, PipelineOptions, Progress, SummarizerConfig,
    TableFormat,
};

#[derive(Parser)]
#[command(name = "untable")]
#[command(version)]
#[command(about = "Extract tables from PDF documents and summarize them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract tables and print them with their summaries
    Extract(ExtractArgs),

    /// Show document information and tables found per page
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Detection strategy
        #[arg(long, value_enum, default_value = "layout")]
        strategy: StrategyArg,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputArg,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,

    /// Detection strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Skip summarization
    #[arg(long)]
    no_summary: bool,

    /// Table rendering sent to the summarizer
    #[arg(long, value_enum)]
    summary_format: Option<SummaryFormatArg>,

    /// Drop a first row with more than this share of missing cells
    #[arg(long, value_name = "RATIO")]
    header_ratio: Option<f32>,

    /// Process pages one after another
    #[arg(long)]
    sequential: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// API key for the summarization endpoint
    #[arg(long, env = "UNTABLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, env = "UNTABLE_MODEL")]
    model: Option<String>,

    /// Endpoint base URL
    #[arg(long, env = "UNTABLE_BASE_URL")]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Ruled grids, falling back to strict text alignment
    Layout,
    /// Text alignment only
    Whitespace,
}

impl From<StrategyArg> for DetectionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Layout => DetectionStrategy::LayoutInference,
            StrategyArg::Whitespace => DetectionStrategy::Whitespace,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    /// Tables with summaries as plain text
    Text,
    /// Markdown document
    Markdown,
    /// One CSV record per cell
    Csv,
    /// Full JSON report
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum SummaryFormatArg {
    Plain,
    Markdown,
    Csv,
    Html,
}

impl From<SummaryFormatArg> for TableFormat {
    fn from(arg: SummaryFormatArg) -> Self {
        match arg {
            SummaryFormatArg::Plain => TableFormat::Plain,
            SummaryFormatArg::Markdown => TableFormat::Markdown,
            SummaryFormatArg::Csv => TableFormat::Csv,
            SummaryFormatArg::Html => TableFormat::Html,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract(args) => cmd_extract(args),
        Commands::Info { input, strategy } => cmd_info(&input, strategy),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn pipeline_options(args: &ExtractArgs) -> Result<PipelineOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.config {
        Some(path) => PipelineOptions::from_toml_file(path)?,
        None => PipelineOptions::default(),
    };

    if let Some(strategy) = args.strategy {
        options.strategy = strategy.into();
    }
    if let Some(pages) = &args.pages {
        let selection =
            PageSelection::parse(pages).map_err(|e| format!("Invalid page range: {}", e))?;
        options.load = options.load.with_pages(selection);
    }
    if let Some(format) = args.summary_format {
        options.summary_format = format.into();
    }
    if let Some(ratio) = args.header_ratio {
        options.normalize = options.normalize.with_sparse_header_ratio(ratio);
    }
    if args.sequential {
        options.parallel = false;
    }

    Ok(options)
}

fn summarizer_config(args: &ExtractArgs) -> SummarizerConfig {
    let mut config = SummarizerConfig::from_env();
    if let Some(key) = &args.api_key {
        config = config.with_api_key(key.as_str());
    }
    if let Some(model) = &args.model {
        config = config.with_model(model.as_str());
    }
    if let Some(url) = &args.base_url {
        config = config.with_base_url(url.as_str());
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config
}

fn cmd_extract(args: ExtractArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = pipeline_options(&args)?;
    let mut pipeline = Pipeline::new(options);

    if !args.no_summary {
        match ChatCompletionsSummarizer::new(summarizer_config(&args)) {
            Ok(summarizer) => pipeline = pipeline.with_summarizer(Box::new(summarizer)),
            Err(e) => eprintln!(
                "{} {} (continuing without summaries)",
                "Warning:".yellow().bold(),
                e
            ),
        }
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Loading PDF...");

    let invocation = Invocation::from_path(&args.input);
    let report = pipeline.run_with_progress(&invocation, &mut |progress| match progress {
        Progress::Loaded { pages } => {
            pb.set_message(format!("Detecting tables on {} pages...", pages));
        }
        Progress::TablesFound(count) => {
            pb.set_length(count as u64);
            pb.set_message("Summarizing...");
        }
        Progress::TableDone(record) => {
            pb.inc(1);
            if record.summary.is_failed() {
                pb.set_message(format!("Table {} summary failed", record.table_index + 1));
            }
        }
    })?;
    pb.finish_and_clear();

    print_status(&report);

    let output = match args.format {
        OutputArg::Text => render::report_to_text(&report),
        OutputArg::Markdown => render::report_to_markdown(&report),
        OutputArg::Csv => render::report_to_csv(&report)?,
        OutputArg::Json => {
            let format = if args.compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            render::to_json(&report, format)?
        }
    };

    write_output(args.output.as_deref(), &output)
}

fn print_status(report: &ExtractionReport) {
    if report.tables.is_empty() {
        eprintln!("{}", "No tables found in the PDF.".yellow());
        return;
    }

    let failed = report.failed_summaries();
    eprintln!(
        "{} {} tables from {} pages",
        "Extracted".green().bold(),
        report.tables.len(),
        report.pages_processed
    );
    if failed > 0 {
        eprintln!("{} {} summaries failed", "Warning:".yellow().bold(), failed);
    }
    if report.tables_skipped > 0 {
        eprintln!(
            "{} {} tables could not be parsed",
            "Warning:".yellow().bold(),
            report.tables_skipped
        );
    }
}

fn write_output(path: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        fs::write(path, content)?;
        eprintln!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_info(input: &Path, strategy: StrategyArg) -> Result<(), Box<dyn std::error::Error>> {
    let doc = DocumentLoader::new(LoadOptions::new().lenient()).open(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), doc.metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), doc.metadata.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if doc.metadata.encrypted { "Yes" } else { "No" }
    );

    if let Some(ref title) = doc.metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = doc.metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref producer) = doc.metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }

    let options = PipelineOptions::default().with_strategy(strategy.into());
    let extraction = Pipeline::new(options).extract_detailed(&doc);

    println!();
    println!("{}", "Tables".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for page in doc.pages() {
        let count = extraction
            .tables
            .iter()
            .filter(|(number, _)| *number == page.number)
            .count();
        let label = format!("Page {}", page.number);
        if count == 0 {
            println!("{}: {}", label.bold(), "none".dimmed());
        } else {
            println!("{}: {}", label.bold(), count);
        }
    }

    println!("{}: {}", "Total".bold(), extraction.tables.len());
    if extraction.regions_skipped > 0 {
        println!("{}: {}", "Unparsed".bold(), extraction.regions_skipped);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "untable".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF table extraction and summarization tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_flags() {
        let cli = Cli::try_parse_from([
            "untable",
            "extract",
            "report.pdf",
            "--strategy",
            "whitespace",
            "--pages",
            "2-4",
            "--header-ratio",
            "0.7",
            "--sequential",
            "--no-summary",
            "--format",
            "json",
        ])
        .unwrap();

        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let options = pipeline_options(&args).unwrap();
        assert_eq!(options.strategy, DetectionStrategy::Whitespace);
        assert!(options.load.pages.includes(3));
        assert!(!options.load.pages.includes(5));
        assert_eq!(options.normalize.sparse_header_ratio, 0.7);
        assert!(!options.parallel);
        assert!(args.no_summary);
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("untable.toml");
        fs::write(&path, "strategy = \"whitespace\"\nsummary_format = \"csv\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "untable",
            "extract",
            "report.pdf",
            "--config",
            path.to_str().unwrap(),
            "--strategy",
            "layout",
        ])
        .unwrap();

        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let options = pipeline_options(&args).unwrap();
        assert_eq!(options.strategy, DetectionStrategy::LayoutInference);
        assert_eq!(options.summary_format, TableFormat::Csv);
    }

    #[test]
    fn test_bad_page_range() {
        let cli =
            Cli::try_parse_from(["untable", "extract", "a.pdf", "--pages", "5-2"]).unwrap();
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert!(pipeline_options(&args).is_err());
    }
}
