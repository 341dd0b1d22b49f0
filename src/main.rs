//! litsurvey - arXiv Literature Survey Assistant
//!
//! Fetches papers from arXiv for a topic, asks an LLM for a structured
//! literature survey draft and exports it as PDF or Word.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! litsurvey survey "graphene batteries" --max-results 20 --top-k 5
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! litsurvey serve --port 3000
//! ```

use anyhow::{Context, Result};
use chrono::Local;
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use litsurvey::arxiv::{ArxivClient, PaperRecord, QueryOptions};
use litsurvey::config::LlmSettings;
use litsurvey::export::{self, ExportFormat};
use litsurvey::llm::{OpenAiChat, AVAILABLE_MODELS, DEFAULT_MODEL};
use litsurvey::pipeline::{self, SurveyParams, DEFAULT_TOPIC};
use litsurvey::server::{self, AppState};
use litsurvey::SurveyError;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// arXiv Literature Survey Assistant
#[derive(Parser)]
#[command(name = "litsurvey")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Secrets file holding OPENAI_API_KEY (default: ./secrets.toml, then the user config dir)
    #[arg(long, global = true)]
    secrets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch papers and generate a literature survey draft
    Survey {
        /// Research topic
        #[arg(default_value = DEFAULT_TOPIC)]
        topic: String,

        /// Papers to fetch from arXiv
        #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u32).range(5..=50))]
        max_results: u32,

        /// Papers passed to the LLM
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(3..=10))]
        top_k: u32,

        /// LLM model
        #[arg(long, default_value = DEFAULT_MODEL, value_parser = PossibleValuesParser::new(AVAILABLE_MODELS.iter().copied()))]
        model: String,

        /// arXiv sorting
        #[arg(long, default_value = "relevance", value_parser = ["relevance", "submittedDate"])]
        sort_by: String,

        /// Export format
        #[arg(long, default_value = "both", value_parser = ["pdf", "docx", "both", "none"])]
        format: String,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
    },

    /// Fetch papers only and list them
    Fetch {
        /// Search keywords
        topic: String,

        /// Papers to fetch from arXiv
        #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u32).range(5..=50))]
        max_results: u32,

        /// arXiv sorting
        #[arg(long, default_value = "relevance", value_parser = ["relevance", "submittedDate"])]
        sort_by: String,

        /// Write the list to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Run the HTTP form front-end
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Survey {
            topic,
            max_results,
            top_k,
            model,
            sort_by,
            format,
            output,
        } => {
            let params = SurveyParams {
                topic,
                max_results,
                top_k: top_k as usize,
                model,
                sort_by: sort_by.parse()?,
            };
            run_survey_command(params, &format, &output, cli.secrets.as_deref()).await
        }
        Commands::Fetch {
            topic,
            max_results,
            sort_by,
            csv,
        } => {
            let fetcher = ArxivClient::new()?;
            let options = QueryOptions {
                max_results,
                sort_by: sort_by.parse()?,
            };
            run_fetch_command(&fetcher, &topic, &options, csv.as_deref()).await
        }
        Commands::Serve { port, host } => run_server(host, port, cli.secrets.as_deref()).await,
    }
}

// ============================================================================
// Survey
// ============================================================================

async fn run_survey_command(
    params: SurveyParams,
    format: &str,
    output_dir: &Path,
    secrets: Option<&Path>,
) -> Result<()> {
    // Credentials first so a missing key fails before any network work
    let settings = LlmSettings::resolve(secrets).context("Failed to load LLM credentials")?;
    let fetcher = ArxivClient::new()?;

    println!("\n--- Fetching papers ---");
    let papers = pipeline::fetch_papers(&fetcher, &params).await?;

    println!("Retrieved {} papers.", papers.len());
    print_papers(&papers);

    println!("\n--- Generating survey ({}) ---", params.model);
    let model = OpenAiChat::new(settings, params.model.clone())?;
    let survey = pipeline::summarize(&params, &papers, &model)
        .await
        .context("Survey generation failed")?;

    println!("\n=== Literature Survey Draft ===\n");
    println!("{}", survey);

    let formats: &[ExportFormat] = match format {
        "pdf" => &[ExportFormat::Pdf],
        "docx" => &[ExportFormat::Docx],
        "none" => &[],
        _ => &[ExportFormat::Pdf, ExportFormat::Docx],
    };
    if formats.is_empty() {
        return Ok(());
    }

    println!("\n--- Export Report ---");
    let output_folder = create_output_folder(output_dir, &params.topic)?;
    for format in formats {
        let document = export::export(&survey, *format)?;
        let path = output_folder.join(document.file_name);
        std::fs::write(&path, &document.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved: {:?}", path);
    }

    println!("\n✓ Survey complete. Results in: {}", output_folder.display());
    Ok(())
}

/// `<output>/<timestamp>_<topic>` folder for one run
fn create_output_folder(output_dir: &Path, topic: &str) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let safe_topic: String = topic
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect::<String>()
        .trim()
        .replace(' ', "_");
    let output_folder = output_dir.join(format!("{}_{}", timestamp, safe_topic));
    std::fs::create_dir_all(&output_folder).context("Failed to create output directory")?;
    Ok(output_folder)
}

fn print_papers(papers: &[PaperRecord]) {
    for paper in papers {
        println!("- {} ({}) - {}", paper.title, paper.published_year, paper.link);
    }
}

// ============================================================================
// Fetch
// ============================================================================

async fn run_fetch_command(
    fetcher: &ArxivClient,
    topic: &str,
    options: &QueryOptions,
    csv_path: Option<&Path>,
) -> Result<()> {
    let papers = fetcher.fetch(topic, options).await;
    if papers.is_empty() {
        return Err(SurveyError::NoPapers.into());
    }

    println!("Retrieved {} papers.", papers.len());
    print_papers(&papers);

    if let Some(path) = csv_path {
        let rows: Vec<PaperRow> = papers.iter().map(PaperRow::from).collect();
        save_csv(path, &rows)?;
    }
    Ok(())
}

/// Flat CSV row for a paper
#[derive(Debug, Serialize)]
struct PaperRow<'a> {
    title: &'a str,
    year: i32,
    link: &'a str,
    authors: String,
    summary: &'a str,
}

impl<'a> From<&'a PaperRecord> for PaperRow<'a> {
    fn from(p: &'a PaperRecord) -> Self {
        Self {
            title: &p.title,
            year: p.published_year,
            link: &p.link,
            authors: p.authors.join("; "),
            summary: &p.summary,
        }
    }
}

/// Save data to CSV file
fn save_csv<T: Serialize>(path: &Path, data: &[T]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to create CSV writer")?;

    for item in data {
        wtr.serialize(item).context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    println!("Saved: {:?}", path);
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, secrets: Option<&Path>) -> Result<()> {
    let llm = LlmSettings::resolve(secrets).context("Failed to load LLM credentials")?;
    let state = AppState {
        fetcher: ArxivClient::new()?,
        llm,
    };

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    info!(host = %host, port = port, "Serving survey form");
    println!("Starting server at http://{}", addr);

    server::serve(addr, state).await.context("Server error")?;
    Ok(())
}
