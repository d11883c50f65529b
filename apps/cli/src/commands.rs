//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use postforge_core::{EnhanceOutcome, IngestResult, ItemOutcome, ProgressReporter, StorageHandle};
use postforge_rewrite::RewriteClient;
use postforge_search::SearchClient;
use postforge_shared::{AppConfig, init_config, load_config, load_config_from};
use postforge_storage::Storage;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Postforge — harvest blog articles and publish AI-enhanced editions.
#[derive(Parser)]
#[command(
    name = "postforge",
    version,
    about = "Harvest the oldest articles from a blog and rewrite the newest into an enhanced edition.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a config file (defaults to ~/.postforge/postforge.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Harvest the oldest articles from the configured blog into local storage.
    Ingest,

    /// Research and rewrite the newest unenhanced article.
    Enhance,

    /// Run ingest followed by enhance.
    Run,

    /// List all stored articles.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "postforge=info",
        1 => "postforge=debug",
        _ => "postforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Ingest => cmd_ingest(&config).await,
        Command::Enhance => cmd_enhance(&config).await,
        Command::Run => cmd_run(&config).await,
        Command::List => cmd_list(&config).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ingest(config: &AppConfig) -> Result<()> {
    info!(base_url = %config.site.base_url, "ingesting articles");

    let storage = open_storage(config).await?;
    let reporter = CliProgress::new();
    let result = postforge_core::run_ingest(config, &storage, &reporter).await?;
    reporter.finish();

    print_ingest_summary(&result);
    Ok(())
}

async fn cmd_enhance(config: &AppConfig) -> Result<()> {
    let handle = StorageHandle::open_owned(config).await?;
    run_enhance(config, &handle).await
}

async fn cmd_run(config: &AppConfig) -> Result<()> {
    info!(base_url = %config.site.base_url, "running full pipeline");

    let storage = open_storage(config).await?;
    let reporter = CliProgress::new();
    let result = postforge_core::run_ingest(config, &storage, &reporter).await?;
    reporter.finish();
    print_ingest_summary(&result);

    run_enhance(config, &StorageHandle::Borrowed(&storage)).await
}

async fn run_enhance(config: &AppConfig, handle: &StorageHandle<'_>) -> Result<()> {
    let client = postforge_extract::build_client()?;
    let search = SearchClient::from_config(&config.search)?;
    let rewrite = RewriteClient::from_config(&config.openrouter)?;
    let exclude_host = config.site.host()?;

    info!(exclude_host = %exclude_host, "enhancing latest article");

    let reporter = CliProgress::new();
    reporter.phase("Researching and rewriting");
    let outcome = postforge_core::enhance(&client, handle, &search, &rewrite, &exclude_host).await;
    reporter.finish();

    match outcome? {
        EnhanceOutcome::NoCandidate => {
            println!("No unenhanced article found. Run `postforge ingest` first.");
        }
        EnhanceOutcome::Enhanced { article } => {
            println!();
            println!("  Enhanced article created!");
            println!("  Title: {}", article.title);
            println!("  Slug:  {}", article.slug);
            println!("  References:");
            for link in &article.references {
                println!("    - {link}");
            }
            println!();
        }
    }

    Ok(())
}

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let storage = open_storage(config).await?;
    let articles = storage.list_articles().await?;

    if articles.is_empty() {
        println!("No articles stored yet. Run `postforge ingest` first.");
        return Ok(());
    }

    for article in &articles {
        let marker = if article.is_enhanced() { " [enhanced]" } else { "" };
        println!(
            "{}  {}{}  ({})",
            article.created_at.format("%Y-%m-%d %H:%M"),
            article.title,
            marker,
            article.slug,
        );
    }
    println!();
    println!("{} article(s)", articles.len());

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    let path = config.storage.resolved_db_path()?;
    Ok(Storage::open(&path).await?)
}

fn print_ingest_summary(result: &IngestResult) {
    println!();
    println!(
        "  Ingest complete: {} saved, {} skipped",
        result.saved,
        result.outcomes.len() - result.saved,
    );
    for outcome in &result.outcomes {
        match outcome {
            ItemOutcome::Saved { slug } => println!("  + {slug}"),
            ItemOutcome::Skipped { link, reason } => println!("  - {link} ({reason})"),
        }
    }
    println!("  Time: {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }
}
