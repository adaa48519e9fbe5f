//! ticketera - back-office sales scraper for LATAM ticketing platforms
//!
//! Logs into producer portals, scrapes per-event sales reports and stores
//! them as JSON files and in the shared sales database.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use ticketera_scraper::commands::{EventsCommand, ScrapeCommand, ScrapeOptions};
use ticketera_scraper::config::{Config, OutputFormat};
use ticketera_scraper::filters::FilterChainBuilder;
use ticketera_scraper::storage::Database;
use ticketera_scraper::ticketera::Ticketera;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ticketera",
    version,
    about = "Back-office sales scraper for LATAM ticketing platforms",
    long_about = "Logs into ticketera producer portals, scrapes sales reports (borderaux) and stores them as JSON and in PostgreSQL."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Delay between requests in milliseconds
    #[arg(long, global = true)]
    delay: Option<u64>,

    /// Root directory for JSON output
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// PostgreSQL connection string
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Run the browser without a window (browser-driven portals)
    #[arg(long, global = true, overrides_with = "no_headless")]
    headless: bool,

    /// Show the browser window
    #[arg(long, global = true)]
    no_headless: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct EventFilterArgs {
    /// Required terms in artist or event name (comma-separated)
    #[arg(long, value_delimiter = ',')]
    artist: Vec<String>,

    /// Excluded terms in artist or event name (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Only shows on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Only shows on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Only shows at a venue containing this text
    #[arg(long)]
    venue: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape sales reports of a ticketera
    #[command(alias = "s")]
    Scrape {
        /// Ticketera code (see `ticketera ticketeras`)
        ticketera: Ticketera,

        /// Event id(s) to scrape, instead of the event list
        #[arg(long = "event-id", value_delimiter = ',')]
        event_ids: Vec<String>,

        /// Print reports without saving anything
        #[arg(long)]
        preview: bool,

        /// Store reports in the sales database
        #[arg(long)]
        save_db: bool,

        /// Do not write JSON files
        #[arg(long)]
        no_json: bool,

        /// Sale date to record daily figures under (default: today)
        #[arg(long)]
        fecha_venta: Option<NaiveDate>,

        #[command(flatten)]
        filters: EventFilterArgs,
    },

    /// List events of a ticketera
    #[command(alias = "e")]
    Events {
        /// Ticketera code
        ticketera: Ticketera,

        #[command(flatten)]
        filters: EventFilterArgs,
    },

    /// List supported ticketeras
    Ticketeras,

    /// Database maintenance
    Db {
        #[command(subcommand)]
        action: DbCommands,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Create the raw_data, shows and daily_sales tables
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }
    if cli.no_headless {
        config.headless = false;
    } else if cli.headless {
        config.headless = true;
    }

    match cli.command {
        Commands::Scrape { ticketera, event_ids, preview, save_db, no_json, fecha_venta, filters } => {
            let options = ScrapeOptions {
                event_ids,
                preview,
                save_db,
                no_json,
                artists: filters.artist,
                exclude: filters.exclude,
                from: filters.from,
                to: filters.to,
                venue: filters.venue,
                fecha_venta,
            };

            let cmd = ScrapeCommand::new(config, options);
            let result = cmd.execute(ticketera).await?;

            println!("{}", result.output);
            for line in &result.summary.db_lines {
                eprintln!("{}", line);
            }
            eprintln!("{}", result.summary);

            if result.summary.scraped == 0 && result.summary.failed > 0 {
                anyhow::bail!("All {} events failed", result.summary.failed);
            }
        }

        Commands::Events { ticketera, filters } => {
            let chain = FilterChainBuilder::new()
                .keywords(filters.artist)
                .exclude_keywords(filters.exclude)
                .date_range(filters.from, filters.to)
                .venue(filters.venue)
                .build();

            let cmd = EventsCommand::new(config, chain);
            let output = cmd.execute(ticketera).await?;
            println!("{}", output);
        }

        Commands::Ticketeras => {
            println!("Supported ticketeras:\n");
            println!(
                "{:<12} {:<18} {:<7} {:<8} {:<8} {:<30}",
                "Code", "Name", "Country", "Currency", "Access", "Back-office"
            );
            println!("{:-<12} {:-<18} {:-<7} {:-<8} {:-<8} {:-<30}", "", "", "", "", "", "");

            for ticketera in Ticketera::all() {
                println!(
                    "{:<12} {:<18} {:<7} {:<8} {:<8} {:<30}",
                    ticketera.code(),
                    ticketera.display_name(),
                    ticketera.country(),
                    ticketera.currency(),
                    ticketera.access().to_string(),
                    ticketera.domain()
                );
            }
        }

        Commands::Db { action: DbCommands::Init } => {
            let url = config
                .database_url
                .as_deref()
                .context("No database configured: set DATABASE_URL or --database-url")?;
            let database = Database::connect(url).await?;
            database.ensure_schema().await?;
            println!("Database schema ready");
        }
    }

    Ok(())
}
