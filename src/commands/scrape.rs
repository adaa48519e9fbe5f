//! Scrape command: log in, pick events, fetch and store their sales reports.

use super::Portal;
use crate::config::Config;
use crate::error::ScrapeError;
use crate::filters::{FilterChain, FilterChainBuilder};
use crate::format::Formatter;
use crate::storage::{persist_report, Database, JsonStore, SalesStore};
use crate::ticketera::{EventSummary, Parser, SalesReport, Ticketera, TicketeraPortal};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// What to scrape and where to put it.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Explicit event ids; bypasses the listing filters
    pub event_ids: Vec<String>,
    /// Print only, write nothing
    pub preview: bool,
    /// Persist to the sales database
    pub save_db: bool,
    /// Skip the JSON files
    pub no_json: bool,
    /// Required artist/title terms
    pub artists: Vec<String>,
    /// Excluded artist/title terms
    pub exclude: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub venue: Option<String>,
    /// Sale date the daily row is recorded under (defaults to today)
    pub fecha_venta: Option<NaiveDate>,
}

impl ScrapeOptions {
    pub fn filter_chain(&self) -> FilterChain {
        FilterChainBuilder::new()
            .keywords(self.artists.clone())
            .exclude_keywords(self.exclude.clone())
            .date_range(self.from, self.to)
            .venue(self.venue.clone())
            .build()
    }
}

/// Counters for one scrape run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeSummary {
    pub ticketera: Ticketera,
    /// Events selected for scraping
    pub events: usize,
    pub scraped: usize,
    pub failed: usize,
    pub json_files: Vec<PathBuf>,
    /// Reports that reached `daily_sales`
    pub persisted: usize,
    /// Outcome line per stored report
    pub db_lines: Vec<String>,
}

impl ScrapeSummary {
    fn new(ticketera: Ticketera, events: usize) -> Self {
        Self {
            ticketera,
            events,
            scraped: 0,
            failed: 0,
            json_files: Vec::new(),
            persisted: 0,
            db_lines: Vec::new(),
        }
    }
}

impl fmt::Display for ScrapeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} events, {} scraped, {} failed",
            self.ticketera.display_name(),
            self.events,
            self.scraped,
            self.failed
        )?;
        if !self.json_files.is_empty() {
            write!(f, ", {} JSON files", self.json_files.len())?;
        }
        if self.persisted > 0 {
            write!(f, ", {} stored in database", self.persisted)?;
        }
        Ok(())
    }
}

/// Formatted reports plus run counters.
#[derive(Debug)]
pub struct ScrapeOutput {
    pub output: String,
    pub summary: ScrapeSummary,
    pub reports: Vec<SalesReport>,
}

/// Executes a scrape of one ticketera.
pub struct ScrapeCommand {
    config: Config,
    options: ScrapeOptions,
}

impl ScrapeCommand {
    pub fn new(config: Config, options: ScrapeOptions) -> Self {
        Self { config, options }
    }

    /// Opens a session (and the database when asked) and runs the scrape.
    pub async fn execute(&self, ticketera: Ticketera) -> Result<ScrapeOutput> {
        let database = if self.options.save_db && !self.options.preview {
            let url = self.config.database_url.as_deref().context(
                "--save-db needs a database: set DATABASE_URL, --database-url or database_url in the config",
            )?;
            let database = Database::connect(url).await?;
            database.ensure_schema().await?;
            Some(database)
        } else {
            None
        };

        let portal = Portal::open(&self.config, ticketera).await?;
        let result = self
            .execute_with_portal(portal.as_portal(), database.as_ref().map(|d| d as &dyn SalesStore))
            .await;
        portal.close().await?;

        result
    }

    /// Runs the scrape against a provided session and store (for testing).
    pub async fn execute_with_portal(
        &self,
        portal: &dyn TicketeraPortal,
        store: Option<&dyn SalesStore>,
    ) -> Result<ScrapeOutput> {
        let ticketera = portal.ticketera();
        let parser = Parser::new(ticketera);

        info!("Logging in to {}", ticketera.display_name());
        portal
            .login()
            .await
            .with_context(|| format!("Login to {} failed", ticketera.display_name()))?;

        let events = self.resolve_events(portal, &parser).await?;
        if events.is_empty() {
            warn!("No events selected for {}", ticketera.display_name());
        }

        let json_store = JsonStore::new(&self.config.output_dir);
        let fecha_venta = self.options.fecha_venta.unwrap_or_else(|| Local::now().date_naive());
        let formatter = Formatter::new(self.config.format);

        let mut summary = ScrapeSummary::new(ticketera, events.len());
        let mut reports = Vec::with_capacity(events.len());

        for (i, event) in events.iter().enumerate() {
            info!("[{}/{}] Scraping {} ({})", i + 1, events.len(), event.artist_or_name(), event.id);

            let report = match self.fetch_report(portal, &parser, event).await {
                Ok(report) => report,
                Err(e) => {
                    error!("Failed to scrape event {}: {}", event.id, e);
                    summary.failed += 1;
                    continue;
                }
            };

            if !self.options.preview {
                if let Err(e) =
                    self.store_report(&report, &json_store, store, fecha_venta, &formatter, &mut summary).await
                {
                    error!("Failed to store event {}: {:#}", event.id, e);
                    summary.failed += 1;
                    continue;
                }
            }

            summary.scraped += 1;
            reports.push(report);
        }

        info!("{}", summary);

        Ok(ScrapeOutput { output: formatter.format_reports(&reports), summary, reports })
    }

    /// Explicit ids, then configured ids, then the filtered listing.
    async fn resolve_events(
        &self,
        portal: &dyn TicketeraPortal,
        parser: &Parser,
    ) -> Result<Vec<EventSummary>> {
        let ticketera = portal.ticketera();
        let ids: Vec<String> = if !self.options.event_ids.is_empty() {
            self.options.event_ids.clone()
        } else {
            self.config.event_ids(ticketera).to_vec()
        };

        if ids.is_empty() {
            let events = list_events(portal, parser).await.context("Failed to read event list")?;
            let filters = self.options.filter_chain();
            if !filters.is_empty() {
                debug!("Active filters: {}", filters.descriptions().join(", "));
            }

            let total = events.len();
            let selected = filters.apply(events);
            info!("Found {} events ({} after filtering)", total, selected.len());
            return Ok(selected);
        }

        // The listing only enriches known ids with names and dates
        let listing = match list_events(portal, parser).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Could not read event list, using bare ids: {}", e);
                Vec::new()
            }
        };

        Ok(ids
            .iter()
            .map(|id| {
                listing
                    .iter()
                    .find(|e| &e.id == id)
                    .cloned()
                    .unwrap_or_else(|| EventSummary::from_id(id.as_str()))
            })
            .collect())
    }

    /// Fetches and parses one report, logging in again once if the session dropped.
    async fn fetch_report(
        &self,
        portal: &dyn TicketeraPortal,
        parser: &Parser,
        event: &EventSummary,
    ) -> Result<SalesReport, ScrapeError> {
        match fetch_once(portal, parser, event).await {
            Err(ScrapeError::SessionExpired(url)) => {
                warn!("Session expired at {}, logging in again", url);
                portal.login().await?;
                fetch_once(portal, parser, event).await
            }
            other => other,
        }
    }

    async fn store_report(
        &self,
        report: &SalesReport,
        json_store: &JsonStore,
        store: Option<&dyn SalesStore>,
        fecha_venta: NaiveDate,
        formatter: &Formatter,
        summary: &mut ScrapeSummary,
    ) -> Result<()> {
        let mut archivo_origen = None;
        if !self.options.no_json {
            let path = json_store.save(report)?;
            info!("Saved {}", path.display());
            archivo_origen = Some(path.display().to_string());
            summary.json_files.push(path);
        }

        if let Some(store) = store {
            let outcome = persist_report(store, report, archivo_origen, fecha_venta).await?;
            if outcome.daily.is_some() {
                summary.persisted += 1;
            }
            summary.db_lines.push(formatter.format_outcome(report, &outcome));
        }

        Ok(())
    }
}

async fn list_events(
    portal: &dyn TicketeraPortal,
    parser: &Parser,
) -> Result<Vec<EventSummary>, ScrapeError> {
    let page = portal.event_list().await?;
    parser.parse_events(&page)
}

async fn fetch_once(
    portal: &dyn TicketeraPortal,
    parser: &Parser,
    event: &EventSummary,
) -> Result<SalesReport, ScrapeError> {
    let page = portal.event_report(&event.id).await?;
    let mut report = parser.parse_report(&page, event)?;
    report.event.merge_missing(event);
    Ok(report)
}
