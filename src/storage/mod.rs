//! Persistence of scraped reports: JSON files and the shared sales database.

pub mod db;
pub mod json;
#[cfg(test)]
pub(crate) mod memory;

pub use db::Database;
pub use json::JsonStore;

use crate::sales::DailySales;
use crate::ticketera::{SalesReport, SalesTotals, Ticketera};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// What gets written for one scraped event: the report plus derived figures.
#[derive(Debug, Serialize)]
pub struct ScrapeRecord<'a> {
    pub ticketera_nombre: &'static str,
    pub pais: &'static str,
    pub tickets_disponibles: Option<i64>,
    pub porcentaje_ocupacion: Option<f64>,
    pub scraper_version: &'static str,
    #[serde(flatten)]
    pub report: &'a SalesReport,
}

impl<'a> ScrapeRecord<'a> {
    pub fn new(report: &'a SalesReport) -> Self {
        Self {
            ticketera_nombre: report.ticketera.display_name(),
            pais: report.ticketera.country(),
            tickets_disponibles: report.totals.available(),
            porcentaje_ocupacion: report.totals.occupancy_percent(),
            scraper_version: env!("CARGO_PKG_VERSION"),
            report,
        }
    }
}

/// A `raw_data` row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataRecord {
    pub ticketera: Ticketera,
    pub artista: String,
    pub venue: Option<String>,
    pub fecha_show: Option<NaiveDate>,
    pub json_data: serde_json::Value,
    pub archivo_origen: Option<String>,
    pub url_origen: String,
    pub fecha_extraccion: DateTime<Utc>,
}

impl RawDataRecord {
    pub fn from_report(report: &SalesReport, archivo_origen: Option<String>) -> Result<Self> {
        Ok(Self {
            ticketera: report.ticketera,
            artista: report.artist().to_string(),
            venue: report.event.venue.clone(),
            fecha_show: report.event.date,
            json_data: serde_json::to_value(ScrapeRecord::new(report))?,
            archivo_origen,
            url_origen: report.source_url.clone(),
            fecha_extraccion: report.scraped_at,
        })
    }
}

/// Identity and first-sighting attributes of a show.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowKey {
    pub ticketera: Ticketera,
    pub artista: String,
    pub venue: Option<String>,
    pub fecha_show: NaiveDate,
    pub capacidad_total: Option<i64>,
    pub ciudad: Option<String>,
    pub pais: &'static str,
}

impl ShowKey {
    /// Builds the key for a report; `None` when the show date is unknown.
    pub fn from_report(report: &SalesReport) -> Option<Self> {
        Some(Self {
            ticketera: report.ticketera,
            artista: report.artist().to_string(),
            venue: report.event.venue.clone(),
            fecha_show: report.event.date?,
            capacidad_total: report.totals.capacity,
            ciudad: report.event.city.clone(),
            pais: report.ticketera.country(),
        })
    }
}

/// A `shows` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowRow {
    pub id: i64,
    pub artista: String,
    pub venue: Option<String>,
    pub fecha_show: NaiveDate,
    pub ticketera: String,
    pub capacidad_total: Option<i64>,
    pub estado: String,
}

/// Result of a show lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowLookup {
    pub show: ShowRow,
    /// True when this call inserted the row
    pub created: bool,
}

/// Storage backend for the sales tables - enables mocking for tests.
#[async_trait]
pub trait SalesStore: Send + Sync {
    /// Appends a scraped payload; returns its id.
    async fn insert_raw_data(&self, record: &RawDataRecord) -> Result<i64>;

    /// Returns the matching show, inserting it on first sighting.
    ///
    /// An existing show is returned as stored, never updated.
    async fn find_or_create_show(&self, key: &ShowKey) -> Result<ShowLookup>;

    /// Computes and stores the `daily_sales` row for `fecha_venta`.
    async fn upsert_daily_sales(
        &self,
        show: &ShowRow,
        ticketera: Ticketera,
        fecha_venta: NaiveDate,
        totals: &SalesTotals,
    ) -> Result<DailySales>;

    /// Flags a `raw_data` row as processed.
    async fn mark_processed(&self, raw_id: i64) -> Result<()>;
}

/// What [`persist_report`] wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistOutcome {
    pub raw_id: i64,
    pub show: Option<ShowLookup>,
    pub daily: Option<DailySales>,
}

/// Writes one report: raw payload, show, daily sales, then marks it processed.
///
/// Reports without a show date are kept in `raw_data` only (unprocessed).
pub async fn persist_report(
    store: &dyn SalesStore,
    report: &SalesReport,
    archivo_origen: Option<String>,
    fecha_venta: NaiveDate,
) -> Result<PersistOutcome> {
    let raw = RawDataRecord::from_report(report, archivo_origen)?;
    let raw_id = store.insert_raw_data(&raw).await?;

    let Some(key) = ShowKey::from_report(report) else {
        warn!(
            "Event {} ({}) has no show date; stored raw payload {} only",
            report.event.id,
            report.artist(),
            raw_id
        );
        return Ok(PersistOutcome { raw_id, show: None, daily: None });
    };

    let lookup = store.find_or_create_show(&key).await?;
    if lookup.created {
        info!("Created show {} for {} on {}", lookup.show.id, key.artista, key.fecha_show);
    }

    let daily = store
        .upsert_daily_sales(&lookup.show, report.ticketera, fecha_venta, &report.totals)
        .await?;
    store.mark_processed(raw_id).await?;

    info!(
        "Show {}: {} sold on {} ({} total)",
        lookup.show.id, daily.venta_diaria, fecha_venta, daily.venta_total_acumulada
    );

    Ok(PersistOutcome { raw_id, show: Some(lookup), daily: Some(daily) })
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use crate::ticketera::{CategorySales, EventSummary, TotalsSource};

    fn sample_report(sold: i64, revenue: f64) -> SalesReport {
        let mut event = EventSummary::from_id("1234");
        event.name = "Mon Laferte - Autopoiética".into();
        event.artist = Some("Mon Laferte".into());
        event.venue = Some("Movistar Arena".into());
        event.date = NaiveDate::from_ymd_opt(2025, 3, 15);

        SalesReport {
            ticketera: Ticketera::PuntoTicket,
            event,
            categories: vec![CategorySales::new("Campo", sold, revenue).with_capacity(1000)],
            totals: SalesTotals { capacity: Some(1000), sold, revenue },
            totals_source: TotalsSource::Row,
            currency: "CLP".into(),
            source_url: "https://productores.puntoticket.com/Reportes/Borderaux?eventoId=1234".into(),
            scraped_at: Utc::now(),
            raw_tables: Vec::new(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_scrape_record_flattens_report() {
        let report = sample_report(800, 8_000_000.0);
        let value = serde_json::to_value(ScrapeRecord::new(&report)).unwrap();
        assert_eq!(value["ticketera"], "puntoticket");
        assert_eq!(value["ticketera_nombre"], "Punto Ticket");
        assert_eq!(value["pais"], "CL");
        assert_eq!(value["tickets_disponibles"], 200);
        assert_eq!(value["porcentaje_ocupacion"], 80.0);
        assert_eq!(value["totals"]["sold"], 800);
    }

    #[tokio::test]
    async fn test_persist_report_full_sequence() {
        let store = MemoryStore::default();
        let report = sample_report(800, 8_000_000.0);

        let outcome = persist_report(&store, &report, Some("a.json".into()), day(10)).await.unwrap();
        let lookup = outcome.show.unwrap();
        assert!(lookup.created);
        let daily = outcome.daily.unwrap();
        assert_eq!(daily.venta_diaria, 800);
        assert_eq!(daily.tickets_disponibles, Some(200));
        assert!(store.is_processed(outcome.raw_id));
    }

    #[tokio::test]
    async fn test_persist_report_daily_delta_and_show_reuse() {
        let store = MemoryStore::default();

        let first = sample_report(800, 8_000_000.0);
        persist_report(&store, &first, None, day(10)).await.unwrap();

        // Next day, artist spelled differently and capacity changed: same show, untouched
        let mut second = sample_report(950, 9_500_000.0);
        second.event.artist = Some("MON LAFERTE".into());
        second.totals.capacity = Some(1200);
        let outcome = persist_report(&store, &second, None, day(11)).await.unwrap();

        let lookup = outcome.show.unwrap();
        assert!(!lookup.created);
        assert_eq!(lookup.show.artista, "Mon Laferte");
        assert_eq!(lookup.show.capacidad_total, Some(1000));
        assert_eq!(store.show_count(), 1);

        let daily = outcome.daily.unwrap();
        assert_eq!(daily.venta_diaria, 150);
        assert_eq!(daily.monto_diario, 1_500_000.0);
        assert_eq!(daily.tickets_disponibles, Some(250));
    }

    #[tokio::test]
    async fn test_persist_report_same_day_rerun_replaces_row() {
        let store = MemoryStore::default();
        persist_report(&store, &sample_report(800, 0.0), None, day(10)).await.unwrap();
        persist_report(&store, &sample_report(900, 0.0), None, day(11)).await.unwrap();
        let outcome =
            persist_report(&store, &sample_report(920, 0.0), None, day(11)).await.unwrap();

        assert_eq!(outcome.daily.unwrap().venta_diaria, 120);
        assert_eq!(store.daily_count(), 2);
    }

    #[tokio::test]
    async fn test_persist_report_backfill_rebases_following_day() {
        let store = MemoryStore::default();
        persist_report(&store, &sample_report(100, 1_000.0), None, day(1)).await.unwrap();
        let outcome =
            persist_report(&store, &sample_report(300, 3_000.0), None, day(3)).await.unwrap();
        assert_eq!(outcome.daily.unwrap().venta_diaria, 200);

        let backfill =
            persist_report(&store, &sample_report(250, 2_500.0), None, day(2)).await.unwrap();
        assert_eq!(backfill.daily.unwrap().venta_diaria, 150);

        let rows = store.daily_for(backfill.show.unwrap().show.id);
        let deltas: Vec<i64> = rows.iter().map(|d| d.venta_diaria).collect();
        assert_eq!(deltas, vec![100, 150, 50]);
        assert_eq!(deltas.iter().sum::<i64>(), rows[2].venta_total_acumulada);
        assert_eq!(rows[2].monto_diario, 500.0);
        assert_eq!(rows[2].tickets_disponibles, Some(700));
        assert_eq!(store.raw_count(), 3);
    }

    #[tokio::test]
    async fn test_persist_report_without_date_keeps_raw_only() {
        let store = MemoryStore::default();
        let mut report = sample_report(10, 0.0);
        report.event.date = None;

        let outcome = persist_report(&store, &report, None, day(10)).await.unwrap();
        assert!(outcome.show.is_none());
        assert!(outcome.daily.is_none());
        assert!(!store.is_processed(outcome.raw_id));
        assert_eq!(store.show_count(), 0);
    }

    #[tokio::test]
    async fn test_different_dates_are_different_shows() {
        let store = MemoryStore::default();
        persist_report(&store, &sample_report(10, 0.0), None, day(10)).await.unwrap();

        let mut other = sample_report(10, 0.0);
        other.event.date = NaiveDate::from_ymd_opt(2025, 3, 16);
        persist_report(&store, &other, None, day(10)).await.unwrap();

        assert_eq!(store.show_count(), 2);
    }
}
