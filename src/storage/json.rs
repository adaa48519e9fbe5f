//! JSON file tree: `<root>/<ticketera>/<artist>_<fecha>_<timestamp>.json`.

use super::ScrapeRecord;
use crate::parsing::slugify;
use crate::ticketera::SalesReport;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes scraped reports as pretty-printed JSON files.
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a report would be written to, before collision handling.
    pub fn path_for(&self, report: &SalesReport) -> PathBuf {
        let fecha = report
            .event
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "sin-fecha".to_string());
        let timestamp = report.scraped_at.format("%Y%m%d_%H%M%S");

        self.root
            .join(report.ticketera.code())
            .join(format!("{}_{}_{}.json", slugify(report.artist()), fecha, timestamp))
    }

    /// Saves `report`, creating directories on demand. Returns the written path.
    pub fn save(&self, report: &SalesReport) -> Result<PathBuf> {
        let mut path = self.path_for(report);
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        // Two events of one artist scraped within the same second
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let mut n = 2;
        while path.exists() {
            path = dir.join(format!("{}-{}.json", stem, n));
            n += 1;
        }

        let json = serde_json::to_string_pretty(&ScrapeRecord::new(report))?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;

        debug!("Saved report to {}", path.display());
        Ok(path)
    }

    /// Reads a saved report back.
    pub fn load(path: impl AsRef<Path>) -> Result<SalesReport> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read report: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse report: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticketera::{CategorySales, EventSummary, SalesTotals, Ticketera, TotalsSource};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn report() -> SalesReport {
        let mut event = EventSummary::from_id("88");
        event.name = "Los Fabulosos Cadillacs".into();
        event.date = NaiveDate::from_ymd_opt(2025, 4, 5);

        SalesReport {
            ticketera: Ticketera::EntradaUno,
            event,
            categories: vec![CategorySales::new("Platea", 120, 3_600_000.0)],
            totals: SalesTotals { capacity: None, sold: 120, revenue: 3_600_000.0 },
            totals_source: TotalsSource::Computed,
            currency: "ARS".into(),
            source_url: "https://productores.entradauno.com/Borderaux.aspx?idEvento=88".into(),
            scraped_at: Utc.with_ymd_and_hms(2025, 3, 20, 14, 30, 5).unwrap(),
            raw_tables: Vec::new(),
        }
    }

    #[test]
    fn test_path_layout() {
        let store = JsonStore::new("/data");
        assert_eq!(
            store.path_for(&report()),
            PathBuf::from("/data/entradauno/los-fabulosos-cadillacs_2025-04-05_20250320_143005.json")
        );
    }

    #[test]
    fn test_path_without_date() {
        let store = JsonStore::new("out");
        let mut r = report();
        r.event.date = None;
        let path = store.path_for(&r);
        assert!(path.to_string_lossy().contains("_sin-fecha_"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("json_output"));

        let path = store.save(&report()).unwrap();
        assert!(path.exists());
        assert!(path.starts_with(dir.path().join("json_output").join("entradauno")));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"ticketera_nombre\": \"EntradaUno\""));

        let loaded = JsonStore::load(&path).unwrap();
        assert_eq!(loaded.event.id, "88");
        assert_eq!(loaded.totals.sold, 120);
        assert_eq!(loaded.categories, report().categories);
    }

    #[test]
    fn test_save_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());

        let first = store.save(&report()).unwrap();
        let second = store.save(&report()).unwrap();
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-2.json"));
    }
}
