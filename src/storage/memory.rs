//! In-memory [`SalesStore`] used by unit tests.

use super::{RawDataRecord, SalesStore, ShowKey, ShowLookup, ShowRow};
use crate::parsing::names_match;
use crate::sales::{compute_daily_sales, DailySales};
use crate::ticketera::{SalesTotals, Ticketera};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    raw: Mutex<Vec<(RawDataRecord, bool)>>,
    shows: Mutex<Vec<ShowRow>>,
    daily: Mutex<Vec<(i64, DailySales)>>,
}

impl MemoryStore {
    pub fn is_processed(&self, raw_id: i64) -> bool {
        let raw = self.raw.lock().unwrap();
        raw.get((raw_id - 1) as usize).is_some_and(|(_, done)| *done)
    }

    pub fn raw_count(&self) -> usize {
        self.raw.lock().unwrap().len()
    }

    pub fn show_count(&self) -> usize {
        self.shows.lock().unwrap().len()
    }

    pub fn daily_count(&self) -> usize {
        self.daily.lock().unwrap().len()
    }

    /// Rows of one show, oldest sale date first.
    pub fn daily_for(&self, show_id: i64) -> Vec<DailySales> {
        let mut rows: Vec<DailySales> = self
            .daily
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == show_id)
            .map(|(_, d)| *d)
            .collect();
        rows.sort_by_key(|d| d.fecha_venta);
        rows
    }
}

#[async_trait]
impl SalesStore for MemoryStore {
    async fn insert_raw_data(&self, record: &RawDataRecord) -> Result<i64> {
        let mut raw = self.raw.lock().unwrap();
        raw.push((record.clone(), false));
        Ok(raw.len() as i64)
    }

    async fn find_or_create_show(&self, key: &ShowKey) -> Result<ShowLookup> {
        let mut shows = self.shows.lock().unwrap();
        if let Some(show) = shows.iter().find(|s| {
            s.ticketera == key.ticketera.code()
                && s.fecha_show == key.fecha_show
                && names_match(&s.artista, &key.artista)
        }) {
            return Ok(ShowLookup { show: show.clone(), created: false });
        }

        let show = ShowRow {
            id: shows.len() as i64 + 1,
            artista: key.artista.clone(),
            venue: key.venue.clone(),
            fecha_show: key.fecha_show,
            ticketera: key.ticketera.code().to_string(),
            capacidad_total: key.capacidad_total,
            estado: "activo".to_string(),
        };
        shows.push(show.clone());
        Ok(ShowLookup { show, created: true })
    }

    async fn upsert_daily_sales(
        &self,
        show: &ShowRow,
        _ticketera: Ticketera,
        fecha_venta: NaiveDate,
        totals: &SalesTotals,
    ) -> Result<DailySales> {
        let mut daily = self.daily.lock().unwrap();
        let previous = daily
            .iter()
            .filter(|(id, d)| *id == show.id && d.fecha_venta < fecha_venta)
            .max_by_key(|(_, d)| d.fecha_venta)
            .map(|(_, d)| d.snapshot());

        let row = compute_daily_sales(
            previous.as_ref(),
            fecha_venta,
            totals.sold,
            totals.revenue,
            totals.capacity.or(show.capacidad_total),
        );

        daily.retain(|(id, d)| !(*id == show.id && d.fecha_venta == fecha_venta));

        // A backfilled day shifts the delta of the day after it
        if let Some((_, next)) = daily
            .iter_mut()
            .filter(|(id, d)| *id == show.id && d.fecha_venta > fecha_venta)
            .min_by_key(|(_, d)| d.fecha_venta)
        {
            *next = next.rebased_on(&row.snapshot());
        }

        daily.push((show.id, row));
        Ok(row)
    }

    async fn mark_processed(&self, raw_id: i64) -> Result<()> {
        let mut raw = self.raw.lock().unwrap();
        if let Some(entry) = raw.get_mut((raw_id - 1) as usize) {
            entry.1 = true;
        }
        Ok(())
    }
}
