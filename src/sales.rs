//! Daily sales accounting: per-day deltas from cumulative report totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Cumulative figures recorded for a show on one sale date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalesSnapshot {
    pub fecha_venta: NaiveDate,
    pub venta_total_acumulada: i64,
    pub recaudacion_total: f64,
}

/// One `daily_sales` row, ready to upsert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    pub fecha_venta: NaiveDate,
    /// Tickets sold on `fecha_venta`
    pub venta_diaria: i64,
    /// Revenue earned on `fecha_venta`
    pub monto_diario: f64,
    pub venta_total_acumulada: i64,
    pub recaudacion_total: f64,
    /// `capacidad - venta_total_acumulada`
    pub tickets_disponibles: Option<i64>,
    /// Percentage of capacity sold, 2 decimals
    pub porcentaje_ocupacion: Option<f64>,
}

impl DailySales {
    /// Cumulative figures of this row, as the next day sees them.
    pub fn snapshot(&self) -> SalesSnapshot {
        SalesSnapshot {
            fecha_venta: self.fecha_venta,
            venta_total_acumulada: self.venta_total_acumulada,
            recaudacion_total: self.recaudacion_total,
        }
    }

    /// Capacity the row was computed with, when it was known.
    pub fn capacidad(&self) -> Option<i64> {
        self.tickets_disponibles.map(|t| t + self.venta_total_acumulada)
    }

    /// Recomputes this row's deltas against a new previous day, e.g. after an
    /// earlier `fecha_venta` was backfilled. Cumulative figures are kept.
    pub fn rebased_on(&self, previous: &SalesSnapshot) -> DailySales {
        compute_daily_sales(
            Some(previous),
            self.fecha_venta,
            self.venta_total_acumulada,
            self.recaudacion_total,
            self.capacidad(),
        )
    }
}

/// Computes the daily row for `fecha_venta` against the last earlier snapshot.
///
/// With no earlier snapshot the whole cumulative total is attributed to the
/// first day. Snapshots on or after `fecha_venta` are ignored, so a same-day
/// rerun recomputes its delta against the previous day. Deltas never go
/// negative (refunds lower the cumulative total but are not sales).
pub fn compute_daily_sales(
    previous: Option<&SalesSnapshot>,
    fecha_venta: NaiveDate,
    venta_total_acumulada: i64,
    recaudacion_total: f64,
    capacidad: Option<i64>,
) -> DailySales {
    let previous = previous.filter(|p| p.fecha_venta < fecha_venta);

    let (prev_total, prev_revenue) = previous
        .map(|p| (p.venta_total_acumulada, p.recaudacion_total))
        .unwrap_or((0, 0.0));

    let venta_diaria = (venta_total_acumulada - prev_total).max(0);
    let monto_diario = round2((recaudacion_total - prev_revenue).max(0.0));

    let tickets_disponibles = capacidad.map(|c| c - venta_total_acumulada);
    let porcentaje_ocupacion = capacidad
        .filter(|&c| c > 0)
        .map(|c| round2(venta_total_acumulada as f64 / c as f64 * 100.0));

    DailySales {
        fecha_venta,
        venta_diaria,
        monto_diario,
        venta_total_acumulada,
        recaudacion_total,
        tickets_disponibles,
        porcentaje_ocupacion,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
