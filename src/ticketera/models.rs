//! Data models for events and sales reports.

use crate::ticketera::Ticketera;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One event as listed by a back-office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Vendor-side event identifier
    pub id: String,
    /// Event title as shown by the vendor
    pub name: String,
    /// Artist, when the vendor lists it apart from the title
    pub artist: Option<String>,
    /// Venue name
    pub venue: Option<String>,
    /// City
    pub city: Option<String>,
    /// Show date
    pub date: Option<NaiveDate>,
    /// Link to the event in the back-office
    pub url: Option<String>,
}

/// Name given to an event whose title is not known yet.
pub(crate) fn placeholder_name(id: &str) -> String {
    format!("Evento {}", id)
}

impl EventSummary {
    /// Creates an event known only by its identifier.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: placeholder_name(&id),
            id,
            artist: None,
            venue: None,
            city: None,
            date: None,
            url: None,
        }
    }

    /// Whether the name is still the generated `Evento <id>` stand-in.
    pub fn has_placeholder_name(&self) -> bool {
        self.name == placeholder_name(&self.id)
    }

    /// Artist if known, otherwise the event title.
    pub fn artist_or_name(&self) -> &str {
        self.artist.as_deref().filter(|a| !a.is_empty()).unwrap_or(&self.name)
    }

    /// Fills gaps in `self` from `other` without overwriting known fields.
    pub fn merge_missing(&mut self, other: &EventSummary) {
        if self.has_placeholder_name() && !other.has_placeholder_name() && !other.name.is_empty() {
            self.name = other.name.clone();
        }
        if self.artist.is_none() {
            self.artist = other.artist.clone();
        }
        if self.venue.is_none() {
            self.venue = other.venue.clone();
        }
        if self.city.is_none() {
            self.city = other.city.clone();
        }
        if self.date.is_none() {
            self.date = other.date;
        }
        if self.url.is_none() {
            self.url = other.url.clone();
        }
    }
}

/// Sales for one price category / sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySales {
    /// Category or sector name ("Campo", "Platea Alta")
    pub name: String,
    /// Seats enabled for sale
    pub capacity: Option<i64>,
    /// Tickets sold
    pub sold: i64,
    /// Tickets still available, as reported by the vendor
    pub available: Option<i64>,
    /// Unit price
    pub price: Option<f64>,
    /// Revenue for the category
    pub revenue: f64,
}

impl CategorySales {
    /// Creates a category with just sold count and revenue.
    pub fn new(name: impl Into<String>, sold: i64, revenue: f64) -> Self {
        Self { name: name.into(), capacity: None, sold, available: None, price: None, revenue }
    }

    /// Sets the capacity (builder style).
    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Capacity, falling back to sold + available.
    pub fn effective_capacity(&self) -> Option<i64> {
        self.capacity.or_else(|| self.available.map(|a| a + self.sold))
    }
}

/// Where the report totals were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsSource {
    /// A "Total" row inside the category table
    Row,
    /// A separate totals table
    Table,
    /// Summed from categories
    Computed,
    /// Totals supplied by a JSON API
    Api,
}

/// Cumulative totals for an event.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SalesTotals {
    /// Total capacity
    pub capacity: Option<i64>,
    /// Tickets sold to date
    pub sold: i64,
    /// Revenue to date
    pub revenue: f64,
}

impl SalesTotals {
    /// Sums category figures. Capacity is only known if every category has one.
    pub fn from_categories(categories: &[CategorySales]) -> Self {
        let sold = categories.iter().map(|c| c.sold).sum();
        let revenue = categories.iter().map(|c| c.revenue).sum();
        let capacity = categories
            .iter()
            .map(CategorySales::effective_capacity)
            .sum::<Option<i64>>()
            .filter(|_| !categories.is_empty());

        Self { capacity, sold, revenue }
    }

    /// Tickets remaining (`capacity - sold`).
    pub fn available(&self) -> Option<i64> {
        self.capacity.map(|c| c - self.sold)
    }

    /// Occupancy as a percentage of capacity, rounded to 2 decimals.
    pub fn occupancy_percent(&self) -> Option<f64> {
        match self.capacity {
            Some(c) if c > 0 => Some((self.sold as f64 / c as f64 * 10000.0).round() / 100.0),
            _ => None,
        }
    }
}

/// A parsed sales report (borderaux) for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesReport {
    /// Vendor that produced the report
    pub ticketera: Ticketera,
    /// Event the report belongs to
    pub event: EventSummary,
    /// Per-category figures (totals rows excluded)
    pub categories: Vec<CategorySales>,
    /// Cumulative totals
    pub totals: SalesTotals,
    /// Where `totals` came from
    pub totals_source: TotalsSource,
    /// Currency of revenue figures
    pub currency: String,
    /// URL the report was scraped from
    pub source_url: String,
    /// When the report was scraped
    pub scraped_at: DateTime<Utc>,
    /// Raw scraped tables, header-keyed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_tables: Vec<Vec<BTreeMap<String, String>>>,
}

impl SalesReport {
    /// Returns the number of categories.
    pub fn count(&self) -> usize {
        self.categories.len()
    }

    /// Returns true when no category rows were parsed.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Artist name used for show matching.
    pub fn artist(&self) -> &str {
        self.event.artist_or_name()
    }
}
