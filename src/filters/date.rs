//! Show date window filtering.

use super::Filter;
use crate::ticketera::EventSummary;
use chrono::NaiveDate;

/// Keeps events whose show date falls within `[from, to]`.
///
/// Events without a known date always pass; the report page usually has it.
pub struct DateFilter {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl DateFilter {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }
}

impl Filter for DateFilter {
    fn matches(&self, event: &EventSummary) -> bool {
        let Some(date) = event.date else {
            return true;
        };

        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    fn description(&self) -> String {
        match (self.from, self.to) {
            (Some(from), Some(to)) => format!("Date: {} to {}", from, to),
            (Some(from), None) => format!("Date: from {}", from),
            (None, Some(to)) => format!("Date: until {}", to),
            (None, None) => "Date: any".to_string(),
        }
    }
}
