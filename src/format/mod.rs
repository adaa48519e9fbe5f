//! Output formatting for events and sales reports (table, JSON, markdown, CSV).

use crate::config::OutputFormat;
use crate::storage::PersistOutcome;
use crate::ticketera::{EventSummary, SalesReport};

/// Formats events and reports for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an event listing.
    pub fn format_events(&self, events: &[EventSummary]) -> String {
        if events.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => Self::EVENTS_CSV_HEADER.to_string(),
                _ => "No events found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(events).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table_events(events),
            OutputFormat::Markdown => self.markdown_events(events),
            OutputFormat::Csv => self.csv_events(events),
        }
    }

    /// Formats one sales report.
    pub fn format_report(&self, report: &SalesReport) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => self.table_report(report),
            OutputFormat::Markdown => self.markdown_report(report),
            OutputFormat::Csv => self.csv_reports(std::slice::from_ref(report)),
        }
    }

    /// Formats the reports of one scrape run.
    pub fn format_reports(&self, reports: &[SalesReport]) -> String {
        if reports.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => Self::REPORTS_CSV_HEADER.to_string(),
                _ => "No reports scraped.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Csv => self.csv_reports(reports),
            OutputFormat::Table => {
                reports.iter().map(|r| self.table_report(r)).collect::<Vec<_>>().join("\n\n")
            }
            OutputFormat::Markdown => {
                reports.iter().map(|r| self.markdown_report(r)).collect::<Vec<_>>().join("\n\n")
            }
        }
    }

    /// One line describing what was stored for a report.
    pub fn format_outcome(&self, report: &SalesReport, outcome: &PersistOutcome) -> String {
        match (&outcome.show, &outcome.daily) {
            (Some(lookup), Some(daily)) => format!(
                "{} [show {}{}] {}: +{} tickets, +{} {} (total {}{})",
                report.artist(),
                lookup.show.id,
                if lookup.created { ", new" } else { "" },
                daily.fecha_venta,
                group_thousands(daily.venta_diaria),
                group_thousands(daily.monto_diario.round() as i64),
                report.currency,
                group_thousands(daily.venta_total_acumulada),
                daily
                    .porcentaje_ocupacion
                    .map(|p| format!(", {:.2}% ocupado", p))
                    .unwrap_or_default(),
            ),
            _ => format!(
                "{}: stored raw payload {} only (no show date)",
                report.artist(),
                outcome.raw_id
            ),
        }
    }

    // Table formatting

    fn table_events(&self, events: &[EventSummary]) -> String {
        let id_width = 10;
        let date_width = 10;
        let venue_width = 24;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<id_width$}  {:<date_width$}  {:<venue_width$}  {}",
            "ID", "Date", "Venue", "Event"
        ));
        lines.push(format!(
            "{:-<id_width$}  {:-<date_width$}  {:-<venue_width$}  {:-<40}",
            "", "", "", ""
        ));

        for event in events {
            let date = event.date.map(|d| d.to_string()).unwrap_or_else(|| "N/A".to_string());
            let venue = truncate(event.venue.as_deref().unwrap_or("-"), venue_width);

            lines.push(format!(
                "{:<id_width$}  {:<date_width$}  {:<venue_width$}  {}",
                event.id,
                date,
                venue,
                truncate(event.artist_or_name(), 50)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} events", events.len()));

        lines.join("\n")
    }

    fn table_report(&self, report: &SalesReport) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Event:   {} ({})", report.event.name, report.event.id));
        if let Some(artist) = &report.event.artist {
            lines.push(format!("Artist:  {}", artist));
        }
        if let Some(venue) = &report.event.venue {
            lines.push(format!("Venue:   {}", venue));
        }
        lines.push(format!(
            "Date:    {}",
            report.event.date.map(|d| d.to_string()).unwrap_or_else(|| "N/A".to_string())
        ));
        lines.push(format!("Source:  {}", report.source_url));
        lines.push(String::new());

        let name_width = 28;
        lines.push(format!(
            "{:<name_width$}  {:>10}  {:>10}  {:>10}  {:>16}",
            "Category", "Capacity", "Sold", "Available", "Revenue"
        ));
        lines.push(format!("{:-<name_width$}  {:-<10}  {:-<10}  {:-<10}  {:-<16}", "", "", "", "", ""));

        for category in &report.categories {
            let available = category
                .available
                .or_else(|| category.effective_capacity().map(|c| c - category.sold));
            lines.push(format!(
                "{:<name_width$}  {:>10}  {:>10}  {:>10}  {:>16}",
                truncate(&category.name, name_width),
                opt_count(category.effective_capacity()),
                group_thousands(category.sold),
                opt_count(available),
                group_thousands(category.revenue.round() as i64),
            ));
        }

        lines.push(format!("{:-<name_width$}  {:-<10}  {:-<10}  {:-<10}  {:-<16}", "", "", "", "", ""));
        lines.push(format!(
            "{:<name_width$}  {:>10}  {:>10}  {:>10}  {:>16}",
            "TOTAL",
            opt_count(report.totals.capacity),
            group_thousands(report.totals.sold),
            opt_count(report.totals.available()),
            format!("{} {}", report.currency, group_thousands(report.totals.revenue.round() as i64)),
        ));

        if let Some(pct) = report.totals.occupancy_percent() {
            lines.push(format!("Occupancy: {:.2}%", pct));
        }

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_events(&self, events: &[EventSummary]) -> String {
        let mut lines = Vec::new();

        lines.push("| ID | Date | Venue | Event |".to_string());
        lines.push("|----|------|-------|-------|".to_string());

        for event in events {
            let date = event.date.map(|d| d.to_string()).unwrap_or_default();
            let name = match &event.url {
                Some(url) => format!("[{}]({})", event.artist_or_name(), url),
                None => event.artist_or_name().to_string(),
            };
            lines.push(format!(
                "| {} | {} | {} | {} |",
                event.id,
                date,
                event.venue.as_deref().unwrap_or(""),
                name
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} events found*", events.len()));

        lines.join("\n")
    }

    fn markdown_report(&self, report: &SalesReport) -> String {
        let mut lines = Vec::new();

        lines.push(format!("## {}", report.event.name));
        lines.push(String::new());
        lines.push(format!("- **Ticketera:** {}", report.ticketera.display_name()));
        if let Some(venue) = &report.event.venue {
            lines.push(format!("- **Venue:** {}", venue));
        }
        if let Some(date) = report.event.date {
            lines.push(format!("- **Date:** {}", date));
        }
        lines.push(String::new());

        lines.push("| Category | Capacity | Sold | Revenue |".to_string());
        lines.push("|----------|---------:|-----:|--------:|".to_string());
        for category in &report.categories {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                category.name,
                opt_count(category.effective_capacity()),
                group_thousands(category.sold),
                group_thousands(category.revenue.round() as i64)
            ));
        }
        lines.push(format!(
            "| **Total** | {} | **{}** | **{} {}** |",
            opt_count(report.totals.capacity),
            group_thousands(report.totals.sold),
            report.currency,
            group_thousands(report.totals.revenue.round() as i64)
        ));

        if let Some(pct) = report.totals.occupancy_percent() {
            lines.push(String::new());
            lines.push(format!("*Occupancy: {:.2}%*", pct));
        }

        lines.join("\n")
    }

    // CSV formatting

    const EVENTS_CSV_HEADER: &'static str = "id,name,artist,venue,city,date,url";

    const REPORTS_CSV_HEADER: &'static str =
        "ticketera,event_id,event,artist,venue,date,category,capacity,sold,available,price,revenue,currency";

    fn csv_events(&self, events: &[EventSummary]) -> String {
        let mut lines = vec![Self::EVENTS_CSV_HEADER.to_string()];

        for event in events {
            lines.push(format!(
                "{},{},{},{},{},{},{}",
                Self::csv_escape(&event.id),
                Self::csv_escape(&event.name),
                event.artist.as_deref().map(Self::csv_escape).unwrap_or_default(),
                event.venue.as_deref().map(Self::csv_escape).unwrap_or_default(),
                event.city.as_deref().map(Self::csv_escape).unwrap_or_default(),
                event.date.map(|d| d.to_string()).unwrap_or_default(),
                event.url.as_deref().map(Self::csv_escape).unwrap_or_default(),
            ));
        }

        lines.join("\n")
    }

    /// One line per category.
    fn csv_reports(&self, reports: &[SalesReport]) -> String {
        let mut lines = vec![Self::REPORTS_CSV_HEADER.to_string()];

        for report in reports {
            let event = &report.event;
            for category in &report.categories {
                lines.push(format!(
                    "{},{},{},{},{},{},{},{},{},{},{},{},{}",
                    report.ticketera.code(),
                    Self::csv_escape(&event.id),
                    Self::csv_escape(&event.name),
                    event.artist.as_deref().map(Self::csv_escape).unwrap_or_default(),
                    event.venue.as_deref().map(Self::csv_escape).unwrap_or_default(),
                    event.date.map(|d| d.to_string()).unwrap_or_default(),
                    Self::csv_escape(&category.name),
                    category.capacity.map(|c| c.to_string()).unwrap_or_default(),
                    category.sold,
                    category.available.map(|a| a.to_string()).unwrap_or_default(),
                    category.price.map(|p| p.to_string()).unwrap_or_default(),
                    category.revenue,
                    report.currency,
                ));
            }
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

/// "1234567" -> "1.234.567", the way back-offices print counts.
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn opt_count(value: Option<i64>) -> String {
    value.map(group_thousands).unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::DailySales;
    use crate::storage::{ShowLookup, ShowRow};
    use crate::ticketera::{CategorySales, SalesTotals, Ticketera, TotalsSource};
    use chrono::{NaiveDate, Utc};

    fn make_event() -> EventSummary {
        let mut event = EventSummary::from_id("4521");
        event.name = "Los Jaivas, 60 años".into();
        event.venue = Some("Teatro Caupolicán".into());
        event.date = NaiveDate::from_ymd_opt(2025, 5, 10);
        event.url = Some("https://example.test/eventos/4521".into());
        event
    }

    fn make_report() -> SalesReport {
        SalesReport {
            ticketera: Ticketera::PuntoTicket,
            event: make_event(),
            categories: vec![
                CategorySales::new("Platea", 700, 21_000_000.0).with_capacity(1000),
                CategorySales::new("Galería", 300, 4_500_000.0).with_capacity(500),
            ],
            totals: SalesTotals { capacity: Some(1500), sold: 1000, revenue: 25_500_000.0 },
            totals_source: TotalsSource::Row,
            currency: "CLP".into(),
            source_url: "https://example.test/borderaux/4521".into(),
            scraped_at: Utc::now(),
            raw_tables: Vec::new(),
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1.000");
        assert_eq!(group_thousands(1_234_567), "1.234.567");
        assert_eq!(group_thousands(-45_000), "-45.000");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("Teatro Caupolicán", 50), "Teatro Caupolicán");
        assert_eq!(truncate("Ñuñoa Ñuñoa Ñuñoa", 8), "Ñuñoa...");
    }

    #[test]
    fn test_format_events_table() {
        let formatter = Formatter::new(OutputFormat::Table);
        let output = formatter.format_events(&[make_event()]);
        assert!(output.contains("4521"));
        assert!(output.contains("2025-05-10"));
        assert!(output.contains("Teatro Caupolicán"));
        assert!(output.contains("Total: 1 events"));
    }

    #[test]
    fn test_format_events_empty() {
        assert_eq!(Formatter::new(OutputFormat::Json).format_events(&[]), "[]");
        assert_eq!(Formatter::new(OutputFormat::Table).format_events(&[]), "No events found.");
        assert_eq!(
            Formatter::new(OutputFormat::Csv).format_events(&[]),
            "id,name,artist,venue,city,date,url"
        );
    }

    #[test]
    fn test_format_events_csv_escapes() {
        let output = Formatter::new(OutputFormat::Csv).format_events(&[make_event()]);
        let row = output.lines().nth(1).unwrap();
        assert!(row.starts_with("4521,\"Los Jaivas, 60 años\","));
    }

    #[test]
    fn test_format_events_markdown_links() {
        let output = Formatter::new(OutputFormat::Markdown).format_events(&[make_event()]);
        assert!(output.contains("[Los Jaivas, 60 años](https://example.test/eventos/4521)"));
        assert!(output.contains("*1 events found*"));
    }

    #[test]
    fn test_format_report_table() {
        let output = Formatter::new(OutputFormat::Table).format_report(&make_report());
        assert!(output.contains("Platea"));
        assert!(output.contains("21.000.000"));
        assert!(output.contains("CLP 25.500.000"));
        assert!(output.contains("Occupancy: 66.67%"));
    }

    #[test]
    fn test_format_report_json() {
        let output = Formatter::new(OutputFormat::Json).format_report(&make_report());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["totals"]["sold"], 1000);
        assert_eq!(value["categories"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_format_reports_csv_one_line_per_category() {
        let output = Formatter::new(OutputFormat::Csv).format_reports(&[make_report(), make_report()]);
        assert_eq!(output.lines().count(), 5);
        assert!(output.lines().nth(1).unwrap().starts_with("puntoticket,4521,"));
    }

    #[test]
    fn test_format_report_markdown() {
        let output = Formatter::new(OutputFormat::Markdown).format_report(&make_report());
        assert!(output.starts_with("## Los Jaivas, 60 años"));
        assert!(output.contains("| **Total** | 1.500 | **1.000** | **CLP 25.500.000** |"));
    }

    #[test]
    fn test_format_outcome() {
        let report = make_report();
        let formatter = Formatter::new(OutputFormat::Table);

        let outcome = PersistOutcome {
            raw_id: 9,
            show: Some(ShowLookup {
                show: ShowRow {
                    id: 3,
                    artista: "Los Jaivas".into(),
                    venue: None,
                    fecha_show: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
                    ticketera: "puntoticket".into(),
                    capacidad_total: Some(1500),
                    estado: "activo".into(),
                },
                created: true,
            }),
            daily: Some(DailySales {
                fecha_venta: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                venta_diaria: 120,
                monto_diario: 3_000_000.0,
                venta_total_acumulada: 1000,
                recaudacion_total: 25_500_000.0,
                tickets_disponibles: Some(500),
                porcentaje_ocupacion: Some(66.67),
            }),
        };
        let line = formatter.format_outcome(&report, &outcome);
        assert!(line.contains("[show 3, new]"));
        assert!(line.contains("+120 tickets"));
        assert!(line.contains("+3.000.000 CLP"));
        assert!(line.contains("66.67% ocupado"));

        let raw_only = PersistOutcome { raw_id: 9, show: None, daily: None };
        assert!(formatter.format_outcome(&report, &raw_only).contains("raw payload 9 only"));
    }
}
