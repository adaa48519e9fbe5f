//! HTML/JSON parser for back-office event listings and sales reports.

use crate::error::ScrapeError;
use crate::parsing::table::{cell, extract_tables_from, HtmlTable};
use crate::parsing::text::{clean_cell, normalize_key};
use crate::parsing::{parse_amount, parse_count, parse_spanish_date, NumberLocale};
use crate::ticketera::api;
use crate::ticketera::client::{PageKind, PortalPage};
use crate::ticketera::models::{
    placeholder_name, CategorySales, EventSummary, SalesReport, SalesTotals, TotalsSource,
};
use crate::ticketera::selectors::{common, compile};
use crate::ticketera::Ticketera;
use chrono::Utc;
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, trace, warn};

/// Header aliases for report columns, most specific first.
mod aliases {
    pub const CATEGORY: &[&str] = &[
        "categoria", "sector", "ubicacion", "localidad", "zona", "tipo_entrada", "tipo", "tarifa",
        "descripcion", "entrada", "nombre", "category", "section",
    ];
    pub const SOLD: &[&str] = &[
        "vendidas", "vendidos", "entradas_vendidas", "tickets_vendidos", "cantidad_vendida",
        "cant_vendida", "emitidas", "vendido", "sold", "cantidad", "cant", "qty",
    ];
    pub const CAPACITY: &[&str] = &[
        "capacidad", "aforo", "cupo", "habilitadas", "habilitados", "entradas_habilitadas",
        "capacity", "stock",
    ];
    pub const AVAILABLE: &[&str] =
        &["disponibles", "disponible", "restantes", "saldo", "libres", "available"];
    pub const PRICE: &[&str] = &["precio", "precio_unitario", "valor", "price"];
    pub const REVENUE: &[&str] = &[
        "recaudacion", "recaudado", "monto", "importe", "ingresos", "bruto", "revenue", "gross",
        "total",
    ];

    pub const EVENT_NAME: &[&str] =
        &["evento", "nombre", "espectaculo", "show", "titulo", "event", "nombre_evento"];
    pub const EVENT_ARTIST: &[&str] = &["artista", "artist", "interprete"];
    pub const EVENT_VENUE: &[&str] =
        &["lugar", "venue", "recinto", "sala", "teatro", "establecimiento"];
    pub const EVENT_CITY: &[&str] = &["ciudad", "city"];
    pub const EVENT_DATE: &[&str] = &["fecha", "fecha_evento", "fecha_show", "funcion", "date"];
}

static ID_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[?&](?:eventoid|idevento|evento|event_id|eventid|id)=([A-Za-z0-9_-]+)")
        .unwrap()
});

/// Column positions of a report table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ColumnMap {
    category: Option<usize>,
    capacity: Option<usize>,
    sold: Option<usize>,
    available: Option<usize>,
    price: Option<usize>,
    revenue: Option<usize>,
}

impl ColumnMap {
    fn from_headers(table: &HtmlTable) -> Self {
        let mut taken = Vec::new();
        let mut claim = |aliases: &[&str]| {
            let found = table.column_except(aliases, &taken);
            if let Some(idx) = found {
                taken.push(idx);
            }
            found
        };

        let category = claim(aliases::CATEGORY);
        let sold = claim(aliases::SOLD);
        let capacity = claim(aliases::CAPACITY);
        let available = claim(aliases::AVAILABLE);
        let price = claim(aliases::PRICE);
        let revenue = claim(aliases::REVENUE);

        Self { category, capacity, sold, available, price, revenue }
    }

    /// Guesses columns for a header-less table: label first, then numbers.
    fn guess(table: &HtmlTable) -> Self {
        let width = table.headers.len();
        let numeric: Vec<usize> = (1..width)
            .filter(|&col| {
                table.rows.iter().filter(|r| parse_count(cell(r, Some(col))).is_some()).count()
                    * 2
                    >= table.rows.len()
            })
            .collect();

        let mut map = ColumnMap { category: Some(0), ..Default::default() };
        match numeric.as_slice() {
            [] => {}
            [sold] => map.sold = Some(*sold),
            [sold, revenue] => {
                map.sold = Some(*sold);
                map.revenue = Some(*revenue);
            }
            // Revenue is the right-most figure; a fourth column sits before it as unit price
            [capacity, sold, middle @ .., revenue] => {
                map.capacity = Some(*capacity);
                map.sold = Some(*sold);
                map.price = middle.last().copied();
                map.revenue = Some(*revenue);
            }
        }
        map
    }

    fn score(&self) -> usize {
        [self.category, self.capacity, self.sold, self.available, self.price, self.revenue]
            .iter()
            .filter(|c| c.is_some())
            .count()
    }
}

/// Kind of row within a report table.
#[derive(Debug, PartialEq)]
enum RowKind {
    Category,
    Total,
    Subtotal,
}

fn classify_label(label: &str) -> RowKind {
    let key = normalize_key(label);
    if key.starts_with("subtotal") {
        RowKind::Subtotal
    } else if key == "total" || key == "totales" || key.starts_with("total_") {
        RowKind::Total
    } else {
        RowKind::Category
    }
}

/// Login form details scraped from a login page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    /// Form action (relative or absolute); None posts back to the page URL
    pub action: Option<String>,
    /// Hidden fields to send back (CSRF, viewstate)
    pub hidden: Vec<(String, String)>,
    /// reCAPTCHA site key, when the form is protected
    pub captcha_site_key: Option<String>,
}

/// Parser for one ticketera's back-office pages.
pub struct Parser {
    ticketera: Ticketera,
    locale: NumberLocale,
}

impl Parser {
    /// Creates a new parser for the given ticketera.
    pub fn new(ticketera: Ticketera) -> Self {
        Self { ticketera, locale: ticketera.number_locale() }
    }

    /// Parses the login page form.
    pub fn parse_login_form(&self, html: &str) -> Result<LoginForm, ScrapeError> {
        let document = Html::parse_document(html);
        let form_selector = compile(self.ticketera.selectors().login_form)?;

        let form = document.select(&form_selector).next();
        if form.is_none() && document.select(&common::PASSWORD_INPUT).next().is_none() {
            return Err(ScrapeError::parse("login page", "no login form found"));
        }

        let hidden_inputs: Vec<ElementRef> = match form {
            Some(f) => f.select(&common::HIDDEN_INPUT).collect(),
            None => document.select(&common::HIDDEN_INPUT).collect(),
        };

        let hidden = hidden_inputs
            .into_iter()
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        let action = form
            .and_then(|f| f.value().attr("action"))
            .map(str::trim)
            .filter(|a| !a.is_empty() && *a != "#")
            .map(String::from);

        let captcha_site_key = document
            .select(&common::RECAPTCHA)
            .next()
            .and_then(|e| e.value().attr("data-sitekey"))
            .map(String::from);

        Ok(LoginForm { action, hidden, captcha_site_key })
    }

    /// Returns the rejection reason if the page after login still shows the form.
    pub fn login_error(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        if let Ok(selector) = compile(self.ticketera.selectors().login_error) {
            if let Some(el) = document.select(&selector).next() {
                let text = clean_cell(&el.text().collect::<String>());
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }

        if document.select(&common::PASSWORD_INPUT).next().is_some() {
            return Some("still on the login form".to_string());
        }

        None
    }

    /// Detects pages that bounced back to the login form.
    pub fn check_for_errors(&self, document: &Html, url: &str) -> Result<(), ScrapeError> {
        if document.select(&common::PASSWORD_INPUT).next().is_some() {
            return Err(ScrapeError::SessionExpired(url.to_string()));
        }
        Ok(())
    }

    /// Parses the event listing page.
    pub fn parse_events(&self, page: &PortalPage) -> Result<Vec<EventSummary>, ScrapeError> {
        let events = match page.kind {
            PageKind::Json => api::parse_events(self.ticketera, &page.body)?,
            PageKind::Html => self.parse_event_rows(page)?,
        };

        debug!("Parsed {} events from {}", events.len(), page.url);
        Ok(events)
    }

    fn parse_event_rows(&self, page: &PortalPage) -> Result<Vec<EventSummary>, ScrapeError> {
        let document = Html::parse_document(&page.body);
        self.check_for_errors(&document, &page.url)?;

        let selectors = self.ticketera.selectors();
        let row_selector = compile(selectors.event_row)?;
        let link_selector = compile(selectors.event_link)?;

        let mut header_cache: HashMap<_, HtmlTable> = HashMap::new();
        let mut events: Vec<EventSummary> = Vec::new();

        for row in document.select(&row_selector) {
            let link = row.select(&link_selector).next().or_else(|| row.select(&common::ANY_LINK).next());
            let href = link.and_then(|l| l.value().attr("href"));

            let id = row
                .value()
                .attr("data-event-id")
                .or_else(|| row.value().attr("data-id"))
                .map(String::from)
                .or_else(|| href.and_then(extract_event_id));

            let Some(id) = id else {
                trace!("Skipping event row without id");
                continue;
            };

            if events.iter().any(|e| e.id == id) {
                continue;
            }

            let cells: Vec<String> =
                row.select(&common::CELL).map(|c| clean_cell(&c.text().collect::<String>())).collect();

            // Column meaning comes from the enclosing table's header, when there is one
            let table = row
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| a.value().name() == "table");
            let headers = table.map(|t| {
                header_cache.entry(t.id()).or_insert_with(|| HtmlTable::from_element(t))
            });

            let by_header = |aliases: &[&str]| -> Option<String> {
                let table = headers.as_ref()?;
                if table.has_generic_headers() {
                    return None;
                }
                let idx = table.column(aliases)?;
                cells.get(idx).filter(|c| !c.is_empty()).cloned()
            };

            let attr = |name: &str| row.value().attr(name).map(clean_cell).filter(|v| !v.is_empty());

            let link_text = link.map(|l| clean_cell(&l.text().collect::<String>())).filter(|t| {
                !t.is_empty() && !matches!(normalize_key(t).as_str(), "ver" | "reporte" | "borderaux" | "detalle" | "ventas")
            });

            let name = attr("data-event-name")
                .or_else(|| by_header(aliases::EVENT_NAME))
                .or(link_text)
                .or_else(|| cells.first().cloned().filter(|c| !c.is_empty()))
                .unwrap_or_else(|| placeholder_name(&id));

            let date = attr("data-event-date")
                .as_deref()
                .and_then(parse_spanish_date)
                .or_else(|| by_header(aliases::EVENT_DATE).as_deref().and_then(parse_spanish_date))
                .or_else(|| cells.iter().find_map(|c| parse_spanish_date(c)));

            let url = href.map(|h| absolute_url(&page.url, h));

            events.push(EventSummary {
                id,
                name,
                artist: attr("data-artist").or_else(|| by_header(aliases::EVENT_ARTIST)),
                venue: attr("data-venue").or_else(|| by_header(aliases::EVENT_VENUE)),
                city: attr("data-city").or_else(|| by_header(aliases::EVENT_CITY)),
                date,
                url,
            });
        }

        Ok(events)
    }

    /// Parses a sales report page for `event`.
    pub fn parse_report(
        &self,
        page: &PortalPage,
        event: &EventSummary,
    ) -> Result<SalesReport, ScrapeError> {
        let report = match page.kind {
            PageKind::Json => self.parse_api_report(page, event)?,
            PageKind::Html => self.parse_html_report(page, event)?,
        };

        debug!(
            "Parsed report for {} ({}): {} categories, {} sold, {:.2} {} [{:?}]",
            report.event.name,
            report.event.id,
            report.count(),
            report.totals.sold,
            report.totals.revenue,
            report.currency,
            report.totals_source
        );

        Ok(report)
    }

    fn parse_api_report(
        &self,
        page: &PortalPage,
        event: &EventSummary,
    ) -> Result<SalesReport, ScrapeError> {
        let (categories, totals) = api::parse_report(self.ticketera, &page.body)?;

        let (totals, totals_source) = match totals {
            Some(t) => (t, TotalsSource::Api),
            None => (SalesTotals::from_categories(&categories), TotalsSource::Computed),
        };

        Ok(SalesReport {
            ticketera: self.ticketera,
            event: event.clone(),
            categories,
            totals,
            totals_source,
            currency: self.ticketera.currency().to_string(),
            source_url: page.url.clone(),
            scraped_at: Utc::now(),
            raw_tables: Vec::new(),
        })
    }

    fn parse_html_report(
        &self,
        page: &PortalPage,
        event: &EventSummary,
    ) -> Result<SalesReport, ScrapeError> {
        let document = Html::parse_document(&page.body);
        self.check_for_errors(&document, &page.url)?;

        let scope = compile(self.ticketera.selectors().report_scope)?;
        let mut tables = extract_tables_from(&document, &scope);
        if tables.is_empty() {
            warn!("Report scope not found for {}, scanning every table", self.ticketera);
            tables = extract_tables_from(&document, &compile("table")?);
        }

        if tables.is_empty() {
            return Err(ScrapeError::parse("report", format!("no tables found at {}", page.url)));
        }

        let (index, columns) = self
            .pick_category_table(&tables)
            .ok_or_else(|| ScrapeError::parse("report", "no table with a sold-tickets column"))?;
        let table = &tables[index];

        let mut categories = Vec::new();
        let mut totals_row: Option<CategorySales> = None;

        for (i, row) in table.rows.iter().enumerate() {
            let label = cell(row, columns.category).to_string();
            let Some(parsed) = self.parse_category_row(row, &columns, &label) else {
                continue;
            };

            let is_last = i + 1 == table.rows.len();
            match classify_label(&label) {
                RowKind::Total => totals_row = Some(parsed),
                RowKind::Subtotal => trace!("Skipping subtotal row: {}", label),
                RowKind::Category if label.is_empty() && is_last && !categories.is_empty() => {
                    // Unlabelled trailing row (usually a <tfoot>)
                    totals_row = Some(parsed)
                }
                RowKind::Category => categories.push(parsed),
            }
        }

        if categories.is_empty() && totals_row.is_none() {
            return Err(ScrapeError::parse("report", "category table has no usable rows"));
        }

        let computed = SalesTotals::from_categories(&categories);
        let (totals, totals_source) = if let Some(row) = totals_row {
            let totals = SalesTotals {
                capacity: row.effective_capacity().or(computed.capacity),
                sold: row.sold,
                revenue: if row.revenue > 0.0 { row.revenue } else { computed.revenue },
            };
            (totals, TotalsSource::Row)
        } else if let Some(totals) = self.find_totals_table(&tables, index) {
            let totals = SalesTotals {
                capacity: totals.capacity.or(computed.capacity),
                ..totals
            };
            (totals, TotalsSource::Table)
        } else {
            (computed, TotalsSource::Computed)
        };

        if totals_source != TotalsSource::Computed && !categories.is_empty() && totals.sold != computed.sold {
            warn!(
                "{} report totals ({}) differ from category sum ({}) for event {}",
                self.ticketera, totals.sold, computed.sold, event.id
            );
        }

        let mut event = event.clone();
        if event.has_placeholder_name() {
            if let Some(heading) = document
                .select(&common::HEADING)
                .map(|h| clean_cell(&h.text().collect::<String>()))
                .find(|h| !h.is_empty())
            {
                event.name = heading;
            }
        }
        if event.date.is_none() {
            event.date = document
                .select(&common::HEADING)
                .find_map(|h| parse_spanish_date(&h.text().collect::<String>()));
        }

        Ok(SalesReport {
            ticketera: self.ticketera,
            event,
            categories,
            totals,
            totals_source,
            currency: self.ticketera.currency().to_string(),
            source_url: page.url.clone(),
            scraped_at: Utc::now(),
            raw_tables: tables.iter().map(HtmlTable::records).collect(),
        })
    }

    /// Picks the table that looks most like a per-category breakdown.
    fn pick_category_table(&self, tables: &[HtmlTable]) -> Option<(usize, ColumnMap)> {
        tables
            .iter()
            .enumerate()
            .filter_map(|(i, table)| {
                let mut columns = ColumnMap::from_headers(table);
                if columns.sold.is_none() && table.has_generic_headers() {
                    debug!("Table {} has no headers, guessing columns", i);
                    columns = ColumnMap::guess(table);
                }
                columns.sold.map(|_| (i, columns))
            })
            .max_by_key(|(i, columns)| {
                (columns.score(), columns.category.is_some(), tables[*i].rows.len())
            })
    }

    fn parse_category_row(
        &self,
        row: &[String],
        columns: &ColumnMap,
        label: &str,
    ) -> Option<CategorySales> {
        let sold = parse_count(cell(row, columns.sold));
        let revenue = parse_amount(cell(row, columns.revenue), self.locale);
        let capacity = parse_count(cell(row, columns.capacity));
        let available = parse_count(cell(row, columns.available));
        let price = parse_amount(cell(row, columns.price), self.locale);

        if sold.is_none() && revenue.is_none() && capacity.is_none() {
            return None;
        }

        let sold = sold.unwrap_or(0);
        let revenue = revenue.unwrap_or_else(|| price.map(|p| p * sold as f64).unwrap_or(0.0));

        Some(CategorySales {
            name: if label.is_empty() { "Sin categoría".to_string() } else { label.to_string() },
            capacity,
            sold,
            available,
            price,
            revenue,
        })
    }

    /// Looks for a key/value or single-row totals table.
    fn find_totals_table(&self, tables: &[HtmlTable], skip: usize) -> Option<SalesTotals> {
        for (i, table) in tables.iter().enumerate() {
            if i == skip {
                continue;
            }

            // Key/value layout: "Total vendidas | 1.349"
            if table.headers.len() == 2 || table.rows.iter().all(|r| r.len() == 2) {
                let mut totals = SalesTotals::default();
                let mut found = false;
                for row in &table.rows {
                    let key = normalize_key(cell(row, Some(0)));
                    let value = cell(row, Some(1));
                    if key.contains("recaud") || key.contains("monto") || key.contains("importe") {
                        if let Some(v) = parse_amount(value, self.locale) {
                            totals.revenue = v;
                            found = true;
                        }
                    } else if key.contains("vendid") || key.contains("emitid") {
                        if let Some(v) = parse_count(value) {
                            totals.sold = v;
                            found = true;
                        }
                    } else if key.contains("capacidad") || key.contains("aforo") {
                        totals.capacity = parse_count(value);
                    }
                }
                if found {
                    return Some(totals);
                }
            }

            // Single-row table with numeric headers and no category column
            let columns = ColumnMap::from_headers(table);
            if table.rows.len() == 1 && columns.category.is_none() && columns.sold.is_some() {
                let row = &table.rows[0];
                return Some(SalesTotals {
                    capacity: parse_count(cell(row, columns.capacity)),
                    sold: parse_count(cell(row, columns.sold)).unwrap_or(0),
                    revenue: parse_amount(cell(row, columns.revenue), self.locale).unwrap_or(0.0),
                });
            }
        }
        None
    }
}

/// Pulls an event id out of a back-office link.
pub fn extract_event_id(href: &str) -> Option<String> {
    if let Some(caps) = ID_QUERY.captures(href) {
        return Some(caps[1].to_string());
    }
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.rsplit('/')
        .find(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()))
        .map(String::from)
}

/// Resolves `href` against the page URL.
pub fn absolute_url(page_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    let origin_end = page_url
        .find("://")
        .and_then(|scheme| page_url[scheme + 3..].find('/').map(|p| p + scheme + 3))
        .unwrap_or(page_url.len());
    let origin = &page_url[..origin_end];

    if href.starts_with('/') {
        format!("{}{}", origin, href)
    } else {
        let base = page_url.split(['?', '#']).next().unwrap_or(page_url);
        match base.rfind('/') {
            Some(slash) if slash >= origin_end => format!("{}/{}", &base[..slash], href),
            _ => format!("{}/{}", origin, href),
        }
    }
}
