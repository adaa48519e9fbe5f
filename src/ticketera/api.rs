//! JSON payloads of the REST back-offices (Ticketmaster B2B, Livepass).

use crate::error::ScrapeError;
use crate::parsing::parse_spanish_date;
use crate::ticketera::models::{CategorySales, EventSummary, SalesTotals};
use crate::ticketera::Ticketera;
use serde::{Deserialize, Serialize};

/// Login body for both REST vendors.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    pub password: &'a str,
}

impl<'a> LoginRequest<'a> {
    /// Builds the vendor's login body.
    pub fn for_ticketera(ticketera: Ticketera, user: &'a str, password: &'a str) -> Self {
        match ticketera {
            Ticketera::Livepass => Self { username: None, email: Some(user), password },
            _ => Self { username: Some(user), email: None, password },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "access_token", alias = "accessToken", alias = "jwt")]
    token: Option<String>,
    #[serde(default)]
    data: Option<Box<TokenResponse>>,
}

/// Extracts the bearer token from a login response.
pub fn parse_token(body: &str) -> Result<String, ScrapeError> {
    let response: TokenResponse = serde_json::from_str(body)?;
    response
        .token
        .or_else(|| response.data.and_then(|d| d.token))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScrapeError::parse("login response", "no token field"))
}

// Ticketmaster B2B

#[derive(Debug, Deserialize)]
struct TmEventList {
    events: Vec<TmEvent>,
}

#[derive(Debug, Deserialize)]
struct TmEvent {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmSales {
    categories: Vec<TmCategory>,
    #[serde(default)]
    totals: Option<TmTotals>,
}

#[derive(Debug, Deserialize)]
struct TmCategory {
    name: String,
    #[serde(default)]
    capacity: Option<i64>,
    sold: i64,
    #[serde(default)]
    available: Option<i64>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    gross: f64,
}

#[derive(Debug, Deserialize)]
struct TmTotals {
    #[serde(default)]
    capacity: Option<i64>,
    sold: i64,
    gross: f64,
}

// Livepass

#[derive(Debug, Deserialize)]
struct LpEventList {
    data: Vec<LpEvent>,
}

#[derive(Debug, Deserialize)]
struct LpEvent {
    id: serde_json::Value,
    title: String,
    #[serde(default)]
    performer: Option<String>,
    #[serde(default)]
    starts_at: Option<String>,
    #[serde(default)]
    venue: Option<LpVenue>,
}

#[derive(Debug, Deserialize)]
struct LpVenue {
    name: String,
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LpReport {
    sections: Vec<LpSection>,
}

#[derive(Debug, Deserialize)]
struct LpSection {
    name: String,
    #[serde(default)]
    capacity: Option<i64>,
    tickets_sold: i64,
    #[serde(default)]
    revenue: f64,
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses the REST event listing.
pub fn parse_events(ticketera: Ticketera, body: &str) -> Result<Vec<EventSummary>, ScrapeError> {
    match ticketera {
        Ticketera::TicketmasterB2b => {
            let list: TmEventList = serde_json::from_str(body)?;
            Ok(list
                .events
                .into_iter()
                .map(|e| EventSummary {
                    id: id_to_string(&e.id),
                    date: e.date.as_deref().and_then(parse_spanish_date),
                    name: e.name,
                    artist: e.artist,
                    venue: e.venue,
                    city: e.city,
                    url: None,
                })
                .collect())
        }
        Ticketera::Livepass => {
            let list: LpEventList = serde_json::from_str(body)?;
            Ok(list
                .data
                .into_iter()
                .map(|e| {
                    let (venue, city) = match e.venue {
                        Some(v) => (Some(v.name), v.city),
                        None => (None, None),
                    };
                    EventSummary {
                        id: id_to_string(&e.id),
                        date: e.starts_at.as_deref().and_then(parse_spanish_date),
                        name: e.title,
                        artist: e.performer,
                        venue,
                        city,
                        url: None,
                    }
                })
                .collect())
        }
        other => Err(ScrapeError::UnsupportedAccess {
            ticketera: other,
            access: "html",
            hint: "this vendor has no JSON API",
        }),
    }
}

/// Parsed REST report: categories plus vendor totals when provided.
pub type ApiReport = (Vec<CategorySales>, Option<SalesTotals>);

/// Parses a REST sales report body.
pub fn parse_report(ticketera: Ticketera, body: &str) -> Result<ApiReport, ScrapeError> {
    match ticketera {
        Ticketera::TicketmasterB2b => {
            let sales: TmSales = serde_json::from_str(body)?;
            let categories = sales
                .categories
                .into_iter()
                .map(|c| CategorySales {
                    name: c.name,
                    capacity: c.capacity,
                    sold: c.sold,
                    available: c.available,
                    price: c.price,
                    revenue: c.gross,
                })
                .collect();
            let totals = sales.totals.map(|t| SalesTotals {
                capacity: t.capacity,
                sold: t.sold,
                revenue: t.gross,
            });
            Ok((categories, totals))
        }
        Ticketera::Livepass => {
            let report: LpReport = serde_json::from_str(body)?;
            let categories = report
                .sections
                .into_iter()
                .map(|s| CategorySales {
                    name: s.name,
                    capacity: s.capacity,
                    sold: s.tickets_sold,
                    available: None,
                    price: None,
                    revenue: s.revenue,
                })
                .collect();
            Ok((categories, None))
        }
        other => Err(ScrapeError::UnsupportedAccess {
            ticketera: other,
            access: "html",
            hint: "this vendor has no JSON API",
        }),
    }
}
