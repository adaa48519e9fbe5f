//! ticketera-scraper - back-office sales scraper for LATAM ticketing platforms
//!
//! Logs into producer portals (form login, REST tokens, or a WebDriver
//! browser), parses per-event sales reports and accumulates daily sales in
//! PostgreSQL.

pub mod captcha;
pub mod commands;
pub mod config;
pub mod error;
pub mod filters;
pub mod format;
pub mod parsing;
pub mod retry;
pub mod sales;
pub mod storage;
pub mod ticketera;

pub use config::Config;
pub use error::ScrapeError;
pub use sales::{compute_daily_sales, DailySales, SalesSnapshot};
pub use ticketera::{CategorySales, EventSummary, SalesReport, SalesTotals, Ticketera};
