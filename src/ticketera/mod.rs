//! Ticketera back-offices: sessions, parsing, and data models.

pub mod api;
#[cfg(feature = "browser")]
pub mod browser;
pub mod client;
pub mod models;
pub mod parser;
pub mod selectors;
pub mod vendors;

#[cfg(feature = "browser")]
pub use browser::BrowserPortal;
pub use client::{PageKind, PortalClient, PortalPage, TicketeraPortal};
pub use models::{CategorySales, EventSummary, SalesReport, SalesTotals, TotalsSource};
pub use parser::Parser;
pub use vendors::{Access, Ticketera};
