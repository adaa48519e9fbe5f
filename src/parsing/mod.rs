//! Shared scraping utilities: tables, locale numbers, Spanish dates, text keys.

pub mod dates;
pub mod numbers;
pub mod table;
pub mod text;

pub use dates::parse_spanish_date;
pub use numbers::{parse_amount, parse_count, parse_percentage, NumberLocale};
pub use table::{extract_tables, HtmlTable};
pub use text::{names_match, normalize_key, slugify};
