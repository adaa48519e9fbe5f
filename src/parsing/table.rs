//! Generic HTML table extraction.
//!
//! Back-office reports are plain `<table>` markup with wildly different
//! headers. Tables are flattened into normalized header keys plus cell text;
//! mapping columns to meaning happens in the vendor parser.

use crate::parsing::text::{clean_cell, normalize_key};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static HEAD_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("thead th, thead td").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());

/// A flattened HTML table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HtmlTable {
    /// Normalized header keys (`columna_N` when the table has no header row)
    pub headers: Vec<String>,
    /// Original header labels as displayed
    pub labels: Vec<String>,
    /// Body rows, cell text cleaned
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// Builds a table from a `<table>` element.
    pub fn from_element(table: ElementRef) -> Self {
        let mut labels: Vec<String> =
            table.select(&HEAD_CELL).map(|c| clean_cell(&c.text().collect::<String>())).collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut header_from_body = false;

        for row in table.select(&ROW) {
            // Rows inside <thead> were already consumed as labels
            if row.ancestors().filter_map(ElementRef::wrap).any(|a| a.value().name() == "thead") {
                continue;
            }

            let is_header_row = labels.is_empty()
                && rows.is_empty()
                && !header_from_body
                && row.select(&HEADER_CELL).next().is_some()
                && row.select(&CELL).all(|c| c.value().name() == "th");

            let cells: Vec<String> =
                row.select(&CELL).map(|c| clean_cell(&c.text().collect::<String>())).collect();

            if is_header_row {
                labels = cells;
                header_from_body = true;
                continue;
            }

            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }

            rows.push(cells);
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(labels.len());
        let headers = build_headers(&labels, width);

        Self { headers, labels, rows }
    }

    /// Returns the index of the first column whose key matches one of `aliases`.
    ///
    /// Exact key matches win over prefix matches, so "total" does not steal a
    /// "total_vendidas" column when a plain "total" exists.
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        self.column_except(aliases, &[])
    }

    /// Like [`HtmlTable::column`], skipping columns already claimed in `taken`.
    pub fn column_except(&self, aliases: &[&str], taken: &[usize]) -> Option<usize> {
        let free = |idx: &usize| !taken.contains(idx);

        for alias in aliases {
            if let Some(idx) =
                self.headers.iter().enumerate().find(|(i, h)| free(i) && h == alias).map(|(i, _)| i)
            {
                return Some(idx);
            }
        }
        for alias in aliases {
            let prefix = format!("{}_", alias);
            let suffix = format!("_{}", alias);
            if let Some(idx) = self
                .headers
                .iter()
                .enumerate()
                .find(|(i, h)| free(i) && (h.starts_with(&prefix) || h.ends_with(&suffix)))
                .map(|(i, _)| i)
            {
                return Some(idx);
            }
        }
        None
    }

    /// Whether the table fell back to generic column names.
    pub fn has_generic_headers(&self) -> bool {
        self.labels.iter().all(|l| l.is_empty())
    }

    /// Rows as header-keyed maps, for raw payload storage.
    pub fn records(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cell text for an optional column, empty when missing or the row is short.
pub fn cell(row: &[String], column: Option<usize>) -> &str {
    column.and_then(|c| row.get(c)).map(String::as_str).unwrap_or("")
}

/// Normalizes labels into unique keys, padding with `columna_N`.
fn build_headers(labels: &[String], width: usize) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(width);

    for i in 0..width {
        let mut key = labels.get(i).map(|l| normalize_key(l)).unwrap_or_default();
        if key.is_empty() {
            key = format!("columna_{}", i + 1);
        }
        if headers.contains(&key) {
            key = format!("{}_{}", key, i + 1);
        }
        headers.push(key);
    }

    headers
}

/// Extracts every table in an HTML document or fragment.
pub fn extract_tables(html: &str) -> Vec<HtmlTable> {
    let document = Html::parse_document(html);
    extract_tables_from(&document, &TABLE)
}

/// Extracts tables matching `selector` from an already parsed document.
pub fn extract_tables_from(document: &Html, selector: &Selector) -> Vec<HtmlTable> {
    document
        .select(selector)
        .flat_map(|el| {
            if el.value().name() == "table" {
                vec![HtmlTable::from_element(el)]
            } else {
                el.select(&TABLE).map(HtmlTable::from_element).collect()
            }
        })
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_with_thead() {
        let html = r#"
            <table>
                <thead><tr><th>Sector</th><th>Capacidad</th><th>Vendidas</th></tr></thead>
                <tbody>
                    <tr><td>Campo</td><td>1.000</td><td>850</td></tr>
                    <tr><td>Platea</td><td>500</td><td>499</td></tr>
                </tbody>
            </table>
        "#;
        let tables = extract_tables(html);
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.headers, vec!["sector", "capacidad", "vendidas"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0], vec!["Campo", "1.000", "850"]);
        assert!(!t.has_generic_headers());
    }

    #[test]
    fn test_table_header_row_in_body() {
        let html = r#"
            <table>
                <tr><th>Localidad</th><th>Entradas Vendidas</th></tr>
                <tr><td>General</td><td>120</td></tr>
            </table>
        "#;
        let t = &extract_tables(html)[0];
        assert_eq!(t.headers, vec!["localidad", "entradas_vendidas"]);
        assert_eq!(t.rows, vec![vec!["General".to_string(), "120".to_string()]]);
    }

    #[test]
    fn test_row_header_cells_are_not_a_header_row() {
        // <th> used as a row label next to <td> cells
        let html = r#"
            <table>
                <tr><th>Campo</th><td>10</td></tr>
                <tr><th>Platea</th><td>20</td></tr>
            </table>
        "#;
        let t = &extract_tables(html)[0];
        assert_eq!(t.headers, vec!["columna_1", "columna_2"]);
        assert_eq!(t.rows.len(), 2);
    }

    #[test]
    fn test_table_without_headers_falls_back() {
        let html = r#"
            <table>
                <tr><td>Campo</td><td>10</td><td>$ 1.000</td></tr>
            </table>
        "#;
        let t = &extract_tables(html)[0];
        assert_eq!(t.headers, vec!["columna_1", "columna_2", "columna_3"]);
        assert!(t.has_generic_headers());
    }

    #[test]
    fn test_duplicate_headers_are_disambiguated() {
        let html = r#"
            <table>
                <thead><tr><th>Total</th><th>Total</th><th></th></tr></thead>
                <tr><td>1</td><td>2</td><td>3</td></tr>
            </table>
        "#;
        let t = &extract_tables(html)[0];
        assert_eq!(t.headers, vec!["total", "total_2", "columna_3"]);
    }

    #[test]
    fn test_column_lookup() {
        let t = HtmlTable {
            headers: vec!["sector".into(), "total_vendidas".into(), "total".into()],
            labels: vec![],
            rows: vec![],
        };
        assert_eq!(t.column(&["total"]), Some(2));
        assert_eq!(t.column(&["vendidas"]), Some(1));
        assert_eq!(t.column(&["capacidad"]), None);
        assert_eq!(t.column(&["categoria", "sector"]), Some(0));
        assert_eq!(t.column_except(&["total"], &[2]), Some(1));
        assert_eq!(t.column_except(&["total"], &[1, 2]), None);
    }

    #[test]
    fn test_cell_helper() {
        let row = vec!["a".to_string(), "b".to_string()];
        assert_eq!(cell(&row, Some(1)), "b");
        assert_eq!(cell(&row, Some(5)), "");
        assert_eq!(cell(&row, None), "");
    }

    #[test]
    fn test_records() {
        let html = r#"
            <table>
                <thead><tr><th>Sector</th><th>Vendidas</th></tr></thead>
                <tr><td>Campo</td></tr>
            </table>
        "#;
        let records = extract_tables(html)[0].records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["sector"], "Campo");
        assert_eq!(records[0]["vendidas"], "");
    }

    #[test]
    fn test_empty_tables_are_skipped() {
        let html = "<table><tr><td></td></tr></table><table></table>";
        assert!(extract_tables(html).is_empty());
    }

    #[test]
    fn test_extract_from_scope() {
        let html = r#"
            <div id="menu"><table><tr><td>nav</td></tr></table></div>
            <div id="report"><table><tr><td>Campo</td><td>5</td></tr></table></div>
        "#;
        let document = Html::parse_document(html);
        let scope = Selector::parse("#report").unwrap();
        let tables = extract_tables_from(&document, &scope);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0][0], "Campo");
    }
}
