//! CSS selectors for back-office HTML parsing.
//!
//! Every vendor-specific selector lives here. Update this file when a portal
//! changes its markup.
//!
//! **Update process**: When parsing fails, capture an HTML sample,
//! update selectors, and add a test fixture under `tests/fixtures/`.

use crate::error::ScrapeError;
use crate::ticketera::Ticketera;
use scraper::Selector;
use std::sync::LazyLock;

/// Selectors shared by all portals.
pub mod common {
    use super::*;

    /// Hidden inputs carried over on form login (CSRF tokens, ASP.NET viewstate).
    pub static HIDDEN_INPUT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("input[type='hidden'][name]").unwrap());

    /// Google reCAPTCHA v2 widget.
    pub static RECAPTCHA: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            ".g-recaptcha[data-sitekey], \
             div[data-sitekey]",
        )
        .unwrap()
    });

    /// Any password field; its presence after login means we are still on the form.
    pub static PASSWORD_INPUT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("input[type='password']").unwrap());

    /// Link inside an event row.
    pub static ANY_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

    /// Table cells.
    pub static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());

    /// Page heading, used as a fallback event name on report pages.
    pub static HEADING: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h1, h2, .event-title, .titulo-evento").unwrap());
}

/// Vendor-specific selectors, as CSS strings.
#[derive(Debug, Clone, Copy)]
pub struct VendorSelectors {
    /// Login `<form>`
    pub login_form: &'static str,
    /// Username/email input `name` attribute
    pub username_field: &'static str,
    /// Password input `name` attribute
    pub password_field: &'static str,
    /// Element shown when login is rejected
    pub login_error: &'static str,
    /// One row per event on the listing page
    pub event_row: &'static str,
    /// Link to the event detail/report within a row
    pub event_link: &'static str,
    /// Container of the sales report tables
    pub report_scope: &'static str,
    /// Button that renders the report (browser vendors)
    pub report_button: Option<&'static str>,
    /// Element that proves the user is logged in (browser vendors)
    pub logged_in_marker: &'static str,
}

const DEFAULT: VendorSelectors = VendorSelectors {
    login_form: "form",
    username_field: "username",
    password_field: "password",
    login_error: ".alert-danger, .error, .login-error",
    event_row: "table tbody tr",
    event_link: "a[href]",
    report_scope: "table",
    report_button: None,
    logged_in_marker: "a[href*='logout'], a[href*='salir']",
};

impl Ticketera {
    /// Returns the selector set for this ticketera.
    pub fn selectors(&self) -> VendorSelectors {
        match self {
            Ticketera::CoolcoTicket => VendorSelectors {
                username_field: "email",
                event_row: "[data-event-id], .event-card",
                event_link: "a[href*='/events/']",
                report_scope: ".sales-summary, .report-container",
                report_button: Some("button.load-sales, button[data-action='sales']"),
                logged_in_marker: ".dashboard, nav .user-menu",
                ..DEFAULT
            },
            Ticketera::PuntoTicket => VendorSelectors {
                login_form: "form#loginForm, form[action*='Login']",
                username_field: "UserName",
                password_field: "Password",
                login_error: ".validation-summary-errors, .field-validation-error",
                event_row: "table#tablaEventos tbody tr, table.eventos tbody tr",
                event_link: "a[href*='eventoId'], a[href*='Borderaux']",
                report_scope: "#borderaux, .borderaux, #reporte",
                ..DEFAULT
            },
            Ticketera::Venti => VendorSelectors {
                username_field: "email",
                login_error: ".MuiAlert-message, .error-message",
                event_row: "[data-event-id], .event-row",
                event_link: "a[href*='/events/']",
                report_scope: ".report-table, .MuiTableContainer-root",
                report_button: Some("button[data-testid='generate-report'], button.generate-report"),
                logged_in_marker: "[data-testid='producer-dashboard'], .producer-header",
                ..DEFAULT
            },
            Ticketera::Ticketea => VendorSelectors {
                username_field: "usuario",
                password_field: "clave",
                event_row: "table.table-eventos tbody tr",
                event_link: "a[href*='/eventos/']",
                report_scope: "#ventas, .ventas-por-sector",
                ..DEFAULT
            },
            Ticketera::TicketLaVarden => VendorSelectors {
                username_field: "usuario",
                password_field: "password",
                login_error: ".alert, .mensaje-error",
                event_row: "#eventos tbody tr",
                event_link: "a[href*='borderaux'], a[href*='/eventos/']",
                report_scope: "#borderaux, .borderaux",
                ..DEFAULT
            },
            Ticketera::Articket => VendorSelectors {
                username_field: "email",
                password_field: "password",
                event_row: ".listado-eventos tr, table tbody tr",
                event_link: "a[href*='/eventos/']",
                report_scope: ".reporte, #reporte-ventas",
                ..DEFAULT
            },
            Ticketera::Livepass | Ticketera::TicketmasterB2b => DEFAULT,
            Ticketera::Passline => VendorSelectors {
                username_field: "email",
                password_field: "password",
                login_error: ".alert-danger, .invalid-feedback",
                event_row: "table#events tbody tr, .evento-item",
                event_link: "a[href*='/eventos/']",
                report_scope: "#reporte-ventas, .reporte-ventas",
                ..DEFAULT
            },
            Ticketera::EntradaUno => VendorSelectors {
                login_form: "form#form1, form",
                username_field: "txtUsuario",
                password_field: "txtPassword",
                login_error: "#lblError, .error",
                event_row: "table#gvEventos tr",
                event_link: "a[href*='idEvento']",
                report_scope: "#gvBorderaux, #pnlBorderaux, .borderaux",
                ..DEFAULT
            },
        }
    }
}

/// Compiles a vendor selector string.
pub fn compile(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::parse("selector", format!("{}: {}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vendor_selectors_compile() {
        for t in Ticketera::all() {
            let s = t.selectors();
            for css in [
                s.login_form,
                s.login_error,
                s.event_row,
                s.event_link,
                s.report_scope,
                s.logged_in_marker,
            ] {
                assert!(compile(css).is_ok(), "{} selector failed: {}", t, css);
            }
            if let Some(button) = s.report_button {
                assert!(compile(button).is_ok(), "{} report button failed", t);
            }
        }
    }

    #[test]
    fn test_common_selectors_compile() {
        let _ = &*common::HIDDEN_INPUT;
        let _ = &*common::RECAPTCHA;
        let _ = &*common::PASSWORD_INPUT;
        let _ = &*common::ANY_LINK;
        let _ = &*common::CELL;
        let _ = &*common::HEADING;
    }

    #[test]
    fn test_compile_invalid() {
        let err = compile("div[[").unwrap_err();
        assert!(err.to_string().contains("selector"));
    }

    #[test]
    fn test_browser_vendors_have_report_button() {
        assert!(Ticketera::Venti.selectors().report_button.is_some());
        assert!(Ticketera::CoolcoTicket.selectors().report_button.is_some());
        assert!(Ticketera::PuntoTicket.selectors().report_button.is_none());
    }
}
