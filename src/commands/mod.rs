//! CLI command implementations.

pub mod events;
pub mod scrape;

pub use events::EventsCommand;
pub use scrape::{ScrapeCommand, ScrapeOptions, ScrapeOutput, ScrapeSummary};

use crate::config::Config;
#[cfg(feature = "browser")]
use crate::ticketera::{Access, BrowserPortal};
use crate::ticketera::{PortalClient, Ticketera, TicketeraPortal};
use anyhow::{Context, Result};

/// The session a command drives: plain HTTP, or a browser for SPA back-offices.
pub enum Portal {
    Http(PortalClient),
    #[cfg(feature = "browser")]
    Browser(BrowserPortal),
}

impl Portal {
    /// Opens the right kind of session for `ticketera`.
    pub async fn open(config: &Config, ticketera: Ticketera) -> Result<Self> {
        #[cfg(feature = "browser")]
        if ticketera.access() == Access::Browser {
            let browser = BrowserPortal::new(config, ticketera)
                .await
                .context("Failed to start browser session")?;
            return Ok(Portal::Browser(browser));
        }

        let client = PortalClient::new(config, ticketera)
            .await
            .context("Failed to create HTTP client")?;
        Ok(Portal::Http(client))
    }

    pub fn as_portal(&self) -> &dyn TicketeraPortal {
        match self {
            Portal::Http(client) => client,
            #[cfg(feature = "browser")]
            Portal::Browser(browser) => browser,
        }
    }

    /// Ends the session. Browser sessions must be quit to free the WebDriver slot.
    pub async fn close(self) -> Result<()> {
        match self {
            Portal::Http(_) => Ok(()),
            #[cfg(feature = "browser")]
            Portal::Browser(browser) => browser.quit().await,
        }
    }
}
