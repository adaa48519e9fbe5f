//! Events command: list a producer's events.

use super::Portal;
use crate::config::Config;
use crate::filters::FilterChain;
use crate::format::Formatter;
use crate::ticketera::{EventSummary, Parser, Ticketera, TicketeraPortal};
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Lists the events visible in a back-office.
pub struct EventsCommand {
    config: Config,
    filters: FilterChain,
}

impl EventsCommand {
    pub fn new(config: Config, filters: FilterChain) -> Self {
        Self { config, filters }
    }

    /// Logs in, lists events and returns formatted output.
    pub async fn execute(&self, ticketera: Ticketera) -> Result<String> {
        let portal = Portal::open(&self.config, ticketera).await?;
        let result = self.execute_with_portal(portal.as_portal()).await;
        portal.close().await?;

        let events = result?;
        Ok(Formatter::new(self.config.format).format_events(&events))
    }

    /// Lists events with a provided session (for testing).
    pub async fn execute_with_portal(
        &self,
        portal: &dyn TicketeraPortal,
    ) -> Result<Vec<EventSummary>> {
        let ticketera = portal.ticketera();

        portal
            .login()
            .await
            .with_context(|| format!("Login to {} failed", ticketera.display_name()))?;

        let page = portal.event_list().await.context("Failed to fetch event list")?;
        let events = Parser::new(ticketera).parse_events(&page)?;

        if !self.filters.is_empty() {
            debug!("Active filters: {}", self.filters.descriptions().join(", "));
        }

        let total = events.len();
        let events = self.filters.apply(events);
        info!("{} lists {} events ({} after filtering)", ticketera.display_name(), total, events.len());

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::filters::FilterChainBuilder;
    use crate::ticketera::PortalPage;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    const LISTING: &str = r#"
        <table class="table-eventos">
            <thead><tr><th>Evento</th><th>Fecha</th><th>Lugar</th></tr></thead>
            <tbody>
                <tr><td><a href="/eventos/501">Ciro y los Persas</a></td><td>10/05/2025</td><td>Estadio Único</td></tr>
                <tr><td><a href="/eventos/502">Babasónicos</a></td><td>17/05/2025</td><td>Movistar Arena</td></tr>
                <tr><td><a href="/eventos/503">Babasónicos</a></td><td>18/07/2025</td><td>Movistar Arena</td></tr>
            </tbody>
        </table>
    "#;

    struct MockPortal;

    #[async_trait]
    impl TicketeraPortal for MockPortal {
        fn ticketera(&self) -> Ticketera {
            Ticketera::Ticketea
        }

        async fn login(&self) -> Result<(), ScrapeError> {
            Ok(())
        }

        async fn event_list(&self) -> Result<PortalPage, ScrapeError> {
            Ok(PortalPage::html("https://productores.example.com/eventos", LISTING))
        }

        async fn event_report(&self, event_id: &str) -> Result<PortalPage, ScrapeError> {
            Err(ScrapeError::HttpStatus { status: 404, url: event_id.to_string() })
        }
    }

    #[tokio::test]
    async fn test_events_command_lists_all() {
        let cmd = EventsCommand::new(Config::default(), FilterChain::new());
        let events = cmd.execute_with_portal(&MockPortal).await.unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].id, "501");
        assert_eq!(events[0].name, "Ciro y los Persas");
    }

    #[tokio::test]
    async fn test_events_command_with_filters() {
        let filters = FilterChainBuilder::new()
            .keywords(vec!["babasonicos".into()])
            .date_range(NaiveDate::from_ymd_opt(2025, 6, 1), None)
            .build();
        let cmd = EventsCommand::new(Config::default(), filters);

        let events = cmd.execute_with_portal(&MockPortal).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "503");
    }
}
