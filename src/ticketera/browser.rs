//! WebDriver sessions for client-rendered back-offices (Venti, Coolco).
//!
//! Requires a running WebDriver (chromedriver or Selenium) at
//! `webdriver_url`.

use crate::captcha::TwoCaptchaClient;
use crate::config::{Config, Credentials};
use crate::error::ScrapeError;
use crate::retry::RetryPolicy;
use crate::ticketera::client::{PortalPage, TicketeraPortal};
use crate::ticketera::parser::Parser;
use crate::ticketera::Ticketera;
use anyhow::{Context, Result};
use async_trait::async_trait;
use thirtyfour::prelude::*;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const SUBMIT_BUTTON: &str = "button[type='submit'], input[type='submit']";

fn browser_err(e: WebDriverError) -> ScrapeError {
    ScrapeError::Browser(e.to_string())
}

/// Chrome session driving one ticketera back-office.
pub struct BrowserPortal {
    driver: WebDriver,
    ticketera: Ticketera,
    credentials: Credentials,
    base_url: String,
    wait: Duration,
    retry: RetryPolicy,
    solver: Option<TwoCaptchaClient>,
}

impl BrowserPortal {
    /// Starts a Chrome session on the configured WebDriver.
    pub async fn new(config: &Config, ticketera: Ticketera) -> Result<Self> {
        let credentials = config.credentials(ticketera)?;

        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.add_arg("--headless=new")?;
        }
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        caps.add_arg("--disable-gpu")?;
        caps.add_arg("--window-size=1920,1080")?;
        caps.add_arg("--disable-blink-features=AutomationControlled")?;
        let lang = ticketera.accept_language().split(',').next().unwrap_or("es");
        caps.add_arg(&format!("--lang={}", lang))?;
        caps.add_arg(&format!("--user-agent={}", USER_AGENT))?;
        if let Some(proxy) = &config.proxy {
            caps.add_arg(&format!("--proxy-server={}", proxy))?;
        }

        debug!("Connecting to WebDriver at {}", config.webdriver_url);
        let driver = WebDriver::new(&config.webdriver_url, caps)
            .await
            .context("Failed to connect to WebDriver")?;

        Ok(Self {
            driver,
            ticketera,
            credentials,
            base_url: config.base_url(ticketera),
            wait: Duration::from_secs(config.timeout_secs),
            retry: config.retry_policy(),
            solver: TwoCaptchaClient::from_config(&config.captcha, config.proxy.as_deref())?,
        })
    }

    /// Ends the WebDriver session.
    pub async fn quit(self) -> Result<()> {
        self.driver.quit().await.context("Failed to close browser session")
    }

    async fn goto(&self, path: &str) -> Result<(), ScrapeError> {
        let url = format!("{}{}", self.base_url, path);
        let (target, driver) = (&url, &self.driver);
        self.retry.run(&url, move || async move {
            debug!("Navigating to {}", target);
            driver.goto(target).await.map_err(browser_err)
        })
        .await
    }

    async fn wait_for(&self, css: &str) -> Result<WebElement, ScrapeError> {
        self.driver
            .query(By::Css(css))
            .wait(self.wait, Duration::from_millis(250))
            .first()
            .await
            .map_err(browser_err)
    }

    async fn page(&self) -> Result<PortalPage, ScrapeError> {
        let url = self.driver.current_url().await.map_err(browser_err)?;
        let body = self.driver.source().await.map_err(browser_err)?;
        Ok(PortalPage::html(url.to_string(), body))
    }

    async fn solve_captcha(&self, site_key: &str) -> Result<(), ScrapeError> {
        let solver = self.solver.as_ref().ok_or(ScrapeError::CaptchaRequired(self.ticketera))?;
        let page_url = self.driver.current_url().await.map_err(browser_err)?.to_string();
        let token = solver.solve_recaptcha_v2(site_key, &page_url).await?;

        let script = r#"
            var area = document.getElementById('g-recaptcha-response')
                || document.querySelector('textarea[name="g-recaptcha-response"]');
            if (area) { area.style.display = 'block'; area.value = arguments[0]; }
        "#;
        self.driver
            .execute(script, vec![serde_json::Value::String(token)])
            .await
            .map_err(browser_err)?;
        info!("Injected reCAPTCHA solution");
        Ok(())
    }
}

#[async_trait]
impl TicketeraPortal for BrowserPortal {
    fn ticketera(&self) -> Ticketera {
        self.ticketera
    }

    async fn login(&self) -> Result<(), ScrapeError> {
        info!("Logging in to {} (browser)", self.ticketera.display_name());
        let selectors = self.ticketera.selectors();

        self.goto(self.ticketera.login_path()).await?;

        let username_css = format!("input[name='{}']", selectors.username_field);
        let password_css = format!("input[name='{}']", selectors.password_field);

        let username = self.wait_for(&username_css).await?;
        username.clear().await.map_err(browser_err)?;
        username.send_keys(&self.credentials.username).await.map_err(browser_err)?;

        let password = self.wait_for(&password_css).await?;
        password.clear().await.map_err(browser_err)?;
        password.send_keys(&self.credentials.password).await.map_err(browser_err)?;

        let parser = Parser::new(self.ticketera);
        let source = self.driver.source().await.map_err(browser_err)?;
        if let Some(site_key) = parser.parse_login_form(&source)?.captcha_site_key {
            self.solve_captcha(&site_key).await?;
        }

        self.wait_for(SUBMIT_BUTTON).await?.click().await.map_err(browser_err)?;

        if self.wait_for(selectors.logged_in_marker).await.is_ok() {
            info!("Logged in to {}", self.ticketera.display_name());
            return Ok(());
        }

        let source = self.driver.source().await.map_err(browser_err)?;
        let reason = parser
            .login_error(&source)
            .unwrap_or_else(|| "dashboard did not load".to_string());
        Err(ScrapeError::LoginFailed { ticketera: self.ticketera, reason })
    }

    async fn event_list(&self) -> Result<PortalPage, ScrapeError> {
        self.goto(self.ticketera.events_path()).await?;
        if self.wait_for(self.ticketera.selectors().event_row).await.is_err() {
            warn!("No event rows rendered on {}", self.ticketera.display_name());
        }
        self.page().await
    }

    async fn event_report(&self, event_id: &str) -> Result<PortalPage, ScrapeError> {
        let selectors = self.ticketera.selectors();
        self.goto(&self.ticketera.report_path(event_id)).await?;

        if let Some(button) = selectors.report_button {
            match self.wait_for(button).await {
                Ok(el) => {
                    el.click().await.map_err(browser_err)?;
                    // Reports render client-side after the click
                    sleep(Duration::from_millis(500)).await;
                }
                Err(e) => debug!("Report button not found: {}", e),
            }
        }

        if self.wait_for(selectors.report_scope).await.is_err() {
            warn!("Report container not found for event {}", event_id);
        }
        self.page().await
    }
}
