//! HTTP session for back-office portals using wreq for TLS fingerprint emulation.

use crate::captcha::TwoCaptchaClient;
use crate::config::{Config, Credentials};
use crate::error::ScrapeError;
use crate::retry::RetryPolicy;
use crate::ticketera::api::{self, LoginRequest};
use crate::ticketera::parser::{absolute_url, Parser};
use crate::ticketera::{Access, Ticketera};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Body format of a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Html,
    Json,
}

/// A fetched back-office page.
#[derive(Debug, Clone)]
pub struct PortalPage {
    /// Final URL after redirects
    pub url: String,
    pub body: String,
    pub kind: PageKind,
}

impl PortalPage {
    pub fn html(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self { url: url.into(), body: body.into(), kind: PageKind::Html }
    }

    pub fn json(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self { url: url.into(), body: body.into(), kind: PageKind::Json }
    }
}

/// Trait for back-office sessions - enables mocking for tests.
#[async_trait]
pub trait TicketeraPortal: Send + Sync {
    /// Returns the ticketera this session talks to.
    fn ticketera(&self) -> Ticketera;

    /// Authenticates the session.
    async fn login(&self) -> Result<(), ScrapeError>;

    /// Fetches the producer's event listing.
    async fn event_list(&self) -> Result<PortalPage, ScrapeError>;

    /// Fetches the sales report for one event.
    async fn event_report(&self, event_id: &str) -> Result<PortalPage, ScrapeError>;
}

enum RequestBody {
    Form(String),
    Json(String),
}

/// Back-office HTTP client with browser impersonation and retries.
pub struct PortalClient {
    client: Client,
    ticketera: Ticketera,
    credentials: Credentials,
    base_url: String,
    delay_ms: u64,
    delay_jitter_ms: u64,
    retry: RetryPolicy,
    solver: Option<TwoCaptchaClient>,
    token: RwLock<Option<String>>,
}

impl PortalClient {
    /// Creates a new portal client for `ticketera`.
    pub async fn new(config: &Config, ticketera: Ticketera) -> Result<Self> {
        Self::with_base_url(config, ticketera, None).await
    }

    /// Creates a portal client with an optional custom base URL (for testing).
    pub async fn with_base_url(
        config: &Config,
        ticketera: Ticketera,
        base_url: Option<String>,
    ) -> Result<Self> {
        if ticketera.access() == Access::Browser {
            return Err(ScrapeError::UnsupportedAccess {
                ticketera,
                access: "browser",
                hint: "rebuild with --features browser and run a WebDriver (chromedriver)",
            }
            .into());
        }

        let credentials = config.credentials(ticketera)?;

        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(wreq::redirect::Policy::limited(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;
        let solver = TwoCaptchaClient::from_config(&config.captcha, config.proxy.as_deref())?;

        Ok(Self {
            client,
            ticketera,
            credentials,
            base_url: base_url.unwrap_or_else(|| config.base_url(ticketera)),
            delay_ms: config.delay_ms,
            delay_jitter_ms: config.delay_jitter_ms,
            retry: config.retry_policy(),
            solver,
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET (no body), retried on transient failures, or POST, sent once.
    ///
    /// Login POSTs carry credentials and are never resent.
    async fn request(
        &self,
        url: &str,
        body: Option<&RequestBody>,
    ) -> Result<PortalPage, ScrapeError> {
        let policy = if body.is_some() { self.retry.once() } else { self.retry };
        policy.run(url, || self.send_once(url, body)).await
    }

    async fn send_once(
        &self,
        url: &str,
        body: Option<&RequestBody>,
    ) -> Result<PortalPage, ScrapeError> {
        // Add human-like delay with jitter
        self.delay().await;

        let accept = match self.ticketera.access() {
            Access::Rest => "application/json, text/plain, */*",
            _ => "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        };

        let mut request = match body {
            None => {
                debug!("GET {}", url);
                self.client.get(url)
            }
            Some(_) => {
                debug!("POST {}", url);
                self.client.post(url)
            }
        };

        request = request
            .emulation(Emulation::Chrome131)
            .header("Accept", accept)
            .header("Accept-Language", self.ticketera.accept_language())
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Ch-Ua", "\"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"")
            .header("Sec-Ch-Ua-Mobile", "?0")
            .header("Sec-Ch-Ua-Platform", "\"Windows\"");

        if let Some(token) = self.token.read().await.as_deref() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        request = match body {
            Some(RequestBody::Form(form)) => request
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("Origin", self.base_url.as_str())
                .body(form.clone()),
            Some(RequestBody::Json(json)) => {
                request.header("Content-Type", "application/json").body(json.clone())
            }
            None => request,
        };

        let response = request.send().await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 429 || status == 503 {
            warn!("Rate limited ({}). Consider using a proxy or increasing delay.", status);
            return Err(ScrapeError::RateLimited { status: status.as_u16() });
        }

        if !status.is_success() {
            return Err(ScrapeError::HttpStatus { status: status.as_u16(), url: url.to_string() });
        }

        let final_url = response.uri().to_string();
        let is_json = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));

        let text = response.text().await?;

        Ok(PortalPage {
            url: final_url,
            body: text,
            kind: if is_json { PageKind::Json } else { PageKind::Html },
        })
    }

    /// Adds a random delay to mimic human behavior.
    async fn delay(&self) {
        if self.delay_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        debug!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }

    async fn form_login(&self) -> Result<(), ScrapeError> {
        let login_url = self.url(self.ticketera.login_path());
        let page = self.request(&login_url, None).await?;

        let parser = Parser::new(self.ticketera);
        let form = parser.parse_login_form(&page.body)?;
        let selectors = self.ticketera.selectors();

        let mut fields = form.hidden;
        fields.push((selectors.username_field.to_string(), self.credentials.username.clone()));
        fields.push((selectors.password_field.to_string(), self.credentials.password.clone()));

        if let Some(site_key) = &form.captcha_site_key {
            let solver =
                self.solver.as_ref().ok_or(ScrapeError::CaptchaRequired(self.ticketera))?;
            info!("{} login is protected by reCAPTCHA, solving", self.ticketera.display_name());
            let token = solver.solve_recaptcha_v2(site_key, &page.url).await?;
            fields.push(("g-recaptcha-response".to_string(), token));
        }

        let action = form
            .action
            .map(|a| absolute_url(&page.url, &a))
            .unwrap_or_else(|| page.url.clone());

        let response = self.request(&action, Some(&RequestBody::Form(encode_form(&fields)))).await?;

        if let Some(reason) = parser.login_error(&response.body) {
            return Err(ScrapeError::LoginFailed { ticketera: self.ticketera, reason });
        }

        Ok(())
    }

    async fn rest_login(&self) -> Result<(), ScrapeError> {
        let body = LoginRequest::for_ticketera(
            self.ticketera,
            &self.credentials.username,
            &self.credentials.password,
        );
        let json = serde_json::to_string(&body)?;
        let url = self.url(self.ticketera.login_path());

        let page = match self.request(&url, Some(&RequestBody::Json(json))).await {
            Err(ScrapeError::HttpStatus { status: 400 | 401 | 403, .. }) => {
                return Err(ScrapeError::LoginFailed {
                    ticketera: self.ticketera,
                    reason: "invalid credentials".to_string(),
                });
            }
            other => other?,
        };

        let token = api::parse_token(&page.body).map_err(|e| ScrapeError::LoginFailed {
            ticketera: self.ticketera,
            reason: e.to_string(),
        })?;
        *self.token.write().await = Some(token);
        Ok(())
    }
}

/// Encodes fields as `application/x-www-form-urlencoded`.
fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl TicketeraPortal for PortalClient {
    fn ticketera(&self) -> Ticketera {
        self.ticketera
    }

    async fn login(&self) -> Result<(), ScrapeError> {
        info!("Logging in to {} as {}", self.ticketera.display_name(), self.credentials.username);
        match self.ticketera.access() {
            Access::Rest => self.rest_login().await?,
            _ => self.form_login().await?,
        }
        info!("Logged in to {}", self.ticketera.display_name());
        Ok(())
    }

    async fn event_list(&self) -> Result<PortalPage, ScrapeError> {
        info!("Fetching event list from {}", self.ticketera.display_name());
        self.request(&self.url(self.ticketera.events_path()), None).await
    }

    async fn event_report(&self, event_id: &str) -> Result<PortalPage, ScrapeError> {
        info!("Fetching sales report for event {}", event_id);
        self.request(&self.url(&self.ticketera.report_path(event_id)), None).await
    }
}
