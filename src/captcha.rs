//! reCAPTCHA v2 solving through the 2Captcha HTTP API.

use crate::config::CaptchaConfig;
use crate::error::ScrapeError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use wreq::Client;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: u8,
    request: String,
}

/// Client for the 2Captcha `in.php` / `res.php` API.
pub struct TwoCaptchaClient {
    client: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl TwoCaptchaClient {
    /// Creates a solver from config; `None` when no API key is configured.
    ///
    /// `proxy` is the portal proxy; solver traffic goes out the same way.
    pub fn from_config(
        config: &CaptchaConfig,
        proxy: Option<&str>,
    ) -> Result<Option<Self>, ScrapeError> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };

        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if let Some(proxy_url) = proxy {
            debug!("Routing captcha solver through proxy: {}", proxy_url);
            builder = builder.proxy(wreq::Proxy::all(proxy_url)?);
        }
        let client = builder.build()?;

        Ok(Some(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }))
    }

    /// Submits a reCAPTCHA v2 task and waits for the response token.
    pub async fn solve_recaptcha_v2(
        &self,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, ScrapeError> {
        let submit_url = format!(
            "{}/in.php?key={}&method=userrecaptcha&googlekey={}&pageurl={}&json=1",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(site_key),
            urlencoding::encode(page_url)
        );

        let submitted = self.call(&submit_url).await?;
        if submitted.status != 1 {
            return Err(ScrapeError::Captcha(format!("submit rejected: {}", submitted.request)));
        }
        let task_id = submitted.request;
        info!("Submitted reCAPTCHA task {} for {}", task_id, page_url);

        let poll_url = format!(
            "{}/res.php?key={}&action=get&id={}&json=1",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&task_id)
        );

        let started = Instant::now();
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let polled = self.call(&poll_url).await?;
            match (polled.status, polled.request.as_str()) {
                (1, _) => {
                    info!("reCAPTCHA task {} solved in {:?}", task_id, started.elapsed());
                    return Ok(polled.request);
                }
                (_, "CAPCHA_NOT_READY") => {
                    debug!("reCAPTCHA task {} not ready", task_id);
                }
                (_, other) => {
                    return Err(ScrapeError::Captcha(format!("task {} failed: {}", task_id, other)));
                }
            }

            if started.elapsed() >= self.timeout {
                return Err(ScrapeError::Captcha(format!(
                    "task {} not solved within {}s",
                    task_id,
                    self.timeout.as_secs()
                )));
            }
        }
    }

    async fn call(&self, url: &str) -> Result<ApiResponse, ScrapeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                status: status.as_u16(),
                url: url.split('?').next().unwrap_or(url).to_string(),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
