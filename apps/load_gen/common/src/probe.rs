use crate::config::Settings;
use crate::error::LoadGenError;
use crate::logger::{Fields, Log};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends one GET to the target every interval, forever.
pub struct LoadGenerator {
    client: Client,
    url: String,
    interval: Duration,
    log: Arc<Log>,
}

impl LoadGenerator {
    pub fn new(settings: Settings, log: Arc<Log>) -> Result<Self, LoadGenError> {
        // Targets are test servers, certificates are not checked
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(LoadGenError::Client)?;

        Ok(Self {
            client,
            url: settings.url,
            interval: settings.interval,
            log,
        })
    }

    /// Makes a single attempt. The response body is never read.
    pub async fn fire(&self) -> Result<StatusCode, LoadGenError> {
        let request = self
            .client
            .get(&self.url)
            .build()
            .map_err(LoadGenError::InvalidRequest)?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(LoadGenError::Request)?;

        Ok(response.status())
    }

    pub async fn tick(&self) {
        self.log.info(format_args!("Sending request to {}", self.url));

        match self.fire().await {
            Ok(status) => self.log.debug(format_args!(
                "Request to {} completed with status {}",
                self.url, status
            )),
            Err(e @ LoadGenError::Request(_)) => self
                .log
                .error_with_values(&e, &Fields::new().with("url", self.url.as_str())),
            Err(e) => self.log.error(&e),
        }
    }

    pub async fn run(&self) {
        loop {
            self.tick().await;
            sleep(self.interval).await;
        }
    }
}
