//! Browser session lifecycle and the control surface the extraction
//! phases run against: navigate, locate, read, click, type, scroll,
//! run-script, all with bounded waits.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::error::ScraperError;

/// Poll interval for bounded element waits.
const WAIT_POLL_MS: u64 = 250;

pub struct Session {
    browser: Browser,
    page: Page,
}

impl Session {
    /// Launch a headless browser and open a blank page.
    pub async fn launch(config: &ScraperConfig) -> Result<Self, ScraperError> {
        info!("Launching browser...");

        // Unique profile directory so concurrent runs never share state
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("contract-scraper-{unique_id}"));

        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .user_data_dir(&user_data_dir)
            .no_sandbox()
            .request_timeout(config.timeout)
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");

        if let Some(chrome_path) = &config.chrome_path {
            builder = builder.chrome_executable(chrome_path);
        }
        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        info!("Browser launched");
        Ok(Self { browser, page })
    }

    pub async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        debug!("Navigated to {url}");
        Ok(())
    }

    pub async fn find(&self, selector: &str) -> Result<Element, ScraperError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{selector}: {e}")))
    }

    pub async fn try_find(&self, selector: &str) -> Option<Element> {
        self.page.find_element(selector).await.ok()
    }

    pub async fn find_all(&self, selector: &str) -> Result<Vec<Element>, ScraperError> {
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{selector}: {e}")))
    }

    /// Poll for an element until it appears or the bounded wait elapses.
    pub async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Element, ScraperError> {
        let start = std::time::Instant::now();
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            if start.elapsed() > timeout {
                return Err(ScraperError::Timeout(format!(
                    "{selector} not present after {:?}",
                    timeout
                )));
            }
            sleep(Duration::from_millis(WAIT_POLL_MS)).await;
        }
    }

    /// Evaluate JavaScript and deserialize the result.
    pub async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T, ScraperError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    /// Run JavaScript for its side effect only.
    pub async fn run(&self, script: &str) -> Result<(), ScraperError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        Ok(())
    }

    pub async fn scroll_to(&self, y: i64) -> Result<(), ScraperError> {
        self.run(&format!("window.scrollTo(0, {y});")).await
    }

    pub async fn page_height(&self) -> Result<i64, ScraperError> {
        self.eval("document.body.scrollHeight").await
    }

    /// Send an Escape keystroke to the document body, dismissing any
    /// focused overlay.
    pub async fn press_escape(&self) -> Result<(), ScraperError> {
        let body = self.find("body").await?;
        body.press_key("Escape")
            .await
            .map_err(|e| ScraperError::Input(e.to_string()))?;
        Ok(())
    }

    /// Fixed pacing delay for asynchronous rendering to settle.
    pub async fn settle(&self, duration: Duration) {
        sleep(duration).await;
    }

    /// Close the page and release the browser. Errors during teardown
    /// are logged, never propagated.
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!("Failed to close page: {}", e);
        }
        drop(self.browser);
        debug!("Browser session closed");
    }
}
