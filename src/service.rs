use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::pipeline::Pipeline;

/// One scraping run as a request.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub portal_url: String,
    pub filter_codes: Vec<String>,
    pub output_dir: PathBuf,
    pub headless: bool,
}

impl ScrapeRequest {
    pub fn new(portal_url: impl Into<String>, filter_codes: Vec<String>) -> Self {
        Self {
            portal_url: portal_url.into(),
            filter_codes,
            output_dir: PathBuf::from("./output"),
            headless: true,
        }
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

impl From<ScrapeRequest> for ScraperConfig {
    fn from(req: ScrapeRequest) -> Self {
        ScraperConfig::new(req.portal_url, req.filter_codes)
            .with_output_dir(req.output_dir)
            .with_headless(req.headless)
    }
}

/// Result of a scraping run.
#[derive(Debug)]
pub struct ScrapeResult {
    pub csv_path: PathBuf,
    pub csv_content: Vec<u8>,
}

impl ScrapeResult {
    pub fn new(csv_path: PathBuf) -> std::io::Result<Self> {
        let csv_content = std::fs::read(&csv_path)?;
        Ok(Self {
            csv_path,
            csv_content,
        })
    }
}

/// tower::Service front for the scraping pipeline.
#[derive(Debug, Clone, Default)]
pub struct ScraperService {
    // Reserved for future state (rate limiting, caching)
}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = ScrapeResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!(
            "Scrape request received: portal={}, {} filter codes",
            req.portal_url,
            req.filter_codes.len()
        );

        Box::pin(async move {
            let config: ScraperConfig = req.into();
            let outcome = Pipeline::new(config).run().await?;

            let csv_path = outcome.csv_path.ok_or_else(|| {
                ScraperError::FileIO(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "run produced no output file",
                ))
            })?;
            let result = ScrapeResult::new(csv_path)?;

            info!(
                "Scrape completed: path={:?}, size={}bytes, {} rows",
                result.csv_path,
                result.csv_content.len(),
                outcome.report.rows.len()
            );

            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_request_builder() {
        let req = ScrapeRequest::new("https://portal.example/search", vec!["541511".into()])
            .with_output_dir("/tmp/out")
            .with_headless(false);

        assert_eq!(req.portal_url, "https://portal.example/search");
        assert_eq!(req.filter_codes, vec!["541511".to_string()]);
        assert_eq!(req.output_dir, PathBuf::from("/tmp/out"));
        assert!(!req.headless);
    }

    #[test]
    fn test_scrape_request_to_config() {
        let req = ScrapeRequest::new("https://portal.example/search", vec!["541511".into()]);
        let config: ScraperConfig = req.into();

        assert_eq!(config.portal_url, "https://portal.example/search");
        assert_eq!(config.filter_codes, vec!["541511".to_string()]);
        assert!(config.headless);
    }
}
