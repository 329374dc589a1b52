use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScraperError;

/// Email delivery settings for the notification sink.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

/// Immutable run configuration passed to the pipeline entry point.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub portal_url: String,
    pub filter_codes: Vec<String>,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub headless: bool,
    pub timeout: Duration,
    /// Explicit Chrome/Chromium binary; resolved from PATH when unset.
    pub chrome_path: Option<String>,
    pub database_url: Option<String>,
    pub email: Option<EmailConfig>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            portal_url: String::new(),
            filter_codes: Vec::new(),
            output_dir: PathBuf::from("./output"),
            logs_dir: PathBuf::from("./logs"),
            headless: true,
            timeout: Duration::from_secs(60),
            chrome_path: None,
            database_url: None,
            email: None,
        }
    }
}

impl ScraperConfig {
    pub fn new(portal_url: impl Into<String>, filter_codes: Vec<String>) -> Self {
        Self {
            portal_url: portal_url.into(),
            filter_codes,
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_logs_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.logs_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_chrome_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_email(mut self, email: EmailConfig) -> Self {
        self.email = Some(email);
        self
    }

    /// Load configuration from the environment (and `.env` if present).
    /// Required inputs are validated for presence before the run starts;
    /// the database and email blocks are optional and the corresponding
    /// sinks are skipped when they are absent.
    pub fn from_env() -> Result<Self, ScraperError> {
        dotenv::dotenv().ok();

        let portal_url = required("PORTAL_URL")?;
        let filter_codes = split_csv(&required("FILTER_CODES")?);
        if filter_codes.is_empty() {
            return Err(ScraperError::Config("FILTER_CODES is empty".into()));
        }
        let output_dir = PathBuf::from(required("OUTPUT_DIR")?);
        let logs_dir = PathBuf::from(required("LOGS_DIR")?);

        let chrome_path = env::var("CHROME_PATH")
            .or_else(|_| env::var("CHROMIUM_PATH"))
            .ok();

        let database_url = env::var("DATABASE_URL").ok();

        let email = match env::var("EMAIL_API_URL") {
            Ok(api_url) => {
                let recipients = split_csv(&required("EMAIL_RECIPIENTS")?);
                if recipients.is_empty() {
                    return Err(ScraperError::Config("EMAIL_RECIPIENTS is empty".into()));
                }
                Some(EmailConfig {
                    api_url,
                    api_key: required("EMAIL_API_KEY")?,
                    sender: required("EMAIL_SENDER")?,
                    recipients,
                })
            }
            Err(_) => None,
        };

        Ok(Self {
            portal_url,
            filter_codes,
            output_dir,
            logs_dir,
            headless: env::var("HEADLESS").map(|v| v != "0").unwrap_or(true),
            timeout: Duration::from_secs(60),
            chrome_path,
            database_url,
            email,
        })
    }
}

fn required(key: &str) -> Result<String, ScraperError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ScraperError::Config(format!(
            "missing environment variable {key}"
        ))),
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScraperConfig::new("https://portal.example/search", vec!["541511".into()])
            .with_headless(false)
            .with_output_dir("/tmp/out")
            .with_logs_dir("/tmp/logs")
            .with_timeout(Duration::from_secs(120));

        assert_eq!(config.portal_url, "https://portal.example/search");
        assert_eq!(config.filter_codes, vec!["541511".to_string()]);
        assert!(!config.headless);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.logs_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.database_url.is_none());
        assert!(config.email.is_none());
    }

    #[test]
    fn test_split_csv_trims_and_drops_empties() {
        assert_eq!(
            split_csv(" 541511, 541512 ,,236220"),
            vec!["541511", "541512", "236220"]
        );
        assert!(split_csv("").is_empty());
    }
}
