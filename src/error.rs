use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("browser init error: {0}")]
    BrowserInit(String),

    #[error("navigation error: {0}")]
    Navigation(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("javascript error: {0}")]
    JavaScript(String),

    #[error("search input error: {0}")]
    Input(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file io error: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("email delivery error: {0}")]
    Email(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
