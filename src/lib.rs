//! Procurement contract portal scraper.
//!
//! Traverses a paginated contract search portal, extracts per-contract
//! detail pages and attachments in isolated browser sessions, and fans
//! the result out into a flat combined table with a terminal summary
//! row. The table is written as CSV, persisted to Postgres and emailed
//! as a report.
//!
//! # Pipeline usage
//!
//! ```rust,ignore
//! use contract_scraper::{Pipeline, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new(
//!         "https://portal.example/search",
//!         vec!["541511".to_string()],
//!     )
//!     .with_output_dir("./output");
//!
//!     let outcome = Pipeline::new(config).run().await.unwrap();
//!     println!("Rows: {}", outcome.report.rows.len());
//! }
//! ```
//!
//! # Service usage
//!
//! ```rust,ignore
//! use contract_scraper::{ScrapeRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!     let request = ScrapeRequest::new(
//!         "https://portal.example/search",
//!         vec!["541511".to_string()],
//!     );
//!     let result = service.call(request).await.unwrap();
//!     println!("CSV written: {:?}", result.csv_path);
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod db;
pub mod detail;
pub mod error;
pub mod listing;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod traits;
pub mod types;

pub use config::{EmailConfig, ScraperConfig};
pub use detail::DetailScraper;
pub use error::ScraperError;
pub use pipeline::{Pipeline, RunOutcome};
pub use service::{ScrapeRequest, ScrapeResult, ScraperService};
pub use session::Session;
pub use traits::DetailSource;
pub use types::{
    AttachmentRecord, CombinedRow, ContractDetail, ContractStub, Report, RunCounts, SummaryRow,
};
