//! Relational sink: one freshly created TEXT-columned table per run.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::error::ScraperError;
use crate::types::{Report, COLUMNS};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PgSink {
    url: String,
}

impl PgSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Create the per-run table and insert every combined row plus the
    /// summary. The connectivity check runs first; any failure here is
    /// reported to the caller, which logs it and moves on — the save
    /// step is the only casualty.
    pub async fn save(&self, report: &Report, run_stamp: &str) -> Result<(), ScraperError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(&self.url)
            .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        info!("Database connection verified");

        let table = table_name(run_stamp);
        let columns = COLUMNS
            .iter()
            .map(|c| format!("\"{c}\" TEXT"))
            .collect::<Vec<_>>()
            .join(", ");
        sqlx::query(&format!("CREATE TABLE \"{table}\" ({columns})"))
            .execute(&pool)
            .await?;
        info!("Table {table} created");

        let column_list = COLUMNS
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=COLUMNS.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!("INSERT INTO \"{table}\" ({column_list}) VALUES ({placeholders})");

        let records = report
            .rows
            .iter()
            .map(|row| row.to_record())
            .chain(std::iter::once(report.summary.to_record()));
        let mut inserted = 0usize;
        for record in records {
            let mut query = sqlx::query(&insert);
            for field in &record {
                query = query.bind(field.as_str());
            }
            query.execute(&pool).await?;
            inserted += 1;
        }
        pool.close().await;

        info!("Inserted {inserted} rows into {table}");
        Ok(())
    }
}

/// Table name derived from the run timestamp, lowered to a safe
/// identifier alphabet.
pub fn table_name(run_stamp: &str) -> String {
    let sanitized: String = run_stamp
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("scraped_data_{sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_sanitizes_stamp() {
        assert_eq!(
            table_name("2025-08-25_10-30-59"),
            "scraped_data_2025_08_25_10_30_59"
        );
    }

    #[test]
    fn table_name_is_identifier_safe() {
        let name = table_name("x'; DROP TABLE users; --");
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }
}
