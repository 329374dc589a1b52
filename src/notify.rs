//! Notification sink: the run report emailed through an HTTP
//! email-delivery API, CSV attached.

use std::path::Path;

use base64::Engine;
use tracing::info;

use crate::config::EmailConfig;
use crate::error::ScraperError;

pub struct EmailNotifier {
    config: EmailConfig,
    client: reqwest::Client,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Send the report with plain-text and HTML bodies and the output
    /// file attached.
    pub async fn send_report(&self, csv_path: &Path, run_stamp: &str) -> Result<(), ScraperError> {
        let content = std::fs::read(csv_path)?;
        let filename = csv_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "report.csv".to_string());

        let payload = build_payload(&self.config, run_stamp, &filename, &content);
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        response.error_for_status()?;

        info!("Email sent successfully");
        Ok(())
    }
}

fn build_payload(
    config: &EmailConfig,
    run_stamp: &str,
    filename: &str,
    content: &[u8],
) -> serde_json::Value {
    let encoded = base64::engine::general_purpose::STANDARD.encode(content);
    let text = format!(
        "Dear Recipient,\n\nPlease find attached the scraping results generated on {run_stamp}.\n\n\
         Best regards,\nYour Automated Scraper"
    );
    let html = format!(
        "<html><body><p>Dear Recipient,<br><br>\
         Please find attached the scraping results generated on {run_stamp}.<br><br>\
         Best regards,<br>Your Automated Scraper</p></body></html>"
    );

    serde_json::json!({
        "from": config.sender,
        "to": config.recipients,
        "subject": format!("Scraping Results - {run_stamp}"),
        "text": text,
        "html": html,
        "attachments": [{
            "filename": filename,
            "content": encoded,
            "content_type": "text/csv",
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> EmailConfig {
        EmailConfig {
            api_url: "https://mail.example/v1/send".into(),
            api_key: "key".into(),
            sender: "scraper@example.com".into(),
            recipients: vec!["a@example.com".into(), "b@example.com".into()],
        }
    }

    #[test]
    fn payload_carries_bodies_and_recipients() {
        let payload = build_payload(&sample_config(), "2025-08-25_10-00-00", "out.csv", b"a,b\n");

        assert_eq!(payload["from"], "scraper@example.com");
        assert_eq!(payload["to"].as_array().unwrap().len(), 2);
        assert_eq!(payload["subject"], "Scraping Results - 2025-08-25_10-00-00");
        assert!(payload["text"]
            .as_str()
            .unwrap()
            .contains("2025-08-25_10-00-00"));
        assert!(payload["html"].as_str().unwrap().starts_with("<html>"));
    }

    #[test]
    fn attachment_round_trips_through_base64() {
        let payload = build_payload(&sample_config(), "stamp", "out.csv", b"col1,col2\n1,2\n");
        let attachment = &payload["attachments"][0];

        assert_eq!(attachment["filename"], "out.csv");
        assert_eq!(attachment["content_type"], "text/csv");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(attachment["content"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, b"col1,col2\n1,2\n");
    }
}
