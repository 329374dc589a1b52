//! Detail phase: per-contract extraction of date fields and the
//! attachment list, each contract in its own short-lived browser
//! session.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::listing::strip_label;
use crate::session::Session;
use crate::traits::DetailSource;
use crate::types::{AttachmentRecord, ContractDetail};

const DETAIL_POPUP: &str =
    "usa-icon.ng-tns-c1762404166-1 > i-bs:nth-child(1) > svg:nth-child(1) > path:nth-child(1)";

const GENERAL_PUBLISHED: &str = "#general-published-date";
const ORIGINAL_PUBLISHED: &str = "#general-original-published-date";
const UPDATED_OFFERS_DUE: &str = "#general-response-date";
const ORIGINAL_OFFERS_DUE: &str = "#general-original-response-date";
const ATTACHMENTS_SECTION: &str = "#button-opp-view-attachments-accordion-section";

const POPUP_WAIT: Duration = Duration::from_secs(10);
const FIRST_FIELD_WAIT: Duration = Duration::from_secs(5);
const FIELD_WAIT: Duration = Duration::from_secs(3);
const ATTACHMENT_WAIT: Duration = Duration::from_secs(3);
const SCROLL_PAUSE: Duration = Duration::from_secs(1);
const SCROLL_STEP: i64 = 300;

/// Extracts [`ContractDetail`] by driving an isolated browser session
/// per contract link. The session never outlives the call and is never
/// shared with the listing session.
pub struct DetailScraper {
    config: ScraperConfig,
}

impl DetailScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DetailSource for DetailScraper {
    async fn fetch(&self, link: &str) -> ContractDetail {
        let mut detail = ContractDetail::default();

        let session = match Session::launch(&self.config).await {
            Ok(session) => session,
            Err(e) => {
                error!("Could not open detail session for {link}: {e}");
                return detail;
            }
        };

        if let Err(e) = scrape_into(&session, link, &mut detail).await {
            error!("Error processing {link}: {e}");
        }

        // Released on every exit path, before the next contract starts
        session.close().await;
        detail
    }
}

async fn scrape_into(
    session: &Session,
    link: &str,
    detail: &mut ContractDetail,
) -> Result<(), ScraperError> {
    session.navigate(link).await?;
    info!("Processing contract link: {link}");

    dismiss_detail_popup(session).await;

    detail.general_published_date = date_field(
        session,
        GENERAL_PUBLISHED,
        "Updated Published Date:",
        FIRST_FIELD_WAIT,
    )
    .await;
    detail.original_published_date = date_field(
        session,
        ORIGINAL_PUBLISHED,
        "Original Published Date:",
        FIELD_WAIT,
    )
    .await;
    detail.updated_offers_due_date = date_field(
        session,
        UPDATED_OFFERS_DUE,
        "Updated Date Offers Due:",
        FIELD_WAIT,
    )
    .await;
    detail.original_offers_due_date = date_field(
        session,
        ORIGINAL_OFFERS_DUE,
        "Original Date Offers Due:",
        FIELD_WAIT,
    )
    .await;

    if find_attachments_section(session).await {
        let mut index = 0u32;
        while let Some(attachment) = try_attachment(session, index).await {
            detail.attachments.push(attachment);
            index += 1;
        }
        info!("Found {} attachments for the contract", detail.attachments.len());
    }

    Ok(())
}

/// Best-effort: close the detail-page popup if one appears. Any failure
/// is discarded and extraction proceeds regardless.
async fn dismiss_detail_popup(session: &Session) {
    if let Ok(close_button) = session.wait_for(DETAIL_POPUP, POPUP_WAIT).await {
        let _ = close_button.click().await;
    }
}

/// One date field with its own locator and bounded wait. Absence leaves
/// the field empty without affecting the others.
async fn date_field(session: &Session, selector: &str, label: &str, wait: Duration) -> String {
    match session.wait_for(selector, wait).await {
        Ok(element) => match element.inner_text().await {
            Ok(text) => strip_label(&text.unwrap_or_default(), label),
            Err(e) => {
                warn!("Could not read {selector}: {e}");
                String::new()
            }
        },
        Err(e) => {
            warn!("Could not find {selector}: {e}");
            String::new()
        }
    }
}

/// Scroll down in fixed increments probing for the attachments section.
/// Terminates NOT_FOUND once the offset passes the page height.
async fn find_attachments_section(session: &Session) -> bool {
    let mut offset: i64 = 0;
    loop {
        if let Err(e) = session.scroll_to(offset).await {
            warn!("Scroll failed while probing for attachments: {e}");
            return false;
        }
        session.settle(SCROLL_PAUSE).await;
        offset += SCROLL_STEP;

        if session.try_find(ATTACHMENTS_SECTION).await.is_some() {
            return true;
        }

        let height = session.page_height().await.unwrap_or(0);
        if offset > height {
            warn!("Attachments section not found");
            return false;
        }
    }
}

/// Probe one integer-indexed attachment slot. The first missing index
/// halts enumeration; indices are assumed contiguous.
async fn try_attachment(session: &Session, index: u32) -> Option<AttachmentRecord> {
    let name_selector = format!("#opp-view-attachments-fileLinkId{index}");
    let date_selector = format!("#opp-view-attachments-date{index}");

    let name_element = session.wait_for(&name_selector, ATTACHMENT_WAIT).await.ok()?;
    let date_element = session.wait_for(&date_selector, ATTACHMENT_WAIT).await.ok()?;

    let file_name = name_element
        .inner_text()
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
        .trim()
        .to_string();
    let file_link = name_element
        .attribute("href")
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    let updated_date = date_element
        .inner_text()
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
        .trim()
        .to_string();

    Some(AttachmentRecord {
        file_name,
        file_link,
        updated_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_scraper_new() {
        let config = ScraperConfig::new("https://portal.example/search", vec!["541511".into()]);
        let scraper = DetailScraper::new(config);
        assert_eq!(scraper.config.portal_url, "https://portal.example/search");
    }
}
