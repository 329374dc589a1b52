//! Listing phase: search preparation, filter-code entry and the
//! page-by-page traversal of search results.
//!
//! Per-record extraction failures are isolated: a record that cannot be
//! read becomes a flagged placeholder stub and the page continues.
//! Failures around the page itself (pagination control, result
//! container, initial navigation) propagate to the phase boundary.

use std::collections::VecDeque;
use std::time::Duration;

use chromiumoxide::element::Element;
use tracing::{error, info, warn};

use crate::error::ScraperError;
use crate::session::Session;
use crate::types::ContractStub;

const FILTER_INPUT: &str = "#naics";
const FILTER_ACCORDION: &str = "#usa-accordion-item-7";
const POPUP_CLOSE: &str = ".close";
const PAGINATION_CURRENT: &str = "#bottomPagination-currentPage";
const PAGINATION_NEXT: &str = "#bottomPagination-nextPage";

const RESULT_LIST: &str = "#main-container > app-frontend-search-home > div > \
    div > div > div.desktop\\:grid-col-8.tablet-lg\\:grid-col-12.mobile-lg\\:grid-col-12 \
    > search-list-layout > div:nth-child(2) > div > div > sds-search-result-list > div";
const RESULT_TITLE: &str =
    "app-opportunity-result > div > div.grid-col-12.tablet\\:grid-col-9 > div:nth-child(1)";
const RESULT_NOTICE: &str =
    "app-opportunity-result > div > div.grid-col-12.tablet\\:grid-col-9 > div:nth-child(2)";
const RESULT_DEPARTMENT: &str = "div.grid-row.grid-gap.ng-star-inserted > div:nth-child(1) > div";
const RESULT_LINK: &str = "a[href]";

const NOTICE_LABEL: &str = "Notice ID:";
const DEPARTMENT_LABEL: &str = "Department/Ind.Agency";

const FILTER_WAIT: Duration = Duration::from_secs(30);
const PAGINATION_WAIT: Duration = Duration::from_secs(30);
const POPUP_WAIT: Duration = Duration::from_secs(5);
const ACCORDION_WAIT: Duration = Duration::from_secs(10);
const PAGE_SETTLE: Duration = Duration::from_secs(5);

/// Navigate to the portal and enter the filter codes. Everything up to
/// and including filter entry is part of the listing phase boundary.
pub async fn open_search_page(
    session: &Session,
    portal_url: &str,
    filter_codes: &[String],
) -> Result<(), ScraperError> {
    info!("Navigating to the search portal");
    session.navigate(portal_url).await?;

    dismiss_popup(session).await;
    expand_filter_accordion(session).await;

    apply_filters(session, filter_codes).await?;
    info!("Filter codes entered");
    Ok(())
}

/// Best-effort: close any popup overlaying the search page.
async fn dismiss_popup(session: &Session) {
    if session.wait_for(POPUP_CLOSE, POPUP_WAIT).await.is_ok() {
        let _ = session
            .run("(function() { var el = document.querySelector('.close'); if (el) el.click(); })()")
            .await;
        info!("Search page popup closed");
    }
}

/// Best-effort: expand the accordion section holding the filter input.
async fn expand_filter_accordion(session: &Session) {
    match session.wait_for(FILTER_ACCORDION, ACCORDION_WAIT).await {
        Ok(_) => {
            let _ = session
                .run(&format!(
                    "(function() {{ var el = document.querySelector('{FILTER_ACCORDION}'); if (el) el.click(); }})()"
                ))
                .await;
            session.settle(Duration::from_secs(3)).await;
        }
        Err(e) => warn!("Could not expand filter accordion: {e}"),
    }
}

/// Enter each filter code as its own interaction: clear, type, submit.
/// Falls back to script-based value injection with synthesized
/// input/change events when direct entry fails.
pub async fn apply_filters(session: &Session, codes: &[String]) -> Result<(), ScraperError> {
    let field = session
        .wait_for(FILTER_INPUT, FILTER_WAIT)
        .await
        .map_err(|e| ScraperError::Input(format!("filter field not visible: {e}")))?;

    session
        .run(&format!(
            "document.querySelector('{FILTER_INPUT}').scrollIntoView({{block: 'center', inline: 'nearest'}});"
        ))
        .await?;
    session.settle(Duration::from_secs(1)).await;

    // Dismiss whatever overlay might swallow the first keystroke
    let _ = session.press_escape().await;
    session.settle(Duration::from_secs(1)).await;

    for code in codes {
        let code = code.trim();
        if let Err(e) = submit_code(session, &field, code).await {
            warn!("Direct entry failed for filter code {code}, using script fallback: {e}");
            inject_code(session, &field, code).await?;
        }
        session.settle(Duration::from_secs(2)).await;
    }
    Ok(())
}

async fn submit_code(session: &Session, field: &Element, code: &str) -> Result<(), ScraperError> {
    session
        .run(&format!(
            "document.querySelector('{FILTER_INPUT}').value = '';"
        ))
        .await?;
    session.settle(Duration::from_millis(500)).await;

    field
        .click()
        .await
        .map_err(|e| ScraperError::Input(format!("filter field click: {e}")))?;
    field
        .type_str(code)
        .await
        .map_err(|e| ScraperError::Input(format!("filter code entry: {e}")))?;
    session.settle(Duration::from_secs(1)).await;

    field
        .press_key("Enter")
        .await
        .map_err(|e| ScraperError::Input(format!("filter code submit: {e}")))?;
    Ok(())
}

/// Script fallback. Note this submits the code again even when the
/// direct attempt got partway through; see DESIGN.md.
async fn inject_code(session: &Session, field: &Element, code: &str) -> Result<(), ScraperError> {
    session
        .run(&format!(
            r#"(function() {{
                var field = document.querySelector('{FILTER_INPUT}');
                field.value = '';
                field.value = '{code}';
                field.dispatchEvent(new Event('input'));
                field.dispatchEvent(new Event('change'));
            }})()"#
        ))
        .await?;

    field
        .press_key("Enter")
        .await
        .map_err(|e| ScraperError::Input(format!("filter code submit (fallback): {e}")))?;
    Ok(())
}

/// Lazy, finite, non-restartable traversal of the result pages.
/// Consumes live session state; contract numbers are assigned later by
/// the aggregator, never here.
pub struct ListingPager<'a> {
    session: &'a Session,
    total_pages: u32,
    current_page: u32,
    queue: VecDeque<ContractStub>,
    exhausted: bool,
}

impl<'a> ListingPager<'a> {
    /// Read the page count from the pagination control before iterating.
    pub async fn start(session: &'a Session) -> Result<ListingPager<'a>, ScraperError> {
        let control = session.wait_for(PAGINATION_CURRENT, PAGINATION_WAIT).await?;
        let max = control
            .attribute("max")
            .await
            .map_err(|e| ScraperError::Extraction(format!("pagination control: {e}")))?
            .ok_or_else(|| {
                ScraperError::Extraction("pagination control has no max attribute".into())
            })?;
        let total_pages = max
            .trim()
            .parse::<u32>()
            .map_err(|_| ScraperError::Extraction(format!("invalid page count: {max:?}")))?;

        info!("Total pages to process: {total_pages}");
        Ok(Self {
            session,
            total_pages,
            current_page: 0,
            queue: VecDeque::new(),
            exhausted: false,
        })
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Next stub in DOM order within page order, or `None` after the
    /// last record of the last page. The "next" control is never
    /// clicked once the final page has been read.
    pub async fn next_stub(&mut self) -> Result<Option<ContractStub>, ScraperError> {
        loop {
            if let Some(stub) = self.queue.pop_front() {
                return Ok(Some(stub));
            }
            if self.exhausted {
                return Ok(None);
            }
            if self.current_page >= self.total_pages {
                self.exhausted = true;
                continue;
            }
            if self.current_page > 0 {
                self.advance().await?;
            }
            self.current_page += 1;
            self.load_page().await?;
        }
    }

    async fn advance(&mut self) -> Result<(), ScraperError> {
        self.session
            .wait_for(PAGINATION_NEXT, PAGINATION_WAIT)
            .await?;
        self.session
            .run(&format!(
                "document.querySelector('{PAGINATION_NEXT}').click();"
            ))
            .await?;
        self.session.settle(PAGE_SETTLE).await;
        Ok(())
    }

    async fn load_page(&mut self) -> Result<(), ScraperError> {
        info!(
            "Processing page {} of {}",
            self.current_page, self.total_pages
        );
        self.session.settle(PAGE_SETTLE).await;

        let results = self.session.find_all(RESULT_LIST).await?;
        let mut extracted = 0usize;
        for (idx, result) in results.iter().enumerate() {
            match extract_stub(result).await {
                Ok(stub) => {
                    extracted += 1;
                    self.queue.push_back(stub);
                }
                Err(e) => {
                    error!(
                        "Error extracting result {} on page {}: {}",
                        idx + 1,
                        self.current_page,
                        e
                    );
                    self.queue.push_back(ContractStub::failed());
                }
            }
        }
        info!(
            "Scraped {extracted} of {} records from page {}",
            results.len(),
            self.current_page
        );
        Ok(())
    }
}

async fn extract_stub(result: &Element) -> Result<ContractStub, ScraperError> {
    let name = child_text(result, RESULT_TITLE).await?;
    let notice_id = strip_label(&child_text(result, RESULT_NOTICE).await?, NOTICE_LABEL);
    let department = strip_label(
        &child_text(result, RESULT_DEPARTMENT).await?,
        DEPARTMENT_LABEL,
    );
    let link = result
        .find_element(RESULT_LINK)
        .await
        .map_err(|e| ScraperError::Extraction(format!("listing link: {e}")))?
        .attribute("href")
        .await
        .map_err(|e| ScraperError::Extraction(format!("listing link: {e}")))?
        .ok_or_else(|| ScraperError::Extraction("listing link has no href".into()))?;

    Ok(ContractStub::new(name, notice_id, department, link))
}

async fn child_text(parent: &Element, selector: &str) -> Result<String, ScraperError> {
    let text = parent
        .find_element(selector)
        .await
        .map_err(|e| ScraperError::Extraction(format!("{selector}: {e}")))?
        .inner_text()
        .await
        .map_err(|e| ScraperError::Extraction(format!("{selector}: {e}")))?
        .unwrap_or_default();
    Ok(text.trim().to_string())
}

/// Remove a label prefix from extracted text, returning the trimmed
/// remainder. Text without the label passes through trimmed.
pub fn strip_label(text: &str, label: &str) -> String {
    if text.contains(label) {
        text.replace(label, "").trim().to_string()
    } else {
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_label_removes_prefix() {
        assert_eq!(
            strip_label("Notice ID: W912DY25R0012", "Notice ID:"),
            "W912DY25R0012"
        );
        assert_eq!(
            strip_label("Department/Ind.Agency\nDEPT OF DEFENSE", "Department/Ind.Agency"),
            "DEPT OF DEFENSE"
        );
    }

    #[test]
    fn strip_label_passes_unlabelled_text_through() {
        assert_eq!(strip_label("  W912DY25R0012  ", "Notice ID:"), "W912DY25R0012");
        assert_eq!(strip_label("", "Notice ID:"), "");
    }
}
