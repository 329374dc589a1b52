//! Record types flowing through the extraction pipeline.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Column order shared by the CSV file and the per-run database table.
pub const COLUMNS: [&str; 16] = [
    "Contract Number",
    "Contract Name",
    "Notice ID",
    "Department",
    "Contract Link",
    "Failed Row",
    "Incomplete Data",
    "Total Attachments",
    "Date Scraped",
    "General Published Date",
    "Original Published Date",
    "Updated Date Offers Due",
    "Original Date Offers Due",
    "File Name",
    "File Link",
    "Updated Date",
];

/// Timestamp attached to every scraped row.
pub fn scrape_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Timestamp used in output filenames, log filenames and table names.
pub fn run_stamp() -> String {
    Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Minimally populated contract record from the listing phase,
/// before detail enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractStub {
    pub name: String,
    pub notice_id: String,
    pub department: String,
    pub link: String,
    pub failed_row: bool,
    pub incomplete_data: bool,
    pub total_attachments: u32,
    pub date_scraped: String,
}

impl ContractStub {
    pub fn new(name: String, notice_id: String, department: String, link: String) -> Self {
        Self {
            name,
            notice_id,
            department,
            link,
            failed_row: false,
            incomplete_data: false,
            total_attachments: 0,
            date_scraped: scrape_stamp(),
        }
    }

    /// Placeholder emitted when a listing record could not be extracted.
    /// All text fields stay empty; detail extraction is skipped for it.
    pub fn failed() -> Self {
        Self {
            name: String::new(),
            notice_id: String::new(),
            department: String::new(),
            link: String::new(),
            failed_row: true,
            incomplete_data: true,
            total_attachments: 0,
            date_scraped: scrape_stamp(),
        }
    }
}

/// One attachment listed on a contract detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub file_name: String,
    pub file_link: String,
    pub updated_date: String,
}

/// Detail-page fields for one contract. Fields a probe could not find
/// stay empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractDetail {
    pub general_published_date: String,
    pub original_published_date: String,
    pub updated_offers_due_date: String,
    pub original_offers_due_date: String,
    pub attachments: Vec<AttachmentRecord>,
}

/// Flattened output unit: one per attachment, or exactly one for a
/// contract without attachments. Only the first row of a contract
/// carries the full identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedRow {
    pub contract_number: u32,
    pub name: String,
    pub notice_id: String,
    pub department: String,
    pub link: String,
    pub failed_row: bool,
    pub incomplete_data: bool,
    pub total_attachments: u32,
    pub date_scraped: String,
    pub general_published_date: String,
    pub original_published_date: String,
    pub updated_offers_due_date: String,
    pub original_offers_due_date: String,
    pub file_name: String,
    pub file_link: String,
    pub updated_date: String,
}

impl CombinedRow {
    /// First (or only) row of a contract: full stub identity plus the
    /// shared detail dates.
    pub fn full(number: u32, stub: &ContractStub, detail: &ContractDetail) -> Self {
        Self {
            contract_number: number,
            name: stub.name.clone(),
            notice_id: stub.notice_id.clone(),
            department: stub.department.clone(),
            link: stub.link.clone(),
            failed_row: stub.failed_row,
            incomplete_data: stub.incomplete_data,
            total_attachments: stub.total_attachments,
            date_scraped: stub.date_scraped.clone(),
            general_published_date: detail.general_published_date.clone(),
            original_published_date: detail.original_published_date.clone(),
            updated_offers_due_date: detail.updated_offers_due_date.clone(),
            original_offers_due_date: detail.original_offers_due_date.clone(),
            file_name: String::new(),
            file_link: String::new(),
            updated_date: String::new(),
        }
    }

    /// Fan-out row for attachments after the first: contract identity
    /// blank, shared dates and attachment count replicated.
    pub fn continuation(number: u32, total_attachments: u32, detail: &ContractDetail) -> Self {
        Self {
            contract_number: number,
            name: String::new(),
            notice_id: String::new(),
            department: String::new(),
            link: String::new(),
            failed_row: false,
            incomplete_data: false,
            total_attachments,
            date_scraped: scrape_stamp(),
            general_published_date: detail.general_published_date.clone(),
            original_published_date: detail.original_published_date.clone(),
            updated_offers_due_date: detail.updated_offers_due_date.clone(),
            original_offers_due_date: detail.original_offers_due_date.clone(),
            file_name: String::new(),
            file_link: String::new(),
            updated_date: String::new(),
        }
    }

    pub fn set_attachment(&mut self, attachment: &AttachmentRecord) {
        self.file_name = attachment.file_name.clone();
        self.file_link = attachment.file_link.clone();
        self.updated_date = attachment.updated_date.clone();
    }

    /// Field values in [`COLUMNS`] order.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.contract_number.to_string(),
            self.name.clone(),
            self.notice_id.clone(),
            self.department.clone(),
            self.link.clone(),
            self.failed_row.to_string(),
            self.incomplete_data.to_string(),
            self.total_attachments.to_string(),
            self.date_scraped.clone(),
            self.general_published_date.clone(),
            self.original_published_date.clone(),
            self.updated_offers_due_date.clone(),
            self.original_offers_due_date.clone(),
            self.file_name.clone(),
            self.file_link.clone(),
            self.updated_date.clone(),
        ]
    }
}

/// Counters accumulated by the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunCounts {
    pub total_contracts: usize,
    pub failed_contracts: usize,
    pub missing_data_contracts: usize,
    pub total_attachments: usize,
}

/// Terminal aggregate row with human-readable counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub counts: RunCounts,
    pub date_scraped: String,
}

impl SummaryRow {
    pub fn new(counts: RunCounts) -> Self {
        Self {
            counts,
            date_scraped: scrape_stamp(),
        }
    }

    /// Field values in [`COLUMNS`] order. The descriptive counts occupy
    /// the identity columns of an ordinary row.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            "Summary".to_string(),
            format!("Total Contracts: {}", self.counts.total_contracts),
            format!("Failed Contracts: {}", self.counts.failed_contracts),
            format!(
                "Contracts with Missing Data: {}",
                self.counts.missing_data_contracts
            ),
            String::new(),
            String::new(),
            String::new(),
            format!("Total Attachments: {}", self.counts.total_attachments),
            self.date_scraped.clone(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]
    }
}

/// Final output of the aggregation phase, handed to the sinks.
#[derive(Debug, Clone)]
pub struct Report {
    pub rows: Vec<CombinedRow>,
    pub summary: SummaryRow,
    pub counts: RunCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_stub_has_empty_text_fields() {
        let stub = ContractStub::failed();
        assert!(stub.failed_row);
        assert!(stub.incomplete_data);
        assert!(stub.name.is_empty());
        assert!(stub.notice_id.is_empty());
        assert!(stub.department.is_empty());
        assert!(stub.link.is_empty());
        assert!(!stub.date_scraped.is_empty());
    }

    #[test]
    fn records_match_column_count() {
        let stub = ContractStub::new(
            "Road works".into(),
            "N-001".into(),
            "Transport".into(),
            "https://portal.example/opp/1".into(),
        );
        let row = CombinedRow::full(1, &stub, &ContractDetail::default());
        assert_eq!(row.to_record().len(), COLUMNS.len());

        let summary = SummaryRow::new(RunCounts::default());
        assert_eq!(summary.to_record().len(), COLUMNS.len());
    }

    #[test]
    fn continuation_row_blanks_contract_identity() {
        let detail = ContractDetail {
            general_published_date: "Jan 01, 2025".into(),
            ..Default::default()
        };
        let row = CombinedRow::continuation(4, 3, &detail);
        assert_eq!(row.contract_number, 4);
        assert_eq!(row.total_attachments, 3);
        assert!(row.name.is_empty());
        assert!(row.notice_id.is_empty());
        assert!(row.link.is_empty());
        assert!(!row.failed_row);
        assert!(!row.incomplete_data);
        assert_eq!(row.general_published_date, "Jan 01, 2025");
    }

    #[test]
    fn summary_record_places_counts() {
        let summary = SummaryRow::new(RunCounts {
            total_contracts: 2,
            failed_contracts: 1,
            missing_data_contracts: 1,
            total_attachments: 5,
        });
        let record = summary.to_record();
        assert_eq!(record[0], "Summary");
        assert_eq!(record[1], "Total Contracts: 2");
        assert_eq!(record[2], "Failed Contracts: 1");
        assert_eq!(record[3], "Contracts with Missing Data: 1");
        assert_eq!(record[7], "Total Attachments: 5");
    }
}
