//! Aggregation phase: assigns contract numbers, enriches each stub with
//! detail data and fans the result out into combined rows.
//!
//! Each contract moves forward through exactly one pass: stub created,
//! detail requested, detail resolved, rows emitted. There are no
//! retries and no backward transitions.

use tracing::{info, warn};

use crate::traits::DetailSource;
use crate::types::{CombinedRow, ContractDetail, ContractStub, Report, RunCounts, SummaryRow};

/// Combine listing stubs with their detail data.
///
/// Contract numbers are a dense sequence starting at 1, assigned here
/// and nowhere else. Failed rows carry an empty link and never reach
/// the detail source.
pub async fn combine(stubs: Vec<ContractStub>, source: &dyn DetailSource) -> Report {
    let mut rows = Vec::new();
    let mut counts = RunCounts {
        total_contracts: stubs.len(),
        ..Default::default()
    };

    for (index, mut stub) in stubs.into_iter().enumerate() {
        let number = (index + 1) as u32;
        info!("Processing contract number {number}");

        let detail = if stub.link.is_empty() {
            ContractDetail::default()
        } else {
            source.fetch(&stub.link).await
        };

        if stub.failed_row {
            counts.failed_contracts += 1;
            warn!("Contract {number} failed to scrape properly");
        }

        if detail.attachments.is_empty() {
            let mut row = CombinedRow::full(number, &stub, &detail);
            // Missing-data flagging happens only on this branch; a
            // contract with attachments but no notice id is not
            // flagged (see DESIGN.md).
            if stub.notice_id.is_empty() {
                row.incomplete_data = true;
                counts.missing_data_contracts += 1;
                warn!("Contract {number} has incomplete data");
            }
            rows.push(row);
        } else {
            let total = detail.attachments.len() as u32;
            stub.total_attachments = total;
            counts.total_attachments += detail.attachments.len();

            for (i, attachment) in detail.attachments.iter().enumerate() {
                let mut row = if i == 0 {
                    CombinedRow::full(number, &stub, &detail)
                } else {
                    CombinedRow::continuation(number, total, &detail)
                };
                row.set_attachment(attachment);
                rows.push(row);
            }
            info!("Contract {number} processed with {total} attachments");
        }
    }

    let summary = SummaryRow::new(counts);
    Report {
        rows,
        summary,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttachmentRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapSource {
        details: HashMap<String, ContractDetail>,
        calls: Mutex<Vec<String>>,
    }

    impl MapSource {
        fn new(details: HashMap<String, ContractDetail>) -> Self {
            Self {
                details,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DetailSource for MapSource {
        async fn fetch(&self, link: &str) -> ContractDetail {
            self.calls.lock().unwrap().push(link.to_string());
            self.details.get(link).cloned().unwrap_or_default()
        }
    }

    fn stub(name: &str, notice_id: &str, link: &str) -> ContractStub {
        ContractStub::new(name.into(), notice_id.into(), "Dept".into(), link.into())
    }

    fn attachment(n: u32) -> AttachmentRecord {
        AttachmentRecord {
            file_name: format!("file{n}.pdf"),
            file_link: format!("https://portal.example/files/{n}"),
            updated_date: "Jan 01, 2025".into(),
        }
    }

    #[tokio::test]
    async fn zero_attachments_and_empty_notice_flags_incomplete() {
        let source = MapSource::new(HashMap::new());
        let stubs = vec![stub("A", "", "https://portal.example/opp/a")];

        let report = combine(stubs, &source).await;

        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.contract_number, 1);
        assert!(row.incomplete_data);
        assert!(row.file_name.is_empty());
        assert_eq!(report.counts.missing_data_contracts, 1);
        assert_eq!(report.counts.total_attachments, 0);
    }

    #[tokio::test]
    async fn attachments_fan_out_one_row_each() {
        let mut details = HashMap::new();
        details.insert(
            "https://portal.example/opp/b".to_string(),
            ContractDetail {
                general_published_date: "Feb 03, 2025".into(),
                attachments: vec![attachment(1), attachment(2)],
                ..Default::default()
            },
        );
        let source = MapSource::new(details);
        let stubs = vec![stub("B", "N-002", "https://portal.example/opp/b")];

        let report = combine(stubs, &source).await;

        assert_eq!(report.rows.len(), 2);

        let first = &report.rows[0];
        assert_eq!(first.contract_number, 1);
        assert_eq!(first.name, "B");
        assert_eq!(first.notice_id, "N-002");
        assert_eq!(first.total_attachments, 2);
        assert_eq!(first.file_name, "file1.pdf");
        assert_eq!(first.general_published_date, "Feb 03, 2025");

        let second = &report.rows[1];
        assert_eq!(second.contract_number, 1);
        assert!(second.name.is_empty());
        assert!(second.notice_id.is_empty());
        assert!(second.link.is_empty());
        assert_eq!(second.total_attachments, 2);
        assert_eq!(second.file_name, "file2.pdf");
        assert_eq!(second.general_published_date, "Feb 03, 2025");
        assert!(!second.failed_row);
        assert!(!second.incomplete_data);

        assert_eq!(report.counts.total_attachments, 2);
        let record = report.summary.to_record();
        assert_eq!(record[1], "Total Contracts: 1");
        assert_eq!(record[7], "Total Attachments: 2");
    }

    #[tokio::test]
    async fn incomplete_never_set_when_attachments_exist() {
        let mut details = HashMap::new();
        details.insert(
            "https://portal.example/opp/c".to_string(),
            ContractDetail {
                attachments: vec![attachment(1)],
                ..Default::default()
            },
        );
        let source = MapSource::new(details);
        // Empty notice id but one attachment: stays unflagged
        let stubs = vec![stub("C", "", "https://portal.example/opp/c")];

        let report = combine(stubs, &source).await;

        assert!(report.rows.iter().all(|r| !r.incomplete_data));
        assert_eq!(report.counts.missing_data_contracts, 0);
    }

    #[tokio::test]
    async fn failed_rows_skip_detail_fetch() {
        let source = MapSource::new(HashMap::new());
        let stubs = vec![
            ContractStub::failed(),
            stub("D", "N-004", "https://portal.example/opp/d"),
        ];

        let report = combine(stubs, &source).await;

        // Only the healthy stub reached the detail source
        assert_eq!(source.calls(), vec!["https://portal.example/opp/d"]);
        assert_eq!(report.counts.failed_contracts, 1);

        let failed = &report.rows[0];
        assert!(failed.failed_row);
        assert!(failed.name.is_empty());
        assert!(failed.notice_id.is_empty());
        assert!(failed.department.is_empty());
        assert!(failed.link.is_empty());
    }

    #[tokio::test]
    async fn contract_numbers_are_dense_from_one() {
        let mut details = HashMap::new();
        details.insert(
            "https://portal.example/opp/2".to_string(),
            ContractDetail {
                attachments: vec![attachment(1), attachment(2), attachment(3)],
                ..Default::default()
            },
        );
        let source = MapSource::new(details);
        let stubs = vec![
            stub("one", "N-1", "https://portal.example/opp/1"),
            stub("two", "N-2", "https://portal.example/opp/2"),
            stub("three", "N-3", "https://portal.example/opp/3"),
        ];

        let report = combine(stubs, &source).await;

        for number in 1..=3u32 {
            assert!(
                report.rows.iter().any(|r| r.contract_number == number),
                "no row for contract {number}"
            );
        }
        // Every row of contract 2 reports its true attachment count
        assert!(report
            .rows
            .iter()
            .filter(|r| r.contract_number == 2)
            .all(|r| r.total_attachments == 3));
        assert_eq!(report.counts.total_contracts, 3);
        assert_eq!(report.counts.total_attachments, 3);
    }

    #[tokio::test]
    async fn summary_attachment_total_sums_once_per_contract() {
        let mut details = HashMap::new();
        details.insert(
            "https://portal.example/opp/x".to_string(),
            ContractDetail {
                attachments: vec![attachment(1), attachment(2)],
                ..Default::default()
            },
        );
        details.insert(
            "https://portal.example/opp/y".to_string(),
            ContractDetail {
                attachments: vec![attachment(3)],
                ..Default::default()
            },
        );
        let source = MapSource::new(details);
        let stubs = vec![
            stub("X", "N-X", "https://portal.example/opp/x"),
            stub("Y", "N-Y", "https://portal.example/opp/y"),
            stub("Z", "N-Z", "https://portal.example/opp/z"),
        ];

        let report = combine(stubs, &source).await;

        assert_eq!(report.counts.total_attachments, 3);
        assert_eq!(
            report.summary.to_record()[7],
            "Total Attachments: 3".to_string()
        );
    }
}
