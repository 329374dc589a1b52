//! Tabular file sink: the combined dataset plus summary row as a
//! delimited text file with header.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ScraperError;
use crate::types::{Report, COLUMNS};

/// Write the report under `dir` as
/// `final_combined_data_{n}_{run_stamp}.csv`, where `n` continues the
/// numbering of whatever already sits in the directory.
pub fn write_report(dir: &Path, report: &Report, run_stamp: &str) -> Result<PathBuf, ScraperError> {
    fs::create_dir_all(dir)?;
    let number = next_file_number(dir)?;
    let path = dir.join(format!("final_combined_data_{number}_{run_stamp}.csv"));

    let file = File::create(&path)?;
    let mut out = BufWriter::new(file);

    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    write_record(&mut out, &header)?;
    for row in &report.rows {
        write_record(&mut out, &row.to_record())?;
    }
    write_record(&mut out, &report.summary.to_record())?;
    out.flush()?;

    info!("Final combined data saved to {}", path.display());
    Ok(path)
}

fn next_file_number(dir: &Path) -> Result<usize, ScraperError> {
    Ok(fs::read_dir(dir)?.filter_map(|e| e.ok()).count() + 1)
}

fn write_record<W: Write>(out: &mut W, fields: &[String]) -> Result<(), ScraperError> {
    let line = fields
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{line}")?;
    Ok(())
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
