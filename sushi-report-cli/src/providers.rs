//! Provider table (sushiconfig.csv)
//!
//! One row per library/provider pair. The first nine columns are positional:
//!
//! | # | column |
//! |---|--------|
//! | 0 | library code |
//! | 1 | provider name |
//! | 2 | COUNTER release |
//! | 3 | SUSHI endpoint URL |
//! | 4 | requestor ID |
//! | 5 | requestor name |
//! | 6 | requestor email |
//! | 7 | customer ID |
//! | 8 | customer name |
//!
//! Any later column whose header is a report code (`JR1`, `BR2`, ...) is a
//! flag: a value starting with `y` asks for that report. Optional
//! `wsse_user` / `wsse_password` columns carry WS-Security credentials.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use sushi_report_decoder::{ReportRequest, ReportType, WsCredentials};

const FIXED_COLUMNS: usize = 9;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Failed to read provider table {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Line {line} has insufficient data ({found} of {needed} columns)")]
    InsufficientData {
        line: usize,
        found: usize,
        needed: usize,
    },
}

/// One SUSHI endpoint for one library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRow {
    /// 1-based line in the CSV file, header included
    pub line: usize,
    pub library_code: String,
    pub provider: String,
    pub release: String,
    pub url: String,
    pub requestor_id: String,
    pub requestor_name: String,
    pub requestor_email: String,
    pub customer_id: String,
    pub customer_name: String,
    /// Report types flagged for this row, in column order
    pub reports: Vec<ReportType>,
    pub credentials: Option<WsCredentials>,
}

/// Parsed provider table
#[derive(Debug, Default)]
pub struct ProviderTable {
    pub rows: Vec<ProviderRow>,
    /// Rows that could not be used
    pub rejected: Vec<ProviderError>,
}

impl ProviderTable {
    /// Rows whose library code is in `libraries` (case-insensitive); all rows when empty
    pub fn selected<'a>(&'a self, libraries: &[String]) -> impl Iterator<Item = &'a ProviderRow> {
        let filter: HashSet<String> = libraries.iter().map(|code| code.trim().to_uppercase()).collect();
        self.rows
            .iter()
            .filter(move |row| filter.is_empty() || filter.contains(&row.library_code.to_uppercase()))
    }
}

/// Read the provider table from a CSV file
pub fn read_providers(path: &Path) -> Result<ProviderTable, ProviderError> {
    let csv_error = |source: csv::Error| ProviderError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    let report_columns: Vec<(usize, ReportType)> = headers
        .iter()
        .enumerate()
        .skip(FIXED_COLUMNS)
        .filter_map(|(idx, name)| name.parse::<ReportType>().ok().map(|rt| (idx, rt)))
        .collect();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let (user_column, password_column) = (column("wsse_user"), column("wsse_password"));

    log::debug!(
        "Provider table {:?}: {} report column(s)",
        path,
        report_columns.len()
    );

    let mut table = ProviderTable::default();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let line = idx + 2;

        if record.len() < FIXED_COLUMNS {
            let error = ProviderError::InsufficientData {
                line,
                found: record.len(),
                needed: FIXED_COLUMNS,
            };
            log::error!("{:?}: {}", path, error);
            table.rejected.push(error);
            continue;
        }

        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        let reports = report_columns
            .iter()
            .filter(|(idx, _)| {
                record
                    .get(*idx)
                    .map(|flag| flag.to_ascii_lowercase().starts_with('y'))
                    .unwrap_or(false)
            })
            .map(|(_, report_type)| *report_type)
            .collect();

        let credentials = match (user_column.map(field), password_column.map(field)) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(WsCredentials { username, password })
            }
            _ => None,
        };

        table.rows.push(ProviderRow {
            line,
            library_code: field(0),
            provider: field(1),
            release: field(2),
            url: field(3),
            requestor_id: field(4),
            requestor_name: field(5),
            requestor_email: field(6),
            customer_id: field(7),
            customer_name: field(8),
            reports,
            credentials,
        });
    }

    log::info!(
        "Loaded {} provider row(s) from {:?} ({} rejected)",
        table.rows.len(),
        path,
        table.rejected.len()
    );
    Ok(table)
}

impl ProviderRow {
    /// Build the SUSHI request for one flagged report
    pub fn report_request(
        &self,
        report_type: ReportType,
        start: NaiveDate,
        end: NaiveDate,
        created: NaiveDateTime,
        default_release: &str,
    ) -> ReportRequest {
        let release = if self.release.is_empty() {
            default_release.to_string()
        } else {
            self.release.clone()
        };
        ReportRequest {
            requestor_id: self.requestor_id.clone(),
            requestor_name: self.requestor_name.clone(),
            requestor_email: self.requestor_email.clone(),
            customer_id: self.customer_id.clone(),
            customer_name: self.customer_name.clone(),
            report_type,
            release,
            start,
            end,
            created,
            credentials: self.credentials.clone(),
        }
    }

    /// `<provider>_<library>_<yyyymm>_<yyyymm>_<type>.<extension>`
    pub fn file_name(
        &self,
        report_type: ReportType,
        start: NaiveDate,
        end: NaiveDate,
        extension: &str,
    ) -> String {
        format!(
            "{}_{}_{}_{}_{}.{}",
            self.provider,
            self.library_code,
            start.format("%Y%m"),
            end.format("%Y%m"),
            report_type,
            extension
        )
    }
}
