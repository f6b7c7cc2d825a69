//! Core types for the SUSHI report decoder library
//!
//! This module defines the normalised report model the decoder produces from a
//! COUNTER XML document, plus the error types shared by the decoder and the
//! renderers. The model is a strict ownership tree:
//!
//! `SushiReport → CounterReport → CustomerReport → ReportItem → PerformanceItem → CounterMetric → MetricInstance`
//!
//! It is built once by [`crate::decode`] and is read-only afterwards.

use crate::metrics::MetricIndex;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that abort decoding of a document
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to parse XML document: {0}")]
    XmlParse(String),

    #[error("Missing required element <{element}> in {context}")]
    MissingElement { element: String, context: String },

    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute { attribute: String, element: String },

    #[error("Unknown report type: {0}")]
    UnknownReportType(String),

    #[error("Unknown metric type '{value}' for item '{item}'")]
    UnknownMetricType { value: String, item: String },

    #[error("Invalid count '{value}' for item '{item}'")]
    InvalidCount { value: String, item: String },

    #[error("Report returned exception: {0}")]
    RemoteException(SushiException),

    #[error("Failed to build request document: {0}")]
    RequestBuild(String),
}

/// Errors raised while rendering a decoded report to CSV
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Report type {report_type} is currently not supported (customer {customer})")]
    NotSupported {
        report_type: ReportType,
        customer: String,
    },

    #[error(
        "Report type {report_type} needs {expected} items but item '{item}' is {found} (customer {customer})"
    )]
    ItemVariantMismatch {
        report_type: ReportType,
        customer: String,
        item: String,
        expected: ItemKind,
        found: ItemKind,
    },

    #[error("End month {end} is before start month {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// COUNTER Release 4 report codes understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportType {
    JR1,
    JR1GOA,
    JR2,
    JR3,
    JR4,
    JR5,
    BR1,
    BR2,
    BR3,
    BR4,
    BR5,
    DB1,
    DB2,
    PR1,
    MR1,
    CR1,
    CR2,
    CR3,
}

impl ReportType {
    /// Every known report type, in catalogue order
    pub const ALL: [ReportType; 18] = [
        ReportType::JR1,
        ReportType::JR1GOA,
        ReportType::JR2,
        ReportType::JR3,
        ReportType::JR4,
        ReportType::JR5,
        ReportType::BR1,
        ReportType::BR2,
        ReportType::BR3,
        ReportType::BR4,
        ReportType::BR5,
        ReportType::DB1,
        ReportType::DB2,
        ReportType::PR1,
        ReportType::MR1,
        ReportType::CR1,
        ReportType::CR2,
        ReportType::CR3,
    ];

    /// The report code as it appears in `ReportDefinition/@Name`
    pub fn code(&self) -> &'static str {
        match self {
            ReportType::JR1 => "JR1",
            ReportType::JR1GOA => "JR1GOA",
            ReportType::JR2 => "JR2",
            ReportType::JR3 => "JR3",
            ReportType::JR4 => "JR4",
            ReportType::JR5 => "JR5",
            ReportType::BR1 => "BR1",
            ReportType::BR2 => "BR2",
            ReportType::BR3 => "BR3",
            ReportType::BR4 => "BR4",
            ReportType::BR5 => "BR5",
            ReportType::DB1 => "DB1",
            ReportType::DB2 => "DB2",
            ReportType::PR1 => "PR1",
            ReportType::MR1 => "MR1",
            ReportType::CR1 => "CR1",
            ReportType::CR2 => "CR2",
            ReportType::CR3 => "CR3",
        }
    }

    /// Item variant that every item of a document of this type decodes into
    pub fn item_kind(&self) -> ItemKind {
        match self {
            ReportType::JR1
            | ReportType::JR1GOA
            | ReportType::JR2
            | ReportType::JR3
            | ReportType::JR4
            | ReportType::JR5 => ItemKind::Journal,
            ReportType::BR1
            | ReportType::BR2
            | ReportType::BR3
            | ReportType::BR4
            | ReportType::BR5 => ItemKind::Book,
            ReportType::CR1 => ItemKind::Consortium,
            _ => ItemKind::Generic,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ReportType {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        ReportType::ALL
            .iter()
            .copied()
            .find(|t| t.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DecoderError::UnknownReportType(trimmed.to_string()))
    }
}

/// Broad measurement class of a performance block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricCategory {
    Requests,
    Searches,
    #[serde(rename = "Access_denied")]
    AccessDenied,
    /// Sentinel for category tokens the decoder could not recognise
    Invalid,
}

impl MetricCategory {
    /// Case-insensitive lookup; `None` for unknown tokens
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "requests" => Some(MetricCategory::Requests),
            "searches" => Some(MetricCategory::Searches),
            "access_denied" => Some(MetricCategory::AccessDenied),
            "invalid" => Some(MetricCategory::Invalid),
            _ => None,
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricCategory::Requests => write!(f, "Requests"),
            MetricCategory::Searches => write!(f, "Searches"),
            MetricCategory::AccessDenied => write!(f, "Access_denied"),
            MetricCategory::Invalid => write!(f, "Invalid"),
        }
    }
}

/// Specific counted activity inside a metric category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    FtPs,
    FtPsMobile,
    FtPdf,
    FtPdfMobile,
    FtHtml,
    FtHtmlMobile,
    FtEpub,
    SectionedHtml,
    FtTotal,
    Toc,
    Abstract,
    Reference,
    DataSet,
    Audio,
    Video,
    Image,
    Podcast,
    Multimedia,
    RecordView,
    ResultClick,
    SearchReg,
    SearchFed,
    Turnaway,
    NoLicense,
    Other,
}

impl MetricType {
    const TOKENS: [(&'static str, MetricType); 25] = [
        ("ft_ps", MetricType::FtPs),
        ("ft_ps_mobile", MetricType::FtPsMobile),
        ("ft_pdf", MetricType::FtPdf),
        ("ft_pdf_mobile", MetricType::FtPdfMobile),
        ("ft_html", MetricType::FtHtml),
        ("ft_html_mobile", MetricType::FtHtmlMobile),
        ("ft_epub", MetricType::FtEpub),
        ("sectioned_html", MetricType::SectionedHtml),
        ("ft_total", MetricType::FtTotal),
        ("toc", MetricType::Toc),
        ("abstract", MetricType::Abstract),
        ("reference", MetricType::Reference),
        ("data_set", MetricType::DataSet),
        ("audio", MetricType::Audio),
        ("video", MetricType::Video),
        ("image", MetricType::Image),
        ("podcast", MetricType::Podcast),
        ("multimedia", MetricType::Multimedia),
        ("record_view", MetricType::RecordView),
        ("result_click", MetricType::ResultClick),
        ("search_reg", MetricType::SearchReg),
        ("search_fed", MetricType::SearchFed),
        ("turnaway", MetricType::Turnaway),
        ("no_license", MetricType::NoLicense),
        ("other", MetricType::Other),
    ];

    /// Case-insensitive lookup of a `MetricType` token
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::TOKENS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|(_, metric)| *metric)
    }

    /// The token as written in COUNTER documents
    pub fn token(&self) -> &'static str {
        Self::TOKENS
            .iter()
            .find(|(_, metric)| metric == self)
            .map(|(name, _)| *name)
            .unwrap_or("other")
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Root of a decoded document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SushiReport {
    /// Declared report type (`ReportDefinition/@Name`)
    pub report_type: ReportType,
    /// Schema release (`ReportDefinition/@Release`)
    pub release: String,
    /// Vendor reports in document order; renderers use the first one
    pub reports: Vec<CounterReport>,
    /// SUSHI exceptions returned alongside the report
    pub exceptions: Vec<SushiException>,
}

impl SushiReport {
    /// The report every renderer works on
    pub fn first_report(&self) -> Option<&CounterReport> {
        self.reports.first()
    }

    /// First exception the server signalled, if any
    pub fn remote_exception(&self) -> Option<&SushiException> {
        self.exceptions.first()
    }
}

/// One vendor-level report instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CounterReport {
    pub id: String,
    pub name: String,
    pub title: String,
    pub version: String,
    /// Creation timestamp; `NaiveDateTime::default()` when absent or unparsable
    pub created: NaiveDateTime,
    pub vendor: Vendor,
    pub customers: Vec<CustomerReport>,
}

/// Vendor metadata attached to a report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub contact_email: String,
    pub website_url: String,
    pub logo_url: String,
}

/// One customer (institution) within a report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerReport {
    pub id: String,
    pub name: String,
    pub consortium_code: String,
    pub consortium_name: String,
    pub items: Vec<ReportItem>,
}

/// Structural variant of a report item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemKind {
    Journal,
    Book,
    Consortium,
    Generic,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Journal => write!(f, "journal"),
            ItemKind::Book => write!(f, "book"),
            ItemKind::Consortium => write!(f, "consortium"),
            ItemKind::Generic => write!(f, "generic"),
        }
    }
}

/// Identifiers carried by journal and consortium items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SerialIdentifiers {
    pub doi: String,
    pub proprietary: String,
    pub print_issn: String,
    pub online_issn: String,
}

/// Identifiers carried by book items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookIdentifiers {
    pub doi: String,
    pub proprietary: String,
    pub print_isbn: String,
    pub online_issn: String,
}

/// Variant-specific part of a report item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ItemIdentifiers {
    Journal(SerialIdentifiers),
    Book(BookIdentifiers),
    Consortium(SerialIdentifiers),
    Generic,
}

impl ItemIdentifiers {
    /// Empty identifier set for the given variant
    pub fn empty(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Journal => ItemIdentifiers::Journal(SerialIdentifiers::default()),
            ItemKind::Book => ItemIdentifiers::Book(BookIdentifiers::default()),
            ItemKind::Consortium => ItemIdentifiers::Consortium(SerialIdentifiers::default()),
            ItemKind::Generic => ItemIdentifiers::Generic,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemIdentifiers::Journal(_) => ItemKind::Journal,
            ItemIdentifiers::Book(_) => ItemKind::Book,
            ItemIdentifiers::Consortium(_) => ItemKind::Consortium,
            ItemIdentifiers::Generic => ItemKind::Generic,
        }
    }
}

/// One content item (title, database, platform or collection)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportItem {
    pub name: String,
    pub publisher: String,
    pub platform: String,
    pub identifiers: ItemIdentifiers,
    pub performance: Vec<PerformanceItem>,
}

impl ReportItem {
    /// Create an item with no identifiers and no performance data
    pub fn new(kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publisher: String::new(),
            platform: String::new(),
            identifiers: ItemIdentifiers::empty(kind),
            performance: Vec::new(),
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.identifiers.kind()
    }
}

/// One measurement context, optionally qualified by year of publication
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceItem {
    /// Year-of-publication qualifier; empty when not applicable
    pub yop: String,
    pub metrics: MetricIndex,
}

impl PerformanceItem {
    pub fn new(yop: impl Into<String>) -> Self {
        Self {
            yop: yop.into(),
            metrics: MetricIndex::new(),
        }
    }
}

/// Measurement bucket for one (window, category) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterMetric {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub category: MetricCategory,
    pub instances: Vec<MetricInstance>,
}

impl CounterMetric {
    pub fn new(start: NaiveDate, end: NaiveDate, category: MetricCategory) -> Self {
        Self {
            start,
            end,
            category,
            instances: Vec::new(),
        }
    }

    /// First instance of the given subtype, in document order
    pub fn first_of(&self, metric_type: MetricType) -> Option<&MetricInstance> {
        self.instances.iter().find(|i| i.metric_type == metric_type)
    }
}

/// One typed count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricInstance {
    pub metric_type: MetricType,
    pub count: u64,
}

/// Exception element returned by a SUSHI server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SushiException {
    pub number: String,
    pub severity: String,
    pub message: String,
}

impl fmt::Display for SushiException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Number: {}, Severity: {}, Message: {}",
            self.number, self.severity, self.message
        )
    }
}
