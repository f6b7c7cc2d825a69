//! SUSHI/COUNTER Report Decoder Library
//!
//! A stateless, reusable library for turning COUNTER Release 4 usage reports,
//! as delivered by SUSHI servers, into the tabular CSV layouts libraries use
//! for their usage statistics.
//!
//! # Architecture
//!
//! - [`XmlDocument`] parses a SUSHI response into a namespace-aware tree
//! - [`decode`] walks the tree once and builds a [`SushiReport`] whose items
//!   are journal, book, consortium or generic depending on the report type
//! - every performance item keeps a [`MetricIndex`] keyed by
//!   `(period start, period end, category)`
//! - [`render`] produces the CSV layout of one report type for a month range
//! - [`build_request`] writes the SOAP `ReportRequest` that asks a provider
//!   for a report
//!
//! The library does NOT:
//! - Talk to SUSHI servers
//! - Validate documents against the COUNTER schema
//! - Read provider configuration or write files
//!
//! All of that lives in the application layer (sushi-report-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use sushi_report_decoder::{decode, render, RenderRequest, XmlDocument};
//! use chrono::NaiveDate;
//!
//! let text = std::fs::read_to_string("jr1_response.xml").unwrap();
//! let doc = XmlDocument::parse(&text).unwrap();
//! let report = decode(&doc).unwrap();
//!
//! let request = RenderRequest::new(
//!     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
//! )
//! .unwrap()
//! .with_customer("MAIN");
//!
//! let csv = render(&report, report.report_type, &request).unwrap();
//! print!("{}", csv);
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod metrics;
pub mod render;
pub mod request;
pub mod types;
pub mod xml;

// Re-export main types for convenience
pub use config::{RenderRequest, ReportMonth};
pub use decoder::{decode, decode_str, ReportStats};
pub use metrics::MetricIndex;
pub use render::render;
pub use request::{build_request, ReportRequest, WsCredentials};
pub use types::{
    BookIdentifiers, CounterMetric, CounterReport, CustomerReport, DecoderError, ItemIdentifiers,
    ItemKind, MetricCategory, MetricInstance, MetricType, PerformanceItem, RenderError,
    ReportItem, ReportType, Result, SerialIdentifiers, SushiException, SushiReport, Vendor,
};
pub use xml::XmlDocument;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
