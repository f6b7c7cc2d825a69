//! CSV renderers for decoded reports
//!
//! Every report type shares one skeleton: a fixed preamble (title, customer,
//! period and run date), a column header and one row per (item, row kind).
//! Monthly cells are reduced the same way everywhere: for each calendar month
//! the item's performance items are scanned in order and the first instance
//! of the row's metric subtype found in the `(month, category)` bucket wins.
//!
//! The per-family modules only decide which identity columns and which rows a
//! report type has.

mod book;
mod consortium;
mod database;
mod journal;

use crate::config::{RenderRequest, ReportMonth};
use crate::types::{
    CustomerReport, ItemKind, MetricCategory, MetricType, RenderError, ReportItem, ReportType,
    SushiReport,
};

/// Render one report type from a decoded report
///
/// # Arguments
/// * `report` - Decoded document; only its first vendor report is rendered
/// * `report_type` - Layout to produce (usually `report.report_type`)
/// * `request` - Month range, customer code and run date
///
/// # Returns
/// * `Result<String, RenderError>` - Complete CSV text, every line ending in `\n`
pub fn render(
    report: &SushiReport,
    report_type: ReportType,
    request: &RenderRequest,
) -> Result<String, RenderError> {
    let ctx = RenderContext::new(report_type, request);
    let preamble = Preamble::for_type(report_type).ok_or_else(|| ctx.not_supported())?;

    log::debug!(
        "Rendering {} for customer '{}' over {} month(s)",
        report_type,
        request.customer_code,
        ctx.months.len()
    );

    let mut out = CsvText::default();
    preamble.write(&mut out, request);

    match report_type {
        ReportType::JR1 | ReportType::JR1GOA => journal::write_jr1(&mut out, report, &ctx)?,
        ReportType::JR2 => journal::write_jr2(&mut out, report, &ctx)?,
        ReportType::JR5 => journal::write_jr5(&mut out, report, &ctx)?,
        ReportType::BR1 | ReportType::BR2 => book::write_br1(&mut out, report, &ctx)?,
        ReportType::BR3 => book::write_br3(&mut out, report, &ctx)?,
        ReportType::BR4 => book::write_br4(&mut out, report, &ctx)?,
        ReportType::BR5 => book::write_br5(&mut out, report, &ctx)?,
        ReportType::DB1 => database::write_db1(&mut out, report, &ctx),
        ReportType::DB2 => database::write_db2(&mut out, report, &ctx),
        ReportType::PR1 => database::write_pr1(&mut out, report, &ctx),
        ReportType::MR1 => database::write_mr1(&mut out, report, &ctx),
        ReportType::CR1 => consortium::write_cr1(&mut out, report, &ctx)?,
        ReportType::CR2 => consortium::write_cr2(&mut out, report, &ctx),
        ReportType::CR3 => consortium::write_cr3(&mut out, report, &ctx),
        ReportType::JR3 | ReportType::JR4 => return Err(ctx.not_supported()),
    }

    log::debug!("Rendered {} line(s) for {}", out.lines, report_type);
    Ok(out.text)
}

/// How the customer appears under the title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CustomerLines {
    /// The customer code on its own line
    Code,
    /// A `Customer` label line, then the code
    Labelled,
    /// `Customer,Section Type:` then `<code>,ft_total`
    SectionType,
}

/// Fixed lines written above the column header
#[derive(Debug, Clone, Copy)]
struct Preamble {
    title: &'static str,
    customer: CustomerLines,
}

impl Preamble {
    fn for_type(report_type: ReportType) -> Option<Self> {
        use CustomerLines::*;
        let (title, customer) = match report_type {
            ReportType::JR1 => ("Journal Report 1 (R4),Number of Successful Full-Text Article Requests by Month and Journal", Code),
            ReportType::JR1GOA => ("Journal Report 1 GOA (R4),Number of Successful Gold Open Access Full-text Article Requests by Month and Journal", Code),
            ReportType::JR2 => ("Journal Report 2 (R4),Access Denied to Full-Text Articles by Month Journal and Category", Code),
            ReportType::JR5 => ("Journal Report 5 (R4),Number of Successful Full-Text Article Requests by Year-of-Publication (YOP) and Journal", Code),
            ReportType::DB1 => ("Database Report 1 (R4), Total Searches Result Clicks and Record Views by Month and Database", Code),
            ReportType::DB2 => ("Database Report 2 (R4), Access Denied by Month Database and Category", Code),
            ReportType::PR1 => ("Platform Report 1 (R4): Total Searches Result Clicks and Record Views by Month and Platform", Code),
            ReportType::BR1 => ("Book Report 1 (R4): Number of Successful Title Requests by Month and Title", Labelled),
            ReportType::BR2 => ("Book Report 2 (R4),Number of Successful Section Requests by Month and Title", SectionType),
            ReportType::BR3 => ("Book Report 3 (R4),Access Denied to Content Items by Month, Title and Category", Labelled),
            ReportType::BR4 => ("Book Report 4 (R4),Access Denied to Content Items by Month, Platform and Category", Labelled),
            ReportType::BR5 => ("Book Report 5 (R4),Total Searches by Month and Title", Labelled),
            ReportType::MR1 => ("Multimedia Report 1 (R4), Number of Successful Multimedia Full Content Unit Requests by Month and Collection", Code),
            ReportType::CR1 => ("Consortium Report 1 (R4), Number of successful full-text journal article or book chapter requests by month and title", Code),
            ReportType::CR2 => ("Consortium Report 2 (R4), Total searches by month and database", Code),
            ReportType::CR3 => ("Consortium Report 3 (R4), Number of Successful Multimedia Full Content Unit Requests by Month and Collection", Code),
            ReportType::JR3 | ReportType::JR4 => return None,
        };
        Some(Self { title, customer })
    }

    fn write(&self, out: &mut CsvText, request: &RenderRequest) {
        out.line(self.title);
        match self.customer {
            CustomerLines::Code => out.line(&request.customer_code),
            CustomerLines::Labelled => {
                out.line("Customer");
                out.line(&request.customer_code);
            }
            CustomerLines::SectionType => {
                out.line("Customer,Section Type:");
                out.line(&format!("{},ft_total", request.customer_code));
            }
        }
        out.line("Period covered by report");
        out.line(&format!(
            "{} to {}",
            request.start.format("%Y-%m-%d"),
            request.end.format("%Y-%m-%d")
        ));
        out.line("Date run:");
        out.line(&request.run_date.format("%Y-%-m-%-d").to_string());
    }
}

/// Output buffer that terminates every line with `\n`
#[derive(Debug, Default)]
pub(crate) struct CsvText {
    text: String,
    lines: usize,
}

impl CsvText {
    pub(crate) fn line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
        self.lines += 1;
    }
}

/// Per-call rendering state
pub(crate) struct RenderContext<'a> {
    pub report_type: ReportType,
    pub request: &'a RenderRequest,
    pub months: Vec<ReportMonth>,
}

impl<'a> RenderContext<'a> {
    fn new(report_type: ReportType, request: &'a RenderRequest) -> Self {
        Self {
            report_type,
            request,
            months: request.months(),
        }
    }

    fn not_supported(&self) -> RenderError {
        RenderError::NotSupported {
            report_type: self.report_type,
            customer: self.request.customer_code.clone(),
        }
    }

    pub(crate) fn mismatch(&self, item: &ReportItem, expected: ItemKind) -> RenderError {
        RenderError::ItemVariantMismatch {
            report_type: self.report_type,
            customer: self.request.customer_code.clone(),
            item: item.name.clone(),
            expected,
            found: item.kind(),
        }
    }

    /// Header cells for the month columns, each with a leading comma
    pub(crate) fn month_columns(&self, format: &str) -> String {
        self.months
            .iter()
            .map(|month| format!(",{}", month.first.format(format)))
            .collect()
    }
}

/// `Mon-YYYY` month column labels
pub(crate) const MONTH_LABEL: &str = "%b-%Y";

/// Every (customer, item) pair of the first vendor report, in document order
pub(crate) fn report_items(
    report: &SushiReport,
) -> impl Iterator<Item = (&CustomerReport, &ReportItem)> {
    report
        .first_report()
        .into_iter()
        .flat_map(|r| r.customers.iter())
        .flat_map(|customer| customer.items.iter().map(move |item| (customer, item)))
}

/// One output row kind of an item
#[derive(Debug, Clone, Copy)]
pub(crate) struct RowSpec {
    /// Text of the category column, when the layout has one
    pub label: Option<&'static str>,
    pub category: MetricCategory,
    pub metric_type: MetricType,
}

impl RowSpec {
    const fn labelled(label: &'static str, category: MetricCategory, metric_type: MetricType) -> Self {
        Self {
            label: Some(label),
            category,
            metric_type,
        }
    }
}

pub(crate) const FULL_TEXT: RowSpec = RowSpec {
    label: None,
    category: MetricCategory::Requests,
    metric_type: MetricType::FtTotal,
};

pub(crate) const DENIALS: [RowSpec; 2] = [
    RowSpec::labelled(
        "Access denied: concurrent/simultaneous user license limit exceeded",
        MetricCategory::AccessDenied,
        MetricType::Turnaway,
    ),
    RowSpec::labelled(
        "Access denied: content item not licensed",
        MetricCategory::AccessDenied,
        MetricType::NoLicense,
    ),
];

pub(crate) const ACTIVITY: [RowSpec; 4] = [
    RowSpec::labelled("Regular Searches", MetricCategory::Searches, MetricType::SearchReg),
    RowSpec::labelled(
        "Searches-federated and automated",
        MetricCategory::Searches,
        MetricType::SearchFed,
    ),
    RowSpec::labelled("Result Clicks", MetricCategory::Requests, MetricType::ResultClick),
    RowSpec::labelled("Record Views", MetricCategory::Requests, MetricType::RecordView),
];

/// Where the period total sits relative to the month cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TotalsPlacement {
    BeforeMonths,
    AfterMonths,
}

/// Reduced month cells of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MonthlySeries {
    pub cells: Vec<Option<u64>>,
    pub total: u64,
}

impl MonthlySeries {
    pub(crate) fn collect(item: &ReportItem, row: &RowSpec, months: &[ReportMonth]) -> Self {
        let cells: Vec<Option<u64>> = months
            .iter()
            .map(|month| first_match(item, row.category, row.metric_type, month))
            .collect();
        let total = saturating_total(cells.iter().flatten().copied());
        Self { cells, total }
    }
}

/// First instance of `metric_type` in the month bucket, across performance items
fn first_match(
    item: &ReportItem,
    category: MetricCategory,
    metric_type: MetricType,
    month: &ReportMonth,
) -> Option<u64> {
    item.performance
        .iter()
        .filter_map(|perf| perf.metrics.try_get(month.first, month.last, category))
        .find_map(|metric| metric.first_of(metric_type))
        .map(|instance| instance.count)
}

/// Sum of every matching instance in every month bucket of the range
pub(crate) fn window_sum(
    item: &ReportItem,
    months: &[ReportMonth],
    category: MetricCategory,
    metric_type: MetricType,
) -> u64 {
    let counts = months
        .iter()
        .flat_map(|month| {
            item.performance
                .iter()
                .filter_map(move |perf| perf.metrics.try_get(month.first, month.last, category))
        })
        .flat_map(|metric| metric.instances.iter())
        .filter(|instance| instance.metric_type == metric_type)
        .map(|instance| instance.count);
    saturating_total(counts)
}

/// Sum that clamps at `u64::MAX` instead of overflowing
pub(crate) fn saturating_total(counts: impl IntoIterator<Item = u64>) -> u64 {
    counts.into_iter().fold(0, u64::saturating_add)
}

/// Assemble one data row
///
/// `identity` holds the already-escaped leading columns; `sub_totals` follow
/// the period total (HTML/PDF totals of the full-text layouts).
pub(crate) fn format_row(
    identity: &[String],
    label: Option<&str>,
    series: &MonthlySeries,
    placement: TotalsPlacement,
    sub_totals: &[u64],
) -> String {
    let mut row = identity.join(",");
    if let Some(label) = label {
        row.push(',');
        row.push_str(label);
    }

    let mut totals = series.total.to_string();
    for sub_total in sub_totals {
        totals.push(',');
        totals.push_str(&sub_total.to_string());
    }

    if placement == TotalsPlacement::BeforeMonths {
        row.push(',');
        row.push_str(&totals);
    }
    for cell in &series.cells {
        row.push(',');
        if let Some(count) = cell {
            row.push_str(&count.to_string());
        }
    }
    if placement == TotalsPlacement::AfterMonths {
        row.push(',');
        row.push_str(&totals);
    }
    row
}

/// Write one row per `RowSpec` for an item
pub(crate) fn write_rows(
    out: &mut CsvText,
    ctx: &RenderContext<'_>,
    item: &ReportItem,
    identity: &[String],
    rows: &[RowSpec],
    placement: TotalsPlacement,
) {
    for row in rows {
        let series = MonthlySeries::collect(item, row, &ctx.months);
        out.line(&format_row(identity, row.label, &series, placement, &[]));
    }
}

/// Quote a field that contains a comma; nothing else is escaped
pub(crate) fn wrap_comma(field: &str) -> String {
    if field.contains(',') {
        format!("\"{}\"", field)
    } else {
        field.to_string()
    }
}

/// Escaped name, publisher and platform columns
pub(crate) fn title_columns(item: &ReportItem) -> Vec<String> {
    vec![
        wrap_comma(&item.name),
        wrap_comma(&item.publisher),
        wrap_comma(&item.platform),
    ]
}
