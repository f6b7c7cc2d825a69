//! Journal layouts: JR1, JR1 GOA, JR2 and JR5

use super::{
    format_row, report_items, title_columns, write_rows, CsvText, MonthlySeries, RenderContext,
    TotalsPlacement, DENIALS, FULL_TEXT, MONTH_LABEL,
};
use crate::types::{
    ItemIdentifiers, ItemKind, MetricCategory, MetricType, RenderError, ReportItem,
    SerialIdentifiers, SushiReport,
};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

const JOURNAL_COLUMNS: &str =
    ",Publisher,Platform,Journal DOI,Proprietary Identifier,Print ISSN,Online ISSN";

fn journal_ids<'i>(
    ctx: &RenderContext<'_>,
    item: &'i ReportItem,
) -> Result<&'i SerialIdentifiers, RenderError> {
    match &item.identifiers {
        ItemIdentifiers::Journal(ids) => Ok(ids),
        _ => Err(ctx.mismatch(item, ItemKind::Journal)),
    }
}

/// Name, publisher, platform and the four serial identifiers
fn journal_identity(item: &ReportItem, ids: &SerialIdentifiers) -> Vec<String> {
    let mut columns = title_columns(item);
    columns.extend([
        ids.doi.clone(),
        ids.proprietary.clone(),
        ids.print_issn.clone(),
        ids.online_issn.clone(),
    ]);
    columns
}

/// JR1 and JR1 GOA: full-text requests with HTML and PDF period totals
pub(super) fn write_jr1(
    out: &mut CsvText,
    report: &SushiReport,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    out.line(&format!(
        "{},Reporting Period Total,Reporting Period HTML,Reporting Period PDF{}",
        JOURNAL_COLUMNS,
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        let identity = journal_identity(item, journal_ids(ctx, item)?);
        let series = MonthlySeries::collect(item, &FULL_TEXT, &ctx.months);
        let html = super::window_sum(item, &ctx.months, MetricCategory::Requests, MetricType::FtHtml);
        let pdf = super::window_sum(item, &ctx.months, MetricCategory::Requests, MetricType::FtPdf);
        out.line(&format_row(
            &identity,
            None,
            &series,
            TotalsPlacement::BeforeMonths,
            &[html, pdf],
        ));
    }
    Ok(())
}

/// JR2: turnaways and no-license denials per journal
pub(super) fn write_jr2(
    out: &mut CsvText,
    report: &SushiReport,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    out.line(&format!(
        "{},Access Denied Category,Reporting Period Total{}",
        JOURNAL_COLUMNS,
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        let identity = journal_identity(item, journal_ids(ctx, item)?);
        write_rows(out, ctx, item, &identity, &DENIALS, TotalsPlacement::BeforeMonths);
    }
    Ok(())
}

/// JR5: full-text requests over the whole range, one column per year of publication
///
/// Columns are the distinct YOP values of the report, the empty one included,
/// in descending [`yop_key`] order. Performance items sharing a YOP are summed;
/// the empty-YOP column never carries counts.
pub(super) fn write_jr5(
    out: &mut CsvText,
    report: &SushiReport,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    let mut years: Vec<&str> = report_items(report)
        .flat_map(|(_, item)| item.performance.iter())
        .map(|perf| perf.yop.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    years.sort_by_cached_key(|yop| Reverse(yop_key(yop)));

    let mut header = JOURNAL_COLUMNS.to_string();
    for year in &years {
        header.push_str(",YOP ");
        header.push_str(year);
    }
    out.line(&header);

    let (start, end) = (ctx.request.start, ctx.request.end);
    for (_, item) in report_items(report) {
        let mut row = journal_identity(item, journal_ids(ctx, item)?).join(",");

        let mut by_year: BTreeMap<&str, u64> = BTreeMap::new();
        for perf in item.performance.iter().filter(|perf| !perf.yop.is_empty()) {
            let count = perf
                .metrics
                .try_get(start, end, MetricCategory::Requests)
                .and_then(|metric| metric.first_of(MetricType::FtTotal))
                .map(|instance| instance.count);
            if let Some(count) = count {
                let total = by_year.entry(perf.yop.as_str()).or_default();
                *total = total.saturating_add(count);
            }
        }

        for year in &years {
            row.push(',');
            if let Some(count) = by_year.get(year) {
                row.push_str(&count.to_string());
            }
        }
        out.line(&row);
    }
    Ok(())
}

/// Collation key for YOP labels
///
/// Characters rank punctuation and spaces below digits, digits below letters,
/// letters case-insensitively. The empty label sorts lowest, so descending
/// order gives `2010`, `2005`, `<= 1999`, then the empty label.
fn yop_key(yop: &str) -> Vec<(u8, char)> {
    yop.chars()
        .map(|c| {
            let class = if c.is_alphabetic() {
                2
            } else if c.is_numeric() {
                1
            } else {
                0
            };
            (class, c.to_lowercase().next().unwrap_or(c))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::config::{RenderRequest, ReportMonth};
    use crate::render::render;
    use crate::types::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn report(report_type: ReportType, items: Vec<ReportItem>) -> SushiReport {
        SushiReport {
            report_type,
            release: "4".to_string(),
            reports: vec![CounterReport {
                customers: vec![CustomerReport {
                    id: "LIB".to_string(),
                    items,
                    ..Default::default()
                }],
                ..Default::default()
            }],
            exceptions: Vec::new(),
        }
    }

    fn performance(
        yop: &str,
        start: NaiveDate,
        end: NaiveDate,
        category: MetricCategory,
        counts: &[(MetricType, u64)],
    ) -> PerformanceItem {
        let mut perf = PerformanceItem::new(yop);
        let metric = perf.metrics.get_or_create(start, end, category);
        for &(metric_type, count) in counts {
            metric.instances.push(MetricInstance { metric_type, count });
        }
        perf
    }

    fn journal(name: &str) -> ReportItem {
        let mut item = ReportItem::new(ItemKind::Journal, name);
        item.publisher = "Pub, Inc".to_string();
        item.platform = "Plat".to_string();
        item
    }

    #[test]
    fn test_jr2_denial_rows() {
        let feb = ReportMonth::containing(date(2023, 2, 1));
        let mut item = journal("Denied Journal");
        item.performance.push(performance(
            "",
            feb.first,
            feb.last,
            MetricCategory::AccessDenied,
            &[(MetricType::NoLicense, 2), (MetricType::Turnaway, 5)],
        ));

        let request = RenderRequest::new(date(2023, 1, 1), date(2023, 2, 1)).unwrap();
        let csv = render(&report(ReportType::JR2, vec![item]), ReportType::JR2, &request).unwrap();
        let lines: Vec<&str> = csv.lines().skip(6).collect();

        assert_eq!(
            lines,
            vec![
                ",Publisher,Platform,Journal DOI,Proprietary Identifier,Print ISSN,Online ISSN,Access Denied Category,Reporting Period Total,Jan-2023,Feb-2023",
                "Denied Journal,\"Pub, Inc\",Plat,,,,,Access denied: concurrent/simultaneous user license limit exceeded,5,,5",
                "Denied Journal,\"Pub, Inc\",Plat,,,,,Access denied: content item not licensed,2,,2",
            ]
        );
    }

    #[test]
    fn test_jr5_yop_columns() {
        let (start, end) = (date(2023, 1, 1), date(2023, 12, 31));
        let mut item = journal("Archive Journal");
        item.performance.push(performance("2005", start, end, MetricCategory::Requests, &[(MetricType::FtTotal, 3)]));
        item.performance.push(performance("<= 1999", start, end, MetricCategory::Requests, &[(MetricType::FtTotal, 7)]));
        item.performance.push(performance("2005", start, end, MetricCategory::Requests, &[(MetricType::FtTotal, 2)]));
        item.performance.push(performance("2010", start, end, MetricCategory::Requests, &[(MetricType::FtPdf, 9)]));
        item.performance.push(performance("", start, end, MetricCategory::Requests, &[(MetricType::FtTotal, 100)]));

        let request = RenderRequest::new(start, end).unwrap();
        let csv = render(&report(ReportType::JR5, vec![item]), ReportType::JR5, &request).unwrap();
        let lines: Vec<&str> = csv.lines().skip(6).collect();

        assert_eq!(
            lines,
            vec![
                ",Publisher,Platform,Journal DOI,Proprietary Identifier,Print ISSN,Online ISSN,YOP 2010,YOP 2005,YOP <= 1999,YOP ",
                "Archive Journal,\"Pub, Inc\",Plat,,,,,,5,7,",
            ]
        );
    }

    #[test]
    fn test_jr5_yop_order() {
        let mut labels = vec!["", "<= 1999", "2010", "1999-2001", "2005"];
        labels.sort_by_cached_key(|yop| std::cmp::Reverse(super::yop_key(yop)));
        assert_eq!(labels, vec!["2010", "2005", "1999-2001", "<= 1999", ""]);
    }

    #[test]
    fn test_jr5_totals_saturate() {
        let (start, end) = (date(2023, 1, 1), date(2023, 2, 28));
        let mut item = journal("Busy Journal");
        for _ in 0..2 {
            item.performance.push(performance(
                "2020",
                start,
                end,
                MetricCategory::Requests,
                &[(MetricType::FtTotal, u64::MAX)],
            ));
        }

        let request = RenderRequest::new(start, end).unwrap();
        let csv = render(&report(ReportType::JR5, vec![item]), ReportType::JR5, &request).unwrap();
        assert_eq!(
            csv.lines().last().unwrap(),
            format!("Busy Journal,\"Pub, Inc\",Plat,,,,,{}", u64::MAX)
        );
    }

    #[test]
    fn test_journal_layout_rejects_book_items() {
        let item = ReportItem::new(ItemKind::Book, "A Book");
        let request = RenderRequest::new(date(2023, 1, 1), date(2023, 1, 1))
            .unwrap()
            .with_customer("LIB");
        match render(&report(ReportType::JR1, vec![item]), ReportType::JR1, &request) {
            Err(RenderError::ItemVariantMismatch { report_type, customer, item, expected, found }) => {
                assert_eq!(report_type, ReportType::JR1);
                assert_eq!(customer, "LIB");
                assert_eq!(item, "A Book");
                assert_eq!(expected, ItemKind::Journal);
                assert_eq!(found, ItemKind::Book);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_jr1goa_shares_jr1_rows() {
        let jan = ReportMonth::containing(date(2023, 1, 1));
        let mut item = journal("Open Journal");
        item.performance.push(performance(
            "",
            jan.first,
            jan.last,
            MetricCategory::Requests,
            &[(MetricType::FtTotal, 4), (MetricType::FtPdf, 4)],
        ));
        let request = RenderRequest::new(jan.first, jan.last).unwrap();
        let csv = render(&report(ReportType::JR1GOA, vec![item]), ReportType::JR1GOA, &request).unwrap();

        assert!(csv.starts_with("Journal Report 1 GOA (R4),"));
        assert!(csv.ends_with("Open Journal,\"Pub, Inc\",Plat,,,,,4,0,4,4\n"));
    }
}
