//! Book layouts: BR1 to BR5

use super::{
    report_items, title_columns, write_rows, CsvText, RenderContext, RowSpec, TotalsPlacement,
    DENIALS, FULL_TEXT, MONTH_LABEL,
};
use crate::types::{
    BookIdentifiers, ItemIdentifiers, ItemKind, MetricCategory, MetricType, RenderError,
    ReportItem, ReportType, SushiReport,
};

/// BR5 labels differ from the database layouts
const BOOK_SEARCHES: [RowSpec; 2] = [
    RowSpec {
        label: Some("Regular Searches"),
        category: MetricCategory::Searches,
        metric_type: MetricType::SearchReg,
    },
    RowSpec {
        label: Some("Searches: federated and automated"),
        category: MetricCategory::Searches,
        metric_type: MetricType::SearchFed,
    },
];

fn book_ids<'i>(
    ctx: &RenderContext<'_>,
    item: &'i ReportItem,
) -> Result<&'i BookIdentifiers, RenderError> {
    match &item.identifiers {
        ItemIdentifiers::Book(ids) => Ok(ids),
        _ => Err(ctx.mismatch(item, ItemKind::Book)),
    }
}

fn book_identity(item: &ReportItem, ids: &BookIdentifiers) -> Vec<String> {
    let mut columns = title_columns(item);
    columns.extend([
        ids.doi.clone(),
        ids.proprietary.clone(),
        ids.print_isbn.clone(),
        ids.online_issn.clone(),
    ]);
    columns
}

/// BR1 and BR2: successful title or section requests
pub(super) fn write_br1(
    out: &mut CsvText,
    report: &SushiReport,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    let month_format = if ctx.report_type == ReportType::BR2 {
        "%b-%y"
    } else {
        MONTH_LABEL
    };
    out.line(&format!(
        ",Publisher,Platform,DOI,Proprietary Identifier,Print ISBN,Online ISSN,Reporting Period Total{}",
        ctx.month_columns(month_format)
    ));

    for (_, item) in report_items(report) {
        let identity = book_identity(item, book_ids(ctx, item)?);
        write_rows(out, ctx, item, &identity, &[FULL_TEXT], TotalsPlacement::BeforeMonths);
    }
    Ok(())
}

/// BR3: access denied per title
pub(super) fn write_br3(
    out: &mut CsvText,
    report: &SushiReport,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    out.line(&format!(
        ",Publisher,Platform,Book DOI,Proprietary Identifier,ISBN,ISSN,Access Denied Category,Reporting Period Total{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        let identity = book_identity(item, book_ids(ctx, item)?);
        write_rows(out, ctx, item, &identity, &DENIALS, TotalsPlacement::BeforeMonths);
    }
    Ok(())
}

/// BR4: access denied per platform
pub(super) fn write_br4(
    out: &mut CsvText,
    report: &SushiReport,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    out.line(&format!(
        ",Publisher,Platform,Access Denied Category,Reporting Period Total{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        book_ids(ctx, item)?;
        write_rows(out, ctx, item, &title_columns(item), &DENIALS, TotalsPlacement::BeforeMonths);
    }
    Ok(())
}

/// BR5: searches per title
pub(super) fn write_br5(
    out: &mut CsvText,
    report: &SushiReport,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    out.line(&format!(
        ",Publisher,Platform,Book DOI,Proprietary Identifier,ISBN,ISSN,User Activity,Reporting Period Total{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        let identity = book_identity(item, book_ids(ctx, item)?);
        write_rows(out, ctx, item, &identity, &BOOK_SEARCHES, TotalsPlacement::BeforeMonths);
    }
    Ok(())
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

    fn book_report(report_type: ReportType, category: MetricCategory, counts: &[(MetricType, u64)]) -> SushiReport {
        let jan = ReportMonth::containing(date(2023, 1, 1));
        let mut item = ReportItem::new(ItemKind::Book, "Rust, Second Edition");
        item.publisher = "Crab Press".to_string();
        item.platform = "Shelf".to_string();
        item.identifiers = ItemIdentifiers::Book(BookIdentifiers {
            doi: "10.1/rust".to_string(),
            proprietary: "RS2".to_string(),
            print_isbn: "978-1".to_string(),
            online_issn: "2000-0001".to_string(),
        });
        let mut perf = PerformanceItem::new("");
        let metric = perf.metrics.get_or_create(jan.first, jan.last, category);
        for &(metric_type, count) in counts {
            metric.instances.push(MetricInstance { metric_type, count });
        }
        item.performance.push(perf);

        SushiReport {
            report_type,
            release: "4".to_string(),
            reports: vec![CounterReport {
                customers: vec![CustomerReport {
                    items: vec![item],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            exceptions: Vec::new(),
        }
    }

    fn data_lines(csv: &str) -> Vec<String> {
        csv.lines().skip(8).map(str::to_string).collect()
    }

    fn january() -> RenderRequest {
        RenderRequest::new(date(2023, 1, 1), date(2023, 1, 1)).unwrap()
    }

    #[test]
    fn test_br1_identifier_columns() {
        let report = book_report(ReportType::BR1, MetricCategory::Requests, &[(MetricType::FtTotal, 12)]);
        let csv = render(&report, ReportType::BR1, &january()).unwrap();
        assert_eq!(
            data_lines(&csv),
            vec!["\"Rust, Second Edition\",Crab Press,Shelf,10.1/rust,RS2,978-1,2000-0001,12,12"]
        );
    }

    #[test]
    fn test_br4_has_no_identifier_columns() {
        let report = book_report(ReportType::BR4, MetricCategory::AccessDenied, &[(MetricType::Turnaway, 1)]);
        let csv = render(&report, ReportType::BR4, &january()).unwrap();
        assert_eq!(
            data_lines(&csv),
            vec![
                "\"Rust, Second Edition\",Crab Press,Shelf,Access denied: concurrent/simultaneous user license limit exceeded,1,1",
                "\"Rust, Second Edition\",Crab Press,Shelf,Access denied: content item not licensed,0,",
            ]
        );
    }

    #[test]
    fn test_br5_search_rows() {
        let report = book_report(
            ReportType::BR5,
            MetricCategory::Searches,
            &[(MetricType::SearchFed, 3), (MetricType::SearchReg, 8)],
        );
        let csv = render(&report, ReportType::BR5, &january()).unwrap();
        assert_eq!(
            data_lines(&csv),
            vec![
                "\"Rust, Second Edition\",Crab Press,Shelf,10.1/rust,RS2,978-1,2000-0001,Regular Searches,8,8",
                "\"Rust, Second Edition\",Crab Press,Shelf,10.1/rust,RS2,978-1,2000-0001,Searches: federated and automated,3,3",
            ]
        );
    }

    #[test]
    fn test_br2_short_month_labels() {
        let report = book_report(ReportType::BR2, MetricCategory::Requests, &[(MetricType::FtTotal, 1)]);
        let csv = render(&report, ReportType::BR2, &january()).unwrap();
        let header = csv.lines().nth(7).unwrap();
        assert!(header.ends_with("Reporting Period Total,Jan-23"));
    }
}
