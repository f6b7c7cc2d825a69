//! Consortium layouts: CR1, CR2 and CR3
//!
//! Rows are prefixed with the member customer they belong to.

use super::{
    format_row, report_items, title_columns, window_sum, wrap_comma, write_rows, CsvText,
    MonthlySeries, RenderContext, TotalsPlacement, ACTIVITY, FULL_TEXT, MONTH_LABEL,
};
use crate::types::{
    CustomerReport, ItemIdentifiers, ItemKind, MetricCategory, MetricType, RenderError,
    ReportItem, SushiReport,
};

/// Member customer name followed by name, publisher and platform
fn member_columns(customer: &CustomerReport, item: &ReportItem) -> Vec<String> {
    let mut columns = vec![wrap_comma(&customer.name)];
    columns.extend(title_columns(item));
    columns
}

/// CR1: full-text requests per member and title, with HTML and PDF totals
pub(super) fn write_cr1(
    out: &mut CsvText,
    report: &SushiReport,
    ctx: &RenderContext<'_>,
) -> Result<(), RenderError> {
    out.line(&format!(
        "Customer,Publisher,Platform,Title,DOI,Proprietary Identifier,Print ISSN,Online ISSN,\
         Reporting Period Total,Reporting Period HTML,Reporting Period PDF{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (customer, item) in report_items(report) {
        let ids = match &item.identifiers {
            ItemIdentifiers::Consortium(ids) => ids,
            _ => return Err(ctx.mismatch(item, ItemKind::Consortium)),
        };
        let identity = vec![
            wrap_comma(&customer.id),
            wrap_comma(&item.publisher),
            wrap_comma(&item.platform),
            wrap_comma(&item.name),
            ids.doi.clone(),
            ids.proprietary.clone(),
            ids.print_issn.clone(),
            ids.online_issn.clone(),
        ];

        let series = MonthlySeries::collect(item, &FULL_TEXT, &ctx.months);
        let html = window_sum(item, &ctx.months, MetricCategory::Requests, MetricType::FtHtml);
        let pdf = window_sum(item, &ctx.months, MetricCategory::Requests, MetricType::FtPdf);
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

/// CR2: DB1 activity rows per member and database
pub(super) fn write_cr2(out: &mut CsvText, report: &SushiReport, ctx: &RenderContext<'_>) {
    out.line(&format!(
        "Customer,Publisher,Platform,User Activity,Reporting Period Total{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (customer, item) in report_items(report) {
        let identity = member_columns(customer, item);
        write_rows(out, ctx, item, &identity, &ACTIVITY, TotalsPlacement::BeforeMonths);
    }
}

/// CR3: multimedia requests per member and collection
pub(super) fn write_cr3(out: &mut CsvText, report: &SushiReport, ctx: &RenderContext<'_>) {
    out.line(&format!(
        "Customer,Collection,Content Provider,Platform,Reporting Period Total{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (customer, item) in report_items(report) {
        let identity = member_columns(customer, item);
        write_rows(out, ctx, item, &identity, &[FULL_TEXT], TotalsPlacement::BeforeMonths);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{RenderRequest, ReportMonth};
    use crate::render::render;
    use crate::types::*;
    use chrono::NaiveDate;

    fn jan() -> ReportMonth {
        ReportMonth::containing(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
    }

    fn member(id: &str, name: &str, item: ReportItem) -> CustomerReport {
        CustomerReport {
            id: id.to_string(),
            name: name.to_string(),
            items: vec![item],
            ..Default::default()
        }
    }

    fn item(kind: ItemKind, name: &str, category: MetricCategory, counts: &[(MetricType, u64)]) -> ReportItem {
        let mut item = ReportItem::new(kind, name);
        item.publisher = "Pub".to_string();
        item.platform = "Plat".to_string();
        let mut perf = PerformanceItem::new("");
        let metric = perf.metrics.get_or_create(jan().first, jan().last, category);
        for &(metric_type, count) in counts {
            metric.instances.push(MetricInstance { metric_type, count });
        }
        item.performance.push(perf);
        item
    }

    fn consortium(report_type: ReportType, customers: Vec<CustomerReport>) -> SushiReport {
        SushiReport {
            report_type,
            release: "4".to_string(),
            reports: vec![CounterReport {
                customers,
                ..Default::default()
            }],
            exceptions: Vec::new(),
        }
    }

    fn body(csv: &str) -> Vec<&str> {
        csv.lines().skip(7).collect()
    }

    #[test]
    fn test_cr1_rows_per_member() {
        let mut first = item(
            ItemKind::Consortium,
            "Shared Journal",
            MetricCategory::Requests,
            &[(MetricType::FtTotal, 9), (MetricType::FtHtml, 5), (MetricType::FtPdf, 4)],
        );
        first.identifiers = ItemIdentifiers::Consortium(SerialIdentifiers {
            online_issn: "1111-2222".to_string(),
            ..Default::default()
        });
        let second = item(ItemKind::Consortium, "Shared Journal", MetricCategory::Requests, &[]);

        let report = consortium(
            ReportType::CR1,
            vec![member("M1", "Member One", first), member("M2", "Member, Two", second)],
        );
        let request = RenderRequest::new(jan().first, jan().last).unwrap();
        let csv = render(&report, ReportType::CR1, &request).unwrap();

        assert_eq!(
            body(&csv),
            vec![
                "M1,Pub,Plat,Shared Journal,,,,1111-2222,9,5,4,9",
                "M2,Pub,Plat,Shared Journal,,,,,0,0,0,",
            ]
        );
    }

    #[test]
    fn test_cr2_uses_member_name() {
        let report = consortium(
            ReportType::CR2,
            vec![member(
                "M2",
                "Member, Two",
                item(ItemKind::Generic, "DB", MetricCategory::Searches, &[(MetricType::SearchFed, 2)]),
            )],
        );
        let request = RenderRequest::new(jan().first, jan().last).unwrap();
        let csv = render(&report, ReportType::CR2, &request).unwrap();

        let lines = body(&csv);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "\"Member, Two\",DB,Pub,Plat,Searches-federated and automated,2,2");
    }

    #[test]
    fn test_cr3_accepts_any_item_variant() {
        let report = consortium(
            ReportType::CR3,
            vec![member(
                "M1",
                "Member One",
                item(ItemKind::Book, "Films", MetricCategory::Requests, &[(MetricType::FtTotal, 1)]),
            )],
        );
        let request = RenderRequest::new(jan().first, jan().last).unwrap();
        let csv = render(&report, ReportType::CR3, &request).unwrap();
        assert_eq!(body(&csv), vec!["Member One,Films,Pub,Plat,1,1"]);
    }

    #[test]
    fn test_cr1_rejects_journal_items() {
        let report = consortium(
            ReportType::CR1,
            vec![member("M1", "Member One", item(ItemKind::Journal, "J", MetricCategory::Requests, &[]))],
        );
        let request = RenderRequest::new(jan().first, jan().last).unwrap();
        assert!(matches!(
            render(&report, ReportType::CR1, &request),
            Err(RenderError::ItemVariantMismatch { expected: ItemKind::Consortium, .. })
        ));
    }
}
