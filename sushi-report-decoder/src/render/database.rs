//! Database, platform and multimedia layouts: DB1, DB2, PR1 and MR1
//!
//! These accept items of any variant; only name, publisher and platform are
//! printed.

use super::{
    report_items, title_columns, wrap_comma, write_rows, CsvText, RenderContext, TotalsPlacement,
    ACTIVITY, DENIALS, FULL_TEXT, MONTH_LABEL,
};
use crate::types::SushiReport;

/// DB1: searches, result clicks and record views per database
pub(super) fn write_db1(out: &mut CsvText, report: &SushiReport, ctx: &RenderContext<'_>) {
    out.line(&format!(
        ",Publisher,Platform,User Activity,Reporting Period Total{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        write_rows(out, ctx, item, &title_columns(item), &ACTIVITY, TotalsPlacement::BeforeMonths);
    }
}

/// DB2: access denied per database; the period total follows the months
pub(super) fn write_db2(out: &mut CsvText, report: &SushiReport, ctx: &RenderContext<'_>) {
    out.line(&format!(
        ",Publisher,Platform,Access Denied Category{},Reporting Period Total",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        write_rows(out, ctx, item, &title_columns(item), &DENIALS, TotalsPlacement::AfterMonths);
    }
}

/// PR1: DB1 activity rows keyed by platform
pub(super) fn write_pr1(out: &mut CsvText, report: &SushiReport, ctx: &RenderContext<'_>) {
    out.line(&format!(
        "Platform,Publisher,User Activity,Reporting Period Total{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        let identity = [wrap_comma(&item.platform), wrap_comma(&item.publisher)];
        write_rows(out, ctx, item, &identity, &ACTIVITY, TotalsPlacement::BeforeMonths);
    }
}

/// MR1: multimedia full content unit requests per collection
pub(super) fn write_mr1(out: &mut CsvText, report: &SushiReport, ctx: &RenderContext<'_>) {
    out.line(&format!(
        "Collection,Content Provider,Platform,Reporting Period Total{}",
        ctx.month_columns(MONTH_LABEL)
    ));

    for (_, item) in report_items(report) {
        write_rows(out, ctx, item, &title_columns(item), &[FULL_TEXT], TotalsPlacement::BeforeMonths);
    }
}
