//! Render configuration types
//!
//! Everything a renderer needs besides the decoded report: the inclusive month
//! range, the customer code printed in the preamble and the "Date run" stamp.
//! These are passed explicitly to every render call; there is no process-wide
//! state.

use crate::types::RenderError;
use chrono::{Datelike, Days, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Parameters for one render call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// First day of the first reported month
    pub start: NaiveDate,
    /// Last day of the last reported month
    pub end: NaiveDate,
    /// Customer (library) code printed under the report title
    #[serde(default)]
    pub customer_code: String,
    /// Date printed on the "Date run" line
    #[serde(default = "today")]
    pub run_date: NaiveDate,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl RenderRequest {
    /// Create a request covering the whole months from `start` to `end`
    ///
    /// Both dates may fall anywhere inside their month; `start` is moved to
    /// the first day of its month and `end` to the last day of its month.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RenderError> {
        let start = first_of_month(start);
        let end = last_of_month(end);
        if end < start {
            return Err(RenderError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            customer_code: String::new(),
            run_date: today(),
        })
    }

    /// The calendar month before `today`
    pub fn previous_month(today: NaiveDate) -> Self {
        let this_month = first_of_month(today);
        let start = this_month
            .checked_sub_months(Months::new(1))
            .unwrap_or(this_month);
        Self {
            start,
            end: last_of_month(start),
            customer_code: String::new(),
            run_date: today,
        }
    }

    /// Builder method: set the customer code
    pub fn with_customer(mut self, code: impl Into<String>) -> Self {
        self.customer_code = code.into();
        self
    }

    /// Builder method: set the "Date run" stamp
    pub fn with_run_date(mut self, date: NaiveDate) -> Self {
        self.run_date = date;
        self
    }

    /// Calendar months in the range, in order
    pub fn months(&self) -> Vec<ReportMonth> {
        let mut months = Vec::new();
        let mut first = first_of_month(self.start);
        while first <= self.end {
            months.push(ReportMonth::containing(first));
            first = match first.checked_add_months(Months::new(1)) {
                Some(next) => next,
                None => break,
            };
        }
        months
    }
}

/// One calendar month as a closed date window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportMonth {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl ReportMonth {
    /// The month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: first_of_month(date),
            last: last_of_month(date),
        }
    }
}

/// First day of the month containing `date`
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Last day of the month containing `date`
pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_is_month_aligned() {
        let request = RenderRequest::new(date(2023, 1, 17), date(2023, 2, 3)).unwrap();
        assert_eq!(request.start, date(2023, 1, 1));
        assert_eq!(request.end, date(2023, 2, 28));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let result = RenderRequest::new(date(2023, 3, 1), date(2023, 2, 1));
        assert!(matches!(result, Err(RenderError::InvalidRange { .. })));
    }

    #[test]
    fn test_months_cross_year_boundary() {
        let request = RenderRequest::new(date(2023, 11, 1), date(2024, 2, 1)).unwrap();
        let months = request.months();
        assert_eq!(months.len(), 4);
        assert_eq!(months[0].first, date(2023, 11, 1));
        assert_eq!(months[0].last, date(2023, 11, 30));
        assert_eq!(months[3].first, date(2024, 2, 1));
        assert_eq!(months[3].last, date(2024, 2, 29));
    }

    #[test]
    fn test_previous_month() {
        let request = RenderRequest::previous_month(date(2024, 1, 15));
        assert_eq!(request.start, date(2023, 12, 1));
        assert_eq!(request.end, date(2023, 12, 31));
        assert_eq!(request.run_date, date(2024, 1, 15));
    }

    #[test]
    fn test_builder_methods() {
        let request = RenderRequest::new(date(2023, 1, 1), date(2023, 1, 1))
            .unwrap()
            .with_customer("ACME")
            .with_run_date(date(2023, 2, 5));
        assert_eq!(request.customer_code, "ACME");
        assert_eq!(request.run_date, date(2023, 2, 5));
        assert_eq!(request.months().len(), 1);
    }
}
