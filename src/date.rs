// 📅 Dates - calendar dates and their column format

use crate::error::{LedgerError, LedgerResult};
use chrono::{Local, NaiveDate};

/// Column format of dates in listing and index files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shown to users when a date can't be read.
pub const SAMPLE_DATE: &str = "2018-02-28";

/// Builds a calendar date, rejecting impossible ones (e.g. February 30).
pub fn ymd(year: i32, month: u32, day: u32) -> LedgerResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(LedgerError::InvalidDate { year, month, day })
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(text: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|_| {
        LedgerError::InvalidDateFormat {
            text: text.to_string(),
        }
    })
}
