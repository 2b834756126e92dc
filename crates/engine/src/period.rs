//! Named reporting periods resolved against an explicit "today".

use chrono::{Datelike, Duration, Months, NaiveDate};
use pacing_core::{PacingError, PacingResult};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    ThisMonth,
    NextMonth,
    ThisQuarter,
    NextQuarter,
    ThisYear,
    NextYear,
    Custom,
}

impl FromStr for Period {
    type Err = PacingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "this_month" => Ok(Period::ThisMonth),
            "next_month" => Ok(Period::NextMonth),
            "this_quarter" => Ok(Period::ThisQuarter),
            "next_quarter" => Ok(Period::NextQuarter),
            "this_year" => Ok(Period::ThisYear),
            "next_year" => Ok(Period::NextYear),
            "custom" => Ok(Period::Custom),
            other => Err(PacingError::InvalidPeriod(other.to_string())),
        }
    }
}

impl Period {
    /// Resolve to a concrete inclusive `[start, end]` range. `Custom`
    /// passes the explicit bounds through and requires both.
    pub fn resolve(
        self,
        today: NaiveDate,
        custom_start: Option<NaiveDate>,
        custom_end: Option<NaiveDate>,
    ) -> PacingResult<(NaiveDate, NaiveDate)> {
        match self {
            Period::Custom => match (custom_start, custom_end) {
                (Some(start), Some(end)) => Ok((start, end)),
                _ => Err(PacingError::InvalidPeriod(
                    "custom period requires explicit start and end".to_string(),
                )),
            },
            Period::ThisMonth => Ok(month_bounds(today)),
            Period::NextMonth => Ok(month_bounds(first_of_month(today) + Months::new(1))),
            Period::ThisQuarter => Ok(quarter_bounds(today.year(), quarter_of(today))),
            Period::NextQuarter => {
                let (year, quarter) = match quarter_of(today) {
                    4 => (today.year() + 1, 1),
                    q => (today.year(), q + 1),
                };
                Ok(quarter_bounds(year, quarter))
            }
            Period::ThisYear => Ok(year_bounds(today.year())),
            Period::NextYear => Ok(year_bounds(today.year() + 1)),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    ymd(date.year(), date.month(), 1)
}

fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = first_of_month(date);
    (first, first + Months::new(1) - Duration::days(1))
}

/// 1-based quarter: Jan-Mar = 1 ... Oct-Dec = 4.
fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

fn quarter_bounds(year: i32, quarter: u32) -> (NaiveDate, NaiveDate) {
    let first = ymd(year, (quarter - 1) * 3 + 1, 1);
    (first, first + Months::new(3) - Duration::days(1))
}

fn year_bounds(year: i32) -> (NaiveDate, NaiveDate) {
    (ymd(year, 1, 1), ymd(year, 12, 31))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
