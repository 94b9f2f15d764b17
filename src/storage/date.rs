//! Date literal parsing
//!
//! Dates are written as ISO `YYYY-MM-DD` strings in SQL scripts.

use chrono::NaiveDate;
use nom::bytes::complete::take_while_m_n;
use nom::character::complete::char;
use nom::combinator::{all_consuming, map_res};
use nom::sequence::tuple;
use nom::IResult;

use crate::error::{Error, Result};

fn digits<'a>(count: usize) -> impl FnMut(&'a str) -> IResult<&'a str, u32> {
    map_res(
        take_while_m_n(count, count, |c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<u32>(),
    )
}

fn year_month_day(input: &str) -> IResult<&str, (u32, u32, u32)> {
    let (rest, (year, _, month, _, day)) =
        tuple((digits(4), char('-'), digits(2), char('-'), digits(2)))(input)?;
    Ok((rest, (year, month, day)))
}

/// Parse a `YYYY-MM-DD` literal into a calendar date
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let (_, (year, month, day)) = all_consuming(year_month_day)(text.trim())
        .map_err(|_| Error::InvalidDate(text.to_string()))?;

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| Error::InvalidDate(text.to_string()))
}
