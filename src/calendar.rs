//! CF calendar handling for time coordinates.
//!
//! Climate model output frequently uses `noleap`, `all_leap` or `360_day`
//! calendars. Charts only understand the standard (proleptic Gregorian)
//! calendar, so such axes are converted aligning on the year: in a `360_day`
//! source the day-of-year is rescaled to the target year length; dates that do
//! not exist in the standard calendar (e.g. Feb 29 of an `all_leap` non-leap
//! year) are dropped.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{PlotError, Result};

/// Supported CF calendars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Calendar {
    Standard,
    NoLeap,
    AllLeap,
    Day360,
}

impl Calendar {
    /// Parse a CF `calendar` attribute value.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Ok(Calendar::Standard),
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            other => Err(PlotError::value(format!("unsupported calendar '{other}'"))),
        }
    }

    pub fn days_in_year(self, year: i32) -> u32 {
        match self {
            Calendar::Standard => {
                if is_leap(year) {
                    366
                } else {
                    365
                }
            }
            Calendar::NoLeap => 365,
            Calendar::AllLeap => 366,
            Calendar::Day360 => 360,
        }
    }

    fn days_in_month(self, year: i32, month: u32) -> u32 {
        match self {
            Calendar::Day360 => 30,
            _ => {
                const DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
                let leap = match self {
                    Calendar::AllLeap => true,
                    Calendar::NoLeap => false,
                    _ => is_leap(year),
                };
                if month == 2 && leap {
                    29
                } else {
                    DAYS[(month.clamp(1, 12) - 1) as usize]
                }
            }
        }
    }
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// A datetime expressed in an arbitrary CF calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CfDatetime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CfDatetime {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    pub fn with_time(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    /// 1-based day of year in `calendar`.
    pub fn day_of_year(&self, calendar: Calendar) -> u32 {
        let before: u32 = (1..self.month)
            .map(|m| calendar.days_in_month(self.year, m))
            .sum();
        before + self.day
    }

    fn time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, self.second)
    }
}

/// Convert one CF datetime to the standard calendar. `None` means the date
/// has no counterpart and must be dropped.
pub fn to_standard(dt: &CfDatetime, calendar: Calendar) -> Option<NaiveDateTime> {
    let time = dt.time()?;
    match calendar {
        Calendar::Day360 => {
            let src_len = calendar.days_in_year(dt.year) as i64;
            let tgt_len = Calendar::Standard.days_in_year(dt.year) as i64;
            let doy0 = dt.day_of_year(calendar) as i64 - 1;
            let new0 = ((doy0 * tgt_len) as f64 / src_len as f64)
                .round()
                .min((tgt_len - 1) as f64) as i64;
            let jan1 = NaiveDate::from_ymd_opt(dt.year, 1, 1)?;
            Some((jan1 + Duration::days(new0)).and_time(time))
        }
        _ => NaiveDate::from_ymd_opt(dt.year, dt.month, dt.day).map(|d| d.and_time(time)),
    }
}

/// Convert a whole axis. Returns the converted datetimes and the positions
/// that survived conversion.
pub fn convert_axis(dates: &[CfDatetime], calendar: Calendar) -> (Vec<NaiveDateTime>, Vec<usize>) {
    let mut out = Vec::with_capacity(dates.len());
    let mut keep = Vec::with_capacity(dates.len());
    for (i, d) in dates.iter().enumerate() {
        if let Some(ndt) = to_standard(d, calendar) {
            out.push(ndt);
            keep.push(i);
        }
    }
    (out, keep)
}

/// Fractional year used as the numeric x position of a datetime.
pub fn decimal_year(dt: &NaiveDateTime) -> f64 {
    let year = dt.year();
    let len = Calendar::Standard.days_in_year(year) as f64;
    let secs = dt.num_seconds_from_midnight() as f64 / 86_400.0;
    year as f64 + (dt.ordinal0() as f64 + secs) / len
}

/// Inverse of [`decimal_year`], to the nearest second.
pub fn from_decimal_year(x: f64) -> Option<NaiveDateTime> {
    let year = x.floor() as i32;
    let len = Calendar::Standard.days_in_year(year) as f64;
    let secs = ((x - year as f64) * len * 86_400.0).round() as i64;
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
    Some(jan1 + Duration::seconds(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aliases() {
        assert_eq!(Calendar::parse("365_day").unwrap(), Calendar::NoLeap);
        assert_eq!(Calendar::parse("Gregorian").unwrap(), Calendar::Standard);
        assert!(Calendar::parse("julian-ish").is_err());
    }

    #[test]
    fn day360_is_rescaled_on_year() {
        // Day 360 of a 360-day year lands on the last day of a standard year.
        let d = CfDatetime::new(2001, 12, 30);
        let out = to_standard(&d, Calendar::Day360).unwrap();
        assert_eq!(out.date(), NaiveDate::from_ymd_opt(2001, 12, 31).unwrap());

        // Feb 30 exists in 360_day and maps to a real date.
        let feb30 = CfDatetime::new(2001, 2, 30);
        assert!(to_standard(&feb30, Calendar::Day360).is_some());
    }

    #[test]
    fn all_leap_feb29_dropped_in_common_year() {
        let dates = [
            CfDatetime::new(2001, 2, 28),
            CfDatetime::new(2001, 2, 29),
            CfDatetime::new(2001, 3, 1),
        ];
        let (out, keep) = convert_axis(&dates, Calendar::AllLeap);
        assert_eq!(out.len(), 2);
        assert_eq!(keep, vec![0, 2]);
    }

    #[test]
    fn decimal_year_round_trips_midyear() {
        let dt = NaiveDate::from_ymd_opt(2020, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let x = decimal_year(&dt);
        assert!(x > 2020.49 && x < 2020.51);
        assert_eq!(from_decimal_year(x).unwrap(), dt);
    }
}
