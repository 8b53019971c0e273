// Attendance Policy Configuration
//
// All thresholds are minutes since local midnight. The policy value is
// immutable and threaded explicitly into the classifier, session manager,
// and aggregators; nothing reads it from ambient state.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Arriving at or before this is on time (default 09:15).
    pub late_cutoff_minutes: u32,
    /// End of the minor-late band (default 10:15).
    pub minor_late_end_minutes: u32,
    /// End of the late band (default 12:00).
    pub late_end_minutes: u32,
    /// Latest entry still handled by the morning branch (default 13:00).
    pub post_noon_end_minutes: u32,
    /// Check-ins at or after this use the afternoon branch; must equal
    /// `late_end_minutes` (default 12:00).
    pub afternoon_start_minutes: u32,
    /// Departures before this are early; time past it accrues extra work
    /// (default 18:00).
    pub early_departure_minutes: u32,

    /// Late marks tolerated before a deduction block starts.
    pub late_grace_count: u32,
    /// Day units deducted per full block of countable lates.
    pub late_deduction_per_block: f64,
    /// Extra worked hours that earn one offset block.
    pub extra_hours_for_half_day_offset: f64,

    /// First month of the financial year, 1-12 (default 4 = April).
    pub financial_year_start_month: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            late_cutoff_minutes: 9 * 60 + 15,
            minor_late_end_minutes: 10 * 60 + 15,
            late_end_minutes: 12 * 60,
            post_noon_end_minutes: 13 * 60,
            afternoon_start_minutes: 12 * 60,
            early_departure_minutes: 18 * 60,
            late_grace_count: 3,
            late_deduction_per_block: 0.5,
            extra_hours_for_half_day_offset: 4.0,
            financial_year_start_month: 4,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        let ladder = [
            ("late_cutoff_minutes", self.late_cutoff_minutes),
            ("minor_late_end_minutes", self.minor_late_end_minutes),
            ("late_end_minutes", self.late_end_minutes),
            ("post_noon_end_minutes", self.post_noon_end_minutes),
            ("early_departure_minutes", self.early_departure_minutes),
        ];
        for pair in ladder.windows(2) {
            if pair[0].1 >= pair[1].1 {
                return Err(Error::InvalidPolicy(format!(
                    "{} ({}) must be less than {} ({})",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                )));
            }
        }

        if self.afternoon_start_minutes != self.late_end_minutes {
            return Err(Error::InvalidPolicy(format!(
                "afternoon_start_minutes ({}) must equal late_end_minutes ({})",
                self.afternoon_start_minutes, self.late_end_minutes
            )));
        }

        if self.late_grace_count == 0 {
            return Err(Error::InvalidPolicy("late_grace_count must be positive".to_string()));
        }
        if self.late_deduction_per_block <= 0.0 {
            return Err(Error::InvalidPolicy(
                "late_deduction_per_block must be positive".to_string(),
            ));
        }
        if self.extra_hours_for_half_day_offset <= 0.0 {
            return Err(Error::InvalidPolicy(
                "extra_hours_for_half_day_offset must be positive".to_string(),
            ));
        }
        if !(1..=12).contains(&self.financial_year_start_month) {
            return Err(Error::InvalidPolicy(format!(
                "financial_year_start_month must be 1-12, got {}",
                self.financial_year_start_month
            )));
        }

        Ok(())
    }

    /// 2nd and 4th Saturdays of the month are off.
    pub fn is_saturday_off(&self, date: NaiveDate) -> bool {
        if date.weekday() != Weekday::Sat {
            return false;
        }
        // Ordinal of this Saturday within the month: ceil(day / 7).
        let ordinal = date.day().div_ceil(7);
        ordinal == 2 || ordinal == 4
    }

    /// Inclusive bounds of the calendar month containing `today`.
    pub fn month_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = first_of_month(today.year(), today.month());
        let next = if today.month() == 12 {
            first_of_month(today.year() + 1, 1)
        } else {
            first_of_month(today.year(), today.month() + 1)
        };
        (start, prev_day(next))
    }

    /// Inclusive bounds of the financial year containing `today`. The year
    /// starts on day 1 of `financial_year_start_month` and ends the day
    /// before the same month one year later.
    pub fn financial_year_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start_year = if today.month() >= self.financial_year_start_month {
            today.year()
        } else {
            today.year() - 1
        };
        let start = first_of_month(start_year, self.financial_year_start_month);
        let end = prev_day(first_of_month(start_year + 1, self.financial_year_start_month));
        (start, end)
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Month is always validated to 1-12 before use.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn prev_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}
