// Attendance Classifier
//
// Pure, total function over all inputs. Invalid or missing check-in
// timestamps degrade to `Absent` with zeroed derived fields; classification
// never reports an error.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Weekday};
use rollcall_common::{AttendanceStatus, PolicyConfig};

pub const MS_PER_HOUR: f64 = 3_600_000.0;
const FOUR_HOURS_MS: i64 = 4 * 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Default)]
pub struct ClassifyInput {
    pub check_in: Option<NaiveDateTime>,
    /// Worked duration; negative values are clamped to zero.
    pub duration_ms: i64,
    /// Manual-override path: status is taken verbatim, skipping the
    /// computed classification.
    pub manual_status: Option<AttendanceStatus>,
    pub auto_checkout: bool,
    pub auto_checkout_extra_approved: Option<bool>,
    /// Admin-supplied extra-worked value; wins over the computed accrual.
    pub explicit_extra_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: AttendanceStatus,
    pub day_credit: f64,
    pub late_countable: bool,
    pub extra_worked_ms: i64,
}

impl Classification {
    fn absent() -> Self {
        Self {
            status: AttendanceStatus::Absent,
            day_credit: 0.0,
            late_countable: false,
            extra_worked_ms: 0,
        }
    }

    fn of(status: AttendanceStatus, late_countable: bool, extra_worked_ms: i64) -> Self {
        let day_credit = status.day_credit();
        Self { status, day_credit, late_countable, extra_worked_ms }
    }
}

pub fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Minutes worked outside the standard window: early arrival before the
/// late cutoff plus time past the early-departure threshold, each floored
/// at zero. Suppressed entirely when an auto-checkout happened without an
/// explicit extra-hours approval.
pub fn extra_worked_minutes(
    check_in_minutes: i64,
    check_out_minutes: Option<i64>,
    auto_checkout: bool,
    auto_checkout_extra_approved: Option<bool>,
    policy: &PolicyConfig,
) -> i64 {
    if auto_checkout && auto_checkout_extra_approved != Some(true) {
        return 0;
    }
    let early = (i64::from(policy.late_cutoff_minutes) - check_in_minutes).max(0);
    let stayed = check_out_minutes
        .map(|out| (out - i64::from(policy.early_departure_minutes)).max(0))
        .unwrap_or(0);
    early + stayed
}

pub fn classify(input: &ClassifyInput, policy: &PolicyConfig) -> Classification {
    let duration_ms = input.duration_ms.max(0);

    let standard_extra = |check_in: NaiveDateTime| -> i64 {
        let check_out = check_in + Duration::milliseconds(duration_ms);
        extra_worked_minutes(
            minutes_of_day(check_in.time()),
            Some(minutes_of_day(check_out.time())),
            input.auto_checkout,
            input.auto_checkout_extra_approved,
            policy,
        ) * MS_PER_MINUTE
    };

    if let Some(status) = &input.manual_status {
        let extra = input
            .explicit_extra_ms
            .unwrap_or_else(|| input.check_in.map(standard_extra).unwrap_or(0))
            .max(0);
        return Classification::of(
            status.clone(),
            *status == AttendanceStatus::Late,
            extra,
        );
    }

    let Some(check_in) = input.check_in else {
        return Classification::absent();
    };

    // Non-working days (Sundays and 2nd/4th Saturdays) are always a full
    // present day, with no late mark and no extra-worked accrual.
    if check_in.weekday() == Weekday::Sun || policy.is_saturday_off(check_in.date()) {
        return Classification::of(AttendanceStatus::Present, false, 0);
    }

    let check_in_minutes = minutes_of_day(check_in.time());
    let net_hours = duration_ms as f64 / MS_PER_HOUR;

    if check_in_minutes >= i64::from(policy.afternoon_start_minutes) {
        let status = if net_hours >= 8.0 {
            AttendanceStatus::Present
        } else if net_hours >= 4.0 {
            AttendanceStatus::HalfDay
        } else {
            AttendanceStatus::Absent
        };
        let extra = if net_hours > 4.0 {
            duration_ms - FOUR_HOURS_MS
        } else {
            standard_extra(check_in)
        };
        return Classification::of(status, false, extra.max(0));
    }

    // Morning entry, evaluated by descending cutoff.
    let (status, late_countable) = if check_in_minutes > i64::from(policy.post_noon_end_minutes) {
        (AttendanceStatus::Absent, false)
    } else if check_in_minutes > i64::from(policy.late_end_minutes)
        || check_in_minutes > i64::from(policy.minor_late_end_minutes)
    {
        let status =
            if net_hours >= 4.0 { AttendanceStatus::HalfDay } else { AttendanceStatus::Absent };
        (status, false)
    } else if check_in_minutes > i64::from(policy.late_cutoff_minutes) {
        if net_hours >= 8.0 {
            (AttendanceStatus::PresentLateWaived, false)
        } else {
            (AttendanceStatus::Late, true)
        }
    } else {
        (AttendanceStatus::Present, false)
    };

    Classification::of(status, late_countable, standard_extra(check_in))
}
