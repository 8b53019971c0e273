//! Legacy record normalization.
//!
//! Older attendance records predate the `late_countable`, `day_credit`, and
//! `extra_worked_ms` fields. Normalization runs once when a record is
//! decoded from the store, isolated from the classification path, so the
//! aggregators can rely on the fields being present.

use rollcall_common::{AttendanceLog, PolicyConfig};

use crate::classifier::minutes_of_day;

pub fn normalize_log(mut log: AttendanceLog, policy: &PolicyConfig) -> AttendanceLog {
    if log.duration_ms < 0 {
        log.duration_ms = 0;
    }
    if log.extra_worked_ms < 0 {
        log.extra_worked_ms = 0;
    }

    if log.day_credit.is_none() {
        log.day_credit = Some(log.status.day_credit());
    }

    if log.late_countable.is_none() {
        // Recompute lateness from the recorded check-in against the cutoff.
        // Leave and holiday records carry no lateness regardless of any
        // stray check-in value.
        let countable = if log.status.is_leave() || log.status.is_holiday_like() {
            false
        } else {
            log.check_in
                .map(|t| minutes_of_day(t) > i64::from(policy.late_cutoff_minutes))
                .unwrap_or(false)
        };
        log.late_countable = Some(countable);
    }

    log
}
