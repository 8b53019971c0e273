// Stats Aggregator
//
// The fold itself is pure over an immutable slice of logs, so re-running it
// against an unchanged set always produces the same `PeriodStats`. Store
// access happens only in the window-selecting wrappers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rollcall_common::{
    collections, AttendanceLog, AttendanceStatus, PeriodStats, PolicyConfig, StatCategory,
    UserRecord,
};
use rollcall_store::{decode, DocumentStore, Filter, QueryOptions};
use tracing::{debug, warn};

use crate::cache::StatsCache;
use crate::classifier::{extra_worked_minutes, minutes_of_day};
use crate::error::Result;
use crate::legacy::normalize_log;

/// First-match-wins category for one log; `None` when the log has neither
/// a recognizable status nor a check-in time.
pub fn category_of(log: &AttendanceLog) -> Option<StatCategory> {
    match &log.status {
        AttendanceStatus::WorkFromHome => Some(StatCategory::WorkFromHome),
        AttendanceStatus::Training => Some(StatCategory::Training),
        AttendanceStatus::SickLeave => Some(StatCategory::SickLeave),
        AttendanceStatus::CasualLeave => Some(StatCategory::CasualLeave),
        AttendanceStatus::EarnedLeave => Some(StatCategory::EarnedLeave),
        AttendanceStatus::PaidLeave => Some(StatCategory::PaidLeave),
        AttendanceStatus::MaternityLeave => Some(StatCategory::MaternityLeave),
        AttendanceStatus::Absent => Some(StatCategory::Absent),
        AttendanceStatus::NationalHoliday => Some(StatCategory::NationalHoliday),
        AttendanceStatus::RegionalHoliday => Some(StatCategory::RegionalHoliday),
        status if status.is_holiday_like() => Some(StatCategory::Holiday),
        _ if log.check_in.is_some() => Some(StatCategory::Present),
        _ => None,
    }
}

/// Folds the logs that fall inside the inclusive `[from, to]` window.
pub fn fold(
    logs: &[AttendanceLog],
    from: NaiveDate,
    to: NaiveDate,
    policy: &PolicyConfig,
) -> PeriodStats {
    let mut stats = PeriodStats::default();

    for raw in logs {
        if raw.date < from || raw.date > to {
            continue;
        }
        let log = normalize_log(raw.clone(), policy);

        let category = category_of(&log);
        if let Some(category) = category {
            *stats.breakdown.entry(category).or_insert(0) += 1;
        }

        let late_countable = log.late_countable.unwrap_or(false);
        if late_countable {
            stats.late += 1;
            if let Some(check_in) = log.check_in {
                stats.total_late_minutes +=
                    (minutes_of_day(check_in) - i64::from(policy.late_cutoff_minutes)).max(0);
            }
        }

        // Early departure only applies to an actually worked day.
        if category == Some(StatCategory::Present) {
            if let Some(check_out) = log.check_out {
                if minutes_of_day(check_out) < i64::from(policy.early_departure_minutes) {
                    stats.early_departures += 1;
                }
            }
        }

        stats.total_extra_minutes += if log.extra_worked_ms > 0 {
            (log.extra_worked_ms as f64 / 60_000.0).round() as i64
        } else if let Some(check_in) = log.check_in {
            extra_worked_minutes(
                minutes_of_day(check_in),
                log.check_out.map(minutes_of_day),
                log.auto_checkout,
                log.auto_checkout_extra_approved,
                policy,
            )
        } else {
            0
        };
    }

    let count = |category: StatCategory| stats.breakdown.get(&category).copied().unwrap_or(0);
    stats.present = count(StatCategory::Present)
        + count(StatCategory::WorkFromHome)
        + count(StatCategory::Training);
    stats.leaves = count(StatCategory::SickLeave)
        + count(StatCategory::CasualLeave)
        + count(StatCategory::EarnedLeave)
        + count(StatCategory::PaidLeave)
        + count(StatCategory::MaternityLeave)
        + count(StatCategory::Absent);
    stats.unpaid_leaves = count(StatCategory::Absent);

    stats.extra_worked_hours = stats.total_extra_minutes as f64 / 60.0;
    stats.penalty = f64::from(stats.late / policy.late_grace_count) * policy.late_deduction_per_block;
    stats.penalty_offset = (stats.extra_worked_hours / policy.extra_hours_for_half_day_offset)
        .floor()
        * policy.late_deduction_per_block;
    stats.effective_penalty = (stats.penalty - stats.penalty_offset).max(0.0);

    stats
}

pub struct StatsAggregator {
    store: Arc<dyn DocumentStore>,
    policy: PolicyConfig,
    cache: StatsCache,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn DocumentStore>, policy: PolicyConfig) -> Self {
        Self { store, policy, cache: StatsCache::new() }
    }

    pub fn cache(&self) -> &StatsCache {
        &self.cache
    }

    async fn user_logs(&self, user_id: &str) -> Result<Vec<AttendanceLog>> {
        let docs = self
            .store
            .query(
                collections::ATTENDANCE,
                &[Filter::new("user_id", rollcall_store::FilterOp::Eq, user_id)],
                QueryOptions { order_by: Some("date".to_string()), ..Default::default() },
            )
            .await?;
        let mut logs = Vec::with_capacity(docs.len());
        for doc in &docs {
            logs.push(decode::<AttendanceLog>(doc)?);
        }
        Ok(logs)
    }

    async fn window_stats(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodStats> {
        if let Some(cached) = self.cache.get(user_id, from, to).await {
            debug!("Stats cache hit for {} {}..{}", user_id, from, to);
            return Ok(cached);
        }
        let logs = self.user_logs(user_id).await?;
        let stats = fold(&logs, from, to, &self.policy);
        self.cache.insert(user_id, from, to, stats.clone()).await;
        Ok(stats)
    }

    /// Calendar month containing `today`.
    pub async fn monthly_stats(&self, user_id: &str, today: NaiveDate) -> Result<PeriodStats> {
        let (from, to) = self.policy.month_window(today);
        self.window_stats(user_id, from, to).await
    }

    /// Financial year containing `today`.
    pub async fn yearly_stats(&self, user_id: &str, today: NaiveDate) -> Result<PeriodStats> {
        let (from, to) = self.policy.financial_year_window(today);
        self.window_stats(user_id, from, to).await
    }

    /// Dashboard view over every user. Read failures degrade to an empty
    /// map rather than failing the whole dashboard.
    pub async fn system_monthly_summary(&self, today: NaiveDate) -> HashMap<String, PeriodStats> {
        let users = match self.store.get_all(collections::USERS).await {
            Ok(docs) => docs,
            Err(err) => {
                warn!("System summary unavailable, user read failed: {err}");
                return HashMap::new();
            }
        };

        let mut summary = HashMap::new();
        for doc in &users {
            let user: UserRecord = match decode(doc) {
                Ok(user) => user,
                Err(err) => {
                    warn!("Skipping undecodable user document: {err}");
                    continue;
                }
            };
            match self.monthly_stats(&user.id, today).await {
                Ok(stats) => {
                    summary.insert(user.id, stats);
                }
                Err(err) => {
                    warn!("Skipping stats for {}: {err}", user.id);
                }
            }
        }
        summary
    }
}
