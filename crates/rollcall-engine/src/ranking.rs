// Hero-of-the-Week ranking and the system activity trend
//
// Both surfaces feed dashboards, so store failures degrade to an empty
// result instead of propagating.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rollcall_common::{collections, AttendanceLog, UserRecord};
use rollcall_store::{decode, DocumentStore};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classifier::{minutes_of_day, MS_PER_HOUR};
use crate::error::Result;

const WEEK_DAYS: u64 = 7;
const DEFAULT_ACTIVITY_SCORE: f64 = 70.0;

const CONSISTENCY_WEIGHT: f64 = 0.4;
const EFFORT_WEIGHT: f64 = 0.3;
const QUALITY_WEIGHT: f64 = 0.2;
const ACTIVITY_WEIGHT: f64 = 0.1;

const FULL_EFFORT_HOURS: f64 = 40.0;
const FULL_QUALITY_CHARS: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroOfWeek {
    pub user_id: String,
    pub name: String,
    pub score: f64,
    pub reason: String,
    pub days_count: u32,
    pub total_hours: f64,
    pub activity_log_depth: usize,
    pub avg_activity_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    /// Mean positive activity score across the day's logs; 0.0 when none.
    pub average_score: f64,
    pub samples: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceTrend {
    pub days: Vec<DailyPerformance>,
    /// Mean over days that had at least one sample.
    pub overall_average: f64,
}

#[derive(Default)]
struct WeekTally {
    total_duration_ms: i64,
    days: BTreeSet<NaiveDate>,
    activity_log_depth: usize,
    activity_scores: Vec<f64>,
}

impl WeekTally {
    fn observe(&mut self, log: &AttendanceLog) {
        self.total_duration_ms += effective_duration_ms(log);
        self.days.insert(log.date);
        if let Some(description) = &log.work_description {
            self.activity_log_depth += description.chars().count();
        }
        if let Some(score) = log.activity_score {
            self.activity_scores.push(f64::from(score));
        }
    }

    fn avg_activity(&self) -> f64 {
        if self.activity_scores.is_empty() {
            DEFAULT_ACTIVITY_SCORE
        } else {
            self.activity_scores.iter().sum::<f64>() / self.activity_scores.len() as f64
        }
    }
}

/// Duration for ranking purposes. Open sessions (no check-out) contribute
/// nothing; closed legacy sessions without a stored duration fall back to
/// the times of day.
fn effective_duration_ms(log: &AttendanceLog) -> i64 {
    if log.duration_ms > 0 {
        return log.duration_ms;
    }
    match (log.check_in, log.check_out) {
        (Some(start), Some(end)) => {
            ((minutes_of_day(end) - minutes_of_day(start)) * 60_000).max(0)
        }
        _ => 0,
    }
}

fn score_of(tally: &WeekTally) -> (f64, f64) {
    let hours = tally.total_duration_ms as f64 / MS_PER_HOUR;
    let consistency = tally.days.len() as f64 / WEEK_DAYS as f64 * 100.0;
    let effort = (hours / FULL_EFFORT_HOURS * 100.0).min(100.0);
    let quality = (tally.activity_log_depth as f64 / FULL_QUALITY_CHARS * 100.0).min(100.0);
    let score = CONSISTENCY_WEIGHT * consistency
        + EFFORT_WEIGHT * effort
        + QUALITY_WEIGHT * quality
        + ACTIVITY_WEIGHT * tally.avg_activity();
    (score, hours)
}

fn reason_of(tally: &WeekTally, hours: f64) -> &'static str {
    if tally.days.len() >= 5 {
        "Unmatched Consistency"
    } else if hours >= FULL_EFFORT_HOURS {
        "Hardworking Machine"
    } else if tally.activity_log_depth > 300 {
        "Detailed Communicator"
    } else {
        "Top Performer"
    }
}

pub struct RankingEngine {
    store: Arc<dyn DocumentStore>,
}

impl RankingEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn week_logs(&self, today: NaiveDate) -> Result<Vec<AttendanceLog>> {
        let from = today.checked_sub_days(Days::new(WEEK_DAYS - 1)).unwrap_or(today);
        let docs = self.store.get_all(collections::ATTENDANCE).await?;
        let mut logs = Vec::new();
        for doc in &docs {
            let log = decode::<AttendanceLog>(doc)?;
            if log.date >= from && log.date <= today {
                logs.push(log);
            }
        }
        Ok(logs)
    }

    pub async fn hero_of_the_week(&self, today: NaiveDate) -> Option<HeroOfWeek> {
        match self.compute_hero(today).await {
            Ok(hero) => hero,
            Err(err) => {
                warn!("Hero-of-the-week unavailable: {err}");
                None
            }
        }
    }

    async fn compute_hero(&self, today: NaiveDate) -> Result<Option<HeroOfWeek>> {
        let logs = self.week_logs(today).await?;

        // BTreeMap keeps candidates in lexical user-id order, which is the
        // documented tie-break.
        let mut tallies: BTreeMap<String, WeekTally> = BTreeMap::new();
        for log in &logs {
            tallies.entry(log.user_id.clone()).or_default().observe(log);
        }

        let mut winner: Option<(String, f64)> = None;
        for (user_id, tally) in &tallies {
            let (score, _) = score_of(tally);
            let beats = winner.as_ref().map_or(true, |(_, best)| score > *best);
            if beats {
                winner = Some((user_id.clone(), score));
            }
        }
        let Some((user_id, score)) = winner else {
            return Ok(None);
        };

        let tally = &tallies[&user_id];
        let (_, hours) = score_of(tally);
        let name = match self.store.get(collections::USERS, &user_id).await? {
            Some(doc) => decode::<UserRecord>(&doc)?.name,
            None => user_id.clone(),
        };

        Ok(Some(HeroOfWeek {
            name,
            score,
            reason: reason_of(tally, hours).to_string(),
            days_count: tally.days.len() as u32,
            total_hours: hours,
            activity_log_depth: tally.activity_log_depth,
            avg_activity_score: tally.avg_activity(),
            user_id,
        }))
    }

    /// Per-day mean positive activity score over the trailing week.
    pub async fn system_performance(&self, today: NaiveDate) -> PerformanceTrend {
        let logs = match self.week_logs(today).await {
            Ok(logs) => logs,
            Err(err) => {
                warn!("Performance trend unavailable: {err}");
                return PerformanceTrend::default();
            }
        };

        let mut by_date: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
        for log in &logs {
            if let Some(score) = log.activity_score {
                if score > 0 {
                    by_date.entry(log.date).or_default().push(f64::from(score));
                }
            }
        }

        let mut days = Vec::with_capacity(WEEK_DAYS as usize);
        let mut sum = 0.0;
        let mut sampled_days = 0u32;
        for offset in (0..WEEK_DAYS).rev() {
            let Some(date) = today.checked_sub_days(Days::new(offset)) else {
                continue;
            };
            let scores = by_date.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            let average_score = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            if !scores.is_empty() {
                sum += average_score;
                sampled_days += 1;
            }
            days.push(DailyPerformance { date, average_score, samples: scores.len() as u32 });
        }

        let overall_average =
            if sampled_days == 0 { 0.0 } else { sum / f64::from(sampled_days) };
        PerformanceTrend { days, overall_average }
    }
}
