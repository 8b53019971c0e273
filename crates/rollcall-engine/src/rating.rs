// Rating Normalizer
//
// Task points are summed over a trailing window and rescaled linearly from
// [-50, 150] onto the [1, 5] rating band. The rescale is monotonic, so a
// larger raw total can never lower the rating.

use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use rollcall_common::{
    collections, CompletionStats, TaskOutcome, TaskPlan, TaskStatus, UserRecord, RatingSample,
    RATING_HISTORY_CAP,
};
use rollcall_store::{decode, encode, DocumentStore, Filter, FilterOp, QueryOptions};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, Result};

pub const DEFAULT_RATING_WINDOW_DAYS: u64 = 30;

const RAW_FLOOR: f64 = -50.0;
const RAW_CEILING: f64 = 150.0;
const RATING_MIN: f64 = 1.0;
const RATING_MAX: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingReport {
    pub user_id: String,
    pub rating: f64,
    pub raw_points: i64,
    pub tasks_considered: u32,
    pub completion_stats: CompletionStats,
}

/// Status a task is treated as today. An explicit terminal outcome always
/// wins; otherwise the planned date decides.
pub fn smart_status(task: &TaskPlan, today: NaiveDate) -> TaskStatus {
    match task.outcome {
        Some(TaskOutcome::Completed) => TaskStatus::Completed,
        Some(TaskOutcome::NotCompleted) => TaskStatus::NotCompleted,
        None => {
            if task.planned_date > today {
                TaskStatus::ToBeStarted
            } else if task.planned_date == today {
                TaskStatus::InProcess
            } else {
                TaskStatus::Overdue
            }
        }
    }
}

pub fn task_points(task: &TaskPlan, today: NaiveDate) -> i64 {
    match smart_status(task, today) {
        TaskStatus::Completed => {
            let timing = match task.completed_on {
                Some(done) => {
                    let days_late = (done - task.planned_date).num_days();
                    if days_late <= 0 {
                        3
                    } else if days_late == 1 {
                        -1
                    } else {
                        -2
                    }
                }
                // Completion date never recorded; no timing adjustment.
                None => 0,
            };
            10 + timing
        }
        TaskStatus::InProcess => 5,
        TaskStatus::ToBeStarted => 0,
        TaskStatus::Overdue => -8,
        TaskStatus::NotCompleted => -3,
    }
}

/// Linear rescale of the raw point total onto [1, 5], clamped.
pub fn normalize_rating(raw_points: i64) -> f64 {
    let scaled = RATING_MIN
        + (raw_points as f64 - RAW_FLOOR) / (RAW_CEILING - RAW_FLOOR) * (RATING_MAX - RATING_MIN);
    scaled.clamp(RATING_MIN, RATING_MAX)
}

pub struct RatingEngine {
    store: Arc<dyn DocumentStore>,
}

impl RatingEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn calculate_user_rating(
        &self,
        user_id: &str,
        days_back: u64,
    ) -> Result<RatingReport> {
        self.calculate_user_rating_at(user_id, days_back, Local::now().date_naive()).await
    }

    pub async fn calculate_user_rating_at(
        &self,
        user_id: &str,
        days_back: u64,
        today: NaiveDate,
    ) -> Result<RatingReport> {
        let from = today
            .checked_sub_days(Days::new(days_back.saturating_sub(1)))
            .unwrap_or(today);

        let docs = self
            .store
            .query(
                collections::WORK_PLANS,
                &[
                    Filter::new("user_id", FilterOp::Eq, user_id),
                    Filter::new("planned_date", FilterOp::Gte, from.to_string()),
                    Filter::new("planned_date", FilterOp::Lte, today.to_string()),
                ],
                QueryOptions::default(),
            )
            .await?;

        let mut raw_points = 0i64;
        let mut completion = CompletionStats::default();
        for doc in &docs {
            let task: TaskPlan = decode(doc)?;
            raw_points += task_points(&task, today);
            match smart_status(&task, today) {
                TaskStatus::Completed => completion.completed += 1,
                TaskStatus::InProcess => completion.in_process += 1,
                TaskStatus::ToBeStarted => completion.to_be_started += 1,
                TaskStatus::Overdue => completion.overdue += 1,
                TaskStatus::NotCompleted => completion.not_completed += 1,
            }
        }

        let rating = if completion.total() == 0 { 3.0 } else { normalize_rating(raw_points) };
        Ok(RatingReport {
            user_id: user_id.to_string(),
            rating,
            raw_points,
            tasks_considered: completion.total(),
            completion_stats: completion,
        })
    }

    /// Recomputes the rating, stores it on the user document, and appends
    /// one history sample, keeping only the newest entries.
    pub async fn update_user_rating(&self, user_id: &str) -> Result<RatingReport> {
        self.update_user_rating_at(
            user_id,
            DEFAULT_RATING_WINDOW_DAYS,
            Local::now().date_naive(),
        )
        .await
    }

    pub async fn update_user_rating_at(
        &self,
        user_id: &str,
        days_back: u64,
        today: NaiveDate,
    ) -> Result<RatingReport> {
        let report = self.calculate_user_rating_at(user_id, days_back, today).await?;

        let doc = self
            .store
            .get(collections::USERS, user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
        let mut user: UserRecord = decode(&doc)?;

        user.rating = report.rating;
        user.completion_stats = report.completion_stats;
        user.rating_history.push(RatingSample {
            at: today.and_hms_opt(0, 0, 0).unwrap_or_default(),
            rating: report.rating,
        });
        if user.rating_history.len() > RATING_HISTORY_CAP {
            let excess = user.rating_history.len() - RATING_HISTORY_CAP;
            user.rating_history.drain(..excess);
        }

        self.store.put(collections::USERS, encode(&user)?).await?;
        info!("Rating for {} updated to {:.2}", user_id, report.rating);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn task(id: &str, planned: NaiveDate) -> TaskPlan {
        TaskPlan {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: "Task".to_string(),
            planned_date: planned,
            outcome: None,
            completed_on: None,
        }
    }

    #[test]
    fn test_smart_status_from_planned_date() {
        let today = date(8, 30);
        assert_eq!(smart_status(&task("a", date(9, 2)), today), TaskStatus::ToBeStarted);
        assert_eq!(smart_status(&task("b", today), today), TaskStatus::InProcess);
        assert_eq!(smart_status(&task("c", date(8, 20)), today), TaskStatus::Overdue);
    }

    #[test]
    fn test_explicit_outcome_wins_over_date() {
        let today = date(8, 30);
        let mut done = task("a", date(8, 20));
        done.outcome = Some(TaskOutcome::Completed);
        assert_eq!(smart_status(&done, today), TaskStatus::Completed);

        let mut failed = task("b", date(9, 5));
        failed.outcome = Some(TaskOutcome::NotCompleted);
        assert_eq!(smart_status(&failed, today), TaskStatus::NotCompleted);
    }

    #[test]
    fn test_completed_timing_adjustments() {
        let today = date(8, 30);
        let mut on_time = task("a", date(8, 20));
        on_time.outcome = Some(TaskOutcome::Completed);
        on_time.completed_on = Some(date(8, 20));
        assert_eq!(task_points(&on_time, today), 13);

        let mut early = task("b", date(8, 20));
        early.outcome = Some(TaskOutcome::Completed);
        early.completed_on = Some(date(8, 19));
        assert_eq!(task_points(&early, today), 13);

        let mut day_late = task("c", date(8, 20));
        day_late.outcome = Some(TaskOutcome::Completed);
        day_late.completed_on = Some(date(8, 21));
        assert_eq!(task_points(&day_late, today), 9);

        let mut very_late = task("d", date(8, 20));
        very_late.outcome = Some(TaskOutcome::Completed);
        very_late.completed_on = Some(date(8, 25));
        assert_eq!(task_points(&very_late, today), 8);
    }

    #[test]
    fn test_point_table() {
        let today = date(8, 30);
        assert_eq!(task_points(&task("a", today), today), 5);
        assert_eq!(task_points(&task("b", date(9, 1)), today), 0);
        assert_eq!(task_points(&task("c", date(8, 1)), today), -8);
        let mut failed = task("d", date(8, 1));
        failed.outcome = Some(TaskOutcome::NotCompleted);
        assert_eq!(task_points(&failed, today), -3);
    }

    #[test]
    fn test_normalize_is_monotonic_and_clamped() {
        assert_eq!(normalize_rating(-200), 1.0);
        assert_eq!(normalize_rating(-50), 1.0);
        assert_eq!(normalize_rating(50), 3.0);
        assert_eq!(normalize_rating(150), 5.0);
        assert_eq!(normalize_rating(500), 5.0);

        let mut previous = f64::MIN;
        for raw in (-100..=200).step_by(5) {
            let rating = normalize_rating(raw);
            assert!(rating >= previous);
            previous = rating;
        }
    }

    mod engine {
        use super::*;
        use rollcall_store::MemoryStore;
        use std::sync::Arc;

        async fn seeded(tasks: Vec<TaskPlan>) -> (Arc<MemoryStore>, RatingEngine) {
            let store = Arc::new(MemoryStore::new());
            store
                .put(collections::USERS, encode(&UserRecord::new("u1", "Priya")).unwrap())
                .await
                .unwrap();
            for task in &tasks {
                store.add(collections::WORK_PLANS, encode(task).unwrap()).await.unwrap();
            }
            (store.clone(), RatingEngine::new(store))
        }

        #[tokio::test]
        async fn test_zero_tasks_defaults_to_neutral() {
            let (_, engine) = seeded(Vec::new()).await;
            let report = engine.calculate_user_rating_at("u1", 30, date(8, 30)).await.unwrap();
            assert_eq!(report.rating, 3.0);
            assert_eq!(report.tasks_considered, 0);
        }

        #[tokio::test]
        async fn test_window_excludes_older_tasks() {
            let today = date(8, 30);
            let (_, engine) = seeded(vec![
                task("in", date(8, 15)),
                task("out", date(7, 1)), // outside the trailing 30 days
            ])
            .await;

            let report = engine.calculate_user_rating_at("u1", 30, today).await.unwrap();
            assert_eq!(report.tasks_considered, 1);
            assert_eq!(report.raw_points, -8);
        }

        #[tokio::test]
        async fn test_update_writes_user_and_history() {
            let today = date(8, 30);
            let mut done = task("a", date(8, 28));
            done.outcome = Some(TaskOutcome::Completed);
            done.completed_on = Some(date(8, 28));
            let (store, engine) = seeded(vec![done]).await;

            let report = engine.update_user_rating_at("u1", 30, today).await.unwrap();
            assert_eq!(report.raw_points, 13);

            let doc = store.get(collections::USERS, "u1").await.unwrap().unwrap();
            let user: UserRecord = decode(&doc).unwrap();
            assert_eq!(user.rating, report.rating);
            assert_eq!(user.completion_stats.completed, 1);
            assert_eq!(user.rating_history.len(), 1);
        }

        #[tokio::test]
        async fn test_history_capped_at_newest() {
            let (store, engine) = seeded(vec![task("a", date(8, 29))]).await;

            // Pre-fill the history right at the cap.
            let doc = store.get(collections::USERS, "u1").await.unwrap().unwrap();
            let mut user: UserRecord = decode(&doc).unwrap();
            for i in 0..RATING_HISTORY_CAP {
                user.rating_history.push(RatingSample {
                    at: date(1, 1).and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::days(i as i64),
                    rating: 3.0,
                });
            }
            store.put(collections::USERS, encode(&user).unwrap()).await.unwrap();

            engine.update_user_rating_at("u1", 30, date(8, 30)).await.unwrap();

            let doc = store.get(collections::USERS, "u1").await.unwrap().unwrap();
            let user: UserRecord = decode(&doc).unwrap();
            assert_eq!(user.rating_history.len(), RATING_HISTORY_CAP);
            // Oldest entry evicted, newest sample kept at the tail.
            assert_eq!(
                user.rating_history.last().map(|s| s.at.date()),
                Some(date(8, 30))
            );
        }
    }
}
