// End-to-end engine flow against the in-memory store: sessions produce
// classified logs, the aggregator folds them, and ranking and rating read
// the same collections.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_common::{collections, AttendanceStatus, PolicyConfig, TaskOutcome, TaskPlan, UserRecord};
use rollcall_engine::{
    CheckOutOptions, CheckOutRequest, RankingEngine, RatingEngine, SessionManager, StatsAggregator,
};
use rollcall_store::{encode, DocumentStore, MemoryStore};

fn at(m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, d).unwrap()
}

async fn seed_users(store: &Arc<MemoryStore>, ids: &[&str]) {
    for id in ids {
        store
            .put(collections::USERS, encode(&UserRecord::new(*id, *id)).unwrap())
            .await
            .unwrap();
    }
}

async fn work_day(
    manager: &SessionManager,
    user: &str,
    m: u32,
    d: u32,
    in_hm: (u32, u32),
    out_hm: (u32, u32),
    description: &str,
    activity: u32,
) {
    manager.check_in_at(user, None, at(m, d, in_hm.0, in_hm.1)).await.unwrap();
    manager
        .check_out_at(
            user,
            CheckOutRequest {
                description: Some(description.to_string()),
                options: CheckOutOptions { activity_score: Some(activity), ..Default::default() },
                ..Default::default()
            },
            at(m, d, out_hm.0, out_hm.1),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_month_of_sessions_rolls_up() {
    let store = Arc::new(MemoryStore::new());
    seed_users(&store, &["priya"]).await;
    let policy = PolicyConfig::default();
    let manager = SessionManager::new(store.clone(), policy.clone());
    let aggregator = StatsAggregator::new(store.clone(), policy.clone());

    // Mon-Thu of one week: on time, late, late, on time.
    work_day(&manager, "priya", 8, 24, (9, 0), (18, 10), "Sprint planning", 80).await;
    work_day(&manager, "priya", 8, 25, (9, 40), (17, 30), "Code review", 75).await;
    work_day(&manager, "priya", 8, 26, (9, 50), (17, 30), "Release prep", 70).await;
    work_day(&manager, "priya", 8, 27, (9, 10), (18, 0), "Deploy", 85).await;
    // Friday approved sick leave.
    manager
        .record_leave_day("priya", date(8, 28), AttendanceStatus::SickLeave)
        .await
        .unwrap();

    let stats = aggregator.monthly_stats("priya", date(8, 30)).await.unwrap();
    assert_eq!(stats.present, 4);
    assert_eq!(stats.late, 2);
    assert_eq!(stats.leaves, 1);
    assert_eq!(stats.unpaid_leaves, 0);
    assert_eq!(stats.early_departures, 2); // the two 17:30 departures
    assert_eq!(stats.total_late_minutes, 25 + 35);
    // 25 min early on the 24th, 5 min early on the 27th.
    assert_eq!(stats.total_extra_minutes, 30);
    // Two lates, grace three: no penalty block yet.
    assert_eq!(stats.penalty, 0.0);
    assert_eq!(stats.effective_penalty, 0.0);
}

#[tokio::test]
async fn test_cache_invalidates_after_new_log() {
    let store = Arc::new(MemoryStore::new());
    seed_users(&store, &["priya"]).await;
    let policy = PolicyConfig::default();
    let manager = SessionManager::new(store.clone(), policy.clone());
    let aggregator = StatsAggregator::new(store.clone(), policy.clone());
    let watcher = aggregator.cache().watch(store.clone());

    work_day(&manager, "priya", 8, 24, (9, 0), (18, 0), "Morning work", 80).await;
    let before = aggregator.monthly_stats("priya", date(8, 30)).await.unwrap();
    assert_eq!(before.present, 1);

    work_day(&manager, "priya", 8, 25, (9, 0), (18, 0), "More work", 80).await;
    // Let the watcher task drain the store events.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let after = aggregator.monthly_stats("priya", date(8, 30)).await.unwrap();
    assert_eq!(after.present, 2);
    watcher.abort();
}

#[tokio::test]
async fn test_hero_reflects_week_of_logs() {
    let store = Arc::new(MemoryStore::new());
    seed_users(&store, &["priya", "arjun"]).await;
    let manager = SessionManager::new(store.clone(), PolicyConfig::default());
    let ranking = RankingEngine::new(store.clone());

    // Priya works five long, well-described days; Arjun two short ones.
    for d in 24..=28 {
        work_day(&manager, "priya", 8, d, (9, 0), (18, 30), "Detailed writeup of the day's investigation and fixes", 85).await;
    }
    work_day(&manager, "arjun", 8, 24, (10, 0), (15, 0), "Standup", 60).await;
    work_day(&manager, "arjun", 8, 25, (10, 0), (15, 0), "Standup", 60).await;

    let hero = ranking.hero_of_the_week(date(8, 30)).await.unwrap();
    assert_eq!(hero.user_id, "priya");
    assert_eq!(hero.days_count, 5);
    assert_eq!(hero.reason, "Unmatched Consistency");
    assert!(hero.score > 70.0);

    let trend = ranking.system_performance(date(8, 30)).await;
    assert_eq!(trend.days.len(), 7);
    assert!(trend.overall_average > 0.0);
}

#[tokio::test]
async fn test_rating_updates_user_document() {
    let store = Arc::new(MemoryStore::new());
    seed_users(&store, &["priya"]).await;
    let rating = RatingEngine::new(store.clone());

    let mut done = TaskPlan {
        id: "t1".to_string(),
        user_id: "priya".to_string(),
        title: "Ship reports".to_string(),
        planned_date: date(8, 27),
        outcome: Some(TaskOutcome::Completed),
        completed_on: Some(date(8, 27)),
    };
    store.add(collections::WORK_PLANS, encode(&done).unwrap()).await.unwrap();
    done.id = "t2".to_string();
    done.outcome = None;
    done.completed_on = None;
    done.planned_date = date(8, 20); // left overdue
    store.add(collections::WORK_PLANS, encode(&done).unwrap()).await.unwrap();

    let report = rating.update_user_rating_at("priya", 30, date(8, 30)).await.unwrap();
    assert_eq!(report.raw_points, 13 - 8);
    assert_eq!(report.completion_stats.completed, 1);
    assert_eq!(report.completion_stats.overdue, 1);

    let doc = store.get(collections::USERS, "priya").await.unwrap().unwrap();
    let user: UserRecord = rollcall_store::decode(&doc).unwrap();
    assert_eq!(user.rating, report.rating);
    assert_eq!(user.rating_history.len(), 1);
}
