// Attendance Session Manager
//
// Owns the check-in/check-out lifecycle per user. Logs are immutable once
// written; only explicit admin edits and deletes touch them afterwards.
// User-document updates are read-modify-write; last writer wins.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use rollcall_common::{collections, AttendanceLog, AttendanceStatus, PolicyConfig, Presence, UserRecord};
use rollcall_store::{decode, encode, DocumentStore};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::classifier::{classify, ClassifyInput};
use crate::error::{EngineError, Result};
use crate::legacy::normalize_log;

#[derive(Debug, Clone, Default)]
pub struct CheckOutOptions {
    pub auto_checkout: bool,
    pub auto_checkout_requires_approval: bool,
    pub auto_checkout_extra_approved: Option<bool>,
    /// Sampled activity signal, 0-100.
    pub activity_score: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckOutRequest {
    pub description: Option<String>,
    pub location: Option<Value>,
    pub location_mismatch: bool,
    pub mismatch_explanation: Option<String>,
    pub options: CheckOutOptions,
}

/// Admin-entered attendance record; classified through the manual path.
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub user_id: String,
    pub date: NaiveDate,
    /// Label the admin typed; mapped via `AttendanceStatus::from_manual_label`.
    pub status_label: String,
    pub check_in: Option<chrono::NaiveTime>,
    pub check_out: Option<chrono::NaiveTime>,
    pub extra_worked_ms: Option<i64>,
    pub description: Option<String>,
}

/// Admin edit; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub status: Option<AttendanceStatus>,
    pub check_in: Option<chrono::NaiveTime>,
    pub check_out: Option<chrono::NaiveTime>,
    pub duration_ms: Option<i64>,
}

pub struct SessionManager {
    store: Arc<dyn DocumentStore>,
    policy: PolicyConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn DocumentStore>, policy: PolicyConfig) -> Self {
        Self { store, policy }
    }

    async fn load_user(&self, user_id: &str) -> Result<UserRecord> {
        if user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("caller is not authenticated".to_string()));
        }
        let doc = self
            .store
            .get(collections::USERS, user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
        decode(&doc).map_err(EngineError::Store)
    }

    async fn save_user(&self, user: &UserRecord) -> Result<()> {
        self.store.put(collections::USERS, encode(user)?).await?;
        Ok(())
    }

    pub async fn check_in(&self, user_id: &str, location: Option<Value>) -> Result<UserRecord> {
        self.check_in_at(user_id, location, Local::now().naive_local()).await
    }

    pub async fn check_in_at(
        &self,
        user_id: &str,
        location: Option<Value>,
        now: NaiveDateTime,
    ) -> Result<UserRecord> {
        let mut user = self.load_user(user_id).await?;
        if user.presence == Presence::In {
            return Err(EngineError::AlreadyCheckedIn(user_id.to_string()));
        }

        user.presence = Presence::In;
        user.last_check_in = Some(now);
        user.current_location = location;
        self.save_user(&user).await?;

        info!("User {} checked in at {}", user_id, now);
        Ok(user)
    }

    pub async fn check_out(
        &self,
        user_id: &str,
        request: CheckOutRequest,
    ) -> Result<AttendanceLog> {
        self.check_out_at(user_id, request, Local::now().naive_local()).await
    }

    pub async fn check_out_at(
        &self,
        user_id: &str,
        request: CheckOutRequest,
        now: NaiveDateTime,
    ) -> Result<AttendanceLog> {
        if request.location_mismatch
            && request.mismatch_explanation.as_deref().map_or(true, |s| s.trim().is_empty())
        {
            return Err(EngineError::InvalidInput(
                "a location mismatch requires an explanation".to_string(),
            ));
        }

        let mut user = self.load_user(user_id).await?;
        let Some(check_in) = user.last_check_in else {
            return Err(EngineError::NotCheckedIn(user_id.to_string()));
        };
        if user.presence != Presence::In {
            return Err(EngineError::NotCheckedIn(user_id.to_string()));
        }

        let duration_ms = (now - check_in).num_milliseconds().max(0);
        let classified = classify(
            &ClassifyInput {
                check_in: Some(check_in),
                duration_ms,
                manual_status: None,
                auto_checkout: request.options.auto_checkout,
                auto_checkout_extra_approved: request.options.auto_checkout_extra_approved,
                explicit_extra_ms: None,
            },
            &self.policy,
        );

        let location = build_location(&request);
        let log = AttendanceLog {
            id: format!("att_{}", now.and_utc().timestamp_millis()),
            user_id: user_id.to_string(),
            // The log belongs to the calendar day the check-out happened.
            date: now.date(),
            check_in: Some(check_in.time()),
            check_out: Some(now.time()),
            duration_ms,
            status: classified.status,
            day_credit: Some(classified.day_credit),
            late_countable: Some(classified.late_countable),
            extra_worked_ms: classified.extra_worked_ms,
            manual_override: false,
            activity_score: request.options.activity_score.map(|s| s.min(100)),
            work_description: request.description,
            auto_checkout: request.options.auto_checkout,
            auto_checkout_requires_approval: request.options.auto_checkout_requires_approval,
            auto_checkout_extra_approved: request.options.auto_checkout_extra_approved,
            location,
        };
        self.store.add(collections::ATTENDANCE, encode(&log)?).await?;

        user.presence = Presence::Out;
        user.last_check_in = None;
        user.current_location = None;
        self.save_user(&user).await?;

        info!("User {} checked out: {} ({}ms)", user_id, log.status, duration_ms);
        Ok(log)
    }

    /// The one interface the leave-approval workflow uses: one synthetic
    /// log per approved day. The deterministic id makes re-approval an
    /// upsert, so there is at most one such log per user per day.
    pub async fn record_leave_day(
        &self,
        user_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<AttendanceLog> {
        if !status.is_leave() {
            return Err(EngineError::InvalidInput(format!(
                "{status} is not a leave category"
            )));
        }
        self.load_user(user_id).await?;

        let log = AttendanceLog {
            id: AttendanceLog::leave_log_id(user_id, date),
            user_id: user_id.to_string(),
            date,
            check_in: None,
            check_out: None,
            duration_ms: 0,
            day_credit: Some(status.day_credit()),
            status,
            late_countable: Some(false),
            extra_worked_ms: 0,
            manual_override: false,
            activity_score: None,
            work_description: None,
            auto_checkout: false,
            auto_checkout_requires_approval: false,
            auto_checkout_extra_approved: None,
            location: None,
        };
        self.store.put(collections::ATTENDANCE, encode(&log)?).await?;
        Ok(log)
    }

    pub async fn add_manual_entry(&self, entry: ManualEntry) -> Result<AttendanceLog> {
        self.add_manual_entry_at(entry, Local::now().naive_local()).await
    }

    pub async fn add_manual_entry_at(
        &self,
        entry: ManualEntry,
        now: NaiveDateTime,
    ) -> Result<AttendanceLog> {
        self.load_user(&entry.user_id).await?;

        let status = AttendanceStatus::from_manual_label(&entry.status_label);
        let duration_ms = worked_duration_ms(entry.check_in, entry.check_out);
        let classified = classify(
            &ClassifyInput {
                check_in: entry.check_in.map(|t| entry.date.and_time(t)),
                duration_ms,
                manual_status: Some(status),
                auto_checkout: false,
                auto_checkout_extra_approved: None,
                explicit_extra_ms: entry.extra_worked_ms,
            },
            &self.policy,
        );

        let log = AttendanceLog {
            id: format!("att_{}", now.and_utc().timestamp_millis()),
            user_id: entry.user_id.clone(),
            date: entry.date,
            check_in: entry.check_in,
            check_out: entry.check_out,
            duration_ms,
            status: classified.status,
            day_credit: Some(classified.day_credit),
            late_countable: Some(classified.late_countable),
            extra_worked_ms: classified.extra_worked_ms,
            manual_override: true,
            activity_score: None,
            work_description: entry.description,
            auto_checkout: false,
            auto_checkout_requires_approval: false,
            auto_checkout_extra_approved: None,
            location: None,
        };
        self.store.add(collections::ATTENDANCE, encode(&log)?).await?;
        info!("Manual attendance entry added for {} on {}", entry.user_id, entry.date);
        Ok(log)
    }

    /// Admin edit. `day_credit`, `late_countable`, and `extra_worked_ms`
    /// are re-derived through the classifier. A patched or manually typed
    /// status stands verbatim; otherwise the status follows the corrected
    /// times.
    pub async fn edit_entry(&self, log_id: &str, patch: EntryPatch) -> Result<AttendanceLog> {
        let doc = self
            .store
            .get(collections::ATTENDANCE, log_id)
            .await?
            .ok_or_else(|| EngineError::LogNotFound(log_id.to_string()))?;
        let mut log = normalize_log(decode::<AttendanceLog>(&doc)?, &self.policy);

        let status_pinned = patch.status.is_some() || log.manual_override;
        if let Some(status) = patch.status {
            log.status = status;
        }
        if let Some(check_in) = patch.check_in {
            log.check_in = Some(check_in);
        }
        if let Some(check_out) = patch.check_out {
            log.check_out = Some(check_out);
        }
        log.duration_ms = patch
            .duration_ms
            .unwrap_or_else(|| worked_duration_ms(log.check_in, log.check_out))
            .max(0);

        let classified = classify(
            &ClassifyInput {
                check_in: log.check_in.map(|t| log.date.and_time(t)),
                duration_ms: log.duration_ms,
                manual_status: status_pinned.then(|| log.status.clone()),
                auto_checkout: log.auto_checkout,
                auto_checkout_extra_approved: log.auto_checkout_extra_approved,
                explicit_extra_ms: None,
            },
            &self.policy,
        );
        log.status = classified.status;
        log.day_credit = Some(classified.day_credit);
        log.late_countable = Some(classified.late_countable);
        log.extra_worked_ms = classified.extra_worked_ms;

        self.store.put(collections::ATTENDANCE, encode(&log)?).await?;
        info!("Attendance log {} edited", log_id);
        Ok(log)
    }

    pub async fn delete_entry(&self, log_id: &str) -> Result<()> {
        self.store.delete(collections::ATTENDANCE, log_id).await?;
        warn!("Attendance log {} deleted by admin action", log_id);
        Ok(())
    }
}

fn worked_duration_ms(
    check_in: Option<chrono::NaiveTime>,
    check_out: Option<chrono::NaiveTime>,
) -> i64 {
    match (check_in, check_out) {
        (Some(start), Some(end)) => (end - start).num_milliseconds().max(0),
        _ => 0,
    }
}

fn build_location(request: &CheckOutRequest) -> Option<Value> {
    let position = request.location.clone();
    if request.location_mismatch {
        Some(json!({
            "position": position,
            "mismatch": true,
            "explanation": request.mismatch_explanation,
        }))
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use rollcall_store::MemoryStore;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    async fn setup() -> SessionManager {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone(), PolicyConfig::default());
        store
            .put(collections::USERS, encode(&UserRecord::new("u1", "Priya")).unwrap())
            .await
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn test_check_in_then_out_emits_classified_log() {
        let manager = setup().await;

        // Wednesday 09:10 in, 17:40 out.
        let user = manager
            .check_in_at("u1", None, at(2026, 8, 26, 9, 10))
            .await
            .unwrap();
        assert_eq!(user.presence, Presence::In);

        let log = manager
            .check_out_at(
                "u1",
                CheckOutRequest {
                    description: Some("Payroll reconciliation".to_string()),
                    ..Default::default()
                },
                at(2026, 8, 26, 17, 40),
            )
            .await
            .unwrap();

        assert_eq!(log.status, AttendanceStatus::Present);
        assert_eq!(log.date, NaiveDate::from_ymd_opt(2026, 8, 26).unwrap());
        assert_eq!(log.check_in, NaiveTime::from_hms_opt(9, 10, 0));
        assert_eq!(log.duration_ms, 8 * 3_600_000 + 30 * 60_000);
        assert_eq!(log.extra_worked_ms, 5 * 60_000);
        assert_eq!(log.late_countable, Some(false));
    }

    #[tokio::test]
    async fn test_double_check_in_rejected() {
        let manager = setup().await;
        manager.check_in_at("u1", None, at(2026, 8, 26, 9, 0)).await.unwrap();
        let err = manager.check_in_at("u1", None, at(2026, 8, 26, 9, 5)).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCheckedIn(_)));
    }

    #[tokio::test]
    async fn test_check_out_without_check_in_rejected() {
        let manager = setup().await;
        let err = manager
            .check_out_at("u1", CheckOutRequest::default(), at(2026, 8, 26, 18, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotCheckedIn(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let manager = setup().await;
        let err = manager.check_in_at("ghost", None, at(2026, 8, 26, 9, 0)).await.unwrap_err();
        assert!(matches!(err, EngineError::UserNotFound(_)));

        let err = manager.check_in_at("  ", None, at(2026, 8, 26, 9, 0)).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_mismatch_requires_explanation() {
        let manager = setup().await;
        manager.check_in_at("u1", None, at(2026, 8, 26, 9, 0)).await.unwrap();
        let err = manager
            .check_out_at(
                "u1",
                CheckOutRequest { location_mismatch: true, ..Default::default() },
                at(2026, 8, 26, 18, 0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_leave_day_is_idempotent_per_day() {
        let manager = setup().await;
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

        let first = manager
            .record_leave_day("u1", date, AttendanceStatus::CasualLeave)
            .await
            .unwrap();
        let second = manager
            .record_leave_day("u1", date, AttendanceStatus::SickLeave)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.id, "att_u1_2026-09-01");
    }

    #[tokio::test]
    async fn test_leave_day_rejects_non_leave_status() {
        let manager = setup().await;
        let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let err = manager
            .record_leave_day("u1", date, AttendanceStatus::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_manual_entry_keeps_typed_status() {
        let manager = setup().await;
        let log = manager
            .add_manual_entry_at(
                ManualEntry {
                    user_id: "u1".to_string(),
                    date: NaiveDate::from_ymd_opt(2026, 8, 27).unwrap(),
                    status_label: "Manual/WFH".to_string(),
                    check_in: NaiveTime::from_hms_opt(11, 0, 0),
                    check_out: NaiveTime::from_hms_opt(15, 0, 0),
                    extra_worked_ms: None,
                    description: None,
                },
                at(2026, 8, 27, 16, 0),
            )
            .await
            .unwrap();

        // Four worked hours would classify as half day; the manual label wins.
        assert_eq!(log.status, AttendanceStatus::WorkFromHome);
        assert_eq!(log.day_credit, Some(1.0));
        assert!(log.manual_override);
    }

    #[tokio::test]
    async fn test_edit_rederives_through_classifier() {
        let manager = setup().await;
        manager.check_in_at("u1", None, at(2026, 8, 26, 9, 40)).await.unwrap();
        let log = manager
            .check_out_at("u1", CheckOutRequest::default(), at(2026, 8, 26, 16, 40))
            .await
            .unwrap();
        assert_eq!(log.status, AttendanceStatus::Late);

        // Corrected check-in moves the log back to on time.
        let edited = manager
            .edit_entry(
                &log.id,
                EntryPatch {
                    check_in: NaiveTime::from_hms_opt(9, 5, 0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.status, AttendanceStatus::Present);
        assert_eq!(edited.late_countable, Some(false));
    }

    #[tokio::test]
    async fn test_edit_with_explicit_status_keeps_it() {
        let manager = setup().await;
        manager.check_in_at("u1", None, at(2026, 8, 26, 9, 40)).await.unwrap();
        let log = manager
            .check_out_at("u1", CheckOutRequest::default(), at(2026, 8, 26, 16, 40))
            .await
            .unwrap();
        assert_eq!(log.status, AttendanceStatus::Late);

        // The admin converts the day to on-duty; the times would classify
        // it as a countable late, but the given status wins.
        let edited = manager
            .edit_entry(
                &log.id,
                EntryPatch { status: Some(AttendanceStatus::OnDuty), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(edited.status, AttendanceStatus::OnDuty);
        assert_eq!(edited.day_credit, Some(1.0));
        assert_eq!(edited.late_countable, Some(false));
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let manager = setup().await;
        manager.check_in_at("u1", None, at(2026, 8, 26, 9, 0)).await.unwrap();
        let log = manager
            .check_out_at("u1", CheckOutRequest::default(), at(2026, 8, 26, 17, 0))
            .await
            .unwrap();

        manager.delete_entry(&log.id).await.unwrap();
        assert!(matches!(
            manager.delete_entry(&log.id).await.unwrap_err(),
            EngineError::Store(rollcall_store::StoreError::NotFound(_))
        ));
    }
}
