use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Rating history entries kept per user; oldest evicted first.
pub const RATING_HISTORY_CAP: usize = 90;

/// Outcome status attached to an attendance log.
///
/// Serialized as the legacy display labels so stored records stay readable
/// by older tooling; unknown labels round-trip through `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AttendanceStatus {
    Present,
    PresentLateWaived,
    Late,
    HalfDay,
    Absent,
    WorkFromHome,
    OnDuty,
    Training,
    SickLeave,
    CasualLeave,
    EarnedLeave,
    PaidLeave,
    MaternityLeave,
    NationalHoliday,
    RegionalHoliday,
    Custom(String),
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Present => "Present",
            Self::PresentLateWaived => "Present (Late Waived)",
            Self::Late => "Late",
            Self::HalfDay => "Half Day",
            Self::Absent => "Absent",
            Self::WorkFromHome => "Work - Home",
            Self::OnDuty => "On Duty",
            Self::Training => "Training",
            Self::SickLeave => "Sick Leave",
            Self::CasualLeave => "Casual Leave",
            Self::EarnedLeave => "Earned Leave",
            Self::PaidLeave => "Paid Leave",
            Self::MaternityLeave => "Maternity Leave",
            Self::NationalHoliday => "National Holiday",
            Self::RegionalHoliday => "Regional Holidays",
            Self::Custom(label) => label,
        }
    }

    /// Fractional attendance credit assigned to the day.
    pub fn day_credit(&self) -> f64 {
        match self {
            Self::HalfDay => 0.5,
            Self::Absent => 0.0,
            Self::Present
            | Self::PresentLateWaived
            | Self::Late
            | Self::WorkFromHome
            | Self::OnDuty => 1.0,
            _ => 0.0,
        }
    }

    pub fn is_leave(&self) -> bool {
        matches!(
            self,
            Self::SickLeave
                | Self::CasualLeave
                | Self::EarnedLeave
                | Self::PaidLeave
                | Self::MaternityLeave
        )
    }

    pub fn is_holiday_like(&self) -> bool {
        match self {
            Self::NationalHoliday | Self::RegionalHoliday => true,
            Self::Custom(label) => label.contains("Holiday"),
            _ => false,
        }
    }

    /// Maps the label an admin typed on a manual entry to a status.
    pub fn from_manual_label(label: &str) -> Self {
        match label.trim() {
            "" | "Manual" => Self::Present,
            "Manual/WFH" => Self::WorkFromHome,
            other => Self::from(other.to_string()),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AttendanceStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Present" => Self::Present,
            "Present (Late Waived)" => Self::PresentLateWaived,
            "Late" => Self::Late,
            "Half Day" => Self::HalfDay,
            "Absent" => Self::Absent,
            "Work - Home" => Self::WorkFromHome,
            "On Duty" => Self::OnDuty,
            "Training" => Self::Training,
            "Sick Leave" => Self::SickLeave,
            "Casual Leave" => Self::CasualLeave,
            "Earned Leave" => Self::EarnedLeave,
            "Paid Leave" => Self::PaidLeave,
            "Maternity Leave" => Self::MaternityLeave,
            "National Holiday" => Self::NationalHoliday,
            "Regional Holidays" => Self::RegionalHoliday,
            _ => Self::Custom(label),
        }
    }
}

impl From<AttendanceStatus> for String {
    fn from(status: AttendanceStatus) -> Self {
        status.as_str().to_string()
    }
}

/// One record per check-out, per approved leave day, or per manual entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceLog {
    pub id: String,
    pub user_id: String,
    /// Local calendar day of the check-out (or of the leave day).
    pub date: NaiveDate,
    #[serde(default)]
    pub check_in: Option<NaiveTime>,
    /// `None` while the session is still open.
    #[serde(default)]
    pub check_out: Option<NaiveTime>,
    /// Worked duration; 0 when unmeasurable.
    #[serde(default)]
    pub duration_ms: i64,
    pub status: AttendanceStatus,
    /// Stored credit; legacy records may lack it (see `credit`).
    #[serde(default)]
    pub day_credit: Option<f64>,
    /// Whether this late arrival counts toward the penalty tally. Absent on
    /// legacy records; re-inferred by the legacy normalization step.
    #[serde(default)]
    pub late_countable: Option<bool>,
    #[serde(default)]
    pub extra_worked_ms: i64,
    #[serde(default)]
    pub manual_override: bool,
    /// Activity signal sampled at check-out, 0-100.
    #[serde(default)]
    pub activity_score: Option<u32>,
    /// Free-text description of the day's work.
    #[serde(default)]
    pub work_description: Option<String>,
    #[serde(default)]
    pub auto_checkout: bool,
    #[serde(default)]
    pub auto_checkout_requires_approval: bool,
    /// `None` until an admin approves or rejects the auto-checkout extra.
    #[serde(default)]
    pub auto_checkout_extra_approved: Option<bool>,
    /// Opaque to the core; carried for the location-aware UI.
    #[serde(default)]
    pub location: Option<serde_json::Value>,
}

impl AttendanceLog {
    /// Deterministic id for leave-derived entries; guarantees at most one
    /// naturally-generated log per user per calendar day.
    pub fn leave_log_id(user_id: &str, date: NaiveDate) -> String {
        format!("att_{user_id}_{date}")
    }

    pub fn credit(&self) -> f64 {
        self.day_credit.unwrap_or_else(|| self.status.day_credit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    In,
    #[default]
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSample {
    pub at: NaiveDateTime,
    pub rating: f64,
}

/// Per-status counts of a user's planned tasks within the rating window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionStats {
    pub completed: u32,
    pub in_process: u32,
    pub to_be_started: u32,
    pub overdue: u32,
    pub not_completed: u32,
}

impl CompletionStats {
    pub fn total(&self) -> u32 {
        self.completed + self.in_process + self.to_be_started + self.overdue + self.not_completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub presence: Presence,
    #[serde(default)]
    pub last_check_in: Option<NaiveDateTime>,
    #[serde(default)]
    pub current_location: Option<serde_json::Value>,
    #[serde(default = "default_rating")]
    pub rating: f64,
    #[serde(default)]
    pub completion_stats: CompletionStats,
    #[serde(default)]
    pub rating_history: Vec<RatingSample>,
}

fn default_rating() -> f64 {
    3.0
}

impl UserRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            presence: Presence::Out,
            last_check_in: None,
            current_location: None,
            rating: default_rating(),
            completion_stats: CompletionStats::default(),
            rating_history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskOutcome {
    Completed,
    NotCompleted,
}

/// A task's completion state; inferred from the planned date unless an
/// explicit terminal outcome has been set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    ToBeStarted,
    InProcess,
    Overdue,
    Completed,
    NotCompleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub planned_date: NaiveDate,
    /// Explicit terminal outcome set by the user; always wins over the
    /// date-derived status.
    #[serde(default)]
    pub outcome: Option<TaskOutcome>,
    #[serde(default)]
    pub completed_on: Option<NaiveDate>,
}

/// Mutually exclusive category a log is counted under; first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum StatCategory {
    WorkFromHome,
    Training,
    SickLeave,
    CasualLeave,
    EarnedLeave,
    PaidLeave,
    MaternityLeave,
    Absent,
    NationalHoliday,
    RegionalHoliday,
    Holiday,
    Present,
}

impl StatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkFromHome => "Work - Home",
            Self::Training => "Training",
            Self::SickLeave => "Sick Leave",
            Self::CasualLeave => "Casual Leave",
            Self::EarnedLeave => "Earned Leave",
            Self::PaidLeave => "Paid Leave",
            Self::MaternityLeave => "Maternity Leave",
            Self::Absent => "Absent",
            Self::NationalHoliday => "National Holiday",
            Self::RegionalHoliday => "Regional Holidays",
            Self::Holiday => "Holiday",
            Self::Present => "Present",
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StatCategory> for String {
    fn from(category: StatCategory) -> Self {
        category.as_str().to_string()
    }
}

impl From<String> for StatCategory {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Work - Home" => Self::WorkFromHome,
            "Training" => Self::Training,
            "Sick Leave" => Self::SickLeave,
            "Casual Leave" => Self::CasualLeave,
            "Earned Leave" => Self::EarnedLeave,
            "Paid Leave" => Self::PaidLeave,
            "Maternity Leave" => Self::MaternityLeave,
            "Absent" => Self::Absent,
            "National Holiday" => Self::NationalHoliday,
            "Regional Holidays" => Self::RegionalHoliday,
            "Holiday" => Self::Holiday,
            _ => Self::Present,
        }
    }
}

/// Derived summary of a user's logs over one inclusive date window.
/// Recomputed on demand; any cached copy is invalidated on writes to the
/// watched collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub breakdown: BTreeMap<StatCategory, u32>,
    pub present: u32,
    pub late: u32,
    pub leaves: u32,
    pub unpaid_leaves: u32,
    pub early_departures: u32,
    /// Day units deducted for accumulated countable lates.
    pub penalty: f64,
    /// Day units earned back from extra worked hours.
    pub penalty_offset: f64,
    /// `max(0, penalty - penalty_offset)`.
    pub effective_penalty: f64,
    pub extra_worked_hours: f64,
    pub total_late_minutes: i64,
    pub total_extra_minutes: i64,
}
