//! Names of the document-store collections the engine reads and writes.

pub const ATTENDANCE: &str = "attendance";
pub const USERS: &str = "users";
pub const WORK_PLANS: &str = "work_plans";
pub const LEAVES: &str = "leaves";
pub const MINUTES: &str = "minutes";

/// Any write to one of these collections invalidates derived period stats.
pub const STATS_WATCH_SET: [&str; 5] = [ATTENDANCE, USERS, WORK_PLANS, LEAVES, MINUTES];
