pub mod cache;
pub mod classifier;
pub mod error;
pub mod legacy;
pub mod ranking;
pub mod rating;
pub mod session;
pub mod stats;

pub use cache::StatsCache;
pub use classifier::{classify, Classification, ClassifyInput};
pub use error::{EngineError, Result};
pub use ranking::{HeroOfWeek, PerformanceTrend, RankingEngine};
pub use rating::{RatingEngine, RatingReport, DEFAULT_RATING_WINDOW_DAYS};
pub use session::{CheckOutOptions, CheckOutRequest, EntryPatch, ManualEntry, SessionManager};
pub use stats::StatsAggregator;
