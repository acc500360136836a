// Library surface for the CLI and integration tests.
pub mod analytics;
pub mod app_dirs;
pub mod clock;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod session;
pub mod storage;
pub mod typing_policy;
pub mod util;

pub use analytics::{AnalyticsData, AnalyticsStore, Timeframe};
pub use compare::{compare_texts, Comparison, Outcome};
pub use engine::SessionEngine;
pub use error::StorageError;
pub use metrics::{calculate_metrics, MetricsRecord};
pub use session::{Difficulty, SessionRecord, SessionStatus, Snippet};
