// Library interface for stridelog modules
// This allows integration tests to access the core functionality

pub mod config;
pub mod daily;
pub mod error;
pub mod import;
pub mod logging;
pub mod models;
pub mod pace;
pub mod plan;
pub mod pmc;
pub mod readiness;
pub mod services;
pub mod session;
pub mod store;
pub mod stress;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{Result, StrideError};
pub use import::ImportManager;
pub use logging::{LogFormat, LogLevel};
pub use models::{AthleteProfile, DailyLoad, PlannedWorkout, WorkoutRecord};
pub use pmc::{PmcCalculator, PmcConfig};
pub use readiness::{ReadinessBand, ReadinessBands, ReadinessEvaluator};
pub use session::TrainingSession;
pub use store::{SqliteStore, TrainingStore};
