pub mod clock;
pub mod commands;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod priority;
pub mod rollover;
pub mod storage;
pub mod stores;

pub use crate::clock::{days_between, Clock, ManualClock, SystemClock, Timezone};
pub use crate::commands::AppState;
pub use crate::config::AppConfig;
pub use crate::errors::{AppError, AppResult};
pub use crate::models::{
    ArchivePage, ArchiveQuery, ArchivedTodo, DailyTodo, DailyTodoList, DailyTodoSummary,
    RolloverResponse,
};
pub use crate::priority::Priority;
pub use crate::rollover::RolloverEngine;
pub use crate::storage::{DurableRecord, FsStorage, Storage};

/// Loads configuration from `config_path`, applies env overrides, starts file logging,
/// and opens the daily todo stores.
pub fn bootstrap(config_path: &std::path::Path) -> Result<AppState, String> {
    let config = AppConfig::load(config_path)
        .and_then(AppConfig::apply_env_overrides)
        .map_err(|error| error.to_string())?;
    std::fs::create_dir_all(&config.data_dir).map_err(|error| error.to_string())?;
    logging::init_tracing(&config.log_dir(), &config.log_level)?;

    let state = AppState::open(&config).map_err(|error| error.to_string())?;
    tracing::info!(data_dir = %config.data_dir.display(), "knowledge hub core started");
    Ok(state)
}
