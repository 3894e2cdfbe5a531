use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::errors::AppResult;
use crate::models::{
    ArchivePage, ArchiveQuery, CreateDailyTodoRequest, DailyTodo, DailyTodoList, DailyTodoSummary,
    DeleteDailyTodoResponse, RetentionUpdateResponse, RolloverResponse, ToggleCompleteResponse,
    UpdatePriorityRequest,
};
use crate::rollover::RolloverEngine;
use crate::storage::{FsStorage, Storage};
use std::sync::Arc;

/// Handle the UI layer calls into. Every call runs on the blocking pool and returns
/// `Err(String)` carrying the coded error message.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<RolloverEngine>,
}

impl AppState {
    pub fn new(engine: Arc<RolloverEngine>) -> Self {
        Self { engine }
    }

    /// Opens the stores under `config.data_dir` on the real filesystem and system clock.
    pub fn open(config: &AppConfig) -> AppResult<Self> {
        let storage: Arc<dyn Storage> = Arc::new(FsStorage);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.timezone));
        let engine = RolloverEngine::open(config, storage, clock)?;
        Ok(Self::new(Arc::new(engine)))
    }

    pub fn engine(&self) -> &Arc<RolloverEngine> {
        &self.engine
    }

    async fn call<T, F>(&self, operation: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&RolloverEngine) -> AppResult<T> + Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || operation(engine.as_ref()))
            .await
            .map_err(to_client_error)?
            .map_err(to_client_error)
    }

    pub async fn daily_todos_list(&self) -> Result<DailyTodoList, String> {
        self.call(|engine| engine.list()).await
    }

    pub async fn daily_todo_get(&self, id: String) -> Result<DailyTodo, String> {
        self.call(move |engine| engine.get(&id)).await
    }

    pub async fn daily_todo_create(
        &self,
        payload: CreateDailyTodoRequest,
    ) -> Result<DailyTodo, String> {
        self.call(move |engine| engine.create(&payload.title)).await
    }

    pub async fn daily_todo_toggle(&self, id: String) -> Result<ToggleCompleteResponse, String> {
        self.call(move |engine| engine.toggle_complete(&id)).await
    }

    pub async fn daily_todo_delete(&self, id: String) -> Result<DeleteDailyTodoResponse, String> {
        self.call(move |engine| engine.delete(&id)).await
    }

    pub async fn daily_todo_update_priority(
        &self,
        payload: UpdatePriorityRequest,
    ) -> Result<DailyTodo, String> {
        self.call(move |engine| engine.update_priority(&payload.id, &payload.priority))
            .await
    }

    pub async fn daily_todos_rollover(&self) -> Result<RolloverResponse, String> {
        self.call(|engine| engine.rollover()).await
    }

    pub async fn daily_todos_archive(&self, query: ArchiveQuery) -> Result<ArchivePage, String> {
        self.call(move |engine| engine.archive(query)).await
    }

    pub async fn daily_todos_set_retention(
        &self,
        retention_days: u32,
    ) -> Result<RetentionUpdateResponse, String> {
        self.call(move |engine| engine.set_retention_days(retention_days))
            .await
    }

    pub async fn daily_todos_summary(&self) -> Result<DailyTodoSummary, String> {
        self.call(|engine| engine.summary()).await
    }
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
