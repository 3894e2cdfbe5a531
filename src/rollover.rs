use crate::clock::{days_between, Clock};
use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ActiveDocument, ArchiveDocument, ArchivePage, ArchiveQuery, ArchivedTodo, DailyTodo,
    DailyTodoList, DailyTodoSummary, DeleteDailyTodoResponse, RetentionUpdateResponse,
    RolloverResponse, ToggleCompleteResponse,
};
use crate::priority::Priority;
use crate::storage::Storage;
use crate::stores::{ActiveStore, ArchiveStore};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub const MAX_TITLE_CHARS: usize = 500;
pub const MAX_RETENTION_DAYS: u32 = 3650;
const MAX_ARCHIVE_PAGE: usize = 500;

struct Stores {
    active: ActiveStore,
    archive: ArchiveStore,
}

/// Effect of one catch-up pass over the active list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RolloverOutcome {
    pub days_processed: u32,
    pub archived: usize,
    pub escalated: usize,
    pub purged: usize,
}

/// Owns the daily todo stores and applies the lazy day rollover before every operation.
///
/// Every public method holds the store mutex for its whole load, catch-up, mutate, save
/// cycle, so two callers straddling midnight cannot both observe a stale
/// `lastRolloverDate`.
pub struct RolloverEngine {
    stores: Mutex<Stores>,
    clock: Arc<dyn Clock>,
    archive_page_limit: usize,
}

impl RolloverEngine {
    /// Prepares the data directory and writes empty store documents if they are missing.
    pub fn open(
        config: &AppConfig,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        config.validate()?;
        storage.ensure_directory(&config.data_dir)?;

        let active = ActiveStore::new(storage.clone(), &config.data_dir);
        let archive = ArchiveStore::new(storage, &config.data_dir, config.retention_days);
        active.initialize(clock.today())?;
        archive.initialize()?;

        Ok(Self {
            stores: Mutex::new(Stores { active, archive }),
            clock,
            archive_page_limit: config.archive_page_limit,
        })
    }

    pub fn list(&self) -> AppResult<DailyTodoList> {
        let stores = self.lock()?;
        let (now, today) = self.instant();
        let (mut active, _) = catch_up(&stores, self.clock.as_ref(), now, today)?;
        sort_todos(&mut active.daily_todos);
        Ok(DailyTodoList {
            items: active.daily_todos,
            last_rollover_date: active.last_rollover_date,
        })
    }

    pub fn get(&self, id: &str) -> AppResult<DailyTodo> {
        let stores = self.lock()?;
        let (now, today) = self.instant();
        let (active, _) = catch_up(&stores, self.clock.as_ref(), now, today)?;
        active
            .daily_todos
            .into_iter()
            .find(|todo| todo.id == id)
            .ok_or_else(|| not_found(id))
    }

    pub fn create(&self, title: &str) -> AppResult<DailyTodo> {
        let title = validate_title(title)?;
        let stores = self.lock()?;
        let (now, today) = self.instant();
        let (mut active, _) = catch_up(&stores, self.clock.as_ref(), now, today)?;

        let todo = DailyTodo {
            id: Uuid::new_v4().to_string(),
            title,
            priority: Priority::Medium,
            completed: false,
            completed_at: None,
            created_at: now,
            created_date: today,
            days_overdue: 0,
        };
        active.daily_todos.push(todo.clone());
        stores.active.save(&active)?;
        tracing::debug!(todo_id = %todo.id, "daily todo created");
        Ok(todo)
    }

    pub fn toggle_complete(&self, id: &str) -> AppResult<ToggleCompleteResponse> {
        let stores = self.lock()?;
        let (now, today) = self.instant();
        let (mut active, _) = catch_up(&stores, self.clock.as_ref(), now, today)?;

        let todo = find_mut(&mut active, id)?;
        todo.completed = !todo.completed;
        todo.completed_at = todo.completed.then_some(now);
        let response = ToggleCompleteResponse {
            id: todo.id.clone(),
            completed: todo.completed,
            completed_at: todo.completed_at,
        };

        stores.active.save(&active)?;
        tracing::debug!(
            todo_id = %response.id,
            completed = response.completed,
            "daily todo toggled"
        );
        Ok(response)
    }

    pub fn delete(&self, id: &str) -> AppResult<DeleteDailyTodoResponse> {
        let stores = self.lock()?;
        let (now, today) = self.instant();
        let (mut active, _) = catch_up(&stores, self.clock.as_ref(), now, today)?;

        let before = active.daily_todos.len();
        active.daily_todos.retain(|todo| todo.id != id);
        if active.daily_todos.len() == before {
            return Err(not_found(id));
        }

        stores.active.save(&active)?;
        tracing::debug!(todo_id = %id, "daily todo deleted");
        Ok(DeleteDailyTodoResponse {
            id: id.to_string(),
            deleted: true,
        })
    }

    /// Sets `priority` directly. Unlike escalation this may move down the ladder.
    pub fn update_priority(&self, id: &str, priority: &str) -> AppResult<DailyTodo> {
        let priority = Priority::parse(priority).ok_or_else(|| {
            AppError::Validation(format!(
                "priority must be one of low, medium, high, critical; got '{priority}'"
            ))
        })?;
        let stores = self.lock()?;
        let (now, today) = self.instant();
        let (mut active, _) = catch_up(&stores, self.clock.as_ref(), now, today)?;

        let todo = find_mut(&mut active, id)?;
        todo.priority = priority;
        let updated = todo.clone();

        stores.active.save(&active)?;
        tracing::debug!(todo_id = %id, priority = priority.as_str(), "daily todo priority set");
        Ok(updated)
    }

    pub fn rollover(&self) -> AppResult<RolloverResponse> {
        let stores = self.lock()?;
        let (now, today) = self.instant();
        let (active, outcome) = catch_up(&stores, self.clock.as_ref(), now, today)?;
        let ran = outcome.is_some();
        let outcome = outcome.unwrap_or_default();
        Ok(RolloverResponse {
            ran,
            days_processed: outcome.days_processed,
            archived: outcome.archived,
            escalated: outcome.escalated,
            purged: outcome.purged,
            last_rollover_date: active.last_rollover_date,
        })
    }

    pub fn archive(&self, query: ArchiveQuery) -> AppResult<ArchivePage> {
        if let (Some(from), Some(to)) = (query.from_date, query.to_date) {
            if from > to {
                return Err(AppError::Validation(format!(
                    "fromDate {from} is after toDate {to}"
                )));
            }
        }
        let stores = self.lock()?;
        let (now, today) = self.instant();
        catch_up(&stores, self.clock.as_ref(), now, today)?;
        let archive = stores.archive.load()?;

        let mut matches: Vec<ArchivedTodo> = archive
            .archived_todos
            .into_iter()
            .filter(|entry| query.from_date.map_or(true, |from| entry.archived_date >= from))
            .filter(|entry| query.to_date.map_or(true, |to| entry.archived_date <= to))
            .collect();
        matches.sort_by(|a, b| {
            b.archived_date
                .cmp(&a.archived_date)
                .then_with(|| b.completed_at.cmp(&a.completed_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matches.len();
        let offset = query.offset.unwrap_or(0);
        let limit = query
            .limit
            .unwrap_or(self.archive_page_limit)
            .clamp(1, MAX_ARCHIVE_PAGE);
        let items = matches.into_iter().skip(offset).take(limit).collect();

        Ok(ArchivePage {
            items,
            total,
            retention_days: archive.retention_days,
        })
    }

    pub fn set_retention_days(&self, retention_days: u32) -> AppResult<RetentionUpdateResponse> {
        if !(1..=MAX_RETENTION_DAYS).contains(&retention_days) {
            return Err(AppError::Validation(format!(
                "retentionDays must be between 1 and {MAX_RETENTION_DAYS}; got {retention_days}"
            )));
        }
        let stores = self.lock()?;
        let (now, today) = self.instant();
        catch_up(&stores, self.clock.as_ref(), now, today)?;

        let mut archive = stores.archive.load()?;
        archive.retention_days = retention_days;
        let purged = archive.cleanup(today);
        stores.archive.save(&archive)?;
        tracing::info!(retention_days, purged, "daily todo archive retention updated");
        Ok(RetentionUpdateResponse {
            retention_days,
            purged,
        })
    }

    pub fn summary(&self) -> AppResult<DailyTodoSummary> {
        let stores = self.lock()?;
        let (now, today) = self.instant();
        let (active, _) = catch_up(&stores, self.clock.as_ref(), now, today)?;
        let archive = stores.archive.load()?;

        let completed = active.daily_todos.iter().filter(|todo| todo.completed).count();
        Ok(DailyTodoSummary {
            incomplete: active.daily_todos.len() - completed,
            completed,
            overdue: active
                .daily_todos
                .iter()
                .filter(|todo| !todo.completed && todo.days_overdue > 0)
                .count(),
            archived: archive.archived_todos.len(),
            last_rollover_date: active.last_rollover_date,
            retention_days: archive.retention_days,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Stores>> {
        self.stores
            .lock()
            .map_err(|_| AppError::Internal("daily todo store mutex poisoned".to_string()))
    }

    fn instant(&self) -> (DateTime<Utc>, NaiveDate) {
        let now = self.clock.now();
        (now, self.clock.date_of(now))
    }
}

/// Loads the active list and, if `lastRolloverDate` is behind `today`, rolls it forward
/// and persists both stores. The archive is written before the active list so an
/// interrupted pass leaves an item duplicated rather than lost.
fn catch_up(
    stores: &Stores,
    clock: &dyn Clock,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> AppResult<(ActiveDocument, Option<RolloverOutcome>)> {
    let mut active = stores.active.load(today)?;
    if active.last_rollover_date > today {
        tracing::warn!(
            last_rollover_date = %active.last_rollover_date,
            today = %today,
            "clock is behind last rollover date; skipping rollover"
        );
        return Ok((active, None));
    }
    if active.last_rollover_date == today {
        return Ok((active, None));
    }

    let mut archive = stores.archive.load()?;
    let outcome = perform_rollover(&mut active, &mut archive, clock, now, today);
    stores.archive.save(&archive)?;
    stores.active.save(&active)?;

    tracing::info!(
        days = outcome.days_processed,
        archived = outcome.archived,
        escalated = outcome.escalated,
        purged = outcome.purged,
        today = %today,
        "daily todo rollover completed"
    );
    Ok((active, Some(outcome)))
}

/// Replays every missed day, oldest first. Completed todos move to the archive stamped
/// `today`; incomplete ones gain one overdue day and one priority rung per day.
pub fn perform_rollover(
    active: &mut ActiveDocument,
    archive: &mut ArchiveDocument,
    clock: &dyn Clock,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> RolloverOutcome {
    let mut outcome = RolloverOutcome::default();
    if active.last_rollover_date >= today {
        return outcome;
    }

    let days_missed = days_between(active.last_rollover_date, today);
    let mut archived = Vec::new();
    let mut escalated = std::collections::HashSet::new();
    for _ in 0..days_missed {
        let (done, mut pending): (Vec<DailyTodo>, Vec<DailyTodo>) =
            std::mem::take(&mut active.daily_todos)
                .into_iter()
                .partition(|todo| todo.completed);
        archived.extend(
            done.into_iter()
                .map(|todo| archive_entry(todo, clock, now, today)),
        );
        for todo in &mut pending {
            todo.days_overdue = todo.days_overdue.saturating_add(1);
            todo.priority = todo.priority.next();
            escalated.insert(todo.id.clone());
        }
        active.daily_todos = pending;
    }

    outcome.days_processed = days_missed;
    outcome.escalated = escalated.len();
    outcome.archived = archive.append(archived);
    outcome.purged = archive.cleanup(today);
    active.last_rollover_date = today;
    outcome
}

fn archive_entry(
    todo: DailyTodo,
    clock: &dyn Clock,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> ArchivedTodo {
    let completed_at = todo.completed_at.unwrap_or(now);
    ArchivedTodo {
        days_to_complete: days_between(todo.created_date, clock.date_of(completed_at)),
        id: todo.id,
        title: todo.title,
        priority: todo.priority,
        completed_at,
        created_at: todo.created_at,
        created_date: todo.created_date,
        archived_date: today,
    }
}

/// Incomplete first, then priority high to low, then most overdue, then oldest.
pub fn sort_todos(todos: &mut [DailyTodo]) {
    todos.sort_by(compare_todos);
}

fn compare_todos(a: &DailyTodo, b: &DailyTodo) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| b.days_overdue.cmp(&a.days_overdue))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn validate_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn find_mut<'a>(active: &'a mut ActiveDocument, id: &str) -> AppResult<&'a mut DailyTodo> {
    active
        .daily_todos
        .iter_mut()
        .find(|todo| todo.id == id)
        .ok_or_else(|| not_found(id))
}

fn not_found(id: &str) -> AppError {
    AppError::DailyTodoNotFound(format!("No daily todo with id {id}"))
}
