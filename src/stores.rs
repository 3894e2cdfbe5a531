use crate::clock::days_between;
use crate::errors::AppResult;
use crate::models::{ActiveDocument, ArchiveDocument, ArchivedTodo};
use crate::storage::{DurableRecord, Storage};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

pub const ACTIVE_FILE_NAME: &str = "daily-todos.json";
pub const ARCHIVE_FILE_NAME: &str = "daily-todos-archive.json";

const ACTIVE_PARSE_ERROR: &str = "DAILY_TODOS_PARSE_ERROR";
const ARCHIVE_PARSE_ERROR: &str = "DAILY_TODOS_ARCHIVE_PARSE_ERROR";

pub struct ActiveStore {
    record: DurableRecord<ActiveDocument>,
}

impl ActiveStore {
    pub fn new(storage: Arc<dyn Storage>, data_dir: &Path) -> Self {
        Self {
            record: DurableRecord::new(
                storage,
                data_dir.join(ACTIVE_FILE_NAME),
                ACTIVE_PARSE_ERROR,
            ),
        }
    }

    /// Creates an empty document stamped `today` when none exists yet.
    pub fn initialize(&self, today: NaiveDate) -> AppResult<bool> {
        let (_, created) = self.record.load_or_init(|| empty_active(today))?;
        if created {
            tracing::info!(path = %self.record.path().display(), "initialized daily todo store");
        }
        Ok(created)
    }

    pub fn load(&self, today: NaiveDate) -> AppResult<ActiveDocument> {
        self.record
            .load_or_init(|| empty_active(today))
            .map(|(document, _)| document)
    }

    pub fn save(&self, document: &ActiveDocument) -> AppResult<()> {
        self.record.save(document)
    }
}

fn empty_active(today: NaiveDate) -> ActiveDocument {
    ActiveDocument {
        daily_todos: Vec::new(),
        last_rollover_date: today,
    }
}

pub struct ArchiveStore {
    record: DurableRecord<ArchiveDocument>,
    default_retention_days: u32,
}

impl ArchiveStore {
    pub fn new(storage: Arc<dyn Storage>, data_dir: &Path, default_retention_days: u32) -> Self {
        Self {
            record: DurableRecord::new(
                storage,
                data_dir.join(ARCHIVE_FILE_NAME),
                ARCHIVE_PARSE_ERROR,
            ),
            default_retention_days,
        }
    }

    pub fn initialize(&self) -> AppResult<bool> {
        let (_, created) = self.record.load_or_init(|| self.empty())?;
        if created {
            tracing::info!(
                path = %self.record.path().display(),
                retention_days = self.default_retention_days,
                "initialized daily todo archive"
            );
        }
        Ok(created)
    }

    pub fn load(&self) -> AppResult<ArchiveDocument> {
        self.record
            .load_or_init(|| self.empty())
            .map(|(document, _)| document)
    }

    pub fn save(&self, document: &ArchiveDocument) -> AppResult<()> {
        self.record.save(document)
    }

    fn empty(&self) -> ArchiveDocument {
        ArchiveDocument {
            archived_todos: Vec::new(),
            retention_days: self.default_retention_days,
        }
    }
}

impl ArchiveDocument {
    /// Appends entries whose id is not already archived. Returns how many were added.
    pub fn append(&mut self, entries: Vec<ArchivedTodo>) -> usize {
        let mut known: HashSet<String> = self
            .archived_todos
            .iter()
            .map(|entry| entry.id.clone())
            .collect();
        let mut added = 0;
        for entry in entries {
            if known.insert(entry.id.clone()) {
                self.archived_todos.push(entry);
                added += 1;
            }
        }
        added
    }

    /// Drops entries archived more than `retention_days` before `today`.
    pub fn cleanup(&mut self, today: NaiveDate) -> usize {
        let retention_days = self.retention_days;
        let before = self.archived_todos.len();
        self.archived_todos
            .retain(|entry| days_between(entry.archived_date, today) <= retention_days);
        before - self.archived_todos.len()
    }
}
