use crate::priority::Priority;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTodo {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_date: NaiveDate,
    #[serde(default)]
    pub days_overdue: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedTodo {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub created_date: NaiveDate,
    pub archived_date: NaiveDate,
    pub days_to_complete: u32,
}

/// Contents of `daily-todos.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDocument {
    #[serde(default)]
    pub daily_todos: Vec<DailyTodo>,
    pub last_rollover_date: NaiveDate,
}

/// Contents of `daily-todos-archive.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveDocument {
    #[serde(default)]
    pub archived_todos: Vec<ArchivedTodo>,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDailyTodoRequest {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleCompleteResponse {
    pub id: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDailyTodoResponse {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriorityRequest {
    pub id: String,
    pub priority: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTodoList {
    pub items: Vec<DailyTodo>,
    pub last_rollover_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloverResponse {
    pub ran: bool,
    pub days_processed: u32,
    pub archived: usize,
    pub escalated: usize,
    pub purged: usize,
    pub last_rollover_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePage {
    pub items: Vec<ArchivedTodo>,
    pub total: usize,
    pub retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionUpdateResponse {
    pub retention_days: u32,
    pub purged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTodoSummary {
    pub incomplete: usize,
    pub completed: usize,
    pub overdue: usize,
    pub archived: usize,
    pub last_rollover_date: NaiveDate,
    pub retention_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn active_document_uses_camel_case_wire_names() {
        let raw = json!({
            "dailyTodos": [{
                "id": "a",
                "title": "Buy milk",
                "priority": "high",
                "completed": true,
                "completedAt": "2024-03-02T09:00:00Z",
                "createdAt": "2024-03-01T08:00:00Z",
                "createdDate": "2024-03-01",
                "daysOverdue": 1
            }],
            "lastRolloverDate": "2024-03-02"
        });
        let doc: ActiveDocument = serde_json::from_value(raw.clone()).expect("active document");
        assert_eq!(doc.daily_todos[0].priority, Priority::High);
        assert_eq!(doc.last_rollover_date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(serde_json::to_value(&doc).expect("serialize"), raw);
    }

    #[test]
    fn archive_document_defaults_retention() {
        let doc: ArchiveDocument =
            serde_json::from_value(json!({ "archivedTodos": [] })).expect("archive document");
        assert_eq!(doc.retention_days, DEFAULT_RETENTION_DAYS);
    }
}
