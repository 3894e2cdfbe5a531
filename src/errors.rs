use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("VALIDATION_ERROR: {0}")]
    Validation(String),
    #[error("DAILY_TODO_NOT_FOUND: {0}")]
    DailyTodoNotFound(String),
    #[error("{code}: failed to parse {path}: {message}")]
    Parse {
        code: &'static str,
        path: String,
        message: String,
    },
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::DailyTodoNotFound(_) => "DAILY_TODO_NOT_FOUND",
            Self::Parse { code, .. } => *code,
            Self::Config(_) => "CONFIG_INVALID",
            Self::Io(_) => "IO_FAILURE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
