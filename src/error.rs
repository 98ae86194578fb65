//! DictMaker Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// DictMaker 코어 에러
#[derive(Error, Debug)]
pub enum DictError {
    /// 저장소를 열거나 만들 수 없음
    #[error("Connection error: {0}")]
    Connection(String),

    /// 파일은 있으나 필수 테이블(Entry, Senses)이 없음
    #[error("Not a valid dictionary database: {0}")]
    Structure(String),

    /// 호출자가 넘긴 필드가 필수 규칙을 위반
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Entry not found: {0}")]
    NotFound(i64),

    /// 임포트 페이로드의 컬럼/키/형태 오류
    #[error("Format error: {0}")]
    Format(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type DictResult<T> = Result<T, DictError>;

/// 호출자(UI/CLI) 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<DictError> for CommandError {
    fn from(error: DictError) -> Self {
        let code = match &error {
            DictError::Connection(_) => "CONNECTION_ERROR",
            DictError::Structure(_) => "STRUCTURE_ERROR",
            DictError::Validation(_) => "VALIDATION_ERROR",
            DictError::NotFound(_) => "NOT_FOUND",
            DictError::Format(_) => "FORMAT_ERROR",
            DictError::Database(_) => "DB_ERROR",
            DictError::Io(_) => "IO_ERROR",
            DictError::Serialization(_) => "SERIALIZATION_ERROR",
            DictError::Csv(_) => "CSV_ERROR",
        };

        let details = match &error {
            DictError::NotFound(id) => Some(id.to_string()),
            _ => None,
        };

        CommandError {
            code: code.to_string(),
            message: error.to_string(),
            details,
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_codes() {
        let err: CommandError = DictError::NotFound(7).into();
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.details.as_deref(), Some("7"));

        let err: CommandError = DictError::Format("missing columns".into()).into();
        assert_eq!(err.code, "FORMAT_ERROR");
        assert!(err.message.contains("missing columns"));
    }
}
