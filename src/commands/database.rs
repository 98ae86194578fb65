//! Database Commands
//!
//! 사전 파일 생성/열기, 최근 파일, 통계, 백업

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{CommandResult, DictError};
use crate::models::DbStatistics;
use crate::state::AppState;
use crate::utils::{resolve_path, with_db_extension};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseArgs {
    pub path: String,
    /// true면 같은 이름의 기존 파일을 지우고 새로 만든다
    pub overwrite: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadDatabaseArgs {
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub path: String,
    pub headword_count: i64,
}

fn database_info(db: &Database) -> CommandResult<DatabaseInfo> {
    Ok(DatabaseInfo {
        path: db
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        headword_count: db.entry_count()?,
    })
}

/// 새 사전 생성 (`.db` 확장자 보장)
pub fn create_database(state: &mut AppState, args: CreateDatabaseArgs) -> CommandResult<DatabaseInfo> {
    let path = with_db_extension(&resolve_path(&args.path)?);

    if path.exists() {
        if !args.overwrite.unwrap_or(false) {
            return Err(DictError::Connection(format!(
                "The database file already exists: {}",
                path.display()
            ))
            .into());
        }
        std::fs::remove_file(&path).map_err(|e| {
            DictError::Connection(format!("Unable to delete existing file: {}", e))
        })?;
    }

    let db = Database::create(&path)?;
    let info = database_info(&db)?;
    state.attach(db);
    Ok(info)
}

/// 기존 사전 열기. 구조가 잘못된 파일은 거부하고 현재 연결을 유지한다.
pub fn load_database(state: &mut AppState, args: LoadDatabaseArgs) -> CommandResult<DatabaseInfo> {
    let path = resolve_path(&args.path)?;
    let db = Database::open(&path)?;
    let info = database_info(&db)?;
    state.attach(db);
    Ok(info)
}

/// 최근 파일 열기. 파일이 사라졌으면 목록에서 빼고 실패한다.
pub fn open_recent(state: &mut AppState, path: &str) -> CommandResult<DatabaseInfo> {
    if !Path::new(path).exists() {
        state.preferences.remove_recent_file(path);
        if let Err(e) = state.preferences.save(&state.paths) {
            tracing::warn!("Failed to save recent files: {}", e);
        }
        return Err(DictError::Connection(format!(
            "Cannot find {}. It was removed from the recent files list.",
            path
        ))
        .into());
    }

    load_database(state, LoadDatabaseArgs { path: path.to_string() })
}

/// 시작 시 마지막으로 연 사전을 다시 연다. 기록이 없거나 파일이 없으면 None.
pub fn reopen_last(state: &mut AppState) -> CommandResult<Option<DatabaseInfo>> {
    let Some(path) = state.last_db() else {
        return Ok(None);
    };
    if !path.exists() {
        tracing::info!("Last database no longer exists: {}", path.display());
        return Ok(None);
    }

    let db = Database::open(&path)?;
    let info = database_info(&db)?;
    state.attach(db);
    Ok(Some(info))
}

pub fn list_recent_files(state: &AppState) -> Vec<String> {
    state.preferences.recent_files.clone()
}

pub fn database_statistics(state: &AppState) -> CommandResult<DbStatistics> {
    Ok(state.db()?.statistics()?)
}

/// 현재 사전을 `backups/<파일명>_<시각>.bak`으로 복제한다.
/// 실패는 로그만 남기고 None. 호출한 작업을 막지 않는다.
pub fn backup_database(state: &AppState) -> Option<PathBuf> {
    let db = state.db().ok()?;
    let db_path = db.path()?;
    let file_name = db_path.file_name()?.to_string_lossy().to_string();

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = state
        .paths
        .backup_dir()
        .join(format!("{}_{}.bak", file_name, timestamp));

    match db.backup_to(&backup_path) {
        Ok(()) => {
            tracing::info!("Database backed up to {}", backup_path.display());
            Some(backup_path)
        }
        Err(e) => {
            tracing::warn!("Database backup failed: {}", e);
            None
        }
    }
}
