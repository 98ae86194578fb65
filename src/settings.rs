//! Preferences & Sidecar Files
//!
//! 데이터 디렉토리에 저장되는 작은 JSON 파일들
//! - `settings.json`: 테마, 언어, 자동 저장 주기, 최근 파일
//! - `last_loaded_db.json`: 마지막으로 연 사전 경로 (시작 시 자동으로 다시 연다)
//!
//! 쓰기는 임시 파일에 쓰고 rename 한다.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DictResult;

pub const SETTINGS_FILE: &str = "settings.json";
pub const LAST_DB_FILE: &str = "last_loaded_db.json";
pub const BACKUP_DIR: &str = "backups";

/// 데이터 디렉토리 환경 변수
pub const DATA_DIR_ENV: &str = "DICTMAKER_DATA_DIR";

pub const MIN_AUTOSAVE_SECS: u64 = 30;
pub const MAX_AUTOSAVE_SECS: u64 = 300;
pub const MAX_RECENT_FILES: usize = 5;

/// 사이드카 파일 위치
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

impl AppPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// `DICTMAKER_DATA_DIR` > 사용자 설정 디렉토리 > 현재 디렉토리 순
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Self::new(dir);
            }
        }

        let data_dir = dirs::config_dir()
            .map(|p| p.join("dictmaker"))
            .unwrap_or_else(|| PathBuf::from(".dictmaker"));
        Self::new(data_dir)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn last_db_file(&self) -> PathBuf {
        self.data_dir.join(LAST_DB_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(BACKUP_DIR)
    }
}

/// 사용자 환경 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: String,
    pub language: String,
    /// 초 단위, 30..=300
    pub autosave_interval: u64,
    pub recent_files: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            language: "en".to_string(),
            autosave_interval: MIN_AUTOSAVE_SECS,
            recent_files: Vec::new(),
        }
    }
}

pub fn clamp_autosave_interval(secs: u64) -> u64 {
    secs.clamp(MIN_AUTOSAVE_SECS, MAX_AUTOSAVE_SECS)
}

impl Preferences {
    /// 파일이 없거나 깨져 있으면 기본값. 자동 저장 주기는 범위로 보정한다.
    pub fn load(paths: &AppPaths) -> Self {
        let path = paths.settings_file();
        let mut prefs = match read_json::<Preferences>(&path) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to load settings from {}: {}", path.display(), e);
                Self::default()
            }
        };

        prefs.autosave_interval = clamp_autosave_interval(prefs.autosave_interval);
        prefs.recent_files.truncate(MAX_RECENT_FILES);
        prefs
    }

    pub fn save(&self, paths: &AppPaths) -> DictResult<()> {
        write_json_atomic(&paths.settings_file(), self)
    }

    /// 보정된 값을 반환
    pub fn set_autosave_interval(&mut self, secs: u64) -> u64 {
        self.autosave_interval = clamp_autosave_interval(secs);
        self.autosave_interval
    }

    /// 맨 앞에 추가, 중복 제거, 최대 5개
    pub fn add_recent_file(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }
        self.recent_files.retain(|p| p != path);
        self.recent_files.insert(0, path.to_string());
        self.recent_files.truncate(MAX_RECENT_FILES);
    }

    pub fn remove_recent_file(&mut self, path: &str) {
        self.recent_files.retain(|p| p != path);
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LastDatabase {
    db_name: String,
}

/// 마지막으로 연 사전 경로 기록
pub fn save_last_db(paths: &AppPaths, db_path: &Path) -> DictResult<()> {
    let record = LastDatabase {
        db_name: db_path.to_string_lossy().to_string(),
    };
    write_json_atomic(&paths.last_db_file(), &record)
}

pub fn load_last_db(paths: &AppPaths) -> Option<PathBuf> {
    let path = paths.last_db_file();
    match read_json::<LastDatabase>(&path) {
        Ok(record) => record.map(|r| PathBuf::from(r.db_name)),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> DictResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> DictResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    drop(file);

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
