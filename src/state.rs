//! Application State
//!
//! UI 쪽이 명시적으로 소유하고 명령 함수에 `&mut`로 넘기는 세션 객체.
//! 열린 사전 연결(최대 1개), 실행 취소 로그, 환경 설정, 사이드카 경로를 묶는다.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::db::Database;
use crate::error::{DictError, DictResult};
use crate::history::{CommandLog, HistoryListener};
use crate::settings::{self, AppPaths, Preferences};

pub struct AppState {
    db: Option<Database>,
    pub history: CommandLog,
    pub preferences: Preferences,
    pub paths: AppPaths,
    pub autosave: Autosave,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("history", &self.history)
            .field("preferences", &self.preferences)
            .field("paths", &self.paths)
            .finish()
    }
}

impl AppState {
    /// 설정 파일을 읽어 세션을 만든다. 사전은 아직 열지 않는다.
    pub fn new(paths: AppPaths) -> Self {
        let preferences = Preferences::load(&paths);
        let autosave = Autosave::new(preferences.autosave_interval);
        Self {
            db: None,
            history: CommandLog::new(),
            preferences,
            paths,
            autosave,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn HistoryListener>) -> Self {
        self.history.set_listener(listener);
        self
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    pub fn db(&self) -> DictResult<&Database> {
        self.db
            .as_ref()
            .ok_or_else(|| DictError::Connection("No database loaded".to_string()))
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db.as_ref().and_then(Database::path)
    }

    /// 저장소와 히스토리를 함께 빌려준다 (push/undo/redo용)
    pub fn db_and_history(&mut self) -> DictResult<(&Database, &mut CommandLog)> {
        let db = self
            .db
            .as_ref()
            .ok_or_else(|| DictError::Connection("No database loaded".to_string()))?;
        Ok((db, &mut self.history))
    }

    /// 연결 교체. 이전 연결은 닫히고 히스토리는 비워진다.
    /// 파일 기반이면 마지막 사전/최근 파일 기록을 갱신한다.
    pub fn attach(&mut self, db: Database) {
        self.history.clear();

        if let Some(path) = db.path().map(Path::to_path_buf) {
            if let Err(e) = settings::save_last_db(&self.paths, &path) {
                tracing::warn!("Failed to record last database: {}", e);
            }
            self.preferences.add_recent_file(&path.to_string_lossy());
            if let Err(e) = self.preferences.save(&self.paths) {
                tracing::warn!("Failed to save recent files: {}", e);
            }
        }

        self.db = Some(db);
    }

    pub fn close(&mut self) {
        self.history.clear();
        self.db = None;
    }

    pub fn last_db(&self) -> Option<PathBuf> {
        settings::load_last_db(&self.paths)
    }
}

/// 자동 저장 타이머 값 객체. 실제 타이머 구동은 호출자가 한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autosave {
    interval: Duration,
    last_tick: Option<Instant>,
}

impl Autosave {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(settings::clamp_autosave_interval(interval_secs)),
            last_tick: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval_secs: u64) {
        self.interval = Duration::from_secs(settings::clamp_autosave_interval(interval_secs));
    }

    /// 첫 호출은 타이머를 시작만 하고 false
    pub fn is_due(&mut self, now: Instant) -> bool {
        match self.last_tick {
            None => {
                self.last_tick = Some(now);
                false
            }
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.last_tick = Some(now);
    }
}
