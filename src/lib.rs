//! DictMaker - bilingual dictionary maker library
//!
//! SQLite 사전 저장소(Entry/Senses), 실행 취소 로그, CSV/JSON 교환, 중복 정리, 퍼지 검색.
//! 화면 계층은 `commands`의 함수들에 `AppState`를 넘겨 호출한다.

pub mod commands;
pub mod db;
pub mod error;
pub mod exchange;
pub mod history;
pub mod models;
pub mod settings;
pub mod state;
pub mod utils;

use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn find_upwards(start: PathBuf, filename: &str, max_hops: usize) -> Option<PathBuf> {
    let mut cur = start;
    for _ in 0..=max_hops {
        let candidate = cur.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        if !cur.pop() {
            break;
        }
    }
    None
}

/// 작업 디렉토리에서 위로 올라가며 `.env`를 찾아 로드한다 (`DICTMAKER_DATA_DIR`, `RUST_LOG` 등).
/// 파일이 없으면 조용히 넘어간다.
pub fn load_env() {
    let Some(path) = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_upwards(cwd, ".env", 4))
    else {
        return;
    };

    if let Err(e) = dotenvy::from_path(&path) {
        tracing::warn!("Failed to load {}: {}", path.display(), e);
    }
}

/// stderr 로깅. `RUST_LOG`가 없으면 `default_level`.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_upwards() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".env"), "X=1").unwrap();

        assert_eq!(find_upwards(nested.clone(), ".env", 4), Some(dir.path().join(".env")));
        assert_eq!(find_upwards(nested, ".env", 0), None);
    }
}
