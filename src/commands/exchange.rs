//! Import/Export Commands

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::commands::database::backup_database;
use crate::error::CommandResult;
use crate::exchange::{self, ExchangeFormat};
use crate::state::AppState;
use crate::utils::resolve_path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeArgs {
    pub path: String,
    /// 없으면 확장자로 추정
    pub format: Option<ExchangeFormat>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeSummary {
    pub path: String,
    pub format: ExchangeFormat,
    pub count: usize,
}

fn resolve(args: &ExchangeArgs) -> CommandResult<(PathBuf, ExchangeFormat)> {
    let path = resolve_path(&args.path)?;
    let format = match args.format {
        Some(format) => format,
        None => ExchangeFormat::from_path(&path)?,
    };
    Ok((path, format))
}

pub fn export_entries(state: &AppState, args: ExchangeArgs) -> CommandResult<ExchangeSummary> {
    let db = state.db()?;
    let (path, format) = resolve(&args)?;
    let count = exchange::export_file(db, &path, format)?;

    Ok(ExchangeSummary {
        path: path.display().to_string(),
        format,
        count,
    })
}

/// 가져온 행은 모두 새 표제어가 된다. 실행 취소 대상이 아니므로 먼저 백업한다.
pub fn import_entries(state: &mut AppState, args: ExchangeArgs) -> CommandResult<ExchangeSummary> {
    state.db()?;
    let (path, format) = resolve(&args)?;
    backup_database(state);

    let count = exchange::import_file(state.db()?, &path, format)?;
    tracing::info!("Imported {} entries from {}", count, path.display());

    Ok(ExchangeSummary {
        path: path.display().to_string(),
        format,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::EntryFields;
    use crate::settings::AppPaths;
    use tempfile::tempdir;

    #[test]
    fn test_export_then_import_infers_format() {
        let dir = tempdir().unwrap();
        let mut state = AppState::new(AppPaths::new(dir.path().join("data")));
        state.attach(Database::in_memory().unwrap());
        state
            .db()
            .unwrap()
            .create_entry(&EntryFields::new("cat", vec!["feline".into(), "pet".into()]))
            .unwrap();

        let file = dir.path().join("out.json");
        let summary = export_entries(
            &state,
            ExchangeArgs {
                path: file.to_string_lossy().to_string(),
                format: None,
            },
        )
        .unwrap();
        assert_eq!(summary.format, ExchangeFormat::Json);
        assert_eq!(summary.count, 1);

        let summary = import_entries(
            &mut state,
            ExchangeArgs {
                path: file.to_string_lossy().to_string(),
                format: None,
            },
        )
        .unwrap();
        assert_eq!(summary.count, 1);

        let db = state.db().unwrap();
        assert_eq!(db.entry_count().unwrap(), 2);
        assert_eq!(db.get_entry(2).unwrap().meanings, vec!["feline", "pet"]);
    }

    #[test]
    fn test_unknown_extension_requires_format() {
        let dir = tempdir().unwrap();
        let mut state = AppState::new(AppPaths::new(dir.path().join("data")));
        state.attach(Database::in_memory().unwrap());

        let file = dir.path().join("out.txt");
        let err = export_entries(
            &state,
            ExchangeArgs {
                path: file.to_string_lossy().to_string(),
                format: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code, "FORMAT_ERROR");

        let summary = export_entries(
            &state,
            ExchangeArgs {
                path: file.to_string_lossy().to_string(),
                format: Some(ExchangeFormat::Csv),
            },
        )
        .unwrap();
        assert_eq!(summary.count, 0);
        assert!(std::fs::read_to_string(&file).unwrap().starts_with("id,headword"));
    }

    #[test]
    fn test_failed_import_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let mut state = AppState::new(AppPaths::new(dir.path().join("data")));
        state.attach(Database::in_memory().unwrap());

        let file = dir.path().join("bad.csv");
        std::fs::write(&file, "headword,meanings\ncat,feline\n").unwrap();
        let err = import_entries(
            &mut state,
            ExchangeArgs {
                path: file.to_string_lossy().to_string(),
                format: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code, "FORMAT_ERROR");
        assert_eq!(state.db().unwrap().entry_count().unwrap(), 0);
    }
}
