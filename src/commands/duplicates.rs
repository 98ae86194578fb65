//! Duplicate Commands
//!
//! 정규화 표제어(trim + lowercase) 기준 중복 찾기/병합/삭제.
//! 병합과 삭제는 실행 취소 로그에 기록되지 않으므로 실행 전에 백업을 남긴다.

use serde::Serialize;

use crate::commands::database::backup_database;
use crate::error::CommandResult;
use crate::models::DuplicateGroup;
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCleanup {
    pub removed: usize,
    pub remaining_groups: usize,
}

pub fn find_duplicates(state: &AppState) -> CommandResult<Vec<DuplicateGroup>> {
    Ok(state.db()?.find_duplicates()?)
}

/// 그룹마다 id가 가장 작은 표제어에 의미를 모으고 나머지를 지운다.
pub fn merge_duplicates(state: &mut AppState) -> CommandResult<DuplicateCleanup> {
    state.db()?;
    backup_database(state);

    let db = state.db()?;
    let removed = db.merge_duplicates()?;
    let remaining_groups = db.find_duplicates()?.len();

    Ok(DuplicateCleanup {
        removed,
        remaining_groups,
    })
}

/// 그룹마다 id가 가장 작은 표제어만 남기고 나머지는 의미까지 지운다.
pub fn delete_duplicates(state: &mut AppState) -> CommandResult<DuplicateCleanup> {
    state.db()?;
    backup_database(state);

    let db = state.db()?;
    let removed = db.delete_duplicates()?;
    let remaining_groups = db.find_duplicates()?.len();

    Ok(DuplicateCleanup {
        removed,
        remaining_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::database::{create_database, CreateDatabaseArgs};
    use crate::models::EntryFields;
    use crate::settings::AppPaths;
    use tempfile::tempdir;

    fn seeded_state(dir: &std::path::Path) -> AppState {
        let mut state = AppState::new(AppPaths::new(dir.join("data")));
        create_database(
            &mut state,
            CreateDatabaseArgs {
                path: dir.join("words.db").to_string_lossy().to_string(),
                overwrite: None,
            },
        )
        .unwrap();

        let db = state.db().unwrap();
        db.create_entry(&EntryFields::new("cat", vec!["feline".into()])).unwrap();
        db.create_entry(&EntryFields::new("Cat ", vec!["pet".into()])).unwrap();
        db.create_entry(&EntryFields::new("dog", vec!["canine".into()])).unwrap();
        state
    }

    #[test]
    fn test_merge_backs_up_and_collapses_groups() {
        let dir = tempdir().unwrap();
        let mut state = seeded_state(dir.path());

        let groups = find_duplicates(&state).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].normalized_headword, "cat");
        assert_eq!(groups[0].count, 2);

        let result = merge_duplicates(&mut state).unwrap();
        assert_eq!(
            result,
            DuplicateCleanup {
                removed: 1,
                remaining_groups: 0
            }
        );

        let backups: Vec<_> = std::fs::read_dir(state.paths.backup_dir()).unwrap().collect();
        assert_eq!(backups.len(), 1);

        let master = state.db().unwrap().get_entry(1).unwrap();
        assert_eq!(master.meanings, vec!["feline", "pet"]);
    }

    #[test]
    fn test_delete_duplicates_keeps_lowest_id() {
        let dir = tempdir().unwrap();
        let mut state = seeded_state(dir.path());

        let result = delete_duplicates(&mut state).unwrap();
        assert_eq!(result.removed, 1);

        let db = state.db().unwrap();
        assert_eq!(db.entry_count().unwrap(), 2);
        assert_eq!(db.get_entry(1).unwrap().meanings, vec!["feline"]);
        assert_eq!(db.sense_count().unwrap(), 2);
    }

    #[test]
    fn test_requires_open_database() {
        let dir = tempdir().unwrap();
        let mut state = AppState::new(AppPaths::new(dir.path()));
        assert_eq!(merge_duplicates(&mut state).unwrap_err().code, "CONNECTION_ERROR");
    }
}
