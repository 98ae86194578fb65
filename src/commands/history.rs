//! History Commands
//!
//! 실행 취소/다시 실행과 히스토리 조회

use serde::Serialize;

use crate::error::CommandResult;
use crate::history::HistoryPosition;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatus {
    pub position: HistoryPosition,
    pub undo_text: Option<String>,
    pub redo_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub description: String,
    pub entry_id: i64,
    /// cursor 앞쪽(현재 적용된 명령)이면 true
    pub applied: bool,
}

/// 되돌릴 것이 없으면 false
pub fn undo(state: &mut AppState) -> CommandResult<bool> {
    let (db, history) = state.db_and_history()?;
    Ok(history.undo(db)?)
}

pub fn redo(state: &mut AppState) -> CommandResult<bool> {
    let (db, history) = state.db_and_history()?;
    Ok(history.redo(db)?)
}

pub fn history_status(state: &AppState) -> HistoryStatus {
    HistoryStatus {
        position: state.history.position(),
        undo_text: state.history.undo_text(),
        redo_text: state.history.redo_text(),
    }
}

pub fn list_history(state: &AppState) -> Vec<HistoryItem> {
    let cursor = state.history.cursor();
    state
        .history
        .commands()
        .iter()
        .enumerate()
        .map(|(i, command)| HistoryItem {
            description: command.description(),
            entry_id: command.entry_id(),
            applied: i < cursor,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::entry::{save_entry, EditForm};
    use crate::db::Database;
    use crate::models::EntryFields;
    use crate::settings::AppPaths;
    use tempfile::tempdir;

    #[test]
    fn test_undo_redo_through_state() {
        let dir = tempdir().unwrap();
        let mut state = AppState::new(AppPaths::new(dir.path()));
        state.attach(Database::in_memory().unwrap());

        let id = save_entry(&mut state, &EditForm::new(EntryFields::new("cat", vec!["a".into()])))
            .unwrap()
            .entry_id;
        save_entry(
            &mut state,
            &EditForm::editing(id, EntryFields::new("kitty", vec!["b".into()])),
        )
        .unwrap();

        let status = history_status(&state);
        assert_eq!(status.undo_text.as_deref(), Some("Update Entry 'kitty'"));
        assert!(status.redo_text.is_none());

        assert!(undo(&mut state).unwrap());
        assert!(!undo(&mut state).unwrap());
        assert_eq!(state.db().unwrap().get_entry(id).unwrap().headword, "cat");

        let items = list_history(&state);
        assert_eq!(items.len(), 1);
        assert!(!items[0].applied);

        assert!(redo(&mut state).unwrap());
        assert!(list_history(&state)[0].applied);
    }

    #[test]
    fn test_undo_without_database() {
        let dir = tempdir().unwrap();
        let mut state = AppState::new(AppPaths::new(dir.path()));
        assert_eq!(undo(&mut state).unwrap_err().code, "CONNECTION_ERROR");
        assert_eq!(history_status(&state).position, HistoryPosition { cursor: 0, len: 0 });
    }
}
