//! Entry Commands
//!
//! 표제어 저장/삭제/조회/검색, 자동 저장

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{CommandResult, DictResult};
use crate::history::EditCommand;
use crate::models::{Entry, EntryFields, SearchField, SearchHit};
use crate::state::AppState;

/// 편집 폼 상태. `current_entry_id`가 있으면 기존 표제어 편집 중이다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditForm {
    pub current_entry_id: Option<i64>,
    #[serde(flatten)]
    pub fields: EntryFields,
}

impl EditForm {
    pub fn new(fields: EntryFields) -> Self {
        Self {
            current_entry_id: None,
            fields,
        }
    }

    pub fn editing(entry_id: i64, fields: EntryFields) -> Self {
        Self {
            current_entry_id: Some(entry_id),
            fields,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub entry_id: i64,
    /// true = 새로 생성 (실행 취소 대상 아님), false = 수정 명령으로 기록됨
    pub created: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArgs {
    pub term: String,
    #[serde(default)]
    pub field: SearchField,
    #[serde(default)]
    pub fuzzy: bool,
}

/// 저장 버튼. 표제어와 의미가 필수다.
/// 새 표제어는 바로 생성하고, 기존 표제어 수정은 실행 취소 로그에 올린다.
pub fn save_entry(state: &mut AppState, form: &EditForm) -> CommandResult<SaveOutcome> {
    let fields = form.fields.clone().normalized();
    fields.validate()?;

    let (db, history) = state.db_and_history()?;
    match form.current_entry_id {
        Some(entry_id) => {
            let command = EditCommand::update(db, entry_id, fields)?;
            history.push(db, command)?;
            Ok(SaveOutcome {
                entry_id,
                created: false,
            })
        }
        None => {
            let entry_id = db.create_entry(&fields)?;
            Ok(SaveOutcome {
                entry_id,
                created: true,
            })
        }
    }
}

/// 자동 저장. 사전이 없거나 폼이 미완성이면 조용히 건너뛴다.
/// 실행 취소 로그를 거치지 않는다. 새로 만든 경우 폼에 id를 채워 다음 저장이 수정이 되게 한다.
pub fn autosave(state: &mut AppState, form: &mut EditForm) -> CommandResult<Option<i64>> {
    let Ok(db) = state.db() else {
        return Ok(None);
    };
    if !form.fields.is_complete() {
        return Ok(None);
    }

    let fields = form.fields.clone().normalized();
    let entry_id = match form.current_entry_id {
        Some(entry_id) => {
            db.update_entry(entry_id, &fields)?;
            entry_id
        }
        None => {
            let entry_id = db.create_entry(&fields)?;
            form.current_entry_id = Some(entry_id);
            entry_id
        }
    };

    tracing::debug!("Autosaved entry {}", entry_id);
    Ok(Some(entry_id))
}

/// 타이머 틱. 주기가 지났을 때만 자동 저장한다.
pub fn autosave_tick(state: &mut AppState, form: &mut EditForm, now: Instant) -> CommandResult<Option<i64>> {
    if !state.autosave.is_due(now) {
        return Ok(None);
    }
    state.autosave.reset(now);
    autosave(state, form)
}

pub fn get_entry(state: &AppState, entry_id: i64) -> CommandResult<Entry> {
    Ok(state.db()?.get_entry(entry_id)?)
}

/// 선택한 표제어 삭제. id마다 실행 취소 가능한 삭제 명령을 하나씩 올린다.
/// 모든 id의 스냅샷을 먼저 잡으므로, 하나라도 없으면 아무것도 지우지 않고 NotFound.
pub fn delete_entries(state: &mut AppState, entry_ids: &[i64]) -> CommandResult<usize> {
    let (db, history) = state.db_and_history()?;

    let mut seen = HashSet::new();
    let commands = entry_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .map(|id| EditCommand::delete(db, id))
        .collect::<DictResult<Vec<_>>>()?;

    let count = commands.len();
    for command in commands {
        history.push(db, command)?;
    }
    Ok(count)
}

/// 표제어 문자열이 같은 항목을 영구 삭제 (실행 취소 불가)
pub fn delete_by_headword(state: &mut AppState, headword: &str) -> CommandResult<usize> {
    Ok(state.db()?.delete_by_headword(headword)?)
}

pub fn list_headwords(state: &AppState) -> CommandResult<Vec<SearchHit>> {
    Ok(state.db()?.list_headwords()?)
}

pub fn search_entries(state: &AppState, args: SearchArgs) -> CommandResult<Vec<SearchHit>> {
    Ok(state.db()?.search(&args.term, args.field, args.fuzzy)?)
}

pub fn first_letters(state: &AppState) -> CommandResult<Vec<String>> {
    Ok(state.db()?.first_letters()?)
}

pub fn filter_by_letter(state: &AppState, letter: &str) -> CommandResult<Vec<SearchHit>> {
    Ok(state.db()?.filter_by_letter(letter)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::settings::AppPaths;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn open_state() -> (AppState, TempDir) {
        let dir = tempdir().unwrap();
        let mut state = AppState::new(AppPaths::new(dir.path()));
        state.attach(Database::in_memory().unwrap());
        (state, dir)
    }

    fn form(headword: &str, meanings: &[&str]) -> EditForm {
        EditForm::new(EntryFields::new(
            headword,
            meanings.iter().map(|m| m.to_string()).collect(),
        ))
    }

    #[test]
    fn test_save_requires_headword_and_meaning() {
        let (mut state, _dir) = open_state();
        let err = save_entry(&mut state, &form("", &["x"])).unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
        let err = save_entry(&mut state, &form("cat", &["  "])).unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert_eq!(state.db().unwrap().entry_count().unwrap(), 0);
    }

    #[test]
    fn test_save_new_is_not_undoable_but_edit_is() {
        let (mut state, _dir) = open_state();
        let created = save_entry(&mut state, &form("cat", &["feline", ""])).unwrap();
        assert!(created.created);
        assert!(!state.history.can_undo());
        assert_eq!(get_entry(&state, created.entry_id).unwrap().meanings, vec!["feline"]);

        let edit = EditForm::editing(created.entry_id, EntryFields::new("cat", vec!["pet".into()]));
        let outcome = save_entry(&mut state, &edit).unwrap();
        assert!(!outcome.created);
        assert!(state.history.can_undo());

        let (db, history) = state.db_and_history().unwrap();
        history.undo(db).unwrap();
        assert_eq!(get_entry(&state, created.entry_id).unwrap().meanings, vec!["feline"]);
    }

    #[test]
    fn test_save_without_database() {
        let dir = tempdir().unwrap();
        let mut state = AppState::new(AppPaths::new(dir.path()));
        let err = save_entry(&mut state, &form("cat", &["x"])).unwrap_err();
        assert_eq!(err.code, "CONNECTION_ERROR");
    }

    #[test]
    fn test_autosave_creates_then_updates_without_history() {
        let (mut state, _dir) = open_state();
        let mut f = form("cat", &["feline"]);

        let id = autosave(&mut state, &mut f).unwrap().unwrap();
        assert_eq!(f.current_entry_id, Some(id));

        f.fields.meanings.push("pet".into());
        assert_eq!(autosave(&mut state, &mut f).unwrap(), Some(id));
        assert_eq!(state.db().unwrap().entry_count().unwrap(), 1);
        assert_eq!(get_entry(&state, id).unwrap().meanings, vec!["feline", "pet"]);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_autosave_skips_incomplete_form_and_closed_db() {
        let (mut state, _dir) = open_state();
        let mut incomplete = form("cat", &[]);
        assert_eq!(autosave(&mut state, &mut incomplete).unwrap(), None);

        state.close();
        let mut complete = form("cat", &["x"]);
        assert_eq!(autosave(&mut state, &mut complete).unwrap(), None);
    }

    #[test]
    fn test_autosave_tick_waits_for_interval() {
        let (mut state, _dir) = open_state();
        let mut f = form("cat", &["feline"]);
        let start = Instant::now();

        assert_eq!(autosave_tick(&mut state, &mut f, start).unwrap(), None);
        assert_eq!(autosave_tick(&mut state, &mut f, start + Duration::from_secs(5)).unwrap(), None);
        assert!(autosave_tick(&mut state, &mut f, start + Duration::from_secs(30)).unwrap().is_some());
    }

    #[test]
    fn test_delete_entries_each_undoable() {
        let (mut state, _dir) = open_state();
        let a = save_entry(&mut state, &form("a", &["1"])).unwrap().entry_id;
        let b = save_entry(&mut state, &form("b", &["2"])).unwrap().entry_id;

        assert_eq!(delete_entries(&mut state, &[a, b]).unwrap(), 2);
        assert_eq!(state.history.len(), 2);
        assert!(list_headwords(&state).unwrap().is_empty());

        let (db, history) = state.db_and_history().unwrap();
        history.undo(db).unwrap();
        let remaining = list_headwords(&state).unwrap();
        assert_eq!(remaining.iter().map(|h| h.id).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_delete_entries_missing_id_deletes_nothing() {
        let (mut state, _dir) = open_state();
        let a = save_entry(&mut state, &form("a", &["1"])).unwrap().entry_id;

        let err = delete_entries(&mut state, &[a, 999]).unwrap_err();
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(state.db().unwrap().entry_count().unwrap(), 1);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_delete_entries_ignores_repeated_ids() {
        let (mut state, _dir) = open_state();
        let a = save_entry(&mut state, &form("a", &["1"])).unwrap().entry_id;

        assert_eq!(delete_entries(&mut state, &[a, a]).unwrap(), 1);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.db().unwrap().entry_count().unwrap(), 0);
    }

    #[test]
    fn test_undo_delete_after_new_save() {
        let (mut state, _dir) = open_state();
        save_entry(&mut state, &form("a", &["1"])).unwrap();
        let b = save_entry(&mut state, &form("b", &["2"])).unwrap().entry_id;

        delete_entries(&mut state, &[b]).unwrap();
        let c = save_entry(&mut state, &form("c", &["3"])).unwrap().entry_id;
        assert_ne!(b, c);

        let (db, history) = state.db_and_history().unwrap();
        assert!(history.undo(db).unwrap());
        assert_eq!(get_entry(&state, b).unwrap().headword, "b");
        assert_eq!(get_entry(&state, c).unwrap().headword, "c");
    }

    #[test]
    fn test_delete_by_headword_is_exact() {
        let (mut state, _dir) = open_state();
        save_entry(&mut state, &form("cat", &["1"])).unwrap();
        save_entry(&mut state, &form("cat", &["2"])).unwrap();
        save_entry(&mut state, &form("Cat", &["3"])).unwrap();

        assert_eq!(delete_by_headword(&mut state, "cat").unwrap(), 2);
        assert_eq!(list_headwords(&state).unwrap().len(), 1);
    }

    #[test]
    fn test_search_args_defaults() {
        let args: SearchArgs = serde_json::from_str(r#"{"term":"x"}"#).unwrap();
        assert_eq!(args.field, SearchField::All);
        assert!(!args.fuzzy);

        let f: EditForm = serde_json::from_str(
            r#"{"currentEntryId":3,"headword":"cat","partOfSpeech":"n","meanings":["a"]}"#,
        )
        .unwrap();
        assert_eq!(f.current_entry_id, Some(3));
        assert_eq!(f.fields.part_of_speech, "n");
    }
}
