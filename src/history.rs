//! Edit History (Undo/Redo)
//!
//! 되돌릴 수 있는 편집 명령과 선형 실행 취소 로그.
//!
//! - `cursor` = 현재 적용된 명령 수 (`0 <= cursor <= len`)
//! - 새 명령을 push 하면 cursor 뒤(되돌려진 명령들)는 버려진다
//! - cursor가 바뀔 때마다 `HistoryListener`에 알린다. 로그는 UI 상태를 갖지 않는다.
//!
//! 명령의 적용/되돌리기는 항상 "전체 교체"다. 명령 생성 이후 같은 표제어를
//! 다른 경로(자동 저장, 일괄 삭제 등)로 바꿨다면 결과는 보장되지 않는다.

use serde::Serialize;

use crate::db::Database;
use crate::error::DictResult;
use crate::models::{EntryFields, EntrySnapshot};

/// 되돌릴 수 있는 편집 명령. 생성 후에는 바뀌지 않는다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    /// 표제어 수정: 이전/이후 스칼라 필드와 의미 목록
    Update {
        entry_id: i64,
        before: EntryFields,
        after: EntryFields,
    },
    /// 표제어 삭제: 원래 id와 의미까지 포함한 전체 스냅샷
    Delete { snapshot: EntrySnapshot },
}

impl EditCommand {
    /// 현재 저장소 상태를 `before`로 잡아 수정 명령을 만든다.
    pub fn update(db: &Database, entry_id: i64, after: EntryFields) -> DictResult<Self> {
        let before = db.snapshot(entry_id)?.fields;
        Ok(Self::Update {
            entry_id,
            before,
            after,
        })
    }

    /// 현재 저장소 상태를 스냅샷으로 잡아 삭제 명령을 만든다.
    pub fn delete(db: &Database, entry_id: i64) -> DictResult<Self> {
        Ok(Self::Delete {
            snapshot: db.snapshot(entry_id)?,
        })
    }

    pub fn entry_id(&self) -> i64 {
        match self {
            Self::Update { entry_id, .. } => *entry_id,
            Self::Delete { snapshot } => snapshot.id,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Update { after, .. } => format!("Update Entry '{}'", after.headword),
            Self::Delete { snapshot } => format!("Delete Entry '{}'", snapshot.fields.headword),
        }
    }

    /// 정방향 (redo)
    pub fn apply(&self, db: &Database) -> DictResult<()> {
        match self {
            Self::Update {
                entry_id, after, ..
            } => db.update_entry(*entry_id, after),
            Self::Delete { snapshot } => db.delete_entry(snapshot.id),
        }
    }

    /// 역방향 (undo)
    pub fn revert(&self, db: &Database) -> DictResult<()> {
        match self {
            Self::Update {
                entry_id, before, ..
            } => db.update_entry(*entry_id, before),
            Self::Delete { snapshot } => db.restore_entry(snapshot),
        }
    }
}

/// 히스토리 위치 변경 통지 내용
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPosition {
    pub cursor: usize,
    pub len: usize,
}

/// 히스토리 위치가 바뀔 때마다 무조건 호출된다. 화면 갱신 여부는 구현 쪽이 정한다.
pub trait HistoryListener {
    fn history_changed(&mut self, position: HistoryPosition);
}

/// 아무것도 하지 않는 리스너
#[derive(Debug, Default)]
pub struct NoopListener;

impl HistoryListener for NoopListener {
    fn history_changed(&mut self, _position: HistoryPosition) {}
}

/// 선형 실행 취소 로그
pub struct CommandLog {
    commands: Vec<EditCommand>,
    cursor: usize,
    listener: Box<dyn HistoryListener>,
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandLog")
            .field("commands", &self.commands)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl CommandLog {
    pub fn new() -> Self {
        Self::with_listener(Box::new(NoopListener))
    }

    pub fn with_listener(listener: Box<dyn HistoryListener>) -> Self {
        Self {
            commands: Vec::new(),
            cursor: 0,
            listener,
        }
    }

    pub fn set_listener(&mut self, listener: Box<dyn HistoryListener>) {
        self.listener = listener;
    }

    /// 명령을 즉시 적용하고 cursor 위치에 추가한다.
    /// 적용이 실패하면 로그는 그대로다 (되돌려진 꼬리도 유지).
    pub fn push(&mut self, db: &Database, command: EditCommand) -> DictResult<()> {
        command.apply(db)?;

        self.commands.truncate(self.cursor);
        tracing::debug!("History push: {}", command.description());
        self.commands.push(command);
        self.cursor += 1;
        self.notify();
        Ok(())
    }

    /// cursor가 0이면 아무것도 하지 않고 false
    pub fn undo(&mut self, db: &Database) -> DictResult<bool> {
        if self.cursor == 0 {
            return Ok(false);
        }

        let command = &self.commands[self.cursor - 1];
        command.revert(db)?;
        tracing::debug!("Undo: {}", command.description());

        self.cursor -= 1;
        self.notify();
        Ok(true)
    }

    /// cursor가 끝이면 아무것도 하지 않고 false
    pub fn redo(&mut self, db: &Database) -> DictResult<bool> {
        let Some(command) = self.commands.get(self.cursor) else {
            return Ok(false);
        };

        command.apply(db)?;
        tracing::debug!("Redo: {}", command.description());

        self.cursor += 1;
        self.notify();
        Ok(true)
    }

    /// 데이터베이스를 바꾸면 기존 히스토리는 의미가 없어진다.
    pub fn clear(&mut self) {
        if self.commands.is_empty() && self.cursor == 0 {
            return;
        }
        self.commands.clear();
        self.cursor = 0;
        self.notify();
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    pub fn undo_text(&self) -> Option<String> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.commands.get(i))
            .map(EditCommand::description)
    }

    pub fn redo_text(&self) -> Option<String> {
        self.commands.get(self.cursor).map(EditCommand::description)
    }

    pub fn commands(&self) -> &[EditCommand] {
        &self.commands
    }

    pub fn position(&self) -> HistoryPosition {
        HistoryPosition {
            cursor: self.cursor,
            len: self.commands.len(),
        }
    }

    fn notify(&mut self) {
        let position = self.position();
        self.listener.history_changed(position);
    }
}
