//! Core Commands Module
//!
//! UI(또는 CLI)가 호출하는 좁은 인터페이스.
//! 모든 함수는 명시적으로 넘겨받은 `AppState`에서 동작하고 `CommandResult`를 돌려준다.

pub mod database;
pub mod duplicates;
pub mod entry;
pub mod exchange;
pub mod history;
pub mod preferences;
