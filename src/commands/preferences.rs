//! Preferences Commands

use crate::error::CommandResult;
use crate::settings::Preferences;
use crate::state::AppState;

pub fn get_preferences(state: &AppState) -> Preferences {
    state.preferences.clone()
}

pub fn set_theme(state: &mut AppState, theme: &str) -> CommandResult<()> {
    state.preferences.theme = theme.to_string();
    state.preferences.save(&state.paths)?;
    Ok(())
}

pub fn set_language(state: &mut AppState, language: &str) -> CommandResult<()> {
    state.preferences.language = language.to_string();
    state.preferences.save(&state.paths)?;
    Ok(())
}

/// 30..=300초로 보정해 저장하고 실행 중인 타이머에도 반영한다. 보정된 값을 반환.
pub fn set_autosave_interval(state: &mut AppState, secs: u64) -> CommandResult<u64> {
    let applied = state.preferences.set_autosave_interval(secs);
    state.autosave.set_interval(applied);
    state.preferences.save(&state.paths)?;
    Ok(applied)
}
