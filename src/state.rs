//! Global game state and frame phase definitions.

use bevy::input::keyboard::KeyCode;
use bevy::prelude::*;

/// Top-level state machine: assets load first, then gameplay runs until the
/// player pauses. Switching states only swaps an enum value; Bevy drives the
/// matching on-enter/on-exit schedules.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum GameState {
    #[default]
    Loading,
    Playing,
    Paused,
}

/// Phases of one gameplay frame. Chained in `app.rs` so every body finishes
/// integrating before cross-entity collision queries run.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameSet {
    Input,
    Movement,
    Effects,
}

/// ESC flips between Playing and Paused. `NextState` stages the transition;
/// Bevy applies it at the end of the frame.
pub fn toggle_pause(
    keyboard: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }

    match state.get() {
        GameState::Playing => next_state.set(GameState::Paused),
        GameState::Paused => next_state.set(GameState::Playing),
        GameState::Loading => {}
    }
}
