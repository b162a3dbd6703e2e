//! Player avatar: input, ability gating, the facing/action state machine,
//! and kinematic integration.
//!
//! All the gameplay rules live on the plain `Player` struct so they can be
//! exercised without an ECS world; the systems below are thin adapters that
//! feed it input, colliders, and `dt`, and forward the intents it produces
//! (attack hitboxes, particle effects) onto the event channels the level
//! orchestrator drains.

use bevy::input::gamepad::{GamepadAxis, GamepadAxisType, GamepadButton, GamepadButtonType};
use bevy::prelude::*;

use crate::animation::{HitFlicker, SpriteAnimation};
use crate::collision::ColliderSet;
use crate::config::{GameConfig, PlayerTuning};
use crate::level::{CheckpointSnapshot, LevelState};
use crate::movement::{KinematicBody, MovementSystems};
use crate::particles::{ParticleKind, SpawnParticles};
use crate::state::{GameSet, GameState};
use crate::timer::Countdown;
use crate::weapon::{AttackDirection, DespawnAttack, SpawnAttack};

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FrameInput>()
            .add_systems(OnEnter(GameState::Playing), spawn_initial_player)
            .add_systems(Update, gather_input.in_set(GameSet::Input))
            .add_systems(
                Update,
                update_player
                    .in_set(GameSet::Movement)
                    .in_set(MovementSystems),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Idle,
    Run,
    Jump,
    Fall,
    Attack,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Jump => "jump",
            Self::Fall => "fall",
            Self::Attack => "attack",
        }
    }
}

/// Composite facing-and-action tag; selects which frame folder plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub facing: Facing,
    pub action: Action,
}

impl Status {
    pub fn animation_key(&self) -> String {
        format!("{}_{}", self.facing.as_str(), self.action.as_str())
    }
}

/// Named countdowns gating the player's abilities. Each is polled once per
/// frame in `Player::tick_timers`, which applies the expiry effect itself.
pub struct PlayerTimers {
    pub double_jump: Countdown,
    pub dash: Countdown,
    pub reset_dash: Countdown,
    pub attacking: Countdown,
    pub reset_attack: Countdown,
    pub invulnerability: Countdown,
}

impl Default for PlayerTimers {
    fn default() -> Self {
        Self {
            double_jump: Countdown::from_millis(500),
            dash: Countdown::from_millis(100),
            reset_dash: Countdown::from_millis(500),
            attacking: Countdown::from_millis(300),
            reset_attack: Countdown::from_millis(400),
            invulnerability: Countdown::from_millis(500),
        }
    }
}

#[derive(Component)]
pub struct Player {
    pub health: i32,
    pub max_health: i32,
    pub damage: i32,
    pub status: Status,
    pub can_double_jump: bool,
    pub can_dash: bool,
    pub can_attack: bool,
    pub vulnerable: bool,
    pub timers: PlayerTimers,
}

/// What one frame of input produced, for the caller to turn into events.
#[derive(Debug, Default)]
pub struct InputOutcome {
    pub jumped: bool,
    pub attack: Option<AttackDirection>,
}

#[derive(Debug, Default)]
pub struct TimerOutcome {
    pub attack_finished: bool,
}

impl Player {
    pub fn new(max_health: i32, damage: i32) -> Self {
        Self {
            health: max_health,
            max_health,
            damage,
            status: Status {
                facing: Facing::Right,
                action: Action::Idle,
            },
            can_double_jump: false,
            can_dash: true,
            can_attack: true,
            vulnerable: true,
            timers: PlayerTimers::default(),
        }
    }

    /// Turns this frame's input into movement intent and ability activations.
    /// Steering is frozen for the whole dash window, and an in-flight attack
    /// pins the body in place until its swing timer runs out.
    pub fn apply_input(
        &mut self,
        body: &mut KinematicBody,
        input: &FrameInput,
        tuning: &PlayerTuning,
    ) -> InputOutcome {
        let mut outcome = InputOutcome::default();

        if self.timers.dash.is_active() {
            return outcome;
        }
        if self.timers.attacking.is_active() {
            body.direction.x = 0.0;
            return outcome;
        }

        body.direction.x = input.axis;
        if input.axis > 0.0 {
            self.status.facing = Facing::Right;
        } else if input.axis < 0.0 {
            self.status.facing = Facing::Left;
        }

        if input.jump && (body.on_floor || self.can_double_jump) {
            if body.on_floor {
                // Floor launch opens the grace window for the second jump.
                self.timers.double_jump.activate();
                self.can_double_jump = true;
            } else {
                self.can_double_jump = false;
            }
            body.direction.y = tuning.jump_speed;
            outcome.jumped = true;
        }

        if input.dash && self.can_dash {
            body.direction.y = 0.0;
            body.speed = tuning.speed * 4.0;
            self.can_dash = false;
            self.vulnerable = false;
            self.timers.dash.activate();
        }

        if input.attack && self.can_attack && !self.timers.dash.is_active() {
            self.can_attack = false;
            body.direction = Vec2::ZERO;
            self.timers.attacking.activate();
            outcome.attack = Some(self.attack_direction(input));
        }

        outcome
    }

    fn attack_direction(&self, input: &FrameInput) -> AttackDirection {
        if input.aim_up {
            AttackDirection::Top
        } else if input.aim_down {
            AttackDirection::Bottom
        } else {
            match self.status.facing {
                Facing::Right => AttackDirection::Right,
                Facing::Left => AttackDirection::Left,
            }
        }
    }

    /// Transition rules in fixed priority order: an active swing overrides
    /// everything, then vertical motion, then horizontal, then idle.
    pub fn update_status(&mut self, body: &KinematicBody) {
        self.status.action = if self.timers.attacking.is_active() {
            Action::Attack
        } else if body.direction.y > 0.0 {
            Action::Jump
        } else if body.direction.y < -1.0 {
            Action::Fall
        } else if body.direction.x != 0.0 {
            Action::Run
        } else {
            Action::Idle
        };
    }

    /// Polls every countdown and applies what its expiry stands for. Gating
    /// flags re-enabled here are read from the next frame's input on.
    pub fn tick_timers(
        &mut self,
        body: &mut KinematicBody,
        tuning: &PlayerTuning,
        dt: f32,
    ) -> TimerOutcome {
        let mut outcome = TimerOutcome::default();

        if self.timers.double_jump.tick(dt) {
            self.can_double_jump = false;
        }
        if self.timers.dash.tick(dt) {
            body.speed = tuning.speed;
            self.vulnerable = true;
            self.timers.reset_dash.activate();
        }
        if self.timers.reset_dash.tick(dt) {
            self.can_dash = true;
        }
        if self.timers.attacking.tick(dt) {
            outcome.attack_finished = true;
            self.timers.reset_attack.activate();
        }
        if self.timers.reset_attack.tick(dt) {
            self.can_attack = true;
        }
        if self.timers.invulnerability.tick(dt) {
            self.vulnerable = true;
        }

        outcome
    }

    /// Contact damage. A hit only lands while vulnerable; landing one closes
    /// the window until the invulnerability countdown expires.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if !self.vulnerable {
            return false;
        }

        self.health -= amount;
        self.vulnerable = false;
        self.timers.invulnerability.activate();
        true
    }
}

/// Device-independent input snapshot for one frame. Written by
/// `gather_input`, read by the player update.
#[derive(Resource, Default, Debug, Clone)]
pub struct FrameInput {
    pub axis: f32,
    pub jump: bool,
    pub dash: bool,
    pub attack: bool,
    pub aim_up: bool,
    pub aim_down: bool,
}

/// Reads the keyboard, or the first connected gamepad if there is one. The
/// devices never mix within a frame; a pad takes priority while connected.
fn gather_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    gamepads: Res<Gamepads>,
    axes: Res<Axis<GamepadAxis>>,
    buttons: Res<ButtonInput<GamepadButton>>,
    config: Res<GameConfig>,
    mut input: ResMut<FrameInput>,
) {
    if let Some(gamepad) = gamepads.iter().next() {
        let stick_x = axes
            .get(GamepadAxis::new(gamepad, GamepadAxisType::LeftStickX))
            .unwrap_or(0.0);
        input.axis = if stick_x.abs() < config.gamepad_deadzone {
            0.0
        } else {
            stick_x.signum()
        };

        let stick_y = axes
            .get(GamepadAxis::new(gamepad, GamepadAxisType::LeftStickY))
            .unwrap_or(0.0);
        input.aim_up = stick_y > 0.5;
        input.aim_down = stick_y < -0.5;

        input.jump = buttons.just_pressed(GamepadButton::new(gamepad, GamepadButtonType::South));
        input.attack = buttons.just_pressed(GamepadButton::new(gamepad, GamepadButtonType::West));
        input.dash = buttons.just_pressed(GamepadButton::new(gamepad, GamepadButtonType::East));
        return;
    }

    let mut axis = 0.0;
    if keyboard.pressed(KeyCode::KeyA) || keyboard.pressed(KeyCode::ArrowLeft) {
        axis -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) || keyboard.pressed(KeyCode::ArrowRight) {
        axis += 1.0;
    }
    input.axis = axis;

    input.aim_up = keyboard.pressed(KeyCode::KeyW) || keyboard.pressed(KeyCode::ArrowUp);
    input.aim_down = keyboard.pressed(KeyCode::KeyS) || keyboard.pressed(KeyCode::ArrowDown);
    input.jump = keyboard.just_pressed(KeyCode::Space);
    input.dash = keyboard.just_pressed(KeyCode::ControlRight)
        || keyboard.just_pressed(KeyCode::ShiftLeft);
    input.attack = keyboard.just_pressed(KeyCode::KeyX);
}

/// One full player frame: input, status, timers, then integration, in the
/// same order every frame so ability windows stay deterministic.
fn update_player(
    time: Res<Time>,
    config: Res<GameConfig>,
    colliders: Res<ColliderSet>,
    input: Res<FrameInput>,
    mut particle_events: EventWriter<SpawnParticles>,
    mut attack_events: EventWriter<SpawnAttack>,
    mut despawn_attack_events: EventWriter<DespawnAttack>,
    mut query: Query<(
        &mut Player,
        &mut KinematicBody,
        &mut SpriteAnimation,
        &mut HitFlicker,
    )>,
) {
    let dt = time.delta_seconds();
    let Ok((mut player, mut body, mut animation, mut flicker)) = query.get_single_mut() else {
        return;
    };

    let outcome = player.apply_input(&mut body, &input, &config.player);
    if outcome.jumped {
        animation.frame_index = 0.0;
        particle_events.send(SpawnParticles {
            kind: ParticleKind::BeforeJump,
            pos: body_top_left(&body),
        });
    }
    if let Some(direction) = outcome.attack {
        animation.fps = config.player.animation_fps * 3.0;
        attack_events.send(SpawnAttack { direction });
    }

    player.update_status(&body);

    let timer_outcome = player.tick_timers(&mut body, &config.player, dt);
    if timer_outcome.attack_finished {
        animation.fps = config.player.animation_fps;
        despawn_attack_events.send(DespawnAttack);
    }

    let was_falling = player.status.action == Action::Fall;
    let result = body.move_and_collide(&colliders.solids, dt, config.reference_fps);
    if result.landed {
        player.can_double_jump = false;
        if was_falling {
            particle_events.send(SpawnParticles {
                kind: ParticleKind::AfterJump,
                pos: body_top_left(&body),
            });
        }
    }

    let key = player.status.animation_key();
    if animation.key != key {
        animation.key = key;
    }

    flicker.on = !player.vulnerable && !player.timers.dash.is_active();
}

fn body_top_left(body: &KinematicBody) -> Vec2 {
    let rect = body.rect();
    Vec2::new(rect.min.x, rect.max.y)
}

/// Spawns the avatar bundle at `pos` (bottom-left corner, world space).
/// Shared between the initial level entry and checkpoint respawns.
pub fn spawn_player_at(commands: &mut Commands, config: &GameConfig, pos: Vec2) {
    let tuning = &config.player;

    commands.spawn((
        Name::new("Player"),
        Player::new(tuning.max_health, tuning.damage),
        KinematicBody::new(pos, tuning.size, tuning.speed, tuning.gravity),
        SpriteBundle {
            sprite: Sprite {
                custom_size: Some(tuning.size),
                ..default()
            },
            transform: Transform::from_translation(
                (pos + tuning.size * 0.5).extend(config.layers.main),
            ),
            ..default()
        },
        SpriteAnimation::looping("right_idle", tuning.animation_fps),
        HitFlicker::default(),
    ));
}

/// First entry into gameplay: place the player and seed the checkpoint so an
/// early death respawns at the level start. Re-entering Playing after a pause
/// finds the avatar already there and does nothing.
fn spawn_initial_player(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut level_state: ResMut<LevelState>,
    players: Query<Entity, With<Player>>,
) {
    if !players.is_empty() || level_state.respawn {
        return;
    }

    let pos = config.player.default_spawn;

    if level_state.last_checkpoint.is_none() {
        level_state.last_checkpoint = Some(CheckpointSnapshot {
            level: level_state.current_level.clone(),
            pos,
        });
    }

    spawn_player_at(&mut commands, &config, pos);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REFERENCE_FPS;

    fn tuning() -> PlayerTuning {
        GameConfig::default().player
    }

    fn grounded_player() -> (Player, KinematicBody) {
        let tuning = tuning();
        let mut body = KinematicBody::new(
            Vec2::new(128.0, 576.0),
            tuning.size,
            tuning.speed,
            tuning.gravity,
        );
        body.on_floor = true;
        (Player::new(tuning.max_health, tuning.damage), body)
    }

    fn jump_input() -> FrameInput {
        FrameInput {
            jump: true,
            ..Default::default()
        }
    }

    #[test]
    fn floor_jump_sets_the_exact_impulse() {
        let (mut player, mut body) = grounded_player();
        let tuning = tuning();

        let outcome = player.apply_input(&mut body, &jump_input(), &tuning);

        assert!(outcome.jumped);
        assert_eq!(body.direction.y, tuning.jump_speed);
        assert!(player.timers.double_jump.is_active());
        assert!(player.can_double_jump);
    }

    #[test]
    fn double_jump_only_inside_the_grace_window() {
        let (mut player, mut body) = grounded_player();
        let tuning = tuning();

        player.apply_input(&mut body, &jump_input(), &tuning);
        body.on_floor = false;

        // Second jump lands while the window is open.
        player.tick_timers(&mut body, &tuning, 0.3);
        let outcome = player.apply_input(&mut body, &jump_input(), &tuning);
        assert!(outcome.jumped);
        assert!(!player.can_double_jump);

        // A third airborne press does nothing.
        let outcome = player.apply_input(&mut body, &jump_input(), &tuning);
        assert!(!outcome.jumped);
    }

    #[test]
    fn expired_grace_window_blocks_the_second_jump() {
        let (mut player, mut body) = grounded_player();
        let tuning = tuning();

        player.apply_input(&mut body, &jump_input(), &tuning);
        body.on_floor = false;

        player.tick_timers(&mut body, &tuning, 0.6);
        assert!(!player.can_double_jump);

        let outcome = player.apply_input(&mut body, &jump_input(), &tuning);
        assert!(!outcome.jumped);
    }

    #[test]
    fn dash_window_and_two_stage_cooldown() {
        let (mut player, mut body) = grounded_player();
        let tuning = tuning();
        let dash = FrameInput {
            dash: true,
            ..Default::default()
        };

        player.apply_input(&mut body, &dash, &tuning);
        assert!(!player.vulnerable);
        assert!(!player.can_dash);
        assert_eq!(body.speed, tuning.speed * 4.0);

        // Mid-dash: input is frozen, speed boosted.
        player.tick_timers(&mut body, &tuning, 0.05);
        let run = FrameInput {
            axis: 1.0,
            ..Default::default()
        };
        body.direction.x = 0.0;
        player.apply_input(&mut body, &run, &tuning);
        assert_eq!(body.direction.x, 0.0);

        // Dash ends: speed and vulnerability restored, recovery starts.
        player.tick_timers(&mut body, &tuning, 0.06);
        assert!(player.vulnerable);
        assert_eq!(body.speed, tuning.speed);
        assert!(!player.can_dash);
        assert!(player.timers.reset_dash.is_active());

        // Still blocked during recovery.
        player.apply_input(&mut body, &dash, &tuning);
        assert_eq!(body.speed, tuning.speed);

        // Recovery expires: dashing works again.
        player.tick_timers(&mut body, &tuning, 0.6);
        assert!(player.can_dash);
        player.apply_input(&mut body, &dash, &tuning);
        assert_eq!(body.speed, tuning.speed * 4.0);
    }

    #[test]
    fn damage_is_ignored_while_invulnerable() {
        let (mut player, _) = grounded_player();

        assert!(player.take_damage(1));
        assert_eq!(player.health, 2);
        assert!(!player.vulnerable);

        // The follow-up hit bounces off the invulnerability window.
        assert!(!player.take_damage(1));
        assert_eq!(player.health, 2);
    }

    #[test]
    fn attack_freezes_and_aims() {
        let (mut player, mut body) = grounded_player();
        let tuning = tuning();
        body.direction.x = 1.0;

        let attack = FrameInput {
            attack: true,
            ..Default::default()
        };
        let outcome = player.apply_input(&mut body, &attack, &tuning);

        assert_eq!(outcome.attack, Some(AttackDirection::Right));
        assert_eq!(body.direction, Vec2::ZERO);
        assert!(!player.can_attack);
        assert!(player.timers.attacking.is_active());

        // Steering stays frozen for the whole swing.
        let run = FrameInput {
            axis: -1.0,
            ..Default::default()
        };
        player.apply_input(&mut body, &run, &tuning);
        assert_eq!(body.direction.x, 0.0);

        // Swing ends, recovery runs, then attacking is possible again.
        let outcome = player.tick_timers(&mut body, &tuning, 0.35);
        assert!(outcome.attack_finished);
        assert!(!player.can_attack);
        player.tick_timers(&mut body, &tuning, 0.45);
        assert!(player.can_attack);
    }

    #[test]
    fn upward_aim_wins_over_facing() {
        let (mut player, mut body) = grounded_player();
        let tuning = tuning();

        let attack = FrameInput {
            attack: true,
            aim_up: true,
            ..Default::default()
        };
        let outcome = player.apply_input(&mut body, &attack, &tuning);
        assert_eq!(outcome.attack, Some(AttackDirection::Top));
    }

    #[test]
    fn status_priority_order() {
        let (mut player, mut body) = grounded_player();

        player.update_status(&body);
        assert_eq!(player.status.action, Action::Idle);

        body.direction.x = 1.0;
        player.update_status(&body);
        assert_eq!(player.status.action, Action::Run);

        body.direction.y = 5.0;
        player.update_status(&body);
        assert_eq!(player.status.action, Action::Jump);

        body.direction.y = -5.0;
        player.update_status(&body);
        assert_eq!(player.status.action, Action::Fall);

        // Shallow descent is not yet a fall.
        body.direction.y = -0.5;
        body.direction.x = 0.0;
        player.update_status(&body);
        assert_eq!(player.status.action, Action::Idle);

        player.timers.attacking.activate();
        body.direction.y = -5.0;
        player.update_status(&body);
        assert_eq!(player.status.action, Action::Attack);
    }

    #[test]
    fn jump_then_integration_leaves_the_floor() {
        let (mut player, mut body) = grounded_player();
        let tuning = tuning();
        let floor = [Rect::from_corners(
            Vec2::new(0.0, 512.0),
            Vec2::new(640.0, 576.0),
        )];

        player.apply_input(&mut body, &jump_input(), &tuning);
        body.move_and_collide(&floor, 1.0 / 60.0, REFERENCE_FPS);

        assert!(!body.on_floor);
    }
}
