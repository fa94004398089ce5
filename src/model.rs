use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Left,
    Right,
}

impl Direction {
    pub(crate) fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    pub(crate) fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Which of the four sprite assets gets drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum SpriteId {
    IdleLeft,
    IdleRight,
    SleepLeft,
    SleepRight,
}

impl SpriteId {
    pub(crate) const ALL: [SpriteId; 4] = [
        SpriteId::IdleLeft,
        SpriteId::IdleRight,
        SpriteId::SleepLeft,
        SpriteId::SleepRight,
    ];

    pub(crate) fn idle(dir: Direction) -> Self {
        match dir {
            Direction::Left => SpriteId::IdleLeft,
            Direction::Right => SpriteId::IdleRight,
        }
    }

    pub(crate) fn asleep(dir: Direction) -> Self {
        match dir {
            Direction::Left => SpriteId::SleepLeft,
            Direction::Right => SpriteId::SleepRight,
        }
    }

    pub(crate) fn facing(self) -> Direction {
        match self {
            SpriteId::IdleLeft | SpriteId::SleepLeft => Direction::Left,
            SpriteId::IdleRight | SpriteId::SleepRight => Direction::Right,
        }
    }

    /// Same pose, other facing.
    pub(crate) fn mirrored(self) -> Self {
        match self {
            SpriteId::IdleLeft => SpriteId::IdleRight,
            SpriteId::IdleRight => SpriteId::IdleLeft,
            SpriteId::SleepLeft => SpriteId::SleepRight,
            SpriteId::SleepRight => SpriteId::SleepLeft,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct MotionRules {
    pub(crate) gravity: f32,       // added to vy once per tick
    pub(crate) hop_speed: f32,     // launch speed per tick
    pub(crate) hop_angle_deg: f32, // launch angle above the ground
}

impl Default for MotionRules {
    fn default() -> Self {
        Self {
            gravity: 0.4,
            hop_speed: 6.0,
            hop_angle_deg: 65.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Vec2 {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl Vec2 {
    pub(crate) const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub(crate) fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Size of the drawing area the sprite lives in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Bounds {
    pub(crate) width: f32,
    pub(crate) height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MotionPhase {
    Airborne,
    Grounded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SleepPhase {
    PreSleepA,
    PreSleepB,
    PreSleepC,
    PreSleepD,
    Sleeping,
    WakeHold,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SleepCycle {
    pub(crate) phase: SleepPhase,
    pub(crate) entered_at: Duration,
    pub(crate) started_at: Duration,
    pub(crate) resume_direction: Direction,
    pub(crate) resume_sprite: SpriteId,
}

#[derive(Clone, Debug)]
pub(crate) struct SpriteState {
    pub(crate) pos: Vec2,
    pub(crate) vel: Vec2,
    pub(crate) size: Vec2,
    pub(crate) bounds: Bounds,
    pub(crate) direction: Direction,
    pub(crate) sleep_request: bool,
    pub(crate) sleep_cycle: Option<SleepCycle>,
    pub(crate) rules: MotionRules,
}

/// Caretaking meters, each kept in `[0, 100]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Stats {
    pub(crate) happiness: u8,
    pub(crate) hunger: u8,
    pub(crate) cleanliness: u8,
    pub(crate) health: u8,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            happiness: 50,
            hunger: 50,
            cleanliness: 50,
            health: 50,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct LastCare {
    pub(crate) action: &'static str,
    pub(crate) at: DateTime<Local>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Main,
    Help,
}

#[derive(Clone, Debug)]
pub(crate) struct GameState {
    pub(crate) sprite: SpriteState,
    pub(crate) stats: Stats,
    pub(crate) last_care: Option<LastCare>,
    pub(crate) scene: Scene,
    pub(crate) lock_controls: bool,
}

impl GameState {
    pub(crate) fn new(sprite: SpriteState, lock_controls: bool) -> Self {
        Self {
            sprite,
            stats: Stats::default(),
            last_care: None,
            scene: Scene::Main,
            lock_controls,
        }
    }
}
