use crate::model::{GameState, LastCare, Scene, SpriteState, Stats};
use crate::motion::TickOutcome;
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlayerAction {
    Feed,
    Play,
    Clean,
    Sleep,
    Heal,
    HelpToggle,
    Back,
    Quit,
}

impl PlayerAction {
    fn care_name(self) -> Option<&'static str> {
        match self {
            PlayerAction::Feed => Some("feed"),
            PlayerAction::Play => Some("play"),
            PlayerAction::Clean => Some("clean"),
            PlayerAction::Sleep => Some("sleep"),
            PlayerAction::Heal => Some("heal"),
            _ => None,
        }
    }
}

fn bump(v: u8, delta: i16) -> u8 {
    (v as i16 + delta).clamp(0, 100) as u8
}

impl Stats {
    pub(crate) fn feed(&mut self) {
        self.hunger = bump(self.hunger, -15);
        self.happiness = bump(self.happiness, 5);
    }

    pub(crate) fn play(&mut self) {
        self.happiness = bump(self.happiness, 10);
        self.hunger = bump(self.hunger, 5);
    }

    pub(crate) fn clean(&mut self) {
        self.cleanliness = 100;
        self.happiness = bump(self.happiness, 5);
    }

    pub(crate) fn rest(&mut self) {
        self.health = bump(self.health, 10);
        self.hunger = bump(self.hunger, 10);
    }

    pub(crate) fn heal(&mut self) {
        self.health = 100;
        self.happiness = bump(self.happiness, 5);
    }
}

impl GameState {
    /// Whether caretaking input is currently refused.
    pub(crate) fn controls_locked(&self) -> bool {
        self.lock_controls && self.sprite.is_sleep_busy()
    }

    pub(crate) fn apply(&mut self, action: PlayerAction) {
        if let Some(name) = action.care_name() {
            if self.controls_locked() {
                debug!(action = name, "ignored while the pet is sleeping");
                return;
            }
            self.last_care = Some(LastCare {
                action: name,
                at: chrono::Local::now(),
            });
        }

        match action {
            PlayerAction::Feed => self.stats.feed(),
            PlayerAction::Play => self.stats.play(),
            PlayerAction::Clean => self.stats.clean(),
            PlayerAction::Sleep => {
                self.stats.rest();
                if !self.sprite.request_sleep() {
                    debug!("sleep already on its way");
                }
            }
            PlayerAction::Heal => self.stats.heal(),
            PlayerAction::HelpToggle => {
                self.scene = match self.scene {
                    Scene::Help => Scene::Main,
                    Scene::Main => Scene::Help,
                };
            }
            PlayerAction::Back => self.scene = Scene::Main,
            PlayerAction::Quit => {}
        }
    }

    pub(crate) fn tick(&mut self, now: Duration) -> TickOutcome {
        self.sprite.tick(now)
    }
}

/// Short label for the status line.
pub(crate) fn motion_status(sprite: &SpriteState) -> &'static str {
    match (&sprite.sleep_cycle, sprite.sleep_request) {
        (Some(cycle), _) => cycle.phase.label(),
        (None, true) => "Getting sleepy",
        // a grounded frame is the hop's own take-off
        (None, false) => "Hopping",
    }
}
