use crate::model::{
    Bounds, Direction, MotionPhase, MotionRules, SleepCycle, SleepPhase, SpriteId, SpriteState,
    Vec2,
};
use crate::sleep::SleepStep;
use std::time::Duration;
use tracing::{debug, info};

/// Margin kept between the right wall and the sprite's starting spot.
const REST_MARGIN: f32 = 10.0;

/// What a single tick did to the sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    FreeFall,
    WallBounce(Direction),
    Hop,
    SleepBegan,
    Sleep(SleepStep),
    SleepEnded,
}

impl SpriteState {
    /// Sprite resting in the bottom-right corner, facing left, already hopping.
    pub(crate) fn new(bounds: Bounds, size: Vec2, rules: MotionRules) -> Self {
        let mut st = Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            size,
            bounds,
            direction: Direction::Left,
            sleep_request: false,
            sleep_cycle: None,
            rules,
        };
        st.pos = Vec2::new(st.max_x() - REST_MARGIN, st.ground_y());
        st.reclamp(bounds);
        st.start_hop();
        st
    }

    pub(crate) fn ground_y(&self) -> f32 {
        (self.bounds.height - self.size.y).max(0.0)
    }

    pub(crate) fn max_x(&self) -> f32 {
        (self.bounds.width - self.size.x).max(0.0)
    }

    pub(crate) fn motion_phase(&self) -> MotionPhase {
        if self.pos.y >= self.ground_y() {
            MotionPhase::Grounded
        } else {
            MotionPhase::Airborne
        }
    }

    pub(crate) fn is_sleep_busy(&self) -> bool {
        self.sleep_request || self.sleep_cycle.is_some()
    }

    pub(crate) fn start_hop(&mut self) {
        let angle = self.rules.hop_angle_deg.to_radians();
        self.vel = Vec2::new(
            self.direction.sign() * self.rules.hop_speed * angle.cos(),
            -self.rules.hop_speed * angle.sin(),
        );
    }

    /// Called whenever the drawing area changes size. Never fails: a viewport
    /// smaller than the sprite pins it to the origin. A napping sprite stays
    /// on the (new) ground.
    pub(crate) fn reclamp(&mut self, bounds: Bounds) {
        self.bounds = bounds;
        self.pos.x = self.pos.x.clamp(0.0, self.max_x());
        self.pos.y = if self.sleep_cycle.is_some() {
            self.ground_y()
        } else {
            self.pos.y.clamp(0.0, self.ground_y())
        };
    }

    /// Records a sleep request. Returns `false` when one is already pending or
    /// a cycle is running; the request is then dropped, not queued.
    pub(crate) fn request_sleep(&mut self) -> bool {
        if self.is_sleep_busy() {
            return false;
        }
        self.sleep_request = true;
        debug!("sleep requested");
        true
    }

    pub(crate) fn sprite(&self) -> SpriteId {
        match &self.sleep_cycle {
            Some(cycle) => cycle.sprite(),
            None => SpriteId::idle(self.direction),
        }
    }

    /// One display refresh. Either the sleep sequencer owns the tick or the
    /// physics step runs, never both.
    pub(crate) fn tick(&mut self, now: Duration) -> TickOutcome {
        if let Some(cycle) = self.sleep_cycle.as_mut() {
            return match cycle.advance(now) {
                SleepStep::Finished => {
                    let resume = cycle.resume_direction;
                    let took = now.saturating_sub(cycle.started_at);
                    self.sleep_cycle = None;
                    self.direction = resume;
                    self.start_hop();
                    info!(direction = ?resume, took_ms = took.as_millis() as u64, "pet woke up");
                    TickOutcome::SleepEnded
                }
                step => TickOutcome::Sleep(step),
            };
        }
        self.step_physics(now)
    }

    fn step_physics(&mut self, now: Duration) -> TickOutcome {
        self.vel.y += self.rules.gravity;
        self.pos.x += self.vel.x;
        self.pos.y += self.vel.y;

        if self.pos.y < 0.0 {
            self.pos.y = 0.0;
            self.vel.y = self.vel.y.max(0.0);
        }

        let mut outcome = TickOutcome::FreeFall;

        if self.pos.x <= 0.0 {
            self.pos.x = 0.0;
            self.direction = Direction::Right;
            self.vel.x = self.vel.x.abs();
            outcome = TickOutcome::WallBounce(Direction::Right);
        } else if self.pos.x >= self.max_x() {
            self.pos.x = self.max_x();
            self.direction = Direction::Left;
            self.vel.x = -self.vel.x.abs();
            outcome = TickOutcome::WallBounce(Direction::Left);
        }

        if self.motion_phase() == MotionPhase::Grounded {
            self.pos.y = self.ground_y();
            if self.sleep_request {
                self.sleep_request = false;
                self.vel = Vec2::ZERO;
                self.sleep_cycle = Some(SleepCycle::begin(now, self.direction));
                info!(
                    facing = ?self.direction,
                    x = self.pos.x,
                    lasts_ms = SleepPhase::cycle_length().as_millis() as u64,
                    "pet is falling asleep"
                );
                outcome = TickOutcome::SleepBegan;
            } else {
                self.start_hop();
                outcome = TickOutcome::Hop;
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn state() -> SpriteState {
        SpriteState::new(
            Bounds {
                width: 400.0,
                height: 300.0,
            },
            Vec2::new(102.0, 102.0),
            MotionRules::default(),
        )
    }

    fn airborne(st: &mut SpriteState, x: f32, y: f32, vx: f32, vy: f32) {
        st.pos = Vec2::new(x, y);
        st.vel = Vec2::new(vx, vy);
    }

    /// Ticks every millisecond from `from` until the sprite hops again.
    fn run_until_awake(st: &mut SpriteState, from: u64) -> (u64, Vec<SpriteId>) {
        let mut sprites = vec![st.sprite()];
        let mut t = from;
        loop {
            t += 1;
            let out = st.tick(ms(t));
            if out == TickOutcome::SleepEnded {
                return (t, sprites);
            }
            if let TickOutcome::Sleep(SleepStep::Entered(_)) = out {
                sprites.push(st.sprite());
            }
            assert!(t < from + 20_000, "sleep cycle never ended");
        }
    }

    #[test]
    fn starts_bottom_right_facing_left_mid_hop() {
        let st = state();
        assert_eq!(st.ground_y(), 198.0);
        assert_eq!(st.pos, Vec2::new(400.0 - 102.0 - 10.0, 198.0));
        assert_eq!(st.direction, Direction::Left);
        assert!(st.vel.x < 0.0);
        assert!(st.vel.y < 0.0);
        assert_eq!(st.sprite(), SpriteId::IdleLeft);
    }

    #[test]
    fn hop_uses_speed_and_angle() {
        let mut st = state();
        st.direction = Direction::Right;
        st.start_hop();
        let a = 65f32.to_radians();
        assert!((st.vel.x - 6.0 * a.cos()).abs() < 1e-5);
        assert!((st.vel.y + 6.0 * a.sin()).abs() < 1e-5);
    }

    #[test]
    fn free_fall_integrates_gravity_once_per_tick() {
        let mut st = state();
        airborne(&mut st, 100.0, 50.0, 1.0, 2.0);
        assert_eq!(st.tick(ms(16)), TickOutcome::FreeFall);
        assert!((st.vel.y - 2.4).abs() < 1e-5);
        assert!((st.pos.y - 52.4).abs() < 1e-4);
        assert!((st.pos.x - 101.0).abs() < 1e-5);
    }

    #[test]
    fn right_wall_flips_direction_mid_air() {
        let mut st = state();
        st.direction = Direction::Right;
        let near_wall = st.max_x() - 1.0;
        airborne(&mut st, near_wall, 50.0, 3.0, 0.0);
        assert_eq!(st.tick(ms(16)), TickOutcome::WallBounce(Direction::Left));
        assert_eq!(st.direction, Direction::Left);
        assert_eq!(st.vel.x, -3.0);
        assert_eq!(st.pos.x, st.max_x());
        assert_eq!(st.sprite(), SpriteId::IdleLeft);
        assert_eq!(st.motion_phase(), MotionPhase::Airborne);
    }

    #[test]
    fn left_wall_flips_direction() {
        let mut st = state();
        airborne(&mut st, 1.0, 50.0, -3.0, 0.0);
        assert_eq!(st.tick(ms(16)), TickOutcome::WallBounce(Direction::Right));
        assert_eq!(st.pos.x, 0.0);
        assert_eq!(st.vel.x, 3.0);
        assert_eq!(st.sprite(), SpriteId::IdleRight);
    }

    #[test]
    fn landing_without_request_starts_new_hop() {
        let mut st = state();
        airborne(&mut st, 100.0, 195.0, -1.0, 5.0);
        assert_eq!(st.tick(ms(16)), TickOutcome::Hop);
        assert_eq!(st.pos.y, 198.0);
        assert!(st.vel.y < 0.0);
        assert!(st.sleep_cycle.is_none());
    }

    #[test]
    fn idle_ticks_never_skip_physics() {
        let mut st = state();
        for t in 0..5_000u64 {
            let before = (st.pos, st.vel);
            let out = st.tick(ms(t * 16));
            assert!(matches!(
                out,
                TickOutcome::FreeFall | TickOutcome::WallBounce(_) | TickOutcome::Hop
            ));
            assert_ne!(before, (st.pos, st.vel));
        }
    }

    #[test]
    fn stays_inside_bounds() {
        let mut st = state();
        for t in 0..10_000u64 {
            st.tick(ms(t * 16));
            assert!(st.pos.x >= 0.0 && st.pos.x <= st.max_x());
            assert!(st.pos.y >= 0.0 && st.pos.y <= st.ground_y());
        }
    }

    #[test]
    fn landing_with_request_freezes_sprite_for_whole_cycle() {
        let mut st = state();
        airborne(&mut st, 100.0, 195.0, -2.0, 5.0);
        assert!(st.request_sleep());
        assert_eq!(st.tick(ms(1_000)), TickOutcome::SleepBegan);
        assert!(!st.sleep_request);
        assert_eq!(st.vel, Vec2::ZERO);
        assert_eq!(st.pos.y, 198.0);

        let rest = st.pos;
        for t in 1_001..10_500u64 {
            let out = st.tick(ms(t));
            assert!(matches!(out, TickOutcome::Sleep(_)), "tick {t}: {out:?}");
            assert_eq!(st.vel, Vec2::ZERO);
            assert_eq!(st.pos, rest);
            assert!(!st.sleep_request);
        }
        assert_eq!(st.tick(ms(10_500)), TickOutcome::SleepEnded);
        assert!(st.vel.y < 0.0);
    }

    #[test]
    fn full_cycle_takes_9500ms_and_shows_sprites_in_order() {
        let mut st = state();
        st.direction = Direction::Right;
        airborne(&mut st, 100.0, 197.0, 2.0, 1.0);
        st.request_sleep();
        assert_eq!(st.tick(ms(500)), TickOutcome::SleepBegan);

        let (woke_at, sprites) = run_until_awake(&mut st, 500);
        assert_eq!(woke_at - 500, 9_500);
        assert_eq!(
            sprites,
            vec![
                SpriteId::IdleRight,
                SpriteId::IdleLeft,
                SpriteId::IdleRight,
                SpriteId::IdleLeft,
                SpriteId::SleepRight,
                SpriteId::IdleRight,
            ]
        );
        assert_eq!(st.direction, Direction::Right);
        assert!(st.vel.x > 0.0);
    }

    #[test]
    fn double_request_runs_one_cycle() {
        let mut st = state();
        airborne(&mut st, 100.0, 100.0, -1.0, 0.0);
        assert!(st.request_sleep());
        assert!(!st.request_sleep());

        let mut began = 0;
        let mut t = 0;
        while t < 40_000 {
            t += 16;
            if st.tick(ms(t)) == TickOutcome::SleepBegan {
                began += 1;
            }
        }
        assert_eq!(began, 1);
    }

    #[test]
    fn request_during_cycle_is_ignored() {
        let mut st = state();
        airborne(&mut st, 100.0, 197.0, -1.0, 1.0);
        st.request_sleep();
        st.tick(ms(0));
        assert!(st.sleep_cycle.is_some());

        assert!(!st.request_sleep());
        assert!(!st.sleep_request);
        st.tick(ms(1_000));
        assert_eq!(st.sleep_cycle.map(|c| c.phase), Some(SleepPhase::PreSleepB));
    }

    #[test]
    fn resumes_with_direction_from_request_when_no_wall_hit() {
        let mut st = state();
        st.direction = Direction::Left;
        airborne(&mut st, 200.0, 150.0, -1.0, 0.0);
        let before = st.direction;
        st.request_sleep();
        let mut t = 0;
        while st.tick(ms(t)) != TickOutcome::SleepEnded {
            t += 1;
        }
        assert_eq!(st.direction, before);
    }

    #[test]
    fn resumes_with_direction_at_landing_after_wall_bounce() {
        let mut st = state();
        st.direction = Direction::Right;
        let near_wall = st.max_x() - 1.0;
        airborne(&mut st, near_wall, 150.0, 3.0, -2.0);
        st.request_sleep();

        assert_eq!(st.tick(ms(0)), TickOutcome::WallBounce(Direction::Left));
        let mut t = 0;
        while st.sleep_cycle.is_none() {
            t += 1;
            st.tick(ms(t));
        }
        let cycle = st.sleep_cycle.expect("cycle started");
        assert_eq!(cycle.resume_direction, Direction::Left);
        assert_eq!(cycle.resume_sprite, SpriteId::IdleLeft);

        while st.tick(ms(t)) != TickOutcome::SleepEnded {
            t += 1;
        }
        assert_eq!(st.direction, Direction::Left);
        assert_eq!(st.sprite(), SpriteId::IdleLeft);
    }

    #[test]
    fn reclamp_pulls_sprite_into_smaller_viewport() {
        let mut st = state();
        st.pos = Vec2::new(280.0, 198.0);
        st.reclamp(Bounds {
            width: 200.0,
            height: 150.0,
        });
        assert_eq!(st.ground_y(), 48.0);
        assert_eq!(st.pos, Vec2::new(98.0, 48.0));
    }

    #[test]
    fn reclamp_smaller_than_sprite_pins_to_origin() {
        let mut st = state();
        st.reclamp(Bounds {
            width: 50.0,
            height: 40.0,
        });
        assert_eq!(st.pos, Vec2::ZERO);
        for t in 0..100 {
            st.tick(ms(t * 16));
            assert_eq!(st.pos.x, 0.0);
            assert_eq!(st.pos.y, 0.0);
        }
    }

    #[test]
    fn reclamp_during_cycle_keeps_cycle_running() {
        let mut st = state();
        airborne(&mut st, 100.0, 197.0, -1.0, 1.0);
        st.request_sleep();
        st.tick(ms(0));
        st.reclamp(Bounds {
            width: 300.0,
            height: 200.0,
        });
        assert_eq!(st.pos.y, 98.0);
        assert_eq!(st.vel, Vec2::ZERO);
        assert!(matches!(st.tick(ms(10)), TickOutcome::Sleep(_)));
    }

    #[test]
    fn napping_sprite_follows_ground_when_viewport_grows() {
        let mut st = state();
        airborne(&mut st, 100.0, 197.0, -1.0, 1.0);
        st.request_sleep();
        assert_eq!(st.tick(ms(0)), TickOutcome::SleepBegan);

        st.reclamp(Bounds {
            width: 400.0,
            height: 600.0,
        });
        assert_eq!(st.ground_y(), 498.0);
        assert_eq!(st.pos.y, 498.0);
        assert_eq!(st.motion_phase(), MotionPhase::Grounded);

        let mut t = 0;
        loop {
            t += 16;
            let out = st.tick(ms(t));
            if out == TickOutcome::SleepEnded {
                break;
            }
            assert_eq!(st.pos.y, 498.0, "tick {t}");
            assert_eq!(st.motion_phase(), MotionPhase::Grounded);
        }
        // the wake-up hop leaves from the new ground
        assert!(st.vel.y < 0.0);
        assert_eq!(st.pos.y, 498.0);
    }

    #[test]
    fn awake_sprite_keeps_height_when_viewport_grows() {
        let mut st = state();
        airborne(&mut st, 100.0, 50.0, 1.0, -2.0);
        st.reclamp(Bounds {
            width: 400.0,
            height: 600.0,
        });
        assert_eq!(st.pos.y, 50.0);
        assert_eq!(st.motion_phase(), MotionPhase::Airborne);
    }
}
