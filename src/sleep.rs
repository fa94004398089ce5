use crate::model::{Direction, SleepCycle, SleepPhase, SpriteId};
use std::time::Duration;
use tracing::debug;

/// Result of giving the sequencer one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SleepStep {
    Holding,
    Entered(SleepPhase),
    Finished,
}

impl SleepPhase {
    pub(crate) const SEQUENCE: [SleepPhase; 6] = [
        SleepPhase::PreSleepA,
        SleepPhase::PreSleepB,
        SleepPhase::PreSleepC,
        SleepPhase::PreSleepD,
        SleepPhase::Sleeping,
        SleepPhase::WakeHold,
    ];

    pub(crate) fn duration(self) -> Duration {
        let ms = match self {
            SleepPhase::PreSleepA => 1000,
            SleepPhase::PreSleepB => 500,
            SleepPhase::PreSleepC => 500,
            SleepPhase::PreSleepD => 500,
            SleepPhase::Sleeping => 5000,
            SleepPhase::WakeHold => 2000,
        };
        Duration::from_millis(ms)
    }

    pub(crate) fn next(self) -> Option<SleepPhase> {
        match self {
            SleepPhase::PreSleepA => Some(SleepPhase::PreSleepB),
            SleepPhase::PreSleepB => Some(SleepPhase::PreSleepC),
            SleepPhase::PreSleepC => Some(SleepPhase::PreSleepD),
            SleepPhase::PreSleepD => Some(SleepPhase::Sleeping),
            SleepPhase::Sleeping => Some(SleepPhase::WakeHold),
            SleepPhase::WakeHold => None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            SleepPhase::PreSleepA
            | SleepPhase::PreSleepB
            | SleepPhase::PreSleepC
            | SleepPhase::PreSleepD => "Falling asleep",
            SleepPhase::Sleeping => "Sleeping",
            SleepPhase::WakeHold => "Waking",
        }
    }

    /// Sum of every phase, start of the cycle to the resumed hop.
    pub(crate) fn cycle_length() -> Duration {
        Self::SEQUENCE.iter().map(|p| p.duration()).sum()
    }
}

impl SleepCycle {
    /// Snapshots the facing at the moment the sprite landed.
    pub(crate) fn begin(now: Duration, facing: Direction) -> Self {
        Self {
            phase: SleepPhase::PreSleepA,
            entered_at: now,
            started_at: now,
            resume_direction: facing,
            resume_sprite: SpriteId::idle(facing),
        }
    }

    /// Moves at most one phase forward. The next phase is timed from `now`,
    /// so a late tick pushes the rest of the chain back instead of skipping.
    pub(crate) fn advance(&mut self, now: Duration) -> SleepStep {
        let elapsed = now.saturating_sub(self.entered_at);
        if elapsed < self.phase.duration() {
            return SleepStep::Holding;
        }
        match self.phase.next() {
            Some(next) => {
                debug!(from = ?self.phase, to = ?next, at_ms = now.as_millis() as u64, "sleep phase");
                self.phase = next;
                self.entered_at = now;
                SleepStep::Entered(next)
            }
            None => SleepStep::Finished,
        }
    }

    pub(crate) fn sprite(&self) -> SpriteId {
        match self.phase {
            SleepPhase::PreSleepA | SleepPhase::PreSleepC | SleepPhase::WakeHold => {
                self.resume_sprite
            }
            SleepPhase::PreSleepB | SleepPhase::PreSleepD => {
                SpriteId::idle(self.resume_direction.opposite())
            }
            SleepPhase::Sleeping => SpriteId::asleep(self.resume_direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn cycle_length_is_sum_of_phases() {
        assert_eq!(SleepPhase::cycle_length(), ms(9500));
    }

    #[test]
    fn phases_follow_the_table_in_order() {
        let mut phase = SleepPhase::PreSleepA;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen, SleepPhase::SEQUENCE.to_vec());
    }

    #[test]
    fn holds_until_the_phase_duration_elapses() {
        let mut cycle = SleepCycle::begin(ms(100), Direction::Left);
        assert_eq!(cycle.advance(ms(100)), SleepStep::Holding);
        assert_eq!(cycle.advance(ms(1099)), SleepStep::Holding);
        assert_eq!(cycle.advance(ms(1100)), SleepStep::Entered(SleepPhase::PreSleepB));
        assert_eq!(cycle.entered_at, ms(1100));
        assert_eq!(cycle.started_at, ms(100));
    }

    #[test]
    fn late_tick_advances_only_one_phase() {
        let mut cycle = SleepCycle::begin(ms(0), Direction::Right);
        // A huge stall still only moves to the next phase.
        assert_eq!(cycle.advance(ms(60_000)), SleepStep::Entered(SleepPhase::PreSleepB));
        assert_eq!(cycle.advance(ms(60_001)), SleepStep::Holding);
        assert_eq!(cycle.advance(ms(60_500)), SleepStep::Entered(SleepPhase::PreSleepC));
    }

    #[test]
    fn sprite_sequence_facing_left() {
        let mut cycle = SleepCycle::begin(ms(0), Direction::Left);
        let mut sprites = vec![cycle.sprite()];
        let mut t = 0;
        for phase in SleepPhase::SEQUENCE.iter().take(5) {
            t += phase.duration().as_millis() as u64;
            assert!(matches!(cycle.advance(ms(t)), SleepStep::Entered(_)));
            sprites.push(cycle.sprite());
        }
        assert_eq!(
            sprites,
            vec![
                SpriteId::IdleLeft,
                SpriteId::IdleRight,
                SpriteId::IdleLeft,
                SpriteId::IdleRight,
                SpriteId::SleepLeft,
                SpriteId::IdleLeft,
            ]
        );
        assert_eq!(cycle.advance(ms(t + 2000)), SleepStep::Finished);
    }

    #[test]
    fn right_facing_cycle_uses_right_sleep_sprite() {
        let mut cycle = SleepCycle::begin(ms(0), Direction::Right);
        assert_eq!(cycle.sprite(), SpriteId::IdleRight);
        cycle.phase = SleepPhase::PreSleepB;
        assert_eq!(cycle.sprite(), SpriteId::IdleLeft);
        cycle.phase = SleepPhase::Sleeping;
        assert_eq!(cycle.sprite(), SpriteId::SleepRight);
    }
}
