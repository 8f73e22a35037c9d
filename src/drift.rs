//! Drift combo scoring.
//!
//! Score accrues while the drift condition holds. When it stops, the combo is
//! kept for a short wall-clock grace window so quick corrections don't lose it;
//! a collision drops it immediately.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftPhase {
    Idle,
    Drifting,
    Cooling { deadline: Duration },
}

impl Default for DriftPhase {
    fn default() -> Self {
        DriftPhase::Idle
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriftScoring {
    score: f32,
    phase: DriftPhase,
}

impl DriftScoring {
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Feeds one frame of the drift condition. `now` is unscaled wall-clock time.
    pub fn update(&mut self, drifting: bool, speed: f32, rate: f32, grace: Duration, now: Duration) {
        if drifting {
            if self.phase == DriftPhase::Idle {
                bevy::log::debug!("drift combo started");
            }
            self.score += speed.abs() * rate;
            self.phase = DriftPhase::Drifting;
            return;
        }

        match self.phase {
            DriftPhase::Drifting => {
                self.phase = DriftPhase::Cooling {
                    deadline: now + grace,
                }
            }
            DriftPhase::Cooling { deadline } if now >= deadline => {
                bevy::log::debug!("drift combo ended at {:.0}", self.score);
                self.reset();
            }
            _ => (),
        }
    }

    /// Drops the combo unconditionally, overriding any grace window.
    pub fn reset(&mut self) {
        self.score = 0.0;
        self.phase = DriftPhase::Idle;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComboTier {
    Drift,
    Nice,
    Awesome,
    Insane,
    Godlike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Plain,
    Pulse,
    Shake,
    Madness,
    Frenzy,
}

impl ComboTier {
    pub fn from_score(score: f32) -> Self {
        if score < 500.0 {
            ComboTier::Drift
        } else if score < 1500.0 {
            ComboTier::Nice
        } else if score < 3000.0 {
            ComboTier::Awesome
        } else if score < 5000.0 {
            ComboTier::Insane
        } else {
            ComboTier::Godlike
        }
    }

    pub fn rank(self) -> u8 {
        self as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            ComboTier::Drift => "DRIFT!",
            ComboTier::Nice => "NICE!",
            ComboTier::Awesome => "AWESOME!!",
            ComboTier::Insane => "INSANE!!!",
            ComboTier::Godlike => "GODLIKE!!!!",
        }
    }

    pub fn emphasis(self) -> Emphasis {
        match self {
            ComboTier::Drift => Emphasis::Plain,
            ComboTier::Nice => Emphasis::Pulse,
            ComboTier::Awesome => Emphasis::Shake,
            ComboTier::Insane => Emphasis::Madness,
            ComboTier::Godlike => Emphasis::Frenzy,
        }
    }

    pub fn shakes(self) -> bool {
        self >= ComboTier::Awesome
    }
}

/// What the score display should show for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HudReadout {
    pub tier: ComboTier,
    pub label: &'static str,
    pub score: u32,
    pub scale: f32,
    pub tilt_degrees: f32,
}

impl HudReadout {
    /// `steer` is the steering angle normalised to [-1, 1].
    pub fn new(score: f32, steer: f32) -> Self {
        let tier = ComboTier::from_score(score);
        Self {
            tier,
            label: tier.label(),
            score: score.max(0.0).floor() as u32,
            scale: (1.0 + score / 25000.0).min(1.5),
            tilt_degrees: -15.0 + steer * -15.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GRACE: Duration = Duration::from_millis(200);

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn score_accrues_with_speed() {
        let mut drift = DriftScoring::default();

        drift.update(true, 0.5, 10.0, GRACE, ms(0));
        drift.update(true, -0.25, 10.0, GRACE, ms(16));

        assert_relative_eq!(drift.score(), 7.5, epsilon = 1e-6);
        assert_eq!(drift.phase, DriftPhase::Drifting);
    }

    #[test]
    fn score_survives_a_short_break() {
        let mut drift = DriftScoring::default();
        drift.update(true, 0.5, 10.0, GRACE, ms(0));

        drift.update(false, 0.5, 10.0, GRACE, ms(100));
        drift.update(false, 0.5, 10.0, GRACE, ms(250));
        assert_relative_eq!(drift.score(), 5.0, epsilon = 1e-6);

        drift.update(true, 0.5, 10.0, GRACE, ms(290));
        drift.update(false, 0.5, 10.0, GRACE, ms(400));
        drift.update(false, 0.5, 10.0, GRACE, ms(590));
        assert_relative_eq!(drift.score(), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn score_resets_once_grace_expires() {
        let mut drift = DriftScoring::default();
        drift.update(true, 0.5, 10.0, GRACE, ms(0));
        drift.update(false, 0.5, 10.0, GRACE, ms(16));

        assert_eq!(
            drift.phase,
            DriftPhase::Cooling {
                deadline: ms(216)
            }
        );

        drift.update(false, 0.5, 10.0, GRACE, ms(216));
        assert_eq!(drift.score(), 0.0);
        assert_eq!(drift.phase, DriftPhase::Idle);
    }

    #[test]
    fn reset_overrides_the_grace_window() {
        let mut drift = DriftScoring::default();
        drift.update(true, 0.8, 10.0, GRACE, ms(0));
        drift.update(false, 0.8, 10.0, GRACE, ms(10));

        drift.reset();

        assert_eq!(drift.score(), 0.0);
        assert_eq!(drift.phase, DriftPhase::Idle);
    }

    #[test]
    fn tiers_step_at_their_thresholds() {
        assert_eq!(ComboTier::from_score(0.0).rank(), 1);
        assert_eq!(ComboTier::from_score(499.0).rank(), 1);
        assert_eq!(ComboTier::from_score(500.0).rank(), 2);
        assert_eq!(ComboTier::from_score(1500.0).rank(), 3);
        assert_eq!(ComboTier::from_score(2999.0).rank(), 3);
        assert_eq!(ComboTier::from_score(3000.0).rank(), 4);
        assert_eq!(ComboTier::from_score(5000.0).rank(), 5);
        assert_eq!(ComboTier::from_score(1e9).rank(), 5);
    }

    #[test]
    fn tiers_never_skip_as_score_grows() {
        let mut previous = ComboTier::from_score(0.0);
        let mut score = 0.0;
        while score < 6000.0 {
            let tier = ComboTier::from_score(score);
            assert!(tier.rank() == previous.rank() || tier.rank() == previous.rank() + 1);
            previous = tier;
            score += 0.5;
        }
        assert_eq!(previous, ComboTier::Godlike);
    }

    #[test]
    fn upper_tiers_shake() {
        assert!(!ComboTier::Drift.shakes());
        assert!(!ComboTier::Nice.shakes());
        assert!(ComboTier::Awesome.shakes());
        assert!(ComboTier::Insane.shakes());
        assert!(ComboTier::Godlike.shakes());
        assert_eq!(ComboTier::Insane.emphasis(), Emphasis::Madness);
        assert_eq!(ComboTier::Godlike.emphasis(), Emphasis::Frenzy);
    }

    #[test]
    fn readout_scale_and_tilt() {
        let small = HudReadout::new(2500.0, 0.0);
        assert_relative_eq!(small.scale, 1.1, epsilon = 1e-6);
        assert_relative_eq!(small.tilt_degrees, -15.0, epsilon = 1e-6);
        assert_eq!(small.score, 2500);
        assert_eq!(small.label, "AWESOME!!");

        let huge = HudReadout::new(40000.7, -1.0);
        assert_relative_eq!(huge.scale, 1.5, epsilon = 1e-6);
        assert_relative_eq!(huge.tilt_degrees, 0.0, epsilon = 1e-6);
        assert_eq!(huge.score, 40000);
    }
}
