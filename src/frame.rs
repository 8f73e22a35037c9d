//! One simulation frame: physics, then drift scoring, then the chase camera.
//!
//! Steps are per display frame; there is no fixed-timestep accumulator, so the
//! handling feel is tied to the refresh rate.

use std::time::Duration;

use bevy::math::Vec3;

use crate::{
    camera::ChaseCamera,
    collision::{CollisionHit, CollisionWorld},
    config::TuningConfig,
    drift::{DriftScoring, HudReadout},
    input::InputState,
    vehicle::{VehiclePose, VisualPose},
};

/// Global multiplier on every per-frame delta. Constant today; a hook for slow motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale(pub f32);

impl Default for TimeScale {
    fn default() -> Self {
        TimeScale(TuningConfig::default().time_scale)
    }
}

/// Score feedback for the HUD, sent once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftFeedback {
    pub active: bool,
    pub score: f32,
    /// Steering angle normalised to [-1, 1].
    pub steer: f32,
}

impl DriftFeedback {
    pub fn readout(&self) -> HudReadout {
        HudReadout::new(self.score, self.steer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub drifting: bool,
    pub collision: Option<CollisionHit>,
    pub smoke: Option<[Vec3; 2]>,
    pub translation: Vec3,
    pub visual: VisualPose,
    pub feedback: DriftFeedback,
}

#[derive(Debug, Clone, Default)]
pub struct Simulation {
    pub pose: VehiclePose,
    pub drift: DriftScoring,
    pub camera: ChaseCamera,
}

impl Simulation {
    pub fn advance(
        &mut self,
        input: &InputState,
        world: &CollisionWorld,
        config: &TuningConfig,
        time_scale: TimeScale,
        now: Duration,
    ) -> FrameReport {
        let TimeScale(time_scale) = time_scale;

        let step = self.pose.step(input, config, time_scale, world);

        self.drift.update(
            step.drifting,
            step.drift_speed,
            config.drift_score_rate,
            Duration::from_millis(config.drift_grace_ms),
            now,
        );
        if step.collision.is_some() {
            self.drift.reset();
        }

        let translation = self.pose.translation(config.ride_height);
        self.camera
            .update(translation, self.pose.heading, config, time_scale);

        let steer = if config.max_steer > 0.0 {
            (self.pose.steer_angle / config.max_steer).max(-1.0).min(1.0)
        } else {
            0.0
        };

        FrameReport {
            drifting: step.drifting,
            collision: step.collision,
            smoke: if step.drifting {
                Some(self.pose.smoke_anchors(config))
            } else {
                None
            },
            translation,
            visual: self.pose.visual(config),
            feedback: DriftFeedback {
                active: step.drifting && step.collision.is_none(),
                score: self.drift.score(),
                steer,
            },
        }
    }

    pub fn look_at(&self, config: &TuningConfig) -> Vec3 {
        ChaseCamera::look_at(self.pose.translation(config.ride_height), config)
    }
}
