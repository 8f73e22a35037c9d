use bevy::math::{Quat, Vec2, Vec3};

use crate::{
    collision::{CollisionHit, CollisionWorld},
    config::TuningConfig,
    input::InputState,
};

/// Ground-plane pose of the car. Forward is `(-sin heading, -cos heading)` on (x, z).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehiclePose {
    pub position: Vec2,
    pub speed: f32,
    pub heading: f32,
    pub steer_angle: f32,
    pub velocity: Vec2,
}

/// Cosmetic rotation handed to the renderer; not fed back into physics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisualPose {
    pub yaw: f32,
    pub roll: f32,
    pub pitch: f32,
}

impl VisualPose {
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_x(self.pitch)
            * Quat::from_rotation_y(self.yaw)
            * Quat::from_rotation_z(self.roll)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    pub drifting: bool,
    /// Speed at the moment the drift condition was evaluated, before any bounce.
    pub drift_speed: f32,
    pub collision: Option<CollisionHit>,
}

impl VehiclePose {
    pub fn forward(&self) -> Vec2 {
        Vec2::new(-self.heading.sin(), -self.heading.cos())
    }

    pub fn translation(&self, ride_height: f32) -> Vec3 {
        Vec3::new(self.position.x, ride_height, self.position.y)
    }

    pub fn is_drifting(&self, input: &InputState, config: &TuningConfig) -> bool {
        input.handbrake
            && self.speed.abs() > config.drift_min_speed
            && self.steer_angle.abs() > config.drift_min_steer
    }

    /// Advances the pose by one frame.
    pub fn step(
        &mut self,
        input: &InputState,
        config: &TuningConfig,
        time_scale: f32,
        world: &CollisionWorld,
    ) -> StepReport {
        let target_steer = match (input.left, input.right) {
            (true, false) => config.max_steer,
            (false, true) => -config.max_steer,
            _ => 0.0,
        };
        self.steer_angle += (target_steer - self.steer_angle) * config.steer_speed * time_scale;

        if input.forward {
            self.speed += config.accel * time_scale;
        } else if input.reverse {
            if self.speed > 0.0 {
                self.speed -= config.brake * time_scale;
            } else {
                self.speed -= config.accel * time_scale;
            }
        }

        let friction_factor = 1.0 - (1.0 - config.friction) * time_scale;
        self.speed *= friction_factor;
        self.speed = self.speed.max(config.min_speed()).min(config.max_speed);

        if self.speed.abs() > config.heading_deadzone {
            self.heading += self.steer_angle * self.speed * config.turn_rate * time_scale;
        }

        let drifting = self.is_drifting(input, config);
        let drift_speed = self.speed;
        let traction = if drifting {
            config.drift_traction
        } else {
            config.grip_traction
        };

        let target_velocity = self.forward() * self.speed;
        self.velocity += (target_velocity - self.velocity) * traction * time_scale;

        let collision = world.probe(
            self.translation(config.probe_height),
            self.heading,
            config.collision_distance,
            config.collision_policy,
        );

        if let Some(hit) = collision {
            self.speed *= config.bounce_factor;
            self.position -= Vec2::new(hit.direction.x, hit.direction.z) * config.push_back;
            bevy::log::debug!(
                "bounced off geometry {:.2} away, speed now {:.3}",
                hit.distance,
                self.speed
            );
        }

        self.position += self.velocity * time_scale;

        StepReport {
            drifting,
            drift_speed,
            collision,
        }
    }

    pub fn visual(&self, config: &TuningConfig) -> VisualPose {
        VisualPose {
            yaw: self.heading + std::f32::consts::PI,
            roll: self.steer_angle * self.speed * config.roll_factor,
            pitch: -self.speed * config.pitch_factor,
        }
    }

    /// Rear-wheel smoke anchors in world space.
    pub fn smoke_anchors(&self, config: &TuningConfig) -> [Vec3; 2] {
        let rotation = Quat::from_rotation_y(self.heading);
        let [x, z] = config.smoke_offset;
        let origin = self.translation(0.0);
        [
            origin + rotation * Vec3::new(x, 0.0, z),
            origin + rotation * Vec3::new(-x, 0.0, z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollidableMesh, Triangle};
    use approx::assert_relative_eq;

    fn held(names: &[&str]) -> InputState {
        let mut input = InputState::default();
        for name in names {
            input.set_key(name, true);
        }
        input
    }

    fn open_world() -> CollisionWorld {
        CollisionWorld::default()
    }

    /// A wall in the plane `z = z` that the car runs into when heading 0 (towards -z).
    fn walled_world(z: f32) -> CollisionWorld {
        let a = Vec3::new(-50.0, -5.0, z);
        let b = Vec3::new(50.0, -5.0, z);
        let c = Vec3::new(50.0, 5.0, z);
        let d = Vec3::new(-50.0, 5.0, z);
        let mut world = CollisionWorld::default();
        world.insert(CollidableMesh::new(vec![
            Triangle::new(a, b, c),
            Triangle::new(a, c, d),
        ]));
        world.freeze();
        world
    }

    #[test]
    fn forward_speed_never_decreases_and_never_exceeds_the_cap() {
        let config = TuningConfig::default();
        let input = held(&["w"]);
        let world = open_world();
        let mut pose = VehiclePose::default();

        let mut previous = pose.speed;
        for _ in 0..500 {
            pose.step(&input, &config, config.time_scale, &world);
            assert!(pose.speed >= previous);
            assert!(pose.speed <= config.max_speed);
            previous = pose.speed;
        }
    }

    #[test]
    fn forward_speed_clamps_exactly_at_the_cap_without_friction() {
        let config = TuningConfig {
            friction: 1.0,
            ..TuningConfig::default()
        };
        let input = held(&["w"]);
        let world = open_world();
        let mut pose = VehiclePose::default();

        for _ in 0..1000 {
            pose.step(&input, &config, config.time_scale, &world);
        }

        assert_eq!(pose.speed, config.max_speed);
    }

    #[test]
    fn reverse_from_rest_is_capped_at_half_top_speed() {
        let config = TuningConfig {
            friction: 1.0,
            ..TuningConfig::default()
        };
        let input = held(&["s"]);
        let world = open_world();
        let mut pose = VehiclePose::default();

        pose.step(&input, &config, config.time_scale, &world);
        assert!(pose.speed < 0.0);
        assert_relative_eq!(pose.speed, -config.accel * config.time_scale, epsilon = 1e-6);

        for _ in 0..1000 {
            pose.step(&input, &config, config.time_scale, &world);
            assert!(pose.speed >= -config.max_speed / 2.0);
        }
        assert_eq!(pose.speed, -config.max_speed / 2.0);
    }

    #[test]
    fn braking_is_stronger_than_reversing() {
        let config = TuningConfig {
            friction: 1.0,
            ..TuningConfig::default()
        };
        let input = held(&["s"]);
        let world = open_world();

        let mut moving = VehiclePose {
            speed: 0.5,
            ..VehiclePose::default()
        };
        moving.step(&input, &config, 1.0, &world);
        assert_relative_eq!(moving.speed, 0.5 - config.brake, epsilon = 1e-6);

        let mut resting = VehiclePose::default();
        resting.step(&input, &config, 1.0, &world);
        assert_relative_eq!(resting.speed, -config.accel, epsilon = 1e-6);
    }

    #[test]
    fn friction_decays_speed_without_changing_sign() {
        let config = TuningConfig::default();
        let idle = InputState::default();
        let world = open_world();

        for &start in &[0.6_f32, -0.3] {
            let mut pose = VehiclePose {
                speed: start,
                ..VehiclePose::default()
            };
            let mut previous = pose.speed.abs();
            for _ in 0..3000 {
                pose.step(&idle, &config, config.time_scale, &world);
                assert_eq!(pose.speed.signum(), start.signum());
                assert!(pose.speed.abs() < previous);
                previous = pose.speed.abs();
            }
            assert!(pose.speed.abs() < 1e-6);
        }
    }

    #[test]
    fn steering_eases_towards_target() {
        let config = TuningConfig::default();
        let world = open_world();
        let mut pose = VehiclePose::default();

        pose.step(&held(&["a"]), &config, 1.0, &world);
        assert_relative_eq!(pose.steer_angle, config.max_steer * config.steer_speed, epsilon = 1e-6);

        let mut both = VehiclePose {
            steer_angle: 0.02,
            ..VehiclePose::default()
        };
        both.step(&held(&["a", "d"]), &config, 1.0, &world);
        assert_relative_eq!(both.steer_angle, 0.02 * (1.0 - config.steer_speed), epsilon = 1e-6);
    }

    #[test]
    fn heading_holds_still_inside_the_deadzone() {
        let config = TuningConfig::default();
        let world = open_world();
        let mut pose = VehiclePose {
            steer_angle: config.max_steer,
            ..VehiclePose::default()
        };

        for _ in 0..10 {
            pose.step(&held(&["a"]), &config, config.time_scale, &world);
        }

        assert_eq!(pose.heading, 0.0);
    }

    #[test]
    fn drift_requires_all_three_conditions() {
        let config = TuningConfig::default();
        let world = open_world();
        let drifting_pose = VehiclePose {
            speed: 0.5,
            steer_angle: 0.03,
            ..VehiclePose::default()
        };

        let mut pose = drifting_pose;
        assert!(pose.step(&held(&["space", "a"]), &config, 0.5, &world).drifting);

        let mut no_handbrake = drifting_pose;
        assert!(!no_handbrake.step(&held(&["a"]), &config, 0.5, &world).drifting);

        let mut too_slow = VehiclePose {
            speed: 0.1,
            ..drifting_pose
        };
        assert!(!too_slow.step(&held(&["space", "a"]), &config, 0.5, &world).drifting);

        let mut straight = VehiclePose {
            steer_angle: 0.0,
            ..drifting_pose
        };
        assert!(!straight.step(&held(&["space"]), &config, 0.5, &world).drifting);
    }

    #[test]
    fn drifting_lets_velocity_lag_the_heading() {
        let config = TuningConfig::default();
        let world = open_world();
        let start = VehiclePose {
            speed: 0.5,
            steer_angle: 0.04,
            heading: 0.0,
            velocity: Vec2::new(0.0, -0.5),
            ..VehiclePose::default()
        };

        let mut grip = start;
        let mut slide = start;
        for _ in 0..30 {
            grip.step(&held(&["a"]), &config, config.time_scale, &world);
            slide.step(&held(&["a", "space"]), &config, config.time_scale, &world);
        }

        let slip = |pose: &VehiclePose| {
            let (v, f) = (pose.velocity, pose.forward());
            (v.x * f.y - v.y * f.x).atan2(v.dot(f)).abs()
        };
        assert!(slip(&slide) > slip(&grip));
    }

    #[test]
    fn collision_bounces_speed_and_pushes_back() {
        let config = TuningConfig::default();
        let world = walled_world(-1.0);
        let mut pose = VehiclePose {
            speed: 0.4,
            velocity: Vec2::ZERO,
            ..VehiclePose::default()
        };

        let report = pose.step(&InputState::default(), &config, 1.0, &world);

        let hit = report.collision.expect("wall is within range");
        let speed_before_bounce = 0.4 * config.friction;
        assert_relative_eq!(pose.speed, speed_before_bounce * config.bounce_factor, epsilon = 1e-6);
        assert!(pose.speed < 0.0);
        assert_relative_eq!(hit.direction.z, -1.0, epsilon = 1e-5);
        // Velocity moved the car towards the wall, the push-back moved it away.
        let travelled = -(0.4 * config.friction * config.grip_traction);
        assert_relative_eq!(pose.position.y, config.push_back + travelled, epsilon = 1e-5);
    }

    #[test]
    fn visual_pose_faces_away_from_travel() {
        let config = TuningConfig::default();
        let pose = VehiclePose {
            heading: 0.3,
            speed: 0.5,
            steer_angle: 0.02,
            ..VehiclePose::default()
        };

        let visual = pose.visual(&config);

        assert_relative_eq!(visual.yaw, 0.3 + std::f32::consts::PI, epsilon = 1e-6);
        assert_relative_eq!(visual.roll, 0.02 * 0.5 * config.roll_factor, epsilon = 1e-6);
        assert_relative_eq!(visual.pitch, -0.5 * config.pitch_factor, epsilon = 1e-6);
    }

    #[test]
    fn smoke_anchors_sit_behind_the_car() {
        let config = TuningConfig::default();
        let pose = VehiclePose {
            position: Vec2::new(10.0, 20.0),
            ..VehiclePose::default()
        };

        let [left, right] = pose.smoke_anchors(&config);

        assert_relative_eq!(left.x, 10.9, epsilon = 1e-5);
        assert_relative_eq!(right.x, 9.1, epsilon = 1e-5);
        assert_relative_eq!(left.z, 23.8, epsilon = 1e-5);
        assert_relative_eq!(right.z, 23.8, epsilon = 1e-5);
    }
}
