use bevy::math::{Quat, Vec3};

use crate::config::TuningConfig;

/// Lagged chase camera that trails the car by a heading-relative offset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChaseCamera {
    pub position: Vec3,
}

impl ChaseCamera {
    pub fn ideal_position(target: Vec3, heading: f32, offset: Vec3) -> Vec3 {
        target + Quat::from_rotation_y(heading) * offset
    }

    pub fn update(&mut self, target: Vec3, heading: f32, config: &TuningConfig, time_scale: f32) {
        let ideal = Self::ideal_position(target, heading, Vec3::from(config.camera_offset));
        let lag = config.camera_lag * time_scale;
        self.position += (ideal - self.position) * lag;
    }

    pub fn look_at(target: Vec3, config: &TuningConfig) -> Vec3 {
        target + Vec3::new(0.0, config.look_at_height, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn offset_follows_heading() {
        let behind = ChaseCamera::ideal_position(Vec3::ZERO, 0.0, Vec3::new(0.0, 4.0, 8.0));
        assert_relative_eq!(behind.z, 8.0, epsilon = 1e-5);

        let turned = ChaseCamera::ideal_position(
            Vec3::ZERO,
            std::f32::consts::FRAC_PI_2,
            Vec3::new(0.0, 4.0, 8.0),
        );
        assert_relative_eq!(turned.x, 8.0, epsilon = 1e-5);
        assert_relative_eq!(turned.y, 4.0, epsilon = 1e-5);
        assert_relative_eq!(turned.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn settles_on_a_parked_car() {
        let config = TuningConfig::default();
        let car = Vec3::new(3.0, config.ride_height, -2.0);
        let ideal = ChaseCamera::ideal_position(car, 0.4, Vec3::from(config.camera_offset));
        let mut camera = ChaseCamera::default();

        let mut previous_gap = (ideal - camera.position).length();
        for _ in 0..200 {
            camera.update(car, 0.4, &config, config.time_scale);
            let gap = (ideal - camera.position).length();
            assert!(gap < previous_gap);
            previous_gap = gap;
        }

        assert!(previous_gap < 5e-3);
    }

    #[test]
    fn trails_without_overshoot_on_a_straight_line() {
        let config = TuningConfig::default();
        let offset = Vec3::from(config.camera_offset);
        let mut car = Vec3::new(0.0, config.ride_height, 0.0);
        let mut camera = ChaseCamera {
            position: ChaseCamera::ideal_position(car, 0.0, offset),
        };
        let step = Vec3::new(0.0, 0.0, -0.2);

        // Steady-state lag for a constant velocity v and factor k is v * (1 - k) / k.
        let k = config.camera_lag * config.time_scale;
        let steady_gap = 0.2 * (1.0 - k) / k;

        let mut gap = 0.0;
        for _ in 0..2000 {
            car += step;
            camera.update(car, 0.0, &config, config.time_scale);

            let ideal = ChaseCamera::ideal_position(car, 0.0, offset);
            assert!(camera.position.z >= ideal.z);
            assert_relative_eq!(camera.position.y, ideal.y, epsilon = 1e-4);

            gap = camera.position.z - ideal.z;
            assert!(gap <= steady_gap + 1e-3);
        }

        assert_relative_eq!(gap, steady_gap, epsilon = 1e-2);
    }

    #[test]
    fn look_at_is_above_the_car() {
        let config = TuningConfig::default();
        let target = ChaseCamera::look_at(Vec3::new(1.0, 0.5, 2.0), &config);

        assert_eq!(target, Vec3::new(1.0, 1.5, 2.0));
    }
}
