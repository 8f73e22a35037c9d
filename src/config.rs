use bevy::{
    asset::{AssetLoader, LoadContext, LoadState, LoadedAsset},
    reflect::TypeUuid,
    utils::BoxedFuture,
};

use crate::{
    collision::CollisionPolicy,
    materials::{MaterialRole, RoleRule},
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("brake ({brake}) must be stronger than acceleration ({accel})")]
    BrakeTooWeak { brake: f32, accel: f32 },
    #[error("drift traction ({drift}) must be below grip traction ({grip})")]
    DriftTractionTooHigh { drift: f32, grip: f32 },
    #[error("bounce factor must be negative, got {0}")]
    BounceNotNegative(f32),
    #[error("friction must lie in (0, 1], got {0}")]
    FrictionOutOfRange(f32),
    #[error("time scale must be positive, got {0}")]
    TimeScaleNotPositive(f32),
    #[error("camera lag must lie in (0, 1], got {0}")]
    CameraLagOutOfRange(f32),
    #[error("collision distance must be positive, got {0}")]
    CollisionDistanceNotPositive(f32),
    #[error("{name} scaled by the time scale is {effective}, above 1 it overshoots every frame")]
    RateTooHighForTimeScale { name: &'static str, effective: f32 },
}

/// Every tunable of the simulation, loaded from a `.tuning` JSON asset.
#[derive(Debug, Clone, serde::Deserialize, TypeUuid)]
#[uuid = "543a8e86-5dfb-47be-9166-8e526801df6d"]
#[serde(default)]
pub struct TuningConfig {
    pub accel: f32,
    pub max_speed: f32,
    pub friction: f32,
    pub brake: f32,
    pub steer_speed: f32,
    pub max_steer: f32,
    pub turn_rate: f32,
    pub heading_deadzone: f32,
    pub drift_traction: f32,
    pub grip_traction: f32,
    pub drift_min_speed: f32,
    pub drift_min_steer: f32,
    pub drift_score_rate: f32,
    pub drift_grace_ms: u64,
    pub collision_distance: f32,
    pub collision_policy: CollisionPolicy,
    pub bounce_factor: f32,
    pub push_back: f32,
    pub probe_height: f32,
    pub time_scale: f32,
    pub camera_lag: f32,
    pub camera_offset: [f32; 3],
    pub look_at_height: f32,
    pub ride_height: f32,
    pub roll_factor: f32,
    pub pitch_factor: f32,
    pub car_scale: f32,
    pub map_scale: f32,
    pub smoke_offset: [f32; 2],
    pub material_roles: Vec<RoleRule>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            accel: 0.008,
            max_speed: 0.8,
            friction: 0.98,
            brake: 0.04,
            steer_speed: 0.05,
            max_steer: 0.04,
            turn_rate: 2.5,
            heading_deadzone: 0.01,
            drift_traction: 0.02,
            grip_traction: 0.90,
            drift_min_speed: 0.2,
            drift_min_steer: 0.01,
            drift_score_rate: 10.0,
            drift_grace_ms: 200,
            collision_distance: 1.8,
            collision_policy: CollisionPolicy::FirstInOrder,
            bounce_factor: -0.5,
            push_back: 0.2,
            probe_height: 0.5,
            time_scale: 0.5,
            camera_lag: 0.08,
            camera_offset: [0.0, 4.0, 8.0],
            look_at_height: 1.0,
            ride_height: 0.5,
            roll_factor: -5.0,
            pitch_factor: 0.1,
            car_scale: 2.5,
            map_scale: 0.01,
            smoke_offset: [0.9, 3.8],
            material_roles: vec![
                RoleRule::new("tail", MaterialRole::Taillight),
                RoleRule::new("brake", MaterialRole::Taillight),
                RoleRule::new("rear_light", MaterialRole::Taillight),
                RoleRule::new("headlight", MaterialRole::Headlight),
                RoleRule::new("front_light", MaterialRole::Headlight),
            ],
        }
    }
}

impl TuningConfig {
    /// Rejects configs that break the relative ordering the handling depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brake <= self.accel {
            return Err(ConfigError::BrakeTooWeak {
                brake: self.brake,
                accel: self.accel,
            });
        }
        if self.drift_traction >= self.grip_traction {
            return Err(ConfigError::DriftTractionTooHigh {
                drift: self.drift_traction,
                grip: self.grip_traction,
            });
        }
        if self.bounce_factor >= 0.0 {
            return Err(ConfigError::BounceNotNegative(self.bounce_factor));
        }
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return Err(ConfigError::FrictionOutOfRange(self.friction));
        }
        if self.time_scale <= 0.0 {
            return Err(ConfigError::TimeScaleNotPositive(self.time_scale));
        }
        if !(self.camera_lag > 0.0 && self.camera_lag <= 1.0) {
            return Err(ConfigError::CameraLagOutOfRange(self.camera_lag));
        }
        if self.collision_distance <= 0.0 {
            return Err(ConfigError::CollisionDistanceNotPositive(
                self.collision_distance,
            ));
        }

        // Per-frame easing factors; past 1 the eased value flips sign each frame.
        let rates = [
            ("grip_traction", self.grip_traction),
            ("drift_traction", self.drift_traction),
            ("steer_speed", self.steer_speed),
            ("camera_lag", self.camera_lag),
            ("friction loss", 1.0 - self.friction),
        ];
        for &(name, rate) in rates.iter() {
            let effective = rate * self.time_scale;
            if effective > 1.0 {
                return Err(ConfigError::RateTooHighForTimeScale { name, effective });
            }
        }

        Ok(())
    }

    /// Reverse top speed is always half of the forward one.
    pub fn min_speed(&self) -> f32 {
        -self.max_speed / 2.0
    }
}

/// The config every system reads, copied out of the asset store once it loads.
#[derive(Debug, Clone, Default)]
pub struct ActiveTuning(Option<TuningConfig>);

impl ActiveTuning {
    pub fn get(&self) -> Option<&TuningConfig> {
        self.0.as_ref()
    }

    pub fn set(&mut self, config: TuningConfig) {
        self.0 = Some(config);
    }

    /// A failed first load falls back to the built-in values. Returns true when it did.
    /// Later failures, such as a bad hot-reload, keep the last good config.
    pub fn fall_back_on(&mut self, state: LoadState) -> bool {
        if self.0.is_some() || state != LoadState::Failed {
            return false;
        }
        self.0 = Some(TuningConfig::default());
        true
    }
}

#[derive(Default)]
pub struct TuningConfigLoader;

impl AssetLoader for TuningConfigLoader {
    fn load<'a>(
        &'a self,
        bytes: &'a [u8],
        load_context: &'a mut LoadContext,
    ) -> BoxedFuture<'a, Result<(), anyhow::Error>> {
        Box::pin(async move {
            let config = serde_json::from_str::<TuningConfig>(std::str::from_utf8(bytes)?)?;
            if let Err(error) = config.validate() {
                bevy::log::warn!("rejecting {:?}: {}", load_context.path(), error);
                return Err(error.into());
            }
            load_context.set_default_asset(LoadedAsset::new(config));
            Ok(())
        })
    }

    fn extensions(&self) -> &[&str] {
        &["tuning"]
    }
}
