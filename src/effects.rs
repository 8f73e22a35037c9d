//! Tyre smoke and speed streaks. Both only read simulation output and decay on their own.

use bevy::prelude::*;
use rand::Rng;

use crate::{
    config::ActiveTuning,
    frame::{Simulation, TimeScale},
    plugin::ChaseCameraTag,
};

/// Spawn request for one smoke puff at a world position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmokeRequest {
    pub position: Vec3,
}

pub struct EffectAssets {
    puff_mesh: Handle<Mesh>,
    puff_material: Handle<StandardMaterial>,
    streak_mesh: Handle<Mesh>,
    streak_material: Handle<StandardMaterial>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmokePuff {
    pub life: f32,
}

impl SmokePuff {
    const SPAWN_HEIGHT: f32 = 0.3;
    const RISE: f32 = 0.02;
    const GROWTH: f32 = 1.01;
    const DECAY: f32 = 0.015;

    pub fn spawn<R: Rng>(anchor: Vec3, rng: &mut R) -> (Self, Transform) {
        let size = rng.gen_range(0.3..0.8);
        let jitter = Vec3::new(
            rng.gen_range(-0.35..0.35),
            rng.gen_range(0.0..0.4),
            rng.gen_range(-0.35..0.35),
        );
        let spin = |rng: &mut R| rng.gen_range(0.0..std::f32::consts::PI);

        let transform = Transform {
            translation: Vec3::new(anchor.x, Self::SPAWN_HEIGHT, anchor.z) + jitter,
            rotation: Quat::from_rotation_x(spin(rng))
                * Quat::from_rotation_y(spin(rng))
                * Quat::from_rotation_z(spin(rng)),
            scale: Vec3::splat(size),
        };

        (
            SmokePuff {
                life: rng.gen_range(1.0..1.5),
            },
            transform,
        )
    }

    /// Returns false once the puff has faded out.
    pub fn advance(&mut self, transform: &mut Transform, time_scale: f32) -> bool {
        transform.translation.y += Self::RISE * time_scale;
        transform.scale *= Self::GROWTH;
        self.life -= Self::DECAY * time_scale;
        self.life > 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedStreak;

impl SpeedStreak {
    const MIN_RATIO: f32 = 0.3;
    const SPAWN_DISTANCE: f32 = 80.0;
    const SPREAD_X: f32 = 60.0;
    const SPREAD_Y: f32 = 30.0;
    const DESPAWN_RADIUS: f32 = 5.0;

    pub fn spawn_chance(speed_ratio: f32) -> f32 {
        if speed_ratio > Self::MIN_RATIO {
            speed_ratio * 0.4
        } else {
            0.0
        }
    }

    pub fn spawn<R: Rng>(camera: &Transform, rng: &mut R) -> Transform {
        let local = Vec3::new(
            rng.gen_range(-0.5..0.5) * Self::SPREAD_X,
            rng.gen_range(-0.5..0.5) * Self::SPREAD_Y,
            -Self::SPAWN_DISTANCE,
        );

        Transform {
            translation: camera.translation + camera.rotation * local,
            rotation: camera.rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn advance(transform: &mut Transform, speed_ratio: f32, time_scale: f32) {
        let step = (1.5 + speed_ratio * 3.0) * time_scale;
        transform.translation += transform.rotation * Vec3::Z * step;
    }

    /// Streaks expire near the camera, or once they have slipped behind it.
    pub fn expired(transform: &Transform, camera: &Transform) -> bool {
        let offset = transform.translation - camera.translation;
        let forward = camera.rotation * -Vec3::Z;
        offset.length() < Self::DESPAWN_RADIUS || offset.dot(forward) < 0.0
    }
}

pub fn setup_effect_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(EffectAssets {
        puff_mesh: meshes.add(Mesh::from(shape::Icosphere {
            radius: 1.0,
            subdivisions: 0,
        })),
        puff_material: materials.add(Color::WHITE.into()),
        streak_mesh: meshes.add(Mesh::from(shape::Box::new(0.7, 0.7, 15.0))),
        streak_material: materials.add(Color::WHITE.into()),
    });
}

pub fn spawn_smoke(
    mut commands: Commands,
    assets: Res<EffectAssets>,
    mut requests: EventReader<SmokeRequest>,
) {
    let mut rng = rand::thread_rng();

    for request in requests.iter() {
        let (puff, transform) = SmokePuff::spawn(request.position, &mut rng);
        commands
            .spawn_bundle(PbrBundle {
                mesh: assets.puff_mesh.clone(),
                material: assets.puff_material.clone(),
                transform,
                ..Default::default()
            })
            .insert(puff);
    }
}

pub fn update_smoke(
    mut commands: Commands,
    time_scale: Res<TimeScale>,
    mut puffs: Query<(Entity, &mut SmokePuff, &mut Transform)>,
) {
    for (entity, mut puff, mut transform) in puffs.iter_mut() {
        if !puff.advance(&mut transform, time_scale.0) {
            commands.entity(entity).despawn();
        }
    }
}

pub fn update_speed_streaks(
    mut commands: Commands,
    assets: Res<EffectAssets>,
    tuning: Res<ActiveTuning>,
    time_scale: Res<TimeScale>,
    vehicles: Query<&Simulation>,
    cameras: Query<&Transform, (With<ChaseCameraTag>, Without<SpeedStreak>)>,
    mut streaks: Query<(Entity, &mut Transform), With<SpeedStreak>>,
) {
    let config = match tuning.get() {
        Some(config) => config,
        None => return,
    };
    let camera = match cameras.iter().next() {
        Some(camera) => camera,
        None => return,
    };
    let speed_ratio = vehicles
        .iter()
        .next()
        .map(|simulation| simulation.pose.speed.abs() / config.max_speed)
        .unwrap_or(0.0);

    let mut rng = rand::thread_rng();
    if rng.gen::<f32>() < SpeedStreak::spawn_chance(speed_ratio) {
        commands
            .spawn_bundle(PbrBundle {
                mesh: assets.streak_mesh.clone(),
                material: assets.streak_material.clone(),
                transform: SpeedStreak::spawn(camera, &mut rng),
                ..Default::default()
            })
            .insert(SpeedStreak);
    }

    for (entity, mut transform) in streaks.iter_mut() {
        SpeedStreak::advance(&mut transform, speed_ratio, time_scale.0);
        if SpeedStreak::expired(&transform, camera) {
            commands.entity(entity).despawn();
        }
    }
}
