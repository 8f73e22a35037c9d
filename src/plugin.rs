use bevy::{
    app::AppExit,
    input::{keyboard::KeyboardInput, ElementState},
    prelude::*,
    render::camera::PerspectiveProjection,
    window::WindowFocused,
};

use crate::{
    collision::CollisionWorld,
    config::{ActiveTuning, TuningConfig, TuningConfigLoader},
    effects::{self, SmokeRequest},
    frame::{DriftFeedback, Simulation, TimeScale},
    hud,
    input::{key_name, InputCommand, InputState},
    world::{self, VehicleModel, WorldModel},
};

const TUNING_PATH: &str = "handling.tuning";
const VEHICLE_PATH: &str = "miata.glb";
const MAP_PATH: &str = "map.glb";

pub struct TuningHandle(pub Handle<TuningConfig>);

pub struct ChaseCameraTag;

#[derive(Bundle)]
struct VehicleBundle {
    model: VehicleModel,
    simulation: Simulation,
    transform: Transform,
    global_transform: GlobalTransform,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, SystemLabel)]
pub enum FrameStage {
    Input,
    Loading,
    Physics,
    Effects,
    Presentation,
}

fn setup(mut commands: Commands, asset_server: Res<AssetServer>) {
    if let Err(error) = asset_server.watch_for_changes() {
        warn!("asset hot reload unavailable: {:?}", error);
    }

    let defaults = TuningConfig::default();
    commands.insert_resource(TuningHandle(asset_server.load(TUNING_PATH)));

    commands
        .spawn_bundle(PerspectiveCameraBundle {
            perspective_projection: PerspectiveProjection {
                fov: 75.0_f32.to_radians(),
                ..Default::default()
            },
            ..PerspectiveCameraBundle::new_3d()
        })
        .insert(ChaseCameraTag);

    commands.spawn_bundle(LightBundle {
        transform: Transform::from_xyz(50.0, 100.0, 50.0),
        light: Light {
            range: 500.0,
            intensity: 50000.0,
            ..Default::default()
        },
        ..Default::default()
    });

    commands
        .spawn_bundle((
            WorldModel::new(asset_server.load(MAP_PATH)),
            Transform::from_scale(Vec3::splat(defaults.map_scale)),
            GlobalTransform::default(),
        ))
        .with_children(|parent| {
            parent.spawn_scene(asset_server.load(format!("{}#Scene0", MAP_PATH).as_str()));
        });

    commands
        .spawn_bundle(VehicleBundle {
            model: VehicleModel::new(asset_server.load(VEHICLE_PATH)),
            simulation: Simulation::default(),
            transform: Transform {
                translation: Vec3::new(0.0, defaults.ride_height, 0.0),
                scale: Vec3::splat(defaults.car_scale),
                ..Default::default()
            },
            global_transform: GlobalTransform::default(),
        })
        .with_children(|parent| {
            parent.spawn_scene(asset_server.load(format!("{}#Scene0", VEHICLE_PATH).as_str()));
        });
}

fn read_input(
    mut keys: EventReader<KeyboardInput>,
    mut focus: EventReader<WindowFocused>,
    mut input: ResMut<InputState>,
    mut exit: EventWriter<AppExit>,
) {
    for event in keys.iter() {
        let name = match event.key_code.and_then(key_name) {
            Some(name) => name,
            None => continue,
        };

        let pressed = event.state == ElementState::Pressed;
        if name == "escape" {
            if pressed {
                info!("escape pressed, leaving");
                exit.send(AppExit);
            }
            continue;
        }

        input.apply(&InputCommand::key(name, pressed));
    }

    for event in focus.iter() {
        if !event.focused {
            debug!("window lost focus, releasing all driving keys");
            input.apply(&InputCommand::FocusLost);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn simulate(
    time: Res<Time>,
    input: Res<InputState>,
    world: Res<CollisionWorld>,
    tuning: Res<ActiveTuning>,
    mut time_scale: ResMut<TimeScale>,
    mut smoke: EventWriter<SmokeRequest>,
    mut feedback: EventWriter<DriftFeedback>,
    mut vehicles: Query<(&VehicleModel, &mut Simulation, &mut Transform)>,
) {
    let config = match tuning.get() {
        Some(config) => config,
        None => return,
    };

    *time_scale = TimeScale(config.time_scale);

    for (model, mut simulation, mut transform) in vehicles.iter_mut() {
        if !model.ready {
            continue;
        }

        let report = simulation.advance(
            &input,
            &world,
            config,
            *time_scale,
            time.time_since_startup(),
        );

        transform.translation = report.translation;
        transform.rotation = report.visual.rotation();
        transform.scale = Vec3::splat(config.car_scale);

        if let Some(anchors) = report.smoke {
            for &position in anchors.iter() {
                smoke.send(SmokeRequest { position });
            }
        }
        feedback.send(report.feedback);
    }
}

fn place_camera(
    tuning: Res<ActiveTuning>,
    vehicles: Query<(&VehicleModel, &Simulation)>,
    mut cameras: Query<&mut Transform, With<ChaseCameraTag>>,
) {
    let config = match tuning.get() {
        Some(config) => config,
        None => return,
    };

    for (model, simulation) in vehicles.iter() {
        if !model.ready {
            continue;
        }

        for mut camera in cameras.iter_mut() {
            *camera = Transform::from_translation(simulation.camera.position)
                .looking_at(simulation.look_at(config), Vec3::Y);
        }
    }
}

fn sync_tuning(
    asset_server: Res<AssetServer>,
    handle: Res<TuningHandle>,
    configs: Res<Assets<TuningConfig>>,
    mut events: EventReader<AssetEvent<TuningConfig>>,
    mut tuning: ResMut<ActiveTuning>,
) {
    for event in events.iter() {
        match event {
            AssetEvent::Created { handle: changed } | AssetEvent::Modified { handle: changed }
                if *changed == handle.0 =>
            {
                if let Some(config) = configs.get(changed) {
                    info!("handling config applied from {}", TUNING_PATH);
                    tuning.set(config.clone());
                }
            }
            AssetEvent::Removed { .. } => warn!("handling config removed, keeping the last one"),
            _ => (),
        }
    }

    if tuning.fall_back_on(asset_server.get_load_state(&handle.0)) {
        warn!("{} failed to load, driving on built-in handling", TUNING_PATH);
    }
}

/// Input, then physics and camera, then effects, then the HUD; Bevy renders afterwards.
pub struct DriftSimPlugin;

impl Plugin for DriftSimPlugin {
    fn build(&self, app: &mut AppBuilder) {
        app.add_asset::<TuningConfig>()
            .init_asset_loader::<TuningConfigLoader>()
            .init_resource::<InputState>()
            .init_resource::<CollisionWorld>()
            .init_resource::<TimeScale>()
            .init_resource::<ActiveTuning>()
            .add_event::<SmokeRequest>()
            .add_event::<DriftFeedback>()
            .add_startup_system(setup.system())
            .add_startup_system(effects::setup_effect_assets.system())
            .add_startup_system(hud::setup_hud.system())
            .add_system(read_input.system().label(FrameStage::Input))
            .add_system_set(
                SystemSet::new()
                    .label(FrameStage::Loading)
                    .after(FrameStage::Input)
                    .with_system(sync_tuning.system())
                    .with_system(world::track_vehicle_model.system())
                    .with_system(world::collect_collidables.system()),
            )
            .add_system(
                simulate
                    .system()
                    .label(FrameStage::Physics)
                    .after(FrameStage::Loading),
            )
            .add_system(
                place_camera
                    .system()
                    .after(FrameStage::Physics)
                    .before(FrameStage::Effects),
            )
            .add_system_set(
                SystemSet::new()
                    .label(FrameStage::Effects)
                    .after(FrameStage::Physics)
                    .with_system(effects::spawn_smoke.system())
                    .with_system(effects::update_smoke.system())
                    .with_system(effects::update_speed_streaks.system()),
            )
            .add_system_set(
                SystemSet::new()
                    .label(FrameStage::Presentation)
                    .after(FrameStage::Effects)
                    .with_system(hud::update_score.system())
                    .with_system(hud::hide_controls_guide.system()),
            );
    }
}
