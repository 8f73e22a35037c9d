use bevy::{pbr::AmbientLight, prelude::*};

use drift_sim::DriftSimPlugin;

fn main() {
    App::build()
        .insert_resource(ClearColor(Color::rgb(0.867, 0.867, 0.867)))
        .insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 0.7,
        })
        .insert_resource(WindowDescriptor {
            title: "Drift".to_string(),
            width: 1600.0,
            height: 900.0,
            resizable: true,
            ..Default::default()
        })
        .add_plugins(DefaultPlugins)
        .add_plugin(DriftSimPlugin)
        .run();
}
