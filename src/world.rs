//! Asset-side collaborators: the vehicle model and the collidable map.

use bevy::{asset::LoadState, gltf::Gltf, prelude::*};

use crate::{
    collision::{CollidableMesh, CollisionWorld},
    config::ActiveTuning,
    materials::{map_tint, MaterialRoles},
};

/// The car's glTF. Physics stays idle until it has loaded.
pub struct VehicleModel {
    pub gltf: Handle<Gltf>,
    pub ready: bool,
}

impl VehicleModel {
    pub fn new(gltf: Handle<Gltf>) -> Self {
        Self { gltf, ready: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldLoad {
    Loading,
    /// Scene entities exist but their global transforms are not propagated yet.
    Instanced,
    Collected,
}

pub struct WorldModel {
    pub gltf: Handle<Gltf>,
    pub load: WorldLoad,
}

impl WorldModel {
    pub fn new(gltf: Handle<Gltf>) -> Self {
        Self {
            gltf,
            load: WorldLoad::Loading,
        }
    }
}

fn descends_from(mut entity: Entity, root: Entity, parents: &Query<&Parent>) -> bool {
    while let Ok(parent) = parents.get(entity) {
        if parent.0 == root {
            return true;
        }
        entity = parent.0;
    }
    false
}

pub fn track_vehicle_model(
    asset_server: Res<AssetServer>,
    tuning: Res<ActiveTuning>,
    gltfs: Res<Assets<Gltf>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut vehicles: Query<&mut VehicleModel>,
) {
    let config = match tuning.get() {
        Some(config) => config,
        None => return,
    };

    for mut model in vehicles.iter_mut() {
        if model.ready || asset_server.get_load_state(&model.gltf) != LoadState::Loaded {
            continue;
        }

        if let Some(gltf) = gltfs.get(&model.gltf) {
            let assigned =
                MaterialRoles::new(&config.material_roles).assign(&gltf.materials, &gltf.named_materials);

            for (handle, role) in assigned.iter() {
                let treatment = role.treatment();
                if let Some(material) = materials.get_mut(*handle) {
                    material.base_color = treatment.base_color;
                    material.emissive = treatment.emissive;
                }
            }

            info!("vehicle model ready, {} materials classified", assigned.len());
        } else {
            warn!("vehicle model loaded without glTF metadata, keeping default materials");
        }

        model.ready = true;
    }
}

pub fn collect_collidables(
    asset_server: Res<AssetServer>,
    tuning: Res<ActiveTuning>,
    gltfs: Res<Assets<Gltf>>,
    meshes: Res<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut world: ResMut<CollisionWorld>,
    mut roots: Query<(Entity, &mut WorldModel, &mut Transform)>,
    mesh_entities: Query<(Entity, &Handle<Mesh>, &GlobalTransform)>,
    parents: Query<&Parent>,
) {
    for (root, mut model, mut transform) in roots.iter_mut() {
        match model.load {
            WorldLoad::Collected => continue,
            WorldLoad::Loading => {
                if let Some(config) = tuning.get() {
                    transform.scale = Vec3::splat(config.map_scale);
                }
                if asset_server.get_load_state(&model.gltf) != LoadState::Loaded {
                    continue;
                }
                let instanced = mesh_entities
                    .iter()
                    .any(|(entity, _, _)| descends_from(entity, root, &parents));
                if instanced {
                    model.load = WorldLoad::Instanced;
                }
            }
            WorldLoad::Instanced => {
                for (entity, handle, global_transform) in mesh_entities.iter() {
                    if !descends_from(entity, root, &parents) {
                        continue;
                    }

                    let collidable = meshes
                        .get(handle)
                        .and_then(|mesh| CollidableMesh::from_mesh(mesh, global_transform));
                    match collidable {
                        Some(collidable) => world.insert(collidable),
                        None => warn!("skipping map mesh {:?}: not a triangle list", entity),
                    }
                }
                world.freeze();

                if let Some(gltf) = gltfs.get(&model.gltf) {
                    for handle in gltf.materials.iter() {
                        if let Some(material) = materials.get_mut(handle) {
                            material.base_color = map_tint();
                        }
                    }
                }

                info!(
                    "collision world frozen with {} meshes, {} triangles",
                    world.mesh_count(),
                    world.triangle_count()
                );
                model.load = WorldLoad::Collected;
            }
        }
    }
}
