pub mod camera;
pub mod collision;
pub mod config;
pub mod drift;
pub mod effects;
pub mod frame;
pub mod hud;
pub mod input;
pub mod materials;
pub mod plugin;
pub mod vehicle;
pub mod world;

pub use plugin::DriftSimPlugin;
