//! Ray probes against the static world geometry.
//!
//! The world hands over its meshes once at load time; after `freeze` the set
//! is read-only and every query is a pure function of the vehicle pose.

use std::iter::once;

use bevy::{
    math::{Mat4, Quat, Vec3},
    render::{
        mesh::{Indices, Mesh, VertexAttributeValues},
        pipeline::PrimitiveTopology,
    },
    transform::components::GlobalTransform,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The first probe direction (in fixed order) within range wins.
    FirstInOrder,
    /// The closest hit across all probe directions wins.
    Nearest,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        CollisionPolicy::FirstInOrder
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Möller-Trumbore, double-sided. Returns the distance along the ray.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        const EPSILON: f32 = 1e-7;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);

        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);

        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);

        if t >= 0.0 {
            Some(t)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    fn around(triangles: &[Triangle]) -> Option<Self> {
        let mut points = triangles
            .iter()
            .flat_map(|t| once(t.v0).chain(once(t.v1)).chain(once(t.v2)));
        let first = points.next()?;

        Some(points.fold(
            Aabb {
                min: first,
                max: first,
            },
            |aabb, point| Aabb {
                min: aabb.min.min(point),
                max: aabb.max.max(point),
            },
        ))
    }

    /// Slab test; true when the ray reaches the box within `max_distance`.
    fn hit_by(&self, ray: &Ray, max_distance: f32) -> bool {
        let origin = ray.origin.into_array();
        let direction = ray.direction.into_array();
        let min = self.min.into_array();
        let max = self.max.into_array();

        let mut near = 0.0_f32;
        let mut far = max_distance;

        for axis in 0..3 {
            if direction[axis].abs() < f32::EPSILON {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return false;
                }
                continue;
            }

            let inverse = 1.0 / direction[axis];
            let mut t0 = (min[axis] - origin[axis]) * inverse;
            let mut t1 = (max[axis] - origin[axis]) * inverse;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }

            near = near.max(t0);
            far = far.min(t1);
            if near > far {
                return false;
            }
        }

        true
    }
}

trait IntoArray: Sized {
    type A;

    fn into_array(self) -> Self::A;
}

impl IntoArray for Vec3 {
    type A = [f32; 3];

    fn into_array(self) -> Self::A {
        [self.x, self.y, self.z]
    }
}

/// A world-space triangle surface with precomputed bounds.
#[derive(Debug, Clone)]
pub struct CollidableMesh {
    triangles: Vec<Triangle>,
    bounds: Option<Aabb>,
}

impl CollidableMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let bounds = Aabb::around(&triangles);
        Self { triangles, bounds }
    }

    /// Builds triangles from a position buffer and optional index buffer,
    /// transformed into world space.
    pub fn from_buffers(positions: &[[f32; 3]], indices: Option<&[u32]>, world: Mat4) -> Self {
        let to_world = |p: [f32; 3]| world.transform_point3(Vec3::from(p));

        let triangles = match indices {
            Some(indices) => {
                let vertex = |index: u32| positions.get(index as usize).copied().map(to_world);
                indices
                    .chunks_exact(3)
                    .filter_map(|corners| {
                        Some(Triangle::new(
                            vertex(corners[0])?,
                            vertex(corners[1])?,
                            vertex(corners[2])?,
                        ))
                    })
                    .collect()
            }
            None => positions
                .chunks_exact(3)
                .map(|corners| {
                    Triangle::new(to_world(corners[0]), to_world(corners[1]), to_world(corners[2]))
                })
                .collect(),
        };

        Self::new(triangles)
    }

    /// `None` when the mesh is not a triangle list or has no positions.
    pub fn from_mesh(mesh: &Mesh, transform: &GlobalTransform) -> Option<Self> {
        match mesh.primitive_topology() {
            PrimitiveTopology::TriangleList => (),
            _ => return None,
        }

        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float3(positions) => positions,
            _ => return None,
        };
        let world = transform.compute_matrix();

        Some(match mesh.indices() {
            Some(Indices::U32(indices)) => Self::from_buffers(positions, Some(indices), world),
            Some(Indices::U16(indices)) => {
                let widened: Vec<u32> = indices.iter().map(|&i| i as u32).collect();
                Self::from_buffers(positions, Some(&widened), world)
            }
            None => Self::from_buffers(positions, None, world),
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<f32> {
        let bounds = self.bounds?;
        if !bounds.hit_by(ray, max_distance) {
            return None;
        }

        self.triangles
            .iter()
            .filter_map(|triangle| triangle.intersect(ray))
            .filter(|&t| t <= max_distance)
            .fold(None, |nearest: Option<f32>, t| match nearest {
                Some(n) if n <= t => Some(n),
                _ => Some(t),
            })
    }
}

/// One probe result, produced and consumed inside a single physics step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionHit {
    pub direction: Vec3,
    pub distance: f32,
    pub hit: bool,
}

/// Probe directions in vehicle space, in the order they are tested.
pub fn probe_directions() -> [Vec3; 8] {
    [
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0).normalize(),
        Vec3::new(-1.0, 0.0, 1.0).normalize(),
        Vec3::new(1.0, 0.0, -1.0).normalize(),
        Vec3::new(-1.0, 0.0, -1.0).normalize(),
    ]
}

#[derive(Debug, Default)]
pub struct CollisionWorld {
    meshes: Vec<CollidableMesh>,
    frozen: bool,
}

impl CollisionWorld {
    pub fn insert(&mut self, mesh: CollidableMesh) {
        if self.frozen {
            bevy::log::warn!("ignoring collidable mesh added after the world was frozen");
            return;
        }
        self.meshes.push(mesh);
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(CollidableMesh::triangle_count).sum()
    }

    /// Distance to the nearest surface along `ray`, if any lies within `max_distance`.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<f32> {
        self.meshes
            .iter()
            .filter_map(|mesh| mesh.raycast(ray, max_distance))
            .fold(None, |nearest: Option<f32>, t| match nearest {
                Some(n) if n <= t => Some(n),
                _ => Some(t),
            })
    }

    /// The nearest surface along one heading-rotated probe direction, if closer than `threshold`.
    fn cast(&self, origin: Vec3, direction: Vec3, threshold: f32) -> Option<CollisionHit> {
        self.raycast(&Ray::new(origin, direction), threshold)
            .filter(|&distance| distance < threshold)
            .map(|distance| CollisionHit {
                direction,
                distance,
                hit: true,
            })
    }

    /// The hit the vehicle should respond to this frame, if any is closer than `threshold`.
    pub fn probe(
        &self,
        origin: Vec3,
        heading: f32,
        threshold: f32,
        policy: CollisionPolicy,
    ) -> Option<CollisionHit> {
        if self.is_empty() {
            return None;
        }

        let rotation = Quat::from_rotation_y(heading);
        let directions = probe_directions();
        let mut hits = directions
            .iter()
            .map(|&local| rotation * local)
            .filter_map(|direction| self.cast(origin, direction, threshold));

        match policy {
            CollisionPolicy::FirstInOrder => hits.next(),
            CollisionPolicy::Nearest => hits.fold(None, |nearest: Option<CollisionHit>, hit| {
                match nearest {
                    Some(n) if n.distance <= hit.distance => Some(n),
                    _ => Some(hit),
                }
            }),
        }
    }
}
