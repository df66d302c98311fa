//! In-memory kinematic world

use std::cell::Cell;
use std::collections::HashMap;

use log::debug;

use super::{BodyHandle, Resolution, ShapeHandle, SimulationWorld};
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::render::primitives::shapes::{self, ShapeGeometry};

/// Shape description kept by [`SimpleWorld`]
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDesc {
    /// Axis-aligned box
    Cuboid {
        /// Half size along each axis
        half_extents: Vec3,
    },
    /// Sphere tessellated according to the requested resolution
    Sphere {
        /// Radius
        radius: f32,
    },
    /// Explicit triangle list, identical at every resolution
    TriangleSoup(Vec<f32>),
    /// Circle outline in the XZ plane
    Ring {
        /// Radius
        radius: f32,
    },
}

impl ShapeDesc {
    fn geometry(&self, resolution: Resolution) -> ShapeGeometry {
        let fine = resolution == Resolution::High;
        match self {
            Self::Cuboid { half_extents } => shapes::cuboid((*half_extents).into()),
            Self::Sphere { radius } => {
                let (rings, segments) = if fine { (24, 48) } else { (8, 12) };
                shapes::uv_sphere(*radius, rings, segments)
            }
            Self::TriangleSoup(positions) => ShapeGeometry::triangles(positions.clone()),
            Self::Ring { radius } => shapes::circle_loop(*radius, if fine { 64 } else { 16 }),
        }
    }
}

/// A simulated body
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// World transform
    pub transform: Transform,
    /// Units per second
    pub linear_velocity: Vec3,
    /// Scaled rotation axis, radians per second
    pub angular_velocity: Vec3,
    /// Collision shape
    pub shape: ShapeHandle,
}

/// Bodies moving at constant velocity, no collisions
#[derive(Debug, Default)]
pub struct SimpleWorld {
    bodies: HashMap<BodyHandle, Body>,
    shapes: HashMap<ShapeHandle, ShapeDesc>,
    next_body: u32,
    next_shape: u32,
    geometry_queries: Cell<usize>,
}

impl SimpleWorld {
    /// Empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shape
    pub fn add_shape(&mut self, desc: ShapeDesc) -> ShapeHandle {
        let handle = ShapeHandle(self.next_shape);
        self.next_shape += 1;
        self.shapes.insert(handle, desc);
        handle
    }

    /// Spawn a body at rest
    pub fn add_body(&mut self, shape: ShapeHandle, transform: Transform) -> BodyHandle {
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            handle,
            Body { transform, linear_velocity: Vec3::zeros(), angular_velocity: Vec3::zeros(), shape },
        );
        handle
    }

    /// Set a body's velocities; returns `false` for unknown bodies
    pub fn set_velocity(&mut self, body: BodyHandle, linear: Vec3, angular: Vec3) -> bool {
        self.bodies.get_mut(&body).map_or(false, |b| {
            b.linear_velocity = linear;
            b.angular_velocity = angular;
            true
        })
    }

    /// Look up a body
    pub fn body(&self, body: BodyHandle) -> Option<&Body> {
        self.bodies.get(&body)
    }

    /// Look up a body mutably
    pub fn body_mut(&mut self, body: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(&body)
    }

    /// Handles of all live bodies
    pub fn body_handles(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.bodies.keys().copied()
    }

    /// Remove a body; returns `false` if it was already gone
    pub fn remove_body(&mut self, body: BodyHandle) -> bool {
        let removed = self.bodies.remove(&body).is_some();
        if removed {
            debug!("Removed body {}", body.0);
        }
        removed
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Advance every body by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            body.transform.position += body.linear_velocity * dt;
            let spin = Quat::from_scaled_axis(body.angular_velocity * dt);
            body.transform.rotation = spin * body.transform.rotation;
        }
    }

    /// How many times [`SimulationWorld::shape_geometry`] was answered
    pub fn geometry_queries(&self) -> usize {
        self.geometry_queries.get()
    }
}

impl SimulationWorld for SimpleWorld {
    fn is_removed(&self, body: BodyHandle) -> bool {
        !self.bodies.contains_key(&body)
    }

    fn current_transform(&self, body: BodyHandle) -> Option<Transform> {
        self.bodies.get(&body).map(|b| b.transform)
    }

    fn shape_geometry(&self, shape: ShapeHandle, resolution: Resolution) -> Option<ShapeGeometry> {
        let desc = self.shapes.get(&shape)?;
        self.geometry_queries.set(self.geometry_queries.get() + 1);
        Some(desc.geometry(resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::HALF_PI;
    use crate::render::primitives::Topology;
    use approx::assert_relative_eq;

    #[test]
    fn test_step_integrates_velocity() {
        let mut world = SimpleWorld::new();
        let shape = world.add_shape(ShapeDesc::Sphere { radius: 1.0 });
        let body = world.add_body(shape, Transform::identity());
        world.set_velocity(body, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, HALF_PI, 0.0));

        world.step(0.5);
        world.step(0.5);

        let transform = world.current_transform(body).unwrap();
        assert_relative_eq!(transform.position, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        // quarter turn about +Y takes +X to -Z
        let turned = transform.rotation * Vec3::x();
        assert_relative_eq!(turned, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_removed_bodies() {
        let mut world = SimpleWorld::new();
        let shape = world.add_shape(ShapeDesc::Cuboid { half_extents: Vec3::new(1.0, 1.0, 1.0) });
        let body = world.add_body(shape, Transform::identity());
        assert!(!world.is_removed(body));
        assert!(world.remove_body(body));
        assert!(!world.remove_body(body));
        assert!(world.is_removed(body));
        assert!(world.current_transform(body).is_none());
    }

    #[test]
    fn test_sphere_resolution_changes_tessellation() {
        let mut world = SimpleWorld::new();
        let sphere = world.add_shape(ShapeDesc::Sphere { radius: 1.0 });
        let low = world.shape_geometry(sphere, Resolution::Low).unwrap();
        let high = world.shape_geometry(sphere, Resolution::High).unwrap();
        assert!(high.vertex_count() > low.vertex_count());
        assert_eq!(world.geometry_queries(), 2);
    }

    #[test]
    fn test_ring_is_line_loop() {
        let mut world = SimpleWorld::new();
        let ring = world.add_shape(ShapeDesc::Ring { radius: 2.0 });
        let geometry = world.shape_geometry(ring, Resolution::Low).unwrap();
        assert_eq!(geometry.topology, Topology::LineLoop);
        assert!(world.shape_geometry(ShapeHandle(99), Resolution::Low).is_none());
    }
}
