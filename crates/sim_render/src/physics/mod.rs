//! Simulation interface
//!
//! The renderer never runs physics. It asks the simulation three questions
//! through [`SimulationWorld`]: has a body been removed, where is it now, and
//! what does a shape look like at a given tessellation. [`SimpleWorld`] is a
//! small kinematic implementation for tests and demos.

pub mod simple_world;

use serde::{Deserialize, Serialize};

pub use simple_world::{Body, ShapeDesc, SimpleWorld};

use crate::foundation::math::Transform;
use crate::render::primitives::shapes::ShapeGeometry;

/// Identifies a simulated body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Identifies a collision shape, possibly shared by many bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeHandle(pub u32);

/// Tessellation level requested for shape geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// Coarse geometry
    #[default]
    Low,
    /// Fine geometry
    High,
}

/// Queries the renderer makes of the simulation
pub trait SimulationWorld {
    /// Whether the body is gone; unknown bodies count as removed
    fn is_removed(&self, body: BodyHandle) -> bool;

    /// Current world transform of a live body
    fn current_transform(&self, body: BodyHandle) -> Option<Transform>;

    /// Triangle or line geometry for a shape, `None` for unknown shapes
    fn shape_geometry(&self, shape: ShapeHandle, resolution: Resolution) -> Option<ShapeGeometry>;
}
