//! # sim_render
//!
//! A lightweight real-time rendering layer for simulated objects.
//!
//! Drawables pair a shared GPU mesh with a named shader program. Meshes for
//! simulation shapes are generated once per distinct [`ShapeSummary`] and
//! shared through a weak cache; GPU objects are released exactly once, either
//! explicitly or through the resource reaper.
//!
//! ## Quick Start
//!
//! ```rust
//! use sim_render::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let mut world = SimpleWorld::new();
//!     let shape = world.add_shape(ShapeDesc::Sphere { radius: 1.0 });
//!     let body = world.add_body(shape, Transform::identity());
//!
//!     let mut renderer = Renderer::new(RendererConfig::default(), HeadlessDevice::new());
//!     let summary = ShapeSummary::untextured(Resolution::Low, NormalStrategy::Sphere);
//!     renderer.spawn_for_body(&world, body, shape, &summary, "lit/lambert", Color::RED)?;
//!
//!     let stats = renderer.render_frame(&world, &FrameState::default())?;
//!     assert_eq!(stats.draw.draws, 1);
//!     renderer.shutdown()
//! }
//! ```
//!
//! [`ShapeSummary`]: scene::ShapeSummary

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod physics;
pub mod render;
pub mod scene;

/// Common imports for applications
pub mod prelude {
    pub use crate::{
        config::{Config, RendererConfig},
        foundation::{
            collections::DrawableKey,
            color::Color,
            math::{Quat, Transform, Vec3},
        },
        physics::{BodyHandle, Resolution, ShapeDesc, ShapeHandle, SimpleWorld, SimulationWorld},
        render::{
            Camera, ClipPlanes, DirectionalLight, FrameState, FrameStats, HeadlessDevice, NormalStrategy,
            RenderError, RenderResult, Renderer, Topology, UvCoefficients, UvStrategy, VertexStream,
        },
        scene::{DrawableState, ShapeSummary},
    };
}
