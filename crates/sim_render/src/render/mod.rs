//! # Rendering System
//!
//! Turns drawables into draw calls on a [`GraphicsDevice`] while caching the
//! GPU objects that are expensive to create.
//!
//! ## Architecture
//!
//! - **Renderer**: owns the device and every registry, drives the frame
//! - **Device**: GL-shaped command seam, with an in-memory implementation
//! - **Primitives**: CPU vertex streams plus normal and UV generation
//! - **Mesh**: lazily uploaded GPU copy of a stream, released exactly once
//! - **Programs / Uniforms**: one program per name, globals pushed once per frame
//! - **Reaper**: reclaims GPU objects of meshes dropped without a device
//!
//! ## Frame sequence
//!
//! Pull transforms, sweep removed drawables, broadcast globals, draw grouped
//! by program, then reap on the configured interval.

pub mod camera;
pub mod device;
pub mod error;
pub mod mesh;
pub mod primitives;
pub mod program;
pub mod reaper;
pub mod renderer;
pub mod uniforms;

pub use camera::{Camera, ClipPlanes, DirectionalLight};
pub use device::{GraphicsDevice, HeadlessDevice, UniformValue};
pub use error::{CacheConsistencyError, DeviceError, ProgramError, RenderError, RenderResult, ShapeError};
pub use mesh::{GpuMesh, MeshStatus, SharedMesh};
pub use primitives::{NormalStrategy, Topology, UvCoefficients, UvStrategy, VertexStream};
pub use program::{Program, ProgramRegistry};
pub use reaper::ResourceReaper;
pub use renderer::{FrameStats, Renderer};
pub use uniforms::{FrameState, GlobalUniformRegistry};
