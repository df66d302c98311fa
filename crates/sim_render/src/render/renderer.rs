//! Renderer facade
//!
//! [`Renderer`] owns a device and everything that allocates on it: the
//! program and global-uniform registries, the drawable set, the mesh cache
//! and the reaper. Applications spawn drawables through it and call
//! [`Renderer::render_frame`] once per frame.

use std::rc::Rc;

use log::{debug, error, info, trace};

use crate::config::RendererConfig;
use crate::foundation::collections::DrawableKey;
use crate::foundation::color::Color;
use crate::foundation::math::Transform;
use crate::physics::{BodyHandle, ShapeHandle, SimulationWorld};
use crate::render::device::GraphicsDevice;
use crate::render::error::RenderResult;
use crate::render::mesh::GpuMesh;
use crate::render::primitives::VertexStream;
use crate::render::program::{BuiltinShaders, FileShaderSource, Program, ProgramRegistry, ShaderSource};
use crate::render::reaper::ResourceReaper;
use crate::render::uniforms::{self, BroadcastStats, FrameState, GlobalUniformRegistry, UniformValue};
use crate::scene::{DrawStats, Drawable, MeshCache, RenderSet, ShapeSummary};

/// What one [`Renderer::render_frame`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Index of the rendered frame, starting at 1
    pub frame: u64,
    /// Drawables retired because their body was removed
    pub retired: usize,
    /// Drawables destroyed by the sweep
    pub destroyed: usize,
    /// Global uniform work
    pub broadcast: BroadcastStats,
    /// Draw work
    pub draw: DrawStats,
    /// Dropped meshes reclaimed by the reaper this frame
    pub reclaimed: usize,
}

/// Owner of a device and all GPU resources created on it
pub struct Renderer<D: GraphicsDevice> {
    device: D,
    config: RendererConfig,
    shaders: Box<dyn ShaderSource>,
    programs: ProgramRegistry,
    globals: GlobalUniformRegistry,
    drawables: RenderSet,
    meshes: MeshCache,
    reaper: ResourceReaper,
    frame: u64,
}

impl<D: GraphicsDevice> Renderer<D> {
    /// Create a renderer over `device`
    ///
    /// Shaders come from `config.shader_directory` when set, otherwise from
    /// the built-in library.
    pub fn new(config: RendererConfig, device: D) -> Self {
        let shaders: Box<dyn ShaderSource> = match &config.shader_directory {
            Some(dir) => Box::new(FileShaderSource::new(dir.clone())),
            None => Box::new(BuiltinShaders::new()),
        };
        Self::with_shader_source(config, device, shaders)
    }

    /// Create a renderer with an explicit shader source
    pub fn with_shader_source(config: RendererConfig, device: D, shaders: Box<dyn ShaderSource>) -> Self {
        info!("Creating renderer for '{}'", config.application_name);
        let reaper = ResourceReaper::new();
        Self {
            device,
            shaders,
            programs: ProgramRegistry::new(),
            globals: GlobalUniformRegistry::with_builtins(),
            drawables: RenderSet::new(),
            meshes: MeshCache::new(reaper.handle()),
            reaper,
            frame: 0,
            config,
        }
    }

    /// Device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Device, mutably
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Number of frames rendered so far
    pub const fn frame_index(&self) -> u64 {
        self.frame
    }

    /// All drawables
    pub fn drawables(&self) -> &RenderSet {
        &self.drawables
    }

    /// All drawables, mutably
    pub fn drawables_mut(&mut self) -> &mut RenderSet {
        &mut self.drawables
    }

    /// Shared mesh cache
    pub fn mesh_cache(&self) -> &MeshCache {
        &self.meshes
    }

    /// Global uniforms
    pub fn globals(&self) -> &GlobalUniformRegistry {
        &self.globals
    }

    /// Register a custom global uniform
    ///
    /// Programs record their dependencies when linked, so register globals
    /// before the first drawable that uses the program is spawned.
    ///
    /// # Returns
    /// `true` if a global of the same name was replaced
    pub fn register_global(&mut self, name: &str, rule: impl Fn(&FrameState) -> UniformValue + 'static) -> bool {
        self.globals.register(name, rule)
    }

    /// Program by name, compiled on first use
    pub fn program(&mut self, name: &str) -> RenderResult<Rc<Program>> {
        self.programs.get_or_create(name, &mut self.device, self.shaders.as_ref(), &self.globals)
    }

    /// Spawn a drawable that follows a simulation body
    ///
    /// The mesh comes from the cache, so bodies with the same shape and
    /// summary share one GPU mesh.
    ///
    /// # Arguments
    /// * `world` - Simulation that owns the body and shape
    /// * `body` - Body to follow
    /// * `shape` - Shape to render
    /// * `summary` - Mesh generation inputs
    /// * `program` - Program name
    /// * `color` - Object color
    pub fn spawn_for_body(
        &mut self,
        world: &dyn SimulationWorld,
        body: BodyHandle,
        shape: ShapeHandle,
        summary: &ShapeSummary,
        program: &str,
        color: Color,
    ) -> RenderResult<DrawableKey> {
        let program = self.program(program)?;
        let mesh = self.meshes.mesh_for_shape(world, shape, summary)?;
        let transform = world.current_transform(body).unwrap_or_else(Transform::identity);
        let drawable = Drawable::new(mesh, program)
            .with_transform(transform)
            .with_color(color)
            .bound_to(body);
        let key = self.drawables.insert(drawable);
        trace!("Spawned {key:?} for body {}", body.0);
        Ok(key)
    }

    /// Spawn an unbound drawable with its own mesh
    ///
    /// A `dynamic` mesh accepts position edits through
    /// [`RenderSet::update_positions`] after it has been drawn.
    pub fn spawn_owned(
        &mut self,
        stream: VertexStream,
        program: &str,
        transform: Transform,
        color: Color,
        dynamic: bool,
    ) -> RenderResult<DrawableKey> {
        let program = self.program(program)?;
        let mut mesh = GpuMesh::with_reaper(stream, self.reaper.handle());
        if dynamic {
            mesh.mark_dynamic()?;
        }
        let drawable = Drawable::new(mesh.into_shared(), program)
            .with_transform(transform)
            .with_color(color);
        Ok(self.drawables.insert(drawable))
    }

    /// Destroy a drawable now rather than at the next sweep
    pub fn destroy(&mut self, key: DrawableKey) -> RenderResult<bool> {
        self.drawables.destroy(key, &mut self.device)
    }

    /// Render one frame
    ///
    /// Pulls transforms and removals from `world`, destroys retired
    /// drawables, broadcasts global uniforms, draws, and on the configured
    /// interval reclaims dropped meshes. The first error aborts the frame.
    pub fn render_frame(&mut self, world: &dyn SimulationWorld, state: &FrameState) -> RenderResult<FrameStats> {
        self.frame += 1;
        let mut stats = FrameStats { frame: self.frame, ..FrameStats::default() };

        stats.retired = self.drawables.sync_with_world(world);
        stats.destroyed = self.drawables.sweep(&mut self.device)?;
        stats.broadcast = uniforms::broadcast(
            self.drawables.live_programs(),
            &mut self.globals,
            self.frame,
            state,
            &mut self.device,
        )?;
        stats.draw = self.drawables.draw(&mut self.device, self.config.group_draws_by_program)?;

        let interval = u64::from(self.config.reap_interval_frames);
        if interval > 0 && self.frame % interval == 0 {
            stats.reclaimed = self.reaper.reap(&mut self.device)?;
            let pruned = self.meshes.prune();
            if pruned > 0 {
                debug!("Pruned {pruned} dead mesh cache entries");
            }
        }

        trace!("Frame {}: {:?}", self.frame, stats);
        Ok(stats)
    }

    /// Release every GPU resource the renderer created
    ///
    /// Drawables are destroyed, the reaper is drained and programs are
    /// deleted. Every step runs even if an earlier one fails; the first
    /// failure is returned. Calling it again does nothing.
    pub fn shutdown(&mut self) -> RenderResult<()> {
        if self.drawables.is_empty() && self.programs.is_empty() {
            // still drain meshes dropped outside the set
            self.reaper.reap(&mut self.device)?;
            return Ok(());
        }
        info!(
            "Shutting down renderer '{}' after {} frames ({} drawables, {} programs)",
            self.config.application_name,
            self.frame,
            self.drawables.len(),
            self.programs.len()
        );

        let cleared = self.drawables.clear(&mut self.device);
        self.meshes.clear();
        let reaped: RenderResult<usize> = self.reaper.reap(&mut self.device).map_err(Into::into);
        let released = self.programs.release_all(&mut self.device);
        cleared.and(reaped.map(drop)).and(released)
    }
}

impl<D: GraphicsDevice> Drop for Renderer<D> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Renderer shutdown failed: {e}");
        }
    }
}
