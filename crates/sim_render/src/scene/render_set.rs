//! Drawable storage and the per-frame drawable sequence
//!
//! [`RenderSet`] owns every drawable of a renderer in a slotmap. The renderer
//! drives it through the frame in a fixed order:
//!
//! 1. [`sync_with_world`](RenderSet::sync_with_world) pulls transforms of
//!    bound drawables and retires those whose body has been removed
//! 2. [`sweep`](RenderSet::sweep) destroys every retired drawable
//! 3. the uniform broadcast runs over [`live_programs`](RenderSet::live_programs)
//! 4. [`draw`](RenderSet::draw) issues the draw calls
//!
//! Destroying a drawable releases its mesh only when it was the last strong
//! holder. Meshes still shared with other drawables stay allocated.

use std::rc::Rc;

use log::{debug, trace, warn};

use super::drawable::{Drawable, DrawableState};
use crate::foundation::collections::{DrawableKey, DrawableMap};
use crate::foundation::color::Color;
use crate::foundation::math::Transform;
use crate::physics::SimulationWorld;
use crate::render::device::GraphicsDevice;
use crate::render::error::{RenderResult, ShapeError};
use crate::render::mesh::SharedMesh;
use crate::render::program::Program;

/// Counters from one [`RenderSet::draw`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Draw calls issued
    pub draws: usize,
    /// Programs made current
    pub program_binds: usize,
}

/// All drawables of a renderer
#[derive(Debug, Default)]
pub struct RenderSet {
    drawables: DrawableMap<Drawable>,
}

impl RenderSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a drawable
    pub fn insert(&mut self, drawable: Drawable) -> DrawableKey {
        self.drawables.insert(drawable)
    }

    /// Destroy a drawable immediately
    ///
    /// # Returns
    /// `false` if the key was already gone
    pub fn destroy(&mut self, key: DrawableKey, device: &mut dyn GraphicsDevice) -> RenderResult<bool> {
        match self.drawables.remove(key) {
            Some(drawable) => {
                release_mesh(drawable.into_mesh(), device)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stop drawing a drawable and destroy it at the next sweep
    ///
    /// # Returns
    /// `false` if the key is unknown or the drawable was already retired
    pub fn mark_for_removal(&mut self, key: DrawableKey) -> bool {
        match self.drawables.get_mut(key) {
            Some(drawable) if drawable.state == DrawableState::Live => {
                drawable.state = DrawableState::PendingRemoval;
                true
            }
            _ => false,
        }
    }

    /// Lifecycle state; keys no longer in the set report `Destroyed`
    pub fn state(&self, key: DrawableKey) -> DrawableState {
        self.drawables.get(key).map_or(DrawableState::Destroyed, Drawable::state)
    }

    /// Look up a drawable
    pub fn get(&self, key: DrawableKey) -> Option<&Drawable> {
        self.drawables.get(key)
    }

    /// Look up a drawable mutably
    pub fn get_mut(&mut self, key: DrawableKey) -> Option<&mut Drawable> {
        self.drawables.get_mut(key)
    }

    /// Move a drawable; returns `false` for unknown keys
    pub fn set_transform(&mut self, key: DrawableKey, transform: Transform) -> bool {
        self.drawables.get_mut(key).map_or(false, |drawable| {
            drawable.transform = transform;
            true
        })
    }

    /// Recolor a drawable; returns `false` for unknown keys
    pub fn set_color(&mut self, key: DrawableKey, color: Color) -> bool {
        self.drawables.get_mut(key).map_or(false, |drawable| {
            drawable.color = color;
            true
        })
    }

    /// Overwrite positions of a drawable's mesh from `first_vertex` on
    ///
    /// The mesh must be held by this drawable alone and must not come from
    /// the mesh cache. Edits to an uploaded
    /// mesh also require it to have been marked dynamic before the upload.
    ///
    /// # Returns
    /// `false` for unknown keys
    pub fn update_positions(&mut self, key: DrawableKey, first_vertex: u32, data: &[f32]) -> RenderResult<bool> {
        let Some(drawable) = self.drawables.get(key) else {
            return Ok(false);
        };
        if drawable.mesh().borrow().is_cached() {
            return Err(ShapeError::CachedMutation.into());
        }
        let holders = Rc::strong_count(drawable.mesh());
        if holders > 1 {
            return Err(ShapeError::SharedMutation { holders }.into());
        }
        drawable.mesh().borrow_mut().update_positions(first_vertex, data)?;
        Ok(true)
    }

    /// Number of drawables in any non-destroyed state
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// All drawables with their keys
    pub fn iter(&self) -> impl Iterator<Item = (DrawableKey, &Drawable)> {
        self.drawables.iter()
    }

    /// Pull transforms from the simulation and retire removed bodies
    ///
    /// # Returns
    /// Number of drawables newly marked for removal
    pub fn sync_with_world(&mut self, world: &dyn SimulationWorld) -> usize {
        let mut retired = 0;
        for (key, drawable) in &mut self.drawables {
            if drawable.state != DrawableState::Live {
                continue;
            }
            let Some(body) = drawable.binding() else {
                continue;
            };
            match world.current_transform(body).filter(|_| !world.is_removed(body)) {
                Some(transform) => drawable.transform = transform,
                None => {
                    trace!("Body {} removed, retiring drawable {key:?}", body.0);
                    drawable.state = DrawableState::PendingRemoval;
                    retired += 1;
                }
            }
        }
        retired
    }

    /// Destroy every drawable pending removal
    ///
    /// # Returns
    /// Number of drawables destroyed
    pub fn sweep(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<usize> {
        let pending: Vec<DrawableKey> = self
            .drawables
            .iter()
            .filter(|(_, drawable)| drawable.state == DrawableState::PendingRemoval)
            .map(|(key, _)| key)
            .collect();
        for &key in &pending {
            self.destroy(key, device)?;
        }
        if !pending.is_empty() {
            debug!("Swept {} drawables", pending.len());
        }
        Ok(pending.len())
    }

    /// Programs of live drawables, repeated once per drawable
    pub fn live_programs(&self) -> impl Iterator<Item = &Program> {
        self.drawables
            .values()
            .filter(|drawable| drawable.is_live())
            .map(|drawable| &**drawable.program())
    }

    /// Draw every live drawable
    ///
    /// With `grouped` set, drawables are ordered by program so each program
    /// is made current once. Otherwise they are drawn in storage order and
    /// the program is switched whenever it changes.
    pub fn draw(&self, device: &mut dyn GraphicsDevice, grouped: bool) -> RenderResult<DrawStats> {
        let mut live: Vec<&Drawable> = self.drawables.values().filter(|drawable| drawable.is_live()).collect();
        if grouped {
            live.sort_by_key(|drawable| drawable.program().id());
        }

        let mut stats = DrawStats::default();
        let mut current = None;
        for drawable in live {
            let program = drawable.program();
            if current != Some(program.id()) {
                program.use_program(device)?;
                current = Some(program.id());
                stats.program_binds += 1;
            }
            drawable.draw(device)?;
            stats.draws += 1;
        }
        Ok(stats)
    }

    /// Destroy every drawable
    ///
    /// All drawables are removed even if a release fails; the first failure
    /// is returned.
    pub fn clear(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        let mut first_error = None;
        for (_, drawable) in self.drawables.drain() {
            if let Err(e) = release_mesh(drawable.into_mesh(), device) {
                warn!("Failed to release mesh while clearing: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Release a mesh if this was its last strong holder
fn release_mesh(mesh: SharedMesh, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
    match Rc::try_unwrap(mesh) {
        Ok(exclusive) => exclusive.into_inner().release(device),
        Err(shared) => {
            trace!("Mesh still has {} other holders", Rc::strong_count(&shared) - 1);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::physics::{Resolution, ShapeDesc, SimpleWorld};
    use crate::render::device::{DeviceCall, HeadlessDevice};
    use crate::render::error::RenderError;
    use crate::render::mesh::{GpuMesh, MeshStatus};
    use crate::render::primitives::{NormalStrategy, Topology, VertexStream};
    use crate::render::program::{source, BuiltinShaders, ProgramRegistry};
    use crate::render::reaper::ResourceReaper;
    use crate::render::uniforms::GlobalUniformRegistry;
    use crate::scene::{MeshCache, ShapeSummary};

    struct Fixture {
        device: HeadlessDevice,
        registry: ProgramRegistry,
        globals: GlobalUniformRegistry,
        shaders: BuiltinShaders,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                device: HeadlessDevice::new(),
                registry: ProgramRegistry::new(),
                globals: GlobalUniformRegistry::with_builtins(),
                shaders: BuiltinShaders::new(),
            }
        }

        fn program(&mut self, name: &str) -> Rc<Program> {
            self.registry.get_or_create(name, &mut self.device, &self.shaders, &self.globals).unwrap()
        }
    }

    fn triangle_mesh() -> SharedMesh {
        let stream =
            VertexStream::from_positions(Topology::Triangles, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        GpuMesh::new(stream).into_shared()
    }

    #[test]
    fn test_sync_pulls_transforms_and_retires_removed_bodies() {
        let mut fixture = Fixture::new();
        let program = fixture.program(source::UNLIT_MONOCHROME);
        let mut world = SimpleWorld::new();
        let shape = world.add_shape(ShapeDesc::Sphere { radius: 1.0 });
        let moving = world.add_body(shape, Transform::from_position(Vec3::new(3.0, 0.0, 0.0)));
        let doomed = world.add_body(shape, Transform::identity());

        let mut set = RenderSet::new();
        let follows = set.insert(Drawable::new(triangle_mesh(), Rc::clone(&program)).bound_to(moving));
        let retired = set.insert(Drawable::new(triangle_mesh(), Rc::clone(&program)).bound_to(doomed));
        let unbound = set.insert(Drawable::new(triangle_mesh(), program));

        world.remove_body(doomed);
        assert_eq!(set.sync_with_world(&world), 1);
        assert_eq!(set.get(follows).unwrap().transform.position, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(set.state(retired), DrawableState::PendingRemoval);
        assert_eq!(set.state(unbound), DrawableState::Live);
        assert_eq!(set.sync_with_world(&world), 0, "already retired");

        assert_eq!(set.sweep(&mut fixture.device).unwrap(), 1);
        assert_eq!(set.state(retired), DrawableState::Destroyed);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_destroy_releases_only_last_holder() {
        let mut fixture = Fixture::new();
        let program = fixture.program(source::UNLIT_MONOCHROME);
        let shared = triangle_mesh();
        let mut set = RenderSet::new();
        let first = set.insert(Drawable::new(Rc::clone(&shared), Rc::clone(&program)));
        let second = set.insert(Drawable::new(Rc::clone(&shared), program));
        drop(shared);

        set.draw(&mut fixture.device, true).unwrap();
        assert_eq!(fixture.device.live_buffers(), 1, "one upload for the shared mesh");

        assert!(set.destroy(first, &mut fixture.device).unwrap());
        assert_eq!(fixture.device.live_buffers(), 1);
        assert_eq!(set.get(second).unwrap().mesh().borrow().status(), MeshStatus::AllocatedStatic);

        assert!(set.destroy(second, &mut fixture.device).unwrap());
        assert_eq!(fixture.device.live_buffers(), 0);
        assert_eq!(fixture.device.live_vertex_arrays(), 0);
        assert!(!set.destroy(second, &mut fixture.device).unwrap());
    }

    #[test]
    fn test_marked_drawables_are_not_drawn() {
        let mut fixture = Fixture::new();
        let program = fixture.program(source::UNLIT_MONOCHROME);
        let mut set = RenderSet::new();
        let kept = set.insert(Drawable::new(triangle_mesh(), Rc::clone(&program)));
        let hidden = set.insert(Drawable::new(triangle_mesh(), program));

        assert!(set.mark_for_removal(hidden));
        assert!(!set.mark_for_removal(hidden));
        let stats = set.draw(&mut fixture.device, true).unwrap();
        assert_eq!(stats.draws, 1);
        assert_eq!(set.live_programs().count(), 1);
        assert_eq!(set.state(kept), DrawableState::Live);
    }

    #[test]
    fn test_grouped_draw_binds_each_program_once() {
        let mut fixture = Fixture::new();
        let unlit = fixture.program(source::UNLIT_MONOCHROME);
        let uv = fixture.program(source::DEBUG_UV);
        let mut set = RenderSet::new();
        for i in 0..6 {
            let program = if i % 2 == 0 { &unlit } else { &uv };
            set.insert(Drawable::new(triangle_mesh(), Rc::clone(program)));
        }

        let grouped = set.draw(&mut fixture.device, true).unwrap();
        assert_eq!(grouped, DrawStats { draws: 6, program_binds: 2 });
        assert_eq!(fixture.device.count_calls(|call| matches!(call, DeviceCall::UseProgram(Some(_)))), 2);
        set.clear(&mut fixture.device).unwrap();
        assert!(set.is_empty());
        assert_eq!(fixture.device.live_buffers(), 0);
    }

    #[test]
    fn test_per_object_uniforms_written() {
        let mut fixture = Fixture::new();
        let program = fixture.program(source::UNLIT_MONOCHROME);
        let mut set = RenderSet::new();
        let key = set.insert(Drawable::new(triangle_mesh(), Rc::clone(&program)));
        assert!(set.set_color(key, Color::RED));
        assert!(set.set_transform(key, Transform::from_position(Vec3::new(0.0, 2.0, 0.0))));

        set.draw(&mut fixture.device, false).unwrap();
        let color = fixture.device.uniform_value(program.id(), "u_color");
        assert_eq!(color, Some(Color::RED.to_vec4().into()));
        assert!(fixture.device.uniform_value(program.id(), "u_normal_matrix").is_none(), "unlit has no normals");
        set.clear(&mut fixture.device).unwrap();
    }

    #[test]
    fn test_update_positions_refuses_shared_meshes() {
        let mut fixture = Fixture::new();
        let program = fixture.program(source::UNLIT_MONOCHROME);
        let shared = triangle_mesh();
        let mut set = RenderSet::new();
        let a = set.insert(Drawable::new(Rc::clone(&shared), Rc::clone(&program)));
        let _b = set.insert(Drawable::new(Rc::clone(&shared), Rc::clone(&program)));
        drop(shared);
        assert_eq!(
            set.update_positions(a, 0, &[1.0, 1.0, 1.0]),
            Err(RenderError::Shape(ShapeError::SharedMutation { holders: 2 }))
        );

        let own = set.insert(Drawable::new(triangle_mesh(), program));
        assert_eq!(set.update_positions(own, 2, &[5.0, 5.0, 5.0]), Ok(true));
        assert_eq!(&set.get(own).unwrap().mesh().borrow().stream().positions()[6..], &[5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_update_positions_refuses_cached_meshes() {
        let mut fixture = Fixture::new();
        let program = fixture.program(source::LIT_LAMBERT);
        let mut world = SimpleWorld::new();
        let soup = world.add_shape(ShapeDesc::TriangleSoup(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]));
        let reaper = ResourceReaper::new();
        let mut cache = MeshCache::new(reaper.handle());
        let summary = ShapeSummary::untextured(Resolution::Low, NormalStrategy::Facet);

        let mut set = RenderSet::new();
        let mesh = cache.mesh_for_shape(&world, soup, &summary).unwrap();
        let only = set.insert(Drawable::new(mesh, Rc::clone(&program)));
        assert_eq!(
            set.update_positions(only, 0, &[9.0, 9.0, 9.0]),
            Err(RenderError::Shape(ShapeError::CachedMutation)),
            "sole drawable holder but the cache still hands the mesh out"
        );

        let hit = cache.mesh_for_shape(&world, soup, &summary).unwrap();
        assert_eq!(&hit.borrow().stream().positions()[..3], &[0.0, 0.0, 0.0]);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_draw_error_aborts_frame() {
        let mut fixture = Fixture::new();
        let program = fixture.program(source::UNLIT_MONOCHROME);
        let mesh = triangle_mesh();
        mesh.borrow_mut().release(&mut fixture.device).unwrap();
        let mut set = RenderSet::new();
        set.insert(Drawable::new(mesh, program));

        assert_eq!(
            set.draw(&mut fixture.device, true),
            Err(RenderError::Shape(ShapeError::UseAfterRelease))
        );
        assert!(fixture.device.draws().is_empty());
    }
}
