//! GPU-resident meshes
//!
//! A [`GpuMesh`] wraps a [`VertexStream`] and the GPU objects holding a copy
//! of it: one buffer per present attribute plus one vertex array. The GPU
//! side is created lazily by the first [`GpuMesh::draw`] and freed exactly
//! once, either by [`GpuMesh::release`] or, if the mesh is dropped while
//! still allocated, through the [`ResourceReaper`](crate::render::reaper::ResourceReaper).
//!
//! # Architecture
//!
//! The allocation state is an explicit tagged enum:
//!
//! ```text
//! Unallocated { dynamic } --draw--> Allocated { Static | Dynamic { dirty } } --release--> Released
//!          \_____________________________release_______________________________________/
//! ```
//!
//! Static meshes freeze their CPU data at the first upload. Dynamic meshes
//! accept position edits after upload; edited floats are tracked as one
//! dirty range and re-sent with a single partial upload before the next draw.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::render::device::{
    AttribLocation, BufferHandle, BufferUsage, GraphicsDevice, ProgramHandle, VertexArrayHandle,
};
use crate::render::error::{RenderResult, ShapeError};
use crate::render::primitives::{VertexAttribute, VertexStream};
use crate::render::program::Program;
use crate::render::reaper::{MeshHandles, ReaperHandle};

/// Mesh shared between drawables and the mesh cache
pub type SharedMesh = Rc<RefCell<GpuMesh>>;

/// Public view of a mesh's allocation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshStatus {
    /// Not yet uploaded
    Unallocated {
        /// Whether the mesh will accept edits after upload
        dynamic: bool,
    },
    /// Uploaded, CPU data frozen
    AllocatedStatic,
    /// Uploaded, positions editable
    AllocatedDynamic,
    /// GPU objects freed
    Released,
}

#[derive(Debug)]
enum Usage {
    Static,
    Dynamic { dirty: Option<Range<usize>> },
}

#[derive(Debug)]
struct GpuResources {
    vertex_array: VertexArrayHandle,
    buffers: Vec<(VertexAttribute, BufferHandle)>,
    usage: Usage,
    attached_program: ProgramHandle,
    attached_locations: Vec<AttribLocation>,
}

impl GpuResources {
    fn handles(&self) -> MeshHandles {
        MeshHandles {
            vertex_array: self.vertex_array,
            buffers: self.buffers.iter().map(|&(_, buffer)| buffer).collect(),
        }
    }

    fn buffer(&self, attribute: VertexAttribute) -> Option<BufferHandle> {
        self.buffers
            .iter()
            .find(|(candidate, _)| *candidate == attribute)
            .map(|&(_, buffer)| buffer)
    }

    /// Point the bound vertex array at `program`'s attribute locations
    fn attach(&mut self, program: &Program, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        for location in self.attached_locations.drain(..) {
            device.disable_vertex_attrib(location)?;
        }
        for &(attribute, buffer) in &self.buffers {
            // programs may ignore attributes the stream provides
            if let Some(location) = program.find_attrib_location(attribute.shader_name()) {
                device.vertex_attrib_pointer(location, buffer, attribute.components())?;
                self.attached_locations.push(location);
            }
        }
        self.attached_program = program.id();
        Ok(())
    }
}

#[derive(Debug)]
enum MeshState {
    Unallocated { dynamic: bool },
    Allocated(GpuResources),
    Released,
}

/// Vertex stream plus its lazily created GPU objects
#[derive(Debug)]
pub struct GpuMesh {
    stream: VertexStream,
    state: MeshState,
    reaper: Option<ReaperHandle>,
    cached: bool,
}

impl GpuMesh {
    /// Wrap a stream; nothing is uploaded until the first draw
    ///
    /// A mesh created this way has no reaper, so dropping it while allocated
    /// leaks its GPU objects. Prefer [`GpuMesh::with_reaper`].
    pub fn new(stream: VertexStream) -> Self {
        Self { stream, state: MeshState::Unallocated { dynamic: false }, reaper: None, cached: false }
    }

    /// Wrap a stream and route drop-time cleanup through a reaper
    pub fn with_reaper(stream: VertexStream, reaper: ReaperHandle) -> Self {
        Self { stream, state: MeshState::Unallocated { dynamic: false }, reaper: Some(reaper), cached: false }
    }

    /// Freeze the CPU data for sharing through the mesh cache
    ///
    /// Every later vertex edit fails with [`ShapeError::CachedMutation`].
    #[must_use]
    pub fn cached(mut self) -> Self {
        self.cached = true;
        self
    }

    /// Whether the mesh is owned by the mesh cache
    pub const fn is_cached(&self) -> bool {
        self.cached
    }

    /// Wrap into the shared form drawables hold
    pub fn into_shared(self) -> SharedMesh {
        Rc::new(RefCell::new(self))
    }

    /// CPU-side vertex data
    pub const fn stream(&self) -> &VertexStream {
        &self.stream
    }

    /// Mutable vertex data; only available before the first upload
    pub fn stream_mut(&mut self) -> Result<&mut VertexStream, ShapeError> {
        if self.cached {
            return Err(ShapeError::CachedMutation);
        }
        match self.state {
            MeshState::Unallocated { .. } => Ok(&mut self.stream),
            MeshState::Allocated(_) => Err(ShapeError::ImmutableAfterUpload),
            MeshState::Released => Err(ShapeError::UseAfterRelease),
        }
    }

    /// Current allocation state
    pub const fn status(&self) -> MeshStatus {
        match &self.state {
            MeshState::Unallocated { dynamic } => MeshStatus::Unallocated { dynamic: *dynamic },
            MeshState::Allocated(GpuResources { usage: Usage::Static, .. }) => MeshStatus::AllocatedStatic,
            MeshState::Allocated(GpuResources { usage: Usage::Dynamic { .. }, .. }) => MeshStatus::AllocatedDynamic,
            MeshState::Released => MeshStatus::Released,
        }
    }

    /// Whether GPU objects currently exist
    pub const fn is_allocated(&self) -> bool {
        matches!(self.state, MeshState::Allocated(_))
    }

    /// Whether the mesh has been released
    pub const fn is_released(&self) -> bool {
        matches!(self.state, MeshState::Released)
    }

    /// Vertex array handle once allocated
    pub fn vertex_array(&self) -> Option<VertexArrayHandle> {
        match &self.state {
            MeshState::Allocated(resources) => Some(resources.vertex_array),
            _ => None,
        }
    }

    /// Buffer holding one attribute once allocated
    pub fn buffer(&self, attribute: VertexAttribute) -> Option<BufferHandle> {
        match &self.state {
            MeshState::Allocated(resources) => resources.buffer(attribute),
            _ => None,
        }
    }

    /// Allow position edits after upload
    ///
    /// Must be called before the first draw.
    pub fn mark_dynamic(&mut self) -> Result<(), ShapeError> {
        match &mut self.state {
            MeshState::Unallocated { dynamic } => {
                *dynamic = true;
                Ok(())
            }
            MeshState::Allocated(_) => Err(ShapeError::ImmutableAfterUpload),
            MeshState::Released => Err(ShapeError::UseAfterRelease),
        }
    }

    /// Replace all positions
    pub fn set_positions(&mut self, data: &[f32]) -> Result<(), ShapeError> {
        let len = self.stream.positions().len();
        self.edit_positions(|stream| stream.set_positions(data).map(|()| 0..len))
    }

    /// Overwrite positions from `first_vertex` on
    pub fn update_positions(&mut self, first_vertex: u32, data: &[f32]) -> Result<(), ShapeError> {
        self.edit_positions(|stream| stream.update_positions(first_vertex, data))
    }

    fn edit_positions(&mut self, edit: impl FnOnce(&mut VertexStream) -> Result<Range<usize>, ShapeError>) -> Result<(), ShapeError> {
        if self.cached {
            return Err(ShapeError::CachedMutation);
        }
        match &mut self.state {
            MeshState::Unallocated { .. } => edit(&mut self.stream).map(drop),
            MeshState::Allocated(GpuResources { usage: Usage::Dynamic { dirty }, .. }) => {
                let changed = edit(&mut self.stream)?;
                *dirty = Some(match dirty.take() {
                    Some(existing) => existing.start.min(changed.start)..existing.end.max(changed.end),
                    None => changed,
                });
                Ok(())
            }
            MeshState::Allocated(_) => Err(ShapeError::ImmutableAfterUpload),
            MeshState::Released => Err(ShapeError::UseAfterRelease),
        }
    }

    /// Draw with `program`, which must be current
    ///
    /// The first call uploads every present attribute and builds the vertex
    /// array against `program`'s locations. Later calls only re-bind, apart
    /// from re-sending dirty positions of dynamic meshes or re-attaching
    /// attribute pointers when a different program is used.
    pub fn draw(&mut self, program: &Program, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        match &mut self.state {
            MeshState::Released => return Err(ShapeError::UseAfterRelease.into()),
            MeshState::Unallocated { dynamic } => {
                let resources = Self::allocate(&self.stream, *dynamic, program, device)?;
                self.state = MeshState::Allocated(resources);
            }
            MeshState::Allocated(resources) => {
                device.bind_vertex_array(Some(resources.vertex_array))?;
                if resources.attached_program != program.id() {
                    trace!("Re-attaching mesh to program '{}'", program.name());
                    resources.attach(program, device)?;
                }
                if let Usage::Dynamic { dirty } = &mut resources.usage {
                    if let (Some(range), Some(buffer)) = (dirty.take(), resources.buffers.first().map(|&(_, b)| b)) {
                        device.buffer_sub_data(buffer, range.start, &self.stream.positions()[range.clone()])?;
                        trace!("Re-synced {} position floats", range.len());
                    }
                }
            }
        }
        device.draw_arrays(self.stream.topology(), 0, self.stream.vertex_count())?;
        Ok(())
    }

    fn allocate(stream: &VertexStream, dynamic: bool, program: &Program, device: &mut dyn GraphicsDevice) -> RenderResult<GpuResources> {
        let vertex_array = device.create_vertex_array()?;
        let mut resources = GpuResources {
            vertex_array,
            buffers: Vec::with_capacity(VertexAttribute::ALL.len()),
            usage: if dynamic { Usage::Dynamic { dirty: None } } else { Usage::Static },
            attached_program: program.id(),
            attached_locations: Vec::new(),
        };

        let uploaded = Self::upload(stream, dynamic, &mut resources, device).and_then(|()| {
            device.bind_vertex_array(Some(vertex_array))?;
            resources.attach(program, device)
        });
        if let Err(e) = uploaded {
            // free whatever was created before the failure
            if let Err(cleanup) = resources.handles().delete(device) {
                warn!("Cleanup after failed upload also failed: {cleanup}");
            }
            return Err(e);
        }

        debug!(
            "Allocated mesh: {} vertices, {} buffers, {}",
            stream.vertex_count(),
            resources.buffers.len(),
            if dynamic { "dynamic" } else { "static" }
        );
        Ok(resources)
    }

    fn upload(stream: &VertexStream, dynamic: bool, resources: &mut GpuResources, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        for attribute in VertexAttribute::ALL {
            let Some(data) = stream.attribute_data(attribute) else {
                continue;
            };
            let buffer = device.create_buffer()?;
            resources.buffers.push((attribute, buffer));
            let usage = if dynamic && attribute == VertexAttribute::Position {
                BufferUsage::Dynamic
            } else {
                BufferUsage::Static
            };
            device.buffer_data(buffer, data, usage)?;
        }
        Ok(())
    }

    /// Free GPU objects; later calls do nothing
    ///
    /// Every handle is passed to the device even if one is refused, so a
    /// failed release leaves nothing behind to retry.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        match std::mem::replace(&mut self.state, MeshState::Released) {
            MeshState::Allocated(resources) => {
                debug!("Releasing mesh with {} vertices", self.stream.vertex_count());
                resources.handles().delete(device)?;
            }
            MeshState::Unallocated { .. } | MeshState::Released => {}
        }
        Ok(())
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        if let MeshState::Allocated(resources) = &self.state {
            match &self.reaper {
                Some(reaper) => {
                    debug!("Dropped allocated mesh, queueing for reaper");
                    reaper.submit(resources.handles());
                }
                None => warn!("Dropped allocated mesh without reaper, GPU objects leaked"),
            }
        }
    }
}
