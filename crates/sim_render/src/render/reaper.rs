//! Deferred reclamation of GPU mesh handles
//!
//! A [`GpuMesh`](crate::render::mesh::GpuMesh) that is dropped while it still
//! owns GPU objects cannot delete them itself: `Drop` has no device. Instead
//! it posts its handles to the [`ResourceReaper`], which deletes them the
//! next time the renderer calls [`ResourceReaper::reap`] on the owning
//! thread. Handles only reach the queue once the last strong reference to
//! the mesh is gone, so nothing still drawing can lose its buffers.

use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, warn};

use crate::render::device::{BufferHandle, DeviceResult, GraphicsDevice, VertexArrayHandle};

/// GPU objects owned by one mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshHandles {
    /// Vertex array object
    pub vertex_array: VertexArrayHandle,
    /// One buffer per uploaded attribute
    pub buffers: Vec<BufferHandle>,
}

impl MeshHandles {
    /// Delete every object on the device
    ///
    /// Each handle is attempted once even if an earlier one is refused; the
    /// first refusal is returned.
    pub fn delete(&self, device: &mut dyn GraphicsDevice) -> DeviceResult<()> {
        let mut first_error = device.delete_vertex_array(self.vertex_array).err();
        for &buffer in &self.buffers {
            if let Err(e) = device.delete_buffer(buffer) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Sending side of the reaper queue, held by meshes
#[derive(Debug, Clone)]
pub struct ReaperHandle {
    sender: Sender<MeshHandles>,
}

impl ReaperHandle {
    /// Queue handles for deletion
    ///
    /// If the reaper is already gone the device went with it, so the handles
    /// are dropped with a warning.
    pub fn submit(&self, handles: MeshHandles) {
        if let Err(mpsc::SendError(handles)) = self.sender.send(handles) {
            warn!("Reaper gone, abandoning vertex array {:?}", handles.vertex_array);
        }
    }
}

/// Owner of the reclamation queue
#[derive(Debug)]
pub struct ResourceReaper {
    sender: Sender<MeshHandles>,
    receiver: Receiver<MeshHandles>,
    reclaimed: usize,
}

impl Default for ResourceReaper {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceReaper {
    /// Create an empty reaper
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver, reclaimed: 0 }
    }

    /// Handle meshes use to queue their GPU objects
    pub fn handle(&self) -> ReaperHandle {
        ReaperHandle { sender: self.sender.clone() }
    }

    /// Delete everything queued so far
    ///
    /// The queue is always drained. Handles the device refuses are not
    /// retried.
    ///
    /// # Returns
    /// Number of meshes reclaimed in this pass, or the first device error
    pub fn reap(&mut self, device: &mut dyn GraphicsDevice) -> DeviceResult<usize> {
        let mut count = 0;
        let mut first_error = None;
        while let Ok(handles) = self.receiver.try_recv() {
            match handles.delete(device) {
                Ok(()) => count += 1,
                Err(e) => {
                    warn!("Failed to reclaim vertex array {:?}: {e}", handles.vertex_array);
                    first_error.get_or_insert(e);
                }
            }
        }
        if count > 0 {
            self.reclaimed += count;
            debug!("Reaped {count} dropped meshes ({} total)", self.reclaimed);
        }
        first_error.map_or(Ok(count), Err)
    }

    /// Meshes reclaimed over the reaper's lifetime
    pub const fn reclaimed_total(&self) -> usize {
        self.reclaimed
    }
}
