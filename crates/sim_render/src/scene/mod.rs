//! Scene layer
//!
//! Drawables, the set that owns them, and the cache that lets drawables of
//! the same simulation shape share one GPU mesh.

pub mod drawable;
pub mod mesh_cache;
pub mod render_set;

pub use drawable::{Drawable, DrawableState};
pub use mesh_cache::{CacheStats, MeshCache, ShapeSummary};
pub use render_set::{DrawStats, RenderSet};
