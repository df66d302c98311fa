//! CPU-side geometry
//!
//! Vertex streams and the generators that derive attributes from positions.
//! Nothing in here touches the GPU; uploading is [`crate::render::mesh`]'s job.

pub mod normals;
pub mod shapes;
pub mod uv;
pub mod vertex_stream;

pub use normals::NormalStrategy;
pub use uv::{UvCoefficients, UvStrategy};
pub use vertex_stream::{AttributeSet, Topology, VertexAttribute, VertexStream};
