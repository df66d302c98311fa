//! Error types for the rendering layer
//!
//! Each failure family gets its own enum so callers can match on the part of
//! the pipeline that failed. [`RenderError`] wraps all of them for code that
//! only needs to propagate.

use crate::physics::ShapeHandle;
use crate::render::device::ShaderStage;
use crate::render::primitives::Topology;

/// Errors raised by vertex streams and GPU meshes
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// An attribute buffer does not hold exactly `components * vertex_count` floats
    ///
    /// Buffers are never truncated or padded to fit.
    #[error("{attribute} buffer has {actual} floats, expected {expected}")]
    SizeMismatch {
        /// Attribute name
        attribute: &'static str,
        /// Required float count
        expected: usize,
        /// Supplied float count
        actual: usize,
    },

    /// Vertex count does not form whole primitives for the topology
    #[error("{vertex_count} vertices do not form whole {topology:?} primitives")]
    IncompletePrimitive {
        /// Stream topology
        topology: Topology,
        /// Requested vertex count
        vertex_count: u32,
    },

    /// Operation requires a different primitive topology
    #[error("{operation} is not supported for {topology:?} streams")]
    UnsupportedTopology {
        /// Operation that was attempted
        operation: &'static str,
        /// Stream topology
        topology: Topology,
    },

    /// CPU-side data of a static mesh was modified after its first upload
    #[error("mesh data is immutable after the first GPU upload")]
    ImmutableAfterUpload,

    /// Mesh was drawn or modified after its GPU resources were released
    #[error("mesh used after release")]
    UseAfterRelease,

    /// A mesh shared by several drawables was asked to change its vertices
    #[error("mesh is shared by {holders} holders and cannot be mutated")]
    SharedMutation {
        /// Number of strong holders at the time of the request
        holders: usize,
    },

    /// The mesh belongs to the mesh cache, whose later hits must keep
    /// returning the generated vertices
    #[error("mesh is owned by the mesh cache and cannot be mutated")]
    CachedMutation,

    /// Partial update range falls outside the stream
    #[error("vertex range {first}..{end} exceeds vertex count {vertex_count}")]
    VertexRangeOutOfBounds {
        /// First vertex of the range
        first: u32,
        /// One past the last vertex of the range
        end: u64,
        /// Stream vertex count
        vertex_count: u32,
    },
}

/// Errors raised while acquiring or using GPU programs
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// A shader stage failed to compile
    #[error("program '{name}': {stage:?} shader failed to compile: {log}")]
    CompileFailed {
        /// Program name
        name: String,
        /// Failing stage
        stage: ShaderStage,
        /// Compiler diagnostics
        log: String,
    },

    /// Both stages compiled but the program failed to link
    #[error("program '{name}' failed to link: {log}")]
    LinkFailed {
        /// Program name
        name: String,
        /// Linker diagnostics
        log: String,
    },

    /// No shader source could be resolved for the name
    #[error("shader source for '{name}' not found: {reason}")]
    SourceNotFound {
        /// Program name
        name: String,
        /// Resolution failure detail
        reason: String,
    },

    /// Program was used after it was released
    #[error("program '{0}' used after release")]
    Released(String),
}

/// Errors raised by shape summaries and the mesh cache
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheConsistencyError {
    /// A UV strategy was given without its coefficients
    #[error("UV strategy given without coefficients")]
    MissingUvCoefficients,

    /// UV coefficients were given without a strategy
    #[error("UV coefficients given without a strategy")]
    UvCoefficientsWithoutStrategy,

    /// A UV coefficient is NaN or infinite
    #[error("UV coefficient {index} is not finite")]
    NonFiniteCoefficient {
        /// Index into the eight coefficients (u first, then v)
        index: usize,
    },

    /// The simulation does not know the shape
    #[error("unknown shape {0:?}")]
    UnknownShape(ShapeHandle),
}

/// Errors raised by a [`GraphicsDevice`](crate::render::device::GraphicsDevice)
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device ran out of resources
    ///
    /// Fatal. Never retried or masked.
    #[error("GPU allocation failed for {resource}")]
    AllocationFailed {
        /// Kind of resource being allocated
        resource: &'static str,
    },

    /// Handle does not name a live object of the expected kind
    #[error("invalid {kind} handle {id}")]
    InvalidHandle {
        /// Object kind
        kind: &'static str,
        /// Raw handle value
        id: u32,
    },

    /// Operation needs a bound program
    #[error("no program bound")]
    NoProgramBound,

    /// Operation needs a bound vertex array
    #[error("no vertex array bound")]
    NoVertexArrayBound,

    /// Shader compiler rejected the source
    #[error("{stage:?} shader compilation failed: {log}")]
    CompileFailed {
        /// Shader stage
        stage: ShaderStage,
        /// Compiler diagnostics
        log: String,
    },

    /// Program linker rejected the stage pair
    #[error("program link failed: {log}")]
    LinkFailed {
        /// Linker diagnostics
        log: String,
    },
}

/// Umbrella error for the rendering layer
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Vertex stream or mesh error
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Program acquisition or use error
    #[error(transparent)]
    Program(#[from] ProgramError),

    /// Shape summary or cache error
    #[error(transparent)]
    Cache(#[from] CacheConsistencyError),

    /// Device error
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
