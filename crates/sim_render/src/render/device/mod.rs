//! GPU device abstraction
//!
//! # Architecture
//!
//! Everything above this module talks to the GPU through the
//! [`GraphicsDevice`] trait. The trait keeps the shape of the classic GL
//! object API: buffers, vertex arrays, shaders, programs, uniforms and
//! array draws, all addressed by small integer handles. Binding state
//! (current program, current vertex array) lives in the device, and calls
//! that depend on it fail with [`DeviceError::NoProgramBound`] or
//! [`DeviceError::NoVertexArrayBound`] instead of silently doing nothing.
//!
//! Creating the context itself belongs to the windowing layer. A windowed
//! backend plugs in by implementing the trait; [`HeadlessDevice`] is the
//! in-memory implementation used by tests and the demo.
//!
//! ## Design Notes
//!
//! - All handles are plain `Copy` newtypes. Lifetime management is the job of
//!   the owners above (meshes, programs); the device only validates.
//! - Vertex data is always `f32`, non-interleaved, one buffer per attribute.

mod headless;

pub use headless::{DeviceCall, DrawRecord, HeadlessDevice, HeadlessDeviceConfig};

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::render::error::DeviceError;
use crate::render::primitives::Topology;

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

macro_rules! device_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Raw handle value
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

device_handle!(
    /// Handle to a GPU vertex buffer
    BufferHandle
);
device_handle!(
    /// Handle to a vertex array object
    VertexArrayHandle
);
device_handle!(
    /// Handle to a compiled shader stage
    ShaderHandle
);
device_handle!(
    /// Handle to a linked program
    ProgramHandle
);
device_handle!(
    /// Location of a vertex attribute within a program
    AttribLocation
);
device_handle!(
    /// Location of a uniform within a program
    UniformLocation
);

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

/// Expected update frequency of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times
    Static,
    /// Re-uploaded regularly
    Dynamic,
}

/// Value that can be written to a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Single float
    Float(f32),
    /// Single integer
    Int(i32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// 3x3 matrix
    Mat3(Mat3),
    /// 4x4 matrix
    Mat4(Mat4),
}

impl UniformValue {
    /// GLSL type name for this value
    pub const fn glsl_type(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Mat3(_) => "mat3",
            Self::Mat4(_) => "mat4",
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        Self::Vec2(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        Self::Vec4(value)
    }
}

impl From<Mat3> for UniformValue {
    fn from(value: Mat3) -> Self {
        Self::Mat3(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

/// GL-shaped GPU command interface
///
/// Handles passed in must come from the same device. Implementations report
/// unknown handles as [`DeviceError::InvalidHandle`].
pub trait GraphicsDevice {
    /// Create an empty vertex buffer
    fn create_buffer(&mut self) -> DeviceResult<BufferHandle>;

    /// Replace the whole contents of a buffer
    fn buffer_data(&mut self, buffer: BufferHandle, data: &[f32], usage: BufferUsage) -> DeviceResult<()>;

    /// Overwrite part of a buffer, starting at `offset` floats
    fn buffer_sub_data(&mut self, buffer: BufferHandle, offset: usize, data: &[f32]) -> DeviceResult<()>;

    /// Delete a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle) -> DeviceResult<()>;

    /// Create an empty vertex array
    fn create_vertex_array(&mut self) -> DeviceResult<VertexArrayHandle>;

    /// Bind a vertex array, or unbind with `None`
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) -> DeviceResult<()>;

    /// Point an attribute location of the bound vertex array at a buffer
    ///
    /// # Arguments
    /// * `location` - Attribute location in the program that will draw
    /// * `buffer` - Source buffer holding tightly packed floats
    /// * `components` - Floats per vertex (1-4)
    fn vertex_attrib_pointer(&mut self, location: AttribLocation, buffer: BufferHandle, components: u32) -> DeviceResult<()>;

    /// Detach an attribute location from the bound vertex array
    fn disable_vertex_attrib(&mut self, location: AttribLocation) -> DeviceResult<()>;

    /// Delete a vertex array
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> DeviceResult<()>;

    /// Compile one shader stage
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DeviceResult<ShaderHandle>;

    /// Delete a compiled shader stage
    fn delete_shader(&mut self, shader: ShaderHandle) -> DeviceResult<()>;

    /// Link a vertex and fragment stage into a program
    fn link_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle) -> DeviceResult<ProgramHandle>;

    /// Active vertex attributes of a linked program
    fn active_attributes(&self, program: ProgramHandle) -> DeviceResult<Vec<(String, AttribLocation)>>;

    /// Active uniforms of a linked program
    fn active_uniforms(&self, program: ProgramHandle) -> DeviceResult<Vec<(String, UniformLocation)>>;

    /// Make a program current, or unbind with `None`
    fn use_program(&mut self, program: Option<ProgramHandle>) -> DeviceResult<()>;

    /// Write a uniform of the current program
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) -> DeviceResult<()>;

    /// Delete a program
    fn delete_program(&mut self, program: ProgramHandle) -> DeviceResult<()>;

    /// Draw `count` vertices of the bound vertex array with the current program
    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> DeviceResult<()>;
}
