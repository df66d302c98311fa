//! In-memory graphics device
//!
//! Keeps the GPU side of every object in host memory and records each call
//! in order. Shader "compilation" scans GLSL declarations, so program
//! interfaces (attributes, uniforms, stage varyings) behave like a real
//! driver's: declarations that the source never uses are inactive, and a
//! fragment input without a matching vertex output fails to link.

use std::collections::HashMap;

use log::{debug, trace};

use super::{
    AttribLocation, BufferHandle, BufferUsage, DeviceResult, GraphicsDevice, ProgramHandle,
    ShaderHandle, ShaderStage, UniformLocation, UniformValue, VertexArrayHandle,
};
use crate::render::error::DeviceError;
use crate::render::primitives::Topology;

/// Resource limits for a [`HeadlessDevice`]
///
/// `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessDeviceConfig {
    /// Maximum number of live buffers
    pub max_buffers: Option<usize>,
    /// Maximum number of live vertex arrays
    pub max_vertex_arrays: Option<usize>,
    /// Call log capacity; once full, the older half is discarded
    pub max_logged_calls: Option<usize>,
}

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// Buffer created
    CreateBuffer(BufferHandle),
    /// Full buffer upload
    BufferData {
        /// Target buffer
        buffer: BufferHandle,
        /// Floats uploaded
        len: usize,
        /// Usage hint
        usage: BufferUsage,
    },
    /// Partial buffer upload
    BufferSubData {
        /// Target buffer
        buffer: BufferHandle,
        /// Offset in floats
        offset: usize,
        /// Floats uploaded
        len: usize,
    },
    /// Buffer deleted
    DeleteBuffer(BufferHandle),
    /// Vertex array created
    CreateVertexArray(VertexArrayHandle),
    /// Vertex array bound or unbound
    BindVertexArray(Option<VertexArrayHandle>),
    /// Attribute pointer set on the bound vertex array
    VertexAttribPointer {
        /// Attribute location
        location: AttribLocation,
        /// Source buffer
        buffer: BufferHandle,
        /// Components per vertex
        components: u32,
    },
    /// Attribute detached from the bound vertex array
    DisableVertexAttrib(AttribLocation),
    /// Vertex array deleted
    DeleteVertexArray(VertexArrayHandle),
    /// Shader stage compiled
    CompileShader {
        /// Stage
        stage: ShaderStage,
        /// Resulting handle
        shader: ShaderHandle,
    },
    /// Shader stage deleted
    DeleteShader(ShaderHandle),
    /// Program linked
    LinkProgram(ProgramHandle),
    /// Program made current or unbound
    UseProgram(Option<ProgramHandle>),
    /// Uniform written on the current program
    SetUniform {
        /// Current program
        program: ProgramHandle,
        /// Uniform name
        name: String,
        /// Written value
        value: UniformValue,
    },
    /// Program deleted
    DeleteProgram(ProgramHandle),
    /// Array draw issued
    DrawArrays(DrawRecord),
}

/// Details of one recorded draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    /// Program in use
    pub program: ProgramHandle,
    /// Vertex array bound
    pub vertex_array: VertexArrayHandle,
    /// Primitive topology
    pub topology: Topology,
    /// First vertex
    pub first: u32,
    /// Vertex count
    pub count: u32,
}

#[derive(Debug)]
struct BufferRecord {
    data: Vec<f32>,
    usage: BufferUsage,
}

#[derive(Debug, Default)]
struct VertexArrayRecord {
    attributes: HashMap<AttribLocation, (BufferHandle, u32)>,
}

/// Declarations found in one shader stage
#[derive(Debug, Default, Clone)]
struct StageInterface {
    inputs: Vec<String>,
    outputs: Vec<String>,
    uniforms: Vec<String>,
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    interface: StageInterface,
}

#[derive(Debug)]
struct ProgramRecord {
    attributes: Vec<(String, AttribLocation)>,
    uniforms: Vec<(String, UniformLocation)>,
    values: HashMap<UniformLocation, UniformValue>,
}

/// GPU device that lives entirely in host memory
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    config: HeadlessDeviceConfig,
    next_id: u32,
    buffers: HashMap<BufferHandle, BufferRecord>,
    vertex_arrays: HashMap<VertexArrayHandle, VertexArrayRecord>,
    shaders: HashMap<ShaderHandle, ShaderRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    bound_program: Option<ProgramHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    calls: Vec<DeviceCall>,
    floats_uploaded: usize,
    draw_calls: usize,
}

impl HeadlessDevice {
    /// Create a device without resource limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device with resource limits
    pub fn with_config(config: HeadlessDeviceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn record(&mut self, call: DeviceCall) {
        if let Some(max) = self.config.max_logged_calls {
            if self.calls.len() >= max.max(1) {
                self.calls.drain(..self.calls.len().div_ceil(2));
            }
        }
        self.calls.push(call);
    }

    /// Calls still in the log, oldest first
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Forget recorded calls. Object state is kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Draws still in the call log, oldest first
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::DrawArrays(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of live buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live vertex arrays
    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Number of live programs
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of live shader stages
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Total draw calls issued, including those dropped from the call log
    pub const fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Total floats uploaded through `buffer_data` and `buffer_sub_data`
    pub fn floats_uploaded(&self) -> usize {
        self.floats_uploaded
    }

    /// Current contents of a buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[f32]> {
        self.buffers.get(&buffer).map(|record| record.data.as_slice())
    }

    /// Usage hint a buffer was last uploaded with
    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(&buffer).map(|record| record.usage)
    }

    /// Attribute bindings of a vertex array as `(location, buffer, components)`,
    /// sorted by location
    pub fn vertex_array_attributes(&self, vertex_array: VertexArrayHandle) -> Option<Vec<(AttribLocation, BufferHandle, u32)>> {
        self.vertex_arrays.get(&vertex_array).map(|record| {
            let mut attributes: Vec<_> = record
                .attributes
                .iter()
                .map(|(&location, &(buffer, components))| (location, buffer, components))
                .collect();
            attributes.sort_by_key(|(location, _, _)| *location);
            attributes
        })
    }

    /// Last value written to a named uniform of a program
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        let record = self.programs.get(&program)?;
        let (_, location) = record.uniforms.iter().find(|(uniform, _)| uniform == name)?;
        record.values.get(location).copied()
    }

    /// Currently bound program
    pub fn bound_program(&self) -> Option<ProgramHandle> {
        self.bound_program
    }

    /// Currently bound vertex array
    pub fn bound_vertex_array(&self) -> Option<VertexArrayHandle> {
        self.bound_vertex_array
    }

    fn allocate_id(&mut self) -> u32 {
        // 0 is reserved as the null object
        self.next_id += 1;
        self.next_id
    }

    fn buffer_mut(&mut self, buffer: BufferHandle) -> DeviceResult<&mut BufferRecord> {
        self.buffers.get_mut(&buffer).ok_or(DeviceError::InvalidHandle { kind: "buffer", id: buffer.0 })
    }

    fn bound_vertex_array_mut(&mut self) -> DeviceResult<&mut VertexArrayRecord> {
        let handle = self.bound_vertex_array.ok_or(DeviceError::NoVertexArrayBound)?;
        self.vertex_arrays
            .get_mut(&handle)
            .ok_or(DeviceError::InvalidHandle { kind: "vertex array", id: handle.0 })
    }

    fn shader_with_stage(&self, shader: ShaderHandle, stage: ShaderStage) -> DeviceResult<&ShaderRecord> {
        let record = self
            .shaders
            .get(&shader)
            .ok_or(DeviceError::InvalidHandle { kind: "shader", id: shader.0 })?;
        if record.stage == stage {
            Ok(record)
        } else {
            Err(DeviceError::LinkFailed {
                log: format!("shader {} is a {:?} stage, expected {:?}", shader.0, record.stage, stage),
            })
        }
    }

    fn program(&self, program: ProgramHandle) -> DeviceResult<&ProgramRecord> {
        self.programs
            .get(&program)
            .ok_or(DeviceError::InvalidHandle { kind: "program", id: program.0 })
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&mut self) -> DeviceResult<BufferHandle> {
        if self.config.max_buffers.is_some_and(|max| self.buffers.len() >= max) {
            return Err(DeviceError::AllocationFailed { resource: "buffer" });
        }
        let handle = BufferHandle(self.allocate_id());
        self.buffers.insert(handle, BufferRecord { data: Vec::new(), usage: BufferUsage::Static });
        self.record(DeviceCall::CreateBuffer(handle));
        trace!("headless: created buffer {}", handle.0);
        Ok(handle)
    }

    fn buffer_data(&mut self, buffer: BufferHandle, data: &[f32], usage: BufferUsage) -> DeviceResult<()> {
        let record = self.buffer_mut(buffer)?;
        record.data = data.to_vec();
        record.usage = usage;
        self.floats_uploaded += data.len();
        self.record(DeviceCall::BufferData { buffer, len: data.len(), usage });
        Ok(())
    }

    fn buffer_sub_data(&mut self, buffer: BufferHandle, offset: usize, data: &[f32]) -> DeviceResult<()> {
        let record = self.buffer_mut(buffer)?;
        let end = offset + data.len();
        let target = record
            .data
            .get_mut(offset..end)
            .ok_or(DeviceError::InvalidHandle { kind: "buffer range", id: buffer.0 })?;
        target.copy_from_slice(data);
        self.floats_uploaded += data.len();
        self.record(DeviceCall::BufferSubData { buffer, offset, len: data.len() });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) -> DeviceResult<()> {
        self.buffers
            .remove(&buffer)
            .ok_or(DeviceError::InvalidHandle { kind: "buffer", id: buffer.0 })?;
        for vertex_array in self.vertex_arrays.values_mut() {
            vertex_array.attributes.retain(|_, (bound, _)| *bound != buffer);
        }
        self.record(DeviceCall::DeleteBuffer(buffer));
        Ok(())
    }

    fn create_vertex_array(&mut self) -> DeviceResult<VertexArrayHandle> {
        if self.config.max_vertex_arrays.is_some_and(|max| self.vertex_arrays.len() >= max) {
            return Err(DeviceError::AllocationFailed { resource: "vertex array" });
        }
        let handle = VertexArrayHandle(self.allocate_id());
        self.vertex_arrays.insert(handle, VertexArrayRecord::default());
        self.record(DeviceCall::CreateVertexArray(handle));
        Ok(handle)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) -> DeviceResult<()> {
        if let Some(handle) = vertex_array {
            if !self.vertex_arrays.contains_key(&handle) {
                return Err(DeviceError::InvalidHandle { kind: "vertex array", id: handle.0 });
            }
        }
        self.bound_vertex_array = vertex_array;
        self.record(DeviceCall::BindVertexArray(vertex_array));
        Ok(())
    }

    fn vertex_attrib_pointer(&mut self, location: AttribLocation, buffer: BufferHandle, components: u32) -> DeviceResult<()> {
        if !self.buffers.contains_key(&buffer) {
            return Err(DeviceError::InvalidHandle { kind: "buffer", id: buffer.0 });
        }
        if !(1..=4).contains(&components) {
            return Err(DeviceError::InvalidHandle { kind: "component count", id: components });
        }
        self.bound_vertex_array_mut()?.attributes.insert(location, (buffer, components));
        self.record(DeviceCall::VertexAttribPointer { location, buffer, components });
        Ok(())
    }

    fn disable_vertex_attrib(&mut self, location: AttribLocation) -> DeviceResult<()> {
        self.bound_vertex_array_mut()?.attributes.remove(&location);
        self.record(DeviceCall::DisableVertexAttrib(location));
        Ok(())
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> DeviceResult<()> {
        self.vertex_arrays
            .remove(&vertex_array)
            .ok_or(DeviceError::InvalidHandle { kind: "vertex array", id: vertex_array.0 })?;
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
        self.record(DeviceCall::DeleteVertexArray(vertex_array));
        Ok(())
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DeviceResult<ShaderHandle> {
        let interface = scan_stage(stage, source).map_err(|log| DeviceError::CompileFailed { stage, log })?;
        let handle = ShaderHandle(self.allocate_id());
        self.shaders.insert(handle, ShaderRecord { stage, interface });
        self.record(DeviceCall::CompileShader { stage, shader: handle });
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) -> DeviceResult<()> {
        self.shaders
            .remove(&shader)
            .ok_or(DeviceError::InvalidHandle { kind: "shader", id: shader.0 })?;
        self.record(DeviceCall::DeleteShader(shader));
        Ok(())
    }

    fn link_program(&mut self, vertex: ShaderHandle, fragment: ShaderHandle) -> DeviceResult<ProgramHandle> {
        let vertex_stage = &self.shader_with_stage(vertex, ShaderStage::Vertex)?.interface;
        let fragment_stage = &self.shader_with_stage(fragment, ShaderStage::Fragment)?.interface;

        if let Some(missing) = fragment_stage
            .inputs
            .iter()
            .find(|input| !vertex_stage.outputs.contains(input))
        {
            return Err(DeviceError::LinkFailed {
                log: format!("fragment input '{missing}' has no matching vertex output"),
            });
        }

        let attributes = vertex_stage
            .inputs
            .iter()
            .zip(0u32..)
            .map(|(name, location)| (name.clone(), AttribLocation(location)))
            .collect();

        let mut uniform_names: Vec<&String> = Vec::new();
        for name in vertex_stage.uniforms.iter().chain(&fragment_stage.uniforms) {
            if !uniform_names.contains(&name) {
                uniform_names.push(name);
            }
        }
        let uniforms = uniform_names
            .into_iter()
            .zip(0u32..)
            .map(|(name, location)| (name.clone(), UniformLocation(location)))
            .collect();

        let handle = ProgramHandle(self.allocate_id());
        self.programs.insert(handle, ProgramRecord { attributes, uniforms, values: HashMap::new() });
        self.record(DeviceCall::LinkProgram(handle));
        debug!("headless: linked program {}", handle.0);
        Ok(handle)
    }

    fn active_attributes(&self, program: ProgramHandle) -> DeviceResult<Vec<(String, AttribLocation)>> {
        Ok(self.program(program)?.attributes.clone())
    }

    fn active_uniforms(&self, program: ProgramHandle) -> DeviceResult<Vec<(String, UniformLocation)>> {
        Ok(self.program(program)?.uniforms.clone())
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) -> DeviceResult<()> {
        if let Some(handle) = program {
            self.program(handle)?;
        }
        self.bound_program = program;
        self.record(DeviceCall::UseProgram(program));
        Ok(())
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) -> DeviceResult<()> {
        let program = self.bound_program.ok_or(DeviceError::NoProgramBound)?;
        let record = self
            .programs
            .get_mut(&program)
            .ok_or(DeviceError::InvalidHandle { kind: "program", id: program.0 })?;
        let name = record
            .uniforms
            .iter()
            .find(|(_, candidate)| *candidate == location)
            .map(|(name, _)| name.clone())
            .ok_or(DeviceError::InvalidHandle { kind: "uniform location", id: location.0 })?;
        record.values.insert(location, *value);
        self.record(DeviceCall::SetUniform { program, name, value: *value });
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramHandle) -> DeviceResult<()> {
        self.programs
            .remove(&program)
            .ok_or(DeviceError::InvalidHandle { kind: "program", id: program.0 })?;
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
        self.record(DeviceCall::DeleteProgram(program));
        Ok(())
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> DeviceResult<()> {
        let program = self.bound_program.ok_or(DeviceError::NoProgramBound)?;
        let vertex_array = self.bound_vertex_array.ok_or(DeviceError::NoVertexArrayBound)?;
        trace!("headless: draw {count} vertices as {topology:?}");
        self.draw_calls += 1;
        self.record(DeviceCall::DrawArrays(DrawRecord { program, vertex_array, topology, first, count }));
        Ok(())
    }
}

const IGNORED_QUALIFIERS: &[&str] = &["flat", "smooth", "noperspective", "centroid", "highp", "mediump", "lowp"];

/// Scan the top-level declarations of a GLSL stage
///
/// Returns the compiler log on failure.
fn scan_stage(stage: ShaderStage, source: &str) -> Result<StageInterface, String> {
    let code: Vec<&str> = source
        .lines()
        .map(|line| line.split("//").next().unwrap_or_default().trim())
        .collect();

    for (index, line) in code.iter().enumerate() {
        if let Some(message) = line.strip_prefix("#error") {
            return Err(format!("0:{}: error: {}", index + 1, message.trim()));
        }
    }

    let opened = source.matches('{').count();
    let closed = source.matches('}').count();
    if opened != closed {
        return Err(format!("0:{}: error: unbalanced braces", code.len()));
    }
    if !code.iter().any(|line| line.contains("void main")) {
        return Err("0:0: error: missing entry point 'main'".to_string());
    }

    let mut declared = StageInterface::default();
    for line in &code {
        let mut line = *line;
        if line.starts_with("layout") {
            line = line.split_once(')').map_or("", |(_, rest)| rest.trim());
        }
        let Some(declaration) = line.strip_suffix(';') else {
            continue;
        };
        let tokens: Vec<&str> = declaration
            .split_whitespace()
            .filter(|token| !IGNORED_QUALIFIERS.contains(token))
            .collect();
        let [qualifier, _type, name, ..] = tokens.as_slice() else {
            continue;
        };
        let name = name.split('[').next().unwrap_or_default().to_string();
        match (*qualifier, stage) {
            ("in", _) | ("attribute", ShaderStage::Vertex) | ("varying", ShaderStage::Fragment) => {
                declared.inputs.push(name);
            }
            ("out", _) | ("varying", ShaderStage::Vertex) => declared.outputs.push(name),
            ("uniform", _) => declared.uniforms.push(name),
            _ => {}
        }
    }

    // A declaration that the stage body never mentions is optimized out
    let is_used = |name: &String| identifier_count(source, name) > 1;
    Ok(StageInterface {
        inputs: declared.inputs.into_iter().filter(is_used).collect(),
        outputs: declared.outputs,
        uniforms: declared.uniforms.into_iter().filter(is_used).collect(),
    })
}

fn identifier_count(source: &str, name: &str) -> usize {
    source
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| *token == name)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "\
#version 330 core
layout(location = 0) in vec3 in_position;
in vec3 in_unused;
uniform mat4 u_model;
uniform mat4 u_view_projection;
uniform float u_dead;
out vec3 v_position;
void main() {
    v_position = in_position;
    gl_Position = u_view_projection * u_model * vec4(in_position, 1.0);
}
";

    const FRAGMENT: &str = "\
#version 330 core
in vec3 v_position;
uniform vec4 u_color;
out vec4 frag_color;
void main() {
    frag_color = u_color * vec4(v_position, 1.0);
}
";

    fn linked(device: &mut HeadlessDevice) -> ProgramHandle {
        let vertex = device.compile_shader(ShaderStage::Vertex, VERTEX).unwrap();
        let fragment = device.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();
        device.link_program(vertex, fragment).unwrap()
    }

    #[test]
    fn test_program_interface_skips_unused_declarations() {
        let mut device = HeadlessDevice::new();
        let program = linked(&mut device);

        let attributes = device.active_attributes(program).unwrap();
        assert_eq!(attributes, vec![("in_position".to_string(), AttribLocation(0))]);

        let uniforms: Vec<String> = device
            .active_uniforms(program)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(uniforms, vec!["u_model", "u_view_projection", "u_color"]);
    }

    #[test]
    fn test_compile_errors_carry_log() {
        let mut device = HeadlessDevice::new();
        let missing_main = device.compile_shader(ShaderStage::Vertex, "in vec3 a;");
        assert!(matches!(missing_main, Err(DeviceError::CompileFailed { ref log, .. }) if log.contains("main")));

        let directive = device.compile_shader(ShaderStage::Fragment, "#error broken on purpose\nvoid main() {}");
        assert!(matches!(directive, Err(DeviceError::CompileFailed { ref log, .. }) if log.contains("broken on purpose")));
    }

    #[test]
    fn test_link_requires_matching_varyings() {
        let mut device = HeadlessDevice::new();
        let vertex = device
            .compile_shader(ShaderStage::Vertex, "in vec3 p;\nvoid main() { gl_Position = vec4(p, 1.0); }")
            .unwrap();
        let fragment = device.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();
        let result = device.link_program(vertex, fragment);
        assert!(matches!(result, Err(DeviceError::LinkFailed { ref log }) if log.contains("v_position")));
    }

    #[test]
    fn test_draw_requires_bound_state() {
        let mut device = HeadlessDevice::new();
        assert_eq!(device.draw_arrays(Topology::Triangles, 0, 3), Err(DeviceError::NoProgramBound));

        let program = linked(&mut device);
        device.use_program(Some(program)).unwrap();
        assert_eq!(device.draw_arrays(Topology::Triangles, 0, 3), Err(DeviceError::NoVertexArrayBound));

        let vertex_array = device.create_vertex_array().unwrap();
        device.bind_vertex_array(Some(vertex_array)).unwrap();
        device.draw_arrays(Topology::Triangles, 0, 3).unwrap();
        assert_eq!(device.draws().len(), 1);
    }

    #[test]
    fn test_set_uniform_records_name() {
        let mut device = HeadlessDevice::new();
        let program = linked(&mut device);
        let (_, location) = device
            .active_uniforms(program)
            .unwrap()
            .into_iter()
            .find(|(name, _)| name == "u_color")
            .unwrap();

        assert_eq!(device.set_uniform(location, &UniformValue::Float(1.0)), Err(DeviceError::NoProgramBound));
        device.use_program(Some(program)).unwrap();
        device.set_uniform(location, &UniformValue::Float(1.0)).unwrap();
        assert_eq!(device.uniform_value(program, "u_color"), Some(UniformValue::Float(1.0)));
    }

    #[test]
    fn test_allocation_limit() {
        let mut device = HeadlessDevice::with_config(HeadlessDeviceConfig { max_buffers: Some(1), ..Default::default() });
        let first = device.create_buffer().unwrap();
        assert_eq!(device.create_buffer(), Err(DeviceError::AllocationFailed { resource: "buffer" }));
        device.delete_buffer(first).unwrap();
        assert!(device.create_buffer().is_ok(), "deleting frees capacity");
    }

    #[test]
    fn test_call_log_is_capped() {
        let mut device = HeadlessDevice::with_config(HeadlessDeviceConfig { max_logged_calls: Some(8), ..Default::default() });
        let buffers: Vec<BufferHandle> = (0..20).map(|_| device.create_buffer().unwrap()).collect();
        assert!(device.calls().len() <= 8);
        assert_eq!(device.calls().last(), Some(&DeviceCall::CreateBuffer(buffers[19])));
        assert_eq!(device.live_buffers(), 20, "object state is unaffected");
    }

    #[test]
    fn test_double_delete_is_reported() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer().unwrap();
        device.delete_buffer(buffer).unwrap();
        assert!(matches!(device.delete_buffer(buffer), Err(DeviceError::InvalidHandle { kind: "buffer", .. })));
    }

    #[test]
    fn test_sub_data_bounds() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer().unwrap();
        device.buffer_data(buffer, &[0.0; 6], BufferUsage::Dynamic).unwrap();
        device.buffer_sub_data(buffer, 3, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(device.buffer_contents(buffer), Some(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0][..]));
        assert!(device.buffer_sub_data(buffer, 4, &[1.0, 2.0, 3.0]).is_err());
    }
}
