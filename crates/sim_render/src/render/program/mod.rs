//! GPU programs
//!
//! A [`Program`] is a linked vertex/fragment pair plus the interface the
//! device reported for it: attribute and uniform locations, both looked up
//! once at link time. The [`ProgramRegistry`] guarantees one program per
//! distinct name, so drawables that name the same shader share it.
//!
//! ## Design Notes
//!
//! Writing a uniform the program does not declare is not an error. Drivers
//! drop unused uniforms from a program's interface, so callers cannot know
//! which names survived linking; they set what they have and the program
//! ignores the rest.

pub mod source;

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info, trace, warn};

pub use source::{BuiltinShaders, FileShaderSource, ShaderPair, ShaderSource};

use crate::render::device::{
    AttribLocation, GraphicsDevice, ProgramHandle, ShaderHandle, ShaderStage, UniformLocation, UniformValue,
};
use crate::render::error::{DeviceError, ProgramError, RenderError, RenderResult};
use crate::render::uniforms::GlobalUniformRegistry;

/// Linked program and its cached interface
#[derive(Debug)]
pub struct Program {
    name: String,
    handle: ProgramHandle,
    attribute_locations: HashMap<String, AttribLocation>,
    uniform_locations: HashMap<String, UniformLocation>,
    global_dependencies: Vec<String>,
    released: Cell<bool>,
}

impl Program {
    /// Compile and link a program from a GLSL pair
    ///
    /// # Arguments
    /// * `name` - Program name, used in errors and logs
    /// * `pair` - Vertex and fragment sources
    /// * `device` - Device to compile on
    /// * `globals` - Registry used to find the program's global dependencies
    pub fn link(name: &str, pair: &ShaderPair, device: &mut dyn GraphicsDevice, globals: &GlobalUniformRegistry) -> RenderResult<Self> {
        let vertex = compile(name, ShaderStage::Vertex, &pair.vertex, device)?;
        let fragment = match compile(name, ShaderStage::Fragment, &pair.fragment, device) {
            Ok(fragment) => fragment,
            Err(e) => {
                device.delete_shader(vertex)?;
                return Err(e);
            }
        };

        let linked = device.link_program(vertex, fragment);
        // stages are not needed once linking has been attempted
        device.delete_shader(vertex)?;
        device.delete_shader(fragment)?;
        let handle = linked.map_err(|e| match e {
            DeviceError::LinkFailed { log } => ProgramError::LinkFailed { name: name.to_string(), log }.into(),
            other => RenderError::from(other),
        })?;

        let attribute_locations: HashMap<_, _> = device.active_attributes(handle)?.into_iter().collect();
        let uniform_locations: HashMap<_, _> = device.active_uniforms(handle)?.into_iter().collect();
        let mut global_dependencies: Vec<String> = uniform_locations
            .keys()
            .filter(|uniform| globals.contains(uniform))
            .cloned()
            .collect();
        global_dependencies.sort();

        info!(
            "Linked program '{name}' ({} attributes, {} uniforms, {} globals)",
            attribute_locations.len(),
            uniform_locations.len(),
            global_dependencies.len()
        );

        Ok(Self {
            name: name.to_string(),
            handle,
            attribute_locations,
            uniform_locations,
            global_dependencies,
            released: Cell::new(false),
        })
    }

    /// Program name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device handle, also used as the program's identity
    pub const fn id(&self) -> ProgramHandle {
        self.handle
    }

    /// Location of a vertex attribute; `None` if the program has no such input
    pub fn find_attrib_location(&self, name: &str) -> Option<AttribLocation> {
        self.attribute_locations.get(name).copied()
    }

    /// Whether the program has an active uniform of this name
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniform_locations.contains_key(name)
    }

    /// Active uniform names
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniform_locations.keys().map(String::as_str)
    }

    /// Global uniforms this program reads, sorted by name
    pub fn global_dependencies(&self) -> &[String] {
        &self.global_dependencies
    }

    /// Whether [`release`](Self::release) has run
    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    /// Make this program current
    pub fn use_program(&self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        self.ensure_live()?;
        device.use_program(Some(self.handle))?;
        Ok(())
    }

    /// Unbind whatever program is current
    pub fn unbind(&self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        device.use_program(None)?;
        Ok(())
    }

    /// Write a uniform; the program must be current
    ///
    /// # Returns
    /// `true` if the value was uploaded, `false` if the program has no
    /// active uniform of that name
    pub fn set_uniform(&self, device: &mut dyn GraphicsDevice, name: &str, value: &UniformValue) -> RenderResult<bool> {
        self.ensure_live()?;
        let Some(&location) = self.uniform_locations.get(name) else {
            trace!("Program '{}' has no uniform {name}, ignoring", self.name);
            return Ok(false);
        };
        device.set_uniform(location, value)?;
        Ok(true)
    }

    /// Delete the program on the device; later calls do nothing
    pub fn release(&self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        if self.released.replace(true) {
            return Ok(());
        }
        debug!("Releasing program '{}'", self.name);
        device.delete_program(self.handle)?;
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), ProgramError> {
        if self.is_released() {
            Err(ProgramError::Released(self.name.clone()))
        } else {
            Ok(())
        }
    }
}

fn compile(name: &str, stage: ShaderStage, source: &str, device: &mut dyn GraphicsDevice) -> RenderResult<ShaderHandle> {
    device.compile_shader(stage, source).map_err(|e| match e {
        DeviceError::CompileFailed { stage, log } => ProgramError::CompileFailed { name: name.to_string(), stage, log }.into(),
        other => other.into(),
    })
}

/// One program per distinct name
#[derive(Debug, Default)]
pub struct ProgramRegistry {
    programs: HashMap<String, Rc<Program>>,
}

impl ProgramRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the program named `name`, building it on first request
    ///
    /// Failures are not cached: a later call retries the build.
    pub fn get_or_create(
        &mut self,
        name: &str,
        device: &mut dyn GraphicsDevice,
        source: &dyn ShaderSource,
        globals: &GlobalUniformRegistry,
    ) -> RenderResult<Rc<Program>> {
        if let Some(program) = self.programs.get(name) {
            return Ok(Rc::clone(program));
        }
        let pair = source.load(name)?;
        let program = Rc::new(Program::link(name, &pair, device, globals)?);
        self.programs.insert(name.to_string(), Rc::clone(&program));
        Ok(program)
    }

    /// Look up an existing program
    pub fn get(&self, name: &str) -> Option<Rc<Program>> {
        self.programs.get(name).cloned()
    }

    /// Number of programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Release every program and empty the registry
    ///
    /// All programs are released even if one fails; the first failure is
    /// returned.
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        let mut first_error = None;
        for (name, program) in self.programs.drain() {
            if let Err(e) = program.release(device) {
                warn!("Failed to release program '{name}': {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::{DeviceCall, HeadlessDevice};
    use crate::render::uniforms::names;

    fn registry_with(device: &mut HeadlessDevice, name: &str) -> RenderResult<Rc<Program>> {
        let globals = GlobalUniformRegistry::with_builtins();
        ProgramRegistry::new().get_or_create(name, device, &BuiltinShaders::new(), &globals)
    }

    #[test]
    fn test_one_program_per_name() {
        let mut device = HeadlessDevice::new();
        let globals = GlobalUniformRegistry::with_builtins();
        let shaders = BuiltinShaders::new();
        let mut registry = ProgramRegistry::new();

        let first = registry.get_or_create(source::LIT_LAMBERT, &mut device, &shaders, &globals).unwrap();
        let second = registry.get_or_create(source::LIT_LAMBERT, &mut device, &shaders, &globals).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(device.count_calls(|call| matches!(call, DeviceCall::LinkProgram(_))), 1);
        assert_eq!(device.live_shaders(), 0, "stages deleted after linking");
    }

    #[test]
    fn test_interface_and_dependencies() {
        let mut device = HeadlessDevice::new();
        let program = registry_with(&mut device, source::LIT_LAMBERT).unwrap();

        assert!(program.find_attrib_location("in_position").is_some());
        assert!(program.find_attrib_location("in_normal").is_some());
        assert_eq!(program.find_attrib_location("in_uv"), None);
        assert_eq!(
            program.global_dependencies(),
            &[names::AMBIENT_COLOR, names::LIGHT_COLOR, names::LIGHT_DIRECTION, names::VIEW_PROJECTION]
        );
        assert!(program.has_uniform("u_model"), "per-object uniforms are active");
    }

    #[test]
    fn test_unknown_uniform_is_ignored() {
        let mut device = HeadlessDevice::new();
        let program = registry_with(&mut device, source::UNLIT_MONOCHROME).unwrap();
        program.use_program(&mut device).unwrap();
        assert!(!program.set_uniform(&mut device, "u_missing", &UniformValue::Float(1.0)).unwrap());
        assert!(program.set_uniform(&mut device, "u_color", &UniformValue::Float(1.0)).unwrap());
    }

    #[test]
    fn test_compile_failure_names_program() {
        let mut device = HeadlessDevice::new();
        let shaders = BuiltinShaders::empty().with_program("broken", "void main() {}", "#error no fragment\nvoid main() {}");
        let result = ProgramRegistry::new().get_or_create("broken", &mut device, &shaders, &GlobalUniformRegistry::new());
        match result {
            Err(RenderError::Program(ProgramError::CompileFailed { name, stage, log })) => {
                assert_eq!(name, "broken");
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("no fragment"));
            }
            other => panic!("expected compile failure, got {other:?}"),
        }
        assert_eq!(device.live_shaders(), 0, "vertex stage cleaned up");
    }

    #[test]
    fn test_link_failure() {
        let mut device = HeadlessDevice::new();
        let shaders = BuiltinShaders::empty().with_program(
            "mismatched",
            "void main() {}",
            "in vec3 v_missing;\nout vec4 c;\nvoid main() { c = vec4(v_missing, 1.0); }",
        );
        let result = ProgramRegistry::new().get_or_create("mismatched", &mut device, &shaders, &GlobalUniformRegistry::new());
        assert!(matches!(result, Err(RenderError::Program(ProgramError::LinkFailed { .. }))));
    }

    #[test]
    fn test_release_all_continues_past_failures() {
        let mut device = HeadlessDevice::new();
        let globals = GlobalUniformRegistry::with_builtins();
        let shaders = BuiltinShaders::new();
        let mut registry = ProgramRegistry::new();
        let unlit = registry.get_or_create(source::UNLIT_MONOCHROME, &mut device, &shaders, &globals).unwrap();
        let lit = registry.get_or_create(source::LIT_LAMBERT, &mut device, &shaders, &globals).unwrap();
        let uv = registry.get_or_create(source::DEBUG_UV, &mut device, &shaders, &globals).unwrap();
        device.delete_program(lit.id()).unwrap();

        assert!(matches!(
            registry.release_all(&mut device),
            Err(RenderError::Device(DeviceError::InvalidHandle { kind: "program", .. }))
        ));
        assert!(registry.is_empty());
        assert!(unlit.is_released() && uv.is_released());
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut device = HeadlessDevice::new();
        let program = registry_with(&mut device, source::DEBUG_UV).unwrap();
        program.release(&mut device).unwrap();
        program.release(&mut device).unwrap();
        assert_eq!(device.live_programs(), 0);
        assert!(matches!(
            program.use_program(&mut device),
            Err(RenderError::Program(ProgramError::Released(_)))
        ));
    }
}
