//! Per-frame global uniform broadcast
//!
//! Given the programs that will draw this frame, recompute each global they
//! read exactly once and push it to each program exactly once.

use std::collections::{BTreeSet, HashSet};

use log::trace;

use super::{FrameState, GlobalUniformRegistry};
use crate::render::device::GraphicsDevice;
use crate::render::error::RenderResult;
use crate::render::program::Program;

/// What one broadcast did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Distinct programs visited
    pub programs: usize,
    /// Globals whose update rule ran
    pub uniforms_updated: usize,
    /// `set_uniform` calls that reached the device
    pub uniform_uploads: usize,
}

/// Update and upload every global the given programs depend on
///
/// Programs may repeat; each distinct program is bound once. A global that
/// was already updated for `frame` keeps its value and is not recomputed,
/// but is still pushed to programs that need it.
///
/// # Arguments
/// * `programs` - Programs of the drawables about to be drawn
/// * `globals` - Registry holding the update rules
/// * `frame` - Monotonic frame index
/// * `state` - Camera, light and timing for this frame
/// * `device` - Device receiving the uploads
pub fn broadcast<'a>(
    programs: impl IntoIterator<Item = &'a Program>,
    globals: &mut GlobalUniformRegistry,
    frame: u64,
    state: &FrameState,
    device: &mut dyn GraphicsDevice,
) -> RenderResult<BroadcastStats> {
    let mut seen = HashSet::new();
    let distinct: Vec<&Program> = programs.into_iter().filter(|program| seen.insert(program.id())).collect();

    let dependencies: BTreeSet<&str> = distinct
        .iter()
        .flat_map(|program| program.global_dependencies())
        .map(String::as_str)
        .collect();

    let mut stats = BroadcastStats { programs: distinct.len(), ..BroadcastStats::default() };
    for name in &dependencies {
        if globals.update(name, frame, state) {
            stats.uniforms_updated += 1;
        }
    }

    for program in distinct {
        program.use_program(device)?;
        for name in program.global_dependencies() {
            let Some(value) = globals.value(name) else {
                continue;
            };
            if program.set_uniform(device, name, &value)? {
                stats.uniform_uploads += 1;
            }
        }
    }

    trace!(
        "Broadcast frame {frame}: {} programs, {} globals updated, {} uploads",
        stats.programs,
        stats.uniforms_updated,
        stats.uniform_uploads
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::render::device::{DeviceCall, HeadlessDevice, UniformValue};
    use crate::render::program::{source, BuiltinShaders, ProgramRegistry};
    use crate::render::uniforms::names;

    const PULSE_VERT: &str = "\
#version 330 core
in vec3 in_position;
uniform float u_pulse;
void main() {
    gl_Position = vec4(in_position * u_pulse, 1.0);
}
";

    const PULSE_FRAG: &str = "\
#version 330 core
uniform float u_pulse;
out vec4 frag_color;
void main() {
    frag_color = vec4(u_pulse);
}
";

    fn counting_registry(counter: &Rc<Cell<usize>>) -> GlobalUniformRegistry {
        let mut globals = GlobalUniformRegistry::new();
        let counter = Rc::clone(counter);
        globals.register("u_pulse", move |state| {
            counter.set(counter.get() + 1);
            UniformValue::Float(state.elapsed_seconds)
        });
        globals
    }

    #[test]
    fn test_shared_global_updated_once() {
        let mut device = HeadlessDevice::new();
        let counter = Rc::new(Cell::new(0));
        let mut globals = counting_registry(&counter);
        // registration evaluates the rule once against the default state
        counter.set(0);

        let shaders = BuiltinShaders::empty()
            .with_program("test/pulse_a", PULSE_VERT, PULSE_FRAG)
            .with_program("test/pulse_b", PULSE_VERT, PULSE_FRAG);
        let mut registry = ProgramRegistry::new();
        let a = registry.get_or_create("test/pulse_a", &mut device, &shaders, &globals).unwrap();
        let b = registry.get_or_create("test/pulse_b", &mut device, &shaders, &globals).unwrap();

        // three drawables, two of them sharing program a
        let drawn = [&*a, &*a, &*b];
        let state = FrameState::default().with_elapsed(1.5);
        let stats = broadcast(drawn, &mut globals, 1, &state, &mut device).unwrap();

        assert_eq!(counter.get(), 1);
        assert_eq!(stats, BroadcastStats { programs: 2, uniforms_updated: 1, uniform_uploads: 2 });
        assert_eq!(device.uniform_value(a.id(), "u_pulse"), Some(UniformValue::Float(1.5)));
        assert_eq!(device.uniform_value(b.id(), "u_pulse"), Some(UniformValue::Float(1.5)));
        assert_eq!(device.count_calls(|call| matches!(call, DeviceCall::UseProgram(Some(_)))), 2);
    }

    #[test]
    fn test_second_broadcast_in_frame_reuses_values() {
        let mut device = HeadlessDevice::new();
        let counter = Rc::new(Cell::new(0));
        let mut globals = counting_registry(&counter);
        counter.set(0);
        let shaders = BuiltinShaders::empty().with_program("test/pulse", PULSE_VERT, PULSE_FRAG);
        let program = ProgramRegistry::new().get_or_create("test/pulse", &mut device, &shaders, &globals).unwrap();

        let state = FrameState::default();
        broadcast([&*program], &mut globals, 7, &state, &mut device).unwrap();
        let again = broadcast([&*program], &mut globals, 7, &state, &mut device).unwrap();
        assert_eq!(counter.get(), 1);
        assert_eq!(again.uniforms_updated, 0);
        assert_eq!(again.uniform_uploads, 1);

        broadcast([&*program], &mut globals, 8, &state, &mut device).unwrap();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_builtin_dependencies_pushed() {
        let mut device = HeadlessDevice::new();
        let mut globals = GlobalUniformRegistry::with_builtins();
        let program = ProgramRegistry::new()
            .get_or_create(source::LIT_LAMBERT, &mut device, &BuiltinShaders::new(), &globals)
            .unwrap();

        let stats = broadcast([&*program], &mut globals, 0, &FrameState::default(), &mut device).unwrap();
        assert_eq!(stats.uniform_uploads, program.global_dependencies().len());
        assert!(device.uniform_value(program.id(), names::VIEW_PROJECTION).is_some());
        assert!(device.uniform_value(program.id(), names::TIME).is_none(), "lambert does not read time");
    }

    #[test]
    fn test_no_programs_is_a_no_op() {
        let mut device = HeadlessDevice::new();
        let mut globals = GlobalUniformRegistry::with_builtins();
        let none: [&Program; 0] = [];
        let stats = broadcast(none, &mut globals, 0, &FrameState::default(), &mut device).unwrap();
        assert_eq!(stats, BroadcastStats::default());
        assert!(device.calls().is_empty());
    }
}
