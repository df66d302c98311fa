//! Global uniforms
//!
//! A global uniform is a named value shared by every program that declares
//! it: camera matrices, light parameters, clip distances. Each name has one
//! [`GlobalUniform`] in the [`GlobalUniformRegistry`], recomputed from the
//! [`FrameState`] at most once per frame and then pushed to each dependent
//! program by the [`broadcast`] pipeline.
//!
//! The registry is owned by the renderer and passed explicitly to anything
//! that needs it, so several renderers can coexist.

pub mod broadcast;
pub mod frame;

use std::collections::HashMap;
use std::fmt;

use log::trace;

pub use crate::render::device::UniformValue;
pub use broadcast::{broadcast, BroadcastStats};
pub use frame::FrameState;

/// Names of the globals every registry starts with
pub mod names {
    /// Projection matrix
    pub const PROJECTION: &str = "u_projection";
    /// View matrix
    pub const VIEW: &str = "u_view";
    /// `projection * view`
    pub const VIEW_PROJECTION: &str = "u_view_projection";
    /// Camera eye position
    pub const CAMERA_POSITION: &str = "u_camera_position";
    /// Light travel direction
    pub const LIGHT_DIRECTION: &str = "u_light_direction";
    /// Light color (RGB)
    pub const LIGHT_COLOR: &str = "u_light_color";
    /// Ambient color (RGB)
    pub const AMBIENT_COLOR: &str = "u_ambient_color";
    /// Near clip distance
    pub const NEAR_PLANE: &str = "u_near_plane";
    /// Far clip distance
    pub const FAR_PLANE: &str = "u_far_plane";
    /// Seconds since start
    pub const TIME: &str = "u_time";
}

/// Names of the per-object uniforms set for every draw
pub mod object_names {
    /// Model matrix
    pub const MODEL: &str = "u_model";
    /// Normal matrix
    pub const NORMAL_MATRIX: &str = "u_normal_matrix";
    /// Object color
    pub const COLOR: &str = "u_color";
}

/// Computes a global's value from the frame state
pub type UpdateRule = Box<dyn Fn(&FrameState) -> UniformValue>;

/// One named global and its current value
pub struct GlobalUniform {
    name: String,
    value: UniformValue,
    rule: UpdateRule,
    updated_frame: Option<u64>,
}

impl fmt::Debug for GlobalUniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalUniform")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("updated_frame", &self.updated_frame)
            .finish_non_exhaustive()
    }
}

impl GlobalUniform {
    /// Create a global; the initial value comes from the default frame state
    pub fn new(name: impl Into<String>, rule: impl Fn(&FrameState) -> UniformValue + 'static) -> Self {
        let value = rule(&FrameState::default());
        Self { name: name.into(), value, rule: Box::new(rule), updated_frame: None }
    }

    /// Uniform name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value
    pub const fn value(&self) -> UniformValue {
        self.value
    }

    /// Recompute the value unless it was already computed for `frame`
    ///
    /// # Returns
    /// `true` if the rule ran
    pub fn update_value(&mut self, frame: u64, state: &FrameState) -> bool {
        if self.updated_frame == Some(frame) {
            return false;
        }
        self.value = (self.rule)(state);
        self.updated_frame = Some(frame);
        trace!("Updated global {} for frame {frame}", self.name);
        true
    }
}

/// All globals known to a renderer, one per name
#[derive(Debug, Default)]
pub struct GlobalUniformRegistry {
    uniforms: HashMap<String, GlobalUniform>,
}

impl GlobalUniformRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the camera, light and clip globals
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(names::PROJECTION, |s| s.camera.projection_matrix().into());
        registry.register(names::VIEW, |s| s.camera.view_matrix().into());
        registry.register(names::VIEW_PROJECTION, |s| s.camera.view_projection_matrix().into());
        registry.register(names::CAMERA_POSITION, |s| s.camera.eye.into());
        registry.register(names::LIGHT_DIRECTION, |s| s.light.direction.into());
        registry.register(names::LIGHT_COLOR, |s| s.light.color.to_vec4().xyz().into());
        registry.register(names::AMBIENT_COLOR, |s| s.ambient.to_vec4().xyz().into());
        registry.register(names::NEAR_PLANE, |s| s.camera.clip.near.into());
        registry.register(names::FAR_PLANE, |s| s.camera.clip.far.into());
        registry.register(names::TIME, |s| s.elapsed_seconds.into());
        registry
    }

    /// Add or replace a global
    ///
    /// Programs capture their dependencies when they are linked, so register
    /// custom globals before creating the programs that use them.
    ///
    /// # Returns
    /// `true` if an existing global of the same name was replaced
    pub fn register(&mut self, name: &str, rule: impl Fn(&FrameState) -> UniformValue + 'static) -> bool {
        self.uniforms.insert(name.to_string(), GlobalUniform::new(name, rule)).is_some()
    }

    /// Whether a global of this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Look up a global
    pub fn get(&self, name: &str) -> Option<&GlobalUniform> {
        self.uniforms.get(name)
    }

    /// Current value of a global
    pub fn value(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).map(GlobalUniform::value)
    }

    /// Recompute a global for `frame`
    ///
    /// # Returns
    /// `true` if the rule ran; `false` if it was already current or unknown
    pub fn update(&mut self, name: &str, frame: u64, state: &FrameState) -> bool {
        self.uniforms
            .get_mut(name)
            .is_some_and(|uniform| uniform.update_value(frame, state))
    }

    /// Number of globals
    pub fn len(&self) -> usize {
        self.uniforms.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.uniforms.is_empty()
    }
}
