//! Per-frame inputs for global uniforms

use crate::foundation::color::Color;
use crate::render::camera::{Camera, DirectionalLight};

/// Everything frame-global that shaders may read
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameState {
    /// Active camera
    pub camera: Camera,
    /// Scene light
    pub light: DirectionalLight,
    /// Ambient light color; alpha is ignored
    pub ambient: Color,
    /// Seconds since the driver started
    pub elapsed_seconds: f32,
}

impl FrameState {
    /// Frame state with a default light and a dim ambient term
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            light: DirectionalLight::default(),
            ambient: Color::rgb(0.1, 0.1, 0.1),
            elapsed_seconds: 0.0,
        }
    }

    /// Replace the light
    #[must_use]
    pub fn with_light(mut self, light: DirectionalLight) -> Self {
        self.light = light;
        self
    }

    /// Replace the ambient color
    #[must_use]
    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    /// Set elapsed time
    #[must_use]
    pub fn with_elapsed(mut self, seconds: f32) -> Self {
        self.elapsed_seconds = seconds;
        self
    }
}
