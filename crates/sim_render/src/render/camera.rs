//! Camera and light state for a frame
//!
//! The camera follows the GL conventions the shaders expect: right-handed
//! Y-up view space looking down -Z, and a projection mapping depth to
//! `[-1, 1]` clip space.

use serde::{Deserialize, Serialize};

use crate::foundation::color::Color;
use crate::foundation::math::{utils, Mat4, Point3, Vec3};

/// Near and far clipping distances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlanes {
    /// Distance to the near plane (> 0)
    pub near: f32,
    /// Distance to the far plane (> near)
    pub far: f32,
}

impl Default for ClipPlanes {
    fn default() -> Self {
        Self { near: 0.1, far: 100.0 }
    }
}

/// Perspective camera
///
/// Represents a camera by its eye position, the direction it looks in and an
/// up hint. The view and projection matrices are computed on demand from
/// these values.
///
/// # Coordinate System
/// Right-handed, Y-up. The view matrix maps the look direction onto -Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Eye position in world space
    pub eye: Vec3,
    /// Direction the camera faces (need not be normalized)
    pub look_direction: Vec3,
    /// Up hint for orientation (typically +Y)
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Viewport width / height
    pub aspect: f32,
    /// Clipping distances
    pub clip: ClipPlanes,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0, ClipPlanes::default())
    }
}

impl Camera {
    /// Create a perspective camera looking toward the origin
    ///
    /// A camera placed at the origin looks down -Z.
    ///
    /// # Arguments
    /// * `eye` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Viewport width / height
    /// * `clip` - Near and far clipping distances
    ///
    /// # Returns
    /// A camera with +Y as its up hint
    pub fn perspective(eye: Vec3, fov_degrees: f32, aspect: f32, clip: ClipPlanes) -> Self {
        Self {
            eye,
            look_direction: facing(-eye),
            up: Vec3::y(),
            fov_y: utils::deg_to_rad(fov_degrees),
            aspect,
            clip,
        }
    }

    /// Point the camera at a world-space target
    ///
    /// A target at the eye keeps the current direction.
    pub fn look_at(&mut self, target: Vec3) {
        let direction = target - self.eye;
        if direction.norm_squared() > f32::EPSILON {
            self.look_direction = direction;
        }
    }

    /// Update the aspect ratio after a viewport resize
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        let eye = Point3::from(self.eye);
        let target = eye + self.look_direction;
        Mat4::look_at_rh(&eye, &target, &self.up)
    }

    /// View-to-clip matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::new_perspective(self.aspect, self.fov_y, self.clip.near, self.clip.far)
    }

    /// Combined `projection * view`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

fn facing(direction: Vec3) -> Vec3 {
    if direction.norm_squared() > f32::EPSILON {
        direction
    } else {
        -Vec3::z()
    }
}

/// Single directional light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels in, world space
    pub direction: Vec3,
    /// Light color; alpha is ignored
    pub color: Color,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.3, -1.0, -0.5).normalize(),
            color: Color::WHITE,
        }
    }
}

impl DirectionalLight {
    /// Create a light; the direction is normalized
    pub fn new(direction: Vec3, color: Color) -> Self {
        Self {
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::y()),
            color,
        }
    }
}
