//! Drawable objects
//!
//! A [`Drawable`] pairs a shared mesh with the program that draws it, plus
//! the per-object state shaders read: transform and color. A drawable may be
//! bound to a simulation body, in which case its transform is pulled from
//! the simulation every frame and it is retired once the body is removed.

use std::rc::Rc;

use crate::foundation::color::Color;
use crate::foundation::math::Transform;
use crate::physics::BodyHandle;
use crate::render::device::{GraphicsDevice, UniformValue};
use crate::render::error::RenderResult;
use crate::render::mesh::SharedMesh;
use crate::render::program::Program;
use crate::render::uniforms::object_names;

/// Lifecycle of a drawable
///
/// `Live -> PendingRemoval -> Destroyed`. Transitions never go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawableState {
    /// Drawn every frame
    Live,
    /// Will be destroyed by the next sweep; no longer drawn
    PendingRemoval,
    /// Gone; its mesh reference has been dropped
    Destroyed,
}

/// Mesh, program and per-object shader inputs
#[derive(Debug)]
pub struct Drawable {
    mesh: SharedMesh,
    program: Rc<Program>,
    /// World transform
    pub transform: Transform,
    /// Object color
    pub color: Color,
    binding: Option<BodyHandle>,
    pub(crate) state: DrawableState,
}

impl Drawable {
    /// Create a live, unbound drawable at the origin
    pub fn new(mesh: SharedMesh, program: Rc<Program>) -> Self {
        Self {
            mesh,
            program,
            transform: Transform::identity(),
            color: Color::WHITE,
            binding: None,
            state: DrawableState::Live,
        }
    }

    /// Set the initial transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the color
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Follow a simulation body
    #[must_use]
    pub fn bound_to(mut self, body: BodyHandle) -> Self {
        self.binding = Some(body);
        self
    }

    /// Shared mesh
    pub fn mesh(&self) -> &SharedMesh {
        &self.mesh
    }

    /// Program used to draw
    pub fn program(&self) -> &Rc<Program> {
        &self.program
    }

    /// Body this drawable follows
    pub const fn binding(&self) -> Option<BodyHandle> {
        self.binding
    }

    /// Lifecycle state
    pub const fn state(&self) -> DrawableState {
        self.state
    }

    /// Whether the drawable will be drawn
    pub fn is_live(&self) -> bool {
        self.state == DrawableState::Live
    }

    /// Set per-object uniforms and draw; the program must be current
    pub fn draw(&self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        let program = &self.program;
        program.set_uniform(device, object_names::MODEL, &UniformValue::Mat4(self.transform.to_matrix()))?;
        program.set_uniform(device, object_names::NORMAL_MATRIX, &UniformValue::Mat3(self.transform.normal_matrix()))?;
        program.set_uniform(device, object_names::COLOR, &UniformValue::Vec4(self.color.to_vec4()))?;
        self.mesh.borrow_mut().draw(program, device)
    }

    pub(crate) fn into_mesh(self) -> SharedMesh {
        self.mesh
    }
}
