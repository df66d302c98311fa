//! Shader source resolution
//!
//! Programs are named hierarchically (`lit/lambert`). A [`ShaderSource`]
//! turns such a name into a vertex/fragment GLSL pair.

use std::collections::HashMap;
use std::path::PathBuf;

use log::debug;

use crate::render::error::ProgramError;

/// Vertex and fragment GLSL for one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPair {
    /// Vertex stage source
    pub vertex: String,
    /// Fragment stage source
    pub fragment: String,
}

impl ShaderPair {
    /// Create a pair
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self { vertex: vertex.into(), fragment: fragment.into() }
    }
}

/// Resolves program names to shader sources
pub trait ShaderSource {
    /// Load the GLSL pair for `name`
    fn load(&self, name: &str) -> Result<ShaderPair, ProgramError>;
}

/// Reads `<root>/<name>.vert` and `<root>/<name>.frag`
#[derive(Debug, Clone)]
pub struct FileShaderSource {
    root: PathBuf,
}

impl FileShaderSource {
    /// Create a source rooted at a directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, name: &str, extension: &str) -> Result<String, ProgramError> {
        let path = self.root.join(format!("{name}.{extension}"));
        debug!("Loading shader {}", path.display());
        std::fs::read_to_string(&path).map_err(|e| ProgramError::SourceNotFound {
            name: name.to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

impl ShaderSource for FileShaderSource {
    fn load(&self, name: &str) -> Result<ShaderPair, ProgramError> {
        Ok(ShaderPair { vertex: self.read(name, "vert")?, fragment: self.read(name, "frag")? })
    }
}

/// In-memory shader library
#[derive(Debug, Clone, Default)]
pub struct BuiltinShaders {
    programs: HashMap<String, ShaderPair>,
}

impl BuiltinShaders {
    /// Library with the stock programs
    pub fn new() -> Self {
        let mut library = Self::empty();
        library.insert(UNLIT_MONOCHROME, ShaderPair::new(UNLIT_VERT, MONOCHROME_FRAG));
        library.insert(LIT_LAMBERT, ShaderPair::new(LAMBERT_VERT, LAMBERT_FRAG));
        library.insert(DEBUG_UV, ShaderPair::new(UV_VERT, UV_FRAG));
        library
    }

    /// Library without any programs
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a program
    pub fn insert(&mut self, name: impl Into<String>, pair: ShaderPair) {
        self.programs.insert(name.into(), pair);
    }

    /// Builder-style [`insert`](Self::insert)
    #[must_use]
    pub fn with_program(mut self, name: impl Into<String>, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.insert(name, ShaderPair::new(vertex, fragment));
        self
    }

    /// Names of all programs in the library
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }
}

impl ShaderSource for BuiltinShaders {
    fn load(&self, name: &str) -> Result<ShaderPair, ProgramError> {
        self.programs.get(name).cloned().ok_or_else(|| ProgramError::SourceNotFound {
            name: name.to_string(),
            reason: "not in the built-in shader library".to_string(),
        })
    }
}

/// Solid color, no lighting
pub const UNLIT_MONOCHROME: &str = "unlit/monochrome";
/// Single directional light with an ambient term
pub const LIT_LAMBERT: &str = "lit/lambert";
/// Texture coordinates as color
pub const DEBUG_UV: &str = "debug/uv";

const UNLIT_VERT: &str = "\
#version 330 core
in vec3 in_position;
uniform mat4 u_model;
uniform mat4 u_view_projection;
void main() {
    gl_Position = u_view_projection * u_model * vec4(in_position, 1.0);
}
";

const MONOCHROME_FRAG: &str = "\
#version 330 core
uniform vec4 u_color;
out vec4 frag_color;
void main() {
    frag_color = u_color;
}
";

const LAMBERT_VERT: &str = "\
#version 330 core
in vec3 in_position;
in vec3 in_normal;
uniform mat4 u_model;
uniform mat3 u_normal_matrix;
uniform mat4 u_view_projection;
out vec3 v_normal;
void main() {
    v_normal = u_normal_matrix * in_normal;
    gl_Position = u_view_projection * u_model * vec4(in_position, 1.0);
}
";

const LAMBERT_FRAG: &str = "\
#version 330 core
in vec3 v_normal;
uniform vec4 u_color;
uniform vec3 u_light_direction;
uniform vec3 u_light_color;
uniform vec3 u_ambient_color;
out vec4 frag_color;
void main() {
    float diffuse = max(dot(normalize(v_normal), -u_light_direction), 0.0);
    vec3 lighting = u_ambient_color + u_light_color * diffuse;
    frag_color = vec4(u_color.rgb * lighting, u_color.a);
}
";

const UV_VERT: &str = "\
#version 330 core
in vec3 in_position;
in vec2 in_uv;
uniform mat4 u_model;
uniform mat4 u_view_projection;
out vec2 v_uv;
void main() {
    v_uv = in_uv;
    gl_Position = u_view_projection * u_model * vec4(in_position, 1.0);
}
";

const UV_FRAG: &str = "\
#version 330 core
in vec2 v_uv;
out vec4 frag_color;
void main() {
    frag_color = vec4(fract(v_uv), 0.0, 1.0);
}
";
