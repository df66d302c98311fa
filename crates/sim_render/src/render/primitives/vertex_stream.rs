//! Non-interleaved vertex data
//!
//! A [`VertexStream`] holds one flat `f32` buffer per attribute. Positions are
//! always present; normals and texture coordinates are optional. Every
//! present buffer holds exactly `components * vertex_count` floats, and every
//! setter enforces this instead of truncating or padding.

use std::ops::Range;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::normals::{self, NormalStrategy};
use super::uv::{self, UvCoefficients, UvStrategy};
use crate::render::error::ShapeError;

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    /// Independent points
    Points,
    /// Independent line segments, two vertices each
    Lines,
    /// Closed polyline
    LineLoop,
    /// Open polyline
    LineStrip,
    /// Independent triangles, three vertices each
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan around the first vertex
    TriangleFan,
}

impl Topology {
    /// Whether `vertex_count` forms whole primitives
    pub const fn accepts(self, vertex_count: u32) -> bool {
        match self {
            Self::Triangles => vertex_count % 3 == 0,
            Self::Lines => vertex_count % 2 == 0,
            _ => true,
        }
    }
}

/// Vertex attributes a stream may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// Object-space position, 3 floats
    Position,
    /// Surface normal, 3 floats
    Normal,
    /// Texture coordinate, 2 floats
    Uv,
}

impl VertexAttribute {
    /// All attributes in upload order
    pub const ALL: [Self; 3] = [Self::Position, Self::Normal, Self::Uv];

    /// Attribute name shaders declare for this attribute
    pub const fn shader_name(self) -> &'static str {
        match self {
            Self::Position => "in_position",
            Self::Normal => "in_normal",
            Self::Uv => "in_uv",
        }
    }

    /// Floats per vertex
    pub const fn components(self) -> u32 {
        match self {
            Self::Position | Self::Normal => 3,
            Self::Uv => 2,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Normal => "normal",
            Self::Uv => "uv",
        }
    }

    /// Bit for this attribute in an [`AttributeSet`]
    pub const fn flag(self) -> AttributeSet {
        match self {
            Self::Position => AttributeSet::POSITION,
            Self::Normal => AttributeSet::NORMAL,
            Self::Uv => AttributeSet::UV,
        }
    }
}

bitflags! {
    /// Set of attributes present in a stream
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttributeSet: u8 {
        /// Positions
        const POSITION = 1;
        /// Normals
        const NORMAL = 1 << 1;
        /// Texture coordinates
        const UV = 1 << 2;
    }
}

/// CPU-side vertex buffers with a fixed topology and vertex count
#[derive(Debug, Clone, PartialEq)]
pub struct VertexStream {
    topology: Topology,
    vertex_count: u32,
    positions: Vec<f32>,
    normals: Option<Vec<f32>>,
    uvs: Option<Vec<f32>>,
}

impl VertexStream {
    /// Create a stream with zero-filled positions and no optional attributes
    pub fn create(topology: Topology, vertex_count: u32) -> Result<Self, ShapeError> {
        if !topology.accepts(vertex_count) {
            return Err(ShapeError::IncompletePrimitive { topology, vertex_count });
        }
        Ok(Self {
            topology,
            vertex_count,
            positions: vec![0.0; float_len(VertexAttribute::Position, vertex_count)],
            normals: None,
            uvs: None,
        })
    }

    /// Create a stream whose vertex count is implied by a flat position buffer
    pub fn from_positions(topology: Topology, positions: Vec<f32>) -> Result<Self, ShapeError> {
        let size_mismatch = || ShapeError::SizeMismatch {
            attribute: VertexAttribute::Position.label(),
            expected: positions.len() - positions.len() % 3,
            actual: positions.len(),
        };
        if positions.len() % 3 != 0 {
            return Err(size_mismatch());
        }
        let vertex_count = u32::try_from(positions.len() / 3).map_err(|_| size_mismatch())?;
        if !topology.accepts(vertex_count) {
            return Err(ShapeError::IncompletePrimitive { topology, vertex_count });
        }
        Ok(Self { topology, vertex_count, positions, normals: None, uvs: None })
    }

    /// Primitive topology
    pub const fn topology(&self) -> Topology {
        self.topology
    }

    /// Number of vertices
    pub const fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Flat position buffer
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Positions viewed as `[x, y, z]` triples
    pub fn position_triples(&self) -> &[[f32; 3]] {
        bytemuck::cast_slice(self.positions.as_slice())
    }

    /// Flat normal buffer, if present
    pub fn normals(&self) -> Option<&[f32]> {
        self.normals.as_deref()
    }

    /// Flat texture coordinate buffer, if present
    pub fn uvs(&self) -> Option<&[f32]> {
        self.uvs.as_deref()
    }

    /// Buffer for one attribute, if present
    pub fn attribute_data(&self, attribute: VertexAttribute) -> Option<&[f32]> {
        match attribute {
            VertexAttribute::Position => Some(&self.positions),
            VertexAttribute::Normal => self.normals(),
            VertexAttribute::Uv => self.uvs(),
        }
    }

    /// Attributes currently present
    pub fn attributes(&self) -> AttributeSet {
        VertexAttribute::ALL
            .into_iter()
            .filter(|&attribute| self.attribute_data(attribute).is_some())
            .fold(AttributeSet::empty(), |set, attribute| set | attribute.flag())
    }

    /// Replace all positions
    pub fn set_positions(&mut self, data: &[f32]) -> Result<(), ShapeError> {
        self.check_len(VertexAttribute::Position, data.len())?;
        self.positions.copy_from_slice(data);
        Ok(())
    }

    /// Replace all normals
    pub fn set_normals(&mut self, data: &[f32]) -> Result<(), ShapeError> {
        self.check_len(VertexAttribute::Normal, data.len())?;
        self.normals = Some(data.to_vec());
        Ok(())
    }

    /// Replace all texture coordinates
    pub fn set_uvs(&mut self, data: &[f32]) -> Result<(), ShapeError> {
        self.check_len(VertexAttribute::Uv, data.len())?;
        self.uvs = Some(data.to_vec());
        Ok(())
    }

    /// Drop the normal buffer
    pub fn clear_normals(&mut self) {
        self.normals = None;
    }

    /// Drop the texture coordinate buffer
    pub fn clear_uvs(&mut self) {
        self.uvs = None;
    }

    /// Overwrite positions starting at `first_vertex`
    ///
    /// # Returns
    /// The range of floats that changed in the position buffer
    pub fn update_positions(&mut self, first_vertex: u32, data: &[f32]) -> Result<Range<usize>, ShapeError> {
        let components = VertexAttribute::Position.components() as usize;
        if data.len() % components != 0 {
            return Err(ShapeError::SizeMismatch {
                attribute: VertexAttribute::Position.label(),
                expected: data.len() - data.len() % components,
                actual: data.len(),
            });
        }
        let updated_vertices = (data.len() / components) as u64;
        let end_vertex = u64::from(first_vertex) + updated_vertices;
        if end_vertex > u64::from(self.vertex_count) {
            return Err(ShapeError::VertexRangeOutOfBounds {
                first: first_vertex,
                end: end_vertex,
                vertex_count: self.vertex_count,
            });
        }
        let start = first_vertex as usize * components;
        let range = start..start + data.len();
        self.positions[range.clone()].copy_from_slice(data);
        Ok(range)
    }

    /// Derive normals from positions
    ///
    /// [`NormalStrategy::None`] removes any existing normals. All other
    /// strategies need a [`Topology::Triangles`] stream.
    pub fn generate_normals(&mut self, strategy: NormalStrategy) -> Result<(), ShapeError> {
        let generator: fn(&[[f32; 3]]) -> Vec<[f32; 3]> = match strategy {
            NormalStrategy::None => {
                self.normals = None;
                return Ok(());
            }
            NormalStrategy::Facet => normals::facet,
            NormalStrategy::Smooth => normals::smooth,
            NormalStrategy::Sphere => normals::sphere,
        };
        if self.topology != Topology::Triangles {
            return Err(ShapeError::UnsupportedTopology {
                operation: "normal generation",
                topology: self.topology,
            });
        }
        let generated = generator(self.position_triples());
        self.normals = Some(generated.into_iter().flatten().collect());
        Ok(())
    }

    /// Derive texture coordinates from positions
    pub fn generate_uvs(&mut self, strategy: UvStrategy, coefficients: &UvCoefficients) -> Result<(), ShapeError> {
        let generated = uv::generate(strategy, coefficients, self.position_triples());
        self.uvs = Some(generated.into_iter().flatten().collect());
        Ok(())
    }

    fn check_len(&self, attribute: VertexAttribute, actual: usize) -> Result<(), ShapeError> {
        let expected = float_len(attribute, self.vertex_count);
        if actual == expected {
            Ok(())
        } else {
            Err(ShapeError::SizeMismatch { attribute: attribute.label(), expected, actual })
        }
    }
}

fn float_len(attribute: VertexAttribute, vertex_count: u32) -> usize {
    attribute.components() as usize * vertex_count as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    fn unit_triangle() -> VertexStream {
        VertexStream::from_positions(Topology::Triangles, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap()
    }

    #[test]
    fn test_create_zero_fills_positions() {
        let stream = VertexStream::create(Topology::Triangles, 6).unwrap();
        assert_eq!(stream.positions().len(), 18);
        assert!(stream.positions().iter().all(|&p| p == 0.0));
        assert_eq!(stream.attributes(), AttributeSet::POSITION);
    }

    #[test]
    fn test_create_rejects_partial_primitives() {
        assert_eq!(
            VertexStream::create(Topology::Triangles, 4),
            Err(ShapeError::IncompletePrimitive { topology: Topology::Triangles, vertex_count: 4 })
        );
        assert!(VertexStream::create(Topology::Lines, 3).is_err());
        assert!(VertexStream::create(Topology::LineLoop, 3).is_ok());
    }

    #[test]
    fn test_setters_enforce_size() {
        let mut stream = VertexStream::create(Topology::Triangles, 3).unwrap();
        assert_eq!(
            stream.set_positions(&[0.0; 8]),
            Err(ShapeError::SizeMismatch { attribute: "position", expected: 9, actual: 8 })
        );
        assert_eq!(
            stream.set_uvs(&[0.0; 9]),
            Err(ShapeError::SizeMismatch { attribute: "uv", expected: 6, actual: 9 })
        );
        stream.set_normals(&[0.0; 9]).unwrap();
        stream.set_uvs(&[0.0; 6]).unwrap();
        assert_eq!(stream.attributes(), AttributeSet::all());
    }

    #[test]
    fn test_from_positions_checks_layout() {
        assert!(matches!(
            VertexStream::from_positions(Topology::Points, vec![0.0; 4]),
            Err(ShapeError::SizeMismatch { .. })
        ));
        assert_eq!(unit_triangle().vertex_count(), 3);
    }

    #[test]
    fn test_update_positions_range() {
        let mut stream = unit_triangle();
        let range = stream.update_positions(1, &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(range, 3..6);
        assert_eq!(&stream.positions()[3..6], &[5.0, 5.0, 5.0]);

        assert_eq!(
            stream.update_positions(2, &[0.0; 6]),
            Err(ShapeError::VertexRangeOutOfBounds { first: 2, end: 4, vertex_count: 3 })
        );
    }

    #[test]
    fn test_generate_facet_normals_on_triangle() {
        let mut stream = unit_triangle();
        stream.generate_normals(NormalStrategy::Facet).unwrap();
        let normals = stream.normals().unwrap();
        for vertex in normals.chunks_exact(3) {
            assert_relative_eq!(vertex[0], 0.0, epsilon = EPSILON);
            assert_relative_eq!(vertex[1], 0.0, epsilon = EPSILON);
            assert_relative_eq!(vertex[2], 1.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_generate_normals_requires_triangles() {
        let mut stream = VertexStream::from_positions(Topology::LineLoop, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
        assert_eq!(
            stream.generate_normals(NormalStrategy::Smooth),
            Err(ShapeError::UnsupportedTopology { operation: "normal generation", topology: Topology::LineLoop })
        );
        // removing normals is topology independent
        stream.generate_normals(NormalStrategy::None).unwrap();
        assert!(stream.normals().is_none());
    }

    #[test]
    fn test_generate_uvs_any_topology() {
        let mut stream = VertexStream::from_positions(Topology::Points, vec![1.0, 2.0, 3.0]).unwrap();
        let coefficients = UvCoefficients::new([1.0, 0.0, 0.0, 0.5], [0.0, 1.0, 1.0, 0.0]);
        stream.generate_uvs(UvStrategy::Linear, &coefficients).unwrap();
        assert_eq!(stream.uvs(), Some(&[1.5, 5.0][..]));
    }
}
