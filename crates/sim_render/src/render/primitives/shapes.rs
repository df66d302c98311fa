//! Procedural shape geometry
//!
//! Non-indexed triangle lists (and one line loop) centred on the origin,
//! counter-clockwise when viewed from outside.

use crate::foundation::math::constants::PI;

use super::{Topology, VertexStream};
use crate::render::error::ShapeError;

/// Flat positions plus the topology they are meant to be drawn with
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeGeometry {
    /// Primitive topology
    pub topology: Topology,
    /// Flat `[x, y, z]` positions
    pub positions: Vec<f32>,
}

impl ShapeGeometry {
    /// Triangle list geometry
    pub fn triangles(positions: Vec<f32>) -> Self {
        Self { topology: Topology::Triangles, positions }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Convert into a vertex stream
    pub fn into_stream(self) -> Result<VertexStream, ShapeError> {
        VertexStream::from_positions(self.topology, self.positions)
    }
}

fn push_triangle(out: &mut Vec<f32>, a: [f32; 3], b: [f32; 3], c: [f32; 3]) {
    out.extend_from_slice(&a);
    out.extend_from_slice(&b);
    out.extend_from_slice(&c);
}

fn push_quad(out: &mut Vec<f32>, a: [f32; 3], b: [f32; 3], c: [f32; 3], d: [f32; 3]) {
    push_triangle(out, a, b, c);
    push_triangle(out, a, c, d);
}

/// Single triangle in the XY plane facing +Z
pub fn triangle() -> ShapeGeometry {
    ShapeGeometry::triangles(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
}

/// Square in the XY plane facing +Z
pub fn quad(size: f32) -> ShapeGeometry {
    let h = size * 0.5;
    let mut positions = Vec::with_capacity(18);
    push_quad(&mut positions, [-h, -h, 0.0], [h, -h, 0.0], [h, h, 0.0], [-h, h, 0.0]);
    ShapeGeometry::triangles(positions)
}

/// Axis-aligned box, 36 vertices
pub fn cuboid(half_extents: [f32; 3]) -> ShapeGeometry {
    let [x, y, z] = half_extents;
    let mut positions = Vec::with_capacity(36 * 3);
    // +X, -X, +Y, -Y, +Z, -Z
    push_quad(&mut positions, [x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z]);
    push_quad(&mut positions, [-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z]);
    push_quad(&mut positions, [-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z]);
    push_quad(&mut positions, [-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z]);
    push_quad(&mut positions, [-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]);
    push_quad(&mut positions, [x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]);
    ShapeGeometry::triangles(positions)
}

/// Latitude/longitude sphere
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `rings` - Latitude bands, at least 2
/// * `segments` - Longitude slices, at least 3
pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> ShapeGeometry {
    let rings = rings.max(2);
    let segments = segments.max(3);
    let point = |ring: u32, segment: u32| -> [f32; 3] {
        let polar = PI * ring as f32 / rings as f32;
        let azimuth = 2.0 * PI * segment as f32 / segments as f32;
        [
            radius * polar.sin() * azimuth.cos(),
            radius * polar.cos(),
            radius * polar.sin() * azimuth.sin(),
        ]
    };

    let mut positions = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let top_left = point(ring, segment);
            let top_right = point(ring, segment + 1);
            let bottom_left = point(ring + 1, segment);
            let bottom_right = point(ring + 1, segment + 1);
            // pole bands collapse to one triangle per segment
            if ring != 0 {
                push_triangle(&mut positions, top_left, top_right, bottom_left);
            }
            if ring != rings - 1 {
                push_triangle(&mut positions, top_right, bottom_right, bottom_left);
            }
        }
    }
    ShapeGeometry::triangles(positions)
}

/// Circle outline in the XZ plane
pub fn circle_loop(radius: f32, segments: u32) -> ShapeGeometry {
    let segments = segments.max(3);
    let positions = (0..segments)
        .flat_map(|segment| {
            let angle = 2.0 * PI * segment as f32 / segments as f32;
            [radius * angle.cos(), 0.0, radius * angle.sin()]
        })
        .collect();
    ShapeGeometry { topology: Topology::LineLoop, positions }
}
