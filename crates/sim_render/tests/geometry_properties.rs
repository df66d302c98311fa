//! Vertex stream and normal generation properties

use approx::assert_relative_eq;
use sim_render::foundation::math::Vec3;
use sim_render::render::primitives::{shapes, NormalStrategy, Topology, VertexAttribute, VertexStream};
use sim_render::render::ShapeError;

const EPSILON: f32 = 1e-5;

#[test]
fn attribute_buffers_must_match_vertex_count() {
    for (topology, count) in [(Topology::Points, 1), (Topology::Lines, 4), (Topology::Triangles, 6)] {
        let mut stream = VertexStream::create(topology, count).unwrap();
        for attribute in VertexAttribute::ALL {
            let expected = attribute.components() as usize * count as usize;
            let short = vec![0.0; expected - 1];
            let long = vec![0.0; expected + 1];
            let exact = vec![0.0; expected];
            let set = |stream: &mut VertexStream, data: &[f32]| match attribute {
                VertexAttribute::Position => stream.set_positions(data),
                VertexAttribute::Normal => stream.set_normals(data),
                VertexAttribute::Uv => stream.set_uvs(data),
            };
            assert!(matches!(set(&mut stream, &short), Err(ShapeError::SizeMismatch { .. })));
            assert!(matches!(set(&mut stream, &long), Err(ShapeError::SizeMismatch { .. })));
            set(&mut stream, &exact).unwrap();
            assert_eq!(stream.attribute_data(attribute).map(<[f32]>::len), Some(expected));
        }
    }
}

#[test]
fn facet_normal_of_counter_clockwise_xy_triangle_is_plus_z() {
    let mut stream = shapes::triangle().into_stream().unwrap();
    stream.generate_normals(NormalStrategy::Facet).unwrap();
    for normal in stream.normals().unwrap().chunks_exact(3) {
        assert_relative_eq!(Vec3::from_column_slice(normal), Vec3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
    }
}

#[test]
fn smooth_normals_of_coplanar_triangles_point_along_plus_z() {
    #[rustfmt::skip]
    let positions = vec![
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
    ];
    let mut stream = VertexStream::from_positions(Topology::Triangles, positions).unwrap();
    stream.generate_normals(NormalStrategy::Smooth).unwrap();
    let normals: Vec<&[f32]> = stream.normals().unwrap().chunks_exact(3).collect();
    assert_eq!(normals.len(), 6);
    for normal in normals {
        assert_relative_eq!(Vec3::from_column_slice(normal), Vec3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
    }
}

#[test]
fn smooth_normals_are_idempotent() {
    let mut stream = shapes::cuboid([1.0, 2.0, 0.5]).into_stream().unwrap();
    stream.generate_normals(NormalStrategy::Smooth).unwrap();
    let first = stream.normals().unwrap().to_vec();
    stream.generate_normals(NormalStrategy::Smooth).unwrap();
    assert_eq!(stream.normals().unwrap(), first.as_slice());

    // every vertex of a corner shares one averaged normal
    let positions = stream.position_triples();
    let normals: Vec<&[f32]> = stream.normals().unwrap().chunks_exact(3).collect();
    for i in 0..positions.len() {
        for j in 0..positions.len() {
            if positions[i] == positions[j] {
                assert_eq!(normals[i], normals[j]);
            }
        }
    }
}

#[test]
fn sphere_normals_are_unit_length() {
    let mut stream = shapes::uv_sphere(2.5, 10, 16).into_stream().unwrap();
    stream.generate_normals(NormalStrategy::Sphere).unwrap();
    let positions = stream.position_triples();
    for (normal, position) in stream.normals().unwrap().chunks_exact(3).zip(positions) {
        let normal = Vec3::from_column_slice(normal);
        assert_relative_eq!(normal.norm(), 1.0, epsilon = EPSILON);
        assert_relative_eq!(normal, Vec3::from(*position).normalize(), epsilon = EPSILON);
    }
}
