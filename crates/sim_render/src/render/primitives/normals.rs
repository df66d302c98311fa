//! Normal generation strategies
//!
//! All generators take positions of a triangle list and return one normal
//! per vertex. Degenerate inputs (zero-area triangles, a vertex at the
//! origin for [`NormalStrategy::Sphere`]) produce the zero vector rather
//! than NaNs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils::canonical_zero, Vec3};

/// How per-vertex normals are derived from positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NormalStrategy {
    /// No normals
    #[default]
    None,
    /// Each triangle's face normal on all three of its vertices
    Facet,
    /// Face normals averaged over vertices that share a position
    Smooth,
    /// Normalized position, for shapes centred on the origin
    Sphere,
}

const DEGENERATE_LENGTH: f32 = 1e-12;

fn normalize_or_zero(vector: Vec3) -> Vec3 {
    vector.try_normalize(DEGENERATE_LENGTH).unwrap_or_else(Vec3::zeros)
}

/// Face normal `normalize((v1 - v0) x (v2 - v0))` on every triangle vertex
pub fn facet(positions: &[[f32; 3]]) -> Vec<[f32; 3]> {
    let mut normals = Vec::with_capacity(positions.len());
    for triangle in positions.chunks_exact(3) {
        let [v0, v1, v2] = [triangle[0], triangle[1], triangle[2]].map(Vec3::from);
        let normal: [f32; 3] = normalize_or_zero((v1 - v0).cross(&(v2 - v0))).into();
        normals.extend_from_slice(&[normal; 3]);
    }
    normals
}

/// Face normals summed per distinct position and renormalized
///
/// Positions are compared exactly after folding `-0.0` into `0.0`.
pub fn smooth(positions: &[[f32; 3]]) -> Vec<[f32; 3]> {
    let faces = facet(positions);
    let mut sums: HashMap<[u32; 3], Vec3> = HashMap::new();
    for (position, face) in positions.iter().zip(&faces) {
        *sums.entry(position_key(position)).or_insert_with(Vec3::zeros) += Vec3::from(*face);
    }
    positions
        .iter()
        .map(|position| {
            let sum = sums.get(&position_key(position)).copied().unwrap_or_else(Vec3::zeros);
            normalize_or_zero(sum).into()
        })
        .collect()
}

/// Unit vector from the origin through each position
pub fn sphere(positions: &[[f32; 3]]) -> Vec<[f32; 3]> {
    positions
        .iter()
        .map(|&position| normalize_or_zero(Vec3::from(position)).into())
        .collect()
}

fn position_key(position: &[f32; 3]) -> [u32; 3] {
    position.map(|component| canonical_zero(component).to_bits())
}
