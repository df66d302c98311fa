//! Texture coordinate generation
//!
//! Each coordinate is an affine function of a per-vertex triple `p`:
//! `u = a*p0 + b*p1 + c*p2 + d` (and likewise for `v`). The strategy decides
//! what `p` is.

use serde::{Deserialize, Serialize};

use crate::foundation::math::constants::{HALF_PI, PI};

/// Source of the triple fed to the UV coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UvStrategy {
    /// Cartesian position `(x, y, z)`
    Linear,
    /// `(r, azimuth / pi, elevation / (pi/2))` around the +Y axis
    ///
    /// Azimuth is `atan2(z, x)`, so both angle terms lie in `[-1, 1]`.
    Spherical,
}

/// Affine coefficients `(a, b, c, d)` for `u` and `v`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvCoefficients {
    /// Coefficients for `u`
    pub u: [f32; 4],
    /// Coefficients for `v`
    pub v: [f32; 4],
}

impl UvCoefficients {
    /// Create coefficients
    pub const fn new(u: [f32; 4], v: [f32; 4]) -> Self {
        Self { u, v }
    }

    /// Build from the eight values `u` first, then `v`
    pub const fn from_array(values: [f32; 8]) -> Self {
        Self {
            u: [values[0], values[1], values[2], values[3]],
            v: [values[4], values[5], values[6], values[7]],
        }
    }

    /// All eight values, `u` first
    pub const fn to_array(&self) -> [f32; 8] {
        let [a, b, c, d] = self.u;
        let [e, f, g, h] = self.v;
        [a, b, c, d, e, f, g, h]
    }

    /// Planar projection `u = x * scale, v = y * scale` plus 0.5 offsets
    pub const fn planar_xy(scale: f32) -> Self {
        Self::new([scale, 0.0, 0.0, 0.5], [0.0, scale, 0.0, 0.5])
    }

    /// Equirectangular wrap for [`UvStrategy::Spherical`]: both angles mapped to `[0, 1]`
    pub const fn equirectangular() -> Self {
        Self::new([0.0, 0.5, 0.0, 0.5], [0.0, 0.0, 0.5, 0.5])
    }

    fn apply(&self, p: [f32; 3]) -> [f32; 2] {
        let affine = |[a, b, c, d]: [f32; 4]| a * p[0] + b * p[1] + c * p[2] + d;
        [affine(self.u), affine(self.v)]
    }
}

/// Spherical triple for a position
pub fn spherical_triple([x, y, z]: [f32; 3]) -> [f32; 3] {
    let r = (x * x + y * y + z * z).sqrt();
    if r == 0.0 {
        return [0.0; 3];
    }
    let azimuth = z.atan2(x) / PI;
    let elevation = (y / r).clamp(-1.0, 1.0).asin() / HALF_PI;
    [r, azimuth, elevation]
}

/// One `[u, v]` pair per position
pub fn generate(strategy: UvStrategy, coefficients: &UvCoefficients, positions: &[[f32; 3]]) -> Vec<[f32; 2]> {
    positions
        .iter()
        .map(|&position| {
            let p = match strategy {
                UvStrategy::Linear => position,
                UvStrategy::Spherical => spherical_triple(position),
            };
            coefficients.apply(p)
        })
        .collect()
}
