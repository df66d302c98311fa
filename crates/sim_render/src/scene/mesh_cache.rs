//! Shared mesh cache
//!
//! Generating a mesh for a simulation shape (fetching triangles, deriving
//! normals and UVs, uploading) is expensive, and many bodies share a shape.
//! The [`MeshCache`] keeps one mesh per `(shape, summary)` pair, where the
//! [`ShapeSummary`] captures every input that affects the generated vertices.
//!
//! Entries are weak. A mesh lives exactly as long as some drawable holds it;
//! once the last holder goes, its GPU objects are released (explicitly by the
//! render set, or via the reaper) and the entry is dead until pruned or
//! replaced by a fresh miss.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use log::{debug, trace};

use crate::foundation::math::utils::canonical_zero;
use crate::physics::{Resolution, ShapeHandle, SimulationWorld};
use crate::render::error::{CacheConsistencyError, RenderResult};
use crate::render::mesh::{GpuMesh, SharedMesh};
use crate::render::primitives::{NormalStrategy, UvCoefficients, UvStrategy};
use crate::render::reaper::ReaperHandle;

/// Every input that shapes a generated mesh
///
/// Compared structurally. UV coefficients compare by canonical bit pattern,
/// so `-0.0` equals `0.0` and two summaries are equal exactly when they
/// would generate identical vertex data.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSummary {
    resolution: Resolution,
    normals: NormalStrategy,
    uv: Option<(UvStrategy, UvCoefficients)>,
}

impl ShapeSummary {
    /// Validate and build a summary
    ///
    /// A UV strategy and its coefficients must be given together, and every
    /// coefficient must be finite.
    pub fn new(
        resolution: Resolution,
        normals: NormalStrategy,
        uv_strategy: Option<UvStrategy>,
        uv_coefficients: Option<UvCoefficients>,
    ) -> Result<Self, CacheConsistencyError> {
        let uv = match (uv_strategy, uv_coefficients) {
            (None, None) => None,
            (Some(_), None) => return Err(CacheConsistencyError::MissingUvCoefficients),
            (None, Some(_)) => return Err(CacheConsistencyError::UvCoefficientsWithoutStrategy),
            (Some(strategy), Some(coefficients)) => {
                if let Some(index) = coefficients.to_array().iter().position(|c| !c.is_finite()) {
                    return Err(CacheConsistencyError::NonFiniteCoefficient { index });
                }
                Some((strategy, coefficients))
            }
        };
        Ok(Self { resolution, normals, uv })
    }

    /// Summary without texture coordinates
    pub const fn untextured(resolution: Resolution, normals: NormalStrategy) -> Self {
        Self { resolution, normals, uv: None }
    }

    /// Requested tessellation
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Normal strategy
    pub const fn normals(&self) -> NormalStrategy {
        self.normals
    }

    /// UV strategy and coefficients, if any
    pub const fn uv(&self) -> Option<(UvStrategy, UvCoefficients)> {
        self.uv
    }

    fn uv_key(&self) -> Option<(UvStrategy, [u32; 8])> {
        self.uv
            .map(|(strategy, coefficients)| (strategy, coefficients.to_array().map(|c| canonical_zero(c).to_bits())))
    }
}

impl PartialEq for ShapeSummary {
    fn eq(&self, other: &Self) -> bool {
        self.resolution == other.resolution && self.normals == other.normals && self.uv_key() == other.uv_key()
    }
}

impl Eq for ShapeSummary {}

impl Hash for ShapeSummary {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolution.hash(state);
        self.normals.hash(state);
        self.uv_key().hash(state);
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from the cache
    pub hits: usize,
    /// Requests that generated a mesh
    pub misses: usize,
    /// Entries whose mesh is still alive
    pub live_entries: usize,
}

/// Weak cache of generated meshes, keyed by shape then summary
#[derive(Debug)]
pub struct MeshCache {
    entries: HashMap<ShapeHandle, HashMap<ShapeSummary, Weak<RefCell<GpuMesh>>>>,
    reaper: ReaperHandle,
    hits: usize,
    misses: usize,
}

impl MeshCache {
    /// Create an empty cache; generated meshes report drops to `reaper`
    pub fn new(reaper: ReaperHandle) -> Self {
        Self { entries: HashMap::new(), reaper, hits: 0, misses: 0 }
    }

    /// Mesh for a shape under a summary, generating it on a miss
    ///
    /// # Arguments
    /// * `world` - Simulation answering the geometry query
    /// * `shape` - Shape to render
    /// * `summary` - Generation inputs
    ///
    /// # Returns
    /// The same `Rc` for equal `(shape, summary)` pairs for as long as any
    /// holder keeps the previous result alive
    pub fn mesh_for_shape(&mut self, world: &dyn SimulationWorld, shape: ShapeHandle, summary: &ShapeSummary) -> RenderResult<SharedMesh> {
        if let Some(mesh) = self
            .entries
            .get(&shape)
            .and_then(|by_summary| by_summary.get(summary))
            .and_then(Weak::upgrade)
        {
            self.hits += 1;
            trace!("Mesh cache hit for shape {}", shape.0);
            return Ok(mesh);
        }

        let geometry = world
            .shape_geometry(shape, summary.resolution)
            .ok_or(CacheConsistencyError::UnknownShape(shape))?;
        let mut stream = geometry.into_stream()?;
        stream.generate_normals(summary.normals)?;
        if let Some((strategy, coefficients)) = &summary.uv {
            stream.generate_uvs(*strategy, coefficients)?;
        }

        let mesh = GpuMesh::with_reaper(stream, self.reaper.clone()).cached().into_shared();
        self.entries.entry(shape).or_default().insert(*summary, Rc::downgrade(&mesh));
        self.misses += 1;
        debug!("Generated mesh for shape {} ({:?}, {:?})", shape.0, summary.resolution, summary.normals);
        Ok(mesh)
    }

    /// Drop entries whose mesh has died
    ///
    /// # Returns
    /// Number of entries removed
    pub fn prune(&mut self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, by_summary| {
            let before = by_summary.len();
            by_summary.retain(|_, mesh| mesh.strong_count() > 0);
            removed += before - by_summary.len();
            !by_summary.is_empty()
        });
        removed
    }

    /// Counters and live entry count
    pub fn stats(&self) -> CacheStats {
        let live_entries = self
            .entries
            .values()
            .flat_map(HashMap::values)
            .filter(|mesh| mesh.strong_count() > 0)
            .count();
        CacheStats { hits: self.hits, misses: self.misses, live_entries }
    }

    /// Forget every entry; live meshes stay with their holders
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{ShapeDesc, SimpleWorld};
    use crate::render::error::RenderError;
    use crate::render::reaper::ResourceReaper;

    fn unit_soup() -> ShapeDesc {
        ShapeDesc::TriangleSoup(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
    }

    #[test]
    fn test_summary_validation() {
        let coefficients = UvCoefficients::planar_xy(1.0);
        assert_eq!(
            ShapeSummary::new(Resolution::Low, NormalStrategy::None, Some(UvStrategy::Linear), None).unwrap_err(),
            CacheConsistencyError::MissingUvCoefficients
        );
        assert_eq!(
            ShapeSummary::new(Resolution::Low, NormalStrategy::None, None, Some(coefficients)).unwrap_err(),
            CacheConsistencyError::UvCoefficientsWithoutStrategy
        );
        let bad = UvCoefficients::new([0.0, f32::NAN, 0.0, 0.0], [0.0; 4]);
        assert_eq!(
            ShapeSummary::new(Resolution::Low, NormalStrategy::None, Some(UvStrategy::Linear), Some(bad)).unwrap_err(),
            CacheConsistencyError::NonFiniteCoefficient { index: 1 }
        );
    }

    #[test]
    fn test_summary_equality_folds_signed_zero() {
        let positive = UvCoefficients::new([0.0; 4], [1.0, 0.0, 0.0, 0.0]);
        let negative = UvCoefficients::new([-0.0; 4], [1.0, -0.0, 0.0, 0.0]);
        let a = ShapeSummary::new(Resolution::High, NormalStrategy::Smooth, Some(UvStrategy::Spherical), Some(positive)).unwrap();
        let b = ShapeSummary::new(Resolution::High, NormalStrategy::Smooth, Some(UvStrategy::Spherical), Some(negative)).unwrap();
        assert_eq!(a, b);

        let mut by_summary = HashMap::new();
        by_summary.insert(a, 1);
        assert_eq!(by_summary.get(&b), Some(&1), "equal summaries hash alike");
    }

    #[test]
    fn test_same_summary_returns_same_mesh() {
        let reaper = ResourceReaper::new();
        let mut cache = MeshCache::new(reaper.handle());
        let mut world = SimpleWorld::new();
        let shape = world.add_shape(unit_soup());
        let summary = ShapeSummary::untextured(Resolution::Low, NormalStrategy::Facet);

        let first = cache.mesh_for_shape(&world, shape, &summary).unwrap();
        let second = cache.mesh_for_shape(&world, shape, &summary).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(world.geometry_queries(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, live_entries: 1 });

        let other = ShapeSummary::untextured(Resolution::Low, NormalStrategy::Smooth);
        let third = cache.mesh_for_shape(&world, shape, &other).unwrap();
        assert!(!Rc::ptr_eq(&first, &third), "summary is part of the key");
    }

    #[test]
    fn test_dead_entries_regenerate_and_prune() {
        let reaper = ResourceReaper::new();
        let mut cache = MeshCache::new(reaper.handle());
        let mut world = SimpleWorld::new();
        let shape = world.add_shape(unit_soup());
        let summary = ShapeSummary::untextured(Resolution::Low, NormalStrategy::None);

        drop(cache.mesh_for_shape(&world, shape, &summary).unwrap());
        assert_eq!(cache.stats().live_entries, 0);
        assert_eq!(cache.prune(), 1);

        let _again = cache.mesh_for_shape(&world, shape, &summary).unwrap();
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_unknown_shape() {
        let reaper = ResourceReaper::new();
        let mut cache = MeshCache::new(reaper.handle());
        let world = SimpleWorld::new();
        let summary = ShapeSummary::untextured(Resolution::Low, NormalStrategy::None);
        assert_eq!(
            cache.mesh_for_shape(&world, ShapeHandle(7), &summary).unwrap_err(),
            RenderError::Cache(CacheConsistencyError::UnknownShape(ShapeHandle(7)))
        );
    }

    #[test]
    fn test_generated_mesh_has_requested_attributes() {
        let reaper = ResourceReaper::new();
        let mut cache = MeshCache::new(reaper.handle());
        let mut world = SimpleWorld::new();
        let shape = world.add_shape(ShapeDesc::Sphere { radius: 1.0 });
        let summary = ShapeSummary::new(
            Resolution::Low,
            NormalStrategy::Sphere,
            Some(UvStrategy::Spherical),
            Some(UvCoefficients::equirectangular()),
        )
        .unwrap();

        let mesh = cache.mesh_for_shape(&world, shape, &summary).unwrap();
        let mesh = mesh.borrow();
        assert!(mesh.stream().normals().is_some());
        assert!(mesh.stream().uvs().is_some());
    }
}
