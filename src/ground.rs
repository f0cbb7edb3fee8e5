// ==============================================================================
// ground.rs — GROUND HEIGHT QUERIES
// ------------------------------------------------------------------------------
// The integrator only ever asks "what is the ground height at (x, z)?". A miss
// (None) is a normal outcome and sends the car down the gravity fallback.
//
// Providers:
// - FlatGround:  constant height everywhere (tests, menus, flat tracks)
// - NoGround:    always misses
// - FnGround:    wraps any Fn(x, z) -> Option<f32> (heightmaps owned elsewhere)
// - RapierGround: downward raycast against a static rapier3d collider set
//   (ground slab, ramps, boxes), same cast the suspension pass used to make
// ==============================================================================

use rapier3d::prelude::*;

pub trait GroundSampler {
    /// World-space ground height under `(x, z)`, or `None` when nothing is hit.
    fn sample_height(&self, x: f32, z: f32) -> Option<f32>;
}

#[derive(Debug, Clone, Copy)]
pub struct FlatGround {
    pub height: f32,
}

impl GroundSampler for FlatGround {
    fn sample_height(&self, _x: f32, _z: f32) -> Option<f32> {
        Some(self.height)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoGround;

impl GroundSampler for NoGround {
    fn sample_height(&self, _x: f32, _z: f32) -> Option<f32> {
        None
    }
}

pub struct FnGround<F>(pub F);

impl<F> GroundSampler for FnGround<F>
where
    F: Fn(f32, f32) -> Option<f32>,
{
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        (self.0)(x, z)
    }
}

/// Static collision geometry answered by raycasts.
pub struct RapierGround {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    query_pipeline: QueryPipeline,
    probe_top: f32,   // y the downward ray starts from
    probe_depth: f32, // how far below probe_top the ray reaches
}

impl RapierGround {
    pub fn new(probe_top: f32, probe_depth: f32) -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            probe_top,
            probe_depth,
        }
    }

    /// A square slab of `half_extent` whose top surface is exactly y = 0.
    pub fn flat_slab(half_extent: f32) -> Self {
        let mut ground = Self::new(100.0, 200.0);
        ground.add_box([0.0, -0.1, 0.0], [half_extent, 0.1, half_extent], 0.0);
        ground
    }

    /// Adds a fixed box; `pitch` tilts it around X (ramps).
    pub fn add_box(&mut self, center: [f32; 3], half_extents: [f32; 3], pitch: f32) -> ColliderHandle {
        let rb = RigidBodyBuilder::fixed()
            .translation(vector![center[0], center[1], center[2]])
            .rotation(vector![pitch, 0.0, 0.0])
            .build();
        let handle = self.bodies.insert(rb);

        let [hx, hy, hz] = half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .friction(1.2)
            .restitution(0.0)
            .build();
        let collider_handle = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        self.query_pipeline.update(&self.colliders);

        tracing::debug!(
            colliders = self.colliders.len(),
            "ground box added at ({:.1}, {:.1}, {:.1})",
            center[0], center[1], center[2]
        );
        collider_handle
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

impl GroundSampler for RapierGround {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        let ray = Ray::new(point![x, self.probe_top, z], vector![0.0, -1.0, 0.0]);

        let (_hit, toi) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            self.probe_depth,
            true,
            QueryFilter::default(),
        )?;

        Some(self.probe_top - toi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_and_empty_providers() {
        assert_eq!(FlatGround { height: 2.5 }.sample_height(10.0, -4.0), Some(2.5));
        assert_eq!(NoGround.sample_height(0.0, 0.0), None);
    }

    #[test]
    fn closure_provider() {
        let ramp = FnGround(|_x: f32, z: f32| if z >= 0.0 { Some(z * 0.1) } else { None });
        assert_eq!(ramp.sample_height(0.0, 20.0), Some(2.0));
        assert_eq!(ramp.sample_height(0.0, -1.0), None);
    }

    #[test]
    fn slab_top_is_zero() {
        let ground = RapierGround::flat_slab(50.0);
        let h = ground.sample_height(3.0, -7.0).expect("slab should be hit");
        assert!(h.abs() < 1e-3, "height was {h}");
    }

    #[test]
    fn off_the_slab_misses() {
        let ground = RapierGround::flat_slab(50.0);
        assert_eq!(ground.sample_height(80.0, 0.0), None);
    }

    #[test]
    fn raised_box_reports_its_top() {
        let mut ground = RapierGround::flat_slab(50.0);
        ground.add_box([0.0, 1.5, 20.0], [3.0, 0.5, 3.0], 0.0);
        assert_eq!(ground.collider_count(), 2);

        let on_box = ground.sample_height(0.0, 20.0).expect("box should be hit");
        assert!((on_box - 2.0).abs() < 1e-3);
        let beside = ground.sample_height(10.0, 20.0).expect("slab should be hit");
        assert!(beside.abs() < 1e-3);
    }
}
