// ==============================================================================
// math.rs — SHARED MATH HELPERS (PLANAR VECTORS + SMOOTHING)
// ==============================================================================

use nalgebra::Vector3;
use std::f32::consts::{PI, TAU};

pub type Vec3 = Vector3<f32>;

/// Frames per second the per-frame tunables (drag, damping) were tuned at.
pub const REFERENCE_HZ: f32 = 60.0;

// ----- heading basis (yaw 0 faces +Z, +X is right) -----
#[inline]
pub fn forward_vector(heading: f32) -> Vec3 {
    Vec3::new(heading.sin(), 0.0, heading.cos())
}

#[inline]
pub fn right_vector(heading: f32) -> Vec3 {
    Vec3::new(heading.cos(), 0.0, -heading.sin())
}

/// Distance in the ground (XZ) plane, ignoring height.
#[inline]
pub fn planar_distance(a: &Vec3, b: &Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Exponential approach of `current` toward `target` at `rate` (1/s).
/// The blend factor saturates at 1 so a large `dt` lands on the target
/// instead of overshooting.
#[inline]
pub fn approach(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * (rate * dt).clamp(0.0, 1.0)
}

/// Per-frame factor `f` applied for `dt` seconds at the reference rate.
#[inline]
pub fn per_frame_decay(factor: f32, dt: f32) -> f32 {
    factor.powf(dt * REFERENCE_HZ)
}

/// Wrap an angle into [-PI, PI).
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    (a + PI).rem_euclid(TAU) - PI
}

/// Wrap `value` into `[-half, half)` of a window of size `2 * half`.
#[inline]
pub fn wrap_centered(value: f32, window: f32) -> f32 {
    let half = window * 0.5;
    if (-half..=half).contains(&value) {
        return value;
    }
    (value + half).rem_euclid(window) - half
}

/// Replace NaN / infinities with `fallback`.
#[inline]
pub fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_is_orthonormal() {
        for h in [0.0_f32, 0.4, -1.3, 2.9] {
            let f = forward_vector(h);
            let r = right_vector(h);
            assert!((f.norm() - 1.0).abs() < 1e-6);
            assert!((r.norm() - 1.0).abs() < 1e-6);
            assert!(f.dot(&r).abs() < 1e-6);
        }
        // heading 0 looks down +Z with +X on the right
        assert!((forward_vector(0.0) - Vec3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
        assert!((right_vector(0.0) - Vec3::new(1.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn approach_saturates() {
        assert_eq!(approach(0.0, 1.0, 100.0, 1.0), 1.0);
        assert_eq!(approach(0.5, 1.0, 3.0, 0.0), 0.5);
        let half = approach(0.0, 1.0, 5.0, 0.1);
        assert!((half - 0.5).abs() < 1e-6);
    }

    #[test]
    fn wrap_centered_stays_in_window() {
        assert_eq!(wrap_centered(10.0, 800.0), 10.0);
        assert!((wrap_centered(401.0, 800.0) - -399.0).abs() < 1e-3);
        assert!((wrap_centered(-401.0, 800.0) - 399.0).abs() < 1e-3);
        let far = wrap_centered(2_950.0, 800.0);
        assert!(far.abs() <= 400.0);
    }

    #[test]
    fn wrap_angle_range() {
        let a = wrap_angle(3.0 * PI + 0.25);
        assert!((-PI..PI).contains(&a));
        assert!((a - (-PI + 0.25)).abs() < 1e-4);
    }
}
