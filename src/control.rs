use serde::{Deserialize, Serialize};

/// Normalized driver intent for one tick. Produced by the input layer,
/// read (never mutated) by the kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSurface {
    pub throttle: f32,   // 0..1
    pub brake: f32,      // 0..1
    pub steer_axis: f32, // -1 (left) .. 1 (right)
    pub drift: bool,
}

/// Device tilt below this many degrees is ignored.
const TILT_DEADZONE_DEG: f32 = 4.0;
/// Degrees of tilt for a full steering deflection.
const TILT_FULL_DEG: f32 = 45.0;
/// Degrees of on-screen wheel rotation for a full deflection.
const WHEEL_FULL_DEG: f32 = 90.0;

impl ControlSurface {
    pub const NEUTRAL: Self = Self {
        throttle: 0.0,
        brake: 0.0,
        steer_axis: 0.0,
        drift: false,
    };

    /// Digital buttons (keyboard / touch pads). Left and right cancel out.
    pub fn from_buttons(left: bool, right: bool, forward: bool, brake: bool) -> Self {
        let steer_axis = match (left, right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        Self {
            throttle: if forward { 1.0 } else { 0.0 },
            brake: if brake { 1.0 } else { 0.0 },
            steer_axis,
            drift: false,
        }
    }

    /// On-screen steering wheel rotated by `deg` (positive = clockwise).
    pub fn from_wheel_angle(deg: f32) -> Self {
        Self {
            steer_axis: unit_or_zero(deg / WHEEL_FULL_DEG).clamp(-1.0, 1.0),
            ..Self::NEUTRAL
        }
    }

    /// Adds device-tilt steering (gamma, degrees) on top of the current axis.
    pub fn with_tilt(mut self, gamma_deg: f32) -> Self {
        if gamma_deg.is_finite() && gamma_deg.abs() > TILT_DEADZONE_DEG {
            self.steer_axis = (self.steer_axis + gamma_deg / TILT_FULL_DEG).clamp(-1.0, 1.0);
        }
        self
    }

    pub fn with_drift(mut self, held: bool) -> Self {
        self.drift = held;
        self
    }

    /// Every field clamped into its documented domain; NaN reads as released.
    pub fn sanitized(&self) -> Self {
        Self {
            throttle: unit_or_zero(self.throttle).clamp(0.0, 1.0),
            brake: unit_or_zero(self.brake).clamp(0.0, 1.0),
            steer_axis: unit_or_zero(self.steer_axis).clamp(-1.0, 1.0),
            drift: self.drift,
        }
    }

    pub fn throttle_active(&self) -> bool {
        self.throttle > 0.0
    }

    pub fn brake_active(&self) -> bool {
        self.brake > 0.0
    }
}

#[inline]
fn unit_or_zero(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v }
}
