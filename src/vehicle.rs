// ==============================================================================
// vehicle.rs — PLAYER VEHICLE STATE + PER-TICK INTEGRATOR
// ==============================================================================
// One VehicleIntegrator owns one VehicleState and is the only thing that
// mutates it (update + on_collision + respawn).
//
// Per tick, in order:
//   1) longitudinal: throttle / brake / coasting drag, clamp to [reverse_max, max_speed]
//   2) steering:     exponential approach of the wheel toward steer_axis * max_steer
//   3) heading:      yaw ∝ steer * speed fraction * speed-dependent turn factor
//   4) drift:        self-damping lateral slide (cosmetic, never a force)
//   5) position:     forward * speed, plus a fraction of the slide sideways
//   6) ground:       follow sampled height + ride height, or fall when it misses
//   7) body tilt:    roll from steer, pitch from pedals + terrain, both smoothed
//   8) cooldown:     damage flash timer counts down
//
// Drag and lateral damping are per-60Hz-frame factors raised to dt*60 so the
// feel does not depend on the host frame rate.
// ==============================================================================

use serde::Serialize;

use crate::config::VehicleConfig;
use crate::control::ControlSurface;
use crate::error::ConfigError;
use crate::ground::GroundSampler;
use crate::math::{
    REFERENCE_HZ, Vec3, approach, finite_or, forward_vector, per_frame_decay, right_vector,
    wrap_angle,
};

pub const MAX_HEALTH: u32 = 100;

/// Coasting speeds below this snap to a standstill.
const STOP_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleState {
    pub position: Vec3,
    pub heading: f32,         // radians, 0 faces +Z
    pub speed: f32,           // signed forward speed
    pub steer_angle: f32,     // radians, smoothed
    pub lateral_offset: f32,  // cosmetic slide, decays to 0
    pub health: u32,          // 0..=100
    pub damage_cooldown: f32, // seconds left on the hit flash
    pub body_roll: f32,       // radians, cosmetic
    pub body_pitch: f32,      // radians, nose up positive
    pub terrain_pitch: f32,   // radians, from the ground probe ahead
    pub grounded: bool,       // last ground sample was a hit
}

impl VehicleState {
    pub fn spawn(position: Vec3, heading: f32) -> Self {
        Self {
            position,
            heading,
            speed: 0.0,
            steer_angle: 0.0,
            lateral_offset: 0.0,
            health: MAX_HEALTH,
            damage_cooldown: 0.0,
            body_roll: 0.0,
            body_pitch: 0.0,
            terrain_pitch: 0.0,
            grounded: false,
        }
    }
}

/// Outcome of one `on_collision` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Impact {
    pub impact: u32, // 0..=100
    pub damage: u32, // health actually requested off (before the 0 floor)
}

pub struct VehicleIntegrator {
    config: VehicleConfig,
    state: VehicleState,
    spawn_position: Vec3,
    spawn_heading: f32,
}

impl VehicleIntegrator {
    pub fn new(config: VehicleConfig, spawn_position: Vec3, spawn_heading: f32) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: VehicleState::spawn(spawn_position, spawn_heading),
            spawn_position,
            spawn_heading,
        })
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Hosts that need to place the car (teleports, tests) go through here.
    pub fn state_mut(&mut self) -> &mut VehicleState {
        &mut self.state
    }

    /// Level retry: every field back to spawn defaults.
    pub fn respawn(&mut self) {
        self.state = VehicleState::spawn(self.spawn_position, self.spawn_heading);
        tracing::debug!("vehicle respawned");
    }

    /// Clamp a host-supplied dt into [0, max_dt]. Non-finite input counts as 0.
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if !dt.is_finite() {
            tracing::warn!("non-finite dt {dt} treated as 0");
            return 0.0;
        }
        dt.clamp(0.0, self.config.max_dt)
    }

    // ==========================================================================
    // Per-tick integration
    // ==========================================================================
    pub fn update(&mut self, control: &ControlSurface, dt: f32, ground: Option<&dyn GroundSampler>) {
        let cfg = self.config;
        let dt = self.clamp_dt(dt);
        let ctrl = control.sanitized();
        let s = &mut self.state;

        // ------------------------------------------------------------
        // 1) Longitudinal. Drag only applies while coasting.
        // ------------------------------------------------------------
        if ctrl.throttle_active() {
            s.speed += cfg.accel * ctrl.throttle * dt;
        } else if ctrl.brake_active() {
            s.speed -= cfg.brake * ctrl.brake * dt;
        } else {
            s.speed *= per_frame_decay(cfg.drag, dt);
            if s.speed.abs() < STOP_EPSILON {
                s.speed = 0.0;
            }
        }
        s.speed = s.speed.clamp(cfg.reverse_max, cfg.max_speed);

        // ------------------------------------------------------------
        // 2) Steering: approach the target, never more than max_steer per tick
        // ------------------------------------------------------------
        let target = ctrl.steer_axis * cfg.max_steer;
        let step = ((target - s.steer_angle) * (cfg.steer_speed * dt).min(1.0))
            .clamp(-cfg.max_steer, cfg.max_steer);
        s.steer_angle = (s.steer_angle + step).clamp(-cfg.max_steer, cfg.max_steer);

        // ------------------------------------------------------------
        // 3) Heading. A stationary car does not spin in place.
        // ------------------------------------------------------------
        let speed_frac = s.speed / cfg.max_speed;
        let turn_factor =
            1.0 + (s.speed.abs() / cfg.turn_factor_speed_divisor).min(cfg.turn_factor_cap);
        s.heading = wrap_angle(s.heading + s.steer_angle * speed_frac * dt * cfg.yaw_gain * turn_factor);

        // ------------------------------------------------------------
        // 4) Drift slide
        // ------------------------------------------------------------
        let gain = if ctrl.drift { cfg.drift_gain } else { cfg.normal_gain };
        s.lateral_offset += -s.steer_angle * speed_frac.abs() * gain * dt * cfg.drift_scale;
        s.lateral_offset *= per_frame_decay(cfg.lateral_damping, dt);

        // ------------------------------------------------------------
        // 5) Position
        // ------------------------------------------------------------
        let forward = forward_vector(s.heading);
        let right = right_vector(s.heading);
        let frames = dt * REFERENCE_HZ;
        s.position += forward * (s.speed * cfg.move_scale * frames);
        s.position += right * (s.lateral_offset * cfg.lateral_to_position_scale * frames);

        // ------------------------------------------------------------
        // 6) Ground follow / fallback gravity
        // ------------------------------------------------------------
        if let Some(ground) = ground {
            follow_ground(s, &cfg, ground, forward, dt);
        }

        // ------------------------------------------------------------
        // 7) Body tilt
        // ------------------------------------------------------------
        let roll_speed = (s.speed.abs() / (cfg.max_speed * cfg.roll_speed_frac)).min(1.0);
        let roll_target = -s.steer_angle * roll_speed * cfg.tilt_factor;
        let pedal_pitch = if ctrl.throttle_active() {
            cfg.pitch_factor * ctrl.throttle
        } else if ctrl.brake_active() {
            -cfg.pitch_factor * ctrl.brake
        } else {
            0.0
        };
        let pitch_target = s.terrain_pitch + pedal_pitch;
        s.body_roll = approach(s.body_roll, roll_target, cfg.body_smoothing, dt);
        s.body_pitch = approach(s.body_pitch, pitch_target, cfg.body_smoothing, dt);

        // ------------------------------------------------------------
        // 8) Damage flash
        // ------------------------------------------------------------
        s.damage_cooldown = (s.damage_cooldown - dt).max(0.0);
    }

    // ==========================================================================
    // Collision response
    // ==========================================================================
    /// Applies damage, knockback and speed loss for one hit. Always succeeds;
    /// health floors at 0.
    pub fn on_collision(&mut self, relative_speed: f32) -> Impact {
        let cfg = &self.config;
        let s = &mut self.state;

        let rel = finite_or(relative_speed.abs(), 0.0);
        let impact = (rel * cfg.impact_gain).round().min(MAX_HEALTH as f32);
        let damage = (impact * cfg.damage_factor).round();
        let (impact, damage) = (impact as u32, damage as u32);

        s.health = s.health.saturating_sub(damage);
        s.damage_cooldown = cfg.damage_flash_duration;
        s.position -= forward_vector(s.heading) * cfg.knockback;
        s.speed *= cfg.collision_speed_loss;

        tracing::debug!(
            relative_speed = rel,
            impact,
            damage,
            health = s.health,
            "player hit"
        );

        Impact { impact, damage }
    }

    // ==========================================================================
    // Derived read-only values for the HUD
    // ==========================================================================
    pub fn approx_speed_kmh(&self) -> f32 {
        self.state.speed.abs() * 3.6 * self.config.display_scale
    }

    /// 0 while gripping, 1 at a full slide.
    pub fn skid_level(&self) -> f32 {
        ((self.state.lateral_offset.abs() - self.config.skid_threshold) / self.config.skid_range)
            .clamp(0.0, 1.0)
    }

    pub fn just_hit(&self) -> bool {
        self.state.damage_cooldown > 0.0
    }

    pub fn is_wrecked(&self) -> bool {
        self.state.health == 0
    }
}

/// Moves `y` toward the sampled ground, or lets the car sink when the sample
/// misses. Samples more than `ground_snap_up` above the car count as misses.
fn follow_ground(s: &mut VehicleState, cfg: &VehicleConfig, ground: &dyn GroundSampler, forward: Vec3, dt: f32) {
    let y = s.position.y;
    let reachable = |h: f32| h.is_finite() && h + cfg.ride_height - y <= cfg.ground_snap_up;

    let center = ground
        .sample_height(s.position.x, s.position.z)
        .filter(|&h| reachable(h));

    match center {
        Some(h) => {
            s.grounded = true;
            s.position.y = approach(s.position.y, h + cfg.ride_height, cfg.ground_follow_rate, dt);

            let ahead = s.position + forward * cfg.ground_probe_ahead;
            let ahead_h = ground
                .sample_height(ahead.x, ahead.z)
                .filter(|&h| reachable(h));
            let pitch = match ahead_h {
                Some(ha) if cfg.ground_probe_ahead > 0.0 => (ha - h).atan2(cfg.ground_probe_ahead),
                _ => 0.0,
            };
            s.terrain_pitch = approach(s.terrain_pitch, pitch, cfg.ground_follow_rate, dt);
        }
        None => {
            s.grounded = false;
            s.position.y -= cfg.fallback_fall_speed * dt;
            s.terrain_pitch = approach(s.terrain_pitch, 0.0, cfg.ground_follow_rate, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ARCADE;
    use crate::ground::{FlatGround, NoGround};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const DT: f32 = 1.0 / 60.0;

    fn car() -> VehicleIntegrator {
        VehicleIntegrator::new(ARCADE, Vec3::new(0.0, 0.5, 0.0), 0.0).unwrap()
    }

    fn throttle() -> ControlSurface {
        ControlSurface { throttle: 1.0, ..ControlSurface::NEUTRAL }
    }

    #[test]
    fn construction_rejects_bad_config() {
        let bad = VehicleConfig { max_speed: -1.0, ..ARCADE };
        assert!(VehicleIntegrator::new(bad, Vec3::zeros(), 0.0).is_err());
    }

    #[test]
    fn spawn_defaults() {
        let v = car();
        let s = v.state();
        assert_eq!(s.speed, 0.0);
        assert_eq!(s.steer_angle, 0.0);
        assert_eq!(s.health, MAX_HEALTH);
        assert_eq!(s.damage_cooldown, 0.0);
    }

    #[test]
    fn bounds_hold_under_random_input() {
        let mut v = car();
        let mut rng = StdRng::seed_from_u64(7);
        let ground = FlatGround { height: 0.0 };
        for _ in 0..5_000 {
            let ctrl = ControlSurface {
                throttle: rng.gen_range(-0.5..1.5),
                brake: rng.gen_range(-0.5..1.5),
                steer_axis: rng.gen_range(-3.0..3.0),
                drift: rng.gen_bool(0.3),
            };
            let dt = rng.gen_range(0.0..0.2);
            v.update(&ctrl, dt, Some(&ground));
            if rng.gen_bool(0.01) {
                v.on_collision(rng.gen_range(-40.0..40.0));
            }

            let s = v.state();
            assert!(s.speed >= ARCADE.reverse_max && s.speed <= ARCADE.max_speed);
            assert!(s.steer_angle.abs() <= ARCADE.max_steer);
            assert!(s.health <= MAX_HEALTH);
            assert!(s.damage_cooldown >= 0.0);
            assert!(s.body_roll.abs() <= ARCADE.max_steer * ARCADE.tilt_factor + 1e-6);
            assert!(s.position.iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn zero_dt_changes_nothing() {
        let mut v = car();
        for _ in 0..30 {
            v.update(&ControlSurface { throttle: 1.0, steer_axis: 0.7, drift: true, ..ControlSurface::NEUTRAL }, DT, None);
        }
        let before = *v.state();
        v.update(&ControlSurface { brake: 1.0, steer_axis: -1.0, ..ControlSurface::NEUTRAL }, 0.0, Some(&NoGround));
        let after = v.state();
        assert!((after.position - before.position).norm() < 1e-6);
        assert!((after.speed - before.speed).abs() < 1e-6);
        assert!((after.steer_angle - before.steer_angle).abs() < 1e-6);
    }

    #[test]
    fn coasting_decays_monotonically_to_zero() {
        let mut v = car();
        v.state_mut().speed = 30.0;
        let mut last = v.state().speed.abs();
        for _ in 0..2_000 {
            v.update(&ControlSurface::NEUTRAL, DT, None);
            let now = v.state().speed.abs();
            assert!(now <= last);
            last = now;
        }
        assert_eq!(last, 0.0);

        // reverse coasting decays the same way
        v.state_mut().speed = -6.0;
        for _ in 0..2_000 {
            v.update(&ControlSurface::NEUTRAL, DT, None);
        }
        assert_eq!(v.state().speed, 0.0);
    }

    #[test]
    fn brake_runs_into_reverse_and_clamps() {
        let mut v = car();
        for _ in 0..600 {
            v.update(&ControlSurface { brake: 1.0, ..ControlSurface::NEUTRAL }, DT, None);
        }
        assert_eq!(v.state().speed, ARCADE.reverse_max);
    }

    #[test]
    fn steering_step_is_bounded() {
        let mut v = car();
        let cfg = VehicleConfig { steer_speed: 1_000.0, max_dt: 1.0, ..ARCADE };
        let mut fast = VehicleIntegrator::new(cfg, Vec3::zeros(), 0.0).unwrap();
        for (i, axis) in [1.0, -1.0, 1.0, -1.0, 0.0].into_iter().enumerate() {
            for integrator in [&mut v, &mut fast] {
                let before = integrator.state().steer_angle;
                integrator.update(&ControlSurface { steer_axis: axis, ..ControlSurface::NEUTRAL }, 0.05 * (i + 1) as f32, None);
                let delta = (integrator.state().steer_angle - before).abs();
                assert!(delta <= integrator.config().max_steer + 1e-6, "delta {delta}");
            }
        }
    }

    #[test]
    fn stationary_car_does_not_turn() {
        let mut v = car();
        for _ in 0..120 {
            v.update(&ControlSurface { steer_axis: 1.0, ..ControlSurface::NEUTRAL }, DT, None);
        }
        assert_eq!(v.state().heading, 0.0);
        assert!(v.state().steer_angle > 0.5);
    }

    #[test]
    fn steering_right_turns_toward_positive_x() {
        let mut v = car();
        v.state_mut().speed = 20.0;
        for _ in 0..60 {
            v.update(&ControlSurface { throttle: 0.5, steer_axis: 1.0, ..ControlSurface::NEUTRAL }, DT, None);
        }
        assert!(v.state().heading > 0.0);
        assert!(v.state().position.x > 0.0);
        // the slide goes to the outside of the turn
        assert!(v.state().lateral_offset < 0.0);
    }

    #[test]
    fn drift_slides_further_than_grip() {
        let run = |drift: bool| {
            let mut v = car();
            v.state_mut().speed = 30.0;
            for _ in 0..30 {
                v.update(&ControlSurface { throttle: 1.0, steer_axis: 1.0, drift, ..ControlSurface::NEUTRAL }, DT, None);
            }
            v.state().lateral_offset.abs()
        };
        assert!(run(true) > run(false));
    }

    #[test]
    fn slide_decays_when_steering_released() {
        let mut v = car();
        v.state_mut().lateral_offset = 0.8;
        for _ in 0..300 {
            v.update(&ControlSurface::NEUTRAL, DT, None);
        }
        assert!(v.state().lateral_offset.abs() < 1e-4);
        assert_eq!(v.skid_level(), 0.0);
    }

    #[test]
    fn ground_follow_settles_at_ride_height() {
        let mut v = car();
        v.state_mut().position.y = 3.0;
        let ground = FlatGround { height: 1.0 };
        for _ in 0..240 {
            v.update(&ControlSurface::NEUTRAL, DT, Some(&ground));
        }
        assert!(v.state().grounded);
        assert!((v.state().position.y - (1.0 + ARCADE.ride_height)).abs() < 1e-3);
        assert!(v.state().terrain_pitch.abs() < 1e-6);
    }

    #[test]
    fn uphill_pitches_nose_up() {
        let mut v = car();
        let slope = crate::ground::FnGround(|_x: f32, z: f32| Some(z * 0.2));
        v.state_mut().speed = 10.0;
        for _ in 0..120 {
            v.update(&ControlSurface::NEUTRAL, DT, Some(&slope));
        }
        assert!(v.state().terrain_pitch > 0.1);
        assert!(v.state().body_pitch > 0.0);
    }

    #[test]
    fn wall_tops_are_not_snapped_onto() {
        let mut v = car();
        let wall = FlatGround { height: 30.0 };
        let y0 = v.state().position.y;
        v.update(&ControlSurface::NEUTRAL, DT, Some(&wall));
        assert!(!v.state().grounded);
        assert!(v.state().position.y < y0);
    }

    #[test]
    fn head_on_collision_numbers() {
        let mut v = car();
        v.state_mut().speed = 20.0;
        let hit = v.on_collision(10.0);
        assert_eq!(hit, Impact { impact: 60, damage: 36 });
        assert_eq!(v.state().health, 64);
        assert!((v.state().speed - 20.0 * ARCADE.collision_speed_loss).abs() < 1e-5);
        assert_eq!(v.state().damage_cooldown, ARCADE.damage_flash_duration);
        assert!(v.just_hit());
        // knocked back along -heading
        assert!((v.state().position.z - -ARCADE.knockback).abs() < 1e-5);
    }

    #[test]
    fn impact_is_capped_at_100() {
        let mut v = car();
        let hit = v.on_collision(-1_000.0);
        assert_eq!(hit.impact, 100);
        assert_eq!(hit.damage, 60);
        assert_eq!(v.state().health, 40);
    }

    #[test]
    fn damage_never_heals_and_floors_at_zero() {
        let mut v = car();
        let mut last = v.state().health;
        for _ in 0..10 {
            v.on_collision(12.0);
            let h = v.state().health;
            assert!(h <= last);
            last = h;
        }
        assert_eq!(last, 0);
        assert!(v.is_wrecked());
        v.on_collision(f32::NAN);
        v.on_collision(50.0);
        assert_eq!(v.state().health, 0);
    }

    #[test]
    fn cooldown_counts_down() {
        let mut v = car();
        v.on_collision(5.0);
        for _ in 0..60 {
            v.update(&ControlSurface::NEUTRAL, DT, None);
        }
        assert_eq!(v.state().damage_cooldown, 0.0);
        assert!(!v.just_hit());
    }

    #[test]
    fn respawn_restores_defaults() {
        let mut v = car();
        for _ in 0..60 {
            v.update(&throttle(), DT, None);
        }
        v.on_collision(20.0);
        v.respawn();
        assert_eq!(*v.state(), VehicleState::spawn(Vec3::new(0.0, 0.5, 0.0), 0.0));
    }

    #[test]
    fn non_finite_dt_is_ignored() {
        let mut v = car();
        v.update(&throttle(), f32::NAN, None);
        v.update(&throttle(), f32::INFINITY, None);
        v.update(&throttle(), -1.0, None);
        assert_eq!(v.state().speed, 0.0);
    }

    #[test]
    fn hud_speed() {
        let mut v = car();
        v.state_mut().speed = -10.0;
        assert!((v.approx_speed_kmh() - 36.0).abs() < 1e-4);
    }
}
