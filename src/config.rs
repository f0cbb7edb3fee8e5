// ==============================================================================
// config.rs — KERNEL TUNABLES (VEHICLE / TRAFFIC / COLLISION / LEVEL)
// ------------------------------------------------------------------------------
// Every numeric constant the integrator, traffic agents and resolver read lives
// here, with units. Configs are built once, validated once, then only read.
//
// - VehicleConfig:   longitudinal, steering, drift, body tilt, damage
// - TrafficConfig:   lanes, pool size, speed regulation, wrap window
// - CollisionConfig: bounding radii + separation margin
// - LevelConfig:     spawn pose, fall limit, optional finish zone
//
// All structs deserialize with `#[serde(default)]`, so a host can override a
// handful of fields from JSON and inherit the preset for the rest.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, finite, non_negative, positive, within};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    // --- Longitudinal ---
    pub max_speed: f32,           // units/s, forward clamp (> 0)
    pub reverse_max: f32,         // units/s, reverse clamp (<= 0)
    pub accel: f32,               // units/s² while throttle held
    pub brake: f32,               // units/s² while brake held (runs into reverse)
    pub drag: f32,                // per-60Hz-frame coasting multiplier (0..1]

    // --- Steering / yaw ---
    pub steer_speed: f32,         // 1/s, exponential approach rate of the wheel
    pub max_steer: f32,           // radians
    pub yaw_gain: f32,            // heading rad/s per rad of steer at max speed
    pub turn_factor_cap: f32,     // max extra yaw multiplier from speed
    pub turn_factor_speed_divisor: f32, // units/s per +1.0 of turn factor

    // --- Drift (cosmetic slide) ---
    pub drift_gain: f32,          // lateral gain while drift held
    pub normal_gain: f32,         // lateral gain otherwise
    pub drift_scale: f32,         // global multiplier on the slide
    pub lateral_damping: f32,     // per-60Hz-frame decay of the slide (0..1)
    pub lateral_to_position_scale: f32, // how much of the slide moves the car

    // --- Position ---
    pub move_scale: f32,          // position units per (speed unit · 60Hz frame)

    // --- Ground follow ---
    pub ride_height: f32,         // units above sampled ground
    pub ground_follow_rate: f32,  // 1/s, vertical approach rate
    pub ground_probe_ahead: f32,  // units ahead of center sampled for pitch
    pub ground_snap_up: f32,      // max units the car climbs to a sample
    pub fallback_fall_speed: f32, // units/s drop when no ground is found

    // --- Body tilt (cosmetic) ---
    pub roll_speed_frac: f32,     // fraction of max_speed for full roll
    pub tilt_factor: f32,         // radians of roll per radian of steer
    pub pitch_factor: f32,        // radians of pitch under throttle/brake
    pub body_smoothing: f32,      // 1/s, roll/pitch approach rate

    // --- Damage ---
    pub impact_gain: f32,         // impact points per unit/s of relative speed
    pub damage_factor: f32,       // health lost per impact point
    pub collision_speed_loss: f32, // speed multiplier after a hit (0..1)
    pub knockback: f32,           // units pushed back along -forward
    pub damage_flash_duration: f32, // seconds the "just hit" flag stays up

    // --- Presentation ---
    pub display_scale: f32,       // HUD km/h multiplier
    pub skid_threshold: f32,      // slide magnitude where skid starts
    pub skid_range: f32,          // slide beyond threshold for full skid

    // --- Integration ---
    pub max_dt: f32,              // seconds, upper clamp for one tick
}

pub const ARCADE: VehicleConfig = VehicleConfig {
    max_speed: 34.0,
    reverse_max: -8.0,
    accel: 12.0,
    brake: 20.0,
    drag: 0.985,

    steer_speed: 6.0,
    max_steer: 0.55,              // ~31 degrees
    yaw_gain: 1.6,
    turn_factor_cap: 0.5,
    turn_factor_speed_divisor: 40.0,

    drift_gain: 2.6,
    normal_gain: 0.8,
    drift_scale: 1.0,
    lateral_damping: 0.94,
    lateral_to_position_scale: 0.02,

    move_scale: 1.0 / 60.0,       // speed reads as units per second

    ride_height: 0.5,
    ground_follow_rate: 10.0,
    ground_probe_ahead: 2.0,
    ground_snap_up: 2.0,
    fallback_fall_speed: 4.0,

    roll_speed_frac: 0.5,
    tilt_factor: 0.12,
    pitch_factor: 0.05,
    body_smoothing: 8.0,

    impact_gain: 6.0,
    damage_factor: 0.6,
    collision_speed_loss: 0.35,
    knockback: 1.2,
    damage_flash_duration: 0.6,

    display_scale: 1.0,
    skid_threshold: 0.15,
    skid_range: 0.3,

    max_dt: 0.05,
};

/// Slow, planted, takes hits better.
pub const HEAVY: VehicleConfig = VehicleConfig {
    max_speed: 22.0,
    reverse_max: -5.0,
    accel: 6.0,
    brake: 14.0,
    drag: 0.992,

    steer_speed: 3.5,
    max_steer: 0.45,
    yaw_gain: 1.1,
    turn_factor_cap: 0.3,
    turn_factor_speed_divisor: 60.0,

    drift_gain: 1.2,
    normal_gain: 0.4,
    drift_scale: 1.0,
    lateral_damping: 0.9,
    lateral_to_position_scale: 0.01,

    move_scale: 1.0 / 60.0,

    ride_height: 0.8,
    ground_follow_rate: 6.0,
    ground_probe_ahead: 3.0,
    ground_snap_up: 1.5,
    fallback_fall_speed: 6.0,

    roll_speed_frac: 0.7,
    tilt_factor: 0.06,
    pitch_factor: 0.03,
    body_smoothing: 5.0,

    impact_gain: 4.0,
    damage_factor: 0.4,
    collision_speed_loss: 0.5,
    knockback: 0.6,
    damage_flash_duration: 0.4,

    display_scale: 1.0,
    skid_threshold: 0.2,
    skid_range: 0.4,

    max_dt: 0.05,
};

impl Default for VehicleConfig {
    fn default() -> Self {
        ARCADE
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("max_speed", self.max_speed)?;
        within("reverse_max", self.reverse_max, f32::MIN, 0.0)?;
        non_negative("accel", self.accel)?;
        non_negative("brake", self.brake)?;
        within("drag", self.drag, f32::MIN_POSITIVE, 1.0)?;

        non_negative("steer_speed", self.steer_speed)?;
        non_negative("max_steer", self.max_steer)?;
        finite("yaw_gain", self.yaw_gain)?;
        non_negative("turn_factor_cap", self.turn_factor_cap)?;
        positive("turn_factor_speed_divisor", self.turn_factor_speed_divisor)?;

        finite("drift_gain", self.drift_gain)?;
        finite("normal_gain", self.normal_gain)?;
        finite("drift_scale", self.drift_scale)?;
        within("lateral_damping", self.lateral_damping, 0.0, 1.0)?;
        finite("lateral_to_position_scale", self.lateral_to_position_scale)?;

        non_negative("move_scale", self.move_scale)?;

        finite("ride_height", self.ride_height)?;
        non_negative("ground_follow_rate", self.ground_follow_rate)?;
        non_negative("ground_probe_ahead", self.ground_probe_ahead)?;
        non_negative("ground_snap_up", self.ground_snap_up)?;
        non_negative("fallback_fall_speed", self.fallback_fall_speed)?;

        positive("roll_speed_frac", self.roll_speed_frac)?;
        finite("tilt_factor", self.tilt_factor)?;
        finite("pitch_factor", self.pitch_factor)?;
        non_negative("body_smoothing", self.body_smoothing)?;

        non_negative("impact_gain", self.impact_gain)?;
        non_negative("damage_factor", self.damage_factor)?;
        within("collision_speed_loss", self.collision_speed_loss, 0.0, 1.0)?;
        non_negative("knockback", self.knockback)?;
        non_negative("damage_flash_duration", self.damage_flash_duration)?;

        non_negative("display_scale", self.display_scale)?;
        non_negative("skid_threshold", self.skid_threshold)?;
        positive("skid_range", self.skid_range)?;

        positive("max_dt", self.max_dt)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub track_window: f32,          // units, longitudinal span kept around the player
    pub lanes: [f32; 2],            // lane centers (x); lane 0 travels +Z, lane 1 travels -Z
    pub pool_size: usize,           // agents recycled through the window
    pub base_speed_range: (f32, f32), // units/s, relaxation target drawn per agent
    pub min_speed: f32,             // units/s, agents never go below this
    pub lane_threshold: f32,        // |dx| under which the player counts as "in lane"
    pub lookahead_window: f32,      // |dz| under which the player counts as "close"
    pub brake_rate: f32,            // units/s² when the player is close
    pub relax_rate: f32,            // 1/s, approach back to base speed
    pub speed_scale: f32,           // position units per speed unit per second
    pub hit_speed_loss: f32,        // agent speed multiplier after hitting the player
}

pub const TWO_LANE_ROAD: TrafficConfig = TrafficConfig {
    track_window: 800.0,
    lanes: [-2.2, 2.2],
    pool_size: 10,
    base_speed_range: (8.0, 14.0),
    min_speed: 2.0,
    lane_threshold: 1.8,
    lookahead_window: 14.0,
    brake_rate: 10.0,
    relax_rate: 1.5,
    speed_scale: 1.0,
    hit_speed_loss: 0.6,
};

impl Default for TrafficConfig {
    fn default() -> Self {
        TWO_LANE_ROAD
    }
}

impl TrafficConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("track_window", self.track_window)?;
        finite("lanes[0]", self.lanes[0])?;
        finite("lanes[1]", self.lanes[1])?;
        non_negative("min_speed", self.min_speed)?;

        let (lo, hi) = self.base_speed_range;
        finite("base_speed_range.min", lo)?;
        finite("base_speed_range.max", hi)?;
        if lo > hi {
            return Err(ConfigError::InvertedRange { field: "base_speed_range", min: lo, max: hi });
        }
        within("base_speed_range.min", lo, self.min_speed, f32::MAX)?;

        non_negative("lane_threshold", self.lane_threshold)?;
        non_negative("lookahead_window", self.lookahead_window)?;
        non_negative("brake_rate", self.brake_rate)?;
        non_negative("relax_rate", self.relax_rate)?;
        non_negative("speed_scale", self.speed_scale)?;
        within("hit_speed_loss", self.hit_speed_loss, 0.0, 1.0)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub player_radius: f32, // units, planar bounding radius of the player
    pub agent_radius: f32,  // units, planar bounding radius of a traffic car
    pub push_margin: f32,   // extra separation applied after a hit
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            player_radius: 1.1,
            agent_radius: 1.1,
            push_margin: 0.5,
        }
    }
}

impl CollisionConfig {
    /// Center distance under which the player and an agent touch.
    pub fn agent_contact_distance(&self) -> f32 {
        self.player_radius + self.agent_radius
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("player_radius", self.player_radius)?;
        non_negative("agent_radius", self.agent_radius)?;
        non_negative("push_margin", self.push_margin)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinishZone {
    pub center: [f32; 3],
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub spawn_position: [f32; 3],
    pub spawn_heading: f32,        // radians
    pub fall_limit_y: f32,         // below this the run is lost
    pub finish: Option<FinishZone>,
    pub traffic_seed: u64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            spawn_position: [0.0, 0.5, 0.0],
            spawn_heading: 0.0,
            fall_limit_y: -5.0,
            finish: None,
            traffic_seed: 0x5eed,
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, v) in [
            ("spawn_position.x", self.spawn_position[0]),
            ("spawn_position.y", self.spawn_position[1]),
            ("spawn_position.z", self.spawn_position[2]),
            ("spawn_heading", self.spawn_heading),
            ("fall_limit_y", self.fall_limit_y),
        ] {
            finite(field, v)?;
        }
        if let Some(finish) = &self.finish {
            for v in finish.center {
                finite("finish.center", v)?;
            }
            positive("finish.radius", finish.radius)?;
        }
        Ok(())
    }
}

/// Everything a `Simulation` needs, in one deserializable value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub vehicle: VehicleConfig,
    pub traffic: TrafficConfig,
    pub collision: CollisionConfig,
    pub level: LevelConfig,
}

impl KernelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vehicle.validate()?;
        self.traffic.validate()?;
        self.collision.validate()?;
        self.level.validate()
    }
}
