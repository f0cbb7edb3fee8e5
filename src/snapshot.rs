use serde::Serialize;

use crate::simulation::{LevelStatus, Simulation};
use crate::traffic::Direction;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub heading: f32,
    pub speed: f32,
    pub steer_angle: f32,
    pub lateral_offset: f32,
    pub body_roll: f32,
    pub body_pitch: f32,
    pub health: u32,
    pub speed_kmh: f32,
    pub skid: f32,
    pub hit_flash: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub id: usize,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub heading: f32,
    pub speed: f32,
    pub direction: Direction,
}

/// Read-only view of one frame, everything a renderer or HUD needs.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub elapsed: f32,
    pub distance: f32,
    pub status: LevelStatus,
    pub player: PlayerSnapshot,
    pub traffic: Vec<AgentSnapshot>,
}

impl Snapshot {
    pub fn capture(sim: &Simulation) -> Self {
        let vehicle = sim.player();
        let s = vehicle.state();

        let player = PlayerSnapshot {
            x: s.position.x,
            y: s.position.y,
            z: s.position.z,
            heading: s.heading,
            speed: s.speed,
            steer_angle: s.steer_angle,
            lateral_offset: s.lateral_offset,
            body_roll: s.body_roll,
            body_pitch: s.body_pitch,
            health: s.health,
            speed_kmh: vehicle.approx_speed_kmh(),
            skid: vehicle.skid_level(),
            hit_flash: vehicle.just_hit(),
        };

        let traffic = sim
            .traffic()
            .iter()
            .map(|agent| {
                let a = agent.state();
                AgentSnapshot {
                    id: agent.id(),
                    x: a.position.x,
                    y: a.position.y,
                    z: a.position.z,
                    heading: a.heading,
                    speed: a.speed,
                    direction: a.direction,
                }
            })
            .collect();

        Self {
            tick: sim.tick_count(),
            elapsed: sim.elapsed(),
            distance: sim.distance(),
            status: sim.status(),
            player,
            traffic,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
