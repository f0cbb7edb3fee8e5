// ==============================================================================
// collision.rs — PLAYER vs TRAFFIC / STATIC OBSTACLE RESOLUTION
// ------------------------------------------------------------------------------
// Runs once per tick after the player and every agent have moved.
//
// Phase 1 (detect): planar distance from the finalized player position to each
//   agent, then each obstacle, in index order. Every contact becomes one
//   CollisionEvent; there is no early exit, so several hits in one tick all
//   count.
// Phase 2 (apply), same order:
//   - player.on_collision(relative_speed) per event (damage adds up, health
//     floors at 0 so the final health does not depend on order)
//   - agent hit: agent loses speed and is pushed out to contact distance +
//     margin, so the same pair does not fire again next tick
//   - obstacle hit: the obstacle cannot move, so the player is pushed out
//
// Pushes and knockback read the player position as it stands when they are
// applied, so positions DO depend on processing order. That is accepted: this
// is a distance check, not a contact solver.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::config::{CollisionConfig, TrafficConfig};
use crate::error::ConfigError;
use crate::math::{Vec3, forward_vector, planar_distance};
use crate::traffic::TrafficAgent;
use crate::vehicle::VehicleIntegrator;

/// Planar offsets shorter than this have no usable direction.
const MIN_SEPARATION_DIR: f32 = 1e-4;

/// Static round obstacle (pillar, crate, barrier post).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub position: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CollisionEvent {
    pub relative_speed: f32,
    pub agent_id: Option<usize>,
    pub obstacle_index: Option<usize>,
    pub damage: u32,
}

#[derive(Debug, Clone, Copy)]
enum Contact {
    Agent { index: usize, relative_speed: f32 },
    Obstacle { index: usize, relative_speed: f32 },
}

pub struct CollisionResolver {
    cfg: CollisionConfig,
    hit_speed_loss: f32, // agent speed multiplier after a hit
    min_agent_speed: f32,
}

impl CollisionResolver {
    pub fn new(cfg: CollisionConfig, traffic: &TrafficConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        traffic.validate()?;
        Ok(Self {
            cfg,
            hit_speed_loss: traffic.hit_speed_loss,
            min_agent_speed: traffic.min_speed,
        })
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.cfg
    }

    pub fn resolve(
        &self,
        player: &mut VehicleIntegrator,
        agents: &mut [TrafficAgent],
        obstacles: &[Obstacle],
    ) -> Vec<CollisionEvent> {
        let contacts = self.detect(player, agents, obstacles);
        if contacts.is_empty() {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(contacts.len());
        for contact in contacts {
            match contact {
                Contact::Agent { index, relative_speed } => {
                    let hit = player.on_collision(relative_speed);
                    let agent = &mut agents[index];
                    self.push_agent(agent, &player.state().position);
                    events.push(CollisionEvent {
                        relative_speed,
                        agent_id: Some(agent.id()),
                        obstacle_index: None,
                        damage: hit.damage,
                    });
                }
                Contact::Obstacle { index, relative_speed } => {
                    let hit = player.on_collision(relative_speed);
                    self.push_player_off(player, &obstacles[index]);
                    events.push(CollisionEvent {
                        relative_speed,
                        agent_id: None,
                        obstacle_index: Some(index),
                        damage: hit.damage,
                    });
                }
            }
        }

        tracing::debug!(
            hits = events.len(),
            health = player.state().health,
            "collisions resolved"
        );
        events
    }

    // --------------------------------------------------------------------------
    // Phase 1: detection against the finalized positions
    // --------------------------------------------------------------------------
    fn detect(&self, player: &VehicleIntegrator, agents: &[TrafficAgent], obstacles: &[Obstacle]) -> Vec<Contact> {
        let p = player.state().position;
        let player_speed = player.state().speed.abs();
        let agent_contact = self.cfg.agent_contact_distance();

        let agent_hits = agents.iter().enumerate().filter_map(|(index, agent)| {
            let s = agent.state();
            (planar_distance(&p, &s.position) < agent_contact).then_some(Contact::Agent {
                index,
                relative_speed: s.speed,
            })
        });

        let obstacle_hits = obstacles.iter().enumerate().filter_map(|(index, o)| {
            (planar_distance(&p, &o.position) < self.cfg.player_radius + o.radius).then_some(
                Contact::Obstacle {
                    index,
                    relative_speed: player_speed,
                },
            )
        });

        agent_hits.chain(obstacle_hits).collect()
    }

    // --------------------------------------------------------------------------
    // Phase 2 helpers
    // --------------------------------------------------------------------------
    fn push_agent(&self, agent: &mut TrafficAgent, player_pos: &Vec3) {
        let hit_speed_loss = self.hit_speed_loss;
        let min_speed = self.min_agent_speed;
        let separation = self.cfg.agent_contact_distance() + self.cfg.push_margin;

        let s = agent.state_mut();
        s.speed = (s.speed * hit_speed_loss).max(min_speed);

        if planar_distance(player_pos, &s.position) >= separation {
            return;
        }
        let dir = planar_dir(player_pos, &s.position).unwrap_or_else(|| s.direction.forward_vector());
        s.position.x = player_pos.x + dir.x * separation;
        s.position.z = player_pos.z + dir.z * separation;
    }

    fn push_player_off(&self, player: &mut VehicleIntegrator, obstacle: &Obstacle) {
        let separation = self.cfg.player_radius + obstacle.radius + self.cfg.push_margin;
        let s = player.state_mut();

        if planar_distance(&obstacle.position, &s.position) >= separation {
            return;
        }
        let dir = planar_dir(&obstacle.position, &s.position).unwrap_or_else(|| -forward_vector(s.heading));
        s.position.x = obstacle.position.x + dir.x * separation;
        s.position.z = obstacle.position.z + dir.z * separation;
    }
}

/// Unit XZ direction from `from` to `to`, if they are not on top of each other.
fn planar_dir(from: &Vec3, to: &Vec3) -> Option<Vec3> {
    let d = Vec3::new(to.x - from.x, 0.0, to.z - from.z);
    let len = d.norm();
    (len > MIN_SEPARATION_DIR).then(|| d / len)
}
