// ==============================================================================
// simulation.rs — ONE LEVEL'S WORLD: PLAYER + TRAFFIC POOL + OBSTACLES
// ==============================================================================
// tick(control, dt, ground) runs the fixed order every frame:
//   1) clamp dt
//   2) advance the player        (VehicleIntegrator::update)
//   3) advance every agent       (against the player's new position)
//   4) resolve collisions once   (against the now-final positions)
//   5) bookkeeping: health lost, odometer, timer, fall / finish status
//
// Level status is sticky. Once the player has fallen off or finished, ticks
// are no-ops until retry() puts everything back at spawn.
// ==============================================================================

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::collision::{CollisionEvent, CollisionResolver, Obstacle};
use crate::config::KernelConfig;
use crate::control::ControlSurface;
use crate::error::ConfigError;
use crate::ground::GroundSampler;
use crate::math::{Vec3, planar_distance};
use crate::snapshot::Snapshot;
use crate::traffic::{TrafficAgent, spawn_pool};
use crate::vehicle::VehicleIntegrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    Driving,
    FellOff,
    Finished,
}

/// What happened during one tick, for the presentation pass to react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub dt: f32,
    pub collisions: Vec<CollisionEvent>,
    pub health_lost: u32,
    pub status: LevelStatus,
    pub status_changed: bool,
}

pub struct Simulation {
    config: KernelConfig,
    player: VehicleIntegrator,
    traffic: Vec<TrafficAgent>,
    obstacles: Vec<Obstacle>,
    resolver: CollisionResolver,
    tick: u64,
    elapsed: f32,  // seconds since spawn / retry
    distance: f32, // forward (+Z) progress since spawn / retry
    status: LevelStatus,
}

impl Simulation {
    pub fn new(config: KernelConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let spawn = Vec3::from(config.level.spawn_position);
        let player = VehicleIntegrator::new(config.vehicle, spawn, config.level.spawn_heading)?;
        let resolver = CollisionResolver::new(config.collision, &config.traffic)?;
        let traffic = Self::seed_traffic(&config, spawn.z);

        tracing::info!(
            agents = traffic.len(),
            max_speed = config.vehicle.max_speed,
            "simulation ready"
        );

        Ok(Self {
            config,
            player,
            traffic,
            obstacles: Vec::new(),
            resolver,
            tick: 0,
            elapsed: 0.0,
            distance: 0.0,
            status: LevelStatus::Driving,
        })
    }

    fn seed_traffic(config: &KernelConfig, around_z: f32) -> Vec<TrafficAgent> {
        let mut rng = StdRng::seed_from_u64(config.level.traffic_seed);
        spawn_pool(&config.traffic, around_z, &mut rng)
    }

    pub fn with_obstacles(mut self, obstacles: impl IntoIterator<Item = Obstacle>) -> Self {
        self.obstacles.extend(obstacles);
        self
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    // --------------------------------------------------
    // Accessors (read-only for the presentation layer)
    // --------------------------------------------------
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn player(&self) -> &VehicleIntegrator {
        &self.player
    }

    pub fn traffic(&self) -> &[TrafficAgent] {
        &self.traffic
    }

    pub fn traffic_mut(&mut self) -> &mut [TrafficAgent] {
        &mut self.traffic
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn status(&self) -> LevelStatus {
        self.status
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    // ==========================================================================
    // Frame step
    // ==========================================================================
    pub fn tick(&mut self, control: &ControlSurface, dt: f32, ground: Option<&dyn GroundSampler>) -> TickReport {
        self.tick += 1;

        if self.status != LevelStatus::Driving {
            return self.report(0.0, Vec::new(), 0, false);
        }

        // 1) clamp
        let dt = self.player.clamp_dt(dt);

        // 2) player
        let health_before = self.player.state().health;
        let z_before = self.player.state().position.z;
        self.player.update(control, dt, ground);

        // 3) traffic, against the player's final position
        let player_pos = self.player.state().position;
        for agent in self.traffic.iter_mut() {
            agent.update(&self.config.traffic, &player_pos, dt);
        }

        // 4) collisions, exactly once
        let collisions = self
            .resolver
            .resolve(&mut self.player, &mut self.traffic, &self.obstacles);

        // 5) bookkeeping
        let s = self.player.state();
        let health_lost = health_before.saturating_sub(s.health);
        self.distance += (s.position.z - z_before).max(0.0);
        self.elapsed += dt;

        let previous = self.status;
        self.status = self.level_status();
        let status_changed = previous != self.status;
        if status_changed {
            tracing::info!(
                status = ?self.status,
                elapsed = self.elapsed,
                distance = self.distance,
                "level status changed"
            );
        }

        self.report(dt, collisions, health_lost, status_changed)
    }

    fn level_status(&self) -> LevelStatus {
        let level = &self.config.level;
        let pos = &self.player.state().position;

        if pos.y < level.fall_limit_y {
            return LevelStatus::FellOff;
        }
        if let Some(finish) = &level.finish {
            if planar_distance(pos, &Vec3::from(finish.center)) < finish.radius {
                return LevelStatus::Finished;
            }
        }
        LevelStatus::Driving
    }

    fn report(&self, dt: f32, collisions: Vec<CollisionEvent>, health_lost: u32, status_changed: bool) -> TickReport {
        TickReport {
            tick: self.tick,
            dt,
            collisions,
            health_lost,
            status: self.status,
            status_changed,
        }
    }

    /// Level retry: player back to spawn defaults, traffic re-seeded.
    pub fn retry(&mut self) {
        self.player.respawn();
        let spawn_z = self.player.state().position.z;
        self.traffic = Self::seed_traffic(&self.config, spawn_z);
        self.elapsed = 0.0;
        self.distance = 0.0;
        self.status = LevelStatus::Driving;
        tracing::info!(tick = self.tick, "level retry");
    }
}
