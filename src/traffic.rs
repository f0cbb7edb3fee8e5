// ==============================================================================
// traffic.rs — TRAFFIC AGENTS (LANE-BOUND, PROXIMITY-REGULATED, WRAPPED)
// ------------------------------------------------------------------------------
// Each agent drives straight along its lane at a fixed heading:
// - move:     z += direction * speed * dt * speed_scale, x eases back to lane
// - wrap:     z is kept within ±track_window/2 of the player, so a small pool
//             reads as an endless stream
// - regulate: player close in lane and longitudinally -> brake toward
//             min_speed; otherwise relax back toward base_speed
//
// This is a reactive controller, not a planner. Agents never steer around the
// player; slowing down is the only avoidance they do.
// ==============================================================================

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::config::TrafficConfig;
use crate::math::{Vec3, approach, wrap_centered};

/// 1/s, how fast a pushed agent drifts back to its lane center.
const LANE_KEEP_RATE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,  // travels +Z
    Backward, // travels -Z
}

impl Direction {
    pub fn sign(&self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }

    pub fn heading(&self) -> f32 {
        match self {
            Direction::Forward => 0.0,
            Direction::Backward => PI,
        }
    }

    /// Unit travel vector. Exact, unlike sin/cos of `heading()`.
    pub fn forward_vector(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.sign())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrafficAgentState {
    pub position: Vec3,
    pub heading: f32,    // fixed by direction
    pub lane_x: f32,     // lane center the agent keeps to
    pub speed: f32,      // never below min_speed
    pub base_speed: f32, // relaxation target
    pub direction: Direction,
}

#[derive(Debug, Clone)]
pub struct TrafficAgent {
    id: usize,
    state: TrafficAgentState,
}

impl TrafficAgent {
    /// `base_speed` below `min_speed` is raised to it.
    pub fn new(id: usize, lane_x: f32, z: f32, direction: Direction, base_speed: f32, min_speed: f32) -> Self {
        let base_speed = base_speed.max(min_speed);
        Self {
            id,
            state: TrafficAgentState {
                position: Vec3::new(lane_x, 0.0, z),
                heading: direction.heading(),
                lane_x,
                speed: base_speed,
                base_speed,
                direction,
            },
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> &TrafficAgentState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TrafficAgentState {
        &mut self.state
    }

    /// Advance one tick relative to the player's (already updated) position.
    pub fn update(&mut self, cfg: &TrafficConfig, player: &Vec3, dt: f32) {
        let s = &mut self.state;

        // ------------------------------------------------------------
        // Move along the lane
        // ------------------------------------------------------------
        s.position += s.direction.forward_vector() * (s.speed * dt * cfg.speed_scale);
        s.position.x = approach(s.position.x, s.lane_x, LANE_KEEP_RATE, dt);

        // ------------------------------------------------------------
        // Wrap around the player
        // ------------------------------------------------------------
        let rel = s.position.z - player.z;
        let wrapped = wrap_centered(rel, cfg.track_window);
        if wrapped != rel {
            s.position.z = player.z + wrapped;
            s.position.x = s.lane_x;
            tracing::trace!(agent = self.id, z = s.position.z, "traffic agent recycled");
        }

        // ------------------------------------------------------------
        // Speed regulation
        // ------------------------------------------------------------
        let dx = (s.position.x - player.x).abs();
        let dz = (s.position.z - player.z).abs();
        if dx < cfg.lane_threshold && dz < cfg.lookahead_window {
            s.speed = (s.speed - cfg.brake_rate * dt).max(cfg.min_speed);
        } else {
            s.speed = approach(s.speed, s.base_speed, cfg.relax_rate, dt);
        }
        s.speed = s.speed.max(cfg.min_speed);
    }
}

/// Builds the finite pool: alternating lanes and directions, random offsets
/// inside the window around `around_z`, random base speeds.
pub fn spawn_pool<R: Rng>(cfg: &TrafficConfig, around_z: f32, rng: &mut R) -> Vec<TrafficAgent> {
    let half = cfg.track_window * 0.5;
    let (lo, hi) = cfg.base_speed_range;

    let agents: Vec<TrafficAgent> = (0..cfg.pool_size)
        .map(|i| {
            let (lane_x, direction) = if i % 2 == 0 {
                (cfg.lanes[0], Direction::Forward)
            } else {
                (cfg.lanes[1], Direction::Backward)
            };
            let z = around_z + rng.gen_range(-half..half);
            let base_speed = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
            TrafficAgent::new(i, lane_x, z, direction, base_speed, cfg.min_speed)
        })
        .collect();

    tracing::debug!(count = agents.len(), around_z, "traffic pool spawned");
    agents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TWO_LANE_ROAD;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn moves_along_its_direction() {
        let cfg = TWO_LANE_ROAD;
        let far_player = Vec3::new(50.0, 0.0, 0.0);
        let mut fwd = TrafficAgent::new(0, -2.2, 0.0, Direction::Forward, 10.0, cfg.min_speed);
        let mut back = TrafficAgent::new(1, 2.2, 0.0, Direction::Backward, 10.0, cfg.min_speed);
        for _ in 0..60 {
            fwd.update(&cfg, &far_player, DT);
            back.update(&cfg, &far_player, DT);
        }
        assert!((fwd.state().position.z - 10.0).abs() < 1e-3);
        assert!((back.state().position.z + 10.0).abs() < 1e-3);
        assert_eq!(fwd.state().position.x, -2.2);
        assert_eq!(back.state().heading, PI);
    }

    #[test]
    fn wraps_ahead_and_behind() {
        let cfg = TrafficConfig { track_window: 100.0, ..TWO_LANE_ROAD };
        let player = Vec3::zeros();

        let mut ahead = TrafficAgent::new(0, -2.2, 49.9, Direction::Forward, 12.0, cfg.min_speed);
        ahead.update(&cfg, &player, DT);
        assert!(ahead.state().position.z < -49.0);

        let mut behind = TrafficAgent::new(1, 2.2, -49.9, Direction::Backward, 12.0, cfg.min_speed);
        behind.update(&cfg, &player, DT);
        assert!(behind.state().position.z > 49.0);
    }

    #[test]
    fn wrap_invariant_with_moving_player() {
        let cfg = TrafficConfig { track_window: 120.0, ..TWO_LANE_ROAD };
        let mut rng = StdRng::seed_from_u64(11);
        let mut agents = spawn_pool(&cfg, 0.0, &mut rng);
        let mut player = Vec3::zeros();
        for tick in 0..3_000 {
            // fast, then reversing hard, then a teleport
            player.z += if tick < 1_500 { 34.0 * DT } else { -8.0 * DT };
            if tick == 2_000 {
                player.z += 5_000.0;
            }
            for a in agents.iter_mut() {
                a.update(&cfg, &player, DT);
                let rel = (a.state().position.z - player.z).abs();
                assert!(rel <= cfg.track_window * 0.5 + 1e-3, "tick {tick}: rel {rel}");
            }
        }
    }

    #[test]
    fn brakes_when_player_is_close_in_lane() {
        let cfg = TWO_LANE_ROAD;
        let mut a = TrafficAgent::new(0, -2.2, 5.0, Direction::Forward, 12.0, cfg.min_speed);
        let player = Vec3::new(-2.0, 0.0, 8.0);
        for _ in 0..600 {
            a.update(&cfg, &Vec3::new(player.x, 0.0, a.state().position.z + 3.0), DT);
        }
        assert_eq!(a.state().speed, cfg.min_speed);
    }

    #[test]
    fn other_lane_does_not_brake() {
        let cfg = TWO_LANE_ROAD;
        let mut a = TrafficAgent::new(0, -2.2, 5.0, Direction::Forward, 12.0, cfg.min_speed);
        for _ in 0..60 {
            let beside = Vec3::new(2.2, 0.0, a.state().position.z + 2.0);
            a.update(&cfg, &beside, DT);
        }
        assert!((a.state().speed - 12.0).abs() < 1e-4);
    }

    #[test]
    fn speed_never_below_min() {
        let cfg = TWO_LANE_ROAD;
        let mut a = TrafficAgent::new(0, -2.2, 0.0, Direction::Forward, 0.5, cfg.min_speed);
        assert_eq!(a.state().base_speed, cfg.min_speed);
        a.state_mut().speed = 0.0;
        a.update(&cfg, &Vec3::new(100.0, 0.0, 0.0), DT);
        assert!(a.state().speed >= cfg.min_speed);
    }

    #[test]
    fn pushed_agent_returns_to_lane() {
        let cfg = TWO_LANE_ROAD;
        let mut a = TrafficAgent::new(0, -2.2, 0.0, Direction::Forward, 10.0, cfg.min_speed);
        a.state_mut().position.x = -4.0;
        for _ in 0..300 {
            a.update(&cfg, &Vec3::new(100.0, 0.0, 0.0), DT);
        }
        assert!((a.state().position.x + 2.2).abs() < 0.01);
    }

    #[test]
    fn pool_alternates_lanes_and_directions() {
        let cfg = TWO_LANE_ROAD;
        let mut rng = StdRng::seed_from_u64(3);
        let pool = spawn_pool(&cfg, 200.0, &mut rng);
        assert_eq!(pool.len(), cfg.pool_size);
        for (i, a) in pool.iter().enumerate() {
            let s = a.state();
            assert_eq!(a.id(), i);
            let (lane, dir) = if i % 2 == 0 {
                (cfg.lanes[0], Direction::Forward)
            } else {
                (cfg.lanes[1], Direction::Backward)
            };
            assert_eq!(s.lane_x, lane);
            assert_eq!(s.direction, dir);
            assert!((s.position.z - 200.0).abs() <= cfg.track_window * 0.5);
            assert!(s.base_speed >= cfg.base_speed_range.0 && s.base_speed <= cfg.base_speed_range.1);
        }
    }

    #[test]
    fn same_seed_same_pool() {
        let cfg = TWO_LANE_ROAD;
        let a = spawn_pool(&cfg, 0.0, &mut StdRng::seed_from_u64(42));
        let b = spawn_pool(&cfg, 0.0, &mut StdRng::seed_from_u64(42));
        let za: Vec<f32> = a.iter().map(|t| t.state().position.z).collect();
        let zb: Vec<f32> = b.iter().map(|t| t.state().position.z).collect();
        assert_eq!(za, zb);
    }
}
