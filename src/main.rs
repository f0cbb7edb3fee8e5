// ==============================================================================
// main.rs — HEADLESS DRIVER
// ==============================================================================
// Runs one level at ~60 Hz on a tokio interval with a scripted driver, logs a
// HUD line once per second and prints the final snapshot as JSON.
//
//   road-kernel [seconds] [config.json]
//
// RUST_LOG controls verbosity (default: info).
// ==============================================================================

use std::error::Error;
use std::time::Instant;

use road_kernel::collision::Obstacle;
use road_kernel::config::{FinishZone, KernelConfig};
use road_kernel::control::ControlSurface;
use road_kernel::ground::RapierGround;
use road_kernel::math::Vec3;
use road_kernel::simulation::{LevelStatus, Simulation};

use tokio::time::{Duration, interval};
use tracing_subscriber::EnvFilter;

const DEFAULT_SECONDS: f32 = 20.0;
const TRACK_LENGTH: f32 = 1200.0;

fn load_config(path: Option<&str>) -> Result<KernelConfig, Box<dyn Error>> {
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)?;
            tracing::info!(path = p, "loading config");
            serde_json::from_str::<KernelConfig>(&text)?
        }
        None => KernelConfig::default(),
    };
    if cfg.level.finish.is_none() {
        cfg.level.finish = Some(FinishZone {
            center: [0.0, 0.0, TRACK_LENGTH - 20.0],
            radius: 8.0,
        });
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Long slab, ramps on both shoulders.
fn build_track() -> RapierGround {
    let mut ground = RapierGround::new(100.0, 200.0);
    ground.add_box([0.0, -0.1, TRACK_LENGTH * 0.5], [12.0, 0.1, TRACK_LENGTH * 0.5 + 40.0], 0.0);
    for i in 0..12 {
        let x = if i % 2 == 0 { -18.0 } else { 18.0 };
        ground.add_box([x, 0.4, i as f32 * 90.0 + 50.0], [3.0, 0.5, 6.0], -0.12);
    }
    ground
}

fn pillars() -> Vec<Obstacle> {
    (0..12)
        .map(|i| Obstacle {
            position: Vec3::new(if i % 2 == 0 { -9.0 } else { 9.0 }, 0.0, i as f32 * 70.0 + 70.0),
            radius: 2.0,
        })
        .collect()
}

/// Full throttle with a slow weave and a drift burst every few seconds.
fn scripted_control(t: f32) -> ControlSurface {
    let wheel_deg = (t * 0.7).sin() * 40.0;
    ControlSurface { throttle: 1.0, ..ControlSurface::from_wheel_angle(wheel_deg) }
        .with_drift((t % 6.0) > 5.0)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let seconds = match args.first() {
        Some(s) => s.parse::<f32>()?,
        None => DEFAULT_SECONDS,
    };
    let cfg = load_config(args.get(1).map(String::as_str))?;

    let ground = build_track();
    let mut sim = Simulation::new(cfg)?.with_obstacles(pillars());
    tracing::info!(
        seconds,
        colliders = ground.collider_count(),
        obstacles = sim.obstacles().len(),
        "starting run"
    );

    // Fixed timestep: ~60 Hz
    let mut ticker = interval(Duration::from_millis(16));
    let started = Instant::now();
    let mut last = Instant::now();
    let mut next_hud = 1.0;

    while started.elapsed().as_secs_f32() < seconds {
        ticker.tick().await;

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let control = scripted_control(sim.elapsed());
        let report = sim.tick(&control, dt, Some(&ground));

        for hit in &report.collisions {
            tracing::info!(
                agent = ?hit.agent_id,
                obstacle = ?hit.obstacle_index,
                damage = hit.damage,
                relative_speed = hit.relative_speed,
                "collision"
            );
        }

        if report.status_changed {
            match report.status {
                LevelStatus::FellOff => tracing::warn!(distance = sim.distance(), "fell off, retrying"),
                LevelStatus::Finished => tracing::info!(time = sim.elapsed(), "finished, retrying"),
                LevelStatus::Driving => {}
            }
        }
        if report.status != LevelStatus::Driving || sim.player().is_wrecked() {
            sim.retry();
            next_hud = 1.0;
        }

        if sim.elapsed() >= next_hud {
            next_hud += 1.0;
            tracing::info!(
                tick = report.tick,
                kmh = sim.player().approx_speed_kmh().round(),
                health = sim.player().state().health,
                skid = sim.player().skid_level(),
                distance = sim.distance().round(),
                "hud"
            );
        }
    }

    println!("{}", sim.snapshot().to_json()?);
    Ok(())
}
