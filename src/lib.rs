pub mod collision;
pub mod config;
pub mod control;
pub mod error;
pub mod ground;
pub mod math;
pub mod simulation;
pub mod snapshot;
pub mod traffic;
pub mod vehicle;

pub use collision::{CollisionEvent, CollisionResolver, Obstacle};
pub use config::{CollisionConfig, KernelConfig, LevelConfig, TrafficConfig, VehicleConfig};
pub use control::ControlSurface;
pub use error::ConfigError;
pub use ground::{FlatGround, FnGround, GroundSampler, NoGround, RapierGround};
pub use simulation::{LevelStatus, Simulation, TickReport};
pub use snapshot::Snapshot;
pub use traffic::{Direction, TrafficAgent};
pub use vehicle::{VehicleIntegrator, VehicleState};
