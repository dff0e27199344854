//! BBR simulator - robot basketball arena simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, game rules, camera, world)
//! - `scheduler`: Fixed-rate loop thread, request queue, state streaming
//! - `protocol`: Commands and state payloads exchanged with controllers
//! - `settings`: Arena constants and world setup configuration

pub mod error;
pub mod protocol;
pub mod scheduler;
pub mod settings;
pub mod sim;

pub use error::{Error, Result};
pub use protocol::{Action, FullSnapshot, StateResponse, StreamMessage, VisionFrame};
pub use scheduler::{SimHandle, Simulation};
pub use settings::{Arena, BallSetup, RobotSetup, WorldConfig};

use glam::Vec2;

/// Simulation timing constants
pub mod consts {
    use std::time::Duration;

    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Wall-clock budget of one simulation tick
    pub const TICK_INTERVAL: Duration = Duration::from_micros(16_667);
    /// State streaming period (~30 Hz)
    pub const STREAM_INTERVAL: Duration = Duration::from_micros(33_333);
    /// Frames buffered per stream subscriber before frames are dropped
    pub const STREAM_BUFFER: usize = 8;
}

/// Rotate a vector counter-clockwise by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Unit forward vector of a body with the given heading.
///
/// Robots face their local +Y axis.
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    rotate(Vec2::Y, angle)
}
