//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only, driven by the caller
//! - Seeded RNG only
//! - Stable iteration order (by body insertion)
//! - No threads, clocks or I/O

pub mod camera;
pub mod collision;
pub mod physics;
pub mod rules;
pub mod state;
pub mod world;

pub use camera::{Camera, project};
pub use collision::{CollisionResult, circle_circle, circle_segment, circle_segment_swept};
pub use physics::{Body, BodyHandle, CollisionType, Fixture, FixtureShape, Kinematics, MotionPolicy, Space};
pub use state::{
    Actor, Ball, BallPhase, Basket, Robot, COLLISION_BALL, COLLISION_BASKET, COLLISION_ROBOT,
    COLLISION_WALL,
};
pub use world::World;
