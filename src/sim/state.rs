//! Robots, balls and baskets
//!
//! Robots and balls ride on physics bodies; the types here carry the
//! game-side state and act as each body's motion policy.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{CollisionType, Kinematics, MotionPolicy};
use crate::protocol::Action;
use crate::settings::Arena;
use crate::{heading, rotate};

pub const COLLISION_ROBOT: CollisionType = CollisionType(1);
pub const COLLISION_BALL: CollisionType = CollisionType(2);
pub const COLLISION_BASKET: CollisionType = CollisionType(3);
pub const COLLISION_WALL: CollisionType = CollisionType(4);

/// Ball life cycle: Free -> Launched -> Scored, or Launched -> Free on a miss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallPhase {
    /// Rolling on the floor
    Free,
    /// Airborne after leaving a thrower
    Launched,
    /// Resting inside a basket (terminal)
    Scored,
}

/// A velocity-controlled robot with a thrower
#[derive(Debug, Clone)]
pub struct Robot {
    pub id: String,
    pub z: f32,
    /// Target velocity in the robot frame
    pub target_velocity: Vec2,
    pub target_angular_velocity: f32,
    pub thrower: u32,
    /// Set when a ball enters the thrower, cleared by the next vision read
    pub ball_in_thrower: bool,
}

impl Robot {
    pub fn new(id: String) -> Self {
        Self {
            id,
            z: 0.0,
            target_velocity: Vec2::ZERO,
            target_angular_velocity: 0.0,
            thrower: 0,
            ball_in_thrower: false,
        }
    }

    /// Overwrite the command state; motion changes on the next step.
    ///
    /// Non-finite velocity components are read as zero.
    pub fn apply(&mut self, action: &Action) {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        self.target_velocity = Vec2::from(action.velocity.map(finite));
        self.target_angular_velocity = finite(action.angular_velocity);
        self.thrower = action.thrower;
    }

    #[inline]
    pub fn thrower_extended(&self) -> bool {
        self.thrower > 0
    }

    /// Read the one-shot thrower signal and clear it.
    ///
    /// Single consumer: only one vision query per tick sees `true`.
    pub fn take_ball_in_thrower(&mut self) -> bool {
        std::mem::take(&mut self.ball_in_thrower)
    }

    /// Force the body to the commanded velocity, ignoring damping
    pub fn update_velocity(&self, kinematics: &mut Kinematics) {
        kinematics.velocity = rotate(self.target_velocity, kinematics.angle);
        kinematics.angular_velocity = self.target_angular_velocity;
    }
}

/// A ball and its life-cycle state
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: String,
    /// Height, derived from the phase every step
    pub z: f32,
    pub phase: BallPhase,
    rest_height: f32,
    flight_height: f32,
}

impl Ball {
    pub fn new(id: String, arena: &Arena) -> Self {
        Self {
            id,
            z: arena.ball_radius,
            phase: BallPhase::Free,
            rest_height: arena.ball_radius,
            // Flight is flattened to a plane just above the rim
            flight_height: arena.basket_height + arena.ball_radius * 2.0,
        }
    }

    /// Pick the motion regime for the current phase
    pub fn update_velocity(&mut self, kinematics: &mut Kinematics, damping: f32, dt: f32) {
        match self.phase {
            BallPhase::Scored => kinematics.update_velocity(0.0, dt),
            BallPhase::Launched => {
                self.z = self.flight_height;
                kinematics.update_velocity(1.0, dt);
            }
            BallPhase::Free => {
                self.z = self.rest_height;
                kinematics.update_velocity(damping, dt);
            }
        }
    }

    /// Free -> Launched: place the ball at the thrower mouth and fire it
    /// along the robot's heading
    pub fn launch(
        &mut self,
        ball: &mut Kinematics,
        robot: &Kinematics,
        robot_radius: f32,
        speed: f32,
    ) {
        let forward = heading(robot.angle);
        ball.position = robot.position + forward * robot_radius;
        ball.velocity = forward * speed;
        self.z = self.flight_height;
        self.phase = BallPhase::Launched;
    }

    /// Launched -> Scored: pin the ball at the basket center on the floor
    pub fn score(&mut self, ball: &mut Kinematics, basket_center: Vec2) {
        ball.position = basket_center;
        self.z = 0.0;
        self.phase = BallPhase::Scored;
    }

    /// Launched -> Free after hitting a wall or backboard
    pub fn land(&mut self) {
        if self.phase == BallPhase::Launched {
            self.z = self.rest_height;
            self.phase = BallPhase::Free;
        }
    }

    /// Airborne or scored balls are hidden from robot cameras
    #[inline]
    pub fn on_floor(&self) -> bool {
        self.phase == BallPhase::Free
    }
}

/// Motion policy attached to every body in the world
#[derive(Debug, Clone)]
pub enum Actor {
    Robot(Robot),
    Ball(Ball),
}

impl MotionPolicy for Actor {
    fn update_velocity(&mut self, kinematics: &mut Kinematics, damping: f32, dt: f32) {
        match self {
            Actor::Robot(robot) => robot.update_velocity(kinematics),
            Actor::Ball(ball) => ball.update_velocity(kinematics, damping, dt),
        }
    }
}

impl Actor {
    pub fn as_robot(&self) -> Option<&Robot> {
        match self {
            Actor::Robot(robot) => Some(robot),
            Actor::Ball(_) => None,
        }
    }

    pub fn as_robot_mut(&mut self) -> Option<&mut Robot> {
        match self {
            Actor::Robot(robot) => Some(robot),
            Actor::Ball(_) => None,
        }
    }

    pub fn as_ball(&self) -> Option<&Ball> {
        match self {
            Actor::Ball(ball) => Some(ball),
            Actor::Robot(_) => None,
        }
    }

    pub fn as_ball_mut(&mut self) -> Option<&mut Ball> {
        match self {
            Actor::Ball(ball) => Some(ball),
            Actor::Robot(_) => None,
        }
    }
}

/// A basket tube at one end of the competition area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basket {
    pub name: &'static str,
    pub center: Vec2,
}

impl Basket {
    /// Both baskets: "magenta" on the -X side, "blue" on the +X side
    pub fn pair(arena: &Arena) -> [Basket; 2] {
        [
            Basket {
                name: "magenta",
                center: arena.basket_center(-1.0),
            },
            Basket {
                name: "blue",
                center: arena.basket_center(1.0),
            },
        ]
    }
}
