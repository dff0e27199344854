//! Arena constants and world setup
//!
//! Loaded once at world construction and shared read-only afterwards.
//! Every field has a default, so a JSON document only needs to name the
//! values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Physical constants of the arena, robots, balls and robot camera.
///
/// Lengths are meters, masses kilograms, angles radians unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Arena {
    pub area_width: f32,
    pub area_height: f32,
    pub play_area_width: f32,
    pub play_area_height: f32,
    pub competition_area_width: f32,
    pub competition_area_height: f32,
    pub line_width: f32,

    pub backboard_width: f32,
    pub backboard_height: f32,
    pub backboard_depth: f32,
    pub basket_height: f32,
    pub basket_outer_radius: f32,
    pub basket_inner_radius: f32,

    pub ball_mass: f32,
    pub ball_radius: f32,
    /// Margin kept free of randomly placed balls along each axis
    pub ball_free_padding: f32,
    /// Speed a ball leaves the thrower with (m/s)
    pub ball_launch_speed: f32,
    pub ball_elasticity: f32,

    pub robot_mass: f32,
    pub robot_radius: f32,
    pub robot_height: f32,
    pub robot_elasticity: f32,

    /// Camera mount offset in the robot frame
    pub robot_camera_x: f32,
    pub robot_camera_y: f32,
    pub robot_camera_z: f32,
    /// Camera tilt about the robot's X axis
    pub robot_camera_r: f32,
    /// Vertical field of view (degrees)
    pub robot_camera_fov: f32,
    pub robot_camera_aspect: f32,
    pub robot_camera_near: f32,
    pub robot_camera_far: f32,

    /// Fraction of a free body's velocity kept after one second
    pub damping: f32,
    /// Elasticity of walls, backboards and basket tubes
    pub fixture_elasticity: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            area_width: 8.100,
            area_height: 6.000,
            play_area_width: 6.100,
            play_area_height: 4.000,
            competition_area_width: 4.600,
            competition_area_height: 3.100,
            line_width: 0.050,

            backboard_width: 0.660,
            backboard_height: 0.800,
            backboard_depth: 0.01,
            basket_height: 0.500,
            basket_outer_radius: 0.160 / 2.0,
            basket_inner_radius: 0.148 / 2.0,

            ball_mass: 0.024,
            ball_radius: 0.040 / 2.0,
            ball_free_padding: 0.9,
            ball_launch_speed: 4.0,
            ball_elasticity: 0.8,

            robot_mass: 4.0,
            robot_radius: 0.350 / 2.0,
            robot_height: 0.15,
            robot_elasticity: 0.0,

            robot_camera_x: 0.0,
            robot_camera_y: 0.0,
            robot_camera_z: 0.3,
            robot_camera_r: std::f32::consts::PI / 2.6,
            robot_camera_fov: 45.0,
            robot_camera_aspect: 16.0 / 9.0,
            robot_camera_near: 0.2,
            robot_camera_far: 5.0,

            damping: 0.75,
            fixture_elasticity: 0.3,
        }
    }
}

impl Arena {
    /// Center of a basket tube; `side` is -1 for the left basket, +1 for the right.
    pub fn basket_center(&self, side: f32) -> glam::Vec2 {
        glam::Vec2::new(
            side * (self.competition_area_width / 2.0 - self.basket_outer_radius),
            0.0,
        )
    }

    /// Reject geometry the physics step or camera cannot work with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("AREA_WIDTH", self.area_width),
            ("AREA_HEIGHT", self.area_height),
            ("COMPETITION_AREA_WIDTH", self.competition_area_width),
            ("COMPETITION_AREA_HEIGHT", self.competition_area_height),
            ("BACKBOARD_WIDTH", self.backboard_width),
            ("BACKBOARD_DEPTH", self.backboard_depth),
            ("BASKET_OUTER_RADIUS", self.basket_outer_radius),
            ("BASKET_INNER_RADIUS", self.basket_inner_radius),
            ("BALL_MASS", self.ball_mass),
            ("BALL_RADIUS", self.ball_radius),
            ("ROBOT_MASS", self.robot_mass),
            ("ROBOT_RADIUS", self.robot_radius),
            ("ROBOT_CAMERA_ASPECT", self.robot_camera_aspect),
            ("ROBOT_CAMERA_NEAR", self.robot_camera_near),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let finite = [
            ("PLAY_AREA_WIDTH", self.play_area_width),
            ("PLAY_AREA_HEIGHT", self.play_area_height),
            ("LINE_WIDTH", self.line_width),
            ("BACKBOARD_HEIGHT", self.backboard_height),
            ("BASKET_HEIGHT", self.basket_height),
            ("BALL_FREE_PADDING", self.ball_free_padding),
            ("BALL_LAUNCH_SPEED", self.ball_launch_speed),
            ("BALL_ELASTICITY", self.ball_elasticity),
            ("ROBOT_HEIGHT", self.robot_height),
            ("ROBOT_ELASTICITY", self.robot_elasticity),
            ("ROBOT_CAMERA_X", self.robot_camera_x),
            ("ROBOT_CAMERA_Y", self.robot_camera_y),
            ("ROBOT_CAMERA_Z", self.robot_camera_z),
            ("ROBOT_CAMERA_R", self.robot_camera_r),
            ("DAMPING", self.damping),
            ("FIXTURE_ELASTICITY", self.fixture_elasticity),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "{name} must be finite, got {value}"
            )));
        }

        if self.basket_inner_radius >= self.basket_outer_radius {
            return Err(Error::InvalidConfig(
                "BASKET_INNER_RADIUS must be smaller than BASKET_OUTER_RADIUS".into(),
            ));
        }
        if !(self.robot_camera_far > self.robot_camera_near) {
            return Err(Error::InvalidConfig(
                "ROBOT_CAMERA_FAR must be beyond ROBOT_CAMERA_NEAR".into(),
            ));
        }
        if !(self.robot_camera_fov > 0.0 && self.robot_camera_fov < 180.0) {
            return Err(Error::InvalidConfig(format!(
                "ROBOT_CAMERA_FOV must be within (0, 180) degrees, got {}",
                self.robot_camera_fov
            )));
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(Error::InvalidConfig(format!(
                "DAMPING must be within [0, 1], got {}",
                self.damping
            )));
        }
        if self.competition_area_width > self.area_width
            || self.competition_area_height > self.area_height
        {
            return Err(Error::InvalidConfig(
                "competition area does not fit inside the outer walls".into(),
            ));
        }

        Ok(())
    }
}

/// How robots are placed at world setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RobotSetup {
    /// Use the fixed corner start poses (at most two)
    Count(usize),
    /// Explicit `[x, y, angle]` start poses
    Poses(Vec<[f32; 3]>),
}

/// How balls are placed at world setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BallSetup {
    /// One ball at the center plus seeded random mirrored pairs
    Count(usize),
    /// Explicit `[x, y]` start positions
    Positions(Vec<[f32; 2]>),
}

/// Everything needed to build a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub arena: Arena,
    pub robots: RobotSetup,
    pub balls: BallSetup,
    /// Seed for random ball placement
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            robots: RobotSetup::Count(1),
            balls: BallSetup::Count(11),
            seed: 0,
        }
    }
}

impl WorldConfig {
    /// Parse a (possibly partial) JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded world configuration (seed {})", config.seed);
        Ok(config)
    }
}
