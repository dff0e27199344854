//! World controller
//!
//! Owns the arena, every robot and ball, and the physics space with the
//! game rules installed. All mutation happens through [`World::apply_action`],
//! [`World::tick`] and the one-shot flag read in [`World::vision`], so a
//! single owner can drive it without locks.

use std::f32::consts::{FRAC_PI_4, PI};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::camera::{Camera, project};
use super::physics::{Body, BodyHandle, Fixture, Space};
use super::rules;
use super::state::{
    Actor, Ball, BallPhase, Basket, COLLISION_BALL, COLLISION_BASKET, COLLISION_ROBOT,
    COLLISION_WALL, Robot,
};
use crate::error::{Error, Result};
use crate::protocol::{Action, BallState, FullSnapshot, RobotState, StateResponse, VisionFrame};
use crate::settings::{Arena, BallSetup, RobotSetup, WorldConfig};

/// Thickness (radius) of the outer wall segments
const WALL_RADIUS: f32 = 0.01;

pub struct World {
    arena: Arena,
    space: Space<Actor, Arena>,
    camera: Camera,
    baskets: [Basket; 2],
    robots: Vec<BodyHandle>,
    balls: Vec<BodyHandle>,
    time_ticks: u64,
}

impl World {
    /// Build the arena, place robots and balls, and install the contact rules
    pub fn new(config: &WorldConfig) -> Result<Self> {
        config.arena.validate()?;
        let arena = config.arena.clone();

        let mut space = Space::new(arena.damping);
        setup_geometry(&mut space, &arena);
        rules::install(&mut space);

        let robots = setup_robots(&mut space, &arena, &config.robots)?;
        let balls = setup_balls(&mut space, &arena, &config.balls, config.seed)?;

        log::info!(
            "World ready: {} robots, {} balls, seed {}",
            robots.len(),
            balls.len(),
            config.seed
        );

        Ok(Self {
            camera: Camera::new(&arena),
            baskets: Basket::pair(&arena),
            arena,
            space,
            robots,
            balls,
            time_ticks: 0,
        })
    }

    pub fn robot_count(&self) -> usize {
        self.robots.len()
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    /// Ticks advanced since construction
    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// Static arena configuration
    pub fn constants(&self) -> &Arena {
        &self.arena
    }

    pub fn baskets(&self) -> &[Basket; 2] {
        &self.baskets
    }

    pub fn robot(&self, index: usize) -> Option<&Body<Actor>> {
        self.robots.get(index).map(|&h| self.space.body(h))
    }

    pub fn ball(&self, index: usize) -> Option<&Body<Actor>> {
        self.balls.get(index).map(|&h| self.space.body(h))
    }

    pub fn ball_phase(&self, index: usize) -> Option<BallPhase> {
        self.ball(index)
            .and_then(|body| body.policy.as_ball())
            .map(|ball| ball.phase)
    }

    fn robot_handle(&self, index: usize) -> Result<BodyHandle> {
        self.robots.get(index).copied().ok_or(Error::InvalidIndex {
            index,
            count: self.robots.len(),
        })
    }

    /// Replace a robot's command; takes effect on the next tick
    pub fn apply_action(&mut self, robot_index: usize, action: &Action) -> Result<()> {
        let handle = self.robot_handle(robot_index)?;
        if let Some(robot) = self.space.body_mut(handle).policy.as_robot_mut() {
            robot.apply(action);
        }
        Ok(())
    }

    /// Advance physics by one step of `dt`; every rule transition happens here
    pub fn tick(&mut self, dt: f32) {
        self.space.step(dt, &self.arena);
        self.time_ticks += 1;
    }

    /// Positions of every robot and ball
    pub fn snapshot(&self) -> FullSnapshot {
        let robots = self
            .robots
            .iter()
            .map(|&h| self.space.body(h))
            .filter_map(|body| {
                let robot = body.policy.as_robot()?;
                let pos = body.position();
                Some(RobotState {
                    id: robot.id.clone(),
                    x: pos.x,
                    y: pos.y,
                    z: robot.z,
                    r: body.angle(),
                })
            })
            .collect();

        let balls = self
            .balls
            .iter()
            .map(|&h| self.space.body(h))
            .filter_map(|body| {
                let ball = body.policy.as_ball()?;
                let pos = body.position();
                Some(BallState {
                    id: ball.id.clone(),
                    x: pos.x,
                    y: pos.y,
                    z: ball.z,
                })
            })
            .collect();

        FullSnapshot { robots, balls }
    }

    /// What a robot's camera sees right now.
    ///
    /// Reading clears the robot's `ball_in_thrower` flag.
    pub fn vision(&mut self, robot_index: usize) -> Result<VisionFrame> {
        let handle = self.robot_handle(robot_index)?;
        let body = self.space.body(handle);
        let z = body.policy.as_robot().map_or(0.0, |robot| robot.z);
        let world_to_clip = self.camera.world_to_clip(body.position(), z, body.angle());

        let mut frame = VisionFrame::default();

        for basket in &self.baskets {
            if let Some(screen) = project(&world_to_clip, basket.center.extend(0.0)) {
                frame.baskets.insert(basket.name.to_string(), screen.to_array());
            }
        }

        let half_court = Vec2::new(
            self.arena.competition_area_width,
            self.arena.competition_area_height,
        ) / 2.0;
        for &h in &self.balls {
            let body = self.space.body(h);
            let Some(ball) = body.policy.as_ball() else {
                continue;
            };
            if !ball.on_floor() {
                continue;
            }
            // Cheap reject before projecting: only balls on the court count
            let pos = body.position();
            if pos.x.abs() + self.arena.ball_radius > half_court.x
                || pos.y.abs() + self.arena.ball_radius > half_court.y
            {
                continue;
            }
            if let Some(screen) = project(&world_to_clip, pos.extend(ball.z)) {
                frame.balls.push(screen.to_array());
            }
        }

        frame.ball_in_thrower = self
            .space
            .body_mut(handle)
            .policy
            .as_robot_mut()
            .is_some_and(Robot::take_ball_in_thrower);

        Ok(frame)
    }

    /// Vision for one robot, or the full snapshot when no robot is named
    pub fn state(&mut self, robot_index: Option<usize>) -> Result<StateResponse> {
        match robot_index {
            Some(index) => self.vision(index).map(StateResponse::Vision),
            None => Ok(StateResponse::Snapshot(self.snapshot())),
        }
    }
}

/// Outer walls, backboards and basket tubes
fn setup_geometry(space: &mut Space<Actor, Arena>, arena: &Arena) {
    let (hw, hh) = (arena.area_width / 2.0, arena.area_height / 2.0);
    let corners = [
        Vec2::new(-hw, -hh),
        Vec2::new(hw, -hh),
        Vec2::new(hw, hh),
        Vec2::new(-hw, hh),
    ];
    for i in 0..corners.len() {
        let wall = Fixture::segment(
            corners[i],
            corners[(i + 1) % corners.len()],
            WALL_RADIUS,
            COLLISION_WALL,
        );
        space.add_fixture(wall.with_elasticity(arena.fixture_elasticity));
    }

    let backboard_x = arena.competition_area_width / 2.0;
    let backboard_half = arena.backboard_width / 2.0;
    for side in [-1.0, 1.0] {
        let backboard = Fixture::segment(
            Vec2::new(side * backboard_x, -backboard_half),
            Vec2::new(side * backboard_x, backboard_half),
            arena.backboard_depth * 2.0,
            COLLISION_WALL,
        );
        space.add_fixture(backboard.with_elasticity(arena.fixture_elasticity));
    }

    for basket in Basket::pair(arena) {
        let tube = Fixture::circle(basket.center, arena.basket_outer_radius, COLLISION_BASKET);
        space.add_fixture(tube.with_elasticity(arena.fixture_elasticity));
    }
}

/// Whether a circle clears the outer walls
fn inside_walls(arena: &Arena, pos: Vec2, radius: f32) -> bool {
    let clearance = radius + WALL_RADIUS;
    pos.x.abs() + clearance <= arena.area_width / 2.0
        && pos.y.abs() + clearance <= arena.area_height / 2.0
}

fn setup_robots(
    space: &mut Space<Actor, Arena>,
    arena: &Arena,
    setup: &RobotSetup,
) -> Result<Vec<BodyHandle>> {
    let poses = match setup {
        RobotSetup::Count(n) => {
            let inset = arena.robot_radius + arena.line_width;
            let corner = [
                [
                    -arena.competition_area_width / 2.0 + inset,
                    -arena.competition_area_height / 2.0 + inset,
                    -FRAC_PI_4,
                ],
                [
                    arena.competition_area_width / 2.0 - inset,
                    arena.competition_area_height / 2.0 - inset,
                    PI * 3.0 / 4.0,
                ],
            ];
            if *n > corner.len() {
                return Err(Error::InvalidConfig(format!(
                    "{n} robots requested but only {} start corners exist; pass explicit poses",
                    corner.len()
                )));
            }
            corner[..*n].to_vec()
        }
        RobotSetup::Poses(poses) => poses.clone(),
    };

    poses
        .iter()
        .enumerate()
        .map(|(i, &[x, y, angle])| {
            if !(x.is_finite() && y.is_finite() && angle.is_finite()) {
                return Err(Error::InvalidConfig(format!("robot {i} has a non-finite pose")));
            }
            if !inside_walls(arena, Vec2::new(x, y), arena.robot_radius) {
                return Err(Error::InvalidConfig(format!(
                    "robot {i} at ({x}, {y}) does not fit inside the outer walls"
                )));
            }
            let robot = Robot::new(format!("r{i}"));
            let body = Body::circle(
                arena.robot_mass,
                arena.robot_radius,
                COLLISION_ROBOT,
                Actor::Robot(robot),
            )
            .with_elasticity(arena.robot_elasticity)
            .with_pose(Vec2::new(x, y), angle);
            Ok(space.add_body(body))
        })
        .collect()
}

fn setup_balls(
    space: &mut Space<Actor, Arena>,
    arena: &Arena,
    setup: &BallSetup,
    seed: u64,
) -> Result<Vec<BodyHandle>> {
    let positions: Vec<(String, Vec2)> = match setup {
        BallSetup::Count(0) => Vec::new(),
        BallSetup::Count(n) => {
            let pairs = (n - 1) / 2;
            let mut rng = Pcg32::seed_from_u64(seed);
            let spread = Vec2::new(
                arena.competition_area_width - arena.ball_free_padding,
                arena.competition_area_height - arena.ball_free_padding,
            );

            let mut placed = vec![("b0".to_string(), Vec2::ZERO)];
            for i in 0..pairs {
                let offset = Vec2::new(rng.random::<f32>() - 0.5, rng.random::<f32>() - 0.5);
                let pos = offset * spread;
                placed.push((format!("b{}", i + 1), pos));
                placed.push((format!("b{}", i + 1 + pairs), -pos));
            }
            placed
        }
        BallSetup::Positions(positions) => positions
            .iter()
            .enumerate()
            .map(|(i, &p)| (format!("b{i}"), Vec2::from(p)))
            .collect(),
    };

    positions
        .into_iter()
        .map(|(id, pos)| {
            if !pos.is_finite() {
                return Err(Error::InvalidConfig(format!("ball {id} has a non-finite position")));
            }
            if !inside_walls(arena, pos, arena.ball_radius) {
                return Err(Error::InvalidConfig(format!(
                    "ball {id} at ({}, {}) does not fit inside the outer walls",
                    pos.x, pos.y
                )));
            }
            let ball = Ball::new(id, arena);
            let body = Body::circle(arena.ball_mass, arena.ball_radius, COLLISION_BALL, Actor::Ball(ball))
                .with_elasticity(arena.ball_elasticity)
                .with_pose(pos, 0.0);
            Ok(space.add_body(body))
        })
        .collect()
}
