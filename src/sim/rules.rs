//! Contact rules: possession, scoring and misses
//!
//! One begin handler per contact pair. Each returns whether the physics
//! step should also apply a normal collision response. Handlers only read
//! and write the two participants, so the order in which contacts are
//! processed within a step does not change the outcome.

use super::physics::{Body, Fixture, Space};
use super::state::{
    Actor, BallPhase, COLLISION_BALL, COLLISION_BASKET, COLLISION_ROBOT, COLLISION_WALL,
};
use crate::settings::Arena;

/// Register all game rules with a physics space
pub fn install(space: &mut Space<Actor, Arena>) {
    space.on_body_contact(COLLISION_ROBOT, COLLISION_BALL, robot_ball);
    space.on_body_contact(COLLISION_BALL, COLLISION_BALL, ball_ball);
    space.on_fixture_contact(COLLISION_BALL, COLLISION_BASKET, ball_basket);
    space.on_fixture_contact(COLLISION_BALL, COLLISION_WALL, ball_wall);
}

/// An extended thrower swallows the ball and fires it; a retracted one just pushes it
pub fn robot_ball(robot_body: &mut Body<Actor>, ball_body: &mut Body<Actor>, arena: &Arena) -> bool {
    let (Some(robot), Some(ball)) = (robot_body.policy.as_robot_mut(), ball_body.policy.as_ball_mut())
    else {
        return true;
    };

    if !robot.thrower_extended() || ball.phase == BallPhase::Scored {
        return true;
    }

    ball.launch(
        &mut ball_body.kinematics,
        &robot_body.kinematics,
        arena.robot_radius,
        arena.ball_launch_speed,
    );
    robot.ball_in_thrower = true;
    log::debug!("{} launched {}", robot.id, ball.id);

    false
}

/// Airborne balls pass through each other
pub fn ball_ball(a: &mut Body<Actor>, b: &mut Body<Actor>, _arena: &Arena) -> bool {
    let launched = |body: &Body<Actor>| {
        body.policy
            .as_ball()
            .is_some_and(|ball| ball.phase == BallPhase::Launched)
    };
    !(launched(a) || launched(b))
}

/// A launched ball close enough to the tube center drops in; anything else hits the rim.
///
/// The hit test takes the smaller of the two signed axis offsets from the
/// center, which is looser than a circular test on the near side.
pub fn ball_basket(ball_body: &mut Body<Actor>, basket: &Fixture, arena: &Arena) -> bool {
    let Some(ball) = ball_body.policy.as_ball_mut() else {
        return true;
    };
    if ball.phase != BallPhase::Launched {
        return true;
    }

    let center = basket.center();
    let offset = ball_body.kinematics.position - center;
    if offset.min_element() < arena.basket_inner_radius {
        ball.score(&mut ball_body.kinematics, center);
        log::debug!("{} scored at ({:.2}, {:.2})", ball.id, center.x, center.y);
        return false;
    }

    true
}

/// A launched ball that reaches a wall or backboard missed and drops to the floor
pub fn ball_wall(ball_body: &mut Body<Actor>, _wall: &Fixture, _arena: &Arena) -> bool {
    if let Some(ball) = ball_body.policy.as_ball_mut() {
        if ball.phase == BallPhase::Launched {
            ball.land();
            log::debug!("{} missed", ball.id);
        }
    }
    true
}
