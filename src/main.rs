//! BBR simulator entry point
//!
//! Starts a simulation and drives robot 0 with a simple autonomous
//! controller that collects balls and throws them at the blue basket.
//!
//! Usage: `bbr-sim [config.json]`

use std::thread;

use bbr_sim::protocol::FullSnapshot;
use bbr_sim::{Action, Simulation, StateResponse, StreamMessage, VisionFrame, WorldConfig};

/// Basket the controller aims for
const TARGET_BASKET: &str = "blue";

/// Reactive ball-chasing controller working purely from camera frames
#[derive(Debug, Default)]
struct Controller {
    action: Action,
    ball_was_in_thrower: bool,
}

impl Controller {
    /// Decide the next action from the latest vision frame
    fn step(&mut self, frame: &VisionFrame) -> Action {
        self.update(frame);
        self.action
    }

    fn update(&mut self, frame: &VisionFrame) {
        let action = &mut self.action;
        let basket = frame.baskets.get(TARGET_BASKET);

        // The ball left the thrower: shot done
        if self.ball_was_in_thrower && !frame.ball_in_thrower {
            action.thrower = 0;
        }
        self.ball_was_in_thrower = frame.ball_in_thrower;

        if action.thrower > 0 {
            match basket {
                Some(&[x, _]) => action.velocity = [-x / 2.0, 0.2],
                None => action.thrower = 0,
            }
            return;
        }

        // Lowest on screen is closest
        let Some(&[ball_x, ball_y]) = frame.balls.iter().min_by(|a, b| a[1].total_cmp(&b[1])) else {
            action.velocity = [0.0, 0.0];
            action.angular_velocity = 0.5;
            return;
        };

        action.velocity = [0.0, ball_y + 0.35];
        action.angular_velocity = -ball_x * 2.0;

        if action.angular_velocity.abs() < 0.2 {
            action.velocity[0] = basket.map_or(-0.25, |&[x, _]| -x / 2.0);
        }

        let settled = action.velocity.iter().all(|v| v.abs() < 0.01);
        if settled && action.angular_velocity < 0.005 {
            *action = Action {
                thrower: 100,
                ..Default::default()
            };
        }
    }
}

/// Scored balls rest in a basket at floor level
fn scored(snapshot: &FullSnapshot) -> usize {
    snapshot.balls.iter().filter(|ball| ball.z == 0.0).count()
}

fn run() -> bbr_sim::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };

    let simulation = Simulation::start(&config)?;
    let stream = simulation.subscribe()?;
    thread::spawn(move || {
        let mut last = 0;
        for message in stream {
            match message {
                StreamMessage::Constants(arena) => log::info!(
                    "Arena {}x{} m, competition area {}x{} m",
                    arena.area_width,
                    arena.area_height,
                    arena.competition_area_width,
                    arena.competition_area_height
                ),
                StreamMessage::State(snapshot) => {
                    let count = scored(&snapshot);
                    if count != last {
                        log::info!("Scored: {count}/{}", snapshot.balls.len());
                        last = count;
                    }
                }
            }
        }
    });

    let handle = simulation.handle();
    let mut controller = Controller::default();
    let mut action = Action::default();
    loop {
        handle.submit_action(0, action)?;
        if let StateResponse::Vision(frame) = handle.query_state(Some(0))? {
            action = controller.step(&frame);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("BBR simulator starting...");

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(balls: Vec<[f32; 2]>, basket: Option<[f32; 2]>, ball_in_thrower: bool) -> VisionFrame {
        VisionFrame {
            baskets: basket
                .map(|b| (TARGET_BASKET.to_string(), b))
                .into_iter()
                .collect(),
            balls,
            ball_in_thrower,
        }
    }

    #[test]
    fn test_spins_when_nothing_in_view() {
        let mut controller = Controller::default();
        let action = controller.step(&frame(vec![], None, false));
        assert_eq!(action.velocity, [0.0, 0.0]);
        assert_eq!(action.angular_velocity, 0.5);
    }

    #[test]
    fn test_chases_lowest_ball() {
        let mut controller = Controller::default();
        let action = controller.step(&frame(vec![[0.3, 0.2], [-0.2, -0.1]], None, false));
        assert!((action.velocity[1] - 0.25).abs() < 1e-6);
        assert!((action.angular_velocity - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_fires_when_settled_then_retracts() {
        let mut controller = Controller::default();
        // Ball right at the thrower, basket centered
        let action = controller.step(&frame(vec![[0.0, -0.35]], Some([0.0, 0.1]), false));
        assert_eq!(action.thrower, 100);

        controller.step(&frame(vec![], Some([0.0, 0.1]), true));
        let action = controller.step(&frame(vec![], Some([0.0, 0.1]), false));
        assert_eq!(action.thrower, 0);
    }
}
