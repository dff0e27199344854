//! Commands and state payloads exchanged with controllers and viewers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::settings::Arena;

/// Command for one robot, applied atomically before the next tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Target linear velocity in the robot frame (+Y is forward)
    pub velocity: [f32; 2],
    /// Target angular velocity (rad/s, counter-clockwise)
    pub angular_velocity: f32,
    /// Thrower level: 0 retracted, anything above fires
    pub thrower: u32,
}

/// Public pose of a robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Heading angle
    pub r: f32,
}

/// Public position of a ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Global world state, as streamed to viewers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullSnapshot {
    pub robots: Vec<RobotState>,
    pub balls: Vec<BallState>,
}

/// What one robot's camera sees, in normalized screen coordinates
/// within (-0.5, 0.5)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionFrame {
    /// On-screen baskets by name
    pub baskets: BTreeMap<String, [f32; 2]>,
    /// On-screen resting balls
    pub balls: Vec<[f32; 2]>,
    /// A ball entered the thrower since the last vision query
    pub ball_in_thrower: bool,
}

/// Answer to a synchronous state query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateResponse {
    Vision(VisionFrame),
    Snapshot(FullSnapshot),
}

/// Message sent to a state stream subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum StreamMessage {
    /// Sent once, first
    Constants(Arena),
    /// Sent periodically afterwards
    State(FullSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_controller_json() {
        let action: Action =
            serde_json::from_str(r#"{"velocity": [0.1, 0.2], "angular_velocity": -0.5, "thrower": 100}"#)
                .unwrap();
        assert_eq!(action.velocity, [0.1, 0.2]);
        assert_eq!(action.angular_velocity, -0.5);
        assert_eq!(action.thrower, 100);
    }

    #[test]
    fn test_stream_message_envelope() {
        let msg = StreamMessage::State(FullSnapshot::default());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["payload"]["robots"], serde_json::json!([]));

        let msg = StreamMessage::Constants(Arena::default());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "constants");
        assert!(json["payload"]["BASKET_HEIGHT"].is_number());
    }

    #[test]
    fn test_vision_frame_shape() {
        let mut frame = VisionFrame::default();
        frame.baskets.insert("blue".into(), [0.1, -0.2]);
        frame.balls.push([0.0, 0.3]);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["baskets"]["blue"][0].as_f64().unwrap() as f32, 0.1);
        assert_eq!(json["balls"].as_array().unwrap().len(), 1);
        assert_eq!(json["ball_in_thrower"], false);
    }
}
