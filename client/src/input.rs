//! Keyboard sampling and input frame construction. Movement and jump keys
//! report held state; the server edge-detects jump presses and uses the
//! held flag for variable jump height. Attack reports press edges so one
//! keystroke maps to one action request.

use macroquad::prelude::{is_key_down, is_key_pressed, KeyCode};
use shared::{InputState, Packet};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct InputTracker {
    sequence: u32,
}

impl InputTracker {
    pub fn new() -> Self {
        InputTracker { sequence: 0 }
    }

    /// Reads the keyboard for this frame. A/Left and D/Right move, Space or
    /// W jumps, J attacks.
    pub fn sample(&mut self) -> InputState {
        let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
        let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);
        let jump = is_key_down(KeyCode::Space) || is_key_down(KeyCode::W);
        let attack = is_key_pressed(KeyCode::J);
        self.compose(left, right, jump, attack)
    }

    fn compose(&mut self, left: bool, right: bool, jump: bool, attack: bool) -> InputState {
        self.sequence += 1;
        InputState {
            sequence: self.sequence,
            timestamp: now_millis(),
            left,
            right,
            jump,
            attack,
        }
    }
}

impl Default for InputTracker {
    fn default() -> Self {
        Self::new()
    }
}

pub fn to_packet(input: &InputState) -> Packet {
    Packet::Input {
        sequence: input.sequence,
        timestamp: input.timestamp,
        left: input.left,
        right: input.right,
        jump: input.jump,
        attack: input.attack,
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_increments_per_frame() {
        let mut tracker = InputTracker::new();
        let first = tracker.compose(false, true, false, false);
        let second = tracker.compose(false, true, false, false);
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[test]
    fn test_packet_carries_all_fields() {
        let mut tracker = InputTracker::new();
        let input = tracker.compose(true, false, true, true);

        match to_packet(&input) {
            Packet::Input {
                sequence,
                left,
                right,
                jump,
                attack,
                ..
            } => {
                assert_eq!(sequence, 1);
                assert!(left);
                assert!(!right);
                assert!(jump);
                assert!(attack);
            }
            _ => panic!("Expected input packet"),
        }
    }

    #[test]
    fn test_timestamps_are_monotonic_enough() {
        let mut tracker = InputTracker::new();
        let first = tracker.compose(false, false, false, false);
        let second = tracker.compose(false, false, false, false);
        assert!(second.timestamp >= first.timestamp);
    }
}
