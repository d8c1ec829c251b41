//! # Arena Client Library
//!
//! Observer client for the arena server. The client never simulates game
//! rules: it mirrors replicated snapshots, applies events as visual
//! effects, interpolates between buffered states for smooth motion, and
//! forwards raw input frames for the server to interpret.
//!
//! ## Module Organization
//!
//! - [`network`]: non-blocking UDP connection polled from the frame loop
//! - [`game`]: the snapshot mirror, event effects and interpolation buffer
//! - [`input`]: keyboard sampling and input frame construction
//! - [`rendering`]: macroquad drawing of level, entities and HUD

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
