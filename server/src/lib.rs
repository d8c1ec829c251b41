//! # Arena Server Library
//!
//! Authoritative simulation of a small 2D arena: players, patrolling and
//! hopping enemies, melee combat, health and respawn, all advanced by a
//! fixed-tick director and replicated to observers over UDP.
//!
//! ## Architecture
//!
//! The simulation is single-writer: every entity has exactly one owning
//! authority, and only the owner steps it. Remote entities exist locally as
//! read-only mirrors that are overwritten by snapshots, never simulated.
//! Cross-authority effects (a hit on a remotely-owned entity) travel as
//! requests to the target's owner, which re-validates and resolves them
//! with locally-known damage values.
//!
//! All external mutation — connects, disconnects, damage requests — is
//! queued as commands and drained at tick start, so a tick always runs
//! against a consistent world. Entities are stepped in ascending id order,
//! which makes same-tick interactions deterministic and resolves mutual
//! attacks without coordination.
//!
//! ## Module Organization
//!
//! - [`world`]: static collision geometry, floor resolution, line of sight,
//!   spawn points
//! - [`entity`]: entity composition (movement, combat, health, optional AI)
//! - [`movement`]: the shared per-entity integrator
//! - [`combat`]: attack shapes, cooldowns, one-shot hit resolution
//! - [`health`]: damage, death, despawn and respawn countdowns
//! - [`ai`]: enemy state machine with walker/hopper movement policies
//! - [`replication`]: ownership gate, on-change snapshot diffing, event and
//!   damage-request queues
//! - [`game`]: the simulation director tying the above into one tick
//! - [`client_manager`]: connected clients and chronological input buffering
//! - [`network`]: UDP socket tasks and the tick loop

pub mod ai;
pub mod client_manager;
pub mod combat;
pub mod entity;
pub mod game;
pub mod health;
pub mod movement;
pub mod network;
pub mod replication;
pub mod world;
