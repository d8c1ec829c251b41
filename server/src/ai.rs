//! Per-enemy decision logic. One state machine, with locomotion differences
//! expressed as a `MovementPolicy` variant dispatched each tick rather than
//! a subclass hierarchy: adding an enemy kind means adding a variant.

use crate::entity::{stats_for, Entity};
use crate::world::World;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use shared::{
    EntityKind, Faction, Vec2, DEFAULT_PATROL_SPAN, GRUNT_PATROL_SPEED_FACTOR, PATROL_IDLE_WAIT,
    PATROL_POINT_TOLERANCE, SLIME_AGGRO_HOP_INTERVAL, SLIME_HOP_TOWARD_TARGET_CHANCE,
    SLIME_HOP_VELOCITY, SLIME_IDLE_HOP_INTERVAL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiMode {
    Patrol,
    Chase,
    Attack,
    /// Terminal; never left within the entity's lifetime.
    Dead,
}

/// How an enemy moves. Walkers ground-patrol and chase; hoppers idle in
/// place and close distance with timed ballistic hops.
#[derive(Debug, Clone)]
pub enum MovementPolicy {
    Walker,
    Hopper { hop_timer: f32 },
}

/// A potential target as seen at tick start. Ids only; the entity behind a
/// candidate may have despawned, which simply makes it ineligible.
#[derive(Debug, Clone, Copy)]
pub struct TargetCandidate {
    pub id: u32,
    pub center: Vec2,
    pub faction: Faction,
    pub alive: bool,
}

#[derive(Debug)]
pub struct AiState {
    pub mode: AiMode,
    pub policy: MovementPolicy,
    pub waypoints: Vec<Vec2>,
    pub waypoint_index: usize,
    pub idle_timer: f32,
    /// Last known target, re-resolved every tick, never assumed alive.
    pub target: Option<u32>,
}

impl AiState {
    /// Builds AI state for a hostile kind. An empty waypoint list is
    /// repaired by synthesizing a symmetric pair around the spawn position.
    pub fn new(kind: EntityKind, spawn: Vec2, waypoints: Vec<Vec2>) -> Self {
        let waypoints = if waypoints.is_empty() {
            vec![
                Vec2::new(spawn.x - DEFAULT_PATROL_SPAN, spawn.y),
                Vec2::new(spawn.x + DEFAULT_PATROL_SPAN, spawn.y),
            ]
        } else {
            waypoints
        };

        let policy = match kind {
            EntityKind::Slime => MovementPolicy::Hopper { hop_timer: 0.0 },
            _ => MovementPolicy::Walker,
        };

        AiState {
            mode: AiMode::Patrol,
            policy,
            waypoints,
            waypoint_index: 0,
            idle_timer: 0.0,
            target: None,
        }
    }

    /// One decision tick: acquire a target, transition, act.
    pub fn think(
        &mut self,
        entity: &mut Entity,
        candidates: &[TargetCandidate],
        world: &World,
        rng: &mut StdRng,
        dt: f32,
    ) {
        if entity.health.dead {
            self.mode = AiMode::Dead;
        }
        if self.mode == AiMode::Dead {
            entity.movement.desired_vx = 0.0;
            return;
        }

        let stats = stats_for(entity.kind);
        let nearest = nearest_eligible(entity, candidates, world, stats.detection_range);
        self.target = nearest.map(|(id, _, _)| id);

        let next_mode = match nearest {
            None => AiMode::Patrol,
            Some((_, _, distance)) if distance <= stats.attack_range => AiMode::Attack,
            Some(_) => AiMode::Chase,
        };
        if next_mode != self.mode {
            debug!("Entity {} entering {:?} state", entity.id, next_mode);
            self.mode = next_mode;
        }

        let target_center = nearest.map(|(_, center, _)| center);
        match &mut self.policy {
            MovementPolicy::Walker => {
                walker_act(
                    self.mode,
                    entity,
                    target_center,
                    &self.waypoints,
                    &mut self.waypoint_index,
                    &mut self.idle_timer,
                    stats.walk_speed,
                    dt,
                );
            }
            MovementPolicy::Hopper { hop_timer } => {
                hopper_act(
                    self.mode,
                    entity,
                    target_center,
                    hop_timer,
                    stats.walk_speed,
                    rng,
                    dt,
                );
            }
        }
    }
}

/// Nearest alive player candidate within `detection_range` with an
/// unobstructed line of sight. Candidates are scanned in ascending id
/// order and a strictly-nearer rule keeps the lowest id on ties.
fn nearest_eligible(
    entity: &Entity,
    candidates: &[TargetCandidate],
    world: &World,
    detection_range: f32,
) -> Option<(u32, Vec2, f32)> {
    let eye = entity.center();
    let mut best: Option<(u32, Vec2, f32)> = None;

    let mut sorted: Vec<&TargetCandidate> = candidates.iter().collect();
    sorted.sort_by_key(|c| c.id);

    for candidate in sorted {
        if candidate.id == entity.id || !candidate.alive {
            continue;
        }
        if candidate.faction != Faction::Player {
            continue;
        }
        let distance = eye.distance_to(candidate.center);
        if distance > detection_range {
            continue;
        }
        if !world.raycast_clear(eye, candidate.center) {
            continue;
        }
        match best {
            Some((_, _, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate.id, candidate.center, distance)),
        }
    }

    best
}

#[allow(clippy::too_many_arguments)]
fn walker_act(
    mode: AiMode,
    entity: &mut Entity,
    target_center: Option<Vec2>,
    waypoints: &[Vec2],
    waypoint_index: &mut usize,
    idle_timer: &mut f32,
    walk_speed: f32,
    dt: f32,
) {
    match mode {
        AiMode::Patrol => {
            let waypoint = waypoints[*waypoint_index % waypoints.len()];
            if entity.pos.distance_to(waypoint) < PATROL_POINT_TOLERANCE {
                entity.movement.desired_vx = 0.0;
                *idle_timer += dt;
                if *idle_timer >= PATROL_IDLE_WAIT {
                    *waypoint_index = (*waypoint_index + 1) % waypoints.len();
                    *idle_timer = 0.0;
                }
            } else {
                let dir = (waypoint.x - entity.pos.x).signum();
                entity.movement.desired_vx = dir * walk_speed * GRUNT_PATROL_SPEED_FACTOR;
            }
        }
        AiMode::Chase => match target_center {
            Some(center) => {
                let dir = (center.x - entity.center().x).signum();
                entity.movement.desired_vx = dir * walk_speed;
            }
            None => entity.movement.desired_vx = 0.0,
        },
        AiMode::Attack => {
            entity.movement.desired_vx = 0.0;
            entity.combat.attack_requested = true;
        }
        AiMode::Dead => entity.movement.desired_vx = 0.0,
    }
}

fn hopper_act(
    mode: AiMode,
    entity: &mut Entity,
    target_center: Option<Vec2>,
    hop_timer: &mut f32,
    speed: f32,
    rng: &mut StdRng,
    dt: f32,
) {
    // Grounded hoppers bleed leftover hop momentum instead of walking.
    if entity.on_floor {
        entity.movement.desired_vx = 0.0;
    }

    *hop_timer += dt;
    let interval = if target_center.is_some() {
        SLIME_AGGRO_HOP_INTERVAL
    } else {
        SLIME_IDLE_HOP_INTERVAL
    };

    if *hop_timer >= interval && entity.on_floor {
        *hop_timer = 0.0;

        entity.vel.y = SLIME_HOP_VELOCITY;
        entity.on_floor = false;

        let vx = match target_center {
            Some(center) if rng.gen::<f32>() < SLIME_HOP_TOWARD_TARGET_CHANCE => {
                (center.x - entity.center().x).signum() * speed * 0.8
            }
            _ => rng.gen_range(-0.5..0.5) * speed * 0.5,
        };
        entity.vel.x = vx;
        // Hold the impulse for the whole arc; landing stops it.
        entity.movement.desired_vx = vx;
    }

    if mode == AiMode::Attack {
        entity.combat.attack_requested = true;
    }
}
