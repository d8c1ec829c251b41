//! Client-side mirror of the server's world. Nothing here simulates:
//! snapshots overwrite entity state, events drive short-lived visual
//! effects, and rendering reads a time-delayed interpolation buffer to
//! smooth out network jitter.

use log::debug;
use shared::{AttackKind, EntitySnapshot, GameEvent};
use std::collections::{HashMap, VecDeque};

/// Render positions this far behind the newest snapshot so there is
/// usually a pair of states to interpolate between.
const INTERPOLATION_DELAY: f64 = 0.1;
/// How much snapshot history to retain.
const BUFFER_WINDOW: f64 = 0.5;
/// How long a damage flash stays on screen.
const FLASH_DURATION: f32 = 0.15;
/// Minimum on-screen duration of a swing, for very short hit windows.
const MIN_SWING_DURATION: f32 = 0.15;

/// An attack animation in progress on some entity.
#[derive(Debug, Clone, Copy)]
pub struct Swing {
    pub kind: AttackKind,
    pub facing: i8,
    pub remaining: f32,
}

pub struct MirrorWorld {
    /// Latest known state per entity, merged from partial snapshots.
    entities: HashMap<u32, EntitySnapshot>,
    /// Timestamped world states for interpolation.
    buffer: VecDeque<(f64, Vec<EntitySnapshot>)>,
    flash: HashMap<u32, f32>,
    swings: HashMap<u32, Swing>,
    pub local_entity: Option<u32>,
    pub tick: u32,
    /// One-way delay of the newest state packet, for the HUD.
    pub ping_ms: u64,
}

impl MirrorWorld {
    pub fn new() -> Self {
        MirrorWorld {
            entities: HashMap::new(),
            buffer: VecDeque::new(),
            flash: HashMap::new(),
            swings: HashMap::new(),
            local_entity: None,
            tick: 0,
            ping_ms: 0,
        }
    }

    /// Merges one state broadcast. The server only sends entities whose
    /// state changed, so unchanged entities keep their last known values.
    pub fn apply_game_state(&mut self, now: f64, tick: u32, changed: Vec<EntitySnapshot>) {
        self.tick = tick;
        for snapshot in changed {
            self.entities.insert(snapshot.id, snapshot);
        }

        let state: Vec<EntitySnapshot> = self.entities.values().cloned().collect();
        self.buffer.push_back((now, state));
        while let Some((t, _)) = self.buffer.front() {
            if now - *t > BUFFER_WINDOW {
                self.buffer.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn apply_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::AttackStarted {
                entity_id,
                kind,
                facing,
            } => {
                self.swings.insert(
                    entity_id,
                    Swing {
                        kind,
                        facing,
                        remaining: kind.hit_window().max(MIN_SWING_DURATION),
                    },
                );
            }
            GameEvent::HealthChanged {
                entity_id,
                current,
                max,
            } => {
                if let Some(entity) = self.entities.get_mut(&entity_id) {
                    if current < entity.health {
                        self.flash.insert(entity_id, FLASH_DURATION);
                    }
                    entity.health = current;
                    entity.max_health = max;
                }
            }
            GameEvent::Died { entity_id } => {
                debug!("Entity {} died", entity_id);
                self.flash.insert(entity_id, FLASH_DURATION);
                if let Some(entity) = self.entities.get_mut(&entity_id) {
                    entity.health = 0;
                }
            }
            GameEvent::Respawned { entity_id, x, y } => {
                // Snap immediately; interpolating a respawn teleport would
                // drag the entity across the arena.
                if let Some(entity) = self.entities.get_mut(&entity_id) {
                    entity.x = x;
                    entity.y = y;
                    entity.health = entity.max_health;
                    entity.visible = true;
                }
                for (_, state) in self.buffer.iter_mut() {
                    state.retain(|s| s.id != entity_id);
                }
            }
            GameEvent::Despawned { entity_id } => {
                self.entities.remove(&entity_id);
                self.flash.remove(&entity_id);
                self.swings.remove(&entity_id);
                for (_, state) in self.buffer.iter_mut() {
                    state.retain(|s| s.id != entity_id);
                }
            }
        }
    }

    /// Advances effect timers by one frame.
    pub fn update(&mut self, dt: f32) {
        self.flash.retain(|_, t| {
            *t -= dt;
            *t > 0.0
        });
        self.swings.retain(|_, s| {
            s.remaining -= dt;
            s.remaining > 0.0
        });
    }

    pub fn is_flashing(&self, entity_id: u32) -> bool {
        self.flash.contains_key(&entity_id)
    }

    pub fn swing_of(&self, entity_id: u32) -> Option<&Swing> {
        self.swings.get(&entity_id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn local_snapshot(&self) -> Option<&EntitySnapshot> {
        self.local_entity.and_then(|id| self.entities.get(&id))
    }

    /// Entity states to draw this frame, interpolated between the two
    /// buffered snapshots bracketing `now - INTERPOLATION_DELAY`.
    pub fn render_states(&self, now: f64) -> Vec<EntitySnapshot> {
        let target = now - INTERPOLATION_DELAY;

        let mut older: Option<&(f64, Vec<EntitySnapshot>)> = None;
        let mut newer: Option<&(f64, Vec<EntitySnapshot>)> = None;
        for entry in &self.buffer {
            if entry.0 <= target {
                older = Some(entry);
            } else {
                newer = Some(entry);
                break;
            }
        }

        match (older, newer) {
            (Some((t0, from)), Some((t1, to))) => {
                let span = t1 - t0;
                let alpha = if span > 0.0 {
                    ((target - t0) / span).clamp(0.0, 1.0) as f32
                } else {
                    1.0
                };
                let from_by_id: HashMap<u32, &EntitySnapshot> =
                    from.iter().map(|s| (s.id, s)).collect();
                to.iter()
                    .map(|snap| match from_by_id.get(&snap.id) {
                        Some(prev) => lerp_snapshot(prev, snap, alpha),
                        None => snap.clone(),
                    })
                    .collect()
            }
            // Too little history: draw the newest known state.
            _ => self
                .buffer
                .back()
                .map(|(_, state)| state.clone())
                .unwrap_or_else(|| self.entities.values().cloned().collect()),
        }
    }
}

impl Default for MirrorWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn lerp_snapshot(from: &EntitySnapshot, to: &EntitySnapshot, alpha: f32) -> EntitySnapshot {
    let mut out = to.clone();
    out.x = from.x + (to.x - from.x) * alpha;
    out.y = from.y + (to.y - from.y) * alpha;
    out
}
