//! The simulation director: owns the entity table and advances the world
//! one fixed tick at a time. All external mutation arrives as queued
//! commands drained at tick start, so a tick always observes a consistent
//! world. Entities are stepped in ascending id order to keep same-tick
//! interactions deterministic.

use crate::ai::TargetCandidate;
use crate::combat::{self, DamageEvent, TargetView};
use crate::entity::Entity;
use crate::health::{self, LifecycleOutcome};
use crate::movement;
use crate::replication::{OutboundDamage, ReplicationGateway};
use crate::world::World;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    AttackKind, EntityKind, EntitySnapshot, GameEvent, InputState, Vec2, PLAYER_SPEED,
};
use std::collections::{HashMap, VecDeque};

/// Deferred world mutations, applied in arrival order at the next tick.
#[derive(Debug)]
pub enum Command {
    SpawnPlayer { client_id: u32, entity_id: u32 },
    DespawnPlayer { client_id: u32 },
    DamageRequest {
        target: u32,
        attacker: u32,
        kind: AttackKind,
    },
}

pub struct GameState {
    tick: u32,
    entities: HashMap<u32, Entity>,
    next_entity_id: u32,
    world: World,
    rng: StdRng,
    gateway: ReplicationGateway,
    commands: VecDeque<Command>,
    /// client_id -> entity_id for connected players.
    controllers: HashMap<u32, u32>,
}

impl GameState {
    /// `seed` pins the AI RNG for tests; production passes `None`.
    pub fn new(local_authority: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        GameState {
            tick: 0,
            entities: HashMap::new(),
            next_entity_id: 1,
            world: World::arena(),
            rng,
            gateway: ReplicationGateway::new(local_authority),
            commands: VecDeque::new(),
            controllers: HashMap::new(),
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: u32) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn player_entity(&self, client_id: u32) -> Option<u32> {
        self.controllers.get(&client_id).copied()
    }

    /// Hands out the id a queued spawn will use, so the network layer can
    /// tell the client its entity id before the spawn tick runs.
    pub fn reserve_entity_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn queue_command(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    /// Spawns the default arena population.
    pub fn populate_arena(&mut self) {
        self.spawn_enemy(
            EntityKind::Grunt,
            Vec2::new(500.0, 518.0),
            vec![Vec2::new(420.0, 518.0), Vec2::new(620.0, 518.0)],
        );
        self.spawn_enemy(EntityKind::Slime, Vec2::new(700.0, 518.0), Vec::new());
    }

    pub fn spawn_enemy(&mut self, kind: EntityKind, pos: Vec2, waypoints: Vec<Vec2>) -> u32 {
        let id = self.reserve_entity_id();
        let mut entity = Entity::new(id, kind, pos, self.gateway.local_authority(), None);
        if !waypoints.is_empty() {
            entity.ai = Some(crate::ai::AiState::new(kind, pos, waypoints));
        }
        info!("Spawned {:?} as entity {} at ({}, {})", kind, id, pos.x, pos.y);
        self.entities.insert(id, entity);
        id
    }

    /// Installs a read-only mirror of an entity simulated elsewhere.
    pub fn insert_mirror(&mut self, snapshot: &EntitySnapshot) {
        if self.gateway.owns(snapshot.owner) {
            warn!("Refusing mirror of locally-owned entity {}", snapshot.id);
            return;
        }
        self.next_entity_id = self.next_entity_id.max(snapshot.id + 1);
        self.entities.insert(snapshot.id, Entity::from_snapshot(snapshot));
    }

    /// Latches one input frame onto the client's player entity. Ignored for
    /// unknown clients, mirrors, and dead players.
    pub fn apply_input(&mut self, client_id: u32, input: &InputState) {
        let Some(entity_id) = self.controllers.get(&client_id).copied() else {
            return;
        };
        let local = self.gateway.local_authority();
        let Some(entity) = self.entities.get_mut(&entity_id) else {
            return;
        };
        if entity.owner != local || entity.health.dead {
            return;
        }

        let mut direction = 0.0;
        if input.left {
            direction -= 1.0;
        }
        if input.right {
            direction += 1.0;
        }
        entity.movement.desired_vx = direction * PLAYER_SPEED;
        // The wire carries the held state; the press edge is detected here
        // and the held flag feeds variable jump height.
        if input.jump && !entity.movement.jump_held {
            entity.movement.jump_requested = true;
        }
        entity.movement.jump_held = input.jump;
        if input.attack {
            entity.combat.attack_requested = true;
        }
    }

    /// Resolves a hit reported by another authority against a locally-owned
    /// target. The amount comes from the attack kind; everything else is
    /// re-validated here. A remote attacker is expected to exist locally as
    /// a mirror, so a request naming an unknown attacker is dropped.
    pub fn apply_damage_request(&mut self, target: u32, attacker: u32, kind: AttackKind) {
        let Some(attacking) = self.entities.get(&attacker) else {
            debug!("Rejecting hit from unknown attacker {}", attacker);
            return;
        };
        if attacking.health.dead {
            debug!("Rejecting hit from dead attacker {}", attacker);
            return;
        }

        let local = self.gateway.local_authority();
        let mut events = Vec::new();
        match self.entities.get_mut(&target) {
            Some(entity) if entity.owner == local => {
                health::apply_damage(entity, kind.damage(), Some(attacker), &mut events);
            }
            Some(_) => warn!("Ignoring damage request for mirror entity {}", target),
            None => debug!("Ignoring damage request for unknown entity {}", target),
        }
        self.gateway.append_events(&mut events);
    }

    /// Advances the whole simulation by `dt`.
    pub fn step(&mut self, dt: f32) {
        while let Some(command) = self.commands.pop_front() {
            self.apply_command(command);
        }

        let mut ids: Vec<u32> = self.entities.keys().copied().collect();
        ids.sort_unstable();

        // Targeting and hit tests run against tick-start positions.
        let candidates = self.target_candidates(&ids);
        let views = self.target_views(&ids);

        let local = self.gateway.local_authority();
        let mut events = Vec::new();
        let mut hits: Vec<DamageEvent> = Vec::new();
        let mut despawned = Vec::new();

        for &id in &ids {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if entity.owner != local {
                continue;
            }

            if !entity.health.dead {
                if let Some(mut ai) = entity.ai.take() {
                    ai.think(entity, &candidates, &self.world, &mut self.rng, dt);
                    entity.ai = Some(ai);
                }

                let landing = movement::integrate(entity, &self.world, dt);
                if entity.kind == EntityKind::Player {
                    if let Some(landing) = landing {
                        health::apply_fall_damage(entity, &landing, &mut events);
                    }
                }

                combat::step_cooldowns(&mut entity.combat, dt);
                if entity.combat.attack_requested {
                    entity.combat.attack_requested = false;
                    if !entity.health.dead {
                        hits.extend(combat::perform_attack(entity, &views, &mut events));
                    }
                }
            }

            if health::step_lifecycle(entity, &self.world, dt, &mut events)
                == LifecycleOutcome::Despawn
            {
                despawned.push(id);
            }
        }

        for hit in hits {
            self.route_damage(hit, &mut events);
        }

        for id in despawned {
            info!("Destroying entity {}", id);
            self.entities.remove(&id);
            self.gateway.forget(id);
            events.push(GameEvent::Despawned { entity_id: id });
        }

        self.gateway.append_events(&mut events);
        self.tick += 1;
    }

    /// Applies one resolved hit: locally-owned targets take damage here,
    /// remote targets get a request queued to their authority. The attacker
    /// must still be alive at routing time.
    fn route_damage(&mut self, hit: DamageEvent, events: &mut Vec<GameEvent>) {
        let attacker_alive = self
            .entities
            .get(&hit.attacker)
            .map(|e| !e.health.dead)
            .unwrap_or(false);
        if !attacker_alive {
            return;
        }

        let local = self.gateway.local_authority();
        match self.entities.get_mut(&hit.target) {
            Some(entity) if entity.owner == local => {
                health::apply_damage(entity, hit.kind.damage(), Some(hit.attacker), events);
            }
            Some(entity) => {
                let owner = entity.owner;
                self.gateway.queue_damage(owner, hit.target, hit.attacker, hit.kind);
            }
            None => {}
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::SpawnPlayer {
                client_id,
                entity_id,
            } => {
                let spawn = self.world.spawn_position(client_id);
                let entity = Entity::new(
                    entity_id,
                    EntityKind::Player,
                    spawn,
                    self.gateway.local_authority(),
                    Some(client_id),
                );
                info!(
                    "Spawned player entity {} for client {} at ({}, {})",
                    entity_id, client_id, spawn.x, spawn.y
                );
                self.entities.insert(entity_id, entity);
                self.controllers.insert(client_id, entity_id);
            }
            Command::DespawnPlayer { client_id } => {
                if let Some(entity_id) = self.controllers.remove(&client_id) {
                    info!("Removing player entity {} (client {})", entity_id, client_id);
                    self.entities.remove(&entity_id);
                    self.gateway.forget(entity_id);
                    self.gateway
                        .push_event(GameEvent::Despawned { entity_id });
                }
            }
            Command::DamageRequest {
                target,
                attacker,
                kind,
            } => self.apply_damage_request(target, attacker, kind),
        }
    }

    fn target_candidates(&self, ids: &[u32]) -> Vec<TargetCandidate> {
        ids.iter()
            .filter_map(|id| self.entities.get(id))
            .map(|entity| TargetCandidate {
                id: entity.id,
                center: entity.center(),
                faction: entity.faction(),
                alive: !entity.health.dead,
            })
            .collect()
    }

    fn target_views(&self, ids: &[u32]) -> Vec<TargetView> {
        ids.iter()
            .filter_map(|id| self.entities.get(id))
            .map(|entity| TargetView {
                id: entity.id,
                faction: entity.faction(),
                bounds: entity.bounds(),
                alive: !entity.health.dead,
            })
            .collect()
    }

    /// Snapshots of entities whose replicated state changed this tick,
    /// in ascending id order.
    pub fn changed_snapshots(&mut self) -> Vec<EntitySnapshot> {
        let mut ids: Vec<u32> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        let snapshots = ids
            .iter()
            .filter_map(|id| self.entities.get(id))
            .map(Entity::snapshot)
            .collect();
        self.gateway.changed_snapshots(snapshots)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.gateway.drain_events()
    }

    pub fn drain_outbound_damage(&mut self) -> Vec<OutboundDamage> {
        self.gateway.drain_outbound_damage()
    }
}
