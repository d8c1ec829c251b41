//! Health, death and the post-death lifecycle. Damage is clamped, death is
//! idempotent, and despawn/respawn are countdown fields advanced by the
//! tick, never deferred callbacks.

use crate::ai::AiMode;
use crate::entity::Entity;
use crate::movement::Landing;
use crate::world::World;
use log::{debug, info};
use shared::{
    Faction, GameEvent, Vec2, DEATH_ZONE_Y, ENEMY_DESPAWN_DELAY, FALL_DAMAGE_MULTIPLIER,
    FALL_DAMAGE_THRESHOLD, INSTANT_DEATH_FALL_SPEED, MIN_FALL_DISTANCE, PLAYER_RESPAWN_DELAY,
};

/// What the director must do with the entity after a lifecycle step.
#[derive(Debug, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Keep,
    /// Post-death delay elapsed for an enemy; destroy the entity.
    Despawn,
}

/// Applies `amount` damage. No-op on the already dead; clamps at zero and
/// triggers death when zero is reached.
pub fn apply_damage(entity: &mut Entity, amount: i32, attacker: Option<u32>, events: &mut Vec<GameEvent>) {
    if entity.health.dead {
        return;
    }

    entity.health.current = (entity.health.current - amount).max(0);
    events.push(GameEvent::HealthChanged {
        entity_id: entity.id,
        current: entity.health.current,
        max: entity.health.max,
    });

    debug!(
        "Entity {} took {} damage from {:?} ({}/{})",
        entity.id, amount, attacker, entity.health.current, entity.health.max
    );

    if entity.health.current == 0 {
        die(entity, events);
    }
}

/// Environmental damage from a landing. Speeds past the instant-death
/// threshold force health to zero regardless of the multiplier.
pub fn apply_fall_damage(entity: &mut Entity, landing: &Landing, events: &mut Vec<GameEvent>) {
    if entity.health.dead {
        return;
    }
    if landing.fall_distance <= MIN_FALL_DISTANCE || landing.fall_speed <= FALL_DAMAGE_THRESHOLD {
        return;
    }

    if landing.fall_speed >= INSTANT_DEATH_FALL_SPEED {
        apply_damage(entity, entity.health.current, None, events);
    } else {
        let damage = ((landing.fall_speed - FALL_DAMAGE_THRESHOLD) * FALL_DAMAGE_MULTIPLIER) as i32;
        if damage > 0 {
            apply_damage(entity, damage, None, events);
        }
    }
}

/// Idempotent death transition: halts the entity, resets combat, arms the
/// faction-specific post-death countdown and emits `Died` exactly once.
pub fn die(entity: &mut Entity, events: &mut Vec<GameEvent>) {
    if entity.health.dead {
        return;
    }

    entity.health.dead = true;
    entity.health.current = 0;
    entity.vel = Vec2::ZERO;
    entity.movement.desired_vx = 0.0;
    entity.combat.reset();
    if let Some(ai) = entity.ai.as_mut() {
        ai.mode = AiMode::Dead;
    }

    match entity.faction() {
        Faction::Hostile => {
            entity.health.despawn_timer = Some(ENEMY_DESPAWN_DELAY);
        }
        Faction::Player => {
            entity.health.respawn_timer = Some(PLAYER_RESPAWN_DELAY);
            entity.visible = false;
        }
    }

    info!("Entity {} ({:?}) died", entity.id, entity.kind);
    events.push(GameEvent::Died {
        entity_id: entity.id,
    });
}

/// Advances the death-zone check and post-death countdowns by `dt`.
pub fn step_lifecycle(
    entity: &mut Entity,
    world: &World,
    dt: f32,
    events: &mut Vec<GameEvent>,
) -> LifecycleOutcome {
    if !entity.health.dead && entity.pos.y > DEATH_ZONE_Y {
        apply_damage(entity, entity.health.current, None, events);
    }

    if !entity.health.dead {
        return LifecycleOutcome::Keep;
    }

    if let Some(timer) = entity.health.despawn_timer.as_mut() {
        *timer -= dt;
        if *timer <= 0.0 {
            return LifecycleOutcome::Despawn;
        }
    }

    if let Some(timer) = entity.health.respawn_timer.as_mut() {
        *timer -= dt;
        if *timer <= 0.0 {
            let spawn = world.spawn_position(entity.controller.unwrap_or(entity.id));
            respawn(entity, spawn, events);
        }
    }

    LifecycleOutcome::Keep
}

/// Brings a dead player back at `spawn`: full health, zero velocity,
/// visibility and collision restored, fall tracking reset.
fn respawn(entity: &mut Entity, spawn: Vec2, events: &mut Vec<GameEvent>) {
    entity.health.dead = false;
    entity.health.current = entity.health.max;
    entity.health.respawn_timer = None;
    entity.pos = spawn;
    entity.vel = Vec2::ZERO;
    entity.on_floor = false;
    entity.visible = true;
    entity.movement.desired_vx = 0.0;
    // A press buffered before death must not fire on respawn.
    entity.movement.jump_requested = false;
    entity.movement.jump_buffer_timer = 0.0;
    entity.movement.coyote_timer = 0.0;
    entity.movement.jump_cut_armed = false;
    entity.movement.reset_fall_tracking(spawn.y);

    info!("Entity {} respawned at ({}, {})", entity.id, spawn.x, spawn.y);
    events.push(GameEvent::Respawned {
        entity_id: entity.id,
        x: spawn.x,
        y: spawn.y,
    });
    events.push(GameEvent::HealthChanged {
        entity_id: entity.id,
        current: entity.health.current,
        max: entity.health.max,
    });
}
