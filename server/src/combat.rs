//! Attack cooldowns, hit windows and hit resolution. Damage is evaluated
//! exactly once at activation against a positional snapshot of candidates;
//! the open hit window that follows is a timing/visual artifact only.

use crate::entity::{CombatState, Entity};
use log::debug;
use shared::{
    AttackKind, Faction, GameEvent, Vec2, ATTACK_BOX_OFFSET, SLIME_BURST_RADIUS,
};

/// Where an attack lands, positioned from the attacker's center and facing.
#[derive(Debug, Clone, Copy)]
pub enum AttackShape {
    Box {
        center: Vec2,
        half_w: f32,
        half_h: f32,
    },
    Circle {
        center: Vec2,
        radius: f32,
    },
}

pub fn attack_shape(kind: AttackKind, attacker_center: Vec2, facing: i8) -> AttackShape {
    let dir = facing as f32;
    match kind {
        AttackKind::PlayerMelee => AttackShape::Box {
            center: Vec2::new(attacker_center.x + dir * ATTACK_BOX_OFFSET, attacker_center.y),
            half_w: 25.0,
            half_h: 16.0,
        },
        AttackKind::GruntMelee => AttackShape::Box {
            center: Vec2::new(attacker_center.x + dir * ATTACK_BOX_OFFSET, attacker_center.y),
            half_w: 20.0,
            half_h: 16.0,
        },
        AttackKind::SlimeBurst => AttackShape::Circle {
            center: attacker_center,
            radius: SLIME_BURST_RADIUS,
        },
    }
}

/// Overlap between an attack shape and an entity AABB `(x1, y1, x2, y2)`.
pub fn shape_overlaps(shape: &AttackShape, bounds: (f32, f32, f32, f32)) -> bool {
    let (x1, y1, x2, y2) = bounds;
    match shape {
        AttackShape::Box {
            center,
            half_w,
            half_h,
        } => {
            !(center.x + half_w <= x1
                || x2 <= center.x - half_w
                || center.y + half_h <= y1
                || y2 <= center.y - half_h)
        }
        AttackShape::Circle { center, radius } => {
            let nearest_x = center.x.clamp(x1, x2);
            let nearest_y = center.y.clamp(y1, y2);
            let dx = center.x - nearest_x;
            let dy = center.y - nearest_y;
            dx * dx + dy * dy < radius * radius
        }
    }
}

/// A candidate the hit test runs against; built from the tick-start
/// positional snapshot, never from live entity references.
#[derive(Debug, Clone, Copy)]
pub struct TargetView {
    pub id: u32,
    pub faction: Faction,
    pub bounds: (f32, f32, f32, f32),
    pub alive: bool,
}

/// A resolved hit. Routed through the replication gateway; the damage
/// amount comes from `kind` on the target's authority, never from here.
#[derive(Debug, Clone, Copy)]
pub struct DamageEvent {
    pub target: u32,
    pub attacker: u32,
    pub kind: AttackKind,
}

pub fn step_cooldowns(combat: &mut CombatState, dt: f32) {
    if combat.cooldown > 0.0 {
        combat.cooldown = (combat.cooldown - dt).max(0.0);
    }
    if combat.attacking {
        combat.hit_window -= dt;
        if combat.hit_window <= 0.0 {
            combat.hit_window = 0.0;
            combat.attacking = false;
        }
    }
}

pub fn can_attack(combat: &CombatState) -> bool {
    combat.cooldown <= 0.0 && !combat.attacking
}

/// True when the attacker's faction may damage the candidate's.
fn faction_allows(attacker: Faction, target: Faction) -> bool {
    match attacker {
        // Players hit rival players and hostiles alike.
        Faction::Player => true,
        Faction::Hostile => target == Faction::Player,
    }
}

/// Attempts an attack. Silent no-op unless `can_attack`; on success arms
/// cooldown and hit window, announces the swing and resolves overlaps once.
pub fn perform_attack(
    attacker: &mut Entity,
    targets: &[TargetView],
    events: &mut Vec<GameEvent>,
) -> Vec<DamageEvent> {
    if !can_attack(&attacker.combat) {
        return Vec::new();
    }

    let kind = attacker.combat.attack;
    attacker.combat.attacking = true;
    attacker.combat.cooldown = kind.cooldown();
    attacker.combat.hit_window = kind.hit_window();

    events.push(GameEvent::AttackStarted {
        entity_id: attacker.id,
        kind,
        facing: attacker.facing,
    });

    let shape = attack_shape(kind, attacker.center(), attacker.facing);
    let mut hits = Vec::new();
    for target in targets {
        if target.id == attacker.id || !target.alive {
            continue;
        }
        if !faction_allows(attacker.faction(), target.faction) {
            continue;
        }
        if shape_overlaps(&shape, target.bounds) {
            debug!("Entity {} hit entity {}", attacker.id, target.id);
            hits.push(DamageEvent {
                target: target.id,
                attacker: attacker.id,
                kind,
            });
        }
    }

    hits
}
