//! Simulated entities as explicit composition: one struct owning its
//! movement, combat, health and (for hostiles) AI state, constructed
//! together at spawn. No component lookup, no inheritance.

use crate::ai::AiState;
use shared::{
    AttackKind, EntityKind, EntitySnapshot, Faction, Vec2, ENTITY_SIZE, GRUNT_ATTACK_RANGE,
    GRUNT_DETECTION_RANGE, GRUNT_SPEED, PLAYER_ACCELERATION, PLAYER_FRICTION, PLAYER_SPEED,
    SLIME_ATTACK_RANGE, SLIME_DETECTION_RANGE, SLIME_SPEED,
};

/// Per-kind tuning, resolved once from the kind.
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub walk_speed: f32,
    pub accel: f32,
    pub friction: f32,
    pub detection_range: f32,
    pub attack_range: f32,
    pub attack: AttackKind,
}

pub fn stats_for(kind: EntityKind) -> Stats {
    match kind {
        EntityKind::Player => Stats {
            walk_speed: PLAYER_SPEED,
            accel: PLAYER_ACCELERATION,
            friction: PLAYER_FRICTION,
            detection_range: 0.0,
            attack_range: 0.0,
            attack: AttackKind::PlayerMelee,
        },
        EntityKind::Grunt => Stats {
            walk_speed: GRUNT_SPEED,
            accel: PLAYER_ACCELERATION,
            friction: PLAYER_FRICTION,
            detection_range: GRUNT_DETECTION_RANGE,
            attack_range: GRUNT_ATTACK_RANGE,
            attack: AttackKind::GruntMelee,
        },
        EntityKind::Slime => Stats {
            walk_speed: SLIME_SPEED,
            accel: PLAYER_ACCELERATION,
            friction: PLAYER_FRICTION,
            detection_range: SLIME_DETECTION_RANGE,
            attack_range: SLIME_ATTACK_RANGE,
            attack: AttackKind::SlimeBurst,
        },
    }
}

#[derive(Debug, Clone)]
pub struct MovementState {
    /// Horizontal velocity the integrator ramps toward.
    pub desired_vx: f32,
    pub accel: f32,
    pub friction: f32,
    /// Jump press edge latched by input, consumed by the next integration.
    pub jump_requested: bool,
    /// Whether the jump key is currently held, for variable jump height.
    pub jump_held: bool,
    /// Grace window after leaving a ledge during which a jump still fires.
    pub coyote_timer: f32,
    /// Window during which a pre-landing jump press stays pending.
    pub jump_buffer_timer: f32,
    /// Set while a jump impulse is active and an early release can cut it.
    pub jump_cut_armed: bool,
    /// Armed by leaving the floor, consumed by one landing evaluation.
    pub fall_check_armed: bool,
    pub last_grounded_y: f32,
}

impl MovementState {
    fn new(stats: &Stats, spawn: Vec2) -> Self {
        MovementState {
            desired_vx: 0.0,
            accel: stats.accel,
            friction: stats.friction,
            jump_requested: false,
            jump_held: false,
            coyote_timer: 0.0,
            jump_buffer_timer: 0.0,
            jump_cut_armed: false,
            fall_check_armed: false,
            last_grounded_y: spawn.y,
        }
    }

    pub fn reset_fall_tracking(&mut self, y: f32) {
        self.fall_check_armed = false;
        self.last_grounded_y = y;
    }
}

#[derive(Debug, Clone)]
pub struct CombatState {
    pub attack: AttackKind,
    /// Counts down to zero; attacking is possible only at zero.
    pub cooldown: f32,
    /// Remaining visual hit window; `attacking` while above zero.
    pub hit_window: f32,
    pub attacking: bool,
    /// Latched by input or AI, consumed once per tick.
    pub attack_requested: bool,
}

impl CombatState {
    fn new(attack: AttackKind) -> Self {
        CombatState {
            attack,
            cooldown: 0.0,
            hit_window: 0.0,
            attacking: false,
            attack_requested: false,
        }
    }

    pub fn reset(&mut self) {
        self.cooldown = 0.0;
        self.hit_window = 0.0;
        self.attacking = false;
        self.attack_requested = false;
    }
}

#[derive(Debug, Clone)]
pub struct HealthState {
    pub current: i32,
    pub max: i32,
    pub dead: bool,
    /// Enemy post-death countdown to destruction.
    pub despawn_timer: Option<f32>,
    /// Player post-death countdown to respawn.
    pub respawn_timer: Option<f32>,
}

impl HealthState {
    fn new(max: i32) -> Self {
        HealthState {
            current: max,
            max,
            dead: false,
            despawn_timer: None,
            respawn_timer: None,
        }
    }
}

#[derive(Debug)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
    /// Authority that simulates this entity. Mirrors carry a remote owner
    /// and are never stepped locally.
    pub owner: u32,
    /// Client whose inputs drive this entity (players only).
    pub controller: Option<u32>,
    pub pos: Vec2,
    pub vel: Vec2,
    pub facing: i8,
    pub on_floor: bool,
    pub visible: bool,
    pub movement: MovementState,
    pub combat: CombatState,
    pub health: HealthState,
    pub ai: Option<AiState>,
}

impl Entity {
    pub fn new(id: u32, kind: EntityKind, pos: Vec2, owner: u32, controller: Option<u32>) -> Self {
        let stats = stats_for(kind);
        let ai = match kind.faction() {
            Faction::Hostile => Some(AiState::new(kind, pos, Vec::new())),
            Faction::Player => None,
        };

        Entity {
            id,
            kind,
            owner,
            controller,
            pos,
            vel: Vec2::ZERO,
            facing: 1,
            on_floor: false,
            visible: true,
            movement: MovementState::new(&stats, pos),
            combat: CombatState::new(stats.attack),
            health: HealthState::new(kind.max_health()),
            ai,
        }
    }

    pub fn faction(&self) -> Faction {
        self.kind.faction()
    }

    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (
            self.pos.x,
            self.pos.y,
            self.pos.x + ENTITY_SIZE,
            self.pos.y + ENTITY_SIZE,
        )
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.pos.x + ENTITY_SIZE / 2.0, self.pos.y + ENTITY_SIZE / 2.0)
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            owner: self.owner,
            x: self.pos.x,
            y: self.pos.y,
            vel_x: self.vel.x,
            vel_y: self.vel.y,
            facing: self.facing,
            on_floor: self.on_floor,
            visible: self.visible,
            health: self.health.current,
            max_health: self.health.max,
        }
    }

    /// Rebuilds a read-only mirror of a remotely-owned entity.
    pub fn from_snapshot(snap: &EntitySnapshot) -> Self {
        let mut entity = Entity::new(
            snap.id,
            snap.kind,
            Vec2::new(snap.x, snap.y),
            snap.owner,
            None,
        );
        entity.vel = Vec2::new(snap.vel_x, snap.vel_y);
        entity.facing = snap.facing;
        entity.on_floor = snap.on_floor;
        entity.visible = snap.visible;
        entity.health.current = snap.health;
        entity.health.max = snap.max_health;
        entity.health.dead = snap.health == 0;
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_has_no_ai() {
        let entity = Entity::new(1, EntityKind::Player, Vec2::new(100.0, 518.0), 1, Some(7));
        assert!(entity.ai.is_none());
        assert_eq!(entity.controller, Some(7));
        assert_eq!(entity.health.current, shared::PLAYER_MAX_HEALTH);
        assert_eq!(entity.combat.attack, AttackKind::PlayerMelee);
    }

    #[test]
    fn test_hostiles_get_ai() {
        let grunt = Entity::new(2, EntityKind::Grunt, Vec2::new(500.0, 518.0), 1, None);
        let slime = Entity::new(3, EntityKind::Slime, Vec2::new(700.0, 518.0), 1, None);
        assert!(grunt.ai.is_some());
        assert!(slime.ai.is_some());
        assert_eq!(grunt.faction(), Faction::Hostile);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut entity = Entity::new(4, EntityKind::Grunt, Vec2::new(10.0, 20.0), 9, None);
        entity.vel = Vec2::new(-30.0, 5.0);
        entity.facing = -1;
        entity.health.current = 12;

        let mirror = Entity::from_snapshot(&entity.snapshot());
        assert_eq!(mirror.pos, entity.pos);
        assert_eq!(mirror.vel, entity.vel);
        assert_eq!(mirror.facing, -1);
        assert_eq!(mirror.owner, 9);
        assert_eq!(mirror.health.current, 12);
        assert!(!mirror.health.dead);
    }

    #[test]
    fn test_mirror_of_dead_entity_is_dead() {
        let mut entity = Entity::new(5, EntityKind::Player, Vec2::ZERO, 2, None);
        entity.health.current = 0;
        let mirror = Entity::from_snapshot(&entity.snapshot());
        assert!(mirror.health.dead);
    }
}
