use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// World
pub const GRAVITY: f32 = 980.0;
pub const FALL_GRAVITY_MULTIPLIER: f32 = 1.5;
pub const MAX_FALL_SPEED: f32 = 1800.0;
pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const FLOOR_Y: f32 = 550.0;
pub const DEATH_ZONE_Y: f32 = 2000.0;
pub const ENTITY_SIZE: f32 = 32.0;

// Player movement
pub const PLAYER_SPEED: f32 = 300.0;
pub const PLAYER_ACCELERATION: f32 = 2000.0;
pub const PLAYER_FRICTION: f32 = 1500.0;
pub const JUMP_VELOCITY: f32 = -400.0;
pub const COYOTE_TIME: f32 = 0.15;
pub const JUMP_BUFFER_TIME: f32 = 0.1;
/// Factor applied to upward velocity when the jump key is released early.
pub const VARIABLE_JUMP_MULTIPLIER: f32 = 0.4;

// Fall damage
pub const FALL_DAMAGE_THRESHOLD: f32 = 800.0;
pub const INSTANT_DEATH_FALL_SPEED: f32 = 1500.0;
pub const FALL_DAMAGE_MULTIPLIER: f32 = 0.05;
pub const MIN_FALL_DISTANCE: f32 = 100.0;

// Player combat / lifecycle
pub const PLAYER_MAX_HEALTH: i32 = 100;
pub const PLAYER_ATTACK_COOLDOWN: f32 = 0.5;
pub const PLAYER_HIT_WINDOW: f32 = 0.1;
pub const PLAYER_RESPAWN_DELAY: f32 = 2.0;

// Grunt (walking melee enemy)
pub const GRUNT_MAX_HEALTH: i32 = 50;
pub const GRUNT_SPEED: f32 = 150.0;
pub const GRUNT_PATROL_SPEED_FACTOR: f32 = 0.5;
pub const GRUNT_DETECTION_RANGE: f32 = 300.0;
pub const GRUNT_ATTACK_RANGE: f32 = 40.0;
pub const GRUNT_ATTACK_COOLDOWN: f32 = 1.5;
pub const GRUNT_HIT_WINDOW: f32 = 0.2;

// Slime (hopping area-burst enemy)
pub const SLIME_MAX_HEALTH: i32 = 50;
pub const SLIME_SPEED: f32 = 150.0;
pub const SLIME_DETECTION_RANGE: f32 = 300.0;
pub const SLIME_ATTACK_RANGE: f32 = 60.0;
pub const SLIME_ATTACK_COOLDOWN: f32 = 1.5;
pub const SLIME_HIT_WINDOW: f32 = 0.4;
pub const SLIME_HOP_VELOCITY: f32 = -350.0;
pub const SLIME_IDLE_HOP_INTERVAL: f32 = 3.0;
pub const SLIME_AGGRO_HOP_INTERVAL: f32 = 1.0;
pub const SLIME_HOP_TOWARD_TARGET_CHANCE: f32 = 0.7;
pub const SLIME_BURST_RADIUS: f32 = 60.0;

// Shared enemy behavior
pub const PATROL_IDLE_WAIT: f32 = 1.0;
pub const PATROL_POINT_TOLERANCE: f32 = 10.0;
pub const DEFAULT_PATROL_SPAN: f32 = 100.0;
pub const ENEMY_DESPAWN_DELAY: f32 = 2.0;

// Melee attack boxes extend this far from the attacker's center
pub const ATTACK_BOX_OFFSET: f32 = 30.0;

/// A point or direction in 2D space. Positive y points down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance_to(&self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Static solid rectangles of the default arena, as (x, y, w, h) with the
/// origin at the top-left. Two floor slabs with a pit between them, plus a
/// pair of platforms. Both the server's collision world and the client's
/// renderer read this layout.
pub fn arena_solids() -> Vec<(f32, f32, f32, f32)> {
    vec![
        (0.0, FLOOR_Y, 340.0, WORLD_HEIGHT - FLOOR_Y),
        (400.0, FLOOR_Y, WORLD_WIDTH - 400.0, WORLD_HEIGHT - FLOOR_Y),
        (150.0, 430.0, 120.0, 20.0),
        (480.0, 400.0, 100.0, 20.0),
    ]
}

/// Spawn points cycled through by stable id. All rest on a floor slab.
pub fn arena_spawn_points() -> Vec<Vec2> {
    let y = FLOOR_Y - ENTITY_SIZE;
    vec![
        Vec2::new(100.0, y),
        Vec2::new(250.0, y),
        Vec2::new(620.0, y),
        Vec2::new(700.0, y),
    ]
}

/// Which side of the player/hostile divide an entity belongs to.
/// Gates who can damage whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Hostile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Grunt,
    Slime,
}

impl EntityKind {
    pub fn faction(&self) -> Faction {
        match self {
            EntityKind::Player => Faction::Player,
            EntityKind::Grunt | EntityKind::Slime => Faction::Hostile,
        }
    }

    pub fn max_health(&self) -> i32 {
        match self {
            EntityKind::Player => PLAYER_MAX_HEALTH,
            EntityKind::Grunt => GRUNT_MAX_HEALTH,
            EntityKind::Slime => SLIME_MAX_HEALTH,
        }
    }
}

/// Attack variants. Damage is a property of the attack type and is always
/// resolved locally on the authority that owns the target; damage values
/// carried by the wire are never trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackKind {
    PlayerMelee,
    GruntMelee,
    SlimeBurst,
}

impl AttackKind {
    pub fn damage(&self) -> i32 {
        match self {
            AttackKind::PlayerMelee => 20,
            AttackKind::GruntMelee => 10,
            AttackKind::SlimeBurst => 10,
        }
    }

    pub fn cooldown(&self) -> f32 {
        match self {
            AttackKind::PlayerMelee => PLAYER_ATTACK_COOLDOWN,
            AttackKind::GruntMelee => GRUNT_ATTACK_COOLDOWN,
            AttackKind::SlimeBurst => SLIME_ATTACK_COOLDOWN,
        }
    }

    pub fn hit_window(&self) -> f32 {
        match self {
            AttackKind::PlayerMelee => PLAYER_HIT_WINDOW,
            AttackKind::GruntMelee => GRUNT_HIT_WINDOW,
            AttackKind::SlimeBurst => SLIME_HIT_WINDOW,
        }
    }
}

/// The replicated view of one entity. Observers hold these as read-only
/// mirrors; only the owning authority ever computes new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: u32,
    pub kind: EntityKind,
    pub owner: u32,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub facing: i8,
    pub on_floor: bool,
    pub visible: bool,
    pub health: i32,
    pub max_health: i32,
}

impl EntitySnapshot {
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.x + ENTITY_SIZE, self.y + ENTITY_SIZE)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + ENTITY_SIZE / 2.0, self.y + ENTITY_SIZE / 2.0)
    }
}

/// One-shot notifications observers apply as visual effects. Cross-entity
/// outcomes (death, respawn, attack activation) replicate as events; field
/// state replicates as snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    AttackStarted {
        entity_id: u32,
        kind: AttackKind,
        facing: i8,
    },
    HealthChanged {
        entity_id: u32,
        current: i32,
        max: i32,
    },
    Died {
        entity_id: u32,
    },
    Respawned {
        entity_id: u32,
        x: f32,
        y: f32,
    },
    Despawned {
        entity_id: u32,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Input {
        sequence: u32,
        timestamp: u64,
        left: bool,
        right: bool,
        jump: bool,
        attack: bool,
    },
    Disconnect,

    Connected {
        client_id: u32,
        entity_id: u32,
    },
    GameState {
        tick: u32,
        timestamp: u64,
        last_processed_input: HashMap<u32, u32>,
        entities: Vec<EntitySnapshot>,
    },
    Event {
        event: GameEvent,
    },
    /// Directed request to the authority that owns `target`. The receiver
    /// re-validates everything; `kind` only names the attack variant.
    DamageRequest {
        target: u32,
        attacker: u32,
        kind: AttackKind,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct InputState {
    pub sequence: u32,
    pub timestamp: u64,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub attack: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_snapshot(id: u32, kind: EntityKind, x: f32, y: f32) -> EntitySnapshot {
        EntitySnapshot {
            id,
            kind,
            owner: 1,
            x,
            y,
            vel_x: 0.0,
            vel_y: 0.0,
            facing: 1,
            on_floor: true,
            visible: true,
            health: kind.max_health(),
            max_health: kind.max_health(),
        }
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(b.length(), 5.0);
    }

    #[test]
    fn test_snapshot_bounds_and_center() {
        let snap = test_snapshot(1, EntityKind::Player, 50.0, 75.0);
        let (x1, y1, x2, y2) = snap.bounds();
        assert_eq!(x1, 50.0);
        assert_eq!(y1, 75.0);
        assert_eq!(x2, 50.0 + ENTITY_SIZE);
        assert_eq!(y2, 75.0 + ENTITY_SIZE);

        let c = snap.center();
        assert_eq!(c.x, 50.0 + ENTITY_SIZE / 2.0);
        assert_eq!(c.y, 75.0 + ENTITY_SIZE / 2.0);
    }

    #[test]
    fn test_faction_mapping() {
        assert_eq!(EntityKind::Player.faction(), Faction::Player);
        assert_eq!(EntityKind::Grunt.faction(), Faction::Hostile);
        assert_eq!(EntityKind::Slime.faction(), Faction::Hostile);
    }

    #[test]
    fn test_attack_damage_is_fixed_per_kind() {
        assert_eq!(AttackKind::PlayerMelee.damage(), 20);
        assert_eq!(AttackKind::GruntMelee.damage(), 10);
        assert_eq!(AttackKind::SlimeBurst.damage(), 10);
    }

    #[test]
    fn test_packet_serialization_input() {
        let packet = Packet::Input {
            sequence: 123,
            timestamp: 456789,
            left: true,
            right: false,
            jump: true,
            attack: false,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Input {
                sequence,
                timestamp,
                left,
                right,
                jump,
                attack,
            } => {
                assert_eq!(sequence, 123);
                assert_eq!(timestamp, 456789);
                assert!(left);
                assert!(!right);
                assert!(jump);
                assert!(!attack);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_game_state() {
        let entities = vec![
            test_snapshot(1, EntityKind::Player, 100.0, 200.0),
            test_snapshot(2, EntityKind::Slime, 300.0, 400.0),
        ];

        let mut last_processed_input = HashMap::new();
        last_processed_input.insert(1, 10);

        let packet = Packet::GameState {
            tick: 42,
            timestamp: 123456789,
            last_processed_input,
            entities,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::GameState {
                tick,
                timestamp,
                last_processed_input,
                entities,
            } => {
                assert_eq!(tick, 42);
                assert_eq!(timestamp, 123456789);
                assert_eq!(last_processed_input.get(&1), Some(&10));
                assert_eq!(entities.len(), 2);
                assert_eq!(entities[0].id, 1);
                assert_eq!(entities[1].kind, EntityKind::Slime);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_damage_request() {
        let packet = Packet::DamageRequest {
            target: 7,
            attacker: 3,
            kind: AttackKind::GruntMelee,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::DamageRequest {
                target,
                attacker,
                kind,
            } => {
                assert_eq!(target, 7);
                assert_eq!(attacker, 3);
                assert_eq!(kind, AttackKind::GruntMelee);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_event_serialization() {
        let packet = Packet::Event {
            event: GameEvent::Respawned {
                entity_id: 4,
                x: 120.0,
                y: 518.0,
            },
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Event {
                event: GameEvent::Respawned { entity_id, x, y },
            } => {
                assert_eq!(entity_id, 4);
                assert_eq!(x, 120.0);
                assert_eq!(y, 518.0);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
