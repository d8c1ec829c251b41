//! The shared movement integrator. Entity-agnostic: players feed it input,
//! enemy AI feeds it a desired velocity, and both go through the same
//! gravity, ramp and floor-resolution path.

use crate::entity::Entity;
use crate::world::World;
use shared::{
    COYOTE_TIME, ENTITY_SIZE, FALL_GRAVITY_MULTIPLIER, GRAVITY, JUMP_BUFFER_TIME, JUMP_VELOCITY,
    MAX_FALL_SPEED, VARIABLE_JUMP_MULTIPLIER,
};

/// Raised when an airborne entity regains floor contact. Fall damage is
/// evaluated from this exactly once per landing.
#[derive(Debug, Clone, Copy)]
pub struct Landing {
    /// Downward speed at the moment of impact, before floor resolution.
    pub fall_speed: f32,
    /// Vertical drop since the last grounded position.
    pub fall_distance: f32,
}

/// Linear ramp toward `target`, clamped so a single step never overshoots.
pub fn move_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta * delta.signum()
    }
}

/// Advances one entity by `dt`: jump handling with coyote time, buffering
/// and variable height, gravity with the fall multiplier, horizontal ramp,
/// position integration, world resolution, facing. Pure per-entity
/// transform with no error conditions.
pub fn integrate(entity: &mut Entity, world: &World, dt: f32) -> Option<Landing> {
    let movement = &mut entity.movement;
    movement.jump_buffer_timer = (movement.jump_buffer_timer - dt).max(0.0);
    if movement.jump_requested {
        movement.jump_requested = false;
        movement.jump_buffer_timer = JUMP_BUFFER_TIME;
    }

    if entity.on_floor {
        movement.coyote_timer = COYOTE_TIME;
    } else {
        movement.coyote_timer = (movement.coyote_timer - dt).max(0.0);
    }

    // A buffered press fires on the floor or within the coyote window.
    if movement.jump_buffer_timer > 0.0 && (entity.on_floor || movement.coyote_timer > 0.0) {
        entity.vel.y = JUMP_VELOCITY;
        entity.on_floor = false;
        movement.jump_buffer_timer = 0.0;
        movement.coyote_timer = 0.0;
        movement.jump_cut_armed = true;
    }

    // Releasing the key while still rising shortens the jump.
    if movement.jump_cut_armed {
        if entity.on_floor || entity.vel.y >= 0.0 {
            movement.jump_cut_armed = false;
        } else if !movement.jump_held {
            entity.vel.y *= VARIABLE_JUMP_MULTIPLIER;
            movement.jump_cut_armed = false;
        }
    }

    if !entity.on_floor {
        let multiplier = if entity.vel.y > 0.0 {
            FALL_GRAVITY_MULTIPLIER
        } else {
            1.0
        };
        entity.vel.y += GRAVITY * multiplier * dt;
        entity.vel.y = entity.vel.y.min(MAX_FALL_SPEED);
    }

    let rate = if entity.movement.desired_vx != 0.0 {
        entity.movement.accel
    } else {
        entity.movement.friction
    };
    entity.vel.x = move_toward(entity.vel.x, entity.movement.desired_vx, rate * dt);

    if entity.vel.x > 0.0 {
        entity.facing = 1;
    } else if entity.vel.x < 0.0 {
        entity.facing = -1;
    }

    let impact_speed = entity.vel.y;
    let prev_bottom = entity.pos.y + ENTITY_SIZE;
    entity.pos.x += entity.vel.x * dt;
    entity.pos.y += entity.vel.y * dt;
    entity.on_floor = world.resolve_move(&mut entity.pos, &mut entity.vel, prev_bottom);

    let mut landing = None;
    if entity.on_floor {
        if entity.movement.fall_check_armed {
            entity.movement.fall_check_armed = false;
            landing = Some(Landing {
                fall_speed: impact_speed,
                fall_distance: entity.pos.y - entity.movement.last_grounded_y,
            });
        }
        entity.movement.last_grounded_y = entity.pos.y;
    } else {
        entity.movement.fall_check_armed = true;
    }

    landing
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{EntityKind, Vec2, ENTITY_SIZE, FLOOR_Y, PLAYER_ACCELERATION, PLAYER_SPEED};

    const DT: f32 = 1.0 / 60.0;

    fn grounded_player() -> Entity {
        let mut entity = Entity::new(
            1,
            EntityKind::Player,
            Vec2::new(100.0, FLOOR_Y - ENTITY_SIZE),
            1,
            Some(1),
        );
        entity.on_floor = true;
        entity
    }

    #[test]
    fn test_move_toward_never_overshoots() {
        assert_eq!(move_toward(0.0, 100.0, 30.0), 30.0);
        assert_eq!(move_toward(90.0, 100.0, 30.0), 100.0);
        assert_eq!(move_toward(0.0, -100.0, 30.0), -30.0);
        assert_eq!(move_toward(50.0, 50.0, 30.0), 50.0);
    }

    #[test]
    fn test_horizontal_ramp_toward_desired() {
        let world = World::arena();
        let mut entity = grounded_player();
        entity.movement.desired_vx = PLAYER_SPEED;

        integrate(&mut entity, &world, DT);
        assert_approx_eq!(entity.vel.x, PLAYER_ACCELERATION * DT, 0.01);
        assert!(entity.vel.x < PLAYER_SPEED);

        for _ in 0..20 {
            integrate(&mut entity, &world, DT);
        }
        assert_approx_eq!(entity.vel.x, PLAYER_SPEED, 0.01);
    }

    #[test]
    fn test_friction_stops_entity() {
        let world = World::arena();
        let mut entity = grounded_player();
        entity.vel.x = 200.0;
        entity.movement.desired_vx = 0.0;

        for _ in 0..20 {
            integrate(&mut entity, &world, DT);
        }
        assert_eq!(entity.vel.x, 0.0);
    }

    #[test]
    fn test_facing_follows_velocity_sign() {
        let world = World::arena();
        let mut entity = grounded_player();

        entity.movement.desired_vx = -PLAYER_SPEED;
        integrate(&mut entity, &world, DT);
        assert_eq!(entity.facing, -1);

        entity.movement.desired_vx = PLAYER_SPEED;
        for _ in 0..20 {
            integrate(&mut entity, &world, DT);
        }
        assert_eq!(entity.facing, 1);

        // Facing persists while standing still.
        entity.movement.desired_vx = 0.0;
        for _ in 0..20 {
            integrate(&mut entity, &world, DT);
        }
        assert_eq!(entity.facing, 1);
    }

    #[test]
    fn test_jump_only_from_floor() {
        let world = World::arena();
        let mut entity = grounded_player();

        entity.movement.jump_requested = true;
        integrate(&mut entity, &world, DT);
        assert!(entity.vel.y < 0.0);
        assert!(!entity.on_floor);

        let vel_before = entity.vel.y;
        entity.movement.jump_requested = true;
        integrate(&mut entity, &world, DT);
        // Airborne jump request is discarded; gravity keeps acting.
        assert!(entity.vel.y > vel_before);
    }

    #[test]
    fn test_fall_gravity_multiplier_applies_when_falling() {
        let world = World::arena();
        let mut rising = grounded_player();
        rising.pos.y = 100.0;
        rising.on_floor = false;
        rising.vel.y = -100.0;
        integrate(&mut rising, &world, DT);
        assert_approx_eq!(rising.vel.y, -100.0 + shared::GRAVITY * DT, 0.01);

        let mut falling = grounded_player();
        falling.pos.y = 100.0;
        falling.on_floor = false;
        falling.vel.y = 100.0;
        integrate(&mut falling, &world, DT);
        assert_approx_eq!(
            falling.vel.y,
            100.0 + shared::GRAVITY * FALL_GRAVITY_MULTIPLIER * DT,
            0.01
        );
    }

    #[test]
    fn test_fall_speed_clamped() {
        let world = World::arena();
        let mut entity = grounded_player();
        entity.pos.y = 0.0;
        entity.on_floor = false;
        entity.vel.y = MAX_FALL_SPEED - 1.0;
        integrate(&mut entity, &world, DT);
        assert_eq!(entity.vel.y, MAX_FALL_SPEED);
    }

    #[test]
    fn test_landing_reported_once() {
        let world = World::arena();
        let mut entity = grounded_player();
        entity.pos.y = FLOOR_Y - ENTITY_SIZE - 120.0;
        entity.on_floor = false;
        entity.movement.fall_check_armed = true;
        entity.movement.last_grounded_y = entity.pos.y;

        let mut landings = 0;
        let mut recorded = None;
        for _ in 0..120 {
            if let Some(landing) = integrate(&mut entity, &world, DT) {
                landings += 1;
                recorded = Some(landing);
            }
        }

        assert_eq!(landings, 1);
        let landing = recorded.unwrap();
        assert!(landing.fall_speed > 0.0);
        assert_approx_eq!(landing.fall_distance, 120.0, 1.0);
        assert!(entity.on_floor);
    }

    #[test]
    fn test_terminal_fall_lands_in_one_large_step() {
        // At a low tick rate one step covers more than the entity height;
        // the landing must still resolve instead of passing the floor.
        let world = World::arena();
        let mut entity = grounded_player();
        entity.pos.y = FLOOR_Y - ENTITY_SIZE - 40.0;
        entity.on_floor = false;
        entity.vel.y = MAX_FALL_SPEED;
        entity.movement.fall_check_armed = true;
        entity.movement.last_grounded_y = entity.pos.y;

        let landing = integrate(&mut entity, &world, 0.05);

        assert!(entity.on_floor);
        assert_eq!(entity.pos.y, FLOOR_Y - ENTITY_SIZE);
        assert!(landing.is_some());
    }

    #[test]
    fn test_coyote_window_allows_late_jump() {
        let world = World::arena();
        let mut entity = grounded_player();
        // One grounded tick loads the coyote window, then the entity walks
        // off a ledge.
        integrate(&mut entity, &world, DT);
        entity.on_floor = false;
        entity.pos.y -= 20.0;

        entity.movement.jump_requested = true;
        entity.movement.jump_held = true;
        integrate(&mut entity, &world, DT);
        assert!(entity.vel.y < -300.0);
    }

    #[test]
    fn test_expired_coyote_window_denies_jump() {
        let world = World::arena();
        let mut entity = grounded_player();
        integrate(&mut entity, &world, DT);
        entity.on_floor = false;
        entity.pos.y = 100.0;

        let expired = (COYOTE_TIME / DT) as u32 + 1;
        for _ in 0..expired {
            integrate(&mut entity, &world, DT);
        }

        entity.movement.jump_requested = true;
        entity.movement.jump_held = true;
        integrate(&mut entity, &world, DT);
        assert!(entity.vel.y > 0.0);
    }

    #[test]
    fn test_buffered_jump_fires_on_landing() {
        let world = World::arena();
        let mut entity = grounded_player();
        entity.pos.y = FLOOR_Y - ENTITY_SIZE - 20.0;
        entity.on_floor = false;
        entity.vel.y = 300.0;

        // Pressed shortly before touchdown.
        entity.movement.jump_requested = true;
        entity.movement.jump_held = true;

        let mut jumped = false;
        for _ in 0..6 {
            integrate(&mut entity, &world, DT);
            if entity.vel.y < -300.0 {
                jumped = true;
                break;
            }
        }
        assert!(jumped, "buffered press never produced a jump");
    }

    #[test]
    fn test_releasing_jump_cuts_ascent() {
        let world = World::arena();
        let mut entity = grounded_player();
        entity.movement.jump_requested = true;
        entity.movement.jump_held = true;
        integrate(&mut entity, &world, DT);
        let rising = entity.vel.y;
        assert_approx_eq!(rising, JUMP_VELOCITY + shared::GRAVITY * DT, 0.01);

        entity.movement.jump_held = false;
        integrate(&mut entity, &world, DT);
        assert_approx_eq!(
            entity.vel.y,
            rising * VARIABLE_JUMP_MULTIPLIER + shared::GRAVITY * DT,
            0.01
        );
    }

    #[test]
    fn test_leaving_floor_rearms_fall_check() {
        let world = World::arena();
        let mut entity = grounded_player();
        assert!(!entity.movement.fall_check_armed);

        entity.movement.jump_requested = true;
        integrate(&mut entity, &world, DT);
        assert!(entity.movement.fall_check_armed);
    }
}
