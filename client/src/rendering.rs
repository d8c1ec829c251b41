//! Macroquad rendering of the mirrored arena: level geometry, entities
//! with health bars, attack effects and a small HUD.

use crate::game::{MirrorWorld, Swing};
use macroquad::prelude::*;
use shared::{
    arena_solids, AttackKind, EntitySnapshot, ATTACK_BOX_OFFSET, ENTITY_SIZE, SLIME_BURST_RADIUS,
};

pub struct Renderer {
    local_entity: Option<u32>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer { local_entity: None }
    }

    pub fn set_local_entity(&mut self, entity_id: Option<u32>) {
        self.local_entity = entity_id;
    }

    pub fn render(&self, world: &MirrorWorld, states: &[EntitySnapshot], connected: bool) {
        clear_background(Color::from_rgba(26, 26, 30, 255));

        self.draw_level();

        for snapshot in states {
            if !snapshot.visible {
                continue;
            }
            self.draw_entity(world, snapshot);
        }

        self.draw_hud(world, states, connected);
    }

    fn draw_level(&self) {
        for (x, y, w, h) in arena_solids() {
            draw_rectangle(x, y, w, h, Color::from_rgba(68, 68, 72, 255));
            draw_rectangle_lines(x, y, w, h, 2.0, Color::from_rgba(96, 96, 100, 255));
        }
    }

    fn draw_entity(&self, world: &MirrorWorld, snapshot: &EntitySnapshot) {
        let dead = snapshot.health == 0;
        let base = if dead {
            Color::from_rgba(90, 90, 90, 255)
        } else {
            self.body_color(snapshot)
        };

        draw_rectangle(snapshot.x, snapshot.y, ENTITY_SIZE, ENTITY_SIZE, base);
        draw_rectangle_lines(snapshot.x, snapshot.y, ENTITY_SIZE, ENTITY_SIZE, 2.0, WHITE);

        if world.is_flashing(snapshot.id) {
            draw_rectangle(
                snapshot.x,
                snapshot.y,
                ENTITY_SIZE,
                ENTITY_SIZE,
                Color::from_rgba(255, 255, 255, 160),
            );
        }

        // Facing marker on the leading edge.
        if !dead {
            let marker_x = if snapshot.facing >= 0 {
                snapshot.x + ENTITY_SIZE - 4.0
            } else {
                snapshot.x
            };
            draw_rectangle(marker_x, snapshot.y + 10.0, 4.0, 12.0, BLACK);
        }

        if let Some(swing) = world.swing_of(snapshot.id) {
            self.draw_swing(snapshot, swing);
        }

        if !dead {
            self.draw_health_bar(snapshot);
        }
    }

    fn body_color(&self, snapshot: &EntitySnapshot) -> Color {
        use shared::EntityKind::*;
        match snapshot.kind {
            Player if Some(snapshot.id) == self.local_entity => GREEN,
            Player => Color::from_rgba(80, 140, 255, 255),
            Grunt => Color::from_rgba(255, 68, 68, 255),
            Slime => Color::from_rgba(170, 80, 220, 255),
        }
    }

    fn draw_swing(&self, snapshot: &EntitySnapshot, swing: &Swing) {
        let center = snapshot.center();
        match swing.kind {
            AttackKind::SlimeBurst => {
                draw_circle_lines(center.x, center.y, SLIME_BURST_RADIUS, 2.0, ORANGE);
            }
            kind => {
                let half_w = if kind == AttackKind::PlayerMelee {
                    25.0
                } else {
                    20.0
                };
                let cx = center.x + swing.facing as f32 * ATTACK_BOX_OFFSET;
                draw_rectangle_lines(cx - half_w, center.y - 16.0, half_w * 2.0, 32.0, 2.0, ORANGE);
            }
        }
    }

    fn draw_health_bar(&self, snapshot: &EntitySnapshot) {
        let width = ENTITY_SIZE;
        let filled = width * snapshot.health.max(0) as f32 / snapshot.max_health.max(1) as f32;
        let y = snapshot.y - 8.0;

        draw_rectangle(snapshot.x, y, width, 4.0, Color::from_rgba(40, 40, 40, 255));
        let color = if snapshot.health * 3 <= snapshot.max_health {
            RED
        } else {
            GREEN
        };
        draw_rectangle(snapshot.x, y, filled, 4.0, color);
    }

    fn draw_hud(&self, world: &MirrorWorld, states: &[EntitySnapshot], connected: bool) {
        let status = if connected {
            format!(
                "tick {} | {} entities | {} ms",
                world.tick,
                states.len(),
                world.ping_ms
            )
        } else {
            "connecting...".to_string()
        };
        draw_text(&status, 10.0, 20.0, 20.0, WHITE);

        if let Some(local) = world.local_snapshot() {
            draw_text(
                &format!("hp {}/{}", local.health, local.max_health),
                10.0,
                40.0,
                20.0,
                if local.health == 0 { RED } else { GREEN },
            );
            if local.health == 0 {
                draw_text("respawning...", 10.0, 60.0, 20.0, GRAY);
            }
        }

        draw_text(
            "A/D move  Space jump  J attack",
            10.0,
            (screen_height() - 10.0).max(20.0),
            18.0,
            Color::from_rgba(136, 136, 136, 255),
        );
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
