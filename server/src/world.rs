//! Static world geometry: solid rectangles, floor resolution after a move,
//! and the line-of-sight query used by enemy targeting. The simulation core
//! treats this as its collision collaborator and never does geometry itself.

use shared::{arena_solids, arena_spawn_points, Vec2, ENTITY_SIZE, WORLD_WIDTH};

/// An axis-aligned solid. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy)]
pub struct Solid {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Solid {
    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

pub struct World {
    solids: Vec<Solid>,
    spawn_points: Vec<Vec2>,
}

impl World {
    pub fn new(solids: Vec<Solid>, spawn_points: Vec<Vec2>) -> Self {
        World {
            solids,
            spawn_points,
        }
    }

    /// The default arena shared with the client renderer.
    pub fn arena() -> Self {
        let solids = arena_solids()
            .into_iter()
            .map(|(x, y, w, h)| Solid { x, y, w, h })
            .collect();
        World::new(solids, arena_spawn_points())
    }

    pub fn solids(&self) -> &[Solid] {
        &self.solids
    }

    /// Deterministic spawn placement: cycle the spawn-point list by stable id.
    pub fn spawn_position(&self, id: u32) -> Vec2 {
        if self.spawn_points.is_empty() {
            return Vec2::new(WORLD_WIDTH / 2.0, 0.0);
        }
        let index = (id.saturating_sub(1) as usize) % self.spawn_points.len();
        self.spawn_points[index]
    }

    /// Resolves an entity AABB (top-left `pos`, `ENTITY_SIZE` square) after
    /// integration. Clamps to lateral world bounds and the ceiling, snaps a
    /// falling entity onto solid tops, and reports floor contact.
    ///
    /// `prev_bottom` is the AABB's bottom edge before this tick's position
    /// update. Floor contact is detected by crossing a solid's top plane
    /// between `prev_bottom` and the new bottom, so the snap window grows
    /// with the distance actually travelled and a fast fall over a large
    /// `dt` cannot step past a solid.
    pub fn resolve_move(&self, pos: &mut Vec2, vel: &mut Vec2, prev_bottom: f32) -> bool {
        pos.x = pos.x.max(0.0).min(WORLD_WIDTH - ENTITY_SIZE);

        if pos.y <= 0.0 {
            pos.y = 0.0;
            vel.y = vel.y.max(0.0);
        }

        let left = pos.x;
        let right = pos.x + ENTITY_SIZE;
        let bottom = pos.y + ENTITY_SIZE;

        // When the sweep crosses several stacked solids, land on the highest.
        let mut landing_top: Option<f32> = None;
        if vel.y >= 0.0 {
            for solid in &self.solids {
                let horizontal_overlap = right > solid.x && left < solid.right();
                let crossed = prev_bottom <= solid.top() && bottom >= solid.top();
                if horizontal_overlap && crossed {
                    landing_top = Some(match landing_top {
                        Some(top) => top.min(solid.top()),
                        None => solid.top(),
                    });
                }
            }
        }

        if let Some(top) = landing_top {
            pos.y = top - ENTITY_SIZE;
            vel.y = 0.0;
        }
        landing_top.is_some()
    }

    /// True if the straight segment from `from` to `to` crosses no solid.
    /// Other actors never block sight; only world geometry counts.
    pub fn raycast_clear(&self, from: Vec2, to: Vec2) -> bool {
        for solid in &self.solids {
            if segment_hits_aabb(from, to, solid) {
                return false;
            }
        }
        true
    }
}

/// Slab test for a segment against one AABB.
fn segment_hits_aabb(from: Vec2, to: Vec2, solid: &Solid) -> bool {
    let dx = to.x - from.x;
    let dy = to.y - from.y;

    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = 1.0;

    for (origin, delta, lo, hi) in [
        (from.x, dx, solid.x, solid.right()),
        (from.y, dy, solid.top(), solid.bottom()),
    ] {
        if delta.abs() < f32::EPSILON {
            if origin < lo || origin > hi {
                return false;
            }
        } else {
            let mut t1 = (lo - origin) / delta;
            let mut t2 = (hi - origin) / delta;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return false;
            }
        }
    }

    true
}
