//! Single-writer replication boundary. Every entity has one owning
//! authority; only the owner simulates it, everyone else holds a mirror.
//! Cross-authority damage travels as a request to the target's owner, who
//! resolves the amount locally and never trusts a number off the wire.

use log::{debug, warn};
use shared::{AttackKind, EntitySnapshot, GameEvent};
use std::collections::HashMap;

/// A hit on a remotely-owned target, addressed to its authority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutboundDamage {
    pub authority: u32,
    pub target: u32,
    pub attacker: u32,
    pub kind: AttackKind,
}

/// Tracks what this authority owns, what it has told the network, and what
/// still needs to go out.
#[derive(Debug)]
pub struct ReplicationGateway {
    local_authority: u32,
    events: Vec<GameEvent>,
    outbound_damage: Vec<OutboundDamage>,
    /// Last snapshot sent per entity, for on-change filtering.
    last_sent: HashMap<u32, EntitySnapshot>,
}

impl ReplicationGateway {
    pub fn new(local_authority: u32) -> Self {
        ReplicationGateway {
            local_authority,
            events: Vec::new(),
            outbound_damage: Vec::new(),
            last_sent: HashMap::new(),
        }
    }

    pub fn local_authority(&self) -> u32 {
        self.local_authority
    }

    /// True when this process simulates the entity with `owner`.
    pub fn owns(&self, owner: u32) -> bool {
        owner == self.local_authority
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn append_events(&mut self, events: &mut Vec<GameEvent>) {
        self.events.append(events);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queues a hit for a target owned elsewhere. Hits on locally-owned
    /// targets must not come through here; the caller resolves those
    /// directly.
    pub fn queue_damage(&mut self, authority: u32, target: u32, attacker: u32, kind: AttackKind) {
        if self.owns(authority) {
            warn!(
                "Dropping damage request for locally-owned entity {} (attacker {})",
                target, attacker
            );
            return;
        }
        debug!(
            "Forwarding {:?} hit on entity {} to authority {}",
            kind, target, authority
        );
        self.outbound_damage.push(OutboundDamage {
            authority,
            target,
            attacker,
            kind,
        });
    }

    pub fn drain_outbound_damage(&mut self) -> Vec<OutboundDamage> {
        std::mem::take(&mut self.outbound_damage)
    }

    /// Filters `snapshots` down to entities whose replicated state changed
    /// since the last call, and records the new baseline.
    pub fn changed_snapshots(&mut self, snapshots: Vec<EntitySnapshot>) -> Vec<EntitySnapshot> {
        let mut changed = Vec::new();
        for snap in snapshots {
            match self.last_sent.get(&snap.id) {
                Some(previous) if *previous == snap => {}
                _ => {
                    self.last_sent.insert(snap.id, snap.clone());
                    changed.push(snap);
                }
            }
        }
        changed
    }

    /// Drops the replication baseline for a destroyed entity.
    pub fn forget(&mut self, entity_id: u32) {
        self.last_sent.remove(&entity_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{EntityKind, Vec2};

    fn snap(id: u32, x: f32) -> EntitySnapshot {
        let entity = crate::entity::Entity::new(id, EntityKind::Grunt, Vec2::new(x, 518.0), 1, None);
        entity.snapshot()
    }

    #[test]
    fn test_ownership_gate() {
        let gateway = ReplicationGateway::new(1);
        assert!(gateway.owns(1));
        assert!(!gateway.owns(2));
    }

    #[test]
    fn test_damage_to_local_entity_not_forwarded() {
        let mut gateway = ReplicationGateway::new(1);
        gateway.queue_damage(1, 5, 9, AttackKind::PlayerMelee);
        assert!(gateway.drain_outbound_damage().is_empty());
    }

    #[test]
    fn test_damage_to_remote_entity_forwarded_once() {
        let mut gateway = ReplicationGateway::new(1);
        gateway.queue_damage(2, 5, 9, AttackKind::PlayerMelee);

        let outbound = gateway.drain_outbound_damage();
        assert_eq!(outbound.len(), 1);
        assert_eq!(
            outbound[0],
            OutboundDamage {
                authority: 2,
                target: 5,
                attacker: 9,
                kind: AttackKind::PlayerMelee,
            }
        );
        assert!(gateway.drain_outbound_damage().is_empty());
    }

    #[test]
    fn test_unchanged_snapshots_filtered() {
        let mut gateway = ReplicationGateway::new(1);

        let first = gateway.changed_snapshots(vec![snap(1, 100.0), snap(2, 200.0)]);
        assert_eq!(first.len(), 2);

        // Nothing moved: nothing to send.
        let second = gateway.changed_snapshots(vec![snap(1, 100.0), snap(2, 200.0)]);
        assert!(second.is_empty());

        let third = gateway.changed_snapshots(vec![snap(1, 150.0), snap(2, 200.0)]);
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].id, 1);
    }

    #[test]
    fn test_forget_resends_after_reuse() {
        let mut gateway = ReplicationGateway::new(1);
        gateway.changed_snapshots(vec![snap(1, 100.0)]);
        gateway.forget(1);

        let resent = gateway.changed_snapshots(vec![snap(1, 100.0)]);
        assert_eq!(resent.len(), 1);
    }

    #[test]
    fn test_events_drain_in_order() {
        let mut gateway = ReplicationGateway::new(1);
        gateway.push_event(GameEvent::Died { entity_id: 3 });
        let mut more = vec![GameEvent::Despawned { entity_id: 3 }];
        gateway.append_events(&mut more);

        let drained = gateway.drain_events();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], GameEvent::Died { entity_id: 3 }));
        assert!(matches!(drained[1], GameEvent::Despawned { entity_id: 3 }));
        assert!(gateway.drain_events().is_empty());
    }
}
