//! Deferred authoritative actions fired by the world loop

use shared::EntityId;

/// Work the world performs once simulated time reaches a trigger time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduledAction {
    /// Validate a stomp claimed by `attacker` at `claim_time`
    ResolveHit {
        attacker: EntityId,
        target: EntityId,
        claim_time: f32,
    },
    /// Move a dead entity to a random spawn point
    RelocateToSpawn { entity: EntityId },
    /// Bring a dead entity back to life
    Respawn { entity: EntityId },
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    trigger_time: f32,
    action: ScheduledAction,
}

/// Actions waiting for their trigger time, in insertion order
#[derive(Debug, Default)]
pub struct ActionQueue {
    entries: Vec<Entry>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, trigger_time: f32, action: ScheduledAction) {
        self.entries.push(Entry {
            trigger_time,
            action,
        });
    }

    /// Removes and returns the earliest-inserted action due at `time`.
    ///
    /// Callers loop on this so actions scheduled while firing are still seen
    /// in the same pass.
    pub fn pop_due(&mut self, time: f32) -> Option<ScheduledAction> {
        let index = self.entries.iter().position(|e| e.trigger_time <= time)?;
        Some(self.entries.remove(index).action)
    }

    /// Drops every pending action that refers to `entity`.
    pub fn cancel_for(&mut self, entity: EntityId) {
        self.entries.retain(|e| match e.action {
            ScheduledAction::ResolveHit {
                attacker, target, ..
            } => attacker != entity && target != entity,
            ScheduledAction::RelocateToSpawn { entity: id }
            | ScheduledAction::Respawn { entity: id } => id != entity,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_due_in_insertion_order() {
        let mut queue = ActionQueue::new();
        queue.schedule_at(2.0, ScheduledAction::Respawn { entity: 1 });
        queue.schedule_at(1.0, ScheduledAction::Respawn { entity: 2 });
        queue.schedule_at(5.0, ScheduledAction::Respawn { entity: 3 });

        assert_eq!(queue.pop_due(2.0), Some(ScheduledAction::Respawn { entity: 1 }));
        assert_eq!(queue.pop_due(2.0), Some(ScheduledAction::Respawn { entity: 2 }));
        assert_eq!(queue.pop_due(2.0), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_actions_fire_once() {
        let mut queue = ActionQueue::new();
        queue.schedule_at(1.0, ScheduledAction::RelocateToSpawn { entity: 4 });

        assert!(queue.pop_due(1.0).is_some());
        assert!(queue.pop_due(1.0).is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_for_entity() {
        let mut queue = ActionQueue::new();
        queue.schedule_at(
            1.0,
            ScheduledAction::ResolveHit {
                attacker: 1,
                target: 2,
                claim_time: 1.0,
            },
        );
        queue.schedule_at(4.0, ScheduledAction::Respawn { entity: 2 });
        queue.schedule_at(4.0, ScheduledAction::Respawn { entity: 3 });

        queue.cancel_for(2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_due(10.0), Some(ScheduledAction::Respawn { entity: 3 }));
    }
}
