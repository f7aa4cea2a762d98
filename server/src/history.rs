//! Rolling history of world snapshots used for lag compensation

use shared::math::Vector3;
use shared::EntityId;
use std::collections::VecDeque;

/// Minimum number of snapshots kept regardless of age
const MIN_RETAINED: usize = 2;

/// One entity as it was at a snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    pub entity_id: EntityId,
    pub position: Vector3,
    pub alive: bool,
}

/// The whole world at one fixed step
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Render frame that produced the step
    pub frame: u64,
    pub simulated_time: f32,
    pub entities: Vec<EntityState>,
}

impl Snapshot {
    pub fn entity(&self, entity_id: EntityId) -> Option<&EntityState> {
        self.entities.iter().find(|e| e.entity_id == entity_id)
    }
}

/// Snapshots ordered by strictly increasing `simulated_time`
#[derive(Debug)]
pub struct SnapshotHistory {
    snapshots: VecDeque<Snapshot>,
    /// Seconds of history to keep
    retention: f32,
}

impl SnapshotHistory {
    pub fn new(retention: f32) -> Self {
        Self {
            snapshots: VecDeque::new(),
            retention,
        }
    }

    /// Appends a snapshot. Returns false, leaving the history untouched, when
    /// the snapshot is not newer than the latest one.
    pub fn push(&mut self, snapshot: Snapshot) -> bool {
        if let Some(latest) = self.snapshots.back() {
            if snapshot.simulated_time <= latest.simulated_time {
                return false;
            }
        }
        self.snapshots.push_back(snapshot);
        true
    }

    /// Drops snapshots older than the retention window, keeping at least two.
    pub fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.snapshots.len() > MIN_RETAINED && self.span() >= self.retention {
            self.snapshots.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Newest snapshot taken at or before `time`.
    pub fn at_or_before(&self, time: f32) -> Option<&Snapshot> {
        self.snapshots.iter().rev().find(|s| s.simulated_time <= time)
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    pub fn oldest(&self) -> Option<&Snapshot> {
        self.snapshots.front()
    }

    /// Time between the oldest and the newest snapshot
    pub fn span(&self) -> f32 {
        match (self.snapshots.front(), self.snapshots.back()) {
            (Some(oldest), Some(latest)) => latest.simulated_time - oldest.simulated_time,
            _ => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
