use std::collections::BTreeSet;

use super::ParticipantId;

/// Participants currently joined to the room.
#[derive(Debug, Default)]
pub struct Registry {
    active: BTreeSet<ParticipantId>,
}

impl Registry {
    /// Returns `false` when `id` was already active.
    pub fn join(&mut self, id: ParticipantId) -> bool {
        self.active.insert(id)
    }

    /// Returns `false` when `id` was not active.
    pub fn leave(&mut self, id: ParticipantId) -> bool {
        self.active.remove(&id)
    }

    pub fn is_active(&self, id: ParticipantId) -> bool {
        self.active.contains(&id)
    }

    /// Point-in-time copy of every active participant except `excluding`.
    pub fn snapshot_others(&self, excluding: ParticipantId) -> Vec<ParticipantId> {
        self.active
            .iter()
            .copied()
            .filter(|&id| id != excluding)
            .collect()
    }

    pub fn size(&self) -> usize {
        self.active.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.active.iter().copied()
    }
}
