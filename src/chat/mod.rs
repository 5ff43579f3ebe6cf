mod escape;
mod pseudonym;
mod registry;
mod relay;

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

pub use escape::{escape_markdown, RESERVED};
pub use pseudonym::{Pseudonyms, ANONYMOUS, DEFAULT_POOL};
pub use registry::Registry;
pub use relay::{Broadcast, Delivery, Relay, Report};

/// Externally issued account id of a chat user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub i64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("participant {0} has not joined the chat")]
    NotJoined(ParticipantId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// `false` when the participant was already active.
    pub newly: bool,
    pub pseudonym: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub id: ParticipantId,
    pub pseudonym: String,
}

#[derive(Debug, Default)]
struct Members {
    registry: Registry,
    pseudonyms: Pseudonyms,
}

/// Room membership and pseudonyms, shared by every handler.
///
/// Both live behind one lock so a snapshot never sees a half-applied
/// join or eviction.
#[derive(Debug, Clone, Default)]
pub struct Chat {
    members: Arc<Mutex<Members>>,
}

impl Chat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pseudonyms(pseudonyms: Pseudonyms) -> Self {
        Self {
            members: Arc::new(Mutex::new(Members {
                registry: Registry::default(),
                pseudonyms,
            })),
        }
    }

    pub async fn join(&self, id: ParticipantId) -> Joined {
        let mut members = self.members.lock().await;
        let pseudonym = members.pseudonyms.ensure_assigned(id);
        let newly = members.registry.join(id);
        Joined { newly, pseudonym }
    }

    pub async fn leave(&self, id: ParticipantId) -> bool {
        self.members.lock().await.registry.leave(id)
    }

    pub async fn is_active(&self, id: ParticipantId) -> bool {
        self.members.lock().await.registry.is_active(id)
    }

    pub async fn snapshot_others(&self, excluding: ParticipantId) -> Vec<ParticipantId> {
        self.members.lock().await.registry.snapshot_others(excluding)
    }

    pub async fn size(&self) -> usize {
        self.members.lock().await.registry.size()
    }

    pub async fn ensure_assigned(&self, id: ParticipantId) -> String {
        self.members.lock().await.pseudonyms.ensure_assigned(id)
    }

    pub async fn lookup(&self, id: ParticipantId) -> String {
        self.members.lock().await.pseudonyms.lookup(id).to_owned()
    }

    /// Pseudonym of `id` if it may speak, checked and assigned under one lock.
    pub async fn speaker(&self, id: ParticipantId) -> Result<String, ChatError> {
        let mut members = self.members.lock().await;
        if !members.registry.is_active(id) {
            return Err(ChatError::NotJoined(id));
        }
        Ok(members.pseudonyms.ensure_assigned(id))
    }

    /// Every active participant with its pseudonym, ordered by id.
    pub async fn roster(&self) -> Vec<RosterEntry> {
        let members = self.members.lock().await;
        members
            .registry
            .iter()
            .map(|id| RosterEntry {
                id,
                pseudonym: members.pseudonyms.lookup(id).to_owned(),
            })
            .collect()
    }
}
