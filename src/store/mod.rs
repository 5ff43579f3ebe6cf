mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::chat::ParticipantId;

pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable row for a participant, keyed by its external id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub id: i64,
    pub external_id: ParticipantId,
}

/// Message history. Only raw text is ever recorded.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn find_or_create_participant(&self, external_id: ParticipantId) -> StoreResult<ParticipantRecord>;

    async fn save_message(
        &self,
        participant: &ParticipantRecord,
        content: &str,
        created_at: OffsetDateTime,
    ) -> StoreResult<()>;
}
