use async_trait::async_trait;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::chat::ParticipantId;

use super::{ParticipantRecord, Store, StoreResult};

const CREATE_PARTICIPANTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL UNIQUE
)"#;

const CREATE_MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    participant_id INTEGER NOT NULL REFERENCES participants(id),
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
)"#;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Creates the tables if they do not exist yet.
    pub async fn init(&self) -> StoreResult<()> {
        sqlx::query(CREATE_PARTICIPANTS_TABLE).execute(&self.db_pool).await?;
        sqlx::query(CREATE_MESSAGES_TABLE).execute(&self.db_pool).await?;
        Ok(())
    }

    pub async fn message_count(&self, external_id: ParticipantId) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages m JOIN participants p ON p.id=m.participant_id WHERE p.external_id=?",
        )
            .bind(external_id.to_string())
            .fetch_one(&self.db_pool)
            .await?;
        Ok(count)
    }

    /// Raw contents sent by `external_id`, oldest first.
    pub async fn history(&self, external_id: ParticipantId) -> StoreResult<Vec<(String, OffsetDateTime)>> {
        Ok(sqlx::query_as(
            "SELECT m.content,m.created_at FROM messages m JOIN participants p ON p.id=m.participant_id WHERE p.external_id=? ORDER BY m.rowid",
        )
            .bind(external_id.to_string())
            .fetch_all(&self.db_pool)
            .await?)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_or_create_participant(&self, external_id: ParticipantId) -> StoreResult<ParticipantRecord> {
        let external = external_id.to_string();
        sqlx::query("INSERT INTO participants (external_id) VALUES (?) ON CONFLICT(external_id) DO NOTHING")
            .bind(&external)
            .execute(&self.db_pool)
            .await?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM participants WHERE external_id=?")
            .bind(&external)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(ParticipantRecord { id, external_id })
    }

    async fn save_message(
        &self,
        participant: &ParticipantRecord,
        content: &str,
        created_at: OffsetDateTime,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO messages (id,participant_id,content,created_at) VALUES (?,?,?,?)")
            .bind(Uuid::now_v7().to_string())
            .bind(participant.id)
            .bind(content)
            .bind(created_at)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }
}
