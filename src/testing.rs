//! In-memory collaborators for tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    chat::ParticipantId,
    store::{ParticipantRecord, Store, StoreError, StoreResult},
    transport::{DeliveryError, Outbound, Transport},
};

/// Records every send attempt and fails the ones it was told to.
#[derive(Default)]
pub struct MockTransport {
    attempts: Mutex<Vec<(ParticipantId, Outbound)>>,
    failures: Mutex<HashMap<ParticipantId, DeliveryError>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_for(&self, recipient: ParticipantId, err: DeliveryError) {
        self.failures.lock().await.insert(recipient, err);
    }

    pub async fn attempts(&self) -> Vec<(ParticipantId, Outbound)> {
        self.attempts.lock().await.clone()
    }

    pub async fn attempts_to(&self, recipient: ParticipantId) -> Vec<Outbound> {
        self.attempts
            .lock()
            .await
            .iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, recipient: ParticipantId, payload: &Outbound) -> Result<(), DeliveryError> {
        self.attempts.lock().await.push((recipient, payload.clone()));
        match self.failures.lock().await.get(&recipient) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MockStore {
    participants: Mutex<Vec<ParticipantId>>,
    messages: Mutex<Vec<(ParticipantId, String)>>,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn messages(&self) -> Vec<(ParticipantId, String)> {
        self.messages.lock().await.clone()
    }

    fn check(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MockStore {
    async fn find_or_create_participant(&self, external_id: ParticipantId) -> StoreResult<ParticipantRecord> {
        self.check()?;
        let mut participants = self.participants.lock().await;
        let position = match participants.iter().position(|&id| id == external_id) {
            Some(position) => position,
            None => {
                participants.push(external_id);
                participants.len() - 1
            }
        };
        Ok(ParticipantRecord { id: position as i64 + 1, external_id })
    }

    async fn save_message(
        &self,
        participant: &ParticipantRecord,
        content: &str,
        _created_at: OffsetDateTime,
    ) -> StoreResult<()> {
        self.check()?;
        self.messages.lock().await.push((participant.external_id, content.to_owned()));
        Ok(())
    }
}
