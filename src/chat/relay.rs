use std::{collections::HashMap, sync::Arc};

use futures_util::future::join_all;
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    store::Store,
    transport::{DeliveryError, MediaKind, Outbound, Transport},
};

use super::{escape_markdown, Chat, ChatError, ParticipantId};

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Permanent failure; the recipient was removed from the room.
    Evicted,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub attempted: usize,
    pub delivered: usize,
    pub evicted: usize,
    pub failed: usize,
}

/// Deliveries of one message that are already under way.
///
/// Dropping this does not cancel them.
#[derive(Debug)]
pub struct Broadcast {
    deliveries: Vec<oneshot::Receiver<Delivery>>,
}

impl Broadcast {
    pub fn attempted(&self) -> usize {
        self.deliveries.len()
    }

    /// Waits for every delivery to settle.
    pub async fn finish(self) -> Report {
        let mut report = Report {
            attempted: self.deliveries.len(),
            ..Report::default()
        };

        for outcome in join_all(self.deliveries).await {
            match outcome {
                Ok(Delivery::Delivered) => report.delivered += 1,
                Ok(Delivery::Evicted) => report.evicted += 1,
                Ok(Delivery::Failed) | Err(_) => report.failed += 1,
            }
        }

        report
    }
}

/// A payload queued for one recipient.
struct Job {
    payload: Arc<Outbound>,
    outcome: oneshot::Sender<Delivery>,
}

/// Fans messages out from one participant to everyone else in the room.
///
/// Every recipient has one queue drained by one worker, so payloads reach it
/// in the order they were queued.
#[derive(Clone)]
pub struct Relay {
    chat: Chat,
    transport: Arc<dyn Transport>,
    store: Arc<dyn Store>,
    mailboxes: Arc<Mutex<HashMap<ParticipantId, mpsc::UnboundedSender<Job>>>>,
}

impl Relay {
    pub fn new(chat: Chat, transport: Arc<dyn Transport>, store: Arc<dyn Store>) -> Self {
        Self {
            chat,
            transport,
            store,
            mailboxes: Arc::default(),
        }
    }

    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Records `raw` and relays it as `"<pseudonym>: <text>"`.
    pub async fn broadcast_text(&self, sender: ParticipantId, raw: &str) -> Result<Broadcast, ChatError> {
        let pseudonym = self.chat.speaker(sender).await?;
        let body = format!("{}: {}", escape_markdown(&pseudonym), escape_markdown(raw));

        self.persist(sender, raw).await;

        let broadcast = self.fan_out(sender, Outbound::Text(body)).await;
        info!(participant = %sender, recipients = broadcast.attempted(), "relayed text");
        Ok(broadcast)
    }

    /// Relays a media reference with a caption naming the sender. Media is never stored.
    pub async fn broadcast_media(
        &self,
        sender: ParticipantId,
        kind: MediaKind,
        reference: &str,
    ) -> Result<Broadcast, ChatError> {
        let pseudonym = self.chat.speaker(sender).await?;
        let payload = Outbound::Media {
            kind,
            reference: reference.to_owned(),
            caption: format!("{} sent a {kind}", escape_markdown(&pseudonym)),
        };

        let broadcast = self.fan_out(sender, payload).await;
        info!(participant = %sender, %kind, recipients = broadcast.attempted(), "relayed media");
        Ok(broadcast)
    }

    async fn persist(&self, sender: ParticipantId, content: &str) {
        let saved = async {
            let participant = self.store.find_or_create_participant(sender).await?;
            self.store.save_message(&participant, content, OffsetDateTime::now_utc()).await
        }
        .await;

        match saved {
            Ok(()) => debug!(participant = %sender, len = content.len(), "message saved"),
            Err(err) => error!(participant = %sender, error = %err, "failed to save message"),
        }
    }

    async fn fan_out(&self, sender: ParticipantId, payload: Outbound) -> Broadcast {
        let recipients = self.chat.snapshot_others(sender).await;
        let payload = Arc::new(payload);

        let mut mailboxes = self.mailboxes.lock().await;
        let mut deliveries = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let (outcome, delivery) = oneshot::channel();
            let job = Job { payload: payload.clone(), outcome };

            let mailbox = mailboxes
                .entry(recipient)
                .or_insert_with(|| self.spawn_worker(recipient));
            if let Err(mpsc::error::SendError(job)) = mailbox.send(job) {
                // worker is gone, start a fresh one for this recipient
                let fresh = self.spawn_worker(recipient);
                let _ = fresh.send(job);
                *mailbox = fresh;
            }

            deliveries.push(delivery);
        }

        Broadcast { deliveries }
    }

    fn spawn_worker(&self, recipient: ParticipantId) -> mpsc::UnboundedSender<Job> {
        let (mailbox, jobs) = mpsc::unbounded_channel();
        tokio::spawn(drain(self.chat.clone(), self.transport.clone(), recipient, jobs));
        mailbox
    }
}

async fn drain(
    chat: Chat,
    transport: Arc<dyn Transport>,
    recipient: ParticipantId,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    while let Some(Job { payload, outcome }) = jobs.recv().await {
        let delivery = deliver(&chat, transport.as_ref(), recipient, &payload).await;
        // nobody may be waiting for the outcome
        let _ = outcome.send(delivery);
    }
}

async fn deliver(
    chat: &Chat,
    transport: &dyn Transport,
    recipient: ParticipantId,
    payload: &Outbound,
) -> Delivery {
    match transport.send(recipient, payload).await {
        Ok(()) => Delivery::Delivered,
        Err(DeliveryError::Permanent(reason)) => {
            chat.leave(recipient).await;
            warn!(%recipient, %reason, "recipient unreachable, removed from chat");
            Delivery::Evicted
        }
        Err(DeliveryError::Transient(reason)) => {
            error!(%recipient, %reason, "failed to deliver message");
            Delivery::Failed
        }
    }
}
