//! Boundary to the messaging network.
//!
//! The relay only ever talks to a [`Transport`]; the Telegram Bot API client
//! in [`telegram`] is the production implementation.

pub mod telegram;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::ParticipantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Voice,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Photo => "photo",
            MediaKind::Voice => "voice",
            MediaKind::Video => "video",
        })
    }
}

/// What gets sent to a single recipient. Text and captions are MarkdownV2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Media {
        kind: MediaKind,
        /// Opaque file reference issued by the network.
        reference: String,
        caption: String,
    },
}

/// Something a participant did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub from: ParticipantId,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Text(String),
    Media { kind: MediaKind, reference: String },
}

/// Outcome of a failed send, classified once where the network reports it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient can not be reached again, e.g. it blocked the bot.
    #[error("recipient unreachable: {0}")]
    Permanent(String),
    #[error("delivery failed: {0}")]
    Transient(String),
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, recipient: ParticipantId, payload: &Outbound) -> Result<(), DeliveryError>;
}
