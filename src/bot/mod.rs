mod command;

use tracing::{error, info, warn};

use crate::{
    chat::{escape_markdown, ChatError, ParticipantId, Relay},
    transport::{DeliveryError, Event, Inbound, Outbound},
};

pub use command::Command;

/// Routes inbound events to commands or the relay.
#[derive(Clone)]
pub struct Bot {
    relay: Relay,
}

impl Bot {
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Returns once the event is handled; relayed deliveries may still be in flight.
    pub async fn dispatch(&self, Inbound { from, event }: Inbound) {
        match event {
            Event::Text(text) => match Command::parse(&text) {
                Some(command) => self.command(from, command).await,
                None => self.text(from, &text).await,
            },
            Event::Media { kind, reference } => {
                if let Err(ChatError::NotJoined(_)) = self.relay.broadcast_media(from, kind, &reference).await {
                    info!(participant = %from, %kind, "ignored media from participant outside the chat");
                }
            }
        }
    }

    async fn command(&self, from: ParticipantId, command: Command) {
        let chat = self.relay.chat();
        match command {
            Command::Join => {
                let joined = chat.join(from).await;
                let active = chat.size().await;
                info!(
                    participant = %from,
                    pseudonym = %joined.pseudonym,
                    newly = joined.newly,
                    active,
                    "participant joined"
                );
                self.reply(from, format!(
                    "Welcome to the anonymous chat, *{}*\\!",
                    escape_markdown(&joined.pseudonym)
                )).await;
            }
            Command::Leave => {
                if chat.leave(from).await {
                    let active = chat.size().await;
                    info!(participant = %from, active, "participant left");
                    self.reply(from, escape_markdown(
                        "You left the anonymous chat. To send messages again, join with /join.",
                    )).await;
                } else {
                    self.reply(from, escape_markdown("You were not in the chat.")).await;
                }
            }
            Command::Start | Command::Help => self.reply(from, help_text()).await,
        }
    }

    async fn text(&self, from: ParticipantId, text: &str) {
        if let Err(ChatError::NotJoined(_)) = self.relay.broadcast_text(from, text).await {
            self.reply(from, escape_markdown("To send messages, join the chat with /join")).await;
        }
    }

    async fn reply(&self, to: ParticipantId, text: String) {
        match self.relay.transport().send(to, &Outbound::Text(text)).await {
            Ok(()) => {}
            Err(DeliveryError::Permanent(reason)) => {
                warn!(participant = %to, %reason, "could not reply, participant blocked the bot");
            }
            Err(DeliveryError::Transient(reason)) => {
                error!(participant = %to, %reason, "could not reply");
            }
        }
    }
}

fn help_text() -> String {
    let mut text = "🤖 *Available commands:*".to_owned();
    for command in [Command::Join, Command::Leave, Command::Help] {
        text += &escape_markdown(&format!("\n/{} - {}", command.name(), command.description()));
    }
    text
}
