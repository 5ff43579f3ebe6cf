use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{de::{DeserializeOwned, IgnoredAny}, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::chat::ParticipantId;

use super::{DeliveryError, Event, Inbound, MediaKind, Outbound, Transport};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Bot API error code for a user who blocked the bot or deleted the account.
const FORBIDDEN: i64 = 403;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bot api request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bot api error {code}: {description}")]
    Api { code: i64, description: String },
}

impl From<ApiError> for DeliveryError {
    fn from(err: ApiError) -> Self {
        match &err {
            ApiError::Api { code: FORBIDDEN, .. } => DeliveryError::Permanent(err.to_string()),
            _ => DeliveryError::Transient(err.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    from: Option<User>,
    text: Option<String>,
    photo: Option<Vec<FileRef>>,
    voice: Option<FileRef>,
    video: Option<FileRef>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    file_id: String,
}

#[derive(Debug, Serialize)]
struct BotCommand<'a> {
    command: &'a str,
    description: &'a str,
}

impl Update {
    /// `None` for anything that is not a user message we relay.
    pub fn into_inbound(self) -> Option<Inbound> {
        let message = self.message?;
        let from = ParticipantId(message.from?.id);

        let event = if let Some(text) = message.text {
            Event::Text(text)
        } else if let Some(sizes) = message.photo {
            // sizes are ordered smallest first
            Event::Media { kind: MediaKind::Photo, reference: sizes.into_iter().last()?.file_id }
        } else if let Some(voice) = message.voice {
            Event::Media { kind: MediaKind::Voice, reference: voice.file_id }
        } else if let Some(video) = message.video {
            Event::Media { kind: MediaKind::Video, reference: video.file_id }
        } else {
            return None;
        };

        Some(Inbound { from, event })
    }
}

/// Method name and parameters for delivering `payload` to `recipient`.
fn send_request(recipient: ParticipantId, payload: &Outbound) -> (&'static str, Value) {
    match payload {
        Outbound::Text(text) => (
            "sendMessage",
            json!({ "chat_id": recipient, "text": text, "parse_mode": "MarkdownV2" }),
        ),
        Outbound::Media { kind, reference, caption } => {
            let (method, field) = match kind {
                MediaKind::Photo => ("sendPhoto", "photo"),
                MediaKind::Voice => ("sendVoice", "voice"),
                MediaKind::Video => ("sendVideo", "video"),
            };
            (
                method,
                json!({ "chat_id": recipient, field: reference, "caption": caption, "parse_mode": "MarkdownV2" }),
            )
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
}

impl TelegramClient {
    /// `request_timeout` bounds every call and must outlast the long-poll timeout.
    pub fn new(api_url: &str, token: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("building http client")?;

        Ok(Self {
            http,
            base: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self.http
            .post(format!("{}/{method}", self.base))
            .json(params)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
            ApiResponse { error_code, description, .. } => Err(ApiError::Api {
                code: error_code.unwrap_or_default(),
                description: description.unwrap_or_else(|| format!("{method} failed")),
            }),
        }
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, ApiError> {
        self.call("getUpdates", &json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        })).await
    }

    /// Publishes `(command, description)` pairs in the client's command menu.
    pub async fn set_my_commands(&self, commands: &[(&str, &str)]) -> Result<(), ApiError> {
        let commands: Vec<BotCommand> = commands
            .iter()
            .map(|&(command, description)| BotCommand { command, description })
            .collect();
        let _: bool = self.call("setMyCommands", &json!({ "commands": commands })).await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send(&self, recipient: ParticipantId, payload: &Outbound) -> Result<(), DeliveryError> {
        let (method, params) = send_request(recipient, payload);
        let _: IgnoredAny = self.call(method, &params).await?;
        debug!(%recipient, method, "delivered");
        Ok(())
    }
}

/// Long-polls `getUpdates`, acknowledging each batch by moving the offset.
#[derive(Debug)]
pub struct Updates {
    client: TelegramClient,
    offset: i64,
    timeout_secs: u64,
}

impl Updates {
    pub fn new(client: TelegramClient, timeout_secs: u64) -> Self {
        Self { client, offset: 0, timeout_secs }
    }

    pub async fn next_batch(&mut self) -> Result<Vec<Inbound>, ApiError> {
        let updates = self.client.get_updates(self.offset, self.timeout_secs).await?;
        if let Some(last) = updates.last() {
            self.offset = last.update_id + 1;
        }
        Ok(updates.into_iter().filter_map(Update::into_inbound).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(update: Value) -> Option<Inbound> {
        serde_json::from_value::<Update>(update).unwrap().into_inbound()
    }

    #[test]
    fn text_message_becomes_text_event() {
        let inbound = parse(json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "date": 0,
                "chat": { "id": 99, "type": "private" },
                "from": { "id": 99, "is_bot": false, "first_name": "x" },
                "text": "/join"
            }
        }));

        assert_eq!(inbound, Some(Inbound { from: ParticipantId(99), event: Event::Text("/join".to_owned()) }));
    }

    #[test]
    fn photo_uses_largest_size() {
        let inbound = parse(json!({
            "update_id": 11,
            "message": {
                "from": { "id": 5 },
                "photo": [{ "file_id": "small" }, { "file_id": "medium" }, { "file_id": "large" }]
            }
        }));

        assert_eq!(
            inbound,
            Some(Inbound {
                from: ParticipantId(5),
                event: Event::Media { kind: MediaKind::Photo, reference: "large".to_owned() },
            })
        );
    }

    #[test]
    fn voice_and_video_are_media() {
        let voice = parse(json!({ "update_id": 1, "message": { "from": { "id": 1 }, "voice": { "file_id": "v" } } }));
        let video = parse(json!({ "update_id": 2, "message": { "from": { "id": 1 }, "video": { "file_id": "m" } } }));

        assert_eq!(voice.unwrap().event, Event::Media { kind: MediaKind::Voice, reference: "v".to_owned() });
        assert_eq!(video.unwrap().event, Event::Media { kind: MediaKind::Video, reference: "m".to_owned() });
    }

    #[test]
    fn unrelated_updates_are_skipped() {
        assert_eq!(parse(json!({ "update_id": 3 })), None);
        assert_eq!(parse(json!({ "update_id": 4, "message": { "text": "no sender" } })), None);
        assert_eq!(parse(json!({ "update_id": 5, "message": { "from": { "id": 1 }, "sticker": {} } })), None);
    }

    #[test]
    fn forbidden_is_permanent() {
        let blocked = ApiError::Api { code: 403, description: "Forbidden: bot was blocked by the user".to_owned() };
        let flooded = ApiError::Api { code: 429, description: "Too Many Requests".to_owned() };

        assert!(matches!(DeliveryError::from(blocked), DeliveryError::Permanent(_)));
        assert!(matches!(DeliveryError::from(flooded), DeliveryError::Transient(_)));
    }

    #[test]
    fn media_request_uses_matching_method() {
        let payload = Outbound::Media {
            kind: MediaKind::Voice,
            reference: "file".to_owned(),
            caption: "Owl sent a voice".to_owned(),
        };
        let (method, params) = send_request(ParticipantId(8), &payload);

        assert_eq!(method, "sendVoice");
        assert_eq!(params["chat_id"], 8);
        assert_eq!(params["voice"], "file");
        assert_eq!(params["parse_mode"], "MarkdownV2");
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = TelegramClient::new(&format!("http://{addr}"), "t", Duration::from_millis(200)).unwrap();
        let polled = tokio::time::timeout(Duration::from_secs(5), client.get_updates(0, 30)).await;

        assert!(matches!(polled, Ok(Err(ApiError::Http(_)))));
    }

    #[test]
    fn client_strips_trailing_slash() {
        let client = TelegramClient::new("http://localhost:8081/", "123:abc", Duration::from_secs(40)).unwrap();
        assert_eq!(client.base, "http://localhost:8081/bot123:abc");
    }
}
