use axum::{debug_handler, extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::{chat::{Chat, RosterEntry}, AppState};

#[derive(Debug, Serialize)]
pub struct Roster {
    pub participants: Vec<RosterEntry>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/participants", get(participants))
        .layer(CorsLayer::permissive())
}

/// Who is in the room right now, under which pseudonym.
#[debug_handler(state = AppState)]
pub async fn participants(State(chat): State<Chat>) -> Json<Roster> {
    Json(Roster {
        participants: chat.roster().await,
    })
}
