use crate::{SignalingService, ws_handler};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use meshcall_core::{ConnectionId, RoomKey};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: SignalingService,
    pub outbound_capacity: usize,
}

impl AppState {
    pub fn new(service: SignalingService, outbound_capacity: usize) -> Self {
        Self {
            service,
            outbound_capacity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomSnapshot {
    pub room: RoomKey,
    pub members: Vec<ConnectionId>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/rooms/{room}", get(room_members))
        .layer(cors)
        .with_state(state)
}

async fn room_members(Path(room): Path<String>, State(state): State<AppState>) -> Response {
    match RoomKey::new(room) {
        Ok(room) => {
            let members = state.service.members_of(&room);
            Json(RoomSnapshot { room, members }).into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
