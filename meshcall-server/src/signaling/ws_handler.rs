use crate::AppState;
use crate::SignalingService;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use meshcall_core::ServerSignal;
use tokio::sync::mpsc;
use tracing::{error, info};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let capacity = state.outbound_capacity;
    ws.on_upgrade(move |socket| handle_socket(socket, state.service, capacity))
}

async fn handle_socket(socket: WebSocket, service: SignalingService, capacity: usize) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerSignal>(capacity);

    let connection_id = service.connect(tx);
    info!("New WebSocket connection: {}", connection_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(signal) = rx.recv().await {
            let json = match signal.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize signal message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => service.handle_text(connection_id, text.as_str()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.disconnect(connection_id);
    info!("WebSocket disconnected: {}", connection_id);
}
