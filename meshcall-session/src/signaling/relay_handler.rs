use crate::signaling::RelayService;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use meshcall_core::{PartnerId, RelayFrame, RoomId};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub const RELAY_WS_ROUTE: &str = "/ws/{room}/{partner_id}";

pub fn relay_router(service: RelayService) -> Router {
    Router::new()
        .route(RELAY_WS_ROUTE, get(relay_ws_handler))
        .with_state(service)
}

pub async fn relay_ws_handler(
    ws: WebSocketUpgrade,
    Path((room, partner_id)): Path<(String, String)>,
    State(service): State<RelayService>,
) -> Response {
    let partner = match partner_id.parse::<PartnerId>() {
        Ok(partner) => partner,
        Err(_) => {
            warn!("Rejected relay connection with partner id '{}'", partner_id);
            return (StatusCode::BAD_REQUEST, "partner id must be an integer").into_response();
        }
    };
    let room = RoomId::new(room);

    ws.on_upgrade(move |socket| handle_socket(socket, room, partner, service))
}

async fn handle_socket(socket: WebSocket, room: RoomId, partner: PartnerId, service: RelayService) {
    info!("Partner {} connected to room '{}'", partner, room);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let token = service.add_member(&room, partner, tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let room = room.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<RelayFrame>(&text) {
                        Ok(frame) => service.route(&room, partner, frame),
                        Err(e) => warn!("Invalid relay frame from {}: {}", partner, e),
                    },
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

    if service.remove_member(&room, partner, token) {
        service.announce_departure(&room, partner);
    }
    info!("Partner {} disconnected from room '{}'", partner, room);
}
