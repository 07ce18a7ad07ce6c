//! WebSocket upgrade handler for the relay endpoint.

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::Response,
};
use futures::{future, SinkExt, StreamExt};
use tracing::debug;

use super::{
    error::RelayError,
    frame::Frame,
    pair::ConnectionPair,
    upstream::FrameSocket,
};
use crate::server::AppState;

/// Path on which browser clients open their realtime connection.
pub const RELAY_PATH: &str = "/realtime";

/// `GET /realtime`: accept the upgrade and relay the socket to upstream.
///
/// The upgrade completes without waiting for the upstream handshake; each
/// accepted socket runs in its own task.
pub async fn realtime_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let pair = ConnectionPair::new();
        debug!(pair_id = %pair.id(), "Accepted realtime connection");
        pair.run(client_socket(socket), state.connector.connect()).await;
    })
}

/// Adapt an accepted axum socket into a [`FrameSocket`].
pub fn client_socket(socket: WebSocket) -> impl FrameSocket {
    socket
        .sink_map_err(RelayError::Client)
        .with(|frame: Frame| future::ready(Ok::<_, RelayError>(frame.into_client())))
        .filter_map(|event| {
            future::ready(match event {
                Ok(message) => Frame::from_client(message).map(Ok),
                Err(e) => Some(Err(RelayError::Client(e))),
            })
        })
}
