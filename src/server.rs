use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use warp::ws::{Message, WebSocket};
use warp::Filter;

use crate::coordinator::CoordinatorHandle;
use crate::error::GameError;
use crate::messages::ClientMessage;

#[derive(Clone)]
pub struct Server {
    coordinator: CoordinatorHandle,
}

impl Server {
    pub fn new(coordinator: CoordinatorHandle) -> Self {
        Server { coordinator }
    }

    pub async fn handle_connection(&self, ws: WebSocket) {
        let (connection_id, mut outbox) = self.coordinator.connect();
        let (mut ws_tx, mut ws_rx) = ws.split();
        info!("New WebSocket connection: {connection_id}");

        // Ends once the coordinator drops this connection's outbox.
        let writer = tokio::spawn(async move {
            while let Some(message) = outbox.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {e}");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::text(text)).await {
                    warn!("Failed to send WebSocket message: {e}");
                    break;
                }
            }
        });

        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(msg) => {
                    if msg.is_close() {
                        break;
                    }
                    let Ok(text) = msg.to_str() else {
                        continue;
                    };
                    match serde_json::from_str::<ClientMessage>(text) {
                        Ok(message) => {
                            debug!("Received {message:?} from {connection_id}");
                            self.coordinator.dispatch(&connection_id, message);
                        }
                        Err(e) => {
                            self.coordinator
                                .reject(&connection_id, GameError::Malformed(e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    warn!("WebSocket error on {connection_id}: {e}");
                    break;
                }
            }
        }

        self.coordinator.disconnect(&connection_id);
        let _ = writer.await;
        info!("Connection {connection_id} closed");
    }
}

/// The `/ws` upgrade endpoint; every accepted socket is handed to `server`.
pub fn ws_route(
    server: Server,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let server = server.clone();
            ws.on_upgrade(move |socket| async move {
                server.handle_connection(socket).await;
            })
        })
}
