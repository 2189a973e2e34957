use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use uuid::Uuid;

use crate::monitor::SeatMonitor;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(monitor): State<SeatMonitor>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, monitor))
}

/// Hands one frame to the pipeline. A rejected frame is logged and otherwise
/// ignored; the connection stays open.
async fn ingest_frame(monitor: &SeatMonitor, id: Uuid, text: &str) -> bool {
    match monitor.ingest(id, text).await {
        Ok(_) => true,
        Err(err) => {
            log_debug!("frame from {} not ingested: {}", id, err);
            false
        }
    }
}

/// Every connection is both a packet source and an observer.
async fn handle_socket(mut socket: WebSocket, monitor: SeatMonitor) {
    let id = Uuid::new_v4();
    let mut outbound = monitor.hub().register(id);

    loop {
        tokio::select! {
            queued = outbound.recv() => {
                match queued {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // handle was dropped by the hub after a failed send
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        ingest_frame(&monitor, id, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            ingest_frame(&monitor, id, text).await;
                        }
                        Err(_) => log_warn!("dropping non-UTF-8 binary frame from {}", id),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        log_warn!("socket error from {}: {}", id, err);
                        break;
                    }
                }
            }
        }
    }

    monitor.hub().unregister(&id);
    log_info!("connection {} closed", id);
}
