// WebSocket snapshot stream

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::worker::SnapshotReceiver;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_snapshot(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let rx = state.snapshots.clone();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_snapshots(socket, rx).await {
            tracing::info!(error = %e, "snapshot stream ended with error");
        }
    })
}

/// Sends `msg`, giving up when the client is gone or too slow.
async fn send_or_close(socket: &mut WebSocket, msg: Message) -> bool {
    matches!(timeout(WS_SEND_TIMEOUT, socket.send(msg)).await, Ok(Ok(())))
}

fn current_json(rx: &mut SnapshotReceiver) -> anyhow::Result<String> {
    let snapshot = rx.borrow_and_update();
    Ok(serde_json::to_string(snapshot.as_ref())?)
}

/// Pushes the current snapshot on connect, then every replacement. Only the
/// latest snapshot is ever sent; a slow client skips intermediate ones.
async fn stream_snapshots(mut socket: WebSocket, mut rx: SnapshotReceiver) -> anyhow::Result<()> {
    tracing::info!("Client connected to snapshot stream");

    let json = current_json(&mut rx)?;
    if !send_or_close(&mut socket, Message::Text(json.into())).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping_interval.tick().await;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let json = current_json(&mut rx)?;
                if !send_or_close(&mut socket, Message::Text(json.into())).await {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if !send_or_close(&mut socket, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    tracing::debug!("Client disconnected from snapshot stream");
    Ok(())
}
