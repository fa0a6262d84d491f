pub mod dispatcher;
pub mod events;
pub mod hub;
pub mod rooms;
pub mod session;

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::state::AppState;
use events::{close_code, Envelope};
use hub::{HubHandle, Registration};
use session::{outbound_queue, OutboundReceiver, Session, SessionId, SessionState};

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// Identifying parameters read from the upgrade request's query string.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room_id: Option<String>,
}

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

/// Why a session's read side stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Peer sent a close frame or the stream ended.
    Disconnected,
    ReadError,
    Malformed,
    Idle,
    /// The write loop ended first: a write failed or stalled, or the hub closed the queue.
    WriterStopped,
}

impl Exit {
    fn close_frame(self) -> Option<CloseFrame> {
        let (code, reason) = match self {
            Exit::Disconnected | Exit::ReadError => return None,
            Exit::Malformed => (close_code::DECODE_ERROR, "decode error"),
            Exit::Idle => (close_code::SESSION_TIMED_OUT, "session timed out"),
            Exit::WriterStopped => (close_code::POLICY, "disconnected by server"),
        };
        Some(CloseFrame {
            code,
            reason: reason.into(),
        })
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, params: ConnectParams) {
    let (ws_sink, mut ws_stream) = socket.split();
    let mut session = Session::new(params.user_id, params.room_id);
    let (outbound, rx) = outbound_queue(state.gateway.outbound_capacity);

    state
        .hub
        .register(Registration {
            session_id: session.id,
            user_id: session.user_id.clone(),
            room: session.room.clone(),
            outbound,
        })
        .await;
    session.set_state(SessionState::Active);

    let write_timeout = state.gateway.write_timeout;
    let mut writer = tokio::spawn(write_loop(ws_sink, rx, session.id, write_timeout));
    let mut writer_result = None;

    let idle_timeout = state.gateway.idle_timeout;
    let exit = tokio::select! {
        exit = read_loop(&state.hub, &mut session, &mut ws_stream, idle_timeout) => exit,
        result = &mut writer => {
            writer_result = Some(result);
            Exit::WriterStopped
        }
    };
    session.set_state(SessionState::Closing);

    // The only unregister this session ever sends. It drops the hub's
    // sender, so the write loop drains what is queued and returns.
    state.hub.unregister(session.id).await;

    let sink = match writer_result {
        Some(result) => result.ok().flatten(),
        None => match tokio::time::timeout(write_timeout, &mut writer).await {
            Ok(result) => result.ok().flatten(),
            Err(_) => {
                tracing::debug!(session_id = %session.id, "drain timed out");
                writer.abort();
                None
            }
        },
    };
    if let (Some(mut sink), Some(frame)) = (sink, exit.close_frame()) {
        let close = sink.send(Message::Close(Some(frame)));
        if tokio::time::timeout(write_timeout, close).await.is_err() {
            tracing::debug!(session_id = %session.id, "close frame timed out");
        }
    }
    // Both socket halves are dropped on return, which closes the transport.

    session.set_state(SessionState::Closed);
    tracing::info!(
        session_id = %session.id,
        user_id = %session.user_id,
        reason = ?exit,
        "session closed"
    );
}

async fn read_loop(
    hub: &HubHandle,
    session: &mut Session,
    stream: &mut WsStream,
    idle_timeout: Option<Duration>,
) -> Exit {
    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                Ok(next) => next,
                Err(_) => return Exit::Idle,
            },
            None => stream.next().await,
        };

        let decoded = match next {
            Some(Ok(Message::Text(text))) => Envelope::decode(text.as_str()),
            Some(Ok(Message::Binary(bytes))) => serde_json::from_slice::<Envelope>(&bytes),
            Some(Ok(Message::Close(_))) | None => return Exit::Disconnected,
            // axum answers pings itself
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(session_id = %session.id, error = %e, "read failed");
                return Exit::ReadError;
            }
        };

        match decoded {
            Ok(envelope) => dispatcher::dispatch(hub, session, envelope).await,
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "malformed frame");
                return Exit::Malformed;
            }
        }
    }
}

/// Drain the outbound queue into the socket. Hands the sink back once the
/// queue is closed, or `None` if the transport failed or a write stalled.
async fn write_loop(
    mut sink: WsSink,
    mut rx: OutboundReceiver,
    session_id: SessionId,
    write_timeout: Duration,
) -> Option<WsSink> {
    while let Some(payload) = rx.recv().await {
        let frame = Message::Text(payload.to_string().into());
        match tokio::time::timeout(write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(%session_id, error = %e, "write failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(%session_id, "write timed out, peer is not reading");
                return None;
            }
        }
    }
    Some(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_frames_by_exit_reason() {
        assert!(Exit::Disconnected.close_frame().is_none());
        assert!(Exit::ReadError.close_frame().is_none());
        let code = |exit: Exit| exit.close_frame().map(|f| f.code);
        assert_eq!(code(Exit::Malformed), Some(close_code::DECODE_ERROR));
        assert_eq!(code(Exit::Idle), Some(close_code::SESSION_TIMED_OUT));
        assert_eq!(code(Exit::WriterStopped), Some(close_code::POLICY));
    }

    #[test]
    fn test_connect_params_defaults() {
        let params: ConnectParams = serde_json::from_str("{}").unwrap();
        assert!(params.user_id.is_empty());
        assert!(params.room_id.is_none());
    }
}
