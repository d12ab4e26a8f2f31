//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic; we reply with a single JSON message per request.
//! In between, every state change (including timer-driven ones) is pushed as
//! a `snapshot` message.
//!
//! Judge calls (`run`, `hint`) are claimed in arrival order and then awaited
//! alongside the socket, so later messages (a second `run`, `exit_level`) are
//! handled while a verdict is outstanding.

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::error::GameError;
use crate::logic::*;
use crate::play::{HintStep, RunStart};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

/// Judge calls in flight on one connection; each resolves to its reply.
type InFlight<'a> = FuturesUnordered<BoxFuture<'a, ServerWsMessage>>;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
  info!(target: "pyquest_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: AppState) {
  info!(target: "pyquest_backend", "WebSocket connected");
  let mut changes = state.subscribe();
  let mut in_flight: InFlight<'_> = FuturesUnordered::new();
  loop {
    let reply_msg = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(msg) => {
            debug!(target: "pyquest_backend", "WS received: {:?}", &msg);
            match handle_client_ws(msg, &state, &mut changes, &mut in_flight).await {
              Some(reply) => reply,
              None => continue,
            }
          }
          Err(e) => ServerWsMessage::Error { code: "invalid_json".into(), message: format!("Invalid JSON: {}", e) },
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          continue;
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => continue,
        Some(Err(e)) => {
          error!(target: "pyquest_backend", error = %e, "WS receive error");
          break;
        }
      },
      Some(done) = in_flight.next(), if !in_flight.is_empty() => done,
      changed = changes.changed() => {
        if changed.is_err() {
          break;
        }
        ServerWsMessage::Snapshot { snapshot: current_snapshot(&state).await }
      }
    };

    let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "code": "serialization", "message": format!("Serialization error: {}", e) }).to_string()
    });

    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "pyquest_backend", error = %e, "WS send error");
      break;
    }
  }
  info!(target: "pyquest_backend", in_flight = in_flight.len(), "WebSocket disconnected");
}

fn error_msg(e: GameError) -> ServerWsMessage {
  ServerWsMessage::Error { code: e.code().into(), message: e.to_string() }
}

/// Snapshot reply for the client's own command. Marks the change feed as
/// seen first, so the push loop does not echo the same state back.
async fn fresh_snapshot(state: &AppState, changes: &mut watch::Receiver<u64>) -> ServerWsMessage {
  changes.borrow_and_update();
  ServerWsMessage::Snapshot { snapshot: current_snapshot(state).await }
}

/// Handle one client message. Returns `None` when the reply is deferred to a
/// judge call pushed onto `in_flight`.
#[instrument(level = "info", skip(state, changes, in_flight))]
async fn handle_client_ws<'a>(
  msg: ClientWsMessage,
  state: &'a AppState,
  changes: &mut watch::Receiver<u64>,
  in_flight: &mut InFlight<'a>,
) -> Option<ServerWsMessage> {
  let reply = match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Snapshot => fresh_snapshot(state, changes).await,

    ClientWsMessage::SelectLevel { level_id } => match select_level(state, level_id).await {
      Ok(_) => fresh_snapshot(state, changes).await,
      Err(e) => error_msg(e),
    },

    ClientWsMessage::EditCode { code } => match edit_code(state, code).await {
      Ok(()) => fresh_snapshot(state, changes).await,
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Run => match claim_run(state).await {
      Ok(start @ RunStart::Submit(_)) => {
        in_flight.push(
          judge_run(state, start)
            .map(|out| {
              info!(target: "game", status = ?out.status, "WS run evaluated");
              ServerWsMessage::RunResult(out)
            })
            .boxed(),
        );
        return None;
      }
      Ok(start) => ServerWsMessage::RunResult(judge_run(state, start).await),
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Hint => match claim_hint(state).await {
      Ok(step @ HintStep::Fetch { .. }) => {
        in_flight.push(resolve_hint(state, step).map(ServerWsMessage::Hint).boxed());
        return None;
      }
      Ok(step) => ServerWsMessage::Hint(resolve_hint(state, step).await),
      Err(e) => error_msg(e),
    },

    ClientWsMessage::ExitLevel => match exit_level(state).await {
      Ok(_) => fresh_snapshot(state, changes).await,
      Err(e) => error_msg(e),
    },
  };
  Some(reply)
}
