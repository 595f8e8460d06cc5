//! WebSocket streaming bridge (spec.md C6, §4.5).

use crate::state::AppState;
use crate::wire::{translate, ClientTurn, WireEvent};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use cueso_driver::cancel::CancelToken;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

type Sink = SplitSink<WebSocket, Message>;
type Source = SplitStream<WebSocket>;

pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let origin_allowed = check_origin(&state, &headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, origin_allowed))
}

fn check_origin(state: &AppState, headers: &HeaderMap) -> bool {
    let allowed = &state.config.server.cors.allowed_origins;
    if allowed.is_empty() {
        return true;
    }
    match headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) => allowed.iter().any(|a| a == origin),
        None => false,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, origin_allowed: bool) {
    let (mut sink, mut source) = socket.split();

    if !origin_allowed {
        let _ = sink
            .send(Message::Close(Some(CloseFrame { code: 4003, reason: "origin not allowed".into() })))
            .await;
        return;
    }

    loop {
        let msg = match source.next().await {
            Some(Ok(m)) => m,
            _ => break,
        };

        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };

        let turn: ClientTurn = match serde_json::from_str(&text) {
            Ok(t) if !t.message.trim().is_empty() => t,
            _ => {
                let _ = send_event(
                    &mut sink,
                    &WireEvent::Error { message: "message must be a non-empty string".into() },
                )
                .await;
                continue;
            }
        };

        if !run_one_turn(&state, &mut sink, &mut source, turn).await {
            break;
        }
    }
}

/// Returns `false` when the connection should close.
async fn run_one_turn(state: &AppState, sink: &mut Sink, source: &mut Source, turn: ClientTurn) -> bool {
    let session = state.sessions.get_or_create(turn.session_id, state.config.default_session.clone());
    let session_id = session.id.clone();

    if send_event(sink, &WireEvent::SessionCreated { session_id: session_id.clone() }).await.is_err() {
        return false;
    }

    let provider_id = match state.config.llm.providers.first() {
        Some(p) => p.id.clone(),
        None => {
            let _ = send_event(sink, &WireEvent::Error { message: "no LLM provider configured".into() }).await;
            return true;
        }
    };
    let Some(provider) = state.llm.get(&provider_id) else {
        let _ = send_event(sink, &WireEvent::Error { message: "no LLM provider configured".into() }).await;
        return true;
    };

    let cancel = CancelToken::new();
    let tools = state.tools.clone();
    let message = turn.message;
    let lock_id = session_id.clone();
    let event_session_id = session_id.clone();

    let result = state
        .sessions
        .with_lock(&lock_id, |session| async move {
            let fallback = session.clone();
            let (mut rx, handle) = cueso_driver::run(provider, tools, session, message, cancel.clone());

            loop {
                tokio::select! {
                    event = rx.recv() => {
                        match event {
                            Some(event) => {
                                if send_event(sink, &translate(event, &event_session_id)).await.is_err() {
                                    cancel.cancel();
                                }
                            }
                            None => break,
                        }
                    }
                    inbound = source.next() => {
                        if !matches!(inbound, Some(Ok(Message::Text(_) | Message::Binary(_) | Message::Ping(_) | Message::Pong(_)))) {
                            cancel.cancel();
                        }
                    }
                }
            }

            match handle.await {
                Ok(updated) => Ok(updated),
                Err(e) => {
                    tracing::warn!(error = %e, "driver task panicked mid-turn");
                    let _ = send_event(sink, &WireEvent::Error { message: "internal error running turn".into() }).await;
                    Ok(fallback)
                }
            }
        })
        .await;

    match result {
        Ok(updated) => {
            state.sessions.put(updated);
        }
        Err(e) => {
            tracing::warn!(error = %e, session_id = %session_id, "session disappeared mid-turn");
        }
    }
    true
}

async fn send_event(sink: &mut Sink, event: &WireEvent) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|_| ())?;
    sink.send(Message::Text(text)).await.map_err(|_| ())
}
