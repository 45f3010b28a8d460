// Copyright (c) 2024 Furchill

//! WebSocket support for real-time event streaming
//!
//! Clients subscribe to event groups and receive every committed event of
//! those groups:
//! - Token issuance (`tokens`)
//! - Transfers and approvals (`transfers`)
//! - Fee and ownership changes (`fees`)
//! - Pool registrations (`pools`)

use futures::{Sink, SinkExt, StreamExt};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::registry::{EventType, LaunchpadEvent};

/// Client subscription preferences
#[derive(Debug, Default)]
struct WsSubscription {
    events: HashSet<EventType>,
}

impl WsSubscription {
    fn new() -> Self {
        Self {
            events: HashSet::new(),
        }
    }

    fn subscribe(&mut self, event: EventType) {
        self.events.insert(event);
    }

    fn unsubscribe(&mut self, event: EventType) {
        self.events.remove(&event);
    }

    fn is_subscribed(&self, event_type: EventType) -> bool {
        self.events.contains(&event_type)
    }

    /// Subscribed groups in a stable order
    fn names(&self) -> Vec<&'static str> {
        EventType::ALL
            .iter()
            .filter(|e| self.events.contains(e))
            .map(EventType::as_str)
            .collect()
    }
}

/// Incoming client messages
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { events: Vec<EventType> },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { events: Vec<EventType> },
    #[serde(rename = "ping")]
    Ping,
}

/// Outgoing server messages
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerMessage<'a> {
    #[serde(rename = "event")]
    Event {
        #[serde(flatten)]
        event: &'a LaunchpadEvent,
    },
    #[serde(rename = "subscribed")]
    Subscribed { events: Vec<&'static str> },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { message: String },
}

/// Broadcaster for ledger events
///
/// Events sent to the broadcaster are delivered to all connected WebSocket
/// clients (filtered by subscription).
#[derive(Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<LaunchpadEvent>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LaunchpadEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all connected clients
    pub fn send(&self, event: LaunchpadEvent) {
        // No receivers connected is not an error
        let _ = self.sender.send(event);
    }

    pub fn send_all(&self, events: &[LaunchpadEvent]) {
        for event in events {
            self.send(event.clone());
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

async fn send_message<S>(sink: &mut S, message: &ServerMessage<'_>) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to encode WebSocket message: {}", e);
            return true;
        }
    };
    if let Err(e) = sink.send(Message::Text(json.into())).await {
        error!("Failed to send WebSocket message: {}", e);
        return false;
    }
    true
}

/// Handle a WebSocket connection
pub async fn handle_websocket(upgraded: Upgraded, broadcaster: Arc<WsBroadcaster>) {
    let ws_stream = WebSocketStream::from_raw_socket(
        TokioIo::new(upgraded),
        tokio_tungstenite::tungstenite::protocol::Role::Server,
        None,
    )
    .await;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut subscription = WsSubscription::new();
    let mut event_receiver = broadcaster.subscribe();

    info!("WebSocket client connected");

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { events }) => {
                                for event in events {
                                    subscription.subscribe(event);
                                }
                                Some(ServerMessage::Subscribed { events: subscription.names() })
                            }
                            Ok(ClientMessage::Unsubscribe { events }) => {
                                for event in events {
                                    subscription.unsubscribe(event);
                                }
                                None
                            }
                            Ok(ClientMessage::Ping) => Some(ServerMessage::Pong),
                            Err(e) => {
                                warn!("Invalid client message: {}", e);
                                Some(ServerMessage::Error { message: format!("Invalid message: {}", e) })
                            }
                        };
                        if let Some(reply) = reply {
                            if !send_message(&mut ws_sender, &reply).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                            error!("Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket client requested close");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            event = event_receiver.recv() => {
                match event {
                    Ok(event) => {
                        if subscription.is_subscribed(event.event_type())
                            && !send_message(&mut ws_sender, &ServerMessage::Event { event: &event }).await
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, missed {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Event broadcaster closed");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
