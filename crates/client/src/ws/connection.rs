//! Event channel connection with state management and auto-reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dispatch_shared::{ConnectInfo, DisconnectInfo, EventFrame, EVENT_CONNECT, EVENT_DISCONNECT};
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::registry::EventRegistry;

/// Connection state for the event channel
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u32,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u32,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 1.5,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f32 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis((delay as u32).min(self.max_delay_ms) as u64)
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("event channel is closed")]
    Closed,
}

/// Handle for publishing frames through the connection.
///
/// Frames queued while the channel is down are sent after the next
/// successful (re)connection.
#[derive(Clone)]
pub struct WsHandle {
    sender: UnboundedSender<EventFrame>,
}

impl WsHandle {
    pub fn send(&self, frame: EventFrame) -> Result<(), TransportError> {
        tracing::debug!(event = %frame.event, "queueing outbound frame");
        self.sender
            .unbounded_send(frame)
            .map_err(|_| TransportError::Closed)
    }

    pub fn emit(&self, event: &str, data: Value) -> Result<(), TransportError> {
        self.send(EventFrame::new(event, data))
    }
}

/// Everything the background loop needs; shared with the owning connection.
#[derive(Clone)]
struct LoopContext {
    url: String,
    registry: EventRegistry,
    reconnect_config: ReconnectConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    outbox: Arc<tokio::sync::Mutex<UnboundedReceiver<EventFrame>>>,
    /// Set after the first successful connection; outlives restarts of the loop.
    has_connected: Arc<AtomicBool>,
}

impl LoopContext {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

/// One logical duplex channel to the dispatch server.
///
/// Handlers live in the [`EventRegistry`], not in the connection, so they
/// survive disconnects and start receiving again after the next successful
/// connection. Events missed while disconnected are not replayed.
pub struct WsConnection {
    ctx: LoopContext,
    sender: UnboundedSender<EventFrame>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl WsConnection {
    pub fn new(
        url: impl Into<String>,
        registry: EventRegistry,
        reconnect_config: ReconnectConfig,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            ctx: LoopContext {
                url: url.into(),
                registry,
                reconnect_config,
                state: Arc::new(state),
                outbox: Arc::new(tokio::sync::Mutex::new(receiver)),
                has_connected: Arc::new(AtomicBool::new(false)),
            },
            sender,
            task: parking_lot::Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.ctx.url
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.ctx.registry
    }

    /// Start the connection loop. A no-op while a loop is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        tracing::info!(url = %self.ctx.url, "starting event channel");
        *task = Some(tokio::spawn(run_connection_loop(self.ctx.clone())));
    }

    /// Stop the connection loop and release the channel. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let Some(task) = self.task.lock().take() else {
            return;
        };
        task.abort();

        let was_connected = self.ctx.state.borrow().is_connected();
        self.ctx.set_state(ConnectionState::Disconnected);
        tracing::info!(url = %self.ctx.url, "event channel closed by client");
        if was_connected {
            emit_disconnect(&self.ctx.registry, "client disconnect");
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.ctx.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.ctx.state.borrow().is_connected()
    }

    /// Observe connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.ctx.state.subscribe()
    }

    pub fn handle(&self) -> WsHandle {
        WsHandle {
            sender: self.sender.clone(),
        }
    }

    /// Publish an event to the server.
    pub fn emit(&self, event: &str, data: Value) -> Result<(), TransportError> {
        self.handle().emit(event, data)
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

fn emit_connect(registry: &EventRegistry, info: ConnectInfo) {
    match serde_json::to_value(info) {
        Ok(payload) => {
            registry.emit(EVENT_CONNECT, &payload);
        }
        Err(e) => tracing::error!(error = %e, "failed to encode connect event"),
    }
}

fn emit_disconnect(registry: &EventRegistry, reason: &str) {
    let info = DisconnectInfo {
        reason: reason.to_string(),
    };
    match serde_json::to_value(info) {
        Ok(payload) => {
            registry.emit(EVENT_DISCONNECT, &payload);
        }
        Err(e) => tracing::error!(error = %e, "failed to encode disconnect event"),
    }
}

/// Parse an inbound text frame and hand it to the registry.
fn dispatch_frame(registry: &EventRegistry, text: &str) {
    match EventFrame::parse(text) {
        Ok(frame) if frame.event == EVENT_CONNECT || frame.event == EVENT_DISCONNECT => {
            tracing::warn!(event = %frame.event, "server sent a reserved event name, dropping");
        }
        Ok(frame) => {
            let delivered = registry.emit(&frame.event, &frame.data);
            if delivered == 0 {
                tracing::debug!(event = %frame.event, "no handlers for event");
            }
        }
        Err(e) => tracing::warn!(error = %e, "dropping malformed frame"),
    }
}

async fn run_connection_loop(ctx: LoopContext) {
    let mut attempt = 0u32;

    loop {
        if attempt == 0 {
            ctx.set_state(ConnectionState::Connecting);
        } else {
            ctx.set_state(ConnectionState::Reconnecting { attempt });
        }

        match connect_async(ctx.url.as_str()).await {
            Ok((stream, _response)) => {
                ctx.set_state(ConnectionState::Connected);
                tracing::info!(url = %ctx.url, attempt, "event channel connected");
                emit_connect(
                    &ctx.registry,
                    ConnectInfo {
                        attempt,
                        reconnect: ctx.has_connected.swap(true, Ordering::SeqCst),
                    },
                );
                attempt = 0;

                let reason = run_session(stream, &ctx).await;
                tracing::warn!(url = %ctx.url, %reason, "event channel lost");
                ctx.set_state(ConnectionState::Disconnected);
                emit_disconnect(&ctx.registry, &reason);
            }
            Err(e) => {
                tracing::warn!(url = %ctx.url, attempt, error = %e, "event channel connect failed");
            }
        }

        if ctx.reconnect_config.exhausted(attempt) {
            let reason = format!(
                "Max reconnect attempts ({}) exceeded",
                ctx.reconnect_config.max_attempts
            );
            tracing::error!(url = %ctx.url, %reason, "giving up on event channel");
            ctx.set_state(ConnectionState::Failed { reason });
            break;
        }

        let delay = ctx.reconnect_config.delay_for_attempt(attempt);
        tracing::info!(url = %ctx.url, delay_ms = delay.as_millis() as u64, attempt = attempt + 1, "reconnecting");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Pump one established session until it ends; returns why it ended.
async fn run_session(stream: WebSocketStream<MaybeTlsStream<TcpStream>>, ctx: &LoopContext) -> String {
    let (mut write, mut read) = stream.split();
    let mut outbox = ctx.outbox.lock().await;

    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => dispatch_frame(&ctx.registry, text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    return match frame {
                        Some(frame) => format!("closed by server: {}", frame.reason.as_str()),
                        None => "closed by server".to_string(),
                    };
                }
                // Pong is handled automatically by tungstenite; binary frames are not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => return format!("read error: {e}"),
                None => return "stream ended".to_string(),
            },
            outgoing = outbox.next() => match outgoing {
                Some(frame) => match frame.to_text() {
                    Ok(json) => {
                        if let Err(e) = write.send(Message::Text(json.into())).await {
                            return format!("write error: {e}");
                        }
                    }
                    Err(e) => tracing::error!(event = %frame.event, error = %e, "failed to encode outbound frame"),
                },
                None => return "outbox closed".to_string(),
            },
        }
    }
}
