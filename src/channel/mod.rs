//! Realtime channel manager
//!
//! One [`Channel`] owns one logical connection to the realtime endpoint:
//! it drives the connect/open/close lifecycle, reconnects with exponential
//! backoff after unexpected closures, emits keep-alive frames while open,
//! and dispatches inbound messages to per-type handlers.
//!
//! All channel logic runs on a single driver task. The public handle talks
//! to it over a command channel, so calls return immediately and state
//! transitions, timers, and handler invocations never race each other.

mod backoff;
mod registry;
mod state;

pub use backoff::ReconnectPolicy;
pub use registry::{Handler, HandlerRegistry};
pub use state::ChannelState;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::{ChannelConfig, NORMAL_CLOSE_CODE};
use crate::error::{ChannelError, Result};
use crate::transport::{endpoint_url, Connection, Frame, Transport, WsTransport};
use crate::types::{Envelope, Session};

enum Command {
    Connect,
    Disconnect,
    Send(Envelope, oneshot::Sender<Result<()>>),
}

/// Handle to a logical realtime connection.
///
/// Created when the hosting component mounts and dropped when it unmounts.
/// A channel cycles through many physical connections over its lifetime,
/// but holds at most one at a time. Dropping the handle shuts the driver
/// down cleanly (same path as [`Channel::disconnect`]).
pub struct Channel {
    session: Session,
    handlers: Arc<HandlerRegistry>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ChannelState>,
    last_message: watch::Receiver<Option<Envelope>>,
}

impl Channel {
    /// Create a channel for the realtime endpoint derived from `origin`.
    ///
    /// Spawns the driver task, so this must be called from within a tokio
    /// runtime. The channel starts out `Disconnected`; call
    /// [`Channel::connect`] to dial.
    pub fn new(origin: &str, session: Session, config: ChannelConfig) -> Result<Self> {
        Self::with_transport(WsTransport::new(), origin, session, config)
    }

    /// Create a channel over a custom transport.
    pub fn with_transport<T: Transport>(
        transport: T,
        origin: &str,
        session: Session,
        config: ChannelConfig,
    ) -> Result<Self> {
        let url = endpoint_url(origin)?;
        let handlers = Arc::new(HandlerRegistry::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (last_tx, last_rx) = watch::channel(None);

        let driver = Driver {
            transport,
            url,
            policy: ReconnectPolicy::from_config(&config),
            heartbeat_interval: config.heartbeat_interval,
            handlers: Arc::clone(&handlers),
            commands: command_rx,
            state: state_tx,
            last_message: last_tx,
            attempts: 0,
        };
        tokio::spawn(driver.run());

        Ok(Self {
            session,
            handlers,
            commands: command_tx,
            state: state_rx,
            last_message: last_rx,
        })
    }

    /// Start connecting. Returns immediately; the open (or failure) is
    /// delivered asynchronously through the state watch. A no-op while a
    /// connection attempt or live connection already exists.
    pub fn connect(&self) {
        let _ = self.commands.send(Command::Connect);
    }

    /// Tear the connection down intentionally: cancels any pending
    /// reconnect, closes the live connection with the reserved close code,
    /// and parks the channel in `Disconnected`.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Send an envelope. Accepted only while the channel is open;
    /// otherwise the message is dropped and `ChannelError::NotOpen` is
    /// returned. There is no internal queueing.
    pub async fn send(&self, envelope: Envelope) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Send(envelope, reply_tx))
            .map_err(|_| ChannelError::Stopped)?;
        reply_rx.await.map_err(|_| ChannelError::Stopped)?
    }

    /// Send a chat message stamped with this channel's session identity.
    pub async fn send_chat(&self, text: impl Into<String>) -> Result<()> {
        self.send(Envelope::chat(&self.session, text)).await
    }

    /// Register a handler for a message type, replacing any existing one.
    pub fn register_handler(
        &self,
        kind: impl Into<String>,
        handler: impl Fn(Value) + Send + Sync + 'static,
    ) {
        self.handlers.register(kind, handler);
    }

    /// Remove the handler for a message type.
    pub fn unregister_handler(&self, kind: &str) -> bool {
        self.handlers.unregister(kind)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Whether the channel is currently open
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Watch state transitions reactively instead of polling
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// The most recent well-formed inbound envelope, if any
    pub fn last_message(&self) -> Option<Envelope> {
        self.last_message.borrow().clone()
    }

    /// Watch inbound messages reactively
    pub fn watch_messages(&self) -> watch::Receiver<Option<Envelope>> {
        self.last_message.clone()
    }

    /// Session identity stamped onto outbound chat messages
    pub fn session(&self) -> &Session {
        &self.session
    }
}

/// What ended a dial attempt.
enum DialOutcome<C> {
    Connected(C),
    Failed,
    Cancelled,
    Shutdown,
}

/// What ended an open connection.
enum CloseKind {
    /// Reserved close code, or a local `disconnect()`
    Intentional,
    /// Any other close code, stream end, or transport error
    Unexpected,
    /// All handles dropped
    Shutdown,
}

/// What ended a backoff wait.
enum WaitOutcome {
    Retry,
    Cancelled,
    Shutdown,
}

/// The single task that owns the transport and runs all channel logic.
struct Driver<T: Transport> {
    transport: T,
    url: String,
    policy: ReconnectPolicy,
    heartbeat_interval: std::time::Duration,
    handlers: Arc<HandlerRegistry>,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ChannelState>,
    last_message: watch::Sender<Option<Envelope>>,
    /// Reconnect attempts in the current failure streak
    attempts: u32,
}

impl<T: Transport> Driver<T> {
    async fn run(mut self) {
        'idle: loop {
            // Disconnected and nothing scheduled. Only a connect command
            // gets things moving again.
            match self.commands.recv().await {
                Some(Command::Connect) => {}
                Some(Command::Disconnect) => continue 'idle,
                Some(Command::Send(_, reply)) => {
                    let _ = reply.send(Err(ChannelError::NotOpen));
                    continue 'idle;
                }
                None => return,
            }
            self.attempts = 0;

            'cycle: loop {
                self.set_state(ChannelState::Connecting);
                match self.dial().await {
                    DialOutcome::Connected(conn) => {
                        let closed = self.run_open(conn).await;
                        self.set_state(ChannelState::Disconnected);
                        match closed {
                            CloseKind::Unexpected => {}
                            CloseKind::Intentional => {
                                tracing::info!("channel disconnected");
                                continue 'idle;
                            }
                            CloseKind::Shutdown => return,
                        }
                    }
                    DialOutcome::Failed => self.set_state(ChannelState::Disconnected),
                    DialOutcome::Cancelled => {
                        self.set_state(ChannelState::Disconnected);
                        continue 'idle;
                    }
                    DialOutcome::Shutdown => {
                        self.set_state(ChannelState::Disconnected);
                        return;
                    }
                }

                // Unexpected closure or failed dial: retry on the backoff
                // schedule unless the attempt budget is spent.
                if self.policy.exhausted(self.attempts) {
                    tracing::warn!(
                        attempts = self.attempts,
                        "reconnect attempts exhausted, staying disconnected"
                    );
                    continue 'idle;
                }
                match self.wait_backoff().await {
                    WaitOutcome::Retry => continue 'cycle,
                    WaitOutcome::Cancelled => continue 'idle,
                    WaitOutcome::Shutdown => return,
                }
            }
        }
    }

    /// One connection attempt. Commands keep being served while the
    /// handshake is in flight; a disconnect aborts the attempt.
    async fn dial(&mut self) -> DialOutcome<T::Conn> {
        let connect = self.transport.connect(&self.url);
        tokio::pin!(connect);
        loop {
            tokio::select! {
                result = &mut connect => match result {
                    Ok(conn) => return DialOutcome::Connected(conn),
                    Err(e) => {
                        tracing::warn!(url = %self.url, error = %e, "connection attempt failed");
                        return DialOutcome::Failed;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Disconnect) => return DialOutcome::Cancelled,
                    Some(Command::Connect) => {}
                    Some(Command::Send(_, reply)) => {
                        let _ = reply.send(Err(ChannelError::NotOpen));
                    }
                    None => return DialOutcome::Shutdown,
                },
            }
        }
    }

    /// Serve one open connection until it closes. The heartbeat timer
    /// lives inside this select loop, so leaving `Open` stops it
    /// immediately, and a disconnect command drops it before the close
    /// frame goes out.
    async fn run_open(&mut self, mut conn: T::Conn) -> CloseKind {
        self.set_state(ChannelState::Open);
        self.attempts = 0;
        tracing::info!(url = %self.url, "channel open");

        let mut heartbeat = interval_at(
            Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = conn.recv() => match frame {
                    Some(Frame::Text(text)) => self.handle_frame(&text),
                    Some(Frame::Close(code)) => {
                        if code == Some(NORMAL_CLOSE_CODE) {
                            return CloseKind::Intentional;
                        }
                        tracing::warn!(?code, "connection closed unexpectedly");
                        return CloseKind::Unexpected;
                    }
                    None => {
                        tracing::warn!("transport stream ended");
                        return CloseKind::Unexpected;
                    }
                },
                _ = heartbeat.tick() => {
                    match serde_json::to_string(&Envelope::heartbeat()) {
                        Ok(text) => {
                            if let Err(e) = conn.send_text(text).await {
                                // The close will surface on the recv path.
                                tracing::warn!(error = %e, "heartbeat send failed");
                            } else {
                                tracing::trace!("heartbeat sent");
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "heartbeat serialization failed"),
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Send(envelope, reply)) => {
                        let _ = reply.send(self.write(&mut conn, &envelope).await);
                    }
                    Some(Command::Disconnect) => {
                        self.close(&mut conn).await;
                        return CloseKind::Intentional;
                    }
                    Some(Command::Connect) => {
                        tracing::debug!("connect ignored, channel already open");
                    }
                    None => {
                        self.close(&mut conn).await;
                        return CloseKind::Shutdown;
                    }
                },
            }
        }
    }

    /// Wait out the backoff delay for the next reconnect attempt. Sends
    /// arriving meanwhile are rejected; a disconnect cancels the retry.
    async fn wait_backoff(&mut self) -> WaitOutcome {
        let delay = self.policy.delay(self.attempts);
        self.attempts += 1;
        tracing::info!(
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return WaitOutcome::Retry,
                command = self.commands.recv() => match command {
                    Some(Command::Disconnect) => return WaitOutcome::Cancelled,
                    Some(Command::Connect) => {}
                    Some(Command::Send(_, reply)) => {
                        let _ = reply.send(Err(ChannelError::NotOpen));
                    }
                    None => return WaitOutcome::Shutdown,
                },
            }
        }
    }

    /// Parse an inbound frame and dispatch it. Malformed frames are logged
    /// and dropped; they never tear the connection down.
    fn handle_frame(&self, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                return;
            }
        };
        let envelope: Envelope = match serde_json::from_value(value.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping frame with invalid envelope");
                return;
            }
        };

        let _ = self.last_message.send(Some(envelope.clone()));

        let payload = envelope.data.clone().unwrap_or(value);
        if self.handlers.dispatch(&envelope.kind, payload) {
            tracing::debug!(kind = %envelope.kind, "dispatched message");
        } else {
            tracing::trace!(kind = %envelope.kind, "no handler registered, message dropped");
        }
    }

    async fn write(&mut self, conn: &mut T::Conn, envelope: &Envelope) -> Result<()> {
        let text = serde_json::to_string(envelope)?;
        conn.send_text(text).await
    }

    async fn close(&mut self, conn: &mut T::Conn) {
        self.set_state(ChannelState::Closing);
        if let Err(e) = conn.close(NORMAL_CLOSE_CODE).await {
            tracing::debug!(error = %e, "close frame not delivered");
        }
    }

    fn set_state(&self, next: ChannelState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                tracing::debug!(from = %current, to = %next, "channel state");
                *current = next;
                true
            }
        });
    }
}
