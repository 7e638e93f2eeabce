//! Realtime push channel.
//!
//! A persistent WebSocket connection that delivers file-set deltas. The
//! channel is a poll-driven state machine: the owner calls
//! [`RealtimeChannel::poll`] from its event loop with the current time, and
//! gets back whatever deltas arrived since the last poll. Reconnects are
//! timers checked during that poll, never background callbacks.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::protocol::{ClientMessage, ServerEvent};

/// Fixed delay before reconnecting, neither backed off nor capped.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    /// Waiting `delay` before the next attempt.
    Reconnecting { delay: Duration },
}

/// Low-level events reported by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
    Error(String),
}

/// A text-frame duplex connection, polled without blocking.
pub trait Transport {
    /// Begin connecting to `url`. Completion is reported by [`TransportEvent::Opened`].
    fn connect(&mut self, url: &str) -> Result<(), String>;

    /// Queue a text frame.
    fn send(&self, text: &str) -> Result<(), String>;

    /// Drain events received since the last poll.
    fn poll_events(&mut self) -> Vec<TransportEvent>;

    /// Close the connection, if any. Must not report further events.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, url: &str) -> Result<(), String> {
        (**self).connect(url)
    }

    fn send(&self, text: &str) -> Result<(), String> {
        (**self).send(text)
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        (**self).poll_events()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Auto-reconnecting subscription to server file deltas.
pub struct RealtimeChannel<T: Transport> {
    transport: T,
    url: Option<String>,
    state: ConnectionState,
    /// Cleared on shutdown; checked when scheduling and when a reconnect fires.
    live: bool,
    reconnect_at: Option<Instant>,
}

impl<T: Transport> RealtimeChannel<T> {
    /// Create a channel. An empty or missing `url` disables the channel.
    pub fn new(transport: T, url: Option<String>) -> Self {
        Self {
            transport,
            url: url.filter(|u| !u.trim().is_empty()),
            state: ConnectionState::Disconnected,
            live: false,
            reconnect_at: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a server address is configured.
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// When the pending reconnect is due, if one is scheduled.
    pub fn reconnect_due(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Start connecting. Without a configured address this does nothing.
    pub fn start(&mut self, now: Instant) {
        if self.url.is_none() {
            log::debug!("Realtime channel disabled: no server configured");
            return;
        }
        if self.live {
            return;
        }
        self.live = true;
        self.connect(now);
    }

    fn connect(&mut self, now: Instant) {
        if !self.live {
            return;
        }
        let Some(url) = self.url.clone() else {
            return;
        };
        self.reconnect_at = None;
        self.state = ConnectionState::Connecting;
        log::info!("Realtime channel connecting to {}", url);
        if let Err(e) = self.transport.connect(&url) {
            log::error!("Realtime connect failed: {}", e);
            self.schedule_reconnect(now);
        }
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        if !self.live {
            return;
        }
        // One timer at a time: an error followed by a close must not double up.
        if self.reconnect_at.is_some() {
            return;
        }
        self.transport.close();
        self.state = ConnectionState::Reconnecting { delay: RECONNECT_DELAY };
        self.reconnect_at = Some(now + RECONNECT_DELAY);
        log::info!("Realtime channel lost, reconnecting in {:?}", RECONNECT_DELAY);
    }

    /// Process transport events and timers. Returns parsed deltas in arrival order.
    pub fn poll(&mut self, now: Instant) -> Vec<ServerEvent> {
        let mut deltas = Vec::new();
        if !self.live {
            return deltas;
        }

        if let Some(due) = self.reconnect_at {
            if now >= due {
                self.connect(now);
            }
            return deltas;
        }

        for event in self.transport.poll_events() {
            match event {
                TransportEvent::Opened => {
                    self.state = ConnectionState::Open;
                    log::info!("Realtime channel open, subscribing");
                    if let Err(e) = self.transport.send(&ClientMessage::Subscribe.to_json()) {
                        log::error!("Failed to send subscribe: {}", e);
                        self.schedule_reconnect(now);
                        break;
                    }
                }
                TransportEvent::Message(text) => match ServerEvent::parse(&text) {
                    Ok(delta) => deltas.push(delta),
                    Err(e) => log::warn!("Dropping realtime message: {} ({})", e, truncate(&text)),
                },
                TransportEvent::Closed => {
                    self.schedule_reconnect(now);
                    break;
                }
                TransportEvent::Error(message) => {
                    log::error!("Realtime transport error: {}", message);
                    self.schedule_reconnect(now);
                    break;
                }
            }
        }
        deltas
    }

    /// Stop for good: cancel any pending reconnect and close the connection.
    pub fn shutdown(&mut self) {
        if self.live {
            log::info!("Realtime channel shutting down");
        }
        self.live = false;
        self.reconnect_at = None;
        self.transport.close();
        self.state = ConnectionState::Disconnected;
    }
}

impl<T: Transport> Drop for RealtimeChannel<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ============================================================================
// Native WebSocket transport
// ============================================================================

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket transport for native platforms.
///
/// Uses a background thread for non-blocking operation. The thread only
/// forwards frames over a channel; all interpretation happens on the polling
/// side.
pub struct NativeWebSocket {
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<TransportEvent>>,
    /// Handle to the WebSocket thread.
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    pub fn new() -> Self {
        Self {
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for NativeWebSocket {
    fn connect(&mut self, url: &str) -> Result<(), String> {
        if self.cmd_tx.is_some() {
            return Err("Already connected".to_string());
        }

        let parsed_url = url::Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(format!("Invalid WebSocket URL scheme: {}", parsed_url.scheme()));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<TransportEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, &cmd_rx, &event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);
        Ok(())
    }

    fn send(&self, text: &str) -> Result<(), String> {
        match self.cmd_tx {
            Some(ref tx) => tx
                .send(WsCommand::Send(text.to_string()))
                .map_err(|e| format!("Send failed: {}", e)),
            None => Err("Not connected".to_string()),
        }
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_rx {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        // Thread gone without saying goodbye.
                        if !matches!(events.last(), Some(TransportEvent::Closed)) {
                            events.push(TransportEvent::Closed);
                        }
                        self.event_rx = None;
                        self.cmd_tx = None;
                        break;
                    }
                }
            }
        }
        events
    }

    fn close(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_socket(url: &str, cmd_rx: &Receiver<WsCommand>, event_tx: &Sender<TransportEvent>) {
    use tungstenite::{connect, Message};

    log::debug!("WebSocket thread: connecting to {}", url);
    let (mut socket, response) = match connect(url) {
        Ok(pair) => pair,
        Err(e) => {
            let _ = event_tx.send(TransportEvent::Error(format!("Connection failed: {}", e)));
            return;
        }
    };
    log::debug!("WebSocket connected, status: {}", response.status());
    let _ = event_tx.send(TransportEvent::Opened);

    // Short read timeout so the loop can service commands.
    match socket.get_mut() {
        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        tungstenite::stream::MaybeTlsStream::Rustls(tls) => {
            let _ = tls.sock.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tls.sock.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => {
            log::debug!("Unknown stream type, reads may block");
        }
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("WebSocket sending: {}", truncate(&msg));
                if let Err(e) = socket.send(Message::Text(msg)) {
                    let _ = event_tx.send(TransportEvent::Error(format!("Send failed: {}", e)));
                    return;
                }
            }
            Ok(WsCommand::Close) | Err(TryRecvError::Disconnected) => {
                let _ = socket.close(None);
                return;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => {
                log::debug!("WebSocket received: {}", truncate(&txt));
                if event_tx.send(TransportEvent::Message(txt)).is_err() {
                    let _ = socket.close(None);
                    return;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                let _ = event_tx.send(TransportEvent::Closed);
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                let _ = event_tx.send(TransportEvent::Closed);
                return;
            }
            Err(e) => {
                let _ = event_tx.send(TransportEvent::Error(format!("Read failed: {}", e)));
                return;
            }
        }
    }
}
