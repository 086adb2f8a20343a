//! Realtime Feed Client
//!
//! One always-on WebSocket channel to the activity feed, shared by every
//! consumer in the process through an explicitly constructed client.
//!
//! Lifecycle:
//! `Disconnected → Connecting → Connected → (close) → Reconnecting → Connecting → …`
//!
//! - Reconnection with exponential backoff: `min(base * 2^(attempt-1), max)`,
//!   bounded attempts, then `GaveUp` until the next explicit `connect()`
//! - Heartbeat: JSON ping every interval; no inbound traffic within the
//!   timeout closes the socket and takes the reconnection path (catches
//!   half-open connections the transport does not notice)
//! - Topic subscribers (plus the `"*"` wildcard) survive reconnects; each
//!   callback runs isolated so one panicking listener cannot starve the rest
//! - Every outbound message goes through one bounded drop-oldest queue; the
//!   live session drains it oldest-first, so messages sent while offline are
//!   flushed before newer ones on the next open
//! - Socket writes are bounded by the heartbeat timeout, so a peer that stops
//!   reading is treated like one that stopped answering pings
//!
//! Public methods are synchronous. `connect()` spawns the connection task
//! and must be called from inside a tokio runtime.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Notify};
use tokio::time::{interval_at, sleep, sleep_until, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::models::config::RealtimeConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{PingMessage, RealtimeMessage};
use crate::utils::constants::{WILDCARD_TOPIC, WS_EVENT_BUFFER};

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type FeedSink = SplitSink<FeedStream, Message>;

/// Listener invoked for every message on its topic
pub type SubscriberCallback = Arc<dyn Fn(&RealtimeMessage) + Send + Sync>;

// ============================================
// STATE & EVENTS
// ============================================

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Observable lifecycle events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32, delay: Duration },
    /// Retry budget exhausted; only an explicit `connect()` resumes
    GaveUp { attempts: u32 },
}

// ============================================
// RECONNECT POLICY
// ============================================

/// Exponential backoff with a delay cap and an attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            base_delay: config.reconnect_base_delay,
            max_delay: config.reconnect_max_delay,
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Delay before reconnect attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether another attempt fits in the budget
    pub fn allows(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

// ============================================
// OUTBOUND QUEUE
// ============================================

/// FIFO of encoded messages waiting for a connection
#[derive(Debug)]
struct OutboundQueue {
    messages: VecDeque<String>,
    capacity: usize,
}

impl OutboundQueue {
    fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Enqueue; returns the message evicted to make room, if any
    fn push(&mut self, message: String) -> Option<String> {
        if self.capacity == 0 {
            return Some(message);
        }
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    fn pop(&mut self) -> Option<String> {
        self.messages.pop_front()
    }

    fn len(&self) -> usize {
        self.messages.len()
    }

    fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn clear(&mut self) {
        self.messages.clear();
    }
}

// ============================================
// SUBSCRIBERS
// ============================================

/// Topic → listeners in registration order
#[derive(Default)]
struct SubscriberRegistry {
    next_id: u64,
    topics: HashMap<String, Vec<(u64, SubscriberCallback)>>,
}

impl SubscriberRegistry {
    fn insert(&mut self, topic: &str, callback: SubscriberCallback) -> u64 {
        // Ids never restart, so a stale handle cannot remove a newer listener
        self.next_id += 1;
        let id = self.next_id;
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    fn remove(&mut self, topic: &str, id: u64) -> bool {
        let Some(listeners) = self.topics.get_mut(topic) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    /// Listeners of `kind` followed by wildcard listeners
    fn listeners_for(&self, kind: &str) -> Vec<SubscriberCallback> {
        let topic = self.topics.get(kind).into_iter().flatten();
        let wildcard = if kind == WILDCARD_TOPIC {
            None
        } else {
            self.topics.get(WILDCARD_TOPIC)
        };
        topic
            .chain(wildcard.into_iter().flatten())
            .map(|(_, callback)| callback.clone())
            .collect()
    }

    fn count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    fn clear(&mut self) {
        self.topics.clear();
    }
}

/// Run every listener; returns how many panicked
fn dispatch(listeners: &[SubscriberCallback], message: &RealtimeMessage) -> usize {
    let mut failures = 0;
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
            failures += 1;
            error!(kind = %message.kind, "❌ Feed subscriber panicked; remaining subscribers still run");
        }
    }
    failures
}

/// Handle for one registration
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    id: u64,
    registry: Weak<Mutex<SubscriberRegistry>>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Remove exactly this listener; false if it was already gone
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => lock(&registry).remove(&self.topic, self.id),
            None => false,
        }
    }
}

// ============================================
// CLIENT
// ============================================

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ClientState {
    status: ConnectionState,
    /// Bumped by every connect()/disconnect(); older connection tasks see
    /// the mismatch and stop without touching state
    generation: u64,
    reconnect_attempts: u32,
    queue: OutboundQueue,
    /// Wakes the live session's writer; present only while connected
    outbound_ready: Option<Arc<Notify>>,
    shutdown: Option<watch::Sender<bool>>,
}

struct Shared {
    config: RealtimeConfig,
    policy: BackoffPolicy,
    state: Mutex<ClientState>,
    subscribers: Arc<Mutex<SubscriberRegistry>>,
    events: broadcast::Sender<ConnectionEvent>,
}

enum ReconnectDecision {
    Retry { attempt: u32, delay: Duration },
    GiveUp { attempts: u32 },
    Stale,
}

enum SessionEnd {
    /// Stopped by connect()/disconnect(); no reconnect
    Shutdown,
    /// Lost the connection; reconnect policy applies
    Closed,
}

impl Shared {
    fn emit(&self, event: ConnectionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Update status unless this task has been superseded
    fn set_status(&self, generation: u64, status: ConnectionState) -> bool {
        let mut state = lock(&self.state);
        if state.generation != generation {
            return false;
        }
        state.status = status;
        true
    }

    fn schedule_reconnect(&self, generation: u64) -> ReconnectDecision {
        let mut state = lock(&self.state);
        if state.generation != generation {
            return ReconnectDecision::Stale;
        }
        if !self.policy.allows(state.reconnect_attempts) {
            state.status = ConnectionState::Disconnected;
            state.shutdown = None;
            return ReconnectDecision::GiveUp {
                attempts: state.reconnect_attempts,
            };
        }
        state.reconnect_attempts += 1;
        state.status = ConnectionState::Reconnecting;
        let attempt = state.reconnect_attempts;
        ReconnectDecision::Retry {
            attempt,
            delay: self.policy.delay_for(attempt),
        }
    }

    /// Oldest queued message for the live session, plus whether more remain
    fn next_outbound(&self, generation: u64) -> Option<(String, bool)> {
        let mut state = lock(&self.state);
        if state.generation != generation {
            return None;
        }
        let text = state.queue.pop()?;
        Some((text, !state.queue.is_empty()))
    }

    fn dispatch_text(&self, text: &str) {
        let message = match RealtimeMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                let err = AppError::invalid_message(e.to_string());
                let preview: String = text.chars().take(120).collect();
                warn!(code = err.code_str(), "⚠️ Dropping malformed feed message: {}", preview);
                return;
            }
        };

        debug!(kind = %message.kind, "📨 Feed message");
        let listeners = lock(&self.subscribers).listeners_for(&message.kind);
        dispatch(&listeners, &message);
    }
}

/// Realtime feed client; clones share one connection
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
}

impl RealtimeClient {
    pub fn new(config: RealtimeConfig) -> Self {
        let (events, _) = broadcast::channel(WS_EVENT_BUFFER);
        let state = ClientState {
            status: ConnectionState::Disconnected,
            generation: 0,
            reconnect_attempts: 0,
            queue: OutboundQueue::new(config.queue_capacity),
            outbound_ready: None,
            shutdown: None,
        };

        Self {
            shared: Arc::new(Shared {
                policy: BackoffPolicy::from_config(&config),
                config,
                state: Mutex::new(state),
                subscribers: Arc::new(Mutex::new(SubscriberRegistry::default())),
                events,
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.shared.config.url
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.shared.policy
    }

    /// Open the channel. Ignored while connecting or connected; while a
    /// reconnect is pending, that reconnect is cancelled and a fresh attempt
    /// starts. Resets the reconnect budget.
    pub fn connect(&self) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let generation = {
            let mut state = lock(&self.shared.state);
            match state.status {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    debug!("Realtime feed already active, connect() ignored");
                    return;
                }
                ConnectionState::Reconnecting => {
                    debug!("Cancelling pending reconnect for explicit connect()");
                }
                ConnectionState::Disconnected => {}
            }

            if let Some(previous) = state.shutdown.take() {
                let _ = previous.send(true);
            }
            state.generation += 1;
            state.reconnect_attempts = 0;
            state.status = ConnectionState::Connecting;
            state.shutdown = Some(shutdown_tx);
            state.generation
        };

        tokio::spawn(run_connection(self.shared.clone(), generation, shutdown_rx));
    }

    /// Queue for the live session, or for the next open when offline.
    /// Only fails when the message cannot be encoded.
    pub fn send<T: Serialize>(&self, message: &T) -> AppResult<()> {
        let text = serde_json::to_string(message).map_err(|e| {
            AppError::with_source(ErrorCode::RealtimeEncodeFailed, "Failed to encode outbound message", e)
        })?;
        self.send_text(text);
        Ok(())
    }

    fn send_text(&self, text: String) {
        let mut state = lock(&self.shared.state);

        if let Some(evicted) = state.queue.push(text) {
            warn!(
                capacity = self.shared.config.queue_capacity,
                evicted_bytes = evicted.len(),
                "⚠️ Outbound queue full, dropped oldest message"
            );
        }

        match &state.outbound_ready {
            Some(ready) => ready.notify_one(),
            None => debug!(queued = state.queue.len(), "📥 Feed offline, message queued"),
        }
    }

    /// Register `callback` for `topic` (`"*"` receives everything)
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> Subscription
    where
        F: Fn(&RealtimeMessage) + Send + Sync + 'static,
    {
        let id = lock(&self.shared.subscribers).insert(topic, Arc::new(callback));
        Subscription {
            topic: topic.to_string(),
            id,
            registry: Arc::downgrade(&self.shared.subscribers),
        }
    }

    /// Full teardown: stops the connection task, cancels pending reconnects,
    /// clears subscribers and drains the outbound queue.
    pub fn disconnect(&self) {
        let (previous, dropped) = {
            let mut state = lock(&self.shared.state);
            state.generation += 1;
            if let Some(shutdown) = state.shutdown.take() {
                let _ = shutdown.send(true);
            }
            state.outbound_ready = None;
            let dropped = state.queue.len();
            state.queue.clear();
            state.reconnect_attempts = 0;
            let previous = std::mem::replace(&mut state.status, ConnectionState::Disconnected);
            (previous, dropped)
        };

        lock(&self.shared.subscribers).clear();

        info!(dropped_messages = dropped, "🛑 Realtime feed disconnected");
        if previous != ConnectionState::Disconnected {
            self.shared.emit(ConnectionEvent::Disconnected);
        }
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.shared.state).status
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        lock(&self.shared.state).reconnect_attempts
    }

    pub fn queued_len(&self) -> usize {
        lock(&self.shared.state).queue.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        lock(&self.shared.subscribers).count(topic)
    }

    /// Lifecycle event stream
    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }
}

// ============================================
// CONNECTION TASK
// ============================================

async fn run_connection(shared: Arc<Shared>, generation: u64, mut shutdown: watch::Receiver<bool>) {
    loop {
        if !shared.set_status(generation, ConnectionState::Connecting) {
            return;
        }
        info!(url = %shared.config.url, "🔌 Connecting to realtime feed");

        let attempt = tokio::select! {
            _ = shutdown.changed() => return,
            result = connect_async(shared.config.url.as_str()) => result,
        };

        match attempt {
            Ok((stream, _)) => match run_session(&shared, generation, stream, &mut shutdown).await {
                SessionEnd::Shutdown => return,
                SessionEnd::Closed => shared.emit(ConnectionEvent::Disconnected),
            },
            Err(e) => {
                let err = AppError::connection_failed(e.to_string());
                warn!(code = err.code_str(), "❌ Realtime connection failed: {}", err.message);
            }
        }

        let delay = match shared.schedule_reconnect(generation) {
            ReconnectDecision::Retry { attempt, delay } => {
                warn!(
                    "🔄 Reconnecting in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    shared.policy.max_attempts
                );
                shared.emit(ConnectionEvent::Reconnecting { attempt, delay });
                delay
            }
            ReconnectDecision::GiveUp { attempts } => {
                error!(
                    code = ErrorCode::RealtimeGaveUp.as_str(),
                    "❌ Max reconnection attempts ({}) reached, giving up", attempts
                );
                shared.emit(ConnectionEvent::GaveUp { attempts });
                return;
            }
            ReconnectDecision::Stale => return,
        };

        tokio::select! {
            _ = shutdown.changed() => return,
            _ = sleep(delay) => {}
        }
    }
}

/// Write one frame. A write that cannot finish within `limit` means the peer
/// stopped reading.
async fn write_frame(sink: &mut FeedSink, frame: Message, limit: Duration) -> AppResult<()> {
    match timeout(limit, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AppError::connection_failed(e.to_string())),
        Err(_) => Err(AppError::connection_failed(format!(
            "write stalled for {}ms",
            limit.as_millis()
        ))),
    }
}

async fn run_session(
    shared: &Shared,
    generation: u64,
    stream: FeedStream,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut sink, mut source) = stream.split();
    let ready = Arc::new(Notify::new());

    let backlog = {
        let mut state = lock(&shared.state);
        if state.generation != generation {
            return SessionEnd::Shutdown;
        }
        state.reconnect_attempts = 0;
        state.status = ConnectionState::Connected;
        state.outbound_ready = Some(ready.clone());
        state.queue.len()
    };
    // Backlog is already at the head of the queue
    ready.notify_one();
    info!(backlog, "✅ Realtime feed connected");
    shared.emit(ConnectionEvent::Connected);

    let heartbeat_interval = shared.config.heartbeat_interval;
    let heartbeat_timeout = shared.config.heartbeat_timeout;
    let mut heartbeat = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut liveness_deadline: Option<Instant> = None;

    let end = loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = write_frame(&mut sink, Message::Close(None), heartbeat_timeout).await;
                break SessionEnd::Shutdown;
            }
            _ = ready.notified() => {
                // One message per wake so reads and timers interleave with a long backlog
                let Some((text, more)) = shared.next_outbound(generation) else {
                    continue;
                };
                if more {
                    ready.notify_one();
                }
                if let Err(e) = write_frame(&mut sink, Message::Text(text), heartbeat_timeout).await {
                    warn!(code = e.code_str(), "❌ Realtime send failed: {}", e.message);
                    break SessionEnd::Closed;
                }
            }
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    liveness_deadline = None;
                    shared.dispatch_text(&text);
                }
                Some(Ok(Message::Binary(bytes))) => {
                    liveness_deadline = None;
                    match String::from_utf8(bytes) {
                        Ok(text) => shared.dispatch_text(&text),
                        Err(_) => warn!("⚠️ Dropping non UTF-8 binary frame"),
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = write_frame(&mut sink, Message::Pong(payload), heartbeat_timeout).await {
                        warn!(code = e.code_str(), "❌ Pong send failed: {}", e.message);
                        break SessionEnd::Closed;
                    }
                }
                Some(Ok(Message::Pong(_))) => liveness_deadline = None,
                Some(Ok(Message::Close(_))) => {
                    warn!("🔌 Realtime feed closed by server");
                    break SessionEnd::Closed;
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    error!("❌ Realtime feed error: {}", e);
                    break SessionEnd::Closed;
                }
                None => {
                    warn!("🔌 Realtime feed stream ended");
                    break SessionEnd::Closed;
                }
            },
            _ = heartbeat.tick() => {
                match serde_json::to_string(&PingMessage::now()) {
                    Ok(ping) => {
                        if let Err(e) = write_frame(&mut sink, Message::Text(ping), heartbeat_timeout).await {
                            warn!(code = e.code_str(), "💔 Heartbeat send failed: {}", e.message);
                            break SessionEnd::Closed;
                        }
                    }
                    Err(e) => warn!("⚠️ Heartbeat encode failed: {}", e),
                }
                if liveness_deadline.is_none() {
                    liveness_deadline = Some(Instant::now() + heartbeat_timeout);
                }
            }
            _ = sleep_until(liveness_deadline.unwrap_or_else(Instant::now)), if liveness_deadline.is_some() => {
                warn!(
                    timeout_ms = heartbeat_timeout.as_millis() as u64,
                    "💔 Heartbeat timeout, closing stalled feed connection"
                );
                let _ = write_frame(&mut sink, Message::Close(None), heartbeat_timeout).await;
                break SessionEnd::Closed;
            }
        }
    };

    if let SessionEnd::Closed = end {
        // Unsent messages stay queued for the next open
        let mut state = lock(&shared.state);
        if state.generation == generation {
            state.outbound_ready = None;
        }
    }

    end
}
