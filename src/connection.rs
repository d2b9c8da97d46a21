//! Connection lifecycle for the broadcast stream channel
//!
//! Owns the single session to the device: `Disconnected → Connecting →
//! Connected → Disconnected`, reentrant forever. There is no automatic
//! reconnect; every reconnection is a fresh explicit `connect` call.
//! Inbound frames are forwarded to the reading parser unless the override
//! controller reports suppression.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::error::{Result, WxlinkError};
use crate::events::{EventBus, SessionEvent};
use crate::manual_override::OverrideController;
use crate::reading::parse_broadcast;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Lifecycle state of the one stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

struct SessionState {
    state: RwLock<ConnectionState>,
    writer: Mutex<Option<WsSink>>,
    // Bumped on every connect/disconnect. An open attempt or reader loop
    // whose generation no longer matches has been superseded and must
    // discard its result instead of touching session state.
    generation: AtomicU64,
}

/// Owns the session to the device stream channel
pub struct ConnectionManager {
    session: Arc<SessionState>,
    events: EventBus,
    overrides: OverrideController,
}

impl ConnectionManager {
    pub fn new(events: EventBus, overrides: OverrideController) -> Self {
        Self {
            session: Arc::new(SessionState {
                state: RwLock::new(ConnectionState::Disconnected),
                writer: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
            events,
            overrides,
        }
    }

    /// Current session state
    pub async fn state(&self) -> ConnectionState {
        *self.session.state.read().await
    }

    /// Open the stream session
    ///
    /// Any existing session is torn down first. Returns once the open
    /// attempt is underway (state `Connecting`); the outcome arrives as a
    /// `StatusChanged` event. Fails with `InvalidEndpoint` before any I/O
    /// when the configured host is empty.
    pub async fn connect(&self, config: &DeviceConfig) -> Result<()> {
        let url = config.stream_url()?;

        self.teardown().await;
        let generation = self.session.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Self::transition(
            &self.session,
            &self.events,
            ConnectionState::Connecting,
            Some(format!("connecting to {url}")),
        )
        .await;

        let session = self.session.clone();
        let events = self.events.clone();
        let overrides = self.overrides.clone();
        tokio::spawn(async move {
            match connect_async(&url).await {
                Ok((stream, response)) => {
                    debug!(status = ?response.status(), "stream handshake complete");
                    let (sink, source) = stream.split();
                    {
                        let mut writer = session.writer.lock().await;
                        if session.generation.load(Ordering::SeqCst) != generation {
                            debug!(%url, "open attempt superseded, discarding stream");
                            return;
                        }
                        *writer = Some(sink);
                    }
                    if !Self::transition_if_current(
                        &session,
                        &events,
                        generation,
                        ConnectionState::Connected,
                        Some(format!("connected to {url}")),
                    )
                    .await
                    {
                        // Superseded between the writer install and the
                        // transition; the superseding teardown owns cleanup.
                        return;
                    }
                    Self::read_loop(&session, &events, &overrides, source, generation).await;
                }
                Err(e) => {
                    warn!(%url, error = %e, "stream open failed");
                    Self::transition_if_current(
                        &session,
                        &events,
                        generation,
                        ConnectionState::Disconnected,
                        Some(format!("connection failed: {e}")),
                    )
                    .await;
                }
            }
        });

        Ok(())
    }

    /// Close the stream session
    ///
    /// Safe from any state. A no-op that reports the current state when
    /// already disconnected; a disconnect while `Connecting` invalidates
    /// the in-flight attempt, whose result is discarded once it settles.
    pub async fn disconnect(&self) -> ConnectionState {
        let current = *self.session.state.read().await;
        if current == ConnectionState::Disconnected {
            debug!("disconnect requested while already disconnected");
            return current;
        }

        self.teardown().await;
        Self::transition(
            &self.session,
            &self.events,
            ConnectionState::Disconnected,
            Some("disconnected".into()),
        )
        .await;
        ConnectionState::Disconnected
    }

    /// Push a raw city-name string over the stream
    ///
    /// Valid only in `Connected`; fails with `NotConnected` otherwise,
    /// performing no transport I/O.
    pub async fn send(&self, text: &str) -> Result<()> {
        if *self.session.state.read().await != ConnectionState::Connected {
            return Err(WxlinkError::NotConnected);
        }
        let mut writer = self.session.writer.lock().await;
        let sink = writer.as_mut().ok_or(WxlinkError::NotConnected)?;
        sink.send(Message::Text(text.to_string()))
            .await
            .map_err(|e| WxlinkError::transport(format!("stream send failed: {e}")))?;
        debug!(%text, "city pushed over stream");
        Ok(())
    }

    /// Invalidate any in-flight attempt and close the active stream, if any
    async fn teardown(&self) {
        self.session.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(mut sink) = self.session.writer.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "error closing stream");
            }
        }
    }

    async fn transition(
        session: &SessionState,
        events: &EventBus,
        state: ConnectionState,
        detail: Option<String>,
    ) {
        let mut current = session.state.write().await;
        *current = state;
        info!(%state, "session state changed");
        // Published under the state lock so event order matches state order.
        events.publish(SessionEvent::StatusChanged { state, detail });
    }

    /// Transition only when this session is still the current one
    ///
    /// The generation is re-checked under the state write lock, so a stale
    /// open attempt or reader settling after a disconnect (or a newer
    /// connect) cannot stomp the superseding transition.
    async fn transition_if_current(
        session: &SessionState,
        events: &EventBus,
        generation: u64,
        state: ConnectionState,
        detail: Option<String>,
    ) -> bool {
        let mut current = session.state.write().await;
        if session.generation.load(Ordering::SeqCst) != generation {
            debug!(%state, "state transition discarded, session superseded");
            return false;
        }
        *current = state;
        info!(%state, "session state changed");
        events.publish(SessionEvent::StatusChanged { state, detail });
        true
    }

    /// Forward inbound frames until the stream ends, gated by suppression
    async fn read_loop(
        session: &SessionState,
        events: &EventBus,
        overrides: &OverrideController,
        mut source: WsSource,
        generation: u64,
    ) {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(raw)) => {
                    if overrides.is_suppressing() {
                        debug!(%raw, "broadcast ignored while override active");
                        events.publish(SessionEvent::BroadcastSuppressed { raw });
                    } else {
                        events.publish(SessionEvent::ReadingUpdated(parse_broadcast(&raw)));
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(?frame, "stream closed by device");
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(other) => {
                    debug!(?other, "ignoring non-text frame");
                }
                Err(e) => {
                    warn!(error = %e, "stream error");
                    break;
                }
            }
        }

        // Only the current session may release the writer and transition;
        // a superseded reader belongs to a torn-down connection.
        {
            let mut writer = session.writer.lock().await;
            if session.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            writer.take();
        }
        Self::transition_if_current(
            session,
            events,
            generation,
            ConnectionState::Disconnected,
            Some("stream closed".into()),
        )
        .await;
    }
}
