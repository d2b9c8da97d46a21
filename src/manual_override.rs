//! Manual override window management
//!
//! A manual override supersedes device-reported readings for a bounded
//! window. While the window is active every inbound broadcast is
//! suppressed; the window expires exactly once, and a new override
//! replaces any pending one atomically so only a single expiry timer is
//! ever live.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{Result, WxlinkError};
use crate::events::{EventBus, SessionEvent};

/// Fixed length of a manual override window (device protocol `manualDuration`)
pub const OVERRIDE_WINDOW: Duration = Duration::from_secs(5);

/// The single timed override window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideWindow {
    /// User-supplied temperature value
    pub value: f64,

    /// Whether the window is currently live
    pub active: bool,

    /// When the window expires
    pub expiry: Instant,
}

struct OverrideState {
    window: Mutex<Option<OverrideWindow>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    suppressing: AtomicBool,
    // Bumped on every start so a superseded expiry task can tell it lost.
    generation: AtomicU64,
}

/// Owns the override window and its suppression flag
#[derive(Clone)]
pub struct OverrideController {
    state: Arc<OverrideState>,
    events: EventBus,
    window_length: Duration,
}

impl OverrideController {
    /// Create a controller with the protocol default window length
    pub fn new(events: EventBus) -> Self {
        Self::with_window(events, OVERRIDE_WINDOW)
    }

    /// Create a controller with a custom window length
    pub fn with_window(events: EventBus, window_length: Duration) -> Self {
        Self {
            state: Arc::new(OverrideState {
                window: Mutex::new(None),
                timer: Mutex::new(None),
                suppressing: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
            events,
            window_length,
        }
    }

    /// Parse a user-supplied override value, rejecting non-numeric input
    /// without touching window state
    pub fn parse_value(input: &str) -> Result<f64> {
        input
            .trim()
            .parse::<f64>()
            .map_err(|_| WxlinkError::InvalidOverrideValue(input.to_string()))
    }

    /// Parse and arm in one step
    pub async fn start_from_input(&self, input: &str) -> Result<f64> {
        let value = Self::parse_value(input)?;
        self.start(value).await;
        Ok(value)
    }

    /// Arm a new override window, superseding any pending one
    pub async fn start(&self, value: f64) {
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Cancel the pending expiry before the new window goes live.
        if let Some(previous) = self.state.timer.lock().await.take() {
            previous.abort();
        }

        let expiry = Instant::now() + self.window_length;
        *self.state.window.lock().await = Some(OverrideWindow {
            value,
            active: true,
            expiry,
        });
        self.state.suppressing.store(true, Ordering::SeqCst);
        info!(value, window = ?self.window_length, "manual override armed");
        self.events.publish(SessionEvent::OverrideStarted { value });

        let state = self.state.clone();
        let events = self.events.clone();
        let window_length = self.window_length;
        let timer = tokio::spawn(async move {
            sleep(window_length).await;

            let mut window = state.window.lock().await;
            // A newer override may have superseded this timer between the
            // sleep elapsing and the lock being taken.
            if state.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Some(window) = window.as_mut() {
                window.active = false;
            }
            state.suppressing.store(false, Ordering::SeqCst);
            drop(window);

            info!("manual override ended, resuming live readings");
            events.publish(SessionEvent::OverrideEnded);
        });
        *self.state.timer.lock().await = Some(timer);
    }

    /// Whether inbound broadcasts are currently suppressed
    pub fn is_suppressing(&self) -> bool {
        self.state.suppressing.load(Ordering::SeqCst)
    }

    /// Snapshot of the current window, if one has ever been armed
    pub async fn current(&self) -> Option<OverrideWindow> {
        *self.state.window.lock().await
    }
}
