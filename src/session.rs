//! Single-device session facade
//!
//! Wires the connection manager, reading parser, override controller and
//! command dispatcher onto one event bus. This is the operation surface
//! user-facing controls call; everything they render arrives as
//! [`SessionEvent`]s.

use tokio::sync::{broadcast, RwLock};

use crate::command::{Command, CommandDispatcher, DispatchOutcome};
use crate::config::DeviceConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::Result;
use crate::events::{EventBus, SessionEvent};
use crate::manual_override::{OverrideController, OverrideWindow};

/// One controller session to one device
pub struct DeviceSession {
    config: DeviceConfig,
    events: EventBus,
    connection: ConnectionManager,
    overrides: OverrideController,
    commands: CommandDispatcher,
    // Last city the user selected; commands fall back to it.
    city: RwLock<Option<String>>,
}

impl DeviceSession {
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let events = EventBus::new();
        let overrides = OverrideController::with_window(events.clone(), config.override_window);
        let connection = ConnectionManager::new(events.clone(), overrides.clone());
        let commands = CommandDispatcher::new(config.clone(), events.clone(), overrides.clone())?;
        Ok(Self {
            config,
            events,
            connection,
            overrides,
            commands,
            city: RwLock::new(None),
        })
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Open the stream session to the configured device
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect(&self.config).await
    }

    /// Close the stream session; safe from any state
    pub async fn disconnect(&self) -> ConnectionState {
        self.connection.disconnect().await
    }

    /// Current stream session state
    pub async fn state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Push a city selection over the stream channel
    pub async fn send_city(&self, city: &str) -> Result<()> {
        let city = city.trim();
        self.connection.send(city).await?;
        *self.city.write().await = Some(city.to_string());
        Ok(())
    }

    /// Push a city selection over the command channel instead
    pub async fn post_city(&self, city: &str) -> Result<DispatchOutcome> {
        let city = city.trim().to_string();
        *self.city.write().await = Some(city.clone());
        self.commands.dispatch(Command::SetCity { city }).await
    }

    /// Inject a manual temperature for the override window
    ///
    /// Non-numeric input fails fast with `InvalidOverrideValue` before any
    /// request is made or window state is touched.
    pub async fn manual_override(&self, input: &str) -> Result<DispatchOutcome> {
        let value = OverrideController::parse_value(input)?;
        let city = self.city.read().await.clone();
        self.commands
            .dispatch(Command::ManualOverride { city, value })
            .await
    }

    /// Halt the device's automatic updates
    pub async fn stop(&self) -> Result<DispatchOutcome> {
        let city = self.city.read().await.clone();
        self.commands.dispatch(Command::Stop { city }).await
    }

    /// Resume the device's automatic updates
    pub async fn resume(&self) -> Result<DispatchOutcome> {
        let city = self.city.read().await.clone();
        self.commands.dispatch(Command::Resume { city }).await
    }

    /// Whether inbound broadcasts are currently suppressed
    pub fn is_suppressing(&self) -> bool {
        self.overrides.is_suppressing()
    }

    /// Snapshot of the override window, if one has ever been armed
    pub async fn override_window(&self) -> Option<OverrideWindow> {
        self.overrides.current().await
    }

    /// Direct access to the override controller
    pub fn overrides(&self) -> &OverrideController {
        &self.overrides
    }
}
