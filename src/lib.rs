//! wxlink: async session controller for ESP32 weather display devices
//!
//! Maintains one persistent WebSocket session to a device that broadcasts
//! periodic weather readings, and issues out-of-band control commands over
//! the device's HTTP `/update` endpoint. User-triggered manual overrides
//! suppress inbound broadcasts for a bounded window.
//!
//! # Channels
//!
//! - **Stream** (`ws://<host>:81/`): inbound broadcast readings, outbound
//!   raw city-name pushes.
//! - **Command** (`POST http://<host>/update`): form-urlencoded
//!   `city`/`weather`/`temp` fields for manual override, stop and resume.
//!
//! Presentation code subscribes to [`SessionEvent`]s; the core never
//! renders anything itself.

pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod manual_override;
pub mod reading;
pub mod session;

// Re-export main types for convenience
pub use command::{Command, CommandDispatcher, DispatchOutcome};
pub use config::DeviceConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{Result, WxlinkError};
pub use events::{EventBus, SessionEvent};
pub use manual_override::{OverrideController, OverrideWindow, OVERRIDE_WINDOW};
pub use reading::{parse_broadcast, Broadcast, Reading};
pub use session::DeviceSession;
