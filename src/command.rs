//! Out-of-band command dispatch
//!
//! Commands go over a discrete request/response channel (`POST /update`,
//! form-urlencoded) that is independent of the stream session. Dispatch is
//! fire-and-report: the transport outcome is surfaced verbatim and never
//! feeds back into local state, except that a manual override also arms
//! the override controller.

use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::error::Result;
use crate::events::{EventBus, SessionEvent};
use crate::manual_override::OverrideController;

/// Weather-mode tag for a manual temperature injection
pub const WEATHER_MODE_MANUAL: &str = "MANUAL";

/// Weather-mode tag halting the device's automatic updates
pub const WEATHER_MODE_STOP: &str = "STOP";

/// Weather-mode tag resuming automatic updates
pub const WEATHER_MODE_RESUME: &str = "RESUME";

// City fields the reference front end falls back to when none is staged.
const FALLBACK_CITY_MANUAL: &str = "Manual";
const FALLBACK_CITY_CONTROL: &str = "Control";

/// One discrete command for the device
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain city update (no weather-mode tag); usually the stream send is
    /// preferred for this, but both paths are valid
    SetCity { city: String },

    /// Inject a manual temperature for the override window
    ManualOverride { city: Option<String>, value: f64 },

    /// Halt automatic updates
    Stop { city: Option<String> },

    /// Resume automatic updates
    Resume { city: Option<String> },
}

impl Command {
    /// Flat key-value payload for the `/update` request body
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Command::SetCity { city } => {
                vec![("city", city.clone()), ("temp", "0".into())]
            }
            Command::ManualOverride { city, value } => vec![
                (
                    "city",
                    city.clone().unwrap_or_else(|| FALLBACK_CITY_MANUAL.into()),
                ),
                ("weather", WEATHER_MODE_MANUAL.into()),
                ("temp", format!("{value}")),
            ],
            Command::Stop { city } => vec![
                (
                    "city",
                    city.clone().unwrap_or_else(|| FALLBACK_CITY_CONTROL.into()),
                ),
                ("weather", WEATHER_MODE_STOP.into()),
                ("temp", "0".into()),
            ],
            Command::Resume { city } => vec![
                (
                    "city",
                    city.clone().unwrap_or_else(|| FALLBACK_CITY_CONTROL.into()),
                ),
                ("weather", WEATHER_MODE_RESUME.into()),
                ("temp", "0".into()),
            ],
        }
    }
}

/// Transport-level result of one dispatch, surfaced uninterpreted
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Whether the request reached the device and returned a 2xx status
    pub ok: bool,

    /// HTTP status code, when a response arrived
    pub status: Option<u16>,

    /// HTTP status text, when a response arrived
    pub status_text: Option<String>,

    /// Verbatim response body, when a response arrived
    pub body: Option<String>,

    /// Transport failure description, when no response arrived
    pub error: Option<String>,
}

/// Sends discrete commands to the device's `/update` endpoint
pub struct CommandDispatcher {
    http: reqwest::Client,
    config: DeviceConfig,
    events: EventBus,
    overrides: OverrideController,
}

impl CommandDispatcher {
    pub fn new(
        config: DeviceConfig,
        events: EventBus,
        overrides: OverrideController,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            events,
            overrides,
        })
    }

    /// Issue one command and report its transport outcome
    ///
    /// Network failure is reported inside the outcome, not thrown; the only
    /// hard error is an invalid endpoint, rejected before any I/O. A
    /// `ManualOverride` arms the override controller once the request has
    /// settled, whatever the device answered.
    pub async fn dispatch(&self, command: Command) -> Result<DispatchOutcome> {
        let url = self.config.command_url()?;
        let fields = command.form_fields();
        debug!(?command, %url, "dispatching command");

        let outcome = match self.http.post(url).form(&fields).send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_else(|e| {
                    warn!(error = %e, "failed to read command response body");
                    String::new()
                });
                info!(%status, "command dispatched");
                DispatchOutcome {
                    ok: status.is_success(),
                    status: Some(status.as_u16()),
                    status_text: status.canonical_reason().map(str::to_string),
                    body: Some(body),
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "command dispatch failed");
                DispatchOutcome {
                    ok: false,
                    status: None,
                    status_text: None,
                    body: None,
                    error: Some(e.to_string()),
                }
            }
        };

        if let Command::ManualOverride { value, .. } = &command {
            // The window goes live whether or not the device acknowledged,
            // matching the reference front end.
            self.overrides.start(*value).await;
        }

        self.events
            .publish(SessionEvent::CommandCompleted(outcome.clone()));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn manual_override_serializes_mode_and_value() {
        let fields = Command::ManualOverride {
            city: Some("Medellin".into()),
            value: 30.0,
        }
        .form_fields();
        assert_eq!(
            fields,
            vec![
                ("city", "Medellin".to_string()),
                ("weather", "MANUAL".to_string()),
                ("temp", "30".to_string()),
            ]
        );
    }

    #[test]
    fn manual_override_keeps_fractional_values() {
        let fields = Command::ManualOverride {
            city: None,
            value: 23.2,
        }
        .form_fields();
        assert_eq!(fields[0], ("city", "Manual".to_string()));
        assert_eq!(fields[2], ("temp", "23.2".to_string()));
    }

    #[test]
    fn stop_and_resume_send_zero_temperature() {
        let stop = Command::Stop { city: None }.form_fields();
        assert_eq!(
            stop,
            vec![
                ("city", "Control".to_string()),
                ("weather", "STOP".to_string()),
                ("temp", "0".to_string()),
            ]
        );

        let resume = Command::Resume {
            city: Some("Cali".into()),
        }
        .form_fields();
        assert_eq!(
            resume,
            vec![
                ("city", "Cali".to_string()),
                ("weather", "RESUME".to_string()),
                ("temp", "0".to_string()),
            ]
        );
    }

    #[test]
    fn plain_city_update_omits_weather_mode() {
        let fields = Command::SetCity {
            city: "Barranquilla".into(),
        }
        .form_fields();
        assert!(fields.iter().all(|(key, _)| *key != "weather"));
        assert_eq!(fields[0], ("city", "Barranquilla".to_string()));
    }
}
