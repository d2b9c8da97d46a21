//! Broadcast payload parsing
//!
//! The device pushes UTF-8 text frames that are usually JSON
//! (`{"city":"Medellin","temp":23.2,"desc":"cloudy"}`) but may be any
//! opaque string. A frame that fails structured decode is not an error,
//! only a lower-fidelity result; the device deliberately mixes both
//! shapes on the same channel.

use serde::Deserialize;
use tracing::trace;

/// One decoded weather reading from the device
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reading {
    /// City the reading is for
    pub city: String,

    /// Temperature in degrees Celsius
    #[serde(rename = "temp")]
    pub temperature: f64,

    /// Human-readable weather description, empty when the device omits it.
    /// The firmware broadcasts this under `weather`; the reference
    /// protocol names it `desc`. Both decode.
    #[serde(rename = "desc", alias = "weather", default)]
    pub description: String,
}

/// Result of decoding one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Broadcast {
    /// Frame matched the structured broadcast format
    Structured(Reading),

    /// Frame is plain display text (or malformed JSON, treated the same)
    Opaque(String),
}

/// Decode an inbound frame, falling back to opaque text on any decode failure
pub fn parse_broadcast(raw: &str) -> Broadcast {
    match serde_json::from_str::<Reading>(raw) {
        Ok(reading) => Broadcast::Structured(reading),
        Err(e) => {
            trace!(%raw, %e, "frame is not a structured broadcast, keeping as text");
            Broadcast::Opaque(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn structured_broadcast_decodes() {
        let parsed = parse_broadcast(r#"{"city":"Medellin","temp":23.2,"desc":"cloudy"}"#);
        assert_eq!(
            parsed,
            Broadcast::Structured(Reading {
                city: "Medellin".into(),
                temperature: 23.2,
                description: "cloudy".into(),
            })
        );
    }

    #[test]
    fn missing_description_defaults_to_empty() {
        let parsed = parse_broadcast(r#"{"city":"Bogota","temp":14.0}"#);
        match parsed {
            Broadcast::Structured(reading) => {
                assert_eq!(reading.city, "Bogota");
                assert_eq!(reading.description, "");
            }
            other => panic!("expected structured broadcast, got {other:?}"),
        }
    }

    #[test]
    fn firmware_weather_field_is_accepted_as_description() {
        let parsed = parse_broadcast(r#"{"city":"Cali","weather":"lluvia ligera","temp":26.5}"#);
        assert_eq!(
            parsed,
            Broadcast::Structured(Reading {
                city: "Cali".into(),
                temperature: 26.5,
                description: "lluvia ligera".into(),
            })
        );
    }

    #[test]
    fn plain_text_falls_back_to_opaque() {
        assert_eq!(parse_broadcast("hello"), Broadcast::Opaque("hello".into()));
    }

    #[test]
    fn malformed_json_falls_back_to_opaque() {
        let raw = r#"{"city":"Medellin","temp":}"#;
        assert_eq!(parse_broadcast(raw), Broadcast::Opaque(raw.into()));
    }

    #[test]
    fn json_with_wrong_shape_falls_back_to_opaque() {
        // Valid JSON, but not a broadcast object.
        assert_eq!(parse_broadcast("[1,2,3]"), Broadcast::Opaque("[1,2,3]".into()));
    }
}
