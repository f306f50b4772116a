//! Configuration types for the VNC client.

use crate::errors::RfbClientError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete VNC client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings.
    pub connection: ConnectionConfig,
    /// Display settings.
    pub display: DisplayConfig,
    /// Input settings.
    pub input: InputConfig,
}

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server port (typically 5900 + display number).
    pub port: u16,
    /// VNC password (if required). Feeds the `PasswordProvider` during
    /// authentication; it is not part of the negotiated option set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Value sent as `ClientInit.shared`: request a shared (non-exclusive) session.
    #[serde(default = "default_true")]
    pub shared: bool,
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Encoding placed first in `SetEncodings`.
    #[serde(default = "default_preferred_encoding")]
    pub preferred_encoding: i32,
    /// Subset of encodings this client will accept. Empty means all standard
    /// encodings are allowed; a non-empty list forces fallback away from any
    /// encoding it excludes, including the preferred one.
    #[serde(default)]
    pub allowed_encodings: Vec<i32>,
    /// Force `BGR233` (8 bits per pixel) regardless of the server's format.
    #[serde(default)]
    pub use_8bit: bool,
}

/// Deterministic encoding fallback order, most to least preferred.
const FALLBACK_ENCODINGS: [i32; 5] = [
    rfb_encodings::ENCODING_HEXTILE,
    rfb_encodings::ENCODING_CORRE,
    rfb_encodings::ENCODING_RRE,
    rfb_encodings::ENCODING_COPY_RECT,
    rfb_encodings::ENCODING_RAW,
];

fn default_preferred_encoding() -> i32 {
    FALLBACK_ENCODINGS[0]
}

/// Input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Suppress all input sends (pointer, keyboard, clipboard) to the server.
    #[serde(default)]
    pub view_only: bool,
    /// Swap mouse buttons 2 and 3 (middle/right).
    #[serde(default)]
    pub swap_mouse: bool,
    /// Advisory notification to the frame sink when the server rings the bell,
    /// suggesting the host window be deiconified.
    #[serde(default)]
    pub deiconify_on_bell: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig {
                host: String::new(),
                port: 5900,
                password: None,
                timeout_ms: default_timeout_ms(),
                shared: default_true(),
            },
            display: DisplayConfig {
                preferred_encoding: default_preferred_encoding(),
                allowed_encodings: Vec::new(),
                use_8bit: false,
            },
            input: InputConfig {
                view_only: false,
                swap_mouse: false,
                deiconify_on_bell: false,
            },
        }
    }
}

impl Config {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), RfbClientError> {
        if self.connection.host.is_empty() {
            return Err(RfbClientError::ProtocolParseError(
                "host cannot be empty".to_string(),
            ));
        }

        if self.connection.port == 0 {
            return Err(RfbClientError::ProtocolParseError(
                "port cannot be 0".to_string(),
            ));
        }

        if self.effective_encodings().is_empty() {
            return Err(RfbClientError::ProtocolParseError(
                "at least one encoding must be allowed".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.connection.timeout_ms)
    }

    /// Returns the encoding list to send in `SetEncodings`: the preferred
    /// encoding first (if allowed), followed by the remaining allowed
    /// encodings in the deterministic fallback order
    /// (Hextile, CoRRE, RRE, CopyRect, Raw).
    #[must_use]
    pub fn effective_encodings(&self) -> Vec<i32> {
        let is_allowed = |encoding: i32| {
            self.display.allowed_encodings.is_empty()
                || self.display.allowed_encodings.contains(&encoding)
        };

        let mut result = Vec::with_capacity(FALLBACK_ENCODINGS.len());
        if is_allowed(self.display.preferred_encoding) {
            result.push(self.display.preferred_encoding);
        }
        for &encoding in &FALLBACK_ENCODINGS {
            if is_allowed(encoding) && !result.contains(&encoding) {
                result.push(encoding);
            }
        }
        result
    }
}

/// Builder for creating a `Config`.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the server hostname or IP address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = host.into();
        self
    }

    /// Sets the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    /// Sets the VNC password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.connection.password = Some(password.into());
        self
    }

    /// Sets whether the session is requested as shared (`ClientInit.shared`).
    #[must_use]
    pub fn shared(mut self, shared: bool) -> Self {
        self.config.connection.shared = shared;
        self
    }

    /// Sets view-only mode: suppresses all input sends to the server.
    #[must_use]
    pub fn view_only(mut self, view_only: bool) -> Self {
        self.config.input.view_only = view_only;
        self
    }

    /// Sets the preferred encoding, placed first in `SetEncodings`.
    #[must_use]
    pub fn preferred_encoding(mut self, encoding: i32) -> Self {
        self.config.display.preferred_encoding = encoding;
        self
    }

    /// Restricts the set of encodings the client will accept. An empty list
    /// (the default) allows all standard encodings.
    #[must_use]
    pub fn allowed_encodings(mut self, encodings: Vec<i32>) -> Self {
        self.config.display.allowed_encodings = encodings;
        self
    }

    /// Forces the 8-bit `BGR233` pixel format regardless of the server's format.
    #[must_use]
    pub fn use_8bit(mut self, use_8bit: bool) -> Self {
        self.config.display.use_8bit = use_8bit;
        self
    }

    /// Swaps mouse buttons 2 and 3 (middle/right).
    #[must_use]
    pub fn swap_mouse(mut self, swap_mouse: bool) -> Self {
        self.config.input.swap_mouse = swap_mouse;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<Config, RfbClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .host("localhost")
            .port(5900)
            .build()
            .unwrap();

        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 5900);
    }

    #[test]
    fn test_config_validation_empty_host() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_port() {
        let mut config = Config::default();
        config.connection.host = "localhost".to_string();
        config.connection.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_allowed_encodings_is_ok() {
        // An empty allowed_encodings list means "all standard encodings allowed",
        // not "no encodings allowed".
        let mut config = Config::default();
        config.connection.host = "localhost".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_all_encodings_disallowed() {
        let mut config = Config::default();
        config.connection.host = "localhost".to_string();
        config.display.allowed_encodings = vec![999];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_encodings_default_order() {
        let config = Config::default();
        let encodings = config.effective_encodings();
        assert_eq!(
            encodings,
            vec![
                rfb_encodings::ENCODING_HEXTILE,
                rfb_encodings::ENCODING_CORRE,
                rfb_encodings::ENCODING_RRE,
                rfb_encodings::ENCODING_COPY_RECT,
                rfb_encodings::ENCODING_RAW,
            ]
        );
    }

    #[test]
    fn test_effective_encodings_preferred_first() {
        let mut config = Config::default();
        config.display.preferred_encoding = rfb_encodings::ENCODING_RAW;
        let encodings = config.effective_encodings();
        assert_eq!(encodings[0], rfb_encodings::ENCODING_RAW);
        assert_eq!(encodings.len(), 5);
    }

    #[test]
    fn test_effective_encodings_respects_allowed_list() {
        let mut config = Config::default();
        config.display.allowed_encodings =
            vec![rfb_encodings::ENCODING_RAW, rfb_encodings::ENCODING_RRE];
        let encodings = config.effective_encodings();
        // Preferred (Hextile) is disallowed, so fallback starts from RRE.
        assert_eq!(
            encodings,
            vec![rfb_encodings::ENCODING_RRE, rfb_encodings::ENCODING_RAW]
        );
    }
}
