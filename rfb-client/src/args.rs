//! Command-line argument parsing for VNC client applications.
//!
//! This module is only available when the `cli` feature is enabled.
//! It provides a structured way to parse command-line arguments and
//! convert them into a `Config` object.
//!
//! # Examples
//!
//! ```no_run
//! use rfb_client::args::Args;
//! use rfb_client::Config;
//!
//! let args = Args::parse();
//! let config = Config::from_args(args)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::Config;
use clap::Parser;

/// VNC client command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// VNC server address (host:port or host:display)
    ///
    /// Examples:
    ///   - localhost:5900
    ///   - 192.168.1.100:0 (display :0 = port 5900)
    ///   - vnc.example.com:1 (display :1 = port 5901)
    #[arg(value_name = "SERVER")]
    pub server: String,

    /// Server port (overrides port in SERVER if specified)
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Password for authentication
    #[arg(short = 'P', long, value_name = "PASSWORD", env = "VNC_PASSWORD")]
    pub password: Option<String>,

    /// Preferred encodings, most-preferred first (comma-separated)
    ///
    /// Available: raw, copyrect, rre, corre, hextile
    #[arg(short = 'e', long, value_name = "ENCODINGS", value_delimiter = ',')]
    pub encodings: Option<Vec<String>>,

    /// Request the 8-bit BGR233 pixel format regardless of the server's format
    #[arg(long)]
    pub use_8bit: bool,

    /// View-only mode (no input events sent)
    #[arg(long)]
    pub view_only: bool,

    /// Swap mouse buttons 2 and 3 (middle/right)
    #[arg(long)]
    pub swap_mouse: bool,

    /// Shared session (allow multiple clients)
    #[arg(short = 's', long)]
    pub shared: bool,

    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Parse command-line arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse arguments from an iterator.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid.
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }
}

impl Config {
    /// Create a configuration from command-line arguments.
    ///
    /// If a config file is specified in the arguments, it is loaded first,
    /// then overridden by explicit command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The server address is invalid
    /// - The configuration validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rfb_client::args::Args;
    /// use rfb_client::Config;
    ///
    /// let args = Args::parse();
    /// let config = Config::from_args(args)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_args(args: Args) -> Result<Self, crate::errors::RfbClientError> {
        let mut builder = if let Some(config_path) = &args.config {
            let config_str = std::fs::read_to_string(config_path).map_err(|e| {
                crate::errors::RfbClientError::ProtocolParseError(format!(
                    "failed to read config file '{}': {}",
                    config_path, e
                ))
            })?;
            let config: Config = toml::from_str(&config_str).map_err(|e| {
                crate::errors::RfbClientError::ProtocolParseError(format!(
                    "failed to parse config file '{}': {}",
                    config_path, e
                ))
            })?;
            Config::builder()
                .host(&config.connection.host)
                .port(config.connection.port)
        } else {
            Config::builder()
        };

        let (host, port) = parse_server_address(&args.server)?;
        builder = builder.host(&host);

        builder = builder.port(args.port.unwrap_or(port));

        if let Some(password) = args.password {
            builder = builder.password(password);
        }

        if let Some(names) = &args.encodings {
            let encodings = parse_encodings(names)?;
            if let Some(&preferred) = encodings.first() {
                builder = builder.preferred_encoding(preferred);
            }
            builder = builder.allowed_encodings(encodings);
        }

        builder = builder
            .use_8bit(args.use_8bit)
            .view_only(args.view_only)
            .swap_mouse(args.swap_mouse)
            .shared(args.shared);

        builder.build()
    }
}

/// Parse server address in the format "host:port" or "host:display".
///
/// VNC display numbers (0-99) are converted to port numbers (5900-5999).
fn parse_server_address(server: &str) -> Result<(String, u16), crate::errors::RfbClientError> {
    if let Some((host, port_or_display)) = server.split_once(':') {
        let num = port_or_display.parse::<u16>().map_err(|_| {
            crate::errors::RfbClientError::ProtocolParseError(format!(
                "invalid port or display number: {}",
                port_or_display
            ))
        })?;

        let port = if num < 100 {
            // Display number: :0 = 5900, :1 = 5901, etc.
            5900 + num
        } else {
            num
        };

        Ok((host.to_string(), port))
    } else {
        Ok((server.to_string(), 5900))
    }
}

/// Parse encoding names to encoding IDs.
fn parse_encodings(names: &[String]) -> Result<Vec<i32>, crate::errors::RfbClientError> {
    use rfb_protocol::messages::types::{
        ENCODING_COPYRECT, ENCODING_CORRE, ENCODING_HEXTILE, ENCODING_RAW, ENCODING_RRE,
    };

    let mut encodings = Vec::new();
    for name in names {
        let encoding = match name.to_lowercase().as_str() {
            "raw" => ENCODING_RAW,
            "copyrect" | "copy-rect" => ENCODING_COPYRECT,
            "rre" => ENCODING_RRE,
            "corre" => ENCODING_CORRE,
            "hextile" => ENCODING_HEXTILE,
            _ => {
                return Err(crate::errors::RfbClientError::ProtocolParseError(format!(
                    "unknown encoding: {}",
                    name
                )))
            }
        };
        encodings.push(encoding);
    }

    Ok(encodings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_address_with_port() {
        let (host, port) = parse_server_address("localhost:5900").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 5900);
    }

    #[test]
    fn test_parse_server_address_with_display() {
        let (host, port) = parse_server_address("localhost:0").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 5900);

        let (host, port) = parse_server_address("192.168.1.100:1").unwrap();
        assert_eq!(host, "192.168.1.100");
        assert_eq!(port, 5901);
    }

    #[test]
    fn test_parse_server_address_no_port() {
        let (host, port) = parse_server_address("localhost").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 5900);
    }

    #[test]
    fn test_parse_encodings() {
        let names = vec!["raw".to_string(), "hextile".to_string(), "corre".to_string()];
        let encodings = parse_encodings(&names).unwrap();
        assert_eq!(encodings.len(), 3);
    }

    #[test]
    fn test_parse_encodings_invalid() {
        let names = vec!["invalid".to_string()];
        assert!(parse_encodings(&names).is_err());
    }

    #[test]
    fn test_args_minimal() {
        let args = Args::try_parse_from(["test", "localhost:5900"]).unwrap();
        assert_eq!(args.server, "localhost:5900");
        assert_eq!(args.port, None);
        assert!(!args.view_only);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::try_parse_from([
            "test",
            "localhost:5900",
            "--shared",
            "--encodings",
            "raw,hextile",
        ])
        .unwrap();
        assert!(args.shared);
        assert_eq!(args.encodings.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_from_args_builds_config() {
        let args = Args::try_parse_from(["test", "localhost:5901"]).unwrap();
        let config = Config::from_args(args).unwrap();
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 5901);
    }
}
