//! Client configuration: which link to open and how the session behaves.
//!
//! Stored as JSON. Missing fields take their defaults, so a file naming only
//! the link is valid:
//!
//! ```json
//! { "link": { "type": "serial", "port": "/dev/ttyACM0" } }
//! ```

use std::path::Path;
use std::time::Duration;

use racing_wheel_hid_openffboard_protocol::{
    DEFAULT_SERIAL_BAUD_RATE, OPENFFBOARD_PRODUCT_ID, OPENFFBOARD_VENDOR_ID,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::invoker::{ErrorPolicy, InstancePolicy, InvokerConfig};
use crate::link::Connector;
use crate::session::{SessionConfig, TransportSession};

fn default_baud_rate() -> u32 {
    DEFAULT_SERIAL_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_hid_poll_ms() -> u64 {
    20
}

/// Physical endpoint of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkConfig {
    Serial {
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    Hid {
        vendor_id: u16,
        product_id: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        serial: Option<String>,
    },
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig::Hid {
            vendor_id: OPENFFBOARD_VENDOR_ID,
            product_id: OPENFFBOARD_PRODUCT_ID,
            serial: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub link: LinkConfig,
    /// Reply timeout per exchange.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// HID read poll interval. Bounds how long an abandoned read lingers.
    #[serde(default = "default_hid_poll_ms")]
    pub hid_poll_ms: u64,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    #[serde(default)]
    pub instance_policy: InstancePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            timeout_ms: default_timeout_ms(),
            hid_poll_ms: default_hid_poll_ms(),
            error_policy: ErrorPolicy::default(),
            instance_policy: InstancePolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn serial(port: impl Into<String>) -> Self {
        Self {
            link: LinkConfig::Serial {
                port: port.into(),
                baud_rate: DEFAULT_SERIAL_BAUD_RATE,
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".into()));
        }
        if self.hid_poll_ms == 0 || self.hid_poll_ms >= self.timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "hid_poll_ms must be between 1 and timeout_ms ({}), got {}",
                self.timeout_ms, self.hid_poll_ms
            )));
        }
        match &self.link {
            LinkConfig::Serial { port, baud_rate } => {
                if port.trim().is_empty() {
                    return Err(ConfigError::Invalid("serial port name is empty".into()));
                }
                if *baud_rate == 0 {
                    return Err(ConfigError::Invalid("baud_rate must be positive".into()));
                }
            }
            LinkConfig::Hid { serial, .. } => {
                if serial.as_deref().is_some_and(|s| s.trim().is_empty()) {
                    return Err(ConfigError::Invalid("HID serial number is empty".into()));
                }
            }
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    pub fn invoker_config(&self) -> InvokerConfig {
        InvokerConfig {
            error_policy: self.error_policy,
            instance_policy: self.instance_policy,
        }
    }

    /// Connector for the configured link.
    pub fn connector(&self) -> Result<Box<dyn Connector>, ConfigError> {
        self.validate()?;
        match &self.link {
            #[cfg(feature = "serial")]
            LinkConfig::Serial { port, baud_rate } => Ok(Box::new(
                crate::link::SerialConnector::new(port.clone(), *baud_rate),
            )),
            #[cfg(feature = "hid")]
            LinkConfig::Hid {
                vendor_id,
                product_id,
                serial,
            } => {
                let mut connector = crate::link::HidConnector::new(*vendor_id, *product_id)
                    .with_poll(Duration::from_millis(self.hid_poll_ms));
                connector.serial = serial.clone();
                Ok(Box::new(connector))
            }
            #[allow(unreachable_patterns)]
            other => Err(ConfigError::Invalid(format!(
                "link {other:?} is not enabled in this build"
            ))),
        }
    }

    /// Build an unconnected session for the configured link.
    pub fn build_session(&self) -> Result<TransportSession, ConfigError> {
        Ok(TransportSession::from_boxed(
            self.connector()?,
            self.session_config(),
        ))
    }

    pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded client configuration");
        Ok(config)
    }

    pub async fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.validate()?;
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}
