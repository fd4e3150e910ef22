use std::str::FromStr;
use std::time::Duration;

use crate::constants::defaults;
use crate::types::UnitId;

/// Environment keys read by [`ClientConfig::from_env`]
pub mod keys {
    /// Device path
    pub const PORT: &str = "MODBUS_PORT";
    /// Baud rate
    pub const BAUD_RATE: &str = "MODBUS_BAUDRATE";
    /// Parity, `N`, `E` or `O`
    pub const PARITY: &str = "MODBUS_PARITY";
    /// Stop bits, 1 or 2
    pub const STOP_BITS: &str = "MODBUS_STOPBITS";
    /// Data bits, 5 to 8
    pub const DATA_BITS: &str = "MODBUS_BYTESIZE";
    /// Response timeout in seconds
    pub const TIMEOUT: &str = "MODBUS_TIMEOUT";
    /// Default unit id
    pub const DEVICE_ADDRESS: &str = "MODBUS_DEVICE_ADDRESS";
    /// Default unit id, consulted when `MODBUS_DEVICE_ADDRESS` is absent
    pub const UNIT_ID: &str = "MODBUS_UNIT_ID";
}

/// Parity checking mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// Number of stop bits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum StopBits {
    /// One stop bit
    #[default]
    One,
    /// Two stop bits
    Two,
}

/// Number of data bits per character
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum DataBits {
    /// 5 bits
    Five,
    /// 6 bits
    Six,
    /// 7 bits
    Seven,
    /// 8 bits
    #[default]
    Eight,
}

impl FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "none" => Ok(Parity::None),
            "e" | "even" => Ok(Parity::Even),
            "o" | "odd" => Ok(Parity::Odd),
            _ => Err("expected N, E or O".to_string()),
        }
    }
}

impl FromStr for StopBits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(StopBits::One),
            "2" => Ok(StopBits::Two),
            _ => Err("expected 1 or 2".to_string()),
        }
    }
}

impl FromStr for DataBits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5" => Ok(DataBits::Five),
            "6" => Ok(DataBits::Six),
            "7" => Ok(DataBits::Seven),
            "8" => Ok(DataBits::Eight),
            _ => Err("expected a value from 5 to 8".to_string()),
        }
    }
}

/// Everything needed to open a serial line to a Modbus slave
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialEndpoint {
    /// Device path, e.g. `/dev/ttyUSB0`
    pub path: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Parity
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Data bits
    pub data_bits: DataBits,
    /// Response timeout applied to every request
    pub timeout: Duration,
}

impl SerialEndpoint {
    /// An endpoint on `path` with 9600 8N1 and a one second timeout
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: defaults::BAUD_RATE,
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            data_bits: DataBits::default(),
            timeout: defaults::TIMEOUT,
        }
    }

    /// Change the baud rate
    pub fn with_baud_rate(self, baud_rate: u32) -> Self {
        Self { baud_rate, ..self }
    }

    /// Change the response timeout
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Change the parity
    pub fn with_parity(self, parity: Parity) -> Self {
        Self { parity, ..self }
    }

    /// Change the device path
    pub fn with_path(self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self
        }
    }
}

impl Default for SerialEndpoint {
    fn default() -> Self {
        Self::new(defaults::PORT)
    }
}

impl std::fmt::Display for SerialEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        let data_bits = match self.data_bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        };
        let stop_bits = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        write!(
            f,
            "{} @ {} {}{}{}",
            self.path, self.baud_rate, data_bits, parity, stop_bits
        )
    }
}

/// An invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value '{value}' for {key}: {reason}")]
pub struct ConfigError {
    /// The configuration key
    pub key: &'static str,
    /// The rejected value
    pub value: String,
    /// What was expected
    pub reason: String,
}

/// Serial line settings plus the default unit of a session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    /// Serial line settings
    pub endpoint: SerialEndpoint,
    /// Unit addressed when a request does not name one
    pub unit: UnitId,
}

impl ClientConfig {
    /// Construct from an endpoint and a default unit
    pub fn new(endpoint: SerialEndpoint, unit: UnitId) -> Self {
        Self { endpoint, unit }
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup
    ///
    /// Missing keys take their defaults, present but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut endpoint = SerialEndpoint::default();

        if let Some(path) = lookup(keys::PORT) {
            endpoint.path = path;
        }
        if let Some(value) = parse(&lookup, keys::BAUD_RATE, parse_baud_rate)? {
            endpoint.baud_rate = value;
        }
        if let Some(value) = parse(&lookup, keys::PARITY, Parity::from_str)? {
            endpoint.parity = value;
        }
        if let Some(value) = parse(&lookup, keys::STOP_BITS, StopBits::from_str)? {
            endpoint.stop_bits = value;
        }
        if let Some(value) = parse(&lookup, keys::DATA_BITS, DataBits::from_str)? {
            endpoint.data_bits = value;
        }
        if let Some(value) = parse(&lookup, keys::TIMEOUT, parse_seconds)? {
            endpoint.timeout = value;
        }

        let unit = match parse(&lookup, keys::DEVICE_ADDRESS, parse_unit)? {
            Some(unit) => unit,
            None => parse(&lookup, keys::UNIT_ID, parse_unit)?.unwrap_or_default(),
        };

        Ok(Self { endpoint, unit })
    }
}

fn parse<T, F, P>(lookup: &F, key: &'static str, parser: P) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, String>,
{
    let value = match lookup(key) {
        Some(value) => value,
        None => return Ok(None),
    };

    parser(value.trim()).map(Some).map_err(|reason| ConfigError {
        key,
        value,
        reason,
    })
}

fn parse_baud_rate(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(0) => Err("baud rate must be positive".to_string()),
        Ok(rate) => Ok(rate),
        Err(err) => Err(err.to_string()),
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds = value.parse::<f64>().map_err(|err| err.to_string())?;
    if seconds <= 0.0 {
        return Err("timeout must be positive".to_string());
    }
    Duration::try_from_secs_f64(seconds).map_err(|err| err.to_string())
}

fn parse_unit(value: &str) -> Result<UnitId, String> {
    let unit = UnitId::new(value.parse::<u8>().map_err(|err| err.to_string())?);
    if !unit.is_addressable() {
        return Err("unit id must be between 1 and 247".to_string());
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.endpoint.path, "/dev/ttyUSB0");
        assert_eq!(config.endpoint.baud_rate, 9600);
        assert_eq!(config.endpoint.parity, Parity::None);
        assert_eq!(config.endpoint.stop_bits, StopBits::One);
        assert_eq!(config.endpoint.data_bits, DataBits::Eight);
        assert_eq!(config.endpoint.timeout, Duration::from_secs(1));
        assert_eq!(config.unit, UnitId::new(1));
    }

    #[test]
    fn reads_every_key() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("MODBUS_PORT", "/dev/ttyACM1"),
            ("MODBUS_BAUDRATE", "19200"),
            ("MODBUS_PARITY", "E"),
            ("MODBUS_STOPBITS", "2"),
            ("MODBUS_BYTESIZE", "7"),
            ("MODBUS_TIMEOUT", "0.25"),
            ("MODBUS_UNIT_ID", "17"),
        ]))
        .unwrap();
        assert_eq!(
            config.endpoint.to_string(),
            "/dev/ttyACM1 @ 19200 7E2"
        );
        assert_eq!(config.endpoint.timeout, Duration::from_millis(250));
        assert_eq!(config.unit, UnitId::new(17));
    }

    #[test]
    fn device_address_takes_precedence_over_unit_id() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("MODBUS_DEVICE_ADDRESS", "5"),
            ("MODBUS_UNIT_ID", "17"),
        ]))
        .unwrap();
        assert_eq!(config.unit, UnitId::new(5));
    }

    #[test]
    fn rejects_unparsable_values() {
        let err = ClientConfig::from_lookup(lookup(&[("MODBUS_BAUDRATE", "fast")])).unwrap_err();
        assert_eq!(err.key, "MODBUS_BAUDRATE");
        assert_eq!(err.value, "fast");

        let err = ClientConfig::from_lookup(lookup(&[("MODBUS_TIMEOUT", "-1")])).unwrap_err();
        assert_eq!(err.key, "MODBUS_TIMEOUT");

        let err = ClientConfig::from_lookup(lookup(&[("MODBUS_UNIT_ID", "0")])).unwrap_err();
        assert_eq!(err.key, "MODBUS_UNIT_ID");

        assert!(ClientConfig::from_lookup(lookup(&[("MODBUS_PARITY", "X")])).is_err());
    }
}
