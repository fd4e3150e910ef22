//! Async access to [Modbus](http://modbus.org/) RTU slaves on a serial line,
//! built on [Tokio](https://docs.rs/tokio) and
//! [tokio-serial](https://docs.rs/tokio-serial).
//!
//! # Features
//!
//! * Discovery of the USB serial adapter and baud rate a slave answers on
//! * Explicit session lifecycle: no implicit reconnection, no hidden retries
//! * Every request bounded by a timeout
//! * Panic-free parsing of RTU frames with CRC validation
//! * A textual command layer that front-ends delegate to unchanged
//!
//! # Supported functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//! * Write Multiple Coils
//! * Write Multiple Registers
//!
//! # Example
//!
//! ```no_run
//! use rtulink::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = ModbusSession::new(ClientConfig::from_env()?);
//!     if !session.connect().await {
//!         return Err("unable to open the serial port".into());
//!     }
//!
//!     for coil in session.read_coils_indexed(0, 8, None).await? {
//!         println!("{coil}");
//!     }
//!
//!     let written = session.write_register(1, 1234, Some(UnitId::new(2))).await?;
//!     println!("write confirmed: {written}");
//!     Ok(())
//! }
//! ```

/// Textual command layer over a session
pub mod adapter;
/// Client API: sessions, probing and port discovery
pub mod client;
/// Protocol constants and defaults
pub mod constants;
/// Serial line and client configuration
pub mod config;
/// Controls the decoding of transmitted and received data
pub mod decode;
/// Error types associated with making requests
pub mod error;
/// Modbus exception codes
pub mod exception;
/// RTU framing over a physical layer
pub mod transport;
/// Types used in requests and responses
pub mod types;

pub(crate) mod common;
pub(crate) mod serial;
#[cfg(test)]
pub(crate) mod sim;

pub use crate::adapter::{Command, CommandAdapter, CommandError, CommandOutput, CommandResult, HELP};
pub use crate::client::discovery::{system_candidate_paths, PortDiscovery};
pub use crate::client::probe::SlaveProbe;
pub use crate::client::session::{ModbusSession, SessionState, Toggled};
pub use crate::common::phys::{PhysLayer, SerialIo};
pub use crate::config::{ClientConfig, ConfigError, DataBits, Parity, SerialEndpoint, StopBits};
pub use crate::decode::{AppDecodeLevel, DecodeLevel, FrameDecodeLevel, PhysDecodeLevel};
pub use crate::error::{
    AduParseError, FrameParseError, InternalError, InvalidRequest, RequestError,
};
pub use crate::exception::ExceptionCode;
pub use crate::serial::frame::Frame;
pub use crate::serial::{PortOpener, SystemPorts};
pub use crate::transport::FrameTransport;
pub use crate::types::{AddressRange, Indexed, RegisterSpace, UnitId};
