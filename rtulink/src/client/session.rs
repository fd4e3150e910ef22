use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::Instrument;

use crate::client::requests::read_bits::ReadBits;
use crate::client::requests::read_registers::ReadRegisters;
use crate::client::requests::write_multiple::WriteMultiple;
use crate::client::requests::write_single::WriteSingle;
use crate::client::requests::RequestDetails;
use crate::config::{ClientConfig, SerialEndpoint};
use crate::decode::DecodeLevel;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::serial::{PortOpener, SystemPorts};
use crate::transport::FrameTransport;
use crate::types::{Indexed, UnitId};

/// Lifecycle of a [`ModbusSession`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionState {
    /// No device handle is held
    Unconnected,
    /// The port is open and requests may be made
    Connected,
    /// The device failed; call [`ModbusSession::disconnect`] before connecting again
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unconnected => f.write_str("unconnected"),
            SessionState::Connected => f.write_str("connected"),
            SessionState::Error => f.write_str("error"),
        }
    }
}

/// Outcome of [`ModbusSession::toggle_coil`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct Toggled {
    /// Value read before the write
    pub previous: bool,
    /// Value written
    pub current: bool,
}

struct Inner {
    state: SessionState,
    transport: Option<FrameTransport>,
    decode: DecodeLevel,
}

/// A connection to the Modbus slaves on one serial line
///
/// Requests from concurrent callers are serialized: exactly one frame is on
/// the wire at any time. The session never reconnects on its own.
pub struct ModbusSession {
    endpoint: SerialEndpoint,
    unit: UnitId,
    opener: Arc<dyn PortOpener>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for ModbusSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusSession")
            .field("endpoint", &self.endpoint)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

impl ModbusSession {
    /// Create an unconnected session that opens real serial ports
    pub fn new(config: ClientConfig) -> Self {
        Self::with_opener(config, Arc::new(SystemPorts))
    }

    /// Create an unconnected session that opens its port through `opener`
    pub fn with_opener(config: ClientConfig, opener: Arc<dyn PortOpener>) -> Self {
        Self {
            endpoint: config.endpoint,
            unit: config.unit,
            opener,
            inner: Mutex::new(Inner {
                state: SessionState::Unconnected,
                transport: None,
                decode: DecodeLevel::nothing(),
            }),
        }
    }

    /// Set the decode level before the first request
    pub fn with_decode_level(self, decode: DecodeLevel) -> Self {
        let mut inner = self.inner.into_inner();
        inner.decode = decode;
        Self {
            inner: Mutex::new(inner),
            ..self
        }
    }

    /// The serial line this session talks to
    pub fn endpoint(&self) -> &SerialEndpoint {
        &self.endpoint
    }

    /// Unit addressed when a request passes `None`
    pub fn default_unit(&self) -> UnitId {
        self.unit
    }

    /// Current lifecycle state
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Change the decode level, applies to the open transport as well
    pub async fn set_decode_level(&self, decode: DecodeLevel) {
        let mut inner = self.inner.lock().await;
        tracing::info!("decode level changed: {:?}", decode);
        inner.decode = decode;
        if let Some(transport) = inner.transport.as_mut() {
            transport.set_decode_level(decode);
        }
    }

    /// Open the serial port
    ///
    /// Returns `true` if the session is connected afterwards. Connecting an
    /// already connected session does not reopen the port. A session in the
    /// error state must be disconnected first.
    pub async fn connect(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SessionState::Connected => return true,
            SessionState::Error => {
                tracing::warn!("session is in the error state, disconnect before reconnecting");
                return false;
            }
            SessionState::Unconnected => {}
        }

        match self.opener.open(&self.endpoint) {
            Ok(phys) => {
                tracing::info!("opened {}", self.endpoint);
                inner.transport = Some(FrameTransport::new(phys, inner.decode));
                inner.state = SessionState::Connected;
                true
            }
            Err(err) => {
                tracing::warn!("unable to open {}: {}", self.endpoint.path, err);
                false
            }
        }
    }

    /// Close the serial port, always leaving the session unconnected
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if inner.transport.take().is_some() {
            tracing::info!("closed {}", self.endpoint.path);
        }
        inner.state = SessionState::Unconnected;
    }

    /// Read `count` coils starting at `address`
    pub async fn read_coils(
        &self,
        address: u16,
        count: u16,
        unit: Option<UnitId>,
    ) -> Result<Vec<bool>, RequestError> {
        Ok(values(self.read_coils_indexed(address, count, unit).await?))
    }

    /// Read `count` coils starting at `address`, tagged with their addresses
    pub async fn read_coils_indexed(
        &self,
        address: u16,
        count: u16,
        unit: Option<UnitId>,
    ) -> Result<Vec<Indexed<bool>>, RequestError> {
        self.make_request(unit, ReadBits::coils(address, count))
            .await
    }

    /// Read `count` discrete inputs starting at `address`
    pub async fn read_discrete_inputs(
        &self,
        address: u16,
        count: u16,
        unit: Option<UnitId>,
    ) -> Result<Vec<bool>, RequestError> {
        Ok(values(
            self.read_discrete_inputs_indexed(address, count, unit)
                .await?,
        ))
    }

    /// Read `count` discrete inputs starting at `address`, tagged with their addresses
    pub async fn read_discrete_inputs_indexed(
        &self,
        address: u16,
        count: u16,
        unit: Option<UnitId>,
    ) -> Result<Vec<Indexed<bool>>, RequestError> {
        self.make_request(unit, ReadBits::discrete_inputs(address, count))
            .await
    }

    /// Read `count` holding registers starting at `address`
    pub async fn read_holding_registers(
        &self,
        address: u16,
        count: u16,
        unit: Option<UnitId>,
    ) -> Result<Vec<u16>, RequestError> {
        Ok(values(
            self.read_holding_registers_indexed(address, count, unit)
                .await?,
        ))
    }

    /// Read `count` holding registers starting at `address`, tagged with their addresses
    pub async fn read_holding_registers_indexed(
        &self,
        address: u16,
        count: u16,
        unit: Option<UnitId>,
    ) -> Result<Vec<Indexed<u16>>, RequestError> {
        self.make_request(unit, ReadRegisters::holding(address, count))
            .await
    }

    /// Read `count` input registers starting at `address`
    pub async fn read_input_registers(
        &self,
        address: u16,
        count: u16,
        unit: Option<UnitId>,
    ) -> Result<Vec<u16>, RequestError> {
        Ok(values(
            self.read_input_registers_indexed(address, count, unit)
                .await?,
        ))
    }

    /// Read `count` input registers starting at `address`, tagged with their addresses
    pub async fn read_input_registers_indexed(
        &self,
        address: u16,
        count: u16,
        unit: Option<UnitId>,
    ) -> Result<Vec<Indexed<u16>>, RequestError> {
        self.make_request(unit, ReadRegisters::input(address, count))
            .await
    }

    /// Write a single coil
    ///
    /// `Ok(false)` means the slave refused or garbled the write. Timeouts,
    /// device failures and invalid requests are errors.
    pub async fn write_coil(
        &self,
        address: u16,
        value: bool,
        unit: Option<UnitId>,
    ) -> Result<bool, RequestError> {
        let request = WriteSingle::new(Indexed::new(address, value));
        write_outcome(self.make_request(unit, Ok(request)).await)
    }

    /// Write a single holding register, see [`ModbusSession::write_coil`]
    pub async fn write_register(
        &self,
        address: u16,
        value: u16,
        unit: Option<UnitId>,
    ) -> Result<bool, RequestError> {
        let request = WriteSingle::new(Indexed::new(address, value));
        write_outcome(self.make_request(unit, Ok(request)).await)
    }

    /// Write consecutive coils starting at `address`
    pub async fn write_coils(
        &self,
        address: u16,
        values: &[bool],
        unit: Option<UnitId>,
    ) -> Result<bool, RequestError> {
        let request = WriteMultiple::<bool>::coils(address, values.to_vec());
        write_outcome(self.make_request(unit, request).await)
    }

    /// Write consecutive holding registers starting at `address`
    pub async fn write_registers(
        &self,
        address: u16,
        values: &[u16],
        unit: Option<UnitId>,
    ) -> Result<bool, RequestError> {
        let request = WriteMultiple::<u16>::registers(address, values.to_vec());
        write_outcome(self.make_request(unit, request).await)
    }

    /// Read a coil and write back its inverse
    ///
    /// No other request runs between the read and the write. `Ok(None)`
    /// means the slave refused the write.
    pub async fn toggle_coil(
        &self,
        address: u16,
        unit: Option<UnitId>,
    ) -> Result<Option<Toggled>, RequestError> {
        let mut inner = self.lock_connected().await?;
        let unit = self.resolve_unit(unit)?;

        let read = ReadBits::coils(address, 1)?;
        let previous = self
            .execute(&mut inner, unit, &read)
            .await?
            .first()
            .map(|x| x.value)
            .ok_or(AduParseError::InsufficientBytes)?;

        let write = WriteSingle::new(Indexed::new(address, !previous));
        let written = write_outcome(self.execute(&mut inner, unit, &write).await)?;

        Ok(written.then_some(Toggled {
            previous,
            current: !previous,
        }))
    }

    async fn lock_connected(&self) -> Result<MutexGuard<'_, Inner>, RequestError> {
        let inner = self.inner.lock().await;
        if inner.state != SessionState::Connected {
            return Err(RequestError::NotConnected);
        }
        Ok(inner)
    }

    fn resolve_unit(&self, unit: Option<UnitId>) -> Result<UnitId, InvalidRequest> {
        unit.unwrap_or(self.unit).check_addressable()
    }

    async fn make_request<R>(
        &self,
        unit: Option<UnitId>,
        request: Result<R, InvalidRequest>,
    ) -> Result<R::Response, RequestError>
    where
        R: RequestDetails,
    {
        let mut inner = self.lock_connected().await?;
        let request = request?;
        let unit = self.resolve_unit(unit)?;
        self.execute(&mut inner, unit, &request).await
    }

    async fn execute<R>(
        &self,
        inner: &mut Inner,
        unit: UnitId,
        request: &R,
    ) -> Result<R::Response, RequestError>
    where
        R: RequestDetails,
    {
        let transport = inner
            .transport
            .as_mut()
            .ok_or(RequestError::NotConnected)?;

        let result = transport
            .execute(unit, request, self.endpoint.timeout)
            .instrument(tracing::info_span!("Request", unit = %unit))
            .await;

        if let Err(err) = &result {
            tracing::warn!("request error: {}", err);
            if err.is_fatal() {
                tracing::warn!("closing {} after device failure", self.endpoint.path);
                inner.transport = None;
                inner.state = SessionState::Error;
            }
        }

        result
    }
}

fn values<T>(indexed: Vec<Indexed<T>>) -> Vec<T> {
    indexed.into_iter().map(|x| x.value).collect()
}

/// Refusals become `Ok(false)`, everything that says nothing about the device's answer stays an error
fn write_outcome<T>(result: Result<T, RequestError>) -> Result<bool, RequestError> {
    match result {
        Ok(_) => Ok(true),
        Err(
            RequestError::Exception(_)
            | RequestError::CrcMismatch { .. }
            | RequestError::BadFrame(_)
            | RequestError::BadResponse(_),
        ) => Ok(false),
        Err(err) => Err(err),
    }
}
