//! Simulated RTU slaves and a port opener that serves them over in-memory pipes

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

use crate::common::buffer::ReadBuffer;
use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::common::phys::PhysLayer;
use crate::config::SerialEndpoint;
use crate::decode::FrameDecodeLevel;
use crate::error::AduParseError;
use crate::exception::ExceptionCode;
use crate::serial::frame::{constants, Frame, RtuParser};
use crate::serial::PortOpener;
use crate::types::{coil_from_u16, coil_to_u16, pack_bits, UnitId};

/// How the simulated slave reacts to requests addressed to it
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Behavior {
    Normal,
    Silent,
    CorruptCrc,
    Exception(ExceptionCode),
    /// drop the line as if the adapter were unplugged
    Unplug,
}

pub(crate) struct Tables {
    pub(crate) coils: Vec<bool>,
    pub(crate) discrete_inputs: Vec<bool>,
    pub(crate) holding_registers: Vec<u16>,
    pub(crate) input_registers: Vec<u16>,
    /// address of the first entry of every table
    pub(crate) first_address: u16,
}

pub(crate) struct Device {
    unit: UnitId,
    tables: Mutex<Tables>,
    behavior: Mutex<Behavior>,
    requests: AtomicUsize,
}

impl Device {
    pub(crate) fn new(unit: u8) -> Arc<Self> {
        Arc::new(Self {
            unit: UnitId::new(unit),
            tables: Mutex::new(Tables {
                coils: vec![false; 64],
                discrete_inputs: vec![false; 64],
                holding_registers: vec![0; 64],
                input_registers: vec![0; 64],
                first_address: 0,
            }),
            behavior: Mutex::new(Behavior::Normal),
            requests: AtomicUsize::new(0),
        })
    }

    pub(crate) fn with_tables<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        f(&mut self.tables.lock().unwrap())
    }

    pub(crate) fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Requests addressed to this unit so far
    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn behavior(&self) -> Behavior {
        *self.behavior.lock().unwrap()
    }

    fn handle(&self, request: &Frame) -> Option<Vec<u8>> {
        if request.unit() != self.unit {
            return None;
        }
        self.requests.fetch_add(1, Ordering::SeqCst);

        let reply = match self.behavior() {
            Behavior::Silent | Behavior::Unplug => return None,
            Behavior::Exception(code) => exception(request, code),
            Behavior::CorruptCrc => {
                let mut bytes = self.reply(request).encode();
                if let Some(last) = bytes.last_mut() {
                    *last ^= 0xFF;
                }
                return Some(bytes);
            }
            Behavior::Normal => self.reply(request),
        };
        Some(reply.encode())
    }

    fn reply(&self, request: &Frame) -> Frame {
        let function = match FunctionCode::get(request.function()) {
            Some(function) => function,
            None => return exception(request, ExceptionCode::IllegalFunction),
        };
        let mut tables = self.tables.lock().unwrap();
        match Self::process(&mut tables, function, request.payload()) {
            Ok(payload) => Frame::new(self.unit, request.function(), payload),
            Err(code) => exception(request, code),
        }
    }

    fn process(
        tables: &mut Tables,
        function: FunctionCode,
        body: &[u8],
    ) -> Result<Vec<u8>, ExceptionCode> {
        let mut cursor = ReadCursor::new(body);
        let address = cursor.read_u16_be().map_err(illegal_value)?;
        let start = usize::from(
            address
                .checked_sub(tables.first_address)
                .ok_or(ExceptionCode::IllegalDataAddress)?,
        );
        let second = cursor.read_u16_be().map_err(illegal_value)?;

        match function {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                let table = if function == FunctionCode::ReadCoils {
                    &tables.coils
                } else {
                    &tables.discrete_inputs
                };
                let values = slice(table, start, usize::from(second))?;
                let bits = pack_bits(values);
                let mut payload = vec![bits.len() as u8];
                payload.extend(bits);
                Ok(payload)
            }
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
                let table = if function == FunctionCode::ReadHoldingRegisters {
                    &tables.holding_registers
                } else {
                    &tables.input_registers
                };
                let values = slice(table, start, usize::from(second))?;
                let mut payload = vec![(2 * values.len()) as u8];
                for value in values {
                    payload.extend_from_slice(&value.to_be_bytes());
                }
                Ok(payload)
            }
            FunctionCode::WriteSingleCoil => {
                let value = coil_from_u16(second).map_err(illegal_value)?;
                *tables
                    .coils
                    .get_mut(start)
                    .ok_or(ExceptionCode::IllegalDataAddress)? = value;
                Ok(echo(address, coil_to_u16(value)))
            }
            FunctionCode::WriteSingleRegister => {
                *tables
                    .holding_registers
                    .get_mut(start)
                    .ok_or(ExceptionCode::IllegalDataAddress)? = second;
                Ok(echo(address, second))
            }
            FunctionCode::WriteMultipleCoils => {
                let count = usize::from(second);
                let byte_count = cursor.read_u8().map_err(illegal_value)?;
                let bytes = cursor
                    .read_bytes(usize::from(byte_count))
                    .map_err(illegal_value)?;
                let target = slice_mut(&mut tables.coils, start, count)?;
                for (pos, coil) in target.iter_mut().enumerate() {
                    *coil = bytes.get(pos / 8).is_some_and(|b| b & (1 << (pos % 8)) != 0);
                }
                Ok(echo(address, second))
            }
            FunctionCode::WriteMultipleRegisters => {
                let count = usize::from(second);
                let _byte_count = cursor.read_u8().map_err(illegal_value)?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(cursor.read_u16_be().map_err(illegal_value)?);
                }
                slice_mut(&mut tables.holding_registers, start, count)?.copy_from_slice(&values);
                Ok(echo(address, second))
            }
        }
    }
}

fn illegal_value(_: AduParseError) -> ExceptionCode {
    ExceptionCode::IllegalDataValue
}

fn slice<T>(table: &[T], start: usize, count: usize) -> Result<&[T], ExceptionCode> {
    table
        .get(start..start + count)
        .ok_or(ExceptionCode::IllegalDataAddress)
}

fn slice_mut<T>(table: &mut [T], start: usize, count: usize) -> Result<&mut [T], ExceptionCode> {
    table
        .get_mut(start..start + count)
        .ok_or(ExceptionCode::IllegalDataAddress)
}

fn echo(address: u16, value: u16) -> Vec<u8> {
    let mut payload = address.to_be_bytes().to_vec();
    payload.extend_from_slice(&value.to_be_bytes());
    payload
}

fn exception(request: &Frame, code: ExceptionCode) -> Frame {
    Frame::new(request.unit(), request.function() | 0x80, vec![u8::from(code)])
}

/// Spawn a task answering requests for `devices` on a shared line
pub(crate) fn serve(devices: Vec<Arc<Device>>) -> DuplexStream {
    let (client, server) = tokio::io::duplex(1024);
    tokio::spawn(run(devices, server));
    client
}

/// A line with nothing attached, reads and discards whatever is written
pub(crate) fn dead_line() -> DuplexStream {
    let (client, mut server) = tokio::io::duplex(1024);
    tokio::spawn(async move {
        let mut sink = [0u8; 64];
        while let Ok(count) = server.read(&mut sink).await {
            if count == 0 {
                break;
            }
        }
    });
    client
}

async fn run(devices: Vec<Arc<Device>>, mut io: DuplexStream) {
    let mut buffer = ReadBuffer::new(constants::MAX_FRAME_LENGTH);
    let mut parser = RtuParser::new_request_parser();
    let mut chunk = [0u8; 64];

    loop {
        loop {
            match parser.parse(&mut buffer, FrameDecodeLevel::Nothing) {
                Ok(Some(request)) => {
                    for device in &devices {
                        if request.unit() == device.unit && device.behavior() == Behavior::Unplug {
                            device.requests.fetch_add(1, Ordering::SeqCst);
                            return;
                        }
                        if let Some(reply) = device.handle(&request) {
                            if io.write_all(&reply).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    buffer.clear();
                    parser.reset();
                    break;
                }
            }
        }

        let count = match io.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(count) => count,
        };
        buffer.extend(&chunk[..count]);
    }
}

struct OpenGuard(Arc<AtomicUsize>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stream that tracks how many simulated ports are open at once
struct Tracked {
    inner: DuplexStream,
    _guard: OpenGuard,
}

impl AsyncRead for Tracked {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for Tracked {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

struct SimPort {
    baud_rate: u32,
    devices: Vec<Arc<Device>>,
}

/// Opens simulated ports; unknown paths fail with `NotFound`
#[derive(Default)]
pub(crate) struct SimOpener {
    ports: HashMap<String, SimPort>,
    attempts: Mutex<Vec<(String, u32)>>,
    open_now: Arc<AtomicUsize>,
    max_open: AtomicUsize,
}

impl SimOpener {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A port whose devices answer only at `baud_rate`
    pub(crate) fn port(mut self, path: &str, baud_rate: u32, devices: Vec<Arc<Device>>) -> Self {
        self.ports
            .insert(path.to_string(), SimPort { baud_rate, devices });
        self
    }

    pub(crate) fn attempts(&self) -> Vec<(String, u32)> {
        self.attempts.lock().unwrap().clone()
    }

    pub(crate) fn opens(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub(crate) fn max_concurrently_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    pub(crate) fn open_now(&self) -> usize {
        self.open_now.load(Ordering::SeqCst)
    }
}

impl PortOpener for SimOpener {
    fn open(&self, endpoint: &SerialEndpoint) -> Result<PhysLayer, std::io::Error> {
        self.attempts
            .lock()
            .unwrap()
            .push((endpoint.path.clone(), endpoint.baud_rate));

        let port = self
            .ports
            .get(&endpoint.path)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;

        // at the wrong baud rate the slave never recognizes a frame
        let inner = if port.baud_rate == endpoint.baud_rate {
            serve(port.devices.clone())
        } else {
            dead_line()
        };

        let now = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now, Ordering::SeqCst);

        let stream = Tracked {
            inner,
            _guard: OpenGuard(self.open_now.clone()),
        };
        Ok(PhysLayer::from_stream(stream, endpoint.baud_rate))
    }
}
