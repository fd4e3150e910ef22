use std::fmt::Write;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Duration, Instant};

use crate::decode::PhysDecodeLevel;

/// Any byte stream that can stand in for a serial port
pub trait SerialIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> SerialIo for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// An open serial line, either a real port or an injected stream
pub struct PhysLayer {
    layer: PhysLayerImpl,
    inter_frame_delay: Duration,
    last_activity: Option<Instant>,
}

enum PhysLayerImpl {
    Serial(tokio_serial::SerialStream),
    Stream(Box<dyn SerialIo>),
}

impl std::fmt::Debug for PhysLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.layer {
            PhysLayerImpl::Serial(_) => f.write_str("Serial"),
            PhysLayerImpl::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl PhysLayer {
    pub(crate) fn new_serial(stream: tokio_serial::SerialStream) -> Self {
        let inter_frame_delay = serial_inter_frame_delay(&stream);
        Self {
            layer: PhysLayerImpl::Serial(stream),
            inter_frame_delay,
            last_activity: None,
        }
    }

    /// Wrap any async byte stream, e.g. a simulator or a TCP-to-serial bridge
    ///
    /// `baud_rate` is only used to size the silent interval between frames.
    pub fn from_stream<S>(stream: S, baud_rate: u32) -> Self
    where
        S: SerialIo + 'static,
    {
        Self {
            layer: PhysLayerImpl::Stream(Box::new(stream)),
            inter_frame_delay: inter_frame_delay(baud_rate),
            last_activity: None,
        }
    }

    /// Throw away whatever the driver has buffered but we have not read yet
    pub(crate) fn discard_input(&mut self) {
        if let PhysLayerImpl::Serial(port) = &self.layer {
            use tokio_serial::SerialPort;
            if let Err(err) = port.clear(tokio_serial::ClearBuffer::Input) {
                tracing::warn!("unable to clear the serial input buffer: {}", err);
            }
        }
    }

    pub(crate) async fn read(
        &mut self,
        buffer: &mut [u8],
        decode_level: PhysDecodeLevel,
    ) -> Result<usize, std::io::Error> {
        let length = match &mut self.layer {
            PhysLayerImpl::Serial(x) => x.read(buffer).await?,
            PhysLayerImpl::Stream(x) => x.read(buffer).await?,
        };
        self.last_activity = Some(Instant::now());

        if decode_level.enabled() {
            if let Some(x) = buffer.get(0..length) {
                tracing::info!("PHYS RX - {}", PhysDisplay::new(decode_level, x))
            }
        }

        Ok(length)
    }

    pub(crate) async fn write(
        &mut self,
        data: &[u8],
        decode_level: PhysDecodeLevel,
    ) -> Result<(), std::io::Error> {
        if let Some(last_activity) = self.last_activity {
            tokio::time::sleep_until(last_activity + self.inter_frame_delay).await;
        }

        if decode_level.enabled() {
            tracing::info!("PHYS TX - {}", PhysDisplay::new(decode_level, data));
        }

        match &mut self.layer {
            PhysLayerImpl::Serial(x) => {
                x.write_all(data).await?;
                x.flush().await?;
            }
            PhysLayerImpl::Stream(x) => {
                x.write_all(data).await?;
                x.flush().await?;
            }
        }

        self.last_activity = Some(Instant::now());
        Ok(())
    }
}

pub(crate) struct PhysDisplay<'a> {
    level: PhysDecodeLevel,
    data: &'a [u8],
}

impl<'a> PhysDisplay<'a> {
    pub(crate) fn new(level: PhysDecodeLevel, data: &'a [u8]) -> Self {
        PhysDisplay { level, data }
    }
}

impl std::fmt::Display for PhysDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} bytes", self.data.len())?;
        if self.level.data_enabled() {
            format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

fn serial_inter_frame_delay(serial: &tokio_serial::SerialStream) -> Duration {
    use tokio_serial::SerialPort;

    match serial.baud_rate() {
        Ok(baud_rate) => inter_frame_delay(baud_rate),
        Err(_) => {
            tracing::warn!(
                "unable to determine the baud rate, defaulting to {} us",
                MIN_DELAY.as_micros()
            );
            MIN_DELAY
        }
    }
}

// fixed delay used above 19200 baud
const MAX_BAUD_RATE: u32 = 19200;
const MIN_DELAY: Duration = Duration::from_micros(1750);

/// 3.5 character times of 11 bits each, or a fixed 1.75 ms on fast lines
pub(crate) fn inter_frame_delay(baud_rate: u32) -> Duration {
    const NUM_BITS_IN_CHAR: u64 = 11;

    if baud_rate == 0 || baud_rate > MAX_BAUD_RATE {
        return MIN_DELAY;
    }

    let character_time = Duration::from_secs(NUM_BITS_IN_CHAR) / baud_rate;
    35 * character_time / 10
}

const BYTES_PER_DECODE_LINE: usize = 18;

pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    for chunk in bytes.chunks(BYTES_PER_DECODE_LINE) {
        writeln!(f)?;
        for (i, byte) in chunk.iter().enumerate() {
            if i != 0 {
                f.write_char(' ')?;
            }
            write!(f, "{byte:02X}")?;
        }
    }
    Ok(())
}
