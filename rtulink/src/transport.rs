use tokio::time::{Duration, Instant};

use crate::client::requests::{RequestDetails, RequestDisplay};
use crate::common::buffer::ReadBuffer;
use crate::common::cursor::ReadCursor;
use crate::common::function::ERROR_DELIMITER;
use crate::common::phys::PhysLayer;
use crate::decode::DecodeLevel;
use crate::error::{AduParseError, RequestError};
use crate::exception::ExceptionCode;
use crate::serial::frame::{constants, Frame, RtuDisplay, RtuParser};
use crate::types::UnitId;

/// Request/response exchange of RTU frames over one serial line
///
/// Exactly one request is outstanding at a time. Every exchange is bounded
/// by the timeout given to [`FrameTransport::send`].
pub struct FrameTransport {
    phys: PhysLayer,
    buffer: ReadBuffer,
    parser: RtuParser,
    decode: DecodeLevel,
}

impl std::fmt::Debug for FrameTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTransport")
            .field("phys", &self.phys)
            .field("buffered", &self.buffer.len())
            .field("decode", &self.decode)
            .finish()
    }
}

impl FrameTransport {
    /// Take ownership of an open physical layer
    pub fn new(phys: PhysLayer, decode: DecodeLevel) -> Self {
        Self {
            phys,
            buffer: ReadBuffer::new(constants::MAX_FRAME_LENGTH),
            parser: RtuParser::new_response_parser(),
            decode,
        }
    }

    /// Change the decode level used for subsequent exchanges
    pub fn set_decode_level(&mut self, decode: DecodeLevel) {
        self.decode = decode;
    }

    /// Write `request` and wait at most `timeout` for the matching response
    ///
    /// Well-formed frames from other units are skipped. A frame failing its CRC
    /// check ends the attempt with [`RequestError::CrcMismatch`] whichever unit
    /// sent it, since its unit byte cannot be trusted. An exception response is
    /// returned as [`RequestError::Exception`].
    pub async fn send(&mut self, request: &Frame, timeout: Duration) -> Result<Frame, RequestError> {
        request.unit().check_addressable()?;

        // anything still buffered belongs to an earlier, abandoned exchange
        if !self.buffer.is_empty() {
            tracing::debug!("discarding {} stale bytes", self.buffer.len());
        }
        self.buffer.clear();
        self.parser.reset();
        self.phys.discard_input();

        if self.decode.frame.enabled() {
            tracing::info!(
                "RTU TX - {}",
                RtuDisplay::new(self.decode.frame, request, request.crc())
            );
        }
        self.phys
            .write(&request.encode(), self.decode.physical)
            .await?;

        let deadline = Instant::now() + timeout;

        // loop until we get a response from the right unit or we time out
        let response = loop {
            let frame = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(RequestError::ResponseTimeout);
                }
                frame = self.next_frame() => {
                    frame?
                }
            };

            if frame.unit() != request.unit() {
                tracing::warn!(
                    "received frame from unit {} while expecting unit {}",
                    frame.unit(),
                    request.unit()
                );
                continue;
            }

            break frame;
        };

        check_function(request, response)
    }

    /// Serialize a typed request, exchange it and parse the response
    pub(crate) async fn execute<R>(
        &mut self,
        unit: UnitId,
        request: &R,
        timeout: Duration,
    ) -> Result<R::Response, RequestError>
    where
        R: RequestDetails,
    {
        let mut payload = Vec::new();
        request.serialize(&mut payload);
        let frame = Frame::request(unit, request.function(), payload);

        if self.decode.app.enabled() {
            tracing::info!("PDU TX - {}", RequestDisplay::new(self.decode.app, request));
        }

        let response = self.send(&frame, timeout).await?;
        let value = request.parse(ReadCursor::new(response.payload()))?;

        if self.decode.app.data_values() {
            tracing::info!("PDU RX - {} {:?}", request.function(), value);
        } else if self.decode.app.enabled() {
            tracing::info!("PDU RX - {}", request.function());
        }

        Ok(value)
    }

    async fn next_frame(&mut self) -> Result<Frame, RequestError> {
        loop {
            if let Some(frame) = self.parser.parse(&mut self.buffer, self.decode.frame)? {
                return Ok(frame);
            }
            self.buffer
                .read_some(&mut self.phys, self.decode.physical)
                .await?;
        }
    }
}

fn check_function(request: &Frame, response: Frame) -> Result<Frame, RequestError> {
    let expected = request.function();
    if response.function() == expected {
        return Ok(response);
    }

    if response.is_exception() && (response.function() & !ERROR_DELIMITER) == expected {
        let code = response
            .payload()
            .first()
            .copied()
            .ok_or(AduParseError::InsufficientBytes)?;
        return Err(RequestError::Exception(ExceptionCode::from(code)));
    }

    Err(AduParseError::UnknownResponseFunction(
        response.function(),
        expected,
        expected | ERROR_DELIMITER,
    )
    .into())
}
