use crate::common::buffer::ReadBuffer;
use crate::common::function::{FunctionCode, ERROR_DELIMITER};
use crate::common::phys::format_bytes;
use crate::decode::FrameDecodeLevel;
use crate::error::{FrameParseError, RequestError};
use crate::types::UnitId;

pub(crate) mod constants {
    pub(crate) const UNIT_ID_LENGTH: usize = 1;
    pub(crate) const FUNCTION_CODE_LENGTH: usize = 1;
    pub(crate) const CRC_LENGTH: usize = 2;
    /// function code plus body
    pub(crate) const MAX_PDU_LENGTH: usize = 253;
    pub(crate) const MAX_FRAME_LENGTH: usize = UNIT_ID_LENGTH + MAX_PDU_LENGTH + CRC_LENGTH;
}

/// precomputed CRC-16/MODBUS table
pub(crate) const CRC: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

/// One RTU frame without its CRC, which is computed on encode and checked on decode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    unit: UnitId,
    function: u8,
    payload: Vec<u8>,
}

impl Frame {
    /// Assemble a frame from its parts
    pub fn new(unit: UnitId, function: u8, payload: Vec<u8>) -> Self {
        Self {
            unit,
            function,
            payload,
        }
    }

    pub(crate) fn request(unit: UnitId, function: FunctionCode, payload: Vec<u8>) -> Self {
        Self::new(unit, function.get_value(), payload)
    }

    /// Unit the frame is addressed to, or sent from
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Raw function code, including the exception bit
    pub fn function(&self) -> u8 {
        self.function
    }

    /// Body following the function code
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True if the function code carries the exception bit
    pub fn is_exception(&self) -> bool {
        self.function & ERROR_DELIMITER != 0
    }

    /// CRC-16/MODBUS over unit, function code and payload
    pub fn crc(&self) -> u16 {
        let mut digest = CRC.digest();
        digest.update(&[self.unit.value, self.function]);
        digest.update(&self.payload);
        digest.finalize()
    }

    /// The bytes put on the wire, CRC appended low byte first
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            constants::UNIT_ID_LENGTH
                + constants::FUNCTION_CODE_LENGTH
                + self.payload.len()
                + constants::CRC_LENGTH,
        );
        bytes.push(self.unit.value);
        bytes.push(self.function);
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&self.crc().to_le_bytes());
        bytes
    }
}

#[derive(Clone, Copy)]
enum Direction {
    #[cfg(test)]
    Request,
    Response,
}

#[derive(Clone, Copy)]
enum ParseState {
    Start,
    ReadFullBody(UnitId, usize),          // unit id, length of body
    ReadToOffsetForLength(UnitId, usize), // unit id, offset of the byte count
}

#[derive(Clone, Copy)]
enum LengthMode {
    /// The body always has the same length
    Fixed(usize),
    /// The byte at this offset in the body counts the bytes that follow it
    Offset(usize),
    /// Unknown function code, the length cannot be determined
    Unknown,
}

/// Incremental RTU frame assembler
pub(crate) struct RtuParser {
    state: ParseState,
    direction: Direction,
}

impl RtuParser {
    #[cfg(test)]
    pub(crate) fn new_request_parser() -> Self {
        Self {
            state: ParseState::Start,
            direction: Direction::Request,
        }
    }

    pub(crate) fn new_response_parser() -> Self {
        Self {
            state: ParseState::Start,
            direction: Direction::Response,
        }
    }

    fn length_mode(&self, function_code: u8) -> LengthMode {
        if matches!(self.direction, Direction::Response) && function_code & ERROR_DELIMITER != 0 {
            return LengthMode::Fixed(1);
        }

        let function_code = match FunctionCode::get(function_code) {
            Some(code) => code,
            None => return LengthMode::Unknown,
        };

        match self.direction {
            #[cfg(test)]
            Direction::Request => match function_code {
                FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters
                | FunctionCode::WriteSingleCoil
                | FunctionCode::WriteSingleRegister => LengthMode::Fixed(4),
                FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => {
                    LengthMode::Offset(5)
                }
            },
            Direction::Response => match function_code {
                FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters => LengthMode::Offset(1),
                FunctionCode::WriteSingleCoil
                | FunctionCode::WriteSingleRegister
                | FunctionCode::WriteMultipleCoils
                | FunctionCode::WriteMultipleRegisters => LengthMode::Fixed(4),
            },
        }
    }

    /// Returns a frame once enough bytes are buffered, `Ok(None)` if more are needed
    pub(crate) fn parse(
        &mut self,
        buffer: &mut ReadBuffer,
        decode_level: FrameDecodeLevel,
    ) -> Result<Option<Frame>, RequestError> {
        match self.state {
            ParseState::Start => {
                if buffer.len() < constants::UNIT_ID_LENGTH + constants::FUNCTION_CODE_LENGTH {
                    return Ok(None);
                }

                let unit = UnitId::new(buffer.peek_at(0)?);
                if unit.is_rtu_reserved() {
                    tracing::warn!("received reserved unit id {}, passing it through", unit);
                }

                let raw_function_code = buffer.peek_at(1)?;

                self.state = match self.length_mode(raw_function_code) {
                    LengthMode::Fixed(length) => ParseState::ReadFullBody(unit, length),
                    LengthMode::Offset(offset) => ParseState::ReadToOffsetForLength(unit, offset),
                    LengthMode::Unknown => {
                        return Err(FrameParseError::UnknownFunctionCode(raw_function_code).into())
                    }
                };

                self.parse(buffer, decode_level)
            }
            ParseState::ReadToOffsetForLength(unit, offset) => {
                let header = constants::UNIT_ID_LENGTH + constants::FUNCTION_CODE_LENGTH;
                if buffer.len() < header + offset {
                    return Ok(None);
                }

                let extra_bytes = usize::from(buffer.peek_at(header + offset - 1)?);
                self.state = ParseState::ReadFullBody(unit, offset + extra_bytes);

                self.parse(buffer, decode_level)
            }
            ParseState::ReadFullBody(unit, length) => {
                let pdu_length = constants::FUNCTION_CODE_LENGTH + length;
                if pdu_length > constants::MAX_PDU_LENGTH {
                    return Err(FrameParseError::FrameLengthTooBig(
                        pdu_length,
                        constants::MAX_PDU_LENGTH,
                    )
                    .into());
                }

                if buffer.len() < constants::UNIT_ID_LENGTH + pdu_length + constants::CRC_LENGTH {
                    return Ok(None);
                }

                let frame = {
                    let _unit = buffer.read_u8()?;
                    let function = buffer.read_u8()?;
                    let payload = buffer.read(length)?.to_vec();
                    Frame::new(unit, function, payload)
                };
                let received = buffer.read_u16_le()?;
                let expected = frame.crc();

                // the next frame starts fresh whether or not this one was valid
                self.state = ParseState::Start;

                if received != expected {
                    return Err(RequestError::CrcMismatch { received, expected });
                }

                if decode_level.enabled() {
                    tracing::info!("RTU RX - {}", RtuDisplay::new(decode_level, &frame, received));
                }

                Ok(Some(frame))
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = ParseState::Start;
    }
}

pub(crate) struct RtuDisplay<'a> {
    level: FrameDecodeLevel,
    frame: &'a Frame,
    crc: u16,
}

impl<'a> RtuDisplay<'a> {
    pub(crate) fn new(level: FrameDecodeLevel, frame: &'a Frame, crc: u16) -> Self {
        RtuDisplay { level, frame, crc }
    }
}

impl std::fmt::Display for RtuDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "unit: {} fc: {:#04X} crc: {:#06X} (payload len = {})",
            self.frame.unit,
            self.frame.function,
            self.crc,
            self.frame.payload.len(),
        )?;
        if self.level.payload_enabled() {
            format_bytes(f, &self.frame.payload)?;
        }
        Ok(())
    }
}
