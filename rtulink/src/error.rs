use crate::exception::ExceptionCode;

/// Top level error type returned by every request on a session or transport
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The session is not connected, nothing was written
    #[error("no open connection to the serial device")]
    NotConnected,
    /// No complete response arrived before the deadline
    #[error("timeout elapsed before a complete response was received")]
    ResponseTimeout,
    /// A frame arrived but its CRC did not match its contents
    #[error("CRC mismatch: received {received:#06X}, calculated {expected:#06X}")]
    CrcMismatch {
        /// CRC carried by the frame
        received: u16,
        /// CRC calculated over the received bytes
        expected: u16,
    },
    /// The slave answered with an exception response
    #[error("slave returned an exception: {0}")]
    Exception(ExceptionCode),
    /// The serial device failed; the session cannot continue on this handle
    #[error("I/O error: {0}")]
    Io(std::io::ErrorKind),
    /// The request was rejected locally before any I/O
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),
    /// The received bytes could not be framed
    #[error("bad frame: {0}")]
    BadFrame(#[from] FrameParseError),
    /// A CRC-valid response whose contents do not match the request
    #[error("bad response: {0}")]
    BadResponse(#[from] AduParseError),
    /// An internal invariant was violated
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),
}

impl RequestError {
    /// True if the error means the device handle is unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self, RequestError::Io(_))
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<ExceptionCode> for RequestError {
    fn from(code: ExceptionCode) -> Self {
        RequestError::Exception(code)
    }
}

/// Requests rejected before they reach the wire
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRequest {
    /// Zero items requested
    #[error("request contains a count of zero")]
    CountOfZero,
    /// `start + count - 1` does not fit in 16 bits
    #[error("start == {0} and count == {1} would overflow the 16-bit address space")]
    AddressOverflow(u16, u16),
    /// More items than the function code allows
    #[error("count of {0} exceeds the maximum of {1} for this function")]
    CountTooBigForType(u16, u16),
    /// More values than fit in the 16-bit quantity field
    #[error("the number of values ({0}) does not fit in a 16-bit count")]
    CountTooBigForU16(usize),
    /// Unit id outside 1-247
    #[error("unit id {0} cannot be addressed, valid range is 1 to 247")]
    UnitNotAddressable(u8),
}

/// Errors that occur while assembling an RTU frame from received bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameParseError {
    /// The response function code is not one this crate issues
    #[error("received unknown function code ({0:#04X}), cannot determine the frame length")]
    UnknownFunctionCode(u8),
    /// The announced length exceeds the RTU maximum
    #[error("frame length of {0} exceeds the maximum allowed of {1}")]
    FrameLengthTooBig(usize, usize),
}

/// Errors in the contents of a CRC-valid response
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AduParseError {
    /// Response ended before all fields were read
    #[error("response is too short to be valid")]
    InsufficientBytes,
    /// The byte count does not match what the request implies
    #[error("byte count ({1}) does not match the count implied by the request ({0})")]
    RequestByteCountMismatch(usize, usize),
    /// The byte count exceeds the remaining bytes
    #[error("byte count ({0}) exceeds the number of remaining bytes ({1})")]
    InsufficientBytesForByteCount(usize, usize),
    /// Bytes left over after parsing
    #[error("response contains {0} extra trailing bytes")]
    TrailingBytes(usize),
    /// A write response that is not an echo of the request
    #[error("reply does not echo the request")]
    ReplyEchoMismatch,
    /// The function code matches neither the request nor its exception form
    #[error("received function code {0:#04X}, expected {1:#04X} or {2:#04X}")]
    UnknownResponseFunction(u8, u8, u8),
    /// A coil value other than 0xFF00 or 0x0000
    #[error("received coil state {0:#06X}, valid values are 0xFF00 and 0x0000")]
    UnknownCoilState(u16),
}

/// Violations of internal invariants, these indicate a bug
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    /// Attempted to read more bytes than are buffered
    #[error("attempted to read {0} bytes with only {1} remaining")]
    InsufficientBytesForRead(usize, usize),
}
