use std::fmt::Formatter;

use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::decode::AppDecodeLevel;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::types::{num_bytes_for_bits, unpack_bits, AddressRange, Indexed, RegisterSpace};

use super::RequestDetails;

/// Read coils or discrete inputs
pub(crate) struct ReadBits {
    function: FunctionCode,
    range: AddressRange,
}

impl ReadBits {
    pub(crate) fn coils(address: u16, count: u16) -> Result<Self, InvalidRequest> {
        Self::new(FunctionCode::ReadCoils, RegisterSpace::Coil, address, count)
    }

    pub(crate) fn discrete_inputs(address: u16, count: u16) -> Result<Self, InvalidRequest> {
        Self::new(FunctionCode::ReadDiscreteInputs, RegisterSpace::DiscreteInput, address, count)
    }

    fn new(
        function: FunctionCode,
        space: RegisterSpace,
        address: u16,
        count: u16,
    ) -> Result<Self, InvalidRequest> {
        let range = AddressRange::try_from(address, count)?.of_read(space)?;
        Ok(Self { function, range })
    }
}

impl RequestDetails for ReadBits {
    type Response = Vec<Indexed<bool>>;

    fn function(&self) -> FunctionCode {
        self.function
    }

    fn serialize(&self, payload: &mut Vec<u8>) {
        payload.extend_from_slice(&self.range.start.to_be_bytes());
        payload.extend_from_slice(&self.range.count.to_be_bytes());
    }

    fn parse(&self, mut cursor: ReadCursor<'_>) -> Result<Self::Response, RequestError> {
        let byte_count = usize::from(cursor.read_u8()?);
        let expected = num_bytes_for_bits(self.range.count);
        if byte_count != expected {
            return Err(AduParseError::RequestByteCountMismatch(expected, byte_count).into());
        }
        if byte_count > cursor.len() {
            return Err(
                AduParseError::InsufficientBytesForByteCount(byte_count, cursor.len()).into(),
            );
        }
        let bytes = cursor.read_bytes(byte_count)?;
        cursor.expect_empty()?;
        Ok(unpack_bits(self.range, bytes))
    }

    fn describe(&self, f: &mut Formatter<'_>, _level: AppDecodeLevel) -> std::fmt::Result {
        write!(f, "{}", self.range)
    }
}
