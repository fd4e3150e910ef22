use std::fmt::Formatter;

use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::decode::AppDecodeLevel;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::types::{AddressRange, Indexed, RegisterSpace};

use super::RequestDetails;

/// Read holding or input registers
pub(crate) struct ReadRegisters {
    function: FunctionCode,
    range: AddressRange,
}

impl ReadRegisters {
    pub(crate) fn holding(address: u16, count: u16) -> Result<Self, InvalidRequest> {
        Self::new(FunctionCode::ReadHoldingRegisters, RegisterSpace::HoldingRegister, address, count)
    }

    pub(crate) fn input(address: u16, count: u16) -> Result<Self, InvalidRequest> {
        Self::new(FunctionCode::ReadInputRegisters, RegisterSpace::InputRegister, address, count)
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

impl RequestDetails for ReadRegisters {
    type Response = Vec<Indexed<u16>>;

    fn function(&self) -> FunctionCode {
        self.function
    }

    fn serialize(&self, payload: &mut Vec<u8>) {
        payload.extend_from_slice(&self.range.start.to_be_bytes());
        payload.extend_from_slice(&self.range.count.to_be_bytes());
    }

    fn parse(&self, mut cursor: ReadCursor<'_>) -> Result<Self::Response, RequestError> {
        let byte_count = usize::from(cursor.read_u8()?);
        let expected = 2 * usize::from(self.range.count);
        if byte_count != expected {
            return Err(AduParseError::RequestByteCountMismatch(expected, byte_count).into());
        }
        if byte_count > cursor.len() {
            return Err(
                AduParseError::InsufficientBytesForByteCount(byte_count, cursor.len()).into(),
            );
        }

        let mut values = Vec::with_capacity(usize::from(self.range.count));
        for address in self.range.addresses() {
            values.push(Indexed::new(address, cursor.read_u16_be()?));
        }
        cursor.expect_empty()?;
        Ok(values)
    }

    fn describe(&self, f: &mut Formatter<'_>, _level: AppDecodeLevel) -> std::fmt::Result {
        write!(f, "{}", self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_big_endian_registers_with_addresses() {
        let request = ReadRegisters::holding(0x0010, 3).unwrap();
        let values = request
            .parse(ReadCursor::new(&[
                0x06, 0x12, 0x34, 0x56, 0x78, 0x23, 0x45,
            ]))
            .unwrap();
        assert_eq!(
            values,
            vec![
                Indexed::new(0x10, 0x1234),
                Indexed::new(0x11, 0x5678),
                Indexed::new(0x12, 0x2345)
            ]
        );
    }

    #[test]
    fn rejects_odd_byte_counts() {
        let request = ReadRegisters::input(0, 1).unwrap();
        assert_eq!(
            request.parse(ReadCursor::new(&[0x01, 0x12])),
            Err(AduParseError::RequestByteCountMismatch(2, 1).into())
        );
    }

    #[test]
    fn limits_register_count() {
        assert!(ReadRegisters::holding(0, 125).is_ok());
        assert!(matches!(
            ReadRegisters::input(0, 126),
            Err(InvalidRequest::CountTooBigForType(126, 125))
        ));
    }
}
