use std::fmt::Formatter;

use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::constants::limits;
use crate::decode::AppDecodeLevel;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::types::{pack_bits, AddressRange};

use super::RequestDetails;

/// Write a contiguous block of coils or holding registers
pub(crate) struct WriteMultiple<T> {
    range: AddressRange,
    values: Vec<T>,
}

impl<T> WriteMultiple<T> {
    fn new(start: u16, values: Vec<T>, max: u16) -> Result<Self, InvalidRequest> {
        let count =
            u16::try_from(values.len()).map_err(|_| InvalidRequest::CountTooBigForU16(values.len()))?;
        let range = AddressRange::try_from(start, count)?.limited(max)?;
        Ok(Self { range, values })
    }

    fn parse_echo(&self, mut cursor: ReadCursor<'_>) -> Result<AddressRange, RequestError> {
        let start = cursor.read_u16_be()?;
        let count = cursor.read_u16_be()?;
        cursor.expect_empty()?;
        if start != self.range.start || count != self.range.count {
            return Err(AduParseError::ReplyEchoMismatch.into());
        }
        Ok(self.range)
    }

    fn serialize_header(&self, payload: &mut Vec<u8>, byte_count: usize) {
        payload.extend_from_slice(&self.range.start.to_be_bytes());
        payload.extend_from_slice(&self.range.count.to_be_bytes());
        // bounded by the per-function limits checked in new()
        payload.push(u8::try_from(byte_count).unwrap_or(u8::MAX));
    }
}

impl WriteMultiple<bool> {
    pub(crate) fn coils(start: u16, values: Vec<bool>) -> Result<Self, InvalidRequest> {
        Self::new(start, values, limits::MAX_WRITE_COILS_COUNT)
    }
}

impl WriteMultiple<u16> {
    pub(crate) fn registers(start: u16, values: Vec<u16>) -> Result<Self, InvalidRequest> {
        Self::new(start, values, limits::MAX_WRITE_REGISTERS_COUNT)
    }
}

impl RequestDetails for WriteMultiple<bool> {
    type Response = AddressRange;

    fn function(&self) -> FunctionCode {
        FunctionCode::WriteMultipleCoils
    }

    fn serialize(&self, payload: &mut Vec<u8>) {
        let bits = pack_bits(&self.values);
        self.serialize_header(payload, bits.len());
        payload.extend_from_slice(&bits);
    }

    fn parse(&self, cursor: ReadCursor<'_>) -> Result<Self::Response, RequestError> {
        self.parse_echo(cursor)
    }

    fn describe(&self, f: &mut Formatter<'_>, level: AppDecodeLevel) -> std::fmt::Result {
        write!(f, "{}", self.range)?;
        if level.data_values() {
            for (address, value) in self.range.addresses().zip(&self.values) {
                write!(f, "\n{address}: {value}")?;
            }
        }
        Ok(())
    }
}

impl RequestDetails for WriteMultiple<u16> {
    type Response = AddressRange;

    fn function(&self) -> FunctionCode {
        FunctionCode::WriteMultipleRegisters
    }

    fn serialize(&self, payload: &mut Vec<u8>) {
        self.serialize_header(payload, 2 * self.values.len());
        for value in &self.values {
            payload.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn parse(&self, cursor: ReadCursor<'_>) -> Result<Self::Response, RequestError> {
        self.parse_echo(cursor)
    }

    fn describe(&self, f: &mut Formatter<'_>, level: AppDecodeLevel) -> std::fmt::Result {
        write!(f, "{}", self.range)?;
        if level.data_values() {
            for (address, value) in self.range.addresses().zip(&self.values) {
                write!(f, "\n{address}: {value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_packed_coils() {
        let values = vec![
            false, true, false, false, true, false, false, false, false, false,
        ];
        let mut payload = Vec::new();
        WriteMultiple::<bool>::coils(0x0010, values)
            .unwrap()
            .serialize(&mut payload);
        assert_eq!(payload, [0x00, 0x10, 0x00, 0x0A, 0x02, 0x12, 0x00]);
    }

    #[test]
    fn serializes_registers() {
        let mut payload = Vec::new();
        WriteMultiple::<u16>::registers(0x0010, vec![0x1234, 0x5678])
            .unwrap()
            .serialize(&mut payload);
        assert_eq!(
            payload,
            [0x00, 0x10, 0x00, 0x02, 0x04, 0x12, 0x34, 0x56, 0x78]
        );
    }

    #[test]
    fn validates_echo_of_range() {
        let request = WriteMultiple::<u16>::registers(0x0010, vec![1, 2]).unwrap();
        assert_eq!(
            request.parse(ReadCursor::new(&[0x00, 0x10, 0x00, 0x02])),
            Ok(AddressRange::try_from(0x10, 2).unwrap())
        );
        assert_eq!(
            request.parse(ReadCursor::new(&[0x00, 0x10, 0x00, 0x03])),
            Err(AduParseError::ReplyEchoMismatch.into())
        );
    }

    #[test]
    fn enforces_write_limits() {
        assert!(matches!(
            WriteMultiple::<u16>::registers(0, vec![0; 124]),
            Err(InvalidRequest::CountTooBigForType(124, 123))
        ));
        assert!(matches!(
            WriteMultiple::<bool>::coils(0, vec![true; 1969]),
            Err(InvalidRequest::CountTooBigForType(1969, 1968))
        ));
        assert!(matches!(
            WriteMultiple::<u16>::registers(0, Vec::new()),
            Err(InvalidRequest::CountOfZero)
        ));
        assert!(matches!(
            WriteMultiple::<bool>::coils(0, vec![false; 70_000]),
            Err(InvalidRequest::CountTooBigForU16(70_000))
        ));
    }
}
