use std::fmt::Formatter;

use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::decode::AppDecodeLevel;
use crate::error::{AduParseError, RequestError};
use crate::types::{coil_from_u16, coil_to_u16, Indexed};

use super::RequestDetails;

/// A value that travels as one 16-bit field of a single write
pub(crate) trait SingleValue: Copy + PartialEq + std::fmt::Debug {
    const FUNCTION: FunctionCode;

    fn to_wire(self) -> u16;

    fn from_wire(value: u16) -> Result<Self, AduParseError>;
}

impl SingleValue for bool {
    const FUNCTION: FunctionCode = FunctionCode::WriteSingleCoil;

    fn to_wire(self) -> u16 {
        coil_to_u16(self)
    }

    fn from_wire(value: u16) -> Result<Self, AduParseError> {
        coil_from_u16(value)
    }
}

impl SingleValue for u16 {
    const FUNCTION: FunctionCode = FunctionCode::WriteSingleRegister;

    fn to_wire(self) -> u16 {
        self
    }

    fn from_wire(value: u16) -> Result<Self, AduParseError> {
        Ok(value)
    }
}

/// Write one coil or one holding register; the slave echoes the request
pub(crate) struct WriteSingle<T> {
    value: Indexed<T>,
}

impl<T> WriteSingle<T>
where
    T: SingleValue,
{
    pub(crate) fn new(value: Indexed<T>) -> Self {
        Self { value }
    }
}

impl<T> RequestDetails for WriteSingle<T>
where
    T: SingleValue,
{
    type Response = Indexed<T>;

    fn function(&self) -> FunctionCode {
        T::FUNCTION
    }

    fn serialize(&self, payload: &mut Vec<u8>) {
        payload.extend_from_slice(&self.value.index.to_be_bytes());
        payload.extend_from_slice(&self.value.value.to_wire().to_be_bytes());
    }

    fn parse(&self, mut cursor: ReadCursor<'_>) -> Result<Self::Response, RequestError> {
        let index = cursor.read_u16_be()?;
        let value = T::from_wire(cursor.read_u16_be()?)?;
        cursor.expect_empty()?;
        let response = Indexed::new(index, value);
        if response != self.value {
            return Err(AduParseError::ReplyEchoMismatch.into());
        }
        Ok(response)
    }

    fn describe(&self, f: &mut Formatter<'_>, level: AppDecodeLevel) -> std::fmt::Result {
        write!(f, "index: {:#06X}", self.value.index)?;
        if level.data_values() {
            write!(f, " value: {:?}", self.value.value)?;
        }
        Ok(())
    }
}
