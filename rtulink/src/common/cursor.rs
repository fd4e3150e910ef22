use crate::error::AduParseError;

/// Read-only cursor over the body of a received frame
pub(crate) struct ReadCursor<'a> {
    src: &'a [u8],
}

impl<'a> ReadCursor<'a> {
    pub(crate) fn new(src: &'a [u8]) -> Self {
        Self { src }
    }

    pub(crate) fn len(&self) -> usize {
        self.src.len()
    }

    pub(crate) fn expect_empty(&self) -> Result<(), AduParseError> {
        if self.src.is_empty() {
            Ok(())
        } else {
            Err(AduParseError::TrailingBytes(self.len()))
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, AduParseError> {
        let (first, rest) = self
            .src
            .split_first()
            .ok_or(AduParseError::InsufficientBytes)?;
        self.src = rest;
        Ok(*first)
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, AduParseError> {
        let high = self.read_u8()?;
        let low = self.read_u8()?;
        Ok(u16::from_be_bytes([high, low]))
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], AduParseError> {
        if self.src.len() < count {
            return Err(AduParseError::InsufficientBytes);
        }
        let (first, rest) = self.src.split_at(count);
        self.src = rest;
        Ok(first)
    }
}
