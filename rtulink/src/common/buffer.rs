use crate::common::phys::PhysLayer;
use crate::decode::PhysDecodeLevel;
use crate::error::InternalError;

/// Receive buffer that frames are assembled from
pub(crate) struct ReadBuffer {
    buffer: Vec<u8>,
    begin: usize,
    end: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        ReadBuffer {
            buffer: vec![0; capacity],
            begin: 0,
            end: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.begin
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Drop everything received so far
    pub(crate) fn clear(&mut self) {
        self.begin = 0;
        self.end = 0;
    }

    pub(crate) fn read(&mut self, count: usize) -> Result<&[u8], InternalError> {
        if self.len() < count {
            return Err(InternalError::InsufficientBytesForRead(count, self.len()));
        }

        let start = self.begin;
        self.begin += count;
        self.buffer
            .get(start..start + count)
            .ok_or(InternalError::InsufficientBytesForRead(count, self.len()))
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, InternalError> {
        let value = self.peek_at(0)?;
        self.begin += 1;
        Ok(value)
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16, InternalError> {
        let low = self.read_u8()?;
        let high = self.read_u8()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Look at a byte without consuming it
    pub(crate) fn peek_at(&self, idx: usize) -> Result<u8, InternalError> {
        if idx >= self.len() {
            return Err(InternalError::InsufficientBytesForRead(idx + 1, self.len()));
        }
        self.buffer
            .get(self.begin + idx)
            .copied()
            .ok_or(InternalError::InsufficientBytesForRead(idx + 1, self.len()))
    }

    #[cfg(test)]
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        if self.is_empty() {
            self.clear();
        }
        let end = self.end + bytes.len();
        self.buffer[self.end..end].copy_from_slice(bytes);
        self.end = end;
    }

    pub(crate) async fn read_some(
        &mut self,
        io: &mut PhysLayer,
        decode_level: PhysDecodeLevel,
    ) -> Result<usize, std::io::Error> {
        // an empty buffer starts over at the front so the read can be as large as possible
        if self.is_empty() {
            self.clear();
        }

        // out of room at the back, move the unread bytes to the front
        if self.end == self.buffer.len() {
            let length = self.len();
            self.buffer.copy_within(self.begin..self.end, 0);
            self.begin = 0;
            self.end = length;
        }

        let count = io.read(&mut self.buffer[self.end..], decode_level).await?;

        if count == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        }
        self.end += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::*;

    fn phys(mock: io::Mock) -> PhysLayer {
        PhysLayer::from_stream(mock, 115200)
    }

    #[test]
    fn errors_when_reading_too_many_bytes() {
        let mut buffer = ReadBuffer::new(10);
        assert_eq!(
            buffer.read_u8(),
            Err(InternalError::InsufficientBytesForRead(1, 0))
        );
        assert_eq!(
            buffer.read(1),
            Err(InternalError::InsufficientBytesForRead(1, 0))
        );
    }

    #[tokio::test]
    async fn shifts_contents_when_buffer_at_capacity() {
        let mut buffer = ReadBuffer::new(3);
        let mut io = phys(
            io::Builder::new()
                .read(&[0x01, 0x02, 0x03])
                .read(&[0x04, 0x05])
                .build(),
        );
        let level = PhysDecodeLevel::Nothing;
        assert_eq!(buffer.read_some(&mut io, level).await.unwrap(), 3);
        assert_eq!(buffer.read(2).unwrap(), &[0x01, 0x02]);
        assert_eq!(buffer.read_some(&mut io, level).await.unwrap(), 2);
        assert_eq!(buffer.read(3).unwrap(), &[0x03, 0x04, 0x05]);
    }

    #[tokio::test]
    async fn end_of_stream_is_an_error() {
        let mut buffer = ReadBuffer::new(8);
        let mut io = phys(io::Builder::new().build());
        let err = buffer
            .read_some(&mut io, PhysDecodeLevel::Nothing)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn reads_little_endian_crc_and_peeks() {
        let mut buffer = ReadBuffer::new(8);
        let mut io = phys(io::Builder::new().read(&[0x11, 0x22, 0x33]).build());
        buffer
            .read_some(&mut io, PhysDecodeLevel::Nothing)
            .await
            .unwrap();
        assert_eq!(buffer.peek_at(2), Ok(0x33));
        assert_eq!(buffer.read_u16_le(), Ok(0x2211));
        assert_eq!(buffer.len(), 1);
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
