//! Little-endian byte cursor used to unpack an instruction's argument tuple.
//!
//! GBC's encoding is byte-aligned, so this is a plain slice-and-advance
//! reader: a borrowed buffer plus an offset, with `read_*` methods that
//! advance on success and leave the cursor untouched on failure.

use crate::error::Error;

pub struct Cursor<'input> {
    buffer: &'input [u8],
    address: u32,
    offset: usize,
}

impl<'input> Cursor<'input> {
    /// Creates a cursor starting at `address` within `buffer`, which must be
    /// at least `address` bytes long.
    pub fn new(buffer: &'input [u8], address: u32) -> Self {
        Self {
            buffer,
            address,
            offset: address as usize,
        }
    }

    /// Bytes consumed since construction.
    pub fn consumed(&self) -> usize {
        self.offset - self.address as usize
    }

    fn take(&mut self, n: usize) -> Result<&'input [u8], Error> {
        let end = self.offset + n;
        let slice = self
            .buffer
            .get(self.offset..end)
            .ok_or(Error::TruncatedArgument {
                address: self.address,
            })?;
        self.offset = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16_le(&mut self) -> Result<i16, Error> {
        Ok(self.read_u16_le()? as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_le_values_in_order() {
        let data = [0xAA, 0x01, 0x2A, 0x00];
        let mut c = Cursor::new(&data, 0);
        assert_eq!(c.read_u8().unwrap(), 0xAA);
        assert_eq!(c.read_i16_le().unwrap(), 42);
        assert_eq!(c.consumed(), 3);
    }

    #[test]
    fn truncated_read_errors_without_advancing() {
        let data = [0x00];
        let mut c = Cursor::new(&data, 0);
        assert!(c.read_u16_le().is_err());
        assert_eq!(c.consumed(), 0);
    }

    #[test]
    fn starts_at_given_address() {
        let data = [0x00, 0x00, 0x2A];
        let mut c = Cursor::new(&data, 2);
        assert_eq!(c.read_u8().unwrap(), 0x2A);
    }
}
