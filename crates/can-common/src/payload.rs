//! Cursor-style access to fixed 8-byte CAN payloads.

use crate::{CAN_MAX_DLC, CanCommonError, CanCommonResult};

/// Sequential reader over a CAN payload.
///
/// Multi-byte reads are little-endian, matching the OSCC firmware targets.
pub struct PayloadReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn take<const N: usize>(&mut self) -> CanCommonResult<[u8; N]> {
        let end = self.position.saturating_add(N);
        let bytes = self
            .buffer
            .get(self.position..end)
            .ok_or(CanCommonError::PayloadOverrun {
                offset: self.position,
                len: N,
                capacity: self.buffer.len(),
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.position = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> CanCommonResult<u8> {
        let [value] = self.take::<1>()?;
        Ok(value)
    }

    pub fn read_u16_le(&mut self) -> CanCommonResult<u16> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    /// Skip `count` bytes, typically a reserved field.
    ///
    /// # Errors
    ///
    /// Returns [`CanCommonError::PayloadOverrun`] if fewer than `count` bytes
    /// remain.
    pub fn skip(&mut self, count: usize) -> CanCommonResult<()> {
        if count > self.remaining() {
            return Err(CanCommonError::PayloadOverrun {
                offset: self.position,
                len: count,
                capacity: self.buffer.len(),
            });
        }
        self.position = self.position.saturating_add(count);
        Ok(())
    }
}

/// Sequential writer into a zero-initialised 8-byte payload.
///
/// Skipped bytes stay zero, which is how reserved fields are transmitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadWriter {
    buffer: [u8; CAN_MAX_DLC],
    position: usize,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    fn put(&mut self, bytes: &[u8]) -> CanCommonResult<&mut Self> {
        let end = self.position.saturating_add(bytes.len());
        let dst = self
            .buffer
            .get_mut(self.position..end)
            .ok_or(CanCommonError::PayloadOverrun {
                offset: self.position,
                len: bytes.len(),
                capacity: CAN_MAX_DLC,
            })?;
        dst.copy_from_slice(bytes);
        self.position = end;
        Ok(self)
    }

    pub fn write_u8(&mut self, value: u8) -> CanCommonResult<&mut Self> {
        self.put(&[value])
    }

    pub fn write_u16_le(&mut self, value: u16) -> CanCommonResult<&mut Self> {
        self.put(&value.to_le_bytes())
    }

    /// Leave `count` bytes at zero.
    ///
    /// # Errors
    ///
    /// Returns [`CanCommonError::PayloadOverrun`] if the payload has fewer than
    /// `count` bytes left.
    pub fn reserve(&mut self, count: usize) -> CanCommonResult<&mut Self> {
        if count > CAN_MAX_DLC.saturating_sub(self.position) {
            return Err(CanCommonError::PayloadOverrun {
                offset: self.position,
                len: count,
                capacity: CAN_MAX_DLC,
            });
        }
        self.position = self.position.saturating_add(count);
        Ok(self)
    }

    /// Finish the payload. Unwritten trailing bytes are zero.
    pub fn into_inner(self) -> [u8; CAN_MAX_DLC] {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}
