//! Bounds-checked big-endian byte reader for SMF chunks

use crate::error::{Result, RiffError};

/// Longest variable-length quantity the format allows
const MAX_VLQ_BYTES: usize = 4;

/// A read position over an immutable byte buffer.
///
/// Fixed-width reads fail with [`RiffError::UnexpectedEndOfData`] when the
/// buffer runs out. `peek_u8`, `skip` and `read_chunk_id` never fail.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` in the original file, for error reporting
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Current position relative to the start of this cursor's buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Current position relative to the start of the file
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn end_of_data(&self, needed: usize) -> RiffError {
        RiffError::UnexpectedEndOfData {
            offset: self.absolute_position(),
            needed: needed - self.remaining(),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(b)
            }
            None => Err(self.end_of_data(1)),
        }
    }

    /// Next byte without advancing, or `None` at end of buffer
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let bytes = self.read_array::<2>()?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(self.end_of_data(N));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Read a MIDI variable-length quantity.
    ///
    /// Seven data bits per byte, most significant group first; a clear high
    /// bit terminates. At most four bytes are consumed.
    pub fn read_var_length(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..MAX_VLQ_BYTES {
            let b = self.read_u8()?;
            value = (value << 7) | (b & 0x7F) as u32;
            if b & 0x80 == 0 {
                break;
            }
        }
        Ok(value)
    }

    /// Advance by `n` bytes, stopping at the end of the buffer.
    /// Returns the number of bytes actually skipped.
    pub fn skip(&mut self, n: usize) -> usize {
        let step = n.min(self.remaining());
        self.pos += step;
        step
    }

    /// Read a 4-byte chunk tag. Returns `None` without consuming anything
    /// when fewer than 4 bytes remain.
    pub fn read_chunk_id(&mut self) -> Option<[u8; 4]> {
        self.read_array::<4>().ok()
    }

    /// Split off the next `len` bytes (clamped to what remains) as a bounded
    /// cursor and advance past them.
    pub fn take(&mut self, len: usize) -> ByteCursor<'a> {
        let start = self.pos;
        let taken = self.skip(len);
        ByteCursor {
            data: &self.data[start..start + taken],
            pos: 0,
            base: self.base + start,
        }
    }
}

/// Printable form of a chunk tag for error messages
pub fn describe_chunk_id(id: Option<[u8; 4]>) -> String {
    match id {
        Some(bytes) => match std::str::from_utf8(&bytes) {
            Ok(s) if s.chars().all(|c| c.is_ascii_graphic()) => format!("\"{}\"", s),
            _ => format!("{:02X?}", bytes),
        },
        None => "end of data".to_string(),
    }
}
