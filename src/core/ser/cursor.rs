// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read/write cursors over a byte buffer, network (big-endian) byte order.
//!
//! OTP is defined entirely in network byte order (spec §4.A); no host
//! endianness leaks past this module. Popping past the end leaves the
//! cursor's offset unchanged and returns [`WireError::Truncated`] rather
//! than panicking.

use crate::error::WireError;

/// Generate bounds-checked big-endian write methods (mirrors the read macro
/// below so the two stay in lockstep).
macro_rules! impl_write_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self, value: $type) -> Result<(), WireError> {
            if self.offset + $size > self.buffer.len() {
                return Err(WireError::Overflow {
                    offset: self.offset,
                    needed: $size,
                    len: self.buffer.len(),
                });
            }
            let bytes = value.to_be_bytes();
            self.buffer[self.offset..self.offset + $size].copy_from_slice(&bytes);
            self.offset += $size;
            Ok(())
        }
    };
}

/// Generate bounds-checked big-endian read methods.
macro_rules! impl_read_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, WireError> {
            if self.offset + $size > self.buffer.len() {
                return Err(WireError::Truncated {
                    offset: self.offset,
                    needed: $size,
                    len: self.buffer.len(),
                });
            }
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(&self.buffer[self.offset..self.offset + $size]);
            self.offset += $size;
            Ok(<$type>::from_be_bytes(bytes))
        }
    };
}

/// Mutable cursor for encoding (bounds-checked, zero-copy).
pub struct CursorMut<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> CursorMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_write_be!(write_u8, u8, 1);
    impl_write_be!(write_i8, i8, 1);
    impl_write_be!(write_u16, u16, 2);
    impl_write_be!(write_i16, i16, 2);
    impl_write_be!(write_u32, u32, 4);
    impl_write_be!(write_i32, i32, 4);
    impl_write_be!(write_u64, u64, 8);
    impl_write_be!(write_i64, i64, 8);

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), WireError> {
        if self.offset + data.len() > self.buffer.len() {
            return Err(WireError::Overflow {
                offset: self.offset,
                needed: data.len(),
                len: self.buffer.len(),
            });
        }
        self.buffer[self.offset..self.offset + data.len()].copy_from_slice(data);
        self.offset += data.len();
        Ok(())
    }

    /// Write `len` zero bytes (padding / reserved fields).
    pub fn write_zeros(&mut self, len: usize) -> Result<(), WireError> {
        if self.offset + len > self.buffer.len() {
            return Err(WireError::Overflow {
                offset: self.offset,
                needed: len,
                len: self.buffer.len(),
            });
        }
        for b in &mut self.buffer[self.offset..self.offset + len] {
            *b = 0;
        }
        self.offset += len;
        Ok(())
    }

    /// Write a 16-octet RFC-4122 UUID in its standard wire form.
    pub fn write_uuid(&mut self, bytes: &[u8; 16]) -> Result<(), WireError> {
        self.write_bytes(bytes)
    }

    /// Write a fixed-width `width`-octet name field, UTF-8, null-padded on
    /// the right, truncated at a rune boundary if the source is too long.
    pub fn write_name(&mut self, name: &str, width: usize) -> Result<(), WireError> {
        if self.offset + width > self.buffer.len() {
            return Err(WireError::Overflow {
                offset: self.offset,
                needed: width,
                len: self.buffer.len(),
            });
        }
        let truncated = truncate_at_rune_boundary(name, width);
        let dst = &mut self.buffer[self.offset..self.offset + width];
        dst.fill(0);
        dst[..truncated.len()].copy_from_slice(truncated.as_bytes());
        self.offset += width;
        Ok(())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    /// Overwrite a previously-written region (used to patch in PDULength
    /// once a layer's payload size is known).
    pub fn patch_u16(&mut self, at: usize, value: u16) -> Result<(), WireError> {
        if at + 2 > self.buffer.len() {
            return Err(WireError::Overflow { offset: at, needed: 2, len: self.buffer.len() });
        }
        self.buffer[at..at + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

/// Truncate a UTF-8 string to at most `max_len` octets without splitting a
/// multi-byte rune (spec §3, `Name` truncation rule).
pub fn truncate_at_rune_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Read-only cursor for decoding.
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_be!(read_u8, u8, 1);
    impl_read_be!(read_i8, i8, 1);
    impl_read_be!(read_u16, u16, 2);
    impl_read_be!(read_i16, i16, 2);
    impl_read_be!(read_u32, u32, 4);
    impl_read_be!(read_i32, i32, 4);
    impl_read_be!(read_u64, u64, 8);
    impl_read_be!(read_i64, i64, 8);

    /// Peek `n` bytes ahead without advancing the cursor (used to read a
    /// Module's `PDULength` before deciding how much of the buffer belongs
    /// to it - spec §4.B.4).
    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8], WireError> {
        if self.offset + n > self.buffer.len() {
            return Err(WireError::Truncated { offset: self.offset, needed: n, len: self.buffer.len() });
        }
        Ok(&self.buffer[self.offset..self.offset + n])
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let out = self.peek_bytes(n)?;
        self.offset += n;
        Ok(out)
    }

    pub fn read_uuid(&mut self) -> Result<[u8; 16], WireError> {
        let mut out = [0u8; 16];
        out.copy_from_slice(self.read_bytes(16)?);
        Ok(out)
    }

    /// Read a fixed-width name field, stopping at the first NUL (or the
    /// field width if unterminated), returning a lossy UTF-8 string. On
    /// truncation failure the cursor is left defined (offset still
    /// advanced) so the caller's position tracking stays correct.
    pub fn read_name(&mut self, width: usize) -> Result<String, WireError> {
        let bytes = self.read_bytes(width)?;
        let nul = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..nul]).into_owned())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), WireError> {
        if self.offset + n > self.buffer.len() {
            return Err(WireError::Truncated { offset: self.offset, needed: n, len: self.buffer.len() });
        }
        self.offset += n;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_primitives() {
        let mut buf = [0u8; 32];
        {
            let mut w = CursorMut::new(&mut buf);
            w.write_u16(0x0102).unwrap();
            w.write_u32(0xDEADBEEF).unwrap();
            w.write_i32(-1).unwrap();
            w.write_u64(0x0102030405060708).unwrap();
        }
        let mut r = Cursor::new(&buf);
        assert_eq!(r.read_u16().unwrap(), 0x0102);
        assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(r.read_i32().unwrap(), -1);
        assert_eq!(r.read_u64().unwrap(), 0x0102030405060708);
    }

    #[test]
    fn pop_past_end_is_defined_failure() {
        let buf = [0u8; 2];
        let mut r = Cursor::new(&buf);
        assert!(r.read_u32().is_err());
        // cursor position did not advance on failure
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn name_field_is_null_padded_and_fixed_width() {
        let mut buf = [0xFFu8; 32];
        let mut w = CursorMut::new(&mut buf);
        w.write_name("hello", 32).unwrap();
        assert_eq!(&buf[..5], b"hello");
        assert!(buf[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn name_truncates_at_rune_boundary() {
        // 28 ascii octets + one 4-byte rune (U+1F600) = 32 octets total, 33rd would split it.
        let mut s = "a".repeat(29);
        s.push('\u{1F600}'); // 4-byte rune, pushes total to 33 octets
        assert_eq!(s.len(), 33);
        let truncated = truncate_at_rune_boundary(&s, 32);
        // must not include a partial rune: 29 'a's = 29 octets fit, rune (4 bytes) doesn't
        assert_eq!(truncated.len(), 29);
        assert!(truncated.is_char_boundary(truncated.len()));
    }

    #[test]
    fn uuid_roundtrip() {
        let id = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        let mut buf = [0u8; 16];
        CursorMut::new(&mut buf).write_uuid(&id).unwrap();
        assert_eq!(Cursor::new(&buf).read_uuid().unwrap(), id);
    }
}
