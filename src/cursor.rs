use std::fmt;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("read of {want} byte(s) at offset {offset} exceeds window of {len} byte(s)")]
    OutOfBounds { offset: usize, want: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, CursorError>;

/// Bounds-checked big-endian reader over an immutable byte window.
///
/// Every accessor either returns the value or `CursorError::OutOfBounds`;
/// nothing is silently truncated. Offsets reported in errors and by
/// [`ByteCursor::pos`] are relative to the window start.
#[derive(Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// A fresh cursor over `buf[start..end]`, clamped to the buffer.
    pub fn window(buf: &'a [u8], start: usize, end: usize) -> Self {
        let end = end.min(buf.len());
        let start = start.min(end);
        Self { buf: &buf[start..end], pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(CursorError::OutOfBounds {
                offset: self.pos,
                want: n,
                len: self.buf.len(),
            });
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    /// 24-bit big-endian read, widened to u32 (used by FullBox flags and
    /// descriptor buffer sizes).
    pub fn read_u24(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(((b[0] as u32) << 16) | ((b[1] as u32) << 8) | (b[2] as u32))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn read_fourcc(&mut self) -> Result<[u8; 4]> {
        Ok(self.take(4)?.try_into().unwrap())
    }

    /// Fixed-length field interpreted as ASCII; non-printable bytes become '.'.
    pub fn read_ascii(&mut self, n: usize) -> Result<String> {
        let bytes = self.take(n)?;
        Ok(printable_ascii(bytes))
    }

    /// Null-terminated string, bounded by `max` bytes to prevent unbounded
    /// scans on malformed input. Consumes the terminator when present.
    pub fn read_cstring(&mut self, max: usize) -> Result<String> {
        let avail = self.remaining().min(max);
        let window = &self.buf[self.pos..self.pos + avail];
        let end = window.iter().position(|&b| b == 0).unwrap_or(avail);
        let s = printable_ascii(&window[..end]);
        self.pos += end;
        if end < avail {
            self.pos += 1; // terminator
        }
        Ok(s)
    }

    /// First occurrence of `pattern` at or after `from`, relative to the
    /// window start. Used to locate the brand and movie-header boxes when
    /// absolute offsets are unknown.
    pub fn find(&self, pattern: &[u8], from: usize) -> Option<usize> {
        if pattern.is_empty() || from >= self.buf.len() {
            return None;
        }
        self.buf[from..]
            .windows(pattern.len())
            .position(|w| w == pattern)
            .map(|p| p + from)
    }
}

impl fmt::Debug for ByteCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteCursor(pos={}, len={})", self.pos, self.buf.len())
    }
}

pub(crate) fn printable_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
        .collect()
}
