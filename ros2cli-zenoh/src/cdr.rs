//! Minimal XCDR1 little-endian codec.
//!
//! Only what the fixed lifecycle, parameter, composition and action
//! introspection messages need: primitives, strings, sequences and nested
//! structs. Alignment is relative to the first byte after the 4-byte
//! encapsulation header, as in Fast-CDR's plain CDR mode.

use crate::error::{Error, Result};

/// Encapsulation header for plain CDR, little endian.
pub const CDR_LE_HEADER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

const HEADER_LEN: usize = CDR_LE_HEADER.len();

/// Types that can be written as CDR.
pub trait CdrEncode {
    /// Append `self` to the writer.
    fn encode(&self, w: &mut CdrWriter);
}

/// Types that can be read from CDR.
pub trait CdrDecode: Sized {
    /// Read a value from the reader.
    fn decode(r: &mut CdrReader<'_>) -> Result<Self>;
}

/// Serialize a value with its encapsulation header.
pub fn to_cdr<T: CdrEncode>(value: &T) -> Vec<u8> {
    let mut w = CdrWriter::new();
    value.encode(&mut w);
    w.finish()
}

/// Deserialize a value from an encapsulated buffer.
pub fn from_cdr<T: CdrDecode>(bytes: &[u8]) -> Result<T> {
    let mut r = CdrReader::new(bytes)?;
    T::decode(&mut r)
}

/// CDR serializer.
#[derive(Debug, Clone)]
pub struct CdrWriter {
    buf: Vec<u8>,
}

impl Default for CdrWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CdrWriter {
    /// New writer holding only the encapsulation header.
    pub fn new() -> Self {
        Self {
            buf: CDR_LE_HEADER.to_vec(),
        }
    }

    fn align(&mut self, n: usize) {
        while (self.buf.len() - HEADER_LEN) % n != 0 {
            self.buf.push(0);
        }
    }

    /// Write a `uint8`/`byte`/`char`.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Write an `int8`.
    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    /// Write a `bool`.
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// Write a `uint32`.
    pub fn write_u32(&mut self, v: u32) {
        self.align(4);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write an `int32`.
    pub fn write_i32(&mut self, v: i32) {
        self.align(4);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a `uint64`.
    pub fn write_u64(&mut self, v: u64) {
        self.align(8);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write an `int64`.
    pub fn write_i64(&mut self, v: i64) {
        self.align(8);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a `float64`.
    pub fn write_f64(&mut self, v: f64) {
        self.align(8);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a string: length including the terminating NUL, bytes, NUL.
    pub fn write_string(&mut self, s: &str) {
        self.write_len(s.len() + 1);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    fn write_len(&mut self, len: usize) {
        self.write_u32(len as u32);
    }

    /// Write a `uint8[]` sequence.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    /// Write a sequence of encodable elements.
    pub fn write_seq<T: CdrEncode>(&mut self, items: &[T]) {
        self.write_len(items.len());
        for item in items {
            item.encode(self);
        }
    }

    /// Write a sequence element by element with a custom writer.
    pub fn write_seq_with<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        self.write_len(items.len());
        for item in items {
            f(self, item);
        }
    }

    /// Finish and return the encapsulated buffer.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// CDR deserializer over a borrowed buffer.
#[derive(Debug)]
pub struct CdrReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CdrReader<'a> {
    /// Check the encapsulation header and position after it.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Cdr(format!(
                "buffer too short for encapsulation header: {} bytes",
                data.len()
            )));
        }
        if data[1] != CDR_LE_HEADER[1] {
            return Err(Error::Cdr(format!(
                "unsupported encapsulation {:#04x}{:02x}",
                data[0], data[1]
            )));
        }
        Ok(Self {
            data,
            pos: HEADER_LEN,
        })
    }

    fn align(&mut self, n: usize) {
        let offset = (self.pos - HEADER_LEN) % n;
        if offset != 0 {
            self.pos += n - offset;
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            return Err(Error::Cdr(format!(
                "unexpected end of buffer: need {n} bytes at offset {}, have {}",
                self.pos,
                self.data.len()
            )));
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Read a `uint8`.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read an `int8`.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a `bool`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a `uint32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.align(4);
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read an `int32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.align(4);
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a `uint64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.align(8);
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Read an `int64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.align(8);
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    /// Read a `float64`.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.align(8);
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u32()? as usize;
        if len > self.data.len() {
            return Err(Error::Cdr(format!("sequence length {len} exceeds buffer")));
        }
        Ok(len)
    }

    /// Read a string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.take(len)?;
        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Cdr(format!("invalid string: {e}")))
    }

    /// Read a `uint8[]` sequence.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a fixed-size `uint8[N]` array.
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.take_array()
    }

    /// Read a sequence of decodable elements.
    pub fn read_seq<T: CdrDecode>(&mut self) -> Result<Vec<T>> {
        self.read_seq_with(T::decode)
    }

    /// Read a sequence element by element with a custom reader.
    pub fn read_seq_with<T>(
        &mut self,
        mut f: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let len = self.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(f(self)?);
        }
        Ok(items)
    }
}

impl CdrEncode for String {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_string(self);
    }
}

impl CdrDecode for String {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        r.read_string()
    }
}

/// Empty request or response (`structure_needs_at_least_one_member`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Empty;

impl CdrEncode for Empty {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_u8(0);
    }
}

impl CdrDecode for Empty {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        r.read_u8()?;
        Ok(Self)
    }
}
