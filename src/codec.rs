//! Fixed-width field primitives shared by every block codec.
//!
//! All multi-byte integers on the card are big-endian. Sub-byte fields are packed
//! MSB-first: the first field pushed into a [`BitWriter`] lands in the most
//! significant bits of the first byte.
//!
//! Encoding is partial (a value wider than its field is rejected with
//! [`CodecError::Range`]); decoding is total (excess bits are masked away).

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::{Cursor, Read};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Out of range: {0}")]
    Range(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid length: {what} must be exactly {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Largest unsigned value representable in `bits` bits (`bits` <= 32).
pub const fn max_for_width(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Range-check `value` against a `bits`-wide field.
pub fn check_width(field: &str, value: u32, bits: u32) -> Result<u32, CodecError> {
    let max = max_for_width(bits);
    if value > max {
        return Err(CodecError::Range(format!(
            "{} must be in the range [0, {}], got {}",
            field, max, value
        )));
    }
    Ok(value)
}

/// Fail with [`CodecError::InvalidLength`] unless `bytes` is exactly `expected` long.
pub fn expect_len(what: &'static str, bytes: &[u8], expected: usize) -> Result<(), CodecError> {
    if bytes.len() != expected {
        return Err(CodecError::InvalidLength {
            what,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Big-endian field reader over a borrowed block slice.
pub struct FieldReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> FieldReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        FieldReader {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(self.cursor.read_u16::<BigEndian>()?)
    }

    pub fn read_u24(&mut self) -> Result<u32, CodecError> {
        Ok(self.cursor.read_u24::<BigEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(self.cursor.read_u32::<BigEndian>()?)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut buf = [0u8; N];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Borrow the next `n` bytes without copying (used to hand sub-slices to child parsers).
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        let end = start.checked_add(n).filter(|&end| end <= data.len()).ok_or_else(|| {
            CodecError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "field extends past end of block",
            ))
        })?;
        self.cursor.set_position(end as u64);
        Ok(&data[start..end])
    }

    /// Load `n` (1..=4) bytes as a group of packed sub-byte fields.
    pub fn read_bits(&mut self, n: usize) -> Result<BitReader, CodecError> {
        let bytes = self.take(n)?;
        Ok(BitReader::new(bytes))
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }
}

/// Big-endian field writer appending to an owned buffer.
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    pub fn with_capacity(n: usize) -> Self {
        FieldWriter {
            buf: Vec::with_capacity(n),
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        let mut b = [0u8; 2];
        BigEndian::write_u16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    /// Writes the low 24 bits of `v`.
    pub fn put_u24(&mut self, v: u32) {
        let mut b = [0u8; 3];
        BigEndian::write_u24(&mut b, v & 0x00FF_FFFF);
        self.buf.extend_from_slice(&b);
    }

    pub fn put_u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        BigEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn put_bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub fn put_zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Flush a packed group of sub-byte fields.
    pub fn put_bits(&mut self, bits: BitWriter) -> Result<(), CodecError> {
        let bytes = bits.finish()?;
        self.buf.extend_from_slice(&bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// MSB-first packer for fields narrower than (or straddling) a byte.
///
/// Holds at most 32 bits; a group must end on a byte boundary.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitWriter {
    acc: u64,
    used: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, value: u32, bits: u32) -> Result<(), CodecError> {
        if self.used + bits > 32 {
            return Err(CodecError::InvalidFormat(format!(
                "bit group overflow while packing {} ({} + {} bits)",
                field, self.used, bits
            )));
        }
        let value = check_width(field, value, bits)?;
        self.acc = (self.acc << bits) | value as u64;
        self.used += bits;
        Ok(())
    }

    pub fn is_aligned(&self) -> bool {
        self.used % 8 == 0
    }

    pub fn finish(self) -> Result<Vec<u8>, CodecError> {
        if !self.is_aligned() {
            return Err(CodecError::InvalidFormat(format!(
                "bit group not byte-aligned ({} bits)",
                self.used
            )));
        }
        let n = (self.used / 8) as usize;
        Ok((0..n).rev().map(|i| (self.acc >> (i * 8)) as u8).collect())
    }
}

/// MSB-first unpacker; the counterpart of [`BitWriter`]. Never fails.
#[derive(Clone, Copy, Debug)]
pub struct BitReader {
    acc: u32,
    remaining: u32,
}

impl BitReader {
    /// Takes up to the first four bytes of `bytes`.
    pub fn new(bytes: &[u8]) -> Self {
        let bytes = &bytes[..bytes.len().min(4)];
        let acc = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
        BitReader {
            acc,
            remaining: bytes.len() as u32 * 8,
        }
    }

    /// Next `bits` bits as an unsigned value. Reading past the end yields zero bits.
    pub fn take(&mut self, bits: u32) -> u32 {
        let bits = bits.min(32);
        let available = bits.min(self.remaining);
        let shift = self.remaining - available;
        let value = ((self.acc as u64 >> shift) as u32) & max_for_width(available);
        self.remaining -= available;
        value.checked_shl(bits - available).unwrap_or(0)
    }
}

/// Pack ASCII decimal digits two per byte (first digit of each pair in the high nibble).
pub fn encode_bcd<const N: usize>(field: &str, digits: &str) -> Result<[u8; N], CodecError> {
    let raw = digits.as_bytes();
    if raw.len() != N * 2 {
        return Err(CodecError::InvalidFormat(format!(
            "{} must be exactly {} digits, got {}",
            field,
            N * 2,
            raw.len()
        )));
    }
    if !raw.iter().all(u8::is_ascii_digit) {
        return Err(CodecError::InvalidFormat(format!(
            "{} must contain only digits",
            field
        )));
    }
    let mut out = [0u8; N];
    for (byte, pair) in out.iter_mut().zip(raw.chunks(2)) {
        *byte = ((pair[0] - b'0') << 4) | (pair[1] - b'0');
    }
    Ok(out)
}

/// Unpack BCD bytes into a digit string. Non-decimal nibbles render as hex digits.
pub fn decode_bcd(bytes: &[u8]) -> String {
    bytes
        .iter()
        .flat_map(|b| [b >> 4, b & 0x0F])
        .map(|n| std::char::from_digit(n as u32, 16).map_or('?', |c| c.to_ascii_uppercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_writer_packs_msb_first() {
        let mut bits = BitWriter::new();
        bits.push("major", 1, 3).unwrap();
        bits.push("minor", 2, 3).unwrap();
        bits.push("patch", 3, 2).unwrap();
        assert_eq!(bits.finish().unwrap(), vec![0b001_010_11]);
    }

    #[test]
    fn bit_writer_rejects_wide_value() {
        let mut bits = BitWriter::new();
        let err = bits.push("nibble", 16, 4).unwrap_err();
        assert!(matches!(err, CodecError::Range(_)));
    }

    #[test]
    fn bit_writer_rejects_unaligned_group() {
        let mut bits = BitWriter::new();
        bits.push("x", 1, 3).unwrap();
        assert!(matches!(bits.finish(), Err(CodecError::InvalidFormat(_))));
    }

    #[test]
    fn bit_reader_spans_byte_boundaries() {
        // 20-bit 0x4E20 followed by a 4-bit filler.
        let mut r = BitReader::new(&[0x04, 0xE2, 0x0F]);
        assert_eq!(r.take(20), 0x4E20);
        assert_eq!(r.take(4), 0xF);
    }

    #[test]
    fn field_writer_u24_is_big_endian() {
        let mut w = FieldWriter::with_capacity(3);
        w.put_u24(0x0A0B0C);
        assert_eq!(w.into_bytes(), vec![0x0A, 0x0B, 0x0C]);
    }

    #[test]
    fn field_reader_reads_mixed_widths() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut r = FieldReader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x0203);
        assert_eq!(r.read_u24().unwrap(), 0x040506);
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn bcd_round_trip() {
        let packed: [u8; 5] = encode_bcd("phone", "1234567890").unwrap();
        assert_eq!(packed, [0x12, 0x34, 0x56, 0x78, 0x90]);
        assert_eq!(decode_bcd(&packed), "1234567890");
    }

    #[test]
    fn bcd_rejects_bad_input() {
        assert!(matches!(encode_bcd::<5>("phone", "123"), Err(CodecError::InvalidFormat(_))));
        assert!(matches!(encode_bcd::<5>("phone", "12345678a0"), Err(CodecError::InvalidFormat(_))));
    }
}
