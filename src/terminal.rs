//! Terminal identity: which acquirer, operator and device produced a transaction.

use crate::codec::{check_width, expect_len, CodecError, FieldReader, FieldWriter};

/// 6-byte terminal record: `acquirer(1) | operator(2) | terminal(3)`, big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Terminal {
    acquirer_id: u8,
    operator_id: u16,
    terminal_id: u32,
}

impl Terminal {
    pub const SIZE: usize = 6;
    pub const TERMINAL_ID_HEX_LEN: usize = 6;
    pub const TERMINAL_ID_BITS: u32 = 24;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_acquirer_id(&mut self, id: u8) {
        self.acquirer_id = id;
    }

    pub fn set_operator_id(&mut self, id: u16) {
        self.operator_id = id;
    }

    /// Set the terminal id from exactly six hex digits (case-insensitive).
    pub fn set_terminal_id(&mut self, hex_id: &str) -> Result<(), CodecError> {
        if hex_id.len() != Self::TERMINAL_ID_HEX_LEN {
            return Err(CodecError::InvalidFormat(format!(
                "terminal id must be exactly {} hex characters, got {:?}",
                Self::TERMINAL_ID_HEX_LEN,
                hex_id
            )));
        }
        if !hex_id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CodecError::InvalidFormat(format!(
                "terminal id {:?} contains non-hex characters",
                hex_id
            )));
        }
        let value = u32::from_str_radix(hex_id, 16)
            .map_err(|e| CodecError::InvalidFormat(format!("terminal id {:?}: {}", hex_id, e)))?;
        self.terminal_id = value;
        Ok(())
    }

    pub fn set_terminal_id_value(&mut self, id: u32) -> Result<(), CodecError> {
        self.terminal_id = check_width("terminal id", id, Self::TERMINAL_ID_BITS)?;
        Ok(())
    }

    pub fn acquirer_id(&self) -> u8 {
        self.acquirer_id
    }

    pub fn operator_id(&self) -> u16 {
        self.operator_id
    }

    /// Uppercase, zero-padded to six digits.
    pub fn terminal_id(&self) -> String {
        format!("{:06X}", self.terminal_id)
    }

    pub fn terminal_id_value(&self) -> u32 {
        self.terminal_id
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        expect_len("terminal", bytes, Self::SIZE)?;
        Self::read(&mut FieldReader::new(bytes))
    }

    pub(crate) fn read(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Terminal {
            acquirer_id: r.read_u8()?,
            operator_id: r.read_u16()?,
            terminal_id: r.read_u24()?,
        })
    }

    pub(crate) fn write(&self, w: &mut FieldWriter) {
        w.put_u8(self.acquirer_id);
        w.put_u16(self.operator_id);
        w.put_u24(self.terminal_id);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = FieldWriter::with_capacity(Self::SIZE);
        self.write(&mut w);
        w.into_bytes()
    }
}
