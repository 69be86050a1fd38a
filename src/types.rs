//! Small enumerated fields shared by the CSA and OSA layouts.

use crate::codec::{check_width, CodecError};
use std::fmt;

/// Data-format version packed into one byte as `major(3) | minor(3) | patch(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    major: u8,
    minor: u8,
    patch: u8,
}

impl Version {
    pub const MAJOR_MAX: u8 = 7;
    pub const MINOR_MAX: u8 = 7;
    pub const PATCH_MAX: u8 = 3;

    pub fn new(major: u8, minor: u8, patch: u8) -> Result<Self, CodecError> {
        if major > Self::MAJOR_MAX {
            return Err(CodecError::Range("major version must be in the range [0, 7]".into()));
        }
        if minor > Self::MINOR_MAX {
            return Err(CodecError::Range("minor version must be in the range [0, 7]".into()));
        }
        if patch > Self::PATCH_MAX {
            return Err(CodecError::Range("patch version must be in the range [0, 3]".into()));
        }
        Ok(Version { major, minor, patch })
    }

    pub fn from_byte(b: u8) -> Self {
        Version {
            major: (b >> 5) & 0x07,
            minor: (b >> 2) & 0x07,
            patch: b & 0x03,
        }
    }

    pub fn to_byte(self) -> u8 {
        (self.major << 5) | (self.minor << 2) | self.patch
    }

    pub fn major(self) -> u8 {
        self.major
    }

    pub fn minor(self) -> u8 {
        self.minor
    }

    pub fn patch(self) -> u8 {
        self.patch
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 5-bit card language code. Codes `0b10111..=0b11111` are reserved and kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LanguageCode {
    #[default]
    English,
    Hindi,
    Bengali,
    Marathi,
    Telugu,
    Tamil,
    Gujarati,
    Urdu,
    Kannada,
    Odia,
    Malayalam,
    Punjabi,
    Sanskrit,
    Assamese,
    Maithili,
    Santali,
    Kashmiri,
    Nepali,
    Sindhi,
    Dogri,
    Konkani,
    Manipuri,
    Bodo,
    Reserved(u8),
}

const NAMED_LANGUAGES: [LanguageCode; 23] = [
    LanguageCode::English,
    LanguageCode::Hindi,
    LanguageCode::Bengali,
    LanguageCode::Marathi,
    LanguageCode::Telugu,
    LanguageCode::Tamil,
    LanguageCode::Gujarati,
    LanguageCode::Urdu,
    LanguageCode::Kannada,
    LanguageCode::Odia,
    LanguageCode::Malayalam,
    LanguageCode::Punjabi,
    LanguageCode::Sanskrit,
    LanguageCode::Assamese,
    LanguageCode::Maithili,
    LanguageCode::Santali,
    LanguageCode::Kashmiri,
    LanguageCode::Nepali,
    LanguageCode::Sindhi,
    LanguageCode::Dogri,
    LanguageCode::Konkani,
    LanguageCode::Manipuri,
    LanguageCode::Bodo,
];

impl LanguageCode {
    pub const BITS: u32 = 5;
    pub const RESERVED_START: u8 = 0b10111;

    /// Decode from the low five bits of `raw`.
    pub fn from_bits(raw: u8) -> Self {
        let code = raw & 0x1F;
        NAMED_LANGUAGES
            .get(code as usize)
            .copied()
            .unwrap_or(LanguageCode::Reserved(code))
    }

    pub fn bits(self) -> u8 {
        match self {
            LanguageCode::Reserved(code) => code,
            named => NAMED_LANGUAGES.iter().position(|&l| l == named).unwrap_or(0) as u8,
        }
    }

    /// The form this code takes after a trip through the wire: `Reserved(n)` for a
    /// named slot becomes that language. Codes wider than five bits are rejected.
    pub fn canonical(self) -> Result<Self, CodecError> {
        let code = check_width("language code", self.bits() as u32, Self::BITS)?;
        Ok(Self::from_bits(code as u8))
    }

    pub fn is_reserved(self) -> bool {
        self.bits() >= Self::RESERVED_START
    }

    pub fn name(self) -> &'static str {
        match self {
            LanguageCode::English => "English",
            LanguageCode::Hindi => "Hindi",
            LanguageCode::Bengali => "Bengali",
            LanguageCode::Marathi => "Marathi",
            LanguageCode::Telugu => "Telugu",
            LanguageCode::Tamil => "Tamil",
            LanguageCode::Gujarati => "Gujarati",
            LanguageCode::Urdu => "Urdu",
            LanguageCode::Kannada => "Kannada",
            LanguageCode::Odia => "Odia",
            LanguageCode::Malayalam => "Malayalam",
            LanguageCode::Punjabi => "Punjabi",
            LanguageCode::Sanskrit => "Sanskrit",
            LanguageCode::Assamese => "Assamese",
            LanguageCode::Maithili => "Maithili",
            LanguageCode::Santali => "Santali",
            LanguageCode::Kashmiri => "Kashmiri",
            LanguageCode::Nepali => "Nepali",
            LanguageCode::Sindhi => "Sindhi",
            LanguageCode::Dogri => "Dogri",
            LanguageCode::Konkani => "Konkani",
            LanguageCode::Manipuri => "Manipuri",
            LanguageCode::Bodo => "Bodo",
            LanguageCode::Reserved(_) => "Unknown",
        }
    }
}

/// 4-bit transaction status nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxnStatus {
    Exit,
    #[default]
    Entry,
    Penalty,
    OneTap,
    /// Any other nibble value read from a card.
    Other(u8),
}

impl TxnStatus {
    pub const BITS: u32 = 4;

    pub fn from_bits(raw: u8) -> Self {
        match raw & 0x0F {
            0x0 => TxnStatus::Exit,
            0x1 => TxnStatus::Entry,
            0x2 => TxnStatus::Penalty,
            0x3 => TxnStatus::OneTap,
            other => TxnStatus::Other(other),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            TxnStatus::Exit => 0x0,
            TxnStatus::Entry => 0x1,
            TxnStatus::Penalty => 0x2,
            TxnStatus::OneTap => 0x3,
            TxnStatus::Other(raw) => raw,
        }
    }

    /// `Other(n)` for a named nibble becomes that status; values wider than four
    /// bits are rejected.
    pub fn canonical(self) -> Result<Self, CodecError> {
        let raw = check_width("txn status", self.bits() as u32, Self::BITS)?;
        Ok(Self::from_bits(raw as u8))
    }

    pub fn name(self) -> &'static str {
        match self {
            TxnStatus::Exit => "EXIT",
            TxnStatus::Entry => "ENTRY",
            TxnStatus::Penalty => "PENALTY",
            TxnStatus::OneTap => "ONETAP",
            TxnStatus::Other(_) => "UNKNOWN",
        }
    }
}

/// OSA service status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceStatus {
    #[default]
    Inactive,
    Active,
}

impl ServiceStatus {
    pub fn from_bit(raw: u8) -> Self {
        if raw & 1 != 0 {
            ServiceStatus::Active
        } else {
            ServiceStatus::Inactive
        }
    }

    pub fn bit(self) -> u8 {
        match self {
            ServiceStatus::Inactive => 0,
            ServiceStatus::Active => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ServiceStatus::Inactive => "Inactive",
            ServiceStatus::Active => "Active",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_byte_layout() {
        let v = Version::new(1, 2, 3).unwrap();
        assert_eq!(v.to_byte(), 0b001_010_11);
        assert_eq!(Version::from_byte(0b001_010_11), v);
        assert_eq!(v.to_string(), "1.2.3");
        assert!(matches!(Version::new(0, 0, 4), Err(CodecError::Range(_))));
    }

    #[test]
    fn every_language_code_round_trips() {
        for raw in 0u8..32 {
            assert_eq!(LanguageCode::from_bits(raw).bits(), raw);
        }
    }

    #[test]
    fn reserved_languages_display_unknown() {
        assert_eq!(LanguageCode::from_bits(0b10110), LanguageCode::Bodo);
        let reserved = LanguageCode::from_bits(0b10111);
        assert!(reserved.is_reserved());
        assert_eq!(reserved.name(), "Unknown");
        assert_eq!(LanguageCode::Marathi.bits(), 0b00011);
    }

    #[test]
    fn txn_status_nibbles() {
        assert_eq!(TxnStatus::from_bits(0x3), TxnStatus::OneTap);
        assert_eq!(TxnStatus::from_bits(0x9).bits(), 0x9);
        assert_eq!(TxnStatus::from_bits(0x9).name(), "UNKNOWN");
        assert_eq!(TxnStatus::default(), TxnStatus::Entry);
    }

    #[test]
    fn canonical_folds_aliases_and_rejects_wide_values() {
        assert_eq!(LanguageCode::Reserved(3).canonical().unwrap(), LanguageCode::Marathi);
        assert_eq!(LanguageCode::Reserved(0b11000).canonical().unwrap(), LanguageCode::Reserved(0b11000));
        assert!(matches!(LanguageCode::Reserved(0x20).canonical(), Err(CodecError::Range(_))));
        assert_eq!(TxnStatus::Other(1).canonical().unwrap(), TxnStatus::Entry);
        assert_eq!(TxnStatus::Other(0xA).canonical().unwrap(), TxnStatus::Other(0xA));
        assert!(matches!(TxnStatus::Other(0x13).canonical(), Err(CodecError::Range(_))));
        assert_eq!(TxnStatus::Other(0x13).bits(), 0x13);
    }
}
