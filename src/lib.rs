//! # openloop: open-loop transit card block codec
//!
//! Encodes and decodes the two fixed 96-byte data areas carried by open-loop
//! transit cards:
//!
//! - **CSA** (Common Service Area): general data, the last validation, a four-entry
//!   transaction log and seven RFU bytes. Readable by any compliant terminal.
//! - **OSA** (Operator Service Area): operator-private general data, a validation
//!   record, a two-entry history and two trip passes.
//!
//! ## Wire rules
//!
//! - Multi-byte integers are big-endian; sub-byte fields are packed MSB-first.
//! - Transaction times are 24-bit *minute* offsets from the card's effective date
//!   ([`EffectiveDate`]). The effective date is never serialized, so every time-aware
//!   record, history buffer and container takes it at construction and at `parse`.
//!   Decoding with a different effective date silently shifts every timestamp.
//! - Trip-pass times are absolute 24-bit *seconds* since the Unix epoch.
//!
//! ## Usage
//!
//! ```
//! use openloop::{csa, EffectiveDate, LanguageCode};
//!
//! let effective = EffectiveDate::from_minutes(28_399_680);
//! let mut card = csa::Container::new(effective);
//! card.general_mut().set_version(1, 2, 3)?;
//! card.general_mut().set_language(LanguageCode::Hindi)?;
//! card.update_validation(|v| v.set_date_and_time(1_735_689_600_000))?;
//!
//! let bytes = card.to_bytes()?;
//! assert_eq!(bytes.len(), csa::Container::TOTAL_SIZE);
//! assert_eq!(csa::Container::parse(&bytes, effective)?, card);
//! # Ok::<(), openloop::CodecError>(())
//! ```
//!
//! The `card_dump` binary decodes raw or hex block files and prints the [`dump`] text.

pub mod codec;
pub mod csa;
pub mod dump;
pub mod history;
pub mod osa;
pub mod terminal;
pub mod time;
pub mod types;

pub use codec::{BitReader, BitWriter, CodecError, FieldReader, FieldWriter};
pub use dump::{format_utc_millis, hex_string, parse_hex};
pub use history::{HistoryBuffer, HistoryRecord};
pub use terminal::Terminal;
pub use time::{absolute_from_offset, offset_from_absolute, EffectiveDate};
pub use types::{LanguageCode, ServiceStatus, TxnStatus, Version};
