//! Card time encodings.
//!
//! Transaction records store a 24-bit *minute* offset from the card's effective date
//! (itself minutes since the Unix epoch, never serialized). Trip passes instead store
//! 24-bit *seconds* since the epoch. Callers always deal in milliseconds since the epoch.

use crate::codec::CodecError;
use std::fmt;

pub const MILLIS_PER_SECOND: u64 = 1_000;
pub const MILLIS_PER_MINUTE: u64 = 60_000;

/// Largest value of any 24-bit time field.
pub const TIME_FIELD_MAX: u32 = 0x00FF_FFFF;

/// Card-specific epoch, in whole minutes since the Unix epoch.
///
/// Every relative timestamp on a card is meaningless without the matching effective date,
/// so records that carry one take it at construction and keep it for their lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EffectiveDate(u64);

impl EffectiveDate {
    pub const fn from_minutes(minutes: u64) -> Self {
        EffectiveDate(minutes)
    }

    /// Truncates to the containing minute.
    pub const fn from_millis(ms: u64) -> Self {
        EffectiveDate(ms / MILLIS_PER_MINUTE)
    }

    pub const fn minutes(self) -> u64 {
        self.0
    }

    pub const fn as_millis(self) -> u64 {
        self.0.saturating_mul(MILLIS_PER_MINUTE)
    }
}

impl From<u64> for EffectiveDate {
    fn from(minutes: u64) -> Self {
        EffectiveDate(minutes)
    }
}

impl fmt::Display for EffectiveDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.0)
    }
}

/// Minute offset of `absolute_ms` from `effective_date`.
///
/// Fails if the instant precedes the effective date or lies more than `0xFFFFFF` minutes after it.
pub fn offset_from_absolute(effective_date: EffectiveDate, absolute_ms: u64) -> Result<u32, CodecError> {
    let minutes = absolute_ms / MILLIS_PER_MINUTE;
    let diff = minutes.checked_sub(effective_date.minutes()).ok_or_else(|| {
        CodecError::Range(format!(
            "transaction time ({} min) cannot be before the card effective date ({})",
            minutes, effective_date
        ))
    })?;
    if diff > TIME_FIELD_MAX as u64 {
        return Err(CodecError::Range(format!(
            "transaction time is {} min after the effective date, beyond the 24-bit limit",
            diff
        )));
    }
    Ok(diff as u32)
}

/// Absolute milliseconds for a stored minute offset.
pub fn absolute_from_offset(effective_date: EffectiveDate, offset: u32) -> u64 {
    effective_date
        .minutes()
        .saturating_add(offset as u64)
        .saturating_mul(MILLIS_PER_MINUTE)
}

/// Whole seconds since the epoch for a 24-bit absolute field.
pub fn seconds24_from_millis(field: &str, ms: u64) -> Result<u32, CodecError> {
    let seconds = ms / MILLIS_PER_SECOND;
    if seconds > TIME_FIELD_MAX as u64 {
        return Err(CodecError::Range(format!(
            "{} ({} s) exceeds the 24-bit storage limit",
            field, seconds
        )));
    }
    Ok(seconds as u32)
}

pub fn millis_from_seconds24(seconds: u32) -> u64 {
    (seconds & TIME_FIELD_MAX) as u64 * MILLIS_PER_SECOND
}
