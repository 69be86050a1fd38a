//! Human-readable text dumps of decoded blocks, plus hex helpers for moving raw blocks
//! in and out of text files.
//!
//! Every block type implements [`fmt::Display`]; the container impls nest their children.

use crate::codec::CodecError;
use crate::terminal::Terminal;
use crate::{csa, osa};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::Write;

const RULE: &str = "------------------------------------------------------------";

/// `YYYY-MM-DD HH:MM:SS (UTC)` for a millisecond timestamp.
pub fn format_utc_millis(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| format!("{} (UTC)", t.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_else(|| format!("[out of range: {} ms]", ms))
}

/// Space-separated lowercase hex, e.g. `de ad be ef`.
pub fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Parse hex text into bytes. Whitespace, `:` and `-` separators and a leading `0x` are ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b'-')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CodecError::InvalidFormat(format!(
            "hex input has an odd number of digits ({})",
            digits.len()
        )));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16);
            let lo = (pair[1] as char).to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok(((hi << 4) | lo) as u8),
                _ => Err(CodecError::InvalidFormat(format!(
                    "invalid hex pair {:?}",
                    String::from_utf8_lossy(pair)
                ))),
            }
        })
        .collect()
}

/// Write a block as 16-byte rows prefixed with the offset of the row's first byte.
pub fn write_hex_with_offset(w: &mut dyn Write, block: &[u8]) -> std::io::Result<()> {
    const COLS: usize = 16;
    for (i, chunk) in block.chunks(COLS).enumerate() {
        writeln!(w, "  offset {:3}: {}", i * COLS, hex_string(chunk))?;
    }
    Ok(())
}

fn banner(f: &mut fmt::Formatter<'_>, fill: char, title: &str) -> fmt::Result {
    let pad = RULE.len().saturating_sub(title.len() + 2);
    let left: String = std::iter::repeat(fill).take(pad / 2).collect();
    let right: String = std::iter::repeat(fill).take(pad - pad / 2).collect();
    writeln!(f, "{} {} {}", left, title, right)
}

fn field(f: &mut fmt::Formatter<'_>, label: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(f, "  {:<23}: {}", label, value)
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        field(f, "[TN] ACQUIRER ID", self.acquirer_id())?;
        field(f, "[TN] OPERATOR ID", self.operator_id())?;
        field(f, "[TN] TERMINAL ID", self.terminal_id())
    }
}

impl fmt::Display for csa::General {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, '-', "GENERAL DATA")?;
        field(f, "VERSION", self.version())?;
        field(
            f,
            "LANGUAGE",
            format_args!("{} (0b{:05b})", self.language().name(), self.language().bits()),
        )?;
        field(f, "RFU", self.rfu())?;
        write!(f, "{}", RULE)
    }
}

impl fmt::Display for csa::Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, '-', "VALIDATION DATA")?;
        field(f, "ERROR CODE", self.error_code())?;
        field(f, "PRODUCT TYPE", self.product_type())?;
        write!(f, "{}", self.terminal())?;
        field(f, "DATE AND TIME", format_utc_millis(self.date_and_time()))?;
        field(f, "FARE AMOUNT", self.fare_amount())?;
        field(f, "ROUTE NUMBER", self.route_number())?;
        field(f, "SERVICE PROVIDER DATA", format_args!("0x{}", self.service_provider_data_hex()))?;
        field(f, "TRANSACTION STATUS", self.txn_status().name())?;
        field(f, "RFU (BINARY)", format_args!("{:04b}", self.rfu()))?;
        write!(f, "{}", RULE)
    }
}

impl fmt::Display for csa::LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, '-', "LOG ENTRY")?;
        write!(f, "{}", self.terminal())?;
        field(f, "DATE AND TIME", format_utc_millis(self.date_and_time()))?;
        field(f, "TRANSACTION SQ NO", self.txn_sq_no())?;
        field(f, "TRANSACTION AMOUNT", self.txn_amount())?;
        field(f, "CARD BALANCE", self.card_balance())?;
        field(f, "TRANSACTION STATUS", self.txn_status().name())?;
        field(f, "RFU (BINARY)", format_args!("{:04b}", self.rfu()))?;
        write!(f, "{}", RULE)
    }
}

impl fmt::Display for osa::General {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, '-', "OSA: GENERAL DATA")?;
        field(f, "VERSION", self.version())?;
        field(f, "PHONE NUMBER", self.phone_number())?;
        field(
            f,
            "LANGUAGE",
            format_args!("{} (Code: {})", self.language().name(), self.language().bits()),
        )?;
        field(f, "SERVICE STATUS", self.service_status().name())?;
        field(f, "RFU (BINARY)", format_args!("{:02b}", self.rfu()))?;
        write!(f, "{}", RULE)
    }
}

impl fmt::Display for osa::TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, '-', "OSA: TRANSACTION RECORD")?;
        field(f, "ERROR CODE", self.error_code())?;
        field(f, "PRODUCT TYPE", self.product_type())?;
        field(f, "DATE AND TIME", format_utc_millis(self.date_and_time()))?;
        field(f, "STATION ID", self.station_id())?;
        field(f, "FARE", self.fare())?;
        field(f, "TERMINAL ID", format_args!("0x{:06X}", self.terminal_id()))?;
        field(f, "TRANSACTION STATUS", self.txn_status().name())?;
        field(f, "RFU (BINARY)", format_args!("{:04b}", self.rfu()))?;
        write!(f, "{}", RULE)
    }
}

impl fmt::Display for osa::TripPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, '-', "OSA: TRIP PASS")?;
        field(f, "PASS ID", self.pass_id())?;
        field(f, "PASS EXPIRY", format_utc_millis(self.pass_expiry()))?;
        field(f, "PRIORITY", self.priority())?;
        field(f, "TRIPS ALLOTTED", self.trips_allotted())?;
        field(f, "REMAINING TRIPS", self.remaining_trips())?;
        field(f, "SOURCE ID", self.source_id())?;
        field(f, "DESTINATION ID", self.destination_id())?;
        field(f, "FLAGS (BINARY)", format_args!("{:08b}", self.flags()))?;
        field(f, "DAILY TRIP COUNTER", self.daily_trip_counter())?;
        field(f, "DAILY TRIP INDICATOR", self.daily_trip_indicator())?;
        field(f, "START DATE & TIME", format_utc_millis(self.start_date_and_time()))?;
        write!(f, "{}", RULE)
    }
}

fn write_history<'a, R: fmt::Display + 'a>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    effective_minutes: u64,
    records: impl ExactSizeIterator<Item = &'a R>,
) -> fmt::Result {
    banner(f, '=', title)?;
    field(f, "CARD EFFECTIVE DATE (MINS)", effective_minutes)?;
    field(f, "VALID LOG COUNT", records.len())?;
    let mut empty = true;
    for record in records {
        writeln!(f, "{}", record)?;
        empty = false;
    }
    if empty {
        writeln!(f, "  [No log entries]")?;
    }
    write!(f, "{}", RULE.replace('-', "="))
}

impl fmt::Display for csa::History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_history(f, "HISTORY DATA", self.effective_date().minutes(), self.iter())
    }
}

impl fmt::Display for osa::History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_history(f, "OSA: HISTORY DATA", self.effective_date().minutes(), self.iter())
    }
}

impl fmt::Display for csa::Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, '=', "COMMON SERVICE AREA (CSA)")?;
        writeln!(f, "{}", self.general())?;
        writeln!(f, "{}", self.validation())?;
        writeln!(f, "{}", self.history())?;
        banner(f, '-', "RFU (7 Bytes)")?;
        writeln!(f, "  {}", hex_string(self.rfu()))?;
        write!(f, "{}", RULE.replace('-', "="))
    }
}

impl fmt::Display for osa::Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, '=', "OPERATOR SERVICE AREA (OSA)")?;
        writeln!(f, "{}", self.general())?;
        writeln!(f, "{}", self.validation())?;
        writeln!(f, "{}", self.history())?;
        for pass in self.trip_passes() {
            writeln!(f, "{}", pass)?;
        }
        banner(f, '-', "PADDING")?;
        writeln!(
            f,
            "  {} byte(s) of padding appended during serialization.",
            osa::Container::PADDING_SIZE
        )?;
        write!(f, "{}", RULE.replace('-', "="))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_formatting() {
        assert_eq!(format_utc_millis(1_735_689_600_000), "2025-01-01 00:00:00 (UTC)");
        assert_eq!(format_utc_millis(0), "1970-01-01 00:00:00 (UTC)");
    }

    #[test]
    fn hex_text_round_trip() {
        let bytes = parse_hex("0xDE AD:be-ef\n01").unwrap();
        assert_eq!(bytes, vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01]);
        assert_eq!(hex_string(&bytes), "de ad be ef 01");
    }

    #[test]
    fn hex_text_rejects_garbage() {
        assert!(matches!(parse_hex("abc"), Err(CodecError::InvalidFormat(_))));
        assert!(matches!(parse_hex("zz"), Err(CodecError::InvalidFormat(_))));
    }

    #[test]
    fn offset_rows() {
        let mut out = Vec::new();
        write_hex_with_offset(&mut out, &[0u8; 20]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("  offset   0: 00 00"));
        assert!(text.contains("  offset  16: 00 00 00 00\n"));
    }

    #[test]
    fn empty_history_dump() {
        let history = csa::History::new(crate::time::EffectiveDate::from_minutes(5));
        let text = history.to_string();
        assert!(text.contains("CARD EFFECTIVE DATE (MINS): 5"));
        assert!(text.contains("[No log entries]"));
    }
}
