//! Common Service Area: the 96-byte block any compliant terminal may read and write.
//!
//! | Offset | Size | Block |
//! |-------:|-----:|-------|
//! | 0  | 2  | [`General`] |
//! | 2  | 19 | [`Validation`] |
//! | 21 | 68 | [`History`] (4 x [`LogEntry`]) |
//! | 89 | 7  | RFU bytes |

use crate::codec::{check_width, expect_len, BitWriter, CodecError, FieldReader, FieldWriter};
use crate::history::{HistoryBuffer, HistoryRecord};
use crate::terminal::Terminal;
use crate::time::{absolute_from_offset, offset_from_absolute, EffectiveDate};
use crate::types::{LanguageCode, TxnStatus, Version};

const RFU_LEN: usize = 7;

/// General data: version byte, then language and 3 RFU bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct General {
    version: Version,
    language: LanguageCode,
    rfu: u8,
}

impl General {
    pub const SIZE: usize = 2;
    pub const RFU_MAX: u8 = 7;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_version(&mut self, major: u8, minor: u8, patch: u8) -> Result<(), CodecError> {
        self.version = Version::new(major, minor, patch)?;
        Ok(())
    }

    /// Fails with [`CodecError::Range`] for a code wider than five bits.
    pub fn set_language(&mut self, language: LanguageCode) -> Result<(), CodecError> {
        self.language = language.canonical()?;
        Ok(())
    }

    pub fn set_rfu(&mut self, value: u8) -> Result<(), CodecError> {
        self.rfu = check_width("general rfu", value as u32, 3)? as u8;
        Ok(())
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn major_version(&self) -> u8 {
        self.version.major()
    }

    pub fn minor_version(&self) -> u8 {
        self.version.minor()
    }

    pub fn patch_version(&self) -> u8 {
        self.version.patch()
    }

    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    pub fn language(&self) -> LanguageCode {
        self.language
    }

    pub fn rfu(&self) -> u8 {
        self.rfu
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        expect_len("CSA general", bytes, Self::SIZE)?;
        Self::read(&mut FieldReader::new(bytes))
    }

    fn read(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let version = Version::from_byte(r.read_u8()?);
        let mut bits = r.read_bits(1)?;
        Ok(General {
            version,
            language: LanguageCode::from_bits(bits.take(LanguageCode::BITS) as u8),
            rfu: bits.take(3) as u8,
        })
    }

    fn write(&self, w: &mut FieldWriter) -> Result<(), CodecError> {
        w.put_u8(self.version.to_byte());
        let mut bits = BitWriter::new();
        bits.push("language", self.language.bits() as u32, LanguageCode::BITS)?;
        bits.push("general rfu", self.rfu as u32, 3)?;
        w.put_bits(bits)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = FieldWriter::with_capacity(Self::SIZE);
        self.write(&mut w)?;
        Ok(w.into_bytes())
    }
}

/// Last validation (tap) performed with the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    effective_date: EffectiveDate,
    error_code: u8,
    product_type: u8,
    terminal: Terminal,
    time_offset: u32,
    fare_amount: u16,
    route_number: u16,
    service_provider_data: u32,
    status: TxnStatus,
    rfu: u8,
}

impl Validation {
    pub const SIZE: usize = 19;
    pub const SERVICE_DATA_MAX: u32 = 0x00FF_FFFF;
    pub const RFU_MAX: u8 = 0x0F;

    pub fn new(effective_date: EffectiveDate) -> Self {
        Validation {
            effective_date,
            error_code: 0,
            product_type: 0,
            terminal: Terminal::default(),
            time_offset: 0,
            fare_amount: 0,
            route_number: 0,
            service_provider_data: 0,
            status: TxnStatus::default(),
            rfu: 0,
        }
    }

    /// Store `absolute_ms` as a minute offset from the effective date.
    pub fn set_date_and_time(&mut self, absolute_ms: u64) -> Result<(), CodecError> {
        self.time_offset = offset_from_absolute(self.effective_date, absolute_ms)?;
        Ok(())
    }

    pub fn set_time_offset(&mut self, minutes: u32) -> Result<(), CodecError> {
        self.time_offset = check_width("validation time offset", minutes, 24)?;
        Ok(())
    }

    pub fn set_error_code(&mut self, code: u8) {
        self.error_code = code;
    }

    pub fn set_product_type(&mut self, product_type: u8) {
        self.product_type = product_type;
    }

    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.terminal = terminal;
    }

    pub fn set_fare_amount(&mut self, amount: u16) {
        self.fare_amount = amount;
    }

    pub fn set_route_number(&mut self, route: u16) {
        self.route_number = route;
    }

    pub fn set_service_provider_data(&mut self, data: u32) -> Result<(), CodecError> {
        self.service_provider_data = check_width("service provider data", data, 24)?;
        Ok(())
    }

    pub fn set_txn_status(&mut self, status: TxnStatus) -> Result<(), CodecError> {
        self.status = status.canonical()?;
        Ok(())
    }

    pub fn set_rfu(&mut self, value: u8) -> Result<(), CodecError> {
        self.rfu = check_width("validation rfu", value as u32, 4)? as u8;
        Ok(())
    }

    pub fn effective_date(&self) -> EffectiveDate {
        self.effective_date
    }

    pub fn date_and_time(&self) -> u64 {
        absolute_from_offset(self.effective_date, self.time_offset)
    }

    pub fn time_offset(&self) -> u32 {
        self.time_offset
    }

    pub fn error_code(&self) -> u8 {
        self.error_code
    }

    pub fn product_type(&self) -> u8 {
        self.product_type
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    pub fn fare_amount(&self) -> u16 {
        self.fare_amount
    }

    pub fn route_number(&self) -> u16 {
        self.route_number
    }

    pub fn service_provider_data(&self) -> u32 {
        self.service_provider_data
    }

    /// Six uppercase hex digits.
    pub fn service_provider_data_hex(&self) -> String {
        format!("{:06X}", self.service_provider_data)
    }

    pub fn txn_status(&self) -> TxnStatus {
        self.status
    }

    pub fn rfu(&self) -> u8 {
        self.rfu
    }

    pub fn parse(bytes: &[u8], effective_date: EffectiveDate) -> Result<Self, CodecError> {
        expect_len("CSA validation", bytes, Self::SIZE)?;
        Self::read(&mut FieldReader::new(bytes), effective_date)
    }

    fn read(r: &mut FieldReader<'_>, effective_date: EffectiveDate) -> Result<Self, CodecError> {
        let error_code = r.read_u8()?;
        let product_type = r.read_u8()?;
        let terminal = Terminal::read(r)?;
        let time_offset = r.read_u24()?;
        let fare_amount = r.read_u16()?;
        let route_number = r.read_u16()?;
        let service_provider_data = r.read_u24()?;
        let mut bits = r.read_bits(1)?;
        Ok(Validation {
            effective_date,
            error_code,
            product_type,
            terminal,
            time_offset,
            fare_amount,
            route_number,
            service_provider_data,
            status: TxnStatus::from_bits(bits.take(TxnStatus::BITS) as u8),
            rfu: bits.take(4) as u8,
        })
    }

    fn write(&self, w: &mut FieldWriter) -> Result<(), CodecError> {
        w.put_u8(self.error_code);
        w.put_u8(self.product_type);
        self.terminal.write(w);
        w.put_u24(check_width("validation time offset", self.time_offset, 24)?);
        w.put_u16(self.fare_amount);
        w.put_u16(self.route_number);
        w.put_u24(check_width("service provider data", self.service_provider_data, 24)?);
        let mut bits = BitWriter::new();
        bits.push("txn status", self.status.bits() as u32, TxnStatus::BITS)?;
        bits.push("validation rfu", self.rfu as u32, 4)?;
        w.put_bits(bits)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = FieldWriter::with_capacity(Self::SIZE);
        self.write(&mut w)?;
        Ok(w.into_bytes())
    }
}

/// One slot of the CSA transaction history.
///
/// The card balance is a 20-bit value packed into 2.5 bytes; the low nibble of its
/// third byte is filler, always written as `0xF` and ignored on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    effective_date: EffectiveDate,
    terminal: Terminal,
    time_offset: u32,
    txn_amount: u16,
    txn_sq_no: u16,
    card_balance: u32,
    status: TxnStatus,
    rfu: u8,
}

impl LogEntry {
    pub const SIZE: usize = 17;
    pub const CARD_BALANCE_MAX: u32 = 0x000F_FFFF;
    pub const RFU_MAX: u8 = 0x0F;
    const BALANCE_FILLER: u32 = 0x0F;

    pub fn new(effective_date: EffectiveDate) -> Self {
        LogEntry {
            effective_date,
            terminal: Terminal::default(),
            time_offset: 0,
            txn_amount: 0,
            txn_sq_no: 0,
            card_balance: 0,
            status: TxnStatus::default(),
            rfu: 0,
        }
    }

    pub fn set_date_and_time(&mut self, absolute_ms: u64) -> Result<(), CodecError> {
        self.time_offset = offset_from_absolute(self.effective_date, absolute_ms)?;
        Ok(())
    }

    pub fn set_time_offset(&mut self, minutes: u32) -> Result<(), CodecError> {
        self.time_offset = check_width("log time offset", minutes, 24)?;
        Ok(())
    }

    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.terminal = terminal;
    }

    pub fn set_txn_amount(&mut self, amount: u16) {
        self.txn_amount = amount;
    }

    pub fn set_txn_sq_no(&mut self, sq_no: u16) {
        self.txn_sq_no = sq_no;
    }

    pub fn set_card_balance(&mut self, balance: u32) -> Result<(), CodecError> {
        if balance > Self::CARD_BALANCE_MAX {
            return Err(CodecError::Range(format!(
                "card balance {} exceeds the 20-bit limit ({})",
                balance,
                Self::CARD_BALANCE_MAX
            )));
        }
        self.card_balance = balance;
        Ok(())
    }

    pub fn set_txn_status(&mut self, status: TxnStatus) -> Result<(), CodecError> {
        self.status = status.canonical()?;
        Ok(())
    }

    pub fn set_rfu(&mut self, value: u8) -> Result<(), CodecError> {
        self.rfu = check_width("log rfu", value as u32, 4)? as u8;
        Ok(())
    }

    pub fn effective_date(&self) -> EffectiveDate {
        self.effective_date
    }

    pub fn date_and_time(&self) -> u64 {
        absolute_from_offset(self.effective_date, self.time_offset)
    }

    pub fn time_offset(&self) -> u32 {
        self.time_offset
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal {
        &mut self.terminal
    }

    pub fn txn_amount(&self) -> u16 {
        self.txn_amount
    }

    pub fn txn_sq_no(&self) -> u16 {
        self.txn_sq_no
    }

    pub fn card_balance(&self) -> u32 {
        self.card_balance
    }

    pub fn txn_status(&self) -> TxnStatus {
        self.status
    }

    pub fn rfu(&self) -> u8 {
        self.rfu
    }

    fn read(r: &mut FieldReader<'_>, effective_date: EffectiveDate) -> Result<Self, CodecError> {
        let terminal = Terminal::read(r)?;
        let time_offset = r.read_u24()?;
        let txn_amount = r.read_u16()?;
        let txn_sq_no = r.read_u16()?;
        let mut balance = r.read_bits(3)?;
        let card_balance = balance.take(20);
        let mut bits = r.read_bits(1)?;
        Ok(LogEntry {
            effective_date,
            terminal,
            time_offset,
            txn_amount,
            txn_sq_no,
            card_balance,
            status: TxnStatus::from_bits(bits.take(TxnStatus::BITS) as u8),
            rfu: bits.take(4) as u8,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = FieldWriter::with_capacity(Self::SIZE);
        HistoryRecord::write(self, &mut w)?;
        Ok(w.into_bytes())
    }
}

impl HistoryRecord for LogEntry {
    const SIZE: usize = LogEntry::SIZE;
    const NAME: &'static str = "log entry";

    fn effective_date(&self) -> EffectiveDate {
        self.effective_date
    }

    fn write(&self, w: &mut FieldWriter) -> Result<(), CodecError> {
        self.terminal.write(w);
        w.put_u24(check_width("log time offset", self.time_offset, 24)?);
        w.put_u16(self.txn_amount);
        w.put_u16(self.txn_sq_no);
        let mut balance = BitWriter::new();
        balance.push("card balance", self.card_balance, 20)?;
        balance.push("balance filler", Self::BALANCE_FILLER, 4)?;
        w.put_bits(balance)?;
        let mut bits = BitWriter::new();
        bits.push("txn status", self.status.bits() as u32, TxnStatus::BITS)?;
        bits.push("log rfu", self.rfu as u32, 4)?;
        w.put_bits(bits)
    }

    fn parse(bytes: &[u8], effective_date: EffectiveDate) -> Result<Self, CodecError> {
        expect_len("CSA log entry", bytes, LogEntry::SIZE)?;
        Self::read(&mut FieldReader::new(bytes), effective_date)
    }
}

/// Four-slot CSA history.
pub type History = HistoryBuffer<LogEntry, 4>;

/// The whole 96-byte Common Service Area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    effective_date: EffectiveDate,
    general: General,
    validation: Validation,
    history: History,
    rfu: [u8; RFU_LEN],
}

impl Container {
    pub const TOTAL_SIZE: usize = 96;
    pub const RFU_SIZE: usize = RFU_LEN;
    pub const GENERAL_OFFSET: usize = 0;
    pub const VALIDATION_OFFSET: usize = Self::GENERAL_OFFSET + General::SIZE;
    pub const HISTORY_OFFSET: usize = Self::VALIDATION_OFFSET + Validation::SIZE;
    pub const RFU_OFFSET: usize = Self::HISTORY_OFFSET + History::TOTAL_SIZE;

    pub fn new(effective_date: EffectiveDate) -> Self {
        Container {
            effective_date,
            general: General::default(),
            validation: Validation::new(effective_date),
            history: History::new(effective_date),
            rfu: [0u8; RFU_LEN],
        }
    }

    pub fn effective_date(&self) -> EffectiveDate {
        self.effective_date
    }

    pub fn set_general(&mut self, general: General) {
        self.general = general;
    }

    pub fn set_validation(&mut self, validation: Validation) -> Result<(), CodecError> {
        if validation.effective_date() != self.effective_date {
            return Err(CodecError::InconsistentState(format!(
                "validation effective date ({}) does not match CSA effective date ({})",
                validation.effective_date(),
                self.effective_date
            )));
        }
        self.validation = validation;
        Ok(())
    }

    pub fn set_history(&mut self, history: History) -> Result<(), CodecError> {
        if history.effective_date() != self.effective_date {
            return Err(CodecError::InconsistentState(format!(
                "history effective date ({}) does not match CSA effective date ({})",
                history.effective_date(),
                self.effective_date
            )));
        }
        self.history = history;
        Ok(())
    }

    pub fn set_rfu(&mut self, rfu: [u8; RFU_LEN]) {
        self.rfu = rfu;
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn general_mut(&mut self) -> &mut General {
        &mut self.general
    }

    pub fn validation(&self) -> &Validation {
        &self.validation
    }

    /// Edit the validation block through `edit`. The edit is applied to a copy and
    /// committed only if `edit` succeeds and the effective date still matches, so a
    /// failed update leaves the container unchanged.
    pub fn update_validation<F>(&mut self, edit: F) -> Result<(), CodecError>
    where
        F: FnOnce(&mut Validation) -> Result<(), CodecError>,
    {
        let mut validation = self.validation.clone();
        edit(&mut validation)?;
        self.set_validation(validation)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Record `entry` as the newest log entry.
    pub fn add_log_entry(&mut self, entry: LogEntry) -> Result<(), CodecError> {
        self.history.add(entry)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn rfu(&self) -> &[u8; RFU_LEN] {
        &self.rfu
    }

    /// Decode a raw CSA block. `effective_date` must be the one used when it was written.
    pub fn parse(bytes: &[u8], effective_date: EffectiveDate) -> Result<Self, CodecError> {
        expect_len("CSA block", bytes, Self::TOTAL_SIZE)?;
        let mut r = FieldReader::new(bytes);
        let general = General::read(&mut r)?;
        let validation = Validation::read(&mut r, effective_date)?;
        let history = History::read(&mut r, effective_date)?;
        let rfu = r.read_array::<RFU_LEN>()?;
        tracing::debug!(
            effective_date = effective_date.minutes(),
            history_entries = history.valid_count(),
            "parsed CSA block"
        );
        Ok(Container {
            effective_date,
            general,
            validation,
            history,
            rfu,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = FieldWriter::with_capacity(Self::TOTAL_SIZE);
        self.general.write(&mut w)?;
        tracing::trace!(offset = w.len(), "CSA validation");
        self.validation.write(&mut w)?;
        tracing::trace!(offset = w.len(), "CSA history");
        self.history.write(&mut w)?;
        tracing::trace!(offset = w.len(), "CSA rfu");
        w.put_bytes(&self.rfu);
        debug_assert_eq!(w.len(), Self::TOTAL_SIZE);
        Ok(w.into_bytes())
    }
}
