//! Operator Service Area: the 96-byte block owned by a single transit operator.
//!
//! | Offset | Size | Block |
//! |-------:|-----:|-------|
//! | 0  | 7  | [`General`] |
//! | 7  | 13 | validation ([`TransactionRecord`]) |
//! | 20 | 26 | [`History`] (2 x [`TransactionRecord`]) |
//! | 46 | 20 | [`TripPass`] 0 |
//! | 66 | 20 | [`TripPass`] 1 |
//! | 86 | 10 | zero padding |
//!
//! Trip-pass times are absolute seconds since the epoch; every other timestamp is a
//! minute offset from the container's effective date.

use crate::codec::{check_width, decode_bcd, encode_bcd, expect_len, BitWriter, CodecError, FieldReader, FieldWriter};
use crate::history::{HistoryBuffer, HistoryRecord};
use crate::time::{
    absolute_from_offset, millis_from_seconds24, offset_from_absolute, seconds24_from_millis, EffectiveDate,
};
use crate::types::{LanguageCode, ServiceStatus, TxnStatus, Version};

const PHONE_NUMBER_BYTES: usize = 5;
const NUM_TRIP_PASSES: usize = 2;

/// General data: version, BCD phone number and a packed language/status/rfu byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct General {
    version: Version,
    phone_number: [u8; PHONE_NUMBER_BYTES],
    language: LanguageCode,
    status: ServiceStatus,
    rfu: u8,
}

impl General {
    pub const SIZE: usize = 7;
    pub const PHONE_NUMBER_DIGITS: usize = PHONE_NUMBER_BYTES * 2;
    pub const RFU_MAX: u8 = 3;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_version(&mut self, major: u8, minor: u8, patch: u8) -> Result<(), CodecError> {
        self.version = Version::new(major, minor, patch)?;
        Ok(())
    }

    /// Exactly ten ASCII digits, stored as packed BCD.
    pub fn set_phone_number(&mut self, number: &str) -> Result<(), CodecError> {
        self.phone_number = encode_bcd::<PHONE_NUMBER_BYTES>("phone number", number)?;
        Ok(())
    }

    /// Fails with [`CodecError::Range`] for a code wider than five bits.
    pub fn set_language(&mut self, language: LanguageCode) -> Result<(), CodecError> {
        self.language = language.canonical()?;
        Ok(())
    }

    pub fn set_service_status(&mut self, status: ServiceStatus) {
        self.status = status;
    }

    pub fn set_rfu(&mut self, value: u8) -> Result<(), CodecError> {
        self.rfu = check_width("general rfu", value as u32, 2)? as u8;
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

    /// The stored digits, or an empty string when no number has been written (all zeros).
    pub fn phone_number(&self) -> String {
        if self.phone_number.iter().all(|&b| b == 0) {
            return String::new();
        }
        decode_bcd(&self.phone_number)
    }

    pub fn phone_number_bytes(&self) -> &[u8; PHONE_NUMBER_BYTES] {
        &self.phone_number
    }

    pub fn language(&self) -> LanguageCode {
        self.language
    }

    pub fn service_status(&self) -> ServiceStatus {
        self.status
    }

    pub fn rfu(&self) -> u8 {
        self.rfu
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        expect_len("OSA general", bytes, Self::SIZE)?;
        Self::read(&mut FieldReader::new(bytes))
    }

    fn read(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let version = Version::from_byte(r.read_u8()?);
        let phone_number = r.read_array::<PHONE_NUMBER_BYTES>()?;
        let mut bits = r.read_bits(1)?;
        Ok(General {
            version,
            phone_number,
            language: LanguageCode::from_bits(bits.take(LanguageCode::BITS) as u8),
            status: ServiceStatus::from_bit(bits.take(1) as u8),
            rfu: bits.take(2) as u8,
        })
    }

    fn write(&self, w: &mut FieldWriter) -> Result<(), CodecError> {
        w.put_u8(self.version.to_byte());
        w.put_bytes(&self.phone_number);
        let mut bits = BitWriter::new();
        bits.push("language", self.language.bits() as u32, LanguageCode::BITS)?;
        bits.push("service status", self.status.bit() as u32, 1)?;
        bits.push("general rfu", self.rfu as u32, 2)?;
        w.put_bits(bits)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = FieldWriter::with_capacity(Self::SIZE);
        self.write(&mut w)?;
        Ok(w.into_bytes())
    }
}

/// OSA validation and history record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    effective_date: EffectiveDate,
    error_code: u8,
    product_type: u8,
    time_offset: u32,
    station_id: u16,
    fare: u16,
    terminal_id: u32,
    status: TxnStatus,
    rfu: u8,
}

impl TransactionRecord {
    pub const SIZE: usize = 13;
    pub const TERMINAL_ID_MAX: u32 = 0x00FF_FFFF;
    pub const RFU_MAX: u8 = 0x0F;

    pub fn new(effective_date: EffectiveDate) -> Self {
        TransactionRecord {
            effective_date,
            error_code: 0,
            product_type: 0,
            time_offset: 0,
            station_id: 0,
            fare: 0,
            terminal_id: 0,
            status: TxnStatus::default(),
            rfu: 0,
        }
    }

    pub fn set_date_and_time(&mut self, absolute_ms: u64) -> Result<(), CodecError> {
        self.time_offset = offset_from_absolute(self.effective_date, absolute_ms)?;
        Ok(())
    }

    pub fn set_time_offset(&mut self, minutes: u32) -> Result<(), CodecError> {
        self.time_offset = check_width("transaction time offset", minutes, 24)?;
        Ok(())
    }

    pub fn set_error_code(&mut self, code: u8) {
        self.error_code = code;
    }

    pub fn set_product_type(&mut self, product_type: u8) {
        self.product_type = product_type;
    }

    pub fn set_station_id(&mut self, id: u16) {
        self.station_id = id;
    }

    pub fn set_fare(&mut self, fare: u16) {
        self.fare = fare;
    }

    pub fn set_terminal_id(&mut self, id: u32) -> Result<(), CodecError> {
        self.terminal_id = check_width("terminal id", id, 24)?;
        Ok(())
    }

    pub fn set_txn_status(&mut self, status: TxnStatus) -> Result<(), CodecError> {
        self.status = status.canonical()?;
        Ok(())
    }

    pub fn set_rfu(&mut self, value: u8) -> Result<(), CodecError> {
        self.rfu = check_width("transaction rfu", value as u32, 4)? as u8;
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

    pub fn station_id(&self) -> u16 {
        self.station_id
    }

    pub fn fare(&self) -> u16 {
        self.fare
    }

    pub fn terminal_id(&self) -> u32 {
        self.terminal_id
    }

    pub fn txn_status(&self) -> TxnStatus {
        self.status
    }

    pub fn rfu(&self) -> u8 {
        self.rfu
    }

    fn read(r: &mut FieldReader<'_>, effective_date: EffectiveDate) -> Result<Self, CodecError> {
        let error_code = r.read_u8()?;
        let product_type = r.read_u8()?;
        let time_offset = r.read_u24()?;
        let station_id = r.read_u16()?;
        let fare = r.read_u16()?;
        let terminal_id = r.read_u24()?;
        let mut bits = r.read_bits(1)?;
        Ok(TransactionRecord {
            effective_date,
            error_code,
            product_type,
            time_offset,
            station_id,
            fare,
            terminal_id,
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

impl HistoryRecord for TransactionRecord {
    const SIZE: usize = TransactionRecord::SIZE;
    const NAME: &'static str = "transaction record";

    fn effective_date(&self) -> EffectiveDate {
        self.effective_date
    }

    fn write(&self, w: &mut FieldWriter) -> Result<(), CodecError> {
        w.put_u8(self.error_code);
        w.put_u8(self.product_type);
        w.put_u24(check_width("transaction time offset", self.time_offset, 24)?);
        w.put_u16(self.station_id);
        w.put_u16(self.fare);
        w.put_u24(check_width("terminal id", self.terminal_id, 24)?);
        let mut bits = BitWriter::new();
        bits.push("txn status", self.status.bits() as u32, TxnStatus::BITS)?;
        bits.push("transaction rfu", self.rfu as u32, 4)?;
        w.put_bits(bits)
    }

    fn parse(bytes: &[u8], effective_date: EffectiveDate) -> Result<Self, CodecError> {
        expect_len("OSA transaction record", bytes, TransactionRecord::SIZE)?;
        Self::read(&mut FieldReader::new(bytes), effective_date)
    }
}

/// Two-slot OSA history.
pub type History = HistoryBuffer<TransactionRecord, 2>;

/// A prepaid trip product.
///
/// `set_remaining_trips` is checked against the allotment held at call time, so set
/// the allotment first. [`TripPass::builder`] takes both together and checks once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TripPass {
    pass_id: u8,
    pass_expiry: u32,
    priority: u8,
    trips_allotted: u16,
    remaining_trips: u16,
    source_id: u16,
    destination_id: u16,
    flags: u8,
    daily_trip_counter: u8,
    daily_trip_indicator: u16,
    start_date_and_time: u32,
}

impl TripPass {
    pub const SIZE: usize = 20;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> TripPassBuilder {
        TripPassBuilder::default()
    }

    pub fn set_pass_id(&mut self, id: u8) {
        self.pass_id = id;
    }

    /// Stored as whole seconds since the epoch.
    pub fn set_pass_expiry(&mut self, absolute_ms: u64) -> Result<(), CodecError> {
        self.pass_expiry = seconds24_from_millis("pass expiry", absolute_ms)?;
        Ok(())
    }

    pub fn set_priority(&mut self, priority: u8) {
        self.priority = priority;
    }

    pub fn set_trips_allotted(&mut self, trips: u16) {
        self.trips_allotted = trips;
    }

    pub fn set_remaining_trips(&mut self, trips: u16) -> Result<(), CodecError> {
        if trips > self.trips_allotted {
            return Err(CodecError::InvalidArgument(format!(
                "remaining trips ({}) cannot be greater than allotted trips ({})",
                trips, self.trips_allotted
            )));
        }
        self.remaining_trips = trips;
        Ok(())
    }

    pub fn set_source_id(&mut self, id: u16) {
        self.source_id = id;
    }

    pub fn set_destination_id(&mut self, id: u16) {
        self.destination_id = id;
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    pub fn set_daily_trip_counter(&mut self, count: u8) {
        self.daily_trip_counter = count;
    }

    pub fn set_daily_trip_indicator(&mut self, indicator: u16) {
        self.daily_trip_indicator = indicator;
    }

    pub fn set_start_date_and_time(&mut self, absolute_ms: u64) -> Result<(), CodecError> {
        self.start_date_and_time = seconds24_from_millis("start time", absolute_ms)?;
        Ok(())
    }

    pub fn pass_id(&self) -> u8 {
        self.pass_id
    }

    /// Milliseconds since the epoch.
    pub fn pass_expiry(&self) -> u64 {
        millis_from_seconds24(self.pass_expiry)
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn trips_allotted(&self) -> u16 {
        self.trips_allotted
    }

    pub fn remaining_trips(&self) -> u16 {
        self.remaining_trips
    }

    pub fn source_id(&self) -> u16 {
        self.source_id
    }

    pub fn destination_id(&self) -> u16 {
        self.destination_id
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn daily_trip_counter(&self) -> u8 {
        self.daily_trip_counter
    }

    pub fn daily_trip_indicator(&self) -> u16 {
        self.daily_trip_indicator
    }

    pub fn start_date_and_time(&self) -> u64 {
        millis_from_seconds24(self.start_date_and_time)
    }

    /// Decoding keeps whatever the card holds, including `remaining > allotted`.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        expect_len("OSA trip pass", bytes, Self::SIZE)?;
        Self::read(&mut FieldReader::new(bytes))
    }

    fn read(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(TripPass {
            pass_id: r.read_u8()?,
            pass_expiry: r.read_u24()?,
            priority: r.read_u8()?,
            trips_allotted: r.read_u16()?,
            remaining_trips: r.read_u16()?,
            source_id: r.read_u16()?,
            destination_id: r.read_u16()?,
            flags: r.read_u8()?,
            daily_trip_counter: r.read_u8()?,
            daily_trip_indicator: r.read_u16()?,
            start_date_and_time: r.read_u24()?,
        })
    }

    fn write(&self, w: &mut FieldWriter) {
        w.put_u8(self.pass_id);
        w.put_u24(self.pass_expiry);
        w.put_u8(self.priority);
        w.put_u16(self.trips_allotted);
        w.put_u16(self.remaining_trips);
        w.put_u16(self.source_id);
        w.put_u16(self.destination_id);
        w.put_u8(self.flags);
        w.put_u8(self.daily_trip_counter);
        w.put_u16(self.daily_trip_indicator);
        w.put_u24(self.start_date_and_time);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = FieldWriter::with_capacity(Self::SIZE);
        self.write(&mut w);
        w.into_bytes()
    }
}

/// Staged construction for [`TripPass`]; all checks run in [`build`](TripPassBuilder::build).
#[derive(Debug, Clone, Default)]
pub struct TripPassBuilder {
    pass: TripPass,
    pass_expiry_ms: Option<u64>,
    start_ms: Option<u64>,
    trips: Option<(u16, u16)>,
}

impl TripPassBuilder {
    pub fn pass_id(mut self, id: u8) -> Self {
        self.pass.pass_id = id;
        self
    }

    pub fn pass_expiry(mut self, absolute_ms: u64) -> Self {
        self.pass_expiry_ms = Some(absolute_ms);
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.pass.priority = priority;
        self
    }

    /// Allotment and remaining count, validated together.
    pub fn trips(mut self, allotted: u16, remaining: u16) -> Self {
        self.trips = Some((allotted, remaining));
        self
    }

    pub fn route(mut self, source_id: u16, destination_id: u16) -> Self {
        self.pass.source_id = source_id;
        self.pass.destination_id = destination_id;
        self
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.pass.flags = flags;
        self
    }

    pub fn daily_trip_counter(mut self, count: u8) -> Self {
        self.pass.daily_trip_counter = count;
        self
    }

    pub fn daily_trip_indicator(mut self, indicator: u16) -> Self {
        self.pass.daily_trip_indicator = indicator;
        self
    }

    pub fn start_date_and_time(mut self, absolute_ms: u64) -> Self {
        self.start_ms = Some(absolute_ms);
        self
    }

    pub fn build(self) -> Result<TripPass, CodecError> {
        let mut pass = self.pass;
        if let Some(ms) = self.pass_expiry_ms {
            pass.set_pass_expiry(ms)?;
        }
        if let Some(ms) = self.start_ms {
            pass.set_start_date_and_time(ms)?;
        }
        if let Some((allotted, remaining)) = self.trips {
            pass.set_trips_allotted(allotted);
            pass.set_remaining_trips(remaining)?;
        }
        Ok(pass)
    }
}

/// The whole 96-byte Operator Service Area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    effective_date: EffectiveDate,
    general: General,
    validation: TransactionRecord,
    history: History,
    trip_passes: [TripPass; NUM_TRIP_PASSES],
}

impl Container {
    pub const TOTAL_SIZE: usize = 96;
    pub const NUM_TRIP_PASSES: usize = NUM_TRIP_PASSES;
    pub const GENERAL_OFFSET: usize = 0;
    pub const VALIDATION_OFFSET: usize = Self::GENERAL_OFFSET + General::SIZE;
    pub const HISTORY_OFFSET: usize = Self::VALIDATION_OFFSET + TransactionRecord::SIZE;
    pub const TRIP_PASS_OFFSET: usize = Self::HISTORY_OFFSET + History::TOTAL_SIZE;
    pub const PADDING_OFFSET: usize = Self::TRIP_PASS_OFFSET + NUM_TRIP_PASSES * TripPass::SIZE;
    pub const PADDING_SIZE: usize = Self::TOTAL_SIZE - Self::PADDING_OFFSET;

    pub fn new(effective_date: EffectiveDate) -> Self {
        Container {
            effective_date,
            general: General::default(),
            validation: TransactionRecord::new(effective_date),
            history: History::new(effective_date),
            trip_passes: [TripPass::default(); NUM_TRIP_PASSES],
        }
    }

    pub fn effective_date(&self) -> EffectiveDate {
        self.effective_date
    }

    pub fn set_general(&mut self, general: General) {
        self.general = general;
    }

    pub fn set_validation(&mut self, validation: TransactionRecord) -> Result<(), CodecError> {
        if validation.effective_date() != self.effective_date {
            return Err(CodecError::InconsistentState(format!(
                "validation effective date ({}) does not match OSA effective date ({})",
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
                "history effective date ({}) does not match OSA effective date ({})",
                history.effective_date(),
                self.effective_date
            )));
        }
        self.history = history;
        Ok(())
    }

    pub fn set_trip_pass(&mut self, pass: TripPass, index: usize) -> Result<(), CodecError> {
        *self.trip_pass_mut(index)? = pass;
        Ok(())
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn general_mut(&mut self) -> &mut General {
        &mut self.general
    }

    pub fn validation(&self) -> &TransactionRecord {
        &self.validation
    }

    /// Edit the validation record on a copy; commit only if `edit` succeeds and the
    /// effective date is unchanged.
    pub fn update_validation<F>(&mut self, edit: F) -> Result<(), CodecError>
    where
        F: FnOnce(&mut TransactionRecord) -> Result<(), CodecError>,
    {
        let mut validation = self.validation.clone();
        edit(&mut validation)?;
        self.set_validation(validation)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn add_transaction(&mut self, record: TransactionRecord) -> Result<(), CodecError> {
        self.history.add(record)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn trip_pass(&self, index: usize) -> Result<&TripPass, CodecError> {
        self.trip_passes.get(index).ok_or_else(|| trip_pass_index_error(index))
    }

    pub fn trip_pass_mut(&mut self, index: usize) -> Result<&mut TripPass, CodecError> {
        self.trip_passes.get_mut(index).ok_or_else(|| trip_pass_index_error(index))
    }

    pub fn trip_passes(&self) -> &[TripPass; NUM_TRIP_PASSES] {
        &self.trip_passes
    }

    /// Decode a raw OSA block. The trailing padding is not inspected.
    pub fn parse(bytes: &[u8], effective_date: EffectiveDate) -> Result<Self, CodecError> {
        expect_len("OSA block", bytes, Self::TOTAL_SIZE)?;
        let mut r = FieldReader::new(bytes);
        let general = General::read(&mut r)?;
        let validation = TransactionRecord::read(&mut r, effective_date)?;
        let history = History::read(&mut r, effective_date)?;
        let mut trip_passes = [TripPass::default(); NUM_TRIP_PASSES];
        for pass in trip_passes.iter_mut() {
            *pass = TripPass::read(&mut r)?;
        }
        tracing::debug!(
            effective_date = effective_date.minutes(),
            history_entries = history.valid_count(),
            "parsed OSA block"
        );
        Ok(Container {
            effective_date,
            general,
            validation,
            history,
            trip_passes,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = FieldWriter::with_capacity(Self::TOTAL_SIZE);
        self.general.write(&mut w)?;
        tracing::trace!(offset = w.len(), "OSA validation");
        HistoryRecord::write(&self.validation, &mut w)?;
        tracing::trace!(offset = w.len(), "OSA history");
        self.history.write(&mut w)?;
        for (i, pass) in self.trip_passes.iter().enumerate() {
            tracing::trace!(offset = w.len(), index = i, "OSA trip pass");
            pass.write(&mut w);
        }
        w.put_zeros(Self::PADDING_SIZE);
        debug_assert_eq!(w.len(), Self::TOTAL_SIZE);
        Ok(w.into_bytes())
    }
}

fn trip_pass_index_error(index: usize) -> CodecError {
    CodecError::Range(format!(
        "trip pass index {} is out of bounds (0..{})",
        index, NUM_TRIP_PASSES
    ))
}
