//! Fixed-depth, most-recent-first transaction history.
//!
//! Both service areas keep a short log of past transactions: four 17-byte
//! [`LogEntry`](crate::csa::LogEntry) slots in the CSA, two 13-byte
//! [`TransactionRecord`](crate::osa::TransactionRecord) slots in the OSA. Slot 0 is
//! always the newest entry; adding to a full buffer drops the oldest.
//!
//! On the wire, unused slots are zero-filled and parsing stops at the first all-zero
//! slot. A genuine record whose bytes are all zero is therefore read back as "empty".

use crate::codec::{expect_len, CodecError, FieldReader, FieldWriter};
use crate::time::EffectiveDate;

/// A fixed-size record that can live in a [`HistoryBuffer`].
pub trait HistoryRecord: Clone + PartialEq {
    const SIZE: usize;
    const NAME: &'static str;

    fn effective_date(&self) -> EffectiveDate;
    fn write(&self, w: &mut FieldWriter) -> Result<(), CodecError>;
    fn parse(bytes: &[u8], effective_date: EffectiveDate) -> Result<Self, CodecError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBuffer<R, const N: usize> {
    effective_date: EffectiveDate,
    // Newest first, never longer than N.
    records: Vec<R>,
}

impl<R: HistoryRecord, const N: usize> HistoryBuffer<R, N> {
    pub const CAPACITY: usize = N;
    pub const TOTAL_SIZE: usize = N * R::SIZE;

    pub fn new(effective_date: EffectiveDate) -> Self {
        HistoryBuffer {
            effective_date,
            records: Vec::with_capacity(N),
        }
    }

    /// Insert `record` as the newest entry, discarding the oldest when full.
    pub fn add(&mut self, record: R) -> Result<(), CodecError> {
        if record.effective_date() != self.effective_date {
            return Err(CodecError::InconsistentState(format!(
                "{} effective date ({}) does not match history effective date ({})",
                R::NAME,
                record.effective_date(),
                self.effective_date
            )));
        }
        if self.records.len() == N {
            self.records.pop();
        }
        self.records.insert(0, record);
        Ok(())
    }

    /// Forget every entry; the effective date is kept.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.records.get(index)
    }

    pub fn latest(&self) -> Option<&R> {
        self.records.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn valid_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() == N
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn effective_date(&self) -> EffectiveDate {
        self.effective_date
    }

    pub fn parse(bytes: &[u8], effective_date: EffectiveDate) -> Result<Self, CodecError> {
        expect_len("history", bytes, Self::TOTAL_SIZE)?;
        let mut history = Self::new(effective_date);
        for slot in bytes.chunks_exact(R::SIZE) {
            if slot.iter().all(|&b| b == 0) {
                break;
            }
            history.records.push(R::parse(slot, effective_date)?);
        }
        Ok(history)
    }

    pub(crate) fn read(r: &mut FieldReader<'_>, effective_date: EffectiveDate) -> Result<Self, CodecError> {
        Self::parse(r.take(Self::TOTAL_SIZE)?, effective_date)
    }

    pub(crate) fn write(&self, w: &mut FieldWriter) -> Result<(), CodecError> {
        for record in &self.records {
            record.write(w)?;
        }
        w.put_zeros((N - self.records.len()) * R::SIZE);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = FieldWriter::with_capacity(Self::TOTAL_SIZE);
        self.write(&mut w)?;
        Ok(w.into_bytes())
    }
}

impl<'a, R, const N: usize> IntoIterator for &'a HistoryBuffer<R, N> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
