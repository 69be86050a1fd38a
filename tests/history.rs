//! History buffer behaviour: newest-first rotation, capacity, clearing, and the
//! all-zero-slot-terminates-parsing rule.

use openloop::{csa, osa, CodecError, EffectiveDate, HistoryRecord};

const EFFECTIVE: EffectiveDate = EffectiveDate::from_minutes(28_399_680);

fn log(seq: u16) -> csa::LogEntry {
    let mut entry = csa::LogEntry::new(EFFECTIVE);
    entry.set_txn_sq_no(seq);
    entry
}

fn record(station: u16) -> osa::TransactionRecord {
    let mut rec = osa::TransactionRecord::new(EFFECTIVE);
    rec.set_station_id(station);
    rec
}

fn log_sequence(history: &csa::History) -> Vec<u16> {
    history.iter().map(|e| e.txn_sq_no()).collect()
}

#[test]
fn test_csa_rotation_keeps_newest_four() {
    let mut history = csa::History::new(EFFECTIVE);
    for seq in 1..=6 {
        history.add(log(seq)).expect("add");
    }
    assert_eq!(log_sequence(&history), vec![6, 5, 4, 3]);
    assert_eq!(history.valid_count(), 4);
    assert!(history.is_full());
}

#[test]
fn test_osa_rotation_keeps_newest_two() {
    let mut history = osa::History::new(EFFECTIVE);
    for station in 1..=3 {
        history.add(record(station)).expect("add");
    }
    let stations: Vec<u16> = history.iter().map(|r| r.station_id()).collect();
    assert_eq!(stations, vec![3, 2]);
    assert_eq!(history.capacity(), 2);
}

#[test]
fn test_partial_history_round_trip() {
    let mut history = csa::History::new(EFFECTIVE);
    history.add(log(1)).expect("add");
    history.add(log(2)).expect("add");
    let bytes = history.to_bytes().expect("encode");
    assert_eq!(bytes.len(), csa::History::TOTAL_SIZE);
    assert_eq!(bytes.len(), 68);
    assert!(bytes[2 * csa::LogEntry::SIZE..].iter().all(|&b| b == 0));

    let decoded = csa::History::parse(&bytes, EFFECTIVE).expect("decode");
    assert_eq!(decoded, history);
    assert_eq!(log_sequence(&decoded), vec![2, 1]);
}

#[test]
fn test_clear_keeps_effective_date() {
    let mut history = osa::History::new(EFFECTIVE);
    history.add(record(7)).expect("add");
    history.clear();
    assert!(history.is_empty());
    assert_eq!(history.effective_date(), EFFECTIVE);
    assert_eq!(history.to_bytes().expect("encode"), vec![0u8; 26]);
    history.add(record(8)).expect("add after clear");
    assert_eq!(history.latest().map(|r| r.station_id()), Some(8));
}

#[test]
fn test_zero_slot_ends_parsing() {
    let mut second = [0u8; osa::TransactionRecord::SIZE];
    second[5..7].copy_from_slice(&[0x00, 0x09]);
    // Slot 0 empty, slot 1 populated: nothing after the empty slot is read.
    let mut bytes = vec![0u8; osa::TransactionRecord::SIZE];
    bytes.extend_from_slice(&second);
    let history = osa::History::parse(&bytes, EFFECTIVE).expect("decode");
    assert!(history.is_empty());

    // Slot 0 populated: read back as one record.
    let mut bytes = second.to_vec();
    bytes.extend_from_slice(&[0u8; osa::TransactionRecord::SIZE]);
    let history = osa::History::parse(&bytes, EFFECTIVE).expect("decode");
    assert_eq!(history.valid_count(), 1);
    assert_eq!(history.records()[0].station_id(), 9);
}

#[test]
fn test_all_zero_record_reads_back_as_empty() {
    // A record whose encoding is all zero bytes is indistinguishable from an unused slot.
    let mut zero = osa::TransactionRecord::new(EFFECTIVE);
    zero.set_txn_status(openloop::TxnStatus::Exit).expect("status");
    let mut history = osa::History::new(EFFECTIVE);
    history.add(zero).expect("add");
    let bytes = history.to_bytes().expect("encode");
    assert!(bytes.iter().all(|&b| b == 0));
    let decoded = osa::History::parse(&bytes, EFFECTIVE).expect("decode");
    assert_eq!(decoded.valid_count(), 0);
}

#[test]
fn test_csa_empty_log_entry_still_occupies_slot() {
    // The balance filler nibble keeps a default log entry non-zero on the wire.
    let mut history = csa::History::new(EFFECTIVE);
    history.add(csa::LogEntry::new(EFFECTIVE)).expect("add");
    let decoded = csa::History::parse(&history.to_bytes().expect("encode"), EFFECTIVE).expect("decode");
    assert_eq!(decoded.valid_count(), 1);
}

#[test]
fn test_history_rejects_foreign_record_and_wrong_length() {
    let mut history = csa::History::new(EFFECTIVE);
    let other = EffectiveDate::from_minutes(1);
    assert!(matches!(
        history.add(csa::LogEntry::new(other)),
        Err(CodecError::InconsistentState(_))
    ));
    assert!(matches!(
        csa::History::parse(&[0u8; 67], EFFECTIVE),
        Err(CodecError::InvalidLength { expected: 68, actual: 67, .. })
    ));
    assert!(matches!(
        <csa::LogEntry as HistoryRecord>::parse(&[0u8; 16], EFFECTIVE),
        Err(CodecError::InvalidLength { expected: 17, .. })
    ));
}

#[test]
fn test_history_equality_ignores_unused_slots() {
    let mut a = csa::History::new(EFFECTIVE);
    let mut b = csa::History::new(EFFECTIVE);
    a.add(log(1)).expect("add");
    a.add(log(2)).expect("add");
    a.clear();
    a.add(log(3)).expect("add");
    b.add(log(3)).expect("add");
    assert_eq!(a, b);
    assert_ne!(a, csa::History::new(EffectiveDate::from_minutes(1)));
}

#[test]
fn test_record_sizes_match_encoded_length() {
    assert_eq!(<csa::LogEntry as HistoryRecord>::SIZE, csa::LogEntry::SIZE);
    assert_eq!(<osa::TransactionRecord as HistoryRecord>::SIZE, osa::TransactionRecord::SIZE);
    assert_eq!(log(1).to_bytes().expect("encode").len(), <csa::LogEntry as HistoryRecord>::SIZE);
    assert_eq!(
        record(1).to_bytes().expect("encode").len(),
        <osa::TransactionRecord as HistoryRecord>::SIZE
    );
}
