//! # Wire layout: byte-exact checks of both 96-byte blocks
//!
//! All multi-byte integers are big-endian; sub-byte fields are packed MSB-first.
//!
//! ## CSA
//!
//! | Offset | Bytes | Field |
//! |-------:|------:|-------|
//! | 0  | 1 | version `major(3) minor(3) patch(2)` |
//! | 1  | 1 | `language(5) rfu(3)` |
//! | 2  | 1 | validation error code |
//! | 3  | 1 | validation product type |
//! | 4  | 6 | validation terminal `acquirer(1) operator(2) terminal(3)` |
//! | 10 | 3 | validation time (minutes after effective date) |
//! | 13 | 2 | fare amount |
//! | 15 | 2 | route number |
//! | 17 | 3 | service provider data |
//! | 20 | 1 | `status(4) rfu(4)` |
//! | 21 | 4 x 17 | log entries, newest first, zero-filled when unused |
//! | 89 | 7 | RFU |
//!
//! A log entry is `terminal(6) time(3) amount(2) sq_no(2) balance(20 bits) 0xF(4 bits) status(4) rfu(4)`.
//!
//! ## OSA
//!
//! | Offset | Bytes | Field |
//! |-------:|------:|-------|
//! | 0  | 1 | version |
//! | 1  | 5 | phone number, BCD |
//! | 6  | 1 | `language(5) status(1) rfu(2)` |
//! | 7  | 13 | validation `error(1) product(1) time(3) station(2) fare(2) terminal(3) status/rfu(1)` |
//! | 20 | 2 x 13 | history, same record layout |
//! | 46 | 2 x 20 | trip passes |
//! | 86 | 10 | zero padding |
//!
//! A trip pass is `id(1) expiry_s(3) priority(1) allotted(2) remaining(2) source(2)
//! destination(2) flags(1) daily_counter(1) daily_indicator(2) start_s(3)`.

use openloop::osa::TripPass;
use openloop::{csa, osa, EffectiveDate, LanguageCode, ServiceStatus, Terminal, TxnStatus};

const CSA_EFFECTIVE: EffectiveDate = EffectiveDate::from_minutes(28_399_680);
const OSA_EFFECTIVE: EffectiveDate = EffectiveDate::from_minutes(28_300_000);

#[rustfmt::skip]
const GOLDEN_CSA: [u8; 96] = [
    0x2B, 0x00, 0x00, 0x00, 0x0A, 0x03, 0xE8, 0xAB, 0xCD, 0xEF, 0x08, 0x10, 0x60, 0x05, 0xDC, 0x00,
    0x0C, 0xAB, 0xCD, 0xEF, 0x10, 0x0A, 0x03, 0xE8, 0xAB, 0xCD, 0xEF, 0x08, 0x0A, 0xC0, 0x00, 0x00,
    0x00, 0x65, 0x04, 0xE2, 0x0F, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03,
];

fn terminal() -> Terminal {
    let mut t = Terminal::new();
    t.set_acquirer_id(10);
    t.set_operator_id(1000);
    t.set_terminal_id("abcdef").expect("terminal id");
    t
}

fn golden_csa() -> csa::Container {
    let mut card = csa::Container::new(CSA_EFFECTIVE);
    card.general_mut().set_version(1, 2, 3).expect("version");
    card.general_mut().set_language(LanguageCode::English).expect("language");

    card.update_validation(|v| {
        v.set_terminal(terminal());
        v.set_date_and_time(1_735_689_600_000)?;
        v.set_fare_amount(1500);
        v.set_route_number(12);
        v.set_service_provider_data(0x00AB_CDEF)
    })
    .expect("validation");

    let mut log = csa::LogEntry::new(CSA_EFFECTIVE);
    log.set_terminal(terminal());
    log.set_date_and_time(1_735_603_200_000).expect("time");
    log.set_txn_sq_no(101);
    log.set_card_balance(20_000).expect("balance");
    card.add_log_entry(log).expect("add");

    card.set_rfu([0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03]);
    card
}

#[test]
fn test_csa_golden_bytes() {
    let bytes = golden_csa().to_bytes().expect("encode");
    assert_eq!(bytes, GOLDEN_CSA.to_vec());
}

#[test]
fn test_csa_golden_decode() {
    let card = csa::Container::parse(&GOLDEN_CSA, CSA_EFFECTIVE).expect("decode");
    assert_eq!(card, golden_csa());
    assert_eq!(card.history().valid_count(), 1);
    assert_eq!(card.validation().time_offset(), 0x08_1060);
    assert_eq!(card.history().records()[0].time_offset(), 0x08_0AC0);
}

#[test]
fn test_csa_balance_filler_is_ignored_on_decode() {
    let mut bytes = GOLDEN_CSA;
    // Third balance byte of the first log entry: 0x0F -> 0x00
    bytes[36] = 0x00;
    let card = csa::Container::parse(&bytes, CSA_EFFECTIVE).expect("decode");
    assert_eq!(card.history().records()[0].card_balance(), 20_000);
    assert_eq!(card.to_bytes().expect("re-encode"), GOLDEN_CSA.to_vec());
}

#[test]
fn test_csa_general_byte_packing() {
    let mut g = csa::General::new();
    g.set_version(7, 7, 3).expect("max version");
    g.set_language(LanguageCode::Bodo).expect("language");
    g.set_rfu(7).expect("rfu");
    assert_eq!(g.to_bytes().expect("encode"), vec![0xFF, (0b10110 << 3) | 0b111]);
}

#[test]
fn test_csa_log_entry_layout() {
    let mut log = csa::LogEntry::new(CSA_EFFECTIVE);
    log.set_terminal(terminal());
    log.set_time_offset(0x01_0203).expect("offset");
    log.set_txn_amount(0x0405);
    log.set_txn_sq_no(0x0607);
    log.set_card_balance(0xFFFFF).expect("balance");
    log.set_txn_status(TxnStatus::OneTap).expect("status");
    log.set_rfu(0x9).expect("rfu");
    assert_eq!(
        log.to_bytes().expect("encode"),
        vec![
            0x0A, 0x03, 0xE8, 0xAB, 0xCD, 0xEF, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0xFF, 0xFF, 0xFF,
            0x39
        ]
    );
}

fn golden_osa() -> osa::Container {
    let mut card = osa::Container::new(OSA_EFFECTIVE);
    let g = card.general_mut();
    g.set_version(1, 0, 0).expect("version");
    g.set_phone_number("1234567890").expect("phone");
    g.set_language(LanguageCode::Marathi).expect("language");
    g.set_service_status(ServiceStatus::Active);
    g.set_rfu(1).expect("rfu");

    card.update_validation(|v| {
        v.set_error_code(0xE1);
        v.set_product_type(0x02);
        v.set_date_and_time(1_735_689_600_000)?;
        v.set_station_id(0x0304);
        v.set_fare(0x0506);
        v.set_terminal_id(0x07_0809)?;
        v.set_txn_status(TxnStatus::Penalty)?;
        v.set_rfu(0xF)
    })
    .expect("validation");

    let pass = TripPass::builder()
        .pass_id(0x11)
        .pass_expiry(1_000_000_000)
        .priority(0x22)
        .trips(40, 35)
        .route(0x0102, 0x0304)
        .flags(0b1010_0101)
        .daily_trip_counter(3)
        .daily_trip_indicator(0xBEEF)
        .start_date_and_time(2_000_000)
        .build()
        .expect("pass");
    card.set_trip_pass(pass, 1).expect("slot 1");
    card
}

#[test]
fn test_osa_general_layout() {
    let bytes = golden_osa().to_bytes().expect("encode");
    assert_eq!(&bytes[..7], &[0x20, 0x12, 0x34, 0x56, 0x78, 0x90, (3 << 3) | (1 << 2) | 1]);
}

#[test]
fn test_osa_validation_layout() {
    let bytes = golden_osa().to_bytes().expect("encode");
    assert_eq!(
        &bytes[osa::Container::VALIDATION_OFFSET..osa::Container::HISTORY_OFFSET],
        &[0xE1, 0x02, 0x09, 0x95, 0xC0, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x2F]
    );
    assert!(bytes[osa::Container::HISTORY_OFFSET..osa::Container::TRIP_PASS_OFFSET]
        .iter()
        .all(|&b| b == 0));
}

#[test]
fn test_osa_trip_pass_layout() {
    let bytes = golden_osa().to_bytes().expect("encode");
    let first = osa::Container::TRIP_PASS_OFFSET;
    let second = first + TripPass::SIZE;
    assert!(bytes[first..second].iter().all(|&b| b == 0));
    assert_eq!(
        &bytes[second..second + TripPass::SIZE],
        &[
            0x11, 0x0F, 0x42, 0x40, 0x22, 0x00, 0x28, 0x00, 0x23, 0x01, 0x02, 0x03, 0x04, 0xA5, 0x03, 0xBE,
            0xEF, 0x00, 0x07, 0xD0
        ]
    );
    assert!(bytes[osa::Container::PADDING_OFFSET..].iter().all(|&b| b == 0));
}

#[test]
fn test_osa_golden_round_trip() {
    let card = golden_osa();
    let bytes = card.to_bytes().expect("encode");
    let decoded = osa::Container::parse(&bytes, OSA_EFFECTIVE).expect("decode");
    assert_eq!(decoded, card);
    assert_eq!(decoded.general().phone_number(), "1234567890");
    assert_eq!(decoded.trip_pass(1).expect("slot 1").start_date_and_time(), 2_000_000);
}

#[test]
fn test_osa_padding_is_not_inspected() {
    let mut bytes = golden_osa().to_bytes().expect("encode");
    bytes[95] = 0xFF;
    let card = osa::Container::parse(&bytes, OSA_EFFECTIVE).expect("decode");
    assert_eq!(card, golden_osa());
    assert_eq!(card.to_bytes().expect("re-encode")[95], 0x00);
}
