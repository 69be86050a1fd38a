//! Container fuzz target: feed arbitrary bytes to both block parsers.
//! Parsing must not panic. Whatever parses must re-encode to 96 bytes that parse back equal.
//! Build with: cargo fuzz run container_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use openloop::{csa, osa, EffectiveDate};

    // First 3 bytes pick the effective date so offsets near the 24-bit limit get exercised.
    let (date, block) = match data.split_first_chunk::<3>() {
        Some((d, rest)) => (u32::from_be_bytes([0, d[0], d[1], d[2]]) as u64, rest),
        None => (0, data),
    };
    let effective = EffectiveDate::from_minutes(date);

    if let Ok(card) = csa::Container::parse(block, effective) {
        let bytes = card.to_bytes().expect("decoded CSA must re-encode");
        assert_eq!(bytes.len(), csa::Container::TOTAL_SIZE);
        let again = csa::Container::parse(&bytes, effective).expect("re-encoded CSA must parse");
        assert_eq!(again, card);
        let _ = card.to_string();
    }
    if let Ok(card) = osa::Container::parse(block, effective) {
        let bytes = card.to_bytes().expect("decoded OSA must re-encode");
        assert_eq!(bytes.len(), osa::Container::TOTAL_SIZE);
        let again = osa::Container::parse(&bytes, effective).expect("re-encoded OSA must parse");
        assert_eq!(again, card);
        let _ = card.to_string();
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run container_fuzz");
}
