//! Decode a 96-byte CSA or OSA block and print it.
//!
//! Usage:
//!   card_dump [--csa|--osa] [--effective-date=MINUTES] [--hex] [--emit-hex] [FILE|-]
//!   card_dump [--csa|--osa] --demo [--emit-hex]
//!
//! FILE holds the raw block (or hex text with `--hex`); `-` or no FILE reads stdin.
//! `--demo` builds a populated sample block instead of reading input.
//! Log verbosity follows `RUST_LOG` (default `warn`); logs go to stderr.

use anyhow::Context;
use openloop::dump::write_hex_with_offset;
use openloop::osa::TripPass;
use openloop::{csa, osa, parse_hex, EffectiveDate, LanguageCode, ServiceStatus, Terminal, TxnStatus};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEMO_CSA_EFFECTIVE_DATE: u64 = 28_399_680;
const DEMO_OSA_EFFECTIVE_DATE: u64 = 28_300_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Area {
    Csa,
    Osa,
}

fn take_flag(raw_args: &mut Vec<String>, names: &[&str]) -> bool {
    match raw_args.iter().position(|a| names.contains(&a.as_str())) {
        Some(pos) => {
            raw_args.remove(pos);
            true
        }
        None => false,
    }
}

fn take_value(raw_args: &mut Vec<String>, prefix: &str) -> Option<String> {
    let pos = raw_args.iter().position(|a| a.starts_with(prefix))?;
    let arg = raw_args.remove(pos);
    arg.strip_prefix(prefix).map(str::to_string)
}

fn read_input(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if path.as_os_str() == "-" {
        std::io::stdin().read_to_end(&mut buf).context("reading stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("opening {}", path.display()))?
            .read_to_end(&mut buf)
            .with_context(|| format!("reading {}", path.display()))?;
    }
    Ok(buf)
}

fn demo_terminal() -> anyhow::Result<Terminal> {
    let mut terminal = Terminal::new();
    terminal.set_acquirer_id(10);
    terminal.set_operator_id(1000);
    terminal.set_terminal_id("ABCDEF")?;
    Ok(terminal)
}

fn demo_csa() -> anyhow::Result<csa::Container> {
    let effective = EffectiveDate::from_minutes(DEMO_CSA_EFFECTIVE_DATE);
    let mut card = csa::Container::new(effective);
    card.general_mut().set_version(1, 2, 3)?;
    card.general_mut().set_language(LanguageCode::English)?;

    let terminal = demo_terminal()?;
    card.update_validation(|validation| {
        validation.set_terminal(terminal);
        validation.set_date_and_time(1_735_689_600_000)?;
        validation.set_fare_amount(1500);
        validation.set_txn_status(TxnStatus::Entry)
    })?;

    let mut log = csa::LogEntry::new(effective);
    log.set_terminal(demo_terminal()?);
    log.set_date_and_time(1_735_603_200_000)?;
    log.set_txn_sq_no(101);
    log.set_card_balance(20_000)?;
    log.set_txn_status(TxnStatus::Exit)?;
    card.add_log_entry(log)?;

    card.set_rfu([0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03]);
    Ok(card)
}

fn demo_osa() -> anyhow::Result<osa::Container> {
    let effective = EffectiveDate::from_minutes(DEMO_OSA_EFFECTIVE_DATE);
    let mut card = osa::Container::new(effective);
    let general = card.general_mut();
    general.set_version(1, 0, 0)?;
    general.set_phone_number("7977192875")?;
    general.set_language(LanguageCode::Hindi)?;
    general.set_service_status(ServiceStatus::Active);

    card.update_validation(|validation| {
        validation.set_date_and_time(1_735_689_600_000)?;
        validation.set_station_id(42);
        validation.set_fare(300);
        validation.set_terminal_id(0x00AB_CDEF)
    })?;

    let mut record = osa::TransactionRecord::new(effective);
    record.set_date_and_time(1_735_603_200_000)?;
    record.set_station_id(17);
    record.set_fare(250);
    record.set_txn_status(TxnStatus::Exit)?;
    card.add_transaction(record)?;

    let pass = TripPass::builder()
        .pass_id(1)
        .pass_expiry(1_000_000_000)
        .priority(1)
        .trips(40, 35)
        .route(101, 202)
        .flags(0b1000_0001)
        .build()?;
    card.set_trip_pass(pass, 0)?;
    Ok(card)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut raw_args: Vec<String> = std::env::args().skip(1).collect();
    let area = if take_flag(&mut raw_args, &["--osa"]) {
        Area::Osa
    } else {
        take_flag(&mut raw_args, &["--csa"]);
        Area::Csa
    };
    let hex_input = take_flag(&mut raw_args, &["--hex"]);
    let emit_hex = take_flag(&mut raw_args, &["--emit-hex"]);
    let demo = take_flag(&mut raw_args, &["--demo"]);
    let effective_date: Option<u64> = match take_value(&mut raw_args, "--effective-date=") {
        Some(v) => Some(
            v.parse()
                .with_context(|| format!("--effective-date expects minutes since the epoch, got {:?}", v))?,
        ),
        None => None,
    };
    if let Some(unknown) = raw_args.iter().find(|a| a.starts_with("--")) {
        anyhow::bail!("unknown option {}", unknown);
    }
    let mut args = raw_args.into_iter();
    let input_path: PathBuf = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("-"));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let (text, bytes) = if demo {
        tracing::info!(?area, "building demo block");
        match area {
            Area::Csa => {
                let card = demo_csa()?;
                (card.to_string(), card.to_bytes()?)
            }
            Area::Osa => {
                let card = demo_osa()?;
                (card.to_string(), card.to_bytes()?)
            }
        }
    } else {
        let raw = read_input(&input_path)?;
        let block = if hex_input {
            let text = std::str::from_utf8(&raw).context("hex input is not UTF-8")?;
            parse_hex(text)?
        } else {
            raw
        };
        let effective = EffectiveDate::from_minutes(effective_date.unwrap_or_else(|| {
            tracing::warn!("no --effective-date given; decoding relative times against minute 0");
            0
        }));
        tracing::debug!(path = %input_path.display(), len = block.len(), ?area, "decoding block");
        match area {
            Area::Csa => {
                let card = csa::Container::parse(&block, effective)
                    .with_context(|| format!("decoding CSA block from {}", input_path.display()))?;
                (card.to_string(), card.to_bytes()?)
            }
            Area::Osa => {
                let card = osa::Container::parse(&block, effective)
                    .with_context(|| format!("decoding OSA block from {}", input_path.display()))?;
                (card.to_string(), card.to_bytes()?)
            }
        }
    };

    writeln!(out, "{}", text)?;
    if emit_hex {
        writeln!(out, "encoded ({} bytes):", bytes.len())?;
        write_hex_with_offset(&mut out, &bytes)?;
    }
    Ok(())
}
