// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Modem power sequencing and AT bring-up for the SIM8262E-M2.
//!
//! The module is brought up in a fixed order: power rails, hardware reset,
//! airplane-mode release, USB enumeration, then AT readiness. Each GPIO
//! step has a settle delay the module requires; shortening them leaves the
//! modem half-booted with a dead USB interface.

use core::fmt::Write as _;

use embedded_hal::digital::OutputPin;
use heapless::String;

use lark_common::at::{AtEngine, AtError};
use lark_common::scan;
use lark_common::transport::{Clock, Transport};

use crate::board::ModemPins;
use crate::config;

const LINK_POLL_MS: u32 = 10;

pub fn power_on(pins: &mut ModemPins, clock: &mut impl Clock) {
    pins.power_en.set_high().ok();
    pins.power_off.set_low().ok();
    clock.delay_ms(2_000);
    pins.power_off.set_high().ok();
    clock.delay_ms(2_000);
}

pub fn power_off(pins: &mut ModemPins, clock: &mut impl Clock) {
    pins.power_off.set_low().ok();
    clock.delay_ms(3_000);
    pins.power_en.set_low().ok();
}

pub fn hard_reset(pins: &mut ModemPins, clock: &mut impl Clock) {
    pins.reset.set_high().ok();
    clock.delay_ms(200);
    pins.reset.set_low().ok();
    clock.delay_ms(200);
}

pub fn leave_airplane_mode(pins: &mut ModemPins, clock: &mut impl Clock) {
    pins.airplane.set_high().ok();
    clock.delay_ms(500);
}

/// Wait until the USB link reports class-ready.
pub fn wait_for_link<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
    timeout_ms: u32,
) -> Result<(), AtError> {
    let (tp, clock) = at.parts();
    let start = clock.now_ms();
    while !tp.is_ready() {
        tp.task();
        if clock.now_ms() - start > timeout_ms as u64 {
            return Err(AtError::NotReady);
        }
        clock.delay_ms(LINK_POLL_MS);
    }
    Ok(())
}

/// Poke the modem with `AT` on a two-second grid until it answers.
pub fn wait_for_at_ready<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
    timeout_ms: u32,
) -> Result<(), AtError> {
    let start = at.parts().1.now_ms();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match at.send_command("AT\r\n", 1_500) {
            Ok(_) => {
                defmt::println!("modem: AT ready after {} attempts", attempts);
                return Ok(());
            }
            Err(AtError::NotReady) => return Err(AtError::NotReady),
            Err(_) => {}
        }

        let (_, clock) = at.parts();
        let elapsed = clock.now_ms() - start;
        if elapsed > timeout_ms as u64 {
            return Err(AtError::Timeout);
        }
        let next_attempt = attempts as u64 * 2_000;
        if next_attempt > elapsed {
            clock.delay_ms((next_attempt - elapsed) as u32);
        }
    }
}

/// Full bring-up: power, reset, link, AT readiness, identity and signal
/// checks. Fails only on the steps the update path cannot run without.
pub fn init<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
    pins: &mut ModemPins,
    clock: &mut impl Clock,
) -> Result<(), AtError> {
    defmt::println!("modem: power on");
    power_on(pins, clock);

    defmt::println!("modem: hardware reset");
    hard_reset(pins, clock);
    leave_airplane_mode(pins, clock);

    defmt::println!("modem: waiting for USB link");
    wait_for_link(at, config::LINK_TIMEOUT_MS)?;
    defmt::println!("modem: link ready, waiting for AT");
    wait_for_at_ready(at, config::AT_READY_TIMEOUT_MS)?;

    // Echo off first so later replies stay parseable.
    at.send_command("ATE0\r\n", 2_000)?;
    at.send_command("AT\r\n", 1_000)?;

    if at.send_command("ATI\r\n", 2_000).is_ok() {
        log_response("modem id", at.response());
    }
    if at.send_command("AT+CGSN\r\n", 1_000).is_ok() {
        log_response("imei", at.response());
    }

    if let Ok(resp) = at.send_command("AT+CPIN?\r\n", 1_000) {
        if scan::contains(resp, b"READY") {
            defmt::println!("modem: SIM ready");
        } else {
            defmt::println!("modem: SIM not ready");
        }
    }

    if let Ok(resp) = at.send_command("AT+CSQ\r\n", 1_000) {
        if let Some((rssi, _ber)) = scan::parse_csq(resp) {
            defmt::println!(
                "modem: signal {} dBm (rssi={})",
                scan::rssi_to_dbm(rssi),
                rssi
            );
        }
    }

    let _ = at.send_command("AT+CREG?\r\n", 1_000);

    if let Ok(resp) = at.send_command("AT+COPS?\r\n", 2_000) {
        if let Some(op) = quoted_field(resp) {
            defmt::println!("modem: operator {=str}", op);
        }
    }

    defmt::println!("modem: init complete");
    Ok(())
}

/// Configure and activate the PDP context.
pub fn setup_data_connection<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
    apn: &str,
) -> Result<(), AtError> {
    defmt::println!("modem: configuring PDP context (apn {=str})", apn);

    // Deactivate a leftover context first; failure here is normal.
    let _ = at.send_command("AT+CGACT=0,1\r\n", 5_000);

    let mut cmd: String<128> = String::new();
    let _ = write!(cmd, "AT+CGDCONT=1,\"IP\",\"{}\"\r\n", apn);
    at.send_command(&cmd, 2_000)?;

    // Attach can take a while on a cold network search.
    at.send_command("AT+CGACT=1,1\r\n", 30_000)?;

    if at.send_command("AT+CGPADDR=1\r\n", 2_000).is_ok() {
        log_response("pdp address", at.response());
    }
    Ok(())
}

/// Quick health sweep before a download attempt.
pub fn check_network<T: Transport, C: Clock>(at: &mut AtEngine<T, C>) {
    let _ = at.send_command("AT+CPIN?\r\n", 2_000);
    let _ = at.send_command("AT+CSQ\r\n", 2_000);
    let _ = at.send_command("AT+CREG?\r\n", 1_000);
    let _ = at.send_command("AT+COPS?\r\n", 2_000);
    let _ = at.send_command("AT+CGACT?\r\n", 2_000);
}

/// First quoted field of a reply, e.g. the operator name in `+COPS:`.
fn quoted_field(resp: &[u8]) -> Option<&str> {
    let open = scan::find(resp, b"\"")?;
    let rest = &resp[open + 1..];
    let close = scan::find(rest, b"\"")?;
    core::str::from_utf8(&rest[..close]).ok()
}

fn log_response(label: &str, resp: &[u8]) {
    match core::str::from_utf8(resp) {
        Ok(text) => defmt::println!("modem: {=str}: {=str}", label, text.trim()),
        Err(_) => defmt::println!("modem: {=str}: <non-text reply>", label),
    }
}
