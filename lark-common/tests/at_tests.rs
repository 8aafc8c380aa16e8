// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the AT command engine against a scripted transport.

mod mock;

use lark_common::at::{AtEngine, AtError, RESPONSE_CAPACITY};
use lark_common::scan;
use mock::{MockClock, MockTransport, Step};

fn engine(script: Vec<Step>) -> AtEngine<MockTransport, MockClock> {
    AtEngine::new(MockTransport::new(script), MockClock::default())
}

// =============================================================================
// send_command
// =============================================================================

#[test]
fn test_command_resolves_on_ok() {
    let mut at = engine(vec![Step::new(b"AT\r\n", b"\r\nOK\r\n")]);
    let resp = at.send_command("AT\r\n", 1000).unwrap();
    assert!(scan::contains(resp, b"OK"));
}

#[test]
fn test_command_returns_payload_before_ok() {
    let mut at = engine(vec![Step::new(
        b"AT+CGSN",
        b"\r\n867698051234567\r\n\r\nOK\r\n",
    )]);
    let resp = at.send_command("AT+CGSN\r\n", 1000).unwrap();
    assert!(scan::contains(resp, b"867698051234567"));
}

#[test]
fn test_command_fails_on_error() {
    let mut at = engine(vec![Step::new(b"AT+GARBAGE", b"\r\nERROR\r\n")]);
    assert_eq!(
        at.send_command("AT+GARBAGE\r\n", 1000),
        Err(AtError::CommandFailed)
    );
}

#[test]
fn test_command_times_out_without_terminator() {
    let mut at = engine(vec![Step::new(b"AT\r\n", b"\r\npartial")]);
    assert_eq!(at.send_command("AT\r\n", 500), Err(AtError::Timeout));
}

#[test]
fn test_command_requires_ready_transport() {
    let mut transport = MockTransport::new(vec![]);
    transport.ready = false;
    let mut at = AtEngine::new(transport, MockClock::default());
    assert_eq!(at.send_command("AT\r\n", 1000), Err(AtError::NotReady));
}

#[test]
fn test_response_accumulates_across_reads() {
    // Reply arrives in three pieces over successive re-arms.
    let mut at = engine(vec![Step::staged(
        b"ATI",
        &[b"\r\nSIM8262E", b"-M2\r\n", b"\r\nOK\r\n"],
    )]);
    let resp = at.send_command("ATI\r\n", 2000).unwrap();
    assert!(scan::contains(resp, b"SIM8262E-M2"));
}

#[test]
fn test_oversized_response_truncates_silently() {
    let huge = vec![b'x'; RESPONSE_CAPACITY + 200];
    let mut at = engine(vec![Step::new(b"AT+BIG", &huge)]);
    // No terminator fits in the retained prefix, so this times out rather
    // than faulting; the buffer holds exactly its capacity.
    assert_eq!(at.send_command("AT+BIG\r\n", 300), Err(AtError::Timeout));
    assert_eq!(at.response().len(), RESPONSE_CAPACITY);
}

// =============================================================================
// send_command_wait_urc
// =============================================================================

#[test]
fn test_urc_completes_only_on_marker() {
    // OK acknowledges the command; the URC lands later.
    let mut at = engine(vec![Step::staged(
        b"AT+HTTPACTION=0",
        &[b"\r\nOK\r\n", b"\r\n+HTTPACTION: 0,200,1000\r\n"],
    )]);
    let resp = at
        .send_command_wait_urc("AT+HTTPACTION=0\r\n", "+HTTPACTION:", 5000)
        .unwrap();
    let report = scan::parse_http_action(resp).unwrap();
    assert_eq!(report.status, 200);
    assert_eq!(report.length, 1000);
}

#[test]
fn test_urc_ok_alone_is_not_completion() {
    let mut at = engine(vec![Step::new(b"AT+HTTPACTION=0", b"\r\nOK\r\n")]);
    assert_eq!(
        at.send_command_wait_urc("AT+HTTPACTION=0\r\n", "+HTTPACTION:", 400),
        Err(AtError::Timeout)
    );
}

#[test]
fn test_urc_error_fails_immediately() {
    let mut at = engine(vec![Step::new(b"AT+HTTPACTION=0", b"\r\nERROR\r\n")]);
    assert_eq!(
        at.send_command_wait_urc("AT+HTTPACTION=0\r\n", "+HTTPACTION:", 5000),
        Err(AtError::CommandFailed)
    );
}

#[test]
fn test_urc_connection_closed_is_a_hard_failure() {
    let mut at = engine(vec![Step::staged(
        b"AT+HTTPACTION=0",
        &[b"\r\nOK\r\n", b"\r\n+CCHCLOSE: 1\r\n"],
    )]);
    assert_eq!(
        at.send_command_wait_urc("AT+HTTPACTION=0\r\n", "+HTTPACTION:", 5000),
        Err(AtError::ConnectionClosed)
    );
}

#[test]
fn test_expected_cchclose_urc_still_matches() {
    // Waiting for +CCHCLOSE itself must not be misread as a dropped link.
    let mut at = engine(vec![Step::new(b"AT+CCHCLOSE=0", b"\r\n+CCHCLOSE: 0\r\nOK\r\n")]);
    assert!(at
        .send_command_wait_urc("AT+CCHCLOSE=0\r\n", "+CCHCLOSE:", 2000)
        .is_ok());
}
