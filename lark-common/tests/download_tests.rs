// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! End-to-end downloader tests against a scripted modem conversation.

mod mock;

use lark_common::at::AtEngine;
use lark_common::chunk::ChunkError;
use lark_common::http::{download, DownloadError, CHUNK_SIZE};
use mock::{chunk_frame, MockClock, MockTransport, Step};

const URL: &str = "https://updates.example.com/lark/fw_with_crc.bin";

fn body_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

/// The standard session preamble: stale terminate, init, URL, GET, then
/// the header fetch issued for the trace on successful statuses.
fn preamble(status: u16, length: usize) -> Vec<Step> {
    let action = format!("\r\nOK\r\n\r\n+HTTPACTION: 0,{},{}\r\n", status, length);
    let mut steps = vec![
        Step::new(b"AT+HTTPTERM", b"\r\nERROR\r\n"),
        Step::new(b"AT+HTTPINIT", b"\r\nOK\r\n"),
        Step::new(b"AT+HTTPPARA=\"URL\"", b"\r\nOK\r\n"),
        Step::new(b"AT+HTTPACTION=0", action.as_bytes()),
    ];
    // The header fetch happens only once the content length was accepted
    // against the 4096-byte destination used throughout these tests.
    if status == 200 && length > 0 && length <= 4096 {
        steps.push(Step::new(
            b"AT+HTTPHEAD",
            b"\r\n+HTTPHEAD: 64\r\nHTTP/1.1 200 OK\r\nContent-Type: bin\r\n\r\nOK\r\n",
        ));
    }
    steps
}

#[test]
fn test_downloads_1000_bytes_in_four_chunks() {
    let body = body_bytes(1000);
    assert_eq!(CHUNK_SIZE, 330);

    let mut script = preamble(200, 1000);
    script.push(Step::new(
        b"AT+HTTPREAD=0,330",
        &chunk_frame(&body[0..330]),
    ));
    script.push(Step::new(
        b"AT+HTTPREAD=330,330",
        &chunk_frame(&body[330..660]),
    ));
    script.push(Step::new(
        b"AT+HTTPREAD=660,330",
        &chunk_frame(&body[660..990]),
    ));
    script.push(Step::new(
        b"AT+HTTPREAD=990,10",
        &chunk_frame(&body[990..1000]),
    ));
    script.push(Step::new(b"AT+HTTPTERM", b"\r\nOK\r\n"));

    let mut at = AtEngine::new(MockTransport::new(script), MockClock::default());
    let mut dest = vec![0u8; 4096];
    let mut reports = Vec::new();

    let n = download(&mut at, URL, &mut dest, &mut |done, total| {
        reports.push((done, total))
    })
    .unwrap();

    assert_eq!(n, 1000);
    assert_eq!(&dest[..1000], &body[..]);
    assert_eq!(
        reports,
        [(330, 1000), (660, 1000), (990, 1000), (1000, 1000)]
    );

    // Progress percentages floor as 33, 66, 99, 100.
    let percents: Vec<usize> = reports.iter().map(|(d, t)| d * 100 / t).collect();
    assert_eq!(percents, [33, 66, 99, 100]);

    let (tp, _) = at.parts();
    assert!(!tp.streaming, "streaming must be off after the session");
}

#[test]
fn test_http_404_aborts_before_any_read_and_still_terminates() {
    let mut script = preamble(404, 0);
    script.push(Step::new(b"AT+HTTPTERM", b"\r\nOK\r\n"));

    let mut at = AtEngine::new(MockTransport::new(script), MockClock::default());
    let mut dest = vec![0u8; 4096];

    let err = download(&mut at, URL, &mut dest, &mut |_, _| {}).unwrap_err();
    assert_eq!(err, DownloadError::HttpStatus(404));

    let (tp, _) = at.parts();
    assert!(!tp.wrote_containing(b"AT+HTTPREAD="));
    let last = tp.writes.last().unwrap();
    assert!(last.starts_with(b"AT+HTTPTERM"));
}

#[test]
fn test_content_length_beyond_capacity_is_rejected_before_reading() {
    let mut script = preamble(200, 5000);
    script.push(Step::new(b"AT+HTTPTERM", b"\r\nOK\r\n"));

    let mut at = AtEngine::new(MockTransport::new(script), MockClock::default());
    let mut dest = vec![0u8; 4096];

    let err = download(&mut at, URL, &mut dest, &mut |_, _| {}).unwrap_err();
    assert_eq!(
        err,
        DownloadError::TooLarge {
            declared: 5000,
            capacity: 4096
        }
    );

    let (tp, _) = at.parts();
    assert!(!tp.wrote_containing(b"AT+HTTPREAD="));
}

#[test]
fn test_single_chunk_download() {
    let body = body_bytes(64);
    let mut script = preamble(200, 64);
    script.push(Step::new(b"AT+HTTPREAD=0,64", &chunk_frame(&body)));
    script.push(Step::new(b"AT+HTTPTERM", b"\r\nOK\r\n"));

    let mut at = AtEngine::new(MockTransport::new(script), MockClock::default());
    let mut dest = vec![0u8; 4096];

    let n = download(&mut at, URL, &mut dest, &mut |_, _| {}).unwrap();
    assert_eq!(n, 64);
    assert_eq!(&dest[..64], &body[..]);
}

#[test]
fn test_binary_payload_with_marker_like_bytes_survives() {
    let mut body = Vec::new();
    body.extend_from_slice(b"\r\n+HTTPREAD: 9\r\n");
    body.extend_from_slice(&[0x00, 0xFF, 0x0D, 0x0A, 0x55, 0xAA]);
    body.extend_from_slice(b"OK\r\n");

    let mut script = preamble(200, body.len());
    let read_cmd = format!("AT+HTTPREAD=0,{}", body.len());
    script.push(Step::new(read_cmd.as_bytes(), &chunk_frame(&body)));
    script.push(Step::new(b"AT+HTTPTERM", b"\r\nOK\r\n"));

    let mut at = AtEngine::new(MockTransport::new(script), MockClock::default());
    let mut dest = vec![0u8; 4096];

    let n = download(&mut at, URL, &mut dest, &mut |_, _| {}).unwrap();
    assert_eq!(&dest[..n], &body[..]);
}

#[test]
fn test_chunk_failure_aborts_whole_download() {
    let body = body_bytes(1000);
    let mut script = preamble(200, 1000);
    script.push(Step::new(
        b"AT+HTTPREAD=0,330",
        &chunk_frame(&body[0..330]),
    ));
    // Second chunk claims more bytes than it carries.
    let mut broken = Vec::new();
    broken.extend_from_slice(b"\r\nOK\r\n\r\n+HTTPREAD: DATA,330\r\n");
    broken.extend_from_slice(&body[330..400]);
    broken.extend_from_slice(b"\r\n+HTTPREAD: 0\r\n");
    script.push(Step::new(b"AT+HTTPREAD=330,330", &broken));
    script.push(Step::new(b"AT+HTTPTERM", b"\r\nOK\r\n"));

    let mut at = AtEngine::new(MockTransport::new(script), MockClock::default());
    let mut dest = vec![0u8; 4096];

    let err = download(&mut at, URL, &mut dest, &mut |_, _| {}).unwrap_err();
    assert_eq!(
        err,
        DownloadError::Chunk(ChunkError::Underrun {
            have: 70,
            need: 330
        })
    );

    let (tp, _) = at.parts();
    // No third chunk was attempted.
    assert!(!tp.wrote_containing(b"AT+HTTPREAD=660"));
    let last = tp.writes.last().unwrap();
    assert!(last.starts_with(b"AT+HTTPTERM"));
}

#[test]
fn test_missing_end_sentinel_times_out() {
    let body = body_bytes(64);
    let mut script = preamble(200, 64);
    // Frame without the end sentinel: accumulation never completes.
    let mut frame = Vec::new();
    frame.extend_from_slice(b"\r\nOK\r\n\r\n+HTTPREAD: DATA,64\r\n");
    frame.extend_from_slice(&body);
    script.push(Step::new(b"AT+HTTPREAD=0,64", &frame));
    script.push(Step::new(b"AT+HTTPTERM", b"\r\nOK\r\n"));

    let mut at = AtEngine::new(MockTransport::new(script), MockClock::default());
    let mut dest = vec![0u8; 4096];

    let err = download(&mut at, URL, &mut dest, &mut |_, _| {}).unwrap_err();
    assert_eq!(err, DownloadError::Timeout);
}

#[test]
fn test_streaming_enabled_during_session() {
    // Fail fast at the ACTION step and check the streaming flag was raised
    // for the session body and dropped afterwards.
    let script = vec![
        Step::new(b"AT+HTTPTERM", b"\r\nERROR\r\n"),
        Step::new(b"AT+HTTPINIT", b"\r\nOK\r\n"),
        Step::new(b"AT+HTTPPARA=\"URL\"", b"\r\nOK\r\n"),
        Step::new(b"AT+HTTPACTION=0", b"\r\nERROR\r\n"),
        Step::new(b"AT+HTTPTERM", b"\r\nOK\r\n"),
    ];
    let mut at = AtEngine::new(MockTransport::new(script), MockClock::default());
    let mut dest = vec![0u8; 256];

    let _ = download(&mut at, URL, &mut dest, &mut |_, _| {}).unwrap_err();
    let (tp, _) = at.parts();
    assert!(!tp.streaming);
}
