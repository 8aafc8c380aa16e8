// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Chunked firmware download over the modem's HTTP AT service.
//!
//! Sequence: terminate any stale session, `HTTPINIT`, set the URL, issue
//! the GET and wait for its URC, then pull the body with bounded `HTTPREAD`
//! chunks until the advertised length is in. `HTTPTERM` runs on every exit
//! path so the modem's internal session is released no matter how the
//! transfer ends. No step retries internally: a failed chunk fails the
//! whole download and the caller decides when to try again.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::at::{AtEngine, AtError};
use crate::chunk::{self, ChunkError};
use crate::download::{ChunkRequest, DownloadState};
use crate::scan::{self, HttpActionReport};
use crate::transport::{Clock, Transport};

/// Read granularity. Larger reads make the modem interleave URCs into the
/// payload stream; this size is reliable across firmware revisions.
pub const CHUNK_SIZE: usize = 330;

/// One chunk reply: framing text plus payload, with headroom.
const CHUNK_RX_CAPACITY: usize = 1024;

const CHUNK_TIMEOUT_MS: u32 = 10_000;
const ACTION_TIMEOUT_MS: u32 = 60_000;
const COMMAND_TIMEOUT_MS: u32 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DownloadError {
    At(AtError),
    /// Server answered, but not with 200.
    HttpStatus(u16),
    /// Advertised content length exceeds the destination buffer.
    TooLarge { declared: usize, capacity: usize },
    /// Malformed chunk framing.
    Chunk(ChunkError),
    /// A chunk completed with no usable payload.
    EmptyChunk,
    /// The action URC or a chunk's end sentinel never arrived.
    Timeout,
}

impl From<AtError> for DownloadError {
    fn from(e: AtError) -> Self {
        DownloadError::At(e)
    }
}

impl From<ChunkError> for DownloadError {
    fn from(e: ChunkError) -> Self {
        DownloadError::Chunk(e)
    }
}

/// Fetch `url` into `dest`, reporting `(done, total)` after every chunk.
/// Returns the number of bytes written to `dest`.
pub fn download<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
    url: &str,
    dest: &mut [u8],
    progress: &mut dyn FnMut(usize, usize),
) -> Result<usize, DownloadError> {
    // A previous session may still be open; terminating a closed one is
    // answered with ERROR and that is fine.
    let _ = at.send_command("AT+HTTPTERM\r\n", COMMAND_TIMEOUT_MS);

    at.send_command("AT+HTTPINIT\r\n", COMMAND_TIMEOUT_MS)?;
    at.parts().0.set_streaming(true);

    let result = run_session(at, url, dest, progress);

    // Release the modem's HTTP resources on every path.
    at.parts().0.set_streaming(false);
    let _ = at.send_command("AT+HTTPTERM\r\n", COMMAND_TIMEOUT_MS);

    result
}

fn run_session<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
    url: &str,
    dest: &mut [u8],
    progress: &mut dyn FnMut(usize, usize),
) -> Result<usize, DownloadError> {
    let mut cmd: String<512> = String::new();
    let _ = write!(cmd, "AT+HTTPPARA=\"URL\",\"{}\"\r\n", url);
    at.send_command(&cmd, COMMAND_TIMEOUT_MS)?;

    let report = request_action(at)?;
    if report.status != 200 {
        return Err(DownloadError::HttpStatus(report.status));
    }

    let total = report.length as usize;
    let mut state = DownloadState::new(total, dest.len()).ok_or(DownloadError::TooLarge {
        declared: total,
        capacity: dest.len(),
    })?;

    // Pull the response headers into the trace; harmless if unsupported.
    let _ = at.send_command("AT+HTTPHEAD\r\n", 5_000);

    while let Some(req) = state.next_request(CHUNK_SIZE) {
        let slot = &mut dest[req.offset..req.offset + req.len];
        let n = read_chunk(at, req, slot)?;
        if !state.accept(n) {
            return Err(DownloadError::EmptyChunk);
        }
        progress(state.done(), state.total());
    }

    Ok(state.done())
}

/// Issue `HTTPACTION=0` and wait for its URC. The modem acknowledges the
/// command with `OK` almost immediately; the status and content length only
/// arrive once the request has actually completed.
fn request_action<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
) -> Result<HttpActionReport, DownloadError> {
    let (tp, clock) = at.parts();

    tp.flush_rx();
    tp.write(b"AT+HTTPACTION=0\r\n", 1_000)
        .map_err(|e| DownloadError::At(AtError::Transport(e)))?;

    let mut resp: Vec<u8, 512> = Vec::new();
    let start = clock.now_ms();
    let mut last_rearm: u64 = 0;

    while clock.now_ms() - start < ACTION_TIMEOUT_MS as u64 {
        tp.task();

        let now = clock.now_ms();
        if now - last_rearm >= 50 {
            tp.start_receive();
            last_rearm = now;
        }

        drain(tp, &mut resp);
        if let Some(report) = scan::parse_http_action(&resp) {
            return Ok(report);
        }
        if scan::contains(&resp, b"ERROR") {
            return Err(DownloadError::At(AtError::CommandFailed));
        }

        clock.delay_ms(10);
    }

    Err(DownloadError::Timeout)
}

/// Read one chunk. The reply is accumulated raw until the end sentinel
/// shows up: the payload is binary, so nothing short of the sentinel
/// pattern says the modem is done talking.
fn read_chunk<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
    req: ChunkRequest,
    dest: &mut [u8],
) -> Result<usize, DownloadError> {
    let mut cmd: String<64> = String::new();
    let _ = write!(cmd, "AT+HTTPREAD={},{}\r\n", req.offset, req.len);

    let (tp, clock) = at.parts();
    tp.flush_rx();
    tp.write(cmd.as_bytes(), 1_000)
        .map_err(|e| DownloadError::At(AtError::Transport(e)))?;

    let mut raw: Vec<u8, CHUNK_RX_CAPACITY> = Vec::new();
    let start = clock.now_ms();
    let mut complete = false;

    while clock.now_ms() - start < CHUNK_TIMEOUT_MS as u64 {
        tp.task();
        tp.start_receive();
        drain(tp, &mut raw);

        if chunk::is_complete(&raw) {
            complete = true;
            break;
        }
        clock.delay_ms(2);
    }

    if !complete {
        return Err(DownloadError::Timeout);
    }

    let payload = chunk::parse(&raw, req.len)?;
    dest[..payload.len()].copy_from_slice(payload);
    Ok(payload.len())
}

fn drain<T: Transport, const N: usize>(tp: &mut T, acc: &mut Vec<u8, N>) {
    let mut buf = [0u8; 128];
    loop {
        let n = tp.read(&mut buf);
        if n == 0 {
            return;
        }
        for &byte in &buf[..n] {
            if acc.push(byte).is_err() {
                return;
            }
        }
    }
}
