// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! AT command engine: synchronous request/response and request/URC
//! exchanges over the byte transport.
//!
//! Both primitives share the same accumulate-and-match loop: transmit, then
//! drain received bytes into a bounded buffer while polling the transport,
//! until a terminator (or the caller's URC) shows up or the deadline
//! passes. The receive transfer is re-armed on a short fixed cadence
//! independent of the outer pacing, so response-detection latency does not
//! ride on transfer latency.

use heapless::Vec;

use crate::scan::{self, UrcVerdict, Verdict};
use crate::transport::{Clock, Transport, TransportError};

/// Capacity of the accumulated response. Longer responses are truncated
/// silently; matching still runs over the retained prefix.
pub const RESPONSE_CAPACITY: usize = 512;

/// How long a transmit may take before the exchange is abandoned.
const WRITE_TIMEOUT_MS: u32 = 1_000;

// Plain commands resolve quickly; poll tightly.
const COMMAND_REARM_MS: u64 = 20;
const COMMAND_PACE_MS: u32 = 5;
// URC waits can run for a minute; poll half as hard.
const URC_REARM_MS: u64 = 50;
const URC_PACE_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtError {
    /// Transport not enumerated.
    NotReady,
    /// No terminator within the deadline.
    Timeout,
    /// The modem answered `ERROR`.
    CommandFailed,
    /// `+CCHCLOSE:` arrived while waiting for a different URC.
    ConnectionClosed,
    Transport(TransportError),
}

impl From<TransportError> for AtError {
    fn from(e: TransportError) -> Self {
        AtError::Transport(e)
    }
}

pub struct AtEngine<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    response: Vec<u8, RESPONSE_CAPACITY>,
}

impl<T: Transport, C: Clock> AtEngine<T, C> {
    pub fn new(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            response: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.transport.is_ready()
    }

    /// The response accumulated by the last exchange.
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    /// Direct access for exchanges that bypass the terminator matching
    /// (binary chunk reads own their framing).
    pub fn parts(&mut self) -> (&mut T, &mut C) {
        (&mut self.transport, &mut self.clock)
    }

    /// Send a command and wait for its final result (`OK` / `ERROR`).
    pub fn send_command(&mut self, cmd: &str, timeout_ms: u32) -> Result<&[u8], AtError> {
        if !self.transport.is_ready() {
            return Err(AtError::NotReady);
        }
        self.transport.flush_rx();
        self.response.clear();
        self.transport.write(cmd.as_bytes(), WRITE_TIMEOUT_MS)?;

        let start = self.clock.now_ms();
        let mut last_rearm: u64 = 0;

        while self.clock.now_ms() - start < timeout_ms as u64 {
            self.transport.task();

            let now = self.clock.now_ms();
            if now - last_rearm >= COMMAND_REARM_MS {
                self.transport.start_receive();
                last_rearm = now;
            }

            self.drain_into_response();
            match scan::scan_final(&self.response) {
                Verdict::Ok => return Ok(&self.response),
                Verdict::Error => return Err(AtError::CommandFailed),
                Verdict::Incomplete => {}
            }

            self.clock.delay_ms(COMMAND_PACE_MS);
        }

        Err(AtError::Timeout)
    }

    /// Send a command and wait until `urc` appears. The modem acknowledges
    /// the command with `OK` long before the asynchronous action finishes;
    /// only the URC counts as completion.
    pub fn send_command_wait_urc(
        &mut self,
        cmd: &str,
        urc: &str,
        timeout_ms: u32,
    ) -> Result<&[u8], AtError> {
        if !self.transport.is_ready() {
            return Err(AtError::NotReady);
        }
        self.transport.flush_rx();
        self.response.clear();
        self.transport.write(cmd.as_bytes(), WRITE_TIMEOUT_MS)?;

        let start = self.clock.now_ms();
        let mut last_rearm: u64 = 0;

        while self.clock.now_ms() - start < timeout_ms as u64 {
            self.transport.task();

            let now = self.clock.now_ms();
            if now - last_rearm >= URC_REARM_MS {
                self.transport.start_receive();
                last_rearm = now;
            }

            self.drain_into_response();
            match scan::scan_urc(&self.response, urc.as_bytes()) {
                UrcVerdict::Matched => return Ok(&self.response),
                UrcVerdict::Error => return Err(AtError::CommandFailed),
                UrcVerdict::ConnectionClosed => return Err(AtError::ConnectionClosed),
                UrcVerdict::Incomplete => {}
            }

            self.clock.delay_ms(URC_PACE_MS);
        }

        Err(AtError::Timeout)
    }

    fn drain_into_response(&mut self) {
        let mut buf = [0u8; 128];
        loop {
            let n = self.transport.read(&mut buf);
            if n == 0 {
                return;
            }
            for &byte in &buf[..n] {
                if self.response.push(byte).is_err() {
                    // Overflow truncates silently; the retained prefix is
                    // still scanned for terminators.
                    return;
                }
            }
        }
    }
}
