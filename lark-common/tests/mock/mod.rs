// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Scripted transport and clock for exercising the protocol engines
//! without hardware.

use std::collections::VecDeque;

use lark_common::transport::{Clock, LinkState, Transport, TransportError};

/// One scripted exchange: when a write containing `expect` goes out, the
/// reply chunks are queued and delivered one per receive re-arm.
pub struct Step {
    pub expect: Vec<u8>,
    pub replies: Vec<Vec<u8>>,
}

impl Step {
    pub fn new(expect: &[u8], reply: &[u8]) -> Self {
        Self {
            expect: expect.to_vec(),
            replies: vec![reply.to_vec()],
        }
    }

    pub fn staged(expect: &[u8], replies: &[&[u8]]) -> Self {
        Self {
            expect: expect.to_vec(),
            replies: replies.iter().map(|r| r.to_vec()).collect(),
        }
    }
}

#[derive(Default)]
pub struct MockTransport {
    pub ready: bool,
    pub streaming: bool,
    pub writes: Vec<Vec<u8>>,
    script: VecDeque<Step>,
    pending: VecDeque<Vec<u8>>,
    rx: VecDeque<u8>,
}

impl MockTransport {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            ready: true,
            streaming: false,
            writes: Vec::new(),
            script: script.into(),
            pending: VecDeque::new(),
            rx: VecDeque::new(),
        }
    }

    pub fn wrote_containing(&self, needle: &[u8]) -> bool {
        self.writes
            .iter()
            .any(|w| w.windows(needle.len()).any(|win| win == needle))
    }
}

impl Transport for MockTransport {
    fn link_state(&self) -> LinkState {
        if self.ready {
            LinkState::ClassReady
        } else {
            LinkState::Disconnected
        }
    }

    fn task(&mut self) {}

    fn start_receive(&mut self) {
        if let Some(chunk) = self.pending.pop_front() {
            self.rx.extend(chunk);
        }
    }

    fn set_streaming(&mut self, enabled: bool) {
        self.streaming = enabled;
    }

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read(&mut self, out: &mut [u8]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    out[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    fn write(&mut self, data: &[u8], _timeout_ms: u32) -> Result<(), TransportError> {
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        self.writes.push(data.to_vec());

        if let Some(step) = self.script.front() {
            let hit = step.expect.len() <= data.len()
                && data.windows(step.expect.len()).any(|w| w == &step.expect[..]);
            if hit {
                let step = self.script.pop_front().unwrap();
                self.pending.extend(step.replies);
            }
        }
        Ok(())
    }

    fn flush_rx(&mut self) {
        self.rx.clear();
    }
}

/// Clock that advances only when the code under test sleeps, so timeouts
/// are deterministic.
#[derive(Default)]
pub struct MockClock {
    now: u64,
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now += ms as u64;
    }
}

/// Build one complete `HTTPREAD` reply frame around `payload`.
pub fn chunk_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"\r\nOK\r\n\r\n+HTTPREAD: DATA,");
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\r\n+HTTPREAD: 0\r\n");
    out
}
