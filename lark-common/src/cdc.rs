// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB CDC class driver for the modem link.
//!
//! The host-controller and enumeration layer below this module is an
//! external collaborator reached through [`HostBus`]. This module owns what
//! the update system actually depends on: the transfer state machines
//! (exactly one in-flight transfer per direction), the receive ring buffer,
//! and the class lifecycle.

use crate::ring::RingBuffer;
use crate::transport::{Clock, LinkState, Transport, TransportError};

/// Capacity of the receive ring. Must exceed the largest burst between two
/// consecutive poll-context drains.
pub const RX_RING_CAPACITY: usize = 2048;

/// Size of one IN transfer; also the staging bounce buffer.
pub const RX_TRANSFER_LEN: usize = 512;

/// Completion state of a submitted transfer, as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UrbStatus {
    Idle,
    InFlight,
    Done,
    Failed,
}

/// Interface to the host-controller layer (out of scope for this system).
///
/// Preconditions: the device has been enumerated and configured, and the
/// bus exposes exactly one bulk IN and one bulk OUT pipe to the modem's AT
/// interface. `submit_out` copies the data before returning.
pub trait HostBus {
    /// Background processing. Must be called frequently from poll context.
    fn task(&mut self);

    fn device_state(&self) -> LinkState;

    /// Start one OUT transfer carrying all of `data`.
    fn submit_out(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Start one IN transfer of up to `max_len` bytes.
    fn submit_in(&mut self, max_len: usize) -> Result<(), TransportError>;

    fn out_status(&self) -> UrbStatus;
    fn in_status(&self) -> UrbStatus;

    /// Copy out the payload of a completed IN transfer and retire it.
    fn take_in(&mut self, out: &mut [u8]) -> usize;

    /// Retire a completed (or failed) OUT transfer.
    fn retire_out(&mut self);
}

/// Class driver lifecycle. The hardware's class-descriptor table of
/// callbacks becomes a trait the driver implements.
pub trait UsbClass {
    fn init(&mut self);
    fn deinit(&mut self);
    /// Issue class-specific configuration requests, if any.
    fn class_request(&mut self);
    /// Pump the transfer state machines once.
    fn process(&mut self);
    fn sof_process(&mut self) {}
}

/// Transmit pipe phase: at most one OUT transfer in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Idle,
    Wait,
}

/// Receive pipe phase: at most one IN transfer armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxPhase {
    Idle,
    Armed,
}

/// What a phase step observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeEvent {
    None,
    Done,
    Failed,
}

impl TxPhase {
    /// Next phase given the controller's report.
    pub fn advance(self, urb: UrbStatus) -> (TxPhase, PipeEvent) {
        match (self, urb) {
            (TxPhase::Wait, UrbStatus::Done) => (TxPhase::Idle, PipeEvent::Done),
            (TxPhase::Wait, UrbStatus::Failed) => (TxPhase::Idle, PipeEvent::Failed),
            (phase, _) => (phase, PipeEvent::None),
        }
    }
}

impl RxPhase {
    pub fn advance(self, urb: UrbStatus) -> (RxPhase, PipeEvent) {
        match (self, urb) {
            (RxPhase::Armed, UrbStatus::Done) => (RxPhase::Idle, PipeEvent::Done),
            (RxPhase::Armed, UrbStatus::Failed) => (RxPhase::Idle, PipeEvent::Failed),
            (phase, _) => (phase, PipeEvent::None),
        }
    }
}

/// The CDC byte link: ring-buffered reception plus timeout-bounded
/// transmission over a [`HostBus`].
pub struct CdcLink<B: HostBus, C: Clock> {
    bus: B,
    clock: C,
    ring: RingBuffer<RX_RING_CAPACITY>,
    tx: TxPhase,
    rx: RxPhase,
    tx_result: PipeEvent,
    streaming: bool,
    last_state: LinkState,
    stage: [u8; RX_TRANSFER_LEN],
}

impl<B: HostBus, C: Clock> CdcLink<B, C> {
    pub fn new(bus: B, clock: C) -> Self {
        Self {
            bus,
            clock,
            ring: RingBuffer::new(),
            tx: TxPhase::Idle,
            rx: RxPhase::Idle,
            tx_result: PipeEvent::None,
            streaming: false,
            last_state: LinkState::Disconnected,
            stage: [0; RX_TRANSFER_LEN],
        }
    }
}

impl<B: HostBus, C: Clock> UsbClass for CdcLink<B, C> {
    fn init(&mut self) {
        self.tx = TxPhase::Idle;
        self.rx = RxPhase::Idle;
        self.tx_result = PipeEvent::None;
        self.ring.flush();
    }

    fn deinit(&mut self) {
        self.init();
        self.streaming = false;
    }

    fn class_request(&mut self) {
        // The modem's AT interface is vendor-specific and takes no CDC
        // line-coding requests; configuration ends here.
    }

    fn process(&mut self) {
        // Receive side: drain a completed transfer into the ring, then
        // re-arm only while a download is streaming.
        let (rx, event) = self.rx.advance(self.bus.in_status());
        self.rx = rx;
        if event == PipeEvent::Done {
            let n = self.bus.take_in(&mut self.stage);
            if n > 0 {
                self.ring.write(&self.stage[..n]);
            }
            if self.streaming && self.bus.submit_in(RX_TRANSFER_LEN).is_ok() {
                self.rx = RxPhase::Armed;
            }
        }

        // Transmit side.
        let (tx, event) = self.tx.advance(self.bus.out_status());
        self.tx = tx;
        if event != PipeEvent::None {
            self.bus.retire_out();
            self.tx_result = event;
        }
    }
}

impl<B: HostBus, C: Clock> Transport for CdcLink<B, C> {
    fn link_state(&self) -> LinkState {
        self.bus.device_state()
    }

    fn task(&mut self) {
        self.bus.task();

        // Class lifecycle follows the bus's connection lifecycle.
        let state = self.bus.device_state();
        if state != self.last_state {
            match state {
                LinkState::ClassReady => {
                    self.init();
                    self.class_request();
                }
                LinkState::Disconnected => self.deinit(),
                LinkState::Connecting => {}
            }
            self.last_state = state;
        }

        if state == LinkState::ClassReady {
            self.process();
        }
    }

    fn start_receive(&mut self) {
        if !self.is_ready() || self.rx != RxPhase::Idle {
            return;
        }
        if self.bus.submit_in(RX_TRANSFER_LEN).is_ok() {
            self.rx = RxPhase::Armed;
        }
    }

    fn set_streaming(&mut self, enabled: bool) {
        self.streaming = enabled;
    }

    fn available(&self) -> usize {
        self.ring.available()
    }

    fn read(&mut self, out: &mut [u8]) -> usize {
        self.ring.read(out)
    }

    fn write(&mut self, data: &[u8], timeout_ms: u32) -> Result<(), TransportError> {
        if !self.is_ready() {
            return Err(TransportError::NotReady);
        }
        if self.tx != TxPhase::Idle {
            return Err(TransportError::Busy);
        }

        self.bus.submit_out(data)?;
        self.tx = TxPhase::Wait;
        self.tx_result = PipeEvent::None;

        let start = self.clock.now_ms();
        while self.tx != TxPhase::Idle {
            self.task();
            if self.clock.now_ms() - start >= timeout_ms as u64 {
                return Err(TransportError::Timeout);
            }
            self.clock.delay_ms(1);
        }

        // A disconnect mid-transfer resets the phases; don't report that
        // as a completed write.
        if !self.is_ready() {
            return Err(TransportError::NotReady);
        }
        match self.tx_result {
            PipeEvent::Failed => Err(TransportError::NotReady),
            _ => Ok(()),
        }
    }

    fn flush_rx(&mut self) {
        // A transfer that completed since the last pump would re-deliver
        // stale bytes; retire it first.
        if self.bus.in_status() == UrbStatus::Done {
            let _ = self.bus.take_in(&mut self.stage);
            self.rx = RxPhase::Idle;
        }
        self.ring.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_phase_completes_once() {
        let (phase, event) = TxPhase::Wait.advance(UrbStatus::Done);
        assert_eq!(phase, TxPhase::Idle);
        assert_eq!(event, PipeEvent::Done);

        let (phase, event) = phase.advance(UrbStatus::Done);
        assert_eq!(phase, TxPhase::Idle);
        assert_eq!(event, PipeEvent::None);
    }

    #[test]
    fn test_tx_phase_holds_while_in_flight() {
        let (phase, event) = TxPhase::Wait.advance(UrbStatus::InFlight);
        assert_eq!(phase, TxPhase::Wait);
        assert_eq!(event, PipeEvent::None);
    }

    #[test]
    fn test_rx_phase_failure_returns_to_idle() {
        let (phase, event) = RxPhase::Armed.advance(UrbStatus::Failed);
        assert_eq!(phase, RxPhase::Idle);
        assert_eq!(event, PipeEvent::Failed);
    }
}
