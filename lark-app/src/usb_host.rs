// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Minimal RP2040 host-mode backend for the CDC link.
//!
//! This is the collaborator below the class driver, not part of the update
//! system itself: no descriptor parsing, no hub support, no dynamic pipe
//! allocation. The attached modem is a known device, so after the bus
//! reset a fixed SET_ADDRESS / SET_CONFIGURATION pair is issued and the
//! bulk endpoint pair of its AT interface is driven directly.
//!
//! The controller's shared host endpoint carries one transaction at a
//! time. An armed IN yields to a submitted OUT and is re-armed once the
//! OUT completes, mirroring how the modem link stops and restarts
//! reception around each command.

use lark_common::cdc::{HostBus, UrbStatus};
use lark_common::transport::{LinkState, TransportError};

use crate::board::UsbPeripherals;

// Register block at 0x50110000, DPRAM at 0x50100000.
const USBCTRL_DPRAM: u32 = 0x5010_0000;
const USBCTRL_REGS: u32 = 0x5011_0000;

const ADDR_ENDP: *mut u32 = USBCTRL_REGS as *mut u32;
const MAIN_CTRL: *mut u32 = (USBCTRL_REGS + 0x40) as *mut u32;
const SIE_CTRL: *mut u32 = (USBCTRL_REGS + 0x4C) as *mut u32;
const SIE_STATUS: *mut u32 = (USBCTRL_REGS + 0x50) as *mut u32;
const USB_MUXING: *mut u32 = (USBCTRL_REGS + 0x74) as *mut u32;
const USB_PWR: *mut u32 = (USBCTRL_REGS + 0x78) as *mut u32;

// Host-mode DPRAM layout: SETUP packet at +0, the shared host endpoint's
// control words, then our two bounce buffers.
const SETUP_PACKET: *mut u32 = USBCTRL_DPRAM as *mut u32;
const EPX_BUF_CTRL: *mut u32 = (USBCTRL_DPRAM + 0x80) as *mut u32;
const EPX_CTRL: *mut u32 = (USBCTRL_DPRAM + 0x100) as *mut u32;
const OUT_BUF: u32 = USBCTRL_DPRAM + 0x180;
const IN_BUF: u32 = USBCTRL_DPRAM + 0x380;

const MAIN_CTRL_ENABLE: u32 = 1 << 0;
const MAIN_CTRL_HOST: u32 = 1 << 1;

const SIE_CTRL_START_TRANS: u32 = 1 << 0;
const SIE_CTRL_SEND_SETUP: u32 = 1 << 1;
const SIE_CTRL_SEND_DATA: u32 = 1 << 2;
const SIE_CTRL_RECEIVE_DATA: u32 = 1 << 3;
const SIE_CTRL_STOP_TRANS: u32 = 1 << 4;
const SIE_CTRL_SOF_EN: u32 = 1 << 9;
const SIE_CTRL_KEEP_ALIVE_EN: u32 = 1 << 10;
const SIE_CTRL_RESET_BUS: u32 = 1 << 13;
const SIE_CTRL_PULLDOWN_EN: u32 = 1 << 15;

const SIE_STATUS_SPEED_MASK: u32 = 0x3 << 8;
const SIE_STATUS_TRANS_COMPLETE: u32 = 1 << 18;
const SIE_STATUS_RX_TIMEOUT: u32 = 1 << 27;
const SIE_STATUS_STALL_REC: u32 = 1 << 29;
const SIE_STATUS_DATA_SEQ_ERROR: u32 = 1 << 31;
const SIE_STATUS_ERROR_MASK: u32 =
    SIE_STATUS_RX_TIMEOUT | SIE_STATUS_STALL_REC | SIE_STATUS_DATA_SEQ_ERROR;

const MUXING_TO_PHY: u32 = 1 << 0;
const MUXING_SOFTCON: u32 = 1 << 3;
const PWR_VBUS_DETECT: u32 = 1 << 2;
const PWR_VBUS_DETECT_OVERRIDE_EN: u32 = 1 << 3;

const BUF_CTRL_FULL: u32 = 1 << 15;
const BUF_CTRL_LAST: u32 = 1 << 14;
const BUF_CTRL_DATA1: u32 = 1 << 13;
const BUF_CTRL_AVAILABLE: u32 = 1 << 10;
const BUF_CTRL_LEN_MASK: u32 = 0x3FF;

const EP_CTRL_ENABLE: u32 = 1 << 31;
const EP_TYPE_BULK: u32 = 2 << 26;

/// Fixed addressing for the attached modem: device address 1, the AT
/// interface's bulk endpoint pair, first configuration.
const DEVICE_ADDR: u32 = 1;
const BULK_IN_EP: u32 = 0x2;
const BULK_OUT_EP: u32 = 0x2;
const CONFIGURATION: u16 = 1;

/// Enumeration settles for this many task() calls after bus reset before
/// the fixed setup sequence runs.
const ENUM_SETTLE_POLLS: u32 = 2_000;

#[derive(Clone, Copy, PartialEq)]
enum Active {
    None,
    Out,
    In,
}

pub struct UsbHostController {
    _usb: UsbPeripherals,
    state: LinkState,
    settle: u32,
    active: Active,
    out_status: UrbStatus,
    in_status: UrbStatus,
    /// Logical IN request deferred while the endpoint carries an OUT.
    in_wanted: usize,
    in_len: usize,
    in_data1: bool,
    out_data1: bool,
}

fn reg_read(reg: *mut u32) -> u32 {
    unsafe { reg.read_volatile() }
}

fn reg_write(reg: *mut u32, value: u32) {
    unsafe { reg.write_volatile(value) }
}

impl UsbHostController {
    /// Takes ownership of the USB register blocks; the clock token proves
    /// the 48 MHz USB clock is running.
    pub fn new(usb: UsbPeripherals) -> Self {
        let mut this = Self {
            _usb: usb,
            state: LinkState::Disconnected,
            settle: 0,
            active: Active::None,
            out_status: UrbStatus::Idle,
            in_status: UrbStatus::Idle,
            in_wanted: 0,
            in_len: 0,
            in_data1: false,
            out_data1: false,
        };
        this.enable_controller();
        this
    }

    fn enable_controller(&mut self) {
        reg_write(USB_MUXING, MUXING_TO_PHY | MUXING_SOFTCON);
        reg_write(USB_PWR, PWR_VBUS_DETECT | PWR_VBUS_DETECT_OVERRIDE_EN);
        reg_write(MAIN_CTRL, MAIN_CTRL_ENABLE | MAIN_CTRL_HOST);
        reg_write(
            SIE_CTRL,
            SIE_CTRL_SOF_EN | SIE_CTRL_KEEP_ALIVE_EN | SIE_CTRL_PULLDOWN_EN,
        );
        cortex_m::asm::dsb();
    }

    fn device_present(&self) -> bool {
        reg_read(SIE_STATUS) & SIE_STATUS_SPEED_MASK != 0
    }

    fn clear_trans_status(&self) {
        // Write-one-to-clear.
        reg_write(
            SIE_STATUS,
            SIE_STATUS_TRANS_COMPLETE | SIE_STATUS_ERROR_MASK,
        );
    }

    /// One control transfer with no data stage, bounded spin. Only used
    /// for the two fixed enumeration requests.
    fn control_no_data(&mut self, setup: [u8; 8], addr: u32) -> bool {
        unsafe {
            SETUP_PACKET.write_volatile(u32::from_le_bytes(setup[0..4].try_into().unwrap()));
            SETUP_PACKET
                .offset(1)
                .write_volatile(u32::from_le_bytes(setup[4..8].try_into().unwrap()));
        }
        reg_write(ADDR_ENDP, addr);
        self.clear_trans_status();
        reg_write(
            SIE_CTRL,
            reg_read(SIE_CTRL) | SIE_CTRL_SEND_SETUP | SIE_CTRL_START_TRANS,
        );

        let mut spins = 1_000_000u32;
        loop {
            let status = reg_read(SIE_STATUS);
            if status & SIE_STATUS_TRANS_COMPLETE != 0 {
                self.clear_trans_status();
                return status & SIE_STATUS_ERROR_MASK == 0;
            }
            spins -= 1;
            if spins == 0 {
                return false;
            }
        }
    }

    fn enumerate_fixed_device(&mut self) -> bool {
        // SET_ADDRESS to address 0, then SET_CONFIGURATION to the new
        // address. Descriptor parsing is skipped: the endpoint layout of
        // the modem is known.
        let set_address: [u8; 8] = [0x00, 0x05, DEVICE_ADDR as u8, 0, 0, 0, 0, 0];
        if !self.control_no_data(set_address, 0) {
            return false;
        }
        let set_config: [u8; 8] = [
            0x00,
            0x09,
            CONFIGURATION as u8,
            (CONFIGURATION >> 8) as u8,
            0,
            0,
            0,
            0,
        ];
        self.control_no_data(set_config, DEVICE_ADDR)
    }

    fn start_out_hw(&mut self, len: usize) {
        reg_write(EPX_CTRL, EP_CTRL_ENABLE | EP_TYPE_BULK | (OUT_BUF - USBCTRL_DPRAM));
        let mut ctrl = (len as u32 & BUF_CTRL_LEN_MASK) | BUF_CTRL_FULL | BUF_CTRL_LAST;
        if self.out_data1 {
            ctrl |= BUF_CTRL_DATA1;
        }
        reg_write(EPX_BUF_CTRL, ctrl | BUF_CTRL_AVAILABLE);
        reg_write(ADDR_ENDP, DEVICE_ADDR | (BULK_OUT_EP << 16));
        self.clear_trans_status();
        reg_write(
            SIE_CTRL,
            reg_read(SIE_CTRL) | SIE_CTRL_SEND_DATA | SIE_CTRL_START_TRANS,
        );
        self.active = Active::Out;
    }

    fn start_in_hw(&mut self, max_len: usize) {
        reg_write(EPX_CTRL, EP_CTRL_ENABLE | EP_TYPE_BULK | (IN_BUF - USBCTRL_DPRAM));
        let mut ctrl = (max_len as u32) & BUF_CTRL_LEN_MASK;
        if self.in_data1 {
            ctrl |= BUF_CTRL_DATA1;
        }
        reg_write(EPX_BUF_CTRL, ctrl | BUF_CTRL_AVAILABLE);
        reg_write(ADDR_ENDP, DEVICE_ADDR | (BULK_IN_EP << 16));
        self.clear_trans_status();
        reg_write(
            SIE_CTRL,
            reg_read(SIE_CTRL) | SIE_CTRL_RECEIVE_DATA | SIE_CTRL_START_TRANS,
        );
        self.active = Active::In;
    }

    fn stop_active(&mut self) {
        reg_write(SIE_CTRL, reg_read(SIE_CTRL) | SIE_CTRL_STOP_TRANS);
        self.clear_trans_status();
        self.active = Active::None;
    }

    fn service_completion(&mut self) {
        if self.active == Active::None {
            return;
        }
        let status = reg_read(SIE_STATUS);
        if status & SIE_STATUS_TRANS_COMPLETE == 0 {
            return;
        }
        let failed = status & SIE_STATUS_ERROR_MASK != 0;
        self.clear_trans_status();

        match self.active {
            Active::Out => {
                self.out_status = if failed {
                    UrbStatus::Failed
                } else {
                    self.out_data1 = !self.out_data1;
                    UrbStatus::Done
                };
            }
            Active::In => {
                if failed {
                    self.in_status = UrbStatus::Failed;
                } else {
                    self.in_len = (reg_read(EPX_BUF_CTRL) & BUF_CTRL_LEN_MASK) as usize;
                    self.in_data1 = !self.in_data1;
                    self.in_status = UrbStatus::Done;
                }
                self.in_wanted = 0;
            }
            Active::None => {}
        }
        self.active = Active::None;
    }
}

impl HostBus for UsbHostController {
    fn task(&mut self) {
        match self.state {
            LinkState::Disconnected => {
                if self.device_present() {
                    reg_write(SIE_CTRL, reg_read(SIE_CTRL) | SIE_CTRL_RESET_BUS);
                    self.settle = ENUM_SETTLE_POLLS;
                    self.state = LinkState::Connecting;
                }
            }
            LinkState::Connecting => {
                if !self.device_present() {
                    self.state = LinkState::Disconnected;
                    return;
                }
                if self.settle > 0 {
                    self.settle -= 1;
                    return;
                }
                if self.enumerate_fixed_device() {
                    self.in_data1 = false;
                    self.out_data1 = false;
                    self.state = LinkState::ClassReady;
                } else {
                    // Device not answering yet; give it another window.
                    self.settle = ENUM_SETTLE_POLLS;
                }
            }
            LinkState::ClassReady => {
                if !self.device_present() {
                    self.stop_active();
                    self.state = LinkState::Disconnected;
                    self.out_status = UrbStatus::Idle;
                    self.in_status = UrbStatus::Idle;
                    self.in_wanted = 0;
                    return;
                }
                self.service_completion();
                // A deferred IN re-arms once the endpoint frees up.
                if self.active == Active::None
                    && self.in_wanted > 0
                    && self.in_status != UrbStatus::Done
                {
                    let len = self.in_wanted;
                    self.start_in_hw(len);
                }
            }
        }
    }

    fn device_state(&self) -> LinkState {
        self.state
    }

    fn submit_out(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.state != LinkState::ClassReady {
            return Err(TransportError::NotReady);
        }
        if self.out_status == UrbStatus::InFlight {
            return Err(TransportError::Busy);
        }
        if data.len() > 512 {
            return Err(TransportError::Busy);
        }

        // The shared endpoint carries one transaction: park an armed IN
        // (in_wanted still holds its size) and bring it back after this
        // OUT completes.
        if self.active == Active::In {
            self.stop_active();
        }

        unsafe {
            core::ptr::copy_nonoverlapping(data.as_ptr(), OUT_BUF as *mut u8, data.len());
        }
        self.out_status = UrbStatus::InFlight;
        self.start_out_hw(data.len());
        Ok(())
    }

    fn submit_in(&mut self, max_len: usize) -> Result<(), TransportError> {
        if self.state != LinkState::ClassReady {
            return Err(TransportError::NotReady);
        }
        if self.in_status == UrbStatus::InFlight || self.in_status == UrbStatus::Done {
            return Err(TransportError::Busy);
        }

        let max_len = max_len.min(512);
        self.in_status = UrbStatus::InFlight;
        self.in_wanted = max_len;
        if self.active == Active::None {
            self.start_in_hw(max_len);
        }
        Ok(())
    }

    fn out_status(&self) -> UrbStatus {
        self.out_status
    }

    fn in_status(&self) -> UrbStatus {
        self.in_status
    }

    fn take_in(&mut self, out: &mut [u8]) -> usize {
        if self.in_status != UrbStatus::Done {
            return 0;
        }
        let n = self.in_len.min(out.len());
        unsafe {
            core::ptr::copy_nonoverlapping(IN_BUF as *const u8, out.as_mut_ptr(), n);
        }
        self.in_status = UrbStatus::Idle;
        self.in_len = 0;
        n
    }

    fn retire_out(&mut self) {
        if self.out_status == UrbStatus::Done || self.out_status == UrbStatus::Failed {
            self.out_status = UrbStatus::Idle;
        }
    }
}
