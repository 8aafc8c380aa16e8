// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hardware access for the handoff contract: boot-flag register, mailbox
//! region, system reset. Shared by the application and the bootloader so
//! the two sides cannot drift apart on register choice or region bounds.

use crate::handoff::FlagStore;
use crate::layout::{MAILBOX_ADDR, MAILBOX_SIZE};

/// Watchdog scratch register 0: survives any warm reset, cleared only by a
/// full power cycle. WATCHDOG base is 0x40058000; SCRATCH0 at +0x0C.
const WATCHDOG_SCRATCH0: *mut u32 = 0x4005_800C as *mut u32;

pub fn read_boot_flag() -> u32 {
    unsafe { WATCHDOG_SCRATCH0.read_volatile() }
}

pub fn write_boot_flag(value: u32) {
    unsafe { WATCHDOG_SCRATCH0.write_volatile(value) }
}

/// [`FlagStore`] over the scratch register.
pub struct ScratchFlagStore {
    unlocked: bool,
}

impl ScratchFlagStore {
    pub const fn new() -> Self {
        Self { unlocked: false }
    }
}

impl Default for ScratchFlagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagStore for ScratchFlagStore {
    fn unlock(&mut self) {
        if self.unlocked {
            return;
        }
        // The register domain needs a settle window after power-up before
        // the first write sticks; one latch per run is enough.
        cortex_m::asm::delay(1_000);
        self.unlocked = true;
    }

    fn read(&self) -> u32 {
        read_boot_flag()
    }

    fn write(&mut self, value: u32) {
        write_boot_flag(value);
    }
}

/// The mailbox RAM region.
///
/// # Safety
/// Both binaries keep data, bss and stack outside this range (linker
/// scripts); the caller must hold at most one live reference at a time.
pub unsafe fn mailbox_region() -> &'static mut [u8] {
    core::slice::from_raw_parts_mut(MAILBOX_ADDR as *mut u8, MAILBOX_SIZE)
}

/// Full system reset. Never returns.
pub fn reboot() -> ! {
    cortex_m::peripheral::SCB::sys_reset()
}

/// Millisecond clock over the RP2040 system timer.
impl crate::transport::Clock for rp2040_hal::Timer {
    fn now_ms(&self) -> u64 {
        self.get_counter().ticks() / 1_000
    }

    fn delay_ms(&mut self, ms: u32) {
        embedded_hal::delay::DelayNs::delay_ms(self, ms)
    }
}
