// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Slot vector-table inspection and the one-way jump into a slot.

use crate::flash;
use lark_common::layout::FLASH_BASE;

const RAM_START: u32 = 0x2000_0000;
const RAM_END: u32 = 0x2004_2000;
const FLASH_END: u32 = FLASH_BASE + 16 * 1024 * 1024;

pub struct VectorTable {
    pub initial_sp: u32,
    pub reset_vector: u32,
}

impl VectorTable {
    pub fn read_from(addr: u32) -> Self {
        let mut words = [0u8; 8];
        flash::flash_read(addr, &mut words);
        Self {
            initial_sp: u32::from_le_bytes(words[0..4].try_into().unwrap()),
            reset_vector: u32::from_le_bytes(words[4..8].try_into().unwrap()),
        }
    }

    fn is_plausible(&self) -> bool {
        let sp_ok = (RAM_START..=RAM_END).contains(&self.initial_sp);
        // Reset handler must point into flash with the thumb bit set.
        let reset_ok =
            (FLASH_BASE..FLASH_END).contains(&(self.reset_vector & !1)) && self.reset_vector & 1 == 1;
        sp_ok && reset_ok
    }
}

/// Read the slot's vector table and sanity-check it.
pub fn validate_slot(addr: u32) -> Option<VectorTable> {
    let vt = VectorTable::read_from(addr);
    if vt.is_plausible() {
        Some(vt)
    } else {
        None
    }
}

/// Hand control to the image whose vector table sits at `vector_addr`.
/// One-way: a fault past this point is only recoverable by the watchdog.
///
/// # Safety
/// `vector_addr` must point at a valid vector table in executable memory.
pub unsafe fn jump(vector_addr: u32) -> ! {
    // Stop SysTick so no stale tick fires between the vector switch and
    // the firmware's own timer setup.
    const SYST_CSR: *mut u32 = 0xE000_E010 as *mut u32;
    SYST_CSR.write_volatile(0);

    cortex_m::interrupt::disable();

    // Disable and clear every NVIC interrupt left armed by this program.
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);

    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(vector_addr);
    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    let vt = VectorTable::read_from(vector_addr);
    jump_to_firmware(vt.initial_sp, vt.reset_vector)
}

unsafe fn jump_to_firmware(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i", // firmware startup expects PRIMASK clear
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
