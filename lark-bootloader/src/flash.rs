// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Slot-B programming through the boot-ROM flash routines.
//!
//! Erase and program require leaving memory-mapped (XIP) mode first:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() / flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code running during steps 1-5 must live in RAM, not flash. The
//! critical functions carry `#[link_section = ".data"]` and call ROM
//! function pointers resolved once at init, so nothing touches flash-based
//! code inside the window.

use lark_common::handoff::{FlashError, SlotWriter};
use lark_common::layout::{FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, SLOT_B_ADDR, SLOT_SIZE};

type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// ROM function pointers, resolved once at init from the ROM table and
/// kept in static RAM so the RAM-resident functions can reach them.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag. The ROM table pointer
/// at 0x14 and the lookup routine at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Resolve the ROM flash entry points. Must run once, while XIP is still
/// active, before any erase or program call.
pub fn init() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE = core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// Erase flash at a flash-relative offset, in whole sectors.
///
/// # Safety
/// `init()` must have run; the range must not cover executing code.
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, 0x20);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Program flash at a flash-relative offset. `len` must be a multiple of
/// the page size.
///
/// # Safety
/// `init()` must have run; the range must be erased and outside executing
/// code.
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// [`SlotWriter`] targeting the fixed OTA slot.
pub struct SlotBWriter;

impl SlotWriter for SlotBWriter {
    fn write_slot(&mut self, body: &[u8]) -> Result<(), FlashError> {
        let len = body.len() as u32;
        if len == 0 || len > SLOT_SIZE {
            return Err(FlashError::Erase);
        }
        let offset = SLOT_B_ADDR - FLASH_BASE;

        // Erase just enough sectors to cover the image.
        let erase_len = len.div_ceil(FLASH_SECTOR_SIZE) * FLASH_SECTOR_SIZE;
        unsafe {
            flash_erase(offset, erase_len);
        }

        // Program whole pages; the final partial page is padded with the
        // erased value.
        let page = FLASH_PAGE_SIZE as usize;
        let full = body.len() / page * page;
        if full > 0 {
            unsafe {
                flash_program(offset, body.as_ptr(), full);
            }
        }
        let rest = body.len() - full;
        if rest > 0 {
            let mut last = [0xFFu8; FLASH_PAGE_SIZE as usize];
            last[..rest].copy_from_slice(&body[full..]);
            unsafe {
                flash_program(offset + full as u32, last.as_ptr(), page);
            }
        }

        Ok(())
    }
}

/// Read back a programmed range for verification via volatile XIP reads.
pub fn flash_read(abs_addr: u32, buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = unsafe { ((abs_addr + i as u32) as *const u8).read_volatile() };
    }
}
