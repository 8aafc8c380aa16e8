// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash and RAM geometry shared between the application and the bootloader.
//!
//! Both programs are compiled against these constants; together with the
//! header format they are the entire handoff contract. There is no runtime
//! version check, so independently built binaries must come from the same
//! revision of this file.

/// XIP window base of the external QSPI flash.
pub const FLASH_BASE: u32 = 0x1000_0000;

/// Slot A: the currently shipping application image.
pub const SLOT_A_ADDR: u32 = 0x1001_0000;

/// Slot B: the OTA write target. The staging path always aims here.
pub const SLOT_B_ADDR: u32 = 0x100D_0000;

/// Capacity of each slot.
pub const SLOT_SIZE: u32 = 768 * 1024;

pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

/// Mailbox region in SRAM. Survives a warm reset, lost on power-off.
///
/// The linker scripts of both binaries keep data, bss and stack below this
/// address so a staged image is untouched across the reset boundary.
pub const MAILBOX_ADDR: u32 = 0x2002_8000;
pub const MAILBOX_SIZE: usize = 0x1_8000; // 96 KiB

/// Largest firmware body the mailbox can stage.
pub const MAILBOX_BODY_CAPACITY: usize = MAILBOX_SIZE - crate::image::HEADER_LEN;

/// Boot-flag values held in watchdog scratch register 0.
pub const BOOT_FLAG_NORMAL: u32 = 0x0000_0000;
pub const BOOT_FLAG_UPDATE: u32 = 0x55AA_55AA;
