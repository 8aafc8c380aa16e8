// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared contract and protocol logic for the Lark OTA update system.
//!
//! Everything the application and the bootloader must agree on lives here:
//! the firmware image header, the mailbox layout, the boot-flag protocol,
//! and the flash geometry. The modem-facing protocol engines (AT command
//! exchange, chunked HTTP download, CDC transfer state machines) are also
//! here, written against the [`transport`] seams so they run unchanged in
//! host tests.
//!
//! This crate supports both `no_std` (embedded) and host environments:
//! - Default: `no_std`, pure logic only
//! - `embedded` feature: RP2040 hardware access (boot flag, mailbox region)
//! - `defmt` feature: derive `defmt::Format` on public types

#![cfg_attr(not(test), no_std)]

pub mod at;
pub mod cdc;
pub mod chunk;
pub mod download;
pub mod handoff;
pub mod http;
pub mod image;
pub mod integrity;
pub mod layout;
pub mod mailbox;
pub mod ring;
pub mod scan;
pub mod transport;

// Hardware access for the handoff contract (requires embedded feature)
#[cfg(feature = "embedded")]
pub mod flash;

// Re-export the shared contract types
pub use image::{FirmwareHeader, HEADER_LEN, IMAGE_MAGIC};
pub use layout::{BOOT_FLAG_NORMAL, BOOT_FLAG_UPDATE, MAILBOX_ADDR, MAILBOX_SIZE};
pub use layout::{FLASH_SECTOR_SIZE, SLOT_A_ADDR, SLOT_B_ADDR, SLOT_SIZE};
