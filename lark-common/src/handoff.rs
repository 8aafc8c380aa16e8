// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update staging (application side) and update processing (bootloader
//! side).
//!
//! Hardware effects go through the [`FlagStore`] and [`SlotWriter`] seams,
//! so the decision logic here (every validation step and every fallback)
//! runs unchanged in host tests.

use crate::image::{self, FirmwareHeader};
use crate::integrity;
use crate::layout::{BOOT_FLAG_NORMAL, BOOT_FLAG_UPDATE};
use crate::mailbox::{self, MailboxError};

/// Boot-flag register access. [`unlock`](FlagStore::unlock) must latch the
/// register domain writable (including any hardware settle delay) before
/// the first write; it is idempotent.
pub trait FlagStore {
    fn unlock(&mut self);
    fn read(&self) -> u32;
    fn write(&mut self, value: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    Erase,
    Program,
}

/// Writes a complete firmware body to the inactive slot. Implementations
/// own XIP teardown/restore and the sector/page geometry.
pub trait SlotWriter {
    fn write_slot(&mut self, body: &[u8]) -> Result<(), FlashError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JumpTarget {
    SlotA,
    SlotB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApplyError {
    /// Image too short or wrong magic. Nothing was modified.
    InvalidImage,
    /// Declared body exceeds the mailbox capacity. Mailbox left intact.
    TooLarge,
    /// Mailbox read-back did not match the image.
    CopyMismatch,
    /// The boot flag did not read back as UPDATE_PENDING.
    FlagWriteFailed,
}

/// Application side: validate the downloaded image, fill the mailbox, raise
/// the boot flag. The caller resets the system on success; every rejection
/// before the mailbox write leaves both the mailbox and the flag untouched.
pub fn stage_update(
    region: &mut [u8],
    flags: &mut impl FlagStore,
    image: &[u8],
) -> Result<FirmwareHeader, ApplyError> {
    let (header, body) = image::parse_image(image).map_err(|_| ApplyError::InvalidImage)?;

    if body.len() > mailbox::capacity(region) {
        return Err(ApplyError::TooLarge);
    }

    match mailbox::store(region, &header, body) {
        Ok(()) => {}
        Err(MailboxError::CopyMismatch) => return Err(ApplyError::CopyMismatch),
        Err(_) => return Err(ApplyError::TooLarge),
    }

    flags.unlock();
    flags.write(BOOT_FLAG_UPDATE);
    if flags.read() != BOOT_FLAG_UPDATE {
        return Err(ApplyError::FlagWriteFailed);
    }

    Ok(header)
}

/// What the bootloader's update pass concluded. Everything except
/// `Updated` boots the already-running slot A image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessOutcome {
    /// Flag not raised: normal boot.
    NoUpdate,
    /// Flag was raised but the mailbox holds no valid payload.
    StaleMailbox,
    /// Declared size is zero or beyond the region.
    BadSize,
    CrcMismatch { expected: u32, computed: u32 },
    FlashFailed(FlashError),
    /// Slot B flashed and the mailbox retired.
    Updated { version: u32, size: u32 },
}

impl ProcessOutcome {
    pub fn target(&self) -> JumpTarget {
        match self {
            ProcessOutcome::Updated { .. } => JumpTarget::SlotB,
            _ => JumpTarget::SlotA,
        }
    }
}

/// Bootloader side. The flag is cleared before any flash access, so a
/// crash mid-flash comes back up as a plain slot-A boot instead of
/// retrying into a half-programmed slot forever.
pub fn process_update(
    region: &mut [u8],
    flags: &mut impl FlagStore,
    slot: &mut impl SlotWriter,
) -> ProcessOutcome {
    flags.unlock();
    if flags.read() != BOOT_FLAG_UPDATE {
        return ProcessOutcome::NoUpdate;
    }
    flags.write(BOOT_FLAG_NORMAL);

    let (header, body_len) = match mailbox::load(region) {
        Ok(view) => (view.header, view.body.len()),
        Err(MailboxError::Vacant) => return ProcessOutcome::StaleMailbox,
        Err(_) => return ProcessOutcome::BadSize,
    };

    let body = &region[crate::image::HEADER_LEN..crate::image::HEADER_LEN + body_len];
    let computed = integrity::crc32(body);
    if computed != header.crc {
        return ProcessOutcome::CrcMismatch {
            expected: header.crc,
            computed,
        };
    }

    if let Err(e) = slot.write_slot(body) {
        return ProcessOutcome::FlashFailed(e);
    }

    mailbox::clear_magic(region);
    ProcessOutcome::Updated {
        version: header.version,
        size: header.size,
    }
}
