// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The persistent handoff channel between application and bootloader.
//!
//! The mailbox is a plain byte region with an explicit layout: the 16-byte
//! firmware header followed by the body. The application serializes into it
//! immediately before requesting a reset; the bootloader deserializes it
//! exactly once on the following boot and zeroes the magic afterwards, so a
//! later unrelated reset cannot replay a stale payload. The two roles never
//! execute at the same time, which is the whole locking story.

use crate::image::{FirmwareHeader, HEADER_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MailboxError {
    /// Region smaller than the header alone.
    RegionTooSmall,
    /// Body does not fit the region.
    BodyTooLarge { body: usize, capacity: usize },
    /// No magic: the mailbox is empty or stale.
    Vacant,
    /// Declared size is zero or exceeds what the region can hold.
    BadSize { declared: usize, capacity: usize },
    /// Read-back after store did not match the source.
    CopyMismatch,
}

/// Body capacity of a region.
pub fn capacity(region: &[u8]) -> usize {
    region.len().saturating_sub(HEADER_LEN)
}

/// Serialize a header and body into the region, then verify the copy by
/// reading it back. The region may live in non-cacheable shared memory a
/// misbehaving bus write can corrupt, so verification re-reads through a
/// volatile path instead of trusting the just-written slice.
pub fn store(
    region: &mut [u8],
    header: &FirmwareHeader,
    body: &[u8],
) -> Result<(), MailboxError> {
    if region.len() < HEADER_LEN {
        return Err(MailboxError::RegionTooSmall);
    }
    if body.len() > capacity(region) {
        return Err(MailboxError::BodyTooLarge {
            body: body.len(),
            capacity: capacity(region),
        });
    }

    region[..HEADER_LEN].copy_from_slice(&header.to_bytes());
    region[HEADER_LEN..HEADER_LEN + body.len()].copy_from_slice(body);

    if !verify(region, header, body) {
        return Err(MailboxError::CopyMismatch);
    }
    Ok(())
}

/// Byte-compare the region against the source through volatile reads.
pub fn verify(region: &[u8], header: &FirmwareHeader, body: &[u8]) -> bool {
    if region.len() < HEADER_LEN + body.len() {
        return false;
    }
    volatile_eq(&region[..HEADER_LEN], &header.to_bytes())
        && volatile_eq(&region[HEADER_LEN..HEADER_LEN + body.len()], body)
}

fn volatile_eq(region: &[u8], expect: &[u8]) -> bool {
    for (i, &want) in expect.iter().enumerate() {
        // SAFETY: i < expect.len() <= region.len(), checked by callers.
        let got = unsafe { core::ptr::read_volatile(region.as_ptr().add(i)) };
        if got != want {
            return false;
        }
    }
    true
}

/// A decoded, bounds-checked view of a staged mailbox.
#[derive(Debug)]
pub struct MailboxView<'a> {
    pub header: FirmwareHeader,
    pub body: &'a [u8],
}

/// Deserialize and validate the region.
pub fn load(region: &[u8]) -> Result<MailboxView<'_>, MailboxError> {
    if region.len() < HEADER_LEN {
        return Err(MailboxError::RegionTooSmall);
    }
    let header = FirmwareHeader::from_bytes(region).ok_or(MailboxError::RegionTooSmall)?;
    if !header.is_valid() {
        return Err(MailboxError::Vacant);
    }

    let declared = header.size as usize;
    if declared == 0 || declared > capacity(region) {
        return Err(MailboxError::BadSize {
            declared,
            capacity: capacity(region),
        });
    }

    Ok(MailboxView {
        header,
        body: &region[HEADER_LEN..HEADER_LEN + declared],
    })
}

/// Zero the magic so the same payload is never applied twice.
pub fn clear_magic(region: &mut [u8]) {
    if region.len() >= 4 {
        region[..4].fill(0);
    }
}
