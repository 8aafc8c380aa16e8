// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware image header: the 16-byte wire contract between the image
//! packing tool, the application's staging path, and the bootloader's
//! mailbox reader.
//!
//! Layout (little-endian u32 each): `[magic][size][crc][version]`, followed
//! immediately by `size` bytes of firmware body.

/// Header magic, ASCII "OTA1".
pub const IMAGE_MAGIC: u32 = 0x4F54_4131;

/// Encoded header length in bytes.
pub const HEADER_LEN: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareHeader {
    pub magic: u32,
    /// Body length in bytes, excluding this header.
    pub size: u32,
    /// CRC32 of the body.
    pub crc: u32,
    /// Opaque version tag.
    pub version: u32,
}

impl FirmwareHeader {
    pub fn new(size: u32, crc: u32, version: u32) -> Self {
        Self {
            magic: IMAGE_MAGIC,
            size,
            crc,
            version,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == IMAGE_MAGIC
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.size.to_le_bytes());
        out[8..12].copy_from_slice(&self.crc.to_le_bytes());
        out[12..16].copy_from_slice(&self.version.to_le_bytes());
        out
    }

    /// Decode a header from the start of `bytes`. Does not check the magic;
    /// callers decide whether a non-matching magic is "stale" or "invalid".
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let word = |at: usize| u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());
        Some(Self {
            magic: word(0),
            size: word(4),
            crc: word(8),
            version: word(12),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageError {
    /// Shorter than the header alone; not an image.
    TooShort,
    BadMagic,
    /// The header declares more body bytes than the buffer holds.
    Truncated { declared: u32, have: usize },
}

/// Split a complete downloaded image into its header and body.
pub fn parse_image(image: &[u8]) -> Result<(FirmwareHeader, &[u8]), ImageError> {
    if image.len() <= HEADER_LEN {
        return Err(ImageError::TooShort);
    }
    let header = FirmwareHeader::from_bytes(image).ok_or(ImageError::TooShort)?;
    if !header.is_valid() {
        return Err(ImageError::BadMagic);
    }
    let body = &image[HEADER_LEN..];
    if header.size as usize > body.len() {
        return Err(ImageError::Truncated {
            declared: header.size,
            have: body.len(),
        });
    }
    Ok((header, &body[..header.size as usize]))
}
