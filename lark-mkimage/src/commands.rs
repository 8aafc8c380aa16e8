// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use lark_common::image::{parse_image, FirmwareHeader};
use lark_common::integrity;
use lark_common::layout::MAILBOX_BODY_CAPACITY;

/// Wrap a raw firmware binary in the 16-byte OTA header.
pub fn pack(file: &Path, output: &Path, version: u32) -> Result<()> {
    let body = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    if body.is_empty() {
        bail!("{} is empty", file.display());
    }
    if body.len() > MAILBOX_BODY_CAPACITY {
        bail!(
            "{} is {} bytes; the device mailbox holds at most {}",
            file.display(),
            body.len(),
            MAILBOX_BODY_CAPACITY
        );
    }

    let crc = integrity::crc32(&body);
    let header = FirmwareHeader::new(body.len() as u32, crc, version);

    let mut image = header.to_bytes().to_vec();
    image.extend_from_slice(&body);
    fs::write(output, &image).with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Packed {} -> {}", file.display(), output.display());
    println!("  Body:    {} bytes", body.len());
    println!("  CRC32:   0x{:08x}", crc);
    println!("  Version: {}", version);

    Ok(())
}

/// Decode an image, recompute its CRC, and print the header fields.
pub fn info(file: &Path) -> Result<()> {
    let image = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let (header, body) = match parse_image(&image) {
        Ok(parsed) => parsed,
        Err(e) => bail!("{} is not a valid image: {:?}", file.display(), e),
    };

    let computed = integrity::crc32(body);

    println!("Image: {}", file.display());
    println!("  Magic:   0x{:08x}", header.magic);
    println!("  Size:    {} bytes", header.size);
    println!("  Version: {}", header.version);
    println!("  CRC32:   0x{:08x} (header)", header.crc);
    println!("  CRC32:   0x{:08x} (computed)", computed);

    if computed != header.crc {
        bail!("CRC mismatch: the image is corrupt");
    }
    println!("  Status:  OK");

    Ok(())
}
