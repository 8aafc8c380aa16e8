// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware integrity checking.
//!
//! CRC-32/ISO-HDLC: reflected polynomial 0xEDB88320, initial value
//! 0xFFFFFFFF, final XOR 0xFFFFFFFF. The application's pre-stage check and
//! the bootloader's authoritative pre-flash check both go through this
//! module; if the two sides ever disagreed on the same bytes that would be
//! a protocol bug, not a data error.

use crc::{Crc, CRC_32_ISO_HDLC};

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// One-shot CRC32 of a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Streaming digest for data that arrives in pieces.
pub fn digest() -> crc::Digest<'static, u32> {
    CRC32.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_check_value() {
        // The CRC-32/ISO-HDLC check vector.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_recomputation_is_idempotent() {
        let data = [0xDEu8, 0xAD, 0xBE, 0xEF, 0x00, 0x55];
        assert_eq!(crc32(&data), crc32(&data));
    }

    #[test]
    fn test_single_bit_flip_changes_crc() {
        let mut data = [0u8; 257];
        for (i, b) in data.iter_mut().enumerate() {
            *b = i as u8;
        }
        let reference = crc32(&data);
        for byte in 0..data.len() {
            for bit in 0..8 {
                data[byte] ^= 1 << bit;
                assert_ne!(crc32(&data), reference, "flip at {}:{}", byte, bit);
                data[byte] ^= 1 << bit;
            }
        }
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data: Vec<u8> = (0..1024u32).map(|i| (i * 7) as u8).collect();
        let mut d = digest();
        for part in data.chunks(33) {
            d.update(part);
        }
        assert_eq!(d.finalize(), crc32(&data));
    }
}
