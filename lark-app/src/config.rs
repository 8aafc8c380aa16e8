// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Compile-time application configuration.

/// Where the update image is fetched from.
pub const FIRMWARE_URL: &str = "https://updates.example.com/lark/fw_with_crc.bin";

/// Packet-data APN for the PDP context.
pub const APN: &str = "internet";

/// Delay between download attempts after a failed cycle.
pub const RETRY_DELAY_MS: u32 = 50_000;

/// How long the link may take to enumerate before the modem is declared
/// absent. Without the modem there is no useful degraded mode.
pub const LINK_TIMEOUT_MS: u32 = 30_000;

/// The modem needs tens of seconds after power-on before AT answers.
pub const AT_READY_TIMEOUT_MS: u32 = 60_000;
