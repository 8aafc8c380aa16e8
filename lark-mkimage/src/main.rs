// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update image packing tool for the Lark OTA pipeline.
//!
//! Usage:
//!   lark-mkimage pack firmware.bin -o fw_with_crc.bin --version 2
//!   lark-mkimage info fw_with_crc.bin

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
