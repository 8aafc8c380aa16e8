// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "lark-mkimage")]
#[command(about = "Update image packing tool for the Lark OTA pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Wrap a raw firmware binary in the OTA image header
    Pack {
        /// Raw firmware binary
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output image path
        #[arg(short, long)]
        output: PathBuf,

        /// Firmware version tag
        #[arg(short, long, default_value = "1")]
        version: u32,
    },

    /// Decode and verify an existing image
    Info {
        /// Image file produced by `pack`
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Pack {
            file,
            output,
            version,
        } => commands::pack(&file, &output, version),
        Commands::Info { file } => commands::info(&file),
    }
}
