// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Lark application: fetch a firmware image over the cellular modem's
//! HTTP AT service, verify it, stage it in the mailbox and reset so the
//! bootloader can flash slot B.

#![no_std]
#![no_main]

mod board;
mod config;
mod modem;
mod usb_host;

use defmt_rtt as _;
use panic_probe as _;

use cortex_m_rt::entry;
use embedded_hal::digital::OutputPin;

use lark_common::at::AtEngine;
use lark_common::cdc::CdcLink;
use lark_common::flash::{self, ScratchFlagStore};
use lark_common::handoff;
use lark_common::http;
use lark_common::image;
use lark_common::integrity;
use lark_common::layout::MAILBOX_SIZE;
use lark_common::transport::{Clock, Transport};

defmt::timestamp!("{=u64:us}", { 0 });

/// Destination for the downloaded image (header + body): anything the
/// mailbox can stage fits here.
static mut IMAGE_BUF: [u8; MAILBOX_SIZE] = [0; MAILBOX_SIZE];

#[entry]
fn main() -> ! {
    defmt::println!("Lark application started");

    let mut b = board::init();
    let mut clock = b.timer;
    b.led.set_high().ok();

    let bus = usb_host::UsbHostController::new(b.usb);
    let link = CdcLink::new(bus, b.timer);
    let mut at = AtEngine::new(link, b.timer);

    // No modem, no purpose: halt rather than run a degraded mode.
    if let Err(e) = modem::init(&mut at, &mut b.modem, &mut clock) {
        defmt::println!("modem bring-up failed ({}), halting", e);
        loop {
            cortex_m::asm::wfi();
        }
    }

    if let Err(e) = modem::setup_data_connection(&mut at, config::APN) {
        defmt::println!("PDP setup failed: {}", e);
    }

    let image_buf = unsafe { &mut *core::ptr::addr_of_mut!(IMAGE_BUF) };

    loop {
        if run_update_cycle(&mut at, image_buf).is_err() {
            defmt::println!("update cycle failed, retrying in {} ms", config::RETRY_DELAY_MS);
            clock.delay_ms(config::RETRY_DELAY_MS);
        }
    }
}

/// One full attempt: download, verify, stage, reset. Returns only on
/// failure; a staged update ends in a system reset.
fn run_update_cycle<T: Transport, C: Clock>(
    at: &mut AtEngine<T, C>,
    image_buf: &mut [u8],
) -> Result<(), ()> {
    modem::check_network(at);

    defmt::println!("downloading {=str}", config::FIRMWARE_URL);
    let len = http::download(at, config::FIRMWARE_URL, image_buf, &mut |done, total| {
        defmt::println!("progress: {}/{} bytes ({}%)", done, total, done * 100 / total);
    })
    .map_err(|e| {
        defmt::println!("download failed: {}", e);
    })?;

    defmt::println!("download complete: {} bytes", len);

    let image = &image_buf[..len];
    let (header, body) = image::parse_image(image).map_err(|e| {
        defmt::println!("image rejected: {}", e);
    })?;

    // Pre-stage check; the bootloader re-verifies before flashing.
    let computed = integrity::crc32(body);
    if computed != header.crc {
        defmt::println!(
            "image CRC mismatch: expected 0x{:08x}, got 0x{:08x}",
            header.crc,
            computed
        );
        return Err(());
    }
    defmt::println!(
        "image valid: version 0x{:08x}, {} body bytes",
        header.version,
        header.size
    );

    let region = unsafe { flash::mailbox_region() };
    let mut flags = ScratchFlagStore::new();
    match handoff::stage_update(region, &mut flags, image) {
        Ok(staged) => {
            defmt::println!(
                "update staged (version 0x{:08x}), resetting for the bootloader",
                staged.version
            );
            flash::reboot()
        }
        Err(e) => {
            defmt::println!("staging failed: {}", e);
            Err(())
        }
    }
}
