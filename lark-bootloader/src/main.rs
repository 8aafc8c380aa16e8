// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Lark bootloader: consume a staged OTA mailbox, flash slot B, and boot
//! whichever slot the outcome selects.

#![no_std]
#![no_main]

mod boot;
mod flash;

use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use panic_probe as _;

use cortex_m_rt::entry;
use rp2040_hal as hal;

use lark_common::flash::ScratchFlagStore;
use lark_common::handoff::{self, JumpTarget, ProcessOutcome};
use lark_common::layout::{SLOT_A_ADDR, SLOT_B_ADDR};

defmt::timestamp!("{=u64:us}", { 0 });

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Lark bootloader");

    let mut pac = unsafe { hal::pac::Peripherals::steal() };
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();
    let mut timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let mut led = pins.gpio25.into_push_pull_output();
    led.set_high().ok();

    flash::init();

    let region = unsafe { lark_common::flash::mailbox_region() };
    let mut flags = ScratchFlagStore::new();
    let mut slot = flash::SlotBWriter;

    let outcome = handoff::process_update(region, &mut flags, &mut slot);
    match outcome {
        ProcessOutcome::NoUpdate => defmt::println!("no update pending"),
        ProcessOutcome::StaleMailbox => {
            defmt::println!("update pending but mailbox is stale, falling back")
        }
        ProcessOutcome::BadSize => {
            defmt::println!("mailbox declares an impossible size, falling back")
        }
        ProcessOutcome::CrcMismatch { expected, computed } => defmt::println!(
            "firmware CRC mismatch: expected 0x{:08x}, computed 0x{:08x}, falling back",
            expected,
            computed
        ),
        ProcessOutcome::FlashFailed(e) => {
            defmt::println!("slot B write failed ({}), falling back", e)
        }
        ProcessOutcome::Updated { version, size } => defmt::println!(
            "update applied: version 0x{:08x}, {} bytes",
            version,
            size
        ),
    }

    let target = outcome.target();
    let addr = match target {
        JumpTarget::SlotA => SLOT_A_ADDR,
        JumpTarget::SlotB => SLOT_B_ADDR,
    };

    if boot::validate_slot(addr).is_none() {
        // Nothing this program can do about it; the watchdog covers a
        // jump into garbage.
        defmt::println!("warning: slot vector table looks implausible");
    }

    defmt::println!("booting {} at 0x{:08x}", target, addr);
    led.set_low().ok();
    timer.delay_ms(10u32);

    unsafe { boot::jump(addr) }
}
