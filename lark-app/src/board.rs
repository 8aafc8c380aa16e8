// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Board bring-up for the application.

use rp2040_hal as hal;

pub type LedPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio25, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type PowerEnPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio10, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type PowerOffPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio11, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type ResetPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio12, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type AirplanePin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio13, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;

/// Modem control lines. Power-off is active-low on the module.
pub struct ModemPins {
    pub power_en: PowerEnPin,
    pub power_off: PowerOffPin,
    pub reset: ResetPin,
    pub airplane: AirplanePin,
}

pub struct UsbPeripherals {
    pub regs: hal::pac::USBCTRL_REGS,
    pub dpram: hal::pac::USBCTRL_DPRAM,
    pub clock: hal::clocks::UsbClock,
    pub resets: hal::pac::RESETS,
}

pub struct Board {
    pub led: LedPin,
    pub modem: ModemPins,
    pub timer: hal::Timer,
    pub usb: UsbPeripherals,
}

pub fn init() -> Board {
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

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    Board {
        led: pins.gpio25.into_push_pull_output(),
        modem: ModemPins {
            power_en: pins.gpio10.into_push_pull_output(),
            power_off: pins.gpio11.into_push_pull_output(),
            reset: pins.gpio12.into_push_pull_output(),
            airplane: pins.gpio13.into_push_pull_output(),
        },
        timer,
        usb: UsbPeripherals {
            regs: pac.USBCTRL_REGS,
            dpram: pac.USBCTRL_DPRAM,
            clock: clocks.usb_clock,
            resets: pac.RESETS,
        },
    }
}
