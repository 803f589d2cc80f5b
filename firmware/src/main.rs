//! Macro numpad firmware for ATmega32U4 (Pro Micro / Teensy 2.0).
//!
//! A single cooperative loop:
//! - Scan the 7-row matrix
//! - Turn level changes into press/release pulses
//! - Fire the bound shortcut, media key or text macro over USB HID
//! - Sleep ~10ms when nothing happened, servicing USB meanwhile

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod delay;
mod diag;
mod hid;
mod matrix;

use avr_device::atmega32u4::Peripherals;
use embedded_hal::delay::DelayNs;
use numpad_core::{Keypad, Scanner, Tick, ACTIONS, IDLE_DELAY_MS, WIRING};

use delay::BusyDelay;
use diag::StatusLed;
use hid::HidKeypad;
use matrix::AvrPins;

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Clock prescaler = 1 (16MHz)
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    matrix::init_gpio(&dp);
    let mut led = StatusLed::new(&dp);

    let mut hid = HidKeypad::new(&dp);
    hid.init();

    let scanner = Scanner::new(AvrPins::new(&dp), BusyDelay, &WIRING);
    let mut keypad = Keypad::new(scanner, hid, &ACTIONS);
    let mut delay = BusyDelay;

    loop {
        keypad.transport_mut().poll();

        match keypad.tick(&mut led) {
            Tick::Idle => {
                // Keep answering control requests while idle.
                for _ in 0..IDLE_DELAY_MS {
                    delay.delay_ms(1);
                    keypad.transport_mut().poll();
                }
            }
            Tick::Dispatched(report) => {
                if report.error.is_none() {
                    led.clear();
                }
            }
        }
    }
}
