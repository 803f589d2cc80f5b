//! Diagnostic sink.
//!
//! The UART TX pin (PD3) is wired as matrix row 6, so error lines cannot go
//! out over serial. Instead any text written here lights the TX LED (PD5,
//! active low) until the next clean dispatch.

use core::fmt;

use avr_device::atmega32u4::Peripherals;

const TX_LED: u8 = 1 << 5;

pub struct StatusLed<'a> {
    dp: &'a Peripherals,
}

impl<'a> StatusLed<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(r.bits() | TX_LED) });
        let led = Self { dp };
        led.clear();
        led
    }

    pub fn clear(&self) {
        self.dp
            .PORTD
            .portd
            .modify(|r, w| unsafe { w.bits(r.bits() | TX_LED) });
    }

    fn light(&self) {
        self.dp
            .PORTD
            .portd
            .modify(|r, w| unsafe { w.bits(r.bits() & !TX_LED) });
    }
}

impl fmt::Write for StatusLed<'_> {
    fn write_str(&mut self, _s: &str) -> fmt::Result {
        self.light();
        Ok(())
    }
}
