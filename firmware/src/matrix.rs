//! GPIO side of the key matrix.
//!
//! Pin mapping on the Pro Micro / Teensy 2.0 (ATmega32U4):
//!   Rows (open-drain, asserted low):  PD7, PC6, PD4, PD0, PD1, PD2, PD3
//!   Columns (inputs w/ pull-up):      PB6, PF6, PB1, PB3, PB2, PF7, PF4, PF5
//!
//! A row's output latch is always 0. Asserting the row means switching its
//! DDR bit to output; releasing it switches back to input, so a row never
//! drives high into another row through a pressed key.

use avr_device::atmega32u4::Peripherals;
use numpad_core::{Col, Line, PinDriver, Row};

#[derive(Copy, Clone)]
enum Port {
    B,
    C,
    D,
    F,
}

/// Row pins on PORTD: PD0-PD4, PD7.
const ROW_MASK_D: u8 = 0x9F;
/// Row pin on PORTC: PC6.
const ROW_MASK_C: u8 = 0x40;
/// Column pins on PORTB: PB1-PB3, PB6.
const COL_MASK_B: u8 = 0x4E;
/// Column pins on PORTF: PF4-PF7.
const COL_MASK_F: u8 = 0xF0;

fn pin(line: Line) -> (Port, u8) {
    match line {
        Line::Row(Row::R0) => (Port::D, 7),
        Line::Row(Row::R1) => (Port::C, 6),
        Line::Row(Row::R2) => (Port::D, 4),
        Line::Row(Row::R3) => (Port::D, 0),
        Line::Row(Row::R4) => (Port::D, 1),
        Line::Row(Row::R5) => (Port::D, 2),
        Line::Row(Row::R6) => (Port::D, 3),
        Line::Col(Col::C01) => (Port::B, 6),
        Line::Col(Col::C09) => (Port::F, 6),
        Line::Col(Col::C11) => (Port::B, 1),
        Line::Col(Col::C12) => (Port::B, 3),
        Line::Col(Col::C13) => (Port::B, 2),
        Line::Col(Col::C14) => (Port::F, 7),
        Line::Col(Col::C16) => (Port::F, 4),
        Line::Col(Col::C17) => (Port::F, 5),
    }
}

/// Put the matrix pins into their idle configuration.
pub fn init_gpio(dp: &Peripherals) {
    // PF4-PF7 double as JTAG. JTD has to be written twice within four cycles.
    dp.CPU.mcucr.write(|w| unsafe { w.bits(0x80) });
    dp.CPU.mcucr.write(|w| unsafe { w.bits(0x80) });

    // Rows: input, latch low
    dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(r.bits() & !ROW_MASK_D) });
    dp.PORTD.portd.modify(|r, w| unsafe { w.bits(r.bits() & !ROW_MASK_D) });
    dp.PORTC.ddrc.modify(|r, w| unsafe { w.bits(r.bits() & !ROW_MASK_C) });
    dp.PORTC.portc.modify(|r, w| unsafe { w.bits(r.bits() & !ROW_MASK_C) });

    // Columns: input with pull-up
    dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(r.bits() & !COL_MASK_B) });
    dp.PORTB.portb.modify(|r, w| unsafe { w.bits(r.bits() | COL_MASK_B) });
    dp.PORTF.ddrf.modify(|r, w| unsafe { w.bits(r.bits() & !COL_MASK_F) });
    dp.PORTF.portf.modify(|r, w| unsafe { w.bits(r.bits() | COL_MASK_F) });
}

/// [`PinDriver`] over the ATmega32U4 port registers.
pub struct AvrPins<'a> {
    dp: &'a Peripherals,
}

impl<'a> AvrPins<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        Self { dp }
    }

    fn set_output(&self, port: Port, bit: u8, output: bool) {
        let apply = |bits: u8| {
            if output {
                bits | (1 << bit)
            } else {
                bits & !(1 << bit)
            }
        };
        match port {
            Port::B => {
                self.dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(apply(r.bits())) });
            }
            Port::C => {
                self.dp.PORTC.ddrc.modify(|r, w| unsafe { w.bits(apply(r.bits())) });
            }
            Port::D => {
                self.dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(apply(r.bits())) });
            }
            Port::F => {
                self.dp.PORTF.ddrf.modify(|r, w| unsafe { w.bits(apply(r.bits())) });
            }
        }
    }

    fn input_bits(&self, port: Port) -> u8 {
        match port {
            Port::B => self.dp.PORTB.pinb.read().bits(),
            Port::C => self.dp.PORTC.pinc.read().bits(),
            Port::D => self.dp.PORTD.pind.read().bits(),
            Port::F => self.dp.PORTF.pinf.read().bits(),
        }
    }
}

impl PinDriver for AvrPins<'_> {
    fn set_line_driven(&mut self, line: Line) {
        let (port, bit) = pin(line);
        self.set_output(port, bit, true);
    }

    fn set_line_floating(&mut self, line: Line) {
        let (port, bit) = pin(line);
        self.set_output(port, bit, false);
    }

    fn read_line_level(&mut self, line: Line) -> bool {
        let (port, bit) = pin(line);
        (self.input_bits(port) >> bit) & 1 != 0
    }
}
