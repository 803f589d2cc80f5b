//! Matrix wiring and the row-by-row scanner.
//!
//! Rows are asserted open-drain: a driven row is pulled low, every other row
//! floats. Columns have pull-ups, so a closed switch reads low.
//!
//! Scan layout (row x column -> logical key):
//!
//! ```text
//!     C01 C09 C11 C12 C13 C14 C16 C17
//! R0   .. [ 0][ 8][ 9][10][11][ 2] ..
//! R1  [ 1][19][12][13][14] ..  ..  ..
//! R2   ..  .. [16][17][18][23] ..  ..
//! R3   ..  ..  .. [20][22] ..  ..  ..
//! R4   ..  .. [ 4][ 5][ 6] ..  ..  ..
//! R5   ..  ..  ..  .. [ 7] ..  .. [15]
//! R6   .. [21] ..  ..  ..  ..  .. [ 3]
//! ```

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::session::{KeyIndex, KeySet, ScanSession};
use crate::{COLS, NUM_KEYS, ROWS};

/// Settling time between asserting a row and sampling its columns.
pub const SETTLE_MICROS: u32 = 4;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Row {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
}

impl Row {
    /// Scan order.
    pub const ALL: [Row; ROWS] = [Row::R0, Row::R1, Row::R2, Row::R3, Row::R4, Row::R5, Row::R6];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Column lines, named after the header pins they are soldered to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Col {
    C01,
    C09,
    C11,
    C12,
    C13,
    C14,
    C16,
    C17,
}

impl Col {
    pub const ALL: [Col; COLS] = [
        Col::C01,
        Col::C09,
        Col::C11,
        Col::C12,
        Col::C13,
        Col::C14,
        Col::C16,
        Col::C17,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Line {
    Row(Row),
    Col(Col),
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

impl fmt::Display for Col {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Col::C01 => "C01",
            Col::C09 => "C09",
            Col::C11 => "C11",
            Col::C12 => "C12",
            Col::C13 => "C13",
            Col::C14 => "C14",
            Col::C16 => "C16",
            Col::C17 => "C17",
        };
        f.write_str(name)
    }
}

/// GPIO access the scanner needs.
pub trait PinDriver {
    /// Actively pull the line low.
    fn set_line_driven(&mut self, line: Line);
    /// Stop driving the line (high impedance).
    fn set_line_floating(&mut self, line: Line);
    /// Current electrical level, `true` = high.
    fn read_line_level(&mut self, line: Line) -> bool;
}

/// One switch: where it sits in the matrix and which key it is.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Wire {
    pub row: Row,
    pub col: Col,
    pub key: KeyIndex,
}

const fn wire(row: Row, col: Col, key: u8) -> Wire {
    Wire {
        row,
        col,
        key: KeyIndex::new(key),
    }
}

/// Physical wiring, grouped by row in scan order.
pub static WIRING: [Wire; NUM_KEYS] = [
    wire(Row::R0, Col::C09, 0),
    wire(Row::R0, Col::C11, 8),
    wire(Row::R0, Col::C12, 9),
    wire(Row::R0, Col::C13, 10),
    wire(Row::R0, Col::C14, 11),
    wire(Row::R0, Col::C16, 2),
    wire(Row::R1, Col::C01, 1),
    wire(Row::R1, Col::C09, 19),
    wire(Row::R1, Col::C11, 12),
    wire(Row::R1, Col::C12, 13),
    wire(Row::R1, Col::C13, 14),
    wire(Row::R2, Col::C11, 16),
    wire(Row::R2, Col::C12, 17),
    wire(Row::R2, Col::C13, 18),
    wire(Row::R2, Col::C14, 23),
    wire(Row::R3, Col::C12, 20),
    wire(Row::R3, Col::C13, 22),
    wire(Row::R4, Col::C11, 4),
    wire(Row::R4, Col::C12, 5),
    wire(Row::R4, Col::C13, 6),
    wire(Row::R5, Col::C13, 7),
    wire(Row::R5, Col::C17, 15),
    wire(Row::R6, Col::C09, 21),
    wire(Row::R6, Col::C17, 3),
];

/// Look up the key at a matrix position.
pub fn key_at(wiring: &[Wire], row: Row, col: Col) -> Option<KeyIndex> {
    wiring
        .iter()
        .find(|w| w.row == row && w.col == col)
        .map(|w| w.key)
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WiringError {
    /// No switch is wired to this key.
    MissingKey(KeyIndex),
    /// More than one switch claims this key.
    DuplicateKey(KeyIndex),
    /// Two entries share one matrix position.
    DuplicatePosition { row: Row, col: Col },
}

impl fmt::Display for WiringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WiringError::MissingKey(key) => write!(f, "key {} is not wired", key),
            WiringError::DuplicateKey(key) => write!(f, "key {} is wired more than once", key),
            WiringError::DuplicatePosition { row, col } => {
                write!(f, "{}/{} is used more than once", row, col)
            }
        }
    }
}

/// Check that every key is wired exactly once and no position repeats.
pub fn validate_wiring(wiring: &[Wire]) -> Result<(), WiringError> {
    let mut seen = KeySet::EMPTY;
    let mut positions = [0u8; ROWS];

    for w in wiring {
        if seen.contains(w.key) {
            return Err(WiringError::DuplicateKey(w.key));
        }
        seen.insert(w.key);

        let bit = 1 << w.col.index();
        if positions[w.row.index()] & bit != 0 {
            return Err(WiringError::DuplicatePosition {
                row: w.row,
                col: w.col,
            });
        }
        positions[w.row.index()] |= bit;
    }

    match KeyIndex::all().find(|&k| !seen.contains(k)) {
        Some(key) => Err(WiringError::MissingKey(key)),
        None => Ok(()),
    }
}

/// Drives the rows one at a time and records every wired column.
pub struct Scanner<P, D> {
    pins: P,
    delay: D,
    wiring: &'static [Wire],
}

impl<P: PinDriver, D: DelayNs> Scanner<P, D> {
    /// Takes ownership of the pins and leaves every row floating.
    pub fn new(pins: P, delay: D, wiring: &'static [Wire]) -> Self {
        let mut scanner = Self {
            pins,
            delay,
            wiring,
        };
        for row in Row::ALL {
            scanner.pins.set_line_floating(Line::Row(row));
        }
        scanner
    }

    /// Sample the whole matrix into `session.current`.
    ///
    /// Every row is driven, including rows with no wired keys.
    pub fn scan(&mut self, session: &mut ScanSession) {
        for row in Row::ALL {
            self.pins.set_line_driven(Line::Row(row));
            self.delay.delay_us(SETTLE_MICROS);

            for w in self.wiring.iter().filter(|w| w.row == row) {
                let level = self.pins.read_line_level(Line::Col(w.col));
                session.record_level(w.key, level);
            }

            self.pins.set_line_floating(Line::Row(row));
        }
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }
}
