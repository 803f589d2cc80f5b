#![allow(dead_code)]

use embedded_hal::delay::DelayNs;
use numpad_core::matrix::key_at;
use numpad_core::{
    Col, ConsumerCode, HidTransport, KeyIndex, KeySet, Keycode, Keypad, Line, PinDriver, Row,
    Scanner, TransportError, ACTIONS, WIRING,
};

// Init logger for tests
#[ctor::ctor]
fn init_log() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

/// Matrix with switches that can be closed by key number.
#[derive(Default)]
pub struct TestPins {
    held: KeySet,
    driven: Option<Row>,
}

impl TestPins {
    pub fn press(&mut self, key: u8) {
        self.held.insert(KeyIndex::new(key));
    }

    pub fn release(&mut self, key: u8) {
        self.held = self.held.iter().filter(|k| k.get() != key).collect();
    }
}

impl PinDriver for TestPins {
    fn set_line_driven(&mut self, line: Line) {
        if let Line::Row(row) = line {
            assert_eq!(self.driven, None, "{:?} driven while another row is", row);
            self.driven = Some(row);
        }
    }

    fn set_line_floating(&mut self, line: Line) {
        if let Line::Row(row) = line {
            if self.driven == Some(row) {
                self.driven = None;
            }
        }
    }

    fn read_line_level(&mut self, line: Line) -> bool {
        let (Some(row), Line::Col(col)) = (self.driven, line) else {
            return true;
        };
        !matches!(key_at(&WIRING, row, col), Some(k) if self.held.contains(k))
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Press(Keycode),
    Write(Keycode),
    ReleaseAll,
    Consumer(ConsumerCode),
    Char(char),
    ClearError,
}

/// Transport that records every call and can be told to start failing.
#[derive(Default)]
pub struct RecordingTransport {
    pub calls: Vec<Call>,
    pub fail_chars_after: Option<usize>,
    chars_ok: usize,
    error: Option<TransportError>,
}

impl RecordingTransport {
    pub fn text(&self) -> String {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Char(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn take(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn pending_error(&self) -> Option<TransportError> {
        self.error
    }
}

impl HidTransport for RecordingTransport {
    fn press_modifier(&mut self, key: Keycode) {
        self.calls.push(Call::Press(key));
    }

    fn write_key(&mut self, key: Keycode) -> bool {
        self.calls.push(Call::Write(key));
        true
    }

    fn release_all(&mut self) {
        self.calls.push(Call::ReleaseAll);
    }

    fn write_consumer_code(&mut self, code: ConsumerCode) {
        self.calls.push(Call::Consumer(code));
    }

    fn write_char(&mut self, c: u8) -> bool {
        self.calls.push(Call::Char(c as char));
        if matches!(self.fail_chars_after, Some(n) if self.chars_ok >= n) {
            self.error = Some(TransportError::Timeout);
            return false;
        }
        self.chars_ok += 1;
        true
    }

    fn last_error(&self) -> Option<TransportError> {
        self.error
    }

    fn clear_error(&mut self) {
        self.calls.push(Call::ClearError);
        self.error = None;
    }
}

pub type TestKeypad = Keypad<TestPins, NoDelay, RecordingTransport>;

pub fn keypad() -> TestKeypad {
    let scanner = Scanner::new(TestPins::default(), NoDelay, &WIRING);
    Keypad::new(scanner, RecordingTransport::default(), &ACTIONS)
}

pub fn position(key: u8) -> (Row, Col) {
    let w = WIRING
        .iter()
        .find(|w| w.key.get() == key)
        .expect("key is wired");
    (w.row, w.col)
}
