//! Replay a key script through the real scan/edge/dispatch pipeline.
//!
//! Script lines:
//!
//! ```text
//! # comment
//! press 4        close the switch of key 4, then tick
//! release 4      open it, then tick
//! tap 4          press + release
//! tick           one more polling tick with nothing changed
//! fail-after 3   let 3 more characters through, then fail every write_char
//! heal           stop failing
//! ```

use std::io::Write;

use anyhow::{bail, Context, Result};
use embedded_hal::delay::DelayNs;
use log::debug;
use numpad_core::matrix::key_at;
use numpad_core::{
    ConsumerCode, HidTransport, KeyIndex, KeySet, Keycode, Keypad, Line, PinDriver, Row, Scanner,
    Tick, TransportError, ACTIONS, NUM_KEYS, WIRING,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Press(KeyIndex),
    Release(KeyIndex),
    Tap(KeyIndex),
    Tick,
    FailAfter(usize),
    Heal,
}

fn parse_key(arg: Option<&str>) -> Result<KeyIndex> {
    let arg = arg.context("missing key number")?;
    let n: u8 = arg
        .parse()
        .with_context(|| format!("'{}' is not a key number", arg))?;
    KeyIndex::try_new(n).with_context(|| format!("key {} out of range 0..{}", n, NUM_KEYS))
}

pub fn parse(input: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (n, line) in input.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("");
        let arg = words.next();

        let step = match command {
            "press" => parse_key(arg).map(Step::Press),
            "release" => parse_key(arg).map(Step::Release),
            "tap" => parse_key(arg).map(Step::Tap),
            "tick" => Ok(Step::Tick),
            "heal" => Ok(Step::Heal),
            "fail-after" => arg
                .context("missing character count")
                .and_then(|a| a.parse().with_context(|| format!("'{}' is not a count", a)))
                .map(Step::FailAfter),
            other => Err(anyhow::anyhow!("unknown command '{}'", other)),
        }
        .with_context(|| format!("line {}", n + 1))?;

        if words.next().is_some() {
            bail!("line {}: trailing input", n + 1);
        }
        steps.push(step);
    }
    Ok(steps)
}

/// Switches held down by the script, seen through the real wiring table.
#[derive(Default)]
struct ScriptedPins {
    held: KeySet,
    driven: Option<Row>,
}

impl PinDriver for ScriptedPins {
    fn set_line_driven(&mut self, line: Line) {
        if let Line::Row(row) = line {
            self.driven = Some(row);
        }
    }

    fn set_line_floating(&mut self, line: Line) {
        if matches!(line, Line::Row(row) if self.driven == Some(row)) {
            self.driven = None;
        }
    }

    fn read_line_level(&mut self, line: Line) -> bool {
        let (Some(row), Line::Col(col)) = (self.driven, line) else {
            return true;
        };
        match key_at(&WIRING, row, col) {
            Some(key) => !self.held.contains(key),
            None => true,
        }
    }
}

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Press(Keycode),
    Write(Keycode),
    ReleaseAll,
    Consumer(ConsumerCode),
    Char(u8),
    CharFailed(u8),
}

/// Records transport calls and fails text on demand.
#[derive(Default)]
struct RecordingTransport {
    events: Vec<Event>,
    char_budget: Option<usize>,
    error: Option<TransportError>,
}

impl HidTransport for RecordingTransport {
    fn press_modifier(&mut self, key: Keycode) {
        self.events.push(Event::Press(key));
    }

    fn write_key(&mut self, key: Keycode) -> bool {
        self.events.push(Event::Write(key));
        true
    }

    fn release_all(&mut self) {
        self.events.push(Event::ReleaseAll);
    }

    fn write_consumer_code(&mut self, code: ConsumerCode) {
        self.events.push(Event::Consumer(code));
    }

    fn write_char(&mut self, c: u8) -> bool {
        match self.char_budget {
            Some(0) => {
                self.events.push(Event::CharFailed(c));
                self.error.get_or_insert(TransportError::Timeout);
                false
            }
            Some(ref mut n) => {
                *n -= 1;
                self.events.push(Event::Char(c));
                true
            }
            None => {
                self.events.push(Event::Char(c));
                true
            }
        }
    }

    fn last_error(&self) -> Option<TransportError> {
        self.error
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}

fn flush_typed(typed: &mut String, out: &mut impl Write) -> std::io::Result<()> {
    if !typed.is_empty() {
        writeln!(out, "  type \"{}\"", typed)?;
        typed.clear();
    }
    Ok(())
}

/// Render events one per line, folding runs of typed characters into a
/// single quoted string.
fn render_events(events: &[Event], out: &mut impl Write) -> std::io::Result<()> {
    let mut typed = String::new();
    for event in events {
        if let Event::Char(c) = event {
            typed.push(*c as char);
            continue;
        }
        flush_typed(&mut typed, &mut *out)?;
        match event {
            Event::Press(k) => writeln!(out, "  press {}", k.display_name())?,
            Event::Write(k) => writeln!(out, "  write {}", k.display_name())?,
            Event::ReleaseAll => writeln!(out, "  release all")?,
            Event::Consumer(code) => {
                writeln!(out, "  consumer {} (0x{:03X})", code.display_name(), code.usage())?
            }
            Event::CharFailed(c) => writeln!(out, "  type {:?} FAILED", *c as char)?,
            Event::Char(_) => {}
        }
    }
    flush_typed(&mut typed, out)
}

type SimKeypad = Keypad<ScriptedPins, NoDelay, RecordingTransport>;

fn tick(keypad: &mut SimKeypad, matrix_test: bool, out: &mut impl Write) -> Result<()> {
    let mut diagnostics = String::new();
    if matrix_test {
        keypad.tick_matrix_test(&mut diagnostics);
    } else if let Tick::Dispatched(report) = keypad.tick(&mut diagnostics) {
        debug!("dispatch: {:?}", report);
    }

    let events = std::mem::take(&mut keypad.transport_mut().events);
    render_events(&events, out)?;
    for line in diagnostics.lines() {
        writeln!(out, "  ! {}", line)?;
    }
    Ok(())
}

/// Run `steps` against a fresh keypad, writing a transcript to `out`.
///
/// In matrix-test mode nothing is dispatched; each tick that sees a change
/// prints the key-state line instead.
pub fn run(steps: &[Step], matrix_test: bool, out: &mut impl Write) -> Result<()> {
    let scanner = Scanner::new(ScriptedPins::default(), NoDelay, &WIRING);
    let mut keypad = Keypad::new(scanner, RecordingTransport::default(), &ACTIONS);

    for step in steps {
        match *step {
            Step::Press(key) => {
                writeln!(out, "> press {}", key)?;
                keypad.pins_mut().held.insert(key);
                tick(&mut keypad, matrix_test, out)?;
            }
            Step::Release(key) => {
                writeln!(out, "> release {}", key)?;
                release(&mut keypad, key);
                tick(&mut keypad, matrix_test, out)?;
            }
            Step::Tap(key) => {
                writeln!(out, "> tap {}", key)?;
                keypad.pins_mut().held.insert(key);
                tick(&mut keypad, matrix_test, out)?;
                release(&mut keypad, key);
                tick(&mut keypad, matrix_test, out)?;
            }
            Step::Tick => {
                writeln!(out, "> tick")?;
                tick(&mut keypad, matrix_test, out)?;
            }
            Step::FailAfter(n) => {
                writeln!(out, "> fail-after {}", n)?;
                keypad.transport_mut().char_budget = Some(n);
            }
            Step::Heal => {
                writeln!(out, "> heal")?;
                keypad.transport_mut().char_budget = None;
            }
        }
    }
    Ok(())
}

fn release(keypad: &mut SimKeypad, key: KeyIndex) {
    let pins = keypad.pins_mut();
    pins.held = pins.held.iter().filter(|&k| k != key).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(script: &str, matrix_test: bool) -> String {
        let steps = parse(script).unwrap();
        let mut out = Vec::new();
        run(&steps, matrix_test, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_script() {
        let steps = parse("# demo\npress 0\n\nrelease 0  # done\ntap 23\nfail-after 2\nheal\ntick\n")
            .unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Press(KeyIndex::new(0)),
                Step::Release(KeyIndex::new(0)),
                Step::Tap(KeyIndex::new(23)),
                Step::FailAfter(2),
                Step::Heal,
                Step::Tick,
            ]
        );
    }

    #[test]
    fn test_parse_errors_name_line() {
        let err = parse("press 1\npress 24\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));

        let err = parse("jump 3\n").unwrap_err();
        assert!(format!("{:#}", err).contains("unknown command"));

        assert!(parse("press\n").is_err());
        assert!(parse("press 1 2\n").is_err());
        assert!(parse("fail-after x\n").is_err());
    }

    #[test]
    fn test_shutdown_transcript() {
        let out = transcript("press 0\nrelease 0\n", false);
        assert_eq!(
            out,
            "> press 0\n  press RGui\n  press X\n  release all\n  write U\n  write U\n> release 0\n"
        );
    }

    #[test]
    fn test_text_macro_transcript() {
        let out = transcript("tap 5\n", false);
        assert_eq!(out, "> tap 5\n  type \":heart:\"\n");
    }

    #[test]
    fn test_failure_transcript() {
        let out = transcript("fail-after 3\ntap 6\nheal\ntap 23\n", false);
        assert_eq!(
            out,
            "> fail-after 3\n\
             > tap 6\n  type \":an\"\n  type 'g' FAILED\n  ! Error: 2 (timeout)\n\
             > heal\n\
             > tap 23\n  consumer Mute (0x0E2)\n"
        );
    }

    #[test]
    fn test_matrix_test_transcript() {
        let out = transcript("press 1\npress 2\ntick\nrelease 1\n", true);
        assert_eq!(
            out,
            "> press 1\n  ! .1......................\n\
             > press 2\n  ! .12.....................\n\
             > tick\n\
             > release 1\n  ! ..2.....................\n"
        );
    }
}
