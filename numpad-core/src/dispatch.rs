//! Turning pulses into HID output.

use core::fmt;

use crate::action::{Action, Binding, Edge};
use crate::consumer::ConsumerCode;
use crate::keycode::Keycode;
use crate::session::{KeyIndex, ScanSession};
use crate::NUM_KEYS;

/// Why the HID layer refused a write.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TransportError {
    /// The host has not configured the device yet.
    NotConfigured,
    /// The host did not take the report in time.
    Timeout,
    /// The character has no key on the active layout.
    Unmapped,
    /// The keyboard report has no free key slot.
    RolloverFull,
}

impl TransportError {
    /// Stable non-zero numeric code for diagnostics.
    pub const fn code(self) -> u8 {
        match self {
            TransportError::NotConfigured => 1,
            TransportError::Timeout => 2,
            TransportError::Unmapped => 3,
            TransportError::RolloverFull => 4,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportError::NotConfigured => "not configured",
            TransportError::Timeout => "timeout",
            TransportError::Unmapped => "unmapped character",
            TransportError::RolloverFull => "rollover full",
        };
        write!(f, "{} ({})", self.code(), name)
    }
}

/// HID output the dispatcher drives.
///
/// Failures are latched: a write that fails records an error that stays
/// visible through [`last_error`](HidTransport::last_error) until
/// [`clear_error`](HidTransport::clear_error).
pub trait HidTransport {
    /// Add a key (usually a modifier) to the held set and report it.
    fn press_modifier(&mut self, key: Keycode);
    /// Press and release one key. Returns `false` on failure.
    fn write_key(&mut self, key: Keycode) -> bool;
    fn release_all(&mut self);
    fn write_consumer_code(&mut self, code: ConsumerCode);
    /// Type one ASCII character. Returns `false` on failure.
    fn write_char(&mut self, c: u8) -> bool;
    fn last_error(&self) -> Option<TransportError>;
    fn clear_error(&mut self);
}

/// What one dispatch pass did.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct DispatchReport {
    /// Actions started.
    pub fired: u8,
    /// Text macros cut short by a failed write.
    pub aborted: u8,
    /// Transport error observed (and cleared) at the end of the pass.
    pub error: Option<TransportError>,
}

/// Fire the action of every key with a matching pulse, in ascending key
/// order, then consume both pulse sets.
///
/// With no pulses nothing touches the transport. Otherwise the transport's
/// error flag is checked once after all actions, written to `diagnostics`
/// and cleared.
pub fn dispatch<T, W>(
    session: &mut ScanSession,
    actions: &[Binding; NUM_KEYS],
    transport: &mut T,
    diagnostics: &mut W,
) -> DispatchReport
where
    T: HidTransport + ?Sized,
    W: fmt::Write + ?Sized,
{
    let (pressed, released) = session.take_pulses();
    let mut report = DispatchReport::default();
    if pressed.is_empty() && released.is_empty() {
        return report;
    }

    for key in KeyIndex::all() {
        let action = &actions[key.as_usize()].action;
        let fire = match action.trigger() {
            Edge::Pressed => pressed.contains(key),
            Edge::Released => released.contains(key),
        };
        if !fire {
            continue;
        }

        debug!("key {}: {} action", key, action.kind());
        report.fired += 1;
        if !perform(action, transport) {
            warn!("key {}: text macro aborted", key);
            report.aborted += 1;
        }
    }

    if let Some(err) = transport.last_error() {
        warn!("HID write error {}", err);
        // Best effort: a sink that cannot take the line is not an error here.
        let _ = writeln!(diagnostics, "Error: {}", err);
        transport.clear_error();
        report.error = Some(err);
    }

    report
}

/// Run one action. Returns `false` if a text macro stopped early.
fn perform<T: HidTransport + ?Sized>(action: &Action, transport: &mut T) -> bool {
    match *action {
        Action::ModifierShortcut { chord, then } => {
            for &key in chord {
                transport.press_modifier(key);
            }
            transport.release_all();
            for &key in then {
                if !transport.write_key(key) {
                    trace!("write_key {:?} failed", key);
                }
            }
            true
        }
        Action::Consumer(code) => {
            transport.write_consumer_code(code);
            true
        }
        Action::Text(text) => text.bytes().all(|c| transport.write_char(c)),
    }
}
