//! The polling tick: scan, detect, dispatch.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::action::Binding;
use crate::dispatch::{dispatch, DispatchReport, HidTransport};
use crate::edge::{detect_changes, detect_edges};
use crate::matrix::{PinDriver, Scanner};
use crate::session::{KeyStates, ScanSession};
use crate::NUM_KEYS;

/// How long to wait after a tick that saw no edge (~100 Hz polling).
pub const IDLE_DELAY_MS: u32 = 10;

/// Outcome of one [`Keypad::tick`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Tick {
    /// Nothing changed; the caller should wait [`IDLE_DELAY_MS`].
    Idle,
    Dispatched(DispatchReport),
}

/// Owns the whole pipeline for one pad.
pub struct Keypad<P, D, T> {
    scanner: Scanner<P, D>,
    session: ScanSession,
    transport: T,
    actions: &'static [Binding; NUM_KEYS],
}

impl<P, D, T> Keypad<P, D, T>
where
    P: PinDriver,
    D: DelayNs,
    T: HidTransport,
{
    pub fn new(scanner: Scanner<P, D>, transport: T, actions: &'static [Binding; NUM_KEYS]) -> Self {
        Self {
            scanner,
            session: ScanSession::new(),
            transport,
            actions,
        }
    }

    /// One polling step. Dispatch runs to completion before this returns, so
    /// no pulse survives into the next scan.
    pub fn tick<W: fmt::Write + ?Sized>(&mut self, diagnostics: &mut W) -> Tick {
        self.scanner.scan(&mut self.session);
        if !detect_edges(&mut self.session) {
            return Tick::Idle;
        }
        Tick::Dispatched(dispatch(
            &mut self.session,
            self.actions,
            &mut self.transport,
            diagnostics,
        ))
    }

    /// Matrix bring-up mode: print the key-state line whenever the matrix
    /// changes, and fire nothing. Returns whether a line was printed.
    pub fn tick_matrix_test<W: fmt::Write + ?Sized>(&mut self, diagnostics: &mut W) -> bool {
        self.scanner.scan(&mut self.session);
        if !detect_changes(&mut self.session) {
            return false;
        }
        let _ = writeln!(diagnostics, "{}", KeyStates(self.session.current()));
        true
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn pins_mut(&mut self) -> &mut P {
        self.scanner.pins_mut()
    }
}
