//! Scan-to-event pipeline for the 24-key macro numpad.
//!
//! This crate is `no_std` so the AVR firmware and the host CLI share one
//! definition of the wiring, the edge semantics and the action table. The
//! firmware only supplies a [`PinDriver`], a delay and an [`HidTransport`].

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod action;
pub mod consumer;
pub mod dispatch;
pub mod edge;
pub mod keycode;
pub mod keypad;
pub mod matrix;
pub mod session;

pub use action::{Action, Binding, Edge, ACTIONS};
pub use consumer::ConsumerCode;
pub use dispatch::{dispatch, DispatchReport, HidTransport, TransportError};
pub use edge::{detect_changes, detect_edges};
pub use keycode::{KeyStroke, Keycode};
pub use keypad::{Keypad, Tick, IDLE_DELAY_MS};
pub use matrix::{Col, Line, PinDriver, Row, Scanner, Wire, WiringError, WIRING};
pub use session::{KeyBits, KeyIndex, KeySet, KeyStates, ScanSession};

/// Number of keys on the pad.
pub const NUM_KEYS: usize = 24;
/// Number of driven matrix rows.
pub const ROWS: usize = 7;
/// Number of sensed matrix columns.
pub const COLS: usize = 8;
