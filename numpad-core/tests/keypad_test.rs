pub mod common;

use common::{keypad, position, Call};
use numpad_core::{ConsumerCode, Keycode, Row, Tick, TransportError};

#[test]
fn test_idle_tick_does_nothing() {
    let mut pad = keypad();
    let mut diag = String::new();
    assert_eq!(pad.tick(&mut diag), Tick::Idle);
    assert_eq!(pad.tick(&mut diag), Tick::Idle);
    assert!(pad.transport().calls.is_empty());
    assert!(diag.is_empty());
}

#[test]
fn test_shutdown_key_press() {
    let mut pad = keypad();
    pad.pins_mut().press(0);
    let tick = pad.tick(&mut String::new());

    assert!(matches!(tick, Tick::Dispatched(r) if r.fired == 1));
    assert_eq!(
        pad.transport().calls,
        vec![
            Call::Press(Keycode::RGui),
            Call::Press(Keycode::X),
            Call::ReleaseAll,
            Call::Write(Keycode::U),
            Call::Write(Keycode::U),
        ]
    );

    // Holding the key does not repeat the shortcut.
    pad.transport_mut().take();
    assert_eq!(pad.tick(&mut String::new()), Tick::Idle);
    assert!(pad.transport().calls.is_empty());
}

#[test]
fn test_text_on_release() {
    let mut pad = keypad();
    pad.pins_mut().press(4);
    pad.tick(&mut String::new());
    assert!(pad.transport().calls.is_empty());

    pad.pins_mut().release(4);
    pad.tick(&mut String::new());
    assert_eq!(pad.transport().text(), ":heavy_check_mark:");
}

#[test]
fn test_simultaneous_media_keys() {
    let mut pad = keypad();
    pad.pins_mut().press(21);
    pad.pins_mut().press(20);
    pad.tick(&mut String::new());

    assert_eq!(
        pad.transport().calls,
        vec![
            Call::Consumer(ConsumerCode::PlayPause),
            Call::Consumer(ConsumerCode::ScanPreviousTrack),
        ]
    );
}

#[test]
fn test_write_failure_is_reported_and_cleared() {
    let mut pad = keypad();
    let mut diag = String::new();
    pad.transport_mut().fail_chars_after = Some(5);

    pad.pins_mut().press(5);
    pad.tick(&mut diag);
    pad.pins_mut().release(5);
    let tick = pad.tick(&mut diag);

    let Tick::Dispatched(report) = tick else {
        panic!("release was not dispatched");
    };
    assert_eq!(report.aborted, 1);
    assert_eq!(report.error, Some(TransportError::Timeout));
    assert_eq!(pad.transport().text(), ":heart");
    assert_eq!(pad.transport().pending_error(), None);
    assert_eq!(diag, "Error: 2 (timeout)\n");

    // Unrelated keys keep working afterwards.
    pad.transport_mut().take();
    pad.transport_mut().fail_chars_after = None;
    pad.pins_mut().press(23);
    pad.tick(&mut diag);
    assert_eq!(
        pad.transport().calls,
        vec![Call::Consumer(ConsumerCode::Mute)]
    );
    assert_eq!(diag.lines().count(), 1);
}

#[test]
fn test_every_key_reaches_its_action() {
    for key in 0..24u8 {
        let mut pad = keypad();
        pad.pins_mut().press(key);
        pad.tick(&mut String::new());
        pad.pins_mut().release(key);
        pad.tick(&mut String::new());
        assert!(
            !pad.transport().calls.is_empty(),
            "key {} at {:?} fired nothing",
            key,
            position(key)
        );
    }
}

#[test]
fn test_press_keys_fire_on_first_tick() {
    let mut pad = keypad();
    pad.pins_mut().press(2);
    pad.tick(&mut String::new());
    assert_eq!(
        pad.transport().calls,
        vec![Call::Consumer(ConsumerCode::Calculator)]
    );
    assert_eq!(position(2), (Row::R0, numpad_core::Col::C16));
}

#[test]
fn test_matrix_test_mode_prints_states() {
    let mut pad = keypad();
    let mut diag = String::new();
    assert!(!pad.tick_matrix_test(&mut diag));

    pad.pins_mut().press(3);
    pad.pins_mut().press(15);
    assert!(pad.tick_matrix_test(&mut diag));
    assert!(!pad.tick_matrix_test(&mut diag));

    assert_eq!(diag, "...3...........F........\n");
    assert!(pad.transport().calls.is_empty());
}
