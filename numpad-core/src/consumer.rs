/// USB HID consumer-control usages (Usage Page 0x0C).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u16)]
pub enum ConsumerCode {
    ScanNextTrack = 0x00B5,
    ScanPreviousTrack = 0x00B6,
    Stop = 0x00B7,
    PlayPause = 0x00CD,
    Mute = 0x00E2,
    VolumeUp = 0x00E9,
    VolumeDown = 0x00EA,
    /// AL Calculator
    Calculator = 0x0192,
}

impl ConsumerCode {
    pub const fn usage(self) -> u16 {
        self as u16
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ConsumerCode::ScanNextTrack => "Next",
            ConsumerCode::ScanPreviousTrack => "Prev",
            ConsumerCode::Stop => "Stop",
            ConsumerCode::PlayPause => "Play/Pause",
            ConsumerCode::Mute => "Mute",
            ConsumerCode::VolumeUp => "Vol+",
            ConsumerCode::VolumeDown => "Vol-",
            ConsumerCode::Calculator => "Calc",
        }
    }
}
