//! USB HID transport for ATmega32U4.
//!
//! One HID interface carries two input reports on EP1: a 6KRO keyboard
//! report (id 1) and a single-usage consumer-control report (id 2). Direct
//! register access via avr-device.

use avr_device::atmega32u4::Peripherals;
use numpad_core::{ConsumerCode, HidTransport, KeyStroke, Keycode, TransportError};

const KEYBOARD_REPORT_ID: u8 = 1;
const CONSUMER_REPORT_ID: u8 = 2;

/// Keyboard input report: modifier byte, reserved byte, six key slots.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            keys: [0; 6],
        }
    }

    pub fn press(&mut self, key: Keycode) -> Result<(), TransportError> {
        if key.is_modifier() {
            self.modifiers |= key.modifier_bit();
            return Ok(());
        }
        let code = key as u8;
        if self.keys.contains(&code) {
            return Ok(());
        }
        let slot = self
            .keys
            .iter_mut()
            .find(|k| **k == 0)
            .ok_or(TransportError::RolloverFull)?;
        *slot = code;
        Ok(())
    }

    fn to_bytes(self) -> [u8; 9] {
        let mut out = [0u8; 9];
        out[0] = KEYBOARD_REPORT_ID;
        out[1] = self.modifiers;
        out[3..].copy_from_slice(&self.keys);
        out
    }
}

fn consumer_report(usage: u16) -> [u8; 3] {
    let [lo, hi] = usage.to_le_bytes();
    [CONSUMER_REPORT_ID, lo, hi]
}

// ============================================================================
// Descriptors
// ============================================================================

const EP0_SIZE: u8 = 64;
const EP1_SIZE: u8 = 16;

const HID_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, KEYBOARD_REPORT_ID, // Report ID
    // Modifier keys (8 bits)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224) - LCtrl
    0x29, 0xE7, //   Usage Maximum (231) - RGui
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // Reserved byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    // Key slots (6 bytes)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x85, CONSUMER_REPORT_ID, // Report ID
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x03, // Logical Maximum (0x3FF)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x03, // Usage Maximum (0x3FF)
    0x75, 0x10, //   Report Size (16)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB (2.0)
    0,    // bDeviceClass (defined at interface level)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    0xC0, 0x16, // idVendor (0x16C0)
    0x7F, 0x04, // idProduct (0x047F)
    0x01, 0x00, // bcdDevice (1.0)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration
    9, 2, 34, 0, // bLength, type, wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    50,   // bMaxPower (100mA)
    // Interface
    9, 4, // bLength, type
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    3,    // bInterfaceClass (HID)
    0,    // bInterfaceSubClass (none: report ids rule out boot protocol)
    0,    // bInterfaceProtocol
    0,    // iInterface
    // HID
    9, 0x21, // bLength, type
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    HID_REPORT_DESCRIPTOR.len() as u8, 0, // wDescriptorLength
    // Endpoint 1 IN, interrupt
    7, 5, // bLength, type
    0x81, // bEndpointAddress
    0x03, // bmAttributes (Interrupt)
    EP1_SIZE, 0, // wMaxPacketSize
    1,    // bInterval (1ms, text macros send two reports per character)
];

/// Build a string descriptor from ASCII. `N` must be `2 + 2 * s.len()`.
const fn string_descriptor<const N: usize>(s: &[u8]) -> [u8; N] {
    assert!(N == 2 + 2 * s.len());
    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = 3;
    let mut i = 0;
    while i < s.len() {
        out[2 + 2 * i] = s[i];
        i += 1;
    }
    out
}

static STRING_LANGUAGES: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)
static STRING_MANUFACTURER: [u8; 14] = string_descriptor(b"Numpad");
static STRING_PRODUCT: [u8; 26] = string_descriptor(b"Macro Numpad");

// ============================================================================
// Register-level device
// ============================================================================

/// Decoded 8-byte SETUP packet.
struct SetupPacket {
    request_type: u8,
    request: u8,
    value: u16,
    length: u16,
}

impl SetupPacket {
    fn read(dp: &Peripherals) -> Self {
        let usb = &dp.USB_DEVICE;
        let mut raw = [0u8; 8];
        for byte in raw.iter_mut() {
            *byte = usb.uedatx.read().bits();
        }
        Self {
            request_type: raw[0],
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }
}

struct UsbDevice {
    configured: bool,
}

impl UsbDevice {
    const fn new() -> Self {
        Self { configured: false }
    }

    fn init(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        usb.uhwcon.write(|w| w.uvrege().set_bit());
        usb.usbcon.write(|w| w.usbe().set_bit().otgpade().set_bit());

        // 16MHz crystal -> 48MHz USB clock
        dp.PLL.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());
        usb.udcon.modify(|_, w| w.detach().clear_bit());
        usb.udien.write(|w| w.eorste().set_bit());

        self.configured = false;
    }

    fn poll(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        if usb.udint.read().eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0(dp);
            self.configured = false;
        }

        select_endpoint(dp, 0);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            self.handle_setup(dp);
        }
    }

    /// Queue one input report on EP1.
    fn send(&self, dp: &Peripherals, report: &[u8]) -> Result<(), TransportError> {
        if !self.configured {
            return Err(TransportError::NotConfigured);
        }

        let usb = &dp.USB_DEVICE;
        select_endpoint(dp, 1);

        let mut timeout: u16 = 0xFFFF;
        while usb.ueintx.read().rwal().bit_is_clear() {
            timeout -= 1;
            if timeout == 0 {
                return Err(TransportError::Timeout);
            }
        }

        for &byte in report {
            usb.uedatx.write(|w| w.bits(byte));
        }
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());
        Ok(())
    }

    fn configure_ep0(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;
        select_endpoint(dp, 0);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        // 64 bytes
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;
        select_endpoint(dp, 1);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b11).epdir().set_bit());
        // 16 bytes
        usb.uecfg1x.write(|w| w.epsize().bits(0b001).alloc().set_bit());
    }

    fn handle_setup(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;
        let setup = SetupPacket::read(dp);
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        let [desc_index, desc_type] = setup.value.to_le_bytes();

        match (setup.request_type, setup.request) {
            // GET_DESCRIPTOR
            (0x80, 0x06) => {
                let desc: Option<&[u8]> = match (desc_type, desc_index) {
                    (1, _) => Some(&DEVICE_DESCRIPTOR),
                    (2, _) => Some(&CONFIG_DESCRIPTOR),
                    (3, 0) => Some(&STRING_LANGUAGES),
                    (3, 1) => Some(&STRING_MANUFACTURER),
                    (3, 2) => Some(&STRING_PRODUCT),
                    _ => None,
                };
                match desc {
                    Some(desc) => send_control(dp, desc, setup.length),
                    None => stall(dp),
                }
            }

            // SET_ADDRESS: status stage first, then enable the address
            (0x00, 0x05) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(desc_index & 0x7F).adden().set_bit());
            }

            // SET_CONFIGURATION
            (0x00, 0x09) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                self.configure_ep1(dp);
                self.configured = true;
            }

            // GET_CONFIGURATION
            (0x80, 0x08) => {
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.uedatx.write(|w| w.bits(self.configured as u8));
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // HID report descriptor
            (0x81, 0x06) if desc_type == 0x22 => {
                send_control(dp, HID_REPORT_DESCRIPTOR, setup.length);
            }

            // HID SET_IDLE, SET_PROTOCOL: accept and ignore
            (0x21, 0x0A) | (0x21, 0x0B) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // Vendor request from the flasher
            (0x40, 0xFF) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                jump_to_bootloader(dp);
            }

            _ => stall(dp),
        }
    }
}

fn select_endpoint(dp: &Peripherals, ep: u8) {
    dp.USB_DEVICE.uenum.write(|w| w.bits(ep & 0x07));
}

/// IN data stage on EP0, split into EP0-sized packets, then wait for the
/// host's status ZLP.
fn send_control(dp: &Peripherals, data: &[u8], max_length: u16) {
    let usb = &dp.USB_DEVICE;
    let len = core::cmp::min(data.len(), max_length as usize);

    for chunk in data[..len].chunks(EP0_SIZE as usize) {
        while usb.ueintx.read().txini().bit_is_clear() {}
        for &byte in chunk {
            usb.uedatx.write(|w| w.bits(byte));
        }
        usb.ueintx.modify(|_, w| w.txini().clear_bit());
    }

    while usb.ueintx.read().rxouti().bit_is_clear() {}
    usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
}

fn stall(dp: &Peripherals) {
    dp.USB_DEVICE.ueconx.modify(|_, w| w.stallrq().set_bit());
}

/// Detach from the bus, quiesce peripherals and jump to the HalfKay
/// bootloader at 0x7E00.
fn jump_to_bootloader(dp: &Peripherals) -> ! {
    avr_device::interrupt::disable();

    dp.USB_DEVICE.udcon.write(|w| w.detach().set_bit());
    dp.USB_DEVICE.usbcon.write(|w| w.frzclk().set_bit());

    // Give the host time to see the disconnect.
    for _ in 0..20000u16 {
        unsafe { core::arch::asm!("nop") };
    }

    dp.EXINT.eimsk.write(|w| w.bits(0));
    dp.ADC.adcsra.write(|w| unsafe { w.bits(0) });
    dp.TC0.timsk0.write(|w| unsafe { w.bits(0) });
    dp.TC1.timsk1.write(|w| unsafe { w.bits(0) });
    dp.USART1.ucsr1b.write(|w| unsafe { w.bits(0) });

    // Matrix and LED pins back to reset state
    dp.PORTB.ddrb.write(|w| unsafe { w.bits(0) });
    dp.PORTB.portb.write(|w| unsafe { w.bits(0) });
    dp.PORTC.ddrc.write(|w| unsafe { w.bits(0) });
    dp.PORTC.portc.write(|w| unsafe { w.bits(0) });
    dp.PORTD.ddrd.write(|w| unsafe { w.bits(0) });
    dp.PORTD.portd.write(|w| unsafe { w.bits(0) });
    dp.PORTF.ddrf.write(|w| unsafe { w.bits(0) });
    dp.PORTF.portf.write(|w| unsafe { w.bits(0) });

    unsafe { core::arch::asm!("jmp 0x7E00", options(noreturn)) }
}

// ============================================================================
// Transport
// ============================================================================

/// The keypad's USB HID interface.
///
/// Holds the live keyboard report so modifiers pressed by one call stay held
/// until [`release_all`](HidTransport::release_all). The first failure is
/// latched until the dispatcher clears it.
pub struct HidKeypad<'a> {
    dp: &'a Peripherals,
    usb: UsbDevice,
    report: KeyboardReport,
    error: Option<TransportError>,
}

impl<'a> HidKeypad<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        Self {
            dp,
            usb: UsbDevice::new(),
            report: KeyboardReport::empty(),
            error: None,
        }
    }

    pub fn init(&mut self) {
        self.usb.init(self.dp);
    }

    /// Handle enumeration and control requests. Call from the main loop.
    pub fn poll(&mut self) {
        self.usb.poll(self.dp);
    }

    fn latch(&mut self, err: TransportError) -> bool {
        if self.error.is_none() {
            self.error = Some(err);
        }
        false
    }

    fn check(&mut self, result: Result<(), TransportError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => self.latch(err),
        }
    }

    fn flush_keyboard(&mut self) -> bool {
        let result = self.usb.send(self.dp, &self.report.to_bytes());
        self.check(result)
    }

    fn tap(&mut self, key: Keycode, shift: bool) -> bool {
        let held = self.report;
        let pressed = self.report.press(key).and_then(|()| {
            if shift {
                self.report.press(Keycode::LShift)
            } else {
                Ok(())
            }
        });
        if !self.check(pressed) {
            self.report = held;
            return false;
        }
        let down = self.flush_keyboard();
        self.report = held;
        let up = self.flush_keyboard();
        down && up
    }
}

impl HidTransport for HidKeypad<'_> {
    fn press_modifier(&mut self, key: Keycode) {
        let result = self.report.press(key);
        if self.check(result) {
            self.flush_keyboard();
        }
    }

    fn write_key(&mut self, key: Keycode) -> bool {
        self.tap(key, false)
    }

    fn release_all(&mut self) {
        self.report = KeyboardReport::empty();
        self.flush_keyboard();
    }

    fn write_consumer_code(&mut self, code: ConsumerCode) {
        let down = self.usb.send(self.dp, &consumer_report(code.usage()));
        if self.check(down) {
            let up = self.usb.send(self.dp, &consumer_report(0));
            self.check(up);
        }
    }

    fn write_char(&mut self, c: u8) -> bool {
        match KeyStroke::from_ascii(c) {
            Some(stroke) => self.tap(stroke.key, stroke.shift),
            None => self.latch(TransportError::Unmapped),
        }
    }

    fn last_error(&self) -> Option<TransportError> {
        self.error
    }

    fn clear_error(&mut self) {
        self.error = None;
    }
}
