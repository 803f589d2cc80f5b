//! Flashing over the Teensy HalfKay bootloader, and kicking a running keypad
//! into it.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rusb::{Device, DeviceHandle, GlobalContext};

use crate::hex::Image;

/// HalfKay bootloader USB identifiers.
const HALFKAY_VID: u16 = 0x16C0;
const HALFKAY_PID: u16 = 0x0478;

/// The running keypad firmware.
const KEYPAD_VID: u16 = 0x16C0;
const KEYPAD_PID: u16 = 0x047F;

/// Vendor request the firmware answers by jumping to the bootloader.
const REQUEST_BOOTLOADER: u8 = 0xFF;

/// ATmega32U4 flash page size in bytes.
const PAGE_SIZE: usize = 128;

/// Application flash ends where HalfKay begins.
const APP_FLASH_END: u32 = 0x7E00;

const USB_TIMEOUT: Duration = Duration::from_secs(2);

/// Time for the part to program one page.
const PAGE_WRITE_DELAY: Duration = Duration::from_millis(5);

fn find(vid: u16, pid: u16) -> Result<Option<Device<GlobalContext>>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// Whether a board in HalfKay mode is on the bus.
pub fn detect() -> Result<bool> {
    Ok(find(HALFKAY_VID, HALFKAY_PID)?.is_some())
}

/// Ask a running keypad to jump to its bootloader. Returns `false` if no
/// keypad is connected.
pub fn reboot_keypad() -> Result<bool> {
    let Some(device) = find(KEYPAD_VID, KEYPAD_PID)? else {
        return Ok(false);
    };
    let handle = device
        .open()
        .context("failed to open keypad (may need root/sudo or udev rules)")?;
    // The device drops off the bus mid-transfer, so the result is meaningless.
    let _ = handle.write_control(0x40, REQUEST_BOOTLOADER, 0, 0, &[], USB_TIMEOUT);
    Ok(true)
}

/// Poll for the bootloader to enumerate.
pub fn wait_for_bootloader(timeout: Duration) -> Result<bool> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if detect()? {
            return Ok(true);
        }
        thread::sleep(Duration::from_millis(100));
    }
    Ok(false)
}

/// Split an image into page-aligned pages. Bytes outside the image are
/// 0xFF, and pages that are entirely 0xFF are dropped.
fn pages(image: &Image) -> Vec<(u32, Vec<u8>)> {
    let page = PAGE_SIZE as u32;
    let first = image.base - image.base % page;

    (first..image.end())
        .step_by(PAGE_SIZE)
        .filter_map(|address| {
            let buf: Vec<u8> = (address..address + page)
                .map(|a| {
                    a.checked_sub(image.base)
                        .and_then(|off| image.data.get(off as usize))
                        .copied()
                        .unwrap_or(0xFF)
                })
                .collect();
            (!buf.iter().all(|&b| b == 0xFF)).then_some((address, buf))
        })
        .collect()
}

pub struct Bootloader {
    handle: DeviceHandle<GlobalContext>,
}

impl Bootloader {
    pub fn open() -> Result<Self> {
        let Some(device) = find(HALFKAY_VID, HALFKAY_PID)? else {
            bail!("HalfKay bootloader not found. Press the reset button and try again.");
        };
        let handle = device
            .open()
            .context("failed to open bootloader (may need root/sudo or udev rules)")?;
        Ok(Self { handle })
    }

    /// Write every non-blank page of `image`, then reboot into it.
    pub fn flash(&self, image: &Image) -> Result<()> {
        if image.end() > APP_FLASH_END {
            bail!(
                "firmware too large: ends at 0x{:04X}, bootloader starts at 0x{:04X}",
                image.end(),
                APP_FLASH_END
            );
        }

        let pages = pages(image);
        debug!("{} pages to write", pages.len());

        let pb = ProgressBar::new(pages.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} pages")
                .context("bad progress template")?
                .progress_chars("=> "),
        );
        pb.set_message("Flashing");

        for (address, data) in &pages {
            self.write_page(*address, data)
                .with_context(|| format!("failed to write page at 0x{:04X}", address))?;
            thread::sleep(PAGE_WRITE_DELAY);
            pb.inc(1);
        }
        pb.finish_with_message("Flashed");

        self.reboot();
        info!("Rebooted into new firmware");
        Ok(())
    }

    /// HalfKay takes a HID SET_REPORT of a little-endian address followed by
    /// one page of data.
    fn write_page(&self, address: u32, data: &[u8]) -> Result<()> {
        let mut buf = Vec::with_capacity(2 + PAGE_SIZE);
        buf.extend_from_slice(&(address as u16).to_le_bytes());
        buf.extend_from_slice(data);
        self.handle
            .write_control(0x21, 0x09, 0x0200, 0, &buf, USB_TIMEOUT)
            .context("USB control transfer failed")?;
        Ok(())
    }

    /// Address 0xFFFF tells HalfKay to start the application.
    fn reboot(&self) {
        let mut buf = vec![0u8; 2 + PAGE_SIZE];
        buf[0] = 0xFF;
        buf[1] = 0xFF;
        // The device disconnects immediately.
        let _ = self
            .handle
            .write_control(0x21, 0x09, 0x0200, 0, &buf, USB_TIMEOUT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_aligned_and_padded() {
        let image = Image {
            base: 0x100 + 4,
            data: vec![0x11; 200],
        };
        let pages = pages(&image);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].0, 0x100);
        assert_eq!(pages[1].0, 0x180);
        assert!(pages.iter().all(|(_, p)| p.len() == PAGE_SIZE));
        assert_eq!(&pages[0].1[..4], &[0xFF; 4]);
        assert_eq!(pages[0].1[4], 0x11);
        // 4 + 200 = 204 bytes used, 76 in the second page
        assert_eq!(pages[1].1[75], 0x11);
        assert_eq!(pages[1].1[76], 0xFF);
    }

    #[test]
    fn test_blank_pages_skipped() {
        let mut data = vec![0xFF; PAGE_SIZE * 3];
        data[PAGE_SIZE * 2] = 0x00;
        let image = Image { base: 0, data };
        let pages = pages(&image);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].0, (PAGE_SIZE * 2) as u32);
    }
}
