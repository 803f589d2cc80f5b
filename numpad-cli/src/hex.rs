//! Intel HEX loading.

use std::collections::BTreeMap;

use anyhow::{bail, ensure, Context, Result};

/// Largest address span accepted for one image. Far above any AVR part.
const MAX_SPAN: u32 = 0x10_0000;

#[derive(Debug, PartialEq, Eq)]
enum Record {
    Data { offset: u16, bytes: Vec<u8> },
    EndOfFile,
    /// Type 02: base = value << 4
    ExtendedSegment(u16),
    /// Type 04: base = value << 16
    ExtendedLinear(u16),
    /// Types 03 and 05 carry an entry point, which the bootloader ignores.
    StartAddress,
}

impl Record {
    fn parse(line: &str) -> Result<Record> {
        let body = line.strip_prefix(':').context("missing start code ':'")?;
        ensure!(body.is_ascii(), "non-ASCII characters in record");
        ensure!(body.len() % 2 == 0, "odd number of hex digits");

        let raw = (0..body.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&body[i..i + 2], 16)
                    .with_context(|| format!("invalid hex digits at column {}", i + 2))
            })
            .collect::<Result<Vec<u8>>>()?;

        ensure!(raw.len() >= 5, "record too short");
        let count = raw[0] as usize;
        ensure!(
            raw.len() == count + 5,
            "length byte says {} data bytes, record has {}",
            count,
            raw.len() - 5
        );
        let sum = raw.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        ensure!(sum == 0, "checksum mismatch");

        let offset = u16::from_be_bytes([raw[1], raw[2]]);
        let data = &raw[4..4 + count];
        let word = || -> Result<u16> {
            ensure!(count == 2, "address record must carry 2 bytes");
            Ok(u16::from_be_bytes([data[0], data[1]]))
        };

        Ok(match raw[3] {
            0x00 => Record::Data {
                offset,
                bytes: data.to_vec(),
            },
            0x01 => Record::EndOfFile,
            0x02 => Record::ExtendedSegment(word()?),
            0x03 | 0x05 => Record::StartAddress,
            0x04 => Record::ExtendedLinear(word()?),
            other => bail!("unsupported record type 0x{:02X}", other),
        })
    }
}

/// A contiguous firmware image. Gaps between records are filled with 0xFF
/// (erased flash).
#[derive(Debug)]
pub struct Image {
    pub base: u32,
    pub data: Vec<u8>,
}

impl Image {
    pub fn from_hex(input: &str) -> Result<Image> {
        let mut bytes: BTreeMap<u32, u8> = BTreeMap::new();
        let mut base: u32 = 0;
        let mut terminated = false;

        for (n, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = Record::parse(line).with_context(|| format!("line {}", n + 1))?;
            match record {
                Record::Data { offset, bytes: data } => {
                    for (i, b) in data.into_iter().enumerate() {
                        let Some(address) = base
                            .checked_add(offset as u32)
                            .and_then(|a| a.checked_add(i as u32))
                        else {
                            bail!("line {}: address overflows 32 bits", n + 1);
                        };
                        if bytes.insert(address, b).is_some() {
                            bail!("line {}: data overlaps at 0x{:04X}", n + 1, address);
                        }
                    }
                }
                Record::EndOfFile => {
                    terminated = true;
                    break;
                }
                Record::ExtendedSegment(v) => base = (v as u32) << 4,
                Record::ExtendedLinear(v) => base = (v as u32) << 16,
                Record::StartAddress => {}
            }
        }

        ensure!(terminated, "missing end-of-file record");
        let (Some((&first, _)), Some((&last, _))) =
            (bytes.first_key_value(), bytes.last_key_value())
        else {
            bail!("no data records in HEX file");
        };
        ensure!(
            last - first < MAX_SPAN,
            "image spans 0x{:X}..0x{:X}, too large",
            first,
            last
        );

        let mut data = vec![0xFFu8; (last - first + 1) as usize];
        for (address, b) in bytes {
            data[(address - first) as usize] = b;
        }
        Ok(Image { base: first, data })
    }

    /// One past the last byte.
    pub fn end(&self) -> u32 {
        self.base + self.data.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_hex() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F78\n\
                   :00000001FF\n";
        let image = Image::from_hex(hex).unwrap();
        assert_eq!(image.base, 0);
        assert_eq!(image.data, (0u8..16).collect::<Vec<_>>());
        assert_eq!(image.end(), 16);
    }

    #[test]
    fn test_extended_segment_address() {
        let hex = ":020000020100FB\n\
                   :10000000112233445566778899AABBCCDDEEFF00F8\n\
                   :00000001FF\n";
        let image = Image::from_hex(hex).unwrap();
        assert_eq!(image.base, 0x1000);
    }

    #[test]
    fn test_extended_linear_address() {
        let hex = ":020000040001F9\n\
                   :0100000011EE\n\
                   :00000001FF\n";
        let image = Image::from_hex(hex).unwrap();
        assert_eq!(image.base, 0x1_0000);
        assert_eq!(image.data, vec![0x11]);
    }

    #[test]
    fn test_gap_filled_with_erased_bytes() {
        let hex = ":04000000AABBCCDDEE\n\
                   :0100080011E6\n\
                   :00000001FF\n";
        let image = Image::from_hex(hex).unwrap();
        assert_eq!(
            image.data,
            vec![0xAA, 0xBB, 0xCC, 0xDD, 0xFF, 0xFF, 0xFF, 0xFF, 0x11]
        );
    }

    #[test]
    fn test_contiguous_records_merge() {
        let hex = ":04000000AABBCCDDEE\n\
                   :04000400112233444E\n\
                   :00000001FF\n";
        let image = Image::from_hex(hex).unwrap();
        assert_eq!(image.data, vec![0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_checksum_error_names_line() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F00\n\
                   :00000001FF\n";
        let err = Image::from_hex(hex).unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));
        assert!(format!("{:#}", err).contains("checksum"));
    }

    #[test]
    fn test_overlap_rejected() {
        let hex = ":0100000011EE\n\
                   :0100000011EE\n\
                   :00000001FF\n";
        assert!(Image::from_hex(hex).is_err());
    }

    #[test]
    fn test_address_overflow_rejected() {
        let hex = ":02000004FFFFFC\n\
                   :02FFFF00AABB9B\n\
                   :00000001FF\n";
        let err = Image::from_hex(hex).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
        assert!(format!("{:#}", err).contains("overflows"));
    }

    #[test]
    fn test_missing_eof_rejected() {
        assert!(Image::from_hex(":0100000011EE\n").is_err());
    }

    #[test]
    fn test_start_address_ignored() {
        let hex = ":0100000011EE\n\
                   :0400000300007E007B\n\
                   :00000001FF\n";
        assert_eq!(Image::from_hex(hex).unwrap().data, vec![0x11]);
    }

    #[test]
    fn test_empty_file_rejected() {
        assert!(Image::from_hex(":00000001FF\n").is_err());
    }
}
