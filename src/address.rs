//! KNX address packing, parsing, and range expansion.
//!
//! Individual addresses (`area.line.device`) and group addresses (`a/b[/c]`)
//! both pack into the same 16-bit integer; only the textual rendering and
//! the validated ranges differ.

use std::fmt;
use std::str::FromStr;

use crate::error::AddressParseError;

/// A 16-bit KNX individual address, `area.line.device`.
///
/// Invariants: `area` in `1..=15`, `line` in `0..=15`, `device` in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KnxAddress {
    pub area: u8,
    pub line: u8,
    pub device: u8,
}

impl KnxAddress {
    pub fn new(area: u8, line: u8, device: u8) -> Option<Self> {
        if (1..=15).contains(&area) && line <= 15 {
            Some(KnxAddress { area, line, device })
        } else {
            None
        }
    }

    /// Packs this address into its 16-bit wire representation.
    pub const fn pack(self) -> u16 {
        ((self.area as u16) << 12) | ((self.line as u16) << 8) | self.device as u16
    }

    /// Parses a 16-bit wire value into an individual address. Every 16-bit
    /// value round-trips: `area` is masked to 4 bits, so `0` is a legal
    /// (if unusual) area on the wire; callers that need the stricter
    /// `1..=15` CLI-facing validation should use `new`/`FromStr` instead.
    pub const fn parse(value: u16) -> Self {
        KnxAddress {
            area: ((value >> 12) & 0xf) as u8,
            line: ((value >> 8) & 0xf) as u8,
            device: (value & 0xff) as u8,
        }
    }
}

impl fmt::Display for KnxAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area, self.line, self.device)
    }
}

impl FromStr for KnxAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(AddressParseError::WrongSegmentCount(parts.len()));
        }
        let mut nums = [0u8; 3];
        for (i, p) in parts.iter().enumerate() {
            nums[i] = p
                .parse::<u16>()
                .ok()
                .filter(|&v| v <= 255)
                .map(|v| v as u8)
                .ok_or_else(|| AddressParseError::InvalidSegment((*p).to_string()))?;
        }
        KnxAddress::new(nums[0], nums[1], nums[2])
            .ok_or(AddressParseError::OutOfRange(nums[0], nums[1], nums[2]))
    }
}

/// A KNX group address, either two-level (`main/sub`) or three-level
/// (`main/middle/sub`). Packs into the same 16-bit space as individual
/// addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupAddress {
    TwoLevel { main: u8, sub: u16 },
    ThreeLevel { main: u8, middle: u8, sub: u8 },
}

impl GroupAddress {
    pub fn new_three_level(main: u8, middle: u8, sub: u8) -> Option<Self> {
        if main <= 15 && middle <= 15 {
            Some(GroupAddress::ThreeLevel { main, middle, sub })
        } else {
            None
        }
    }

    pub fn new_two_level(main: u8, sub: u16) -> Option<Self> {
        if main <= 15 && sub <= 0x7ff {
            Some(GroupAddress::TwoLevel { main, sub })
        } else {
            None
        }
    }

    pub const fn pack(self) -> u16 {
        match self {
            GroupAddress::ThreeLevel { main, middle, sub } => {
                ((main as u16) << 12) | ((middle as u16) << 8) | sub as u16
            }
            GroupAddress::TwoLevel { main, sub } => ((main as u16) << 12) | sub,
        }
    }

    /// Parses a wire value as a three-level group address, the most common
    /// rendering used for display.
    pub const fn parse_three_level(value: u16) -> Self {
        GroupAddress::ThreeLevel {
            main: ((value >> 12) & 0xf) as u8,
            middle: ((value >> 8) & 0xf) as u8,
            sub: (value & 0xff) as u8,
        }
    }
}

impl fmt::Display for GroupAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            GroupAddress::ThreeLevel { main, middle, sub } => write!(f, "{main}/{middle}/{sub}"),
            GroupAddress::TwoLevel { main, sub } => write!(f, "{main}/{sub}"),
        }
    }
}

/// Expands a bus target range specification `A.L.D-A.L.D2` into an ordered,
/// inclusive list of `KnxAddress`. A single address with no dash is a
/// one-element range.
pub fn expand_range(spec: &str) -> Result<Vec<KnxAddress>, AddressParseError> {
    let spec = spec.trim();
    if let Some((from, to)) = spec.split_once('-') {
        let from: KnxAddress = from.trim().parse()?;
        let to: KnxAddress = to.trim().parse()?;
        let (f, t) = (from.pack(), to.pack());
        if t < f {
            return Err(AddressParseError::DescendingRange { from, to });
        }
        Ok((f..=t).map(KnxAddress::parse).collect())
    } else {
        Ok(vec![spec.parse()?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_parse_roundtrip_all_values() {
        for v in 0..=u16::MAX {
            let a = KnxAddress::parse(v);
            assert_eq!(a.pack(), v);
        }
    }

    #[test]
    fn display_format() {
        let a = KnxAddress::new(1, 1, 2).unwrap();
        assert_eq!(a.to_string(), "1.1.2");
    }

    #[test]
    fn parse_from_str() {
        let a: KnxAddress = "1.1.2".parse().unwrap();
        assert_eq!(a, KnxAddress::new(1, 1, 2).unwrap());
    }

    #[test]
    fn rejects_out_of_range_area() {
        assert!(KnxAddress::new(0, 0, 0).is_none());
        assert!(KnxAddress::new(16, 0, 0).is_none());
    }

    #[test]
    fn from_str_reports_wrong_segment_count() {
        assert_eq!(
            "1.1".parse::<KnxAddress>(),
            Err(AddressParseError::WrongSegmentCount(2))
        );
    }

    #[test]
    fn from_str_reports_invalid_segment() {
        assert_eq!(
            "1.x.2".parse::<KnxAddress>(),
            Err(AddressParseError::InvalidSegment("x".to_string()))
        );
    }

    #[test]
    fn expand_range_rejects_descending_range() {
        let from = KnxAddress::new(1, 1, 5).unwrap();
        let to = KnxAddress::new(1, 1, 1).unwrap();
        assert_eq!(
            expand_range("1.1.5-1.1.1"),
            Err(AddressParseError::DescendingRange { from, to })
        );
    }

    #[test]
    fn range_expansion_ascending() {
        let r = expand_range("1.1.1-1.1.3").unwrap();
        assert_eq!(
            r,
            vec![
                KnxAddress::new(1, 1, 1).unwrap(),
                KnxAddress::new(1, 1, 2).unwrap(),
                KnxAddress::new(1, 1, 3).unwrap(),
            ]
        );
    }

    #[test]
    fn range_expansion_count_matches_pack_delta() {
        let from: KnxAddress = "2.3.10".parse().unwrap();
        let to: KnxAddress = "2.5.20".parse().unwrap();
        let r = expand_range("2.3.10-2.5.20").unwrap();
        assert_eq!(r.len(), (to.pack() - from.pack() + 1) as usize);
    }

    #[test]
    fn single_address_range() {
        let r = expand_range("1.1.1").unwrap();
        assert_eq!(r, vec![KnxAddress::new(1, 1, 1).unwrap()]);
    }

    #[test]
    fn group_address_display() {
        let g = GroupAddress::new_three_level(1, 2, 3).unwrap();
        assert_eq!(g.to_string(), "1/2/3");
    }
}
