//! GLONASS frequency slots
use log::{debug, warn};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::prelude::{Constellation, Error, SV};

/// Highest GLONASS satellite number
pub const MAX_GLONASS_NUMBER: u8 = 30;

/// Valid frequency slot range
pub const SLOT_RANGE: std::ops::RangeInclusive<i8> = -7..=6;

/// Frequency slot per GLONASS satellite number (1..=30).
/// An unknown slot is None.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrequencySlots {
    slots: [Option<i8>; MAX_GLONASS_NUMBER as usize],
}

impl FrequencySlots {
    /// Slot of satellite #number
    pub fn get(&self, number: u8) -> Option<i8> {
        let index = (number as usize).checked_sub(1)?;
        *self.slots.get(index)?
    }
    /// Slot of this satellite, None for other constellations
    pub fn get_for(&self, sv: SV) -> Option<i8> {
        if sv.constellation == Constellation::Glonass {
            self.get(sv.prn)
        } else {
            None
        }
    }
    /// Latch a slot, returns false when out of range
    pub fn set(&mut self, number: u8, slot: i8) -> bool {
        if !SLOT_RANGE.contains(&slot) {
            return false;
        }
        match (number as usize)
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index))
        {
            Some(entry) => {
                *entry = Some(slot);
                true
            },
            None => false,
        }
    }
    /// Fills the unknown slots from this table.
    /// Slots already known are preserved.
    pub fn fill_from(&mut self, table: &BTreeMap<u8, i8>) {
        for (number, slot) in table.iter() {
            if self.get(*number).is_none() && !self.set(*number, *slot) {
                warn!("R{:02}: invalid frequency slot {}", number, slot);
            }
        }
    }
    /// Number of known slots
    pub fn known(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
    /// Iterates (satellite number, slot) for numbers 1..=30
    pub fn iter(&self) -> impl Iterator<Item = (u8, Option<i8>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (index as u8 + 1, *slot))
    }
}

/// Extracts frequency slots from a GLONASS navigation file
#[derive(Debug, Default)]
pub struct FrequencySlotResolver {
    slots: FrequencySlots,
    /// Major RINEX revision
    major: u8,
    /// Satellite number of the block being read
    number: Option<u8>,
    /// Lines left before the slot line
    countdown: usize,
}

impl FrequencySlotResolver {
    /// Number of the satellite opening a record block,
    /// "R07 2022 03 04 ..." (V3) or " 7 22  3  4 ..." (V2).
    fn block_start(&self, line: &str) -> Option<u8> {
        if self.major >= 3 {
            let id = line.get(..3)?;
            if !id.starts_with('R') {
                return None;
            }
            u8::from_str(id.get(1..)?.trim()).ok()
        } else {
            let id = line.get(..2)?;
            if id.trim().is_empty() {
                return None;
            }
            u8::from_str(id.trim()).ok()
        }
    }

    /// Slot field of the third line of a block (4th broadcast orbit value)
    fn slot_field<'a>(&self, line: &'a str) -> Option<&'a str> {
        let range = if self.major >= 3 { 61..80 } else { 60..79 };
        let end = std::cmp::min(range.end, line.len());
        line.get(range.start..end).map(|s| s.trim())
    }

    fn parse_slot(content: &str) -> Option<i8> {
        let value = f64::from_str(&content.replace(['D', 'd'], "E")).ok()?;
        if !value.is_finite() || value.fract() != 0.0 {
            return None;
        }
        let slot = value as i8;
        if SLOT_RANGE.contains(&slot) {
            Some(slot)
        } else {
            None
        }
    }

    fn consume(&mut self, line: &str) {
        if let Some(number) = self.block_start(line) {
            self.number = Some(number);
            self.countdown = 2;
            return;
        }
        let Some(number) = self.number else {
            return;
        };
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return;
        }
        self.number = None;
        match self.slot_field(line).and_then(Self::parse_slot) {
            Some(slot) => {
                if !self.slots.set(number, slot) {
                    debug!("R{:02}: satellite number out of range", number);
                }
            },
            None => warn!("R{:02}: invalid frequency slot \"{}\"", number, line.trim_end()),
        }
    }

    /// Resolves the [FrequencySlots] described by these lines.
    /// A satellite that the file does not describe keeps an unknown slot.
    pub fn resolve<I>(lines: I) -> Result<FrequencySlots, Error>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        let mut resolver = Self {
            major: 3,
            ..Default::default()
        };
        let mut header = true;
        let mut first = true;

        for line in lines {
            let line = line?;
            if header {
                if first {
                    first = false;
                    if line.contains("RINEX VERSION / TYPE") {
                        let version = line.get(..9).unwrap_or("").trim();
                        let major = version.split('.').next().unwrap_or("");
                        resolver.major = u8::from_str(major.trim()).unwrap_or(3);
                    }
                }
                if line.contains("END OF HEADER") {
                    header = false;
                }
                continue;
            }
            resolver.consume(&line);
        }

        debug!("{} glonass frequency slot(s) resolved", resolver.slots.known());
        Ok(resolver.slots)
    }
}
