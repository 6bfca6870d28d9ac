//! Epoch markers (RINEX v3 observation & SP3)
use std::str::FromStr;

use crate::parser::MalformedInput;
use crate::prelude::{Epoch, TimeScale};

/// Returns true if this RINEX v3 line opens a new epoch
pub(crate) fn is_rinex_epoch(line: &str) -> bool {
    line.starts_with('>')
}

/// Returns true if this SP3 line opens a new epoch
pub(crate) fn is_sp3_epoch(line: &str) -> bool {
    line.starts_with('*')
}

/// RINEX epoch flag
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum EpochFlag {
    /// Epoch is sane
    #[default]
    Ok,
    /// Power failure since previous epoch
    PowerFailure,
    /// Antenna is being moved
    AntennaBeingMoved,
    /// New site occupation (kinematic)
    NewSiteOccupation,
    /// Header information follows
    HeaderInformationFollows,
    /// External event
    ExternalEvent,
    /// Cycle slip records follow
    CycleSlip,
}

impl EpochFlag {
    /// True when the following records are satellite observations.
    /// Event flags introduce special records instead.
    pub fn is_observation(&self) -> bool {
        matches!(self, Self::Ok | Self::PowerFailure | Self::CycleSlip)
    }
}

impl std::str::FromStr for EpochFlag {
    type Err = MalformedInput;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::Ok),
            "1" => Ok(Self::PowerFailure),
            "2" => Ok(Self::AntennaBeingMoved),
            "3" => Ok(Self::NewSiteOccupation),
            "4" => Ok(Self::HeaderInformationFollows),
            "5" => Ok(Self::ExternalEvent),
            "6" => Ok(Self::CycleSlip),
            _ => Err(MalformedInput::EpochFlag(s.to_string())),
        }
    }
}

/// Parsed RINEX v3 epoch marker
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct EpochMarker {
    pub epoch: Epoch,
    pub flag: EpochFlag,
    /// Number of records that follow: satellites, or special records for events
    pub count: usize,
}

/// Maps a RINEX/SP3 time system code to [TimeScale]
pub(crate) fn timescale_from_code(code: &str) -> Option<TimeScale> {
    match code.trim() {
        "GPS" | "GPST" => Some(TimeScale::GPST),
        "GAL" | "GST" => Some(TimeScale::GST),
        "BDT" | "BDS" => Some(TimeScale::BDT),
        "UTC" | "GLO" => Some(TimeScale::UTC),
        "TAI" => Some(TimeScale::TAI),
        _ => None,
    }
}

/// Builds [Epoch] from "yyyy mm dd hh mm ss.sssssss" items
fn gregorian(items: &[&str], ts: TimeScale, content: &str) -> Result<Epoch, MalformedInput> {
    let err = || MalformedInput::EpochMarker(content.to_string());
    if items.len() < 6 {
        return Err(err());
    }
    let y = i32::from_str(items[0]).or(Err(err()))?;
    let m = u8::from_str(items[1]).or(Err(err()))?;
    let d = u8::from_str(items[2]).or(Err(err()))?;
    let hh = u8::from_str(items[3]).or(Err(err()))?;
    let mm = u8::from_str(items[4]).or(Err(err()))?;
    let secs = f64::from_str(items[5]).or(Err(err()))?;
    if !(0.0..61.0).contains(&secs) {
        return Err(err());
    }
    let ss = secs.trunc() as u8;
    let nanos = (secs.fract() * 1.0E9).round() as u32;
    Epoch::maybe_from_gregorian(y, m, d, hh, mm, ss, nanos, ts).or(Err(err()))
}

/// Parses a RINEX v3 epoch marker
/// "> 2022 03 04 00 00  0.0000000  0 30".
/// Flag (I1) and count (I3) are fixed width and may be contiguous.
pub(crate) fn parse_rinex_epoch(line: &str, ts: TimeScale) -> Result<EpochMarker, MalformedInput> {
    const FLAG: usize = 31;
    const COUNT: std::ops::Range<usize> = 32..35;

    let end = std::cmp::min(FLAG, line.len());
    let content = line
        .get(1..end)
        .ok_or(MalformedInput::EpochMarker(line.to_string()))?;
    let items = content.split_ascii_whitespace().collect::<Vec<_>>();
    let epoch = gregorian(&items, ts, line)?;

    let flag = match line.get(FLAG..FLAG + 1) {
        Some(flag) if !flag.trim().is_empty() => EpochFlag::from_str(flag)?,
        _ => EpochFlag::default(),
    };
    let count = line
        .get(COUNT.start..std::cmp::min(COUNT.end, line.len()))
        .and_then(|n| usize::from_str(n.trim()).ok())
        .unwrap_or(0);
    Ok(EpochMarker { epoch, flag, count })
}

/// Parses an SP3 epoch marker "*  2022  3  4  0  0  0.00000000"
pub(crate) fn parse_sp3_epoch(line: &str, ts: TimeScale) -> Result<Epoch, MalformedInput> {
    let content = line.get(1..).ok_or(MalformedInput::EpochMarker(line.to_string()))?;
    let items = content.split_ascii_whitespace().collect::<Vec<_>>();
    gregorian(&items, ts, line)
}
