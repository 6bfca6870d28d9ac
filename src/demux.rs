//! Interleaved record stream to per satellite, grid aligned channels
use log::debug;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::grid::TimeGrid;
use crate::parser::MalformedInput;
use crate::prelude::{Constellation, Epoch, Error, SV};
use crate::record::{FieldLayout, Record};

/// Labels of each channel
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Labels depend on the constellation (RINEX observation types)
    PerConstellation(BTreeMap<Constellation, Vec<String>>),
    /// Same labels for every satellite (SP3 x, y, z, dt)
    Fixed(Vec<String>),
}

impl Schema {
    pub fn labels(&self, constellation: Constellation) -> Option<&[String]> {
        match self {
            Self::PerConstellation(map) => map.get(&constellation).map(|v| v.as_slice()),
            Self::Fixed(labels) => Some(labels.as_slice()),
        }
    }
}

/// Reads the satellite identifier at `offset`. Some files use a
/// blank instead of a leading zero ("G 1"), which is tolerated.
pub(crate) fn parse_sv(line: &str, offset: usize) -> Option<SV> {
    let id = line.get(offset..offset + 3)?;
    let constellation = Constellation::from_str(id.get(..1)?).ok()?;
    let number = id.get(1..)?.trim();
    let prn = u8::from_str(number).ok()?;
    Some(SV::new(constellation, prn))
}

/// Single pass demultiplexer.
///
/// Epoch markers move the demultiplexer along the [TimeGrid], data lines
/// are routed to their satellite channel. Whatever the satellite visibility
/// and the gaps of the stream, channel `k` holds exactly one row per grid
/// epoch elapsed so far: a satellite that did not report at one epoch
/// gets a [crate::record::MISSING] row there, a satellite first seen at
/// grid index `k` is backfilled with `k` of them.
#[derive(Debug)]
pub struct Demultiplexer<'a> {
    grid: &'a TimeGrid,
    schema: Schema,
    layout: FieldLayout,
    /// Position of the satellite identifier on data lines
    sv_offset: usize,
    /// Grid index of the epoch being processed
    current: Option<usize>,
    /// Data lines are dropped until the next valid epoch marker
    skipping: bool,
    channels: BTreeMap<SV, Record>,
}

impl<'a> Demultiplexer<'a> {
    pub fn new(grid: &'a TimeGrid, schema: Schema, layout: FieldLayout, sv_offset: usize) -> Self {
        Self {
            grid,
            schema,
            layout,
            sv_offset,
            current: None,
            skipping: false,
            channels: BTreeMap::new(),
        }
    }
    /// Pads every channel up to `len` rows. A channel that holds less rows
    /// than the epochs elapsed did not report at those epochs.
    fn pad(&mut self, len: usize) {
        for record in self.channels.values_mut() {
            let missing = len.saturating_sub(record.len());
            record.push_missing(missing);
        }
    }
    /// Opens a new epoch. On error, the data lines that follow are dropped,
    /// until the next marker, and the current channels are left untouched.
    pub fn epoch(&mut self, t: Epoch) -> Result<usize, Error> {
        let index = match self.grid.index_of(t) {
            Some(index) => index,
            None => {
                self.skipping = true;
                return Err(Error::EpochNotOnGrid(t));
            },
        };
        if let Some(current) = self.current {
            if index <= current {
                self.skipping = true;
                return Err(Error::MalformedInput(MalformedInput::NonChronological(t)));
            }
            // laggards of the previous epoch
            self.pad(current + 1);
        }
        // epochs skipped by the stream
        self.pad(index);
        self.current = Some(index);
        self.skipping = false;
        Ok(index)
    }
    /// Routes one data line to its channel
    pub fn data(&mut self, line: &str) {
        if self.skipping {
            return;
        }
        let Some(current) = self.current else {
            return;
        };
        let Some(sv) = parse_sv(line, self.sv_offset) else {
            debug!("unidentified data line \"{}\"", line.trim_end());
            return;
        };
        let Some(labels) = self.schema.labels(sv.constellation) else {
            debug!("{}: no labels for this constellation", sv);
            return;
        };

        let capacity = self.grid.len();
        let record = self.channels.entry(sv).or_insert_with(|| {
            let mut record = Record::new(labels, capacity);
            record.push_missing(current);
            debug!("{}: new channel @{}", sv, current);
            record
        });

        if record.len() > current {
            debug!("{}: duplicate data line @{}", sv, current);
            return;
        }

        let values = self.layout.slice(sv, record.labels(), line);
        record.push_row(&values);
    }
    /// Current number of channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
    /// Closes the stream: every channel is padded to the grid length
    pub fn finish(mut self) -> BTreeMap<SV, Record> {
        self.pad(self.grid.len());
        self.channels
    }
}

#[cfg(test)]
mod test {
    use super::{parse_sv, Demultiplexer, Schema};
    use crate::grid::TimeGrid;
    use crate::prelude::{Constellation, Duration, Epoch, Error, SV};
    use crate::record::{is_missing, FieldLayout};
    use std::collections::BTreeMap;
    use std::str::FromStr;

    fn grid(n: usize) -> TimeGrid {
        let t0 = Epoch::from_str("2022-03-04T00:00:00 GPST").unwrap();
        let dt = Duration::from_seconds(30.0);
        TimeGrid::new(t0, t0 + dt * (n as f64 - 1.0), dt)
    }

    fn schema() -> Schema {
        let mut map = BTreeMap::new();
        map.insert(
            Constellation::GPS,
            vec!["C1C".to_string(), "S1C".to_string()],
        );
        map.insert(Constellation::Glonass, vec!["C1C".to_string()]);
        Schema::PerConstellation(map)
    }

    fn line(sv: &str, c1c: f64, s1c: f64) -> String {
        format!("{}{:>14.3}  {:>14.3}  ", sv, c1c, s1c)
    }

    #[test]
    fn sv_identifiers() {
        assert_eq!(parse_sv("G01  2024", 0), SV::from_str("G01").ok());
        assert_eq!(parse_sv("R 7  2024", 0), SV::from_str("R07").ok());
        assert_eq!(parse_sv("PE12 -1234", 1), SV::from_str("E12").ok());
        assert_eq!(parse_sv("X01", 0), None);
        assert_eq!(parse_sv("G", 0), None);
    }

    #[test]
    fn missing_epoch_and_late_satellite() {
        let grid = grid(4);
        let t = grid.epochs().to_vec();
        let mut demux = Demultiplexer::new(&grid, schema(), FieldLayout::RINEX_OBS, 0);

        demux.epoch(t[0]).unwrap();
        demux.data(&line("G01", 1.0, 10.0));
        // t[1], t[2] missing from the stream
        demux.epoch(t[3]).unwrap();
        demux.data(&line("G01", 4.0, 40.0));
        demux.data(&line("R02", 5.0, 50.0));

        let channels = demux.finish();
        let g01 = channels.get(&SV::from_str("G01").unwrap()).unwrap();
        let c1c = g01.get("C1C").unwrap();
        assert_eq!(c1c.len(), 4);
        assert_eq!(c1c[0], 1.0);
        assert!(is_missing(c1c[1]));
        assert!(is_missing(c1c[2]));
        assert_eq!(c1c[3], 4.0);

        let r02 = channels.get(&SV::from_str("R02").unwrap()).unwrap();
        assert_eq!(r02.labels(), &["C1C"]);
        let c1c = r02.get("C1C").unwrap();
        assert_eq!(c1c.len(), 4);
        assert!(c1c[..3].iter().all(|v| is_missing(*v)));
        assert_eq!(c1c[3], 5.0);
    }

    #[test]
    fn laggards_and_trailing_epochs() {
        let grid = grid(5);
        let t = grid.epochs().to_vec();
        let mut demux = Demultiplexer::new(&grid, schema(), FieldLayout::RINEX_OBS, 0);

        demux.epoch(t[0]).unwrap();
        demux.data(&line("G01", 1.0, 10.0));
        demux.data(&line("G02", 2.0, 20.0));
        demux.epoch(t[1]).unwrap();
        demux.data(&line("G02", 3.0, 30.0));
        demux.epoch(t[2]).unwrap();
        demux.data(&line("G01", 5.0, 50.0));
        assert_eq!(demux.len(), 2);

        let channels = demux.finish();
        for record in channels.values() {
            assert_eq!(record.len(), 5);
        }
        let g01 = channels.get(&SV::from_str("G01").unwrap()).unwrap();
        let s1c = g01.get("S1C").unwrap();
        assert_eq!(s1c[0], 10.0);
        assert!(is_missing(s1c[1]));
        assert_eq!(s1c[2], 50.0);
        assert!(is_missing(s1c[3]) && is_missing(s1c[4]));

        let g02 = channels.get(&SV::from_str("G02").unwrap()).unwrap();
        let s1c = g02.get("S1C").unwrap();
        assert_eq!(&s1c[..2], &[20.0, 30.0]);
        assert!(s1c[2..].iter().all(|v| is_missing(*v)));
    }

    #[test]
    fn off_grid_epoch_is_skipped() {
        let grid = grid(3);
        let t = grid.epochs().to_vec();
        let mut demux = Demultiplexer::new(&grid, schema(), FieldLayout::RINEX_OBS, 0);

        demux.epoch(t[0]).unwrap();
        demux.data(&line("G01", 1.0, 10.0));

        let off_grid = t[0] + Duration::from_seconds(15.0);
        match demux.epoch(off_grid) {
            Err(Error::EpochNotOnGrid(e)) => assert_eq!(e, off_grid),
            other => panic!("unexpected result {:?}", other),
        }
        demux.data(&line("G01", 99.0, 99.0));
        demux.data(&line("G03", 99.0, 99.0));
        // duplicated epoch is dropped as well
        assert!(demux.epoch(t[0]).is_err());
        demux.data(&line("G01", 99.0, 99.0));

        demux.epoch(t[2]).unwrap();
        demux.data(&line("G01", 3.0, 30.0));

        let channels = demux.finish();
        assert_eq!(channels.len(), 1, "G03 belongs to a dropped epoch");
        let c1c = channels
            .get(&SV::from_str("G01").unwrap())
            .unwrap()
            .get("C1C")
            .unwrap();
        assert_eq!(c1c[0], 1.0);
        assert!(is_missing(c1c[1]));
        assert_eq!(c1c[2], 3.0);
    }

    #[test]
    fn duplicate_and_unknown_lines() {
        let grid = grid(3);
        let t = grid.epochs().to_vec();
        let mut demux = Demultiplexer::new(&grid, schema(), FieldLayout::RINEX_OBS, 0);

        // data before any epoch marker
        demux.data(&line("G01", 0.0, 0.0));
        demux.epoch(t[0]).unwrap();
        demux.data(&line("G01", 1.0, 10.0));
        demux.data(&line("G01", 2.0, 20.0));
        demux.data(&line("E05", 3.0, 30.0));
        demux.data("");

        let channels = demux.finish();
        assert_eq!(channels.len(), 1);
        let c1c = channels
            .get(&SV::from_str("G01").unwrap())
            .unwrap()
            .get("C1C")
            .unwrap();
        assert_eq!(c1c.len(), 3);
        assert_eq!(c1c[0], 1.0);
    }

    #[test]
    fn idempotent() {
        let grid = grid(6);
        let t = grid.epochs().to_vec();
        let run = || {
            let mut demux = Demultiplexer::new(&grid, schema(), FieldLayout::RINEX_OBS, 0);
            for (i, t) in t.iter().enumerate() {
                if i == 2 {
                    continue;
                }
                demux.epoch(*t).unwrap();
                demux.data(&line("G01", i as f64, 1.0));
                if i % 2 == 0 {
                    demux.data(&line("R03", i as f64, 2.0));
                }
            }
            demux.finish()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.len(), b.len());
        for (sv, record) in a.iter() {
            let other = b.get(sv).unwrap();
            for ((la, ca), (lb, cb)) in record.iter().zip(other.iter()) {
                assert_eq!(la, lb);
                for (va, vb) in ca.iter().zip(cb.iter()) {
                    assert!(va == vb || (is_missing(*va) && is_missing(*vb)));
                }
            }
        }
    }
}
