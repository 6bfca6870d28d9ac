//! SP3 orbits, aligned to the observation grid
use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::{
    cfg::Config,
    demux::{Demultiplexer, Schema},
    epoch::{is_sp3_epoch, parse_sp3_epoch, timescale_from_code},
    grid::TimeGrid,
    interp::{self, Method},
    prelude::{Error, TimeScale, SV},
    record::{FieldLayout, Record, MISSING},
};

/// Ephemeris labels: position (km) and clock offset (us)
pub const EPHEMERIS_LABELS: [&str; 4] = ["x", "y", "z", "dt"];

/// SP3 encodes an unknown clock offset as 999999.999999
const UNKNOWN_CLOCK: f64 = 999999.0;

/// Aligns SP3 records to a [TimeGrid] built from the observations
#[derive(Debug)]
pub struct EphemerisAligner<'a> {
    grid: &'a TimeGrid,
    timescale: TimeScale,
    method: Method,
}

impl<'a> EphemerisAligner<'a> {
    pub fn new(grid: &'a TimeGrid, cfg: &Config) -> Self {
        Self {
            grid,
            timescale: cfg.timescale,
            method: cfg.interpolation,
        }
    }

    /// SP3 unknown values to [MISSING]: exact zero position triplets,
    /// and the 999999.999999 clock marker.
    fn unknown_values(record: &mut Record) {
        let zeros = match (record.get("x"), record.get("y"), record.get("z")) {
            (Some(x), Some(y), Some(z)) => (0..x.len())
                .filter(|i| x[*i] == 0.0 && y[*i] == 0.0 && z[*i] == 0.0)
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        };
        for (label, column) in record.columns_mut() {
            if label == "dt" {
                column
                    .iter_mut()
                    .filter(|dt| **dt >= UNKNOWN_CLOCK)
                    .for_each(|dt| *dt = MISSING);
            } else {
                for i in zeros.iter() {
                    column[*i] = MISSING;
                }
            }
        }
    }

    /// Demultiplexes an SP3 stream. Epochs absent from the grid are dropped.
    pub fn align<I>(&self, lines: I) -> Result<BTreeMap<SV, Record>, Error>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        let labels = EPHEMERIS_LABELS
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>();
        let mut demux = Demultiplexer::new(
            self.grid,
            Schema::Fixed(labels),
            FieldLayout::SP3_POSITION,
            1,
        );

        let mut timescale = None;
        let mut dropped = 0;
        for line in lines {
            let line = line?;
            if is_sp3_epoch(&line) {
                let ts = timescale.unwrap_or(self.timescale);
                let t = parse_sp3_epoch(&line, ts)?;
                match demux.epoch(t) {
                    Ok(_) => {},
                    Err(Error::EpochNotOnGrid(_)) => dropped += 1,
                    Err(e) => warn!("{}", e),
                }
            } else if line.starts_with('P') {
                demux.data(&line);
            } else if line.starts_with("%c") && timescale.is_none() {
                timescale = line.get(9..12).and_then(timescale_from_code);
            }
        }
        if dropped > 0 {
            // orbits are usually sampled outside of the observation period
            debug!("{} orbit epoch(s) not on the time grid", dropped);
        }

        let mut records = demux.finish();
        for record in records.values_mut() {
            Self::unknown_values(record);
        }
        info!("{} orbit(s) aligned", records.len());
        Ok(records)
    }

    /// Interpolates every field of every record over the grid
    pub fn interpolate(&self, records: &mut BTreeMap<SV, Record>) {
        let epochs = self.grid.epochs();
        for (sv, record) in records.iter_mut() {
            for (label, column) in record.columns_mut() {
                if !interp::fill(self.method, epochs, column) {
                    debug!("{}({}): not enough samples to interpolate", sv, label);
                }
            }
        }
    }
}
