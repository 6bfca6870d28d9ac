//! Demultiplexed dataset
use itertools::Itertools;
use log::debug;
use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::{
    grid::TimeGrid,
    prelude::{Constellation, Epoch, Error, SV},
    satellite::Satellite,
    slots::FrequencySlots,
};

/// Satellite selection. Every criterion must be met,
/// an empty criterion does not restrict the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    /// Constellations to retain
    pub gnss: Vec<Constellation>,
    /// PRNs to retain: frequency slots for GLONASS, satellite numbers otherwise
    pub prn: Vec<i32>,
    /// Satellite numbers to retain
    pub num: Vec<u8>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            gnss: vec![
                Constellation::GPS,
                Constellation::Glonass,
                Constellation::Galileo,
                Constellation::BeiDou,
            ],
            prn: Vec::new(),
            num: Vec::new(),
        }
    }
}

impl FilterOptions {
    pub fn with_constellations(&self, gnss: &[Constellation]) -> Self {
        let mut s = self.clone();
        s.gnss = gnss.to_vec();
        s
    }
    pub fn with_prns(&self, prn: &[i32]) -> Self {
        let mut s = self.clone();
        s.prn = prn.to_vec();
        s
    }
    pub fn with_numbers(&self, num: &[u8]) -> Self {
        let mut s = self.clone();
        s.num = num.to_vec();
        s
    }
    fn matches(&self, sat: &Satellite) -> bool {
        if !self.gnss.is_empty() && !self.gnss.contains(&sat.constellation()) {
            return false;
        }
        if !self.prn.is_empty() {
            match sat.prn() {
                Some(prn) if self.prn.contains(&prn) => {},
                _ => return false,
            }
        }
        self.num.is_empty() || self.num.contains(&sat.number())
    }
}

/// Values of one satellite at one grid epoch
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sv: SV,
    /// Observations, per label
    pub observations: BTreeMap<String, f64>,
    /// Position (km)
    pub position: Option<Vector3<f64>>,
    /// Clock offset (us)
    pub clock: Option<f64>,
}

/// Per satellite, time aligned series
#[derive(Debug, Clone)]
pub struct SatelliteDataStore {
    grid: TimeGrid,
    /// Every satellite, sorted by name
    sv_list_full: Vec<SV>,
    /// Selected satellites, sorted by name
    sv_list: Vec<SV>,
    satellites: BTreeMap<SV, Satellite>,
    slots: FrequencySlots,
}

impl SatelliteDataStore {
    /// Builds a new [SatelliteDataStore]. Every series must be aligned to the grid.
    pub fn new(
        grid: TimeGrid,
        satellites: Vec<Satellite>,
        slots: FrequencySlots,
    ) -> Result<Self, Error> {
        for sat in satellites.iter() {
            if sat.len() != grid.len() {
                return Err(Error::Artifact(format!(
                    "{}: {} samples but {} epochs",
                    sat.name(),
                    sat.len(),
                    grid.len()
                )));
            }
            if let Some(eph) = sat.ephemeris() {
                if eph.len() != grid.len() {
                    return Err(Error::Artifact(format!(
                        "{}: {} orbit samples but {} epochs",
                        sat.name(),
                        eph.len(),
                        grid.len()
                    )));
                }
            }
        }
        let satellites = satellites
            .into_iter()
            .map(|sat| (sat.sv(), sat))
            .collect::<BTreeMap<_, _>>();
        let sv_list_full = satellites
            .keys()
            .copied()
            .sorted_by_key(|sv| sv.to_string())
            .collect::<Vec<_>>();
        Ok(Self {
            grid,
            sv_list: sv_list_full.clone(),
            sv_list_full,
            satellites,
            slots,
        })
    }
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }
    /// Grid [Epoch]s
    pub fn epochs(&self) -> &[Epoch] {
        self.grid.epochs()
    }
    pub fn slots(&self) -> &FrequencySlots {
        &self.slots
    }
    /// Every satellite, regardless of the current selection
    pub fn sv_list_full(&self) -> &[SV] {
        &self.sv_list_full
    }
    /// Selected satellites
    pub fn sv_list(&self) -> &[SV] {
        &self.sv_list
    }
    /// Number of selected satellites
    pub fn len(&self) -> usize {
        self.sv_list.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sv_list.is_empty()
    }
    /// Any [Satellite], regardless of the current selection
    pub fn get(&self, sv: SV) -> Option<&Satellite> {
        self.satellites.get(&sv)
    }
    /// Selects the satellites matching these options. The selection is
    /// rebuilt from every satellite: filters do not accumulate.
    pub fn filter(&mut self, opts: &FilterOptions) {
        let satellites = &self.satellites;
        self.sv_list = self.sv_list_full.clone();
        self.sv_list.retain(|sv| {
            satellites
                .get(sv)
                .map(|sat| opts.matches(sat))
                .unwrap_or(false)
        });
        debug!("{} satellite(s) selected", self.sv_list.len());
    }
    /// Selects every satellite
    pub fn reset(&mut self) {
        self.sv_list = self.sv_list_full.clone();
    }
    /// Iterates the selected [Satellite]s, in name order.
    /// Every call starts over from the first selected satellite.
    pub fn iter(&self) -> impl Iterator<Item = &Satellite> + '_ {
        self.sv_list
            .iter()
            .filter_map(move |sv| self.satellites.get(sv))
    }
    /// Keeps `start <= t <= end` only: the grid and every series shrink
    /// together. The selection is reset.
    pub fn cuttime(&mut self, start: Epoch, end: Epoch) {
        self.reset();
        let mask = self.grid.mask(start, end);
        self.grid.retain_mask(&mask);
        for sat in self.satellites.values_mut() {
            sat.retain_mask(&mask);
        }
        debug!("time window: {} epoch(s) remaining", self.grid.len());
    }
    /// Values of the selected satellites at `t`. None when `t` is not on the grid.
    pub fn snapshot(&self, t: Epoch) -> Option<Vec<Snapshot>> {
        let index = self.grid.index_of(t)?;
        Some(
            self.iter()
                .map(|sat| {
                    let observations = sat
                        .observations()
                        .iter()
                        .filter_map(|(label, series)| {
                            Some((label.to_string(), *series.get(index)?))
                        })
                        .collect();
                    Snapshot {
                        sv: sat.sv(),
                        observations,
                        position: sat.position(index),
                        clock: sat.clock(index),
                    }
                })
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a SatelliteDataStore {
    type Item = &'a Satellite;
    type IntoIter = Box<dyn Iterator<Item = &'a Satellite> + 'a>;
    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
