#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod artifact;
mod cfg;
mod demux;
mod ephemeris;
mod epoch;
mod grid;
mod header;
mod interp;
mod parser;
mod record;
mod satellite;
mod slots;
mod store;

// pub export
pub use parser::{Error, MalformedInput};

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::artifact::{ArtifactDir, Manifest};
    pub use crate::cfg::Config;
    pub use crate::demux::{Demultiplexer, Schema};
    pub use crate::ephemeris::{EphemerisAligner, EPHEMERIS_LABELS};
    pub use crate::epoch::EpochFlag;
    pub use crate::grid::{TimeGrid, TimeGridBuilder};
    pub use crate::header::ObservationHeader;
    pub use crate::interp::Method;
    pub use crate::parser::{Companions, Error, MalformedInput, ObservationData, Parser};
    pub use crate::record::{is_missing, FieldLayout, Record, MISSING};
    pub use crate::satellite::Satellite;
    pub use crate::slots::{FrequencySlotResolver, FrequencySlots};
    pub use crate::store::{FilterOptions, SatelliteDataStore, Snapshot};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}
