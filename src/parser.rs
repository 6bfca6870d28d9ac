//! Parsing pipeline
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::{
    artifact::ArtifactDir,
    cfg::Config,
    demux::{Demultiplexer, Schema},
    ephemeris::EphemerisAligner,
    epoch::{is_rinex_epoch, parse_rinex_epoch},
    grid::{TimeGrid, TimeGridBuilder},
    header::ObservationHeader,
    prelude::{Epoch, SV},
    record::{FieldLayout, Record},
    satellite::Satellite,
    slots::{FrequencySlotResolver, FrequencySlots},
    store::SatelliteDataStore,
};

/// Structural defects: the file cannot be processed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedInput {
    #[error("missing END OF HEADER")]
    MissingHeaderDelimiter,
    #[error("unsupported revision \"{0}\"")]
    UnsupportedRevision(String),
    #[error("not an observation file")]
    NotObservation,
    #[error("no observation types declared")]
    NoObservables,
    #[error("unknown constellation \"{0}\"")]
    UnknownConstellation(String),
    #[error("invalid epoch marker \"{0}\"")]
    EpochMarker(String),
    #[error("invalid epoch flag \"{0}\"")]
    EpochFlag(String),
    #[error("{0} epoch(s): at least 3 are needed to infer the sampling interval")]
    NotEnoughEpochs(usize),
    #[error("non chronological epoch {0}")]
    NonChronological(Epoch),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed input: {0}")]
    MalformedInput(#[from] MalformedInput),
    #[error("missing companion file {0}")]
    MissingCompanionFile(PathBuf),
    #[error("{label}: invalid field \"{content}\"")]
    FieldParse { label: String, content: String },
    #[error("epoch {0} is not on the time grid")]
    EpochNotOnGrid(Epoch),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("artifact error: {0}")]
    Artifact(String),
}

/// Companion files of an observation file
pub struct Companions;

impl Companions {
    fn replace_tail(path: &Path, count: usize, tail: &str) -> Option<PathBuf> {
        let s = path.to_str()?;
        if s.len() < count || !s.is_char_boundary(s.len() - count) {
            return None;
        }
        Some(PathBuf::from(format!("{}{}", &s[..s.len() - count], tail)))
    }
    /// SP3 orbit file: "site0630.22o" -> "site0630.sp3"
    pub fn orbit(path: &Path) -> Result<PathBuf, Error> {
        match Self::replace_tail(path, 3, "sp3") {
            Some(sp3) if sp3.exists() => Ok(sp3),
            Some(sp3) => Err(Error::MissingCompanionFile(sp3)),
            None => Err(Error::MissingCompanionFile(path.to_path_buf())),
        }
    }
    /// GLONASS navigation file: "site0630.22o" -> "site0630.22g" (or .22G)
    pub fn navigation(path: &Path) -> Result<PathBuf, Error> {
        let mut last = path.to_path_buf();
        for tail in ["g", "G"] {
            if let Some(nav) = Self::replace_tail(path, 1, tail) {
                if nav.exists() {
                    return Ok(nav);
                }
                last = nav;
            }
        }
        Err(Error::MissingCompanionFile(last))
    }
}

/// Demultiplexed observation file
#[derive(Debug, Clone)]
pub struct ObservationData {
    pub header: ObservationHeader,
    pub grid: TimeGrid,
    pub records: BTreeMap<SV, Record>,
}

/// Parser: raw files to [SatelliteDataStore]
#[derive(Debug, Clone, Default)]
pub struct Parser {
    cfg: Config,
}

fn open_file(path: &Path) -> impl FnMut() -> std::io::Result<BufReader<File>> + '_ {
    move || File::open(path).map(BufReader::new)
}

impl Parser {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Demultiplexes a RINEX v3 observation stream. `open` is invoked twice:
    /// the first pass builds the [TimeGrid], the second pass fills the channels.
    pub fn observation<R, F>(&self, mut open: F) -> Result<ObservationData, Error>
    where
        R: BufRead,
        F: FnMut() -> std::io::Result<R>,
    {
        let mut lines = open()?.lines();
        let header = ObservationHeader::parse(&mut lines)?;
        let ts = header.timescale.unwrap_or(self.cfg.timescale);

        let mut builder = TimeGridBuilder::new(self.cfg.min_interval);
        let mut special = 0;
        for line in lines {
            let line = line?;
            if special > 0 {
                special -= 1;
                continue;
            }
            if is_rinex_epoch(&line) {
                let marker = parse_rinex_epoch(&line, ts)?;
                if marker.flag.is_observation() {
                    builder.push(marker.epoch);
                } else {
                    special = marker.count;
                }
            }
        }
        let grid = builder.build()?;

        let mut lines = open()?.lines();
        let header = ObservationHeader::parse(&mut lines)?;
        let schema = Schema::PerConstellation(header.observables.clone());
        let mut demux = Demultiplexer::new(&grid, schema, FieldLayout::RINEX_OBS, 0);

        let mut special = 0;
        for line in lines {
            let line = line?;
            if special > 0 {
                special -= 1;
                continue;
            }
            if is_rinex_epoch(&line) {
                let marker = parse_rinex_epoch(&line, ts)?;
                if !marker.flag.is_observation() {
                    debug!("{:?}: {:?} event", marker.epoch, marker.flag);
                    special = marker.count;
                    continue;
                }
                if let Err(e) = demux.epoch(marker.epoch) {
                    warn!("{}", e);
                }
            } else {
                demux.data(&line);
            }
        }

        let records = demux.finish();
        info!(
            "{} satellite(s) demultiplexed over {} epochs",
            records.len(),
            grid.len()
        );
        Ok(ObservationData {
            header,
            grid,
            records,
        })
    }

    /// Aligns and interpolates an SP3 stream to this [TimeGrid]
    pub fn ephemeris<R: BufRead>(
        &self,
        grid: &TimeGrid,
        reader: R,
    ) -> Result<BTreeMap<SV, Record>, Error> {
        let aligner = EphemerisAligner::new(grid, &self.cfg);
        let mut records = aligner.align(reader.lines())?;
        if self.cfg.interpolate_ephemeris {
            aligner.interpolate(&mut records);
        }
        Ok(records)
    }

    /// Resolves GLONASS frequency slots: navigation data first,
    /// then the observation header
    pub fn slots<R: BufRead>(
        &self,
        header: &ObservationHeader,
        navigation: Option<R>,
    ) -> Result<FrequencySlots, Error> {
        let mut slots = match navigation {
            Some(reader) => FrequencySlotResolver::resolve(reader.lines())?,
            None => FrequencySlots::default(),
        };
        slots.fill_from(&header.glonass_slots);
        Ok(slots)
    }

    fn assemble(
        &self,
        obs: ObservationData,
        mut ephemeris: BTreeMap<SV, Record>,
        slots: FrequencySlots,
    ) -> Result<SatelliteDataStore, Error> {
        let satellites = obs
            .records
            .into_iter()
            .map(|(sv, record)| Satellite::new(sv, slots.get_for(sv), record, ephemeris.remove(&sv)))
            .collect::<Vec<_>>();
        for sv in ephemeris.keys() {
            debug!("{}: orbit without observations", sv);
        }
        SatelliteDataStore::new(obs.grid, satellites, slots)
    }

    /// Builds a [SatelliteDataStore] from file contents
    pub fn parse_str(
        &self,
        observation: &str,
        orbit: Option<&str>,
        navigation: Option<&str>,
    ) -> Result<SatelliteDataStore, Error> {
        let obs = self.observation(|| Ok(Cursor::new(observation.as_bytes())))?;
        let ephemeris = match orbit {
            Some(content) => self.ephemeris(&obs.grid, Cursor::new(content.as_bytes()))?,
            None => BTreeMap::new(),
        };
        let slots = self.slots(&obs.header, navigation.map(|s| Cursor::new(s.as_bytes())))?;
        self.assemble(obs, ephemeris, slots)
    }

    /// Builds a [SatelliteDataStore] from an observation file,
    /// and its companion files when they exist
    pub fn load(&self, path: impl AsRef<Path>) -> Result<SatelliteDataStore, Error> {
        let path = path.as_ref();
        let obs = self.observation(open_file(path))?;

        let ephemeris = match Companions::orbit(path) {
            Ok(sp3) => {
                debug!("orbit companion {}", sp3.display());
                self.ephemeris(&obs.grid, BufReader::new(File::open(sp3)?))?
            },
            Err(e) => {
                info!("{}", e);
                BTreeMap::new()
            },
        };

        let navigation = match Companions::navigation(path) {
            Ok(nav) => Some(BufReader::new(File::open(nav)?)),
            Err(e) => {
                info!("{}", e);
                None
            },
        };
        let slots = self.slots(&obs.header, navigation)?;
        self.assemble(obs, ephemeris, slots)
    }

    /// Same as [Self::load], but reuses the derived artifacts of `artifacts`
    /// when their manifest matches the observation file. The artifacts
    /// are (re)generated otherwise.
    pub fn load_cached(
        &self,
        path: impl AsRef<Path>,
        artifacts: &ArtifactDir,
    ) -> Result<SatelliteDataStore, Error> {
        let path = path.as_ref();
        if artifacts.is_valid_for(path)? {
            info!("reusing {}", artifacts.path().display());
            return artifacts.read();
        }
        let store = self.load(path)?;
        artifacts.write(&store, path)?;
        Ok(store)
    }
}
