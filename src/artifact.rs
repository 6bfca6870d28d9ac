//! Derived artifacts: the demultiplexed dataset as ';' separated tables
use log::{debug, info};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, WriterBuilder};

use crate::{
    demux::parse_sv,
    ephemeris::EPHEMERIS_LABELS,
    grid::TimeGrid,
    prelude::{Epoch, Error},
    record::{is_missing, Record, MISSING},
    satellite::Satellite,
    slots::FrequencySlots,
    store::SatelliteDataStore,
};

const DELIMITER: u8 = b';';
const TIME: &str = "time.csv";
const SLOTS: &str = "slots.csv";
const MANIFEST: &str = "manifest.csv";
const OBS_EXT: &str = ".obs.csv";
const XYZ_EXT: &str = ".xyz.csv";

/// Identifies the source the artifacts were generated from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Version of the generator
    pub version: String,
    /// Source length in bytes
    pub length: u64,
    /// 64 bit FNV-1a hash of the source
    pub hash: u64,
}

impl Manifest {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    /// [Manifest] of this source file
    pub fn of(source: &Path) -> Result<Self, Error> {
        let mut fd = File::open(source)?;
        let mut buf = [0_u8; 8192];
        let (mut length, mut hash) = (0_u64, Self::FNV_OFFSET);
        loop {
            let size = fd.read(&mut buf)?;
            if size == 0 {
                break;
            }
            length += size as u64;
            for byte in buf[..size].iter() {
                hash ^= *byte as u64;
                hash = hash.wrapping_mul(Self::FNV_PRIME);
            }
        }
        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            length,
            hash,
        })
    }
    fn write(&self, path: &Path) -> Result<(), Error> {
        let mut w = WriterBuilder::new().delimiter(DELIMITER).from_path(path)?;
        w.write_record(["key", "value"])?;
        w.write_record(["version", self.version.as_str()])?;
        w.write_record(["length", self.length.to_string().as_str()])?;
        w.write_record(["hash", format!("{:016x}", self.hash).as_str()])?;
        w.flush()?;
        Ok(())
    }
    fn read(path: &Path) -> Result<Self, Error> {
        let mut r = ReaderBuilder::new().delimiter(DELIMITER).from_path(path)?;
        let (mut version, mut length, mut hash) = (None, None, None);
        for record in r.records() {
            let record = record?;
            match (record.get(0), record.get(1)) {
                (Some("version"), Some(v)) => version = Some(v.to_string()),
                (Some("length"), Some(v)) => length = u64::from_str(v).ok(),
                (Some("hash"), Some(v)) => hash = u64::from_str_radix(v, 16).ok(),
                _ => {},
            }
        }
        match (version, length, hash) {
            (Some(version), Some(length), Some(hash)) => Ok(Self {
                version,
                length,
                hash,
            }),
            _ => Err(Error::Artifact(format!("incomplete {}", path.display()))),
        }
    }
}

fn format_value(value: f64) -> String {
    if is_missing(value) {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_value(content: &str) -> Result<f64, Error> {
    let content = content.trim();
    if content.is_empty() || content.eq_ignore_ascii_case("nan") {
        return Ok(MISSING);
    }
    f64::from_str(content).or(Err(Error::Artifact(format!("invalid value \"{}\"", content))))
}

fn write_record(path: &Path, record: &Record) -> Result<(), Error> {
    let mut w = WriterBuilder::new().delimiter(DELIMITER).from_path(path)?;
    w.write_record(record.labels())?;
    for index in 0..record.len() {
        let row = record.row(index).unwrap_or_default();
        w.write_record(row.iter().map(|v| format_value(*v)))?;
    }
    w.flush()?;
    Ok(())
}

fn read_record(path: &Path) -> Result<Record, Error> {
    let mut r = ReaderBuilder::new().delimiter(DELIMITER).from_path(path)?;
    let labels = r.headers()?.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let mut columns = vec![Vec::new(); labels.len()];
    for row in r.records() {
        let row = row?;
        for (column, content) in columns.iter_mut().zip(row.iter()) {
            column.push(parse_value(content)?);
        }
    }
    Record::from_columns(labels, columns)
}

/// Directory holding the derived artifacts of one observation file
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactDir {
    path: PathBuf,
}

impl ArtifactDir {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// True when the artifacts were generated from this very source,
    /// by this very version. Missing artifacts are never valid.
    pub fn is_valid_for(&self, source: &Path) -> Result<bool, Error> {
        let manifest = self.path.join(MANIFEST);
        if !manifest.exists() {
            return Ok(false);
        }
        let stored = match Manifest::read(&manifest) {
            Ok(stored) => stored,
            Err(e) => {
                debug!("{}", e);
                return Ok(false);
            },
        };
        let valid = stored == Manifest::of(source)?;
        if !valid {
            info!("{}: stale artifacts", self.path.display());
        }
        Ok(valid)
    }
    /// Removes the artifacts we manage, other files are preserved
    fn clean(&self) -> Result<(), Error> {
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if name == TIME
                || name == SLOTS
                || name == MANIFEST
                || name.ends_with(OBS_EXT)
                || name.ends_with(XYZ_EXT)
            {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
    /// Writes the artifacts of this [SatelliteDataStore], generated from `source`.
    /// Every satellite is written, regardless of the current selection.
    pub fn write(&self, store: &SatelliteDataStore, source: &Path) -> Result<(), Error> {
        let manifest = Manifest::of(source)?;
        if self.path.exists() {
            self.clean()?;
        } else {
            fs::create_dir_all(&self.path)?;
        }

        let mut w = WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_path(self.path.join(TIME))?;
        w.write_record(["epoch"])?;
        for t in store.epochs() {
            w.write_record([t.to_string()])?;
        }
        w.flush()?;

        let mut w = WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_path(self.path.join(SLOTS))?;
        w.write_record(["slot"])?;
        for (_, slot) in store.slots().iter() {
            w.write_record([slot.map(|s| s.to_string()).unwrap_or_default()])?;
        }
        w.flush()?;

        for sv in store.sv_list_full() {
            let Some(sat) = store.get(*sv) else {
                continue;
            };
            write_record(
                &self.path.join(format!("{}{}", sv, OBS_EXT)),
                sat.observations(),
            )?;
            if let Some(eph) = sat.ephemeris() {
                write_record(&self.path.join(format!("{}{}", sv, XYZ_EXT)), eph)?;
            }
        }

        // last: incomplete artifacts are never valid
        manifest.write(&self.path.join(MANIFEST))?;
        info!(
            "{} satellite(s) written to {}",
            store.sv_list_full().len(),
            self.path.display()
        );
        Ok(())
    }

    fn read_grid(&self) -> Result<TimeGrid, Error> {
        let mut r = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .from_path(self.path.join(TIME))?;
        let mut epochs = Vec::new();
        for row in r.records() {
            let row = row?;
            let content = row.get(0).unwrap_or_default();
            let t = Epoch::from_str(content.trim())
                .or(Err(Error::Artifact(format!("invalid epoch \"{}\"", content))))?;
            epochs.push(t);
        }
        TimeGrid::from_epochs(epochs)
    }

    fn read_slots(&self) -> Result<FrequencySlots, Error> {
        let mut r = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .from_path(self.path.join(SLOTS))?;
        let mut slots = FrequencySlots::default();
        for (index, row) in r.records().enumerate() {
            let row = row?;
            let value = parse_value(row.get(0).unwrap_or_default())?;
            if !is_missing(value) && !slots.set(index as u8 + 1, value as i8) {
                return Err(Error::Artifact(format!("invalid slot \"{}\"", value)));
            }
        }
        Ok(slots)
    }

    /// Loads a [SatelliteDataStore] from these artifacts
    pub fn read(&self) -> Result<SatelliteDataStore, Error> {
        let grid = self.read_grid()?;
        let slots = self.read_slots()?;

        let mut satellites = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(OBS_EXT) else {
                continue;
            };
            let sv = parse_sv(stem, 0)
                .ok_or(Error::Artifact(format!("invalid satellite \"{}\"", stem)))?;

            let observations = read_record(&path)?;
            let xyz = self.path.join(format!("{}{}", stem, XYZ_EXT));
            let ephemeris = if xyz.exists() {
                let eph = read_record(&xyz)?;
                if eph.labels() != EPHEMERIS_LABELS {
                    return Err(Error::Artifact(format!("{}: invalid header", xyz.display())));
                }
                Some(eph)
            } else {
                None
            };
            satellites.push(Satellite::new(sv, slots.get_for(sv), observations, ephemeris));
        }
        debug!("{} satellite(s) loaded", satellites.len());
        SatelliteDataStore::new(grid, satellites, slots)
    }

    /// Deletes the artifact directory
    pub fn remove(self) -> Result<(), Error> {
        fs::remove_dir_all(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{parse_value, Manifest};
    use crate::record::is_missing;
    use std::io::Write;

    #[test]
    fn missing_cells() {
        for content in ["", " ", "nan", "NaN"] {
            assert!(is_missing(parse_value(content).unwrap()));
        }
        assert_eq!(parse_value("-176.397152").unwrap(), -176.397152);
        assert!(parse_value("abc").is_err());
    }

    #[test]
    fn manifest() {
        let path = std::env::temp_dir().join(format!("gnss-demux-manifest-{}.txt", std::process::id()));
        let mut fd = std::fs::File::create(&path).unwrap();
        fd.write_all(b"a").unwrap();
        drop(fd);

        let manifest = Manifest::of(&path).unwrap();
        assert_eq!(manifest.length, 1);
        // FNV-1a("a")
        assert_eq!(manifest.hash, 0xaf63dc4c8601ec8c);

        std::fs::write(&path, b"b").unwrap();
        assert_ne!(Manifest::of(&path).unwrap(), manifest);
        std::fs::remove_file(&path).unwrap();
    }
}
