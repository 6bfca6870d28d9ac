//! RINEX v3 Observation header
use itertools::Itertools;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::epoch::timescale_from_code;
use crate::parser::MalformedInput;
use crate::prelude::{Constellation, Duration, Error, TimeScale};

/// Returns (content, marker) of a header line
fn split_marker(line: &str) -> (&str, &str) {
    if line.len() > 60 && line.is_char_boundary(60) {
        line.split_at(60)
    } else {
        (line, "")
    }
}

/// Observation header: what we need to demultiplex the record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationHeader {
    /// RINEX revision (major, minor)
    pub version: (u8, u8),
    /// Observables declared per constellation, in declaration order
    pub observables: BTreeMap<Constellation, Vec<String>>,
    /// Time system declared in the TIME OF FIRST OBS record
    pub timescale: Option<TimeScale>,
    /// Sampling interval, when declared
    pub interval: Option<Duration>,
    /// GLONASS frequency slot per satellite number,
    /// as declared by the receiver
    pub glonass_slots: BTreeMap<u8, i8>,
}

impl ObservationHeader {
    /// Parses header from these lines, stops right after END OF HEADER.
    /// The remaining lines are the file body.
    pub fn parse<I>(lines: &mut I) -> Result<Self, Error>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        let mut header = Self::default();
        let mut current: Option<Constellation> = None;

        for line in lines {
            let line = line?;
            let (content, marker) = split_marker(&line);
            let marker = marker.trim();

            if marker.eq("END OF HEADER") {
                if header.observables.is_empty() {
                    return Err(Error::MalformedInput(MalformedInput::NoObservables));
                }
                debug!(
                    "rinex v{}.{:02} - {} constellation(s)",
                    header.version.0,
                    header.version.1,
                    header.observables.len()
                );
                return Ok(header);
            } else if marker.contains("RINEX VERSION / TYPE") {
                header.version = Self::parse_version(content)?;
                if header.version.0 != 3 {
                    return Err(Error::MalformedInput(MalformedInput::UnsupportedRevision(
                        content.get(..9).unwrap_or(content).trim().to_string(),
                    )));
                }
                if !content.get(20..21).unwrap_or(" ").eq("O") {
                    return Err(Error::MalformedInput(MalformedInput::NotObservation));
                }
            } else if marker.contains("SYS / # / OBS TYPES") {
                let letter = content.get(..1).unwrap_or(" ");
                if !letter.trim().is_empty() {
                    let constellation = Constellation::from_str(letter).or(Err(
                        Error::MalformedInput(MalformedInput::UnknownConstellation(
                            letter.to_string(),
                        )),
                    ))?;
                    current = Some(constellation);
                }
                let constellation = current.ok_or(Error::MalformedInput(
                    MalformedInput::UnknownConstellation(letter.to_string()),
                ))?;
                let codes = content
                    .get(7..)
                    .unwrap_or("")
                    .split_ascii_whitespace()
                    .map(|code| code.to_string());
                header
                    .observables
                    .entry(constellation)
                    .or_default()
                    .extend(codes);
            } else if marker.contains("TIME OF FIRST OBS") {
                header.timescale = content.get(48..51).and_then(timescale_from_code);
            } else if marker.contains("INTERVAL") {
                if let Ok(interval) = f64::from_str(content.get(..10).unwrap_or("").trim()) {
                    if interval > 0.0 {
                        header.interval = Some(Duration::from_seconds(interval));
                    }
                }
            } else if marker.contains("GLONASS SLOT / FRQ #") {
                header.parse_glonass_slots(content);
            }
        }
        Err(Error::MalformedInput(MalformedInput::MissingHeaderDelimiter))
    }

    fn parse_version(content: &str) -> Result<(u8, u8), Error> {
        let field = content.get(..9).unwrap_or(content).trim();
        let err = || Error::MalformedInput(MalformedInput::UnsupportedRevision(field.to_string()));
        let (major, minor) = match field.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (field, "0"),
        };
        let major = u8::from_str(major.trim()).or(Err(err()))?;
        let minor = u8::from_str(minor.trim()).unwrap_or(0);
        Ok((major, minor))
    }

    /// " 24 R01  1 R02 -4 R03  5 R04  6 R05  1 R06 -4 R07  5 R08  6"
    fn parse_glonass_slots(&mut self, content: &str) {
        let items = content.get(3..).unwrap_or("").split_ascii_whitespace();
        for (sv, slot) in items.tuples() {
            let number = sv.strip_prefix('R').and_then(|n| u8::from_str(n).ok());
            match (number, i8::from_str(slot)) {
                (Some(number), Ok(slot)) => {
                    self.glonass_slots.insert(number, slot);
                },
                _ => warn!("invalid glonass slot descriptor \"{} {}\"", sv, slot),
            }
        }
    }

    /// Observables for this constellation
    pub fn observables(&self, constellation: Constellation) -> Option<&[String]> {
        self.observables.get(&constellation).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod test {
    use super::ObservationHeader;
    use crate::parser::MalformedInput;
    use crate::prelude::{Constellation, Duration, Error, TimeScale};
    use std::io::{BufRead, Cursor};

    const HEADER: &str = "     3.04           OBSERVATION DATA    M                   RINEX VERSION / TYPE
G   16 C1C L1C D1C S1C C2S L2S D2S S2S C2W L2W D2W S2W C5Q  SYS / # / OBS TYPES
       L5Q D5Q S5Q                                          SYS / # / OBS TYPES
R    4 C1C L1C D1C S1C                                      SYS / # / OBS TYPES
    30.000                                                  INTERVAL
  2022     3     4     0     0    0.0000000     GPS         TIME OF FIRST OBS
  3 R01  1 R02 -4 R03  5                                    GLONASS SLOT / FRQ #
                                                            END OF HEADER
> 2022 03 04 00 00  0.0000000  0  1
";

    #[test]
    fn observation_header() {
        let mut lines = Cursor::new(HEADER).lines();
        let header = ObservationHeader::parse(&mut lines).unwrap();
        assert_eq!(header.version, (3, 4));

        let gps = header.observables(Constellation::GPS).unwrap();
        assert_eq!(gps.len(), 16, "continuation line should extend GPS");
        assert_eq!(gps[0], "C1C");
        assert_eq!(gps[15], "S5Q");

        let glo = header.observables(Constellation::Glonass).unwrap();
        assert_eq!(glo, &["C1C", "L1C", "D1C", "S1C"]);
        assert!(header.observables(Constellation::Galileo).is_none());

        assert_eq!(header.timescale, Some(TimeScale::GPST));
        assert_eq!(header.interval, Some(Duration::from_seconds(30.0)));
        assert_eq!(header.glonass_slots.get(&2), Some(&-4));
        assert_eq!(header.glonass_slots.len(), 3);

        // body is left untouched
        let next = lines.next().unwrap().unwrap();
        assert!(next.starts_with('>'));
    }

    #[test]
    fn missing_end_of_header() {
        let content = HEADER.replace("END OF HEADER", "COMMENT");
        let mut lines = Cursor::new(content).lines();
        match ObservationHeader::parse(&mut lines) {
            Err(Error::MalformedInput(MalformedInput::MissingHeaderDelimiter)) => {},
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn unsupported_revision() {
        let content = HEADER.replace("     3.04  ", "     2.11  ");
        let mut lines = Cursor::new(content).lines();
        match ObservationHeader::parse(&mut lines) {
            Err(Error::MalformedInput(MalformedInput::UnsupportedRevision(rev))) => {
                assert_eq!(rev, "2.11");
            },
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn no_observables() {
        let content = "     3.04           OBSERVATION DATA    M                   RINEX VERSION / TYPE
                                                            END OF HEADER
";
        let mut lines = Cursor::new(content).lines();
        assert!(matches!(
            ObservationHeader::parse(&mut lines),
            Err(Error::MalformedInput(MalformedInput::NoObservables))
        ));
    }
}
