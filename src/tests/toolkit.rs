//! Test helpers: synthetic RINEX content and the values of the test resources
use std::path::PathBuf;
use std::str::FromStr;

use crate::prelude::{Duration, Epoch};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_resource(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_resources")
        .join(name)
}

/// First epoch of every test file
pub fn t0() -> Epoch {
    Epoch::from_str("2022-03-04T00:00:00 GPST").unwrap()
}

pub fn seconds(s: f64) -> Epoch {
    t0() + Duration::from_seconds(s)
}

/// Observation #k of satellite #prn at grid index #idx, in the test resources
pub fn observation(prn: u8, idx: usize, k: usize) -> f64 {
    prn as f64 * 1.0E6 + idx as f64 * 100.0 + k as f64 + 0.25
}

/// Orbit of satellite #prn at `t` seconds, in the test resources:
/// (x, y, z) in km and clock offset in us
pub fn orbit(prn: u8, t: f64) -> [f64; 4] {
    let prn = prn as f64;
    [
        -20000.0 + 100.0 * prn + 0.5 * t + 1.0E-4 * t * t + 1.0E-7 * t * t * t,
        15000.0 - 50.0 * prn - 0.25 * t + 2.0E-4 * t * t,
        5000.0 + prn + 0.1 * t,
        100.0 + prn + 1.0E-3 * t,
    ]
}

fn header_line(content: &str, marker: &str) -> String {
    format!("{:<60}{}\n", content, marker)
}

/// Mixed observation header, GPS observables only
pub fn rinex_header(observables: &[&str]) -> String {
    let mut header = header_line(
        "     3.04           OBSERVATION DATA    M",
        "RINEX VERSION / TYPE",
    );
    header.push_str(&header_line(
        &format!("G  {:>3} {}", observables.len(), observables.join(" ")),
        "SYS / # / OBS TYPES",
    ));
    header.push_str(&header_line(
        "  2022     3     4     0     0    0.0000000     GPS",
        "TIME OF FIRST OBS",
    ));
    header.push_str(&header_line("", "END OF HEADER"));
    header
}

/// Epoch marker, `s` seconds past [t0]
pub fn rinex_epoch(s: u32, flag: u8, count: usize) -> String {
    let (h, m, s) = (s / 3600, (s / 60) % 60, s % 60);
    format!(
        "> 2022 03 04 {:02} {:02} {:10.7}  {}{:3}\n",
        h, m, s as f64, flag, count
    )
}

/// Data line: F14.3 + LLI + SSI per field, blank when None
pub fn rinex_line(sv: &str, values: &[Option<f64>]) -> String {
    let mut line = sv.to_string();
    for value in values {
        match value {
            Some(value) => line.push_str(&format!("{:14.3}  ", value)),
            None => line.push_str(&" ".repeat(16)),
        }
    }
    line.push('\n');
    line
}

/// GPS only observation file (C1C, S1C) sampled every 30s.
/// Only the grid indices listed here are written.
pub fn synthetic_observation(indices: &[usize], satellites: &[u8]) -> String {
    let mut content = rinex_header(&["C1C", "S1C"]);
    for idx in indices {
        content.push_str(&rinex_epoch(*idx as u32 * 30, 0, satellites.len()));
        for prn in satellites {
            content.push_str(&rinex_line(
                &format!("G{:02}", prn),
                &[
                    Some(observation(*prn, *idx, 0)),
                    Some(observation(*prn, *idx, 1)),
                ],
            ));
        }
    }
    content
}
