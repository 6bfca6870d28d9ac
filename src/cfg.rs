use crate::interp::Method;
use crate::prelude::{Duration, TimeScale};

#[cfg(feature = "serde")]
use serde::Deserialize;

fn default_min_interval() -> Duration {
    Duration::from_seconds(30.0)
}

fn default_timescale() -> TimeScale {
    TimeScale::GPST
}

fn default_interpolate_ephemeris() -> bool {
    true
}

/// Demultiplexing configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Config {
    /// Minimal grid interval. The grid interval is inferred
    /// from the data, but never goes below this value.
    #[cfg_attr(feature = "serde", serde(default = "default_min_interval"))]
    pub min_interval: Duration,
    /// Timescale used to read epochs, when the file does not declare one
    #[cfg_attr(feature = "serde", serde(default = "default_timescale"))]
    pub timescale: TimeScale,
    /// Ephemeris gap interpolation method
    #[cfg_attr(feature = "serde", serde(default))]
    pub interpolation: Method,
    /// Set to false to keep the raw ephemeris, gaps included
    #[cfg_attr(feature = "serde", serde(default = "default_interpolate_ephemeris"))]
    pub interpolate_ephemeris: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_interval: default_min_interval(),
            timescale: default_timescale(),
            interpolation: Method::default(),
            interpolate_ephemeris: default_interpolate_ephemeris(),
        }
    }
}

impl Config {
    /// Returns a copy with this minimal grid interval
    pub fn with_min_interval(&self, interval: Duration) -> Self {
        let mut s = *self;
        s.min_interval = interval;
        s
    }
    /// Returns a copy with this default [TimeScale]
    pub fn with_timescale(&self, ts: TimeScale) -> Self {
        let mut s = *self;
        s.timescale = ts;
        s
    }
    /// Returns a copy with this interpolation [Method]
    pub fn with_interpolation(&self, method: Method) -> Self {
        let mut s = *self;
        s.interpolation = method;
        s
    }
    /// Returns a copy that keeps (or not) the raw ephemeris
    pub fn with_ephemeris_interpolation(&self, enabled: bool) -> Self {
        let mut s = *self;
        s.interpolate_ephemeris = enabled;
        s
    }
}
