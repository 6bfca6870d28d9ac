//! Regular time grid every per satellite series is aligned to
use log::debug;

use crate::parser::MalformedInput;
use crate::prelude::{Duration, Epoch, Error};

/// Strictly increasing, evenly spaced [Epoch]s
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    interval: Duration,
    epochs: Vec<Epoch>,
}

impl TimeGrid {
    /// Builds a [TimeGrid] from `start` to `end` (included), every `interval`
    pub fn new(start: Epoch, end: Epoch, interval: Duration) -> Self {
        let mut epochs = Vec::new();
        let mut t = start;
        while t <= end {
            epochs.push(t);
            t += interval;
        }
        Self { interval, epochs }
    }
    /// Rebuilds a [TimeGrid] from stored [Epoch]s, which must be evenly spaced
    pub(crate) fn from_epochs(epochs: Vec<Epoch>) -> Result<Self, Error> {
        let interval = match (epochs.first(), epochs.get(1)) {
            (Some(t0), Some(t1)) => *t1 - *t0,
            _ => Duration::ZERO,
        };
        for pair in epochs.windows(2) {
            if pair[1] - pair[0] != interval || interval <= Duration::ZERO {
                return Err(Error::Artifact(format!(
                    "uneven time grid at {:?}",
                    pair[1]
                )));
            }
        }
        Ok(Self { interval, epochs })
    }
    /// Grid spacing
    pub fn interval(&self) -> Duration {
        self.interval
    }
    /// Number of grid [Epoch]s (N)
    pub fn len(&self) -> usize {
        self.epochs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }
    pub fn get(&self, index: usize) -> Option<Epoch> {
        self.epochs.get(index).copied()
    }
    pub fn first(&self) -> Option<Epoch> {
        self.epochs.first().copied()
    }
    pub fn last(&self) -> Option<Epoch> {
        self.epochs.last().copied()
    }
    /// Position of `t` in the grid, None when `t` is not a grid [Epoch]
    pub fn index_of(&self, t: Epoch) -> Option<usize> {
        let t0 = self.first()?;
        let offset = (t - t0).total_nanoseconds();
        let step = self.interval.total_nanoseconds();
        if offset < 0 {
            return None;
        }
        if step == 0 {
            return if offset == 0 { Some(0) } else { None };
        }
        if offset % step != 0 {
            return None;
        }
        let index = (offset / step) as usize;
        if index < self.epochs.len() {
            Some(index)
        } else {
            None
        }
    }
    /// `start <= t <= end` mask
    pub fn mask(&self, start: Epoch, end: Epoch) -> Vec<bool> {
        self.epochs
            .iter()
            .map(|t| *t >= start && *t <= end)
            .collect()
    }
    pub(crate) fn retain_mask(&mut self, mask: &[bool]) {
        let mut keep = mask.iter();
        self.epochs.retain(|_| *keep.next().unwrap_or(&false));
    }
}

/// Builds the [TimeGrid] from the epochs encountered in a raw stream
#[derive(Debug, Clone)]
pub struct TimeGridBuilder {
    min_interval: Duration,
    epochs: Vec<Epoch>,
}

impl TimeGridBuilder {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            epochs: Vec::with_capacity(2880),
        }
    }
    /// Latch a new raw [Epoch], in stream order
    pub fn push(&mut self, t: Epoch) {
        self.epochs.push(t);
    }
    /// Number of raw epochs latched so far
    pub fn len(&self) -> usize {
        self.epochs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
    /// Builds the [TimeGrid]. The interval is the smallest of the first two
    /// gaps and never goes below the configured minimum: an irregular leading
    /// epoch is absorbed by the minimum, an epoch missing from the first three
    /// does not widen the grid. The grid starts at the first multiple of the
    /// interval past the first epoch and ends on the last epoch (included).
    pub fn build(&self) -> Result<TimeGrid, Error> {
        if self.epochs.len() < 3 {
            return Err(Error::MalformedInput(MalformedInput::NotEnoughEpochs(
                self.epochs.len(),
            )));
        }
        let (t0, t1, t2) = (self.epochs[0], self.epochs[1], self.epochs[2]);
        let tn = self.epochs[self.epochs.len() - 1];

        let interval = std::cmp::max(self.min_interval, std::cmp::min(t1 - t0, t2 - t1));
        if interval <= Duration::ZERO {
            return Err(Error::MalformedInput(MalformedInput::NonChronological(t2)));
        }
        // an epoch already on the interval starts the grid
        let floored = t0.floor(interval);
        let start = if floored == t0 {
            t0
        } else {
            floored + interval
        };

        let grid = TimeGrid::new(start, tn, interval);
        if grid.is_empty() {
            return Err(Error::MalformedInput(MalformedInput::NonChronological(tn)));
        }
        debug!(
            "time grid: {:?} - {:?} every {} ({} epochs)",
            start,
            tn,
            interval,
            grid.len()
        );
        Ok(grid)
    }
}
