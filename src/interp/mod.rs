//! Gap interpolation over sparse, time tagged samples
mod cubic;
mod linear;

pub use cubic::CubicInterpolator;
pub use linear::LinearInterpolator;

use log::debug;

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::prelude::Epoch;
use crate::record::{is_missing, MISSING};

/// Interpolation method
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub enum Method {
    /// Not-a-knot cubic spline
    #[default]
    Cubic,
    /// Piecewise linear
    Linear,
}

impl Method {
    /// Minimal number of known samples this method needs
    pub fn min_samples(&self) -> usize {
        match self {
            Self::Cubic => 4,
            Self::Linear => 2,
        }
    }
}

pub(crate) trait Interpolator: Sized {
    /// Builds from chronologically sorted samples,
    /// None when the samples cannot support this interpolator.
    fn new(samples: Vec<(Epoch, f64)>) -> Option<Self>;
    fn len(&self) -> usize;
    fn get(&self, idx: usize) -> Option<&(Epoch, f64)>;
    fn first(&self) -> Option<&(Epoch, f64)> {
        self.get(0)
    }
    fn last(&self) -> Option<&(Epoch, f64)> {
        self.get(self.len().checked_sub(1)?)
    }
    /// Evaluates at `x_s`. Never extrapolates: None outside the known samples.
    fn interpolate(&self, x_s: Epoch) -> Option<f64>;
    /// Index `i` of the interval [x_i, x_i+1] containing `x_s`,
    /// or Ok(i) when `x_s` is the known sample x_i
    fn locate(&self, x_s: Epoch) -> Option<Result<usize, usize>> {
        let (first, _) = self.first()?;
        let (last, _) = self.last()?;
        if x_s < *first || x_s > *last {
            return None;
        }
        let (mut lo, mut hi) = (0, self.len() - 1);
        while lo <= hi {
            let mid = (lo + hi) / 2;
            let (x, _) = self.get(mid)?;
            if *x == x_s {
                return Some(Ok(mid));
            } else if *x < x_s {
                lo = mid + 1;
            } else if mid == 0 {
                break;
            } else {
                hi = mid - 1;
            }
        }
        Some(Err(lo.saturating_sub(1)))
    }
}

fn fill_with<I: Interpolator>(epochs: &[Epoch], series: &mut [f64], samples: Vec<(Epoch, f64)>) -> bool {
    let Some(interp) = I::new(samples) else {
        series.iter_mut().for_each(|y| *y = MISSING);
        return false;
    };
    for (t, y) in epochs.iter().zip(series.iter_mut()) {
        *y = interp.interpolate(*t).unwrap_or(MISSING);
    }
    true
}

/// Fills the gaps of this series, sampled at these `epochs`, in place.
/// Every known sample is kept as is, every epoch outside the known range
/// becomes [MISSING]. When the series does not hold enough known samples
/// for this [Method], it is entirely set to [MISSING].
/// Returns true when the series was interpolated.
pub fn fill(method: Method, epochs: &[Epoch], series: &mut [f64]) -> bool {
    let samples = epochs
        .iter()
        .zip(series.iter())
        .filter_map(|(t, y)| if is_missing(*y) { None } else { Some((*t, *y)) })
        .collect::<Vec<_>>();

    if samples.len() < method.min_samples() {
        debug!(
            "{} samples: not enough for {:?} interpolation",
            samples.len(),
            method
        );
        series.iter_mut().for_each(|y| *y = MISSING);
        return false;
    }

    match method {
        Method::Cubic => fill_with::<CubicInterpolator>(epochs, series, samples),
        Method::Linear => fill_with::<LinearInterpolator>(epochs, series, samples),
    }
}
