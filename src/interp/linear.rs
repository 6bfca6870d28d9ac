use crate::interp::Interpolator;
use crate::prelude::Epoch;

/// Piecewise linear interpolator
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    buffer: Vec<(Epoch, f64)>,
}

impl Interpolator for LinearInterpolator {
    fn new(samples: Vec<(Epoch, f64)>) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }
        if samples.windows(2).any(|w| w[1].0 <= w[0].0) {
            return None;
        }
        Some(Self { buffer: samples })
    }
    fn len(&self) -> usize {
        self.buffer.len()
    }
    fn get(&self, idx: usize) -> Option<&(Epoch, f64)> {
        self.buffer.get(idx)
    }
    fn interpolate(&self, x_s: Epoch) -> Option<f64> {
        let i = match self.locate(x_s)? {
            Ok(known) => return Some(self.buffer[known].1),
            Err(i) => i,
        };
        let (before_x, before_y) = self.buffer[i];
        let (after_x, after_y) = self.buffer[i + 1];
        let dx = (after_x - before_x).to_seconds();
        let mut dy = (after_x - x_s).to_seconds() / dx * before_y;
        dy += (x_s - before_x).to_seconds() / dx * after_y;
        Some(dy)
    }
}

#[cfg(test)]
mod test {
    use super::LinearInterpolator;
    use crate::interp::Interpolator;
    use crate::prelude::Epoch;
    use std::str::FromStr;

    #[test]
    fn basic() {
        let samples = [
            ("2020-01-01T00:00:00 UTC", 1.0_f64),
            ("2020-01-01T00:00:30 UTC", 2.0_f64),
            ("2020-01-01T00:01:00 UTC", 3.0_f64),
        ]
        .iter()
        .map(|(t, y)| (Epoch::from_str(t).unwrap(), *y))
        .collect::<Vec<_>>();
        let interp = LinearInterpolator::new(samples).unwrap();

        for (x_s, expected) in [
            ("2020-01-01T00:00:15 UTC", Some(1.5)),
            ("2020-01-01T00:00:30 UTC", Some(2.0)),
            ("2020-01-01T00:01:00 UTC", Some(3.0)),
            ("2020-01-01T00:01:01 UTC", None),
            ("2019-12-31T23:59:59 UTC", None),
        ] {
            let x_s = Epoch::from_str(x_s).unwrap();
            assert_eq!(interp.interpolate(x_s), expected, "wrong result @{:?}", x_s);
        }
    }

    #[test]
    fn clock_offsets() {
        let samples = [
            ("2019-01-08T00:00:00 UTC", 0.391711350090E-04),
            ("2019-01-08T00:00:30 UTC", 0.391710317949E-04),
            ("2019-01-08T00:01:00 UTC", 0.391708385767E-04),
            ("2019-01-08T00:01:30 UTC", 0.391709678221E-04),
            ("2019-01-08T00:02:00 UTC", 0.391708653726E-04),
            ("2019-01-08T00:02:30 UTC", 0.391709273510E-04),
        ]
        .iter()
        .map(|(t, y)| (Epoch::from_str(t).unwrap(), *y))
        .collect::<Vec<_>>();
        let interp = LinearInterpolator::new(samples).unwrap();

        for (x_s, y_s) in [
            ("2019-01-08T00:02:30 UTC", 0.391709273510E-04),
            (
                "2019-01-08T00:01:33 UTC",
                27.0 / 30.0 * 0.391709678221E-04 + 3.0 / 30.0 * 0.391708653726E-04,
            ),
            (
                "2019-01-08T00:01:57 UTC",
                3.0 / 30.0 * 0.391709678221E-04 + 27.0 / 30.0 * 0.391708653726E-04,
            ),
        ] {
            let x_s = Epoch::from_str(x_s).unwrap();
            let y = interp.interpolate(x_s).unwrap();
            assert!((y - y_s).abs() < 1.0E-18, "wrong result @{:?}", x_s);
        }
    }

    #[test]
    fn rejects_unsorted_samples() {
        let samples = [
            ("2020-01-01T00:00:30 UTC", 1.0_f64),
            ("2020-01-01T00:00:00 UTC", 2.0_f64),
        ]
        .iter()
        .map(|(t, y)| (Epoch::from_str(t).unwrap(), *y))
        .collect::<Vec<_>>();
        assert!(LinearInterpolator::new(samples).is_none());
    }
}
