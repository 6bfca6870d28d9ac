use nalgebra::{DMatrix, DVector};

use crate::interp::Interpolator;
use crate::prelude::Epoch;

/// Not-a-knot cubic spline.
/// The third derivative is continuous across the second and
/// the second to last knots, which removes M_0 and M_n-1 from the system.
#[derive(Debug, Clone)]
pub struct CubicInterpolator {
    buffer: Vec<(Epoch, f64)>,
    /// Knot abscissa, in seconds since the first sample
    x: Vec<f64>,
    /// Second derivatives at the knots
    m: Vec<f64>,
}

impl CubicInterpolator {
    /// Solves the spline system, at least 4 knots
    fn second_derivatives(x: &[f64], y: &[f64]) -> Option<Vec<f64>> {
        let n = x.len();
        let h = x.windows(2).map(|w| w[1] - w[0]).collect::<Vec<_>>();
        if h.iter().any(|h| *h <= 0.0) {
            return None;
        }
        let d = (0..n - 1)
            .map(|i| (y[i + 1] - y[i]) / h[i])
            .collect::<Vec<_>>();

        // unknowns: M_1 ..= M_n-2
        let size = n - 2;
        let mut a = DMatrix::<f64>::zeros(size, size);
        let mut b = DVector::<f64>::zeros(size);

        for row in 0..size {
            let i = row + 1;
            b[row] = 6.0 * (d[i] - d[i - 1]);
            if row > 0 {
                a[(row, row - 1)] = h[i - 1];
            }
            a[(row, row)] = 2.0 * (h[i - 1] + h[i]);
            if row + 1 < size {
                a[(row, row + 1)] = h[i];
            }
        }

        // M_0 = M_1 (1 + h0/h1) - M_2 h0/h1
        let (h0, h1) = (h[0], h[1]);
        a[(0, 0)] = (h0 + h1) * (h0 + 2.0 * h1) / h1;
        a[(0, 1)] = (h1 * h1 - h0 * h0) / h1;

        // M_n-1 = M_n-2 (1 + hb/ha) - M_n-3 hb/ha
        let (ha, hb) = (h[n - 3], h[n - 2]);
        a[(size - 1, size - 2)] = (ha * ha - hb * hb) / ha;
        a[(size - 1, size - 1)] = (ha + hb) * (2.0 * ha + hb) / ha;

        let inner = a.lu().solve(&b)?;

        let mut m = Vec::with_capacity(n);
        m.push(inner[0] * (1.0 + h0 / h1) - inner[1] * h0 / h1);
        m.extend(inner.iter());
        m.push(inner[size - 1] * (1.0 + hb / ha) - inner[size - 2] * hb / ha);
        Some(m)
    }
}

impl Interpolator for CubicInterpolator {
    fn new(samples: Vec<(Epoch, f64)>) -> Option<Self> {
        if samples.len() < 4 {
            return None;
        }
        let (t0, _) = samples[0];
        let x = samples
            .iter()
            .map(|(t, _)| (*t - t0).to_seconds())
            .collect::<Vec<_>>();
        let y = samples.iter().map(|(_, y)| *y).collect::<Vec<_>>();
        let m = Self::second_derivatives(&x, &y)?;
        Some(Self {
            buffer: samples,
            x,
            m,
        })
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
        let (t0, _) = self.buffer[0];
        let x = (x_s - t0).to_seconds();
        let (x_i, x_j) = (self.x[i], self.x[i + 1]);
        let (y_i, y_j) = (self.buffer[i].1, self.buffer[i + 1].1);
        let (m_i, m_j) = (self.m[i], self.m[i + 1]);
        let h = x_j - x_i;
        let (l, r) = (x_j - x, x - x_i);
        Some(
            m_i * l.powi(3) / (6.0 * h)
                + m_j * r.powi(3) / (6.0 * h)
                + (y_i / h - m_i * h / 6.0) * l
                + (y_j / h - m_j * h / 6.0) * r,
        )
    }
}
