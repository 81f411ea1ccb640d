//! ISO 226:2003 equal-loudness contours.
//!
//! The standard tabulates 29 frequencies from 20 Hz to 12.5 kHz. Values in
//! between are interpolated.

use serde::{Deserialize, Serialize};

/// Number of frequencies in the ISO 226 tables.
pub const N_FREQUENCIES: usize = 29;

/// Tabulated frequencies in Hz.
pub const FREQUENCIES: [f64; N_FREQUENCIES] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 10000.0, 12500.0,
];

/// Exponent for loudness perception.
const ALPHA_F: [f64; N_FREQUENCIES] = [
    0.532, 0.506, 0.480, 0.455, 0.432, 0.409, 0.387, 0.367, 0.349, 0.330, 0.315, 0.301, 0.288,
    0.276, 0.267, 0.259, 0.253, 0.250, 0.246, 0.244, 0.243, 0.243, 0.243, 0.242, 0.242, 0.245,
    0.254, 0.271, 0.301,
];

/// Magnitude of the linear transfer function normalized at 1 kHz.
const L_U: [f64; N_FREQUENCIES] = [
    -31.6, -27.2, -23.0, -19.1, -15.9, -13.0, -10.3, -8.1, -6.2, -4.5, -3.1, -2.0, -1.1, -0.4,
    0.0, 0.3, 0.5, 0.0, -2.7, -4.1, -1.0, 1.7, 2.5, 1.2, -2.1, -7.1, -11.2, -10.7, -3.1,
];

/// Threshold of hearing.
const T_F: [f64; N_FREQUENCIES] = [
    78.5, 68.7, 59.5, 51.1, 44.0, 37.5, 31.5, 26.5, 22.1, 17.9, 14.4, 11.4, 8.6, 6.2, 4.4, 3.0,
    2.2, 2.4, 3.5, 1.7, -1.3, -4.2, -6.0, -5.4, -1.5, 6.0, 12.6, 13.9, 12.3,
];

/// Lowest frequency covered by the tables.
pub const MINIMUM_FREQUENCY: f64 = FREQUENCIES[0];

/// Highest frequency covered by the tables.
pub const MAXIMUM_FREQUENCY: f64 = FREQUENCIES[N_FREQUENCIES - 1];

/// Sound pressure level (dB SPL) at every tabulated frequency for a loudness
/// level in phon.
pub fn equal_loudness_contour(phon: f64) -> [f64; N_FREQUENCIES] {
    let mut spl = [0.0; N_FREQUENCIES];
    for i in 0..N_FREQUENCIES {
        let af = 4.47e-3 * (10f64.powf(0.025 * phon) - 1.15)
            + (0.4 * 10f64.powf((T_F[i] + L_U[i]) / 10.0 - 9.0)).powf(ALPHA_F[i]);
        spl[i] = (10.0 / ALPHA_F[i]) * af.log10() - L_U[i] + 94.0;
    }
    spl
}

/// How values between the tabulated frequencies are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Linear,
    #[default]
    CubicSpline,
}

/// Interpolated curve through a set of points with strictly increasing x.
#[derive(Debug, Clone)]
pub struct Curve {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots; empty for linear interpolation.
    second_derivatives: Vec<f64>,
}

impl Curve {
    pub fn new(xs: &[f64], ys: &[f64], interpolation: Interpolation) -> Self {
        let second_derivatives = match interpolation {
            Interpolation::Linear => Vec::new(),
            Interpolation::CubicSpline => natural_spline_second_derivatives(xs, ys),
        };
        Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            second_derivatives,
        }
    }

    /// Value at `x`. Outside the knots the first or last segment is extended.
    pub fn value_at(&self, x: f64) -> f64 {
        let n = self.xs.len();
        match n {
            0 => return 0.0,
            1 => return self.ys[0],
            _ => {}
        }
        let upper = self.xs.partition_point(|k| *k <= x).clamp(1, n - 1);
        let lower = upper - 1;
        let h = self.xs[upper] - self.xs[lower];
        let a = (self.xs[upper] - x) / h;
        let b = (x - self.xs[lower]) / h;
        let linear = a * self.ys[lower] + b * self.ys[upper];
        if self.second_derivatives.is_empty() {
            return linear;
        }
        let m = &self.second_derivatives;
        linear + ((a * a * a - a) * m[lower] + (b * b * b - b) * m[upper]) * h * h / 6.0
    }
}

/// Solves the tridiagonal system of a natural cubic spline (zero curvature at
/// both ends).
fn natural_spline_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];
    for i in 1..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        let rhs = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
        let diagonal = 2.0 * (h0 + h1);
        let denominator = diagonal - h0 * c_prime[i - 1];
        c_prime[i] = h1 / denominator;
        d_prime[i] = (rhs - h0 * d_prime[i - 1]) / denominator;
    }
    for i in (1..n - 1).rev() {
        m[i] = d_prime[i] - c_prime[i] * m[i + 1];
    }
    m
}
