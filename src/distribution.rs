//! Probability laws for the uncertain dose tolerances.
//!
//! Every law exposes its cdf and the two integrals of it that the
//! separation oracle and the cut builder consume:
//!
//! `int_to(T)     = ∫_{-∞}^{T} cdf(s) ds   = E[max(0, T - θ)]`
//! `int_to_inf(T) = ∫_{T}^{∞} 1 - cdf(s) ds = E[max(0, θ - T)]`

use crate::error::{Error, Result};
use crate::utils;
use serde::Deserialize;

pub trait Distribution: Send + Sync {
    fn cdf(&self, t: f64) -> f64;

    fn int_to(&self, t: f64) -> f64;

    fn int_to_inf(&self, t: f64) -> f64;

    /// Candidate thresholds spanning the effective support of the law.
    fn threshold_range(&self, n: usize) -> Vec<f64>;

    /// Candidate thresholds over a broader interval than
    /// [`Distribution::threshold_range`]. Laws without a natural wider
    /// interval fall back to the nominal one.
    fn wide_threshold_range(&self, n: usize) -> Vec<f64> {
        self.threshold_range(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    a: f64,
    b: f64,
}

impl Uniform {
    pub fn new(a: f64, b: f64) -> Result<Self> {
        if !(a.is_finite() && b.is_finite()) || !(b > a) {
            return Err(Error::InvalidParameter(format!(
                "uniform upper bound must be greater than the lower bound ({a}, {b})"
            )));
        }
        Ok(Self { a, b })
    }

    pub fn lower(&self) -> f64 {
        self.a
    }

    pub fn upper(&self) -> f64 {
        self.b
    }
}

impl Distribution for Uniform {
    fn cdf(&self, t: f64) -> f64 {
        if t <= self.a {
            0.0
        } else if t < self.b {
            (t - self.a) / (self.b - self.a)
        } else {
            1.0
        }
    }

    fn int_to(&self, t: f64) -> f64 {
        let width = self.b - self.a;
        if t <= self.a {
            0.0
        } else if t < self.b {
            0.5 * (t - self.a) * (t - self.a) / width
        } else {
            0.5 * width + (t - self.b)
        }
    }

    fn int_to_inf(&self, t: f64) -> f64 {
        let width = self.b - self.a;
        if t >= self.b {
            0.0
        } else if t > self.a {
            0.5 * (self.b - t) * (self.b - t) / width
        } else {
            0.5 * width + (self.a - t)
        }
    }

    fn threshold_range(&self, n: usize) -> Vec<f64> {
        utils::linspace(self.a, self.b, n)
    }

    fn wide_threshold_range(&self, n: usize) -> Vec<f64> {
        let width = self.b - self.a;
        utils::linspace(self.a - width, self.b + width, n)
    }
}

/// A deterministic tolerance: all the mass sits at `t0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jump {
    t0: f64,
}

impl Jump {
    pub fn new(t0: f64) -> Result<Self> {
        if !t0.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "jump threshold must be finite ({t0})"
            )));
        }
        Ok(Self { t0 })
    }

    pub fn threshold(&self) -> f64 {
        self.t0
    }
}

impl Distribution for Jump {
    fn cdf(&self, t: f64) -> f64 {
        if t < self.t0 {
            0.0
        } else {
            1.0
        }
    }

    fn int_to(&self, t: f64) -> f64 {
        (t - self.t0).max(0.0)
    }

    fn int_to_inf(&self, t: f64) -> f64 {
        (self.t0 - t).max(0.0)
    }

    fn threshold_range(&self, n: usize) -> Vec<f64> {
        utils::linspace(0.0, 3.0 * self.t0, n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub t: f64,
    pub cdf: f64,
}

/// A law whose cdf is linear between consecutive breakpoints. The first
/// breakpoint must carry cdf 0 and the last one cdf 1, so both integrals
/// stay finite.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseLinear {
    breakpoints: Vec<Breakpoint>,
}

impl PiecewiseLinear {
    pub fn new(breakpoints: Vec<Breakpoint>) -> Result<Self> {
        if breakpoints.len() < 2 {
            return Err(Error::InvalidParameter(
                "piecewise linear law needs at least two breakpoints"
                    .to_string(),
            ));
        }
        for point in breakpoints.iter() {
            if !point.t.is_finite() || !(0.0..=1.0).contains(&point.cdf) {
                return Err(Error::InvalidParameter(format!(
                    "invalid breakpoint ({}, {})",
                    point.t, point.cdf
                )));
            }
        }
        for pair in breakpoints.windows(2) {
            if !(pair[1].t > pair[0].t) || pair[1].cdf < pair[0].cdf {
                return Err(Error::InvalidParameter(format!(
                    "breakpoints must increase: ({}, {}) -> ({}, {})",
                    pair[0].t, pair[0].cdf, pair[1].t, pair[1].cdf
                )));
            }
        }
        let first = breakpoints[0];
        let last = breakpoints[breakpoints.len() - 1];
        if first.cdf != 0.0 || last.cdf != 1.0 {
            return Err(Error::InvalidParameter(format!(
                "cdf must go from 0 to 1, got {} to {}",
                first.cdf, last.cdf
            )));
        }
        Ok(Self { breakpoints })
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    fn first(&self) -> Breakpoint {
        self.breakpoints[0]
    }

    fn last(&self) -> Breakpoint {
        self.breakpoints[self.breakpoints.len() - 1]
    }
}

/// Area of the trapezoid under a linear function between two points.
fn trapezoid(t0: f64, f0: f64, t1: f64, f1: f64) -> f64 {
    0.5 * (f0 + f1) * (t1 - t0)
}

impl Distribution for PiecewiseLinear {
    fn cdf(&self, t: f64) -> f64 {
        let first = self.first();
        let last = self.last();
        if t <= first.t {
            return first.cdf;
        }
        if t >= last.t {
            return last.cdf;
        }
        for pair in self.breakpoints.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            if right.t > t {
                let slope = (right.cdf - left.cdf) / (right.t - left.t);
                return left.cdf + slope * (t - left.t);
            }
        }
        last.cdf
    }

    fn int_to(&self, t: f64) -> f64 {
        let first = self.first();
        if t <= first.t {
            return 0.0;
        }
        let mut area = 0.0;
        for pair in self.breakpoints.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            if right.t > t {
                // partial segment, then stop
                return area + trapezoid(left.t, left.cdf, t, self.cdf(t));
            }
            area += trapezoid(left.t, left.cdf, right.t, right.cdf);
        }
        let last = self.last();
        area + last.cdf * (t - last.t)
    }

    fn int_to_inf(&self, t: f64) -> f64 {
        let last = self.last();
        if t >= last.t {
            return 0.0;
        }
        let first = self.first();
        let mut area = 0.0;
        for pair in self.breakpoints.windows(2).rev() {
            let (left, right) = (pair[0], pair[1]);
            if left.t < t {
                return area
                    + trapezoid(t, 1.0 - self.cdf(t), right.t, 1.0 - right.cdf);
            }
            area += trapezoid(left.t, 1.0 - left.cdf, right.t, 1.0 - right.cdf);
        }
        area + (1.0 - first.cdf) * (first.t - t)
    }

    fn threshold_range(&self, n: usize) -> Vec<f64> {
        utils::linspace(self.first().t, self.last().t, n)
    }
}

/// Input description of a law, as found in `problem.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionInput {
    Uniform { lower: f64, upper: f64 },
    Jump { threshold: f64 },
    PiecewiseLinear { breakpoints: Vec<(f64, f64)> },
}

impl DistributionInput {
    pub fn build(&self) -> Result<Box<dyn Distribution>> {
        match self {
            DistributionInput::Uniform { lower, upper } => {
                Ok(Box::new(Uniform::new(*lower, *upper)?))
            }
            DistributionInput::Jump { threshold } => {
                Ok(Box::new(Jump::new(*threshold)?))
            }
            DistributionInput::PiecewiseLinear { breakpoints } => {
                let breakpoints = breakpoints
                    .iter()
                    .map(|&(t, cdf)| Breakpoint { t, cdf })
                    .collect();
                Ok(Box::new(PiecewiseLinear::new(breakpoints)?))
            }
        }
    }
}
