/*
    Krotov-core, a Krotov's method optimal-control core
    Copyright (C) 2021 Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::control::ControlId;
use crate::errors::KrotovError;

/// A strictly increasing sequence of times `t_0 < t_1 < ... < t_{N_T}`.
///
/// `n_intervals()` is `N_T`; "midpoint of interval n" (1-indexed, as in
/// this crate) is `(t[n-1] + t[n]) / 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    t: Vec<f64>,
}

impl TimeGrid {
    pub fn new(t: Vec<f64>) -> Result<Self, KrotovError> {
        if t.len() < 2 || !t.windows(2).all(|w| w[1] > w[0]) {
            return Err(KrotovError::InvalidTimeGrid);
        }
        Ok(Self { t })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.t
    }

    pub fn n_intervals(&self) -> usize {
        self.t.len() - 1
    }

    /// Midpoint of interval `n`, 1-indexed: `n` runs `1..=n_intervals()`.
    pub fn midpoint(&self, n: usize) -> f64 {
        (self.t[n - 1] + self.t[n]) / 2.0
    }

    pub fn dt(&self, n: usize) -> f64 {
        self.t[n] - self.t[n - 1]
    }

    pub fn t0(&self) -> f64 {
        self.t[0]
    }

    pub fn t_final(&self) -> f64 {
        self.t[self.t.len() - 1]
    }
}

/// One control's discretised values, one real number per interval.
pub type Pulse = Vec<f64>;

/// The guess value of one control attached to a trajectory's generator:
/// either a continuous callable (sampled at grid midpoints) or an
/// already-discretised sequence, i.e. the two input shapes C1 accepts.
#[derive(Clone)]
pub enum GuessControl {
    Callable(std::sync::Arc<dyn Fn(f64) -> f64 + Send + Sync>),
    Discretized(Vec<f64>),
}

impl GuessControl {
    pub fn discretize(
        &self,
        control_id: ControlId,
        grid: &TimeGrid,
    ) -> Result<Pulse, KrotovError> {
        match self {
            GuessControl::Callable(f) => Ok(PulseDiscretizer::from_callable(|t| f(t), grid)),
            GuessControl::Discretized(values) => {
                PulseDiscretizer::from_discretized(control_id, values, grid)
            }
        }
    }
}

/// Converts a continuous control (callable of `t`) or an already
/// discretised sequence into an owned pulse of length `N_T`, evaluated
/// on the grid's interval midpoints.
pub struct PulseDiscretizer;

impl PulseDiscretizer {
    /// Evaluates `control` at every interval midpoint of `grid`.
    pub fn from_callable(control: impl Fn(f64) -> f64, grid: &TimeGrid) -> Pulse {
        (1..=grid.n_intervals()).map(|n| control(grid.midpoint(n))).collect()
    }

    /// Adopts an already-discretised sequence. A sequence of length
    /// `N_T` is copied as-is; a sequence of length `N_T + 1` (one value
    /// per grid point rather than per interval) is midpoint-averaged
    /// down to `N_T` values. Any other length is a configuration error.
    pub fn from_discretized(
        control_id: ControlId,
        values: &[f64],
        grid: &TimeGrid,
    ) -> Result<Pulse, KrotovError> {
        let n_t = grid.n_intervals();
        if values.len() == n_t {
            Ok(values.to_vec())
        } else if values.len() == n_t + 1 {
            Ok((0..n_t).map(|i| 0.5 * (values[i] + values[i + 1])).collect())
        } else {
            Err(KrotovError::PulseLengthMismatch(control_id, values.len(), n_t, n_t + 1))
        }
    }
}
