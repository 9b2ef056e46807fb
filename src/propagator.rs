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
use crate::operator::{Generator, State};
use crate::pulse::TimeGrid;
use num_complex::Complex;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A control's current pulse array, as bound into a propagator by
/// `rebind`. Shared (`Arc<RwLock<..>>`) with the workspace's
/// `PulseBank`: rebinding is an `Arc` clone (O(1) in the number of
/// controls), and a write made through the bank is immediately visible
/// to every propagator already bound to it, which is what lets the
/// forward sweep update `eps` at interval `n` and step the propagator
/// across that same interval without re-rebinding.
pub type ControlBindings = HashMap<ControlId, Arc<RwLock<Vec<f64>>>>;

/// Which end of the time grid a propagator instance steps from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// The widened, per-control allowable range the stepper validates pulse
/// values against. `checks = true` uses `k = 2`,
/// `checks = false` uses `k = 5`.
#[derive(Debug, Clone, Default)]
pub struct PropagatorOptions {
    pub control_ranges: HashMap<ControlId, (f64, f64)>,
}

impl PropagatorOptions {
    pub fn widen(raw_ranges: &HashMap<ControlId, (f64, f64)>, checks: bool) -> Self {
        let k = if checks { 2.0 } else { 5.0 };
        let control_ranges = raw_ranges
            .iter()
            .map(|(&c, &(eps_min, eps_max))| {
                let lo = eps_min.min(k * eps_min);
                let hi = eps_max.max(k * eps_max);
                (c, (lo, hi))
            })
            .collect();
        Self { control_ranges }
    }
}

/// The external contract a time propagator must satisfy (C3 of the core
/// spec): the core only reinitialises it, updates its bound control
/// values, and asks for single steps. Implementations are "piecewise":
/// control values are assumed constant across one time-grid interval.
pub trait PropagatorHandle: Send {
    /// Attaches the mapping control -> pulse array this handle reads from.
    fn rebind(&mut self, bindings: ControlBindings);

    /// Resets the propagator to step from `t0` (forward) or `t_{N_T}`
    /// (backward), starting at `psi_initial`.
    fn reinit(&mut self, psi_initial: &State, options: PropagatorOptions, direction: Direction);

    /// Advances one time-grid interval; the "current interval" is
    /// implicit in the handle (it decrements on backward steps).
    fn step(&mut self) -> Result<State, KrotovError>;

    /// Borrows the latest state.
    fn state(&self) -> &State;
}

/// A fixed-step, 4th-order Runge-Kutta propagator for
/// `dpsi/dt = G(t; eps) psi`, the crate's default concrete
/// `PropagatorHandle`. Control values are held piecewise-constant
/// (at the interval midpoint value) across each RK4 sub-step, matching
/// the piecewise, constant-within-an-interval control contract.
pub struct Rk4Propagator {
    trajectory_index: usize,
    generator: Arc<dyn Generator>,
    grid: Arc<TimeGrid>,
    control_order: Vec<ControlId>,
    bindings: ControlBindings,
    options: PropagatorOptions,
    state: State,
    direction: Direction,
    /// 1-indexed interval about to be stepped across next.
    next_interval: usize,
}

impl Rk4Propagator {
    pub fn new(trajectory_index: usize, generator: Arc<dyn Generator>, grid: Arc<TimeGrid>) -> Self {
        let control_order = generator.control_ids().to_vec();
        let dim = 0; // replaced on first reinit
        Self {
            trajectory_index,
            generator,
            grid,
            control_order,
            bindings: ControlBindings::new(),
            options: PropagatorOptions::default(),
            state: State::zeros(dim),
            direction: Direction::Forward,
            next_interval: 1,
        }
    }

    fn control_values_at(&self, n: usize) -> Vec<f64> {
        self.control_order
            .iter()
            .map(|c| {
                self.bindings
                    .get(c)
                    .map(|p| p.read().expect("pulse lock poisoned")[n - 1])
                    .unwrap_or(0.0)
            })
            .collect()
    }

    fn check_bounds(&self, n: usize, control_values: &[f64]) -> Result<(), KrotovError> {
        for (c, &eps) in self.control_order.iter().zip(control_values.iter()) {
            if let Some(&(lo, hi)) = self.options.control_ranges.get(c) {
                if eps < lo || eps > hi {
                    return Err(KrotovError::ControlOutOfRange(*c, n, eps));
                }
            }
        }
        Ok(())
    }

    fn rk4_step(&self, t: f64, dt: f64, eps: &[f64], psi: &State) -> State {
        let g = |t: f64, y: &State| self.generator.apply(t, eps, y);
        let k1 = g(t, psi);
        let k2 = g(t + dt / 2.0, &(psi + &k1 * Complex::new(dt / 2.0, 0.0)));
        let k3 = g(t + dt / 2.0, &(psi + &k2 * Complex::new(dt / 2.0, 0.0)));
        let k4 = g(t + dt, &(psi + &k3 * Complex::new(dt, 0.0)));
        psi + (&k1 + &k2 * Complex::new(2.0, 0.0) + &k3 * Complex::new(2.0, 0.0) + &k4) * Complex::new(dt / 6.0, 0.0)
    }
}

impl PropagatorHandle for Rk4Propagator {
    fn rebind(&mut self, bindings: ControlBindings) {
        self.bindings = bindings;
    }

    fn reinit(&mut self, psi_initial: &State, options: PropagatorOptions, direction: Direction) {
        self.state = psi_initial.clone();
        self.options = options;
        self.direction = direction;
        self.next_interval = match direction {
            Direction::Forward => 1,
            Direction::Backward => self.grid.n_intervals(),
        };
    }

    fn step(&mut self) -> Result<State, KrotovError> {
        let n = self.next_interval;
        let eps = self.control_values_at(n);
        self.check_bounds(n, &eps)?;
        let t_lo = self.grid.as_slice()[n - 1];
        let dt_mag = self.grid.dt(n);
        let (t_start, dt) = match self.direction {
            Direction::Forward => (t_lo, dt_mag),
            Direction::Backward => (t_lo + dt_mag, -dt_mag),
        };
        self.state = self.rk4_step(t_start, dt, &eps, &self.state);
        self.next_interval = match self.direction {
            Direction::Forward => n + 1,
            Direction::Backward => n.wrapping_sub(1),
        };
        Ok(self.state.clone())
    }

    fn state(&self) -> &State {
        &self.state
    }
}

impl std::fmt::Debug for Rk4Propagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rk4Propagator")
            .field("trajectory_index", &self.trajectory_index)
            .field("direction", &self.direction)
            .field("next_interval", &self.next_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlRegistry;
    use crate::operator::AffineGenerator;
    use nalgebra::DMatrix;

    #[test]
    fn free_evolution_conserves_norm() {
        let mut reg: ControlRegistry<&'static str> = ControlRegistry::new();
        let c0 = reg.intern("eps0");
        // G = -i * sigma_x (anti-hermitian), no control coupling needed for this check.
        let mut sx = DMatrix::<Complex<f64>>::zeros(2, 2);
        sx[(0, 1)] = Complex::new(0.0, -1.0);
        sx[(1, 0)] = Complex::new(0.0, -1.0);
        let gen = AffineGenerator::new(sx, vec![(c0, DMatrix::zeros(2, 2))]);
        let grid = Arc::new(TimeGrid::new((0..=200).map(|i| i as f64 * 0.01).collect()).unwrap());
        let mut prop = Rk4Propagator::new(0, gen, grid.clone());
        let pulse = Arc::new(RwLock::new(vec![0.0; grid.n_intervals()]));
        let mut bindings = ControlBindings::new();
        bindings.insert(c0, pulse);
        prop.rebind(bindings);
        let psi0 = State::from_vec(vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]);
        prop.reinit(&psi0, PropagatorOptions::default(), Direction::Forward);
        let mut last = psi0.clone();
        for _ in 0..grid.n_intervals() {
            last = prop.step().unwrap();
        }
        let norm: f64 = last.iter().map(|c| c.norm_sqr()).sum();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_control_is_reported() {
        let mut reg: ControlRegistry<&'static str> = ControlRegistry::new();
        let c0 = reg.intern("eps0");
        let gen = AffineGenerator::new(DMatrix::zeros(2, 2), vec![(c0, DMatrix::zeros(2, 2))]);
        let grid = Arc::new(TimeGrid::new(vec![0.0, 1.0]).unwrap());
        let mut prop = Rk4Propagator::new(0, gen, grid);
        let mut bindings = ControlBindings::new();
        bindings.insert(c0, Arc::new(RwLock::new(vec![100.0])));
        prop.rebind(bindings);
        let mut ranges = HashMap::new();
        ranges.insert(c0, (-1.0, 1.0));
        let psi0 = State::from_vec(vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]);
        prop.reinit(&psi0, PropagatorOptions { control_ranges: ranges }, Direction::Forward);
        assert!(prop.step().is_err());
    }
}
