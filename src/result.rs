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
use crate::operator::State;
use crate::pulse::Pulse;
use num_complex::Complex;
use std::collections::HashMap;
use std::time::SystemTime;

/// One free-form row returned by an `info_hook` and appended to
/// `OptimizationResult::records`.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iter: usize,
    pub fields: Vec<(String, f64)>,
}

/// Mutable accumulator of convergence data for one optimisation run
/// Created at construction, or adopted (and
/// re-seeded) when continuing a prior run; mutated once per iteration.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub tlist: Vec<f64>,
    pub iter_start: usize,
    pub iter_stop: usize,
    pub iter: usize,
    /// Wall-clock seconds of the most recently completed iteration.
    pub secs: f64,
    /// Per-trajectory complex overlaps, filled whenever the default
    /// `chi!` computes them against a target state (see SPEC_FULL.md
    /// Open Question 2).
    pub tau_values: Option<Vec<Complex<f64>>>,
    pub j_t: f64,
    pub j_t_prev: f64,
    /// `J_T + sum_l g_a_int[l]` as of the most recently reported
    /// iteration, kept so the progress reporter's `Delta J` does not have
    /// to guess at the previous iteration's running-cost sum.
    pub j_total: f64,
    pub j_total_prev: f64,
    pub guess_controls: HashMap<ControlId, Pulse>,
    pub optimized_controls: HashMap<ControlId, Pulse>,
    pub states: Vec<State>,
    pub start_local_time: SystemTime,
    pub end_local_time: Option<SystemTime>,
    pub records: Vec<IterationRecord>,
    pub converged: bool,
    pub message: String,
}

impl OptimizationResult {
    pub fn new(
        tlist: Vec<f64>,
        iter_start: usize,
        iter_stop: usize,
        guess_controls: HashMap<ControlId, Pulse>,
    ) -> Self {
        Self {
            tlist,
            iter_start,
            iter_stop,
            iter: iter_start,
            secs: 0.0,
            tau_values: None,
            j_t: f64::NAN,
            j_t_prev: f64::NAN,
            j_total: f64::NAN,
            j_total_prev: f64::NAN,
            optimized_controls: guess_controls.clone(),
            guess_controls,
            states: Vec::new(),
            start_local_time: SystemTime::now(),
            end_local_time: None,
            records: Vec::new(),
            converged: false,
            message: String::new(),
        }
    }

    /// Adopts `prior` as the starting point of a continued optimisation:
    /// the prior optimised controls become the new guess, `iter_start`
    /// resumes from `prior.iter`, and `iter_stop` is replaced by the
    /// caller's new value.
    pub fn continuing_from(prior: &OptimizationResult, iter_stop: usize) -> Self {
        let guess_controls = prior.optimized_controls.clone();
        Self {
            tlist: prior.tlist.clone(),
            iter_start: prior.iter,
            iter_stop,
            iter: prior.iter,
            secs: 0.0,
            tau_values: prior.tau_values.clone(),
            j_t: prior.j_t,
            j_t_prev: prior.j_t,
            j_total: prior.j_total,
            j_total_prev: prior.j_total,
            optimized_controls: guess_controls.clone(),
            guess_controls,
            states: prior.states.clone(),
            start_local_time: SystemTime::now(),
            end_local_time: None,
            records: Vec::new(),
            converged: false,
            message: String::new(),
        }
    }

    pub fn elapsed_total(&self) -> std::time::Duration {
        self.end_local_time
            .unwrap_or_else(SystemTime::now)
            .duration_since(self.start_local_time)
            .unwrap_or_default()
    }
}
