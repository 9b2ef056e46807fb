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
use crate::operator::State;
use crate::parametrization::Parametrization;
use crate::pulse::GuessControl;
use crate::result::{IterationRecord, OptimizationResult};
use crate::trajectory::Trajectory;
use crate::workspace::Workspace;
use num_complex::Complex;
use std::collections::HashMap;
use std::sync::Arc;
use typed_builder::TypedBuilder;

/// The final-time functional to minimise: `J_T(states, trajectories)`.
pub type JTFn = dyn Fn(&[State], &[Trajectory]) -> f64 + Send + Sync;

/// Fills `chi_out[k] = -dJ_T/d<phi_k|` given the trajectories' final
/// forward states `phi_t`. Returns per-trajectory overlaps when it
/// computed any (used to populate `OptimizationResult::tau_values`).
pub type ChiFn =
    dyn Fn(&mut [State], &[State], &[Trajectory]) -> Option<Vec<Complex<f64>>> + Send + Sync;

/// Called after each iteration's pulse update, before it is reported.
/// An `Err` aborts `optimize_krotov` with [`KrotovError::HookFailed`].
pub type UpdateHookFn = dyn FnMut(&mut Workspace, usize, &HashMap<ControlId, Vec<f64>>, &HashMap<ControlId, Vec<f64>>) -> Result<(), KrotovError>
    + Send;

/// Called once per reported iteration (including iteration 0) to build the
/// progress record, in place of [`crate::reporter::default_info_hook`]. An
/// `Err` aborts `optimize_krotov` with [`KrotovError::HookFailed`].
pub type InfoHookFn = dyn FnMut(&Workspace, usize, &HashMap<ControlId, Vec<f64>>, &HashMap<ControlId, Vec<f64>>) -> Result<Option<IterationRecord>, KrotovError>
    + Send;

/// Called after each iteration is reported; may set `result.converged` and
/// `result.message`. An `Err` aborts `optimize_krotov` with
/// [`KrotovError::HookFailed`].
pub type CheckConvergenceFn = dyn FnMut(&mut OptimizationResult) -> Result<(), KrotovError> + Send;

/// Which propagator method to use, resolved per the
/// caller/general/trajectory/auto precedence rule of workspace
/// construction step 6. Only `Auto` (mapping to the crate's built-in RK4
/// propagator) is resolvable by this crate; a `Named` value the crate
/// does not recognise is a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropagatorMethod {
    #[default]
    Auto,
    Named(String),
}

/// One control's entry in the `pulse_options` mapping.
#[derive(Clone)]
pub struct PulseOptionsEntry {
    pub lambda_a: f64,
    pub update_shape: GuessControl,
    pub parametrization: Option<Arc<dyn Parametrization>>,
}

impl PulseOptionsEntry {
    /// The default entry materialised (with a warning) when the caller
    /// supplies no `pulse_options` mapping at all: `lambda_a = 1`,
    /// `S ≡ 1`, identity parametrization.
    pub fn default_entry() -> Self {
        Self {
            lambda_a: 1.0,
            update_shape: GuessControl::Callable(Arc::new(|_t| 1.0)),
            parametrization: None,
        }
    }
}

/// The options bag accepted by [`crate::optimize_krotov`].
/// `trajectories`, `tlist`, and `j_t` are required; every other option
/// falls back to a documented default.
#[derive(TypedBuilder)]
pub struct OptimizeOptions {
    pub trajectories: Vec<Trajectory>,
    pub tlist: Vec<f64>,
    pub j_t: Arc<JTFn>,

    #[builder(default)]
    pub chi: Option<Arc<ChiFn>>,

    #[builder(default)]
    pub pulse_options: Option<HashMap<ControlId, PulseOptionsEntry>>,

    #[builder(default = 0)]
    pub iter_start: usize,

    #[builder(default = 5000)]
    pub iter_stop: usize,

    #[builder(default)]
    pub prop_method: Option<PropagatorMethod>,

    #[builder(default)]
    pub fw_prop_method: Option<PropagatorMethod>,

    #[builder(default)]
    pub bw_prop_method: Option<PropagatorMethod>,

    #[builder(default, setter(strip_option))]
    pub update_hook: Option<Box<UpdateHookFn>>,

    #[builder(default, setter(strip_option))]
    pub info_hook: Option<Box<InfoHookFn>>,

    #[builder(default, setter(strip_option))]
    pub check_convergence: Option<Box<CheckConvergenceFn>>,

    #[builder(default = false)]
    pub verbose: bool,

    #[builder(default = false)]
    pub skip_initial_forward_propagation: bool,

    #[builder(default)]
    pub continue_from: Option<OptimizationResult>,

    #[builder(default = false)]
    pub use_threads: bool,
}
