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
use crate::options::{OptimizeOptions, PropagatorMethod};
use crate::parametrization::{Identity, Parametrization};
use crate::propagator::{PropagatorHandle, PropagatorOptions, Rk4Propagator};
use crate::pulse::{Pulse, TimeGrid};
use crate::storage::TrajectoryStorage;
use crate::trajectory::Trajectory;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// One control's materialised configuration: step-size inverse, update
/// shape (discretised `S_l(t)`), and parametrization.
#[derive(Clone)]
pub struct ControlConfig {
    pub lambda_a: f64,
    pub update_shape: Pulse,
    pub parametrization: Arc<dyn Parametrization>,
    pub is_parametrised: bool,
}

/// The alternating pulse buffers `eps^(i)` / `eps^(i+1)`. Modelled as a
/// two-element ring of owned arrays; swapping exchanges which index is
/// "current" rather than copying. Each control's array is an `Arc<RwLock<..>>` shared
/// directly with whichever propagators are bound to it: rebinding is an
/// `Arc` clone, and a write the engine makes through `write_value` is
/// visible to a propagator already mid-sweep without re-rebinding,
/// which is what lets the forward sweep update `eps` at interval `n`
/// and immediately step the propagator across that same interval.
pub struct PulseBank {
    banks: [HashMap<ControlId, Arc<RwLock<Vec<f64>>>>; 2],
    current: usize,
}

impl PulseBank {
    fn new(guess: HashMap<ControlId, Pulse>) -> Self {
        let bank: HashMap<ControlId, Arc<RwLock<Vec<f64>>>> = guess
            .into_iter()
            .map(|(c, v)| (c, Arc::new(RwLock::new(v))))
            .collect();
        let other: HashMap<ControlId, Arc<RwLock<Vec<f64>>>> = bank
            .iter()
            .map(|(&c, v)| (c, Arc::new(RwLock::new(v.read().expect("pulse lock poisoned").clone()))))
            .collect();
        Self {
            banks: [bank, other],
            current: 0,
        }
    }

    /// The read buffer, `eps^(i)`: what the engine reads the guess from.
    pub fn read(&self) -> &HashMap<ControlId, Arc<RwLock<Vec<f64>>>> {
        &self.banks[self.current]
    }

    /// The write buffer, `eps^(i+1)`: what the engine writes the update into.
    pub fn write_bank(&self) -> &HashMap<ControlId, Arc<RwLock<Vec<f64>>>> {
        &self.banks[1 - self.current]
    }

    pub fn write_value(&mut self, control: ControlId, n: usize, value: f64) {
        let w = 1 - self.current;
        let arc = self.banks[w]
            .get(&control)
            .expect("control missing from pulse bank");
        arc.write().expect("pulse lock poisoned")[n - 1] = value;
    }

    /// After an iteration completes, the buffer that was written becomes
    /// the buffer that will be read next. The forward sweep
    /// writes every `(n, l)` each iteration, so the buffer left behind
    /// needs no re-seeding before it is written into again.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    pub fn read_as_plain(&self) -> HashMap<ControlId, Pulse> {
        self.read()
            .iter()
            .map(|(&c, v)| (c, v.read().expect("pulse lock poisoned").clone()))
            .collect()
    }
}

/// Aggregates everything one Krotov iteration needs: trajectories and
/// their adjoints, the alternating pulse buffers, the running-cost
/// integrals, per-control configuration, storages, and propagator
/// handles.
pub struct Workspace {
    pub grid: Arc<TimeGrid>,
    pub trajectories: Vec<Trajectory>,
    pub adjoints: Vec<Trajectory>,
    pub controls: Vec<ControlId>,
    pub control_config: HashMap<ControlId, ControlConfig>,
    pub pulses: PulseBank,
    pub g_a_int: HashMap<ControlId, f64>,
    pub(crate) forward_storage: Vec<TrajectoryStorage>,
    pub(crate) backward_storage: Vec<TrajectoryStorage>,
    pub(crate) forward_props: Vec<Box<dyn PropagatorHandle>>,
    pub(crate) backward_props: Vec<Box<dyn PropagatorHandle>>,
    control_raw_ranges: HashMap<ControlId, (f64, f64)>,
    pub use_threads: bool,
}

impl Workspace {
    pub fn new(options: &OptimizeOptions) -> Result<Self, KrotovError> {
        let grid = Arc::new(TimeGrid::new(options.tlist.clone())?);
        let trajectories = options.trajectories.clone();
        let adjoints: Vec<Trajectory> = trajectories.iter().map(Trajectory::adjoint).collect();

        // Step 2: ordered union of controls across all trajectories.
        let mut controls = Vec::new();
        let mut seen = HashSet::new();
        for traj in &trajectories {
            for &c in traj.controls() {
                if seen.insert(c) {
                    controls.push(c);
                }
            }
        }
        controls.sort_by_key(ControlId::index);

        // Step 3: materialise per-control configuration.
        let mut control_config = HashMap::with_capacity(controls.len());
        if options.pulse_options.is_none() && !controls.is_empty() {
            log::warn!("no pulse_options supplied: defaulting every control to lambda_a = 1, S = 1, identity parametrization");
        }
        for &c in &controls {
            let entry = match &options.pulse_options {
                Some(map) => map.get(&c).cloned().ok_or(KrotovError::MissingPulseOptions(c))?,
                None => crate::options::PulseOptionsEntry::default_entry(),
            };
            let update_shape = entry.update_shape.discretize(c, &grid)?;
            let is_parametrised = entry.parametrization.is_some();
            let parametrization = entry
                .parametrization
                .clone()
                .unwrap_or_else(|| Arc::new(Identity));
            control_config.insert(
                c,
                ControlConfig {
                    lambda_a: entry.lambda_a,
                    update_shape,
                    parametrization,
                    is_parametrised,
                },
            );
        }

        // Step 4: initialise eps^(i) and eps^(i+1).
        let mut guess: HashMap<ControlId, Pulse> = HashMap::with_capacity(controls.len());
        for &c in &controls {
            let pulse = if let Some(prior) = &options.continue_from {
                prior
                    .optimized_controls
                    .get(&c)
                    .cloned()
                    .ok_or(KrotovError::MissingPulseOptions(c))?
            } else {
                let source = trajectories
                    .iter()
                    .chain(adjoints.iter())
                    .find_map(|t| t.guess_control(c));
                match source {
                    Some(g) => g.discretize(c, &grid)?,
                    None => {
                        log::warn!("control {c:?} has no guess pulse attached to any trajectory; defaulting to all-zero");
                        vec![0.0; grid.n_intervals()]
                    }
                }
            };
            guess.insert(c, pulse);
        }
        let control_raw_ranges = controls
            .iter()
            .map(|&c| {
                let p = &guess[&c];
                let max_abs = p.iter().cloned().fold(0.0_f64, |acc, v| acc.max(v.abs()));
                (c, (-max_abs, max_abs))
            })
            .collect();
        let pulses = PulseBank::new(guess);

        // Step 5: allocate storages.
        let n_len = grid.n_intervals() + 1;
        let forward_storage = trajectories.iter().map(|_| TrajectoryStorage::new(n_len)).collect();
        let backward_storage = trajectories.iter().map(|_| TrajectoryStorage::new(n_len)).collect();

        // Step 6 + 7: construct (piecewise) propagator handles per trajectory.
        let mut forward_props: Vec<Box<dyn PropagatorHandle>> = Vec::with_capacity(trajectories.len());
        let mut backward_props: Vec<Box<dyn PropagatorHandle>> = Vec::with_capacity(trajectories.len());
        for (k, (traj, adj)) in trajectories.iter().zip(adjoints.iter()).enumerate() {
            resolve_method(
                options.fw_prop_method.as_ref(),
                options.prop_method.as_ref(),
                traj.fw_prop_method.as_ref(),
                traj.prop_method.as_ref(),
                k,
            )?;
            resolve_method(
                options.bw_prop_method.as_ref(),
                options.prop_method.as_ref(),
                traj.bw_prop_method.as_ref(),
                traj.prop_method.as_ref(),
                k,
            )?;
            forward_props.push(Box::new(Rk4Propagator::new(k, traj.generator.clone(), grid.clone())));
            backward_props.push(Box::new(Rk4Propagator::new(k, adj.generator.clone(), grid.clone())));
        }

        Ok(Self {
            grid,
            trajectories,
            adjoints,
            controls,
            control_config,
            pulses,
            g_a_int: HashMap::new(),
            forward_storage,
            backward_storage,
            forward_props,
            backward_props,
            control_raw_ranges,
            use_threads: options.use_threads,
        })
    }

    pub fn n_trajectories(&self) -> usize {
        self.trajectories.len()
    }

    /// Widened control-range options a propagator validates against
    /// `checks = true` (k=2) for the forward propagator, since
    /// it steps with the just-computed update; `checks = false` (k=5)
    /// for the backward propagator, which only ever re-plays the guess.
    pub fn propagator_options(&self, checks: bool) -> PropagatorOptions {
        PropagatorOptions::widen(&self.control_raw_ranges, checks)
    }

    pub fn reset_g_a_int(&mut self) {
        for &c in &self.controls {
            self.g_a_int.insert(c, 0.0);
        }
    }

    pub fn g_a_total(&self) -> f64 {
        self.g_a_int.values().sum()
    }
}

/// Resolves one direction's propagator method per workspace construction
/// step 6's precedence: caller-provided direction-specific option >
/// caller-provided general `prop_method` > trajectory-attached
/// direction-specific method > trajectory-attached general `prop_method`
/// > `Auto`.
fn resolve_method(
    caller_specific: Option<&PropagatorMethod>,
    caller_general: Option<&PropagatorMethod>,
    trajectory_specific: Option<&PropagatorMethod>,
    trajectory_general: Option<&PropagatorMethod>,
    trajectory_index: usize,
) -> Result<(), KrotovError> {
    let method = caller_specific
        .or(caller_general)
        .or(trajectory_specific)
        .or(trajectory_general)
        .cloned()
        .unwrap_or_default();
    match method {
        PropagatorMethod::Auto => Ok(()),
        PropagatorMethod::Named(name) if name.eq_ignore_ascii_case("rk4") => Ok(()),
        PropagatorMethod::Named(_) => Err(KrotovError::UnresolvedPropagatorMethod(trajectory_index)),
    }
}
