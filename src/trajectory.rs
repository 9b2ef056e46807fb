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
use crate::operator::{ControlDerivative, Generator, State};
use crate::options::PropagatorMethod;
use crate::pulse::GuessControl;
use std::collections::HashMap;
use std::sync::Arc;

/// An initial state, a time-dependent generator, and an optional target
/// state whose controls are to be co-optimised.
#[derive(Clone)]
pub struct Trajectory {
    pub initial_state: State,
    pub generator: Arc<dyn Generator>,
    pub target_state: Option<State>,
    control_derivatives: HashMap<ControlId, ControlDerivative>,
    guess_controls: HashMap<ControlId, GuessControl>,
    /// This trajectory's own propagator-method preference, consulted
    /// below the caller-supplied `prop_method`/`fw_prop_method`/
    /// `bw_prop_method` options in workspace construction step 6's
    /// precedence chain.
    pub prop_method: Option<PropagatorMethod>,
    pub fw_prop_method: Option<PropagatorMethod>,
    pub bw_prop_method: Option<PropagatorMethod>,
}

impl Trajectory {
    pub fn new(
        initial_state: State,
        generator: Arc<dyn Generator>,
        target_state: Option<State>,
        control_derivatives: HashMap<ControlId, ControlDerivative>,
        guess_controls: HashMap<ControlId, GuessControl>,
    ) -> Self {
        Self {
            initial_state,
            generator,
            target_state,
            control_derivatives,
            guess_controls,
            prop_method: None,
            fw_prop_method: None,
            bw_prop_method: None,
        }
    }

    /// Attaches this trajectory's own propagator-method preference,
    /// consulted when neither a caller-supplied `prop_method` nor a
    /// direction-specific caller override is given.
    pub fn with_prop_method(mut self, method: PropagatorMethod) -> Self {
        self.prop_method = Some(method);
        self
    }

    /// Attaches this trajectory's forward-propagator preference, taking
    /// precedence over `prop_method` (caller's or this trajectory's) for
    /// the forward propagator only.
    pub fn with_fw_prop_method(mut self, method: PropagatorMethod) -> Self {
        self.fw_prop_method = Some(method);
        self
    }

    /// Attaches this trajectory's backward-propagator preference, taking
    /// precedence over `prop_method` (caller's or this trajectory's) for
    /// the backward propagator only.
    pub fn with_bw_prop_method(mut self, method: PropagatorMethod) -> Self {
        self.bw_prop_method = Some(method);
        self
    }

    /// The guess value for `control` as attached to this trajectory's
    /// generator, if this trajectory is the one that defines it.
    pub fn guess_control(&self, control: ControlId) -> Option<&GuessControl> {
        self.guess_controls.get(&control)
    }

    /// The controls this trajectory's generator depends on.
    pub fn controls(&self) -> &[ControlId] {
        self.generator.control_ids()
    }

    /// `d(G)/d(eps_l)`, or `Absent` if `l` was never registered for this
    /// trajectory (control does not act on it).
    pub fn control_derivative(&self, control: ControlId) -> &ControlDerivative {
        self.control_derivatives
            .get(&control)
            .unwrap_or(&ControlDerivative::Absent)
    }

    /// Builds the adjoint trajectory used by the backward sweep: same
    /// controls and control derivatives, generator replaced by its
    /// adjoint. The adjoint's "initial state" is assigned per-iteration
    /// by the engine (it is `chi_T`, not a property of the trajectory
    /// itself), so it is left as the zero vector here.
    pub fn adjoint(&self) -> Trajectory {
        Trajectory {
            initial_state: State::zeros(self.initial_state.len()),
            generator: self.generator.adjoint(),
            target_state: None,
            control_derivatives: self.control_derivatives.clone(),
            guess_controls: HashMap::new(),
            prop_method: self.prop_method.clone(),
            fw_prop_method: self.fw_prop_method.clone(),
            bw_prop_method: self.bw_prop_method.clone(),
        }
    }
}

impl std::fmt::Debug for Trajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trajectory")
            .field("dim", &self.initial_state.len())
            .field("controls", &self.controls())
            .field("has_target", &self.target_state.is_some())
            .finish()
    }
}
