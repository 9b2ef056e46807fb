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

//! `krotov-core` is the iteration core of an optimal-control optimizer
//! based on Krotov's method: given a set of trajectories that share a
//! common set of time-dependent controls, it refines those controls to
//! minimise a user-supplied final-time functional plus a running-cost
//! penalty on the pulse update.
//!
//! The propagator, the generator/Hamiltonian representation, the
//! final-time functional, and the optimisation hooks are all external
//! collaborators behind traits or closures; this crate owns the
//! iteration choreography, the workspace, and the result record.
//!
//! Entry point: [`optimize_krotov`], fed an [`OptimizeOptions`].

pub mod control;
pub mod errors;
pub mod operator;
pub mod options;
pub mod parametrization;
pub mod propagator;
pub mod pulse;
pub mod result;
pub mod storage;
pub mod trajectory;

mod driver;
mod iteration;
mod reporter;
mod workspace;

pub use control::{ControlId, ControlRegistry};
pub use driver::optimize_krotov;
pub use errors::KrotovError;
pub use operator::{inner_product, AffineGenerator, ControlDerivative, Generator, MatrixOperator, Operator, State};
pub use options::{
    ChiFn, CheckConvergenceFn, InfoHookFn, JTFn, OptimizeOptions, PropagatorMethod, PulseOptionsEntry, UpdateHookFn,
};
pub use parametrization::{BoundedTanh, Identity, Parametrization};
pub use propagator::{ControlBindings, Direction, PropagatorHandle, PropagatorOptions, Rk4Propagator};
pub use pulse::{GuessControl, Pulse, PulseDiscretizer, TimeGrid};
pub use result::{IterationRecord, OptimizationResult};
pub use storage::TrajectoryStorage;
pub use trajectory::Trajectory;
pub use workspace::{ControlConfig, PulseBank, Workspace};
