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
use thiserror::Error;

/// All errors which may be returned by this crate.
///
/// Configuration errors abort before iteration 0;
/// runtime and hook errors propagate unchanged out of `optimize_krotov`,
/// and the partially populated `OptimizationResult` is not considered
/// valid in that case.
#[derive(Error, Debug)]
pub enum KrotovError {
    /// A control appears in some trajectory's control list but has no
    /// entry in a caller-supplied `pulse_options` mapping.
    #[error("control {0:?} has no entry in the supplied pulse_options mapping")]
    MissingPulseOptions(ControlId),

    /// The supplied `tlist` does not strictly increase, or has fewer
    /// than two points (no intervals).
    #[error("tlist must be strictly increasing and contain at least two points")]
    InvalidTimeGrid,

    /// A discretised pulse's length did not match N_T (or N_T+1).
    #[error("pulse for control {0:?} has length {1}, expected {2} (or {3})")]
    PulseLengthMismatch(ControlId, usize, usize, usize),

    /// The requested propagator method could not be resolved for a trajectory.
    #[error("could not resolve a propagator method for trajectory {0}")]
    UnresolvedPropagatorMethod(usize),

    /// A control value left the propagator's declared range.
    #[error("control {0:?} left its declared range at interval {1}: {2}")]
    ControlOutOfRange(ControlId, usize, f64),

    /// The propagator reported a failure while stepping or reinitialising.
    #[error("propagator failure for trajectory {0}: {1}")]
    PropagationFailed(usize, String),

    /// A user-supplied hook (`update_hook`, `info_hook`, `check_convergence`,
    /// `J_T`, `chi`) raised an error; it is surfaced unchanged.
    #[error("hook error: {0}")]
    HookFailed(String),
}
