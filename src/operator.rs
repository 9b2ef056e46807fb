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

use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use std::sync::Arc;

/// A complex amplitude vector of runtime-determined dimension.
pub type State = DVector<Complex<f64>>;

/// Any linear operator acting on a [`State`].
///
/// This is the seam at which a dense-matrix representation and a
/// matrix-free (e.g. sparse, or analytically-applied) representation
/// are interchangeable; the core only ever calls `apply`.
pub trait Operator: Send + Sync {
    fn apply(&self, psi: &State) -> State;
}

/// A dense-matrix operator, the default concrete [`Operator`].
#[derive(Debug, Clone)]
pub struct MatrixOperator(pub DMatrix<Complex<f64>>);

impl Operator for MatrixOperator {
    fn apply(&self, psi: &State) -> State {
        &self.0 * psi
    }
}

/// The time-dependent generator `G(t; eps_1 .. eps_L)` of a trajectory.
///
/// For Schrödinger-type dynamics this is `-i H(t; eps)`; the sign
/// convention is the caller's responsibility, the core only ever asks
/// for `apply` and `adjoint`.
pub trait Generator: Send + Sync {
    /// Evaluates `G(t; eps) psi`. `control_values` carries one value per
    /// control known to this generator, indexed in the order given by
    /// [`Generator::control_ids`].
    fn apply(&self, t: f64, control_values: &[f64], psi: &State) -> State;

    /// The controls that act on this trajectory's generator.
    fn control_ids(&self) -> &[crate::control::ControlId];

    /// The generator whose forward propagation is used by the backward
    /// sweep (the Krotov "adjoint trajectory"). For anti-Hermitian
    /// generators (the Schrödinger case) this is typically `self`
    /// again; for dissipative (Lindblad-type) generators it must return
    /// the true adjoint superoperator.
    fn adjoint(&self) -> Arc<dyn Generator>;
}

/// A dense-matrix, possibly control-dependent generator:
/// `G(t; eps) = drift + sum_l eps_l * couplings[l]`.
///
/// This is the concrete `Generator` used throughout the test scenarios;
/// it is intentionally simple (affine in the controls) since the
/// two-level-system test scenarios require nothing richer.
pub struct AffineGenerator {
    drift: DMatrix<Complex<f64>>,
    couplings: Vec<DMatrix<Complex<f64>>>,
    control_ids: Vec<crate::control::ControlId>,
}

impl AffineGenerator {
    pub fn new(
        drift: DMatrix<Complex<f64>>,
        couplings: Vec<(crate::control::ControlId, DMatrix<Complex<f64>>)>,
    ) -> Arc<Self> {
        let (control_ids, couplings) = couplings.into_iter().unzip();
        Arc::new(Self {
            drift,
            couplings,
            control_ids,
        })
    }
}

impl Generator for AffineGenerator {
    fn apply(&self, _t: f64, control_values: &[f64], psi: &State) -> State {
        let mut out = &self.drift * psi;
        for (eps, coupling) in control_values.iter().zip(self.couplings.iter()) {
            out += coupling * psi * Complex::new(*eps, 0.0);
        }
        out
    }

    fn control_ids(&self) -> &[crate::control::ControlId] {
        &self.control_ids
    }

    fn adjoint(&self) -> Arc<dyn Generator> {
        Arc::new(Self {
            drift: self.drift.clone(),
            couplings: self.couplings.clone(),
            control_ids: self.control_ids.clone(),
        })
    }
}

/// The control-derivative `d(G)/d(eps_l)` of a trajectory's generator,
/// tagged as a small enum so dispatch happens once in the
/// iteration engine's inner loop rather than through dynamic lookup.
#[derive(Clone)]
pub enum ControlDerivative {
    /// Control `l` does not act on this trajectory.
    Absent,
    /// A constant operator, materialised as a dense matrix.
    ConstantMatrix(DMatrix<Complex<f64>>),
    /// A constant operator given as an opaque [`Operator`] (e.g. matrix-free).
    ConstantOperator(Arc<dyn Operator>),
    /// A time-dependent operator; re-evaluated every time it is applied,
    /// substituting the *other* controls' current values at that interval
    /// (the generator's control-evaluation interface).
    TimeDependent(Arc<dyn Fn(f64, &[f64]) -> Arc<dyn Operator> + Send + Sync>),
}

impl ControlDerivative {
    /// Applies `mu_{k,l}` at time `t` with the trajectory's other control
    /// values `control_values`, or returns `None` if `Absent`.
    pub fn apply_at(&self, t: f64, control_values: &[f64], psi: &State) -> Option<State> {
        match self {
            ControlDerivative::Absent => None,
            ControlDerivative::ConstantMatrix(m) => Some(m * psi),
            ControlDerivative::ConstantOperator(op) => Some(op.apply(psi)),
            ControlDerivative::TimeDependent(f) => Some(f(t, control_values).apply(psi)),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ControlDerivative::Absent)
    }
}

impl std::fmt::Debug for ControlDerivative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlDerivative::Absent => write!(f, "ControlDerivative::Absent"),
            ControlDerivative::ConstantMatrix(_) => write!(f, "ControlDerivative::ConstantMatrix(..)"),
            ControlDerivative::ConstantOperator(_) => write!(f, "ControlDerivative::ConstantOperator(..)"),
            ControlDerivative::TimeDependent(_) => write!(f, "ControlDerivative::TimeDependent(..)"),
        }
    }
}

/// The complex inner product `<a|b> = sum_i conj(a_i) * b_i`.
pub fn inner_product(a: &State, b: &State) -> Complex<f64> {
    a.iter().zip(b.iter()).map(|(ai, bi)| ai.conj() * bi).sum()
}
