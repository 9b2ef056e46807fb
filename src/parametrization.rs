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

/// An optional bijection `epsilon <-> u` used to compute a pulse update
/// in a transformed coordinate.
///
/// Implementations must keep `eps_of_u(u_of_eps(e)) == e` to working
/// precision over the domain they are meant to be used on.
pub trait Parametrization: Send + Sync {
    fn u_of_eps(&self, eps: f64) -> f64;
    fn eps_of_u(&self, u: f64) -> f64;
    /// `d(epsilon)/d(u)` evaluated at `u`.
    fn deps_du(&self, u: f64) -> f64;
}

/// The default parametrization: `u = epsilon`, update is additive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Parametrization for Identity {
    #[inline]
    fn u_of_eps(&self, eps: f64) -> f64 {
        eps
    }

    #[inline]
    fn eps_of_u(&self, u: f64) -> f64 {
        u
    }

    #[inline]
    fn deps_du(&self, _u: f64) -> f64 {
        1.0
    }
}

/// Bounds `epsilon` to `(-eps_max, eps_max)` via `u = atanh(epsilon / eps_max)`.
///
/// Keeps a control within a hard
/// amplitude bound regardless of how large the raw update would be.
#[derive(Debug, Clone, Copy)]
pub struct BoundedTanh {
    pub eps_max: f64,
}

impl Parametrization for BoundedTanh {
    fn u_of_eps(&self, eps: f64) -> f64 {
        (eps / self.eps_max).atanh()
    }

    fn eps_of_u(&self, u: f64) -> f64 {
        self.eps_max * u.tanh()
    }

    fn deps_du(&self, u: f64) -> f64 {
        self.eps_max * (1.0 - u.tanh().powi(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_round_trips() {
        let p = Identity;
        assert_relative_eq!(p.eps_of_u(p.u_of_eps(0.37)), 0.37);
        assert_eq!(p.deps_du(0.0), 1.0);
    }

    #[test]
    fn bounded_tanh_round_trips_and_stays_in_bounds() {
        let p = BoundedTanh { eps_max: 0.5 };
        let eps = 0.3;
        let u = p.u_of_eps(eps);
        assert_relative_eq!(p.eps_of_u(u), eps, epsilon = 1e-10);
        for u in [-100.0, -1.0, 0.0, 1.0, 100.0] {
            let eps = p.eps_of_u(u);
            assert!(eps.abs() < p.eps_max);
        }
    }
}
