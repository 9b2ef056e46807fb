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

use crate::operator::State;

/// A time-indexed per-trajectory buffer of `N_T + 1` state snapshots.
///
/// Indices are 1-based, running `1..=N_T+1`, matching the
/// Data Model (index `n` corresponds to time `t_{n-1}`). Writes are
/// permitted in any order (the backward sweep writes `N_T+1` first and
/// fills inward); reads must only observe indices already written.
#[derive(Debug, Clone)]
pub struct TrajectoryStorage {
    slots: Vec<Option<State>>,
}

impl TrajectoryStorage {
    /// `len` is `N_T + 1`.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn write(&mut self, n: usize, psi: State) {
        self.slots[n - 1] = Some(psi);
    }

    /// Panics if index `n` has not yet been written; storage writes are
    /// expected to precede the corresponding read within one iteration
    /// so a missing write is a
    /// logic error in the engine, not a recoverable condition.
    pub fn read(&self, n: usize) -> &State {
        self.slots[n - 1]
            .as_ref()
            .unwrap_or_else(|| panic!("trajectory storage index {n} read before write"))
    }

    pub fn is_written(&self, n: usize) -> bool {
        self.slots[n - 1].is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;

    fn psi(x: f64) -> State {
        State::from_vec(vec![Complex::new(x, 0.0)])
    }

    #[test]
    fn writes_in_any_order_are_observable() {
        let mut s = TrajectoryStorage::new(4);
        s.write(4, psi(4.0));
        s.write(1, psi(1.0));
        s.write(2, psi(2.0));
        s.write(3, psi(3.0));
        assert_eq!(s.read(1), &psi(1.0));
        assert_eq!(s.read(4), &psi(4.0));
    }

    #[test]
    #[should_panic]
    fn reading_before_write_panics() {
        let s = TrajectoryStorage::new(2);
        let _ = s.read(1);
    }
}
