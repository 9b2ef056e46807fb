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

use std::collections::HashMap;

/// A stable small-integer identity for one scalar real-valued control.
///
/// Controls are compared by identity, not by value, and form a totally
/// ordered sequence fixed at workspace construction. Using a small
/// integer rather than identity-by-reference keeps every per-control
/// vector (pulses, update shapes, lambda_a, parametrisations) indexable
/// without touching the caller's own control tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlId(pub(crate) usize);

impl ControlId {
    /// Returns the raw index, useful for indexing parallel `Vec`s.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Assigns stable [`ControlId`]s to externally-provided control tokens.
///
/// External trajectories identify their controls by whatever type `K`
/// the caller uses (an opaque token, a string, a pointer address, ...).
/// The registry is the only place that mapping is ever consulted; every
/// other part of the core indexes by [`ControlId`] alone.
#[derive(Debug, Default)]
pub struct ControlRegistry<K: Eq + std::hash::Hash + Clone> {
    order: Vec<K>,
    index_of: HashMap<K, ControlId>,
}

impl<K: Eq + std::hash::Hash + Clone> ControlRegistry<K> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            index_of: HashMap::new(),
        }
    }

    /// Returns the `ControlId` for `key`, allocating a fresh one (at the
    /// next available index) the first time `key` is seen.
    pub fn intern(&mut self, key: K) -> ControlId {
        if let Some(id) = self.index_of.get(&key) {
            return *id;
        }
        let id = ControlId(self.order.len());
        self.order.push(key.clone());
        self.index_of.insert(key, id);
        id
    }

    pub fn id_of(&self, key: &K) -> Option<ControlId> {
        self.index_of.get(key).copied()
    }

    /// The controls in the fixed, totally ordered sequence established
    /// at construction time.
    pub fn ordered_ids(&self) -> Vec<ControlId> {
        (0..self.order.len()).map(ControlId).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
