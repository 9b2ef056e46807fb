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

use crate::result::{IterationRecord, OptimizationResult};
use crate::workspace::Workspace;

/// Default `info_hook`: prints a fixed-width progress row and appends the
/// same numbers to `result.records`. The header is printed once, the
/// first time `result.iter` is zero.
pub fn default_info_hook(ws: &Workspace, result: &OptimizationResult) -> Option<IterationRecord> {
    if result.iter == 0 {
        println!(
            "{:>6} | {:>14} | {:>14} | {:>14} | {:>14} | {:>14} | {:>10}",
            "iter", "J_T", "sum g_a", "J", "Delta J_T", "Delta J", "secs"
        );
    }

    let g_a = ws.g_a_total();
    let j = result.j_total;
    let delta_jt = result.j_t - result.j_t_prev;
    let delta_j = result.j_total - result.j_total_prev;

    println!(
        "{:>6} | {:>14.6e} | {:>14.6e} | {:>14.6e} | {:>14} | {:>14} | {:>10.3}",
        result.iter,
        result.j_t,
        g_a,
        j,
        fmt_delta(delta_jt),
        fmt_delta(delta_j),
        result.secs,
    );

    Some(IterationRecord {
        iter: result.iter,
        fields: vec![
            ("J_T".to_string(), result.j_t),
            ("g_a".to_string(), g_a),
            ("J".to_string(), j),
            ("delta_J_T".to_string(), delta_jt),
            ("delta_J".to_string(), delta_j),
            ("secs".to_string(), result.secs),
        ],
    })
}

fn fmt_delta(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.6e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_reported_as_not_available_before_a_prior_jt_exists() {
        assert_eq!(fmt_delta(f64::NAN), "n/a");
        assert_eq!(fmt_delta(-1.5e-3), format!("{:.6e}", -1.5e-3));
    }
}
