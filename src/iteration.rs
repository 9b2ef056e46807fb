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

use crate::errors::KrotovError;
use crate::operator::{inner_product, State};
use crate::propagator::Direction;
use crate::workspace::Workspace;
use rayon::prelude::*;

/// Runs the backward sweep of one Krotov iteration: propagates
/// every trajectory's co-state `chi[k]` from `t_{N_T}` back to `t_0`
/// against the *guess* pulses `eps^(i)`, filling `backward_storage[k]`.
///
/// `chi_t` is trajectory `k`'s terminal co-state `chi_k(t_{N_T})`,
/// already computed by the caller (the driver, via `chi!`).
pub fn run_backward_sweep(ws: &mut Workspace, chi_t: &[State]) -> Result<(), KrotovError> {
    let n_t = ws.grid.n_intervals();
    let options = ws.propagator_options(false);
    let read_bank = ws.pulses.read().clone();
    let control_order = ws.controls.clone();

    let step_one = |prop: &mut Box<dyn crate::propagator::PropagatorHandle>,
                    storage: &mut crate::storage::TrajectoryStorage,
                    chi0: &State|
     -> Result<(), KrotovError> {
        let bindings = control_order
            .iter()
            .map(|&c| (c, read_bank.get(&c).expect("control missing from pulse bank").clone()))
            .collect();
        prop.rebind(bindings);
        prop.reinit(chi0, options.clone(), Direction::Backward);
        storage.write(n_t + 1, chi0.clone());
        for n in (1..=n_t).rev() {
            let chi_n = prop.step()?;
            storage.write(n, chi_n);
        }
        Ok(())
    };

    if ws.use_threads {
        ws.backward_props
            .par_iter_mut()
            .zip(ws.backward_storage.par_iter_mut())
            .zip(chi_t.par_iter())
            .try_for_each(|((prop, storage), chi0)| step_one(prop, storage, chi0))
    } else {
        ws.backward_props
            .iter_mut()
            .zip(ws.backward_storage.iter_mut())
            .zip(chi_t.iter())
            .try_for_each(|((prop, storage), chi0)| step_one(prop, storage, chi0))
    }
}

/// Runs the forward sweep with pulse update of one Krotov iteration
/// walks the time grid once, sequentially, computing and
/// writing `eps^(i+1)` at each interval before stepping every
/// trajectory's forward propagator across that same interval. Returns
/// the final forward states `phi_k(t_{N_T})` for use as next
/// iteration's `chi_t` input (via `chi!`).
///
/// Assumes `forward_storage[k]` already holds `phi_0` at index 1 (set
/// once at workspace construction / initial forward propagation, not
/// rewritten here per the core's storage-write-once convention).
pub fn run_forward_sweep(ws: &mut Workspace) -> Result<Vec<State>, KrotovError> {
    let n_t = ws.grid.n_intervals();
    let n_k = ws.trajectories.len();
    let control_order = ws.controls.clone();
    let fw_options = ws.propagator_options(true);
    let write_bank = ws.pulses.write_bank().clone();

    for k in 0..n_k {
        let bindings = control_order
            .iter()
            .map(|&c| (c, write_bank.get(&c).expect("control missing from pulse bank").clone()))
            .collect();
        ws.forward_props[k].rebind(bindings);
        ws.forward_props[k].reinit(&ws.trajectories[k].initial_state, fw_options.clone(), Direction::Forward);
    }
    ws.reset_g_a_int();

    for n in 1..=n_t {
        let t_mid = ws.grid.midpoint(n);
        let dt_n = ws.grid.dt(n);

        // a. chi[k] at this interval, from the just-completed backward sweep.
        let chi_n: Vec<State> = (0..n_k).map(|k| ws.backward_storage[k].read(n).clone()).collect();

        // b. first-order approximation: read the *guess* eps at interval n.
        let guess_n: std::collections::HashMap<_, f64> = control_order
            .iter()
            .map(|&c| {
                let v = ws.pulses.read()[&c].read().expect("pulse lock poisoned")[n - 1];
                (c, v)
            })
            .collect();

        // c, d, e, f: per-control update.
        for &l in &control_order {
            let cfg = ws.control_config.get(&l).expect("control missing configuration");
            let lambda_a = cfg.lambda_a;
            let shape_n = cfg.update_shape[n - 1];
            let is_parametrised = cfg.is_parametrised;
            let parametrization = cfg.parametrization.clone();
            let mut delta_u_prime = 0.0;
            for k in 0..n_k {
                let traj = &ws.trajectories[k];
                let deriv = traj.control_derivative(l);
                if deriv.is_absent() {
                    continue;
                }
                let control_values: Vec<f64> = traj.controls().iter().map(|&c| guess_n[&c]).collect();
                let phi_k = ws.forward_storage[k].read(n);
                if let Some(mu_phi) = deriv.apply_at(t_mid, &control_values, phi_k) {
                    let overlap = inner_product(&chi_n[k], &mu_phi);
                    let mut contribution = overlap.im;
                    if is_parametrised {
                        let u_n = parametrization.u_of_eps(guess_n[&l]);
                        contribution *= parametrization.deps_du(u_n);
                    }
                    delta_u_prime += contribution;
                }
            }

            let alpha_n = shape_n / lambda_a;
            let delta_u = alpha_n * delta_u_prime;
            let eps_guess = guess_n[&l];
            let eps_new = if is_parametrised {
                let u_guess = parametrization.u_of_eps(eps_guess);
                parametrization.eps_of_u(u_guess + delta_u)
            } else {
                eps_guess + delta_u
            };
            ws.pulses.write_value(l, n, eps_new);
            *ws.g_a_int.get_mut(&l).expect("control missing from g_a_int") += alpha_n * delta_u_prime * delta_u_prime * dt_n;
        }

        // g. step every trajectory's forward propagator across interval n.
        let results: Vec<Result<State, KrotovError>> = if ws.use_threads {
            ws.forward_props.par_iter_mut().map(|p| p.step()).collect()
        } else {
            ws.forward_props.iter_mut().map(|p| p.step()).collect()
        };
        for (k, psi) in results.into_iter().enumerate() {
            ws.forward_storage[k].write(n + 1, psi?);
        }
    }

    Ok((0..n_k).map(|k| ws.forward_storage[k].read(n_t + 1).clone()).collect())
}

/// Runs one full Krotov iteration (backward sweep, then forward sweep
/// with pulse update), then swaps the pulse buffers so the just-written
/// `eps^(i+1)` becomes next iteration's `eps^(i)`.
pub fn run_iteration(ws: &mut Workspace, chi_t: &[State]) -> Result<Vec<State>, KrotovError> {
    run_backward_sweep(ws, chi_t)?;
    let finals = run_forward_sweep(ws)?;
    ws.pulses.swap();
    Ok(finals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlId;
    use crate::operator::AffineGenerator;
    use crate::options::{OptimizeOptions, PulseOptionsEntry};
    use crate::pulse::GuessControl;
    use crate::trajectory::Trajectory;
    use nalgebra::DMatrix;
    use num_complex::Complex;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn two_level_no_op_trajectory() -> (Trajectory, ControlId) {
        let mut reg: crate::control::ControlRegistry<&'static str> = crate::control::ControlRegistry::new();
        let c0 = reg.intern("eps0");
        let mut sx = DMatrix::<Complex<f64>>::zeros(2, 2);
        sx[(0, 1)] = Complex::new(0.0, -1.0);
        sx[(1, 0)] = Complex::new(0.0, -1.0);
        let gen = AffineGenerator::new(DMatrix::zeros(2, 2), vec![(c0, sx.clone())]);
        let psi0 = State::from_vec(vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]);
        let mut guess = HashMap::new();
        guess.insert(c0, GuessControl::Discretized(vec![0.0; 20]));
        let mut derivs = HashMap::new();
        derivs.insert(c0, crate::operator::ControlDerivative::ConstantMatrix(sx));
        (Trajectory::new(psi0, gen, None, derivs, guess), c0)
    }

    #[test]
    fn no_op_control_leaves_pulse_unchanged() {
        let (traj, c0) = two_level_no_op_trajectory();
        let tlist: Vec<f64> = (0..=20).map(|i| i as f64 * 0.05).collect();
        let mut pulse_options = HashMap::new();
        pulse_options.insert(
            c0,
            PulseOptionsEntry {
                lambda_a: 1.0,
                update_shape: GuessControl::Callable(Arc::new(|_t| 1.0)),
                parametrization: None,
            },
        );
        let opts = OptimizeOptions::builder()
            .trajectories(vec![traj])
            .tlist(tlist)
            .j_t(Arc::new(|_states: &[State], _t: &[Trajectory]| 0.0))
            .pulse_options(pulse_options)
            .build();
        let mut ws = Workspace::new(&opts).unwrap();
        ws.forward_storage[0].write(1, ws.trajectories[0].initial_state.clone());
        let chi_t = vec![State::zeros(2)];
        let before = ws.pulses.read_as_plain();
        run_iteration(&mut ws, &chi_t).unwrap();
        let after = ws.pulses.read_as_plain();
        for (&c, before_v) in &before {
            let after_v = &after[&c];
            for (b, a) in before_v.iter().zip(after_v.iter()) {
                assert!((b - a).abs() < 1e-9, "pulse should not move when chi is zero");
            }
        }
    }
}
