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
use crate::iteration;
use crate::operator::{inner_product, State};
use crate::options::{ChiFn, JTFn, OptimizeOptions};
use crate::propagator::Direction;
use crate::reporter;
use crate::result::OptimizationResult;
use crate::trajectory::Trajectory;
use crate::workspace::Workspace;
use num_complex::Complex;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Runs one Krotov optimisation to completion: constructs the workspace,
/// performs the initial forward propagation (unless skipped), then
/// iterates `run_iteration` until convergence or `iter_stop`, calling the
/// update/info/check_convergence hooks around each step.
///
/// State machine: `New -> (optional initial forward propagation) ->
/// ReportIter0 -> [Iterate -> ReportIter_i -> CheckConvergence]* ->
/// Finalize`.
pub fn optimize_krotov(mut options: OptimizeOptions) -> Result<OptimizationResult, KrotovError> {
    let mut ws = Workspace::new(&options)?;

    let chi_fn: Arc<ChiFn> = options
        .chi
        .take()
        .unwrap_or_else(|| default_chi(options.j_t.clone()));

    if options.verbose {
        log::info!(
            "starting optimisation: {} trajectories, {} controls, {} intervals, iter {}..{}",
            ws.n_trajectories(),
            ws.controls.len(),
            ws.grid.n_intervals(),
            options.iter_start,
            options.iter_stop,
        );
    }

    let mut result = match &options.continue_from {
        Some(prior) => OptimizationResult::continuing_from(prior, options.iter_stop),
        None => OptimizationResult::new(
            options.tlist.clone(),
            options.iter_start,
            options.iter_stop,
            ws.pulses.read_as_plain(),
        ),
    };

    // New -> (optional initial forward propagation).
    let mut phi_t: Vec<State> = if options.skip_initial_forward_propagation {
        seed_skipped_forward_storage(&mut ws, options.continue_from.as_ref())
    } else {
        initial_forward_propagation(&mut ws)?
    };

    // ReportIter0.
    result.j_t = (options.j_t)(&phi_t, &ws.trajectories);
    result.j_total = result.j_t + ws.g_a_total();
    result.states = phi_t.clone();
    log::debug!("iter 0: J_T = {:.6e}, J = {:.6e}", result.j_t, result.j_total);
    let guess = ws.pulses.read_as_plain();
    report_iteration(&ws, &mut result, &mut options, &guess)?;
    run_check_convergence(&mut options, &mut result)?;

    // [Iterate -> ReportIter_i -> CheckConvergence]*.
    while !result.converged {
        if result.iter >= options.iter_stop {
            result.converged = true;
            if result.message.is_empty() {
                result.message = "Reached maximum number of iterations".to_string();
            }
            log::warn!(
                "optimisation stopped after reaching iter_stop = {} without converging (J_T = {:.6e})",
                options.iter_stop,
                result.j_t,
            );
            break;
        }

        let started = Instant::now();
        let eps_old = ws.pulses.read_as_plain();

        let mut chi_t: Vec<State> = ws
            .trajectories
            .iter()
            .map(|t| State::zeros(t.initial_state.len()))
            .collect();
        let tau_values = chi_fn(&mut chi_t, &phi_t, &ws.trajectories);

        phi_t = iteration::run_iteration(&mut ws, &chi_t)?;
        let eps_new = ws.pulses.read_as_plain();

        result.iter += 1;
        result.secs = started.elapsed().as_secs_f64();
        result.j_t_prev = result.j_t;
        result.j_t = (options.j_t)(&phi_t, &ws.trajectories);
        result.j_total_prev = result.j_total;
        result.j_total = result.j_t + ws.g_a_total();
        result.states = phi_t.clone();
        result.optimized_controls = eps_new.clone();
        result.tau_values = tau_values;
        log::debug!(
            "iter {}: J_T = {:.6e}, J = {:.6e}, took {:.3}s",
            result.iter,
            result.j_t,
            result.j_total,
            result.secs,
        );

        if let Some(hook) = options.update_hook.as_mut() {
            hook(&mut ws, result.iter, &eps_new, &eps_old)?;
        }

        report_iteration(&ws, &mut result, &mut options, &eps_old)?;
        run_check_convergence(&mut options, &mut result)?;
    }

    result.end_local_time = Some(std::time::SystemTime::now());
    Ok(result)
}

fn report_iteration(
    ws: &Workspace,
    result: &mut OptimizationResult,
    options: &mut OptimizeOptions,
    eps_old: &std::collections::HashMap<crate::control::ControlId, Vec<f64>>,
) -> Result<(), KrotovError> {
    let eps_new = ws.pulses.read_as_plain();
    let record = match options.info_hook.as_mut() {
        Some(hook) => hook(ws, result.iter, &eps_new, eps_old)?,
        None => reporter::default_info_hook(ws, result),
    };
    if let Some(record) = record {
        result.records.push(record);
    }
    Ok(())
}

fn run_check_convergence(options: &mut OptimizeOptions, result: &mut OptimizationResult) -> Result<(), KrotovError> {
    if let Some(check) = options.check_convergence.as_mut() {
        check(result)?;
    }
    Ok(())
}

/// Seeds `forward_storage[k]` at index 1 when the initial forward
/// propagation is skipped, so the first `run_forward_sweep`'s read of
/// index 1 (interval `n = 1`'s `phi_k`) does not observe an unwritten
/// slot. Per SPEC_FULL.md's resolution of Open Question 3: when
/// `continue_from` carries a prior result with one state per trajectory,
/// that adopted state is the seed; otherwise the seed is whatever state
/// each forward propagator already holds (the zero-dimensional state of
/// a freshly constructed, never-`reinit` propagator, if nothing primed
/// it beforehand).
fn seed_skipped_forward_storage(ws: &mut Workspace, continue_from: Option<&OptimizationResult>) -> Vec<State> {
    let seeded: Vec<State> = match continue_from {
        Some(prior) if prior.states.len() == ws.n_trajectories() => prior.states.clone(),
        _ => ws.forward_props.iter().map(|p| p.state().clone()).collect(),
    };
    for (k, psi) in seeded.iter().enumerate() {
        ws.forward_storage[k].write(1, psi.clone());
    }
    seeded
}

/// Propagates every trajectory's guess pulses from `t_0` to `t_{N_T}`,
/// filling each forward storage completely (index 1 is the initial
/// state, written here once and never rewritten by the iteration
/// engine). Used for iteration 0's reported `J_T` and as the seed
/// forward history the first backward sweep's update step reads `phi`
/// from. May run across trajectories on the worker pool when
/// `use_threads` is set, the same fork-join shape as the backward sweep.
fn initial_forward_propagation(ws: &mut Workspace) -> Result<Vec<State>, KrotovError> {
    let control_order = ws.controls.clone();
    let read_bank = ws.pulses.read().clone();
    let options = ws.propagator_options(false);
    let n_t = ws.grid.n_intervals();

    let propagate_one = |prop: &mut Box<dyn crate::propagator::PropagatorHandle>,
                         storage: &mut crate::storage::TrajectoryStorage,
                         psi0: &State|
     -> Result<(), KrotovError> {
        let bindings = control_order
            .iter()
            .map(|&c| (c, read_bank.get(&c).expect("control missing from pulse bank").clone()))
            .collect();
        prop.rebind(bindings);
        prop.reinit(psi0, options.clone(), Direction::Forward);
        storage.write(1, psi0.clone());
        for n in 1..=n_t {
            let psi = prop.step()?;
            storage.write(n + 1, psi);
        }
        Ok(())
    };

    let initial_states: Vec<State> = ws.trajectories.iter().map(|t| t.initial_state.clone()).collect();
    if ws.use_threads {
        ws.forward_props
            .par_iter_mut()
            .zip(ws.forward_storage.par_iter_mut())
            .zip(initial_states.par_iter())
            .try_for_each(|((prop, storage), psi0)| propagate_one(prop, storage, psi0))?;
    } else {
        ws.forward_props
            .iter_mut()
            .zip(ws.forward_storage.iter_mut())
            .zip(initial_states.iter())
            .try_for_each(|((prop, storage), psi0)| propagate_one(prop, storage, psi0))?;
    }

    Ok((0..ws.n_trajectories()).map(|k| ws.forward_storage[k].read(n_t + 1).clone()).collect())
}

/// Builds the default `chi!` adapter used when the caller does not supply
/// one: `chi_k = -d(J_T)/d<phi_k|`, estimated by central finite
/// differences of `j_t` in the real and imaginary parts of each
/// component of `phi_k` (Wirtinger derivative `-dJ_T/d(phi*)`). Also
/// fills the per-trajectory overlap `<target|phi_T>` wherever a
/// trajectory carries a target state, for `OptimizationResult::tau_values`.
///
/// This is necessarily expensive (`O(dim)` extra `j_t` evaluations per
/// trajectory); a caller with an analytic `dJ_T/d<phi|` should supply
/// `chi` directly rather than rely on this fallback.
fn default_chi(j_t: Arc<JTFn>) -> Arc<ChiFn> {
    const H: f64 = 1e-6;
    Arc::new(move |chi_out: &mut [State], phi: &[State], trajectories: &[Trajectory]| {
        for k in 0..phi.len() {
            let dim = phi[k].len();
            let mut grad = State::zeros(dim);
            for i in 0..dim {
                let base = phi[k][i];

                let mut perturbed = phi.to_vec();
                perturbed[k][i] = Complex::new(base.re + H, base.im);
                let j_plus_re = j_t(&perturbed, trajectories);
                perturbed[k][i] = Complex::new(base.re - H, base.im);
                let j_minus_re = j_t(&perturbed, trajectories);
                let d_re = (j_plus_re - j_minus_re) / (2.0 * H);

                perturbed[k][i] = Complex::new(base.re, base.im + H);
                let j_plus_im = j_t(&perturbed, trajectories);
                perturbed[k][i] = Complex::new(base.re, base.im - H);
                let j_minus_im = j_t(&perturbed, trajectories);
                let d_im = (j_plus_im - j_minus_im) / (2.0 * H);

                grad[i] = Complex::new(d_re, d_im) * Complex::new(-0.5, 0.0);
            }
            chi_out[k] = grad;
        }

        let mut any_target = false;
        let tau: Vec<Complex<f64>> = trajectories
            .iter()
            .zip(phi.iter())
            .map(|(traj, phi_k)| match &traj.target_state {
                Some(target) => {
                    any_target = true;
                    inner_product(target, phi_k)
                }
                None => Complex::new(0.0, 0.0),
            })
            .collect();
        any_target.then_some(tau)
    })
}
