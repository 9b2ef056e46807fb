use super::common::{build, init_logger};
use krotov_core::optimize_krotov;

/// Skipping the initial forward propagation must not crash, and
/// iteration 0's `J_T` is computed from whatever state the forward
/// propagators already hold — here, a freshly constructed propagator
/// that was never `reinit`, i.e. the zero-dimensional state, against
/// which the overlap-based `J_T` degrades gracefully to 1.0.
#[test]
fn skip_initial_forward_propagation_uses_whatever_state_propagators_already_hold() {
    init_logger();
    let (mut opts, _) = build(50, 0, None, None);
    opts.skip_initial_forward_propagation = true;

    let result = optimize_krotov(opts).unwrap();

    assert_eq!(result.iter, 0);
    assert!(result.converged);
    assert!(
        (result.j_t - 1.0).abs() < 1e-12,
        "expected J_T = 1 from the unreached target overlap, got {}",
        result.j_t
    );
}

/// With the initial forward propagation left in, the same `iter_stop =
/// 0` configuration instead reports the guess pulse's actual `J_T`.
#[test]
fn default_initial_forward_propagation_reports_the_guess_jt() {
    init_logger();
    let (opts, _) = build(50, 0, None, None);
    let result = optimize_krotov(opts).unwrap();

    assert_eq!(result.iter, 0);
    assert!(result.converged);
    assert!(result.j_t < 1.0, "guess pulse should already produce some overlap: {}", result.j_t);
}

/// `skip_initial_forward_propagation` must not crash once any iteration
/// actually runs (the common case): the first forward sweep of
/// iteration 1 reads `forward_storage[k]` at index 1 (`phi_0`), which
/// must already be seeded even though the initial forward propagation
/// that usually seeds it was skipped.
#[test]
fn skip_initial_forward_propagation_survives_a_real_iteration() {
    init_logger();
    let (mut opts, _) = build(50, 3, None, None);
    opts.skip_initial_forward_propagation = true;

    let result = optimize_krotov(opts).unwrap();
    assert_eq!(result.iter, 3);
}

/// When continuing from a prior result, skipping the initial forward
/// propagation adopts the prior run's final states as the seed (rather
/// than the zero-dimensional state of a never-`reinit` propagator), so
/// the reported `J_T` at the resumed iteration count matches the prior
/// run's last reported `J_T` exactly, and further iterations still run
/// without crashing.
#[test]
fn skip_initial_forward_propagation_adopts_continue_from_states() {
    init_logger();
    let (opts_first, _) = build(50, 2, None, None);
    let first = optimize_krotov(opts_first).unwrap();

    let (mut opts_second, _) = build(50, 5, None, Some(first.clone()));
    opts_second.skip_initial_forward_propagation = true;
    let continued = optimize_krotov(opts_second).unwrap();

    assert_eq!(continued.iter_start, 2);
    assert_eq!(continued.iter, 5);
    assert!((continued.records[0].fields[0].1 - first.j_t).abs() < 1e-12);
}
