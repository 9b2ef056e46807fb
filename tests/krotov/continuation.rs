use super::common::{build, init_logger};
use krotov_core::optimize_krotov;

/// Running 10 iterations, then continuing with `continue_from` for a
/// further 40, must match a single fresh 50-iteration run.
#[test]
fn continuing_matches_a_single_longer_run() {
    init_logger();
    let (opts_first, _) = build(200, 10, None, None);
    let first = optimize_krotov(opts_first).unwrap();
    assert_eq!(first.iter, 10);

    let (opts_second, _) = build(200, 50, None, Some(first.clone()));
    let continued = optimize_krotov(opts_second).unwrap();
    assert_eq!(continued.iter, 50);

    let (opts_fresh, _) = build(200, 50, None, None);
    let fresh = optimize_krotov(opts_fresh).unwrap();
    assert_eq!(fresh.iter, 50);

    assert!(
        (continued.j_t - fresh.j_t).abs() < 1e-6,
        "continued J_T {} should match fresh-run J_T {}",
        continued.j_t,
        fresh.j_t,
    );

    let continued_pulse = &continued.optimized_controls[&continued.optimized_controls.keys().next().copied().unwrap()];
    let fresh_pulse = &fresh.optimized_controls[&fresh.optimized_controls.keys().next().copied().unwrap()];
    for (a, b) in continued_pulse.iter().zip(fresh_pulse.iter()) {
        assert!((a - b).abs() < 1e-6, "pulses diverged: {a} vs {b}");
    }
}

/// Continuation must resume iteration numbering and re-seed the guess
/// from the prior run's optimised controls, not its original guess.
#[test]
fn continuation_reseeds_guess_from_prior_optimized_controls() {
    init_logger();
    let (opts_first, scenario) = build(100, 5, None, None);
    let first = optimize_krotov(opts_first).unwrap();

    let (opts_second, _) = build(100, 8, None, Some(first.clone()));
    let continued = optimize_krotov(opts_second).unwrap();

    assert_eq!(continued.iter_start, 5);
    assert_eq!(continued.iter, 8);
    let seeded_guess = &continued.guess_controls[&scenario.c0];
    let prior_optimized = &first.optimized_controls[&scenario.c0];
    assert_eq!(seeded_guess, prior_optimized);
}
