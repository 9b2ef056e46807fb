use super::common::{build, init_logger};
use krotov_core::{optimize_krotov, BoundedTanh};
use std::sync::Arc;

/// A `BoundedTanh` parametrisation must keep the control strictly
/// inside `(-eps_max, eps_max)` at every interval, every iteration —
/// checked live via `update_hook` rather than only on the final pulse.
#[test]
fn bounded_tanh_parametrization_never_exceeds_its_bound() {
    init_logger();
    let eps_max = 0.3;
    let (mut opts, _) = build(200, 30, Some(Arc::new(BoundedTanh { eps_max })), None);

    opts.update_hook = Some(Box::new(move |_ws, _iter, eps_new, _eps_old| {
        for pulse in eps_new.values() {
            for &value in pulse {
                assert!(
                    value.abs() < eps_max,
                    "control value {value} exceeded bound {eps_max}"
                );
            }
        }
        Ok(())
    }));

    let result = optimize_krotov(opts).unwrap();
    for pulse in result.optimized_controls.values() {
        for &value in pulse {
            assert!(value.abs() < eps_max);
        }
    }
}
