use krotov_core::{
    AffineGenerator, ControlDerivative, ControlId, ControlRegistry, GuessControl, JTFn, OptimizationResult,
    OptimizeOptions, Parametrization, PulseOptionsEntry, State, Trajectory,
};
use nalgebra::DMatrix;
use num_complex::Complex;
use std::collections::HashMap;
use std::sync::Arc;

/// A smooth switch-on/off envelope: zero at the boundaries, `amplitude`
/// on the plateau, ramping over `t_rise` at each end.
pub fn flattop(t: f64, t_final: f64, t_rise: f64, amplitude: f64) -> f64 {
    let rise = (t / t_rise).clamp(0.0, 1.0);
    let fall = ((t_final - t) / t_rise).clamp(0.0, 1.0);
    amplitude * rise.min(fall)
}

/// Mirrors the teacher's per-test `pretty_env_logger::try_init()` idiom:
/// each test calls this once so `RUST_LOG=krotov_core=debug cargo test --
/// --nocapture` shows the driver's iteration log.
pub fn init_logger() {
    if pretty_env_logger::try_init().is_err() {
        println!("could not init env_logger");
    }
}

pub struct Scenario {
    pub c0: ControlId,
    pub target: State,
    pub t_final: f64,
}

/// Builds the shared two-level-system state-transfer problem: drift
/// `-0.5 sigma_z`, control `sigma_x`, |0> -> |1>, `J_T = 1 - |<1|phi_T>|^2`.
/// When `parametrization` is supplied it is attached to the single control.
pub fn build(
    n_points: usize,
    iter_stop: usize,
    parametrization: Option<Arc<dyn Parametrization>>,
    continue_from: Option<OptimizationResult>,
) -> (OptimizeOptions, Scenario) {
    let t_final = 5.0;
    let tlist: Vec<f64> = (0..=n_points).map(|i| i as f64 * t_final / n_points as f64).collect();

    let mut reg: ControlRegistry<&'static str> = ControlRegistry::new();
    let c0 = reg.intern("eps0");

    let mut drift = DMatrix::<Complex<f64>>::zeros(2, 2);
    drift[(0, 0)] = Complex::new(0.0, 0.5);
    drift[(1, 1)] = Complex::new(0.0, -0.5);
    let mut sx = DMatrix::<Complex<f64>>::zeros(2, 2);
    sx[(0, 1)] = Complex::new(0.0, -1.0);
    sx[(1, 0)] = Complex::new(0.0, -1.0);

    let gen = AffineGenerator::new(drift, vec![(c0, sx.clone())]);
    let psi0 = State::from_vec(vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]);
    let target = State::from_vec(vec![Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)]);

    let t_final_for_shape = t_final;
    let shape = Arc::new(move |t: f64| flattop(t, t_final_for_shape, 0.3, 1.0));
    let shape_for_guess = shape.clone();
    let mut guess = HashMap::new();
    guess.insert(c0, GuessControl::Callable(Arc::new(move |t| 0.2 * shape_for_guess(t))));
    let mut derivs = HashMap::new();
    derivs.insert(c0, ControlDerivative::ConstantMatrix(sx));

    let traj = Trajectory::new(psi0, gen, Some(target.clone()), derivs, guess);

    let mut pulse_options = HashMap::new();
    pulse_options.insert(
        c0,
        PulseOptionsEntry {
            lambda_a: 5.0,
            update_shape: GuessControl::Callable(shape),
            parametrization,
        },
    );

    let target_for_jt = target.clone();
    let j_t: Arc<JTFn> = Arc::new(move |states: &[State], _trajs: &[Trajectory]| {
        let overlap = krotov_core::inner_product(&target_for_jt, &states[0]);
        1.0 - overlap.norm_sqr()
    });

    let opts = OptimizeOptions::builder()
        .trajectories(vec![traj])
        .tlist(tlist.clone())
        .j_t(j_t)
        .pulse_options(pulse_options)
        .iter_stop(iter_stop)
        .continue_from(continue_from)
        .build();

    (opts, Scenario { c0, target, t_final })
}
