use nalgebra::Vector1;
use tracing::{info, warn};

use crate::config::SimConfig;
use crate::dynamics::fall::FallingSphere;
use crate::dynamics::state::{linspace, SimParams, Trajectory};
use crate::errors::Result;
use crate::physics::{air_density, drag_constant};
use super::integrator::{DormandPrince, Stats};

/// Relative gap between sampled and analytic terminal velocity below which
/// the run counts as converged.
pub const CONVERGENCE_TOLERANCE: f64 = 1e-3;

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct SimRun {
    pub params: SimParams,
    pub density: f64, // kg/m^3
    pub k: f64,       // drag constant
    pub trajectory: Trajectory,
    pub stats: Stats,
}

impl SimRun {
    pub fn analytic_terminal_velocity(&self, mass: f64) -> f64 {
        self.params.model.terminal_velocity(self.k, mass)
    }

    /// |v_last - v_terminal| / v_terminal.
    pub fn relative_error(&self, mass: f64) -> f64 {
        let analytic = self.analytic_terminal_velocity(mass);
        let sampled = self.trajectory.terminal_velocity().unwrap_or(0.0);
        (sampled - analytic).abs() / analytic
    }

    pub fn converged(&self, mass: f64) -> bool {
        self.relative_error(mass) <= CONVERGENCE_TOLERANCE
    }
}

// ---------------------------------------------------------------------------
// Single run
// ---------------------------------------------------------------------------

/// Integrate the fall with a caller-supplied solver. Solver statistics are
/// left in `solver.stats`.
pub fn simulate_with(
    params: &SimParams,
    config: &SimConfig,
    solver: &mut DormandPrince,
) -> Result<SimRun> {
    config.validate()?;
    let density = air_density(&params.city)?;
    let k = drag_constant(density, params.area);
    let sphere = FallingSphere::new(params.model, k, config.mass);

    let times = linspace(0.0, config.t_max, config.n_points);
    let states = solver.solve(&sphere, 0.0, &Vector1::new(0.0), config.t_max, &times)?;
    let velocities: Vec<f64> = states.iter().map(|y| y[0]).collect();

    let run = SimRun {
        params: params.clone(),
        density,
        k,
        trajectory: Trajectory { times, velocities },
        stats: solver.stats,
    };

    let analytic = sphere.terminal_velocity();
    let sampled = run.trajectory.terminal_velocity().unwrap_or(0.0);
    info!(
        city = %params.city,
        model = %params.model,
        area = params.area,
        k,
        analytic,
        sampled,
        "simulation complete"
    );
    if !run.converged(config.mass) {
        warn!(
            "velocity has not settled within {} s: last sample {:.4} m/s vs terminal {:.4} m/s",
            config.t_max, sampled, analytic
        );
    }

    Ok(run)
}

/// Integrate the fall with a solver built from `config`.
pub fn simulate(params: &SimParams, config: &SimConfig) -> Result<SimRun> {
    let mut solver = DormandPrince::new(config.tolerances()).with_max_steps(config.max_steps);
    simulate_with(params, config, &mut solver)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::GRAVITY;
    use crate::errors::SimError;
    use crate::physics::DragModel;

    fn params(model: DragModel) -> SimParams {
        SimParams { city: "Seoul".into(), model, area: 1.0 }
    }

    #[test]
    fn returns_configured_sample_count() {
        let config = SimConfig::default();
        for model in DragModel::ALL {
            let run = simulate(&params(model), &config).unwrap();
            assert_eq!(run.trajectory.times.len(), 1000);
            assert_eq!(run.trajectory.velocities.len(), 1000);
        }
    }

    #[test]
    fn starts_from_rest() {
        let run = simulate(&params(DragModel::Linear), &SimConfig::default()).unwrap();
        assert_eq!(run.trajectory.times[0], 0.0);
        assert_eq!(run.trajectory.velocities[0], 0.0);
        assert_eq!(*run.trajectory.times.last().unwrap(), 100.0);
    }

    #[test]
    fn seoul_linear_reaches_about_100_m_per_s() {
        let run = simulate(&params(DragModel::Linear), &SimConfig::default()).unwrap();
        assert!((run.k - 0.0972).abs() < 1e-4, "k = {}", run.k);
        let vt = run.trajectory.terminal_velocity().unwrap();
        assert!((vt - 100.8).abs() < 0.1, "terminal velocity {}", vt);
        assert!(run.converged(1.0));
    }

    #[test]
    fn quadratic_matches_analytic_terminal_velocity() {
        let run = simulate(&params(DragModel::Quadratic), &SimConfig::default()).unwrap();
        let analytic = (GRAVITY / run.k).sqrt();
        let vt = run.trajectory.terminal_velocity().unwrap();
        assert!((vt - analytic).abs() / analytic < 1e-5, "{} vs {}", vt, analytic);
    }

    #[test]
    fn velocity_never_decreases() {
        for model in DragModel::ALL {
            let run = simulate(&params(model), &SimConfig::default()).unwrap();
            for w in run.trajectory.velocities.windows(2) {
                assert!(w[1] >= w[0] - 1e-3, "{}: {} -> {}", model, w[0], w[1]);
            }
        }
    }

    #[test]
    fn short_window_is_not_converged() {
        let config = SimConfig { t_max: 5.0, ..SimConfig::default() };
        let run = simulate(&params(DragModel::Linear), &config).unwrap();
        assert!(!run.converged(config.mass));
    }

    #[test]
    fn unknown_city_fails_before_integration() {
        let p = SimParams { city: "Tokyo".into(), model: DragModel::Linear, area: 1.0 };
        let mut solver = DormandPrince::new(SimConfig::default().tolerances());
        let err = simulate_with(&p, &SimConfig::default(), &mut solver).unwrap_err();
        assert!(matches!(err, SimError::UnknownCity(ref c) if c == "Tokyo"));
        assert_eq!(solver.stats.fn_evals, 0);
    }

    #[test]
    fn heavier_sphere_falls_faster() {
        let light = simulate(&params(DragModel::Quadratic), &SimConfig::default()).unwrap();
        let config = SimConfig { mass: 4.0, ..SimConfig::default() };
        let heavy = simulate(&params(DragModel::Quadratic), &config).unwrap();
        let ratio = heavy.trajectory.terminal_velocity().unwrap()
            / light.trajectory.terminal_velocity().unwrap();
        assert!((ratio - 2.0).abs() < 1e-3, "ratio {}", ratio);
    }
}
