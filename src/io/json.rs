use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::config::SimConfig;
use crate::physics::DragModel;
use crate::sim::event::{first_event, SettledDetector, TerminalApproachDetector};
use crate::sim::runner::SimRun;
use crate::errors::Result;

/// Fraction of terminal velocity reported as the "approach" time.
pub const APPROACH_FRACTION: f64 = 0.99;

/// Acceleration (m/s^2) below which the fall counts as settled.
pub const SETTLED_ACCELERATION: f64 = 0.01;

/// Summary statistics computed from one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub city: String,
    pub model: DragModel,
    pub area_m2: f64,
    pub mass_kg: f64,
    pub air_density: f64,
    pub drag_constant: f64,
    pub t_max_s: f64,
    pub samples: usize,
    pub terminal_velocity_analytic: f64,
    pub terminal_velocity_sampled: f64,
    pub relative_error: f64,
    pub converged: bool,
    /// First sample at or above 99 % of the analytic terminal velocity.
    pub approach_time_s: Option<f64>,
    /// First sample where |dv/dt| drops below 0.01 m/s^2.
    pub settle_time_s: Option<f64>,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub fn_evals: usize,
}

impl RunSummary {
    pub fn from_run(run: &SimRun, config: &SimConfig) -> Self {
        let analytic = run.analytic_terminal_velocity(config.mass);
        let mut detector = TerminalApproachDetector::new(analytic, APPROACH_FRACTION);
        let approach = first_event(&run.trajectory, &mut detector);
        let mut settle = SettledDetector::new(SETTLED_ACCELERATION);
        let settled = first_event(&run.trajectory, &mut settle);

        RunSummary {
            city: run.params.city.clone(),
            model: run.params.model,
            area_m2: run.params.area,
            mass_kg: config.mass,
            air_density: run.density,
            drag_constant: run.k,
            t_max_s: config.t_max,
            samples: run.trajectory.len(),
            terminal_velocity_analytic: analytic,
            terminal_velocity_sampled: run.trajectory.terminal_velocity().unwrap_or(0.0),
            relative_error: run.relative_error(config.mass),
            converged: run.converged(config.mass),
            approach_time_s: approach.map(|ev| ev.time),
            settle_time_s: settled.map(|ev| ev.time),
            accepted_steps: run.stats.accepted_steps,
            rejected_steps: run.stats.rejected_steps,
            fn_evals: run.stats.fn_evals,
        }
    }
}

/// Write run summary as pretty-printed JSON.
pub fn write_summary<W: Write>(writer: W, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

/// Write run summary JSON to a file.
pub fn write_summary_file(path: impl AsRef<Path>, summary: &RunSummary) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_summary(file, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::SimParams;
    use crate::sim::simulate;

    fn seoul_run(model: DragModel) -> (SimRun, SimConfig) {
        let config = SimConfig::default();
        let params = SimParams { city: "Seoul".into(), model, area: 1.0 };
        (simulate(&params, &config).unwrap(), config)
    }

    #[test]
    fn summary_reports_convergence() {
        let (run, config) = seoul_run(DragModel::Linear);
        let s = RunSummary::from_run(&run, &config);
        assert!(s.converged);
        assert_eq!(s.samples, 1000);
        assert!((s.terminal_velocity_analytic - 100.85).abs() < 0.01);
        // 99 % of terminal for a linear law is reached at ln(100) * m / k ~ 47 s
        let t = s.approach_time_s.unwrap();
        assert!((t - 47.4).abs() < 0.5, "approach time {}", t);
    }

    #[test]
    fn summary_reports_settle_time() {
        let (run, config) = seoul_run(DragModel::Linear);
        let s = RunSummary::from_run(&run, &config);
        // g * exp(-k t / m) < 0.01 from ln(980) * m / k ~ 70.9 s
        let t = s.settle_time_s.unwrap();
        assert!((t - 70.9).abs() < 0.5, "settle time {}", t);
        assert!(t > s.approach_time_s.unwrap());
    }

    #[test]
    fn short_window_never_settles() {
        let config = SimConfig { t_max: 5.0, ..SimConfig::default() };
        let params = SimParams { city: "Seoul".into(), model: DragModel::Linear, area: 1.0 };
        let run = simulate(&params, &config).unwrap();
        let s = RunSummary::from_run(&run, &config);
        assert!(s.settle_time_s.is_none());
        assert!(!s.converged);
    }

    #[test]
    fn json_output_is_valid() {
        let (run, config) = seoul_run(DragModel::Quadratic);
        let summary = RunSummary::from_run(&run, &config);

        let mut buf = Vec::new();
        write_summary(&mut buf, &summary).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["city"], "Seoul");
        assert_eq!(value["model"], "quadratic");
        assert_eq!(value["converged"], true);
    }
}
