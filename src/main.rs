use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};

use freefall_sim::io::{self, RunSummary};
use freefall_sim::physics::EnergyProfile;
use freefall_sim::{run_form, SimConfig, SimRun};

fn main() -> ExitCode {
    freefall_sim::init_logging();

    // freefall [CITY] [MODEL] [AREA] [OUT_DIR]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let city = args.first().map(String::as_str).unwrap_or("Seoul");
    let model = args.get(1).map(String::as_str).unwrap_or("linear");
    let area = args.get(2).map(String::as_str).unwrap_or("1.0");
    let out_dir = args.get(3).map(PathBuf::from);

    let config = SimConfig::load_or_default();

    let run = match run_form(city, model, area, &config) {
        Ok(run) => run,
        Err(e) => {
            error!("{}: {}", e.title(), e);
            eprintln!("{}: {}", e.title(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{}", hint);
            }
            return ExitCode::FAILURE;
        }
    };

    let energy =
        EnergyProfile::from_trajectory(&run.trajectory, config.mass, config.initial_height);
    let summary = RunSummary::from_run(&run, &config);
    print_report(&run, &energy, &summary, &config);

    if let Some(dir) = out_dir {
        let result = std::fs::create_dir_all(&dir)
            .map_err(freefall_sim::SimError::from)
            .and_then(|_| {
                io::write_trajectory_file(dir.join("trajectory.csv"), &run.trajectory, &energy)
            })
            .and_then(|_| io::write_summary_file(dir.join("summary.json"), &summary));
        match result {
            Ok(()) => info!("Wrote trajectory.csv and summary.json to {}", dir.display()),
            Err(e) => {
                error!("Failed to write output. {}", e);
                eprintln!("Failed to write output: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn print_report(run: &SimRun, energy: &EnergyProfile, summary: &RunSummary, config: &SimConfig) {
    println!();
    println!("====================================================================");
    println!("  FREE FALL WITH AIR DRAG — {} / {}", run.params.city, run.params.model);
    println!("====================================================================");
    println!();
    println!("  Parameters");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Air density:   {:>8.4} kg/m^3   Area:         {:>8.4} m^2",
        run.density, run.params.area
    );
    println!(
        "  Mass:          {:>8.3} kg       Drag const k: {:>8.5}",
        config.mass, run.k
    );
    println!(
        "  Time span:     {:>8.1} s        Samples:      {:>8}",
        config.t_max, summary.samples
    );
    println!();

    println!("  Terminal Velocity");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Analytic:      {:>10.4} m/s", summary.terminal_velocity_analytic);
    println!("  Last sample:   {:>10.4} m/s", summary.terminal_velocity_sampled);
    println!(
        "  Rel. error:    {:>10.2e}      {}",
        summary.relative_error,
        if summary.converged { "converged" } else { "NOT CONVERGED (extend t_max)" }
    );
    match summary.approach_time_s {
        Some(t) => println!("  99% reached:   {:>10.2} s", t),
        None => println!("  99% reached:   not within window"),
    }
    match summary.settle_time_s {
        Some(t) => println!("  Settled:       {:>10.2} s   (|dv/dt| < 0.01 m/s^2)", t),
        None => println!("  Settled:       not within window"),
    }
    println!();

    println!("  Trajectory");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>7}  {:>9}  {:>10}  {:>10}  {:>10}  {:>10}",
        "t (s)", "v (m/s)", "h (m)", "Ep (J)", "Ek (J)", "E (J)"
    );
    println!("  {}", "─".repeat(64));

    let n = run.trajectory.len();
    let sample_interval = (n / 20).max(1);
    for (i, (t, v)) in run.trajectory.samples().enumerate() {
        if i % sample_interval != 0 && i != n - 1 {
            continue;
        }
        println!(
            "  {:>7.2}  {:>9.3}  {:>10.1}  {:>10.1}  {:>10.2}  {:>10.1}",
            t, v, energy.heights[i], energy.potential[i], energy.kinetic[i], energy.total[i]
        );
    }

    println!();
    println!(
        "  Solver: {} accepted, {} rejected steps, {} RHS evaluations",
        summary.accepted_steps, summary.rejected_steps, summary.fn_evals
    );
    println!("====================================================================");
    println!();
}
