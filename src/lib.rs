pub mod config;
pub mod dynamics;
pub mod errors;
pub mod io;
pub mod physics;
pub mod sim;

pub use self::config::SimConfig;
pub use dynamics::state::{SimParams, Trajectory};
pub use errors::{Result, SimError};
pub use physics::{DragModel, EnergyProfile};
pub use sim::{simulate, SimRun};

/// Install a compact stdout subscriber. Filter comes from `RUST_LOG`,
/// defaulting to `info`.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to init logging. {}", e);
    }
}

/// Validate form values and run one simulation: the whole
/// form -> validate -> simulate chain behind the Run button.
pub fn run_form(city: &str, model: &str, area_text: &str, config: &SimConfig) -> Result<SimRun> {
    let params = SimParams::from_form(city, model, area_text)?;
    simulate(&params, config)
}
