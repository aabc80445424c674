pub mod event;
pub mod integrator;
pub mod runner;

pub use integrator::{DormandPrince, IntegrationError, OdeSystem, Stats, Tolerances};
pub use runner::{simulate, simulate_with, SimRun, CONVERGENCE_TOLERANCE};
