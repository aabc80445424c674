pub mod fall;
pub mod state;

pub use fall::FallingSphere;
pub use state::{linspace, parse_area, SimParams, Trajectory, DRAG_COEFF, GRAVITY};
