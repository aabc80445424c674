pub mod atmosphere;
pub mod drag;
pub mod energy;

pub use atmosphere::{air_density, cities, CITY_AIR_DENSITY};
pub use drag::{drag_constant, DragModel};
pub use energy::EnergyProfile;
