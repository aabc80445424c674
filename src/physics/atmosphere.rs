use crate::errors::{Result, SimError};

// ---------------------------------------------------------------------------
// Per-city air density at 10 km reference altitude
// ---------------------------------------------------------------------------

/// Air density lookup, kg/m^3. Order is the order shown in the city picker.
pub const CITY_AIR_DENSITY: [(&str, f64); 7] = [
    ("Seoul", 0.4135),
    ("Busan", 0.4120),
    ("Daegu", 0.4140),
    ("Incheon", 0.4115),
    ("Gwangju", 0.4130),
    ("Daejeon", 0.4125),
    ("Ulsan", 0.4145),
];

/// Air density for a city. Unknown names are an error, never a default.
pub fn air_density(city: &str) -> Result<f64> {
    CITY_AIR_DENSITY
        .iter()
        .find(|(name, _)| *name == city)
        .map(|(_, rho)| *rho)
        .ok_or_else(|| SimError::UnknownCity(city.to_string()))
}

/// City names in table order.
pub fn cities() -> impl Iterator<Item = &'static str> {
    CITY_AIR_DENSITY.iter().map(|(name, _)| *name)
}
