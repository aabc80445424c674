use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dynamics::state::{DRAG_COEFF, GRAVITY};
use crate::errors::SimError;

/// Drag law used for the falling sphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragModel {
    /// Drag proportional to v.
    Linear,
    /// Drag proportional to v^2.
    Quadratic,
}

impl DragModel {
    pub const ALL: [DragModel; 2] = [DragModel::Linear, DragModel::Quadratic];

    pub fn as_str(&self) -> &'static str {
        match self {
            DragModel::Linear => "linear",
            DragModel::Quadratic => "quadratic",
        }
    }

    /// dv/dt for a sphere falling at `v` with drag constant `k` and mass `mass`.
    pub fn acceleration(&self, v: f64, k: f64, mass: f64) -> f64 {
        match self {
            DragModel::Linear => GRAVITY - (k / mass) * v,
            DragModel::Quadratic => GRAVITY - (k / mass) * v * v,
        }
    }

    /// Analytic asymptote where gravity and drag balance.
    pub fn terminal_velocity(&self, k: f64, mass: f64) -> f64 {
        match self {
            DragModel::Linear => GRAVITY * mass / k,
            DragModel::Quadratic => (GRAVITY * mass / k).sqrt(),
        }
    }
}

impl fmt::Display for DragModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DragModel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "linear" => Ok(DragModel::Linear),
            "quadratic" => Ok(DragModel::Quadratic),
            other => Err(SimError::UnknownModel(other.to_string())),
        }
    }
}

/// Drag constant k = 0.5 * rho * A * Cd.
pub fn drag_constant(density: f64, area: f64) -> f64 {
    0.5 * density * area * DRAG_COEFF
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn seoul_unit_area_constant() {
        let k = drag_constant(0.4135, 1.0);
        assert_relative_eq!(k, 0.0971725, epsilon = 1e-12);
    }

    #[test]
    fn linear_terminal_velocity() {
        let k = drag_constant(0.4135, 1.0);
        let vt = DragModel::Linear.terminal_velocity(k, 1.0);
        assert!((vt - 100.85).abs() < 0.01, "got {}", vt);
    }

    #[test]
    fn quadratic_terminal_velocity() {
        let k = drag_constant(0.4135, 1.0);
        let vt = DragModel::Quadratic.terminal_velocity(k, 1.0);
        assert_relative_eq!(vt, (GRAVITY / k).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn acceleration_vanishes_at_terminal_velocity() {
        let k = drag_constant(0.4120, 0.3);
        for model in DragModel::ALL {
            let vt = model.terminal_velocity(k, 2.0);
            assert!(model.acceleration(vt, k, 2.0).abs() < 1e-9, "{} not balanced", model);
        }
    }

    #[test]
    fn released_from_rest_accelerates_at_g() {
        for model in DragModel::ALL {
            assert_relative_eq!(model.acceleration(0.0, 0.1, 1.0), GRAVITY);
        }
    }

    #[test]
    fn parse_models() {
        assert_eq!("linear".parse::<DragModel>().unwrap(), DragModel::Linear);
        assert_eq!("quadratic".parse::<DragModel>().unwrap(), DragModel::Quadratic);
        assert!(matches!(
            "cubic".parse::<DragModel>(),
            Err(SimError::UnknownModel(_))
        ));
    }
}
