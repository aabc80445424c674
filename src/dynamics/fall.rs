use nalgebra::Vector1;

use crate::physics::DragModel;
use crate::sim::integrator::OdeSystem;

// ---------------------------------------------------------------------------
// Equation of motion: vertical fall with drag
// ---------------------------------------------------------------------------

/// A sphere released from rest, falling under gravity against air drag.
/// State vector is [v], positive downward.
#[derive(Debug, Clone, Copy)]
pub struct FallingSphere {
    pub model: DragModel,
    pub k: f64,    // drag constant, kg/m (quadratic) or kg/s (linear)
    pub mass: f64, // kg
}

impl FallingSphere {
    pub fn new(model: DragModel, k: f64, mass: f64) -> Self {
        Self { model, k, mass }
    }

    pub fn terminal_velocity(&self) -> f64 {
        self.model.terminal_velocity(self.k, self.mass)
    }
}

impl OdeSystem<1> for FallingSphere {
    fn rhs(&self, _t: f64, y: &Vector1<f64>) -> Vector1<f64> {
        Vector1::new(self.model.acceleration(y[0], self.k, self.mass))
    }
}
