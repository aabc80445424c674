use crate::dynamics::state::{Trajectory, GRAVITY};

/// Height and mechanical energy reconstructed from a velocity trace.
///
/// Height is a left-to-right cumulative sum of `v * dt` subtracted from the
/// release height, so the error grows with the span. Good enough for a plot.
#[derive(Debug, Clone)]
pub struct EnergyProfile {
    pub heights: Vec<f64>,   // m
    pub potential: Vec<f64>, // J
    pub kinetic: Vec<f64>,   // J
    pub total: Vec<f64>,     // J
}

impl EnergyProfile {
    pub fn from_trajectory(trajectory: &Trajectory, mass: f64, initial_height: f64) -> Self {
        let dt = trajectory.sample_interval();
        let n = trajectory.len();

        let mut heights = Vec::with_capacity(n);
        let mut fallen = 0.0;
        for v in &trajectory.velocities {
            fallen += v;
            heights.push(initial_height - fallen * dt);
        }

        let potential: Vec<f64> = heights.iter().map(|h| mass * GRAVITY * h).collect();
        let kinetic: Vec<f64> = trajectory
            .velocities
            .iter()
            .map(|v| 0.5 * mass * v * v)
            .collect();
        let total = potential
            .iter()
            .zip(&kinetic)
            .map(|(u, k)| u + k)
            .collect();

        EnergyProfile { heights, potential, kinetic, total }
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}
