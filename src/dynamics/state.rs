use crate::errors::{Result, SimError};
use crate::physics::DragModel;

// ---------------------------------------------------------------------------
// Physical constants
// ---------------------------------------------------------------------------

pub const GRAVITY: f64 = 9.8; // m/s^2
pub const DRAG_COEFF: f64 = 0.47; // sphere

// ---------------------------------------------------------------------------
// Run parameters (what the form collects)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub city: String,
    pub model: DragModel,
    pub area: f64, // m^2, > 0
}

impl SimParams {
    /// Build parameters from raw form values. Area is checked here; the city
    /// is only resolved when the run starts.
    pub fn from_form(city: &str, model: &str, area_text: &str) -> Result<Self> {
        let area = parse_area(area_text)?;
        let model: DragModel = model.parse()?;
        Ok(SimParams { city: city.to_string(), model, area })
    }
}

/// Parse the cross-sectional area text. Empty, non-numeric, non-finite and
/// non-positive values are all rejected.
pub fn parse_area(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(area) if area.is_finite() && area > 0.0 => Ok(area),
        _ => Err(SimError::InvalidArea(text.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Simulation result
// ---------------------------------------------------------------------------

/// Velocity samples on a uniform time grid. `times` and `velocities` always
/// have the same length.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    pub times: Vec<f64>,      // s
    pub velocities: Vec<f64>, // m/s, positive downward
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Spacing of the grid (t[1] - t[0]), zero for fewer than two samples.
    pub fn sample_interval(&self) -> f64 {
        match self.times.as_slice() {
            [t0, t1, ..] => t1 - t0,
            _ => 0.0,
        }
    }

    /// Last sampled velocity, used as the terminal velocity estimate.
    pub fn terminal_velocity(&self) -> Option<f64> {
        self.velocities.last().copied()
    }

    /// (time, velocity) pairs.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.velocities.iter().copied())
    }
}

/// `n` evenly spaced points from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            grid[n - 1] = end;
            grid
        }
    }
}
