use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::dynamics::state::Trajectory;
use crate::errors::Result;
use crate::physics::EnergyProfile;

#[derive(Debug, Serialize)]
struct Row {
    time: f64,
    velocity: f64,
    height: f64,
    potential: f64,
    kinetic: f64,
    total: f64,
}

/// Write trajectory and energy data as CSV.
///
/// Columns: time, velocity, height, potential, kinetic, total
pub fn write_trajectory<W: Write>(
    writer: W,
    trajectory: &Trajectory,
    energy: &EnergyProfile,
) -> Result<()> {
    let mut out = ::csv::Writer::from_writer(writer);
    for (i, (time, velocity)) in trajectory.samples().enumerate() {
        out.serialize(Row {
            time,
            velocity,
            height: energy.heights[i],
            potential: energy.potential[i],
            kinetic: energy.kinetic[i],
            total: energy.total[i],
        })?;
    }
    out.flush()?;
    Ok(())
}

/// Write trajectory CSV to a file at the given path.
pub fn write_trajectory_file(
    path: impl AsRef<Path>,
    trajectory: &Trajectory,
    energy: &EnergyProfile,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_trajectory(file, trajectory, energy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_output_has_header_and_rows() {
        let traj = Trajectory {
            times: vec![0.0, 0.5],
            velocities: vec![0.0, 4.9],
        };
        let energy = EnergyProfile::from_trajectory(&traj, 1.0, 100.0);

        let mut buf = Vec::new();
        write_trajectory(&mut buf, &traj, &energy).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "time,velocity,height,potential,kinetic,total");
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert!(lines[1].starts_with("0.0,0.0,100.0,"));
    }
}
