use crate::dynamics::state::Trajectory;

// ---------------------------------------------------------------------------
// Events on the sampled velocity trace
// ---------------------------------------------------------------------------

/// A velocity sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Velocity reached the given fraction of the analytic terminal velocity.
    TerminalApproach { fraction: f64 },
    /// Acceleration fell below the given threshold (m/s^2).
    Settled { threshold: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimEvent {
    pub time: f64,
    pub kind: EventKind,
    pub velocity: f64,
}

/// Passive detectors that inspect consecutive samples.
pub trait EventDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind>;
}

/// Fires once when velocity first crosses `fraction * terminal`.
pub struct TerminalApproachDetector {
    pub terminal: f64,
    pub fraction: f64,
    fired: bool,
}

impl TerminalApproachDetector {
    pub fn new(terminal: f64, fraction: f64) -> Self {
        Self { terminal, fraction, fired: false }
    }
}

impl EventDetector for TerminalApproachDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        if self.fired {
            return None;
        }
        let target = self.fraction * self.terminal;
        if prev.velocity < target && current.velocity >= target {
            self.fired = true;
            Some(EventKind::TerminalApproach { fraction: self.fraction })
        } else {
            None
        }
    }
}

/// Fires once when the finite-difference acceleration drops below `threshold`.
pub struct SettledDetector {
    pub threshold: f64,
    fired: bool,
}

impl SettledDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, fired: false }
    }
}

impl EventDetector for SettledDetector {
    fn check(&mut self, prev: &Sample, current: &Sample) -> Option<EventKind> {
        let dt = current.time - prev.time;
        if self.fired || dt <= 0.0 {
            return None;
        }
        let accel = (current.velocity - prev.velocity) / dt;
        if accel.abs() < self.threshold {
            self.fired = true;
            Some(EventKind::Settled { threshold: self.threshold })
        } else {
            None
        }
    }
}

/// Run a detector over a trajectory and return the first event it reports.
pub fn first_event(trajectory: &Trajectory, detector: &mut dyn EventDetector) -> Option<SimEvent> {
    let samples: Vec<Sample> = trajectory
        .samples()
        .map(|(time, velocity)| Sample { time, velocity })
        .collect();
    samples.windows(2).find_map(|pair| {
        detector.check(&pair[0], &pair[1]).map(|kind| SimEvent {
            time: pair[1].time,
            kind,
            velocity: pair[1].velocity,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64, velocity: f64) -> Sample {
        Sample { time, velocity }
    }

    #[test]
    fn terminal_approach_fires_once() {
        let mut det = TerminalApproachDetector::new(10.0, 0.99);
        let prev = sample(1.0, 9.8);
        let curr = sample(1.1, 9.95);
        assert_eq!(
            det.check(&prev, &curr),
            Some(EventKind::TerminalApproach { fraction: 0.99 })
        );
        assert!(det.check(&prev, &curr).is_none());
    }

    #[test]
    fn settled_ignores_fast_change() {
        let mut det = SettledDetector::new(0.01);
        assert!(det.check(&sample(0.0, 0.0), &sample(0.1, 0.98)).is_none());
        assert!(det.check(&sample(50.0, 100.0), &sample(50.1, 100.0001)).is_some());
    }

    #[test]
    fn first_event_reports_crossing_time() {
        let traj = Trajectory {
            times: vec![0.0, 1.0, 2.0, 3.0],
            velocities: vec![0.0, 5.0, 9.0, 9.95],
        };
        let mut det = TerminalApproachDetector::new(10.0, 0.9);
        let ev = first_event(&traj, &mut det).unwrap();
        assert_eq!(ev.time, 2.0);
        assert_eq!(ev.velocity, 9.0);
    }

    #[test]
    fn no_event_when_never_reached() {
        let traj = Trajectory {
            times: vec![0.0, 1.0],
            velocities: vec![0.0, 1.0],
        };
        let mut det = TerminalApproachDetector::new(10.0, 0.99);
        assert!(first_event(&traj, &mut det).is_none());
    }
}
