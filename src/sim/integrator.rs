use nalgebra::SVector;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Adaptive Dormand-Prince 5(4) integrator with grid resampling
// ---------------------------------------------------------------------------

/// Right-hand side of y' = f(t, y) for an N-dimensional state.
pub trait OdeSystem<const N: usize> {
    fn rhs(&self, t: f64, y: &SVector<f64, N>) -> SVector<f64, N>;
}

/// Mixed absolute/relative error tolerance.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerances {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self { rtol, atol }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { rtol: 1e-6, atol: 1e-9 }
    }
}

/// Work counters for the last call to [`DormandPrince::solve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub fn_evals: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("empty or reversed time span [{t0}, {t_end}]")]
    InvalidSpan { t0: f64, t_end: f64 },

    #[error("evaluation times must be ascending and inside [{t0}, {t_end}]")]
    InvalidEvalGrid { t0: f64, t_end: f64 },

    #[error("step size underflow at t = {t}")]
    StepSizeUnderflow { t: f64 },

    #[error("exceeded {max_steps} steps before reaching t = {t_end}")]
    TooManySteps { max_steps: usize, t_end: f64 },
}

// Butcher tableau (Dormand & Prince, 1980)
const C: [f64; 6] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0];
const A2: [f64; 1] = [1.0 / 5.0];
const A3: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
const A4: [f64; 3] = [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0];
const A5: [f64; 4] = [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0];
const A6: [f64; 5] = [
    9017.0 / 3168.0,
    -355.0 / 33.0,
    46732.0 / 5247.0,
    49.0 / 176.0,
    -5103.0 / 18656.0,
];
// 5th-order weights; b2 and b7 are zero
const B: [f64; 6] =
    [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0];
// b(5) - b(4), last entry multiplies the FSAL stage
const E: [f64; 7] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

// Dense output coefficients: row i weights stage i in powers x, x^2, x^3, x^4
const P: [[f64; 4]; 7] = [
    [
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    [0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    [
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    [
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    [
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    [
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
const ERROR_EXPONENT: f64 = -1.0 / 5.0;

pub struct DormandPrince {
    pub tol: Tolerances,
    pub max_steps: usize,
    pub stats: Stats,
}

impl DormandPrince {
    pub fn new(tol: Tolerances) -> Self {
        Self { tol, max_steps: 100_000, stats: Stats::default() }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Integrate from (t0, y0) to t_end and return the solution at each time
    /// in `t_eval`. Grid points inside an accepted step are filled in from
    /// the step's dense output.
    pub fn solve<S, const N: usize>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &SVector<f64, N>,
        t_end: f64,
        t_eval: &[f64],
    ) -> Result<Vec<SVector<f64, N>>, IntegrationError>
    where
        S: OdeSystem<N>,
    {
        if !(t_end > t0) || !t0.is_finite() || !t_end.is_finite() {
            return Err(IntegrationError::InvalidSpan { t0, t_end });
        }
        let grid_ok = t_eval.windows(2).all(|w| w[0] <= w[1])
            && t_eval.iter().all(|&t| t >= t0 && t <= t_end);
        if !grid_ok {
            return Err(IntegrationError::InvalidEvalGrid { t0, t_end });
        }

        self.stats = Stats::default();
        let mut out = Vec::with_capacity(t_eval.len());
        let mut next = 0;

        let mut t = t0;
        let mut y = *y0;
        let mut f = self.eval(sys, t, &y);

        while next < t_eval.len() && t_eval[next] <= t0 {
            out.push(y);
            next += 1;
        }

        let mut h = self.initial_step(sys, t0, &y, &f, t_end);

        while t < t_end {
            if self.stats.accepted_steps + self.stats.rejected_steps >= self.max_steps {
                return Err(IntegrationError::TooManySteps { max_steps: self.max_steps, t_end });
            }

            let min_step = 10.0 * f64::EPSILON * t.abs().max(1.0);
            let mut rejected = false;

            // Retry until the step error is within tolerance
            let (t_new, y_new, stages, factor) = loop {
                if h < min_step {
                    return Err(IntegrationError::StepSizeUnderflow { t });
                }
                let last = t + h >= t_end;
                if last {
                    h = t_end - t;
                }

                let (y_new, stages, err) = self.step(sys, t, &y, &f, h);
                let err_norm = self.error_norm(&y, &y_new, &err);

                if err_norm < 1.0 {
                    self.stats.accepted_steps += 1;
                    let mut factor = if err_norm == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY * err_norm.powf(ERROR_EXPONENT)).min(MAX_FACTOR)
                    };
                    if rejected {
                        factor = factor.min(1.0);
                    }
                    let t_new = if last { t_end } else { t + h };
                    break (t_new, y_new, stages, factor);
                }

                self.stats.rejected_steps += 1;
                rejected = true;
                // NaN error norms fall through to the minimum factor
                h *= (SAFETY * err_norm.powf(ERROR_EXPONENT)).max(MIN_FACTOR);
                if self.stats.accepted_steps + self.stats.rejected_steps >= self.max_steps {
                    return Err(IntegrationError::TooManySteps { max_steps: self.max_steps, t_end });
                }
            };

            let step = t_new - t;
            while next < t_eval.len() && t_eval[next] <= t_new {
                let te = t_eval[next];
                out.push(if te >= t_new { y_new } else { dense_output(t, &y, &stages, step, te) });
                next += 1;
            }

            t = t_new;
            y = y_new;
            f = stages[6];
            h = step * factor;
        }

        debug!(
            accepted = self.stats.accepted_steps,
            rejected = self.stats.rejected_steps,
            fn_evals = self.stats.fn_evals,
            "integration finished"
        );

        Ok(out)
    }

    fn eval<S, const N: usize>(&mut self, sys: &S, t: f64, y: &SVector<f64, N>) -> SVector<f64, N>
    where
        S: OdeSystem<N>,
    {
        self.stats.fn_evals += 1;
        sys.rhs(t, y)
    }

    /// One Dormand-Prince step. Returns (y_new, stages k1..k7, error estimate);
    /// k7 is f(t + h, y_new) and seeds the next step.
    fn step<S, const N: usize>(
        &mut self,
        sys: &S,
        t: f64,
        y: &SVector<f64, N>,
        k1: &SVector<f64, N>,
        h: f64,
    ) -> (SVector<f64, N>, [SVector<f64, N>; 7], SVector<f64, N>)
    where
        S: OdeSystem<N>,
    {
        let k2 = self.eval(sys, t + C[1] * h, &(y + k1 * (A2[0] * h)));
        let k3 = self.eval(sys, t + C[2] * h, &(y + (k1 * A3[0] + k2 * A3[1]) * h));
        let k4 = self.eval(
            sys,
            t + C[3] * h,
            &(y + (k1 * A4[0] + k2 * A4[1] + k3 * A4[2]) * h),
        );
        let k5 = self.eval(
            sys,
            t + C[4] * h,
            &(y + (k1 * A5[0] + k2 * A5[1] + k3 * A5[2] + k4 * A5[3]) * h),
        );
        let k6 = self.eval(
            sys,
            t + C[5] * h,
            &(y + (k1 * A6[0] + k2 * A6[1] + k3 * A6[2] + k4 * A6[3] + k5 * A6[4]) * h),
        );

        let y_new = y + (k1 * B[0] + k3 * B[2] + k4 * B[3] + k5 * B[4] + k6 * B[5]) * h;
        let k7 = self.eval(sys, t + h, &y_new);

        let err = (k1 * E[0] + k3 * E[2] + k4 * E[3] + k5 * E[4] + k6 * E[5] + k7 * E[6]) * h;
        (y_new, [*k1, k2, k3, k4, k5, k6, k7], err)
    }

    /// RMS of the error scaled by atol + rtol * max(|y|, |y_new|).
    fn error_norm<const N: usize>(
        &self,
        y: &SVector<f64, N>,
        y_new: &SVector<f64, N>,
        err: &SVector<f64, N>,
    ) -> f64 {
        let sum: f64 = (0..N)
            .map(|i| {
                let scale = self.tol.atol + y[i].abs().max(y_new[i].abs()) * self.tol.rtol;
                (err[i] / scale).powi(2)
            })
            .sum();
        (sum / N as f64).sqrt()
    }

    /// Starting step from the size of y and its first two derivatives
    /// (Hairer, Norsett & Wanner, section II.4).
    fn initial_step<S, const N: usize>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &SVector<f64, N>,
        f0: &SVector<f64, N>,
        t_end: f64,
    ) -> f64
    where
        S: OdeSystem<N>,
    {
        let span = t_end - t0;
        let tol = self.tol;
        let rms = |v: &SVector<f64, N>| -> f64 {
            let sum: f64 = (0..N)
                .map(|i| {
                    let scale = tol.atol + y0[i].abs() * tol.rtol;
                    (v[i] / scale).powi(2)
                })
                .sum();
            (sum / N as f64).sqrt()
        };

        let d0 = rms(y0);
        let d1 = rms(f0);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        let h0 = h0.min(span);

        let y1 = y0 + f0 * h0;
        let f1 = self.eval(sys, t0 + h0, &y1);
        let d2 = rms(&(f1 - f0)) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / 5.0)
        };

        (100.0 * h0).min(h1).min(span)
    }
}

/// Continuous extension of a Dormand-Prince step (4th order), evaluated at
/// `t` inside [t_old, t_old + h].
fn dense_output<const N: usize>(
    t_old: f64,
    y_old: &SVector<f64, N>,
    k: &[SVector<f64, N>; 7],
    h: f64,
    t: f64,
) -> SVector<f64, N> {
    let x = (t - t_old) / h;
    let powers = [x, x * x, x * x * x, x * x * x * x];
    let mut y = *y_old;
    for (ki, row) in k.iter().zip(P.iter()) {
        let weight: f64 = row.iter().zip(powers.iter()).map(|(p, xp)| p * xp).sum();
        y += ki * (weight * h);
    }
    y
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Vector1, Vector2};

    struct Decay {
        lambda: f64,
    }

    impl OdeSystem<1> for Decay {
        fn rhs(&self, _t: f64, y: &Vector1<f64>) -> Vector1<f64> {
            Vector1::new(-self.lambda * y[0])
        }
    }

    struct Oscillator {
        omega: f64,
    }

    impl OdeSystem<2> for Oscillator {
        fn rhs(&self, _t: f64, y: &Vector2<f64>) -> Vector2<f64> {
            Vector2::new(y[1], -self.omega * self.omega * y[0])
        }
    }

    #[test]
    fn exponential_decay_matches_exact() {
        let sys = Decay { lambda: 0.5 };
        let grid: Vec<f64> = (0..=20).map(|i| i as f64 * 0.5).collect();
        let mut solver = DormandPrince::new(Tolerances::new(1e-9, 1e-12));
        let ys = solver.solve(&sys, 0.0, &Vector1::new(1.0), 10.0, &grid).unwrap();
        assert_eq!(ys.len(), grid.len());
        for (t, y) in grid.iter().zip(&ys) {
            let exact = (-0.5 * t).exp();
            assert!((y[0] - exact).abs() < 1e-6, "t={} got {} want {}", t, y[0], exact);
        }
    }

    #[test]
    fn oscillator_returns_after_one_period() {
        let omega = 2.0;
        let period = 2.0 * std::f64::consts::PI / omega;
        let sys = Oscillator { omega };
        let mut solver = DormandPrince::new(Tolerances::new(1e-10, 1e-12));
        let ys = solver
            .solve(&sys, 0.0, &Vector2::new(1.0, 0.0), period, &[period])
            .unwrap();
        assert!((ys[0][0] - 1.0).abs() < 1e-6);
        assert!(ys[0][1].abs() < 1e-5);
    }

    #[test]
    fn first_sample_is_initial_state() {
        let sys = Decay { lambda: 1.0 };
        let mut solver = DormandPrince::new(Tolerances::default());
        let ys = solver.solve(&sys, 0.0, &Vector1::new(3.0), 1.0, &[0.0, 1.0]).unwrap();
        assert_eq!(ys[0][0], 3.0);
    }

    #[test]
    fn counts_work() {
        let sys = Decay { lambda: 1.0 };
        let mut solver = DormandPrince::new(Tolerances::default());
        solver.solve(&sys, 0.0, &Vector1::new(1.0), 5.0, &[5.0]).unwrap();
        assert!(solver.stats.accepted_steps > 0);
        // 1 initial eval + 1 for the starting step + 6 per attempted step
        let attempts = solver.stats.accepted_steps + solver.stats.rejected_steps;
        assert_eq!(solver.stats.fn_evals, 2 + 6 * attempts);
    }

    #[test]
    fn rejects_reversed_span() {
        let sys = Decay { lambda: 1.0 };
        let mut solver = DormandPrince::new(Tolerances::default());
        let err = solver.solve(&sys, 1.0, &Vector1::new(1.0), 0.0, &[]).unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidSpan { .. }));
    }

    #[test]
    fn rejects_grid_outside_span() {
        let sys = Decay { lambda: 1.0 };
        let mut solver = DormandPrince::new(Tolerances::default());
        let err = solver
            .solve(&sys, 0.0, &Vector1::new(1.0), 1.0, &[0.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidEvalGrid { .. }));
    }

    #[test]
    fn step_budget_is_enforced() {
        let sys = Oscillator { omega: 50.0 };
        let mut solver = DormandPrince::new(Tolerances::new(1e-12, 1e-14)).with_max_steps(10);
        let err = solver
            .solve(&sys, 0.0, &Vector2::new(1.0, 0.0), 100.0, &[100.0])
            .unwrap_err();
        assert!(matches!(err, IntegrationError::TooManySteps { .. }));
    }
}
