//! Levenberg–Marquardt for small nonlinear least-squares problems.
//!
//! We minimize `||r(x)||²` for a residual function `r: Rⁿ → Rᵐ` with a
//! caller-supplied analytic Jacobian. Each iteration solves the damped
//! normal equations
//!
//! ```text
//! (JᵀJ + λ diag(JᵀJ)) dx = -Jᵀ r
//! ```
//!
//! and adapts `λ` multiplicatively: accepted steps relax the damping toward
//! Gauss–Newton, rejected steps push it toward gradient descent and simply
//! re-enter the outer loop with a steeper (clamped) `λ`.
//!
//! Stopping is scale-aware. The optimum of noisy data has a large absolute
//! cost by construction, so convergence is judged by the gradient norm
//! relative to the residual scale and by the relative cost decrease of
//! accepted steps, never by the absolute cost alone.
//!
//! Implementation choices:
//! - The damped matrix is symmetric positive definite (diagonal entries are
//!   floored), so we solve with Cholesky; a failed factorization is treated
//!   like a rejected step and bumps `λ`.
//! - Our parameter dimension is tiny (3 for the Gompertz triple), so no
//!   effort is spent on large-scale structure.

use nalgebra::{DMatrix, DVector};

/// Floor for the damped diagonal.
const DIAG_FLOOR: f64 = 1e-14;

/// Costs below this are an exact fit for all practical purposes.
const COST_FLOOR: f64 = 1e-12;

/// Bounds for the damping parameter `λ`.
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e10;

/// Stopping and damping controls.
#[derive(Debug, Clone)]
pub struct LmOptions {
    /// Maximum number of outer iterations (each attempts one step).
    pub max_iter: usize,
    /// Converged when an accepted step reduces the cost by less than this
    /// fraction of the current cost.
    pub cost_tol: f64,
    /// Converged when an accepted step has norm below
    /// `step_tol * (1 + ||x||)`.
    pub step_tol: f64,
    /// Converged when `||Jᵀr|| < grad_tol * (1 + ||r||)`.
    pub grad_tol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iter: 200,
            cost_tol: 1e-9,
            step_tol: 1e-10,
            grad_tol: 1e-8,
        }
    }
}

/// Solver output. `converged == false` means the iteration budget ran out;
/// `x` then holds the best point found so far.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub x: DVector<f64>,
    /// Final cost `||r(x)||²`.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Run Levenberg–Marquardt from `x0`.
///
/// `residuals(x)` returns the residual vector; `jacobian(x)` its `m × n`
/// Jacobian. Returns `None` only when the problem is numerically unusable:
/// an empty parameter or residual vector, or non-finite initial residuals
/// or Jacobian entries. Damping exhaustion is not a failure — when no step
/// of any damping improves the cost, the current point is a numerical
/// optimum and is reported as converged.
pub fn levenberg_marquardt<R, J>(
    residuals: R,
    jacobian: J,
    x0: &DVector<f64>,
    opts: &LmOptions,
) -> Option<LmReport>
where
    R: Fn(&DVector<f64>) -> DVector<f64>,
    J: Fn(&DVector<f64>) -> DMatrix<f64>,
{
    let n = x0.len();
    if n == 0 {
        return None;
    }

    let mut x = x0.clone();
    let mut r = residuals(&x);
    if r.is_empty() || r.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let mut cost = r.norm_squared();

    let mut lambda = 1e-3;
    let lambda_up = 10.0;
    let lambda_down = 0.1;

    for iter in 0..opts.max_iter {
        if cost < COST_FLOOR {
            return Some(LmReport {
                x,
                cost,
                iterations: iter,
                converged: true,
            });
        }

        let jac = jacobian(&x);
        if jac.nrows() != r.len() || jac.ncols() != n || jac.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let jt = jac.transpose();
        let jtj = &jt * &jac;
        let grad = &jt * &r;

        // cost.sqrt() is the residual norm, i.e. the natural scale of Jᵀr.
        if grad.norm() < opts.grad_tol * (1.0 + cost.sqrt()) {
            return Some(LmReport {
                x,
                cost,
                iterations: iter,
                converged: true,
            });
        }

        let mut damped = jtj.clone();
        for i in 0..n {
            let d = damped[(i, i)] * (1.0 + lambda);
            damped[(i, i)] = d.max(DIAG_FLOOR);
        }

        let step = damped.cholesky().map(|chol| chol.solve(&(-&grad)));
        let accepted = step.and_then(|dx| {
            let x_new = &x + &dx;
            let r_new = residuals(&x_new);
            let cost_new = if r_new.iter().all(|v| v.is_finite()) {
                r_new.norm_squared()
            } else {
                f64::INFINITY
            };
            (cost_new < cost).then(|| (dx, x_new, r_new, cost_new))
        });

        let Some((dx, x_new, r_new, cost_new)) = accepted else {
            // Rejected step (or failed factorization): steeper damping.
            // Once the damping is saturated, no direction improves the cost
            // and the current point is a numerical optimum.
            if lambda >= LAMBDA_MAX {
                return Some(LmReport {
                    x,
                    cost,
                    iterations: iter,
                    converged: true,
                });
            }
            lambda = (lambda * lambda_up).min(LAMBDA_MAX);
            continue;
        };

        let improvement = cost - cost_new;
        let step_norm = dx.norm();
        x = x_new;
        r = r_new;
        cost = cost_new;
        lambda = (lambda * lambda_down).max(LAMBDA_MIN);

        if improvement <= opts.cost_tol * cost.max(COST_FLOOR) {
            return Some(LmReport {
                x,
                cost,
                iterations: iter + 1,
                converged: true,
            });
        }
        if step_norm < opts.step_tol * (1.0 + x.norm()) {
            return Some(LmReport {
                x,
                cost,
                iterations: iter + 1,
                converged: true,
            });
        }
    }

    Some(LmReport {
        x,
        cost,
        iterations: opts.max_iter,
        converged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_linear_coefficients() {
        // Fit y = a + b t on exact data; LM should land on the OLS solution.
        let ts = [0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = ts.iter().map(|t| 2.0 + 3.0 * t).collect();

        let residuals = |x: &DVector<f64>| {
            DVector::from_iterator(
                ts.len(),
                ts.iter().zip(&ys).map(|(&t, &y)| y - (x[0] + x[1] * t)),
            )
        };
        let jacobian = |_x: &DVector<f64>| {
            DMatrix::from_fn(ts.len(), 2, |i, j| if j == 0 { -1.0 } else { -ts[i] })
        };

        let x0 = DVector::from_row_slice(&[0.0, 0.0]);
        let report = levenberg_marquardt(residuals, jacobian, &x0, &LmOptions::default()).unwrap();
        assert!(report.converged);
        assert!((report.x[0] - 2.0).abs() < 1e-5);
        assert!((report.x[1] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn recovers_exponential_decay_rate() {
        // y = exp(-k t) with k = 0.5, seeded away from the truth.
        let ts: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let ys: Vec<f64> = ts.iter().map(|t| (-0.5 * t).exp()).collect();

        let residuals = |x: &DVector<f64>| {
            DVector::from_iterator(
                ts.len(),
                ts.iter().zip(&ys).map(|(&t, &y)| y - (-x[0] * t).exp()),
            )
        };
        let jacobian = |x: &DVector<f64>| {
            DMatrix::from_fn(ts.len(), 1, |i, _| {
                let t = ts[i];
                t * (-x[0] * t).exp()
            })
        };

        let x0 = DVector::from_row_slice(&[0.1]);
        let report = levenberg_marquardt(residuals, jacobian, &x0, &LmOptions::default()).unwrap();
        assert!(report.converged);
        assert!((report.x[0] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn noisy_optimum_with_large_cost_still_converges() {
        // y = a + b t plus fixed "noise": the optimum cost is far above any
        // absolute threshold, so convergence must come from the gradient or
        // relative-progress checks, not the cost itself.
        let ts = [0.0, 1.0, 2.0, 3.0, 4.0];
        let noise = [4.0, -3.0, 5.0, -4.0, 2.0];
        let ys: Vec<f64> = ts
            .iter()
            .zip(&noise)
            .map(|(&t, &e)| 2.0 + 3.0 * t + e)
            .collect();

        let residuals = |x: &DVector<f64>| {
            DVector::from_iterator(
                ts.len(),
                ts.iter().zip(&ys).map(|(&t, &y)| y - (x[0] + x[1] * t)),
            )
        };
        let jacobian = |_x: &DVector<f64>| {
            DMatrix::from_fn(ts.len(), 2, |i, j| if j == 0 { -1.0 } else { -ts[i] })
        };

        let x0 = DVector::from_row_slice(&[0.0, 0.0]);
        let report = levenberg_marquardt(residuals, jacobian, &x0, &LmOptions::default()).unwrap();
        assert!(report.converged, "cost at exit: {}", report.cost);
        assert!(report.cost > 1.0, "optimum should retain the noise cost");
        // Normal equations by hand: the gradient vanishes at the OLS line.
        let n = ts.len() as f64;
        let st: f64 = ts.iter().sum();
        let sy: f64 = ys.iter().sum();
        let stt: f64 = ts.iter().map(|t| t * t).sum();
        let sty: f64 = ts.iter().zip(&ys).map(|(&t, &y)| t * y).sum();
        let slope = (n * sty - st * sy) / (n * stt - st * st);
        let intercept = (sy - slope * st) / n;
        assert!((report.x[0] - intercept).abs() < 1e-4);
        assert!((report.x[1] - slope).abs() < 1e-4);
    }

    #[test]
    fn rejects_non_finite_initial_residuals() {
        let residuals = |_x: &DVector<f64>| DVector::from_row_slice(&[f64::NAN]);
        let jacobian = |_x: &DVector<f64>| DMatrix::from_row_slice(1, 1, &[1.0]);
        let x0 = DVector::from_row_slice(&[1.0]);
        assert!(levenberg_marquardt(residuals, jacobian, &x0, &LmOptions::default()).is_none());
    }

    #[test]
    fn budget_exhaustion_reports_not_converged() {
        // A residual that never improves enough to converge in one iteration.
        let ts: Vec<f64> = (0..6).map(|i| i as f64 * 0.5).collect();
        let ys: Vec<f64> = ts.iter().map(|t| (-0.7 * t).exp()).collect();

        let residuals = |x: &DVector<f64>| {
            DVector::from_iterator(
                ts.len(),
                ts.iter().zip(&ys).map(|(&t, &y)| y - (-x[0] * t).exp()),
            )
        };
        let jacobian = |x: &DVector<f64>| {
            DMatrix::from_fn(ts.len(), 1, |i, _| {
                let t = ts[i];
                t * (-x[0] * t).exp()
            })
        };

        let opts = LmOptions {
            max_iter: 1,
            cost_tol: 0.0,
            step_tol: 0.0,
            grad_tol: 0.0,
        };
        let x0 = DVector::from_row_slice(&[0.05]);
        let report = levenberg_marquardt(residuals, jacobian, &x0, &opts).unwrap();
        assert!(!report.converged);
        assert_eq!(report.iterations, 1);
    }
}
