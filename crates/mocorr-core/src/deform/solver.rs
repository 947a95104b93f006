//! Levenberg-Marquardt optimizer for small dense nonlinear least squares.
//!
//! Uses f64 throughout and Marquardt's diagonal damping, so steps do not
//! depend on how individual parameters are scaled.

/// Settings of the optimizer.
#[derive(Debug, Clone)]
pub struct LmSettings {
    pub max_iterations: usize,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    /// Stop when every parameter step is below `tolerance * (1 + max |param|)`.
    pub tolerance: f64,
}

/// Outcome of one optimization run.
#[derive(Debug, Clone, Copy)]
pub struct LmResult<const N: usize> {
    pub params: [f64; N],
    /// Residual sum of squares at `params`.
    pub chi2: f64,
    /// `true` when the step tolerance was met or no step could lower `chi2`.
    pub converged: bool,
    pub iterations: usize,
}

/// Least-squares model over samples of type `S`.
pub trait LmModel<const N: usize> {
    type Sample;

    fn residual(&self, sample: &Self::Sample, params: &[f64; N]) -> f64;

    /// Partial derivatives of the model value (not the residual).
    fn jacobian_row(&self, sample: &Self::Sample, params: &[f64; N]) -> [f64; N];
}

const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e16;
const CHI2_FLOOR: f64 = 1e-24;

pub fn optimize<const N: usize, M: LmModel<N>>(
    model: &M,
    samples: &[M::Sample],
    initial_params: [f64; N],
    settings: &LmSettings,
) -> LmResult<N> {
    let mut params = initial_params;
    let mut lambda = settings.initial_lambda;
    let mut chi2 = compute_chi2(model, samples, &params);
    let mut converged = false;
    let mut iterations = 0;

    'outer: while iterations < settings.max_iterations {
        iterations += 1;
        let (hessian, gradient) = compute_hessian_gradient(model, samples, &params);

        let step = loop {
            let mut damped = hessian;
            for (i, row) in damped.iter_mut().enumerate() {
                row[i] *= 1.0 + lambda;
            }

            if let Some(delta) = solve(&damped, &gradient) {
                let mut candidate = params;
                for (p, d) in candidate.iter_mut().zip(delta.iter()) {
                    *p += d;
                }
                let candidate_chi2 = compute_chi2(model, samples, &candidate);
                if candidate_chi2 < chi2 {
                    params = candidate;
                    chi2 = candidate_chi2;
                    lambda = (lambda * settings.lambda_down).max(MIN_LAMBDA);
                    break delta;
                }
            }

            lambda *= settings.lambda_up;
            if lambda > MAX_LAMBDA {
                // No damping level lowers the residual: a local minimum.
                converged = true;
                break 'outer;
            }
        };

        let max_step = step.iter().fold(0.0f64, |a, d| a.max(d.abs()));
        let max_param = params.iter().fold(0.0f64, |a, p| a.max(p.abs()));
        if chi2 <= CHI2_FLOOR || max_step <= settings.tolerance * (1.0 + max_param) {
            converged = true;
            break;
        }
    }

    LmResult {
        params,
        chi2,
        converged,
        iterations,
    }
}

fn compute_chi2<const N: usize, M: LmModel<N>>(model: &M, samples: &[M::Sample], params: &[f64; N]) -> f64 {
    samples
        .iter()
        .map(|s| {
            let r = model.residual(s, params);
            r * r
        })
        .sum()
}

/// `J^T J` and `J^T r`, upper triangle computed then mirrored.
#[allow(clippy::needless_range_loop)]
fn compute_hessian_gradient<const N: usize, M: LmModel<N>>(
    model: &M,
    samples: &[M::Sample],
    params: &[f64; N],
) -> ([[f64; N]; N], [f64; N]) {
    let mut hessian = [[0.0f64; N]; N];
    let mut gradient = [0.0f64; N];

    for sample in samples {
        let row = model.jacobian_row(sample, params);
        let r = model.residual(sample, params);
        for i in 0..N {
            gradient[i] += row[i] * r;
            for j in i..N {
                hessian[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 1..N {
        for j in 0..i {
            hessian[i][j] = hessian[j][i];
        }
    }

    (hessian, gradient)
}

/// Gaussian elimination with partial pivoting. `None` when a pivot is
/// negligible relative to the largest diagonal entry.
#[allow(clippy::needless_range_loop)]
fn solve<const N: usize>(a: &[[f64; N]; N], b: &[f64; N]) -> Option<[f64; N]> {
    let mut matrix = *a;
    let mut rhs = *b;

    let scale = (0..N).fold(0.0f64, |m, i| m.max(a[i][i].abs()));
    let threshold = scale * 1e-14;

    for col in 0..N {
        let mut max_row = col;
        let mut max_val = matrix[col][col].abs();
        for row in (col + 1)..N {
            if matrix[row][col].abs() > max_val {
                max_val = matrix[row][col].abs();
                max_row = row;
            }
        }

        if !(max_val > threshold) {
            return None;
        }

        if max_row != col {
            matrix.swap(col, max_row);
            rhs.swap(col, max_row);
        }

        for row in (col + 1)..N {
            let factor = matrix[row][col] / matrix[col][col];
            let pivot_row = matrix[col];
            for (j, m) in matrix[row].iter_mut().enumerate().skip(col) {
                *m -= factor * pivot_row[j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0f64; N];
    for i in (0..N).rev() {
        let mut sum = rhs[i];
        for (j, &xj) in x.iter().enumerate().skip(i + 1) {
            sum -= matrix[i][j] * xj;
        }
        x[i] = sum / matrix[i][i];
    }

    Some(x)
}
