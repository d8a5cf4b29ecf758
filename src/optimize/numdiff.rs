use super::Interval;
use nalgebra::DMatrix;

/// Central-difference step for a parameter of magnitude `v`.
pub(crate) fn central_step(v: f64) -> f64 {
    f64::EPSILON.cbrt() * v.abs().max(1.0)
}

/// Jacobian of `model(xᵢ, p)` with respect to `p`, one row per sample.
pub(crate) fn jacobian<F>(model: &F, xs: &[f64], params: &[f64]) -> DMatrix<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut jac = DMatrix::zeros(xs.len(), params.len());
    let mut shifted = params.to_vec();
    for j in 0..params.len() {
        let h = central_step(params[j]);
        shifted[j] = params[j] + h;
        let plus: Vec<f64> = xs.iter().map(|&x| model(x, &shifted)).collect();
        shifted[j] = params[j] - h;
        for (i, &x) in xs.iter().enumerate() {
            jac[(i, j)] = (plus[i] - model(x, &shifted)) / (2.0 * h);
        }
        shifted[j] = params[j];
    }
    jac
}

/// Gradient of `loss` at `x`. Falls back to one-sided differences when a
/// central difference would leave the box.
pub(crate) fn gradient<F>(loss: &F, x: &[f64], fx: f64, bounds: &[Interval]) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut shifted = x.to_vec();
    let mut grad = vec![0.0; x.len()];
    for j in 0..x.len() {
        let h = central_step(x[j]);
        let b = bounds.get(j).copied().unwrap_or_else(Interval::free);
        let up_ok = b.contains(x[j] + h);
        let down_ok = b.contains(x[j] - h);
        grad[j] = match (up_ok, down_ok) {
            (true, true) => {
                shifted[j] = x[j] + h;
                let fp = loss(&shifted);
                shifted[j] = x[j] - h;
                let fm = loss(&shifted);
                (fp - fm) / (2.0 * h)
            }
            (true, false) => {
                shifted[j] = x[j] + h;
                (loss(&shifted) - fx) / h
            }
            (false, true) => {
                shifted[j] = x[j] - h;
                (fx - loss(&shifted)) / h
            }
            (false, false) => 0.0,
        };
        shifted[j] = x[j];
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn jacobian_of_linear_model() {
        let model = |x: f64, p: &[f64]| p[0] * x + p[1];
        let xs = [0.0, 1.0, 2.0];
        let jac = jacobian(&model, &xs, &[3.0, -1.0]);
        for (i, &x) in xs.iter().enumerate() {
            assert_relative_eq!(jac[(i, 0)], x, epsilon = 1e-8);
            assert_relative_eq!(jac[(i, 1)], 1.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn gradient_is_one_sided_at_the_bound() {
        let loss = |p: &[f64]| (p[0] - 2.0).powi(2);
        let bounds = [Interval::new(0.0, 10.0)];
        let g = gradient(&loss, &[0.0], loss(&[0.0]), &bounds);
        assert_relative_eq!(g[0], -4.0, epsilon = 1e-4);
        let g = gradient(&loss, &[5.0], loss(&[5.0]), &bounds);
        assert_relative_eq!(g[0], 6.0, epsilon = 1e-6);
    }
}
