//! Ordinary least squares.

use nalgebra::{DMatrix, DVector};

/// Slope and intercept of `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Fit `y` on `[1, x]` using centered sums.
///
/// Returns `None` when `x` has no variance (singular design) or the lengths
/// differ or are zero.
pub fn fit_line(y: &[f64], x: &[f64]) -> Option<LineFit> {
    let n = y.len();
    if n == 0 || n != x.len() {
        return None;
    }
    let nf = n as f64;
    let mx = x.iter().sum::<f64>() / nf;
    let my = y.iter().sum::<f64>() / nf;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        sxx += dx * dx;
        sxy += dx * (yi - my);
    }
    if sxx <= f64::EPSILON * nf * mx.abs().max(1.0).powi(2) {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }
    Some(LineFit { slope, intercept })
}

/// Multi-regressor OLS fit with classical standard errors.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: DVector<f64>,
    pub std_errors: DVector<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// Number of estimated coefficients.
    pub fn k(&self) -> usize {
        self.coefficients.len()
    }

    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }

    /// Gaussian log-likelihood at the OLS estimate.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion, `-2 llf + 2 k`.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.k() as f64
    }
}

/// Regress `y` on the columns of `x` via the normal equations.
///
/// Returns `None` when the design is singular or there are no residual
/// degrees of freedom.
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsFit> {
    let (n, k) = x.shape();
    if n != y.len() || n <= k {
        return None;
    }
    let xt = x.transpose();
    let xtx_inv = (&xt * x).try_inverse()?;
    let beta = &xtx_inv * (&xt * y);
    let residuals = y - x * &beta;
    let ssr = residuals.norm_squared();
    let sigma2 = ssr / (n - k) as f64;

    let mut se = DVector::zeros(k);
    for i in 0..k {
        let v = xtx_inv[(i, i)];
        if v.is_nan() || v <= 0.0 {
            return None;
        }
        se[i] = (sigma2 * v).sqrt();
    }
    if beta.iter().any(|b| !b.is_finite()) {
        return None;
    }
    Some(OlsFit {
        coefficients: beta,
        std_errors: se,
        ssr,
        nobs: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_line_exact() {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let fit = fit_line(&y, &x).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-10);
        assert!((fit.intercept - 3.0).abs() < 1e-9);
    }

    #[test]
    fn fit_line_constant_regressor_is_none() {
        let x = vec![5.0; 20];
        let y: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!(fit_line(&y, &x).is_none());
    }

    #[test]
    fn fit_line_rejects_mismatched_lengths() {
        assert!(fit_line(&[1.0, 2.0], &[1.0]).is_none());
        assert!(fit_line(&[], &[]).is_none());
    }

    #[test]
    fn ols_matches_line_fit() {
        let x: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin() * 10.0 + i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.5 - 0.8 * v + if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect();
        let design = DMatrix::from_fn(x.len(), 2, |r, c| if c == 0 { 1.0 } else { x[r] });
        let fit = ols(&design, &DVector::from_vec(y.clone())).unwrap();
        let line = fit_line(&y, &x).unwrap();
        assert!((fit.coefficients[1] - line.slope).abs() < 1e-9);
        assert!((fit.coefficients[0] - line.intercept).abs() < 1e-9);
        assert!(fit.std_errors.iter().all(|s| *s > 0.0));
    }

    #[test]
    fn ols_singular_design_is_none() {
        let design = DMatrix::from_fn(10, 2, |_, _| 1.0);
        let y = DVector::from_fn(10, |i, _| i as f64);
        assert!(ols(&design, &y).is_none());
    }

    #[test]
    fn ols_needs_residual_degrees_of_freedom() {
        let design = DMatrix::from_fn(2, 2, |r, c| if c == 0 { 1.0 } else { r as f64 });
        let y = DVector::from_vec(vec![1.0, 2.0]);
        assert!(ols(&design, &y).is_none());
    }
}
