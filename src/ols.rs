//! Ordinary least squares with the usual regression summary statistics.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use crate::error::{PipelineError, Result};
use crate::model::LinearModel;
use crate::table::CONST_COLUMN;

const SVD_EPS: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    pub r_squared: f64,
    pub r_squared_adj: f64,
    pub f_value: f64,
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub nobs: usize,
    pub df_model: f64,
    pub df_resid: f64,
    pub has_constant: bool,
}

impl OlsFit {
    pub fn model(&self) -> LinearModel {
        LinearModel::from_pairs(
            self.feature_names
                .iter()
                .cloned()
                .zip(self.coefficients.iter().copied()),
        )
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(features)
            .map(|(b, x)| b * x)
            .sum()
    }
}

/// Fits `outcome ≈ rows · β`. Each entry of `rows` holds one observation with one value
/// per name in `feature_names`.
pub trait OlsFitter {
    fn fit(&self, feature_names: &[String], rows: &[Vec<f64>], outcome: &[f64]) -> Result<OlsFit>;
}

/// SVD-based solver; tolerant of tall and mildly collinear designs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraOls;

impl OlsFitter for NalgebraOls {
    fn fit(&self, feature_names: &[String], rows: &[Vec<f64>], outcome: &[f64]) -> Result<OlsFit> {
        let n = rows.len();
        let k = feature_names.len();
        if k == 0 {
            return Err(PipelineError::Regression("no feature columns".to_string()));
        }
        if n != outcome.len() {
            return Err(PipelineError::Regression(format!(
                "{n} design rows but {} outcomes",
                outcome.len()
            )));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != k) {
            return Err(PipelineError::Regression(format!(
                "design row has {} values, expected {k}",
                bad.len()
            )));
        }
        if n <= k {
            return Err(PipelineError::NotEnoughRows { needed: k, have: n });
        }

        let x = DMatrix::from_fn(n, k, |i, j| rows[i][j]);
        let y = DVector::from_column_slice(outcome);

        let svd = x.clone().svd(true, true);
        let beta = svd
            .solve(&y, SVD_EPS)
            .map_err(|e| PipelineError::Regression(e.to_string()))?;
        if beta.iter().any(|b| !b.is_finite()) {
            return Err(PipelineError::Regression(
                "non-finite coefficients".to_string(),
            ));
        }

        let residuals = &y - &x * &beta;
        let ssr = residuals.norm_squared();

        let has_constant = feature_names.iter().any(|f| f == CONST_COLUMN)
            || (0..k).any(|j| x.column(j).iter().all(|v| *v == 1.0));
        let tss = if has_constant {
            let mean = y.mean();
            y.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        } else {
            y.norm_squared()
        };

        let nf = n as f64;
        let df_resid = (n - k) as f64;
        let df_model = if has_constant { k as f64 - 1.0 } else { k as f64 };

        let r_squared = if tss > 0.0 { 1.0 - ssr / tss } else { 0.0 };
        let k_const = if has_constant { 1.0 } else { 0.0 };
        let r_squared_adj = 1.0 - (nf - k_const) / df_resid * (1.0 - r_squared);

        let sigma2 = ssr / df_resid;
        let xtx = x.transpose() * &x;
        let xtx_inv = match xtx.clone().try_inverse() {
            Some(inv) => inv,
            None => xtx
                .pseudo_inverse(SVD_EPS)
                .map_err(|e| PipelineError::Regression(e.to_string()))?,
        };

        let t_dist = StudentsT::new(0.0, 1.0, df_resid)
            .map_err(|e| PipelineError::Regression(e.to_string()))?;
        let mut std_errors = Vec::with_capacity(k);
        let mut t_values = Vec::with_capacity(k);
        let mut p_values = Vec::with_capacity(k);
        for j in 0..k {
            let se = (sigma2 * xtx_inv[(j, j)]).max(0.0).sqrt();
            let t = if se > 0.0 { beta[j] / se } else { f64::NAN };
            let p = if t.is_finite() {
                2.0 * t_dist.sf(t.abs())
            } else {
                f64::NAN
            };
            std_errors.push(se);
            t_values.push(t);
            p_values.push(p);
        }

        let ess = tss - ssr;
        let (f_value, f_p_value) = if df_model > 0.0 && ssr > 0.0 {
            let f = (ess / df_model) / (ssr / df_resid);
            let p = FisherSnedecor::new(df_model, df_resid)
                .map(|d| d.sf(f))
                .unwrap_or(f64::NAN);
            (f, p)
        } else {
            (f64::NAN, f64::NAN)
        };

        let log_likelihood =
            -nf / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);
        let aic = -2.0 * log_likelihood + 2.0 * k as f64;
        let bic = -2.0 * log_likelihood + k as f64 * nf.ln();

        Ok(OlsFit {
            feature_names: feature_names.to_vec(),
            coefficients: beta.iter().copied().collect(),
            std_errors,
            t_values,
            p_values,
            r_squared,
            r_squared_adj,
            f_value,
            f_p_value,
            log_likelihood,
            aic,
            bic,
            nobs: n,
            df_model,
            df_resid,
            has_constant,
        })
    }
}
