use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ols::OlsFit;

/// Feature name to coefficient. Predictions are the dot product with a row's features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    coefficients: BTreeMap<String, f64>,
}

impl LinearModel {
    pub fn new(coefficients: BTreeMap<String, f64>) -> Self {
        Self { coefficients }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            coefficients: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn coefficients(&self) -> &BTreeMap<String, f64> {
        &self.coefficients
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.coefficients.keys().cloned().collect()
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.coefficients.get(name).copied()
    }
}

/// On-disk record of a fitted regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub params: BTreeMap<String, f64>,
    pub pvalues: BTreeMap<String, f64>,
    pub rsquared: f64,
    pub rsquared_adj: f64,
    pub fvalue: f64,
    pub f_pvalue: f64,
    pub aic: f64,
    pub bic: f64,
    pub nobs: usize,
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl ModelSummary {
    pub fn from_fit(name: impl Into<String>, fit: &OlsFit) -> Self {
        let params = fit
            .feature_names
            .iter()
            .cloned()
            .zip(fit.coefficients.iter().copied())
            .collect();
        let pvalues = fit
            .feature_names
            .iter()
            .cloned()
            .zip(fit.p_values.iter().map(|p| finite_or(*p, 1.0)))
            .collect();
        Self {
            name: name.into(),
            params,
            pvalues,
            rsquared: fit.r_squared,
            rsquared_adj: fit.r_squared_adj,
            fvalue: finite_or(fit.f_value, 0.0),
            f_pvalue: finite_or(fit.f_p_value, 1.0),
            aic: finite_or(fit.aic, 0.0),
            bic: finite_or(fit.bic, 0.0),
            nobs: fit.nobs,
            generated_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn model(&self) -> LinearModel {
        LinearModel::new(self.params.clone())
    }
}

// JSON has no NaN; undefined statistics are stored as their neutral value.
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

pub fn model_name(start_year: i32, end_year: i32) -> String {
    format!("{start_year}_{end_year}")
}

pub fn model_path(models_dir: &Path, name: &str) -> PathBuf {
    models_dir.join(format!("{name}.json"))
}

pub fn save_summary(models_dir: &Path, summary: &ModelSummary) -> Result<PathBuf> {
    fs::create_dir_all(models_dir)
        .with_context(|| format!("create models dir {}", models_dir.display()))?;
    let path = model_path(models_dir, &summary.name);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(summary).context("serialize model summary")?;
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display()))?;
    Ok(path)
}

pub fn load_summary(models_dir: &Path, name: &str) -> Result<ModelSummary> {
    let path = model_path(models_dir, name);
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid model json {}", path.display()))
}
