//! Chronological train/test split, model fitting and residual diagnostics.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::ols::{OlsFit, OlsFitter};
use crate::table::{FeatureTable, POINTS_COLUMN};

/// The last `test_rows` rows form the test set; everything before them trains.
pub fn split_train_test(table: &FeatureTable, test_rows: usize) -> Result<(FeatureTable, FeatureTable)> {
    let len = table.len();
    if len <= test_rows {
        return Err(PipelineError::NotEnoughRows {
            needed: test_rows,
            have: len,
        });
    }
    let split = len - test_rows;
    Ok((table.slice(0..split), table.slice(split..len)))
}

/// Design rows for `features`, one per table row.
pub fn design_matrix(table: &FeatureTable, features: &[String]) -> Result<Vec<Vec<f64>>> {
    let columns = features
        .iter()
        .map(|f| table.resolve(f))
        .collect::<Result<Vec<_>>>()?;
    Ok(table
        .rows()
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| FeatureTable::value(row, *c))
                .collect()
        })
        .collect())
}

pub fn fit<F>(fitter: &F, table: &FeatureTable, features: &[String]) -> Result<OlsFit>
where
    F: OlsFitter + ?Sized,
{
    let design = design_matrix(table, features)?;
    let outcome = table.column(POINTS_COLUMN)?;
    let fit = fitter.fit(features, &design, &outcome)?;
    info!(
        nobs = fit.nobs,
        r_squared = fit.r_squared,
        aic = fit.aic,
        "model fitted"
    );
    Ok(fit)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub game_id: u64,
    pub home: String,
    pub away: String,
    pub points: f64,
    pub predicted: f64,
    pub residual: f64,
}

pub fn predict(fit: &OlsFit, table: &FeatureTable) -> Result<Vec<Prediction>> {
    let design = design_matrix(table, &fit.feature_names)?;
    Ok(table
        .rows()
        .iter()
        .zip(design)
        .map(|(row, x)| {
            let predicted = fit.predict(&x);
            Prediction {
                game_id: row.game_id,
                home: row.home.clone(),
                away: row.away.clone(),
                points: row.points,
                predicted,
                residual: row.points - predicted,
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamResidual {
    pub team: String,
    pub mean_residual: f64,
    pub games: usize,
}

/// Mean residual per team from that team's point of view: a home row counts its
/// residual, an away row counts the negation. Unnamed sides are skipped. Sorted best-first.
pub fn team_residuals(predictions: &[Prediction]) -> Vec<TeamResidual> {
    let mut acc: HashMap<&str, (f64, usize)> = HashMap::new();
    for p in predictions {
        for (team, residual) in [(&p.home, p.residual), (&p.away, -p.residual)] {
            if team.is_empty() {
                continue;
            }
            let slot = acc.entry(team.as_str()).or_default();
            slot.0 += residual;
            slot.1 += 1;
        }
    }
    let mut out: Vec<TeamResidual> = acc
        .into_iter()
        .map(|(team, (sum, games))| TeamResidual {
            team: team.to_string(),
            mean_residual: sum / games as f64,
            games,
        })
        .collect();
    out.sort_by(|a, b| {
        b.mean_residual
            .partial_cmp(&a.mean_residual)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.team.cmp(&b.team))
    });
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResidualSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Count, mean, sample standard deviation and linear-interpolated quartiles.
pub fn describe(values: &[f64]) -> ResidualSummary {
    if values.is_empty() {
        return ResidualSummary::default();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    ResidualSummary {
        count: n,
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[n - 1],
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Share of decided games whose predicted winner matches the actual one.
pub fn winner_accuracy(predictions: &[Prediction]) -> Option<f64> {
    let decided: Vec<&Prediction> = predictions.iter().filter(|p| p.points != 0.0).collect();
    if decided.is_empty() {
        return None;
    }
    let correct = decided
        .iter()
        .filter(|p| (p.points > 0.0) == (p.predicted > 0.0))
        .count();
    Some(correct as f64 / decided.len() as f64)
}
