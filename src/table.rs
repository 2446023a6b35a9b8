use std::ops::Range;

use serde::Serialize;
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::model::LinearModel;

pub const CONST_COLUMN: &str = "const";
pub const POINTS_COLUMN: &str = "points";
pub const FORM_HOME_COLUMN: &str = "form_home";
pub const FORM_POINTS_COLUMN: &str = "form_points";
pub const FORM_RESIDUALS_COLUMN: &str = "form_residuals";
pub const PREDICTED_COLUMN: &str = "predicted";
pub const RESIDUAL_COLUMN: &str = "residual";

/// Trailing-window summary of a team, or the home-minus-away difference of two of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FormSignal {
    /// Share of the window played at home.
    pub home_rate: f64,
    pub points: f64,
    pub residual: f64,
}

impl FormSignal {
    pub const ZERO: FormSignal = FormSignal {
        home_rate: 0.0,
        points: 0.0,
        residual: 0.0,
    };

    pub fn minus(self, other: FormSignal) -> FormSignal {
        FormSignal {
            home_rate: self.home_rate - other.home_rate,
            points: self.points - other.points,
            residual: self.residual - other.residual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRow {
    pub game_id: u64,
    pub home: String,
    pub away: String,
    /// Home points minus away points.
    pub points: f64,
    /// Home-minus-away statistic deltas, aligned with `FeatureTable::stat_names`.
    pub deltas: Vec<f64>,
    pub predicted: f64,
    pub residual: f64,
    pub form: FormSignal,
}

impl GameRow {
    pub fn new(game_id: u64, home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            game_id,
            home: home.into(),
            away: away.into(),
            points: 0.0,
            deltas: Vec::new(),
            predicted: 0.0,
            residual: 0.0,
            form: FormSignal::ZERO,
        }
    }

    /// An empty name never matches: unnamed sides are distinct unknown teams.
    pub fn involves(&self, team: &str) -> bool {
        !team.is_empty() && (self.home == team || self.away == team)
    }
}

/// A named column, resolved once so per-row lookups avoid string compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Const,
    Points,
    FormHome,
    FormPoints,
    FormResiduals,
    Predicted,
    Residual,
    Stat(usize),
}

/// Games ordered ascending by `game_id`, which is the chronological order every
/// consumer relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureTable {
    stat_names: Vec<String>,
    rows: Vec<GameRow>,
}

impl FeatureTable {
    /// Sorts `rows` by game id (stable) and drops repeated ids, keeping the first.
    pub fn new(stat_names: Vec<String>, mut rows: Vec<GameRow>) -> Self {
        rows.sort_by_key(|r| r.game_id);
        let before = rows.len();
        rows.dedup_by_key(|r| r.game_id);
        if rows.len() != before {
            warn!(dropped = before - rows.len(), "duplicate game ids removed");
        }
        for row in &mut rows {
            row.deltas.resize(stat_names.len(), 0.0);
        }
        Self { stat_names, rows }
    }

    pub fn stat_names(&self) -> &[String] {
        &self.stat_names
    }

    pub fn rows(&self) -> &[GameRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [GameRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Result<Column> {
        let column = match name {
            CONST_COLUMN => Column::Const,
            POINTS_COLUMN => Column::Points,
            FORM_HOME_COLUMN => Column::FormHome,
            FORM_POINTS_COLUMN => Column::FormPoints,
            FORM_RESIDUALS_COLUMN => Column::FormResiduals,
            PREDICTED_COLUMN => Column::Predicted,
            RESIDUAL_COLUMN => Column::Residual,
            _ => self
                .stat_names
                .iter()
                .position(|s| s == name)
                .map(Column::Stat)
                .ok_or_else(|| PipelineError::UnknownColumn(name.to_string()))?,
        };
        Ok(column)
    }

    pub fn value(row: &GameRow, column: Column) -> f64 {
        match column {
            Column::Const => 1.0,
            Column::Points => row.points,
            Column::FormHome => row.form.home_rate,
            Column::FormPoints => row.form.points,
            Column::FormResiduals => row.form.residual,
            Column::Predicted => row.predicted,
            Column::Residual => row.residual,
            Column::Stat(idx) => row.deltas.get(idx).copied().unwrap_or(0.0),
        }
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.resolve(name)?;
        Ok(self.rows.iter().map(|r| Self::value(r, column)).collect())
    }

    /// Index of the first row whose id is not below `game_id`; every row before it
    /// happened strictly earlier.
    pub fn history_end(&self, game_id: u64) -> usize {
        self.rows.partition_point(|r| r.game_id < game_id)
    }

    pub fn position(&self, game_id: u64) -> Option<usize> {
        self.rows.binary_search_by_key(&game_id, |r| r.game_id).ok()
    }

    /// Rows played strictly before `game_id`.
    pub fn history_before(&self, game_id: u64) -> &[GameRow] {
        &self.rows[..self.history_end(game_id)]
    }

    pub fn slice(&self, range: Range<usize>) -> FeatureTable {
        let start = range.start.min(self.rows.len());
        let end = range.end.clamp(start, self.rows.len());
        FeatureTable {
            stat_names: self.stat_names.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// Fills `predicted` and `residual` on every row from `model`.
    pub fn apply_model(&mut self, model: &LinearModel) -> Result<()> {
        let terms = model
            .coefficients()
            .iter()
            .map(|(name, coef)| Ok((self.resolve(name)?, *coef)))
            .collect::<Result<Vec<_>>>()?;
        for row in &mut self.rows {
            let predicted: f64 = terms
                .iter()
                .map(|(column, coef)| Self::value(row, *column) * coef)
                .sum();
            row.predicted = predicted;
            row.residual = row.points - predicted;
        }
        Ok(())
    }
}
