//! Trailing-window team form.
//!
//! Form for a game is built only from rows with a strictly smaller game id. The table is
//! sorted by game id, so the history of a game is always a prefix of the table and later
//! rows can never influence it.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::table::{FeatureTable, FormSignal, GameRow};

pub const DEFAULT_WINDOW: usize = 5;
/// First row index that receives a form signal.
pub const WARMUP_START: usize = 15;
/// Leading rows discarded after augmentation.
pub const WARMUP_ROWS: usize = 16;

/// Whose point of view historical margins are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointsPerspective {
    /// Use the stored home-minus-away margin and residual as-is, whichever side the team
    /// played on.
    #[default]
    Stored,
    /// Negate margin and residual of rows in which the team was the away side.
    Team,
}

impl PointsPerspective {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stored" | "home" => Some(Self::Stored),
            "team" => Some(Self::Team),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormConfig {
    pub window: usize,
    pub warmup_start: usize,
    pub warmup_rows: usize,
    pub perspective: PointsPerspective,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            warmup_start: WARMUP_START,
            warmup_rows: WARMUP_ROWS,
            perspective: PointsPerspective::Stored,
        }
    }
}

impl FormConfig {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_perspective(mut self, perspective: PointsPerspective) -> Self {
        self.perspective = perspective;
        self
    }
}

/// Form of `team` over the last `window` of its games in `history`.
///
/// `history` must hold only games played before the target. A team with no games in it
/// gets `FormSignal::ZERO`, and so does an unnamed team.
pub fn team_form(
    history: &[GameRow],
    team: &str,
    window: usize,
    perspective: PointsPerspective,
) -> FormSignal {
    if team.is_empty() {
        return FormSignal::ZERO;
    }
    let recent: Vec<&GameRow> = history
        .iter()
        .rev()
        .filter(|r| r.involves(team))
        .take(window)
        .collect();
    if recent.is_empty() {
        return FormSignal::ZERO;
    }

    let n = recent.len() as f64;
    let mut home_games = 0usize;
    let mut points = 0.0;
    let mut residual = 0.0;
    for row in &recent {
        let at_home = row.home == team;
        if at_home {
            home_games += 1;
        }
        let sign = match perspective {
            PointsPerspective::Team if !at_home => -1.0,
            _ => 1.0,
        };
        points += sign * row.points;
        residual += sign * row.residual;
    }

    FormSignal {
        home_rate: home_games as f64 / n,
        points: points / n,
        residual: residual / n,
    }
}

/// Form of `team` going into `target_game_id`, from games with a strictly smaller id.
pub fn get_team_form(
    table: &FeatureTable,
    target_game_id: u64,
    team: &str,
    window: usize,
    perspective: PointsPerspective,
) -> FormSignal {
    team_form(
        table.history_before(target_game_id),
        team,
        window,
        perspective,
    )
}

/// Home form minus away form for the row at `index`, or `None` past the end of the table.
pub fn game_form(table: &FeatureTable, index: usize, cfg: &FormConfig) -> Option<FormSignal> {
    let row = table.rows().get(index)?;
    let home = get_team_form(table, row.game_id, &row.home, cfg.window, cfg.perspective);
    let away = get_team_form(table, row.game_id, &row.away, cfg.window, cfg.perspective);
    Some(home.minus(away))
}

/// Fills the form columns from `cfg.warmup_start` on, then drops the first
/// `cfg.warmup_rows` rows. Residuals should already be populated if form residuals are
/// to mean anything.
pub fn augment_with_form(mut table: FeatureTable, cfg: &FormConfig) -> FeatureTable {
    let len = table.len();
    let start = cfg.warmup_start.min(len);
    let forms: Vec<FormSignal> = (start..len)
        .into_par_iter()
        .map(|i| game_form(&table, i, cfg).unwrap_or_default())
        .collect();
    for (row, form) in table.rows_mut()[start..].iter_mut().zip(forms) {
        row.form = form;
    }
    debug!(rows = len - start, window = cfg.window, "form signals computed");

    let kept = table.slice(cfg.warmup_rows.min(len)..len);
    info!(
        rows = kept.len(),
        discarded = len - kept.len(),
        perspective = ?cfg.perspective,
        "form augmentation done"
    );
    kept
}
