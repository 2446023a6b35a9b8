//! Builds the per-game home-minus-away feature table from side-attributed aggregates.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::source::{Side, StatSource, YearRange};
use crate::table::{FeatureTable, GameRow};

/// What a game missing from one side of a join means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingValuePolicy {
    /// The side recorded none of the statistic: count it as zero.
    #[default]
    ZeroFill,
    /// The figure is unknown: leave the game out of the table.
    DropGame,
}

impl MissingValuePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "zero" | "zero_fill" | "zerofill" => Some(Self::ZeroFill),
            "drop" | "drop_game" | "dropgame" => Some(Self::DropGame),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Sided {
    home: Option<f64>,
    away: Option<f64>,
}

impl Sided {
    fn delta(self, policy: MissingValuePolicy) -> Option<f64> {
        match (self.home, self.away, policy) {
            (Some(h), Some(a), _) => Some(h - a),
            (_, _, MissingValuePolicy::DropGame) => None,
            (h, a, MissingValuePolicy::ZeroFill) => Some(h.unwrap_or(0.0) - a.unwrap_or(0.0)),
        }
    }

    fn is_partial(self) -> bool {
        self.home.is_none() || self.away.is_none()
    }
}

fn outer_join(home: &[(u64, f64)], away: &[(u64, f64)]) -> BTreeMap<u64, Sided> {
    let mut joined: BTreeMap<u64, Sided> = BTreeMap::new();
    for (id, value) in home {
        let slot = joined.entry(*id).or_default();
        slot.home = Some(slot.home.unwrap_or(0.0) + value);
    }
    for (id, value) in away {
        let slot = joined.entry(*id).or_default();
        slot.away = Some(slot.away.unwrap_or(0.0) + value);
    }
    joined
}

/// Outer-joins two per-game sequences on game id and subtracts away from home, in
/// ascending game-id order. Under `DropGame`, games present on only one side are omitted.
pub fn delta_column(
    home: &[(u64, f64)],
    away: &[(u64, f64)],
    policy: MissingValuePolicy,
) -> Vec<(u64, f64)> {
    outer_join(home, away)
        .into_iter()
        .filter_map(|(id, sided)| sided.delta(policy).map(|d| (id, d)))
        .collect()
}

/// Builds the feature table for `stat_names` over `years`, sorted ascending by game id.
///
/// Each statistic becomes a home-minus-away column, the outcome column is home points
/// minus away points, and team names are attached for display.
pub fn build_delta_table<S>(
    source: &S,
    stat_names: &[String],
    years: YearRange,
    policy: MissingValuePolicy,
) -> Result<FeatureTable>
where
    S: StatSource + ?Sized,
{
    let mut stat_columns = Vec::with_capacity(stat_names.len());
    for stat in stat_names {
        let home = source
            .query_stat(stat, years, Side::Home)
            .with_context(|| format!("home values for {stat}"))?;
        let away = source
            .query_stat(stat, years, Side::Away)
            .with_context(|| format!("away values for {stat}"))?;
        if home.is_empty() && away.is_empty() {
            warn!(stat = %stat, "statistic has no recorded values; column will be all zero");
        }
        debug!(stat = %stat, home = home.len(), away = away.len(), "stat sequences loaded");
        stat_columns.push(outer_join(&home, &away));
    }

    let home_points = source
        .query_outcome(years, Side::Home)
        .context("home points")?;
    let away_points = source
        .query_outcome(years, Side::Away)
        .context("away points")?;
    let points = outer_join(&home_points, &away_points);

    let home_names: BTreeMap<u64, String> = source
        .query_team_names(years, Side::Home)
        .context("home team names")?
        .into_iter()
        .collect();
    let away_names: BTreeMap<u64, String> = source
        .query_team_names(years, Side::Away)
        .context("away team names")?
        .into_iter()
        .collect();

    let mut game_ids: BTreeSet<u64> = points.keys().copied().collect();
    for column in &stat_columns {
        game_ids.extend(column.keys().copied());
    }

    let mut rows = Vec::with_capacity(game_ids.len());
    let mut zero_filled = 0usize;
    let mut dropped = 0usize;
    'games: for id in game_ids {
        let home = home_names.get(&id);
        let away = away_names.get(&id);
        if policy == MissingValuePolicy::DropGame && (home.is_none() || away.is_none()) {
            dropped += 1;
            continue;
        }

        let mut row = GameRow::new(
            id,
            home.cloned().unwrap_or_default(),
            away.cloned().unwrap_or_default(),
        );
        let mut partial = false;
        let outcome = points.get(&id).copied().unwrap_or_default();
        partial |= outcome.is_partial();
        let Some(margin) = outcome.delta(policy) else {
            dropped += 1;
            continue;
        };
        row.points = margin;

        row.deltas = Vec::with_capacity(stat_columns.len());
        for column in &stat_columns {
            let sided = column.get(&id).copied().unwrap_or_default();
            partial |= sided.is_partial();
            let Some(delta) = sided.delta(policy) else {
                dropped += 1;
                continue 'games;
            };
            row.deltas.push(delta);
        }
        if partial {
            zero_filled += 1;
        }
        rows.push(row);
    }

    info!(
        games = rows.len(),
        stats = stat_names.len(),
        zero_filled,
        dropped,
        ?policy,
        "delta table built"
    );
    Ok(FeatureTable::new(stat_names.to_vec(), rows))
}
