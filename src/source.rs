use std::collections::HashMap;

use anyhow::Result;

/// Which side of a game a stored value was attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn is_home(self) -> bool {
        matches!(self, Side::Home)
    }
}

/// Inclusive range of seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }
}

/// Per-game aggregates served by the storage layer. Every sequence is keyed by game id;
/// a statistic the store does not know yields an empty sequence rather than an error.
pub trait StatSource {
    fn query_stat(&self, stat: &str, years: YearRange, side: Side) -> Result<Vec<(u64, f64)>>;

    /// Points scored by `side` per game.
    fn query_outcome(&self, years: YearRange, side: Side) -> Result<Vec<(u64, f64)>>;

    fn query_team_names(&self, years: YearRange, side: Side) -> Result<Vec<(u64, String)>>;
}

#[derive(Debug, Clone, Default)]
struct GameEntry {
    year: i32,
    home: Option<String>,
    away: Option<String>,
    home_points: Option<f64>,
    away_points: Option<f64>,
}

/// A source held entirely in memory. Tests, benches and synthetic runs use it in place
/// of the database.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    games: HashMap<u64, GameEntry>,
    stats: HashMap<(String, Side), Vec<(u64, f64)>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_game(&mut self, game_id: u64, year: i32, home: &str, away: &str) -> &mut Self {
        self.register_game(game_id, year)
            .set_team(game_id, Side::Home, home)
            .set_team(game_id, Side::Away, away)
    }

    /// Records a game's season without any team names.
    pub fn register_game(&mut self, game_id: u64, year: i32) -> &mut Self {
        self.games.entry(game_id).or_default().year = year;
        self
    }

    pub fn set_team(&mut self, game_id: u64, side: Side, name: &str) -> &mut Self {
        let entry = self.games.entry(game_id).or_default();
        match side {
            Side::Home => entry.home = Some(name.to_string()),
            Side::Away => entry.away = Some(name.to_string()),
        }
        self
    }

    pub fn set_score(&mut self, game_id: u64, side: Side, points: f64) -> &mut Self {
        let entry = self.games.entry(game_id).or_default();
        match side {
            Side::Home => entry.home_points = Some(points),
            Side::Away => entry.away_points = Some(points),
        }
        self
    }

    /// Adds `value` to the running total of `stat` for `side` in `game_id`, the way
    /// per-player counts sum into a team figure.
    pub fn add_stat(&mut self, game_id: u64, stat: &str, side: Side, value: f64) -> &mut Self {
        let series = self.stats.entry((stat.to_string(), side)).or_default();
        match series.iter_mut().find(|(id, _)| *id == game_id) {
            Some((_, total)) => *total += value,
            None => series.push((game_id, value)),
        }
        self
    }

    fn in_range(&self, game_id: u64, years: YearRange) -> bool {
        self.games
            .get(&game_id)
            .is_some_and(|g| years.contains(g.year))
    }
}

impl StatSource for InMemorySource {
    fn query_stat(&self, stat: &str, years: YearRange, side: Side) -> Result<Vec<(u64, f64)>> {
        let Some(series) = self.stats.get(&(stat.to_string(), side)) else {
            return Ok(Vec::new());
        };
        Ok(series
            .iter()
            .filter(|(id, _)| self.in_range(*id, years))
            .copied()
            .collect())
    }

    fn query_outcome(&self, years: YearRange, side: Side) -> Result<Vec<(u64, f64)>> {
        Ok(self
            .games
            .iter()
            .filter(|(_, g)| years.contains(g.year))
            .filter_map(|(id, g)| {
                let points = match side {
                    Side::Home => g.home_points,
                    Side::Away => g.away_points,
                }?;
                Some((*id, points))
            })
            .collect())
    }

    fn query_team_names(&self, years: YearRange, side: Side) -> Result<Vec<(u64, String)>> {
        Ok(self
            .games
            .iter()
            .filter(|(_, g)| years.contains(g.year))
            .filter_map(|(id, g)| {
                let name = match side {
                    Side::Home => g.home.clone(),
                    Side::Away => g.away.clone(),
                }?;
                Some((*id, name))
            })
            .collect())
    }
}
