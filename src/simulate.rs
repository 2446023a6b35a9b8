//! Minute-by-minute Monte Carlo of a rugby league match from per-minute try rates.

use rand::Rng;
use serde::Serialize;

use crate::error::{PipelineError, Result};

pub const MATCH_MINUTES: u32 = 80;
pub const TRY_POINTS: i32 = 4;
pub const CONVERSION_POINTS: i32 = 2;
pub const DEFAULT_CONVERSION_RATE: f64 = 0.76;
pub const DEFAULT_TRIALS: usize = 10_000;
/// Bookmaker margin taken off each probability before quoting odds.
pub const ODDS_MARGIN: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideRates {
    try_per_minute: f64,
    conversion: f64,
}

impl SideRates {
    /// `try_per_minute` is the probability of scoring a try in any one minute.
    pub fn new(try_per_minute: f64) -> Result<Self> {
        Ok(Self {
            try_per_minute: probability(try_per_minute)?,
            conversion: DEFAULT_CONVERSION_RATE,
        })
    }

    pub fn with_conversion(mut self, conversion: f64) -> Result<Self> {
        self.conversion = probability(conversion)?;
        Ok(self)
    }

    pub fn try_per_minute(&self) -> f64 {
        self.try_per_minute
    }

    pub fn conversion(&self) -> f64 {
        self.conversion
    }
}

fn probability(value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PipelineError::InvalidProbability(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub trials: usize,
    pub home_wins: usize,
    pub away_wins: usize,
    pub draws: usize,
    pub mean_margin: f64,
    /// Home share of decided games.
    pub home_prob: f64,
    pub away_prob: f64,
}

impl SimulationSummary {
    pub fn home_odds(&self) -> Option<f64> {
        fair_odds(self.home_prob)
    }

    pub fn away_odds(&self) -> Option<f64> {
        fair_odds(self.away_prob)
    }
}

/// Decimal odds after the bookmaker margin, or `None` when the probability does not
/// clear the margin.
pub fn fair_odds(prob: f64) -> Option<f64> {
    let p = prob - ODDS_MARGIN;
    (p > 0.0).then(|| 1.0 / p)
}

/// Final home-minus-away margin of one simulated match.
pub fn simulate_game<R: Rng>(home: SideRates, away: SideRates, rng: &mut R) -> i32 {
    let mut margin = 0;
    for _ in 0..MATCH_MINUTES {
        margin += score_minute(home, rng);
        margin -= score_minute(away, rng);
    }
    margin
}

fn score_minute<R: Rng>(rates: SideRates, rng: &mut R) -> i32 {
    let scored = rng.gen_bool(rates.try_per_minute);
    let converted = rng.gen_bool(rates.conversion) && scored;
    i32::from(scored) * TRY_POINTS + i32::from(converted) * CONVERSION_POINTS
}

pub fn simulate_match<R: Rng>(
    home: SideRates,
    away: SideRates,
    trials: usize,
    rng: &mut R,
) -> SimulationSummary {
    let mut home_wins = 0usize;
    let mut away_wins = 0usize;
    let mut margin_sum = 0i64;
    for _ in 0..trials {
        let margin = simulate_game(home, away, rng);
        margin_sum += i64::from(margin);
        if margin > 0 {
            home_wins += 1;
        } else if margin < 0 {
            away_wins += 1;
        }
    }

    let decided = home_wins + away_wins;
    let (home_prob, away_prob) = if decided > 0 {
        (
            home_wins as f64 / decided as f64,
            away_wins as f64 / decided as f64,
        )
    } else {
        (0.5, 0.5)
    };
    SimulationSummary {
        trials,
        home_wins,
        away_wins,
        draws: trials - decided,
        mean_margin: if trials > 0 {
            margin_sum as f64 / trials as f64
        } else {
            0.0
        },
        home_prob,
        away_prob,
    }
}
