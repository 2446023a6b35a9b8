use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use nrl_form::config::PipelineConfig;
use nrl_form::delta;
use nrl_form::logging::init_logging;
use nrl_form::model::{self, ModelSummary};
use nrl_form::ols::{NalgebraOls, OlsFit};
use nrl_form::source::YearRange;
use nrl_form::sqlite_source::SqliteSource;
use nrl_form::trainer;

const DEFAULT_TEST_ROWS: usize = 80;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let (start_year, end_year) = parse_years()?;
    let mut cfg = PipelineConfig::from_env();
    if let Some(db) = parse_path_arg("--db") {
        cfg.db_path = db;
    }
    if let Some(dir) = parse_path_arg("--models") {
        cfg.models_dir = dir;
    }
    let test_rows = parse_usize_arg("--test-rows").unwrap_or(DEFAULT_TEST_ROWS);
    let stats = parse_list_arg("--stats").unwrap_or_else(PipelineConfig::default_stats);

    let source = SqliteSource::connect(&cfg.db_path)?;
    let table = delta::build_delta_table(
        &source,
        &stats,
        YearRange::new(start_year, end_year),
        cfg.missing_policy,
    )?;
    source.close()?;

    let (train, test) = trainer::split_train_test(&table, test_rows)
        .context("split delta table into train and test")?;
    let fit = trainer::fit(&NalgebraOls, &train, &stats)?;
    print_fit(&fit);

    let predictions = trainer::predict(&fit, &test)?;
    println!();
    println!(
        "{:>8} {:<28} {:<28} {:>7} {:>9} {:>9}",
        "game", "home", "away", "points", "predicted", "residual"
    );
    for p in predictions.iter().rev().take(50).rev() {
        println!(
            "{:>8} {:<28} {:<28} {:>7.0} {:>9.2} {:>9.2}",
            p.game_id, p.home, p.away, p.points, p.predicted, p.residual
        );
    }

    println!();
    println!("Average residual by team");
    for team in trainer::team_residuals(&predictions) {
        println!(
            "  {:<28} {:>8.3} ({} games)",
            team.team, team.mean_residual, team.games
        );
    }

    let residuals: Vec<f64> = predictions.iter().map(|p| p.residual).collect();
    let s = trainer::describe(&residuals);
    println!();
    println!(
        "residuals: count={} mean={:.3} std={:.3} min={:.3} 25%={:.3} 50%={:.3} 75%={:.3} max={:.3}",
        s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
    );
    if let Some(acc) = trainer::winner_accuracy(&predictions) {
        println!("winner accuracy: {:.1}%", acc * 100.0);
    }

    let summary = ModelSummary::from_fit(model::model_name(start_year, end_year), &fit);
    let path = model::save_summary(&cfg.models_dir, &summary)?;
    println!("model written: {}", path.display());
    Ok(())
}

fn print_fit(fit: &OlsFit) {
    println!(
        "OLS  n={}  R²={:.4}  adj R²={:.4}  F={:.3} (p={:.4})  AIC={:.1}  BIC={:.1}",
        fit.nobs, fit.r_squared, fit.r_squared_adj, fit.f_value, fit.f_p_value, fit.aic, fit.bic
    );
    println!(
        "{:<20} {:>10} {:>10} {:>8} {:>8}",
        "feature", "coef", "std err", "t", "P>|t|"
    );
    for i in 0..fit.feature_names.len() {
        println!(
            "{:<20} {:>10.4} {:>10.4} {:>8.3} {:>8.3}",
            fit.feature_names[i],
            fit.coefficients[i],
            fit.std_errors[i],
            fit.t_values[i],
            fit.p_values[i]
        );
    }
}

fn parse_years() -> Result<(i32, i32)> {
    // Years come first; flags follow.
    let args = std::env::args().skip(1).take(2).collect::<Vec<_>>();
    let (Some(start), Some(end)) = (args.first(), args.get(1)) else {
        return Err(anyhow!(
            "usage: fit_deltas <start_year> <end_year> [--db PATH] [--models DIR] [--test-rows N] [--stats a,b,c]"
        ));
    };
    let start = start.parse::<i32>().context("start year")?;
    let end = end.parse::<i32>().context("end year")?;
    if start > end {
        return Err(anyhow!("start year {start} is after end year {end}"));
    }
    Ok((start, end))
}

fn arg_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    arg_value(flag).map(PathBuf::from)
}

fn parse_usize_arg(flag: &str) -> Option<usize> {
    arg_value(flag).and_then(|v| v.parse::<usize>().ok())
}

fn parse_list_arg(flag: &str) -> Option<Vec<String>> {
    let items = arg_value(flag)?
        .split([',', ';', ' '])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    (!items.is_empty()).then_some(items)
}
