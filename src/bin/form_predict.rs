use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::warn;

use nrl_form::config::PipelineConfig;
use nrl_form::delta;
use nrl_form::form;
use nrl_form::logging::init_logging;
use nrl_form::model;
use nrl_form::ols::NalgebraOls;
use nrl_form::optimizer::Optimizer;
use nrl_form::source::YearRange;
use nrl_form::sqlite_source::SqliteSource;
use nrl_form::table::{CONST_COLUMN, FORM_POINTS_COLUMN, FORM_RESIDUALS_COLUMN};
use nrl_form::trainer;
use nrl_form::tuning;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let (start_year, end_year) = parse_years()?;
    let mut cfg = PipelineConfig::from_env();
    if let Some(db) = arg_value("--db") {
        cfg.db_path = PathBuf::from(db);
    }
    if let Some(dir) = arg_value("--models") {
        cfg.models_dir = PathBuf::from(dir);
    }
    if let Some(n) = arg_value("--test-rows").and_then(|v| v.parse::<usize>().ok()) {
        cfg.test_rows = n.max(1);
    }
    if let Some(w) = arg_value("--window").and_then(|v| v.parse::<usize>().ok()) {
        cfg.form_window = w.max(1);
    }
    let export = arg_value("--export").map(PathBuf::from);

    let name = model::model_name(start_year, end_year);
    let summary = model::load_summary(&cfg.models_dir, &name)
        .with_context(|| format!("load base model {name}; run fit_deltas first"))?;
    let base_model = summary.model();
    let stats = base_model.feature_names();

    let source = SqliteSource::connect(&cfg.db_path)?;
    let mut table = delta::build_delta_table(
        &source,
        &stats,
        YearRange::new(start_year, end_year),
        cfg.missing_policy,
    )?;
    source.close()?;

    table.apply_model(&base_model)?;
    let table = form::augment_with_form(table, &cfg.form_config());
    if table.is_empty() {
        return Err(anyhow!("no rows left after the form warm-up window"));
    }

    if let Some(path) = export.as_ref() {
        let json = serde_json::to_string_pretty(&table).context("serialize feature table")?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        println!("feature table written: {}", path.display());
    }

    let features = vec![
        CONST_COLUMN.to_string(),
        FORM_POINTS_COLUMN.to_string(),
        FORM_RESIDUALS_COLUMN.to_string(),
    ];
    let (train, test) = trainer::split_train_test(&table, cfg.test_rows)?;
    let fit = trainer::fit(&NalgebraOls, &train, &features)?;
    println!(
        "form model  n={}  R²={:.4}  adj R²={:.4}  AIC={:.1}  BIC={:.1}",
        fit.nobs, fit.r_squared, fit.r_squared_adj, fit.aic, fit.bic
    );
    for i in 0..fit.feature_names.len() {
        println!(
            "  {:<16} {:>10.4}  (p={:.3})",
            fit.feature_names[i], fit.coefficients[i], fit.p_values[i]
        );
    }

    let predictions = trainer::predict(&fit, &test)?;
    println!();
    println!(
        "{:>8} {:<28} {:<28} {:>7} {:>9}",
        "game", "home", "away", "points", "predicted"
    );
    for p in &predictions {
        println!(
            "{:>8} {:<28} {:<28} {:>7.0} {:>9.2}",
            p.game_id, p.home, p.away, p.points, p.predicted
        );
    }
    if let Some(acc) = trainer::winner_accuracy(&predictions) {
        println!("winner accuracy: {:.1}%", acc * 100.0);
    }

    let optimizer = Optimizer::new(cfg.tolerance, cfg.max_iter)?;
    let tuned = tuning::tune_form_weight(&optimizer, &train)?;
    if !tuned.converged || !tuned.is_interior(tuning::FORM_WEIGHT_RANGE) {
        warn!(
            weight = tuned.argument,
            converged = tuned.converged,
            "form weight estimate is unreliable"
        );
    }
    println!();
    println!(
        "form residual weight: {:.4} (converged={}, train error ratio {:.4}, test error ratio {:.4})",
        tuned.argument,
        tuned.converged,
        tuning::relative_form_error(&train, tuned.argument),
        tuning::relative_form_error(&test, tuned.argument)
    );
    Ok(())
}

fn parse_years() -> Result<(i32, i32)> {
    // Years come first; flags follow.
    let args = std::env::args().skip(1).take(2).collect::<Vec<_>>();
    let (Some(start), Some(end)) = (args.first(), args.get(1)) else {
        return Err(anyhow!(
            "usage: form_predict <start_year> <end_year> [--db PATH] [--models DIR] [--test-rows N] [--window N] [--export FILE]"
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
