use anyhow::{Context, Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;

use nrl_form::logging::init_logging;
use nrl_form::simulate::{self, DEFAULT_TRIALS, SideRates};

fn main() -> Result<()> {
    init_logging();

    let args = std::env::args().skip(1).take(2).collect::<Vec<_>>();
    let (Some(home), Some(away)) = (args.first(), args.get(1)) else {
        return Err(anyhow!(
            "usage: simulate_match <home_try_rate> <away_try_rate> [--trials N] [--seed S] [--conversion P]"
        ));
    };
    let home_rate = home.parse::<f64>().context("home try rate")?;
    let away_rate = away.parse::<f64>().context("away try rate")?;

    let trials = parse_arg::<usize>("--trials")
        .unwrap_or(DEFAULT_TRIALS)
        .max(1);
    let mut home_side = SideRates::new(home_rate).context("home try rate")?;
    let mut away_side = SideRates::new(away_rate).context("away try rate")?;
    if let Some(conversion) = parse_arg::<f64>("--conversion") {
        home_side = home_side
            .with_conversion(conversion)
            .context("--conversion")?;
        away_side = away_side
            .with_conversion(conversion)
            .context("--conversion")?;
    }

    let mut rng = match parse_arg::<u64>("--seed") {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let summary = simulate::simulate_match(home_side, away_side, trials, &mut rng);

    println!("{} trials", summary.trials);
    println!(
        "home {} / away {} / draw {}  (mean margin {:.2})",
        summary.home_wins, summary.away_wins, summary.draws, summary.mean_margin
    );
    match summary.home_odds() {
        Some(odds) => println!("Home Win: ${odds:.2}"),
        None => println!("Home Win: n/a"),
    }
    match summary.away_odds() {
        Some(odds) => println!("Away Win: ${odds:.2}"),
        None => println!("Away Win: n/a"),
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(flag: &str) -> Option<T> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            return raw.trim().parse::<T>().ok();
        }
        if arg == flag {
            return args.get(idx + 1).and_then(|v| v.trim().parse::<T>().ok());
        }
    }
    None
}
