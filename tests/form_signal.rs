use nrl_form::form::{
    FormConfig, PointsPerspective, WARMUP_ROWS, augment_with_form, game_form, get_team_form,
};
use nrl_form::table::{FeatureTable, FormSignal, GameRow};

const TEAMS: [&str; 6] = ["Storm", "Panthers", "Roosters", "Sharks", "Broncos", "Eels"];

fn season(games: usize) -> FeatureTable {
    let rows = (0..games)
        .map(|i| {
            let home = TEAMS[i % TEAMS.len()];
            let away = TEAMS[(i * 5 + 1) % TEAMS.len()];
            let away = if away == home { TEAMS[(i + 3) % TEAMS.len()] } else { away };
            // Ids step by 3 to show they need not be contiguous.
            let mut row = GameRow::new(10 + 3 * i as u64, home, away);
            row.points = ((i * 7) % 23) as f64 - 11.0;
            row.residual = ((i * 3) % 5) as f64 - 2.0;
            row
        })
        .collect();
    FeatureTable::new(vec!["line_breaks".to_string()], rows)
}

#[test]
fn form_ignores_rows_after_the_target() {
    let full = season(40);
    let truncated = full.slice(0..25);
    let cfg = FormConfig::default();

    assert!(game_form(&full, 20, &cfg).is_some());
    assert_eq!(game_form(&full, 20, &cfg), game_form(&truncated, 20, &cfg));

    let mut mutated = full.clone();
    for row in &mut mutated.rows_mut()[21..] {
        row.points = 999.0;
        row.residual = -999.0;
        row.home = "Storm".to_string();
    }
    assert_eq!(game_form(&full, 20, &cfg), game_form(&mutated, 20, &cfg));
}

#[test]
fn augmented_rows_match_across_truncation() {
    let cfg = FormConfig::default();
    let full = augment_with_form(season(40), &cfg);
    let truncated = augment_with_form(season(40).slice(0..25), &cfg);

    assert_eq!(full.len(), 40 - WARMUP_ROWS);
    assert_eq!(truncated.len(), 25 - WARMUP_ROWS);
    // Original row 20 sits at index 20 - WARMUP_ROWS after the warm-up is dropped.
    let idx = 20 - WARMUP_ROWS;
    assert_eq!(full.rows()[idx].game_id, truncated.rows()[idx].game_id);
    assert_eq!(full.rows()[idx].form, truncated.rows()[idx].form);
}

#[test]
fn same_game_id_is_not_history() {
    let table = season(20);
    let target = table.rows()[5].clone();
    let at = get_team_form(&table, target.game_id, &target.home, 5, PointsPerspective::Stored);
    let manual = {
        let history = &table.rows()[..5];
        let recent: Vec<&GameRow> = history
            .iter()
            .rev()
            .filter(|r| r.involves(&target.home))
            .take(5)
            .collect();
        recent.iter().map(|r| r.points).sum::<f64>() / recent.len() as f64
    };
    assert!((at.points - manual).abs() < 1e-12);
}

#[test]
fn team_without_prior_games_has_zero_form() {
    let table = season(20);
    let first = table.rows()[0].clone();
    assert_eq!(
        get_team_form(&table, first.game_id, &first.home, 5, PointsPerspective::Stored),
        FormSignal::ZERO
    );
    assert_eq!(
        get_team_form(&table, u64::MAX, "Dragons", 5, PointsPerspective::Team),
        FormSignal::ZERO
    );
}

#[test]
fn three_home_games_scenario() {
    let mut rows = Vec::new();
    for (id, (points, residual)) in [(10.0, 1.0), (-4.0, -2.0), (6.0, 4.0)].into_iter().enumerate() {
        let mut r = GameRow::new(id as u64 + 1, "X", format!("Opp{id}"));
        r.points = points;
        r.residual = residual;
        rows.push(r);
    }
    let table = FeatureTable::new(Vec::new(), rows);

    let form = get_team_form(&table, 4, "X", 5, PointsPerspective::Stored);
    assert_eq!(form.home_rate, 1.0);
    assert!((form.points - 4.0).abs() < 1e-12);
    assert!((form.residual - 1.0).abs() < 1e-12);

    // Before any model is applied residuals are zero, and so is the residual form.
    let mut unfitted = table.clone();
    for row in unfitted.rows_mut() {
        row.residual = 0.0;
    }
    assert_eq!(
        get_team_form(&unfitted, 4, "X", 5, PointsPerspective::Stored).residual,
        0.0
    );
}

#[test]
fn augmentation_preserves_chronological_order_and_differences() {
    let table = season(30);
    let cfg = FormConfig::default();
    let expected: Vec<FormSignal> = (WARMUP_ROWS..30)
        .map(|i| game_form(&table, i, &cfg).unwrap())
        .collect();
    let augmented = augment_with_form(table, &cfg);

    let ids: Vec<u64> = augmented.rows().iter().map(|r| r.game_id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);

    let forms: Vec<FormSignal> = augmented.rows().iter().map(|r| r.form).collect();
    assert_eq!(forms, expected);
}

#[test]
fn perspective_choice_changes_away_history_only() {
    let mut a = GameRow::new(1, "X", "Y");
    a.points = 12.0;
    let mut b = GameRow::new(2, "Y", "X");
    b.points = 8.0;
    let table = FeatureTable::new(Vec::new(), vec![a, b]);

    let stored = get_team_form(&table, 3, "X", 5, PointsPerspective::Stored);
    let team = get_team_form(&table, 3, "X", 5, PointsPerspective::Team);
    assert!((stored.points - 10.0).abs() < 1e-12);
    assert!((team.points - 2.0).abs() < 1e-12);
    assert_eq!(stored.home_rate, team.home_rate);
}

#[test]
fn game_form_past_the_end_is_none() {
    let table = season(20);
    let cfg = FormConfig::default();
    assert!(game_form(&table, 19, &cfg).is_some());
    assert_eq!(game_form(&table, 20, &cfg), None);
    assert_eq!(game_form(&FeatureTable::default(), 0, &cfg), None);
}
