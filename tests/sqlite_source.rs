use rusqlite::{Connection, params};

use nrl_form::delta::{MissingValuePolicy, build_delta_table};
use nrl_form::source::{Side, StatSource, YearRange};
use nrl_form::sqlite_source::SqliteSource;

fn seeded_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory db");
    conn.execute_batch(
        r#"
        CREATE TABLE games (id INTEGER PRIMARY KEY, year INTEGER NOT NULL);
        CREATE TABLE teams (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE game_teams (
            game_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            is_home_team INTEGER NOT NULL,
            score INTEGER NOT NULL
        );
        CREATE TABLE player_performance (id INTEGER PRIMARY KEY, game_id INTEGER NOT NULL);
        CREATE TABLE player_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_performance_id INTEGER NOT NULL,
            stat_type TEXT NOT NULL,
            count INTEGER NOT NULL,
            is_home_team INTEGER NOT NULL
        );
        INSERT INTO teams VALUES (1, 'Storm'), (2, 'Panthers'), (3, 'Eels');
        INSERT INTO games VALUES (5, 2023), (9, 2023), (14, 2021), (20, 2019);
        INSERT INTO game_teams VALUES
            (5, 1, 1, 22), (5, 2, 0, 18),
            (9, 3, 1, 10), (9, 1, 0, 30),
            (14, 2, 1, 8), (14, 3, 0, 6),
            (20, 1, 1, 16);
        INSERT INTO player_performance VALUES (1, 5), (2, 5), (3, 5), (4, 9), (5, 14);
        "#,
    )
    .expect("seed schema");

    let stats: [(i64, &str, i64, bool); 6] = [
        (1, "line_breaks", 2, true),
        (2, "line_breaks", 3, true),
        (3, "line_breaks", 1, false),
        (4, "line_breaks", 4, false),
        (1, "kick_meters", 250, true),
        (5, "line_breaks", 9, true),
    ];
    for (perf, stat, count, home) in stats {
        conn.execute(
            "INSERT INTO player_stats (player_performance_id, stat_type, count, is_home_team)
             VALUES (?1, ?2, ?3, ?4)",
            params![perf, stat, count, home],
        )
        .expect("insert stat");
    }
    conn
}

#[test]
fn aggregates_player_counts_per_side() {
    let source = SqliteSource::from_connection(seeded_connection());
    let years = YearRange::new(2023, 2023);
    assert_eq!(
        source.query_stat("line_breaks", years, Side::Home).unwrap(),
        vec![(5, 5.0)]
    );
    assert_eq!(
        source.query_stat("line_breaks", years, Side::Away).unwrap(),
        vec![(5, 1.0), (9, 4.0)]
    );
    assert!(source.query_stat("tackles", years, Side::Home).unwrap().is_empty());
    assert_eq!(
        source.query_outcome(years, Side::Away).unwrap(),
        vec![(5, 18.0), (9, 30.0)]
    );
    assert_eq!(
        source.query_team_names(years, Side::Home).unwrap(),
        vec![(5, "Storm".to_string()), (9, "Eels".to_string())]
    );
    source.close().unwrap();
}

#[test]
fn feeds_the_delta_builder() {
    let source = SqliteSource::from_connection(seeded_connection());
    let names = vec!["line_breaks".to_string(), "kick_meters".to_string()];
    let table = build_delta_table(
        &source,
        &names,
        YearRange::new(2021, 2023),
        MissingValuePolicy::ZeroFill,
    )
    .unwrap();

    let ids: Vec<u64> = table.rows().iter().map(|r| r.game_id).collect();
    assert_eq!(ids, vec![5, 9, 14]);
    assert_eq!(table.column("line_breaks").unwrap(), vec![4.0, -4.0, 9.0]);
    assert_eq!(table.column("kick_meters").unwrap(), vec![250.0, 0.0, 0.0]);
    assert_eq!(table.column("points").unwrap(), vec![4.0, -20.0, 2.0]);
    assert_eq!(table.rows()[1].home, "Eels");
    assert_eq!(table.rows()[1].away, "Storm");
}

#[test]
fn game_with_only_a_home_side_row() {
    let source = SqliteSource::from_connection(seeded_connection());
    let names = vec!["line_breaks".to_string()];
    let years = YearRange::new(2019, 2019);

    let filled = build_delta_table(&source, &names, years, MissingValuePolicy::ZeroFill).unwrap();
    assert_eq!(filled.len(), 1);
    assert_eq!(filled.column("points").unwrap(), vec![16.0]);
    assert_eq!(filled.column("line_breaks").unwrap(), vec![0.0]);
    assert_eq!(filled.rows()[0].home, "Storm");
    assert_eq!(filled.rows()[0].away, "");

    let dropped = build_delta_table(&source, &names, years, MissingValuePolicy::DropGame).unwrap();
    assert!(dropped.is_empty());
}
