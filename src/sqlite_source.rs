use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info};

use crate::source::{Side, StatSource, YearRange};

const STAT_QUERY: &str = r#"
    SELECT games.id, SUM(player_stats.count)
    FROM games
    JOIN player_performance ON player_performance.game_id = games.id
    JOIN player_stats ON player_stats.player_performance_id = player_performance.id
    WHERE player_stats.stat_type = ?1
      AND games.year >= ?2
      AND games.year <= ?3
      AND player_stats.is_home_team = ?4
    GROUP BY games.id
    ORDER BY games.id ASC
"#;

const OUTCOME_QUERY: &str = r#"
    SELECT games.id, SUM(game_teams.score)
    FROM games
    JOIN game_teams ON games.id = game_teams.game_id
    WHERE games.year >= ?1
      AND games.year <= ?2
      AND game_teams.is_home_team = ?3
    GROUP BY games.id
    ORDER BY games.id ASC
"#;

const TEAM_NAMES_QUERY: &str = r#"
    SELECT games.id, MIN(teams.name)
    FROM games
    JOIN game_teams ON games.id = game_teams.game_id
    JOIN teams ON teams.id = game_teams.team_id
    WHERE games.year >= ?1
      AND games.year <= ?2
      AND game_teams.is_home_team = ?3
    GROUP BY games.id
    ORDER BY games.id ASC
"#;

/// Read-only handle on the scraped-games database. Construct it with `connect`, pass it
/// to whatever needs data, and `close` it when the run is over.
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    pub fn connect(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open sqlite db {}", path.display()))?;
        info!(db = %path.display(), "connected to games database");
        Ok(Self { conn })
    }

    /// Wraps an existing connection, e.g. an in-memory database.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| anyhow!("close sqlite db: {err}"))?;
        debug!("games database closed");
        Ok(())
    }

    fn fetch_values(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<(u64, f64)>> {
        let mut stmt = self.conn.prepare_cached(sql).context("prepare aggregate query")?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                ))
            })
            .context("run aggregate query")?;
        let mut out = Vec::new();
        for row in rows {
            let (id, value) = row.context("decode aggregate row")?;
            out.push((game_id(id)?, value));
        }
        Ok(out)
    }
}

impl StatSource for SqliteSource {
    fn query_stat(&self, stat: &str, years: YearRange, side: Side) -> Result<Vec<(u64, f64)>> {
        self.fetch_values(
            STAT_QUERY,
            params![stat, years.start, years.end, side.is_home()],
        )
        .with_context(|| format!("query stat {stat} ({side:?})"))
    }

    fn query_outcome(&self, years: YearRange, side: Side) -> Result<Vec<(u64, f64)>> {
        self.fetch_values(OUTCOME_QUERY, params![years.start, years.end, side.is_home()])
            .with_context(|| format!("query points ({side:?})"))
    }

    fn query_team_names(&self, years: YearRange, side: Side) -> Result<Vec<(u64, String)>> {
        let mut stmt = self
            .conn
            .prepare_cached(TEAM_NAMES_QUERY)
            .context("prepare team names query")?;
        let rows = stmt
            .query_map(params![years.start, years.end, side.is_home()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .context("query team names")?;
        let mut out = Vec::new();
        for row in rows {
            let (id, name) = row.context("decode team name row")?;
            out.push((game_id(id)?, name));
        }
        Ok(out)
    }
}

fn game_id(raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| anyhow!("negative game id {raw}"))
}
