// SQLite persistence layer: the system of record for leagues, teams, the
// movie catalog, committed draft picks, rosters, and transactions.
//
// The draft engine only holds live clock/queue state in memory; everything
// it commits lands here.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{AcquisitionType, League, LeagueStatus, Movie, MovieStatus, Team};

/// A draft pick row as persisted. Skeleton rows (created at draft start)
/// have no movie and no fulfillment timestamp; fulfilled rows are immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPick {
    pub league_id: i64,
    pub pick_number: u32,
    pub round: u32,
    pub team_id: i64,
    pub movie_id: Option<i64>,
    pub acquisition_type: Option<AcquisitionType>,
    pub skipped: bool,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database (useful for
    /// tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS movies (
                id                    INTEGER PRIMARY KEY AUTOINCREMENT,
                tmdb_id               INTEGER NOT NULL UNIQUE,
                title                 TEXT NOT NULL,
                release_date          TEXT,
                poster_url            TEXT NOT NULL DEFAULT '',
                budget                REAL NOT NULL DEFAULT 0,
                domestic_gross        REAL NOT NULL DEFAULT 0,
                worldwide_gross       REAL NOT NULL DEFAULT 0,
                opening_weekend_gross REAL NOT NULL DEFAULT 0,
                rt_score              REAL NOT NULL DEFAULT 0,
                number_one_opening    INTEGER NOT NULL DEFAULT 0,
                status                TEXT NOT NULL DEFAULT 'upcoming',
                points                REAL NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS leagues (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                season_year INTEGER NOT NULL,
                status      TEXT NOT NULL DEFAULT 'pending'
            );

            CREATE TABLE IF NOT EXISTS teams (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id    INTEGER NOT NULL REFERENCES leagues(id),
                name         TEXT NOT NULL,
                total_points REAL NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS draft_picks (
                league_id        INTEGER NOT NULL REFERENCES leagues(id),
                pick_number      INTEGER NOT NULL,
                round            INTEGER NOT NULL,
                team_id          INTEGER NOT NULL REFERENCES teams(id),
                movie_id         INTEGER REFERENCES movies(id),
                acquisition_type TEXT,
                skipped          INTEGER NOT NULL DEFAULT 0,
                fulfilled_at     TEXT,
                PRIMARY KEY (league_id, pick_number)
            );

            CREATE TABLE IF NOT EXISTS roster (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id          INTEGER NOT NULL REFERENCES teams(id),
                movie_id         INTEGER NOT NULL REFERENCES movies(id),
                acquired_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                acquisition_type TEXT NOT NULL,
                UNIQUE(team_id, movie_id)
            );

            CREATE TABLE IF NOT EXISTS transactions (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id  INTEGER NOT NULL REFERENCES leagues(id),
                team_id    INTEGER NOT NULL REFERENCES teams(id),
                movie_id   INTEGER NOT NULL REFERENCES movies(id),
                type       TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // -----------------------------------------------------------------------
    // Movies
    // -----------------------------------------------------------------------

    /// Insert a movie, returning its id. The (tmdb_id) unique constraint
    /// makes re-importing a seed file a no-op for existing rows.
    pub fn insert_movie(&self, movie: &Movie) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO movies
                (tmdb_id, title, release_date, poster_url, budget, domestic_gross,
                 worldwide_gross, opening_weekend_gross, rt_score, number_one_opening, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                movie.tmdb_id,
                movie.title,
                movie.release_date.map(|d| d.to_string()),
                movie.poster_url,
                movie.budget,
                movie.domestic_gross,
                movie.worldwide_gross,
                movie.opening_weekend_gross,
                movie.rt_score,
                movie.number_one_opening as i64,
                movie.status.as_str(),
            ],
        )
        .context("failed to insert movie")?;

        let id: i64 = conn
            .query_row(
                "SELECT id FROM movies WHERE tmdb_id = ?1",
                params![movie.tmdb_id],
                |row| row.get(0),
            )
            .context("failed to resolve movie id after insert")?;
        Ok(id)
    }

    pub fn movie(&self, id: i64) -> Result<Option<Movie>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, tmdb_id, title, release_date, poster_url, budget, domestic_gross,
                    worldwide_gross, opening_weekend_gross, rt_score, number_one_opening, status
             FROM movies WHERE id = ?1",
            params![id],
            row_to_movie,
        )
        .optional()
        .context("failed to load movie")
    }

    pub fn all_movies(&self) -> Result<Vec<Movie>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tmdb_id, title, release_date, poster_url, budget, domestic_gross,
                    worldwide_gross, opening_weekend_gross, rt_score, number_one_opening, status
             FROM movies ORDER BY id",
        )?;
        let movies = stmt
            .query_map([], row_to_movie)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to load movies")?;
        Ok(movies)
    }

    pub fn movies_with_status(&self, status: MovieStatus) -> Result<Vec<Movie>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tmdb_id, title, release_date, poster_url, budget, domestic_gross,
                    worldwide_gross, opening_weekend_gross, rt_score, number_one_opening, status
             FROM movies WHERE status = ?1 ORDER BY id",
        )?;
        let movies = stmt
            .query_map(params![status.as_str()], row_to_movie)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to load movies by status")?;
        Ok(movies)
    }

    /// Apply release facts to a movie. Only the ingestion sync calls this.
    pub fn update_movie_facts(&self, movie: &Movie) -> Result<()> {
        let conn = self.conn();
        let updated = conn
            .execute(
                "UPDATE movies SET
                    budget = ?2, domestic_gross = ?3, worldwide_gross = ?4,
                    opening_weekend_gross = ?5, rt_score = ?6,
                    number_one_opening = ?7, status = ?8
                 WHERE id = ?1",
                params![
                    movie.id,
                    movie.budget,
                    movie.domestic_gross,
                    movie.worldwide_gross,
                    movie.opening_weekend_gross,
                    movie.rt_score,
                    movie.number_one_opening as i64,
                    movie.status.as_str(),
                ],
            )
            .context("failed to update movie facts")?;
        anyhow::ensure!(updated == 1, "movie {} not found", movie.id);
        Ok(())
    }

    /// Settlement cache of the deterministic score. Derived data; the
    /// roster sum in `teams.total_points` is the audited aggregate.
    pub fn set_movie_points(&self, movie_id: i64, points: f64) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE movies SET points = ?2 WHERE id = ?1",
                params![movie_id, points],
            )
            .context("failed to set movie points")?;
        Ok(())
    }

    pub fn movie_points(&self, movie_id: i64) -> Result<f64> {
        self.conn()
            .query_row(
                "SELECT points FROM movies WHERE id = ?1",
                params![movie_id],
                |row| row.get(0),
            )
            .context("failed to load movie points")
    }

    // -----------------------------------------------------------------------
    // Leagues and teams
    // -----------------------------------------------------------------------

    pub fn create_league(&self, name: &str, season_year: i32) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO leagues (name, season_year) VALUES (?1, ?2)",
            params![name, season_year],
        )
        .context("failed to create league")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn league(&self, id: i64) -> Result<Option<League>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, season_year, status FROM leagues WHERE id = ?1",
            params![id],
            |row| {
                let status_raw: String = row.get(3)?;
                Ok(League {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    season_year: row.get(2)?,
                    status: LeagueStatus::parse(&status_raw).unwrap_or(LeagueStatus::Pending),
                })
            },
        )
        .optional()
        .context("failed to load league")
    }

    pub fn league_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM leagues ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to list leagues")?;
        Ok(ids)
    }

    pub fn set_league_status(&self, id: i64, status: LeagueStatus) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE leagues SET status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )
            .context("failed to set league status")?;
        Ok(())
    }

    pub fn add_team(&self, league_id: i64, name: &str) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO teams (league_id, name) VALUES (?1, ?2)",
            params![league_id, name],
        )
        .context("failed to add team")?;
        Ok(conn.last_insert_rowid())
    }

    /// Teams in insertion order. This is the draft order basis: the order
    /// is frozen the moment the league starts drafting.
    pub fn league_teams(&self, league_id: i64) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, league_id, name, total_points FROM teams
             WHERE league_id = ?1 ORDER BY id",
        )?;
        let teams = stmt
            .query_map(params![league_id], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    league_id: row.get(1)?,
                    name: row.get(2)?,
                    total_points: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to load teams")?;
        Ok(teams)
    }

    pub fn set_team_points(&self, team_id: i64, total: f64) -> Result<()> {
        self.conn()
            .execute(
                "UPDATE teams SET total_points = ?2 WHERE id = ?1",
                params![team_id, total],
            )
            .context("failed to set team points")?;
        Ok(())
    }

    /// Standings: teams of a league ordered by total points, best first.
    pub fn standings(&self, league_id: i64) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, league_id, name, total_points FROM teams
             WHERE league_id = ?1 ORDER BY total_points DESC, id",
        )?;
        let teams = stmt
            .query_map(params![league_id], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    league_id: row.get(1)?,
                    name: row.get(2)?,
                    total_points: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to load standings")?;
        Ok(teams)
    }

    // -----------------------------------------------------------------------
    // Draft picks
    // -----------------------------------------------------------------------

    /// Insert the unfulfilled pick skeleton produced by the draft order at
    /// draft start. One transaction; all or nothing.
    pub fn insert_pick_slots(
        &self,
        league_id: i64,
        slots: &[crate::draft::order::PickSlot],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for slot in slots {
            tx.execute(
                "INSERT INTO draft_picks (league_id, pick_number, round, team_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![league_id, slot.pick_number, slot.round, slot.team_id],
            )
            .context("failed to insert pick slot")?;
        }
        tx.commit().context("failed to commit pick slots")?;
        Ok(())
    }

    /// Persist a fulfilled pick: fill the skeleton row, add the movie to the
    /// team's roster, and record the transaction — atomically, and only if
    /// the row is still unfulfilled (idempotent against redelivery).
    pub fn persist_fulfilled_pick(
        &self,
        league_id: i64,
        pick_number: u32,
        team_id: i64,
        movie_id: Option<i64>,
        acquisition: AcquisitionType,
        fulfilled_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let skipped = movie_id.is_none();
        let updated = tx
            .execute(
                "UPDATE draft_picks
                 SET movie_id = ?3, acquisition_type = ?4, skipped = ?5, fulfilled_at = ?6
                 WHERE league_id = ?1 AND pick_number = ?2 AND fulfilled_at IS NULL",
                params![
                    league_id,
                    pick_number,
                    movie_id,
                    acquisition.as_str(),
                    skipped as i64,
                    fulfilled_at.to_rfc3339(),
                ],
            )
            .context("failed to fulfill pick")?;

        // Already fulfilled: nothing else to write.
        if updated == 0 {
            tx.commit()?;
            return Ok(());
        }

        if let Some(movie_id) = movie_id {
            tx.execute(
                "INSERT OR IGNORE INTO roster (team_id, movie_id, acquisition_type)
                 VALUES (?1, ?2, ?3)",
                params![team_id, movie_id, acquisition.as_str()],
            )
            .context("failed to insert roster entry")?;
            tx.execute(
                "INSERT INTO transactions (league_id, team_id, movie_id, type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![league_id, team_id, movie_id, acquisition.as_str()],
            )
            .context("failed to insert transaction")?;
        }

        tx.commit().context("failed to commit fulfilled pick")?;
        Ok(())
    }

    pub fn league_picks(&self, league_id: i64) -> Result<Vec<StoredPick>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT league_id, pick_number, round, team_id, movie_id,
                    acquisition_type, skipped, fulfilled_at
             FROM draft_picks WHERE league_id = ?1 ORDER BY pick_number",
        )?;
        let picks = stmt
            .query_map(params![league_id], row_to_stored_pick)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to load picks")?;
        Ok(picks)
    }

    // -----------------------------------------------------------------------
    // Rosters
    // -----------------------------------------------------------------------

    pub fn team_roster(&self, team_id: i64) -> Result<Vec<Movie>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.id, m.tmdb_id, m.title, m.release_date, m.poster_url, m.budget,
                    m.domestic_gross, m.worldwide_gross, m.opening_weekend_gross,
                    m.rt_score, m.number_one_opening, m.status
             FROM roster r JOIN movies m ON m.id = r.movie_id
             WHERE r.team_id = ?1 ORDER BY r.id",
        )?;
        let movies = stmt
            .query_map(params![team_id], row_to_movie)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to load roster")?;
        Ok(movies)
    }

    /// True when the movie is already on any roster within the league.
    pub fn movie_rostered_in_league(&self, league_id: i64, movie_id: i64) -> Result<bool> {
        let count: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM roster r JOIN teams t ON t.id = r.team_id
                 WHERE t.league_id = ?1 AND r.movie_id = ?2",
                params![league_id, movie_id],
                |row| row.get(0),
            )
            .context("failed to check roster membership")?;
        Ok(count > 0)
    }

    /// Add a movie to a roster outside the draft (waiver or trade),
    /// recording the transaction atomically.
    pub fn add_to_roster(
        &self,
        league_id: i64,
        team_id: i64,
        movie_id: i64,
        acquisition: AcquisitionType,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO roster (team_id, movie_id, acquisition_type) VALUES (?1, ?2, ?3)",
            params![team_id, movie_id, acquisition.as_str()],
        )
        .context("failed to insert roster entry")?;
        tx.execute(
            "INSERT INTO transactions (league_id, team_id, movie_id, type)
             VALUES (?1, ?2, ?3, ?4)",
            params![league_id, team_id, movie_id, acquisition.as_str()],
        )
        .context("failed to insert transaction")?;
        tx.commit().context("failed to commit roster addition")?;
        Ok(())
    }

    pub fn transaction_count(&self, league_id: i64) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM transactions WHERE league_id = ?1",
                params![league_id],
                |row| row.get(0),
            )
            .context("failed to count transactions")?;
        Ok(count as usize)
    }
}

fn row_to_movie(row: &Row<'_>) -> rusqlite::Result<Movie> {
    let release_raw: Option<String> = row.get(3)?;
    let status_raw: String = row.get(11)?;
    Ok(Movie {
        id: row.get(0)?,
        tmdb_id: row.get(1)?,
        title: row.get(2)?,
        release_date: release_raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        poster_url: row.get(4)?,
        budget: row.get(5)?,
        domestic_gross: row.get(6)?,
        worldwide_gross: row.get(7)?,
        opening_weekend_gross: row.get(8)?,
        rt_score: row.get(9)?,
        number_one_opening: row.get::<_, i64>(10)? != 0,
        status: MovieStatus::parse(&status_raw).unwrap_or(MovieStatus::Upcoming),
    })
}

fn row_to_stored_pick(row: &Row<'_>) -> rusqlite::Result<StoredPick> {
    let acquisition_raw: Option<String> = row.get(5)?;
    let fulfilled_raw: Option<String> = row.get(7)?;
    Ok(StoredPick {
        league_id: row.get(0)?,
        pick_number: row.get(1)?,
        round: row.get(2)?,
        team_id: row.get(3)?,
        movie_id: row.get(4)?,
        acquisition_type: acquisition_raw.as_deref().and_then(AcquisitionType::parse),
        skipped: row.get::<_, i64>(6)? != 0,
        fulfilled_at: fulfilled_raw
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}
