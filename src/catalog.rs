// Movie catalog: seed import and the immutable per-draft view.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::Database;
use crate::model::{Movie, MovieStatus};
use crate::scoring::projection::{expected_points, ProjectionStrategy};

// ---------------------------------------------------------------------------
// Seed CSV import
// ---------------------------------------------------------------------------

/// Seed CSV row. Extra columns are ignored; malformed rows are skipped with
/// a warning rather than failing the whole import.
#[derive(Debug, Deserialize)]
struct RawSeedMovie {
    tmdb_id: i64,
    title: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    poster_url: String,
    #[serde(default)]
    budget: f64,
    #[serde(default)]
    status: String,
}

/// Parse seed movies from any reader (testable without temp files).
pub fn load_seed_from_reader<R: Read>(rdr: R) -> Result<Vec<Movie>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut movies = Vec::new();
    for result in reader.deserialize::<RawSeedMovie>() {
        match result {
            Ok(raw) => {
                if raw.title.trim().is_empty() {
                    warn!("skipping seed row with empty title (tmdb_id={})", raw.tmdb_id);
                    continue;
                }
                if !raw.budget.is_finite() || raw.budget < 0.0 {
                    warn!("skipping seed movie '{}': bad budget", raw.title.trim());
                    continue;
                }
                let status = MovieStatus::parse(raw.status.trim())
                    .unwrap_or(MovieStatus::Upcoming);
                movies.push(Movie {
                    id: 0,
                    tmdb_id: raw.tmdb_id,
                    title: raw.title.trim().to_string(),
                    release_date: NaiveDate::parse_from_str(raw.release_date.trim(), "%Y-%m-%d")
                        .ok(),
                    poster_url: raw.poster_url.trim().to_string(),
                    budget: raw.budget,
                    domestic_gross: 0.0,
                    worldwide_gross: 0.0,
                    opening_weekend_gross: 0.0,
                    rt_score: 0.0,
                    number_one_opening: false,
                    status,
                });
            }
            Err(e) => {
                warn!("skipping malformed seed row: {}", e);
            }
        }
    }
    Ok(movies)
}

/// Import a seed CSV into the store. Re-importing is a no-op for movies
/// that already exist (tmdb_id unique). Returns the number of rows parsed.
pub fn import_seed(db: &Database, path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open seed file {}", path.display()))?;
    let movies = load_seed_from_reader(file).context("failed to parse seed CSV")?;
    for movie in &movies {
        db.insert_movie(movie)?;
    }
    info!("imported {} seed movies from {}", movies.len(), path.display());
    Ok(movies.len())
}

// ---------------------------------------------------------------------------
// Draft-time catalog view
// ---------------------------------------------------------------------------

/// What the session needs to know about one movie.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub movie_id: i64,
    pub title: String,
    pub poster_url: String,
    pub draftable: bool,
    /// Projected expected points, fixed at session start. Auto-pick ranks
    /// by this value.
    pub projected_points: f64,
}

/// Immutable catalog snapshot owned by one draft session. Availability is
/// derived from the session's own ledger, never from a shared mutable flag,
/// so concurrent drafts in other leagues cannot race on it.
#[derive(Debug, Clone, Default)]
pub struct DraftCatalog {
    entries: BTreeMap<i64, CatalogEntry>,
}

impl DraftCatalog {
    pub fn from_movies(movies: &[Movie], strategy: &dyn ProjectionStrategy) -> Self {
        let entries = movies
            .iter()
            .map(|m| {
                (
                    m.id,
                    CatalogEntry {
                        movie_id: m.id,
                        title: m.title.clone(),
                        poster_url: m.poster_url.clone(),
                        draftable: m.is_draftable(),
                        projected_points: expected_points(&strategy.project(m)),
                    },
                )
            })
            .collect();
        DraftCatalog { entries }
    }

    pub fn get(&self, movie_id: i64) -> Option<&CatalogEntry> {
        self.entries.get(&movie_id)
    }

    pub fn draftable_count(&self) -> usize {
        self.entries.values().filter(|e| e.draftable).count()
    }

    /// Movies still available given the set already drafted.
    pub fn available<'a>(
        &'a self,
        drafted: &'a HashSet<i64>,
    ) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.entries
            .values()
            .filter(move |e| e.draftable && !drafted.contains(&e.movie_id))
    }

    /// The auto-pick choice: highest projected points among available
    /// movies, tie broken by lowest movie id. `None` when the pool is
    /// empty.
    pub fn best_available<'a>(&'a self, drafted: &'a HashSet<i64>) -> Option<&'a CatalogEntry> {
        let mut best: Option<&CatalogEntry> = None;
        // BTreeMap iterates in id order, so the first of a tied pair wins
        // and the tie-break falls out of the strict comparison below.
        for entry in self.available(drafted) {
            match best {
                Some(b) if entry.projected_points <= b.projected_points => {}
                _ => best = Some(entry),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::projection::BudgetHeuristic;

    fn movie(id: i64, budget: f64, status: MovieStatus) -> Movie {
        Movie {
            id,
            tmdb_id: id * 1000,
            title: format!("Movie {id}"),
            release_date: None,
            poster_url: format!("https://img.example/{id}.jpg"),
            budget,
            domestic_gross: 0.0,
            worldwide_gross: 0.0,
            opening_weekend_gross: 0.0,
            rt_score: 0.0,
            number_one_opening: false,
            status,
        }
    }

    #[test]
    fn seed_csv_parses_valid_rows() {
        let csv_data = "\
tmdb_id,title,release_date,poster_url,budget,status
566810,Superman,2025-07-11,https://img.example/superman.jpg,250000000,upcoming
1022789,Inside Out 2,2024-06-14,,200000000,released
";
        let movies = load_seed_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].title, "Superman");
        assert_eq!(movies[0].status, MovieStatus::Upcoming);
        assert_eq!(
            movies[0].release_date,
            NaiveDate::from_ymd_opt(2025, 7, 11)
        );
        assert_eq!(movies[1].status, MovieStatus::Released);
    }

    #[test]
    fn seed_csv_skips_malformed_rows() {
        let csv_data = "\
tmdb_id,title,release_date,poster_url,budget,status
566810,Superman,2025-07-11,,250000000,upcoming
not_a_number,Broken,2025-01-01,,1,upcoming
99,,2025-01-01,,1,upcoming
100,Negative Budget,2025-01-01,,-5,upcoming
";
        let movies = load_seed_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Superman");
    }

    #[test]
    fn seed_csv_defaults_unknown_status_to_upcoming() {
        let csv_data = "tmdb_id,title,release_date,poster_url,budget,status\n1,X,,,0,whatever\n";
        let movies = load_seed_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(movies[0].status, MovieStatus::Upcoming);
    }

    #[test]
    fn catalog_counts_only_draftable_movies() {
        let movies = vec![
            movie(1, 100_000_000.0, MovieStatus::Upcoming),
            movie(2, 100_000_000.0, MovieStatus::Released),
            movie(3, 100_000_000.0, MovieStatus::Upcoming),
            movie(4, 100_000_000.0, MovieStatus::FreeAgent),
        ];
        let catalog = DraftCatalog::from_movies(&movies, &BudgetHeuristic);
        assert_eq!(catalog.draftable_count(), 2);
    }

    #[test]
    fn best_available_prefers_highest_projection() {
        let movies = vec![
            movie(1, 50_000_000.0, MovieStatus::Upcoming),
            movie(2, 250_000_000.0, MovieStatus::Upcoming),
            movie(3, 100_000_000.0, MovieStatus::Upcoming),
        ];
        let catalog = DraftCatalog::from_movies(&movies, &BudgetHeuristic);
        let drafted = HashSet::new();
        assert_eq!(catalog.best_available(&drafted).unwrap().movie_id, 2);
    }

    #[test]
    fn best_available_breaks_ties_by_lowest_id() {
        let movies = vec![
            movie(5, 100_000_000.0, MovieStatus::Upcoming),
            movie(2, 100_000_000.0, MovieStatus::Upcoming),
            movie(9, 100_000_000.0, MovieStatus::Upcoming),
        ];
        let catalog = DraftCatalog::from_movies(&movies, &BudgetHeuristic);
        assert_eq!(catalog.best_available(&HashSet::new()).unwrap().movie_id, 2);
    }

    #[test]
    fn best_available_respects_drafted_set() {
        let movies = vec![
            movie(1, 250_000_000.0, MovieStatus::Upcoming),
            movie(2, 100_000_000.0, MovieStatus::Upcoming),
        ];
        let catalog = DraftCatalog::from_movies(&movies, &BudgetHeuristic);
        let mut drafted = HashSet::new();
        drafted.insert(1);
        assert_eq!(catalog.best_available(&drafted).unwrap().movie_id, 2);
        drafted.insert(2);
        assert!(catalog.best_available(&drafted).is_none());
    }

    #[test]
    fn released_movies_are_never_auto_picked() {
        let movies = vec![
            movie(1, 500_000_000.0, MovieStatus::Released),
            movie(2, 10_000_000.0, MovieStatus::Upcoming),
        ];
        let catalog = DraftCatalog::from_movies(&movies, &BudgetHeuristic);
        assert_eq!(catalog.best_available(&HashSet::new()).unwrap().movie_id, 2);
    }
}
