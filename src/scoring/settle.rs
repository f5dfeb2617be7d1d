// Settlement: recompute realized scores from movie facts and roll them up
// into team totals.
//
// ScoreBreakdown is always derived on demand; the `movies.points` column is
// a cache of the same computation and `teams.total_points` is the one
// persisted aggregate. Settlement rewrites both from facts, so it is
// idempotent and safe to run after every ingestion sync.

use anyhow::{Context, Result};
use tracing::info;

use super::engine::score_movie;
use crate::db::Database;
use crate::model::MovieStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementReport {
    pub movies_scored: usize,
    pub teams_updated: usize,
}

/// Realized points for one movie: zero until release, the deterministic
/// engine after.
fn realized_points(movie: &crate::model::Movie) -> Result<f64> {
    if movie.status == MovieStatus::Upcoming {
        return Ok(0.0);
    }
    let breakdown = score_movie(movie)
        .with_context(|| format!("failed to score movie {} ({})", movie.id, movie.title))?;
    Ok(breakdown.total)
}

/// Recompute every movie's points and every team's total.
pub fn recalculate_scores(db: &Database) -> Result<SettlementReport> {
    let movies = db.all_movies()?;
    for movie in &movies {
        db.set_movie_points(movie.id, realized_points(movie)?)?;
    }

    let mut teams_updated = 0;
    for league_id in db.league_ids()? {
        for team in db.league_teams(league_id)? {
            let roster = db.team_roster(team.id)?;
            let mut total = 0.0;
            for movie in &roster {
                total += realized_points(movie)?;
            }
            db.set_team_points(team.id, total)?;
            teams_updated += 1;
        }
    }

    let report = SettlementReport {
        movies_scored: movies.len(),
        teams_updated,
    };
    info!(
        movies = report.movies_scored,
        teams = report.teams_updated,
        "scores recalculated"
    );
    Ok(report)
}

/// Check the settlement invariant: each team's persisted total equals the
/// sum of its roster's breakdown totals. Returns the teams that drift
/// beyond `tolerance`, as (team_id, persisted, derived).
pub fn verify_totals(db: &Database, tolerance: f64) -> Result<Vec<(i64, f64, f64)>> {
    let mut drifts = Vec::new();
    for league_id in db.league_ids()? {
        for team in db.league_teams(league_id)? {
            let mut derived = 0.0;
            for movie in db.team_roster(team.id)? {
                derived += realized_points(&movie)?;
            }
            if (team.total_points - derived).abs() > tolerance {
                drifts.push((team.id, team.total_points, derived));
            }
        }
    }
    Ok(drifts)
}
