// Pre-release projection.
//
// Everything in this module is an estimate. `Projection` is a distinct type
// from `ScoreBreakdown` and is never written back as a real score; the
// settlement path only ever consumes the deterministic engine.

use serde::{Deserialize, Serialize};

use super::engine::{DOMESTIC_MILESTONE, WORLDWIDE_MILESTONE};
use crate::model::Movie;

/// Estimated box-office figures and bonus probabilities for an unreleased
/// movie.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedFigures {
    pub opening_weekend_gross: f64,
    pub domestic_gross: f64,
    pub worldwide_gross: f64,
    /// Probability of a #1 opening weekend, in [0, 1].
    pub p_number_one: f64,
    /// Probability of a certified-fresh critical score, in [0, 1].
    pub p_certified_fresh: f64,
}

/// The full projection payload: estimated figures, the expected point value
/// they imply, and the draft-value ratio against a league-wide baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub movie_id: i64,
    pub figures: ProjectedFigures,
    pub expected_points: f64,
    /// expected_points / baseline; 0 when no baseline is available.
    pub draft_value: f64,
}

/// Source of projected figures. The probability model is not pinned down by
/// the product, so it hangs behind this seam; swap the strategy without
/// touching the draft engine.
pub trait ProjectionStrategy: Send + Sync {
    fn project(&self, movie: &Movie) -> ProjectedFigures;
}

/// Default strategy: scale everything off the production budget.
///
/// Worldwide = budget x 2.5, domestic = 40% of worldwide, opening weekend =
/// 35% of domestic. Bonus probabilities come from budget tiers. Deliberately
/// deterministic so auto-pick ordering is reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetHeuristic;

impl ProjectionStrategy for BudgetHeuristic {
    fn project(&self, movie: &Movie) -> ProjectedFigures {
        let worldwide = movie.budget * 2.5;
        let domestic = worldwide * 0.4;
        let opening = domestic * 0.35;

        let (p_number_one, p_certified_fresh) = if movie.budget >= 200_000_000.0 {
            (0.5, 0.5)
        } else if movie.budget >= 100_000_000.0 {
            (0.25, 0.35)
        } else if movie.budget >= 50_000_000.0 {
            (0.1, 0.25)
        } else {
            (0.05, 0.15)
        };

        ProjectedFigures {
            opening_weekend_gross: opening,
            domestic_gross: domestic,
            worldwide_gross: worldwide,
            p_number_one,
            p_certified_fresh,
        }
    }
}

/// Expected point value of a set of projected figures: the deterministic
/// money components and milestones applied to the estimates, plus the
/// probability-weighted bonuses.
pub fn expected_points(figures: &ProjectedFigures) -> f64 {
    let mut points = figures.opening_weekend_gross / 1_000_000.0
        + figures.domestic_gross / 1_000_000.0 * 0.5
        + figures.worldwide_gross / 1_000_000.0 * 0.25;

    if figures.domestic_gross >= DOMESTIC_MILESTONE {
        points += 20.0;
    }
    if figures.worldwide_gross >= WORLDWIDE_MILESTONE {
        points += 50.0;
    }

    points += 15.0 * figures.p_number_one;
    points += 10.0 * figures.p_certified_fresh;

    (points * 100.0).round() / 100.0
}

/// Build the full projection for one movie against a league baseline.
pub fn project_movie(
    strategy: &dyn ProjectionStrategy,
    movie: &Movie,
    baseline: f64,
) -> Projection {
    let figures = strategy.project(movie);
    let expected = expected_points(&figures);
    Projection {
        movie_id: movie.id,
        figures,
        expected_points: expected,
        draft_value: draft_value(expected, baseline),
    }
}

/// Draft value: expected points relative to the league-wide baseline.
pub fn draft_value(expected: f64, baseline: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    ((expected / baseline) * 100.0).round() / 100.0
}

/// League baseline: mean expected points over a set of candidate movies.
pub fn league_baseline(strategy: &dyn ProjectionStrategy, movies: &[Movie]) -> f64 {
    if movies.is_empty() {
        return 0.0;
    }
    let sum: f64 = movies
        .iter()
        .map(|m| expected_points(&strategy.project(m)))
        .sum();
    sum / movies.len() as f64
}
