// Deterministic movie scoring.
//
// Converts raw box-office facts into a point breakdown. Pure: no I/O, no
// randomness, identical inputs always produce identical output. Projections
// live in `projection.rs` and are a separate type on purpose — a projected
// value must never be mistaken for a real score.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Movie;

/// Critical score at or above which the fresh bonus applies.
pub const FRESH_THRESHOLD: f64 = 75.0;
/// Domestic gross milestone, in dollars.
pub const DOMESTIC_MILESTONE: f64 = 100_000_000.0;
/// Worldwide gross milestone, in dollars.
pub const WORLDWIDE_MILESTONE: f64 = 500_000_000.0;

const FRESH_BONUS: f64 = 10.0;
const NUMBER_ONE_BONUS: f64 = 15.0;
const DOMESTIC_MILESTONE_BONUS: f64 = 20.0;
const WORLDWIDE_MILESTONE_BONUS: f64 = 50.0;
const FLOP_PENALTY: f64 = -10.0;

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Point breakdown for one movie. Money-derived components and the total
/// are rounded to 2 decimal places; bonus components are whole points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 1 point per $1M of opening weekend gross.
    pub opening_weekend: f64,
    /// 0.5 points per $1M of domestic gross.
    pub domestic_gross: f64,
    /// 0.25 points per $1M of worldwide gross.
    pub worldwide_gross: f64,
    /// +10 when the critical score is at least 75.
    pub rt_bonus: f64,
    /// +15 for a #1 opening weekend.
    pub number_one_bonus: f64,
    /// +20 at $100M domestic.
    pub domestic_100m: f64,
    /// +50 at $500M worldwide.
    pub worldwide_500m: f64,
    /// -10 when budget exceeds twice the worldwide gross.
    pub flop_penalty: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    /// A breakdown with every component zero, e.g. for an unreleased movie.
    pub fn zero() -> Self {
        ScoreBreakdown {
            opening_weekend: 0.0,
            domestic_gross: 0.0,
            worldwide_gross: 0.0,
            rt_bonus: 0.0,
            number_one_bonus: 0.0,
            domestic_100m: 0.0,
            worldwide_500m: 0.0,
            flop_penalty: 0.0,
            total: 0.0,
        }
    }
}

/// Round to 2 decimal places for reporting.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Score a movie from explicit inputs.
///
/// `opening_weekend_gross` and `is_number_one_opening` are passed separately
/// because they arrive from a different ingestion path than the cumulative
/// gross figures. Missing (zero) financial fields contribute 0 points;
/// negative money or a critical score outside [0, 100] is rejected.
pub fn score(
    movie: &Movie,
    is_number_one_opening: bool,
    opening_weekend_gross: f64,
) -> Result<ScoreBreakdown, ScoreError> {
    validate_inputs(movie, opening_weekend_gross)?;

    let opening_weekend = opening_weekend_gross / 1_000_000.0;
    let domestic = movie.domestic_gross / 1_000_000.0 * 0.5;
    let worldwide = movie.worldwide_gross / 1_000_000.0 * 0.25;

    let rt_bonus = if movie.rt_score >= FRESH_THRESHOLD {
        FRESH_BONUS
    } else {
        0.0
    };
    let number_one_bonus = if is_number_one_opening {
        NUMBER_ONE_BONUS
    } else {
        0.0
    };
    let domestic_100m = if movie.domestic_gross >= DOMESTIC_MILESTONE {
        DOMESTIC_MILESTONE_BONUS
    } else {
        0.0
    };
    let worldwide_500m = if movie.worldwide_gross >= WORLDWIDE_MILESTONE {
        WORLDWIDE_MILESTONE_BONUS
    } else {
        0.0
    };
    let flop_penalty = if movie.budget > 0.0 && movie.budget > 2.0 * movie.worldwide_gross {
        FLOP_PENALTY
    } else {
        0.0
    };

    // The total is computed from the unrounded components, then rounded once.
    let total = opening_weekend
        + domestic
        + worldwide
        + rt_bonus
        + number_one_bonus
        + domestic_100m
        + worldwide_500m
        + flop_penalty;

    Ok(ScoreBreakdown {
        opening_weekend: round2(opening_weekend),
        domestic_gross: round2(domestic),
        worldwide_gross: round2(worldwide),
        rt_bonus,
        number_one_bonus,
        domestic_100m,
        worldwide_500m,
        flop_penalty,
        total: round2(total),
    })
}

/// Score a movie from its own stored facts.
pub fn score_movie(movie: &Movie) -> Result<ScoreBreakdown, ScoreError> {
    score(movie, movie.number_one_opening, movie.opening_weekend_gross)
}

fn validate_inputs(movie: &Movie, opening_weekend_gross: f64) -> Result<(), ScoreError> {
    for (name, value) in [
        ("budget", movie.budget),
        ("domestic_gross", movie.domestic_gross),
        ("worldwide_gross", movie.worldwide_gross),
        ("opening_weekend_gross", opening_weekend_gross),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ScoreError::InvalidInput(format!(
                "{name} must be a non-negative number, got {value}"
            )));
        }
    }
    if !movie.rt_score.is_finite() || !(0.0..=100.0).contains(&movie.rt_score) {
        return Err(ScoreError::InvalidInput(format!(
            "rt_score must be within [0, 100], got {}",
            movie.rt_score
        )));
    }
    Ok(())
}
