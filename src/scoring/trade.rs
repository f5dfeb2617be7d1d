// Trade analysis: compare the aggregate value of two proposed movie sets.

use serde::{Deserialize, Serialize};

use super::engine::{score_movie, ScoreError};
use super::projection::{expected_points, ProjectionStrategy};
use crate::model::{Movie, MovieStatus};

/// Qualitative verdict on a proposed trade, from the receiving side's
/// point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeRating {
    Favorable,
    Unfavorable,
    Even,
}

/// Aggregate comparison of two movie sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeAnalysis {
    /// Sum of realized score totals on the give side.
    pub give_points: f64,
    pub receive_points: f64,
    /// Sum of projected expected points on the give side (upcoming movies).
    pub give_projected: f64,
    pub receive_projected: f64,
    /// receive - give, realized points only.
    pub point_difference: f64,
    /// receive - give over each movie's valuation (realized score for
    /// released movies, projected expected points for upcoming ones).
    pub value_difference: f64,
    pub rating: TradeRating,
}

/// Per-movie valuation: realized score once released, projection before.
fn valuation(strategy: &dyn ProjectionStrategy, movie: &Movie) -> Result<f64, ScoreError> {
    match movie.status {
        MovieStatus::Upcoming => Ok(expected_points(&strategy.project(movie))),
        MovieStatus::Released | MovieStatus::FreeAgent => Ok(score_movie(movie)?.total),
    }
}

/// Analyze a trade: `give` leaves the caller's roster, `receive` joins it.
/// `threshold` is the signed differential beyond which the trade stops
/// being rated even.
pub fn analyze_trade(
    strategy: &dyn ProjectionStrategy,
    give: &[Movie],
    receive: &[Movie],
    threshold: f64,
) -> Result<TradeAnalysis, ScoreError> {
    let mut give_points = 0.0;
    let mut give_projected = 0.0;
    let mut give_value = 0.0;
    for movie in give {
        if movie.status == MovieStatus::Upcoming {
            give_projected += expected_points(&strategy.project(movie));
        } else {
            give_points += score_movie(movie)?.total;
        }
        give_value += valuation(strategy, movie)?;
    }

    let mut receive_points = 0.0;
    let mut receive_projected = 0.0;
    let mut receive_value = 0.0;
    for movie in receive {
        if movie.status == MovieStatus::Upcoming {
            receive_projected += expected_points(&strategy.project(movie));
        } else {
            receive_points += score_movie(movie)?.total;
        }
        receive_value += valuation(strategy, movie)?;
    }

    let value_difference = receive_value - give_value;
    let rating = if value_difference > threshold {
        TradeRating::Favorable
    } else if value_difference < -threshold {
        TradeRating::Unfavorable
    } else {
        TradeRating::Even
    };

    Ok(TradeAnalysis {
        give_points,
        receive_points,
        give_projected,
        receive_projected,
        point_difference: receive_points - give_points,
        value_difference,
        rating,
    })
}
